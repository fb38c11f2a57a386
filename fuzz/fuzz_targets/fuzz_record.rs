#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut state = tlsengine::connection::ConnectionState::new([0u8; 32]);
    state.push_inbound(data);
    while let Ok(Some(_)) = state.next_record() {}
});
