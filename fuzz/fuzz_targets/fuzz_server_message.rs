#![no_main]

use libfuzzer_sys::fuzz_target;
use mc_loadbot::protocol::ServerMessage;

// Gateway frames arrive as text; the bot must never panic on any of them,
// and every decoded message must convert into an event without panicking.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(message) = serde_json::from_str::<ServerMessage>(text) {
        let _ = message.into_event();
    }
});
