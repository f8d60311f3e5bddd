#![no_main]
use libfuzzer_sys::fuzz_target;

use lifx_emu_core::BuildOptions;
use lifx_emu_core::Message;
use lifx_emu_core::RawMessage;

fuzz_target!(|data: Message| {
    // build a raw message from this message
    let mut opts = BuildOptions {
        ..Default::default()
    };

    if let Message::Acknowledgement { seq } = data {
        opts.sequence = seq;
    }

    // blobs can be bigger than a packet may carry
    let raw = match RawMessage::build(&opts, &data) {
        Ok(raw) => raw,
        Err(_) => return,
    };
    let bytes = raw.pack().unwrap();

    let unpacked = RawMessage::unpack(&bytes).unwrap();
    assert_eq!(unpacked, raw);

    // floats may be NaN, so compare the bytes rather than the messages
    let parsed_msg = Message::from_raw(&unpacked).unwrap();
    let repacked = RawMessage::build(&opts, &parsed_msg).unwrap().pack().unwrap();
    assert_eq!(bytes, repacked);
});
