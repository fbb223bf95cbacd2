#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use relay_protocol::codec::MessageCodec;
use tokio_util::codec::{Decoder, Encoder};

fuzz_target!(|data: &[u8]| {
    let mut decoder = MessageCodec::new();
    let mut buf = BytesMut::from(data);

    if let Ok(Some(message)) = decoder.decode(&mut buf) {
        // If decode succeeded, encoding should succeed too
        let mut encoded = BytesMut::new();
        if MessageCodec::new().encode(message.clone(), &mut encoded).is_ok() {
            // Round-trip: decode the encoded message
            if let Ok(Some(reparsed)) = MessageCodec::new().decode(&mut encoded) {
                // Verify round-trip integrity
                assert_eq!(message, reparsed);
            }
        }
    }
});
