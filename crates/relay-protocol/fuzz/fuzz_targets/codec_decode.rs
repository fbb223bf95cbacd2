#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use relay_protocol::codec::MessageCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    let mut codec = MessageCodec::new();
    let mut buf = BytesMut::from(data);

    // Decode until the input is exhausted or rejected.
    // This should never panic, only return Err for invalid input.
    while let Ok(Some(_)) = codec.decode(&mut buf) {}
});
