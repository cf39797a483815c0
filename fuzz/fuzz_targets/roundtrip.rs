#![no_main]
use libfuzzer_sys::fuzz_target;
use polylzw::{Configuration, Decoder, Encoder, Flags};

fuzz_target!(|data: &[u8]| {
    let flags = Flags::BIG_ENDIAN_BITS
        | Flags::EOF_CODE_VALID
        | Flags::RESET_CODE_VALID
        | Flags::RESET_FULL_DICT;
    let config = Configuration::new(9, 10, 0x102, 0x100, 0x101, flags).unwrap();

    let mut encoder = Encoder::new(config);
    let mut buffer = Vec::with_capacity(2 * data.len() + 40);
    let _ = encoder.into_stream(&mut buffer).encode_all(data);

    let mut decoder = Decoder::new(config);
    let mut compare = vec![];
    let result = decoder.into_stream(&mut compare).decode_all(buffer.as_slice());
    assert!(result.status.is_ok(), "{:?}", result.status);
    assert_eq!(data, &*compare);
});
