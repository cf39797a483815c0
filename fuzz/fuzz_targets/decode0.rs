#![no_main]
use libfuzzer_sys::fuzz_target;
use polylzw::{Configuration, Decoder, Flags};

fuzz_target!(|raw_data: &[u8]| {
    if raw_data.len() < 2 {
        return;
    }

    // The first two bytes pick the dialect, everything else is the stream.
    let (head, stream) = raw_data.split_at(2);
    let initial_bits = 9 + head[0] % 8;
    let max_bits = initial_bits + (head[0] >> 4) % (17 - initial_bits);
    let flags = Flags::from_bits_truncate(head[1]);
    let config = match Configuration::new(initial_bits, max_bits, 0x102, 0x100, 0x101, flags) {
        Ok(config) => config,
        Err(_) => return,
    };

    let mut decoder = Decoder::new(config);
    let _ = decoder.into_stream(std::io::sink()).decode_all(stream);
});
