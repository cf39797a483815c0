//! Streams of legacy encoders, checked bit for bit.
use polylzw::bits::BitPacker;
use polylzw::{BitOrder, Configuration, Decoder, Encoder, Flags};

fn pack(codes: &[(u8, u16)]) -> Vec<u8> {
    let mut packer = BitPacker::new(BitOrder::Msb);
    for &(width, code) in codes {
        packer.write(width, code);
    }
    packer.finish()
}

fn runs(runs: &[(usize, u8, u8)]) -> Vec<(u8, u16)> {
    runs.iter()
        .flat_map(|&(count, width, byte)| std::iter::repeat((width, u16::from(byte))).take(count))
        .collect()
}

fn decode(config: Configuration, data: &[u8]) -> Vec<u8> {
    let mut out = vec![];
    let result = Decoder::new(config).into_stream(&mut out).decode_all(data);
    assert!(result.status.is_ok(), "{:?}", result.status);
    out
}

fn encode(mut encoder: Encoder, data: &[u8]) -> Vec<u8> {
    let mut out = vec![];
    let result = encoder.into_stream(&mut out).encode_all(data);
    assert!(result.status.is_ok(), "{:?}", result.status);
    out
}

fn eof_config(max_bits: u8, extra: Flags) -> Configuration {
    let flags = Flags::BIG_ENDIAN_BITS | Flags::EOF_CODE_VALID | extra;
    Configuration::new(9, max_bits, 0x101, 0x100, 0, flags).unwrap()
}

fn hello_codes() -> Vec<(u8, u16)> {
    let mut codes: Vec<_> = b"Hello hello hello."
        .iter()
        .map(|&b| (9, u16::from(b)))
        .collect();
    codes.push((9, 0x100));
    codes
}

fn overflow_input() -> Vec<u8> {
    let mut data = vec![];
    data.extend(std::iter::repeat(b'a').take(1 << 8));
    data.extend(std::iter::repeat(b'b').take(1 << 9));
    data.extend(std::iter::repeat(b'c').take(1 << 10));
    data.extend(std::iter::repeat(b'd').take(1 << 11));
    data.extend_from_slice(b"ee");
    data
}

fn overflow_codes(tail_width: u8) -> Vec<(u8, u16)> {
    let mut codes = runs(&[
        (1 << 8, 9, b'a'),
        (1 << 9, 10, b'b'),
        (1 << 10, 11, b'c'),
        (1 << 11, 12, b'd'),
        (2, tail_width, b'e'),
    ]);
    codes.push((tail_width, 0x100));
    codes
}

#[test]
fn decompress_with_dictionary_codes() {
    let data = pack(&[
        (9, u16::from(b'H')),
        (9, u16::from(b'e')),
        (9, u16::from(b'l')),
        (9, u16::from(b'l')),
        (9, u16::from(b'o')),
        (9, u16::from(b' ')),
        (9, u16::from(b'h')),
        (9, 0x102),
        (9, 0x104),
        (9, 0x106),
        (9, 0x108),
        (9, u16::from(b'o')),
        (9, u16::from(b'.')),
        (9, 0x100),
    ]);

    assert_eq!(decode(eof_config(9, Flags::empty()), &data), b"Hello hello hello.");
}

#[test]
fn decompress_width_expansion() {
    let mut codes = runs(&[(256, 9, b'A'), (1, 10, b'B')]);
    codes.push((10, 0x100));
    let data = pack(&codes);

    let mut expected = vec![b'A'; 256];
    expected.push(b'B');
    assert_eq!(decode(eof_config(10, Flags::empty()), &data), expected);
}

#[test]
fn decompress_reset_shared_with_end_code() {
    let mut codes = runs(&[(256, 9, b'A'), (1, 10, b'B')]);
    codes.push((10, 0x100));
    codes.extend(runs(&[(2, 9, b'C')]));
    codes.push((9, 0x100));
    let data = pack(&codes);

    let flags = Flags::BIG_ENDIAN_BITS | Flags::RESET_CODE_VALID;
    let config = Configuration::new(9, 10, 0x101, 0x100, 0x100, flags).unwrap();

    let mut expected = vec![b'A'; 256];
    expected.extend_from_slice(b"BCC");
    assert_eq!(decode(config, &data), expected);
}

#[test]
fn decompress_dictionary_overflow() {
    let data = pack(&overflow_codes(12));
    assert_eq!(decode(eof_config(12, Flags::empty()), &data), overflow_input());
}

#[test]
fn decompress_dictionary_overflow_with_reset() {
    let data = pack(&overflow_codes(9));
    let config = eof_config(12, Flags::RESET_FULL_DICT);
    assert_eq!(decode(config, &data), overflow_input());
}

#[test]
fn compress_literal_codes() {
    let config = eof_config(9, Flags::empty());
    let encoded = encode(Encoder::with_literal_codes(config), b"Hello hello hello.");
    assert_eq!(encoded, pack(&hello_codes()));
}

#[test]
fn compress_longest_matches() {
    let config = eof_config(9, Flags::empty());
    let encoded = encode(Encoder::new(config), b"Hello hello hello.");

    let mut codes: Vec<_> = b"Hello h".iter().map(|&b| (9, u16::from(b))).collect();
    codes.extend_from_slice(&[
        (9, 0x102),
        (9, 0x104),
        (9, 0x106),
        (9, 0x108),
        (9, u16::from(b'o')),
        (9, u16::from(b'.')),
        (9, 0x100),
    ]);
    assert_eq!(encoded, pack(&codes));
}

#[test]
fn compress_width_growth() {
    let mut data = vec![b'a'; 256];
    data.push(b'b');

    let encoded = encode(Encoder::with_literal_codes(eof_config(12, Flags::empty())), &data);

    let mut codes = runs(&[(256, 9, b'a'), (1, 10, b'b')]);
    codes.push((10, 0x100));
    assert_eq!(encoded, pack(&codes));
    // 256 codes of 9 bits and two of 10 bits.
    assert_eq!(encoded.len(), 291);
}

#[test]
fn compress_dictionary_overflow() {
    let config = eof_config(12, Flags::empty());
    let encoded = encode(Encoder::with_literal_codes(config), &overflow_input());
    assert_eq!(encoded, pack(&overflow_codes(12)));
}

#[test]
fn compress_dictionary_overflow_with_reset() {
    let config = eof_config(12, Flags::RESET_FULL_DICT);
    let encoded = encode(Encoder::with_literal_codes(config), &overflow_input());
    assert_eq!(encoded, pack(&overflow_codes(9)));
}

#[test]
fn compress_terminates_with_shared_reset_code() {
    let flags = Flags::BIG_ENDIAN_BITS | Flags::RESET_CODE_VALID;
    let config = Configuration::new(9, 10, 0x101, 0x100, 0x100, flags).unwrap();

    let mut data = vec![b'A'; 256];
    data.push(b'B');
    let encoded = encode(Encoder::with_literal_codes(config), &data);

    let mut codes = runs(&[(256, 9, b'A'), (1, 10, b'B')]);
    codes.push((10, 0x100));
    assert_eq!(encoded, pack(&codes));
    assert_eq!(decode(config, &encoded), data);
}
