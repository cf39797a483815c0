//! Packing of variable width code words into bytes.
//!
//! Both directions keep a 64 bit accumulator so that partial bytes survive between calls. The
//! streaming buffers are driven by the encoder and decoder, [`BitPacker`] and [`BitUnpacker`]
//! offer the same packing for whole buffers.
use crate::{BitOrder, Code, LzwError, MAX_CODESIZE};

/// The accumulator of a code word writer.
pub(crate) trait Buffer {
    fn new() -> Self
    where
        Self: Sized;
    /// Insert the low `width` bits of a code into the buffer.
    fn buffer_code(&mut self, code: Code, width: u8);
    /// Push bytes if the buffer space is getting small.
    ///
    /// Returns `true` if there is not enough space left for another round of codes.
    fn push_out(&mut self, out: &mut &mut [u8]) -> bool;
    /// Flush all full bytes, returning if at least one more byte remains.
    fn flush_out(&mut self, out: &mut &mut [u8]) -> bool;
    /// Pad the buffer to a full byte.
    fn buffer_pad(&mut self);
    /// Forget all buffered bits.
    fn reset(&mut self);
}

/// The accumulator of a code word reader.
pub(crate) trait Source {
    fn new() -> Self
    where
        Self: Sized;
    /// Move as many whole bytes from `inp` into the buffer as fit.
    fn refill_bits(&mut self, inp: &mut &[u8]);
    /// Take `width` bits, if that many are buffered.
    fn get_bits(&mut self, width: u8) -> Option<Code>;
    /// The number of buffered bits.
    fn bits(&self) -> u8;
    /// Forget all buffered bits.
    fn reset(&mut self);

    fn next_code(&mut self, width: u8, inp: &mut &[u8]) -> Option<Code> {
        if self.bits() < width {
            self.refill_bits(inp);
        }

        self.get_bits(width)
    }
}

/// Room for a code, a reset code and an end code between two flushes.
const ROUND_BITS: u8 = 3 * MAX_CODESIZE;

pub(crate) struct MsbBuffer {
    /// The buffer bits.
    buffer: u64,
    /// The number of valid buffer bits.
    bits_in_buffer: u8,
}

pub(crate) struct LsbBuffer {
    /// The buffer bits.
    buffer: u64,
    /// The number of valid buffer bits.
    bits_in_buffer: u8,
}

pub(crate) struct MsbSource {
    bit_buffer: u64,
    bits: u8,
}

pub(crate) struct LsbSource {
    bit_buffer: u64,
    bits: u8,
}

fn mask(width: u8) -> u64 {
    (1u64 << width) - 1
}

impl Buffer for MsbBuffer {
    fn new() -> Self {
        MsbBuffer {
            buffer: 0,
            bits_in_buffer: 0,
        }
    }

    fn buffer_code(&mut self, code: Code, width: u8) {
        let shift = 64 - self.bits_in_buffer - width;
        self.buffer |= (u64::from(code) & mask(width)) << shift;
        self.bits_in_buffer += width;
    }

    fn push_out(&mut self, out: &mut &mut [u8]) -> bool {
        if self.bits_in_buffer + ROUND_BITS <= 64 {
            return false;
        }

        self.flush_out(out)
    }

    fn flush_out(&mut self, out: &mut &mut [u8]) -> bool {
        let want = usize::from(self.bits_in_buffer / 8);
        let count = want.min((*out).len());
        let (bytes, tail) = core::mem::replace(out, &mut []).split_at_mut(count);
        *out = tail;

        for b in bytes {
            *b = ((self.buffer & 0xff00_0000_0000_0000) >> 56) as u8;
            self.buffer <<= 8;
            self.bits_in_buffer -= 8;
        }

        count < want
    }

    fn buffer_pad(&mut self) {
        let to_byte = self.bits_in_buffer.wrapping_neg() & 0x7;
        self.bits_in_buffer += to_byte;
    }

    fn reset(&mut self) {
        self.buffer = 0;
        self.bits_in_buffer = 0;
    }
}

impl Buffer for LsbBuffer {
    fn new() -> Self {
        LsbBuffer {
            buffer: 0,
            bits_in_buffer: 0,
        }
    }

    fn buffer_code(&mut self, code: Code, width: u8) {
        self.buffer |= (u64::from(code) & mask(width)) << self.bits_in_buffer;
        self.bits_in_buffer += width;
    }

    fn push_out(&mut self, out: &mut &mut [u8]) -> bool {
        if self.bits_in_buffer + ROUND_BITS <= 64 {
            return false;
        }

        self.flush_out(out)
    }

    fn flush_out(&mut self, out: &mut &mut [u8]) -> bool {
        let want = usize::from(self.bits_in_buffer / 8);
        let count = want.min((*out).len());
        let (bytes, tail) = core::mem::replace(out, &mut []).split_at_mut(count);
        *out = tail;

        for b in bytes {
            *b = (self.buffer & 0x0000_0000_0000_00ff) as u8;
            self.buffer >>= 8;
            self.bits_in_buffer -= 8;
        }

        count < want
    }

    fn buffer_pad(&mut self) {
        let to_byte = self.bits_in_buffer.wrapping_neg() & 0x7;
        self.bits_in_buffer += to_byte;
    }

    fn reset(&mut self) {
        self.buffer = 0;
        self.bits_in_buffer = 0;
    }
}

/// Copy up to `wish_count` bytes from the front of `inp`.
fn take_bytes(inp: &mut &[u8], wish_count: u8) -> ([u8; 8], u8) {
    let mut buffer = [0u8; 8];
    let count = usize::from(wish_count).min(inp.len());
    buffer[..count].copy_from_slice(&inp[..count]);
    *inp = &inp[count..];
    (buffer, count as u8 * 8)
}

impl Source for MsbSource {
    fn new() -> Self {
        MsbSource {
            bit_buffer: 0,
            bits: 0,
        }
    }

    fn refill_bits(&mut self, inp: &mut &[u8]) {
        let wish_count = (64 - self.bits) / 8;
        if wish_count == 0 {
            return;
        }

        let (buffer, new_bits) = take_bytes(inp, wish_count);
        self.bit_buffer |= u64::from_be_bytes(buffer) >> self.bits;
        self.bits += new_bits;
    }

    fn get_bits(&mut self, width: u8) -> Option<Code> {
        if self.bits < width {
            return None;
        }

        let mask = mask(width);
        let rotbuf = self.bit_buffer.rotate_left(width.into());
        self.bit_buffer = rotbuf & !mask;
        self.bits -= width;
        Some((rotbuf & mask) as Code)
    }

    fn bits(&self) -> u8 {
        self.bits
    }

    fn reset(&mut self) {
        self.bit_buffer = 0;
        self.bits = 0;
    }
}

impl Source for LsbSource {
    fn new() -> Self {
        LsbSource {
            bit_buffer: 0,
            bits: 0,
        }
    }

    fn refill_bits(&mut self, inp: &mut &[u8]) {
        let wish_count = (64 - self.bits) / 8;
        if wish_count == 0 {
            return;
        }

        let (buffer, new_bits) = take_bytes(inp, wish_count);
        self.bit_buffer |= u64::from_le_bytes(buffer) << self.bits;
        self.bits += new_bits;
    }

    fn get_bits(&mut self, width: u8) -> Option<Code> {
        if self.bits < width {
            return None;
        }

        let code = self.bit_buffer & mask(width);
        self.bit_buffer >>= width;
        self.bits -= width;
        Some(code as Code)
    }

    fn bits(&self) -> u8 {
        self.bits
    }

    fn reset(&mut self) {
        self.bit_buffer = 0;
        self.bits = 0;
    }
}

pub(crate) fn buffer_for(order: BitOrder) -> Box<dyn Buffer + Send> {
    match order {
        BitOrder::Msb => Box::new(MsbBuffer::new()),
        BitOrder::Lsb => Box::new(LsbBuffer::new()),
    }
}

pub(crate) fn source_for(order: BitOrder) -> Box<dyn Source + Send> {
    match order {
        BitOrder::Msb => Box::new(MsbSource::new()),
        BitOrder::Lsb => Box::new(LsbSource::new()),
    }
}

/// Writes code words of any width into a byte vector.
///
/// ```
/// use polylzw::{BitOrder, bits::BitPacker};
/// let mut packer = BitPacker::new(BitOrder::Msb);
/// packer.write(9, u16::from(b'H'));
/// packer.write(9, u16::from(b'e'));
/// assert_eq!(packer.finish(), [0x24, 0x19, 0x40]);
/// ```
pub struct BitPacker {
    buffer: Box<dyn Buffer + Send>,
    bytes: Vec<u8>,
}

/// Reads code words of any width from a byte slice.
pub struct BitUnpacker<'d> {
    source: Box<dyn Source + Send>,
    input: &'d [u8],
}

impl BitPacker {
    pub fn new(order: BitOrder) -> Self {
        BitPacker {
            buffer: buffer_for(order),
            bytes: Vec::new(),
        }
    }

    /// Append the low `width` bits of `value`.
    ///
    /// # Panics
    ///
    /// If `width` exceeds [`MAX_CODESIZE`].
    pub fn write(&mut self, width: u8, value: Code) {
        assert!(width <= MAX_CODESIZE, "code words are at most {} bits", MAX_CODESIZE);
        let mut scratch = [0u8; 8];
        let written = {
            let mut out = &mut scratch[..];
            self.buffer.push_out(&mut out);
            8 - out.len()
        };
        self.bytes.extend_from_slice(&scratch[..written]);
        self.buffer.buffer_code(value, width);
    }

    /// Pad the last byte with zero bits and return all bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.buffer.buffer_pad();
        let mut scratch = [0u8; 8];
        let written = {
            let mut out = &mut scratch[..];
            self.buffer.flush_out(&mut out);
            8 - out.len()
        };
        self.bytes.extend_from_slice(&scratch[..written]);
        self.bytes
    }
}

impl<'d> BitUnpacker<'d> {
    pub fn new(order: BitOrder, input: &'d [u8]) -> Self {
        BitUnpacker {
            source: source_for(order),
            input,
        }
    }

    /// Consume the next `width` bits.
    pub fn read(&mut self, width: u8) -> Result<Code, LzwError> {
        assert!(width <= MAX_CODESIZE, "code words are at most {} bits", MAX_CODESIZE);
        self.source
            .next_code(width, &mut self.input)
            .ok_or(LzwError::UnexpectedEndOfStream)
    }

    /// The number of bits not yet consumed.
    pub fn remaining_bits(&self) -> usize {
        usize::from(self.source.bits()) + 8 * self.input.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{BitPacker, BitUnpacker};
    use crate::{BitOrder, LzwError};

    #[test]
    fn msb_packs_high_bits_first() {
        let mut packer = BitPacker::new(BitOrder::Msb);
        packer.write(9, 0x48);
        packer.write(9, 0x65);
        assert_eq!(packer.finish(), [0x24, 0x19, 0x40]);
    }

    #[test]
    fn lsb_packs_low_bits_first() {
        let mut packer = BitPacker::new(BitOrder::Lsb);
        packer.write(9, 0x48);
        packer.write(9, 0x65);
        assert_eq!(packer.finish(), [0x48, 0xca, 0x00]);
    }

    #[test]
    fn only_low_bits_are_written() {
        let mut packer = BitPacker::new(BitOrder::Msb);
        packer.write(4, 0xfff5);
        packer.write(4, 0x3);
        assert_eq!(packer.finish(), [0x53]);
    }

    #[test]
    fn mixed_widths_survive_many_flushes() {
        for &order in &[BitOrder::Msb, BitOrder::Lsb] {
            let codes: Vec<(u8, u16)> = (0..1000u32)
                .map(|i| {
                    let width = 9 + (i % 8) as u8;
                    (width, (i * 7919 % (1 << width)) as u16)
                })
                .collect();

            let mut packer = BitPacker::new(order);
            for &(width, code) in &codes {
                packer.write(width, code);
            }
            let bytes = packer.finish();

            let mut unpacker = BitUnpacker::new(order, &bytes);
            for &(width, code) in &codes {
                assert_eq!(unpacker.read(width), Ok(code), "{:?}", order);
            }
            assert!(unpacker.remaining_bits() < 8);
        }
    }

    #[test]
    fn truncated_code_word_is_an_error() {
        let mut unpacker = BitUnpacker::new(BitOrder::Msb, &[0xff, 0x80]);
        assert_eq!(unpacker.read(12), Ok(0xff8));
        assert_eq!(unpacker.remaining_bits(), 4);
        assert_eq!(unpacker.read(9), Err(LzwError::UnexpectedEndOfStream));
    }
}
