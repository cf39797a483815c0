//! # Configurable LZW decoder and encoder
//!
//! This crate provides an [`Encoder`] and a [`Decoder`] for the many LZW dialects found in
//! legacy archive and asset formats. The dialects disagree on almost everything except the
//! core algorithm, so every decision is part of the [`Configuration`]:
//!
//!  * the order of bits within bytes (most or least significant bit first),
//!  * the starting and the maximum code word width,
//!  * the first code available for dictionary entries,
//!  * whether an end code and a reset code exist, and whether they are the same code,
//!  * whether a full dictionary freezes or resets itself.
//!
//! The same configuration must be used to encode and decode a stream. There is no header and
//! nothing is negotiated, the enclosing format decides the parameters.
//!
//! Exemplary use of the encoder:
//!
//! ```
//! use polylzw::{Configuration, Flags, encode::Encoder, decode::Decoder};
//! let config = Configuration::new(9, 12, 0x101, 0x100, 0, Flags::BIG_ENDIAN_BITS | Flags::EOF_CODE_VALID)
//!     .unwrap();
//! let data = b"TOBEORNOTTOBEORTOBEORNOT";
//!
//! let mut compressed = vec![];
//! let result = Encoder::new(config).into_stream(&mut compressed).encode_all(&data[..]);
//! result.status.unwrap();
//!
//! let mut decompressed = vec![];
//! let result = Decoder::new(config).into_stream(&mut decompressed).decode_all(&compressed[..]);
//! result.status.unwrap();
//! assert_eq!(decompressed, data);
//! ```
#![forbid(unsafe_code)]
use bitflags::bitflags;
use thiserror::Error;

pub mod bits;
pub mod decode;
mod dictionary;
pub mod encode;
pub mod stream;

pub use crate::decode::Decoder;
pub use crate::encode::Encoder;

/// The largest supported code word width.
pub const MAX_CODESIZE: u8 = 16;
/// The smallest supported code word width, every literal byte must have a code.
pub const MIN_CODESIZE: u8 = 9;
/// The number of literal codes, `0..=255` always stand for their byte value.
pub(crate) const LITERALS: u32 = 256;

/// Alias for a LZW code point
pub type Code = u16;

/// The order of bits in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BitOrder {
    /// The most significant bit is processed first.
    Msb,
    /// The least significant bit is processed first.
    Lsb,
}

bitflags! {
    /// Switches of a LZW dialect, see [`Configuration::new`].
    #[derive(Default)]
    pub struct Flags: u8 {
        /// Pack code words most significant bit first.
        const BIG_ENDIAN_BITS = 0b1 << 0;
        /// The end code is written and recognized. Otherwise the stream ends with its input.
        const EOF_CODE_VALID  = 0b1 << 1;
        /// The reset code is written and recognized.
        const RESET_CODE_VALID = 0b1 << 2;
        /// A full dictionary resets itself instead of freezing at the maximum width.
        const RESET_FULL_DICT = 0b1 << 3;
    }
}

/// The wire parameters of one LZW dialect.
///
/// Encoder and decoder of a stream must agree on all of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Configuration {
    initial_bits: u8,
    max_bits: u8,
    first_code: Code,
    eof_code: Code,
    reset_code: Code,
    flags: Flags,
}

/// A configuration that no stream can be coded with.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Code widths from {0} up to {1} bits are not within 9 to 16 bits")]
    InvalidWidth(u8, u8),
    #[error("First dictionary code {0:#x} is not in 0x100..{1:#x}")]
    FirstCodeOutOfRange(Code, u32),
    #[error("Reserved code {0:#x} must be below the first code and fit the initial width")]
    ReservedCodeOutOfRange(Code),
    #[error("Code {0:#x} can not be both a live end code and a live reset code")]
    AmbiguousControlCode(Code),
}

/// The result of coding a buffer.
#[derive(Debug)]
pub struct BufferResult {
    /// The number of bytes consumed from the input buffer.
    pub consumed_in: usize,
    /// The number of bytes written into the output buffer.
    pub consumed_out: usize,
    /// The status after returning from the call.
    pub status: Result<LzwStatus, LzwError>,
}

/// The status after successful coding of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzwStatus {
    /// Everything went well.
    Ok,
    /// No bytes were read or written, more input or a call to `finish` is required.
    NoProgress,
    /// The end of the stream was reached. No further data is produced.
    Done,
}

/// A fatal error of a stream.
///
/// None of these can be recovered from as LZW streams carry no synchronization markers. Data
/// produced before the error remains valid.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzwError {
    #[error("Input ended in the middle of a code word")]
    UnexpectedEndOfStream,
    #[error("Code {0:#x} is reserved and has no meaning in this configuration")]
    UnknownCode(Code),
    #[error("Code {code:#x} was read but the next dictionary code is {next:#x}")]
    DictionaryDesync { code: Code, next: u32 },
}

impl From<LzwError> for std::io::Error {
    fn from(err: LzwError) -> Self {
        let kind = match err {
            LzwError::UnexpectedEndOfStream => std::io::ErrorKind::UnexpectedEof,
            _ => std::io::ErrorKind::InvalidData,
        };
        std::io::Error::new(kind, err)
    }
}

impl Configuration {
    /// Describe a dialect.
    ///
    /// Codes `0..=255` are the literal bytes, dictionary entries start at `first_code`. The
    /// `eof_code` and `reset_code` only take effect when enabled by `flags` and may be the same
    /// value. Code words start out `initial_bits` wide and grow up to `max_bits`.
    pub fn new(
        initial_bits: u8,
        max_bits: u8,
        first_code: Code,
        eof_code: Code,
        reset_code: Code,
        flags: Flags,
    ) -> Result<Self, ConfigError> {
        if initial_bits < MIN_CODESIZE || initial_bits > max_bits || max_bits > MAX_CODESIZE {
            return Err(ConfigError::InvalidWidth(initial_bits, max_bits));
        }

        let code_space = 1u32 << max_bits;
        if u32::from(first_code) < LITERALS || u32::from(first_code) >= code_space {
            return Err(ConfigError::FirstCodeOutOfRange(first_code, code_space));
        }

        let config = Configuration {
            initial_bits,
            max_bits,
            first_code,
            eof_code,
            reset_code,
            flags,
        };

        for code in config.eof_code().into_iter().chain(config.reset_code()) {
            let code32 = u32::from(code);
            if code32 < LITERALS || code >= first_code || code32 >= 1 << initial_bits {
                return Err(ConfigError::ReservedCodeOutOfRange(code));
            }
        }

        if let (Some(eof), Some(reset)) = (config.eof_code(), config.reset_code()) {
            if eof == reset {
                return Err(ConfigError::AmbiguousControlCode(eof));
            }
        }

        Ok(config)
    }

    pub fn initial_bits(&self) -> u8 {
        self.initial_bits
    }

    pub fn max_bits(&self) -> u8 {
        self.max_bits
    }

    pub fn first_code(&self) -> Code {
        self.first_code
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn bit_order(&self) -> BitOrder {
        if self.flags.contains(Flags::BIG_ENDIAN_BITS) {
            BitOrder::Msb
        } else {
            BitOrder::Lsb
        }
    }

    /// The end code, if it is live in this dialect.
    pub fn eof_code(&self) -> Option<Code> {
        Some(self.eof_code).filter(|_| self.flags.contains(Flags::EOF_CODE_VALID))
    }

    /// The reset code, if it is live in this dialect.
    pub fn reset_code(&self) -> Option<Code> {
        Some(self.reset_code).filter(|_| self.flags.contains(Flags::RESET_CODE_VALID))
    }

    /// The code word an encoder appends after all data.
    ///
    /// Dialects sharing one code for reset and end of stream terminate with a reset code.
    pub fn terminator(&self) -> Option<Code> {
        self.eof_code().or_else(|| {
            self.reset_code()
                .filter(|&reset| reset == self.eof_code)
        })
    }

    /// Whether a full dictionary resets itself.
    pub fn resets_when_full(&self) -> bool {
        self.flags.contains(Flags::RESET_FULL_DICT)
    }

    /// One past the largest code representable at the maximum width.
    pub(crate) fn code_space(&self) -> u32 {
        1 << self.max_bits
    }

    pub(crate) fn width_for(&self, next_code: u32) -> u8 {
        code_width(next_code, self.initial_bits, self.max_bits)
    }
}

/// The width of the next code word, given the next code to be assigned.
///
/// This is the smallest width of at least `initial_bits` that can represent `next_code`,
/// capped at `max_bits`. Encoder and decoder both derive their width only through this.
pub fn code_width(next_code: u32, initial_bits: u8, max_bits: u8) -> u8 {
    let mut width = initial_bits;
    while width < max_bits && (1u32 << width) <= next_code {
        width += 1;
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> Flags {
        Flags::BIG_ENDIAN_BITS | Flags::EOF_CODE_VALID
    }

    #[test]
    fn width_grows_with_next_code() {
        assert_eq!(code_width(0x101, 9, 12), 9);
        assert_eq!(code_width(0x1ff, 9, 12), 9);
        assert_eq!(code_width(0x200, 9, 12), 10);
        assert_eq!(code_width(0x7ff, 9, 12), 11);
        assert_eq!(code_width(0x1000, 9, 12), 12);
        assert_eq!(code_width(0x200, 9, 9), 9);
        assert_eq!(code_width(0x101, 12, 12), 12);
    }

    #[test]
    fn rejects_bad_widths() {
        assert_eq!(
            Configuration::new(8, 12, 0x101, 0x100, 0, flags()),
            Err(ConfigError::InvalidWidth(8, 12))
        );
        assert_eq!(
            Configuration::new(12, 10, 0x101, 0x100, 0, flags()),
            Err(ConfigError::InvalidWidth(12, 10))
        );
        assert_eq!(
            Configuration::new(9, 17, 0x101, 0x100, 0, flags()),
            Err(ConfigError::InvalidWidth(9, 17))
        );
    }

    #[test]
    fn rejects_bad_codes() {
        assert!(matches!(
            Configuration::new(9, 9, 0xff, 0x100, 0, flags()),
            Err(ConfigError::FirstCodeOutOfRange(0xff, _))
        ));
        assert!(matches!(
            Configuration::new(9, 9, 0x200, 0x100, 0, flags()),
            Err(ConfigError::FirstCodeOutOfRange(0x200, _))
        ));
        assert_eq!(
            Configuration::new(9, 12, 0x101, 0x101, 0, flags()),
            Err(ConfigError::ReservedCodeOutOfRange(0x101))
        );
        assert_eq!(
            Configuration::new(9, 12, 0x102, 0x101, 0x41, flags() | Flags::RESET_CODE_VALID),
            Err(ConfigError::ReservedCodeOutOfRange(0x41))
        );
    }

    #[test]
    fn dead_reserved_codes_are_ignored() {
        let config = Configuration::new(9, 12, 0x101, 0x100, 0, flags()).unwrap();
        assert_eq!(config.reset_code(), None);
        assert_eq!(config.eof_code(), Some(0x100));
        assert_eq!(config.bit_order(), BitOrder::Msb);
    }

    #[test]
    fn shared_reset_terminates() {
        let shared = Configuration::new(9, 10, 0x101, 0x100, 0x100, Flags::RESET_CODE_VALID).unwrap();
        assert_eq!(shared.terminator(), Some(0x100));
        assert_eq!(shared.eof_code(), None);
        assert_eq!(shared.bit_order(), BitOrder::Lsb);

        let split = Configuration::new(9, 10, 0x102, 0x101, 0x100, Flags::RESET_CODE_VALID).unwrap();
        assert_eq!(split.terminator(), None);

        assert_eq!(
            Configuration::new(9, 10, 0x101, 0x100, 0x100, Flags::RESET_CODE_VALID | Flags::EOF_CODE_VALID),
            Err(ConfigError::AmbiguousControlCode(0x100))
        );
    }
}
