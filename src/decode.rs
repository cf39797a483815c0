//! A module for all decoding needs.
use std::io::{BufRead, Write};

use crate::bits::{LsbSource, MsbSource, Source};
use crate::dictionary::Dictionary;
use crate::stream::{self, Filter, FilterReader, StreamResult, VectorResult};
use crate::{BitOrder, BufferResult, Code, Configuration, LzwError, LzwStatus};

/// The state for decoding data with an LZW algorithm.
///
/// The same structure can be utilized with streams as well as your own buffers and driver logic.
/// It may even be possible to mix them if you are sufficiently careful not to lose or skip any
/// already decode data in the process.
pub struct Decoder {
    state: Box<dyn Stateful + Send + 'static>,
}

/// A decoding stream sink.
///
/// See [`Decoder::into_stream`] on how to create this type.
pub struct IntoStream<'d, W> {
    decoder: &'d mut Decoder,
    writer: W,
}

/// A decoding sink into a vector.
///
/// See [`Decoder::into_vec`] on how to create this type.
pub struct IntoVec<'d> {
    decoder: &'d mut Decoder,
    vector: &'d mut Vec<u8>,
}

trait Stateful {
    fn advance(&mut self, inp: &[u8], out: &mut [u8]) -> BufferResult;
    fn mark_ended(&mut self) -> bool;
    fn has_ended(&self) -> bool;
    fn restart(&mut self);
}

#[derive(Clone, Copy, Debug)]
enum Phase {
    /// The next code starts a fresh dictionary.
    Idle,
    /// The previous code, the next entry extends its string.
    Expanding(Code),
    Done,
    /// A fatal error ended the stream, it is reported on every following call.
    Failed(LzwError),
}

struct DecodeState<S: Source> {
    config: Configuration,
    /// The table of decoded codes.
    dict: Dictionary,
    phase: Phase,
    /// The string of the last code, possibly partially written out.
    buffer: Vec<u8>,
    read_mark: usize,
    /// If no more input follows what was already given.
    input_ended: bool,
    /// The bit buffer for decoding.
    source: S,
}

impl Decoder {
    /// Create a new decoder for the given dialect.
    pub fn new(config: Configuration) -> Self {
        type Boxed = Box<dyn Stateful + Send + 'static>;
        let state = match config.bit_order() {
            BitOrder::Lsb => Box::new(DecodeState::<LsbSource>::new(config)) as Boxed,
            BitOrder::Msb => Box::new(DecodeState::<MsbSource>::new(config)) as Boxed,
        };

        Decoder { state }
    }

    /// Decode some bytes from `inp` and write result to `out`.
    ///
    /// This will consume a prefix of the input buffer and write decoded output into a prefix of
    /// the output buffer. See the respective fields of the return value for the count of
    /// consumed and written bytes. For the next call you should have adjusted the inputs
    /// accordingly.
    ///
    /// The call will try to decode and write as many bytes of output as available. It will be
    /// much more optimized (and avoid intermediate buffering) if it is allowed to write a large
    /// contiguous chunk at once.
    ///
    /// Dialects without a live end code only end after [`finish`] was called and the input
    /// is exhausted.
    ///
    /// [`finish`]: #method.finish
    pub fn decode_bytes(&mut self, inp: &[u8], out: &mut [u8]) -> BufferResult {
        self.state.advance(inp, out)
    }

    /// Construct a decoder into a writer.
    pub fn into_stream<W: Write>(&mut self, writer: W) -> IntoStream<'_, W> {
        IntoStream {
            decoder: self,
            writer,
        }
    }

    /// Construct a decoder into a vector.
    ///
    /// All decoded data is appended and the vector is __not__ cleared.
    pub fn into_vec<'lt>(&'lt mut self, vec: &'lt mut Vec<u8>) -> IntoVec<'lt> {
        IntoVec {
            decoder: self,
            vector: vec,
        }
    }

    /// Decode everything `reader` provides, lazily.
    pub fn into_reader<R: BufRead>(self, reader: R) -> FilterReader<R, Self> {
        stream::open(reader, self)
    }

    /// Mark the input as complete.
    ///
    /// Once all input is consumed, the stream ends if the dialect has no live end code, and is
    /// truncated otherwise.
    pub fn finish(&mut self) {
        self.state.mark_ended();
    }

    /// Check if the decoding has finished.
    ///
    /// No more output is produced beyond the end code.
    pub fn has_ended(&self) -> bool {
        self.state.has_ended()
    }

    /// Reset all internal state.
    ///
    /// This produces a decoder as if just constructed with `new` but taking slightly less work.
    pub fn reset(&mut self) {
        self.state.restart();
    }
}

impl Filter for Decoder {
    fn transform(&mut self, inp: &[u8], out: &mut [u8]) -> BufferResult {
        self.decode_bytes(inp, out)
    }

    fn finish(&mut self) {
        Decoder::finish(self)
    }
}

impl<W: Write> IntoStream<'_, W> {
    /// Decode data from a reader.
    ///
    /// This will read data until the stream is ended by an end code or the reader is empty.
    /// The end of the reader does not end the stream.
    pub fn decode(&mut self, read: impl BufRead) -> StreamResult {
        stream::pump(&mut *self.decoder, read, &mut self.writer, false)
    }

    /// Decode data from a reader, which contains the complete stream.
    pub fn decode_all(mut self, read: impl BufRead) -> StreamResult {
        stream::pump(&mut *self.decoder, read, &mut self.writer, true)
    }
}

impl IntoVec<'_> {
    /// Decode data from a slice.
    pub fn decode(&mut self, read: &[u8]) -> VectorResult {
        stream::extend(&mut *self.decoder, read, self.vector, false)
    }

    /// Decode data from a slice, which contains the complete stream.
    pub fn decode_all(self, read: &[u8]) -> VectorResult {
        stream::extend(&mut *self.decoder, read, self.vector, true)
    }
}

impl<S: Source> DecodeState<S> {
    fn new(config: Configuration) -> Self {
        DecodeState {
            config,
            dict: Dictionary::new(config),
            phase: Phase::Idle,
            buffer: Vec::new(),
            read_mark: 0,
            input_ended: false,
            source: S::new(),
        }
    }

    /// Interpret one code word.
    fn next_code(&mut self, code: Code) -> Result<(), LzwError> {
        if Some(code) == self.config.eof_code() {
            log::debug!("end code after {:#x} dictionary codes", self.dict.next_code());
            self.phase = Phase::Done;
            return Ok(());
        }

        if Some(code) == self.config.reset_code() {
            log::trace!("reset code at {:#x}", self.dict.next_code());
            self.reset_dictionary();
            return Ok(());
        }

        self.buffer.clear();
        self.read_mark = 0;

        match self.phase {
            Phase::Idle => {
                // No previous string, nothing to learn from.
                self.dict.lookup(code, &mut self.buffer)?;
                self.phase = Phase::Expanding(code);
            }
            Phase::Expanding(prev) => {
                let first = if u32::from(code) == self.dict.next_code() && !self.dict.is_full() {
                    // The code the encoder created from our previous string and its own first
                    // byte, right before using it.
                    self.dict.lookup(prev, &mut self.buffer)?;
                    let first = self.dict.first_byte(prev);
                    self.buffer.push(first);
                    first
                } else {
                    self.dict.lookup(code, &mut self.buffer)?;
                    self.dict.first_byte(code)
                };

                self.phase = Phase::Expanding(code);
                self.learn(prev, first);
            }
            Phase::Done | Phase::Failed(_) => {}
        }

        Ok(())
    }

    /// Add the entry of the previous string extended by `first`.
    fn learn(&mut self, prev: Code, first: u8) {
        let width = self.dict.width();
        if self.dict.append(prev, first).is_none() {
            return;
        }

        if self.dict.is_full() && self.config.resets_when_full() {
            log::trace!("dictionary full, resetting");
            self.reset_dictionary();
        } else if self.dict.width() != width {
            log::trace!("code width grows to {} bits", self.dict.width());
        }
    }

    fn reset_dictionary(&mut self) {
        self.dict.reset();
        self.phase = Phase::Idle;
    }

    /// Decide how the stream ends once no further code word can be read.
    fn end_of_input(&mut self) -> Result<LzwStatus, LzwError> {
        if !self.input_ended {
            return Ok(LzwStatus::NoProgress);
        }

        // Encoders pad the last code word to a full byte, anything beyond is truncated data.
        if self.config.eof_code().is_none() && self.source.bits() < 8 {
            log::debug!("input ended after {:#x} dictionary codes", self.dict.next_code());
            self.phase = Phase::Done;
            Ok(LzwStatus::Done)
        } else {
            Err(LzwError::UnexpectedEndOfStream)
        }
    }

    fn fail(&mut self, err: LzwError) -> Result<LzwStatus, LzwError> {
        log::debug!("stream failed: {}", err);
        self.phase = Phase::Failed(err);
        Err(err)
    }
}

impl<S: Source> Stateful for DecodeState<S> {
    fn advance(&mut self, mut inp: &[u8], mut out: &mut [u8]) -> BufferResult {
        let o_in = inp.len();
        let o_out = out.len();
        let mut status = Ok(LzwStatus::Ok);

        loop {
            let remain = &self.buffer[self.read_mark..];
            let count = remain.len().min(out.len());
            let (into, tail) = core::mem::replace(&mut out, &mut []).split_at_mut(count);
            into.copy_from_slice(&remain[..count]);
            self.read_mark += count;
            out = tail;

            if self.read_mark < self.buffer.len() {
                // The output is full.
                break;
            }

            match self.phase {
                Phase::Done => {
                    status = Ok(LzwStatus::Done);
                    break;
                }
                Phase::Failed(err) => {
                    status = Err(err);
                    break;
                }
                Phase::Idle | Phase::Expanding(_) => {}
            }

            let width = self.dict.width();
            let code = match self.source.next_code(width, &mut inp) {
                Some(code) => code,
                None => {
                    status = match self.end_of_input() {
                        Err(err) => self.fail(err),
                        ok => ok,
                    };
                    break;
                }
            };

            if let Err(err) = self.next_code(code) {
                status = self.fail(err);
                break;
            }
        }

        if o_in > inp.len() || o_out > out.len() {
            if let Ok(LzwStatus::NoProgress) = status {
                status = Ok(LzwStatus::Ok);
            }
        }

        BufferResult {
            consumed_in: o_in - inp.len(),
            consumed_out: o_out - out.len(),
            status,
        }
    }

    fn mark_ended(&mut self) -> bool {
        core::mem::replace(&mut self.input_ended, true)
    }

    fn has_ended(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }

    fn restart(&mut self) {
        self.dict.reset();
        self.phase = Phase::Idle;
        self.buffer.clear();
        self.read_mark = 0;
        self.input_ended = false;
        self.source.reset();
    }
}
