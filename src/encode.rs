//! A module for all encoding needs.
use std::io::{BufRead, Write};

use crate::bits::{Buffer, LsbBuffer, MsbBuffer};
use crate::dictionary::Dictionary;
use crate::stream::{self, Filter, FilterReader, StreamResult, VectorResult};
use crate::{BitOrder, BufferResult, Code, Configuration, LzwStatus};

/// The state for encoding data with a LZW algorithm.
///
/// The same structure can be utilized with streams as well as your own buffers and driver logic.
/// It may even be possible to mix them if you are sufficiently careful not to lose any written
/// data in the process.
pub struct Encoder {
    state: Box<dyn Stateful + Send + 'static>,
}

/// A encoding stream sink.
///
/// See [`Encoder::into_stream`] on how to create this type.
pub struct IntoStream<'d, W> {
    encoder: &'d mut Encoder,
    writer: W,
}

/// An encoding sink into a vector.
///
/// See [`Encoder::into_vec`] on how to create this type.
pub struct IntoVec<'d> {
    encoder: &'d mut Encoder,
    vector: &'d mut Vec<u8>,
}

trait Stateful {
    fn advance(&mut self, inp: &[u8], out: &mut [u8]) -> BufferResult;
    fn mark_ended(&mut self) -> bool;
    fn has_ended(&self) -> bool;
    fn restart(&mut self);
}

/// How input bytes are turned into code words.
#[derive(Clone, Copy, Debug)]
enum Strategy {
    /// Emit the code of the longest known string.
    Greedy,
    /// Emit every byte as its literal code.
    Literal,
}

#[derive(Clone, Copy, Debug)]
enum Phase {
    /// No string is pending.
    Idle,
    /// The code of the longest matched string so far.
    Matching(Code),
    /// All code words are buffered, some bytes may not have been written yet.
    Flushing,
    Done,
}

struct EncodeState<B: Buffer> {
    config: Configuration,
    strategy: Strategy,
    /// The current encoding dictionary.
    dict: Dictionary,
    phase: Phase,
    /// If the input has been marked as complete.
    has_ended: bool,
    /// The next code of the decoder's dictionary.
    ///
    /// The decoder learns each entry one code word after we do. Code widths and resets follow
    /// the decoder, otherwise it would read code words at the wrong width.
    decoder_next: u32,
    /// If the decoder has read a code word since the last reset.
    decoder_primed: bool,
    /// The bit buffer for encoding.
    buffer: B,
}

impl Encoder {
    /// Create a new encoder that emits the code of the longest matching dictionary string.
    pub fn new(config: Configuration) -> Self {
        Self::with_strategy(config, Strategy::Greedy)
    }

    /// Create an encoder that emits every byte as its own literal code word.
    ///
    /// The dictionary still grows exactly as in the decoder so that code widths and resets
    /// follow the configuration. Some legacy encoders produce such streams and this reproduces
    /// them bit for bit. Any decoder of the same configuration reads the result.
    pub fn with_literal_codes(config: Configuration) -> Self {
        Self::with_strategy(config, Strategy::Literal)
    }

    fn with_strategy(config: Configuration, strategy: Strategy) -> Self {
        type Boxed = Box<dyn Stateful + Send + 'static>;
        let state = match config.bit_order() {
            BitOrder::Lsb => Box::new(EncodeState::<LsbBuffer>::new(config, strategy)) as Boxed,
            BitOrder::Msb => Box::new(EncodeState::<MsbBuffer>::new(config, strategy)) as Boxed,
        };

        Encoder { state }
    }

    /// Encode some bytes from `inp` into `out`.
    ///
    /// See [`into_stream`] for high-level functions and [`finish`] for marking the input data
    /// as complete.
    ///
    /// [`into_stream`]: #method.into_stream
    /// [`finish`]: #method.finish
    pub fn encode_bytes(&mut self, inp: &[u8], out: &mut [u8]) -> BufferResult {
        self.state.advance(inp, out)
    }

    /// Construct an encoder into a writer.
    pub fn into_stream<W: Write>(&mut self, writer: W) -> IntoStream<'_, W> {
        IntoStream {
            encoder: self,
            writer,
        }
    }

    /// Construct an encoder into a vector.
    ///
    /// All encoded data is appended and the vector is __not__ cleared.
    pub fn into_vec<'lt>(&'lt mut self, vec: &'lt mut Vec<u8>) -> IntoVec<'lt> {
        IntoVec {
            encoder: self,
            vector: vec,
        }
    }

    /// Encode everything `reader` provides, lazily.
    ///
    /// The returned reader yields the compressed stream including its end code.
    pub fn into_reader<R: BufRead>(self, reader: R) -> FilterReader<R, Self> {
        stream::open(reader, self)
    }

    /// Mark the encoding as finished.
    ///
    /// In following calls to `encode_bytes` the encoder will emit the last pending code and
    /// the end code of the configuration after encoding all of `inp`. The behaviour after the
    /// end marker has been written is unspecified but sound.
    pub fn finish(&mut self) {
        self.state.mark_ended();
    }

    /// Check if the stream has been completely written.
    pub fn has_ended(&self) -> bool {
        self.state.has_ended()
    }

    /// Undo any state and start encoding a new stream.
    pub fn reset(&mut self) {
        self.state.restart()
    }
}

impl Filter for Encoder {
    fn transform(&mut self, inp: &[u8], out: &mut [u8]) -> BufferResult {
        self.encode_bytes(inp, out)
    }

    fn finish(&mut self) {
        Encoder::finish(self)
    }
}

impl<W: Write> IntoStream<'_, W> {
    /// Encode data from a reader.
    ///
    /// This will drain the supplied reader. It will not encode an end marker after all data has
    /// been processed.
    pub fn encode(&mut self, read: impl BufRead) -> StreamResult {
        stream::pump(&mut *self.encoder, read, &mut self.writer, false)
    }

    /// Encode data from a reader and an end marker.
    pub fn encode_all(mut self, read: impl BufRead) -> StreamResult {
        stream::pump(&mut *self.encoder, read, &mut self.writer, true)
    }
}

impl IntoVec<'_> {
    /// Encode data from a slice.
    pub fn encode(&mut self, read: &[u8]) -> VectorResult {
        stream::extend(&mut *self.encoder, read, self.vector, false)
    }

    /// Encode data from a slice and an end marker.
    pub fn encode_all(self, read: &[u8]) -> VectorResult {
        stream::extend(&mut *self.encoder, read, self.vector, true)
    }
}

impl<B: Buffer> EncodeState<B> {
    fn new(config: Configuration, strategy: Strategy) -> Self {
        EncodeState {
            config,
            strategy,
            dict: Dictionary::with_successors(config),
            phase: Phase::Idle,
            has_ended: false,
            decoder_next: u32::from(config.first_code()),
            decoder_primed: false,
            buffer: B::new(),
        }
    }
}

impl<B: Buffer> Stateful for EncodeState<B> {
    fn advance(&mut self, mut inp: &[u8], mut out: &mut [u8]) -> BufferResult {
        let c_in = inp.len();
        let c_out = out.len();

        loop {
            if self.buffer.push_out(&mut out) {
                break;
            }

            if let Phase::Flushing | Phase::Done = self.phase {
                break;
            }

            if inp.is_empty() {
                if self.has_ended {
                    self.buffer_final();
                }
                break;
            }

            // Consume bytes until exactly one code is produced.
            let mut next_code = None;
            let mut bytes = inp.iter();
            while let Some(&byte) = bytes.next() {
                match (self.strategy, self.phase) {
                    (Strategy::Literal, _) => {
                        next_code = Some((Code::from(byte), None));
                        break;
                    }
                    (Strategy::Greedy, Phase::Matching(current)) => {
                        if let Some(code) = self.dict.find(current, byte) {
                            self.phase = Phase::Matching(code);
                        } else {
                            next_code = Some((current, Some(byte)));
                            self.phase = Phase::Matching(Code::from(byte));
                            break;
                        }
                    }
                    (Strategy::Greedy, _) => self.phase = Phase::Matching(Code::from(byte)),
                }
            }

            inp = bytes.as_slice();
            match next_code {
                // No more bytes, no code produced.
                None => break,
                Some((code, extension)) => {
                    self.buffer_code(code);
                    if let Some(byte) = extension {
                        // A full dictionary stays frozen until the decoder resets it.
                        if !self.dict.is_full() {
                            self.dict.append(code, byte);
                        }
                    }
                    self.decoder_learns();
                }
            }
        }

        let mut status = Ok(LzwStatus::Ok);
        if let Phase::Flushing = self.phase {
            if !self.buffer.flush_out(&mut out) {
                self.phase = Phase::Done;
            }
        }

        if let Phase::Done = self.phase {
            status = Ok(LzwStatus::Done);
        }

        BufferResult {
            consumed_in: c_in - inp.len(),
            consumed_out: c_out - out.len(),
            status,
        }
    }

    fn mark_ended(&mut self) -> bool {
        core::mem::replace(&mut self.has_ended, true)
    }

    fn has_ended(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }

    fn restart(&mut self) {
        self.dict.reset();
        self.phase = Phase::Idle;
        self.has_ended = false;
        self.decoder_next = u32::from(self.config.first_code());
        self.decoder_primed = false;
        self.buffer.reset();
    }
}

impl<B: Buffer> EncodeState<B> {
    /// Write a code at the width the decoder will read it with.
    fn buffer_code(&mut self, code: Code) {
        let width = self.config.width_for(self.decoder_next);
        self.buffer.buffer_code(code, width);
    }

    /// Track the entry the decoder adds after reading the last code word.
    fn decoder_learns(&mut self) {
        if !self.decoder_primed {
            // The first code after a reset has no predecessor to extend.
            self.decoder_primed = true;
            return;
        }

        let code_space = self.config.code_space();
        if self.decoder_next >= code_space {
            return;
        }

        self.decoder_next += 1;
        if self.decoder_next == code_space && self.config.resets_when_full() {
            self.reset_dictionary();
        }
    }

    fn reset_dictionary(&mut self) {
        log::trace!("dictionary full at {:#x}, resetting", self.decoder_next);
        self.dict.reset();
        self.decoder_next = u32::from(self.config.first_code());
        self.decoder_primed = false;
        if let Some(reset) = self.config.reset_code() {
            self.buffer_code(reset);
        }
    }

    /// Buffer the pending code and the terminator.
    fn buffer_final(&mut self) {
        if let Phase::Matching(code) = self.phase {
            self.buffer_code(code);
            self.decoder_learns();
        }

        if let Some(end) = self.config.terminator() {
            self.buffer_code(end);
        }

        self.buffer.buffer_pad();
        self.phase = Phase::Flushing;
        log::debug!("encoded stream ends with decoder at code {:#x}", self.decoder_next);
    }
}
