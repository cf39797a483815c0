//! Plumbing between byte streams and the coders.
//!
//! A [`Filter`] turns one byte sequence into another in bounded steps. The encoder and the
//! decoder are both filters, so the adapters here serve either direction: pumping a reader into
//! a writer, appending to a vector, or wrapping a reader as a lazily filtered [`Read`].
use std::io::{self, BufRead, Read, Write};

use crate::{BufferResult, LzwError, LzwStatus};

/// A coder that can be placed between two byte streams.
pub trait Filter {
    /// Process some bytes of `inp` into `out`.
    fn transform(&mut self, inp: &[u8], out: &mut [u8]) -> BufferResult;
    /// Mark the input as complete.
    fn finish(&mut self);
}

impl<F: Filter + ?Sized> Filter for &'_ mut F {
    fn transform(&mut self, inp: &[u8], out: &mut [u8]) -> BufferResult {
        (**self).transform(inp, out)
    }

    fn finish(&mut self) {
        (**self).finish()
    }
}

/// The result of a coding operation on a pair of reader and writer.
#[must_use]
pub struct StreamResult {
    /// The total number of bytes consumed from the reader.
    pub bytes_read: usize,
    /// The total number of bytes written into the writer.
    pub bytes_written: usize,
    /// The possible error that occurred.
    ///
    /// Note that when writing into streams it is not in general possible to recover from an
    /// error.
    pub status: io::Result<()>,
}

/// The result of coding into a vector.
#[must_use]
pub struct VectorResult {
    /// The number of bytes consumed from the input slice.
    pub consumed_in: usize,
    /// The number of bytes appended to the vector.
    pub consumed_out: usize,
    /// The status after returning from the call.
    pub status: Result<LzwStatus, LzwError>,
}

/// A reader of the filtered contents of another reader.
///
/// See [`open`]. The sequence is produced lazily and only once.
pub struct FilterReader<R, F> {
    inner: R,
    filter: F,
    done: bool,
    /// The error that ended the stream, held back until the bytes produced before it were
    /// returned and reported on every read after.
    failed: Option<LzwError>,
}

const CHUNK: usize = 1 << 16;

/// Filter all data of `reader` through `filter`.
///
/// Nothing is read before the first call to `read`. Bytes already returned stay valid when an
/// error is reported later.
pub fn open<R: BufRead, F: Filter>(reader: R, filter: F) -> FilterReader<R, F> {
    FilterReader {
        inner: reader,
        filter,
        done: false,
        failed: None,
    }
}

impl<R, F> FilterReader<R, F> {
    /// Unwrap the underlying reader and filter.
    pub fn into_inner(self) -> (R, F) {
        (self.inner, self.filter)
    }
}

impl<R: BufRead, F: Filter> Read for FilterReader<R, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(err) = self.failed {
            return Err(err.into());
        }

        loop {
            if self.done || buf.is_empty() {
                return Ok(0);
            }

            let data = self.inner.fill_buf()?;
            let at_end = data.is_empty();
            if at_end {
                self.filter.finish();
            }

            let result = self.filter.transform(data, buf);
            self.inner.consume(result.consumed_in);
            let written = result.consumed_out;

            match result.status {
                Err(err) => {
                    self.failed = Some(err);
                    return if written > 0 { Ok(written) } else { Err(err.into()) };
                }
                Ok(LzwStatus::Done) => {
                    self.done = true;
                    return Ok(written);
                }
                Ok(LzwStatus::NoProgress) => return Err(no_end_marker()),
                Ok(LzwStatus::Ok) if written > 0 => return Ok(written),
                Ok(LzwStatus::Ok) if at_end && result.consumed_in == 0 => {
                    return Err(no_end_marker())
                }
                Ok(LzwStatus::Ok) => {}
            }
        }
    }
}

fn no_end_marker() -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "No more data but no end marker detected",
    )
}

/// Drain `read` through `filter` into `write`.
///
/// With `finish` the end of the reader is the end of the stream, otherwise coding stops once
/// the reader is empty and can be continued later.
pub(crate) fn pump<F: Filter + ?Sized>(
    filter: &mut F,
    mut read: impl BufRead,
    mut write: impl Write,
    finish: bool,
) -> StreamResult {
    enum Progress {
        Ok,
        Done,
    }

    let mut bytes_read = 0;
    let mut bytes_written = 0;

    let read_bytes = &mut bytes_read;
    let write_bytes = &mut bytes_written;

    let mut outbuf = vec![0; CHUNK];
    let once = move || {
        let data = read.fill_buf()?;

        if data.is_empty() {
            if finish {
                filter.finish();
            } else {
                return Ok(Progress::Done);
            }
        }

        let result = filter.transform(data, &mut outbuf[..]);
        *read_bytes += result.consumed_in;
        *write_bytes += result.consumed_out;
        read.consume(result.consumed_in);

        // Everything decoded before an error is still handed out.
        write.write_all(&outbuf[..result.consumed_out])?;
        let done = result.status.map_err(io::Error::from)?;

        match done {
            LzwStatus::Done => Ok(Progress::Done),
            LzwStatus::NoProgress => Err(no_end_marker()),
            LzwStatus::Ok => Ok(Progress::Ok),
        }
    };

    let status = core::iter::repeat_with(once)
        // scan+fuse can be replaced with map_while
        .scan((), |(), result| match result {
            Ok(Progress::Ok) => Some(Ok(())),
            Err(err) => Some(Err(err)),
            Ok(Progress::Done) => None,
        })
        .fuse()
        .collect();

    StreamResult {
        bytes_read,
        bytes_written,
        status,
    }
}

/// Code `data` into the end of `vec`.
pub(crate) fn extend<F: Filter + ?Sized>(
    filter: &mut F,
    mut data: &[u8],
    vec: &mut Vec<u8>,
    finish: bool,
) -> VectorResult {
    if finish {
        filter.finish();
    }

    let mut consumed_in = 0;
    let mut consumed_out = 0;
    let status = loop {
        let start = vec.len();
        vec.resize(start + CHUNK, 0);
        let result = filter.transform(data, &mut vec[start..]);
        vec.truncate(start + result.consumed_out);

        consumed_in += result.consumed_in;
        consumed_out += result.consumed_out;
        data = &data[result.consumed_in..];

        match result.status {
            Ok(LzwStatus::Ok) if !data.is_empty() || result.consumed_out > 0 => continue,
            Ok(LzwStatus::Ok) if finish && result.consumed_in > 0 => continue,
            Ok(LzwStatus::Ok) => break Ok(LzwStatus::Ok),
            other => break other,
        }
    };

    VectorResult {
        consumed_in,
        consumed_out,
        status,
    }
}
