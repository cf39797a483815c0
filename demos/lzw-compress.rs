//! Compresses the input from stdin and writes the result to stdout.
//!
//! Uses 9 to 12 bit codes, most significant bit first, with an end code.

use std::io::{self, BufWriter};

use polylzw::{Configuration, Encoder, Flags};

fn main() {
    match (|| -> io::Result<()> {
        let flags = Flags::BIG_ENDIAN_BITS | Flags::EOF_CODE_VALID;
        let config = Configuration::new(9, 12, 0x101, 0x100, 0, flags)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        let mut encoder = Encoder::new(config);
        let stdin = io::stdin();
        let stdin = stdin.lock();
        let stdout = io::stdout();
        let stdout = BufWriter::new(stdout.lock());
        encoder.into_stream(stdout).encode_all(stdin).status?;
        Ok(())
    })() {
        Ok(()) => (),
        Err(err) => eprintln!("{}", err),
    }
}
