//! Decompresses the input from stdin and writes the result to stdout.
//!
//! Reads the dialect written by the `lzw-compress` example.

use std::io::{self, BufWriter};

use polylzw::{Configuration, Decoder, Flags};

fn main() {
    match (|| -> io::Result<()> {
        let flags = Flags::BIG_ENDIAN_BITS | Flags::EOF_CODE_VALID;
        let config = Configuration::new(9, 12, 0x101, 0x100, 0, flags)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        let decoder = Decoder::new(config);
        let stdin = io::stdin();
        let mut reader = decoder.into_reader(stdin.lock());
        let stdout = io::stdout();
        let mut stdout = BufWriter::new(stdout.lock());
        io::copy(&mut reader, &mut stdout)?;
        Ok(())
    })() {
        Ok(()) => (),
        Err(err) => eprintln!("{}", err),
    }
}
