#![forbid(unsafe_code)]
use std::path::PathBuf;
use std::{env, ffi, fs, io, process};

use polylzw::{Code, Configuration, Decoder, Encoder, Flags};

fn main() -> CodingResult {
    pretty_env_logger::init();
    CodingResult::catch_panic(|| {
        let options = Options::from_args(env::args_os()).unwrap_or_else(|ParamError| explain());
        run_coding(options)
    })
}

fn run_coding(options: Options) -> Result<(), io::Error> {
    let config = options.configuration()?;
    log::debug!("{:?}", config);

    let out = io::stdout();
    let out = out.lock();

    let input: Box<dyn io::BufRead> = match options.input {
        Input::File(file) => {
            let data = fs::File::open(file)?;
            Box::new(io::BufReader::with_capacity(1 << 20, data))
        }
        Input::Stdin => Box::new(io::BufReader::with_capacity(1 << 20, io::stdin())),
    };

    match options.operation {
        Operation::Encode => {
            let mut encoder = if options.literal {
                Encoder::with_literal_codes(config)
            } else {
                Encoder::new(config)
            };
            encoder.into_stream(out).encode_all(input).status
        }
        Operation::Decode => {
            let mut decoder = Decoder::new(config);
            decoder.into_stream(out).decode_all(input).status
        }
    }
}

struct Options {
    input: Input,
    operation: Operation,
    initial_bits: u8,
    max_bits: u8,
    first_code: Code,
    eof_code: Code,
    reset_code: Code,
    flags: Flags,
    literal: bool,
}

struct ParamError;

#[derive(Debug)]
enum Input {
    File(PathBuf),
    Stdin,
}

#[derive(Debug)]
enum Operation {
    Encode,
    Decode,
}

fn explain<T>() -> T {
    println!(
        "Usage: lzw [-e|-d] [options] <file>\n\
        Arguments:\n\
        -e\t operation encode\n\
        -d\t operation decode\n\
        <file>\tfilepath or '-' for stdin\n\
        See --help for the dialect options."
    );
    process::exit(1);
}

impl Default for Options {
    fn default() -> Options {
        Options {
            input: Input::Stdin,
            operation: Operation::Encode,
            initial_bits: 9,
            max_bits: 12,
            first_code: 0x101,
            eof_code: 0x100,
            reset_code: 0,
            flags: Flags::BIG_ENDIAN_BITS | Flags::EOF_CODE_VALID,
            literal: false,
        }
    }
}

fn parse_code(value: &str) -> Result<Code, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => Code::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|err| format!("not a code value: {}", err))
}

fn command() -> clap::Command<'static> {
    clap::Command::new("lzw")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compress and decompress legacy LZW streams")
        .arg(
            clap::Arg::new("decode")
                .short('d')
                .long("decode")
                .takes_value(false),
        )
        .arg(
            clap::Arg::new("encode")
                .short('e')
                .long("encode")
                .takes_value(false),
        )
        .group(
            clap::ArgGroup::new("operation")
                .args(&["decode", "encode"])
                .multiple(false)
                .required(true),
        )
        .arg(
            clap::Arg::new("initial_bits")
                .long("initial-bits")
                .takes_value(true)
                .value_parser(clap::value_parser!(u8).range(9..=16)),
        )
        .arg(
            clap::Arg::new("max_bits")
                .long("max-bits")
                .takes_value(true)
                .value_parser(clap::value_parser!(u8).range(9..=16)),
        )
        .arg(
            clap::Arg::new("first_code")
                .long("first-code")
                .takes_value(true)
                .value_parser(parse_code),
        )
        .arg(
            clap::Arg::new("eof_code")
                .long("eof-code")
                .takes_value(true)
                .value_parser(parse_code),
        )
        .arg(
            clap::Arg::new("reset_code")
                .long("reset-code")
                .takes_value(true)
                .value_parser(parse_code),
        )
        .arg(
            clap::Arg::new("bit_order")
                .short('b')
                .long("bit-order")
                .takes_value(true)
                .value_parser(["l", "m", "least", "most"]),
        )
        .arg(
            clap::Arg::new("no_eof")
                .long("no-eof")
                .takes_value(false)
                .help("The stream has no end code"),
        )
        .arg(
            clap::Arg::new("reset")
                .long("reset")
                .takes_value(false)
                .help("The reset code is meaningful"),
        )
        .arg(
            clap::Arg::new("reset_on_full")
                .long("reset-on-full")
                .takes_value(false)
                .help("Reset the dictionary implicitly once it is full"),
        )
        .arg(
            clap::Arg::new("literal")
                .long("literal")
                .takes_value(false)
                .help("Encode every byte as its own code"),
        )
        .arg(
            clap::Arg::new("file")
                .default_value("-")
                .value_parser(clap::builder::ValueParser::path_buf()),
        )
}

impl Options {
    fn from_args(mut args: impl Iterator<Item = ffi::OsString>) -> Result<Self, ParamError> {
        let mut options = Options::default();
        let matches = command().get_matches_from(args.by_ref());

        if matches.contains_id("decode") {
            options.operation = Operation::Decode;
        } else if matches.contains_id("encode") {
            options.operation = Operation::Encode;
        }

        if let Some(&bits) = matches.get_one::<u8>("initial_bits") {
            options.initial_bits = bits;
        }

        if let Some(&bits) = matches.get_one::<u8>("max_bits") {
            options.max_bits = bits;
        }

        if let Some(&code) = matches.get_one::<Code>("first_code") {
            options.first_code = code;
        }

        if let Some(&code) = matches.get_one::<Code>("eof_code") {
            options.eof_code = code;
        }

        if let Some(&code) = matches.get_one::<Code>("reset_code") {
            options.reset_code = code;
        }

        match matches.get_one::<String>("bit_order").map(String::as_str) {
            Some("m") | Some("most") => options.flags.insert(Flags::BIG_ENDIAN_BITS),
            Some("l") | Some("least") => options.flags.remove(Flags::BIG_ENDIAN_BITS),
            Some(_) => return Err(ParamError),
            None => {}
        }

        options.flags.set(Flags::EOF_CODE_VALID, !matches.contains_id("no_eof"));
        options.flags.set(Flags::RESET_CODE_VALID, matches.contains_id("reset"));
        options.flags.set(Flags::RESET_FULL_DICT, matches.contains_id("reset_on_full"));
        options.literal = matches.contains_id("literal");

        match matches.get_one::<PathBuf>("file") {
            None => options.input = Input::Stdin,
            Some(p) if *p == PathBuf::from("-") => options.input = Input::Stdin,
            Some(p) => options.input = Input::File(p.clone()),
        }

        Ok(options)
    }

    fn configuration(&self) -> Result<Configuration, io::Error> {
        Configuration::new(
            self.initial_bits,
            self.max_bits,
            self.first_code,
            self.eof_code,
            self.reset_code,
            self.flags,
        )
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))
    }
}

enum CodingResult {
    Ok,
    Err(io::Error),
    Panic,
}

impl CodingResult {
    fn catch_panic(op: fn() -> Result<(), io::Error>) -> Self {
        std::panic::catch_unwind(|| match op() {
            Ok(()) => CodingResult::Ok,
            Err(err) => CodingResult::Err(err),
        })
        .unwrap_or(CodingResult::Panic)
    }
}

impl std::process::Termination for CodingResult {
    fn report(self) -> std::process::ExitCode {
        match self {
            CodingResult::Ok => std::process::ExitCode::SUCCESS,
            CodingResult::Err(err) => {
                log::error!("{}", err);
                eprintln!("{}", err);
                std::process::ExitCode::FAILURE
            }
            CodingResult::Panic => {
                eprintln!(
                    "The process failed irrecoverably! This should never happen and is a bug."
                );
                std::process::ExitCode::from(128)
            }
        }
    }
}
