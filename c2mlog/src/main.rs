#[macro_use]
extern crate clap;

use clap::Arg;
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

#[derive(Debug)]
enum IOErrorContext {
    ReadInput,
    WriteOutput,
}

#[derive(Debug)]
enum Error {
    Compile(c2mlog::Error),
    Io(std::io::Error, IOErrorContext, PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, context, path) => writeln!(
                f,
                "{} file \"{}\" failed: {}",
                match context {
                    IOErrorContext::ReadInput => "Reading input",
                    IOErrorContext::WriteOutput => "Writing output",
                },
                path.display(),
                err
            ),
            Error::Compile(err) => {
                writeln!(f, "Compilation failed:")?;
                write!(f, "{}", err)
            }
        }
    }
}

fn main() {
    // Parse command line arguments
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the input file to compile")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("opt_level")
                .short("O")
                .takes_value(true)
                .value_name("LEVEL")
                .possible_values(&["0", "1", "2", "3"])
                .default_value("1")
                .help("Sets the optimization level"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("OUTPUT")
                .help("Sets the output file to write to (defaults to stdout)"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let opt_level = value_t!(matches, "opt_level", u32).unwrap_or_else(|e| e.exit());
    let output = matches.value_of("output");

    if let Err(err) = c2mlog(input, opt_level, output) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn c2mlog(input: &str, opt_level: u32, output: Option<&str>) -> Result<(), Error> {
    let input_path = Path::new(input);

    // Read input file
    let input_file = File::open(input_path)
        .map_err(|err| Error::Io(err, IOErrorContext::ReadInput, input_path.to_owned()))?;
    let mut buf_reader = BufReader::new(input_file);
    let mut source = String::new();

    buf_reader
        .read_to_string(&mut source)
        .map_err(|err| Error::Io(err, IOErrorContext::ReadInput, input_path.to_owned()))?;

    // Compile
    let program = c2mlog::compile(&source, opt_level).map_err(|err| {
        Error::Compile(match input_path.to_str() {
            Some(path_str) => err.with_path(path_str),
            None => err,
        })
    })?;

    // Write output file (or stdout)
    match output {
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            let file = File::create(&path)
                .map_err(|err| Error::Io(err, IOErrorContext::WriteOutput, path.clone()))?;
            let mut writer = BufWriter::new(file);
            writeln!(writer, "{}", program)
                .map_err(|err| Error::Io(err, IOErrorContext::WriteOutput, path))?;
        }
        None => println!("{}", program),
    }
    Ok(())
}
