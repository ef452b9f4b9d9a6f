//! `rp` — compress and decompress files with the Re-Pair grammar.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::info;

use repair_rs::{compress, read_archive, write_archive};

#[derive(Parser, Debug)]
#[command(name = "rp", version, about = "Re-Pair grammar compressor")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase verbosity (-v for debug, -vv for trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence all log output.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compress a file (default output: INPUT.rp).
    #[command(name = "c")]
    Compress {
        input: PathBuf,
        output: Option<PathBuf>,
    },

    /// Decompress an archive (default output: INPUT without .rp).
    #[command(name = "d")]
    Decompress {
        input: PathBuf,
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => stderrlog::LogLevelNum::Info,
        1 => stderrlog::LogLevelNum::Debug,
        _ => stderrlog::LogLevelNum::Trace,
    };
    stderrlog::new()
        .quiet(cli.quiet)
        .verbosity(level)
        .init()
        .ok();

    let result = match cli.command {
        Command::Compress { input, output } => {
            let output = output.unwrap_or_else(|| compressed_name(&input));
            run_compress(&input, &output)
        }
        Command::Decompress { input, output } => {
            let output = output.unwrap_or_else(|| decompressed_name(&input));
            run_decompress(&input, &output)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rp: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_compress(input: &Path, output: &Path) -> repair_rs::Result<()> {
    info!("compressing {} -> {}", input.display(), output.display());

    let data = std::fs::read(input)?;
    let grammar = compress(&data)?;

    let stats = grammar.stats();
    info!(
        "{} rules, {} top symbols, {:.1}% of input symbols",
        stats.rules,
        stats.sequence_len,
        stats.compression_ratio(data.len())
    );

    let mut sink = BufWriter::new(File::create(output)?);
    write_archive(&grammar, &mut sink)?;
    sink.flush()?;
    Ok(())
}

fn run_decompress(input: &Path, output: &Path) -> repair_rs::Result<()> {
    info!("decompressing {} -> {}", input.display(), output.display());

    let archive = File::open(input)?;
    let grammar = read_archive(std::io::BufReader::new(archive))?;

    let mut sink = BufWriter::new(File::create(output)?);
    grammar.expand_into(&mut sink)?;
    sink.flush()?;
    Ok(())
}

/// Compression appends `.rp` to the input name.
fn compressed_name(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".rp");
    PathBuf::from(name)
}

/// Decompression strips a `.rp` extension when present, otherwise appends
/// `.decompressed`.
fn decompressed_name(input: &Path) -> PathBuf {
    if input.extension().is_some_and(|e| e == "rp") {
        input.with_extension("")
    } else {
        let mut name = input.as_os_str().to_owned();
        name.push(".decompressed");
        PathBuf::from(name)
    }
}
