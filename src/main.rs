//! svnorm: structural variant VCF normalizer
//!
//! Usage: svnorm --input <VCF> --config <YAML> [OPTIONS]

use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use svnorm::commands::NormalizeCommand;
use svnorm::config::Configuration;
use svnorm::notation::Notation;
use svnorm::vcf::VcfError;

#[derive(Parser)]
#[command(name = "svnorm")]
#[command(version)]
#[command(about = "Normalize structural variant VCFs from different callers to one schema", long_about = None)]
struct Cli {
    /// Input VCF file, optionally gzip/bgzip compressed (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// YAML configuration describing the output fields
    #[arg(short, long)]
    config: PathBuf,

    /// Output VCF file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not write the ##fileDate header line
    #[arg(long, alias = "nd")]
    nodate: bool,

    /// Convert records to this notation
    #[arg(short, long, value_enum)]
    notation: Option<NotationArg>,

    /// Do not log warnings
    #[arg(long, alias = "mw")]
    mute_warnings: bool,

    /// Log progress details
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum NotationArg {
    /// One record per event with END and CHR2
    Breakpoint,
    /// Two mated BND records per event
    Breakend,
}

impl From<NotationArg> for Notation {
    fn from(arg: NotationArg) -> Self {
        match arg {
            NotationArg::Breakpoint => Notation::Breakpoint,
            NotationArg::Breakend => Notation::Breakend,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.mute_warnings);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool, mute_warnings: bool) {
    let default_level = if verbose {
        "debug"
    } else if mute_warnings {
        "error"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), VcfError> {
    let config = Configuration::from_path(&cli.config)?;

    let cmd = NormalizeCommand::new()
        .with_notation(cli.notation.map(Notation::from).unwrap_or_default())
        .with_no_date(cli.nodate)
        .with_mute_warnings(cli.mute_warnings);

    match cli.output {
        Some(path) => {
            let file = File::create(&path).map_err(|e| {
                VcfError::Io(io::Error::new(
                    e.kind(),
                    format!("Failed to create the output file {}: {}", path.display(), e),
                ))
            })?;
            cmd.run(&cli.input, &config, file)?;
        }
        None => {
            let stdout = io::stdout();
            cmd.run(&cli.input, &config, stdout.lock())?;
        }
    }

    Ok(())
}
