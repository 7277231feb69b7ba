//! Skema Compiler CLI
//!
//! `skmc <input.skm> [output.c]` - with an output path, compile to C; with
//! none, compile, build with the host C compiler, run, and forward the exit
//! code.

use clap::Parser as ClapParser;
use std::path::PathBuf;
use std::process;

use skmc::{CompilerConfig, Verbosity};

#[derive(ClapParser)]
#[command(name = "skmc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Skema compiler - compile .skm programs to C", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Enable debug output (implies verbose)
    #[arg(short = 'd', long)]
    debug: bool,

    /// Input Skema source file
    input: PathBuf,

    /// Output C file (if not provided, compiles and runs)
    output: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let verbosity = if cli.debug {
        Verbosity::Debug
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };
    let config = CompilerConfig::new().with_verbosity(verbosity);

    match &cli.output {
        Some(output) => match skmc::compile_file(&cli.input, Some(output), &config) {
            Ok(()) => {
                println!(
                    "Compiled {} -> {}",
                    cli.input.display(),
                    output.display()
                );
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        None => match skmc::compile_and_run(&cli.input, &config) {
            Ok(code) => process::exit(code),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
    }
}
