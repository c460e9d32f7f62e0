//! mcc CLI.
//!
//! Compiles one source file (or an inline source string) and writes the
//! assembly to stdout. Diagnostics go to stderr; the exit status is
//! non-zero on any error.

use clap::{CommandFactory, Parser as ClapParser};
use clap_complete::{Shell, generate};
use mcc::Syntax;
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "mcc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile a small subset of C to x86-64 GNU assembly", long_about = None)]
struct Cli {
    /// Input source file
    input: Option<PathBuf>,

    /// Compile an inline source string instead of a file
    #[arg(short = 'c', value_name = "CODE", conflicts_with = "input")]
    inline: Option<String>,

    /// Assembly flavor to emit (intel or att)
    #[arg(long, default_value = "intel")]
    syntax: Syntax,

    /// Generate a shell completion script and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "mcc", &mut io::stdout());
        return;
    }

    let result = match (&cli.inline, &cli.input) {
        (Some(code), _) => mcc::compile_source(code, cli.syntax),
        (None, Some(path)) => mcc::compile_file(path, cli.syntax),
        (None, None) => {
            eprintln!("mcc: no input; pass a source file or -c CODE");
            process::exit(1);
        }
    };

    match result {
        Ok(assembly) => print!("{}", assembly),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}
