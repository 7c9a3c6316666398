//! inox - run a checked, compiled Inox program from its JSON AST.

use clap::{Parser, Subcommand};
use inox_cli::RunConfig;
use inox_context::{Limits, PermissionSet};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "inox")]
#[command(about = "Inox core runtime CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check, compile and run a program's entry point.
    Run {
        /// Path to a JSON-encoded AST (inox_ast::Program).
        program: PathBuf,

        /// Name of the function to run.
        #[arg(long, default_value = "main")]
        entry: String,

        /// Optional TOML file granting permissions and bucket limits.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("inox_cli=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run {
            program,
            entry,
            config,
        } => run(&program, &entry, config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(program: &std::path::Path, entry: &str, config: Option<&std::path::Path>) -> Result<(), inox_cli::error::CliError> {
    let (permissions, limits) = match config {
        Some(path) => {
            let run_config = RunConfig::load(path)?;
            (run_config.permission_set(), run_config.limits())
        }
        None => (PermissionSet::new(), Limits::new()),
    };

    let source = std::fs::read_to_string(program)?;
    let result = inox_cli::run_program(&source, entry, permissions, limits)?;
    println!("{result:?}");
    Ok(())
}
