//! Errors surfaced by the CLI's own glue code (config loading, compilation).
//! Checker diagnostics and VM errors are reported through their own types;
//! this enum only covers what belongs to this crate.

use std::fmt;

#[derive(Debug)]
pub enum CliError {
    Io(std::io::Error),
    Config(toml::de::Error),
    Json(serde_json::Error),
    Compile(crate::compile::CompileError),
    Checked(inox_checker::Diagnostics),
    Run(inox_vm::VmError),
    MissingEntryPoint(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "i/o error: {e}"),
            CliError::Config(e) => write!(f, "invalid config: {e}"),
            CliError::Json(e) => write!(f, "invalid program json: {e}"),
            CliError::Compile(e) => write!(f, "compile error: {e}"),
            CliError::Checked(diagnostics) => {
                writeln!(f, "program has {} error(s):", diagnostics.len())?;
                for d in diagnostics.iter() {
                    writeln!(f, "  {d}")?;
                }
                Ok(())
            }
            CliError::Run(e) => write!(f, "runtime error: {e}"),
            CliError::MissingEntryPoint(name) => write!(f, "no function named `{name}` to run"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<toml::de::Error> for CliError {
    fn from(e: toml::de::Error) -> Self {
        CliError::Config(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

impl From<crate::compile::CompileError> for CliError {
    fn from(e: crate::compile::CompileError) -> Self {
        CliError::Compile(e)
    }
}

impl From<inox_vm::VmError> for CliError {
    fn from(e: inox_vm::VmError) -> Self {
        CliError::Run(e)
    }
}
