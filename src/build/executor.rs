//! Runs a compiler command.
//!
//! Child output goes straight to the terminal. A failed compilation removes
//! its target so an old artifact never passes for a fresh one.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use crate::error::BuildError;

/// Result of a process that was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub exit_code: i32,
    pub elapsed: Duration,
}

impl Outcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Spawns `argv` with inherited stdio and waits for it.
pub fn spawn(argv: &[String], current_dir: Option<&Path>) -> Result<Outcome, BuildError> {
    let (program, args) = argv.split_first().ok_or_else(|| BuildError::Launch {
        program: String::new(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
    })?;
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }

    let start = Instant::now();
    let status = cmd.status().map_err(|source| BuildError::Launch {
        program: program.clone(),
        source,
    })?;
    Ok(Outcome {
        // Killed by a signal: no code, still a failure.
        exit_code: status.code().unwrap_or(1),
        elapsed: start.elapsed(),
    })
}

/// Runs a compilation that should produce `artifact`.
pub fn execute(argv: &[String], artifact: &Path) -> Result<Outcome, BuildError> {
    let outcome = spawn(argv, None)?;
    if !outcome.success() && artifact.exists() {
        fs::remove_file(artifact)?;
    }
    Ok(outcome)
}
