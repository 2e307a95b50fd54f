//! Worker launcher backed by `std::process`.

use crate::backend::ProcessLauncher;
use crate::error::{Error, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// Launches the worker binary as a child process.
///
/// The worker runs with the sandbox as its working directory and inherits
/// stdio so its own console output reaches the operator.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerLauncher;

impl WorkerLauncher {
    /// Create a new WorkerLauncher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for WorkerLauncher {
    fn execute(&self, worker: &Path, arguments: &str) -> Result<i32> {
        let args = split_arguments(arguments);
        log::debug!("Executing {} with {} arguments", worker.display(), args.len());

        let mut command = Command::new(worker);
        command
            .args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = worker.parent() {
            command.current_dir(dir);
        }

        let status = command.status().map_err(|source| Error::Launch {
            worker: worker.to_path_buf(),
            source,
        })?;

        status.code().ok_or_else(|| Error::WorkerTerminated {
            worker: worker.to_path_buf(),
        })
    }
}

/// Split a joined argument string the way a Windows-style command line is
/// read: whitespace separates arguments except inside double quotes, and the
/// quotes themselves are dropped.
///
/// `"Pkg 1" Param:"a b"` becomes `Pkg 1` and `Param:a b`.
pub fn split_arguments(arguments: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in arguments.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }

    args
}
