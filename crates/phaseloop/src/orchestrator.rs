//! Phase loop.
//!
//! The [`Orchestrator`] drives the worker through as many phases as the
//! package asks for. Every iteration:
//!
//! 1. rebuilds the sandbox (a failure ends the run with `-2`)
//! 2. launches the worker with the phase number and blocks until it exits
//! 3. decodes the exit code into a continuation flag and an error count
//!
//! When the worker stops asking for more phases the accumulated result is
//! classified, summarized in the run log and paired with the matching
//! manifest message.

use crate::backend::{FileSystem, ProcessLauncher};
use crate::codec;
use crate::error::{Error, WorkerFailure};
use crate::logger::RunLog;
use crate::sandbox;
use crate::types::{Outcome, RunReport};
use manifest::{MessageKind, PackageManifest};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Pause after each continuing phase so the worker's file handles are
/// released before the sandbox is rebuilt.
pub const DEFAULT_PHASE_DELAY: Duration = Duration::from_millis(2000);

/// Name used in summary lines.
pub const DEFAULT_TOOL_NAME: &str = "pkgexec";

const RULE_WIDTH: usize = 79;

/// What to execute and where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPlan {
    /// Unpacked package directory.
    pub package_path: PathBuf,
    /// Target installation directory.
    pub target_directory: PathBuf,
    /// Directory holding the `run` sandbox.
    pub sandbox_directory: PathBuf,
    /// Quote-normalized `name:"value"` parameters.
    pub parameters: Vec<String>,
    /// Forward `-WAIT` to the worker.
    pub wait: bool,
    /// Forward `-SCHEMA` to the worker.
    pub schema: bool,
}

/// Runs the phase loop against injected capabilities.
pub struct Orchestrator {
    launcher: Box<dyn ProcessLauncher>,
    fs: Box<dyn FileSystem>,
    phase_delay: Duration,
    worker_name: String,
    tool_name: String,
}

impl Orchestrator {
    /// Create an orchestrator with the default phase delay and worker name.
    pub fn new(launcher: Box<dyn ProcessLauncher>, fs: Box<dyn FileSystem>) -> Self {
        Self {
            launcher,
            fs,
            phase_delay: DEFAULT_PHASE_DELAY,
            worker_name: sandbox::default_worker_name(),
            tool_name: DEFAULT_TOOL_NAME.to_string(),
        }
    }

    #[must_use]
    pub fn with_phase_delay(mut self, delay: Duration) -> Self {
        self.phase_delay = delay;
        self
    }

    #[must_use]
    pub fn with_worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }

    #[must_use]
    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = name.into();
        self
    }

    /// Execute phases until the worker stops, then report the outcome.
    pub fn run(&self, plan: &RunPlan, log: &mut RunLog) -> RunReport {
        let mut phase: u32 = 0;
        let mut errors: u32 = 0;
        let mut invocations: u32 = 0;

        let result = loop {
            let worker = match sandbox::build(
                self.fs.as_ref(),
                &plan.target_directory,
                &plan.sandbox_directory,
                &self.worker_name,
            ) {
                Ok(worker) => worker,
                Err(e) => {
                    log.line("ERROR during environment initialization:");
                    log.error(&e);
                    break -2;
                }
            };

            let arguments = worker_arguments(plan, phase, log);
            log::debug!("Phase {phase}: {} {arguments}", worker.display());

            invocations += 1;
            let code = match self.launcher.execute(&worker, &arguments) {
                Ok(code) => code,
                Err(e) => {
                    report_failure(&e, log);
                    -1
                }
            };

            let signal = codec::decode(code);
            errors = errors.saturating_add(signal.error_delta());
            if !signal.continues() {
                break signal.result_code();
            }

            phase += 1;
            if !self.phase_delay.is_zero() {
                thread::sleep(self.phase_delay);
            }
        };

        let report = RunReport::new(result, errors, invocations);
        log::debug!(
            "Run finished: {:?} after {} invocations",
            report.outcome,
            report.invocations
        );

        log.line(&"=".repeat(RULE_WIDTH));
        log.line(&self.summary(&report));
        self.write_message(&plan.package_path, report.outcome.message_kind(), log);

        if let Some(path) = log.file_path().map(Path::to_path_buf) {
            log.notice(&format!("See log file: {}", path.display()));
        }

        report
    }

    fn summary(&self, report: &RunReport) -> String {
        let tool = &self.tool_name;
        match report.outcome {
            Outcome::Warning => format!("{tool} terminated with warning."),
            Outcome::FatalError => format!("{tool} stopped with error."),
            Outcome::Success => format!("{tool} has been successfully finished."),
            Outcome::Error => format!("{tool} has been finished with {} errors.", report.errors),
        }
    }

    /// Write the manifest's outcome message, if the package declares one.
    fn write_message(&self, package_dir: &Path, kind: MessageKind, log: &mut RunLog) {
        let files = match self.fs.list_files(package_dir) {
            Ok(files) => files,
            Err(e) => {
                log::warn!("Cannot list package directory: {e}");
                return;
            }
        };
        let [manifest_path] = files.as_slice() else {
            log::debug!(
                "Skipping {kind} message: package has {} files",
                files.len()
            );
            return;
        };

        let manifest = self
            .fs
            .read_to_string(manifest_path)
            .and_then(|text| PackageManifest::parse(manifest_path, &text).map_err(Error::from));
        match manifest {
            Ok(manifest) => {
                if let Some(message) = manifest.message(kind) {
                    log.message(kind, message);
                }
            }
            Err(e) => log::warn!("Cannot read manifest {}: {e}", manifest_path.display()),
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("phase_delay", &self.phase_delay)
            .field("worker_name", &self.worker_name)
            .field("tool_name", &self.tool_name)
            .finish_non_exhaustive()
    }
}

/// Joined worker command line for one phase.
///
/// `"<package>" TargetDirectory:"<target>" PHASE:<n> "LOG:<file>"
/// LOGLEVEL:<level> <parameters...> [-WAIT] [-SCHEMA]`
pub fn worker_arguments(plan: &RunPlan, phase: u32, log: &RunLog) -> String {
    let log_file = log
        .file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    let mut args = vec![
        quote(&plan.package_path.display().to_string()),
        format!("TargetDirectory:{}", quote(&plan.target_directory.display().to_string())),
        format!("PHASE:{phase}"),
        quote(&format!("LOG:{log_file}")),
        format!("LOGLEVEL:{}", log.level()),
    ];
    args.extend(plan.parameters.iter().cloned());
    if plan.wait {
        args.push("-WAIT".to_string());
    }
    if plan.schema {
        args.push("-SCHEMA".to_string());
    }

    args.join(" ")
}

fn quote(value: &str) -> String {
    format!("\"{value}\"")
}

fn report_failure(error: &Error, log: &mut RunLog) {
    match error.worker_failure() {
        WorkerFailure::Precondition(message) => {
            log.line("PRECONDITION FAILED:");
            log.line(message);
        }
        WorkerFailure::InvalidPackage(message) => {
            log.line("INVALID PACKAGE:");
            log.line(message);
        }
        WorkerFailure::Unhandled => {
            log.line("#### UNHANDLED EXCEPTION:");
            log.error(error);
        }
    }
}
