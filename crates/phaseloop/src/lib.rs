//! # phaseloop
//!
//! Phase-loop executor for deployment packages.
//!
//! This crate provides:
//! - Command line tokenizing into an [`ExecutionRequest`]
//! - Package resolution (directory, `.zip`, `tools` fallback) and unpacking
//! - The disposable `run` sandbox the worker executes from
//! - The worker exit code protocol ([`codec`])
//! - The [`Orchestrator`] that drives the worker phase by phase
//! - A level-gated [`RunLog`] with a log file and console sink
//!
//! ## Example
//!
//! ```no_run
//! use phaseloop::backend::{local::LocalFileSystem, process::WorkerLauncher};
//! use phaseloop::logger::{ConsoleSink, RunLog};
//! use phaseloop::{package, ExecutionRequest, Orchestrator, RunPlan};
//! use std::path::Path;
//!
//! let request = ExecutionRequest::parse(["Pkg1", "source:/tmp/import"])?;
//! let admin = Path::new("/srv/web/Admin");
//! let fs = LocalFileSystem::new();
//!
//! let resolved = package::resolve(&fs, request.package_path.as_deref().unwrap_or_default(), admin)?;
//! let mut log = RunLog::create(
//!     request.log_level,
//!     None,
//!     &admin.join("log"),
//!     &resolved.name(),
//!     ConsoleSink::stdout(),
//! )?;
//! let package_path = package::unpack(&fs, &resolved.path, &mut log)?;
//!
//! let plan = RunPlan {
//!     package_path,
//!     target_directory: "/srv/web".into(),
//!     sandbox_directory: resolved.sandbox_directory,
//!     parameters: request.parameters,
//!     ..RunPlan::default()
//! };
//! let report = Orchestrator::new(Box::new(WorkerLauncher::new()), Box::new(fs)).run(&plan, &mut log);
//! std::process::exit(report.exit_code());
//! # Ok::<(), phaseloop::Error>(())
//! ```
//!
//! ## Exit codes
//!
//! | Outcome    | Exit code              |
//! |------------|------------------------|
//! | Success    | `0`                    |
//! | Warning    | `-1`                   |
//! | Error      | `-2`                   |
//! | FatalError | worker result (`< -1`) |

#![warn(clippy::all)]

pub mod backend;
pub mod codec;
pub mod error;
pub mod logger;
pub mod orchestrator;
pub mod package;
pub mod request;
pub mod sandbox;
pub mod types;

pub use codec::ExitSignal;
pub use error::{Error, ErrorCategory, Result};
pub use logger::RunLog;
pub use orchestrator::{Orchestrator, RunPlan};
pub use package::ResolvedPackage;
pub use request::ExecutionRequest;
pub use types::{LogLevel, Outcome, RunReport};
