//! Package execution: argument checks, run header, unpacking and the phase
//! loop.

use crate::Context;
use crate::commands::help;
use crate::config::ExecutorConfig;
use crate::paths;
use crate::ui;
use anyhow::Result;
use chrono::Utc;
use phaseloop::backend::ProcessLauncher;
use phaseloop::backend::local::LocalFileSystem;
use phaseloop::backend::process::WorkerLauncher;
use phaseloop::logger::{ConsoleSink, RunLog};
use phaseloop::{Error, ExecutionRequest, Orchestrator, RunPlan, package};
use std::io::{self, BufRead, Write};

/// Exit code for command line problems
const PARAMETER_ERROR: i32 = -1;

/// Exit code when the package cannot be prepared
const PREPARATION_ERROR: i32 = -2;

/// Execute a package with the production worker launcher
pub fn run(ctx: &Context, args: &[String]) -> Result<i32> {
    if is_wait_mode(args) {
        wait_for_debugger(&mut io::stdout(), &mut io::stdin().lock())?;
    }

    execute(
        ctx,
        args,
        Box::new(WorkerLauncher::new()),
        ConsoleSink::stdout(),
        &mut io::stdout(),
    )
}

/// Whether `-wait` appears anywhere on the command line
pub fn is_wait_mode(args: &[String]) -> bool {
    args.iter().any(|a| a.eq_ignore_ascii_case("-wait"))
}

/// Block until the operator presses ENTER
pub fn wait_for_debugger(out: &mut dyn Write, input: &mut dyn BufRead) -> Result<()> {
    writeln!(
        out,
        "Running in wait mode - now you can attach to the process with a debugger."
    )?;
    writeln!(out, "Press ENTER to continue.")?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}

/// Execute a package and return the host exit code
pub fn execute(
    ctx: &Context,
    args: &[String],
    launcher: Box<dyn ProcessLauncher>,
    console: ConsoleSink,
    out: &mut dyn Write,
) -> Result<i32> {
    let request = match ExecutionRequest::parse(args) {
        Ok(request) => request,
        Err(e) => return parameter_error(out, &e),
    };

    let target_directory = paths::target_dir(request.target_directory.as_deref(), &ctx.package_dir);
    if !target_directory.is_dir() {
        return parameter_error(out, &Error::TargetNotFound(target_directory));
    }

    if request.help {
        match request.package_path.as_deref() {
            None => help::list_packages(out, &ctx.package_dir)?,
            Some(reference) => help::package_help(out, &ctx.package_dir, reference)?,
        }
        return Ok(0);
    }

    let fs = LocalFileSystem::new();
    let Some(reference) = request.package_path.as_deref() else {
        return parameter_error(out, &Error::MissingPackage);
    };
    let resolved = match package::resolve(&fs, reference, &ctx.package_dir) {
        Ok(resolved) => resolved,
        Err(e) => return parameter_error(out, &e),
    };

    let config = ExecutorConfig::load(&ctx.package_dir)?;
    let log_file = request
        .log_file_path
        .as_deref()
        .map(|p| paths::expand(p.trim_matches('"')));
    let mut log = RunLog::create(
        request.log_level,
        log_file.as_deref(),
        &ctx.log_dir,
        &resolved.name(),
        console,
    )?;
    log::debug!("Run log level: {}", log.level());

    writeln!(out)?;
    log.title(&ui::tool_title());
    log.line(&format!(
        "Start at {}",
        Utc::now().format("%Y-%m-%d %H:%M:%S")
    ));
    log.line(&format!("Target:  {}", target_directory.display()));
    log.line(&format!("Package: {}", resolved.path.display()));

    let package_path = match package::unpack(&fs, &resolved.path, &mut log) {
        Ok(path) => path,
        Err(e) => {
            log.error(&e);
            return Ok(PREPARATION_ERROR);
        }
    };

    let plan = RunPlan {
        package_path,
        target_directory,
        sandbox_directory: resolved.sandbox_directory,
        parameters: request.parameters,
        wait: request.wait,
        schema: request.schema,
    };

    let orchestrator = Orchestrator::new(launcher, Box::new(fs))
        .with_phase_delay(config.phase_delay())
        .with_worker_name(config.worker.as_str());
    let report = orchestrator.run(&plan, &mut log);

    Ok(report.exit_code())
}

fn parameter_error(out: &mut dyn Write, error: &Error) -> Result<i32> {
    log::debug!("Parameter error ({}): {error}", error.category());
    ui::parameter_error(out, &error.to_string())?;
    Ok(PARAMETER_ERROR)
}
