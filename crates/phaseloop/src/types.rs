//! Shared types for package execution.

use crate::error::{Error, Result};
use manifest::MessageKind;
use std::fmt;
use std::str::FromStr;

/// Run log verbosity.
///
/// Ordered from most to least verbose. A sink writes a message when its
/// accepted level is at or above the run's level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Log file and console.
    #[default]
    Default,
    /// Log file and console; the file is the primary record.
    File,
    /// Console only, no log file is created.
    Console,
    /// Nothing is written.
    Silent,
}

impl LogLevel {
    /// All levels, in order.
    pub fn all() -> &'static [LogLevel] {
        &[Self::Default, Self::File, Self::Console, Self::Silent]
    }

    /// Name used on the command line and in worker arguments.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::File => "File",
            Self::Console => "Console",
            Self::Silent => "Silent",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|level| level.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidLogLevel(s.to_string()))
    }
}

/// Terminal outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Clean stop with no accumulated errors.
    Success,
    /// Worker invocation failed without a fatal environment problem.
    Warning,
    /// Clean stop, but phases reported errors.
    Error,
    /// Environment failure or abnormal worker result.
    FatalError,
}

impl Outcome {
    /// Classify the loop's last raw result and accumulated error count.
    pub fn classify(result: i32, errors: u32) -> Self {
        if result == -1 {
            Self::Warning
        } else if result < -1 {
            Self::FatalError
        } else if errors == 0 {
            Self::Success
        } else {
            Self::Error
        }
    }

    /// Manifest message shown for this outcome.
    pub fn message_kind(&self) -> MessageKind {
        match self {
            Self::Success => MessageKind::Success,
            Self::Warning => MessageKind::Warning,
            Self::Error | Self::FatalError => MessageKind::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Aggregated result of a phase loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Terminal classification.
    pub outcome: Outcome,
    /// Errors reported by all phases.
    pub errors: u32,
    /// Number of worker invocations.
    pub invocations: u32,
    /// Last raw loop result (0 clean stop, -1 warning, < -1 fatal).
    pub result: i32,
}

impl RunReport {
    pub fn new(result: i32, errors: u32, invocations: u32) -> Self {
        Self {
            outcome: Outcome::classify(result, errors),
            errors,
            invocations,
            result,
        }
    }

    /// Exit code for the host process.
    ///
    /// `0` on success, `-1` on warning, the raw result for fatal stops and
    /// `-2` when phases accumulated errors.
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            Outcome::Success => 0,
            Outcome::Warning => -1,
            Outcome::FatalError => self.result,
            Outcome::Error => -2,
        }
    }
}
