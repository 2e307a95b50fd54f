//! Worker exit code protocol.
//!
//! A worker reports two things through its process exit code:
//!
//! - bit 0: continuation flag (run another phase)
//! - bits 1..: number of errors that occurred during the phase
//!
//! Non-positive codes carry neither. `0` is a clean stop; negative values are
//! abnormal stops and are passed through to the loop's result unchanged.
//!
//! | code | continue | errors |
//! |------|----------|--------|
//! | 0    | no       | 0      |
//! | 1    | yes      | 0      |
//! | 4    | no       | 2      |
//! | 5    | yes      | 2      |
//! | -1   | no (abnormal) | 0 |

/// Decoded worker exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSignal {
    /// Positive code: the phase completed.
    Phase {
        /// Whether the worker asks for another phase.
        continuation: bool,
        /// Errors reported by the phase.
        error_delta: u32,
    },
    /// Zero or negative code: stop with this value.
    Terminal(i32),
}

impl ExitSignal {
    /// Whether another phase should run.
    pub fn continues(&self) -> bool {
        matches!(
            self,
            Self::Phase {
                continuation: true,
                ..
            }
        )
    }

    /// Errors contributed by this phase.
    pub fn error_delta(&self) -> u32 {
        match self {
            Self::Phase { error_delta, .. } => *error_delta,
            Self::Terminal(_) => 0,
        }
    }

    /// The loop result this signal leaves behind: `1`/`0` for completed
    /// phases, the raw value for terminal codes.
    pub fn result_code(&self) -> i32 {
        match self {
            Self::Phase { continuation, .. } => i32::from(*continuation),
            Self::Terminal(code) => *code,
        }
    }
}

/// Decode a worker exit code.
pub fn decode(exit_code: i32) -> ExitSignal {
    if exit_code > 0 {
        ExitSignal::Phase {
            continuation: exit_code & 1 == 1,
            error_delta: (exit_code >> 1) as u32,
        }
    } else {
        ExitSignal::Terminal(exit_code)
    }
}

/// Encode a phase outcome as a worker exit code.
///
/// Saturates at `i32::MAX >> 1` errors.
pub fn encode(continuation: bool, errors: u32) -> i32 {
    let errors = errors.min((i32::MAX >> 1) as u32) as i32;
    (errors << 1) | i32::from(continuation)
}
