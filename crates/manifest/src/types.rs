//! Data types for the manifest crate

use serde::{Deserialize, Serialize};
use std::fmt;

/// A parameter declared by a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name without the leading `@`
    pub name: String,
    /// Human-readable description, if the manifest provides one
    pub description: Option<String>,
    /// Default value (element text), empty when none is declared
    pub default_value: String,
}

/// Which outcome message to look up after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Success,
    Warning,
    Error,
}

impl MessageKind {
    /// Name of the top-level manifest element carrying this message
    pub fn element_name(&self) -> &'static str {
        match self {
            Self::Success => "SuccessMessage",
            Self::Warning => "WarningMessage",
            Self::Error => "ErrorMessage",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kind_element_names() {
        assert_eq!(MessageKind::Success.element_name(), "SuccessMessage");
        assert_eq!(MessageKind::Warning.element_name(), "WarningMessage");
        assert_eq!(MessageKind::Error.element_name(), "ErrorMessage");
    }

    #[test]
    fn test_message_kind_display() {
        assert_eq!(MessageKind::Warning.to_string(), "warning");
    }
}
