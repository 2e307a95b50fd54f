use colored::Colorize;
use std::io::{self, Write};

/// One-line description shown on the package listing
pub const TAGLINE: &str = "Deployment package executor: runs packages phase by phase in a sandbox.";

/// Tool name and version
pub fn tool_title() -> String {
    format!("pkgexec {}", env!("CARGO_PKG_VERSION"))
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

// ============================================================================
// Usage
// ============================================================================

/// Usage screen, framed by blank lines
pub fn usage_screen() -> String {
    [
        "",
        "Usage:",
        "pkgexec <package> [targetdirectory:<target>] [<name>:<value> ...]",
        "",
        "Parameters:",
        "  <package>: Package to execute (*.zip or directory).",
        "  <target>: Installation directory; defaults to the parent of the package directory.",
        "  <name>:<value>: Package parameter passed to every phase.",
        "",
        "Options:",
        "  log:<file>        Log file path.",
        "  loglevel:<level>  Default, File, Console or Silent.",
        "  -schema           Pass -SCHEMA to the worker.",
        "  -wait             Wait for ENTER before starting.",
        "",
        "Help about an existing package:",
        "pkgexec <package> -help",
        "",
    ]
    .join("\n")
}

/// Report a command line problem: title, message, usage screen, "Aborted."
pub fn parameter_error(out: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(out, "{}", tool_title())?;
    writeln!(out, "{message}")?;
    writeln!(out, "{}", usage_screen())?;
    writeln!(out, "Aborted.")
}

/// Truncate a value for display, keeping the start
pub fn truncate(value: &str, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        value.to_string()
    } else {
        let head: String = value.chars().take(max_len).collect();
        format!("{head}...")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_title_has_version() {
        assert_eq!(tool_title(), format!("pkgexec {}", env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_usage_screen_sections() {
        let usage = usage_screen();
        assert!(usage.starts_with("\nUsage:\n"));
        assert!(usage.contains("pkgexec <package> -help"));
    }

    #[test]
    fn test_parameter_error_layout() {
        let mut out = Vec::new();
        parameter_error(&mut out, "Missing package").unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], tool_title());
        assert_eq!(lines[1], "Missing package");
        assert_eq!(lines[3], "Usage:");
        assert_eq!(*lines.last().unwrap(), "Aborted.");
    }

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate("short", 20), "short");
        assert_eq!(truncate("exact", 5), "exact");
        assert_eq!(truncate("", 10), "");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(truncate("/very/long/path/to/file.txt", 10), "/very/long...");
    }
}
