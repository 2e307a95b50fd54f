//! Command line tokenizer.
//!
//! The executor takes a flat list of tokens rather than `--flag` style
//! options:
//!
//! ```text
//! pkgexec <package> [targetdirectory:<dir>] [log:<file>] [loglevel:<level>]
//!         [-help|-?] [-schema] [-wait] [<name>:<value> ...]
//! ```
//!
//! Every token that is not a flag or a known option and looks like
//! `name:value` is a package parameter, forwarded to the worker as-is apart
//! from quoting.

use crate::error::Result;
use crate::types::LogLevel;
use regex::Regex;
use std::sync::LazyLock;

/// Shape of a package parameter token: a name made of word characters and
/// single hyphens, followed by a colon.
static PARAMETER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)^(([\w_]+[\-]{0,1})+):").expect("parameter pattern is valid")
});

const LOG_PREFIX: &str = "LOG:";
const LOG_LEVEL_PREFIX: &str = "LOGLEVEL:";
const TARGET_DIRECTORY_PREFIX: &str = "TARGETDIRECTORY:";

/// Parsed command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Package reference as given (name, relative or rooted path).
    pub package_path: Option<String>,
    /// Target installation directory.
    pub target_directory: Option<String>,
    /// Explicit log file path.
    pub log_file_path: Option<String>,
    /// Run log verbosity.
    pub log_level: LogLevel,
    /// `-help` / `-?`
    pub help: bool,
    /// `-schema`
    pub schema: bool,
    /// `-wait`
    pub wait: bool,
    /// Package parameters, quote-normalized, in command line order.
    pub parameters: Vec<String>,
}

impl ExecutionRequest {
    /// Tokenize a command line.
    ///
    /// Fails only on an unknown `LOGLEVEL:` value.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut request = Self::default();

        for (index, arg) in args.into_iter().enumerate() {
            let arg = arg.as_ref();

            if let Some(verb) = arg.strip_prefix('-') {
                match verb.to_uppercase().as_str() {
                    "?" | "HELP" => request.help = true,
                    "SCHEMA" => request.schema = true,
                    "WAIT" => request.wait = true,
                    other => log::debug!("Ignoring unknown flag -{other}"),
                }
            } else if let Some(path) = strip_prefix_ignore_case(arg, LOG_PREFIX) {
                request.log_file_path = Some(path.to_string());
            } else if let Some(level) = strip_prefix_ignore_case(arg, LOG_LEVEL_PREFIX) {
                request.log_level = level.parse()?;
            } else if let Some(dir) = strip_prefix_ignore_case(arg, TARGET_DIRECTORY_PREFIX) {
                request.target_directory = Some(dir.trim_matches('"').to_string());
            } else if index > 0 && is_parameter(arg) {
                // The first token is the package, even when it looks like a parameter.
                request.parameters.push(quote_parameter(arg));
            } else if request.package_path.is_none() {
                request.package_path = Some(arg.to_string());
            } else {
                log::debug!("Ignoring extra argument: {arg}");
            }
        }

        Ok(request)
    }
}

/// Whether a token has the `name:value` parameter shape.
pub fn is_parameter(arg: &str) -> bool {
    PARAMETER_PATTERN.is_match(arg)
}

/// Quote the value of a `name:value` parameter unless it is already quoted.
///
/// `Param1:x y` becomes `Param1:"x y"` so that it survives being joined into
/// a single worker command line.
pub fn quote_parameter(param: &str) -> String {
    match param.split_once(':') {
        Some((_, value)) if value.starts_with('"') => param.to_string(),
        Some((name, value)) => format!("{name}:\"{value}\""),
        None => param.to_string(),
    }
}

fn strip_prefix_ignore_case<'a>(arg: &'a str, prefix: &str) -> Option<&'a str> {
    let head = arg.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&arg[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn parse(args: &[&str]) -> ExecutionRequest {
        ExecutionRequest::parse(args).unwrap()
    }

    #[test]
    fn test_parse_empty() {
        let request = parse(&[]);
        assert_eq!(request, ExecutionRequest::default());
        assert_eq!(request.log_level, LogLevel::Default);
        assert!(request.parameters.is_empty());
    }

    #[test]
    fn test_parse_help_flags() {
        assert!(parse(&["-help"]).help);
        assert!(parse(&["-HELP"]).help);
        assert!(parse(&["-?"]).help);

        let request = parse(&["-help"]);
        assert!(request.package_path.is_none());
        assert!(!request.schema);
        assert!(!request.wait);
    }

    #[test]
    fn test_parse_schema_and_wait() {
        let request = parse(&["-schema"]);
        assert!(request.schema);
        assert!(!request.wait);

        let request = parse(&["-Wait"]);
        assert!(request.wait);
        assert!(!request.schema);
    }

    #[test]
    fn test_parse_unknown_flag_ignored() {
        let request = parse(&["-verbose", "Pkg1"]);
        assert_eq!(request.package_path.as_deref(), Some("Pkg1"));
        assert!(!request.help);
    }

    #[test]
    fn test_parse_package_path() {
        let request = parse(&["PackageName"]);
        assert_eq!(request.package_path.as_deref(), Some("PackageName"));
        assert!(request.target_directory.is_none());
        assert!(request.log_file_path.is_none());
        assert!(request.parameters.is_empty());
    }

    #[test]
    fn test_parse_target_directory_trims_quotes() {
        let request = parse(&["targetdirectory:/srv/webapp"]);
        assert_eq!(request.target_directory.as_deref(), Some("/srv/webapp"));
        assert!(request.package_path.is_none());

        let request = parse(&["TargetDirectory:\"/srv/web app\""]);
        assert_eq!(request.target_directory.as_deref(), Some("/srv/web app"));
    }

    #[test]
    fn test_parse_log_path_verbatim() {
        let request = parse(&["log:\"/var/log/special.log\""]);
        assert_eq!(
            request.log_file_path.as_deref(),
            Some("\"/var/log/special.log\"")
        );
        assert!(request.package_path.is_none());
    }

    #[test]
    fn test_parse_log_levels() {
        assert_eq!(parse(&["loglevel:default"]).log_level, LogLevel::Default);
        assert_eq!(parse(&["loglevel:file"]).log_level, LogLevel::File);
        assert_eq!(parse(&["loglevel:console"]).log_level, LogLevel::Console);
        assert_eq!(parse(&["LOGLEVEL:Silent"]).log_level, LogLevel::Silent);
    }

    #[test]
    fn test_parse_log_level_is_not_log_path() {
        let request = parse(&["loglevel:console"]);
        assert!(request.log_file_path.is_none());
    }

    #[test]
    fn test_parse_invalid_log_level() {
        let result = ExecutionRequest::parse(["Pkg1", "loglevel:chatty"]);
        assert!(matches!(result, Err(Error::InvalidLogLevel(ref v)) if v == "chatty"));
    }

    #[test]
    fn test_parse_one_parameter() {
        let request = parse(&["PackageName", "Param1:Value1"]);
        assert_eq!(request.package_path.as_deref(), Some("PackageName"));
        assert_eq!(request.parameters, vec!["Param1:\"Value1\""]);
    }

    #[test]
    fn test_parse_two_parameters() {
        let request = parse(&["PackageName", "Param1:Value1", "param2:value2"]);
        assert_eq!(
            request.parameters,
            vec!["Param1:\"Value1\"", "param2:\"value2\""]
        );
    }

    #[test]
    fn test_parse_first_token_never_parameter() {
        let request = parse(&["Param1:Value1", "Param2:Value2"]);
        assert_eq!(request.package_path.as_deref(), Some("Param1:Value1"));
        assert_eq!(request.parameters, vec!["Param2:\"Value2\""]);
    }

    #[test]
    fn test_parse_parameter_with_spaces() {
        let request = parse(&["Pkg1", "Message:hello world"]);
        assert_eq!(request.parameters, vec!["Message:\"hello world\""]);
    }

    #[test]
    fn test_parse_mixed() {
        let request = parse(&[
            "Pkg1",
            "targetdirectory:/srv/web",
            "source:/tmp/import",
            "loglevel:console",
            "-schema",
            "reset-security:true",
        ]);
        assert_eq!(request.package_path.as_deref(), Some("Pkg1"));
        assert_eq!(request.target_directory.as_deref(), Some("/srv/web"));
        assert_eq!(request.log_level, LogLevel::Console);
        assert!(request.schema);
        assert_eq!(
            request.parameters,
            vec!["source:\"/tmp/import\"", "reset-security:\"true\""]
        );
    }

    #[test]
    fn test_parse_extra_positional_ignored() {
        let request = parse(&["Pkg1", "Pkg2"]);
        assert_eq!(request.package_path.as_deref(), Some("Pkg1"));
        assert!(request.parameters.is_empty());
    }

    #[test]
    fn test_is_parameter() {
        assert!(is_parameter("Param1:Value1"));
        assert!(is_parameter("reset-security:true"));
        assert!(is_parameter("a_b:"));
        assert!(!is_parameter("NoColon"));
        assert!(!is_parameter(":value"));
        assert!(!is_parameter("-flag:value"));
        assert!(!is_parameter("a--b:value"));
        assert!(!is_parameter("/abs/path:x"));
    }

    #[test]
    fn test_quote_parameter() {
        assert_eq!(quote_parameter("Param1:x y"), "Param1:\"x y\"");
        assert_eq!(quote_parameter("Param1:\"x y\""), "Param1:\"x y\"");
        assert_eq!(quote_parameter("Param1:"), "Param1:\"\"");
        assert_eq!(quote_parameter("url:http://host"), "url:\"http://host\"");
    }
}
