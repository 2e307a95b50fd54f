//! Directory discovery for pkgexec
//!
//! The executor is installed inside the package directory it serves:
//!
//! ```text
//! /srv/web/               <- target directory
//! ├── bin/
//! ├── tools/
//! └── Admin/              <- default package directory
//!     ├── bin/pkgexec     <- this executable
//!     ├── log/            <- run logs
//!     └── Pkg1/
//! ```
//!
//! # Environment Variables
//!
//! - `PKGEXEC_PACKAGE_DIR` - Override the default package directory
//! - `PKGEXEC_LOG_DIR` - Override the run log directory
//!
//! # Path Resolution Priority
//!
//! For package_dir():
//! 1. `--package-dir` (clap also reads `PKGEXEC_PACKAGE_DIR` into it)
//! 2. Parent of the directory holding the executable
//!
//! For target_dir():
//! 1. `targetdirectory:` argument
//! 2. Parent of the package directory
//!
//! For log_dir():
//! 1. `PKGEXEC_LOG_DIR` environment variable
//! 2. `<package dir>/log`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for package directory override
pub const ENV_PACKAGE_DIR: &str = "PKGEXEC_PACKAGE_DIR";

/// Environment variable for log directory override
pub const ENV_LOG_DIR: &str = "PKGEXEC_LOG_DIR";

/// Name of the log folder inside the package directory
const LOG_DIR_NAME: &str = "log";

/// Get the default package directory
pub fn package_dir(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        let path = expand(dir);
        log::debug!("Using package dir from arguments: {}", path.display());
        return Ok(path);
    }

    let exe = std::env::current_exe().context("Could not determine executable path")?;
    let path = exe
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .with_context(|| format!("Executable has no package directory: {}", exe.display()))?;
    log::debug!("Using package dir next to executable: {}", path.display());
    Ok(path)
}

/// Get the target installation directory
pub fn target_dir(explicit: Option<&str>, package_dir: &Path) -> PathBuf {
    if let Some(dir) = explicit {
        return expand(dir);
    }

    let path = package_dir
        .parent()
        .map_or_else(|| package_dir.to_path_buf(), Path::to_path_buf);
    log::debug!("Using target dir above package dir: {}", path.display());
    path
}

/// Get the run log directory
pub fn log_dir(package_dir: &Path) -> PathBuf {
    if let Ok(dir) = std::env::var(ENV_LOG_DIR) {
        let path = expand(&dir);
        log::debug!("Using log dir from {}: {}", ENV_LOG_DIR, path.display());
        return path;
    }

    package_dir.join(LOG_DIR_NAME)
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    /// Helper to run a test with env var removed
    fn without_env_var<F, R>(key: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::remove_var(key) };
        let result = f();
        if let Some(v) = original {
            // SAFETY: Tests run in isolation
            unsafe { env::set_var(key, v) };
        }
        result
    }

    #[test]
    fn test_package_dir_explicit() {
        let result = package_dir(Some("/srv/web/Admin")).unwrap();
        assert_eq!(result, PathBuf::from("/srv/web/Admin"));
    }

    #[test]
    fn test_package_dir_next_to_executable() {
        let result = package_dir(None).unwrap();
        let exe = env::current_exe().unwrap();
        assert!(exe.starts_with(&result));
        assert_ne!(exe.parent().unwrap(), result);
    }

    #[test]
    fn test_target_dir_default_is_parent() {
        let result = target_dir(None, Path::new("/srv/web/Admin"));
        assert_eq!(result, PathBuf::from("/srv/web"));
    }

    #[test]
    fn test_target_dir_explicit() {
        let result = target_dir(Some("/opt/site"), Path::new("/srv/web/Admin"));
        assert_eq!(result, PathBuf::from("/opt/site"));
    }

    #[test]
    fn test_log_dir_default() {
        without_env_var(ENV_LOG_DIR, || {
            let result = log_dir(Path::new("/srv/web/Admin"));
            assert_eq!(result, PathBuf::from("/srv/web/Admin/log"));
        });
    }

    #[test]
    fn test_log_dir_env_override() {
        with_env_var(ENV_LOG_DIR, "/var/log/pkgexec", || {
            let result = log_dir(Path::new("/srv/web/Admin"));
            assert_eq!(result, PathBuf::from("/var/log/pkgexec"));
        });
    }

    #[test]
    fn test_expand_absolute() {
        let result = expand("/absolute/path");
        assert_eq!(result, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_with_env_var() {
        with_env_var("PKGEXEC_TEST_SITE", "web", || {
            let result = expand("/srv/$PKGEXEC_TEST_SITE/Admin");
            assert_eq!(result, PathBuf::from("/srv/web/Admin"));
        });
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }
}
