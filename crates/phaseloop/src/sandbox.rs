//! Sandbox builder.
//!
//! The worker never runs from the target installation itself. Before every
//! phase a disposable `run` directory is assembled next to the package:
//!
//! 1. `<sandbox>/run` is created, or emptied when it already exists
//! 2. every file of `<target>/bin` is copied into it
//! 3. files of `<target>/tools` that are not already present are added
//!
//! The result is the path of the worker binary inside `run`.

use crate::backend::FileSystem;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Name of the sandbox directory.
pub const SANDBOX_DIR_NAME: &str = "run";

/// Target subdirectory holding the installation binaries.
pub const BIN_DIR: &str = "bin";

/// Target subdirectory holding tool binaries.
pub const TOOLS_DIR: &str = "tools";

/// Debugger host executables are never copied from `tools`.
const DEBUG_HOST_MARKER: &str = ".vshost.exe";

/// Default file name of the worker binary.
pub fn default_worker_name() -> String {
    format!("pkgexec-worker{}", std::env::consts::EXE_SUFFIX)
}

/// Rebuild `<sandbox_parent>/run` from the target's binaries.
///
/// Returns the path of `worker_name` inside the rebuilt directory. The
/// worker is not required to exist; a missing worker surfaces when it is
/// launched.
pub fn build(
    fs: &dyn FileSystem,
    target_directory: &Path,
    sandbox_parent: &Path,
    worker_name: &str,
) -> Result<PathBuf> {
    let run_dir = sandbox_parent.join(SANDBOX_DIR_NAME);
    populate(fs, target_directory, &run_dir).map_err(|e| Error::sandbox(&run_dir, e))?;
    Ok(run_dir.join(worker_name))
}

fn populate(fs: &dyn FileSystem, target_directory: &Path, run_dir: &Path) -> Result<()> {
    if fs.dir_exists(run_dir) {
        log::debug!("Clearing sandbox {}", run_dir.display());
        fs.clear_dir(run_dir)?;
    } else {
        log::debug!("Creating sandbox {}", run_dir.display());
        fs.create_dir_all(run_dir)?;
    }

    let mut present = HashSet::new();
    for file in fs.list_files(&target_directory.join(BIN_DIR))? {
        let Some(name) = file.file_name() else {
            continue;
        };
        fs.copy_file(&file, &run_dir.join(name))?;
        present.insert(name.to_string_lossy().to_lowercase());
    }

    let mut tools = fs.list_files(&target_directory.join(TOOLS_DIR))?;
    tools.sort_by_key(|path| path.file_name().map(|n| n.to_string_lossy().to_lowercase()));
    for file in tools {
        let Some(name) = file.file_name() else {
            continue;
        };
        let key = name.to_string_lossy().to_lowercase();
        if key.contains(DEBUG_HOST_MARKER) || present.contains(&key) {
            continue;
        }
        fs.copy_file(&file, &run_dir.join(name))?;
        present.insert(key);
    }

    log::debug!("Sandbox holds {} files", present.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockFileSystem;
    use crate::backend::local::LocalFileSystem;
    use crate::error::ErrorCategory;
    use std::fs;
    use tempfile::TempDir;

    fn target() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/srv/web/bin/pkgexec-worker", "worker");
        fs.add_file("/srv/web/bin/Core.dll", "core-bin");
        fs.add_file("/srv/web/tools/core.dll", "core-tools");
        fs.add_file("/srv/web/tools/Import.exe", "import");
        fs.add_file("/srv/web/tools/Import.vshost.exe", "debug");
        fs.add_dir("/srv/web/Admin");
        fs
    }

    #[test]
    fn test_build_copies_bin_then_missing_tools() {
        let fs = target();
        let worker = build(
            &fs,
            Path::new("/srv/web"),
            Path::new("/srv/web/Admin"),
            "pkgexec-worker",
        )
        .unwrap();

        assert_eq!(worker, PathBuf::from("/srv/web/Admin/run/pkgexec-worker"));
        assert_eq!(
            fs.file_names("/srv/web/Admin/run"),
            vec!["Core.dll", "Import.exe", "pkgexec-worker"]
        );
        assert_eq!(
            fs.read("/srv/web/Admin/run/Core.dll").unwrap(),
            b"core-bin".to_vec()
        );
    }

    #[test]
    fn test_build_removes_extraneous_files() {
        let fs = target();
        fs.add_file("/srv/web/Admin/run/stale.dll", "old");
        fs.add_file("/srv/web/Admin/run/cache/state.bin", "old");

        build(&fs, Path::new("/srv/web"), Path::new("/srv/web/Admin"), "w").unwrap();

        let names = fs.file_names("/srv/web/Admin/run");
        assert!(!names.contains(&"stale.dll".to_string()));
        assert!(!fs.dir_exists(Path::new("/srv/web/Admin/run/cache")));
    }

    #[test]
    fn test_build_is_idempotent() {
        let fs = target();
        let parent = Path::new("/srv/web/Admin");
        build(&fs, Path::new("/srv/web"), parent, "w").unwrap();
        let first = fs.file_names("/srv/web/Admin/run");
        build(&fs, Path::new("/srv/web"), parent, "w").unwrap();
        assert_eq!(fs.file_names("/srv/web/Admin/run"), first);
    }

    #[test]
    fn test_build_without_bin_or_tools() {
        let fs = MockFileSystem::new();
        fs.add_dir("/srv/web/Admin");
        build(&fs, Path::new("/srv/web"), Path::new("/srv/web/Admin"), "w").unwrap();
        assert!(fs.dir_exists(Path::new("/srv/web/Admin/run")));
        assert!(fs.file_names("/srv/web/Admin/run").is_empty());
    }

    #[test]
    fn test_build_failure_is_environment_error() {
        let fs = target();
        fs.fail_on("/srv/web/bin/Core.dll");
        let err = build(&fs, Path::new("/srv/web"), Path::new("/srv/web/Admin"), "w").unwrap_err();
        assert!(matches!(err, Error::Sandbox { .. }));
        assert_eq!(err.category(), ErrorCategory::Environment);
    }

    #[test]
    fn test_build_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let target_dir = temp_dir.path().join("web");
        let admin = target_dir.join("Admin");
        fs::create_dir_all(target_dir.join("bin")).unwrap();
        fs::create_dir_all(target_dir.join("tools")).unwrap();
        fs::create_dir_all(admin.join("run/leftover")).unwrap();
        fs::write(target_dir.join("bin/app.dll"), "app").unwrap();
        fs::write(target_dir.join("tools/tool.exe"), "tool").unwrap();
        fs::write(admin.join("run/leftover/x.txt"), "x").unwrap();

        let worker = build(&LocalFileSystem::new(), &target_dir, &admin, "tool.exe").unwrap();

        assert!(worker.is_file());
        let mut names: Vec<String> = fs::read_dir(admin.join("run"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["app.dll", "tool.exe"]);
    }
}
