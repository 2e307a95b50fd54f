//! Capabilities the orchestrator depends on.
//!
//! Launching the worker and touching the disk go through the
//! [`ProcessLauncher`] and [`FileSystem`] traits so the phase loop can be
//! driven without real processes:
//!
//! - [`process::WorkerLauncher`] and [`local::LocalFileSystem`] are the
//!   production implementations
//! - [`MockLauncher`] and [`MockFileSystem`] record calls in memory
//!
//! # Testing
//!
//! ```
//! use phaseloop::backend::{MockLauncher, ProcessLauncher};
//! use std::path::Path;
//!
//! let launcher = MockLauncher::phases(2);
//! let worker = Path::new("/srv/Admin/run/pkgexec-worker");
//! assert_eq!(launcher.execute(worker, "\"Pkg1\" PHASE:0").unwrap(), 1);
//! assert_eq!(launcher.execute(worker, "\"Pkg1\" PHASE:1").unwrap(), 0);
//! assert_eq!(launcher.invocations().len(), 2);
//! ```

pub mod local;
pub mod process;

use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Starts the worker and waits for it to exit.
pub trait ProcessLauncher: Send + Sync {
    /// Run `worker` with a single joined argument string and return its exit
    /// code. Blocks until the process exits.
    fn execute(&self, worker: &Path, arguments: &str) -> Result<i32>;
}

/// Disk access used by the sandbox builder and the package resolver.
pub trait FileSystem: Send + Sync {
    /// Whether `path` is an existing directory.
    fn dir_exists(&self, path: &Path) -> bool;

    /// Whether `path` is an existing regular file.
    fn file_exists(&self, path: &Path) -> bool;

    /// Create a directory and its missing parents.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Delete everything inside `path`, keeping the directory itself.
    fn clear_dir(&self, path: &Path) -> Result<()>;

    /// Files directly inside `dir`, sorted by name. Empty when `dir` does
    /// not exist.
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Copy a file, replacing the destination.
    fn copy_file(&self, from: &Path, to: &Path) -> Result<()>;

    /// Read a whole file as UTF-8 text.
    fn read_to_string(&self, path: &Path) -> Result<String>;
}

/// A recorded worker invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Worker binary path.
    pub worker: PathBuf,
    /// Joined argument string.
    pub arguments: String,
}

/// Scripted launcher for testing.
///
/// Returns queued responses in order and `0` once the queue is empty.
/// Clones share the same queue and invocation record.
#[derive(Debug, Clone, Default)]
pub struct MockLauncher {
    responses: Arc<Mutex<VecDeque<Result<i32>>>>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl MockLauncher {
    /// Create a launcher that always returns `0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a launcher that returns the given exit codes in order.
    #[must_use]
    pub fn with_codes(codes: impl IntoIterator<Item = i32>) -> Self {
        let launcher = Self::new();
        for code in codes {
            launcher.push_code(code);
        }
        launcher
    }

    /// Create a launcher that asks for `count` phases: `1` for every call
    /// but the last, then `0`.
    #[must_use]
    pub fn phases(count: u32) -> Self {
        let count = count.max(1);
        Self::with_codes((1..=count).map(|n| i32::from(n < count)))
    }

    /// Queue an exit code.
    pub fn push_code(&self, code: i32) {
        lock(&self.responses).push_back(Ok(code));
    }

    /// Queue a launch failure.
    pub fn push_error(&self, error: Error) {
        lock(&self.responses).push_back(Err(error));
    }

    /// Invocations recorded so far.
    pub fn invocations(&self) -> Vec<Invocation> {
        lock(&self.invocations).clone()
    }
}

impl ProcessLauncher for MockLauncher {
    fn execute(&self, worker: &Path, arguments: &str) -> Result<i32> {
        lock(&self.invocations).push(Invocation {
            worker: worker.to_path_buf(),
            arguments: arguments.to_string(),
        });
        lock(&self.responses).pop_front().unwrap_or(Ok(0))
    }
}

#[derive(Debug, Default)]
struct MockDisk {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
    failing: BTreeSet<PathBuf>,
}

impl MockDisk {
    fn check(&self, path: &Path) -> Result<()> {
        if self.failing.contains(path) {
            Err(Error::io(
                path,
                io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
            ))
        } else {
            Ok(())
        }
    }

    fn add_dir_all(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }
}

/// In-memory file system for testing.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    disk: Arc<Mutex<MockDisk>>,
}

impl MockFileSystem {
    /// Create an empty file system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory and its parents.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        lock(&self.disk).add_dir_all(path.as_ref());
    }

    /// Add a file (and its parent directories).
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        let mut disk = lock(&self.disk);
        if let Some(parent) = path.parent() {
            disk.add_dir_all(parent);
        }
        disk.files.insert(path.to_path_buf(), contents.into());
    }

    /// Make every operation touching `path` fail.
    pub fn fail_on(&self, path: impl AsRef<Path>) {
        lock(&self.disk).failing.insert(path.as_ref().to_path_buf());
    }

    /// Names of the files directly inside `dir`, sorted.
    pub fn file_names(&self, dir: impl AsRef<Path>) -> Vec<String> {
        let dir = dir.as_ref();
        lock(&self.disk)
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }

    /// Contents of a file, if it exists.
    pub fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        lock(&self.disk).files.get(path.as_ref()).cloned()
    }
}

impl FileSystem for MockFileSystem {
    fn dir_exists(&self, path: &Path) -> bool {
        lock(&self.disk).dirs.contains(path)
    }

    fn file_exists(&self, path: &Path) -> bool {
        lock(&self.disk).files.contains_key(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut disk = lock(&self.disk);
        disk.check(path)?;
        disk.add_dir_all(path);
        Ok(())
    }

    fn clear_dir(&self, path: &Path) -> Result<()> {
        let mut disk = lock(&self.disk);
        disk.check(path)?;
        disk.files.retain(|p, _| !p.starts_with(path));
        disk.dirs.retain(|p| p == path || !p.starts_with(path));
        Ok(())
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let disk = lock(&self.disk);
        disk.check(dir)?;
        Ok(disk
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect())
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        let mut disk = lock(&self.disk);
        disk.check(from)?;
        disk.check(to)?;
        let contents = disk.files.get(from).cloned().ok_or_else(|| {
            Error::io(from, io::Error::new(io::ErrorKind::NotFound, "no such file"))
        })?;
        if let Some(parent) = to.parent() {
            if !disk.dirs.contains(parent) {
                return Err(Error::io(
                    to,
                    io::Error::new(io::ErrorKind::NotFound, "parent directory missing"),
                ));
            }
        }
        disk.files.insert(to.to_path_buf(), contents);
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let disk = lock(&self.disk);
        disk.check(path)?;
        let contents = disk.files.get(path).ok_or_else(|| {
            Error::io(path, io::Error::new(io::ErrorKind::NotFound, "no such file"))
        })?;
        String::from_utf8(contents.clone())
            .map_err(|e| Error::io(path, io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}

/// Lock a mock's state, recovering from poisoning left by a panicking test.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_launcher_default_returns_zero() {
        let launcher = MockLauncher::new();
        assert_eq!(launcher.execute(Path::new("w"), "").unwrap(), 0);
        assert_eq!(launcher.invocations().len(), 1);
    }

    #[test]
    fn test_mock_launcher_phases() {
        let launcher = MockLauncher::phases(3);
        let codes: Vec<i32> = (0..3)
            .map(|_| launcher.execute(Path::new("w"), "").unwrap())
            .collect();
        assert_eq!(codes, vec![1, 1, 0]);
    }

    #[test]
    fn test_mock_launcher_phases_minimum_one() {
        let launcher = MockLauncher::phases(0);
        assert_eq!(launcher.execute(Path::new("w"), "").unwrap(), 0);
    }

    #[test]
    fn test_mock_launcher_error() {
        let launcher = MockLauncher::new();
        launcher.push_error(Error::Precondition("nope".to_string()));
        assert!(matches!(
            launcher.execute(Path::new("w"), ""),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn test_mock_launcher_clones_share_state() {
        let launcher = MockLauncher::with_codes([7]);
        let clone = launcher.clone();
        assert_eq!(clone.execute(Path::new("w"), "a").unwrap(), 7);
        assert_eq!(launcher.invocations()[0].arguments, "a");
    }

    #[test]
    fn test_mock_fs_add_file_creates_parents() {
        let fs = MockFileSystem::new();
        fs.add_file("/srv/web/bin/a.dll", "a");
        assert!(fs.dir_exists(Path::new("/srv/web/bin")));
        assert!(fs.dir_exists(Path::new("/srv/web")));
        assert!(fs.file_exists(Path::new("/srv/web/bin/a.dll")));
        assert!(!fs.file_exists(Path::new("/srv/web/bin")));
    }

    #[test]
    fn test_mock_fs_list_files_direct_children_only() {
        let fs = MockFileSystem::new();
        fs.add_file("/d/b.txt", "");
        fs.add_file("/d/a.txt", "");
        fs.add_file("/d/sub/c.txt", "");
        let files = fs.list_files(Path::new("/d")).unwrap();
        assert_eq!(files, vec![PathBuf::from("/d/a.txt"), PathBuf::from("/d/b.txt")]);
        assert!(fs.list_files(Path::new("/missing")).unwrap().is_empty());
    }

    #[test]
    fn test_mock_fs_clear_dir_keeps_dir() {
        let fs = MockFileSystem::new();
        fs.add_file("/d/a.txt", "");
        fs.add_file("/d/sub/c.txt", "");
        fs.clear_dir(Path::new("/d")).unwrap();
        assert!(fs.dir_exists(Path::new("/d")));
        assert!(!fs.dir_exists(Path::new("/d/sub")));
        assert!(fs.file_names("/d").is_empty());
    }

    #[test]
    fn test_mock_fs_read_to_string() {
        let fs = MockFileSystem::new();
        fs.add_file("/d/manifest.xml", "<Package/>");
        assert_eq!(
            fs.read_to_string(Path::new("/d/manifest.xml")).unwrap(),
            "<Package/>"
        );
        assert!(fs.read_to_string(Path::new("/d/missing.xml")).is_err());
    }

    #[test]
    fn test_mock_fs_fail_on() {
        let fs = MockFileSystem::new();
        fs.add_file("/d/a.txt", "");
        fs.fail_on("/d/a.txt");
        let result = fs.copy_file(Path::new("/d/a.txt"), Path::new("/d/b.txt"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
