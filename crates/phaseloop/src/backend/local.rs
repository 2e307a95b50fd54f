//! File system backed by `std::fs`.

use crate::backend::FileSystem;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Local disk access.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    /// Create a new LocalFileSystem.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFileSystem {
    fn dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| Error::io(path, e))
    }

    fn clear_dir(&self, path: &Path) -> Result<()> {
        let entries = fs::read_dir(path).map_err(|e| Error::io(path, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| Error::io(path, e))?;
            let entry_path = entry.path();
            let file_type = entry.file_type().map_err(|e| Error::io(&entry_path, e))?;

            if file_type.is_dir() {
                make_tree_writable(&entry_path)?;
                fs::remove_dir_all(&entry_path).map_err(|e| Error::io(&entry_path, e))?;
            } else {
                make_writable(&entry_path)?;
                fs::remove_file(&entry_path).map_err(|e| Error::io(&entry_path, e))?;
            }
        }

        Ok(())
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            log::debug!("Directory does not exist, nothing to list: {}", dir.display());
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            let path = entry.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        Ok(files)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        if to.exists() {
            make_writable(to)?;
        }
        fs::copy(from, to).map_err(|e| Error::io(from, e))?;
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| Error::io(path, e))
    }
}

/// Clear read-only flags on a directory tree so it can be removed.
fn make_tree_writable(root: &Path) -> Result<()> {
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::io(path, e.into())
        })?;
        if !entry.path_is_symlink() {
            make_writable(entry.path())?;
        }
    }
    Ok(())
}

/// Clear the read-only flag of a single file or directory.
fn make_writable(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path).map_err(|e| Error::io(path, e))?;
    let mut perms = metadata.permissions();
    if !perms.readonly() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        perms.set_mode(perms.mode() | 0o200);
    }
    #[cfg(not(unix))]
    {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
    }

    fs::set_permissions(path, perms).map_err(|e| Error::io(path, e))
}
