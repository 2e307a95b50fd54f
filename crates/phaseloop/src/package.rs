//! Package resolution and unpacking.
//!
//! A package reference from the command line is a name, a relative path or
//! a rooted path. It resolves to either a package directory or a `.zip`
//! archive:
//!
//! ```text
//! Admin/                 <- default package directory, sandbox parent
//! ├── Pkg1/              <- unpacked package (single manifest file inside)
//! ├── Pkg2.zip           <- compressed package, extracted to Admin/Pkg2/
//! ├── run/               <- sandbox
//! └── tools/
//!     └── Import.zip     <- built-in tool package, still sandboxed in Admin/
//! ```

use crate::backend::FileSystem;
use crate::error::{Error, Result};
use crate::logger::RunLog;
use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Archive extension, matched case-insensitively.
const ARCHIVE_EXTENSION: &str = "zip";

/// Subfolder searched when a package is not found in place.
const TOOLS_FOLDER: &str = "tools";

/// A package reference resolved to an existing directory or archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    /// Package directory or `.zip` file.
    pub path: PathBuf,
    /// Parent directory of the referenced package; holds the sandbox even
    /// when the package was found in `tools`.
    pub sandbox_directory: PathBuf,
}

impl ResolvedPackage {
    /// Whether the package is a compressed archive.
    pub fn is_archive(&self) -> bool {
        is_archive(&self.path)
    }

    /// Package name used for log file names: the directory name, or the
    /// archive file name without extension.
    pub fn name(&self) -> String {
        let name = if self.is_archive() {
            self.path.file_stem()
        } else {
            self.path.file_name()
        };
        name.map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Resolve a package reference.
///
/// Relative references are joined with `package_dir`. When the package is
/// not found in place, the `tools` subfolder of its parent is searched.
pub fn resolve(fs: &dyn FileSystem, reference: &str, package_dir: &Path) -> Result<ResolvedPackage> {
    let requested = absolute(reference, package_dir);
    let sandbox_directory = requested
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| package_dir.to_path_buf());

    let path = locate(fs, reference, package_dir).ok_or(Error::PackageNotFound(requested))?;
    log::debug!("Resolved package {reference} to {}", path.display());

    Ok(ResolvedPackage {
        path,
        sandbox_directory,
    })
}

/// Find the package directory or archive a reference points to, searching
/// the `tools` subfolder as a fallback.
pub fn locate(fs: &dyn FileSystem, reference: &str, package_dir: &Path) -> Option<PathBuf> {
    let requested = absolute(reference, package_dir);
    check_file_or_folder(fs, &requested)
        .or_else(|| check_file_or_folder(fs, &insert_tools_folder(&requested)))
}

/// Insert `tools` before the last path segment: `Admin/Pkg` becomes
/// `Admin/tools/Pkg`.
pub fn insert_tools_folder(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent.join(TOOLS_FOLDER).join(name),
        _ => PathBuf::from(TOOLS_FOLDER).join(path),
    }
}

/// Whether a path names a `.zip` archive.
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

fn absolute(reference: &str, package_dir: &Path) -> PathBuf {
    let reference = Path::new(reference);
    if reference.has_root() {
        reference.to_path_buf()
    } else {
        package_dir.join(reference)
    }
}

fn check_file_or_folder(fs: &dyn FileSystem, path: &Path) -> Option<PathBuf> {
    if is_archive(path) {
        return fs.file_exists(path).then(|| path.to_path_buf());
    }
    if fs.dir_exists(path) {
        return Some(path.to_path_buf());
    }

    let mut archive = path.as_os_str().to_owned();
    archive.push(".");
    archive.push(ARCHIVE_EXTENSION);
    let archive = PathBuf::from(archive);
    fs.file_exists(&archive).then_some(archive)
}

/// Make a package available as a directory.
///
/// Directories are returned unchanged. An archive is extracted into a
/// sibling directory named after the archive; anything left there by an
/// earlier extraction is deleted first.
pub fn unpack(fs: &dyn FileSystem, package: &Path, log: &mut RunLog) -> Result<PathBuf> {
    if fs.dir_exists(package) {
        return Ok(package.to_path_buf());
    }

    let stem = package
        .file_stem()
        .ok_or_else(|| Error::PackageNotFound(package.to_path_buf()))?;
    let target = package.with_file_name(stem);

    log.line(&format!("Package directory: {}", target.display()));

    if fs.dir_exists(&target) {
        fs.clear_dir(&target)?;
        log.line("Old files and directories are deleted.");
    } else {
        fs.create_dir_all(&target)?;
        log.line("Package directory created.");
    }

    log.line("Extracting ...");
    let file = File::open(package).map_err(|e| Error::io(package, e))?;
    let mut archive = ZipArchive::new(file).map_err(|source| Error::Archive {
        path: package.to_path_buf(),
        source,
    })?;
    archive.extract(&target).map_err(|source| Error::Archive {
        path: package.to_path_buf(),
        source,
    })?;
    log.line("Ok.");

    Ok(target)
}
