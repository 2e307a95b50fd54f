//! Package listing and package help screens.

use crate::ui;
use anyhow::{Context as _, Result};
use manifest::{PackageManifest, Parameter};
use phaseloop::backend::local::LocalFileSystem;
use phaseloop::package;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directories in the package folder that are never packages
const RESERVED_NAMES: &[&str] = &["App_Data", "bin", "log", "run", "tools"];

/// Widest parameter name column
const MAX_NAME_WIDTH: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PackageEntry {
    name: String,
    path: PathBuf,
    compressed: bool,
}

impl PackageEntry {
    fn description(&self) -> String {
        if self.compressed {
            return "(compressed)".to_string();
        }
        load_manifest(&self.path)
            .and_then(|m| m.description().map(str::to_string))
            .unwrap_or_default()
    }
}

/// Print the usage screen followed by every available package and tool
pub fn list_packages(out: &mut dyn Write, package_dir: &Path) -> Result<()> {
    writeln!(out, "{}", ui::tool_title())?;
    writeln!(out, "{}", ui::TAGLINE)?;
    writeln!(out, "{}", ui::usage_screen())?;
    writeln!(out, "Available packages")?;
    writeln!(out, "==================")?;
    writeln!(out)?;

    print_packages(out, package_dir)?;

    let tools_dir = package_dir.join("tools");
    if !tools_dir.is_dir() {
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "Available tools")?;
    writeln!(out, "---------------")?;
    writeln!(out)?;

    print_packages(out, &tools_dir)?;

    writeln!(out)?;
    Ok(())
}

/// Print the description and parameters of one package
pub fn package_help(out: &mut dyn Write, package_dir: &Path, reference: &str) -> Result<()> {
    let display_name = Path::new(reference)
        .file_name()
        .map_or_else(|| reference.to_string(), |n| n.to_string_lossy().into_owned());

    let Some(path) = package::locate(&LocalFileSystem::new(), reference, package_dir) else {
        writeln!(out, "Package does not exist: {display_name}")?;
        return Ok(());
    };
    if package::is_archive(&path) {
        writeln!(out, "Package is compressed: {display_name}")?;
        return Ok(());
    }

    let entry = PackageEntry {
        name: file_name(&path),
        path,
        compressed: false,
    };
    let manifest = load_manifest(&entry.path);

    writeln!(out, "Package:  {}", entry.name)?;
    writeln!(out, "path:     {}", entry.path.display())?;
    writeln!(
        out,
        "{}",
        manifest
            .as_ref()
            .and_then(PackageManifest::description)
            .unwrap_or_default()
    )?;

    let parameters = manifest
        .as_ref()
        .map(PackageManifest::parameters)
        .unwrap_or_default();
    if parameters.is_empty() {
        writeln!(out, "Package has no parameter.")?;
        return Ok(());
    }

    writeln!(out, "Parameters:")?;
    writeln!(out, "-----------")?;
    print_parameters(out, parameters)?;
    Ok(())
}

fn print_parameters(out: &mut dyn Write, parameters: &[Parameter]) -> Result<()> {
    let width = parameters
        .iter()
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(0)
        .min(MAX_NAME_WIDTH);
    let max_value_len = 62usize.saturating_sub(width).max(20);

    for parameter in parameters {
        writeln!(
            out,
            "  {:<width$}  {}",
            parameter.name,
            parameter.description.as_deref().unwrap_or_default()
        )?;
        if !parameter.default_value.is_empty() {
            writeln!(
                out,
                "  {:<width$}  Default: {}",
                " ",
                ui::truncate(&parameter.default_value, max_value_len)
            )?;
        }
    }
    Ok(())
}

fn print_packages(out: &mut dyn Write, dir: &Path) -> Result<()> {
    let packages = scan_packages(dir)?;

    if packages.is_empty() {
        writeln!(out, "  There are no packages.")?;
        return Ok(());
    }

    let width = packages
        .iter()
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(0);
    for package in &packages {
        writeln!(out, "  {:<width$}  {}", package.name, package.description())?;
    }
    Ok(())
}

/// Unpacked directories and zip files that are not already unpacked, by name
fn scan_packages(dir: &Path) -> Result<Vec<PackageEntry>> {
    let mut unpacked = Vec::new();
    let mut archives = Vec::new();

    let entries =
        fs::read_dir(dir).with_context(|| format!("Could not read {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            let name = file_name(&path);
            if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(&name)) {
                continue;
            }
            unpacked.push(PackageEntry {
                name,
                path,
                compressed: false,
            });
        } else if path.is_file() && package::is_archive(&path) {
            let name = path
                .file_stem()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            archives.push(PackageEntry {
                name,
                path,
                compressed: true,
            });
        }
    }

    archives.retain(|a| !unpacked.iter().any(|u| u.name == a.name));
    let mut packages: Vec<PackageEntry> = archives.into_iter().chain(unpacked).collect();
    packages.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(packages)
}

fn load_manifest(package_dir: &Path) -> Option<PackageManifest> {
    match PackageManifest::from_package_dir(package_dir) {
        Ok(manifest) => manifest,
        Err(e) => {
            log::warn!("Cannot read manifest of {}: {e}", package_dir.display());
            None
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
