//! # Manifest
//!
//! Reader for deployment package manifests.
//!
//! A package directory carries a single XML manifest whose root element
//! (conventionally `<Package>`) describes the package:
//!
//! ```xml
//! <Package type='Product' level='Tool'>
//!   <Name>Demo</Name>
//!   <Description>Imports demo content</Description>
//!   <Parameters>
//!     <Parameter name='@target' description='Import target'>/Root</Parameter>
//!   </Parameters>
//!   <SuccessMessage>Demo content is ready.</SuccessMessage>
//!   <Steps>...</Steps>
//! </Package>
//! ```
//!
//! Only a few well-known elements are read; step content is left to the
//! worker that executes the package.
//!
//! ## Example
//!
//! ```no_run
//! use manifest::{MessageKind, PackageManifest};
//! use std::path::Path;
//!
//! if let Some(manifest) = PackageManifest::from_package_dir(Path::new("/srv/app/Admin/Pkg1"))? {
//!     println!("{}", manifest.description().unwrap_or_default());
//!     if let Some(msg) = manifest.message(MessageKind::Success) {
//!         println!("{msg}");
//!     }
//! }
//! # Ok::<(), manifest::Error>(())
//! ```

mod error;
mod types;

pub use error::{Error, Result};
pub use types::{MessageKind, Parameter};

use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Parsed package manifest
#[derive(Debug, Clone)]
pub struct PackageManifest {
    path: PathBuf,
    name: Option<String>,
    description: Option<String>,
    parameters: Vec<Parameter>,
    messages: HashMap<MessageKind, String>,
}

impl PackageManifest {
    /// Find the manifest file of an unpacked package directory.
    ///
    /// The manifest is the only file directly inside the directory. Returns
    /// `None` when the directory holds zero or several files.
    pub fn locate(package_dir: &Path) -> Result<Option<PathBuf>> {
        if !package_dir.is_dir() {
            return Err(Error::PathNotFound(package_dir.to_path_buf()));
        }

        let entries = fs::read_dir(package_dir).map_err(|source| Error::Io {
            path: package_dir.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| Error::Io {
                path: package_dir.to_path_buf(),
                source,
            })?;
            if entry.path().is_file() {
                files.push(entry.path());
            }
        }

        if files.len() == 1 {
            Ok(files.pop())
        } else {
            Ok(None)
        }
    }

    /// Load the manifest of a package directory, if it has one
    pub fn from_package_dir(package_dir: &Path) -> Result<Option<Self>> {
        match Self::locate(package_dir)? {
            Some(path) => Self::load(&path).map(Some),
            None => Ok(None),
        }
    }

    /// Load and parse a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    /// Parse manifest XML; `path` is only kept for reporting
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let doc = Document::parse(text).map_err(|source| Error::Xml {
            path: path.to_path_buf(),
            source,
        })?;
        let root = doc.root_element();

        let mut messages = HashMap::new();
        for kind in [MessageKind::Success, MessageKind::Warning, MessageKind::Error] {
            if let Some(element) = child(root, kind.element_name()) {
                messages.insert(kind, inner_text(element));
            }
        }

        let parameters = child(root, "Parameters")
            .map(|params| {
                params
                    .children()
                    .filter(|n| n.has_tag_name("Parameter"))
                    .filter_map(|p| {
                        let name = p.attribute("name")?;
                        Some(Parameter {
                            name: name.trim_matches('@').to_string(),
                            description: p.attribute("description").map(str::to_string),
                            default_value: inner_text(p),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            name: child(root, "Name").map(inner_text),
            description: child(root, "Description").map(inner_text),
            parameters,
            messages,
        })
    }

    /// Path of the manifest file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value of the `<Name>` element
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Value of the `<Description>` element
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Declared package parameters, in manifest order
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Outcome message for the given kind, if the manifest declares one
    pub fn message(&self, kind: MessageKind) -> Option<&str> {
        self.messages.get(&kind).map(String::as_str)
    }
}

/// First child element with the given tag name
fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.is_element() && n.has_tag_name(name))
}

/// Concatenated text of all descendant text nodes
fn inner_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}
