//! Directory walking for template files.
//!
//! Template names are the file's path relative to the root directory, with
//! forward slashes and the extension kept:
//!
//! | File Path | Template Name |
//! |-----------|---------------|
//! | `views/index.html` | `"index.html"` |
//! | `views/user/list.html` | `"user/list.html"` |
//! | `views/layouts/base.html` | `"layouts/base.html"` |
//!
//! Files with another extension and directories themselves are skipped.

use std::path::{Path, PathBuf};

use crate::error::CompileError;

/// A template file found under the root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Slash-normalized path relative to the root (e.g. `"user/list.html"`).
    pub name: String,
    /// Full filesystem path for reading content.
    pub path: PathBuf,
}

impl TemplateFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Reads the template source from disk.
    pub fn read(&self) -> Result<String, CompileError> {
        std::fs::read_to_string(&self.path).map_err(|source| CompileError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Walks `root` recursively and collects every file ending in `extension`.
///
/// The result is sorted by name so compile passes are deterministic.
pub fn walk_template_dir(root: &Path, extension: &str) -> Result<Vec<TemplateFile>, CompileError> {
    let mut files = Vec::new();
    walk_dir_recursive(root, root, extension, &mut files)?;
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

fn walk_dir_recursive(
    current: &Path,
    root: &Path,
    extension: &str,
    files: &mut Vec<TemplateFile>,
) -> Result<(), CompileError> {
    let io_err = |source| CompileError::Io {
        path: current.to_path_buf(),
        source,
    };

    for entry in std::fs::read_dir(current).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();

        if path.is_dir() {
            walk_dir_recursive(&path, root, extension, files)?;
        } else if path.is_file() {
            if let Some(file) = try_parse_file(&path, root, extension) {
                files.push(file);
            }
        }
    }

    Ok(())
}

/// Returns `None` if the file doesn't carry the template extension.
fn try_parse_file(path: &Path, root: &Path, extension: &str) -> Option<TemplateFile> {
    let file_name = path.file_name()?.to_string_lossy();
    if !file_name.ends_with(extension) {
        return None;
    }

    let relative = path.strip_prefix(root).ok()?;
    Some(TemplateFile::new(normalize_name(relative), path))
}

/// Converts a relative path into a template name with forward slashes.
pub fn normalize_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
