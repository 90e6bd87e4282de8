//! Source tree enumeration.

use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::report::{SkipReason, Skipped};
use crate::{Error, Result};

/// A regular file found under the packed root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute or caller-relative path used to open the file.
    pub path: PathBuf,
    /// Path relative to the root, `/`-separated, as stored in the container.
    pub relative_path: String,
}

/// Everything found below a packed root.
#[derive(Debug, Clone, Default)]
pub struct SourceTree {
    /// Files to pack.
    pub files: Vec<SourceFile>,
    /// Entries that cannot be stored, with the reason.
    pub skipped: Vec<Skipped>,
}

/// List every regular file below `root`.
///
/// Symlinks to files are packed under the link's own name. Symlinks to
/// directories are not descended and show up in [`SourceTree::skipped`], as
/// do names that are not valid UTF-8. Order is whatever the filesystem
/// yields unless `sorted` is set, in which case files are ordered by
/// relative path.
pub fn collect_files(root: &Path, sorted: bool) -> Result<SourceTree> {
    let mut tree = SourceTree::default();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        let path = entry.into_path();

        let Some(relative_path) = relative_name(root, &path)? else {
            tree.skipped.push(Skipped {
                path: lossy_name(root, &path),
                reason: SkipReason::NonUtf8Path,
            });
            continue;
        };

        if file_type.is_symlink() {
            let reason = match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => None,
                Ok(meta) if meta.is_dir() => Some(SkipReason::SymlinkedDirectory),
                // sockets, fifos and devices are never packed
                Ok(_) => continue,
                Err(e) => Some(SkipReason::Read(e.to_string())),
            };
            if let Some(reason) = reason {
                tree.skipped.push(Skipped {
                    path: relative_path,
                    reason,
                });
                continue;
            }
        } else if !file_type.is_file() {
            continue;
        }

        tree.files.push(SourceFile {
            path,
            relative_path,
        });
    }
    if sorted {
        tree.files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        tree.skipped.sort_by(|a, b| a.path.cmp(&b.path));
    }
    Ok(tree)
}

fn strip_root<'p>(root: &Path, path: &'p Path) -> Result<&'p Path> {
    path.strip_prefix(root).map_err(|_| {
        Error::Format(format!(
            "{} is not below {}",
            path.display(),
            root.display()
        ))
    })
}

/// The `/`-joined relative name, or `None` if a component is not UTF-8.
fn relative_name(root: &Path, path: &Path) -> Result<Option<String>> {
    let parts: Option<Vec<&str>> = strip_root(root, path)?
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_str()),
            _ => None,
        })
        .collect();
    Ok(parts.map(|parts| parts.join("/")))
}

fn lossy_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Map a stored relative path onto `root`, rejecting anything that could
/// land outside of it.
pub fn safe_join(root: &Path, relative_path: &str) -> Option<PathBuf> {
    if relative_path.is_empty() || relative_path.starts_with('/') {
        return None;
    }
    let mut out = root.to_path_buf();
    for part in relative_path.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." || part.contains('\\') || part.contains(':') {
            return None;
        }
        let component = Path::new(part);
        if component.is_absolute() || component.components().count() != 1 {
            return None;
        }
        out.push(component);
    }
    if out == root {
        return None;
    }
    Some(out)
}
