//! Scope discovery: which configuration files apply to a target SQL file.
//!
//! # Discovery
//!
//! Each [`SearchPath`] variant resolves to one or more concrete directories:
//!
//! - `Platform`, `Home`, `Path` resolve to a single directory.
//! - `Ancestors(boundary)` expands into every directory between the boundary
//!   and the target file's directory, **shallowest first**, so deeper
//!   directories get higher priority under the list convention of
//!   "last = highest priority".
//!
//! A directory that appears more than once keeps only its last position.
//!
//! # Selection
//!
//! Every directory contributes at most one [`ConfigSource`]: the first file
//! name (in the configured priority order) that exists and actually carries
//! settings for the namespace. Missing files are silently skipped. Only real
//! I/O errors (permissions, a directory where a file should be) propagate, as
//! [`SqlfigError::UnreadableSource`].

use std::path::{Path, PathBuf};

use crate::error::SqlfigError;
use crate::types::{Boundary, ConfigFileKind, SearchPath};

/// One discovered configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Number of components in the containing directory; `/` is 1.
    pub depth: usize,
    pub kind: ConfigFileKind,
    pub text: String,
}

impl ConfigSource {
    /// A source that did not come from disk (tests, embedded defaults).
    pub fn in_memory(path: impl Into<PathBuf>, kind: ConfigFileKind, text: impl Into<String>) -> Self {
        let path = path.into();
        let depth = path.parent().map_or(0, |dir| dir.components().count());
        Self {
            path,
            depth,
            kind,
            text: text.into(),
        }
    }
}

/// Default file names, highest priority first, for an application namespace.
pub fn default_file_names(app_name: &str) -> Vec<String> {
    vec![
        format!(".{app_name}"),
        "pyproject.toml".to_string(),
        "setup.cfg".to_string(),
        "tox.ini".to_string(),
        "pep8.ini".to_string(),
    ]
}

/// Resolve a single-directory [`SearchPath`] to a concrete path.
///
/// Returns `None` if the path cannot be resolved (e.g. no home directory).
/// `Ancestors` expands to many directories and yields `None` here; use
/// [`expand_ancestors_from`].
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().to_path_buf())
        }
        SearchPath::Path(p) => Some(p.clone()),
        SearchPath::Ancestors(_) => None,
    }
}

/// Walk from `start` toward the filesystem root, shallowest first.
///
/// [`Boundary::Marker`] stops (inclusive) at the first directory containing
/// the marker and falls back to the root if it is never found.
pub fn expand_ancestors_from(start: &Path, boundary: &Boundary) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut current = start;

    loop {
        dirs.push(current.to_path_buf());

        if let Boundary::Marker(name) = boundary
            && current.join(name).exists()
        {
            break;
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }

    dirs.reverse();
    dirs
}

/// The directory whose ancestors are searched for `target`.
///
/// A directory target is used as-is; a file target uses its parent. Relative
/// targets are made absolute against the current directory.
pub fn target_dir(target: &Path) -> PathBuf {
    let absolute = std::path::absolute(target).unwrap_or_else(|_| target.to_path_buf());
    if absolute.is_dir() {
        return absolute;
    }
    absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or(absolute)
}

/// Expand search paths into a flat, de-duplicated, priority-ascending list of
/// directories for `target`.
pub fn expand_search_paths(search_paths: &[SearchPath], app_name: &str, target: &Path) -> Vec<PathBuf> {
    let start = target_dir(target);
    let mut dirs = Vec::new();
    for sp in search_paths {
        match sp {
            SearchPath::Ancestors(boundary) => dirs.extend(expand_ancestors_from(&start, boundary)),
            other => {
                if let Some(dir) = resolve_search_path(other, app_name) {
                    dirs.push(dir);
                }
            }
        }
    }
    dedup_keep_last(dirs)
}

fn dedup_keep_last(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::with_capacity(dirs.len());
    for (i, dir) in dirs.iter().enumerate() {
        if !dirs[i + 1..].contains(dir) {
            out.push(dir.clone());
        }
    }
    out
}

/// Pick at most one configuration file per directory.
///
/// `file_names` is in priority order; the first name that exists and is
/// relevant for `namespace` wins for that directory.
pub fn load_sources(
    dirs: &[PathBuf],
    file_names: &[String],
    namespace: &str,
) -> Result<Vec<ConfigSource>, SqlfigError> {
    let mut sources = Vec::new();
    for dir in dirs {
        for name in file_names {
            let path = dir.join(name);
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(SqlfigError::UnreadableSource { path, source: e }),
            };
            let kind = ConfigFileKind::for_file_name(name);
            if !kind.is_relevant(&text, namespace) {
                tracing::trace!(path = %path.display(), namespace, "skipping file without settings");
                continue;
            }
            tracing::debug!(path = %path.display(), "found config source");
            sources.push(ConfigSource {
                depth: dir.components().count(),
                path,
                kind,
                text,
            });
            break;
        }
    }
    Ok(sources)
}

/// Discover every configuration source for `target`, root-most first.
pub fn discover(
    search_paths: &[SearchPath],
    file_names: &[String],
    app_name: &str,
    target: &Path,
) -> Result<Vec<ConfigSource>, SqlfigError> {
    let dirs = expand_search_paths(search_paths, app_name, target);
    load_sources(&dirs, file_names, app_name)
}
