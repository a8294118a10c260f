//! Public value types shared across the pipeline.
//!
//! # Where configuration comes from
//!
//! [`SearchPath`] entries are listed in **priority-ascending** order: the last
//! entry wins. The default list is:
//!
//! ```text
//! Platform            ~/.config/sqlfluff/        (lowest)
//! Home                ~/
//! Ancestors(Root)     /, /home, /home/me/proj, /home/me/proj/models   (highest)
//! ```
//!
//! User-global locations always rank below every project directory. When a
//! directory shows up twice (your home directory is usually also an ancestor
//! of the project), only its later, higher-priority slot is kept, so its rank
//! follows filesystem depth.
//!
//! # What a file can be
//!
//! [`ConfigFileKind`] decides how a file is parsed. Dedicated files belong to
//! the linter entirely; shared INI files (`setup.cfg`, `tox.ini`) are read only
//! for namespaced sections; `pyproject.toml` is read under `[tool.<namespace>]`.

use std::fmt;
use std::path::PathBuf;

/// Where to search for config files.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// The user's home directory.
    Home,
    /// An explicit directory.
    Path(PathBuf),
    /// Every directory from the boundary down to the target file's directory,
    /// shallowest first.
    Ancestors(Boundary),
}

/// How far an [`Ancestors`](SearchPath::Ancestors) walk goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Boundary {
    /// Walk to the filesystem root.
    Root,
    /// Stop (inclusive) at the first directory containing this entry, e.g. `.git`.
    Marker(&'static str),
}

/// How a configuration file is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFileKind {
    /// INI file owned by the linter (`.sqlfluff`).
    Dedicated,
    /// INI file shared with other tools; only namespaced sections count.
    Shared,
    /// `pyproject.toml`, read under `[tool.<namespace>]`.
    Pyproject,
}

impl ConfigFileKind {
    /// Classify a file by name.
    pub fn for_file_name(name: &str) -> Self {
        match name {
            "pyproject.toml" => ConfigFileKind::Pyproject,
            "setup.cfg" | "tox.ini" | "pep8.ini" => ConfigFileKind::Shared,
            _ => ConfigFileKind::Dedicated,
        }
    }

    /// Cheap textual check that a file holds settings for `namespace` at all.
    ///
    /// A `pyproject.toml` or `setup.cfg` without linter settings must not
    /// shadow a lower-priority file name in the same directory.
    pub fn is_relevant(self, text: &str, namespace: &str) -> bool {
        match self {
            ConfigFileKind::Dedicated => true,
            ConfigFileKind::Shared => text.contains(&format!("[{namespace}")),
            ConfigFileKind::Pyproject => text.contains(&format!("tool.{namespace}")),
        }
    }
}

/// Where a raw value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// A configuration file, with the 1-indexed line (0 when unknown).
    File { path: PathBuf, line: usize },
    /// A programmatic override on the builder.
    Override,
    /// An inline directive inside a SQL file.
    Inline { line: usize },
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::File { path, line: 0 } => write!(f, "{}", path.display()),
            Provenance::File { path, line } => write!(f, "{} (line {line})", path.display()),
            Provenance::Override => f.write_str("override"),
            Provenance::Inline { line } => write!(f, "inline directive (line {line})"),
        }
    }
}

/// A config inspection operation, independent of any CLI framework.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigAction {
    /// Every resolved raw value with its origin.
    List,
    /// A single raw value, e.g. `section = "rules:L014"`, `key = "capitalisation_policy"`.
    Get { section: String, key: String },
    /// The typed view (core settings and rule parameters) as JSON.
    Dump,
}
