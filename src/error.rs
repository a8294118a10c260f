use std::path::PathBuf;

use thiserror::Error;

use crate::key::SectionPath;
use crate::types::Provenance;

#[derive(Debug, Error)]
pub enum SqlfigError {
    #[error("Duplicate option '{key}' in [{section}] of {path} (line {line})")]
    DuplicateOptionInSource {
        key: String,
        section: SectionPath,
        path: PathBuf,
        line: usize,
    },

    #[error("Invalid value '{value}' for '{key}' in [{section}] from {origin}: expected {expected}")]
    InvalidOptionValue {
        section: SectionPath,
        key: String,
        value: String,
        expected: String,
        origin: Provenance,
    },

    #[error("Unknown option '{key}' in [{section}] from {origin}")]
    UnknownOption {
        section: SectionPath,
        key: String,
        origin: Provenance,
    },

    #[error("Unknown options in configuration")]
    UnknownOptions(Vec<SqlfigError>),

    #[error("Failed to read {path}: {source}")]
    UnreadableSource {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed configuration in {path} (line {line}): {reason}")]
    MalformedSource {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Failed to parse {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] confique::Error),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("App name is required, call .app_name() on the builder")]
    AppNameRequired,
}
