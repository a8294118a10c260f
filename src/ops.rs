//! Config inspection: raw listing, single-key lookup and a JSON dump of the
//! typed view.
//!
//! Provides the logic behind `config list`, `config get` and `config dump`,
//! and the `ConfigResult` enum that callers use to display results.

use std::fmt;

use confique::Config;
use confique::meta::Meta;

use crate::error::SqlfigError;
use crate::key::{OptionName, SEPARATOR, SectionPath};
use crate::resolve::ResolvedConfig;
use crate::settings::CoreConfig;

/// One row of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub section: String,
    pub key: String,
    pub value: String,
    pub origin: String,
}

/// Result of a config operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResult {
    /// A key's value, where it came from and its doc comment (core keys only).
    KeyValue {
        section: String,
        key: String,
        value: String,
        origin: String,
        doc: Vec<String>,
    },
    /// Every raw value in the merged tree.
    Listing { entries: Vec<ListEntry> },
    /// Pretty-printed JSON of the typed view.
    Dump(String),
}

impl fmt::Display for ConfigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigResult::KeyValue {
                section,
                key,
                value,
                origin,
                doc,
            } => {
                for line in doc {
                    writeln!(f, "# {line}")?;
                }
                write!(f, "{} = {value}  # {origin}", qualified(section, key))
            }
            ConfigResult::Listing { entries } => {
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(
                        f,
                        "{} = {}  # {}",
                        qualified(&entry.section, &entry.key),
                        entry.value,
                        entry.origin
                    )?;
                }
                Ok(())
            }
            ConfigResult::Dump(json) => write!(f, "{json}"),
        }
    }
}

fn qualified(section: &str, key: &str) -> String {
    if section.is_empty() {
        key.to_string()
    } else {
        format!("{section}{SEPARATOR}{key}")
    }
}

fn section_label(section: &SectionPath) -> String {
    if section.is_root() {
        String::new()
    } else {
        section.to_string()
    }
}

/// List every raw value with its provenance, sorted by section then key.
pub fn list_values(config: &ResolvedConfig) -> ConfigResult {
    let entries = config
        .raw()
        .entries()
        .map(|(section, name, raw)| ListEntry {
            section: section_label(section),
            key: name.to_string(),
            value: raw.value.clone(),
            origin: raw.provenance.to_string(),
        })
        .collect();
    ConfigResult::Listing { entries }
}

/// Look up one option. `section` is `:`-separated and empty for the root.
///
/// Configured values are reported as written. Root keys owned by
/// [`CoreConfig`] fall back to their typed default.
pub fn get_value(config: &ResolvedConfig, section: &str, key: &str) -> Result<ConfigResult, SqlfigError> {
    let not_found = || SqlfigError::KeyNotFound(qualified(section, key));
    let path = SectionPath::parse(section).map_err(|_| not_found())?;
    let name = OptionName::parse(key).map_err(|_| not_found())?;
    let doc = if path.is_root() {
        lookup_doc(&CoreConfig::META, name.as_str())
    } else {
        vec![]
    };

    if let Some(raw) = config.raw().get(&path, &name) {
        return Ok(ConfigResult::KeyValue {
            section: section_label(&path),
            key: name.to_string(),
            value: raw.value.clone(),
            origin: raw.provenance.to_string(),
            doc,
        });
    }

    if path.is_root() && !doc.is_empty() {
        let core = serde_json::to_value(config.core()).map_err(|_| not_found())?;
        let value = match core.get(name.as_str()) {
            Some(serde_json::Value::Null) => "<not set>".to_string(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map_or_else(|| item.to_string(), str::to_string))
                .collect::<Vec<_>>()
                .join(","),
            Some(other) => other.to_string(),
            None => return Err(not_found()),
        };
        return Ok(ConfigResult::KeyValue {
            section: String::new(),
            key: name.to_string(),
            value,
            origin: "default".into(),
            doc,
        });
    }

    Err(not_found())
}

/// Serialize the typed view of `config` as pretty-printed JSON.
pub fn dump_json(config: &ResolvedConfig) -> ConfigResult {
    let rules: serde_json::Map<String, serde_json::Value> = config
        .rules()
        .map(|params| (params.scope().to_string(), serde_json::json!(params)))
        .collect();
    let sections: serde_json::Map<String, serde_json::Value> = config
        .sections()
        .map(|params| (params.scope().to_string(), serde_json::json!(params)))
        .collect();
    let macros: Vec<&str> = config.macros().names().collect();

    let dump = serde_json::json!({
        "core": config.core(),
        "enabled_rules": config.enabled_rules(),
        "rules": rules,
        "sections": sections,
        "macros": macros,
        "template_context": config.template_context(),
        "sources": config.sources(),
    });
    ConfigResult::Dump(format!("{dump:#}"))
}

/// Doc comment of a top-level field of `meta`.
fn lookup_doc(meta: &Meta, key: &str) -> Vec<String> {
    meta.fields
        .iter()
        .find(|field| field.name == key)
        .map(|field| field.doc.iter().map(|s| s.to_string()).collect())
        .unwrap_or_default()
}
