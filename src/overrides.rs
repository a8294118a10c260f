//! Layers above every config file: programmatic overrides and inline
//! directives embedded in SQL files.
//!
//! Both produce a [`LayeredConfig`] that is overlaid on the merged files, so
//! they take part in strict validation and coercion exactly like file values.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::SqlfigError;
use crate::key::{OptionName, SEPARATOR, SectionPath};
use crate::merge::{LayeredConfig, RawValue};
use crate::types::Provenance;

static DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*--\s*([A-Za-z0-9_]+)\s*:(.*)$").unwrap());

/// One override of a single option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionOverride {
    pub section: SectionPath,
    pub name: OptionName,
    pub value: String,
    pub provenance: Provenance,
}

impl OptionOverride {
    /// Validate `section` (`:`-separated, empty for the root) and `key`.
    pub fn new(section: &str, key: &str, value: &str, provenance: Provenance) -> Result<Self, SqlfigError> {
        let invalid = |reason: String| SqlfigError::InvalidKey {
            key: if section.is_empty() {
                key.to_string()
            } else {
                format!("{section}{SEPARATOR}{key}")
            },
            reason,
        };
        let section = SectionPath::parse(section).map_err(|e| invalid(e.to_string()))?;
        let name = OptionName::parse(key).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            section,
            name,
            value: value.trim().to_string(),
            provenance,
        })
    }
}

/// Fold overrides into a layer. If several target the same option, the last
/// one wins.
pub fn overrides_to_layer(entries: &[OptionOverride]) -> LayeredConfig {
    let mut layer = LayeredConfig::new();
    for entry in entries {
        layer.set(
            entry.section.clone(),
            entry.name.clone(),
            RawValue {
                value: entry.value.clone(),
                provenance: entry.provenance.clone(),
            },
        );
    }
    layer
}

/// Read `-- <namespace>:<section...>:<key>:<value>` lines from `sql`.
///
/// The last `:`-separated component is the value and the one before it the
/// key; everything earlier is the section. `-- sqlfluff:dialect:ansi` sets a
/// root option. Comments for other namespaces are skipped.
pub fn parse_inline_directives(sql: &str, namespace: &str) -> Result<Vec<OptionOverride>, SqlfigError> {
    let mut directives = Vec::new();
    for (idx, line) in sql.lines().enumerate() {
        let Some(caps) = DIRECTIVE.captures(line) else {
            continue;
        };
        if !caps[1].eq_ignore_ascii_case(namespace) {
            continue;
        }
        let body = caps[2].trim();
        let mut parts: Vec<&str> = body.split(SEPARATOR).map(str::trim).collect();
        if parts.len() < 2 {
            return Err(SqlfigError::InvalidKey {
                key: body.to_string(),
                reason: format!("expected `{namespace}:<section>:<key>:<value>` on line {}", idx + 1),
            });
        }
        let value = parts.pop().unwrap_or_default();
        let key = parts.pop().unwrap_or_default();
        let section = parts.join(":");
        let directive = OptionOverride::new(&section, key, value, Provenance::Inline { line: idx + 1 })?;
        tracing::trace!(
            section = %directive.section,
            key = %directive.name,
            line = idx + 1,
            "inline directive"
        );
        directives.push(directive);
    }
    Ok(directives)
}
