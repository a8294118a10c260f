//! Typed root-section settings consumed by the linter itself.
//!
//! [`CoreConfig`] is a confique struct: its `#[config(default = ...)]` values
//! are the lowest layer and its field list is the set of root keys that are
//! not rule options. Raw strings reach it through `deserialize_with` helpers
//! that reuse [`coerce`](crate::coerce), so `yes`/`no` and comma lists behave
//! exactly as they do for rule options. confique feeds defaults through the
//! same helpers, so defaults are written in their config-file form.

use std::collections::BTreeSet;

use confique::Config;
use confique::meta::{FieldKind, Meta};
use serde::{Deserialize, Deserializer, Serialize};
use toml::{Table, Value};

use crate::coerce::{OptionType, is_unset, parse_bool, split_list};
use crate::error::SqlfigError;
use crate::key::SectionPath;
use crate::merge::LayeredConfig;
use crate::schema::SchemaRegistry;
use crate::types::Provenance;

/// Settings from the root section.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CoreConfig {
    /// SQL dialect passed to the parser.
    pub dialect: Option<String>,

    /// Templating engine used to render SQL before parsing.
    #[config(default = "jinja")]
    pub templater: String,

    /// Rules to run: `all`, rule codes, or family names.
    #[config(default = "all", deserialize_with = comma_list)]
    pub rules: Vec<String>,

    /// Rules to skip: rule codes or family names.
    #[config(default = "", deserialize_with = comma_list)]
    pub exclude_rules: Vec<String>,

    /// Encoding of SQL files.
    #[config(default = "autodetect")]
    pub encoding: String,

    /// File extensions treated as SQL.
    #[config(default = ".sql", deserialize_with = comma_list)]
    pub sql_file_exts: Vec<String>,

    /// Hide violations that fall inside templated code.
    #[config(default = "true", deserialize_with = flexible_bool)]
    pub ignore_templated_areas: bool,

    /// Skip files larger than this many bytes; 0 disables the limit.
    #[config(default = "20000", deserialize_with = flexible_u64)]
    pub large_file_skip_byte_limit: u64,

    /// Worker processes for parallel linting.
    #[config(default = "1", deserialize_with = flexible_i64)]
    pub processes: i64,
}

fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(split_list(&s))
}

fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_bool(&s).ok_or_else(|| serde::de::Error::custom(OptionType::Bool.expected()))
}

fn flexible_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.trim()
        .parse()
        .map_err(|_| serde::de::Error::custom(OptionType::Int.expected()))
}

fn flexible_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.trim()
        .parse()
        .map_err(|_| serde::de::Error::custom("a non-negative integer"))
}

/// Names of every root key owned by [`CoreConfig`].
pub fn core_keys() -> BTreeSet<&'static str> {
    let mut keys = BTreeSet::new();
    collect_keys(&CoreConfig::META, &mut keys);
    keys
}

fn collect_keys(meta: &'static Meta, keys: &mut BTreeSet<&'static str>) {
    for field in meta.fields {
        match &field.kind {
            FieldKind::Leaf { .. } => {
                keys.insert(field.name);
            }
            FieldKind::Nested { meta, .. } => collect_keys(meta, keys),
        }
    }
}

/// Build [`CoreConfig`] from the root section of `config`.
///
/// Unset values are left out so the struct default applies. Keys that are not
/// core keys are ignored here; strict validation reports them separately.
pub fn load_core(config: &LayeredConfig) -> Result<CoreConfig, SqlfigError> {
    let keys = core_keys();
    let root = SectionPath::root();
    let mut table = Table::new();
    if let Some(options) = config.section(&root) {
        for (name, raw) in options {
            if keys.contains(name.as_str()) && !is_unset(&raw.value) {
                table.insert(name.to_string(), Value::String(raw.value.trim().to_string()));
            }
        }
    }

    let layer = match Value::Table(table.clone()).try_into::<<CoreConfig as Config>::Layer>() {
        Ok(layer) => layer,
        Err(e) => {
            return Err(locate_invalid(config, &table)
                .unwrap_or_else(|| invalid_root("<root>", "", e.message(), config)));
        }
    };

    Ok(CoreConfig::builder().preloaded(layer).load()?)
}

/// Find the first core key whose value alone fails to deserialize.
fn locate_invalid(config: &LayeredConfig, table: &Table) -> Option<SqlfigError> {
    for (key, value) in table {
        let mut single = Table::new();
        single.insert(key.clone(), value.clone());
        if let Err(e) = Value::Table(single).try_into::<<CoreConfig as Config>::Layer>() {
            let raw = value.as_str().unwrap_or_default();
            return Some(invalid_root(key, raw, e.message(), config));
        }
    }
    None
}

fn invalid_root(key: &str, value: &str, expected: &str, config: &LayeredConfig) -> SqlfigError {
    SqlfigError::InvalidOptionValue {
        section: SectionPath::root(),
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
        origin: root_origin(key, config),
    }
}

/// Where the root value of `key` was written.
fn root_origin(key: &str, config: &LayeredConfig) -> Provenance {
    config
        .section(&SectionPath::root())
        .and_then(|opts| opts.iter().find(|(name, _)| name.as_str() == key))
        .map(|(_, raw)| raw.provenance.clone())
        .unwrap_or(Provenance::Override)
}

/// Compute the enabled rule codes from `rules` and `exclude_rules`.
///
/// A selector matches `all`, a rule code (case-insensitive) or a family name.
/// Unknown selectors fail in strict mode, naming the source that set them,
/// and are logged otherwise.
pub fn select_rules(
    core: &CoreConfig,
    config: &LayeredConfig,
    registry: &SchemaRegistry,
    strict: bool,
) -> Result<BTreeSet<String>, SqlfigError> {
    let matches = |selector: &str, key: &str| -> Result<Vec<String>, SqlfigError> {
        let found: Vec<String> = if selector.eq_ignore_ascii_case("all") {
            registry.rules().map(|r| r.code.clone()).collect()
        } else if let Some(rule) = registry.rule(selector) {
            vec![rule.code.clone()]
        } else {
            registry.family_members(selector).map(|r| r.code.clone()).collect()
        };
        if found.is_empty() && !selector.eq_ignore_ascii_case("all") {
            if strict {
                return Err(SqlfigError::InvalidOptionValue {
                    section: SectionPath::root(),
                    key: key.to_string(),
                    value: selector.to_string(),
                    expected: "a registered rule code, rule family, or 'all'".into(),
                    origin: root_origin(key, config),
                });
            }
            tracing::warn!(selector, key, "rule selector matches no registered rule");
        }
        Ok(found)
    };

    let mut enabled = BTreeSet::new();
    for selector in &core.rules {
        enabled.extend(matches(selector, "rules")?);
    }
    for selector in &core.exclude_rules {
        for code in matches(selector, "exclude_rules")? {
            enabled.remove(&code);
        }
    }
    Ok(enabled)
}
