//! Macro namespace builder.
//!
//! Macros are collected as text and handed to the templating engine through
//! [`MacroTarget`]; nothing here evaluates a template. Later sources replace
//! same-named earlier ones wholesale:
//!
//! ```text
//! dbt built-ins        (templater:jinja apply_dbt_builtins, default on)
//!   ↑ macro files      (templater:jinja load_macros_from_path)
//!   ↑ config entries   ([templater:jinja:macros])
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::error::SqlfigError;
use crate::key::SectionPath;
use crate::merge::LayeredConfig;
use crate::params::{ParameterSet, ValueOrigin};
use crate::schema::MACROS_SECTION;
use crate::types::Provenance;

static MACRO_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)\{%-?\s*macro\s+([A-Za-z_][A-Za-z0-9_]*)\s*\((.*?)\)\s*-?%\}(.*?)\{%-?\s*endmacro\s*-?%\}",
    )
    .unwrap()
});

/// Definitions emulating the helpers dbt provides to every model.
const DBT_BUILTINS: &str = "\
{% macro ref(model_ref) %}{{ model_ref }}{% endmacro %}
{% macro source(source_name, table) %}{{ source_name }}_{{ table }}{% endmacro %}
{% macro config() %}{% endmacro %}
{% macro var(variable, default='') %}item{% endmacro %}
{% macro is_incremental() %}True{% endmacro %}
";

/// A declared macro parameter, with its default expression if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroParam {
    pub name: String,
    pub default: Option<String>,
}

/// One `{% macro %}` block, kept as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    pub name: String,
    pub params: Vec<MacroParam>,
    pub body: String,
    /// The complete block, from `{% macro` to `endmacro %}`.
    pub source: String,
}

impl MacroDefinition {
    /// Extract every macro block in `text`, in order of appearance.
    pub fn parse_all(text: &str) -> Vec<MacroDefinition> {
        MACRO_BLOCK
            .captures_iter(text)
            .map(|caps| MacroDefinition {
                name: caps[1].to_string(),
                params: split_params(&caps[2]),
                body: caps[3].to_string(),
                source: caps[0].to_string(),
            })
            .collect()
    }
}

/// Split a parameter list at top-level commas.
fn split_params(list: &str) -> Vec<MacroParam> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    parts.push(&list[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&list[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((name, default)) => MacroParam {
                name: name.trim().to_string(),
                default: Some(default.trim().to_string()),
            },
            None => MacroParam {
                name: part.to_string(),
                default: None,
            },
        })
        .collect()
}

/// Where a namespace entry came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroOrigin {
    Builtin,
    File(PathBuf),
    /// An entry of `[templater:jinja:macros]`.
    Config { entry: String, provenance: Provenance },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroEntry {
    pub definition: MacroDefinition,
    pub origin: MacroOrigin,
}

/// Anything a macro namespace can be installed into, typically a template
/// environment.
pub trait MacroTarget {
    fn register_macro(&mut self, definition: &MacroDefinition);
}

impl MacroTarget for Vec<MacroDefinition> {
    fn register_macro(&mut self, definition: &MacroDefinition) {
        self.push(definition.clone());
    }
}

/// Macros available to templates, keyed by macro name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroNamespace {
    macros: BTreeMap<String, MacroEntry>,
}

impl MacroNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dbt_builtins() -> Self {
        let mut ns = Self::new();
        ns.extend(MacroDefinition::parse_all(DBT_BUILTINS), &MacroOrigin::Builtin);
        ns
    }

    /// Add `definition`, replacing any macro with the same name.
    pub fn insert(&mut self, definition: MacroDefinition, origin: MacroOrigin) {
        if let Some(previous) = self.macros.get(&definition.name) {
            tracing::trace!(
                name = %definition.name,
                previous = ?previous.origin,
                "macro replaced"
            );
        }
        self.macros.insert(
            definition.name.clone(),
            MacroEntry {
                definition,
                origin,
            },
        );
    }

    fn extend(&mut self, definitions: Vec<MacroDefinition>, origin: &MacroOrigin) {
        for definition in definitions {
            self.insert(definition, origin.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&MacroEntry> {
        self.macros.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.macros.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MacroEntry)> {
        self.macros.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Register every definition with `target`, in name order.
    pub fn inject<T: MacroTarget + ?Sized>(&self, target: &mut T) {
        for entry in self.macros.values() {
            target.register_macro(&entry.definition);
        }
    }

    /// All definitions as one template string, to prepend to a template.
    pub fn prelude(&self) -> String {
        self.macros
            .values()
            .map(|entry| entry.definition.source.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Assemble the namespace from resolved `templater:jinja` options and the
/// `templater:jinja:macros` section.
pub fn build_namespace(jinja: &ParameterSet, config: &LayeredConfig) -> Result<MacroNamespace, SqlfigError> {
    if jinja.get_bool("inject_macros") == Some(false) {
        tracing::debug!("macro injection disabled");
        return Ok(MacroNamespace::new());
    }

    let mut ns = if jinja.get_bool("apply_dbt_builtins").unwrap_or(true) {
        MacroNamespace::dbt_builtins()
    } else {
        MacroNamespace::new()
    };

    if let Some(paths) = jinja.get_list("load_macros_from_path") {
        let base = jinja
            .resolved("load_macros_from_path")
            .and_then(|resolved| match &resolved.origin {
                ValueOrigin::Configured {
                    provenance: Provenance::File { path, .. },
                    ..
                } => path.parent().map(Path::to_path_buf),
                _ => None,
            });
        for raw in paths {
            let path = match &base {
                Some(dir) => dir.join(raw),
                None => PathBuf::from(raw),
            };
            for file in macro_files(&path)? {
                let text = fs::read_to_string(&file).map_err(|source| SqlfigError::UnreadableSource {
                    path: file.clone(),
                    source,
                })?;
                let defs = MacroDefinition::parse_all(&text);
                tracing::debug!(path = %file.display(), macros = defs.len(), "loaded macro file");
                ns.extend(defs, &MacroOrigin::File(file));
            }
        }
    }

    let section = SectionPath::parse(MACROS_SECTION).unwrap_or_default();
    if let Some(entries) = config.section(&section) {
        for (entry, raw) in entries {
            let defs = MacroDefinition::parse_all(&raw.value);
            if defs.is_empty() {
                return Err(SqlfigError::InvalidOptionValue {
                    section: section.clone(),
                    key: entry.to_string(),
                    value: raw.value.clone(),
                    expected: "at least one {% macro %} definition".into(),
                    origin: raw.provenance.clone(),
                });
            }
            ns.extend(
                defs,
                &MacroOrigin::Config {
                    entry: entry.to_string(),
                    provenance: raw.provenance.clone(),
                },
            );
        }
    }

    Ok(ns)
}

/// `.sql` files under `path` in sorted order, or `path` itself if it is a file.
fn macro_files(path: &Path) -> Result<Vec<PathBuf>, SqlfigError> {
    let unreadable = |source: io::Error| SqlfigError::UnreadableSource {
        path: path.to_path_buf(),
        source,
    };
    let meta = fs::metadata(path).map_err(unreadable)?;
    if meta.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| unreadable(io::Error::from(e)))?;
        let is_sql = entry.path().extension().and_then(|ext| ext.to_str()) == Some("sql");
        if entry.file_type().is_file() && is_sql {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
