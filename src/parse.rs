//! Section parser: configuration text to ordered raw entries.
//!
//! Two surface syntaxes feed the same output:
//!
//! - **INI** (`.sqlfluff`, `setup.cfg`, `tox.ini`, `pep8.ini`): `[a:b]` headers,
//!   `name = value` lines, `#`/`;` comments, indented continuation lines.
//! - **TOML** (`pyproject.toml`): tables under `[tool.<namespace>]`.
//!
//! Neither interprets values. Every value stays a string until
//! [`coerce`](crate::coerce) applies a declared type.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use toml::{Table, Value};

use crate::error::SqlfigError;
use crate::file::ConfigSource;
use crate::key::{OptionName, SectionPath};
use crate::types::ConfigFileKind;

/// One `name = value` occurrence, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub section: SectionPath,
    pub name: OptionName,
    pub value: String,
    /// 1-indexed; 0 when the syntax has no line information.
    pub line: usize,
}

/// The entries of one configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSource {
    pub path: PathBuf,
    pub entries: Vec<RawEntry>,
}

/// Parse a discovered source according to its kind.
pub fn parse_source(source: &ConfigSource, namespace: &str) -> Result<ParsedSource, SqlfigError> {
    let parsed = match source.kind {
        ConfigFileKind::Pyproject => parse_pyproject(&source.text, &source.path, namespace)?,
        kind => parse_ini(&source.text, &source.path, kind, namespace)?,
    };
    tracing::trace!(
        path = %source.path.display(),
        entries = parsed.entries.len(),
        "parsed config source"
    );
    Ok(parsed)
}

/// Parse INI-style text.
///
/// Headers whose first segment is `namespace` have it stripped. In a
/// [`Dedicated`](ConfigFileKind::Dedicated) file other headers are kept as-is
/// and lines before the first header belong to the root section; in a
/// [`Shared`](ConfigFileKind::Shared) file only namespaced sections are read.
pub fn parse_ini(
    text: &str,
    path: &Path,
    kind: ConfigFileKind,
    namespace: &str,
) -> Result<ParsedSource, SqlfigError> {
    let malformed = |line: usize, reason: String| SqlfigError::MalformedSource {
        path: path.to_path_buf(),
        line,
        reason,
    };

    // `None` while inside a section this file's kind tells us to skip.
    let mut section = match kind {
        ConfigFileKind::Dedicated => Some(SectionPath::root()),
        _ => None,
    };
    let mut seen: HashSet<OptionName> = HashSet::new();
    let mut entries: Vec<RawEntry> = Vec::new();
    let mut last_option: Option<usize> = None;
    // Blank lines seen since the last option line; kept only if indented
    // content follows.
    let mut pending_blanks = 0;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw_line.trim();

        if trimmed.is_empty() {
            if last_option.is_some() {
                pending_blanks += 1;
            }
            continue;
        }
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let content = strip_inline_comment(trimmed);
        let indented = raw_line.starts_with(char::is_whitespace);

        if indented && let Some(pos) = last_option {
            if !content.is_empty() {
                let entry = &mut entries[pos];
                if !entry.value.is_empty() {
                    for _ in 0..pending_blanks {
                        entry.value.push('\n');
                    }
                    entry.value.push('\n');
                }
                entry.value.push_str(content);
                pending_blanks = 0;
            }
            continue;
        }
        last_option = None;
        pending_blanks = 0;

        if content.starts_with('[') {
            let inner = content
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
                .ok_or_else(|| malformed(line_no, "unterminated section header".into()))?;
            if inner.trim().is_empty() {
                return Err(malformed(line_no, "empty section header".into()));
            }
            let header =
                SectionPath::parse(inner).map_err(|e| malformed(line_no, e.to_string()))?;
            section = match header.strip_namespace(namespace) {
                Some(stripped) => Some(stripped),
                None if kind == ConfigFileKind::Dedicated => Some(header),
                None => None,
            };
            seen.clear();
            last_option = None;
            continue;
        }

        let Some(current) = &section else {
            continue;
        };

        let (name, value) = content
            .split_once('=')
            .ok_or_else(|| malformed(line_no, format!("expected `name = value`, got '{content}'")))?;
        let name = OptionName::parse(name).map_err(|e| malformed(line_no, e.to_string()))?;

        if !seen.insert(name.clone()) {
            return Err(SqlfigError::DuplicateOptionInSource {
                key: name.to_string(),
                section: current.clone(),
                path: path.to_path_buf(),
                line: line_no,
            });
        }

        entries.push(RawEntry {
            section: current.clone(),
            name,
            value: value.trim().to_string(),
            line: line_no,
        });
        last_option = Some(entries.len() - 1);
    }

    Ok(ParsedSource {
        path: path.to_path_buf(),
        entries,
    })
}

/// Drop an inline `#` comment.
///
/// A `#` starts a comment when it follows whitespace (or opens the text) and
/// sits outside a quoted run. A `#}` closing a jinja comment is not a comment
/// start, so `{# ... #}` inside values survives.
fn strip_inline_comment(text: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut prev_ws = true;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let closes_jinja = chars.peek().is_some_and(|(_, n)| *n == '}');
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '#' && prev_ws && !closes_jinja => return text[..i].trim_end(),
            None => {}
        }
        prev_ws = c.is_whitespace();
    }
    text
}

/// Parse the `[tool.<namespace>]` table of a `pyproject.toml`.
///
/// The `core` sub-table and top-level scalars map to the root section; other
/// sub-tables map to nested sections (`[tool.sqlfluff.rules.L014]` →
/// `rules:l014`). A file without the table yields no entries.
pub fn parse_pyproject(
    text: &str,
    path: &Path,
    namespace: &str,
) -> Result<ParsedSource, SqlfigError> {
    let doc: Table = toml::from_str(text).map_err(|e| SqlfigError::TomlParse {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut entries = Vec::new();
    if let Some(table) = doc
        .get("tool")
        .and_then(Value::as_table)
        .and_then(|tool| tool.get(namespace))
        .and_then(Value::as_table)
    {
        let mut seen = HashSet::new();
        walk_table(table, &SectionPath::root(), true, path, &mut seen, &mut entries)?;
    }

    Ok(ParsedSource {
        path: path.to_path_buf(),
        entries,
    })
}

fn walk_table(
    table: &Table,
    section: &SectionPath,
    top_level: bool,
    path: &Path,
    seen: &mut HashSet<(SectionPath, OptionName)>,
    out: &mut Vec<RawEntry>,
) -> Result<(), SqlfigError> {
    let malformed = |reason: String| SqlfigError::MalformedSource {
        path: path.to_path_buf(),
        line: 0,
        reason,
    };

    for (key, value) in table {
        if let Value::Table(sub) = value {
            let child = if top_level && key == "core" {
                SectionPath::root()
            } else {
                section.child(key).map_err(|e| malformed(e.to_string()))?
            };
            walk_table(sub, &child, false, path, seen, out)?;
            continue;
        }

        let name = OptionName::parse(key).map_err(|e| malformed(e.to_string()))?;
        if !seen.insert((section.clone(), name.clone())) {
            return Err(SqlfigError::DuplicateOptionInSource {
                key: name.to_string(),
                section: section.clone(),
                path: path.to_path_buf(),
                line: 0,
            });
        }
        let raw = stringify(value).ok_or_else(|| {
            malformed(format!("unsupported value for '{key}' in [{section}]"))
        })?;
        out.push(RawEntry {
            section: section.clone(),
            name,
            value: raw,
            line: 0,
        });
    }
    Ok(())
}

/// Scalars become their text form; arrays of scalars are comma-joined.
fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Array(_) | Value::Table(_) => None,
                scalar => stringify(scalar),
            })
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join(",")),
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(true) => Some("True".into()),
        Value::Boolean(false) => Some("False".into()),
        Value::Datetime(dt) => Some(dt.to_string()),
        Value::Table(_) => None,
    }
}
