//! Validated key types: section paths and option names.
//!
//! Both are normalized at the boundary where text enters the crate (the
//! section parser, overrides, inline directives) so later stages never deal
//! with raw, un-normalized strings.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Separator between section path segments in headers and in display form.
pub const SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("empty section segment in '{0}'")]
    EmptySegment(String),
    #[error("invalid character in section segment '{0}'")]
    InvalidSegment(String),
    #[error("option name is empty")]
    EmptyName,
    #[error("invalid option name '{0}'")]
    InvalidName(String),
}

/// A configuration scope such as `rules:l007`.
///
/// Segments are lowercased, non-empty and free of whitespace. The root section
/// is the empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub struct SectionPath(Vec<String>);

impl SectionPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a `:`-separated path. An empty (or all-whitespace) string is the root.
    pub fn parse(text: &str) -> Result<Self, KeyError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::root());
        }
        text.split(SEPARATOR)
            .map(|seg| normalize_segment(seg, text))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Build a path from already-separated segments (e.g. TOML table keys).
    pub fn from_segments<I, S>(segments: I) -> Result<Self, KeyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Vec::new();
        for seg in segments {
            out.push(normalize_segment(seg.as_ref(), seg.as_ref())?);
        }
        Ok(Self(out))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A new path with `segment` appended.
    pub fn child(&self, segment: &str) -> Result<Self, KeyError> {
        let mut segs = self.0.clone();
        segs.push(normalize_segment(segment, segment)?);
        Ok(Self(segs))
    }

    pub fn starts_with(&self, prefix: &SectionPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Drop the first segment if it equals `namespace` (compared lowercased).
    pub fn strip_namespace(&self, namespace: &str) -> Option<Self> {
        match self.0.first() {
            Some(first) if first.eq_ignore_ascii_case(namespace) => Some(Self(self.0[1..].to_vec())),
            _ => None,
        }
    }
}

fn normalize_segment(segment: &str, whole: &str) -> Result<String, KeyError> {
    let seg = segment.trim();
    if seg.is_empty() {
        return Err(KeyError::EmptySegment(whole.to_string()));
    }
    if seg.chars().any(|c| c.is_whitespace() || c == SEPARATOR || c == '[' || c == ']' || c == '=') {
        return Err(KeyError::InvalidSegment(seg.to_string()));
    }
    Ok(seg.to_lowercase())
}

impl fmt::Display for SectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        write!(f, "{}", self.0.join(":"))
    }
}

impl From<SectionPath> for String {
    fn from(path: SectionPath) -> Self {
        path.to_string()
    }
}

/// A normalized option name: trimmed, lowercased, no whitespace, no `:`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct OptionName(String);

impl OptionName {
    pub fn parse(text: &str) -> Result<Self, KeyError> {
        let name = text.trim();
        if name.is_empty() {
            return Err(KeyError::EmptyName);
        }
        if name.chars().any(|c| c.is_whitespace() || c == SEPARATOR || c == '=') {
            return Err(KeyError::InvalidName(name.to_string()));
        }
        Ok(Self(name.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Schema-declared names are trusted; they are only normalized.
impl From<&str> for OptionName {
    fn from(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OptionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nested_path() {
        let path = SectionPath::parse("rules:L007").unwrap();
        assert_eq!(path.segments(), ["rules", "l007"]);
        assert_eq!(path.to_string(), "rules:l007");
    }

    #[test]
    fn empty_text_is_root() {
        assert!(SectionPath::parse("  ").unwrap().is_root());
        assert_eq!(SectionPath::root().to_string(), "<root>");
    }

    #[test]
    fn segments_are_trimmed() {
        let path = SectionPath::parse(" rules : L014 ").unwrap();
        assert_eq!(path, SectionPath::parse("rules:l014").unwrap());
    }

    #[test]
    fn empty_segment_rejected() {
        assert!(matches!(
            SectionPath::parse("rules::L007"),
            Err(KeyError::EmptySegment(_))
        ));
        assert!(SectionPath::parse("rules:").is_err());
    }

    #[test]
    fn whitespace_inside_segment_rejected() {
        assert!(matches!(
            SectionPath::parse("my rules"),
            Err(KeyError::InvalidSegment(_))
        ));
    }

    #[test]
    fn strip_namespace_only_on_first_segment() {
        let path = SectionPath::parse("sqlfluff:rules").unwrap();
        assert_eq!(
            path.strip_namespace("SQLFluff"),
            Some(SectionPath::parse("rules").unwrap())
        );
        assert_eq!(path.strip_namespace("rules"), None);
        let bare = SectionPath::parse("sqlfluff").unwrap();
        assert_eq!(bare.strip_namespace("sqlfluff"), Some(SectionPath::root()));
    }

    #[test]
    fn child_and_prefix() {
        let rules = SectionPath::parse("rules").unwrap();
        let l014 = rules.child("L014").unwrap();
        assert!(l014.starts_with(&rules));
        assert!(!rules.starts_with(&l014));
        assert_eq!(l014.len(), 2);
        assert!(rules.child("a:b").is_err());
        assert!(rules.child("L 014").is_err());
    }

    #[test]
    fn option_name_normalized() {
        let name = OptionName::parse("  Max_Line_Length ").unwrap();
        assert_eq!(name.as_str(), "max_line_length");
        assert_eq!(OptionName::from("TAB_SPACE_SIZE").as_str(), "tab_space_size");
    }

    #[test]
    fn option_name_rejects_bad_input() {
        assert_eq!(OptionName::parse(""), Err(KeyError::EmptyName));
        assert!(matches!(
            OptionName::parse("a b"),
            Err(KeyError::InvalidName(_))
        ));
        assert!(OptionName::parse("a:b").is_err());
    }
}
