//! Config merger: fold parsed sources into one layered raw tree.
//!
//! The only rule is "last write at a `(section, name)` pair wins". Writing
//! `rules:l007.x` never looks at `rules.x`; inheritance between scopes is the
//! parameter resolver's job, because different options live at different
//! scopes and blind inheritance would leak unrelated keys.

use std::collections::BTreeMap;

use crate::key::{OptionName, SectionPath};
use crate::parse::ParsedSource;
use crate::types::Provenance;

/// A raw value and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    pub value: String,
    pub provenance: Provenance,
}

/// The merged, still-untyped configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayeredConfig {
    sections: BTreeMap<SectionPath, BTreeMap<OptionName, RawValue>>,
}

impl LayeredConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a value, unconditionally replacing any earlier one at the same pair.
    ///
    /// The unset sentinel is a write like any other.
    pub fn set(&mut self, section: SectionPath, name: OptionName, value: RawValue) {
        self.sections.entry(section).or_default().insert(name, value);
    }

    pub fn get(&self, section: &SectionPath, name: &OptionName) -> Option<&RawValue> {
        self.sections.get(section)?.get(name)
    }

    /// All options written directly at `section` (no inheritance).
    pub fn section(&self, section: &SectionPath) -> Option<&BTreeMap<OptionName, RawValue>> {
        self.sections.get(section)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&SectionPath, &BTreeMap<OptionName, RawValue>)> {
        self.sections.iter()
    }

    /// Every `(section, name, value)` triple, sorted by section then name.
    pub fn entries(&self) -> impl Iterator<Item = (&SectionPath, &OptionName, &RawValue)> {
        self.sections
            .iter()
            .flat_map(|(section, opts)| opts.iter().map(move |(name, raw)| (section, name, raw)))
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Overlay one parsed source on top of this tree.
    pub fn apply(&mut self, source: &ParsedSource) {
        for entry in &source.entries {
            self.set(
                entry.section.clone(),
                entry.name.clone(),
                RawValue {
                    value: entry.value.clone(),
                    provenance: Provenance::File {
                        path: source.path.clone(),
                        line: entry.line,
                    },
                },
            );
        }
    }

    /// Overlay every entry of `other` on top of this tree.
    pub fn overlay(&mut self, other: &LayeredConfig) {
        for (section, name, raw) in other.entries() {
            self.set(section.clone(), name.clone(), raw.clone());
        }
    }
}

/// Merge parsed sources in precedence order: first = lowest, last = highest.
pub fn merge(sources: &[ParsedSource]) -> LayeredConfig {
    let mut merged = LayeredConfig::new();
    for source in sources {
        tracing::debug!(
            path = %source.path.display(),
            entries = source.entries.len(),
            "merging config source"
        );
        merged.apply(source);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_ini;
    use crate::types::ConfigFileKind;
    use std::path::Path;

    fn parsed(path: &str, text: &str) -> ParsedSource {
        parse_ini(text, Path::new(path), ConfigFileKind::Dedicated, "sqlfluff").unwrap()
    }

    fn value<'a>(cfg: &'a LayeredConfig, section: &str, name: &str) -> Option<&'a str> {
        cfg.get(&SectionPath::parse(section).unwrap(), &OptionName::from(name))
            .map(|raw| raw.value.as_str())
    }

    #[test]
    fn disjoint_keys_merge() {
        let merged = merge(&[
            parsed("/a/.sqlfluff", "dialect = ansi\n"),
            parsed("/a/b/.sqlfluff", "templater = raw\n"),
        ]);
        assert_eq!(value(&merged, "", "dialect"), Some("ansi"));
        assert_eq!(value(&merged, "", "templater"), Some("raw"));
    }

    #[test]
    fn deeper_source_wins() {
        let merged = merge(&[
            parsed("/a/.sqlfluff", "[rules]\nmax_line_length = 80\n"),
            parsed("/a/b/.sqlfluff", "[rules]\nmax_line_length = 120\n"),
        ]);
        assert_eq!(value(&merged, "rules", "max_line_length"), Some("120"));
        let raw = merged
            .get(&SectionPath::parse("rules").unwrap(), &OptionName::from("max_line_length"))
            .unwrap();
        assert_eq!(
            raw.provenance,
            Provenance::File {
                path: "/a/b/.sqlfluff".into(),
                line: 2
            }
        );
    }

    #[test]
    fn deeper_source_wins_regardless_of_section_order_within_files() {
        let shallow = "[rules:l007]\nx = shallow\n[rules]\ny = 1\n";
        let deep = "[rules]\ny = 2\n[rules:l007]\nx = deep\n";
        for (first, second) in [(shallow, deep), (deep, shallow)] {
            let merged = merge(&[parsed("/a/.sqlfluff", first), parsed("/a/b/.sqlfluff", second)]);
            let expected_x = if second == deep { "deep" } else { "shallow" };
            let expected_y = if second == deep { "2" } else { "1" };
            assert_eq!(value(&merged, "rules:l007", "x"), Some(expected_x));
            assert_eq!(value(&merged, "rules", "y"), Some(expected_y));
        }
    }

    #[test]
    fn nested_section_does_not_inherit() {
        let merged = merge(&[parsed(
            "/a/.sqlfluff",
            "[rules]\nmax_line_length = 80\n[rules:L016]\nignore_comment_lines = True\n",
        )]);
        assert_eq!(value(&merged, "rules:l016", "max_line_length"), None);
        assert_eq!(merged.section(&SectionPath::parse("rules:l016").unwrap()).unwrap().len(), 1);
    }

    #[test]
    fn unset_sentinel_overrides_concrete_value() {
        let merged = merge(&[
            parsed("/a/.sqlfluff", "[rules]\ntab_space_size = 4\n"),
            parsed("/a/b/.sqlfluff", "[rules]\ntab_space_size = None\n"),
        ]);
        assert_eq!(value(&merged, "rules", "tab_space_size"), Some("None"));
    }

    #[test]
    fn repeated_header_later_block_wins_within_file() {
        let merged = merge(&[parsed("/a/.sqlfluff", "[rules]\na = 1\n[x]\nb = 1\n[rules]\na = 2\n")]);
        assert_eq!(value(&merged, "rules", "a"), Some("2"));
    }

    #[test]
    fn empty_input_is_empty_tree() {
        assert!(merge(&[]).is_empty());
    }

    #[test]
    fn overlay_replaces_pairs() {
        let mut base = merge(&[parsed("/a/.sqlfluff", "dialect = ansi\nrules = all\n")]);
        let top = merge(&[parsed("/b/.sqlfluff", "dialect = tsql\n")]);
        base.overlay(&top);
        assert_eq!(value(&base, "", "dialect"), Some("tsql"));
        assert_eq!(value(&base, "", "rules"), Some("all"));
    }
}
