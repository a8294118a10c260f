//! Strict-mode validation: detect options no consumer will ever read.
//!
//! Every section of the merged tree is classified by what is allowed to live
//! there. A typo such as `max_lin_length` under `[rules]` is otherwise silently
//! dropped, so strict mode turns it into an error that names the file and line.

use std::collections::BTreeSet;

use crate::error::SqlfigError;
use crate::key::{OptionName, SectionPath};
use crate::merge::LayeredConfig;
use crate::schema::{CONTEXT_SECTION, JINJA_SECTION, MACROS_SECTION, SchemaRegistry, jinja_section};
use crate::settings::core_keys;

/// What a section accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Allowed {
    /// Any key; values are consumed verbatim.
    Any,
    /// Only these keys.
    Keys(BTreeSet<OptionName>),
    /// Nothing reads this section.
    Nothing,
}

impl Allowed {
    fn permits(&self, name: &OptionName) -> bool {
        match self {
            Allowed::Any => true,
            Allowed::Keys(keys) => keys.contains(name),
            Allowed::Nothing => false,
        }
    }
}

fn classify(section: &SectionPath, registry: &SchemaRegistry) -> Allowed {
    let rule_options = || registry.rule_option_names().into_iter().cloned().collect::<BTreeSet<_>>();
    let section_options = |path: &SectionPath| {
        registry
            .section(path)
            .map(|schema| schema.options.iter().map(|spec| spec.name.clone()).collect::<BTreeSet<_>>())
    };

    let segments: Vec<&str> = section.segments().iter().map(String::as_str).collect();
    match segments.as_slice() {
        [] => {
            let mut keys = rule_options();
            keys.extend(core_keys().into_iter().map(OptionName::from));
            if let Some(extra) = section_options(section) {
                keys.extend(extra);
            }
            Allowed::Keys(keys)
        }
        ["rules"] => Allowed::Keys(rule_options()),
        ["rules", name] => {
            if let Some(rule) = registry.rule(name) {
                Allowed::Keys(rule.options.iter().map(|spec| spec.name.clone()).collect())
            } else if registry.is_family(name) {
                Allowed::Keys(
                    registry
                        .family_members(name)
                        .flat_map(|rule| rule.options.iter().map(|spec| spec.name.clone()))
                        .collect(),
                )
            } else {
                Allowed::Nothing
            }
        }
        ["templater", ..] => {
            let path = section.to_string();
            if path == JINJA_SECTION {
                Allowed::Keys(jinja_section().options.into_iter().map(|spec| spec.name).collect())
            } else if path == MACROS_SECTION || path == CONTEXT_SECTION {
                Allowed::Any
            } else if path.starts_with(&format!("{JINJA_SECTION}:")) {
                Allowed::Nothing
            } else {
                Allowed::Any
            }
        }
        _ => match section_options(section) {
            Some(keys) => Allowed::Keys(keys),
            None => Allowed::Nothing,
        },
    }
}

/// Check every key of `config` against `registry`.
///
/// In strict mode one unknown key is [`SqlfigError::UnknownOption`] and
/// several are [`SqlfigError::UnknownOptions`]. In lenient mode each unknown
/// key is logged and the load continues.
pub fn validate_unknown_options(
    config: &LayeredConfig,
    registry: &SchemaRegistry,
    strict: bool,
) -> Result<(), SqlfigError> {
    let mut unknown: Vec<SqlfigError> = Vec::new();

    for (section, options) in config.sections() {
        let allowed = classify(section, registry);
        for (name, raw) in options {
            if allowed.permits(name) {
                continue;
            }
            if !strict {
                tracing::warn!(
                    section = %section,
                    key = %name,
                    origin = %raw.provenance,
                    "ignoring unknown option"
                );
                continue;
            }
            unknown.push(SqlfigError::UnknownOption {
                section: section.clone(),
                key: name.to_string(),
                origin: raw.provenance.clone(),
            });
        }
    }

    match unknown.len() {
        0 => Ok(()),
        1 => Err(unknown.remove(0)),
        _ => Err(SqlfigError::UnknownOptions(unknown)),
    }
}
