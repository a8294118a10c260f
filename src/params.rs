//! Rule parameter resolution.
//!
//! Each option is looked up through an explicit, ordered list of layers,
//! least specific first:
//!
//! ```text
//! schema default
//!   ↑ root section            tab_space_size = 2
//!   ↑ [rules]                 max_line_length = 120
//!   ↑ [rules:<family>]        capitalisation_policy = upper
//!   ↑ [rules:<code>]          extended_capitalisation_policy = lower
//! ```
//!
//! Every value present at any layer is coerced, so an invalid value fails the
//! load even when a more specific layer overrides it. The unset sentinel is a
//! no-op at its layer: the value from the layers below stays in place, and if
//! nothing below set a concrete value the schema default applies.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::coerce::{OptionType, TypedValue, coerce};
use crate::error::SqlfigError;
use crate::key::{OptionName, SectionPath};
use crate::merge::LayeredConfig;
use crate::schema::{OptionSpec, RuleSchema, SectionSchema};
use crate::types::Provenance;

/// Where the winning value of a resolved option came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueOrigin {
    Default,
    Configured {
        section: SectionPath,
        provenance: Provenance,
    },
}

/// One resolved option.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValue {
    /// `None` when unset and without a default.
    pub value: Option<TypedValue>,
    pub origin: ValueOrigin,
}

/// Fully typed options of one rule (or one registered section).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterSet {
    scope: String,
    values: BTreeMap<OptionName, ResolvedValue>,
}

/// Parameters of a single rule code, as handed to the rule engine.
pub type RuleParameterSet = ParameterSet;

impl ParameterSet {
    /// The rule code or section path these parameters belong to.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.values.get(&OptionName::from(name))?.value.as_ref()
    }

    pub fn resolved(&self, name: &str) -> Option<&ResolvedValue> {
        self.values.get(&OptionName::from(name))
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_bool()
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name)?.as_int()
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str()
    }

    pub fn get_list(&self, name: &str) -> Option<&[String]> {
        self.get(name)?.as_list()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OptionName, &ResolvedValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for ParameterSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, resolved) in &self.values {
            map.serialize_entry(name, &resolved.value)?;
        }
        map.end()
    }
}

/// The sections consulted for `rule`, least specific first.
///
/// A code or family that is not a valid section segment is
/// [`SqlfigError::InvalidKey`].
pub fn lookup_layers(rule: &RuleSchema) -> Result<Vec<SectionPath>, SqlfigError> {
    let rules = SectionPath::from_segments(["rules"]).unwrap_or_default();
    let mut layers = vec![SectionPath::root(), rules];
    if let Some(path) = rule.family_path()? {
        layers.push(path);
    }
    layers.push(rule.section_path()?);
    Ok(layers)
}

/// Resolve every declared option of `rule`.
pub fn resolve_rule(rule: &RuleSchema, config: &LayeredConfig) -> Result<RuleParameterSet, SqlfigError> {
    let layers = lookup_layers(rule)?;
    let values = resolve_options(&rule.options, &layers, config)?;
    Ok(ParameterSet {
        scope: rule.code.clone(),
        values,
    })
}

/// Resolve a registered section: schema default, then the section itself.
pub fn resolve_section(section: &SectionSchema, config: &LayeredConfig) -> Result<ParameterSet, SqlfigError> {
    let values = resolve_options(&section.options, std::slice::from_ref(&section.path), config)?;
    Ok(ParameterSet {
        scope: section.path.to_string(),
        values,
    })
}

fn resolve_options(
    specs: &[OptionSpec],
    layers: &[SectionPath],
    config: &LayeredConfig,
) -> Result<BTreeMap<OptionName, ResolvedValue>, SqlfigError> {
    let mut values = BTreeMap::new();
    for spec in specs {
        let mut resolved = ResolvedValue {
            value: spec.default.clone(),
            origin: ValueOrigin::Default,
        };
        for section in layers {
            let Some(raw) = config.get(section, &spec.name) else {
                continue;
            };
            if let Some(value) = coerce_at(section, &spec.name, &spec.ty, raw)? {
                resolved = ResolvedValue {
                    value: Some(value),
                    origin: ValueOrigin::Configured {
                        section: section.clone(),
                        provenance: raw.provenance.clone(),
                    },
                };
            }
        }
        values.insert(spec.name.clone(), resolved);
    }
    Ok(values)
}

/// Coerce one raw value, attaching section, key and provenance on failure.
pub(crate) fn coerce_at(
    section: &SectionPath,
    name: &OptionName,
    ty: &OptionType,
    raw: &crate::merge::RawValue,
) -> Result<Option<TypedValue>, SqlfigError> {
    coerce(&raw.value, ty).map_err(|e| SqlfigError::InvalidOptionValue {
        section: section.clone(),
        key: name.to_string(),
        value: raw.value.clone(),
        expected: e.expected,
        origin: raw.provenance.clone(),
    })
}
