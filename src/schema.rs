//! Option schemas supplied by the rule engine.
//!
//! The crate never invents a schema for a rule. The one exception is the
//! `templater:jinja` section, whose options this crate consumes itself (see
//! [`jinja_section`]).

use std::collections::{BTreeMap, BTreeSet};

use crate::coerce::{OptionType, TypedValue};
use crate::error::SqlfigError;
use crate::key::{OptionName, SectionPath};

/// One declared option: name, type and optional default.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub name: OptionName,
    pub ty: OptionType,
    /// `None` means the option is unset unless configured.
    pub default: Option<TypedValue>,
}

impl OptionSpec {
    pub fn new(name: &str, ty: OptionType) -> Self {
        Self {
            name: OptionName::from(name),
            ty,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<TypedValue>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// The options a rule accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSchema {
    pub code: String,
    /// Family sharing options across rules, e.g. `capitalisation`.
    pub family: Option<String>,
    pub options: Vec<OptionSpec>,
}

impl RuleSchema {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            family: None,
            options: Vec::new(),
        }
    }

    pub fn family(mut self, family: &str) -> Self {
        self.family = Some(family.to_string());
        self
    }

    pub fn option(mut self, spec: OptionSpec) -> Self {
        self.options.push(spec);
        self
    }

    pub fn spec(&self, name: &OptionName) -> Option<&OptionSpec> {
        self.options.iter().find(|spec| &spec.name == name)
    }

    /// Section segment used for this rule: the lowercased code.
    pub fn key(&self) -> String {
        self.code.to_lowercase()
    }

    /// `rules:<code>`.
    pub fn section_path(&self) -> Result<SectionPath, SqlfigError> {
        rules_child(&self.code)
    }

    /// `rules:<family>`, when the rule belongs to one.
    pub fn family_path(&self) -> Result<Option<SectionPath>, SqlfigError> {
        self.family.as_deref().map(rules_child).transpose()
    }
}

fn rules_child(segment: &str) -> Result<SectionPath, SqlfigError> {
    SectionPath::from_segments(["rules", segment]).map_err(|e| SqlfigError::InvalidKey {
        key: format!("rules:{segment}"),
        reason: e.to_string(),
    })
}

/// The options of a non-rule section such as `indentation`.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSchema {
    pub path: SectionPath,
    pub options: Vec<OptionSpec>,
}

impl SectionSchema {
    pub fn new(path: SectionPath) -> Self {
        Self {
            path,
            options: Vec::new(),
        }
    }

    pub fn option(mut self, spec: OptionSpec) -> Self {
        self.options.push(spec);
        self
    }

    pub fn spec(&self, name: &OptionName) -> Option<&OptionSpec> {
        self.options.iter().find(|spec| &spec.name == name)
    }
}

/// All schemas known for one lint invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaRegistry {
    rules: BTreeMap<String, RuleSchema>,
    sections: BTreeMap<SectionPath, SectionSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule; a later registration with the same code replaces it.
    pub fn with_rule(mut self, rule: RuleSchema) -> Self {
        self.register_rule(rule);
        self
    }

    pub fn with_section(mut self, section: SectionSchema) -> Self {
        self.register_section(section);
        self
    }

    pub fn register_rule(&mut self, rule: RuleSchema) {
        self.rules.insert(rule.key(), rule);
    }

    pub fn register_section(&mut self, section: SectionSchema) {
        self.sections.insert(section.path.clone(), section);
    }

    /// Look up a rule by code, case-insensitively.
    pub fn rule(&self, code: &str) -> Option<&RuleSchema> {
        self.rules.get(&code.to_lowercase())
    }

    pub fn rules(&self) -> impl Iterator<Item = &RuleSchema> {
        self.rules.values()
    }

    pub fn section(&self, path: &SectionPath) -> Option<&SectionSchema> {
        self.sections.get(path)
    }

    pub fn sections(&self) -> impl Iterator<Item = &SectionSchema> {
        self.sections.values()
    }

    /// Whether `name` (lowercase) names a rule family.
    pub fn is_family(&self, name: &str) -> bool {
        self.family_members(name).next().is_some()
    }

    /// Rules belonging to family `name`, compared case-insensitively.
    pub fn family_members<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RuleSchema> + 'a {
        self.rules.values().filter(move |rule| {
            rule.family
                .as_deref()
                .is_some_and(|family| family.eq_ignore_ascii_case(name))
        })
    }

    /// Check that every rule code and family is usable as a section segment.
    pub fn validate(&self) -> Result<(), SqlfigError> {
        for rule in self.rules.values() {
            rule.section_path()?;
            rule.family_path()?;
        }
        Ok(())
    }

    /// Every option name declared by any rule.
    pub fn rule_option_names(&self) -> BTreeSet<&OptionName> {
        self.rules
            .values()
            .flat_map(|rule| rule.options.iter().map(|spec| &spec.name))
            .collect()
    }
}

/// Name of the macro-definition section, relative to the root.
pub const MACROS_SECTION: &str = "templater:jinja:macros";
/// Name of the template-context section, relative to the root.
pub const CONTEXT_SECTION: &str = "templater:jinja:context";
/// Name of the jinja templater's own section.
pub const JINJA_SECTION: &str = "templater:jinja";

/// Options of `templater:jinja` consumed by the macro namespace builder.
pub fn jinja_section() -> SectionSchema {
    let path = SectionPath::parse(JINJA_SECTION).unwrap_or_default();
    SectionSchema::new(path)
        .option(OptionSpec::new("apply_dbt_builtins", OptionType::Bool).with_default(true))
        .option(OptionSpec::new("inject_macros", OptionType::Bool).with_default(true))
        .option(OptionSpec::new("load_macros_from_path", OptionType::List))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
            .with_rule(
                RuleSchema::new("L010")
                    .family("capitalisation")
                    .option(OptionSpec::new("capitalisation_policy", OptionType::Str)),
            )
            .with_rule(
                RuleSchema::new("L014")
                    .family("capitalisation")
                    .option(OptionSpec::new("extended_capitalisation_policy", OptionType::Str)),
            )
            .with_rule(
                RuleSchema::new("L016")
                    .option(OptionSpec::new("max_line_length", OptionType::Int).with_default(80i64)),
            )
    }

    #[test]
    fn rule_lookup_is_case_insensitive() {
        let reg = registry();
        assert_eq!(reg.rule("l014").unwrap().code, "L014");
        assert!(reg.rule("L999").is_none());
    }

    #[test]
    fn family_membership() {
        let reg = registry();
        assert!(reg.is_family("capitalisation"));
        assert!(!reg.is_family("layout"));
        let codes: Vec<_> = reg.family_members("Capitalisation").map(|r| r.code.as_str()).collect();
        assert_eq!(codes, ["L010", "L014"]);
    }

    #[test]
    fn rule_option_names_union() {
        let reg = registry();
        let names: Vec<_> = reg.rule_option_names().into_iter().map(|n| n.as_str()).collect();
        assert_eq!(
            names,
            ["capitalisation_policy", "extended_capitalisation_policy", "max_line_length"]
        );
    }

    #[test]
    fn spec_names_are_normalized() {
        let spec = OptionSpec::new("Max_Line_Length", OptionType::Int);
        assert_eq!(spec.name.as_str(), "max_line_length");
    }

    #[test]
    fn later_registration_replaces() {
        let reg = registry().with_rule(RuleSchema::new("l016"));
        assert!(reg.rule("L016").unwrap().options.is_empty());
    }

    #[test]
    fn jinja_section_declares_macro_switches() {
        let section = jinja_section();
        assert_eq!(section.path.to_string(), "templater:jinja");
        let apply = section.spec(&OptionName::from("apply_dbt_builtins")).unwrap();
        assert_eq!(apply.default, Some(TypedValue::Bool(true)));
        assert!(section.spec(&OptionName::from("load_macros_from_path")).is_some());
        assert_eq!(section.options.len(), 3);
    }

    #[test]
    fn rule_code_must_be_a_section_segment() {
        assert!(registry().validate().is_ok());
        let bad = registry().with_rule(RuleSchema::new("L 020"));
        assert!(matches!(
            bad.validate(),
            Err(SqlfigError::InvalidKey { key, .. }) if key == "rules:L 020"
        ));
        let bad_family = registry().with_rule(RuleSchema::new("L021").family("a:b"));
        assert!(bad_family.validate().is_err());
    }
}
