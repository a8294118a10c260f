//! Core resolution pipeline: merge all config layers and produce a typed config.
//!
//! Operates on pre-loaded sources (`ResolveInput`) so the full pipeline is
//! testable with synthetic inputs. The only filesystem access left is reading
//! macro files named by `load_macros_from_path`. Steps:
//!
//! 1. Parse each source into raw entries
//! 2. Merge sources (later overrides earlier)
//! 3. Overlay programmatic overrides (highest priority)
//! 4. Check for unknown options (error in strict mode, warning otherwise)
//! 5. Type the root section into [`CoreConfig`]
//! 6. Resolve every registered rule and section
//! 7. Select enabled rules, build the macro namespace and template context

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::error::SqlfigError;
use crate::file::ConfigSource;
use crate::key::SectionPath;
use crate::macros::{self, MacroNamespace};
use crate::merge::{self, LayeredConfig};
use crate::overrides::{self, OptionOverride};
use crate::params::{self, ParameterSet, RuleParameterSet};
use crate::parse;
use crate::schema::{CONTEXT_SECTION, JINJA_SECTION, SchemaRegistry, jinja_section};
use crate::settings::{self, CoreConfig};
use crate::validate;

/// All pre-loaded data needed to resolve a config.
pub struct ResolveInput<'a> {
    /// Sources in precedence order: first = lowest priority, last = highest.
    pub sources: Vec<ConfigSource>,
    /// Section namespace, e.g. `"sqlfluff"`.
    pub namespace: String,
    /// Overrides applied above every source, in order.
    pub overrides: Vec<OptionOverride>,
    pub registry: &'a SchemaRegistry,
    /// Whether unknown options and rule selectors are errors.
    pub strict: bool,
}

/// The immutable result of a load.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    core: CoreConfig,
    raw: LayeredConfig,
    rules: BTreeMap<String, RuleParameterSet>,
    sections: BTreeMap<SectionPath, ParameterSet>,
    enabled_rules: BTreeSet<String>,
    macros: MacroNamespace,
    template_context: BTreeMap<String, String>,
    sources: Vec<PathBuf>,
}

impl ResolvedConfig {
    pub fn core(&self) -> &CoreConfig {
        &self.core
    }

    pub fn dialect(&self) -> Option<&str> {
        self.core.dialect.as_deref()
    }

    pub fn templater(&self) -> &str {
        &self.core.templater
    }

    /// Parameters of rule `code`, looked up case-insensitively.
    pub fn rule(&self, code: &str) -> Option<&RuleParameterSet> {
        self.rules.get(&code.to_lowercase())
    }

    /// Every registered rule's parameters, ordered by code.
    pub fn rules(&self) -> impl Iterator<Item = &RuleParameterSet> {
        self.rules.values()
    }

    pub fn enabled_rules(&self) -> &BTreeSet<String> {
        &self.enabled_rules
    }

    pub fn is_rule_enabled(&self, code: &str) -> bool {
        self.enabled_rules.iter().any(|c| c.eq_ignore_ascii_case(code))
    }

    /// Parameters of a registered section such as `indentation` or
    /// `templater:jinja`.
    pub fn section(&self, path: &str) -> Option<&ParameterSet> {
        self.sections.get(&SectionPath::parse(path).ok()?)
    }

    pub fn sections(&self) -> impl Iterator<Item = &ParameterSet> {
        self.sections.values()
    }

    pub fn macros(&self) -> &MacroNamespace {
        &self.macros
    }

    /// Variables from `[templater:jinja:context]`, as raw strings.
    pub fn template_context(&self) -> &BTreeMap<String, String> {
        &self.template_context
    }

    /// Files that contributed, lowest priority first.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// The merged, untyped tree with provenance.
    pub fn raw(&self) -> &LayeredConfig {
        &self.raw
    }
}

/// Resolve configuration from pre-loaded inputs.
pub fn resolve(input: ResolveInput<'_>) -> Result<ResolvedConfig, SqlfigError> {
    // 1-2: Parse and merge file layers
    let parsed = input
        .sources
        .iter()
        .map(|source| parse::parse_source(source, &input.namespace))
        .collect::<Result<Vec<_>, _>>()?;
    let mut raw = merge::merge(&parsed);

    // 3: Overrides on top
    if !input.overrides.is_empty() {
        raw.overlay(&overrides::overrides_to_layer(&input.overrides));
    }

    let sources = input.sources.into_iter().map(|source| source.path).collect();
    resolve_layered(raw, sources, input.registry, input.strict)
}

/// Steps 4-7 over an already merged tree.
///
/// Used directly when re-resolving a base config with extra layers on top,
/// such as inline directives from one SQL file.
pub fn resolve_layered(
    raw: LayeredConfig,
    sources: Vec<PathBuf>,
    registry: &SchemaRegistry,
    strict: bool,
) -> Result<ResolvedConfig, SqlfigError> {
    // 4: Unknown options
    validate::validate_unknown_options(&raw, registry, strict)?;

    // 5: Root section
    let core = settings::load_core(&raw)?;

    // 6: Rules and sections
    let mut rules = BTreeMap::new();
    for rule in registry.rules() {
        rules.insert(rule.key(), params::resolve_rule(rule, &raw)?);
    }
    let mut sections = BTreeMap::new();
    let jinja = jinja_section();
    sections.insert(jinja.path.clone(), params::resolve_section(&jinja, &raw)?);
    for section in registry.sections() {
        sections.insert(section.path.clone(), params::resolve_section(section, &raw)?);
    }

    // 7: Rule selection, macros, context
    let enabled_rules = settings::select_rules(&core, &raw, registry, strict)?;
    let jinja_path = SectionPath::parse(JINJA_SECTION).unwrap_or_default();
    let macros = match sections.get(&jinja_path) {
        Some(jinja) => macros::build_namespace(jinja, &raw)?,
        None => MacroNamespace::new(),
    };
    let context_path = SectionPath::parse(CONTEXT_SECTION).unwrap_or_default();
    let template_context = raw
        .section(&context_path)
        .map(|entries| {
            entries
                .iter()
                .map(|(name, value)| (name.to_string(), value.value.clone()))
                .collect()
        })
        .unwrap_or_default();

    tracing::debug!(
        sources = sources.len(),
        rules = rules.len(),
        enabled = enabled_rules.len(),
        macros = macros.len(),
        "configuration resolved"
    );

    Ok(ResolvedConfig {
        core,
        raw,
        rules,
        sections,
        enabled_rules,
        macros,
        template_context,
        sources,
    })
}
