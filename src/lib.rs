//! Layered configuration and rule parameterization for SQL linters.
//!
//! A SQL project tree may hold configuration files at several directory
//! depths, each contributing a dialect, a templater, rule selections and
//! per-rule options. Sqlfig discovers the files that apply to one SQL file,
//! merges them with section-scoped precedence, types every value against the
//! schemas your rule engine declares, and assembles the macro namespace the
//! templating engine needs before rendering.
//!
//! ```ignore
//! let loader = Sqlfig::builder()
//!     .app_name("sqlfluff")
//!     .schemas(registry)
//!     .build()?;
//! let config = loader.load_for(Path::new("models/orders.sql"))?;
//! let max = config.rule("L016").and_then(|p| p.get_int("max_line_length"));
//! ```
//!
//! # Where files come from
//!
//! [`search_paths()`](SqlfigBuilder::search_paths) accepts [`SearchPath`]
//! variants in **priority-ascending** order (last = highest). The default is
//! `[Platform, Home, Ancestors(Root)]`: user-global settings rank below every
//! project directory, and deeper project directories rank above shallower
//! ones. Each directory contributes at most one file, the first of
//! `.sqlfluff`, `pyproject.toml`, `setup.cfg`, `tox.ini`, `pep8.ini` that
//! exists and actually carries settings for the namespace.
//!
//! # Sections
//!
//! Options live in `:`-separated sections under the namespace:
//!
//! ```text
//! [sqlfluff]                      dialect = ansi
//! [sqlfluff:rules]                max_line_length = 120
//! [sqlfluff:rules:capitalisation] capitalisation_policy = upper
//! [sqlfluff:rules:L014]           extended_capitalisation_policy = lower
//! [sqlfluff:templater:jinja]      apply_dbt_builtins = True
//! ```
//!
//! `pyproject.toml` uses `[tool.sqlfluff]` tables with the same structure.
//! Section names and option names are case-insensitive.
//!
//! # Layer precedence
//!
//! ```text
//! Schema defaults       declared by the rule engine
//!        ↑ overridden by
//! Config files          search paths in order, deeper directories win
//!        ↑ overridden by
//! Overrides             .option_override()
//!        ↑ overridden by
//! Inline directives     -- sqlfluff:rules:max_line_length:100
//! ```
//!
//! Merging is per `(section, option)` pair; a deeper file never wipes out
//! unrelated keys of a shallower one. Inheritance between sections happens
//! only at lookup time, through an explicit list of layers per rule (see
//! [`params`]).
//!
//! The value `None` (or an empty value) is the unset sentinel: it is a real
//! write at its layer, but lookup treats it as "nothing here" and falls
//! through to the layers below.
//!
//! # Strict mode
//!
//! Strict mode is **on by default**. An option no consumer reads, such as a
//! misspelled `max_lin_length`, fails the load with its section, file and
//! line:
//!
//! ```text
//! Unknown option 'max_lin_length' in [rules] from /proj/.sqlfluff (line 4)
//! ```
//!
//! Turn it off with [`.strict(false)`](SqlfigBuilder::strict) to log a
//! warning instead. Invalid values are always errors.
//!
//! # Macros
//!
//! The [`MacroNamespace`] collects dbt built-in emulations, macros from
//! `load_macros_from_path` and entries of `[sqlfluff:templater:jinja:macros]`,
//! in that order, later names replacing earlier ones. Hand it to a template
//! environment through [`MacroTarget`].
//!
//! # Error handling
//!
//! All fallible operations return [`SqlfigError`]. Every error names the
//! file, section, option and line involved where they are known. See the
//! [`error`] module for the full set.

pub mod coerce;
pub mod error;
pub mod key;
pub mod macros;
pub mod params;
pub mod schema;
pub mod settings;
pub mod types;

mod builder;
mod cache;
mod file;
pub(crate) mod merge;
mod ops;
mod overrides;
mod parse;
mod resolve;
mod validate;

#[cfg(test)]
mod fixtures;

pub use builder::{Sqlfig, SqlfigBuilder};
pub use cache::ConfigCache;
pub use coerce::{OptionType, TypedValue};
pub use error::SqlfigError;
pub use file::ConfigSource;
pub use key::{OptionName, SectionPath};
pub use macros::{MacroDefinition, MacroNamespace, MacroOrigin, MacroTarget};
pub use merge::{LayeredConfig, RawValue};
pub use ops::{ConfigResult, ListEntry};
pub use overrides::{OptionOverride, parse_inline_directives};
pub use params::{ParameterSet, RuleParameterSet, ValueOrigin};
pub use resolve::{ResolveInput, ResolvedConfig, resolve};
pub use schema::{OptionSpec, RuleSchema, SchemaRegistry, SectionSchema};
pub use settings::CoreConfig;
pub use types::{Boundary, ConfigAction, ConfigFileKind, Provenance, SearchPath};
