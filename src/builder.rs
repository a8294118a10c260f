use std::path::Path;

use crate::cache::ConfigCache;
use crate::error::SqlfigError;
use crate::file::{self, ConfigSource};
use crate::ops::{self, ConfigResult};
use crate::overrides::{self, OptionOverride};
use crate::resolve::{self, ResolveInput, ResolvedConfig};
use crate::schema::SchemaRegistry;
use crate::types::{Boundary, ConfigAction, Provenance, SearchPath};

/// A configured loader. Cheap to share between threads; every load reads
/// the filesystem afresh.
#[derive(Debug, Clone)]
pub struct Sqlfig {
    app_name: String,
    file_names: Vec<String>,
    search_paths: Vec<SearchPath>,
    registry: SchemaRegistry,
    strict: bool,
    overrides: Vec<OptionOverride>,
}

impl Sqlfig {
    pub fn builder() -> SqlfigBuilder {
        SqlfigBuilder::new()
    }

    /// The section namespace, e.g. `sqlfluff` in `[sqlfluff:rules]`.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Configuration files that apply to `target`, lowest priority first.
    pub fn discover(&self, target: &Path) -> Result<Vec<ConfigSource>, SqlfigError> {
        file::discover(&self.search_paths, &self.file_names, &self.app_name, target)
    }

    /// Load and resolve the configuration that applies to `target`, a SQL
    /// file or a directory.
    pub fn load_for(&self, target: &Path) -> Result<ResolvedConfig, SqlfigError> {
        let sources = self.discover(target)?;
        tracing::debug!(
            target = %target.display(),
            sources = sources.len(),
            "resolving configuration"
        );
        resolve::resolve(ResolveInput {
            sources,
            namespace: self.app_name.clone(),
            overrides: self.overrides.clone(),
            registry: &self.registry,
            strict: self.strict,
        })
    }

    /// Re-resolve `base` with the inline directives of one SQL file on top.
    ///
    /// Returns a clone of `base` when `sql` has no directives.
    pub fn resolve_inline(&self, base: &ResolvedConfig, sql: &str) -> Result<ResolvedConfig, SqlfigError> {
        let directives = overrides::parse_inline_directives(sql, &self.app_name)?;
        if directives.is_empty() {
            return Ok(base.clone());
        }
        let mut raw = base.raw().clone();
        raw.overlay(&overrides::overrides_to_layer(&directives));
        resolve::resolve_layered(raw, base.sources().to_vec(), &self.registry, self.strict)
    }

    /// Wrap this loader in a per-directory cache.
    pub fn into_cache(self) -> ConfigCache {
        ConfigCache::new(self)
    }

    /// Handle a `ConfigAction` for `target` and print the result to stdout.
    pub fn handle_and_print(&self, target: &Path, action: &ConfigAction) -> Result<(), SqlfigError> {
        let result = self.handle(target, action)?;
        println!("{result}");
        Ok(())
    }

    /// Handle a `ConfigAction` (list / get / dump) for `target`.
    pub fn handle(&self, target: &Path, action: &ConfigAction) -> Result<ConfigResult, SqlfigError> {
        let config = self.load_for(target)?;
        match action {
            ConfigAction::List => Ok(ops::list_values(&config)),
            ConfigAction::Get { section, key } => ops::get_value(&config, section, key),
            ConfigAction::Dump => Ok(ops::dump_json(&config)),
        }
    }
}

/// Builder for a [`Sqlfig`] loader.
///
/// Controls three axes (see [`types`](crate::types) for the full picture):
///
/// - **Discovery**: [`search_paths()`](Self::search_paths) and
///   [`file_names()`](Self::file_names): where to look and what to look for.
/// - **Schemas**: [`schemas()`](Self::schemas): the rules and sections the
///   rule engine declares.
/// - **Layers above files**: [`option_override()`](Self::option_override).
#[derive(Debug, Clone)]
pub struct SqlfigBuilder {
    app_name: Option<String>,
    file_names: Option<Vec<String>>,
    search_paths: Option<Vec<SearchPath>>,
    registry: SchemaRegistry,
    strict: bool,
    overrides: Vec<(String, String, String)>,
}

impl SqlfigBuilder {
    fn new() -> Self {
        Self {
            app_name: None,
            file_names: None,
            search_paths: None,
            registry: SchemaRegistry::new(),
            strict: true,
            overrides: Vec::new(),
        }
    }

    /// Set the application name. This derives sensible defaults:
    /// - section namespace → `app_name`
    /// - `file_names` → `.{app_name}`, `pyproject.toml`, `setup.cfg`, `tox.ini`, `pep8.ini`
    /// - `search_paths` → `[Platform, Home, Ancestors(Root)]`
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    /// Replace the file names looked for in each directory, highest priority
    /// first. Only one file per directory is read.
    pub fn file_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the default search paths entirely.
    ///
    /// Paths are listed in **priority-ascending** order: the last entry has the
    /// highest priority. See [`SearchPath`] for the available variants.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = Some(paths);
        self
    }

    /// Append a search path without replacing the defaults.
    pub fn add_search_path(mut self, path: SearchPath) -> Self {
        self.search_paths
            .get_or_insert_with(default_search_paths)
            .push(path);
        self
    }

    /// Set the rule and section schemas.
    pub fn schemas(mut self, registry: SchemaRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Enable or disable strict mode (default: `true`).
    /// In strict mode, unknown options and rule selectors produce errors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Override one option above every config file. `section` is
    /// `:`-separated and empty for the root. Later calls win.
    pub fn option_override(mut self, section: &str, key: &str, value: &str) -> Self {
        self.overrides
            .push((section.to_string(), key.to_string(), value.to_string()));
        self
    }

    fn effective_app_name(&self) -> Result<&str, SqlfigError> {
        self.app_name.as_deref().ok_or(SqlfigError::AppNameRequired)
    }

    fn effective_file_names(&self) -> Result<Vec<String>, SqlfigError> {
        if let Some(names) = &self.file_names {
            return Ok(names.clone());
        }
        Ok(file::default_file_names(self.effective_app_name()?))
    }

    fn effective_search_paths(&self) -> Vec<SearchPath> {
        self.search_paths.clone().unwrap_or_else(default_search_paths)
    }

    /// Validate the builder state into a loader.
    pub fn build(self) -> Result<Sqlfig, SqlfigError> {
        let app_name = self.effective_app_name()?.to_string();
        let file_names = self.effective_file_names()?;
        let search_paths = self.effective_search_paths();
        self.registry.validate()?;
        let overrides = self
            .overrides
            .iter()
            .map(|(section, key, value)| OptionOverride::new(section, key, value, Provenance::Override))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Sqlfig {
            app_name,
            file_names,
            search_paths,
            registry: self.registry,
            strict: self.strict,
            overrides,
        })
    }

    /// Build and load the configuration for `target` in one step.
    pub fn load_for(self, target: &Path) -> Result<ResolvedConfig, SqlfigError> {
        self.build()?.load_for(target)
    }
}

fn default_search_paths() -> Vec<SearchPath> {
    vec![
        SearchPath::Platform,
        SearchPath::Home,
        SearchPath::Ancestors(Boundary::Root),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{sample_registry, write_file};
    use tempfile::TempDir;

    fn project_builder(dir: &TempDir) -> SqlfigBuilder {
        Sqlfig::builder()
            .app_name("sqlfluff")
            .schemas(sample_registry())
            .search_paths(vec![
                SearchPath::Path(dir.path().join("global")),
                SearchPath::Ancestors(Boundary::Marker(".git")),
            ])
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        dir
    }

    #[test]
    fn app_name_sets_defaults() {
        let builder = Sqlfig::builder().app_name("sqlfluff");
        assert_eq!(builder.effective_file_names().unwrap()[0], ".sqlfluff");
        assert_eq!(builder.effective_search_paths(), default_search_paths());
    }

    #[test]
    fn user_global_paths_rank_below_project() {
        let paths = default_search_paths();
        assert_eq!(paths.last(), Some(&SearchPath::Ancestors(Boundary::Root)));
    }

    #[test]
    fn override_file_names() {
        let builder = Sqlfig::builder().app_name("sqlfluff").file_names([".lintrc"]);
        assert_eq!(builder.effective_file_names().unwrap(), vec![".lintrc".to_string()]);
    }

    #[test]
    fn add_search_path_appends_to_defaults() {
        let builder = Sqlfig::builder()
            .app_name("sqlfluff")
            .add_search_path(SearchPath::Path("/etc/sqlfluff".into()));
        let paths = builder.effective_search_paths();
        assert_eq!(paths.len(), 4);
        assert_eq!(paths[3], SearchPath::Path("/etc/sqlfluff".into()));
    }

    #[test]
    fn missing_app_name_errors() {
        let result = Sqlfig::builder().build();
        assert!(matches!(result, Err(SqlfigError::AppNameRequired)));
    }

    #[test]
    fn malformed_override_fails_build() {
        let result = Sqlfig::builder()
            .app_name("sqlfluff")
            .option_override("rules::x", "a", "1")
            .build();
        assert!(matches!(result, Err(SqlfigError::InvalidKey { .. })));
    }

    #[test]
    fn unusable_rule_code_fails_build() {
        let registry = sample_registry().with_rule(crate::schema::RuleSchema::new("L 016"));
        let result = Sqlfig::builder().app_name("sqlfluff").schemas(registry).build();
        assert!(matches!(result, Err(SqlfigError::InvalidKey { key, .. }) if key == "rules:L 016"));
    }

    #[test]
    fn loader_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Sqlfig>();
        assert_send_sync::<ResolvedConfig>();
    }

    // --- Load tests ---

    #[test]
    fn nested_scopes_deeper_wins() {
        let dir = project();
        write_file(
            dir.path(),
            ".sqlfluff",
            "[sqlfluff]\ndialect = ansi\n[sqlfluff:rules]\nmax_line_length = 80\n",
        );
        write_file(
            dir.path(),
            "models/.sqlfluff",
            "[sqlfluff:rules]\nmax_line_length = 120\n",
        );
        let target = write_file(dir.path(), "models/orders.sql", "select 1\n");

        let config = project_builder(&dir).load_for(&target).unwrap();
        assert_eq!(config.dialect(), Some("ansi"));
        assert_eq!(config.rule("L999").unwrap().get_int("max_line_length"), Some(120));
        assert_eq!(config.sources().len(), 2);

        let sibling = write_file(dir.path(), "other.sql", "select 1\n");
        let config = project_builder(&dir).load_for(&sibling).unwrap();
        assert_eq!(config.rule("L999").unwrap().get_int("max_line_length"), Some(80));
    }

    #[test]
    fn dedicated_file_shadows_shared_in_same_directory() {
        let dir = project();
        write_file(dir.path(), ".sqlfluff", "dialect = ansi\n");
        write_file(dir.path(), "setup.cfg", "[sqlfluff]\ndialect = tsql\n");
        let config = project_builder(&dir).load_for(dir.path()).unwrap();
        assert_eq!(config.dialect(), Some("ansi"));
        assert_eq!(config.sources(), [dir.path().join(".sqlfluff")]);
    }

    #[test]
    fn irrelevant_pyproject_does_not_shadow_setup_cfg() {
        let dir = project();
        write_file(dir.path(), "pyproject.toml", "[tool.black]\nline-length = 88\n");
        write_file(dir.path(), "setup.cfg", "[sqlfluff]\ndialect = postgres\n");
        let config = project_builder(&dir).load_for(dir.path()).unwrap();
        assert_eq!(config.dialect(), Some("postgres"));
    }

    #[test]
    fn explicit_global_directory_ranks_lowest() {
        let dir = project();
        write_file(dir.path(), "global/.sqlfluff", "dialect = ansi\ntemplater = raw\n");
        write_file(dir.path(), ".sqlfluff", "dialect = postgres\n");
        let config = project_builder(&dir).load_for(dir.path()).unwrap();
        assert_eq!(config.dialect(), Some("postgres"));
        assert_eq!(config.templater(), "raw");
    }

    #[test]
    fn load_defaults_only() {
        let dir = project();
        let config = project_builder(&dir).load_for(dir.path()).unwrap();
        assert_eq!(config.templater(), "jinja");
        assert!(config.sources().is_empty());
    }

    #[test]
    fn load_with_option_override() {
        let dir = project();
        write_file(dir.path(), ".sqlfluff", "dialect = ansi\n");
        let config = project_builder(&dir)
            .option_override("", "dialect", "snowflake")
            .option_override("rules", "max_line_length", "99")
            .load_for(dir.path())
            .unwrap();
        assert_eq!(config.dialect(), Some("snowflake"));
        assert_eq!(config.rule("L999").unwrap().get_int("max_line_length"), Some(99));
    }

    #[test]
    fn strict_rejects_unknown_key() {
        let dir = project();
        write_file(dir.path(), ".sqlfluff", "[sqlfluff:rules]\nmax_lin_length = 1\n");
        let result = project_builder(&dir).load_for(dir.path());
        assert!(matches!(result, Err(SqlfigError::UnknownOption { .. })));
    }

    #[test]
    fn lenient_allows_unknown_key() {
        let dir = project();
        write_file(dir.path(), ".sqlfluff", "[sqlfluff:rules]\nmax_lin_length = 1\n");
        let config = project_builder(&dir).strict(false).load_for(dir.path()).unwrap();
        assert_eq!(config.rule("L999").unwrap().get_int("max_line_length"), Some(80));
    }

    #[test]
    fn duplicate_option_in_file_fails() {
        let dir = project();
        write_file(dir.path(), ".sqlfluff", "[sqlfluff:rules]\nmax_line_length = 1\nmax_line_length = 2\n");
        let result = project_builder(&dir).load_for(dir.path());
        assert!(matches!(result, Err(SqlfigError::DuplicateOptionInSource { line: 3, .. })));
    }

    #[test]
    fn inline_directives_are_highest_layer() {
        let dir = project();
        write_file(dir.path(), ".sqlfluff", "dialect = ansi\n[sqlfluff:rules]\nmax_line_length = 80\n");
        let loader = project_builder(&dir)
            .option_override("rules", "max_line_length", "90")
            .build()
            .unwrap();
        let base = loader.load_for(dir.path()).unwrap();

        let sql = "-- sqlfluff:rules:max_line_length:200\n-- sqlfluff:dialect:bigquery\nselect 1\n";
        let per_file = loader.resolve_inline(&base, sql).unwrap();
        assert_eq!(per_file.dialect(), Some("bigquery"));
        assert_eq!(per_file.rule("L999").unwrap().get_int("max_line_length"), Some(200));
        assert_eq!(base.rule("L999").unwrap().get_int("max_line_length"), Some(90));

        assert_eq!(loader.resolve_inline(&base, "select 1\n").unwrap(), base);
    }

    #[test]
    fn inline_directive_with_invalid_value_fails() {
        let dir = project();
        let loader = project_builder(&dir).build().unwrap();
        let base = loader.load_for(dir.path()).unwrap();
        let result = loader.resolve_inline(&base, "-- sqlfluff:rules:max_line_length:wide\n");
        assert!(matches!(result, Err(SqlfigError::InvalidOptionValue { .. })));
    }

    // --- Action tests ---

    #[test]
    fn handle_get() {
        let dir = project();
        write_file(dir.path(), ".sqlfluff", "dialect = ansi\n");
        let loader = project_builder(&dir).build().unwrap();
        let result = loader
            .handle(
                dir.path(),
                &ConfigAction::Get {
                    section: String::new(),
                    key: "dialect".into(),
                },
            )
            .unwrap();
        match result {
            ConfigResult::KeyValue { value, .. } => assert_eq!(value, "ansi"),
            other => panic!("Expected KeyValue, got {other:?}"),
        }
    }

    #[test]
    fn handle_list_and_dump() {
        let dir = project();
        write_file(dir.path(), ".sqlfluff", "dialect = ansi\n");
        let loader = project_builder(&dir).build().unwrap();
        assert!(matches!(
            loader.handle(dir.path(), &ConfigAction::List).unwrap(),
            ConfigResult::Listing { entries } if entries.len() == 1
        ));
        assert!(matches!(
            loader.handle(dir.path(), &ConfigAction::Dump).unwrap(),
            ConfigResult::Dump(json) if json.contains("\"dialect\": \"ansi\"")
        ));
    }
}
