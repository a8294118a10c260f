#[cfg(test)]
pub mod test {
    use std::fs;
    use std::path::{Path, PathBuf};

    use crate::coerce::OptionType;
    use crate::key::SectionPath;
    use crate::schema::{OptionSpec, RuleSchema, SchemaRegistry, SectionSchema};

    /// A small rule catalogue: two rules sharing the `capitalisation` family,
    /// one standalone layout rule and an `indentation` section.
    pub fn sample_registry() -> SchemaRegistry {
        SchemaRegistry::new()
            .with_rule(
                RuleSchema::new("L010").family("capitalisation").option(
                    OptionSpec::new(
                        "capitalisation_policy",
                        OptionType::one_of(["consistent", "upper", "lower", "capitalise"]),
                    )
                    .with_default("consistent"),
                ),
            )
            .with_rule(
                RuleSchema::new("L014").family("capitalisation").option(
                    OptionSpec::new(
                        "extended_capitalisation_policy",
                        OptionType::one_of(["lower", "upper", "consistent"]),
                    )
                    .with_default("consistent"),
                ),
            )
            .with_rule(
                RuleSchema::new("L999")
                    .option(OptionSpec::new("max_line_length", OptionType::Int).with_default(80i64))
                    .option(OptionSpec::new("tab_space_size", OptionType::Int).with_default(4i64))
                    .option(OptionSpec::new("ignore_words", OptionType::List)),
            )
            .with_section(
                SectionSchema::new(SectionPath::parse("indentation").unwrap())
                    .option(
                        OptionSpec::new("indent_unit", OptionType::one_of(["space", "tab"]))
                            .with_default("space"),
                    )
                    .option(OptionSpec::new("indented_joins", OptionType::Bool).with_default(false)),
            )
    }

    /// Write `contents` to `dir/name`, creating parent directories.
    pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn sample_registry_shape() {
        let reg = sample_registry();
        assert_eq!(reg.rules().count(), 3);
        assert_eq!(reg.family_members("capitalisation").count(), 2);
        assert!(reg.section(&SectionPath::parse("indentation").unwrap()).is_some());
    }
}
