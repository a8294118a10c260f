//! Raw string values to typed values.
//!
//! Parsing never interprets values; this module is the only place where a raw
//! string acquires a type, driven by the [`OptionType`] a schema declares.

use std::fmt;

use serde::Serialize;

/// The literal that marks an option as explicitly unset.
pub const UNSET: &str = "None";

/// Declared type of an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionType {
    Bool,
    Int,
    Str,
    /// One of a fixed set of values.
    Enum {
        allowed: Vec<String>,
        case_insensitive: bool,
    },
    /// Comma-separated list.
    List,
}

impl OptionType {
    /// Case-sensitive enum over `allowed`.
    pub fn one_of<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OptionType::Enum {
            allowed: allowed.into_iter().map(Into::into).collect(),
            case_insensitive: false,
        }
    }

    /// Human-readable description used in error messages.
    pub fn expected(&self) -> String {
        match self {
            OptionType::Bool => "a boolean (true/false/yes/no/1/0)".into(),
            OptionType::Int => "an integer".into(),
            OptionType::Str => "a string".into(),
            OptionType::List => "a comma-separated list".into(),
            OptionType::Enum { allowed, .. } => format!("one of {{{}}}", allowed.join(", ")),
        }
    }
}

/// A coerced option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl TypedValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            TypedValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            TypedValue::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Renders the value in a form that coerces back to the same value.
impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Bool(true) => f.write_str("True"),
            TypedValue::Bool(false) => f.write_str("False"),
            TypedValue::Int(i) => write!(f, "{i}"),
            TypedValue::Str(s) => f.write_str(s),
            TypedValue::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl From<bool> for TypedValue {
    fn from(v: bool) -> Self {
        TypedValue::Bool(v)
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        TypedValue::Int(v)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        TypedValue::Str(v.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(v: String) -> Self {
        TypedValue::Str(v)
    }
}

impl From<Vec<String>> for TypedValue {
    fn from(v: Vec<String>) -> Self {
        TypedValue::List(v)
    }
}

/// A value that did not match its declared type.
///
/// Carries only the type expectation; callers attach section, key and
/// provenance when converting into [`SqlfigError`](crate::SqlfigError).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoerceError {
    pub expected: String,
}

/// Whether `raw` is the unset sentinel (or empty).
pub fn is_unset(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed == UNSET
}

/// Coerce `raw` according to `ty`. `Ok(None)` means explicitly unset.
pub fn coerce(raw: &str, ty: &OptionType) -> Result<Option<TypedValue>, CoerceError> {
    if is_unset(raw) {
        return Ok(None);
    }
    let value = raw.trim();
    let fail = || CoerceError {
        expected: ty.expected(),
    };

    let typed = match ty {
        OptionType::Bool => TypedValue::Bool(parse_bool(value).ok_or_else(fail)?),
        OptionType::Int => TypedValue::Int(value.parse::<i64>().map_err(|_| fail())?),
        OptionType::Str => TypedValue::Str(value.to_string()),
        OptionType::List => TypedValue::List(split_list(value)),
        OptionType::Enum {
            allowed,
            case_insensitive,
        } => {
            let found = allowed.iter().find(|candidate| {
                if *case_insensitive {
                    candidate.eq_ignore_ascii_case(value)
                } else {
                    candidate.as_str() == value
                }
            });
            TypedValue::Str(found.ok_or_else(fail)?.clone())
        }
    };
    Ok(Some(typed))
}

/// Case-insensitive boolean parse over `true/false/1/0/yes/no`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Split on `,`, trim each element, drop empty elements.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_case_insensitive() {
        for raw in ["true", "TRUE", "1", "yes", "Yes"] {
            assert_eq!(coerce(raw, &OptionType::Bool).unwrap(), Some(true.into()));
        }
        for raw in ["false", "False", "0", "no", "NO"] {
            assert_eq!(coerce(raw, &OptionType::Bool).unwrap(), Some(false.into()));
        }
    }

    #[test]
    fn bad_boolean_fails() {
        let err = coerce("maybe", &OptionType::Bool).unwrap_err();
        assert!(err.expected.contains("boolean"));
    }

    #[test]
    fn integers() {
        assert_eq!(
            coerce(" 120 ", &OptionType::Int).unwrap(),
            Some(TypedValue::Int(120))
        );
        assert_eq!(
            coerce("-4", &OptionType::Int).unwrap(),
            Some(TypedValue::Int(-4))
        );
        assert!(coerce("12px", &OptionType::Int).is_err());
        assert!(coerce("0x10", &OptionType::Int).is_err());
    }

    #[test]
    fn enum_is_case_sensitive_by_default() {
        let ty = OptionType::one_of(["lower", "upper", "consistent"]);
        assert_eq!(coerce("lower", &ty).unwrap(), Some("lower".into()));
        let err = coerce("LOWER", &ty).unwrap_err();
        assert!(err.expected.contains("lower, upper, consistent"));
    }

    #[test]
    fn case_insensitive_enum_returns_canonical_spelling() {
        let ty = OptionType::Enum {
            allowed: vec!["Leading".into(), "Trailing".into()],
            case_insensitive: true,
        };
        assert_eq!(coerce("leading", &ty).unwrap(), Some("Leading".into()));
    }

    #[test]
    fn list_trims_and_drops_empty() {
        let value = coerce(" L001 , L002,,L001 ,", &OptionType::List).unwrap();
        assert_eq!(
            value,
            Some(TypedValue::List(vec![
                "L001".into(),
                "L002".into(),
                "L001".into()
            ]))
        );
    }

    #[test]
    fn list_rendering_coerces_back_to_same_elements() {
        let first = coerce("a ,  b,c  ", &OptionType::List).unwrap().unwrap();
        let again = coerce(&first.to_string(), &OptionType::List)
            .unwrap()
            .unwrap();
        assert_eq!(first, again);
        assert_eq!(first.as_list().unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn bool_rendering_coerces_back() {
        let v = TypedValue::Bool(false);
        assert_eq!(coerce(&v.to_string(), &OptionType::Bool).unwrap(), Some(v));
    }

    #[test]
    fn sentinel_and_empty_are_unset_for_every_type() {
        let types = [
            OptionType::Bool,
            OptionType::Int,
            OptionType::Str,
            OptionType::List,
            OptionType::one_of(["a"]),
        ];
        for ty in &types {
            assert_eq!(coerce("None", ty).unwrap(), None);
            assert_eq!(coerce("   ", ty).unwrap(), None);
        }
    }

    #[test]
    fn lowercase_none_is_a_string() {
        assert_eq!(
            coerce("none", &OptionType::Str).unwrap(),
            Some("none".into())
        );
    }
}
