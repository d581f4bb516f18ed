//! Small helpers over `serde_yaml` values.

use avlos_ir::{DataType, Meta, MetaValue};
use serde_yaml::{Mapping, Value};

use crate::error::SchemaError;

/// C keywords that can't be used as node or argument names.
const C_KEYWORDS: &[&str] = &[
    "auto", "bool", "break", "case", "char", "const", "continue", "default", "do", "double",
    "else", "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while",
];

/// True if `name` is usable as a C identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }
    !C_KEYWORDS.contains(&name)
}

pub fn check_identifier(path: &str, name: &str) -> Result<(), SchemaError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier {
            path: path.to_string(),
            name: name.to_string(),
        })
    }
}

pub fn optional_str(
    map: &Mapping,
    field: &'static str,
    path: &str,
) -> Result<Option<String>, SchemaError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(SchemaError::InvalidField {
            path: path.to_string(),
            field,
            reason: "must be a string".into(),
        }),
    }
}

pub fn required_str(map: &Mapping, field: &'static str, path: &str) -> Result<String, SchemaError> {
    optional_str(map, field, path)?.ok_or_else(|| SchemaError::MissingField {
        path: path.to_string(),
        field,
    })
}

/// Read an optional `dtype` field and resolve it against the registry.
pub fn optional_dtype(
    map: &Mapping,
    field: &'static str,
    path: &str,
) -> Result<Option<DataType>, SchemaError> {
    let Some(raw) = optional_str(map, field, path)? else {
        return Ok(None);
    };
    DataType::from_name(&raw)
        .map(Some)
        .ok_or_else(|| SchemaError::UnknownDataType {
            path: path.to_string(),
            dtype: raw,
        })
}

pub fn optional_int(
    map: &Mapping,
    field: &'static str,
    path: &str,
) -> Result<Option<i64>, SchemaError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| SchemaError::InvalidField {
            path: path.to_string(),
            field,
            reason: "must be an integer".into(),
        }),
        Some(_) => Err(SchemaError::InvalidField {
            path: path.to_string(),
            field,
            reason: "must be an integer".into(),
        }),
    }
}

/// Optional sequence field; `null` and absence both read as empty.
pub fn optional_seq<'a>(
    map: &'a Mapping,
    field: &'static str,
    path: &str,
) -> Result<&'a [Value], SchemaError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Sequence(items)) => Ok(items.as_slice()),
        Some(_) => Err(SchemaError::InvalidField {
            path: path.to_string(),
            field,
            reason: "must be a list".into(),
        }),
    }
}

/// Convert the `meta` mapping into scalar values.
pub fn meta(map: &Mapping, path: &str) -> Result<Meta, SchemaError> {
    let mut out = Meta::new();
    let entries = match map.get("meta") {
        None | Some(Value::Null) => return Ok(out),
        Some(Value::Mapping(m)) => m,
        Some(_) => {
            return Err(SchemaError::InvalidField {
                path: path.to_string(),
                field: "meta",
                reason: "must be a mapping".into(),
            })
        }
    };
    for (key, value) in entries {
        let Some(key) = key.as_str() else {
            return Err(SchemaError::InvalidField {
                path: path.to_string(),
                field: "meta",
                reason: "keys must be strings".into(),
            });
        };
        let value = match value {
            Value::Bool(b) => MetaValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => MetaValue::Int(i),
                None => MetaValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => MetaValue::Str(s.clone()),
            _ => {
                return Err(SchemaError::InvalidField {
                    path: path.to_string(),
                    field: "meta",
                    reason: format!("value of '{key}' must be a scalar"),
                })
            }
        };
        out.insert(key.to_string(), value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(is_identifier("velocity"));
        assert!(is_identifier("_private2"));
        assert!(is_identifier("Vbus"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("has-dash"));
        assert!(!is_identifier("float"));
    }

    #[test]
    fn meta_scalars() {
        let map: Mapping =
            serde_yaml::from_str("meta: {dynamic: true, jog_step: 100, scale: 0.5, tag: x}")
                .unwrap();
        let meta = meta(&map, "n").unwrap();
        assert_eq!(meta["dynamic"], MetaValue::Bool(true));
        assert_eq!(meta["jog_step"], MetaValue::Int(100));
        assert_eq!(meta["scale"], MetaValue::Float(0.5));
        assert_eq!(meta["tag"], MetaValue::Str("x".into()));
    }

    #[test]
    fn meta_rejects_nested_values() {
        let map: Mapping = serde_yaml::from_str("meta: {nested: [1, 2]}").unwrap();
        assert!(matches!(
            meta(&map, "n"),
            Err(SchemaError::InvalidField { field: "meta", .. })
        ));
    }
}
