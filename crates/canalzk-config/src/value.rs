//! Typed field accessors over `toml::Value` tables.
//!
//! Each accessor returns `Ok(None)` when the field is absent and a
//! `TypeMismatch` when it is present with the wrong type. `field` is the
//! dotted path used in error messages.

use crate::ConfigError;

fn mismatch(field: &str, expected: &str) -> ConfigError {
    ConfigError::TypeMismatch {
        field: field.into(),
        expected: expected.into(),
    }
}

pub fn get_str(table: &toml::Value, key: &str, field: &str) -> Result<Option<String>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| mismatch(field, "string")),
    }
}

pub fn get_u64(table: &toml::Value, key: &str, field: &str) -> Result<Option<u64>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(v) => {
            let n = v.as_integer().ok_or_else(|| mismatch(field, "integer"))?;
            u64::try_from(n).map(Some).map_err(|_| ConfigError::OutOfRange {
                field: field.into(),
                value: n.to_string(),
                min: Some("0".into()),
                max: None,
            })
        }
    }
}

pub fn get_str_list(
    table: &toml::Value,
    key: &str,
    field: &str,
) -> Result<Option<Vec<String>>, ConfigError> {
    let Some(v) = table.get(key) else {
        return Ok(None);
    };
    let items = v.as_array().ok_or_else(|| mismatch(field, "array of strings"))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| mismatch(field, "array of strings"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

pub fn get_table<'a>(
    table: &'a toml::Value,
    key: &str,
    field: &str,
) -> Result<Option<&'a toml::value::Table>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(v) => v.as_table().map(Some).ok_or_else(|| mismatch(field, "table")),
    }
}
