//! Metadata helpers
//!
//! Metadata blobs are JSON objects produced by a metadata provider. The store
//! never interprets them; this module reads the handful of well-known keys the
//! synchronizer and the query layer need.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

pub const SUMMARY: &str = "summary";
pub const ARGS: &str = "args";
pub const DIST: &str = "x.dist";
/// Provider-defined exclude marker, valid at package, function and argument level
pub const EXCLUDE: &str = "x.pkgdex.exclude";

/// Whether a metadata object carries a truthy exclude marker.
pub fn is_excluded(meta: &Value) -> bool {
    match meta.get(EXCLUDE) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        Some(Value::String(s)) => !s.is_empty() && s != "0",
        _ => false,
    }
}

pub fn summary(meta: &Value) -> Option<String> {
    meta.get(SUMMARY).and_then(Value::as_str).map(str::to_string)
}

pub fn dist(meta: &Value) -> Option<String> {
    meta.get(DIST).and_then(Value::as_str).map(str::to_string)
}

/// Drop every argument carrying the exclude marker. Returns how many were removed.
pub fn strip_excluded_args(meta: &mut Value) -> usize {
    let Some(args) = meta.get_mut(ARGS).and_then(Value::as_object_mut) else {
        return 0;
    };
    let before = args.len();
    args.retain(|_, spec| !is_excluded(spec));
    before - args.len()
}

/// Parse a stored blob.
pub fn parse(blob: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(blob)?;
    if !value.is_object() {
        return Err(Error::InvalidMetadata(format!(
            "expected an object, got {}",
            kind_of(&value)
        )));
    }
    Ok(value)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One argument projected out of a function's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub summary: Option<String>,
    /// Raw schema descriptor
    pub schema: Option<Value>,
    /// Base scalar type inferred from the schema (`str`, `int`, ...)
    pub schema_type: Option<String>,
    pub req: bool,
    pub pos: Option<i64>,
    /// Takes all remaining positional values
    pub greedy: bool,
}

impl Argument {
    fn from_spec(spec: &Value) -> Self {
        let schema = spec.get("schema").cloned();
        let schema_type = schema.as_ref().and_then(schema_type);
        Self {
            summary: summary(spec),
            schema,
            schema_type,
            req: truthy(spec.get("req")),
            pos: spec.get("pos").and_then(Value::as_i64),
            greedy: truthy(spec.get("greedy")) || truthy(spec.get("slurpy")),
        }
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty() && s != "0",
        _ => false,
    }
}

/// Arguments declared by a function, keyed (and therefore sorted) by name.
pub fn arguments(meta: &Value) -> BTreeMap<String, Argument> {
    meta.get(ARGS)
        .and_then(Value::as_object)
        .map(|args| {
            args.iter()
                .map(|(name, spec)| (name.clone(), Argument::from_spec(spec)))
                .collect()
        })
        .unwrap_or_default()
}

/// Infer the base scalar type of a schema descriptor.
///
/// Accepts the short string form (`"str"`, `"int*"`) and the array form
/// (`["str", {...}]`). A trailing `*` (required marker) is stripped.
pub fn schema_type(schema: &Value) -> Option<String> {
    let raw = match schema {
        Value::String(s) => s.as_str(),
        Value::Array(items) => items.first()?.as_str()?,
        _ => return None,
    };
    let base = raw.trim_end_matches('*').trim();
    if base.is_empty() {
        None
    } else {
        Some(base.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exclude_marker() {
        assert!(is_excluded(&json!({ EXCLUDE: true })));
        assert!(is_excluded(&json!({ EXCLUDE: 1 })));
        assert!(!is_excluded(&json!({ EXCLUDE: false })));
        assert!(!is_excluded(&json!({ EXCLUDE: "0" })));
        assert!(!is_excluded(&json!({ "summary": "x" })));
    }

    #[test]
    fn test_strip_excluded_args() {
        let mut meta = json!({
            "args": {
                "keep": { "schema": "str" },
                "hide": { "schema": "int", EXCLUDE: true },
            }
        });
        assert_eq!(strip_excluded_args(&mut meta), 1);
        let args = arguments(&meta);
        assert_eq!(args.keys().collect::<Vec<_>>(), vec!["keep"]);

        let mut bare = json!({ "summary": "no args" });
        assert_eq!(strip_excluded_args(&mut bare), 0);
    }

    #[test]
    fn test_schema_type() {
        assert_eq!(schema_type(&json!("str")), Some("str".into()));
        assert_eq!(schema_type(&json!("int*")), Some("int".into()));
        assert_eq!(schema_type(&json!(["array", { "of": "str" }])), Some("array".into()));
        assert_eq!(schema_type(&json!({ "type": "str" })), None);
        assert_eq!(schema_type(&json!("*")), None);
    }

    #[test]
    fn test_arguments_projection() {
        let meta = json!({
            "args": {
                "name": { "summary": "Who", "schema": "str*", "req": true, "pos": 0 },
                "count": { "schema": ["int", { "min": 0 }] },
                "rest": { "schema": "str", "pos": 1, "slurpy": 1 },
            }
        });
        let args = arguments(&meta);
        assert_eq!(args.keys().collect::<Vec<_>>(), vec!["count", "name", "rest"]);

        let name = &args["name"];
        assert_eq!(name.schema_type.as_deref(), Some("str"));
        assert!(name.req);
        assert_eq!(name.pos, Some(0));
        assert!(!name.greedy);

        let count = &args["count"];
        assert_eq!(count.schema_type.as_deref(), Some("int"));
        assert!(!count.req);
        assert_eq!(count.pos, None);

        assert!(args["rest"].greedy);
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(parse(r#"{"summary":"ok"}"#).is_ok());
        assert!(matches!(parse("[1,2]"), Err(Error::InvalidMetadata(_))));
        assert!(matches!(parse("{oops"), Err(Error::Json(_))));
    }
}
