//! Component schemas derived from declaration files.
//!
//! Derivation itself is delegated to a [`SchemaDeriver`]. The aggregator picks the files, names
//! each schema after its file, and normalises what the deriver returns so it can live under
//! `components.schemas`: references into the local `definitions` table are replaced by the
//! definitions themselves, single-value `const` restrictions become one-element enums, and the
//! `definitions` table and `$schema` marker are dropped.

use crate::error::{Error, Result};
use crate::scanner::FileScanner;
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Keywords whose object value maps names to schemas rather than being a schema
const NAMED_SCHEMAS: &[&str] = &["properties", "patternProperties", "definitions"];

/// Derives a JSON schema for one symbol declared in a file.
///
/// Returned schemas may carry a local `definitions` table referenced as `#/definitions/<Name>`.
pub trait SchemaDeriver {
    fn derive(&self, file: &Path, symbol: &str) -> anyhow::Result<Value>;
}

impl<F> SchemaDeriver for F
where
    F: Fn(&Path, &str) -> anyhow::Result<Value>,
{
    fn derive(&self, file: &Path, symbol: &str) -> anyhow::Result<Value> {
        self(file, symbol)
    }
}

/// Where component schemas come from: files under `root` matching `pattern`, derived by `deriver`.
pub struct SchemaSource {
    pub root: PathBuf,
    pub pattern: String,
    deriver: Box<dyn SchemaDeriver>,
}

impl SchemaSource {
    pub fn new(root: PathBuf, pattern: &str, deriver: impl SchemaDeriver + 'static) -> Self {
        Self {
            root,
            pattern: pattern.to_string(),
            deriver: Box::new(deriver),
        }
    }
}

/// Schema name for a declaration file: the file name up to its first `.`
pub fn symbol_name(file: &Path) -> String {
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.split_once('.') {
        Some((symbol, _)) => symbol.to_string(),
        None => file_name,
    }
}

/// Derives and normalises one schema per matching declaration file, keyed by symbol name.
///
/// # Errors
///
/// [`Error::InvalidArgument`] for a bad pattern or root, [`Error::SchemaDerivationFailure`]
/// for the first file the deriver rejects. Nothing is returned for the other files in either
/// case.
pub fn aggregate_schemas(source: &SchemaSource) -> Result<IndexMap<String, Value>> {
    let scan = FileScanner::new(source.root.clone(), &source.pattern)
        .and_then(|scanner| scanner.scan())
        .map_err(|e| Error::InvalidArgument(format!("{:#}", e)))?;

    for warning in &scan.warnings {
        warn!("{}", warning);
    }
    info!(
        "Deriving schemas from {} declaration files matching {}",
        scan.files.len(),
        source.pattern
    );

    let mut schemas = IndexMap::new();
    for file in scan.files {
        let symbol = symbol_name(&file);
        debug!("Deriving {} from {}", symbol, file.display());
        let derived = source
            .deriver
            .derive(&file, &symbol)
            .map_err(|source| Error::SchemaDerivationFailure {
                file: file.clone(),
                source,
            })?;
        schemas.insert(symbol, normalize(derived));
    }

    Ok(schemas)
}

/// Inlines local definitions, rewrites `const` to `enum` and drops the definitions table and
/// `$schema` marker.
pub fn normalize(schema: Value) -> Value {
    let (schema, definitions) = match schema {
        Value::Object(mut map) => {
            map.remove("$schema");
            let definitions = match map.remove("definitions") {
                Some(Value::Object(definitions)) => definitions,
                _ => Map::new(),
            };
            (Value::Object(map), definitions)
        }
        other => (other, Map::new()),
    };

    let mut inlining = Vec::new();
    rewrite(schema, &definitions, &mut inlining)
}

/// Rewrites one schema node; `inlining` holds the definitions currently being substituted.
fn rewrite(node: Value, definitions: &Map<String, Value>, inlining: &mut Vec<String>) -> Value {
    match node {
        Value::Object(mut map) => {
            if let Some(name) = local_reference(&map) {
                match definitions.get(&name) {
                    Some(definition) if !inlining.contains(&name) => {
                        inlining.push(name);
                        let inlined = rewrite(definition.clone(), definitions, inlining);
                        inlining.pop();
                        return inlined;
                    }
                    Some(_) => debug!("Recursive reference to {} left in place", name),
                    None => warn!("Reference to unknown definition {}", name),
                }
            }

            if let Some(value) = map.remove("const") {
                map.insert("enum".to_string(), Value::Array(vec![value]));
            }

            let rewritten = map
                .into_iter()
                .map(|(key, value)| {
                    let value = if NAMED_SCHEMAS.contains(&key.as_str()) {
                        rewrite_named(value, definitions, inlining)
                    } else {
                        rewrite(value, definitions, inlining)
                    };
                    (key, value)
                })
                .collect();
            Value::Object(rewritten)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rewrite(item, definitions, inlining))
                .collect(),
        ),
        other => other,
    }
}

/// Rewrites the schemas of a name → schema map, leaving the names alone
fn rewrite_named(value: Value, definitions: &Map<String, Value>, inlining: &mut Vec<String>) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(name, schema)| (name, rewrite(schema, definitions, inlining)))
                .collect(),
        ),
        other => rewrite(other, definitions, inlining),
    }
}

fn local_reference(map: &Map<String, Value>) -> Option<String> {
    map.get("$ref")?
        .as_str()?
        .strip_prefix(DEFINITIONS_PREFIX)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_symbol_name_stops_at_first_dot() {
        assert_eq!(symbol_name(Path::new("types/Widget.rs")), "Widget");
        assert_eq!(symbol_name(Path::new("types/Widget.schema.json")), "Widget");
        assert_eq!(symbol_name(Path::new("Plain")), "Plain");
    }

    #[test]
    fn test_normalize_inlines_definitions_and_rewrites_const() {
        let derived = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {
                "kind": {"const": "widget"},
                "size": {"$ref": "#/definitions/Size"},
                "const": {"type": "string"}
            },
            "definitions": {
                "Size": {
                    "oneOf": [{"const": "small"}, {"$ref": "#/definitions/Custom"}]
                },
                "Custom": {"type": "object", "properties": {"mm": {"type": "integer"}}}
            }
        });

        assert_eq!(
            normalize(derived),
            json!({
                "type": "object",
                "properties": {
                    "kind": {"enum": ["widget"]},
                    "size": {
                        "oneOf": [
                            {"enum": ["small"]},
                            {"type": "object", "properties": {"mm": {"type": "integer"}}}
                        ]
                    },
                    "const": {"type": "string"}
                }
            })
        );
    }

    #[test]
    fn test_normalize_root_reference() {
        let derived = json!({
            "$ref": "#/definitions/Widget",
            "definitions": {"Widget": {"type": "object"}}
        });
        assert_eq!(normalize(derived), json!({"type": "object"}));
    }

    #[test]
    fn test_recursive_reference_is_left_in_place() {
        let derived = json!({
            "$ref": "#/definitions/Node",
            "definitions": {
                "Node": {
                    "type": "object",
                    "properties": {"next": {"$ref": "#/definitions/Node"}}
                }
            }
        });
        assert_eq!(
            normalize(derived),
            json!({
                "type": "object",
                "properties": {"next": {"$ref": "#/definitions/Node"}}
            })
        );
    }

    #[test]
    fn test_aggregate_keys_by_symbol() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Widget.rs"), "").unwrap();
        fs::write(temp_dir.path().join("Gadget.rs"), "").unwrap();

        let deriver = |_file: &Path, symbol: &str| -> anyhow::Result<Value> {
            Ok(json!({"title": symbol, "$schema": "draft-07"}))
        };
        let source = SchemaSource::new(temp_dir.path().to_path_buf(), "*.rs", deriver);
        let schemas = aggregate_schemas(&source).unwrap();

        let keys: Vec<&String> = schemas.keys().collect();
        assert_eq!(keys, vec!["Gadget", "Widget"]);
        assert_eq!(schemas["Widget"], json!({"title": "Widget"}));
    }

    #[test]
    fn test_aggregate_fails_on_first_derivation_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Broken.rs"), "").unwrap();
        fs::write(temp_dir.path().join("Fine.rs"), "").unwrap();

        let deriver = |_file: &Path, symbol: &str| -> anyhow::Result<Value> {
            if symbol == "Broken" {
                anyhow::bail!("cannot parse {}", symbol);
            }
            Ok(json!({}))
        };
        let source = SchemaSource::new(temp_dir.path().to_path_buf(), "*.rs", deriver);

        match aggregate_schemas(&source) {
            Err(Error::SchemaDerivationFailure { file, source }) => {
                assert!(file.ends_with("Broken.rs"));
                assert_eq!(source.to_string(), "cannot parse Broken");
            }
            other => panic!("expected SchemaDerivationFailure, got {:?}", other),
        }
    }
}
