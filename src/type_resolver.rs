//! JSON schemas derived from Rust type declarations.
//!
//! [`RustTypeDeriver`] is the schema deriver used by the command-line tool: it reads a `.rs`
//! declaration file, finds the struct, enum or type alias named after the file and emits a
//! draft-07 JSON schema for it. Other types declared in the same file are collected in a local
//! `definitions` table and referenced as `#/definitions/<Name>`.

use crate::parser::{AstParser, ParsedFile};
use crate::schema_aggregator::SchemaDeriver;
use anyhow::{bail, Result};
use indexmap::IndexMap;
use log::debug;
use serde_json::{json, Map, Value};
use std::path::Path;

const DEFINITIONS_PREFIX: &str = "#/definitions/";
const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// Primitive types supported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    String,
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    Bool,
    Char,
}

impl PrimitiveType {
    /// Parse a primitive type name
    pub fn parse(type_name: &str) -> Option<Self> {
        match type_name {
            "String" | "str" => Some(PrimitiveType::String),
            "i8" => Some(PrimitiveType::I8),
            "i16" => Some(PrimitiveType::I16),
            "i32" => Some(PrimitiveType::I32),
            "i64" | "isize" => Some(PrimitiveType::I64),
            "i128" => Some(PrimitiveType::I128),
            "u8" => Some(PrimitiveType::U8),
            "u16" => Some(PrimitiveType::U16),
            "u32" => Some(PrimitiveType::U32),
            "u64" | "usize" => Some(PrimitiveType::U64),
            "u128" => Some(PrimitiveType::U128),
            "f32" => Some(PrimitiveType::F32),
            "f64" => Some(PrimitiveType::F64),
            "bool" => Some(PrimitiveType::Bool),
            "char" => Some(PrimitiveType::Char),
            _ => None,
        }
    }

    fn schema(&self) -> Value {
        let (schema_type, format) = match self {
            PrimitiveType::String | PrimitiveType::Char => ("string", None),
            PrimitiveType::I8 | PrimitiveType::I16 | PrimitiveType::I32 => ("integer", Some("int32")),
            PrimitiveType::U8 | PrimitiveType::U16 | PrimitiveType::U32 => ("integer", Some("int32")),
            PrimitiveType::I64 | PrimitiveType::I128 => ("integer", Some("int64")),
            PrimitiveType::U64 | PrimitiveType::U128 => ("integer", Some("int64")),
            PrimitiveType::F32 => ("number", Some("float")),
            PrimitiveType::F64 => ("number", Some("double")),
            PrimitiveType::Bool => ("boolean", None),
        };
        match format {
            Some(format) => json!({"type": schema_type, "format": format}),
            None => json!({"type": schema_type}),
        }
    }
}

/// Serde attributes relevant to the schema
#[derive(Debug, Clone, Default)]
struct SerdeAttributes {
    rename: Option<String>,
    skip: bool,
}

impl SerdeAttributes {
    fn parse(attrs: &[syn::Attribute]) -> Self {
        let mut serde_attrs = SerdeAttributes::default();

        for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
            let parsed = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") && meta.input.peek(syn::Token![=]) {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    serde_attrs.rename = Some(value.value());
                } else if meta.path.is_ident("skip") {
                    serde_attrs.skip = true;
                } else if meta.input.peek(syn::Token![=]) {
                    meta.value()?.parse::<syn::Expr>()?;
                } else if meta.input.peek(syn::token::Paren) {
                    meta.parse_nested_meta(|inner| {
                        if inner.input.peek(syn::Token![=]) {
                            inner.value()?.parse::<syn::Expr>()?;
                        }
                        Ok(())
                    })?;
                }
                Ok(())
            });
            if let Err(e) = parsed {
                debug!("Ignoring unparsable serde attribute: {}", e);
            }
        }

        serde_attrs
    }
}

/// `///` documentation of an item, lines joined with newlines
fn doc_comment(attrs: &[syn::Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(syn::MetaNameValue {
                value:
                    syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(text),
                        ..
                    }),
                ..
            }) => Some(text.value().trim().to_string()),
            _ => None,
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn with_description(mut schema: Value, description: Option<String>) -> Value {
    if let (Value::Object(map), Some(description)) = (&mut schema, description) {
        map.insert("description".to_string(), Value::String(description));
    }
    schema
}

/// A type declared in the file being resolved
enum Declaration<'a> {
    Struct(&'a syn::ItemStruct),
    Enum(&'a syn::ItemEnum),
    Alias(&'a syn::ItemType),
}

/// Type resolver - resolves the declarations of one file into JSON schemas
pub struct TypeResolver<'a> {
    declarations: IndexMap<String, Declaration<'a>>,
}

impl<'a> TypeResolver<'a> {
    /// Indexes the top-level (and inline module) type declarations of a parsed file
    pub fn new(parsed: &'a ParsedFile) -> Self {
        let mut declarations = IndexMap::new();
        Self::collect(&parsed.syntax_tree.items, &mut declarations);
        debug!(
            "Found {} type declarations in {}",
            declarations.len(),
            parsed.path.display()
        );
        Self { declarations }
    }

    fn collect(items: &'a [syn::Item], declarations: &mut IndexMap<String, Declaration<'a>>) {
        for item in items {
            match item {
                syn::Item::Struct(item) => {
                    declarations.insert(item.ident.to_string(), Declaration::Struct(item));
                }
                syn::Item::Enum(item) => {
                    declarations.insert(item.ident.to_string(), Declaration::Enum(item));
                }
                syn::Item::Type(item) => {
                    declarations.insert(item.ident.to_string(), Declaration::Alias(item));
                }
                syn::Item::Mod(syn::ItemMod {
                    content: Some((_, items)),
                    ..
                }) => Self::collect(items, declarations),
                _ => {}
            }
        }
    }

    /// Whether a type of that name is declared in the file
    pub fn declares(&self, name: &str) -> bool {
        self.declarations.contains_key(name)
    }

    /// JSON schema of `symbol`, with every other declaration it uses under `definitions`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file declares no type named `symbol`.
    pub fn schema_for(&self, symbol: &str) -> Result<Value> {
        let Some(declaration) = self.declarations.get(symbol) else {
            bail!("no struct, enum or type alias named `{}`", symbol);
        };

        let mut definitions = IndexMap::new();
        let body = self.declaration_schema(declaration, &mut definitions);

        let mut schema = Map::new();
        schema.insert("$schema".to_string(), Value::String(DRAFT_07.to_string()));
        if let Value::Object(body) = body {
            schema.extend(body);
        }
        if !definitions.is_empty() {
            let definitions: Map<String, Value> = definitions.into_iter().collect();
            schema.insert("definitions".to_string(), Value::Object(definitions));
        }
        Ok(Value::Object(schema))
    }

    fn declaration_schema(
        &self,
        declaration: &Declaration<'a>,
        definitions: &mut IndexMap<String, Value>,
    ) -> Value {
        match declaration {
            Declaration::Struct(item) => with_description(
                self.fields_schema(&item.fields, definitions),
                doc_comment(&item.attrs),
            ),
            Declaration::Enum(item) => {
                with_description(self.enum_schema(item, definitions), doc_comment(&item.attrs))
            }
            Declaration::Alias(item) => self.type_schema(&item.ty, definitions),
        }
    }

    /// `$ref` to a declared type, deriving its definition on first use
    fn reference(&self, name: &str, definitions: &mut IndexMap<String, Value>) -> Value {
        if !definitions.contains_key(name) {
            if let Some(declaration) = self.declarations.get(name) {
                // placeholder so recursive types terminate
                definitions.insert(name.to_string(), Value::Null);
                let schema = self.declaration_schema(declaration, definitions);
                definitions.insert(name.to_string(), schema);
            }
        }
        json!({"$ref": format!("{}{}", DEFINITIONS_PREFIX, name)})
    }

    fn fields_schema(&self, fields: &syn::Fields, definitions: &mut IndexMap<String, Value>) -> Value {
        match fields {
            syn::Fields::Named(named) => {
                let mut properties = Map::new();
                let mut required = Vec::new();

                for field in &named.named {
                    let Some(ident) = &field.ident else { continue };
                    let serde_attrs = SerdeAttributes::parse(&field.attrs);
                    if serde_attrs.skip {
                        continue;
                    }
                    let name = serde_attrs.rename.unwrap_or_else(|| ident.to_string());
                    let schema = with_description(
                        self.type_schema(&field.ty, definitions),
                        doc_comment(&field.attrs),
                    );
                    if !is_option(&field.ty) {
                        required.push(Value::String(name.clone()));
                    }
                    properties.insert(name, schema);
                }

                let mut schema = Map::new();
                schema.insert("type".to_string(), json!("object"));
                schema.insert("properties".to_string(), Value::Object(properties));
                if !required.is_empty() {
                    schema.insert("required".to_string(), Value::Array(required));
                }
                Value::Object(schema)
            }
            syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                self.type_schema(&unnamed.unnamed[0].ty, definitions)
            }
            syn::Fields::Unnamed(unnamed) => {
                let items: Vec<Value> = unnamed
                    .unnamed
                    .iter()
                    .map(|field| self.type_schema(&field.ty, definitions))
                    .collect();
                tuple_schema(items)
            }
            syn::Fields::Unit => json!({"type": "null"}),
        }
    }

    fn enum_schema(&self, item: &syn::ItemEnum, definitions: &mut IndexMap<String, Value>) -> Value {
        let variant_name = |variant: &syn::Variant| {
            SerdeAttributes::parse(&variant.attrs)
                .rename
                .unwrap_or_else(|| variant.ident.to_string())
        };

        if item
            .variants
            .iter()
            .all(|variant| matches!(variant.fields, syn::Fields::Unit))
        {
            let names: Vec<Value> = item
                .variants
                .iter()
                .map(|variant| Value::String(variant_name(variant)))
                .collect();
            return json!({"type": "string", "enum": names});
        }

        // externally tagged, as serde does by default
        let variants: Vec<Value> = item
            .variants
            .iter()
            .map(|variant| {
                let name = variant_name(variant);
                let schema = match &variant.fields {
                    syn::Fields::Unit => json!({"const": name}),
                    fields => json!({
                        "type": "object",
                        "properties": {name.clone(): self.fields_schema(fields, definitions)},
                        "required": [name],
                        "additionalProperties": false
                    }),
                };
                with_description(schema, doc_comment(&variant.attrs))
            })
            .collect();
        json!({"oneOf": variants})
    }

    fn type_schema(&self, ty: &syn::Type, definitions: &mut IndexMap<String, Value>) -> Value {
        match ty {
            syn::Type::Reference(reference) => self.type_schema(&reference.elem, definitions),
            syn::Type::Paren(paren) => self.type_schema(&paren.elem, definitions),
            syn::Type::Group(group) => self.type_schema(&group.elem, definitions),
            syn::Type::Slice(slice) => {
                json!({"type": "array", "items": self.type_schema(&slice.elem, definitions)})
            }
            syn::Type::Array(array) => {
                json!({"type": "array", "items": self.type_schema(&array.elem, definitions)})
            }
            syn::Type::Tuple(tuple) if tuple.elems.is_empty() => json!({"type": "null"}),
            syn::Type::Tuple(tuple) => {
                let items = tuple
                    .elems
                    .iter()
                    .map(|elem| self.type_schema(elem, definitions))
                    .collect();
                tuple_schema(items)
            }
            syn::Type::Path(type_path) => self.path_schema(&type_path.path, definitions),
            _ => {
                debug!("Unsupported type form, leaving schema open");
                json!({})
            }
        }
    }

    fn path_schema(&self, path: &syn::Path, definitions: &mut IndexMap<String, Value>) -> Value {
        let Some(segment) = path.segments.last() else {
            return json!({});
        };
        let type_name = segment.ident.to_string();
        let args = type_arguments(segment);

        match (type_name.as_str(), args.as_slice()) {
            ("Option" | "Box" | "Arc" | "Rc" | "Cow", [inner, ..]) => {
                self.type_schema(inner, definitions)
            }
            ("Vec" | "VecDeque" | "LinkedList", [inner, ..]) => {
                json!({"type": "array", "items": self.type_schema(inner, definitions)})
            }
            ("HashSet" | "BTreeSet" | "IndexSet", [inner, ..]) => json!({
                "type": "array",
                "items": self.type_schema(inner, definitions),
                "uniqueItems": true
            }),
            ("HashMap" | "BTreeMap" | "IndexMap", [_, value, ..]) => json!({
                "type": "object",
                "additionalProperties": self.type_schema(value, definitions)
            }),
            _ if self.declares(&type_name) => self.reference(&type_name, definitions),
            ("Uuid", _) => json!({"type": "string", "format": "uuid"}),
            ("DateTime" | "NaiveDateTime" | "SystemTime", _) => {
                json!({"type": "string", "format": "date-time"})
            }
            ("NaiveDate", _) => json!({"type": "string", "format": "date"}),
            ("Value", _) => json!({}),
            (name, _) => match PrimitiveType::parse(name) {
                Some(primitive) => primitive.schema(),
                None => {
                    debug!("Unknown type: {}, using object placeholder", name);
                    json!({"type": "object"})
                }
            },
        }
    }
}

fn tuple_schema(items: Vec<Value>) -> Value {
    let len = items.len();
    json!({"type": "array", "items": items, "minItems": len, "maxItems": len})
}

/// Type arguments of a path segment, e.g. `[String, User]` for `HashMap<String, User>`
fn type_arguments(segment: &syn::PathSegment) -> Vec<&syn::Type> {
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                syn::GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn is_option(ty: &syn::Type) -> bool {
    match ty {
        syn::Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}

/// Schema deriver for Rust declaration files
#[derive(Debug, Clone, Copy, Default)]
pub struct RustTypeDeriver;

impl SchemaDeriver for RustTypeDeriver {
    fn derive(&self, file: &Path, symbol: &str) -> Result<Value> {
        let parsed = AstParser::parse_file(file)?;
        TypeResolver::new(&parsed).schema_for(symbol)
    }
}
