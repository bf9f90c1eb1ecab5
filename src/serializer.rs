//! Serialization module for reading and writing OpenAPI documents as YAML or JSON.
//!
//! Documents are loaded as base documents for synthesis and written back out once routes have
//! been merged in. Members the document types do not model are carried through unchanged.

use crate::manifest::has_json_extension;
use crate::openapi_builder::OpenApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes an OpenAPI document to YAML format.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```
/// use controller_openapi::openapi_builder::OpenApiDocument;
/// use controller_openapi::serializer::serialize_yaml;
///
/// let yaml = serialize_yaml(&OpenApiDocument::new("Pets", "2.0.0")).unwrap();
/// assert!(yaml.contains("title: Pets"));
/// ```
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes an OpenAPI document to pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize OpenAPI document to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
///
/// An existing file is overwritten.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Reads an OpenAPI document, as JSON when the file ends in `.json` and as YAML otherwise.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid document.
pub fn load_document(path: &Path) -> Result<OpenApiDocument> {
    debug!("Loading OpenAPI document: {}", path.display());
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;

    if has_json_extension(path) {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON OpenAPI document: {}", path.display()))
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML OpenAPI document: {}", path.display()))
    }
}
