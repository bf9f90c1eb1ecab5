use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Parser for Rust declaration files.
///
/// The `AstParser` uses the `syn` crate to parse a file holding type declarations into an
/// abstract syntax tree from which [`crate::type_resolver::TypeResolver`] derives schemas.
///
/// # Example
///
/// ```no_run
/// use controller_openapi::parser::AstParser;
/// use std::path::Path;
///
/// let parsed = AstParser::parse_file(Path::new("types/Widget.rs")).unwrap();
/// println!("Parsed {} items", parsed.syntax_tree.items.len());
/// ```
pub struct AstParser;

/// A successfully parsed declaration file.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// The parsed abstract syntax tree
    pub syntax_tree: syn::File,
}

impl AstParser {
    /// Reads and parses a single Rust source file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid Rust syntax.
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        Self::parse_source(path, &content)
    }

    /// Parses source text that was already loaded from `path`.
    pub fn parse_source(path: &Path, content: &str) -> Result<ParsedFile> {
        let syntax_tree = syn::parse_file(content)
            .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display()))?;

        Ok(ParsedFile {
            path: path.to_path_buf(),
            syntax_tree,
        })
    }
}
