use std::path::PathBuf;

use crate::annotation::{AnnotationKind, DeclarationSite};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for annotation handling, resolution and document synthesis
#[derive(Debug)]
pub enum Error {
    /// Annotation applied to a declaration site kind it does not support
    UnsupportedTarget {
        kind: AnnotationKind,
        controller: String,
    },
    /// Single-valued annotation applied twice to the same declaration site
    DuplicateAnnotation {
        kind: AnnotationKind,
        controller: String,
        site: DeclarationSite,
    },
    /// Controller instance exposes no annotation table
    MetadataUnavailable { controller: String },
    /// Two operations resolve to the same translated path and HTTP method
    DuplicatePathMethod { path: String, method: String },
    /// The schema derivation collaborator failed for a declaration file
    SchemaDerivationFailure {
        file: PathBuf,
        source: anyhow::Error,
    },
    IoError(std::io::Error),
    InvalidArgument(String),
    SerializationError(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::UnsupportedTarget { kind, controller } => write!(
                f,
                "{} cannot be applied to the class of {}",
                kind, controller
            ),
            Error::DuplicateAnnotation {
                kind,
                controller,
                site,
            } => write!(
                f,
                "{} already applied to {} of {}",
                kind, site, controller
            ),
            Error::MetadataUnavailable { controller } => {
                write!(f, "no annotation metadata available for {}", controller)
            }
            Error::DuplicatePathMethod { path, method } => {
                write!(f, "duplicate operation: {} {}", method.to_uppercase(), path)
            }
            Error::SchemaDerivationFailure { file, source } => write!(
                f,
                "failed to derive schema from {}: {:#}",
                file.display(),
                source
            ),
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::SerializationError(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::SchemaDerivationFailure { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(format!("YAML: {}", err))
    }
}
