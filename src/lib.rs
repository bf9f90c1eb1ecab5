//! Controller OpenAPI - routes and OpenAPI documents from annotated controllers.
//!
//! Controller types carry an annotation table ([`annotation::AnnotationStore`]) describing the
//! HTTP method, path segments, middleware and documentation of the type and each of its methods.
//! From an ordered list of controller instances the library derives two things:
//!
//! - a route table, `(method, path, middleware, handler)` records handed to a
//!   [`router::Registrar`];
//! - an OpenAPI 3.0 document, merged into a caller-supplied base document, with component
//!   schemas optionally derived from declaration files.
//!
//! # Architecture
//!
//! 1. [`annotation`] - Annotation tables and the builder that fills them
//! 2. [`controller`] - The controller trait and handlers bound to instances
//! 3. [`path_template`] - `:name(pattern)` to `{name}` translation and path parameters
//! 4. [`router`] - Route resolution and registration
//! 5. [`openapi_builder`] - Document types and synthesis
//! 6. [`schema_aggregator`] - Component schemas from declaration files
//! 7. [`scanner`], [`parser`], [`type_resolver`] - Schema derivation for Rust declarations
//! 8. [`manifest`] - Controllers declared in YAML or JSON
//! 9. [`serializer`] - Reading and writing documents
//!
//! # Example Usage
//!
//! ```
//! use controller_openapi::manifest::ControllerManifest;
//! use controller_openapi::openapi_builder::{synthesize, OpenApiDocument};
//! use controller_openapi::router::{register_routes, RouteTable};
//!
//! let manifest = ControllerManifest::from_yaml(
//!     r#"
//! controllers:
//!   - name: Users
//!     class: { paths: [/users], tags: [users] }
//!     methods:
//!       show: { paths: ["/:id"], summary: Fetch one user }
//! "#,
//! )
//! .unwrap();
//! let controllers = manifest.into_controllers().unwrap();
//!
//! let mut table = RouteTable::new();
//! assert_eq!(register_routes(&controllers, &mut table).unwrap(), 1);
//!
//! let document = synthesize(&OpenApiDocument::default(), &controllers, None).unwrap();
//! assert!(document.paths.contains_key("/users/{id}"));
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod annotation;
pub mod cli;
pub mod controller;
pub mod error;
pub mod manifest;
pub mod openapi_builder;
pub mod parser;
pub mod path_template;
pub mod router;
pub mod scanner;
pub mod schema;
pub mod schema_aggregator;
pub mod serializer;
pub mod type_resolver;
