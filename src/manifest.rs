//! Declarative controller manifests.
//!
//! A manifest describes controller types and their annotations in YAML or JSON, so routes and
//! documents can be produced without compiling controllers:
//!
//! ```yaml
//! controllers:
//!   - name: UsersController
//!     class:
//!       paths: [/users]
//!       tags: [users]
//!       middleware: [auth]
//!     methods:
//!       show:
//!         paths: ["/:id(\\d+)"]
//!         summary: Fetch one user
//!         responses:
//!           - code: 200
//!             content: User
//!       create:
//!         method: POST
//!         paths: [""]
//!         request_body: NewUser
//! ```
//!
//! Every site block is replayed through [`ControllerBuilder`], so the usual application rules
//! apply: a `summary` in a `class` block is rejected just like an in-code annotation would be.

use crate::annotation::{
    Annotation, AnnotationStore, ControllerBuilder, HttpMethod, MemberKey, Middleware,
    RequestBodySpec, ResponseSpec, SiteBuilder,
};
use crate::controller::{Controller, Request, Response};
use crate::error::Result;
use anyhow::Context;
use http::StatusCode;
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Annotations of one declaration site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub middleware: Vec<Middleware>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodySpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<ResponseSpec>,
}

impl SiteSpec {
    /// The annotations this block stands for, in field order
    pub fn annotations(&self) -> Vec<Annotation> {
        let mut annotations = Vec::new();
        annotations.extend(self.method.map(Annotation::HttpMethod));
        annotations.extend(self.paths.iter().cloned().map(Annotation::PathSegment));
        annotations.extend(self.middleware.iter().cloned().map(Annotation::Middleware));
        annotations.extend(self.tags.iter().cloned().map(Annotation::Tag));
        annotations.extend(self.summary.clone().map(Annotation::Summary));
        annotations.extend(self.description.clone().map(Annotation::Description));
        annotations.extend(self.operation_id.clone().map(Annotation::OperationId));
        annotations.extend(self.request_body.clone().map(Annotation::RequestBody));
        annotations.extend(self.responses.iter().cloned().map(Annotation::Response));
        annotations
    }

    fn annotate(&self, site: SiteBuilder) -> SiteBuilder {
        self.annotations()
            .into_iter()
            .fold(site, |site, annotation| site.annotate(annotation))
    }
}

/// One controller type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerSpec {
    pub name: String,
    #[serde(default)]
    pub class: SiteSpec,
    #[serde(default)]
    pub methods: IndexMap<String, SiteSpec>,
}

impl ControllerSpec {
    /// Builds the annotation table of this controller.
    pub fn build_store(&self) -> Result<AnnotationStore> {
        let mut builder = ControllerBuilder::new(&self.name).class(|c| self.class.annotate(c));
        for (method, site) in &self.methods {
            builder = builder.method(method.as_str(), |m| site.annotate(m));
        }
        builder.build()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerManifest {
    #[serde(default)]
    pub controllers: Vec<ControllerSpec>,
}

impl ControllerManifest {
    /// Reads a manifest, as JSON when the file ends in `.json` and as YAML otherwise.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        debug!("Loading controller manifest: {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

        let manifest: Self = if has_json_extension(path) {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON manifest: {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML manifest: {}", path.display()))?
        };

        info!(
            "Loaded {} controllers from {}",
            manifest.controllers.len(),
            path.display()
        );
        Ok(manifest)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Builds one controller instance per entry, in manifest order.
    ///
    /// # Errors
    ///
    /// The first annotation rejected by [`ControllerBuilder`].
    pub fn into_controllers(self) -> Result<Vec<Arc<dyn Controller>>> {
        self.controllers
            .iter()
            .map(|spec| {
                let store = spec.build_store()?;
                Ok(Arc::new(ManifestController { store }) as Arc<dyn Controller>)
            })
            .collect()
    }
}

pub(crate) fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Controller described by a manifest; it has no behaviour of its own.
#[derive(Debug)]
pub struct ManifestController {
    store: AnnotationStore,
}

impl Controller for ManifestController {
    fn annotations(&self) -> Option<&AnnotationStore> {
        Some(&self.store)
    }

    fn handle(&self, member: &MemberKey, _request: Request) -> Response {
        debug!("{}::{} has no implementation", self.store.controller_name(), member);
        let mut response = Response::new(b"Not Implemented".to_vec());
        *response.status_mut() = StatusCode::NOT_IMPLEMENTED;
        response
    }
}
