//! Annotation tables for controller types.
//!
//! Every controller type owns one [`AnnotationStore`]. It records the annotations applied to the
//! type itself (the class site) and to each of its methods, accumulating multi-valued kinds in
//! application order and rejecting a second application of single-valued kinds. Stores are
//! usually produced by a [`ControllerBuilder`] once, when the controller type is registered, and
//! are only read afterwards by the route resolver and the document synthesizer.
//!
//! # Example
//!
//! ```
//! use controller_openapi::annotation::{ControllerBuilder, HttpMethod, ResponseSpec};
//!
//! let store = ControllerBuilder::new("UsersController")
//!     .class(|c| c.path("/users").tag("users").middleware("auth"))
//!     .method("show", |m| {
//!         m.path("/:id")
//!             .summary("Fetch one user")
//!             .response(ResponseSpec::new(200).schema("User"))
//!     })
//!     .method("create", |m| m.http_method(HttpMethod::Post).path("").request_body("NewUser"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(store.routed_methods().count(), 2);
//! ```

use crate::error::{Error, Result};
use crate::openapi_builder::{Header, MediaType, RequestBody};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP methods a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// Lower-case name, as used for operation keys in a path item
    pub fn operation_key(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "OPTIONS" => Ok(HttpMethod::Options),
            "HEAD" => Ok(HttpMethod::Head),
            "TRACE" => Ok(HttpMethod::Trace),
            _ => Err(Error::InvalidArgument(format!("unknown HTTP method: {}", s))),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        method.as_str().to_string()
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Patch => http::Method::PATCH,
            HttpMethod::Options => http::Method::OPTIONS,
            HttpMethod::Head => http::Method::HEAD,
            HttpMethod::Trace => http::Method::TRACE,
        }
    }
}

/// Key of a controller member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberKey {
    /// Ordinary method identifier
    Named(String),
    /// Member whose key is computed; the label is diagnostic only and is never used as an
    /// operation id
    Computed(String),
}

impl MemberKey {
    pub fn named(name: &str) -> Self {
        MemberKey::Named(name.to_string())
    }

    pub fn computed(label: &str) -> Self {
        MemberKey::Computed(label.to_string())
    }

    /// The identifier, when the member has one
    pub fn identifier(&self) -> Option<&str> {
        match self {
            MemberKey::Named(name) => Some(name),
            MemberKey::Computed(_) => None,
        }
    }
}

impl From<&str> for MemberKey {
    fn from(name: &str) -> Self {
        MemberKey::named(name)
    }
}

impl From<String> for MemberKey {
    fn from(name: String) -> Self {
        MemberKey::Named(name)
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKey::Named(name) => write!(f, "{}", name),
            MemberKey::Computed(label) => write!(f, "[{}]", label),
        }
    }
}

/// Where an annotation was attached
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeclarationSite {
    Class,
    Method(MemberKey),
}

impl fmt::Display for DeclarationSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationSite::Class => f.write_str("class"),
            DeclarationSite::Method(key) => write!(f, "method `{}`", key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    HttpMethod,
    PathSegment,
    Middleware,
    Tag,
    Summary,
    Description,
    OperationId,
    RequestBody,
    Response,
}

impl AnnotationKind {
    /// Whether the kind may be attached to the controller type itself
    pub fn applies_to_class(&self) -> bool {
        !matches!(
            self,
            AnnotationKind::Summary | AnnotationKind::Description | AnnotationKind::OperationId
        )
    }

    /// Whether a second application to the same site is rejected
    pub fn is_single_valued(&self) -> bool {
        matches!(
            self,
            AnnotationKind::HttpMethod
                | AnnotationKind::Summary
                | AnnotationKind::Description
                | AnnotationKind::OperationId
                | AnnotationKind::RequestBody
        )
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Named middleware; the registrar that receives the route decides what the name stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Middleware(pub String);

impl Middleware {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Middleware {
    fn from(name: &str) -> Self {
        Middleware(name.to_string())
    }
}

impl fmt::Display for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request body annotation: a schema name or a complete request body object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestBodySpec {
    Schema(String),
    Body(RequestBody),
}

impl From<&str> for RequestBodySpec {
    fn from(name: &str) -> Self {
        RequestBodySpec::Schema(name.to_string())
    }
}

impl From<RequestBody> for RequestBodySpec {
    fn from(body: RequestBody) -> Self {
        RequestBodySpec::Body(body)
    }
}

/// Content of a response annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseContent {
    /// Schema name, served as `application/json`
    Schema(String),
    /// Content type to schema name
    ByMediaType(IndexMap<String, String>),
    /// Content structure used as given
    Content(IndexMap<String, MediaType>),
}

/// One `(code, content, description, headers)` response annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSpec {
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ResponseContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<IndexMap<String, Header>>,
}

impl ResponseSpec {
    pub fn new(code: u16) -> Self {
        Self {
            code,
            content: None,
            description: None,
            headers: None,
        }
    }

    /// Shorthand for `application/json` content referencing a component schema
    pub fn schema(self, name: &str) -> Self {
        self.content(ResponseContent::Schema(name.to_string()))
    }

    pub fn content(mut self, content: ResponseContent) -> Self {
        self.content = Some(content);
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn header(mut self, name: &str, header: Header) -> Self {
        self.headers
            .get_or_insert_with(IndexMap::new)
            .insert(name.to_string(), header);
        self
    }
}

/// A single annotation value.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    HttpMethod(HttpMethod),
    PathSegment(String),
    Middleware(Middleware),
    Tag(String),
    Summary(String),
    Description(String),
    OperationId(String),
    RequestBody(RequestBodySpec),
    Response(ResponseSpec),
}

impl Annotation {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::HttpMethod(_) => AnnotationKind::HttpMethod,
            Annotation::PathSegment(_) => AnnotationKind::PathSegment,
            Annotation::Middleware(_) => AnnotationKind::Middleware,
            Annotation::Tag(_) => AnnotationKind::Tag,
            Annotation::Summary(_) => AnnotationKind::Summary,
            Annotation::Description(_) => AnnotationKind::Description,
            Annotation::OperationId(_) => AnnotationKind::OperationId,
            Annotation::RequestBody(_) => AnnotationKind::RequestBody,
            Annotation::Response(_) => AnnotationKind::Response,
        }
    }
}

/// Annotations accumulated on one declaration site.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteAnnotations {
    pub http_method: Option<HttpMethod>,
    pub paths: Vec<String>,
    pub middleware: Vec<Middleware>,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub operation_id: Option<String>,
    pub request_body: Option<RequestBodySpec>,
    pub responses: Vec<ResponseSpec>,
}

impl SiteAnnotations {
    /// Records an annotation; hands the kind back if a single-valued slot is already taken.
    fn record(&mut self, annotation: Annotation) -> std::result::Result<(), AnnotationKind> {
        fn set_once<T>(
            slot: &mut Option<T>,
            value: T,
            kind: AnnotationKind,
        ) -> std::result::Result<(), AnnotationKind> {
            if slot.is_some() {
                return Err(kind);
            }
            *slot = Some(value);
            Ok(())
        }

        let kind = annotation.kind();
        match annotation {
            Annotation::HttpMethod(method) => set_once(&mut self.http_method, method, kind),
            Annotation::PathSegment(path) => {
                self.paths.push(path);
                Ok(())
            }
            Annotation::Middleware(middleware) => {
                self.middleware.push(middleware);
                Ok(())
            }
            Annotation::Tag(tag) => {
                self.tags.push(tag);
                Ok(())
            }
            Annotation::Summary(text) => set_once(&mut self.summary, text, kind),
            Annotation::Description(text) => set_once(&mut self.description, text, kind),
            Annotation::OperationId(id) => set_once(&mut self.operation_id, id, kind),
            Annotation::RequestBody(body) => set_once(&mut self.request_body, body, kind),
            Annotation::Response(response) => {
                self.responses.push(response);
                Ok(())
            }
        }
    }
}

/// Annotation table of one controller type.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationStore {
    controller: String,
    class: SiteAnnotations,
    methods: IndexMap<MemberKey, SiteAnnotations>,
    /// Method sites in the order they received their first path segment
    routed: Vec<MemberKey>,
}

impl AnnotationStore {
    pub fn new(controller: &str) -> Self {
        Self {
            controller: controller.to_string(),
            class: SiteAnnotations::default(),
            methods: IndexMap::new(),
            routed: Vec::new(),
        }
    }

    pub fn controller_name(&self) -> &str {
        &self.controller
    }

    /// Applies an annotation to the controller type itself.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedTarget`] for method-only kinds, [`Error::DuplicateAnnotation`] when a
    /// single-valued kind is already set on the class.
    pub fn apply_to_class(&mut self, annotation: Annotation) -> Result<()> {
        let kind = annotation.kind();
        if !kind.applies_to_class() {
            return Err(Error::UnsupportedTarget {
                kind,
                controller: self.controller.clone(),
            });
        }
        debug!("{}: {} on class", self.controller, kind);
        self.class
            .record(annotation)
            .map_err(|kind| Error::DuplicateAnnotation {
                kind,
                controller: self.controller.clone(),
                site: DeclarationSite::Class,
            })
    }

    /// Applies an annotation to a controller method.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateAnnotation`] when a single-valued kind is already set on that method.
    pub fn apply_to_method(&mut self, key: impl Into<MemberKey>, annotation: Annotation) -> Result<()> {
        let key = key.into();
        let kind = annotation.kind();
        debug!("{}: {} on method {}", self.controller, kind, key);

        let site = self.methods.entry(key.clone()).or_default();
        let had_paths = !site.paths.is_empty();
        site.record(annotation)
            .map_err(|kind| Error::DuplicateAnnotation {
                kind,
                controller: self.controller.clone(),
                site: DeclarationSite::Method(key.clone()),
            })?;

        if !had_paths && !site.paths.is_empty() {
            self.routed.push(key);
        }
        Ok(())
    }

    /// Applies an annotation to the given site
    pub fn apply(&mut self, site: DeclarationSite, annotation: Annotation) -> Result<()> {
        match site {
            DeclarationSite::Class => self.apply_to_class(annotation),
            DeclarationSite::Method(key) => self.apply_to_method(key, annotation),
        }
    }

    pub fn class(&self) -> &SiteAnnotations {
        &self.class
    }

    pub fn method(&self, key: &MemberKey) -> Option<&SiteAnnotations> {
        self.methods.get(key)
    }

    /// Method sites carrying at least one path segment, in resolution order
    pub fn routed_methods(&self) -> impl Iterator<Item = (&MemberKey, &SiteAnnotations)> {
        self.routed
            .iter()
            .filter_map(move |key| self.methods.get(key).map(|site| (key, site)))
    }

    /// Whether any site of this controller carries a path segment
    pub fn has_paths(&self) -> bool {
        !self.class.paths.is_empty() || !self.routed.is_empty()
    }

    /// Class-level path segments, or a single empty segment when there are none
    pub fn class_paths(&self) -> Vec<&str> {
        if self.class.paths.is_empty() {
            vec![""]
        } else {
            self.class.paths.iter().map(String::as_str).collect()
        }
    }
}

/// Collects the annotations of one declaration site.
#[derive(Debug, Default)]
pub struct SiteBuilder {
    annotations: Vec<Annotation>,
}

impl SiteBuilder {
    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn http_method(self, method: HttpMethod) -> Self {
        self.annotate(Annotation::HttpMethod(method))
    }

    pub fn path(self, path: &str) -> Self {
        self.annotate(Annotation::PathSegment(path.to_string()))
    }

    pub fn middleware(self, name: &str) -> Self {
        self.annotate(Annotation::Middleware(Middleware::from(name)))
    }

    pub fn tag(self, tag: &str) -> Self {
        self.annotate(Annotation::Tag(tag.to_string()))
    }

    pub fn summary(self, summary: &str) -> Self {
        self.annotate(Annotation::Summary(summary.to_string()))
    }

    pub fn description(self, description: &str) -> Self {
        self.annotate(Annotation::Description(description.to_string()))
    }

    pub fn operation_id(self, id: &str) -> Self {
        self.annotate(Annotation::OperationId(id.to_string()))
    }

    pub fn request_body(self, body: impl Into<RequestBodySpec>) -> Self {
        self.annotate(Annotation::RequestBody(body.into()))
    }

    pub fn response(self, response: ResponseSpec) -> Self {
        self.annotate(Annotation::Response(response))
    }
}

/// Builds an [`AnnotationStore`] by replaying site annotations in declaration order.
#[derive(Debug)]
pub struct ControllerBuilder {
    controller: String,
    applications: Vec<(DeclarationSite, Annotation)>,
}

impl ControllerBuilder {
    pub fn new(controller: &str) -> Self {
        Self {
            controller: controller.to_string(),
            applications: Vec::new(),
        }
    }

    /// Annotates the controller type
    pub fn class(self, annotate: impl FnOnce(SiteBuilder) -> SiteBuilder) -> Self {
        self.site(DeclarationSite::Class, annotate)
    }

    /// Annotates one method
    pub fn method(
        self,
        key: impl Into<MemberKey>,
        annotate: impl FnOnce(SiteBuilder) -> SiteBuilder,
    ) -> Self {
        self.site(DeclarationSite::Method(key.into()), annotate)
    }

    fn site(mut self, site: DeclarationSite, annotate: impl FnOnce(SiteBuilder) -> SiteBuilder) -> Self {
        let annotations = annotate(SiteBuilder::default()).annotations;
        self.applications
            .extend(annotations.into_iter().map(|a| (site.clone(), a)));
        self
    }

    /// Applies every recorded annotation, stopping at the first rejected one.
    pub fn build(self) -> Result<AnnotationStore> {
        let mut store = AnnotationStore::new(&self.controller);
        for (site, annotation) in self.applications {
            store.apply(site, annotation)?;
        }
        debug!(
            "Built annotation table for {} ({} routed methods)",
            store.controller,
            store.routed.len()
        );
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_parsing_is_case_insensitive() {
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!("Delete".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
        assert!("FETCH".parse::<HttpMethod>().is_err());
        assert_eq!(HttpMethod::Patch.operation_key(), "patch");
    }

    #[test]
    fn test_summary_on_class_is_unsupported() {
        let mut store = AnnotationStore::new("Widgets");
        let err = store
            .apply_to_class(Annotation::Summary("nope".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedTarget {
                kind: AnnotationKind::Summary,
                ..
            }
        ));
    }

    #[test]
    fn test_method_only_kinds() {
        for annotation in [
            Annotation::Summary("s".to_string()),
            Annotation::Description("d".to_string()),
            Annotation::OperationId("o".to_string()),
        ] {
            let mut store = AnnotationStore::new("Widgets");
            assert!(store.apply_to_class(annotation.clone()).is_err());
            assert!(store.apply_to_method("list", annotation).is_ok());
        }
    }

    #[test]
    fn test_single_valued_twice_is_duplicate() {
        let result = ControllerBuilder::new("Widgets")
            .method("list", |m| m.summary("first").summary("second"))
            .build();

        match result {
            Err(Error::DuplicateAnnotation { kind, site, .. }) => {
                assert_eq!(kind, AnnotationKind::Summary);
                assert_eq!(site, DeclarationSite::Method(MemberKey::named("list")));
            }
            other => panic!("expected DuplicateAnnotation, got {:?}", other),
        }
    }

    #[test]
    fn test_http_method_twice_on_class_is_duplicate() {
        let result = ControllerBuilder::new("Widgets")
            .class(|c| c.http_method(HttpMethod::Get).http_method(HttpMethod::Post))
            .build();
        assert!(matches!(
            result,
            Err(Error::DuplicateAnnotation {
                kind: AnnotationKind::HttpMethod,
                site: DeclarationSite::Class,
                ..
            })
        ));
    }

    #[test]
    fn test_same_kind_on_different_methods_is_fine() {
        let store = ControllerBuilder::new("Widgets")
            .method("list", |m| m.summary("List").path(""))
            .method("show", |m| m.summary("Show").path("/:id"))
            .build()
            .unwrap();
        assert_eq!(
            store.method(&MemberKey::named("show")).unwrap().summary.as_deref(),
            Some("Show")
        );
    }

    #[test]
    fn test_multi_valued_accumulates_in_order() {
        let store = ControllerBuilder::new("Widgets")
            .class(|c| c.middleware("auth").middleware("audit").tag("a").tag("b"))
            .method("list", |m| m.path("/one").path("/two"))
            .build()
            .unwrap();

        let class = store.class();
        assert_eq!(
            class.middleware,
            vec![Middleware::from("auth"), Middleware::from("audit")]
        );
        assert_eq!(class.tags, vec!["a", "b"]);
        assert_eq!(
            store.method(&MemberKey::named("list")).unwrap().paths,
            vec!["/one", "/two"]
        );
    }

    #[test]
    fn test_routed_methods_follow_first_path_order() {
        let store = ControllerBuilder::new("Widgets")
            .method("helper", |m| m.summary("not routed"))
            .method("b", |m| m.summary("B"))
            .method("a", |m| m.path("/a"))
            .method("b", |m| m.path("/b"))
            .build()
            .unwrap();

        let order: Vec<String> = store
            .routed_methods()
            .map(|(key, _)| key.to_string())
            .collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_class_paths_default_to_empty_segment() {
        let store = ControllerBuilder::new("Widgets")
            .method("list", |m| m.path("/widgets"))
            .build()
            .unwrap();
        assert_eq!(store.class_paths(), vec![""]);
        assert!(store.has_paths());
    }

    #[test]
    fn test_store_without_paths() {
        let store = ControllerBuilder::new("Plain")
            .class(|c| c.tag("misc"))
            .method("helper", |m| m.summary("Helper"))
            .build()
            .unwrap();
        assert!(!store.has_paths());
        assert_eq!(store.routed_methods().count(), 0);
    }

    #[test]
    fn test_computed_member_has_no_identifier() {
        assert_eq!(MemberKey::named("list").identifier(), Some("list"));
        assert_eq!(MemberKey::computed("Symbol(run)").identifier(), None);
        assert_eq!(
            DeclarationSite::Method(MemberKey::computed("Symbol(run)")).to_string(),
            "method `[Symbol(run)]`"
        );
    }
}
