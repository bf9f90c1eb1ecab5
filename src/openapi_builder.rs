use crate::annotation::{
    HttpMethod, MemberKey, RequestBodySpec, ResponseContent, ResponseSpec, SiteAnnotations,
};
use crate::controller::Controller;
use crate::error::{Error, Result};
use crate::path_template::translate;
use crate::schema::{schema_ref, Schema};
use crate::schema_aggregator::{aggregate_schemas, SchemaSource};
use indexmap::{IndexMap, IndexSet};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

const JSON: &str = "application/json";
const TEXT: &str = "text/plain";

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    /// API paths
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    /// Components (schemas, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    /// Top-level members the builder does not touch (servers, tags, ...)
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    /// Path parameters shared by every operation of the path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ReferenceOr<Parameter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Operation summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Operation description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Operation ID
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Request body
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<ReferenceOr<RequestBody>>,
    /// Responses keyed by status code
    #[serde(default)]
    pub responses: IndexMap<String, ReferenceOr<Response>>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Either a `$ref` to a reusable component or the object itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceOr<T> {
    Reference {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Item(T),
}

impl<T> ReferenceOr<T> {
    /// The inline object, `None` for a reference
    pub fn as_item(&self) -> Option<&T> {
        match self {
            ReferenceOr::Item(item) => Some(item),
            ReferenceOr::Reference { .. } => None,
        }
    }
}

impl<T> From<T> for ReferenceOr<T> {
    fn from(item: T) -> Self {
        ReferenceOr::Item(item)
    }
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter location (path, query, header)
    #[serde(rename = "in")]
    pub location: String,
    /// Whether the parameter is required
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    /// Parameter schema; absent when the parameter describes itself with `content`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    /// Parameter description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Request body description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the request body is required
    #[serde(default)]
    pub required: bool,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// OpenAPI Header object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Response description
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<IndexMap<String, Header>>,
    /// Response content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Schema definitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemas: Option<IndexMap<String, Value>>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl OpenApiDocument {
    /// A minimal OpenAPI 3.0 document with no paths
    pub fn new(title: &str, version: &str) -> Self {
        Self {
            openapi: "3.0.0".to_string(),
            info: Info {
                title: title.to_string(),
                version: version.to_string(),
                description: None,
                extra: IndexMap::new(),
            },
            paths: IndexMap::new(),
            components: None,
            extensions: IndexMap::new(),
        }
    }
}

impl Default for OpenApiDocument {
    fn default() -> Self {
        Self::new("Generated API", "1.0.0")
    }
}

impl PathItem {
    /// The operation slot for an HTTP method
    pub fn operation_mut(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Trace => &mut self.trace,
        }
    }

    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Trace => self.trace.as_ref(),
        }
    }

    /// Adds a parameter, replacing an existing one of the same name in place
    pub fn set_parameter(&mut self, parameter: Parameter) {
        let existing = self
            .parameters
            .iter_mut()
            .find(|p| p.as_item().is_some_and(|p| p.name == parameter.name));
        match existing {
            Some(existing) => *existing = ReferenceOr::Item(parameter),
            None => self.parameters.push(ReferenceOr::Item(parameter)),
        }
    }
}

/// Built-in response used when an annotation gives no content or description
struct DefaultResponse {
    description: &'static str,
    /// Example of the `text/plain` body, `Some("")` for a body without example
    text_example: Option<&'static str>,
}

fn default_response(code: u16) -> Option<DefaultResponse> {
    let (description, text_example) = match code {
        200 => ("Successful request", Some("")),
        204 => ("Successful request, no content to return", None),
        400 => ("Bad request", Some("Bad Request")),
        401 => ("Unauthorized", Some("Unauthorized")),
        403 => ("Forbidden", Some("Forbidden")),
        404 => ("Not found", Some("Not Found")),
        500 => ("Internal server error", Some("Internal Server Error")),
        _ => return None,
    };
    Some(DefaultResponse {
        description,
        text_example,
    })
}

impl DefaultResponse {
    fn content(&self) -> Option<IndexMap<String, MediaType>> {
        let example = self.text_example?;
        let mut schema = Schema::string();
        if !example.is_empty() {
            schema = schema.with_example(example);
        }
        Some(single_media_type(TEXT, schema))
    }
}

fn single_media_type(content_type: &str, schema: Schema) -> IndexMap<String, MediaType> {
    let mut content = IndexMap::new();
    content.insert(
        content_type.to_string(),
        MediaType {
            schema: Some(schema),
            ..MediaType::default()
        },
    );
    content
}

fn resolve_content(content: &ResponseContent) -> IndexMap<String, MediaType> {
    match content {
        ResponseContent::Schema(name) => single_media_type(JSON, schema_ref(name)),
        ResponseContent::ByMediaType(by_type) => by_type
            .iter()
            .map(|(content_type, name)| {
                let media = MediaType {
                    schema: Some(schema_ref(name)),
                    ..MediaType::default()
                };
                (content_type.clone(), media)
            })
            .collect(),
        ResponseContent::Content(content) => content.clone(),
    }
}

fn resolve_request_body(spec: &RequestBodySpec) -> RequestBody {
    match spec {
        RequestBodySpec::Schema(name) => RequestBody {
            description: None,
            required: true,
            content: single_media_type(JSON, schema_ref(name)),
        },
        RequestBodySpec::Body(body) => body.clone(),
    }
}

/// Folds one response annotation into the responses of an operation.
///
/// Annotations for the same code merge field by field: the description is always replaced,
/// content and headers only when the annotation resolves to some.
fn merge_response(responses: &mut IndexMap<String, Response>, spec: &ResponseSpec) {
    let fallback = default_response(spec.code);
    let content = match &spec.content {
        Some(content) => Some(resolve_content(content)),
        None => fallback.as_ref().and_then(DefaultResponse::content),
    };
    let description = spec
        .description
        .clone()
        .or_else(|| fallback.as_ref().map(|d| d.description.to_string()))
        .unwrap_or_else(|| "Response".to_string());

    let response = responses.entry(spec.code.to_string()).or_default();
    response.description = description;
    if content.is_some() {
        response.content = content;
    }
    if let Some(headers) = &spec.headers {
        response.headers = Some(headers.clone());
    }
}

/// Builds one operation from the class and method annotations of a routed member
fn build_operation(class: &SiteAnnotations, key: &MemberKey, method: &SiteAnnotations) -> Operation {
    let tags: IndexSet<&String> = class.tags.iter().chain(method.tags.iter()).collect();

    let mut responses = IndexMap::new();
    for spec in class.responses.iter().chain(method.responses.iter()) {
        merge_response(&mut responses, spec);
    }

    Operation {
        tags: tags.into_iter().cloned().collect(),
        summary: method.summary.clone(),
        description: method.description.clone(),
        operation_id: method
            .operation_id
            .clone()
            .or_else(|| key.identifier().map(str::to_string)),
        request_body: method
            .request_body
            .as_ref()
            .or(class.request_body.as_ref())
            .map(|spec| ReferenceOr::Item(resolve_request_body(spec))),
        responses: responses
            .into_iter()
            .map(|(code, response)| (code, ReferenceOr::Item(response)))
            .collect(),
        extra: IndexMap::new(),
    }
}

/// OpenAPI document builder
///
/// Starts from a deep copy of a base document and adds one operation per routed controller
/// member and path combination.
pub struct OpenApiBuilder {
    document: OpenApiDocument,
    /// Translated paths whose parameters have been attached
    seen_paths: HashSet<String>,
    /// (translated path, method) pairs produced so far
    operations: HashSet<(String, HttpMethod)>,
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with a default base document
    pub fn new() -> Self {
        Self::from_base(&OpenApiDocument::default())
    }

    /// Create a builder working on an independent copy of `base`
    pub fn from_base(base: &OpenApiDocument) -> Self {
        debug!("Initializing OpenApiBuilder from base document");
        Self {
            document: base.clone(),
            seen_paths: HashSet::new(),
            operations: HashSet::new(),
        }
    }

    /// Add the operations of one controller instance
    ///
    /// # Errors
    ///
    /// [`Error::MetadataUnavailable`] when the controller has no annotation table,
    /// [`Error::DuplicatePathMethod`] when an operation collides with one added earlier.
    pub fn add_controller(&mut self, controller: &dyn Controller) -> Result<()> {
        let store = controller
            .annotations()
            .ok_or_else(|| Error::MetadataUnavailable {
                controller: controller.name().to_string(),
            })?;

        if !store.has_paths() {
            debug!("Skipping {}: no path annotations", store.controller_name());
            return Ok(());
        }

        let class = store.class();
        for (key, method) in store.routed_methods() {
            let verb = method
                .http_method
                .or(class.http_method)
                .unwrap_or(HttpMethod::Get);

            for class_path in store.class_paths() {
                for method_path in &method.paths {
                    let translated = translate(&format!("{}{}", class_path, method_path));
                    debug!(
                        "Adding operation: {} {} ({}::{})",
                        verb,
                        translated.path,
                        store.controller_name(),
                        key
                    );

                    if !self.operations.insert((translated.path.clone(), verb)) {
                        return Err(Error::DuplicatePathMethod {
                            path: translated.path,
                            method: verb.operation_key(),
                        });
                    }

                    let path_item = self
                        .document
                        .paths
                        .entry(translated.path.clone())
                        .or_default();

                    let operation = build_operation(class, key, method);
                    if operation.responses.is_empty() {
                        // OpenAPI 3.0 requires at least one response per operation
                        warn!(
                            "{} {} has no responses ({}::{})",
                            verb,
                            translated.path,
                            store.controller_name(),
                            key
                        );
                    }

                    if self.seen_paths.insert(translated.path) {
                        for parameter in translated.parameters {
                            path_item.set_parameter(parameter);
                        }
                    }

                    *path_item.operation_mut(verb) = Some(operation);
                }
            }
        }

        Ok(())
    }

    /// Build the final OpenAPI document, merging derived component schemas if a source is given
    ///
    /// # Errors
    ///
    /// [`Error::SchemaDerivationFailure`] if any declaration file fails to derive; no document
    /// is returned in that case.
    pub fn build(mut self, schemas: Option<&SchemaSource>) -> Result<OpenApiDocument> {
        debug!("Building final OpenAPI document");

        if let Some(source) = schemas {
            let derived = aggregate_schemas(source)?;
            info!("Merging {} derived schemas", derived.len());
            self.document
                .components
                .get_or_insert_with(Components::default)
                .schemas
                .get_or_insert_with(IndexMap::new)
                .extend(derived);
        }

        Ok(self.document)
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Synthesizes the OpenAPI document for a list of controller instances.
///
/// The result is an independent copy of `base` with one operation per routed member, path and
/// method; `components.schemas` is extended from `schemas` when given.
pub fn synthesize(
    base: &OpenApiDocument,
    controllers: &[Arc<dyn Controller>],
    schemas: Option<&SchemaSource>,
) -> Result<OpenApiDocument> {
    let mut builder = OpenApiBuilder::from_base(base);
    for controller in controllers {
        builder.add_controller(controller.as_ref())?;
    }
    let document = builder.build(schemas)?;
    info!("Synthesized {} paths", document.paths.len());
    Ok(document)
}
