use controller_openapi::{
    annotation::{ControllerBuilder, HttpMethod, ResponseSpec},
    controller::Controller,
    error::Error,
    manifest::ControllerManifest,
    openapi_builder::{synthesize, OpenApiDocument, Operation, PathItem},
    schema::schema_ref,
    schema_aggregator::SchemaSource,
    serializer::{load_document, serialize_yaml},
    type_resolver::RustTypeDeriver,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn shop_controllers() -> Vec<Arc<dyn Controller>> {
    ControllerManifest::load(&fixtures().join("shop.yaml"))
        .expect("Failed to load manifest")
        .into_controllers()
        .expect("Failed to build controllers")
}

fn shop_document(schemas: Option<&SchemaSource>) -> Value {
    let document = synthesize(&OpenApiDocument::default(), &shop_controllers(), schemas)
        .expect("Failed to synthesize document");
    serde_json::to_value(document).unwrap()
}

#[test]
fn test_manifest_end_to_end_paths() {
    let doc = shop_document(None);

    let paths: Vec<&String> = doc["paths"].as_object().unwrap().keys().collect();
    assert_eq!(
        paths,
        vec![
            "/products/{id}",
            "/catalog/{id}",
            "/products/search/{sort}",
            "/products/find",
            "/catalog/search/{sort}",
            "/catalog/find",
            "/products",
            "/catalog",
            "/health",
        ]
    );

    assert_eq!(
        doc["paths"]["/products/search/{sort}"]["parameters"],
        json!([{
            "name": "sort",
            "in": "path",
            "required": true,
            "schema": {"type": "string", "enum": ["price", "name"]}
        }])
    );
    assert_eq!(
        doc["paths"]["/catalog/{id}"]["parameters"][0]["schema"],
        json!({"type": "string", "pattern": "[0-9]+"})
    );
}

#[test]
fn test_class_responses_apply_to_every_operation() {
    let doc = shop_document(None);
    let show = &doc["paths"]["/products/{id}"]["get"];

    assert_eq!(show["operationId"], "show");
    assert_eq!(show["summary"], "Fetch one product");
    assert_eq!(show["tags"], json!(["products"]));
    assert_eq!(
        show["responses"],
        json!({
            "200": {
                "description": "Successful request",
                "content": {
                    "application/json": {"schema": {"$ref": "#/components/schemas/Product"}}
                }
            },
            "404": {
                "description": "Not found",
                "content": {
                    "text/plain": {"schema": {"type": "string", "example": "Not Found"}}
                }
            }
        })
    );
}

#[test]
fn test_method_response_overrides_class_response_fields() {
    let doc = shop_document(None);
    let search = &doc["paths"]["/catalog/find"]["get"];

    assert_eq!(
        search["responses"]["200"],
        json!({
            "description": "Matching products",
            "content": {
                "application/json": {
                    "schema": {
                        "type": "array",
                        "items": {"$ref": "#/components/schemas/Product"}
                    }
                }
            }
        })
    );
}

#[test]
fn test_post_operation_with_request_body_and_headers() {
    let doc = shop_document(None);
    let create = &doc["paths"]["/catalog"]["post"];

    assert_eq!(create["operationId"], "createProduct");
    assert_eq!(
        create["requestBody"],
        json!({
            "required": true,
            "content": {
                "application/json": {"schema": {"$ref": "#/components/schemas/NewProduct"}}
            }
        })
    );
    let keys: Vec<&String> = create["responses"].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["200", "404", "201"]);
    assert_eq!(
        create["responses"]["201"]["headers"]["Location"]["schema"],
        json!({"type": "string"})
    );
    assert!(doc["paths"]["/catalog"].get("get").is_none());
}

#[test]
fn test_no_content_default_response() {
    let doc = shop_document(None);
    assert_eq!(
        doc["paths"]["/health"]["get"]["responses"],
        json!({"204": {"description": "Successful request, no content to return"}})
    );
}

#[test]
fn test_schemas_derived_from_rust_declarations() {
    let source = SchemaSource::new(fixtures(), "*.rs", RustTypeDeriver);
    let doc = shop_document(Some(&source));
    let schemas = &doc["components"]["schemas"];

    let names: Vec<&String> = schemas.as_object().unwrap().keys().collect();
    assert_eq!(names, vec!["NewProduct", "Product"]);

    assert_eq!(
        schemas["Product"],
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer", "format": "int64"},
                "name": {"type": "string"},
                "price": {
                    "type": "object",
                    "properties": {
                        "amount": {"type": "number", "format": "double"},
                        "currency": {"type": "string", "enum": ["Eur", "Usd"]}
                    },
                    "required": ["amount", "currency"]
                },
                "tagList": {"type": "array", "items": {"type": "string"}},
                "discontinued": {"type": "boolean"}
            },
            "required": ["id", "name", "price", "tagList"],
            "description": "A product in the catalog"
        })
    );

    assert_eq!(schemas["NewProduct"]["oneOf"][0], json!({"enum": ["Draft"]}));
    assert_eq!(schemas["NewProduct"]["oneOf"][1]["required"], json!(["Listed"]));
    assert!(schemas.get("$schema").is_none());
}

#[test]
fn test_derivation_failure_returns_no_document() {
    let source = SchemaSource::new(fixtures(), "shop.yaml", RustTypeDeriver);
    let result = synthesize(&OpenApiDocument::default(), &shop_controllers(), Some(&source));

    match result {
        Err(Error::SchemaDerivationFailure { file, .. }) => assert!(file.ends_with("shop.yaml")),
        other => panic!("expected SchemaDerivationFailure, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_duplicate_path_method_across_controllers() {
    let first: Vec<Arc<dyn Controller>> = ControllerManifest::from_yaml(
        r#"
controllers:
  - name: Orders
    class: { paths: [/orders] }
    methods:
      show: { paths: ["/:id"] }
  - name: LegacyOrders
    methods:
      find: { paths: ["/orders/:id(\\d+)"] }
"#,
    )
    .unwrap()
    .into_controllers()
    .unwrap();

    match synthesize(&OpenApiDocument::default(), &first, None) {
        Err(Error::DuplicatePathMethod { path, method }) => {
            assert_eq!(path, "/orders/{id}");
            assert_eq!(method, "get");
        }
        other => panic!("expected DuplicatePathMethod, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_base_document_is_deep_copied() {
    let base = load_document(&fixtures().join("base.yaml")).expect("Failed to load base");
    let controllers = shop_controllers();

    let mut document = synthesize(&base, &controllers, None).unwrap();
    assert!(document.paths.contains_key("/status"));
    assert!(document.paths.contains_key("/health"));
    assert_eq!(document.info.title, "Shop API");

    document.paths.insert("/mutated".to_string(), PathItem::default());
    if let Some(status) = document.paths.get_mut("/status") {
        status.get = Some(Operation::default());
    }

    assert_eq!(base.paths.len(), 1);
    assert_eq!(
        base.paths["/status"].get.as_ref().and_then(|op| op.summary.as_deref()),
        Some("Service status")
    );

    let yaml = serialize_yaml(&document).unwrap();
    assert!(yaml.contains("url: https://shop.example.com"));
}

#[test]
fn test_in_code_controller_with_class_response_only() {
    struct Widgets {
        store: controller_openapi::annotation::AnnotationStore,
    }

    impl Controller for Widgets {
        fn annotations(&self) -> Option<&controller_openapi::annotation::AnnotationStore> {
            Some(&self.store)
        }

        fn handle(
            &self,
            _member: &controller_openapi::annotation::MemberKey,
            _request: controller_openapi::controller::Request,
        ) -> controller_openapi::controller::Response {
            controller_openapi::controller::Response::new(Vec::new())
        }
    }

    let store = ControllerBuilder::new("Widgets")
        .class(|c| c.path("/widgets").response(ResponseSpec::new(200).schema("Widget")))
        .method("list", |m| m.path("").http_method(HttpMethod::Get))
        .build()
        .unwrap();
    let controllers: Vec<Arc<dyn Controller>> = vec![Arc::new(Widgets { store })];

    let doc = synthesize(&OpenApiDocument::default(), &controllers, None).unwrap();
    let responses = &doc.paths["/widgets"].get.as_ref().unwrap().responses;

    assert_eq!(responses.len(), 1);
    let content = responses["200"].as_item().unwrap().content.as_ref().unwrap();
    assert_eq!(content["application/json"].schema, Some(schema_ref("Widget")));
}
