use controller_openapi::{
    annotation::{HttpMethod, Middleware},
    controller::{BoundHandler, Controller},
    error::{Error, Result},
    manifest::ControllerManifest,
    openapi_builder::{synthesize, OpenApiDocument},
    path_template::translate,
    router::{register_routes, resolve_routes, Registrar, RouteTable},
};
use http::StatusCode;
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;

fn shop_controllers() -> Vec<Arc<dyn Controller>> {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("shop.yaml");
    ControllerManifest::load(&manifest)
        .expect("Failed to load manifest")
        .into_controllers()
        .expect("Failed to build controllers")
}

/// Registrar that records what it receives
#[derive(Default)]
struct Recorder {
    routes: Vec<(HttpMethod, String, Vec<Middleware>, String)>,
}

impl Registrar for Recorder {
    fn register(
        &mut self,
        method: HttpMethod,
        path: &str,
        middleware: &[Middleware],
        handler: BoundHandler,
    ) -> Result<()> {
        self.routes.push((
            method,
            path.to_string(),
            middleware.to_vec(),
            handler.to_string(),
        ));
        Ok(())
    }
}

#[test]
fn test_route_table_for_manifest() {
    let routes = resolve_routes(&shop_controllers()).expect("Failed to resolve routes");
    let lines: Vec<String> = routes.iter().map(ToString::to_string).collect();

    assert_eq!(
        lines,
        vec![
            "GET /products/:id([0-9]+) [session] -> ProductsController::show",
            "GET /catalog/:id([0-9]+) [session] -> ProductsController::show",
            "GET /products/search/:sort(price|name) [session, rate-limit] -> ProductsController::search",
            "GET /products/find [session, rate-limit] -> ProductsController::search",
            "GET /catalog/search/:sort(price|name) [session, rate-limit] -> ProductsController::search",
            "GET /catalog/find [session, rate-limit] -> ProductsController::search",
            "POST /products [session] -> ProductsController::create",
            "POST /catalog [session] -> ProductsController::create",
            "GET /health -> HealthController::ping",
        ]
    );
}

#[test]
fn test_registrar_receives_routes_in_order() {
    let mut recorder = Recorder::default();
    let count = register_routes(&shop_controllers(), &mut recorder).unwrap();

    assert_eq!(count, 9);
    assert_eq!(count, recorder.routes.len());
    let (method, path, middleware, handler) = &recorder.routes[6];
    assert_eq!(*method, HttpMethod::Post);
    assert_eq!(path, "/products");
    assert_eq!(middleware, &vec![Middleware::from("session")]);
    assert_eq!(handler, "ProductsController::create");
}

#[test]
fn test_route_count_is_product_of_path_counts() {
    let controllers = ControllerManifest::from_yaml(
        r#"
controllers:
  - name: Grid
    class: { paths: [/a, /b, /c] }
    methods:
      one: { paths: [/x, /y] }
      two: { paths: [/z, /w] }
      helper: { summary: Not routed }
"#,
    )
    .unwrap()
    .into_controllers()
    .unwrap();

    let class_paths = 3;
    let method_paths = 2;
    let routed_methods = 2;
    assert_eq!(
        resolve_routes(&controllers).unwrap().len(),
        class_paths * method_paths * routed_methods
    );
}

#[test]
fn test_duplicates_resolve_but_fail_synthesis() {
    let controllers = ControllerManifest::from_yaml(
        r#"
controllers:
  - name: First
    methods:
      show: { paths: ["/items/:id"] }
  - name: Second
    methods:
      show: { paths: ["/items/:key"] }
      list: { paths: ["/items/:id"] }
"#,
    )
    .unwrap()
    .into_controllers()
    .unwrap();

    assert_eq!(resolve_routes(&controllers).unwrap().len(), 3);

    let mut table = RouteTable::new();
    assert_eq!(register_routes(&controllers, &mut table).unwrap(), 3);
    assert_eq!(table.len(), 2);
    let winner = table.get(HttpMethod::Get, "/items/:id").unwrap();
    assert_eq!(winner.handler.to_string(), "Second::list");

    assert!(matches!(
        synthesize(&OpenApiDocument::default(), &controllers, None),
        Err(Error::DuplicatePathMethod { .. })
    ));
}

#[test]
fn test_manifest_handlers_are_not_implemented() {
    let mut table = RouteTable::new();
    register_routes(&shop_controllers(), &mut table).unwrap();

    let request = http::Request::builder()
        .uri("/catalog/17")
        .body(Vec::new())
        .unwrap();
    let response = table.dispatch(HttpMethod::Get, request).unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

#[test]
fn test_translation_of_resolved_paths() {
    let translated = translate("/products/search/:sort(price|name)");
    assert_eq!(translated.path, "/products/search/{sort}");
    assert_eq!(translated.parameters.len(), 1);

    let plain = translate("/products/find");
    assert_eq!(translate(&plain.path).path, plain.path);
    assert_eq!(plain.path, "/products/find");
    assert!(plain.parameters.is_empty());
}
