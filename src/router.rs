//! Route resolution.
//!
//! Turns the annotation tables of an ordered list of controller instances into route records
//! `(method, path, middleware, handler)` and optionally hands them to a [`Registrar`]. Paths are
//! kept in the framework's `:name(pattern)` syntax; only the document synthesizer translates
//! them. Duplicate `(method, path)` pairs are passed through untouched.

use crate::annotation::{HttpMethod, Middleware};
use crate::controller::{BoundHandler, Controller, Request, Response};
use crate::error::{Error, Result};
use crate::path_template::template_regex;
use indexmap::IndexMap;
use log::{debug, info};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// One route produced by the resolver.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub method: HttpMethod,
    pub path: String,
    /// Class-level middleware followed by method-level middleware
    pub middleware: Vec<Middleware>,
    pub handler: BoundHandler,
}

impl fmt::Display for ResolvedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if !self.middleware.is_empty() {
            let names: Vec<&str> = self.middleware.iter().map(Middleware::name).collect();
            write!(f, " [{}]", names.join(", "))?;
        }
        write!(f, " -> {}", self.handler)
    }
}

/// Receives resolved routes, typically by wiring them into an HTTP router.
pub trait Registrar {
    fn register(
        &mut self,
        method: HttpMethod,
        path: &str,
        middleware: &[Middleware],
        handler: BoundHandler,
    ) -> Result<()>;
}

/// Routes of a single controller instance, in method-site then class-path then method-path order.
///
/// # Errors
///
/// [`Error::MetadataUnavailable`] if the controller's type was never annotated.
pub fn resolve_controller(controller: &Arc<dyn Controller>) -> Result<Vec<ResolvedRoute>> {
    let store = controller
        .annotations()
        .ok_or_else(|| Error::MetadataUnavailable {
            controller: controller.name().to_string(),
        })?;

    if !store.has_paths() {
        debug!("Skipping {}: no path annotations", store.controller_name());
        return Ok(Vec::new());
    }

    let class = store.class();
    let mut routes = Vec::new();
    for (key, method) in store.routed_methods() {
        let verb = method
            .http_method
            .or(class.http_method)
            .unwrap_or(HttpMethod::Get);
        let middleware: Vec<Middleware> = class
            .middleware
            .iter()
            .chain(&method.middleware)
            .cloned()
            .collect();

        for class_path in store.class_paths() {
            for method_path in &method.paths {
                routes.push(ResolvedRoute {
                    method: verb,
                    path: format!("{}{}", class_path, method_path),
                    middleware: middleware.clone(),
                    handler: BoundHandler::new(Arc::clone(controller), key.clone()),
                });
            }
        }
    }

    Ok(routes)
}

/// Routes of every controller, in instance order.
///
/// # Errors
///
/// Fails on the first controller without annotation metadata.
pub fn resolve_routes(controllers: &[Arc<dyn Controller>]) -> Result<Vec<ResolvedRoute>> {
    let mut routes = Vec::new();
    for controller in controllers {
        routes.extend(resolve_controller(controller)?);
    }
    Ok(routes)
}

/// Resolves and registers routes controller by controller, returning how many were registered.
///
/// A failing controller stops registration; routes registered for earlier controllers stay.
pub fn register_routes(
    controllers: &[Arc<dyn Controller>],
    registrar: &mut impl Registrar,
) -> Result<usize> {
    let mut registered = 0;
    for controller in controllers {
        for route in resolve_controller(controller)? {
            debug!("Registering {}", route);
            registrar.register(route.method, &route.path, &route.middleware, route.handler)?;
            registered += 1;
        }
    }
    info!(
        "Registered {} routes from {} controllers",
        registered,
        controllers.len()
    );
    Ok(registered)
}

/// A registered route.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub middleware: Vec<Middleware>,
    pub handler: BoundHandler,
    /// Anchored matcher compiled from the path template at registration
    matcher: Regex,
}

/// A route matched against a concrete request path.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    /// Captured path parameters, by name
    pub params: IndexMap<String, String>,
}

/// In-memory [`Registrar`]: routes keyed by `(method, path)`, a later registration replacing an
/// earlier one while keeping its position.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: IndexMap<(HttpMethod, String), RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Entry registered for exactly this path template
    pub fn get(&self, method: HttpMethod, path: &str) -> Option<&RouteEntry> {
        self.routes.get(&(method, path.to_string()))
    }

    /// First entry, in registration order, whose template matches a concrete request path.
    pub fn find(&self, method: HttpMethod, path: &str) -> Option<&RouteEntry> {
        self.routes
            .iter()
            .find(|((m, _), entry)| *m == method && entry.matcher.is_match(path))
            .map(|(_, entry)| entry)
    }

    /// Like [`RouteTable::find`], also returning the captured path parameters.
    pub fn match_route(&self, method: HttpMethod, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|((m, _), _)| *m == method)
            .find_map(|(_, entry)| {
                let caps = entry.matcher.captures(path)?;
                let params = entry
                    .matcher
                    .capture_names()
                    .flatten()
                    .filter_map(|name| {
                        caps.name(name)
                            .map(|value| (name.to_string(), value.as_str().to_string()))
                    })
                    .collect();
                Some(RouteMatch { entry, params })
            })
    }

    /// Dispatches a request to the matching handler, `None` if no route matches.
    pub fn dispatch(&self, method: HttpMethod, request: Request) -> Option<Response> {
        let entry = self.find(method, request.uri().path())?;
        Some(entry.handler.call(request))
    }

    pub fn iter(&self) -> impl Iterator<Item = (HttpMethod, &str, &RouteEntry)> {
        self.routes
            .iter()
            .map(|((method, path), entry)| (*method, path.as_str(), entry))
    }
}

impl Registrar for RouteTable {
    fn register(
        &mut self,
        method: HttpMethod,
        path: &str,
        middleware: &[Middleware],
        handler: BoundHandler,
    ) -> Result<()> {
        let matcher = template_regex(path).map_err(|e| {
            Error::InvalidArgument(format!("invalid route pattern in {}: {}", path, e))
        })?;
        let entry = RouteEntry {
            middleware: middleware.to_vec(),
            handler,
            matcher,
        };
        if let Some(previous) = self.routes.insert((method, path.to_string()), entry) {
            debug!("{} {} re-registered, replacing {}", method, path, previous.handler);
        }
        Ok(())
    }
}
