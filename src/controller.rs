//! Controller instances as seen by the resolvers.
//!
//! A controller is any value that can expose the annotation table of its type and dispatch a
//! request to one of its members. Discovery is up to the caller: the resolvers only ever receive
//! an explicit, ordered list of instances.

use crate::annotation::{AnnotationStore, MemberKey};
use std::fmt;
use std::sync::Arc;

/// Request handed to a bound handler
pub type Request = http::Request<Vec<u8>>;
/// Response produced by a bound handler
pub type Response = http::Response<Vec<u8>>;

/// A controller instance.
///
/// # Example
///
/// ```
/// use controller_openapi::annotation::{AnnotationStore, ControllerBuilder, MemberKey};
/// use controller_openapi::controller::{Controller, Request, Response};
/// use once_cell::sync::Lazy;
///
/// static HEALTH: Lazy<AnnotationStore> = Lazy::new(|| {
///     ControllerBuilder::new("Health")
///         .method("ping", |m| m.path("/ping"))
///         .build()
///         .expect("valid health annotations")
/// });
///
/// struct Health;
///
/// impl Controller for Health {
///     fn annotations(&self) -> Option<&AnnotationStore> {
///         Some(&HEALTH)
///     }
///
///     fn handle(&self, _member: &MemberKey, _request: Request) -> Response {
///         Response::new(b"pong".to_vec())
///     }
/// }
/// ```
pub trait Controller: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str {
        match self.annotations() {
            Some(store) => store.controller_name(),
            None => std::any::type_name::<Self>(),
        }
    }

    /// Annotation table of the controller's type, `None` if the type was never annotated
    fn annotations(&self) -> Option<&AnnotationStore>;

    /// Dispatches a request to the given member
    fn handle(&self, member: &MemberKey, request: Request) -> Response;
}

/// A controller member bound to its instance.
#[derive(Clone)]
pub struct BoundHandler {
    controller: Arc<dyn Controller>,
    member: MemberKey,
}

impl BoundHandler {
    pub fn new(controller: Arc<dyn Controller>, member: MemberKey) -> Self {
        Self { controller, member }
    }

    pub fn member(&self) -> &MemberKey {
        &self.member
    }

    pub fn controller(&self) -> &Arc<dyn Controller> {
        &self.controller
    }

    pub fn call(&self, request: Request) -> Response {
        self.controller.handle(&self.member, request)
    }
}

impl fmt::Debug for BoundHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.controller.name(), self.member)
    }
}

impl fmt::Display for BoundHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
