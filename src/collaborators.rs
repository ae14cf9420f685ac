//! Contracts for the external collaborators the core consumes.
//!
//! Rendering, backend transport, and their failure handling live outside
//! this crate; these traits are the narrow seams the navigator and reactions
//! talk through.

use serde_json::Value;
use uuid::Uuid;

use crate::context::Context;
use crate::route::CallbackTable;

/// Opaque completion token returned by a renderer.
///
/// The core never inspects it; it is only handed back to the route's
/// after-hook so the hook can correlate with the render that just finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderToken(Uuid);

impl RenderToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RenderToken {
    fn default() -> Self {
        Self::new()
    }
}

/// The rendering collaborator.
///
/// Given the freshly built context, the active route's callback table, and
/// the route name, produce a renderable output and return a completion token.
pub trait Renderer {
    fn render(&self, route: &str, context: &Context, callbacks: &CallbackTable) -> RenderToken;

    /// Invoked by the navigator after the after-hook completes, for renderers
    /// that defer work until view attachment. Default: nothing.
    fn post_render(&self, _token: &RenderToken) {}
}

/// Completion callback shape for asynchronous backend results.
pub type Completion = Box<dyn FnOnce(anyhow::Result<Value>)>;

/// The backend-access collaborator consumed by reactions.
///
/// Transport, retries, and serialization are the collaborator's problem; the
/// core only relies on the single-argument completion shape. Errors surfaced
/// through `done` must be handled by the caller, never swallowed by the bus
/// or the navigator.
pub trait BackendAccess {
    fn call(&self, endpoint: &str, payload: &Value, credential: &str, done: Completion);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Backend stub that completes synchronously, echoing the endpoint.
    struct EchoBackend;

    impl BackendAccess for EchoBackend {
        fn call(&self, endpoint: &str, _payload: &Value, _credential: &str, done: Completion) {
            done(Ok(json!({ "endpoint": endpoint })));
        }
    }

    #[test]
    fn reaction_drives_backend_and_handles_completion() {
        let bus = Rc::new(EventBus::new());
        let results = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&results);
        bus.subscribe("Form", "save", "persist", move |payload, _| {
            let sink = Rc::clone(&sink);
            EchoBackend.call(
                "records/save",
                payload,
                "token",
                Box::new(move |result| match result {
                    Ok(value) => sink.borrow_mut().push(value),
                    Err(err) => sink.borrow_mut().push(json!({ "error": err.to_string() })),
                }),
            );
        });

        bus.publish("save", &json!({"id": 3}), "Form");
        assert_eq!(
            results.borrow().as_slice(),
            [json!({"endpoint": "records/save"})]
        );
    }

    #[test]
    fn render_tokens_are_unique() {
        assert_ne!(RenderToken::new(), RenderToken::new());
    }
}
