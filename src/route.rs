//! Route entries: the configuration unit for one navigable screen.

use std::collections::HashMap;
use std::rc::Rc;

use log::debug;
use serde_json::Value;

use crate::collaborators::RenderToken;
use crate::context::{Context, StateRoot};
use crate::error::{Error, Result};

/// Re-invoked on every navigation to the route, producing a fresh context
/// from the live state. Never cached across navigations.
pub type ContextBuilder = Rc<dyn Fn(&StateRoot) -> Context>;

/// Runs before the context rebuild; sees the previous navigation's context
/// for this route, or `None` on first entry.
pub type BeforeHook = Rc<dyn Fn(Option<&Context>)>;

/// Runs after the renderer returns; receives the render completion token and
/// the side data passed at navigation time.
pub type AfterHook = Rc<dyn Fn(&RenderToken, &Value)>;

/// A named handler a renderer may invoke for the active route.
pub type Callback = Rc<dyn Fn(&Value)>;

/// Opaque identifiers for the rendering collaborator. The content view is
/// mandatory at render time; the sidebar view is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewDescriptor {
    pub content: String,
    pub sidebar: Option<String>,
}

impl ViewDescriptor {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sidebar: None,
        }
    }

    pub fn with_sidebar(content: impl Into<String>, sidebar: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sidebar: Some(sidebar.into()),
        }
    }
}

/// Immutable snapshot of one navigable screen's configuration: view
/// descriptor, lifecycle hooks, context builder, and named callbacks.
///
/// Built through [`RouteEntryBuilder`]; the navigator rebuilds entries from
/// scratch before every navigation so their closures always capture the live
/// state graph.
#[derive(Clone)]
pub struct RouteEntry {
    name: String,
    view: Option<ViewDescriptor>,
    before: Option<BeforeHook>,
    after: Option<AfterHook>,
    context_builder: Option<ContextBuilder>,
    callbacks: HashMap<String, Callback>,
}

impl RouteEntry {
    pub fn builder(name: impl Into<String>) -> RouteEntryBuilder {
        RouteEntryBuilder {
            entry: RouteEntry {
                name: name.into(),
                view: None,
                before: None,
                after: None,
                context_builder: None,
                callbacks: HashMap::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn view(&self) -> Option<&ViewDescriptor> {
        self.view.as_ref()
    }

    /// The content view is a mandatory collaborator; rendering a route
    /// without one is a wiring bug.
    pub fn require_view(&self) -> Result<&ViewDescriptor> {
        self.view
            .as_ref()
            .ok_or_else(|| Error::MissingCollaborator(self.name.clone()))
    }

    /// Run the context builder against the live state. Routes without a
    /// builder render against an empty context.
    pub fn build_context(&self, state: &StateRoot) -> Context {
        match &self.context_builder {
            Some(builder) => builder(state),
            None => Context::new(),
        }
    }

    pub fn run_before(&self, previous: Option<&Context>) {
        if let Some(hook) = &self.before {
            hook(previous);
        }
    }

    pub fn run_after(&self, token: &RenderToken, side_data: &Value) {
        if let Some(hook) = &self.after {
            hook(token, side_data);
        }
    }

    pub fn has_callback(&self, name: &str) -> bool {
        self.callbacks.contains_key(name)
    }

    /// Snapshot of the callbacks for handing to the renderer.
    pub fn callback_table(&self) -> CallbackTable {
        CallbackTable {
            route: self.name.clone(),
            callbacks: self.callbacks.clone(),
        }
    }
}

/// Chainable configuration for a [`RouteEntry`].
///
/// Single-valued setters follow last-call-wins; `callback` accumulates
/// additively, last write winning per callback name.
pub struct RouteEntryBuilder {
    entry: RouteEntry,
}

impl RouteEntryBuilder {
    pub fn view(mut self, descriptor: ViewDescriptor) -> Self {
        self.entry.view = Some(descriptor);
        self
    }

    pub fn before_render(mut self, hook: impl Fn(Option<&Context>) + 'static) -> Self {
        self.entry.before = Some(Rc::new(hook));
        self
    }

    pub fn after_render(mut self, hook: impl Fn(&RenderToken, &Value) + 'static) -> Self {
        self.entry.after = Some(Rc::new(hook));
        self
    }

    pub fn context_builder(mut self, builder: impl Fn(&StateRoot) -> Context + 'static) -> Self {
        self.entry.context_builder = Some(Rc::new(builder));
        self
    }

    pub fn callback(mut self, name: impl Into<String>, callback: impl Fn(&Value) + 'static) -> Self {
        let name = name.into();
        if self.entry.callbacks.insert(name.clone(), Rc::new(callback)).is_some() {
            debug!(
                "callback '{name}' on route '{}' overwritten",
                self.entry.name
            );
        }
        self
    }

    pub fn build(self) -> RouteEntry {
        self.entry
    }
}

/// The named callbacks a renderer may invoke for the active route.
#[derive(Clone)]
pub struct CallbackTable {
    route: String,
    callbacks: HashMap<String, Callback>,
}

impl CallbackTable {
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn contains(&self, name: &str) -> bool {
        self.callbacks.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.callbacks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Invoke the named callback with `arg`. An unregistered name is a
    /// renderer/route wiring bug and fails with [`Error::MissingCallback`].
    pub fn invoke(&self, name: &str, arg: &Value) -> Result<()> {
        let callback = self.callbacks.get(name).ok_or_else(|| Error::MissingCallback {
            route: self.route.clone(),
            callback: name.to_string(),
        })?;
        callback(arg);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    #[test]
    fn single_valued_setters_last_call_wins() {
        let entry = RouteEntry::builder("home")
            .view(ViewDescriptor::new("draft"))
            .view(ViewDescriptor::with_sidebar("final", "summary"))
            .build();
        assert_eq!(
            entry.view(),
            Some(&ViewDescriptor::with_sidebar("final", "summary"))
        );
    }

    #[test]
    fn callbacks_accumulate_across_passes() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::clone(&hits);
        let b = Rc::clone(&hits);
        let entry = RouteEntry::builder("home")
            .callback("save", move |_| a.borrow_mut().push("save"))
            .callback("discard", move |_| b.borrow_mut().push("discard"))
            .build();

        let table = entry.callback_table();
        assert_eq!(table.names(), ["discard", "save"]);
        table.invoke("save", &Value::Null).unwrap();
        table.invoke("discard", &Value::Null).unwrap();
        assert_eq!(hits.borrow().as_slice(), ["save", "discard"]);
    }

    #[test]
    fn callback_last_write_wins_per_name() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::clone(&hits);
        let b = Rc::clone(&hits);
        let entry = RouteEntry::builder("home")
            .callback("save", move |_| a.borrow_mut().push("old"))
            .callback("save", move |_| b.borrow_mut().push("new"))
            .build();

        entry.callback_table().invoke("save", &Value::Null).unwrap();
        assert_eq!(hits.borrow().as_slice(), ["new"]);
    }

    #[test]
    fn invoking_unregistered_callback_fails() {
        let entry = RouteEntry::builder("home").build();
        let err = entry.callback_table().invoke("save", &Value::Null).unwrap_err();
        assert!(matches!(err, Error::MissingCallback { .. }));
    }

    #[test]
    fn require_view_fails_without_content_view() {
        let entry = RouteEntry::builder("home").build();
        assert!(matches!(
            entry.require_view(),
            Err(Error::MissingCollaborator(name)) if name == "home"
        ));
    }

    #[test]
    fn context_builder_reads_live_state() {
        let state = StateRoot::new(json!({"record": {"id": 1}}));
        let entry = RouteEntry::builder("home")
            .context_builder(|state| {
                let mut ctx = Context::new();
                ctx.insert("record".into(), state.get("record"));
                ctx
            })
            .build();

        assert_eq!(entry.build_context(&state)["record"], json!({"id": 1}));

        state.set("record", json!({"id": 2}));
        assert_eq!(entry.build_context(&state)["record"], json!({"id": 2}));
    }

    #[test]
    fn missing_context_builder_yields_empty_context() {
        let entry = RouteEntry::builder("home").build();
        assert!(entry.build_context(&StateRoot::default()).is_empty());
    }
}
