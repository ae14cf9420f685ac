//! The navigator: owns the route table and runs the per-navigation lifecycle.
//!
//! Every navigation re-applies the application's route configuration before
//! anything else, so hooks, context builders, and callbacks always close over
//! the live state graph rather than one captured at startup. The lifecycle
//! per pass is strictly sequential:
//!
//! ```text
//! IDLE --(navigate-in)--> BEFORE_HOOK --> CONTEXT_BUILD --> RENDER --> AFTER_HOOK --> IDLE
//! ```
//!
//! A redirect issued while a pass is in flight (from a hook, a reaction, or a
//! callback) is queued and runs as a full separate pass after the current
//! pass's after-hook completes; passes never nest.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use log::{debug, error, info, warn};
use serde_json::{Value, json};

use crate::bus::EventBus;
use crate::config::RouteTableConfig;
use crate::context::{Context, StateRoot};
use crate::collaborators::Renderer;
use crate::error::{Error, Result};
use crate::route::{RouteEntry, RouteEntryBuilder};

/// Owner tag under which the navigator publishes its own events.
pub const NAVIGATOR_OWNER: &str = "Navigator";

/// Published after every successful navigation, payload `{"routeName": ...}`.
pub const EVENT_ROUTE_CHANGED: &str = "routeChanged";

/// Published when the entered route has no sidebar view, so an open sidebar
/// collapses.
pub const EVENT_CLOSE_SIDEBAR: &str = "closeSidebar";

/// Published by the cross-cutting clear-state callback after the state root
/// has been replaced.
pub const EVENT_STATE_CLEARED: &str = "stateCleared";

/// Republished by the cross-cutting edit-mode callback.
pub const EVENT_EDIT_MODE_CHANGED: &str = "editModeChanged";

/// Cross-cutting callbacks attached to every route, so renderers can rely on
/// their presence regardless of which route is active.
pub const CALLBACK_ADVANCE: &str = "advance";
pub const CALLBACK_CLEAR_STATE: &str = "clearState";
pub const CALLBACK_EDIT_MODE: &str = "editModeChanged";

/// Stage of the navigation lifecycle currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavPhase {
    Idle,
    BeforeHook,
    ContextBuild,
    Render,
    AfterHook,
}

/// A route name plus the side data made visible to the after-hook.
#[derive(Debug, Clone)]
pub struct NavigationRequest {
    pub route: String,
    pub side_data: Value,
}

/// Handed to the application's route configuration pass. Fetches per-route
/// builders (pre-seeded with the declared view descriptors) for attaching
/// hooks, context builders, and callbacks.
pub struct RouteSetup<'a> {
    builders: &'a mut HashMap<String, RouteEntryBuilder>,
    state: &'a StateRoot,
}

impl RouteSetup<'_> {
    /// The live state root, for configuration that needs to read current
    /// values at configure time.
    pub fn state(&self) -> &StateRoot {
        self.state
    }

    /// Apply `f` to the named route's builder. Fails with
    /// [`Error::UnknownRoute`] for names absent from the declared table.
    pub fn configure(
        &mut self,
        name: &str,
        f: impl FnOnce(RouteEntryBuilder) -> RouteEntryBuilder,
    ) -> Result<()> {
        let builder = self
            .builders
            .remove(name)
            .ok_or_else(|| Error::UnknownRoute(name.to_string()))?;
        self.builders.insert(name.to_string(), f(builder));
        Ok(())
    }

    pub fn route_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.builders.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

type RouteConfigFn = Rc<dyn Fn(&mut RouteSetup) -> Result<()>>;

/// Owns the route table, binds navigation requests to route execution, and
/// re-derives every route's context immediately before each render.
pub struct Navigator {
    weak: Weak<Navigator>,
    bus: Rc<EventBus>,
    state: StateRoot,
    renderer: Rc<dyn Renderer>,
    decls: RouteTableConfig,
    routes: RefCell<HashMap<String, RouteEntry>>,
    route_config: RefCell<Option<RouteConfigFn>>,
    last_contexts: RefCell<HashMap<String, Context>>,
    current: RefCell<Option<String>>,
    queue: RefCell<VecDeque<NavigationRequest>>,
    in_flight: Cell<bool>,
    phase: Cell<NavPhase>,
}

impl Navigator {
    /// Build the navigator and its route table from the static declarations.
    ///
    /// Returned as `Rc` so the cross-cutting callbacks can hold a weak
    /// back-pointer into the navigator they drive.
    pub fn new(
        bus: Rc<EventBus>,
        state: StateRoot,
        renderer: Rc<dyn Renderer>,
        decls: RouteTableConfig,
    ) -> Rc<Self> {
        let nav = Rc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            bus,
            state,
            renderer,
            decls,
            routes: RefCell::new(HashMap::new()),
            route_config: RefCell::new(None),
            last_contexts: RefCell::new(HashMap::new()),
            current: RefCell::new(None),
            queue: RefCell::new(VecDeque::new()),
            in_flight: Cell::new(false),
            phase: Cell::new(NavPhase::Idle),
        });
        nav.install_declared_routes();
        info!("navigator initialized with {} route(s)", nav.decls.routes.len());
        nav
    }

    /// Register the application's configuration pass. It runs inside every
    /// [`configure_all_routes`](Self::configure_all_routes), reading current
    /// values out of the state root at call time.
    pub fn set_route_config(&self, f: impl Fn(&mut RouteSetup) -> Result<()> + 'static) {
        *self.route_config.borrow_mut() = Some(Rc::new(f));
    }

    /// Idempotently rebuild every route entry: declared view descriptors,
    /// then the application's configuration pass, then the cross-cutting
    /// callbacks, in one sweep.
    ///
    /// Invoked once at startup and again at the start of every navigation,
    /// so closures always capture the live state graph. Entries are rebuilt
    /// from scratch rather than patched; nothing survives from the previous
    /// configuration.
    pub fn configure_all_routes(&self) -> Result<()> {
        let mut builders: HashMap<String, RouteEntryBuilder> = self
            .decls
            .routes
            .iter()
            .map(|(name, decl)| {
                (
                    name.clone(),
                    RouteEntry::builder(name.clone()).view(decl.view()),
                )
            })
            .collect();

        let config = self.route_config.borrow().clone();
        if let Some(config) = config {
            let mut setup = RouteSetup {
                builders: &mut builders,
                state: &self.state,
            };
            config(&mut setup)?;
        }

        let mut routes = HashMap::with_capacity(builders.len());
        for (name, builder) in builders {
            let builder = self.attach_shared_callbacks(builder);
            routes.insert(name, builder.build());
        }
        debug!("reconfigured {} route(s)", routes.len());
        *self.routes.borrow_mut() = routes;
        Ok(())
    }

    /// Request a navigation with no side data.
    ///
    /// Safe to call re-entrantly: from inside a hook, reaction, or callback
    /// of the currently executing pass the request is queued and runs after
    /// that pass's after-hook completes.
    pub fn redirect(&self, route: &str) -> Result<()> {
        self.request(route, Value::Null)
    }

    /// Request a navigation carrying side data for the after-hook.
    pub fn trigger_navigation(&self, route: &str, side_data: Value) -> Result<()> {
        self.request(route, side_data)
    }

    pub fn current_route(&self) -> Option<String> {
        self.current.borrow().clone()
    }

    pub fn phase(&self) -> NavPhase {
        self.phase.get()
    }

    pub fn state(&self) -> &StateRoot {
        &self.state
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    /// The context most recently rendered for `route`, if it has been
    /// entered at all.
    pub fn last_context(&self, route: &str) -> Option<Context> {
        self.last_contexts.borrow().get(route).cloned()
    }

    /// Seed the table with view-only entries so the route set is inspectable
    /// before the first configuration pass.
    fn install_declared_routes(&self) {
        let mut routes = self.routes.borrow_mut();
        for (name, decl) in &self.decls.routes {
            routes.insert(
                name.clone(),
                RouteEntry::builder(name.clone()).view(decl.view()).build(),
            );
        }
    }

    fn request(&self, route: &str, side_data: Value) -> Result<()> {
        if !self.decls.contains(route) {
            return Err(Error::UnknownRoute(route.to_string()));
        }
        self.queue.borrow_mut().push_back(NavigationRequest {
            route: route.to_string(),
            side_data,
        });
        if self.in_flight.get() {
            debug!("navigation to '{route}' queued behind in-flight pass");
            return Ok(());
        }
        self.drain()
    }

    fn drain(&self) -> Result<()> {
        self.in_flight.set(true);
        let result = loop {
            let next = self.queue.borrow_mut().pop_front();
            match next {
                Some(request) => {
                    if let Err(err) = self.run_pass(&request) {
                        break Err(err);
                    }
                }
                None => break Ok(()),
            }
        };
        self.in_flight.set(false);
        if result.is_err() {
            // A failed pass is a wiring bug; stale queued requests would only
            // mask it.
            self.queue.borrow_mut().clear();
            self.phase.set(NavPhase::Idle);
        }
        result
    }

    fn run_pass(&self, request: &NavigationRequest) -> Result<()> {
        debug!("navigating to '{}'", request.route);
        self.configure_all_routes()?;

        let entry = self
            .routes
            .borrow()
            .get(&request.route)
            .cloned()
            .ok_or_else(|| Error::UnknownRoute(request.route.clone()))?;

        // The before-hook observes the previous navigation's context for
        // this route; the fresh one is built strictly after it.
        self.phase.set(NavPhase::BeforeHook);
        let previous = self.last_contexts.borrow().get(&request.route).cloned();
        entry.run_before(previous.as_ref());

        self.phase.set(NavPhase::ContextBuild);
        let context = entry.build_context(&self.state);

        self.phase.set(NavPhase::Render);
        let view = entry.require_view()?.clone();
        let callbacks = entry.callback_table();
        let token = self.renderer.render(&request.route, &context, &callbacks);

        self.phase.set(NavPhase::AfterHook);
        entry.run_after(&token, &request.side_data);

        self.last_contexts
            .borrow_mut()
            .insert(request.route.clone(), context);
        *self.current.borrow_mut() = Some(request.route.clone());
        self.phase.set(NavPhase::Idle);

        self.renderer.post_render(&token);
        self.bus.publish(
            EVENT_ROUTE_CHANGED,
            &json!({ "routeName": request.route }),
            NAVIGATOR_OWNER,
        );
        if view.sidebar.is_none() {
            self.bus
                .publish(EVENT_CLOSE_SIDEBAR, &Value::Null, NAVIGATOR_OWNER);
        }
        Ok(())
    }

    /// Attach the fixed cross-cutting callback set to a route builder.
    fn attach_shared_callbacks(&self, builder: RouteEntryBuilder) -> RouteEntryBuilder {
        let nav = self.weak.clone();
        let builder = builder.callback(CALLBACK_ADVANCE, move |arg| {
            let Some(nav) = nav.upgrade() else { return };
            let Some(target) = arg.get("route").and_then(Value::as_str) else {
                warn!("advance callback invoked without a 'route' field: {arg}");
                return;
            };
            if let Err(err) = nav.redirect(target) {
                error!("advance callback failed: {err}");
            }
        });

        let nav = self.weak.clone();
        let builder = builder.callback(CALLBACK_CLEAR_STATE, move |_| {
            let Some(nav) = nav.upgrade() else { return };
            nav.state.replace(Value::Object(Default::default()));
            info!("shared state cleared");
            nav.bus
                .publish(EVENT_STATE_CLEARED, &Value::Null, NAVIGATOR_OWNER);
        });

        let nav = self.weak.clone();
        builder.callback(CALLBACK_EDIT_MODE, move |arg| {
            let Some(nav) = nav.upgrade() else { return };
            nav.state.set("edit_mode", arg.clone());
            nav.bus.publish(EVENT_EDIT_MODE_CHANGED, arg, NAVIGATOR_OWNER);
        })
    }
}
