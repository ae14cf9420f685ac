//! Decoupled communication and navigation core for form-driven client apps.
//!
//! Two pieces work together:
//!
//! - [`EventBus`]: named publish/subscribe channels scoped by an owner tag,
//!   with synchronous, insertion-ordered delivery and uniquely named,
//!   replaceable subscriptions.
//! - [`Navigator`]: a declarative route table whose per-route configuration
//!   (hooks, context builders, callbacks) is re-applied before every single
//!   navigation, so screens always render against the live application state
//!   even after the underlying state objects are replaced wholesale.
//!
//! Rendering, backend transport, and domain logic are external collaborators
//! consumed through the narrow traits in [`collaborators`].
//!
//! The whole core is single-threaded and event-loop driven: nothing here
//! blocks, awaits, or spawns. Components share the bus and the state root via
//! `Rc` handles.

pub mod bus;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod navigator;
pub mod route;

pub use bus::{EventBus, Payload, Reaction};
pub use collaborators::{BackendAccess, Completion, RenderToken, Renderer};
pub use config::{RouteDecl, RouteTableConfig};
pub use context::{Context, StateRoot};
pub use error::{Error, Result};
pub use navigator::{NavPhase, NavigationRequest, Navigator, RouteSetup};
pub use route::{CallbackTable, RouteEntry, RouteEntryBuilder, ViewDescriptor};
