use thiserror::Error;

/// Wiring errors raised by the bus and the navigator.
///
/// All of these indicate a static configuration mistake (duplicate or missing
/// subscription names, undeclared routes, unregistered callbacks), not a
/// transient runtime condition. Callers are expected to propagate them and
/// fail fast rather than retry.
#[derive(Debug, Error)]
pub enum Error {
    #[error("duplicate subscription '{name}' on channel ({owner}, {event})")]
    DuplicateSubscription {
        owner: String,
        event: String,
        name: String,
    },

    #[error("no subscription '{name}' on channel ({owner}, {event})")]
    MissingSubscription {
        owner: String,
        event: String,
        name: String,
    },

    #[error("unknown route '{0}'")]
    UnknownRoute(String),

    #[error("no callback '{callback}' registered for route '{route}'")]
    MissingCallback { route: String, callback: String },

    #[error("route '{0}' has no content view attached")]
    MissingCollaborator(String),
}

pub type Result<T> = std::result::Result<T, Error>;
