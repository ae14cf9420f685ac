//! Declarative route-table configuration.
//!
//! The set of navigable routes is fixed at startup from a static declaration
//! of route name to view descriptors; everything else about a route (hooks,
//! context builders, callbacks) is attached later, per navigation, by the
//! navigator's configuration pass.

use std::collections::BTreeMap;

use anyhow::Context as _;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::route::ViewDescriptor;

/// Static declaration of a single route: its content renderer and an
/// optional sidebar renderer, both opaque identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecl {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidebar: Option<String>,
}

impl RouteDecl {
    pub fn view(&self) -> ViewDescriptor {
        ViewDescriptor {
            content: self.content.clone(),
            sidebar: self.sidebar.clone(),
        }
    }
}

/// The full route table declaration, keyed by route name.
///
/// Route names never change at runtime; the table is built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTableConfig {
    #[serde(default)]
    pub routes: BTreeMap<String, RouteDecl>,
}

impl RouteTableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a declaration like:
    ///
    /// ```toml
    /// [routes.home]
    /// content = "home_form"
    /// sidebar = "score_summary"
    ///
    /// [routes.review]
    /// content = "review_sheet"
    /// ```
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Self =
            toml::from_str(content).context("Failed to parse route table declaration")?;
        debug!("loaded route table with {} route(s)", config.routes.len());
        Ok(config)
    }

    /// Programmatic equivalent of one TOML entry.
    pub fn with_route(
        mut self,
        name: impl Into<String>,
        content: impl Into<String>,
        sidebar: Option<&str>,
    ) -> Self {
        self.routes.insert(
            name.into(),
            RouteDecl {
                content: content.into(),
                sidebar: sidebar.map(str::to_string),
            },
        );
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }
}
