//! Fragment requests and fetched bundles.
//!
//! A fragment is the named bundle of resources of a plugin directory: its
//! stylesheet, its translations, its partial markup and its behavior script.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of resource a fragment may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "css")]
    Style,
    #[serde(rename = "i18n")]
    Translation,
    #[serde(rename = "partial")]
    Partial,
    #[serde(rename = "js")]
    Behavior,
}

impl ResourceKind {
    /// Every kind, in load order.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Style,
        ResourceKind::Translation,
        ResourceKind::Partial,
        ResourceKind::Behavior,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Style => "css",
            ResourceKind::Translation => "i18n",
            ResourceKind::Partial => "partial",
            ResourceKind::Behavior => "js",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a fragment: the loader loads each key at most once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FragmentKey {
    pub path: String,
    pub name: String,
}

impl fmt::Display for FragmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.path)
    }
}

/// A request to load the fragment `name` found under `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FragmentRequest {
    pub path: String,
    pub name: String,
    pub kinds: Vec<ResourceKind>,
}

impl FragmentRequest {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        FragmentRequest {
            path: path.into(),
            name: name.into(),
            kinds: ResourceKind::ALL.to_vec(),
        }
    }

    /// Request for a service fragment: `<base>/<service>/`.
    pub fn service(base: &str, service: &str) -> Self {
        Self::new(format!("{}/{service}/", base.trim_end_matches('/')), service)
    }

    /// Request for a tool fragment: `<base>/<service>/<tool>`.
    pub fn tool(base: &str, service: &str, tool: &str) -> Self {
        Self::new(
            format!("{}/{service}/{tool}", base.trim_end_matches('/')),
            tool,
        )
    }

    pub fn with_kinds(mut self, kinds: &[ResourceKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    pub fn key(&self) -> FragmentKey {
        FragmentKey {
            path: self.path.clone(),
            name: self.name.clone(),
        }
    }
}

/// Resources fetched for a fragment, by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FragmentBundle {
    pub resources: BTreeMap<ResourceKind, String>,
}

impl FragmentBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: ResourceKind, content: impl Into<String>) -> Self {
        self.resources.insert(kind, content.into());
        self
    }
}
