//! Hierarchical node identifiers.
//!
//! A node identifier is a colon-delimited string of the form
//! `service:<service>:<tool>(:<suffix>...)`. Segment 0 is the namespace
//! discriminator, segment 1 the service name, segment 2 the tool name.
//! Every derived identifier (service id, tool id, hierarchy classes) joins
//! segments with a hyphen instead, which is what fragment paths and CSS
//! classes downstream expect.
//!
//! Splitting keeps empty segments: `service:x:` has three segments, the last
//! one empty, and the empty string has a single empty segment.

use std::fmt;
use std::str::{FromStr, Split};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Separator between segments of a node identifier.
pub const SEGMENT_SEPARATOR: char = ':';

/// Separator used when re-joining segments into derived identifiers.
pub const DERIVED_SEPARATOR: char = '-';

/// Namespace given to nodes created without a parent.
pub const ROOT_NAMESPACE: &str = "feature";

/// Plugin directory, relative to the webapp root.
pub const PLUGIN_BASE: &str = "main/plugin";

static TOOL_LEVEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+(:[a-z0-9]+){2}$").expect("static pattern"));

/// Node identifier, e.g. `service:bt:jira:6`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeIdentifier(String);

impl NodeIdentifier {
    pub fn new(id: impl Into<String>) -> Self {
        NodeIdentifier(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates the colon-separated segments, empty ones included.
    pub fn segments(&self) -> Split<'_, char> {
        self.0.split(SEGMENT_SEPARATOR)
    }

    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }

    fn require(&self, required: usize) -> Result<(), CoreError> {
        let found = self.segment_count();
        if found < required {
            return Err(CoreError::MalformedId {
                id: self.clone(),
                required,
                found,
            });
        }
        Ok(())
    }

    /// Joins the first `depth` segments with a hyphen.
    fn derived(&self, depth: usize) -> String {
        let mut out = String::with_capacity(self.0.len());
        for (index, segment) in self.segments().take(depth).enumerate() {
            if index > 0 {
                out.push(DERIVED_SEPARATOR);
            }
            out.push_str(segment);
        }
        out
    }

    /// Returns the service name (segment 1).
    ///
    /// Fails with [`CoreError::MalformedId`] when the identifier has fewer
    /// than two segments.
    pub fn service_name(&self) -> Result<&str, CoreError> {
        self.require(2)?;
        Ok(self.segments().nth(1).unwrap_or_default())
    }

    /// Returns the tool name (segment 2), `None` for a bare service.
    pub fn tool_name(&self) -> Option<&str> {
        self.segments().nth(2)
    }

    /// Like [`tool_name`](Self::tool_name), for callers that cannot proceed
    /// without a tool: fails with [`CoreError::MalformedId`] instead.
    pub fn required_tool_name(&self) -> Result<&str, CoreError> {
        self.require(3)?;
        Ok(self.segments().nth(2).unwrap_or_default())
    }

    /// Returns the service identifier: the first two segments joined with `-`.
    pub fn service_id(&self) -> Result<String, CoreError> {
        self.require(2)?;
        Ok(self.derived(2))
    }

    /// Returns the tool identifier: the first three segments joined with `-`.
    pub fn tool_id(&self) -> Option<String> {
        (self.segment_count() > 2).then(|| self.derived(3))
    }

    /// Returns the identifier of every refinement level, from the service
    /// down to this node, each prefixed with a space.
    ///
    /// `service:a:b` yields `" service-a"` then `" service-a-b"`. The
    /// sequence is empty when there is no service segment. Clone the
    /// iterator (or call again) to restart it.
    pub fn hierarchy_ids(&self) -> HierarchyIds<'_> {
        HierarchyIds::new(&self.0)
    }

    /// Concatenation of [`hierarchy_ids`](Self::hierarchy_ids), ready to be
    /// appended to a class attribute.
    pub fn hierarchy_classes(&self) -> String {
        self.hierarchy_ids().collect()
    }

    /// Whether this identifier names exactly a tool (`ns:service:tool`),
    /// the only level accepted as the parent of a new node.
    pub fn is_tool_level(&self) -> bool {
        TOOL_LEVEL.is_match(&self.0)
    }

    /// Base path of the tool icon images, without extension.
    pub fn tool_icon_base(&self) -> Result<String, CoreError> {
        self.require(3)?;
        let mut segments = self.segments().skip(1);
        let service = segments.next().unwrap_or_default();
        let tool = segments.next().unwrap_or_default();
        Ok(format!("{PLUGIN_BASE}/{service}/{tool}/img/{tool}"))
    }

    /// Prefilled identifier for a node about to be created under `parent`.
    pub fn child_template(parent: Option<&NodeIdentifier>) -> NodeIdentifier {
        match parent {
            Some(parent) => NodeIdentifier(format!("{}{SEGMENT_SEPARATOR}", parent.0)),
            None => NodeIdentifier(format!("{ROOT_NAMESPACE}{SEGMENT_SEPARATOR}")),
        }
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeIdentifier {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(NodeIdentifier(s.to_string()))
    }
}

impl From<&str> for NodeIdentifier {
    fn from(s: &str) -> Self {
        NodeIdentifier(s.to_string())
    }
}

impl From<String> for NodeIdentifier {
    fn from(s: String) -> Self {
        NodeIdentifier(s)
    }
}

impl AsRef<str> for NodeIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lazy sequence of hierarchy identifiers, see [`NodeIdentifier::hierarchy_ids`].
#[derive(Debug, Clone)]
pub struct HierarchyIds<'a> {
    rest: Split<'a, char>,
    prefix: String,
}

impl<'a> HierarchyIds<'a> {
    fn new(id: &'a str) -> Self {
        let mut rest = id.split(SEGMENT_SEPARATOR);
        let prefix = rest.next().unwrap_or_default().to_string();
        HierarchyIds { rest, prefix }
    }
}

impl Iterator for HierarchyIds<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let segment = self.rest.next()?;
        self.prefix.push(DERIVED_SEPARATOR);
        self.prefix.push_str(segment);
        Some(format!(" {}", self.prefix))
    }
}

impl std::iter::FusedIterator for HierarchyIds<'_> {}
