//! Loader and resolver error types.
//!
//! [`LoadError`] is `Clone` because a single failed load is delivered to
//! every caller queued behind it.

use cascade_core::CoreError;
use thiserror::Error;

use crate::fragment::ResourceKind;

/// Errors produced while fetching or initializing a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// A required resource of the fragment does not exist.
    #[error("fragment '{name}' at '{path}' has no {kind} resource")]
    MissingResource {
        path: String,
        name: String,
        kind: ResourceKind,
    },

    /// Reading a resource failed.
    #[error("failed to read '{path}': {reason}")]
    Io { path: String, reason: String },

    /// The fragment path or name would resolve outside the source root.
    #[error("fragment '{name}' at '{path}' is outside the source root")]
    UnsafePath { path: String, name: String },
}

/// Errors surfaced by `require_service` / `require_tool`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Malformed identifier or refinement cycle.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The loader failed; the request chain stopped at this fragment.
    #[error("fragment load failed: {0}")]
    FragmentLoad(#[from] LoadError),
}

impl ResolveError {
    pub fn is_malformed_id(&self) -> bool {
        matches!(self, ResolveError::Core(CoreError::MalformedId { .. }))
    }

    pub fn is_load_failure(&self) -> bool {
        matches!(self, ResolveError::FragmentLoad(_))
    }
}
