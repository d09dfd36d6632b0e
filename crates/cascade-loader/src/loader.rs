//! The [`FragmentLoader`] contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::controller::Controller;
use crate::error::LoadError;
use crate::fragment::FragmentRequest;
use crate::transaction::RequestContext;

/// Loads and initializes named fragments.
///
/// Implementations load each (path, name) pair at most once per session.
/// Callers asking for a fragment that is still loading wait for that load
/// instead of starting another one.
#[async_trait]
pub trait FragmentLoader: Send + Sync {
    /// Loads `request`, initializing it under `parent` when given, and
    /// returns its controller.
    async fn load_fragment(
        &self,
        ctx: &RequestContext,
        request: FragmentRequest,
        parent: Option<Arc<Controller>>,
    ) -> Result<Arc<Controller>, LoadError>;
}

#[async_trait]
impl<L: FragmentLoader + ?Sized> FragmentLoader for Arc<L> {
    async fn load_fragment(
        &self,
        ctx: &RequestContext,
        request: FragmentRequest,
        parent: Option<Arc<Controller>>,
    ) -> Result<Arc<Controller>, LoadError> {
        (**self).load_fragment(ctx, request, parent).await
    }
}
