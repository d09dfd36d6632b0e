//! Service-then-tool dependency resolution.
//!
//! [`DependencyResolver`] turns a node identifier into fragment loads. A
//! tool always depends on its service: `require_tool` awaits the service
//! controller before issuing the tool load, and initializes the tool under
//! it. When the service fails the tool is never requested and the failure
//! is returned to the caller.

use std::sync::Arc;

use cascade_core::{NodeIdentifier, PLUGIN_BASE};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::controller::Controller;
use crate::error::ResolveError;
use crate::fragment::{FragmentRequest, ResourceKind};
use crate::loader::FragmentLoader;
use crate::transaction::RequestContext;

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Directory holding one sub-directory per service.
    pub plugin_base: String,
    /// Resources requested for every fragment.
    pub kinds: Vec<ResourceKind>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            plugin_base: PLUGIN_BASE.to_string(),
            kinds: ResourceKind::ALL.to_vec(),
        }
    }
}

/// Resolves service and tool fragments through a [`FragmentLoader`].
pub struct DependencyResolver<L> {
    loader: L,
    config: ResolverConfig,
}

impl<L: FragmentLoader> DependencyResolver<L> {
    pub fn new(loader: L) -> Self {
        Self::with_config(loader, ResolverConfig::default())
    }

    pub fn with_config(loader: L, config: ResolverConfig) -> Self {
        DependencyResolver { loader, config }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Loads the service fragment of `id` and returns its controller.
    pub async fn require_service(
        &self,
        ctx: &RequestContext,
        id: &NodeIdentifier,
    ) -> Result<Arc<Controller>, ResolveError> {
        let service = id.service_name()?;
        let request =
            FragmentRequest::service(&self.config.plugin_base, service).with_kinds(&self.config.kinds);
        debug!(node = %id, service, "requiring service");
        match self.loader.load_fragment(ctx, request, None).await {
            Ok(controller) => Ok(controller),
            Err(err) => {
                warn!(node = %id, service, error = %err, "service unavailable");
                Err(err.into())
            }
        }
    }

    /// Loads the service then the tool fragment of `id`, and returns the
    /// tool controller, whose parent is the service controller.
    pub async fn require_tool(
        &self,
        ctx: &RequestContext,
        id: &NodeIdentifier,
    ) -> Result<Arc<Controller>, ResolveError> {
        let transaction = ctx.transaction;
        let service = id.service_name()?;
        let tool = id.required_tool_name()?;

        let service_controller = self.require_service(ctx, id).await?;

        let tool_ctx = RequestContext::new(service_controller.name.clone(), transaction);
        let request = FragmentRequest::tool(&self.config.plugin_base, service, tool)
            .with_kinds(&self.config.kinds);
        debug!(node = %id, service, tool, "requiring tool");
        let controller = self
            .loader
            .load_fragment(&tool_ctx, request, Some(service_controller))
            .await?;
        Ok(controller)
    }

    /// Requires every global tool concurrently, the tools rendered on the
    /// home page of every user. Results follow the order of `tools`.
    pub async fn require_global_tools(
        &self,
        ctx: &RequestContext,
        tools: &[NodeIdentifier],
    ) -> Vec<Result<Arc<Controller>, ResolveError>> {
        join_all(tools.iter().map(|tool| self.require_tool(ctx, tool))).await
    }
}
