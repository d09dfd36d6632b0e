//! Ordering and failure propagation of service/tool resolution.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use cascade_core::NodeIdentifier;
use cascade_loader::{
    Controller, DependencyResolver, FragmentBundle, FragmentLoader, FragmentRequest, LoadError,
    RequestContext, ResolveError, ResolverConfig, Transaction,
};

/// Loader recording each call, failing for the configured fragment names.
#[derive(Default)]
struct RecordingLoader {
    calls: Mutex<Vec<(String, String, RequestContext)>>,
    failing: HashSet<String>,
}

impl RecordingLoader {
    fn failing(names: &[&str]) -> Self {
        RecordingLoader {
            calls: Mutex::new(Vec::new()),
            failing: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    fn paths(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _, _)| path.clone())
            .collect()
    }
}

#[async_trait]
impl FragmentLoader for RecordingLoader {
    async fn load_fragment(
        &self,
        ctx: &RequestContext,
        request: FragmentRequest,
        parent: Option<Arc<Controller>>,
    ) -> Result<Arc<Controller>, LoadError> {
        self.calls.lock().unwrap().push((
            request.path.clone(),
            request.name.clone(),
            ctx.clone(),
        ));
        tokio::task::yield_now().await;
        if self.failing.contains(&request.name) {
            return Err(LoadError::Io {
                path: request.path.clone(),
                reason: "script error".to_string(),
            });
        }
        Ok(Arc::new(Controller::from_bundle(
            &request,
            FragmentBundle::new(),
            parent,
        )))
    }
}

fn ctx() -> RequestContext {
    RequestContext::new("home", Transaction(7))
}

#[tokio::test]
async fn service_path_and_name() {
    let loader = Arc::new(RecordingLoader::default());
    let resolver = DependencyResolver::new(Arc::clone(&loader));

    let controller = resolver
        .require_service(&ctx(), &NodeIdentifier::from("service:bt:jira:6"))
        .await
        .unwrap();

    assert_eq!(controller.name, "bt");
    assert!(controller.parent().is_none());
    let calls = loader.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "main/plugin/bt/");
    assert_eq!(calls[0].1, "bt");
    assert_eq!(calls[0].2, ctx());
}

#[tokio::test]
async fn tool_is_loaded_after_its_service() {
    let loader = Arc::new(RecordingLoader::default());
    let resolver = DependencyResolver::new(Arc::clone(&loader));

    let tool = resolver
        .require_tool(&ctx(), &NodeIdentifier::from("service:bt:jira:6"))
        .await
        .unwrap();

    assert_eq!(loader.paths(), vec!["main/plugin/bt/", "main/plugin/bt/jira"]);
    assert_eq!(tool.name, "jira");
    assert_eq!(tool.lineage(), vec!["jira", "bt"]);

    // The tool is requested by the service controller, under the original transaction.
    let calls = loader.calls.lock().unwrap();
    assert_eq!(calls[1].2, RequestContext::new("bt", Transaction(7)));
}

#[tokio::test]
async fn service_failure_stops_tool_load() {
    let loader = Arc::new(RecordingLoader::failing(&["bt"]));
    let resolver = DependencyResolver::new(Arc::clone(&loader));

    let err = resolver
        .require_tool(&ctx(), &NodeIdentifier::from("service:bt:jira"))
        .await
        .unwrap_err();

    assert!(err.is_load_failure());
    assert_eq!(loader.paths(), vec!["main/plugin/bt/"]);
}

#[tokio::test]
async fn tool_failure_is_reported() {
    let loader = Arc::new(RecordingLoader::failing(&["jira"]));
    let resolver = DependencyResolver::new(Arc::clone(&loader));

    let err = resolver
        .require_tool(&ctx(), &NodeIdentifier::from("service:bt:jira"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ResolveError::FragmentLoad(LoadError::Io {
            path: "main/plugin/bt/jira".to_string(),
            reason: "script error".to_string(),
        })
    );
    assert_eq!(loader.paths().len(), 2);
}

#[tokio::test]
async fn malformed_identifiers_issue_no_load() {
    let loader = Arc::new(RecordingLoader::default());
    let resolver = DependencyResolver::new(Arc::clone(&loader));

    let err = resolver
        .require_service(&ctx(), &NodeIdentifier::from("service"))
        .await
        .unwrap_err();
    assert!(err.is_malformed_id());

    let err = resolver
        .require_tool(&ctx(), &NodeIdentifier::from("service:bt"))
        .await
        .unwrap_err();
    assert!(err.is_malformed_id());

    assert!(loader.paths().is_empty());
}

#[tokio::test]
async fn custom_plugin_base() {
    let loader = Arc::new(RecordingLoader::default());
    let config = ResolverConfig {
        plugin_base: "static/plugins/".to_string(),
        ..ResolverConfig::default()
    };
    let resolver = DependencyResolver::with_config(Arc::clone(&loader), config);

    resolver
        .require_tool(&ctx(), &NodeIdentifier::from("service:scm:git"))
        .await
        .unwrap();

    assert_eq!(
        loader.paths(),
        vec!["static/plugins/scm/", "static/plugins/scm/git"]
    );
}

#[tokio::test]
async fn global_tools_keep_input_order() {
    let loader = Arc::new(RecordingLoader::failing(&["vm"]));
    let resolver = DependencyResolver::new(Arc::clone(&loader));
    let tools = vec![
        NodeIdentifier::from("service:scm:git"),
        NodeIdentifier::from("service:vm:vcloud"),
        NodeIdentifier::from("service:bt:jira:6"),
    ];

    let results = resolver.require_global_tools(&ctx(), &tools).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().name, "git");
    assert!(results[1].as_ref().unwrap_err().is_load_failure());
    assert_eq!(results[2].as_ref().unwrap().name, "jira");
    assert!(!loader.paths().contains(&"main/plugin/vm/vcloud".to_string()));
}
