//! At-most-once loading and the directory-backed source.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use cascade_core::NodeIdentifier;
use cascade_loader::{
    CascadeLoader, DependencyResolver, DirectorySource, FragmentBundle, FragmentLoader,
    FragmentRequest, FragmentSource, LoadError, RequestContext, ResourceKind, Transaction,
};

/// Source that takes a while, and fails its first `failures` fetches.
struct SlowSource {
    fetched: AtomicUsize,
    failures: usize,
}

impl SlowSource {
    fn new(failures: usize) -> Self {
        SlowSource {
            fetched: AtomicUsize::new(0),
            failures,
        }
    }
}

#[async_trait]
impl FragmentSource for SlowSource {
    async fn fetch(&self, request: &FragmentRequest) -> Result<FragmentBundle, LoadError> {
        let attempt = self.fetched.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if attempt < self.failures {
            return Err(LoadError::Io {
                path: request.path.clone(),
                reason: "connection reset".to_string(),
            });
        }
        Ok(FragmentBundle::new().with(ResourceKind::Behavior, format!("define({})", request.name)))
    }
}

fn ctx() -> RequestContext {
    RequestContext::new("home", Transaction(1))
}

#[tokio::test]
async fn concurrent_callers_share_one_load() {
    let loader = CascadeLoader::new(SlowSource::new(0));
    let request = FragmentRequest::service("main/plugin", "bt");

    let context = ctx();
    let results = join_all(
        (0..5).map(|_| loader.load_fragment(&context, request.clone(), None)),
    )
    .await;

    assert_eq!(loader.load_count(), 1);
    let first = results[0].as_ref().unwrap();
    for result in &results {
        assert!(Arc::ptr_eq(first, result.as_ref().unwrap()));
    }
    assert!(loader.is_loaded(&request.key()));
    assert_eq!(first.resource(ResourceKind::Behavior), Some("define(bt)"));

    // Once ready, later calls return the same controller without fetching.
    let again = loader.load_fragment(&ctx(), request, None).await.unwrap();
    assert!(Arc::ptr_eq(first, &again));
    assert_eq!(loader.load_count(), 1);
}

#[tokio::test]
async fn failure_reaches_every_queued_caller_and_is_not_memoized() {
    let loader = CascadeLoader::new(SlowSource::new(1));
    let request = FragmentRequest::service("main/plugin", "bt");

    let context = ctx();
    let results = join_all(
        (0..3).map(|_| loader.load_fragment(&context, request.clone(), None)),
    )
    .await;

    assert_eq!(loader.load_count(), 1);
    assert!(results.iter().all(|r| r.is_err()));
    assert!(!loader.is_loaded(&request.key()));
    assert!(loader.loaded().is_empty());

    let retried = loader.load_fragment(&ctx(), request, None).await;
    assert!(retried.is_ok());
    assert_eq!(loader.load_count(), 2);
}

#[tokio::test]
async fn concurrent_tool_requests_load_each_fragment_once() {
    let loader = Arc::new(CascadeLoader::new(SlowSource::new(0)));
    let resolver = DependencyResolver::new(Arc::clone(&loader));
    let id = NodeIdentifier::from("service:bt:jira:6");

    let context = ctx();
    let results = join_all((0..4).map(|_| resolver.require_tool(&context, &id))).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(loader.load_count(), 2);
    let keys: Vec<String> = loader.loaded().iter().map(|k| k.to_string()).collect();
    assert_eq!(keys, vec!["bt@main/plugin/bt/", "jira@main/plugin/bt/jira"]);
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[tokio::test]
async fn directory_source_reads_plugin_layout() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main/plugin/bt/bt.js", "define('bt')");
    write(dir.path(), "main/plugin/bt/bt.html", "<div></div>");
    write(dir.path(), "main/plugin/bt/nls/messages.js", "define({root:{}})");
    write(dir.path(), "main/plugin/bt/jira/jira.js", "define('jira')");
    write(dir.path(), "main/plugin/bt/jira/jira.css", ".jira{}");

    let loader = Arc::new(CascadeLoader::new(DirectorySource::new(dir.path())));
    let resolver = DependencyResolver::new(Arc::clone(&loader));

    let tool = resolver
        .require_tool(&ctx(), &NodeIdentifier::from("service:bt:jira"))
        .await
        .unwrap();

    assert_eq!(tool.resource(ResourceKind::Behavior), Some("define('jira')"));
    assert_eq!(tool.resource(ResourceKind::Style), Some(".jira{}"));
    assert_eq!(tool.resource(ResourceKind::Partial), None);

    let service = tool.parent().unwrap();
    assert_eq!(service.resource(ResourceKind::Partial), Some("<div></div>"));
    assert_eq!(
        service.resource(ResourceKind::Translation),
        Some("define({root:{}})")
    );
    assert_eq!(service.resource(ResourceKind::Style), None);
}

#[tokio::test]
async fn directory_source_requires_behavior() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main/plugin/bt/bt.js", "define('bt')");
    write(dir.path(), "main/plugin/bt/jira/jira.css", ".jira{}");

    let loader = Arc::new(CascadeLoader::new(DirectorySource::new(dir.path())));
    let resolver = DependencyResolver::new(Arc::clone(&loader));

    let err = resolver
        .require_tool(&ctx(), &NodeIdentifier::from("service:bt:jira"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        cascade_loader::ResolveError::FragmentLoad(LoadError::MissingResource {
            path: "main/plugin/bt/jira".to_string(),
            name: "jira".to_string(),
            kind: ResourceKind::Behavior,
        })
    );
    // The service stays loaded, the failed tool does not.
    assert_eq!(loader.loaded().len(), 1);
}

#[tokio::test]
async fn directory_source_stays_inside_root() {
    let dir = tempfile::tempdir().unwrap();
    let webapp = dir.path().join("webapp");
    write(&webapp, "main/plugin/bt/bt.js", "define('bt')");
    // Reachable from the plugin directory only by climbing out of the webapp.
    write(dir.path(), "secret/secret.js", "define('secret')");

    let loader = Arc::new(CascadeLoader::new(DirectorySource::new(&webapp)));
    let resolver = DependencyResolver::new(Arc::clone(&loader));

    for id in ["service:..", "service:../../../secret", "service:..:jira", "service::jira"] {
        let service = resolver
            .require_service(&ctx(), &NodeIdentifier::from(id))
            .await;
        let tool = resolver.require_tool(&ctx(), &NodeIdentifier::from(id)).await;
        for result in [service, tool] {
            match result {
                Err(cascade_loader::ResolveError::FragmentLoad(LoadError::UnsafePath { .. })) => {}
                Err(e) if e.is_malformed_id() => {}
                other => panic!("{id}: expected refusal, got {other:?}"),
            }
        }
    }
    assert!(loader.loaded().is_empty());

    // A sane service with an escaping tool loads the service only.
    let err = resolver
        .require_tool(&ctx(), &NodeIdentifier::from("service:bt:.."))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        cascade_loader::ResolveError::FragmentLoad(LoadError::UnsafePath {
            path: "main/plugin/bt/..".to_string(),
            name: "..".to_string(),
        })
    );
    assert_eq!(loader.loaded().len(), 1);

    let service = resolver
        .require_service(&ctx(), &NodeIdentifier::from("service:bt"))
        .await
        .unwrap();
    assert_eq!(service.resource(ResourceKind::Behavior), Some("define('bt')"));
}
