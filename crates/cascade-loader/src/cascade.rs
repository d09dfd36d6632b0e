//! At-most-once fragment loader.
//!
//! [`CascadeLoader`] keeps one slot per [`FragmentKey`]: either the shared
//! future of the load in flight, or the ready controller. The first caller
//! for a key starts the load, later callers clone the shared future and are
//! woken by the same completion. A failed load is delivered to every queued
//! caller and its slot is dropped, so failures are never memoized and the
//! next request starts afresh.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use crate::controller::Controller;
use crate::error::LoadError;
use crate::fragment::{FragmentKey, FragmentRequest};
use crate::loader::FragmentLoader;
use crate::source::FragmentSource;
use crate::transaction::RequestContext;

type LoadFuture = Shared<BoxFuture<'static, Result<Arc<Controller>, LoadError>>>;

enum Slot {
    Loading(LoadFuture),
    Ready(Arc<Controller>),
}

enum Claim {
    Ready(Arc<Controller>),
    Pending(LoadFuture),
}

/// Fragment loader with session-wide, at-most-once loading per key.
pub struct CascadeLoader<S> {
    source: Arc<S>,
    slots: DashMap<FragmentKey, Slot>,
    fetches: Arc<AtomicUsize>,
}

impl<S: FragmentSource> CascadeLoader<S> {
    pub fn new(source: S) -> Self {
        CascadeLoader {
            source: Arc::new(source),
            slots: DashMap::new(),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of fetches issued to the source so far.
    pub fn load_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Whether the fragment is loaded and initialized.
    pub fn is_loaded(&self, key: &FragmentKey) -> bool {
        matches!(self.slots.get(key).as_deref(), Some(Slot::Ready(_)))
    }

    /// Keys of every ready fragment, sorted.
    pub fn loaded(&self) -> Vec<FragmentKey> {
        let mut keys: Vec<FragmentKey> = self
            .slots
            .iter()
            .filter(|entry| matches!(entry.value(), Slot::Ready(_)))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    fn start(&self, request: FragmentRequest, parent: Option<Arc<Controller>>) -> LoadFuture {
        let source = Arc::clone(&self.source);
        let fetches = Arc::clone(&self.fetches);
        async move {
            fetches.fetch_add(1, Ordering::Relaxed);
            let bundle = source.fetch(&request).await?;
            Ok(Arc::new(Controller::from_bundle(&request, bundle, parent)))
        }
        .boxed()
        .shared()
    }

    /// Returns the ready controller, or the load to wait for, starting it
    /// when nobody has yet.
    fn claim(
        &self,
        ctx: &RequestContext,
        request: FragmentRequest,
        parent: Option<Arc<Controller>>,
    ) -> Claim {
        match self.slots.entry(request.key()) {
            Entry::Occupied(entry) => match entry.get() {
                Slot::Ready(controller) => {
                    debug!(fragment = %entry.key(), "fragment already loaded");
                    Claim::Ready(Arc::clone(controller))
                }
                Slot::Loading(pending) => {
                    debug!(fragment = %entry.key(), owner = %ctx.owner, "queued behind load in flight");
                    Claim::Pending(pending.clone())
                }
            },
            Entry::Vacant(entry) => {
                debug!(
                    fragment = %entry.key(),
                    owner = %ctx.owner,
                    transaction = %ctx.transaction,
                    "issuing fragment load"
                );
                let pending = self.start(request, parent);
                entry.insert(Slot::Loading(pending.clone()));
                Claim::Pending(pending)
            }
        }
    }
}

#[async_trait]
impl<S: FragmentSource> FragmentLoader for CascadeLoader<S> {
    async fn load_fragment(
        &self,
        ctx: &RequestContext,
        request: FragmentRequest,
        parent: Option<Arc<Controller>>,
    ) -> Result<Arc<Controller>, LoadError> {
        let key = request.key();
        let pending = match self.claim(ctx, request, parent) {
            Claim::Ready(controller) => return Ok(controller),
            Claim::Pending(pending) => pending,
        };

        let result = pending.clone().await;
        match &result {
            Ok(controller) => {
                if let Some(mut slot) = self.slots.get_mut(&key) {
                    if matches!(&*slot, Slot::Loading(current) if current.ptr_eq(&pending)) {
                        *slot = Slot::Ready(Arc::clone(controller));
                        info!(fragment = %key, "fragment ready");
                    }
                }
            }
            Err(err) => {
                let removed = self.slots.remove_if(&key, |_, slot| {
                    matches!(slot, Slot::Loading(current) if current.ptr_eq(&pending))
                });
                if removed.is_some() {
                    warn!(fragment = %key, error = %err, "fragment load failed");
                }
            }
        }
        result
    }
}
