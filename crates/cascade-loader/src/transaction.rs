//! Navigation transactions.
//!
//! Every navigation begins a new [`Transaction`]. Asynchronous results carry
//! the token they were requested under, and callers compare it against the
//! [`TransactionGuard`] to drop results that a newer navigation superseded.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use cascade_core::{apply_refresh, FreshSubscription, Subscription, SubscriptionId};
use serde::Serialize;
use tracing::debug;

/// Transaction token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Transaction(pub u64);

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Holder of the current transaction.
#[derive(Debug, Default)]
pub struct TransactionGuard {
    current: AtomicU64,
}

impl TransactionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new transaction, superseding the current one.
    pub fn begin(&self) -> Transaction {
        Transaction(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn current(&self) -> Transaction {
        Transaction(self.current.load(Ordering::Acquire))
    }

    /// Whether `transaction` is still the current one.
    pub fn is_same_transaction(&self, transaction: Transaction) -> bool {
        self.current() == transaction
    }

    /// Applies a status refresh requested under `transaction`.
    ///
    /// Returns `None` and leaves `subscriptions` untouched when a newer
    /// transaction has begun since, otherwise the updated ids.
    pub fn refresh_subscriptions(
        &self,
        transaction: Transaction,
        subscriptions: &mut [Subscription],
        fresh: &HashMap<SubscriptionId, FreshSubscription>,
    ) -> Option<Vec<SubscriptionId>> {
        if !self.is_same_transaction(transaction) {
            debug!(%transaction, current = %self.current(), "stale status refresh dropped");
            return None;
        }
        Some(apply_refresh(subscriptions, fresh))
    }
}

/// Who requests a fragment, and under which transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    pub owner: String,
    pub transaction: Transaction,
}

impl RequestContext {
    pub fn new(owner: impl Into<String>, transaction: Transaction) -> Self {
        RequestContext {
            owner: owner.into(),
            transaction,
        }
    }
}
