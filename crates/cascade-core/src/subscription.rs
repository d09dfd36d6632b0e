//! Subscriptions of projects to nodes, and their live status refresh.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::id::NodeIdentifier;

/// Subscription identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub u32);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Last known health of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Up,
    Down,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A subscription with its node, parameters and live data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub node: NodeIdentifier,
    #[serde(default)]
    pub parameters: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Subscription {
    pub fn new(id: SubscriptionId, node: impl Into<NodeIdentifier>) -> Self {
        Subscription {
            id,
            node: node.into(),
            parameters: IndexMap::new(),
            status: SubscriptionStatus::Unknown,
            data: serde_json::Value::Null,
        }
    }

    /// Value of a subscription parameter, `None` when absent.
    pub fn parameter(&self, name: &str) -> Option<&serde_json::Value> {
        self.parameters.get(name)
    }

    pub fn is_up(&self) -> bool {
        self.status == SubscriptionStatus::Up
    }
}

/// Fresh state of one subscription, as returned by a status refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreshSubscription {
    #[serde(default)]
    pub parameters: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub status: SubscriptionStatus,
}

/// Copies parameters, data and status of every refreshed subscription.
///
/// Returns the ids that were updated, in input order. Subscriptions the
/// payload does not mention are left as they were.
pub fn apply_refresh(
    subscriptions: &mut [Subscription],
    fresh: &HashMap<SubscriptionId, FreshSubscription>,
) -> Vec<SubscriptionId> {
    let mut updated = Vec::new();
    for subscription in subscriptions.iter_mut() {
        match fresh.get(&subscription.id) {
            Some(state) => {
                subscription.parameters = state.parameters.clone();
                subscription.data = state.data.clone();
                subscription.status = state.status;
                updated.push(subscription.id);
            }
            None => debug!(subscription = %subscription.id, "absent from refresh payload"),
        }
    }
    updated
}
