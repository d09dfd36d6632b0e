//! Node hierarchy model for the plugin console.
//!
//! - [`id`]: colon-delimited node identifiers and the names derived from them
//! - [`node`]: node entities and their handles
//! - [`tree`]: the refinement tree with its memoized service/tool roots
//! - [`subscription`]: subscriptions and status refresh
//! - [`error`]: CoreError

pub mod error;
pub mod id;
pub mod node;
pub mod subscription;
pub mod tree;

// Re-export commonly used types
pub use error::CoreError;
pub use id::{HierarchyIds, NodeIdentifier, PLUGIN_BASE};
pub use node::{Node, NodeKey, NodeRecord, SubscriptionMode};
pub use subscription::{
    apply_refresh, FreshSubscription, Subscription, SubscriptionId, SubscriptionStatus,
};
pub use tree::NodeTree;
