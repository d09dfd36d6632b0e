//! Plugin fragment loading for the console.
//!
//! - [`fragment`]: resource kinds, fragment requests and fetched bundles
//! - [`controller`]: initialized fragments handed back to callers
//! - [`transaction`]: navigation transactions and request contexts
//! - [`loader`]: the [`FragmentLoader`] contract
//! - [`source`]: [`FragmentSource`] and the directory-backed source
//! - [`cascade`]: [`CascadeLoader`], the at-most-once loader
//! - [`resolver`]: [`DependencyResolver`] (`require_service`/`require_tool`)
//! - [`error`]: LoadError and ResolveError

pub mod cascade;
pub mod controller;
pub mod error;
pub mod fragment;
pub mod loader;
pub mod resolver;
pub mod source;
pub mod transaction;

pub use cascade::CascadeLoader;
pub use controller::Controller;
pub use error::{LoadError, ResolveError};
pub use fragment::{FragmentBundle, FragmentKey, FragmentRequest, ResourceKind};
pub use loader::FragmentLoader;
pub use resolver::{DependencyResolver, ResolverConfig};
pub use source::{DirectorySource, FragmentSource};
pub use transaction::{RequestContext, Transaction, TransactionGuard};
