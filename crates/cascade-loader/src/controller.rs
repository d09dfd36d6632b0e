//! Loaded fragment controllers.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::fragment::{FragmentBundle, FragmentKey, FragmentRequest, ResourceKind};

/// The initialized form of a fragment, handed to whoever required it.
///
/// A tool controller keeps its service controller as `parent`, so holding a
/// tool controller implies its service is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Controller {
    pub name: String,
    pub path: String,
    pub resources: BTreeMap<ResourceKind, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Arc<Controller>>,
}

impl Controller {
    pub fn from_bundle(
        request: &FragmentRequest,
        bundle: FragmentBundle,
        parent: Option<Arc<Controller>>,
    ) -> Self {
        Controller {
            name: request.name.clone(),
            path: request.path.clone(),
            resources: bundle.resources,
            parent,
        }
    }

    pub fn key(&self) -> FragmentKey {
        FragmentKey {
            path: self.path.clone(),
            name: self.name.clone(),
        }
    }

    pub fn resource(&self, kind: ResourceKind) -> Option<&str> {
        self.resources.get(&kind).map(String::as_str)
    }

    pub fn parent(&self) -> Option<&Arc<Controller>> {
        self.parent.as_ref()
    }

    /// Names from this controller up to its topmost parent.
    pub fn lineage(&self) -> Vec<&str> {
        let mut names = vec![self.name.as_str()];
        let mut current = self.parent.as_deref();
        while let Some(controller) = current {
            names.push(controller.name.as_str());
            current = controller.parent.as_deref();
        }
        names
    }
}
