//! Where fragment resources come from.
//!
//! [`DirectorySource`] reads a fragment from a webapp directory laid out as:
//!
//! ```text
//! <root>/<path>/<name>.css          style        (optional)
//! <root>/<path>/nls/messages.js     translation  (optional)
//! <root>/<path>/<name>.html         partial      (optional)
//! <root>/<path>/<name>.js           behavior     (required)
//! ```
//!
//! Paths and names come from node identifiers, so a request whose path
//! leaves `<root>` or whose name is not a plain file stem is refused with
//! [`LoadError::UnsafePath`] before anything is read.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::LoadError;
use crate::fragment::{FragmentBundle, FragmentRequest, ResourceKind};

/// Fetches the raw resources of a fragment.
#[async_trait]
pub trait FragmentSource: Send + Sync + 'static {
    async fn fetch(&self, request: &FragmentRequest) -> Result<FragmentBundle, LoadError>;
}

/// Fragment source backed by a webapp directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectorySource { root: root.into() }
    }

    /// Directory of `request` under the root.
    fn fragment_dir(&self, request: &FragmentRequest) -> Result<PathBuf, LoadError> {
        let relative = Path::new(request.path.trim_start_matches('/'));
        let contained = !request.path.contains('\\')
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        let plain_name = !matches!(request.name.as_str(), "" | "." | "..")
            && !request.name.contains(['/', '\\']);
        if !contained || !plain_name {
            return Err(LoadError::UnsafePath {
                path: request.path.clone(),
                name: request.name.clone(),
            });
        }
        Ok(self.root.join(relative))
    }

    /// File holding the `kind` resource of `request`.
    pub fn resource_path(
        &self,
        request: &FragmentRequest,
        kind: ResourceKind,
    ) -> Result<PathBuf, LoadError> {
        let dir = self.fragment_dir(request)?;
        Ok(match kind {
            ResourceKind::Style => dir.join(format!("{}.css", request.name)),
            ResourceKind::Translation => dir.join("nls").join("messages.js"),
            ResourceKind::Partial => dir.join(format!("{}.html", request.name)),
            ResourceKind::Behavior => dir.join(format!("{}.js", request.name)),
        })
    }
}

#[async_trait]
impl FragmentSource for DirectorySource {
    async fn fetch(&self, request: &FragmentRequest) -> Result<FragmentBundle, LoadError> {
        let mut bundle = FragmentBundle::new();
        for &kind in &request.kinds {
            let path = self.resource_path(request, kind)?;
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    bundle.resources.insert(kind, content);
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    if kind == ResourceKind::Behavior {
                        return Err(LoadError::MissingResource {
                            path: request.path.clone(),
                            name: request.name.clone(),
                            kind,
                        });
                    }
                    debug!(fragment = %request.name, %kind, "optional resource absent");
                }
                Err(err) => {
                    return Err(LoadError::Io {
                        path: path.display().to_string(),
                        reason: err.to_string(),
                    })
                }
            }
        }
        Ok(bundle)
    }
}
