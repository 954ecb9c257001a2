use std::path::{Path, PathBuf};

use crate::error::AssetError;

/// Directory holding the bundled JSON resources.
#[derive(Debug, Clone)]
pub struct Assets {
    root: PathBuf,
}

impl Assets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Reads a resource as UTF-8 text.
    pub async fn read_to_string(&self, name: &str) -> Result<String, AssetError> {
        tokio::fs::read_to_string(self.path(name))
            .await
            .map_err(|source| AssetError {
                name: name.to_string(),
                source,
            })
    }
}
