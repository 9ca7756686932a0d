//! Filesystem sink: one pretty-printed JSON file per bundle.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{info, instrument};

use super::{BundleSink, Delivery};
use crate::domain::EvidenceBundle;
use crate::error::SealError;

/// Writes `bundle-<bundle_id>.json` into a directory
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final path for a bundle
    pub fn bundle_path(&self, bundle: &EvidenceBundle) -> PathBuf {
        self.dir
            .join(format!("bundle-{}.json", bundle.bundle_id()))
    }
}

#[async_trait]
impl BundleSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    #[instrument(skip(self, bundle), fields(bundle_id = %bundle.bundle_id()))]
    async fn deliver(&self, bundle: &EvidenceBundle) -> Result<Delivery, SealError> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            SealError::Transport(format!(
                "failed to create output directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let json = bundle
            .to_json_pretty()
            .map_err(|e| SealError::Transport(format!("failed to serialize bundle: {}", e)))?;

        // Readers never see a half-written bundle
        let path = self.bundle_path(bundle);
        let tmp = self
            .dir
            .join(format!(".bundle-{}.json.tmp", bundle.bundle_id()));

        fs::write(&tmp, json.as_bytes()).await.map_err(|e| {
            SealError::Transport(format!("failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).await.map_err(|e| {
            SealError::Transport(format!("failed to move bundle into {}: {}", path.display(), e))
        })?;

        info!(path = %path.display(), "Bundle written");
        Ok(Delivery {
            sink: self.name().to_string(),
            location: path.display().to_string(),
            response: None,
        })
    }
}
