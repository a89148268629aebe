use super::{ArtifactStore, NamingStrategy};
use crate::models::{FilteredImage, TransientArtifact};
use crate::{Error, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Called for every deletion that fails for a reason other than the file
/// already being gone.
pub type CleanupHook = Arc<dyn Fn(&Path, &std::io::Error) + Send + Sync>;

pub struct TransientStore {
    dir: PathBuf,
    naming: NamingStrategy,
    on_cleanup_failure: Option<CleanupHook>,
    cleanup_failures: AtomicU64,
}

impl TransientStore {
    /// `dir` is made absolute against the current directory; it is not
    /// created here.
    pub fn new(dir: &Path, naming: NamingStrategy) -> Result<Self> {
        let dir = std::path::absolute(dir).map_err(|source| Error::Write {
            path: dir.to_path_buf(),
            source,
        })?;

        Ok(Self {
            dir,
            naming,
            on_cleanup_failure: None,
            cleanup_failures: AtomicU64::new(0),
        })
    }

    pub fn with_cleanup_hook(mut self, hook: CleanupHook) -> Self {
        self.on_cleanup_failure = Some(hook);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of deletions that failed since the store was created.
    pub fn cleanup_failures(&self) -> u64 {
        self.cleanup_failures.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ArtifactStore for TransientStore {
    async fn persist(&self, image: &FilteredImage) -> Result<TransientArtifact> {
        let path = self.dir.join(self.naming.file_name());

        tokio::fs::write(&path, image.as_bytes())
            .await
            .map_err(|source| Error::Write {
                path: path.clone(),
                source,
            })?;

        debug!("Wrote {} bytes to {}", image.len(), path.display());
        Ok(TransientArtifact::new(path))
    }

    fn cleanup(&self, paths: &[PathBuf]) {
        for path in paths {
            match std::fs::remove_file(path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("Already removed: {}", path.display())
                }
                Err(e) => {
                    self.cleanup_failures.fetch_add(1, Ordering::Relaxed);
                    warn!("Failed to remove {}: {}", path.display(), e);
                    if let Some(hook) = &self.on_cleanup_failure {
                        hook(path, &e);
                    }
                }
            }
        }
    }
}
