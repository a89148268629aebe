//! Fetch, filter and persist an image from a URL.

use crate::fetch::{HttpImageFetcher, ImageFetcher};
use crate::image::{FilterProcessor, ImageTransformer};
use crate::models::{Config, TransientArtifact};
use crate::storage::{ArtifactStore, TransientStore};
use crate::Result;
use std::path::PathBuf;
use tracing::{debug, info};

/// Runs the three phases strictly in sequence; the first failure aborts the
/// request. Nothing is retried.
pub struct FilterPipeline {
    fetcher: Box<dyn ImageFetcher>,
    transformer: Box<dyn ImageTransformer>,
    store: Box<dyn ArtifactStore>,
}

/// Injectable service bundle used to construct [`FilterPipeline`].
pub struct PipelineServices {
    pub fetcher: Box<dyn ImageFetcher>,
    pub transformer: Box<dyn ImageTransformer>,
    pub store: Box<dyn ArtifactStore>,
}

impl FilterPipeline {
    pub fn with_services(services: PipelineServices) -> Self {
        Self {
            fetcher: services.fetcher,
            transformer: services.transformer,
            store: services.store,
        }
    }

    /// Builds the production pipeline. The transient directory is created if
    /// it does not exist yet.
    pub fn from_config(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.transient_dir).map_err(|source| {
            crate::Error::Write {
                path: config.transient_dir.clone(),
                source,
            }
        })?;

        let store = TransientStore::new(&config.transient_dir, config.naming)?;
        info!("Transient images will be written to {}", store.dir().display());

        Ok(Self::with_services(PipelineServices {
            fetcher: Box::new(HttpImageFetcher::new()),
            transformer: Box::new(FilterProcessor::new()),
            store: Box::new(store),
        }))
    }

    /// Returns the path of a 256x256 greyscale JPEG. The caller must pass the
    /// path to [`FilterPipeline::cleanup`] once it has finished with the file.
    pub async fn filter_image_from_url(&self, url: &str) -> Result<TransientArtifact> {
        let raw = self.fetcher.fetch(url).await?;
        debug!("Fetched {} bytes ({})", raw.bytes().len(), raw.content_type());

        let filtered = self.transformer.transform(raw).await?;
        let artifact = self.store.persist(&filtered).await?;

        info!("Filtered {} into {}", url, artifact.path().display());
        Ok(artifact)
    }

    /// Best-effort deletion of previously returned artifacts. Never fails.
    pub fn cleanup(&self, paths: &[PathBuf]) {
        self.store.cleanup(paths);
    }
}
