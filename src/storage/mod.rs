//! Transient storage for filtered images
//!
//! Persists filtered images under a shared directory with randomized names
//! and deletes them again on request. Deletion is best effort and never
//! reports failure to the caller.

pub mod transient;

pub use transient::{CleanupHook, TransientStore};

use crate::models::{FilteredImage, TransientArtifact};
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;

pub const FILE_PREFIX: &str = "filtered.";
pub const FILE_EXTENSION: &str = "jpg";
pub const DEFAULT_SUFFIX_RANGE: u32 = 1_000_000;

/// How transient file names are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingStrategy {
    /// `filtered.<n>.jpg` with `n` drawn uniformly from `0..range`.
    /// Collisions overwrite silently.
    RandomSuffix { range: u32 },
    /// `filtered.<uuid-v4>.jpg`.
    Uuid,
}

impl Default for NamingStrategy {
    fn default() -> Self {
        NamingStrategy::RandomSuffix {
            range: DEFAULT_SUFFIX_RANGE,
        }
    }
}

impl NamingStrategy {
    pub fn file_name(&self) -> String {
        let suffix = match self {
            NamingStrategy::RandomSuffix { range } => {
                use rand::Rng;
                rand::thread_rng().gen_range(0..(*range).max(1)).to_string()
            }
            NamingStrategy::Uuid => uuid::Uuid::new_v4().to_string(),
        };
        format!("{}{}.{}", FILE_PREFIX, suffix, FILE_EXTENSION)
    }
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn persist(&self, image: &FilteredImage) -> Result<TransientArtifact>;

    /// Deletes every path, swallowing all failures.
    fn cleanup(&self, paths: &[PathBuf]);
}
