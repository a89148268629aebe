//! Image filtering
//!
//! Decodes fetched bytes and applies the fixed filter: resize to 256x256,
//! JPEG quality 60, greyscale, JPEG encoding.

pub mod processor;

pub use processor::{FilterProcessor, JPEG_QUALITY, OUTPUT_HEIGHT, OUTPUT_WIDTH};

use crate::models::{FilteredImage, RawImage};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ImageTransformer: Send + Sync {
    async fn transform(&self, raw: RawImage) -> Result<FilteredImage>;
}
