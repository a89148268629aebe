use super::ImageTransformer;
use crate::models::{FilteredImage, RawImage};
use crate::{Error, Result};
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

pub const OUTPUT_WIDTH: u32 = 256;
pub const OUTPUT_HEIGHT: u32 = 256;
pub const JPEG_QUALITY: u8 = 60;

/// Applies the fixed filter on the blocking thread pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterProcessor;

impl FilterProcessor {
    pub fn new() -> Self {
        Self
    }

    fn filter_sync(bytes: &[u8]) -> Result<Vec<u8>> {
        let img = image::load_from_memory(bytes).map_err(Error::Decode)?;

        // Aspect ratio is intentionally not preserved.
        let resized = img.resize_exact(OUTPUT_WIDTH, OUTPUT_HEIGHT, FilterType::Triangle);
        let grey = resized.grayscale();

        let mut buf = Vec::new();
        grey.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY))
            .map_err(Error::Encode)?;
        Ok(buf)
    }
}

#[async_trait]
impl ImageTransformer for FilterProcessor {
    async fn transform(&self, raw: RawImage) -> Result<FilteredImage> {
        let input_len = raw.bytes().len();
        let bytes = raw.into_bytes();

        let output = tokio::task::spawn_blocking(move || Self::filter_sync(&bytes))
            .await
            .map_err(|e| Error::Invariant(format!("Image processing task join error: {}", e)))??;

        tracing::debug!("Filtered {} input bytes into {} JPEG bytes", input_len, output.len());
        Ok(FilteredImage::new(output))
    }
}
