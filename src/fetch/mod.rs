//! Image download from publicly reachable URLs
//!
//! Validates the requested URL and downloads its body, failing fast at each
//! gate: input syntax, protocol allow-list, network completion, response
//! status, content type and payload size.

pub mod client;
pub mod mock;

pub use client::HttpImageFetcher;
pub use mock::MockImageFetcher;

use crate::models::RawImage;
use crate::Result;
use async_trait::async_trait;

/// `User-Agent` sent with every outbound request.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; ImageFilter/1.0)";

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RawImage>;
}
