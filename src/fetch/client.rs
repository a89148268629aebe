use super::{ImageFetcher, USER_AGENT};
use crate::models::{is_image_content_type, ImageRequest, RawImage};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header;
use reqwest::Client;

/// Downloads images with a single GET and no retries.
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self::new_with_client(Client::new())
    }

    pub fn new_with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<RawImage> {
        let request = ImageRequest::parse(url)?;

        let response = self
            .client
            .get(request.url().clone())
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!("Request to {} failed: {}", request.url(), e);
                Error::Network(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

        let content_type = match content_type {
            Some(value) if is_image_content_type(&value) => value,
            other => return Err(Error::UnsupportedContentType(other)),
        };

        let bytes = response.bytes().await?.to_vec();
        tracing::debug!(
            "Fetched {} bytes ({}) from {}",
            bytes.len(),
            content_type,
            request.url()
        );

        RawImage::new(bytes, content_type)
    }
}
