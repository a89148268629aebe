use super::ImageFetcher;
use crate::models::{ImageRequest, RawImage};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// In-memory fetcher. URL validation runs exactly as in the HTTP fetcher;
/// only requests that pass it count as network calls.
#[derive(Clone)]
pub struct MockImageFetcher {
    responses: Arc<Mutex<Vec<(Vec<u8>, String)>>>,
    network_calls: Arc<Mutex<usize>>,
    upstream_status: Arc<Mutex<Option<u16>>>,
}

impl MockImageFetcher {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            network_calls: Arc::new(Mutex::new(0)),
            upstream_status: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_response(self, bytes: Vec<u8>, content_type: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push((bytes, content_type.to_string()));
        self
    }

    pub fn with_upstream_status(self, status: u16) -> Self {
        *self.upstream_status.lock().unwrap() = Some(status);
        self
    }

    pub fn get_network_call_count(&self) -> usize {
        *self.network_calls.lock().unwrap()
    }
}

impl Default for MockImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageFetcher for MockImageFetcher {
    async fn fetch(&self, url: &str) -> Result<RawImage> {
        ImageRequest::parse(url)?;

        let mut count = self.network_calls.lock().unwrap();
        *count += 1;

        if let Some(status) = *self.upstream_status.lock().unwrap() {
            return Err(Error::Upstream {
                status,
                reason: "Mock upstream failure".to_string(),
            });
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(Error::EmptyPayload);
        }

        let index = (*count - 1) % responses.len();
        let (bytes, content_type) = responses[index].clone();
        RawImage::new(bytes, content_type)
    }
}
