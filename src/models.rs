//! Data models and structures
//!
//! Defines the values that flow between the pipeline phases and the
//! runtime configuration of the service.

use crate::storage::{NamingStrategy, DEFAULT_SUFFIX_RANGE};
use crate::{Error, Result};
use reqwest::Url;
use std::path::{Path, PathBuf};

/// A validated source URL. Only `http` and `https` URLs can be constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    url: Url,
}

impl ImageRequest {
    /// Validates `input` without touching the network.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("Invalid URL provided".to_string()));
        }

        let url = Url::parse(trimmed)
            .map_err(|e| Error::InvalidInput(format!("Invalid URL format: {}", e)))?;

        match url.scheme() {
            "http" | "https" => Ok(Self { url }),
            other => Err(Error::UnsupportedProtocol(other.to_string())),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Downloaded image bytes together with the declared content type.
#[derive(Debug, Clone)]
pub struct RawImage {
    bytes: Vec<u8>,
    content_type: String,
}

impl RawImage {
    pub fn new(bytes: Vec<u8>, content_type: String) -> Result<Self> {
        if !is_image_content_type(&content_type) {
            return Err(Error::UnsupportedContentType(Some(content_type)));
        }
        if bytes.is_empty() {
            return Err(Error::EmptyPayload);
        }
        Ok(Self {
            bytes,
            content_type,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

pub(crate) fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .trim_start()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

/// JPEG-encoded output of the transformer.
#[derive(Debug, Clone)]
pub struct FilteredImage {
    bytes: Vec<u8>,
}

impl FilteredImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A persisted [`FilteredImage`] on local disk.
///
/// The caller owns the file until it hands the path back to cleanup. Dropping
/// the artifact does not delete anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientArtifact {
    path: PathBuf,
}

impl TransientArtifact {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

// Configuration
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8082;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub transient_dir: PathBuf,
    pub naming: NamingStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            transient_dir: std::env::temp_dir(),
            naming: NamingStrategy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults
    /// for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("PORT must be a port number, got '{}'", raw)))?,
            None => defaults.port,
        };

        let range = match lookup("FILTER_SUFFIX_RANGE") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(range) if range > 0 => range,
                _ => {
                    return Err(Error::Config(format!(
                        "FILTER_SUFFIX_RANGE must be a positive integer, got '{}'",
                        raw
                    )))
                }
            },
            None => DEFAULT_SUFFIX_RANGE,
        };

        let naming = match lookup("FILTER_NAMING").as_deref().map(str::trim) {
            None | Some("random") => NamingStrategy::RandomSuffix { range },
            Some("uuid") => NamingStrategy::Uuid,
            Some(other) => {
                return Err(Error::Config(format!(
                    "FILTER_NAMING must be 'random' or 'uuid', got '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            transient_dir: lookup("FILTER_TRANSIENT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.transient_dir),
            naming,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
