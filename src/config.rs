use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::LoaderError;
use crate::models::{DEFAULT_BASE_URL, DEFAULT_BUCKET, DEFAULT_LAYOUT_DIR};

/// GCS requires every non-final resumable chunk to be a multiple of this.
pub const CHUNK_GRANULARITY: usize = 256 * 1024;
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub base_url: String,
    pub bucket: String,
    pub layout_dir: PathBuf,
    pub access_token: Option<String>,
    pub chunk_size: usize,
    pub http_timeout: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
            layout_dir: PathBuf::from(DEFAULT_LAYOUT_DIR),
            access_token: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECONDS),
        }
    }
}

impl LoaderConfig {
    pub fn from_env() -> Result<Self, LoaderError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from a variable lookup; unset or blank
    /// variables fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoaderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let base_url = var("JRDB_BASE_URL").unwrap_or(defaults.base_url);
        Url::parse(&base_url)?;

        let chunk_size = match var("UPLOAD_CHUNK_SIZE") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|error| {
                LoaderError::Config(format!("UPLOAD_CHUNK_SIZE must be a byte count: {error}"))
            })?,
            None => defaults.chunk_size,
        };

        let http_timeout = match var("HTTP_TIMEOUT_SECONDS") {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|error| {
                LoaderError::Config(format!("HTTP_TIMEOUT_SECONDS must be whole seconds: {error}"))
            })?),
            None => defaults.http_timeout,
        };

        Ok(Self {
            base_url,
            bucket: var("GCS_BUCKET").unwrap_or(defaults.bucket),
            layout_dir: var("LAYOUT_DIR").map_or(defaults.layout_dir, PathBuf::from),
            access_token: var("GCS_ACCESS_TOKEN"),
            chunk_size: normalize_chunk_size(chunk_size),
            http_timeout,
        })
    }
}

/// Rounds a requested chunk size up to the next multiple of
/// [`CHUNK_GRANULARITY`], with one granule as the minimum.
#[must_use]
pub fn normalize_chunk_size(requested: usize) -> usize {
    let granules = requested.div_ceil(CHUNK_GRANULARITY).max(1);
    granules.saturating_mul(CHUNK_GRANULARITY)
}
