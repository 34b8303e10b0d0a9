//! Catalog API seam: genre list and movie detail lookups.

use std::time::Duration;

use async_trait::async_trait;
use mdw_core::Genre;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog returned status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("catalog payload decode failed: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Full genre list (id, name pairs).
    async fn movie_genres(&self) -> Result<Vec<Genre>, CatalogError>;

    /// Full detail payload for one movie id, untyped.
    async fn movie_details(&self, movie_id: u64) -> Result<JsonValue, CatalogError>;
}

#[derive(Debug, Deserialize)]
struct GenreListResponse {
    genres: Vec<Genre>,
}

/// TMDB client. No retries by design; one uniform timeout.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .gzip(true)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn get_json(&self, path: &str) -> Result<JsonValue, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                url,
            });
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl CatalogApi for TmdbClient {
    async fn movie_genres(&self) -> Result<Vec<Genre>, CatalogError> {
        let value = self.get_json("/genre/movie/list").await?;
        let parsed: GenreListResponse =
            serde_json::from_value(value).map_err(|e| CatalogError::Decode(e.to_string()))?;
        info!(count = parsed.genres.len(), "fetched genre list");
        Ok(parsed.genres)
    }

    async fn movie_details(&self, movie_id: u64) -> Result<JsonValue, CatalogError> {
        self.get_json(&format!("/movie/{movie_id}")).await
    }
}
