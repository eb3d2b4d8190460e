//! Shows REST client

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::model::{
    CreateRatingRequest, Episode, EpisodeQuery, Rating, RatingValue, Show, ShowWithEpisodes,
};
use crate::features::ApiSettings;

/// Typed failures of the shows API
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("show {0} not found")]
    NotFound(String),
    #[error("upstream status {status} for {path}")]
    Status { status: StatusCode, path: String },
}

/// Data collaborator consumed by the player.
///
/// The player only relies on `get_show_episodes` returning episodes in the
/// order requested by the query.
#[async_trait]
pub trait ShowsService: Send + Sync {
    async fn get_shows(&self) -> Result<Vec<Show>>;
    async fn get_show(&self, show_id: &str) -> Result<ShowWithEpisodes>;
    async fn get_show_episodes(&self, show_id: &str, query: EpisodeQuery) -> Result<Vec<Episode>>;
    async fn like_show(&self, show_id: &str, value: RatingValue) -> Result<Rating>;
}

/// HTTP implementation of [`ShowsService`]
#[derive(Clone)]
pub struct ShowsClient {
    client: Client,
    base_url: String,
}

impl std::fmt::Debug for ShowsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShowsClient")
            .field("client", &"<HttpClient>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ShowsClient {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(8))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(&self, resp: reqwest::Response, path: &str) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        tracing::warn!("Shows API {} returned {}", path, status);
        Err(ApiError::Status {
            status,
            path: path.to_string(),
        }
        .into())
    }
}

#[async_trait]
impl ShowsService for ShowsClient {
    async fn get_shows(&self) -> Result<Vec<Show>> {
        let path = "/api/v1/shows";
        let resp = self.client.get(self.url(path)).send().await?;
        let shows = self.check(resp, path).await?.json().await?;
        Ok(shows)
    }

    async fn get_show(&self, show_id: &str) -> Result<ShowWithEpisodes> {
        let path = format!("/api/v1/shows/{}", show_id);
        let resp = self.client.get(self.url(&path)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(show_id.to_string()).into());
        }
        let show = self.check(resp, &path).await?.json().await?;
        Ok(show)
    }

    async fn get_show_episodes(&self, show_id: &str, query: EpisodeQuery) -> Result<Vec<Episode>> {
        let path = format!("/api/v1/shows/{}/episodes", show_id);
        let resp = self
            .client
            .get(self.url(&path))
            .query(&query)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(show_id.to_string()).into());
        }
        let episodes: Vec<Episode> = self
            .check(resp, &path)
            .await?
            .json()
            .await
            .with_context(|| format!("invalid episode list for show {}", show_id))?;
        tracing::debug!("Fetched {} episodes for show {}", episodes.len(), show_id);
        Ok(episodes)
    }

    async fn like_show(&self, show_id: &str, value: RatingValue) -> Result<Rating> {
        let path = format!("/api/v1/shows/{}/like", show_id);
        let resp = self
            .client
            .post(self.url(&path))
            .json(&CreateRatingRequest {
                rating_value: value,
            })
            .send()
            .await?;
        let rating = self.check(resp, &path).await?.json().await?;
        Ok(rating)
    }
}
