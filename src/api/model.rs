//! Shows API model types
//!
//! Wire structures for the `/api/v1/shows` endpoints.

use serde::{Deserialize, Serialize};

/// A show as listed by the catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub dislikes: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Show detail with its episode list embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowWithEpisodes {
    #[serde(flatten)]
    pub show: Show,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

/// Episode as reported by the server.
///
/// `watched` is the server's view only; the local session view is layered on
/// top by [`crate::player::merge_watch_state`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub show_id: String,
    pub title: String,
    /// Position within the show, unique per show
    pub order: i64,
    #[serde(rename = "muxPlaybackId", alias = "playbackId", default)]
    pub playback_id: Option<String>,
    #[serde(default)]
    pub signed_playback_url: Option<String>,
    #[serde(default)]
    pub duration_sec: f64,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(rename = "watched", default)]
    pub watched_on_server: bool,
}

/// Server-side episode filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeFilter {
    #[default]
    All,
    Watched,
    Unwatched,
}

/// Episode sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeSortKey {
    Title,
    #[default]
    Order,
    CreatedAt,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Query options for the episode list endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_by: Option<EpisodeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<EpisodeSortKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<SortDirection>,
}

impl EpisodeQuery {
    /// The ordering the player depends on: `order` ascending, all episodes
    pub fn playback_order() -> Self {
        Self {
            filter_by: None,
            sort_by: Some(EpisodeSortKey::Order),
            order_by: Some(SortDirection::Asc),
        }
    }
}

/// Like (1) or dislike (0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingValue {
    Dislike,
    Like,
}

impl RatingValue {
    pub fn as_wire(self) -> u8 {
        match self {
            Self::Dislike => 0,
            Self::Like => 1,
        }
    }
}

impl Serialize for RatingValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for RatingValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Self::Dislike),
            1 => Ok(Self::Like),
            other => Err(serde::de::Error::custom(format!(
                "rating value must be 0 or 1, got {}",
                other
            ))),
        }
    }
}

/// Request body for `POST /shows/{id}/like`
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRatingRequest {
    pub rating_value: RatingValue,
}

/// Stored rating returned by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: String,
    pub show_id: String,
    pub rating_value: RatingValue,
    #[serde(default)]
    pub created_at: Option<String>,
}
