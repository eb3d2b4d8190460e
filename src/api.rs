//! Shows API module
//!
//! Provides the catalogue client and the wire model it decodes.

pub mod model;
mod shows;

pub use model::{
    CreateRatingRequest, Episode, EpisodeFilter, EpisodeQuery, EpisodeSortKey, Rating,
    RatingValue, Show, ShowWithEpisodes, SortDirection,
};
pub use shows::{ApiError, ShowsClient, ShowsService};
