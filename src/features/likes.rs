//! Liked shows on this device
//!
//! Kept in memory for the life of the process. [`Likes::rate`] applies the
//! rating locally before the server call and reverts it if the call fails.

use anyhow::Result;

use crate::api::{Rating, RatingValue, Show, ShowsService};

use super::id_set::{IdSnapshot, SharedIdSet};

#[derive(Debug, Clone, Default)]
pub struct Likes {
    liked: SharedIdSet,
}

impl Likes {
    pub fn like(&self, show_id: &str) -> bool {
        self.liked.insert(show_id)
    }

    pub fn unlike(&self, show_id: &str) -> bool {
        self.liked.remove(show_id)
    }

    pub fn is_liked(&self, show_id: &str) -> bool {
        self.liked.contains(show_id)
    }

    pub fn clear(&self) {
        self.liked.clear();
    }

    pub fn snapshot(&self) -> IdSnapshot {
        self.liked.snapshot()
    }

    /// The liked subset of `shows`, in their order
    pub fn liked_shows<'a>(&self, shows: &'a [Show]) -> Vec<&'a Show> {
        let liked = self.snapshot();
        shows.iter().filter(|s| liked.contains(&s.id)).collect()
    }

    /// Rate a show on the server, updating the local set optimistically
    pub async fn rate(
        &self,
        shows: &dyn ShowsService,
        show_id: &str,
        value: RatingValue,
    ) -> Result<Rating> {
        let was_liked = self.is_liked(show_id);
        match value {
            RatingValue::Like => self.like(show_id),
            RatingValue::Dislike => self.unlike(show_id),
        };

        match shows.like_show(show_id, value).await {
            Ok(rating) => Ok(rating),
            Err(e) => {
                tracing::warn!("Rating show {} failed, reverting: {:#}", show_id, e);
                if was_liked {
                    self.like(show_id);
                } else {
                    self.unlike(show_id);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Episode, EpisodeQuery, ShowWithEpisodes};
    use async_trait::async_trait;

    struct RatingService {
        fail: bool,
    }

    #[async_trait]
    impl ShowsService for RatingService {
        async fn get_shows(&self) -> Result<Vec<Show>> {
            Ok(Vec::new())
        }

        async fn get_show(&self, show_id: &str) -> Result<ShowWithEpisodes> {
            anyhow::bail!("show {} not stubbed", show_id)
        }

        async fn get_show_episodes(
            &self,
            _show_id: &str,
            _query: EpisodeQuery,
        ) -> Result<Vec<Episode>> {
            Ok(Vec::new())
        }

        async fn like_show(&self, show_id: &str, value: RatingValue) -> Result<Rating> {
            if self.fail {
                anyhow::bail!("503 Service Unavailable");
            }
            Ok(Rating {
                id: "r-1".to_string(),
                show_id: show_id.to_string(),
                rating_value: value,
                created_at: None,
            })
        }
    }

    fn show(id: &str) -> Show {
        Show {
            id: id.to_string(),
            title: format!("Show {}", id),
            description: None,
            cover_url: None,
            likes: 0,
            dislikes: 0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn like_and_unlike_locally() {
        let likes = Likes::default();
        assert!(likes.like("s1"));
        assert!(!likes.like("s1"));
        assert!(likes.is_liked("s1"));

        let before = likes.snapshot();
        assert!(likes.unlike("s1"));
        assert!(before.contains("s1"));
        assert!(!likes.is_liked("s1"));
    }

    #[test]
    fn liked_shows_keep_catalogue_order() {
        let likes = Likes::default();
        likes.like("c");
        likes.like("a");
        let shows = [show("a"), show("b"), show("c")];

        let ids: Vec<&str> = likes.liked_shows(&shows).iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        likes.clear();
        assert!(likes.liked_shows(&shows).is_empty());
    }

    #[tokio::test]
    async fn rate_keeps_the_like_on_success() {
        let likes = Likes::default();
        let rating = likes
            .rate(&RatingService { fail: false }, "s1", RatingValue::Like)
            .await
            .unwrap();
        assert_eq!(rating.rating_value, RatingValue::Like);
        assert!(likes.is_liked("s1"));
    }

    #[tokio::test]
    async fn failed_rate_reverts() {
        let service = RatingService { fail: true };
        let likes = Likes::default();

        assert!(likes.rate(&service, "s1", RatingValue::Like).await.is_err());
        assert!(!likes.is_liked("s1"));

        likes.like("s2");
        assert!(likes.rate(&service, "s2", RatingValue::Dislike).await.is_err());
        assert!(likes.is_liked("s2"));
    }
}
