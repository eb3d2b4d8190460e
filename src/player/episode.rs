//! Episodes as the player sees them: server data plus the local watched view

use std::collections::HashSet;

use crate::api::Episode;

/// Episode with its effective watched flag
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveEpisode {
    pub episode: Episode,
    /// `watched_on_server || locally watched`
    pub watched: bool,
}

impl EffectiveEpisode {
    pub fn id(&self) -> &str {
        &self.episode.id
    }
}

/// Overlay local watched ids onto server episodes.
///
/// Order is preserved; sorting is the data service's job.
pub fn merge_watch_state(
    server_episodes: &[Episode],
    local_watched: &HashSet<String>,
) -> Vec<EffectiveEpisode> {
    server_episodes
        .iter()
        .map(|episode| EffectiveEpisode {
            watched: episode.watched_on_server || local_watched.contains(&episode.id),
            episode: episode.clone(),
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn local(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn watched_uses_or_semantics() {
        let mut server = episodes(4);
        server[0].watched_on_server = true;
        server[1].watched_on_server = true;

        let merged = merge_watch_state(&server, &local(&["ep1", "ep2"]));
        let flags: Vec<bool> = merged.iter().map(|e| e.watched).collect();
        // server-only, both, local-only, neither
        assert_eq!(flags, vec![true, true, true, false]);
    }

    #[test]
    fn merge_is_idempotent_and_order_preserving() {
        let server = vec![episode("c", 3), episode("a", 1), episode("b", 2)];
        let ids = local(&["a"]);

        let once = merge_watch_state(&server, &ids);
        let plain: Vec<Episode> = once.iter().map(|e| e.episode.clone()).collect();
        let twice = merge_watch_state(&plain, &ids);

        assert_eq!(once, twice);
        let order: Vec<&str> = once.iter().map(|e| e.id()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn unknown_local_ids_are_ignored() {
        let merged = merge_watch_state(&episodes(2), &local(&["elsewhere"]));
        assert!(merged.iter().all(|e| !e.watched));
    }
}
