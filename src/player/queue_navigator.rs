//! Queue navigation - single source of truth for index calculations
//!
//! Everything that needs to know which episode comes next or previous
//! (auto-advance, preloading, swipe commits) goes through [`PlaybackQueue`].
//! Navigation is strictly sequential: no looping past either end.

use super::episode::EffectiveEpisode;

/// Index of the episode with `target_id`, or 0 when it is not in the list.
///
/// A missing id is not an error; the queue must stay positioned.
pub fn resolve_index(episodes: &[EffectiveEpisode], target_id: &str) -> usize {
    episodes
        .iter()
        .position(|e| e.id() == target_id)
        .unwrap_or(0)
}

/// Result of adjacent index calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjacentIndices {
    pub next: Option<usize>,
    pub prev: Option<usize>,
}

/// Ordered episodes of one show plus the current position
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackQueue {
    episodes: Vec<EffectiveEpisode>,
    current_index: usize,
}

impl PlaybackQueue {
    /// Build a queue positioned on `start_id`
    pub fn new(episodes: Vec<EffectiveEpisode>, start_id: &str) -> Self {
        let current_index = resolve_index(&episodes, start_id);
        Self {
            episodes,
            current_index,
        }
    }

    pub fn episodes(&self) -> &[EffectiveEpisode] {
        &self.episodes
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// Current index, `None` while the queue is empty
    pub fn current_index(&self) -> Option<usize> {
        (!self.episodes.is_empty()).then_some(self.current_index)
    }

    pub fn current(&self) -> Option<&EffectiveEpisode> {
        self.episodes.get(self.current_index)
    }

    pub fn next_index(&self) -> Option<usize> {
        let next = self.current_index + 1;
        (next < self.episodes.len()).then_some(next)
    }

    pub fn prev_index(&self) -> Option<usize> {
        if self.episodes.is_empty() || self.current_index == 0 {
            None
        } else {
            Some(self.current_index - 1)
        }
    }

    /// Get both adjacent indices at once
    pub fn adjacent_indices(&self) -> AdjacentIndices {
        AdjacentIndices {
            next: self.next_index(),
            prev: self.prev_index(),
        }
    }

    pub fn next(&self) -> Option<&EffectiveEpisode> {
        self.next_index().and_then(|i| self.episodes.get(i))
    }

    pub fn previous(&self) -> Option<&EffectiveEpisode> {
        self.prev_index().and_then(|i| self.episodes.get(i))
    }

    pub fn has_next(&self) -> bool {
        self.next_index().is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.prev_index().is_some()
    }

    /// Move to `index`. Out-of-range indices are rejected and leave the queue as is.
    pub fn advance_to(&mut self, index: usize) -> bool {
        if index >= self.episodes.len() {
            tracing::warn!(
                "Ignoring queue index {} (queue has {} episodes)",
                index,
                self.episodes.len()
            );
            return false;
        }
        self.current_index = index;
        true
    }

    /// Step forward. Returns `false` on the last episode.
    pub fn advance_next(&mut self) -> bool {
        match self.next_index() {
            Some(i) => self.advance_to(i),
            None => false,
        }
    }

    /// Step back. Returns `false` on the first episode.
    pub fn advance_previous(&mut self) -> bool {
        match self.prev_index() {
            Some(i) => self.advance_to(i),
            None => false,
        }
    }

    /// Whether `episodes` describes a different list than the current one
    /// (different ids or order), as opposed to an in-place flag update.
    pub fn is_same_list(&self, episodes: &[EffectiveEpisode]) -> bool {
        self.episodes.len() == episodes.len()
            && self
                .episodes
                .iter()
                .zip(episodes)
                .all(|(a, b)| a.id() == b.id())
    }

    /// Install a fresh list.
    ///
    /// A new list identity re-resolves the position from `start_id`; the same
    /// list with updated flags keeps the current index.
    pub fn replace(&mut self, episodes: Vec<EffectiveEpisode>, start_id: &str) -> bool {
        let identity_changed = !self.is_same_list(&episodes);
        if identity_changed {
            self.current_index = resolve_index(&episodes, start_id);
        }
        self.episodes = episodes;
        identity_changed
    }

    /// Flip the effective watched flag for one episode
    pub fn set_watched(&mut self, episode_id: &str, watched: bool) {
        if let Some(e) = self.episodes.iter_mut().find(|e| e.id() == episode_id) {
            e.watched = watched || e.episode.watched_on_server;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::episode::fixtures::episodes;
    use crate::player::merge_watch_state;
    use std::collections::HashSet;

    fn queue(count: usize, start: &str) -> PlaybackQueue {
        PlaybackQueue::new(merge_watch_state(&episodes(count), &HashSet::new()), start)
    }

    #[test]
    fn resolves_every_present_id() {
        for n in 1..6 {
            let list = merge_watch_state(&episodes(n), &HashSet::new());
            for (i, e) in list.iter().enumerate() {
                assert_eq!(resolve_index(&list, e.id()), i);
            }
            assert_eq!(resolve_index(&list, "missing"), 0);
        }
    }

    #[test]
    fn neighbours_stay_in_bounds() {
        for n in 1..5 {
            for start in 0..n {
                let q = queue(n, &format!("ep{}", start));
                let adj = q.adjacent_indices();
                assert!(adj.next.is_none_or(|i| i < n));
                assert!(adj.prev.is_none_or(|i| i < n));
                assert_eq!(adj.next.is_none(), start == n - 1);
                assert_eq!(adj.prev.is_none(), start == 0);
            }
        }
    }

    #[test]
    fn empty_queue_has_no_current() {
        let q = PlaybackQueue::default();
        assert!(q.current().is_none());
        assert!(q.current_index().is_none());
        assert!(q.next().is_none());
        assert!(q.previous().is_none());
    }

    #[test]
    fn advance_stops_at_the_ends() {
        let mut q = queue(2, "ep0");
        assert!(!q.advance_previous());
        assert!(q.advance_next());
        assert_eq!(q.current().unwrap().id(), "ep1");
        assert!(!q.advance_next());
        assert_eq!(q.current_index(), Some(1));
        assert!(!q.advance_to(7));
    }

    #[test]
    fn flag_update_keeps_position() {
        let mut q = queue(3, "ep0");
        q.advance_next();

        let mut watched = HashSet::new();
        watched.insert("ep0".to_string());
        let same = merge_watch_state(&episodes(3), &watched);
        assert!(!q.replace(same, "ep0"));
        assert_eq!(q.current_index(), Some(1));
        assert!(q.episodes()[0].watched);

        let other = merge_watch_state(&episodes(5), &watched);
        assert!(q.replace(other, "ep3"));
        assert_eq!(q.current_index(), Some(3));
    }
}
