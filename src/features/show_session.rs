//! Shows started during this app session
//!
//! Memory only; drives "continue watching". The player runtime marks a show
//! when its first episode activates.

use crate::api::Show;

use super::id_set::{IdSnapshot, SharedIdSet};

#[derive(Debug, Clone, Default)]
pub struct ShowSession {
    started: SharedIdSet,
}

impl ShowSession {
    /// Returns whether this is the first start of the show
    pub fn mark_started(&self, show_id: &str) -> bool {
        self.started.insert(show_id)
    }

    pub fn has_started(&self, show_id: &str) -> bool {
        self.started.contains(show_id)
    }

    pub fn clear(&self) {
        self.started.clear();
    }

    pub fn snapshot(&self) -> IdSnapshot {
        self.started.snapshot()
    }

    /// The started subset of `shows`, in their order
    pub fn started_shows<'a>(&self, shows: &'a [Show]) -> Vec<&'a Show> {
        let started = self.snapshot();
        shows.iter().filter(|s| started.contains(&s.id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_start_is_reported_once() {
        let session = ShowSession::default();
        assert!(!session.has_started("s1"));
        assert!(session.mark_started("s1"));
        assert!(!session.mark_started("s1"));
        assert!(session.has_started("s1"));
    }

    #[test]
    fn clear_forgets_every_show() {
        let session = ShowSession::default();
        session.mark_started("s1");
        session.mark_started("s2");
        let before = session.snapshot();

        session.clear();
        assert!(session.snapshot().is_empty());
        assert_eq!(before.len(), 2);
    }
}
