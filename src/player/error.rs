//! Player error taxonomy
//!
//! Nothing here is fatal: every variant maps to a visible, recoverable state.

/// User-visible playback errors of the current slot
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    /// The episode has no playable source. Rendered as "not available", no retry.
    #[error("This episode is not available")]
    SourceUnavailable,
    /// Replacing the source failed; the next navigation retries implicitly
    #[error("Could not load episode: {0}")]
    LoadFailed(String),
    /// The player reported an error status; cleared by the next ready load
    #[error("Playback error: {0}")]
    PlaybackFault(String),
    /// Watch history could not be saved; memory state stays authoritative
    #[error("Could not save watch history: {0}")]
    PersistenceFailure(String),
    /// The episode list could not be fetched
    #[error("Could not load episodes: {0}")]
    FetchFailed(String),
}
