//! Auto-hiding playback controls
//!
//! Every [`ControlsTimer::show`] restarts the hide delay. Only the task armed by
//! the latest call survives, so a burst of interactions yields exactly one hide,
//! one delay after the last of them.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Sent when the hide delay elapsed.
///
/// Carries the generation of the `show()` that armed it so a late delivery
/// from an earlier arm can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlsHidden {
    pub generation: u64,
}

pub type ControlsHiddenSender = mpsc::UnboundedSender<ControlsHidden>;
pub type ControlsHiddenReceiver = mpsc::UnboundedReceiver<ControlsHidden>;

/// Create a channel for hide notifications
pub fn controls_channel() -> (ControlsHiddenSender, ControlsHiddenReceiver) {
    mpsc::unbounded_channel()
}

/// Debounced hide timer. Must be used inside a tokio runtime.
pub struct ControlsTimer {
    delay: Duration,
    visible: bool,
    generation: u64,
    pending: Option<JoinHandle<()>>,
    hidden_tx: ControlsHiddenSender,
}

impl std::fmt::Debug for ControlsTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlsTimer")
            .field("delay", &self.delay)
            .field("visible", &self.visible)
            .field("generation", &self.generation)
            .finish()
    }
}

impl ControlsTimer {
    pub fn new(delay: Duration, hidden_tx: ControlsHiddenSender) -> Self {
        Self {
            delay,
            visible: false,
            generation: 0,
            pending: None,
            hidden_tx,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Reveal the controls and restart the hide delay
    pub fn show(&mut self) {
        self.cancel();
        self.visible = true;
        self.generation += 1;

        let generation = self.generation;
        let delay = self.delay;
        let tx = self.hidden_tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ControlsHidden { generation });
        }));
    }

    /// Hide immediately without waiting for the delay
    pub fn hide(&mut self) {
        self.cancel();
        self.visible = false;
    }

    /// Apply a hide notification. Returns `true` if the controls were hidden.
    pub fn on_hidden(&mut self, hidden: ControlsHidden) -> bool {
        if hidden.generation != self.generation || !self.visible {
            return false;
        }
        self.pending = None;
        self.visible = false;
        true
    }

    fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

impl Drop for ControlsTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Instant, sleep};

    const DELAY: Duration = Duration::from_secs(3);

    #[tokio::test(start_paused = true)]
    async fn burst_of_shows_hides_once() {
        let (tx, mut rx) = controls_channel();
        let mut timer = ControlsTimer::new(DELAY, tx);

        timer.show();
        sleep(Duration::from_secs(1)).await;
        timer.show();
        sleep(Duration::from_secs(1)).await;
        timer.show();
        let last_show = Instant::now();

        let hidden = rx.recv().await.unwrap();
        let waited = Instant::now() - last_show;
        assert!(waited >= DELAY && waited < DELAY + Duration::from_millis(10));
        assert!(timer.on_hidden(hidden));
        assert!(!timer.is_visible());

        sleep(DELAY * 3).await;
        assert!(rx.try_recv().is_err(), "only one hide per burst");
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_is_ignored() {
        let (tx, mut rx) = controls_channel();
        let mut timer = ControlsTimer::new(DELAY, tx);

        timer.show();
        let hidden = rx.recv().await.unwrap();
        timer.show();
        assert!(!timer.on_hidden(hidden));
        assert!(timer.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_pending_hide() {
        let (tx, mut rx) = controls_channel();
        let mut timer = ControlsTimer::new(DELAY, tx);
        timer.show();
        drop(timer);

        sleep(DELAY * 2).await;
        assert!(rx.recv().await.is_none());
    }
}
