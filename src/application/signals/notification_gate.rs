use crate::domain::signal::{Classification, SignalEpisode, SignalSide};
use tracing::info;

/// What the caller should do with this cycle's classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Hold; any running episode has ended
    Idle,
    /// The current episode was already notified
    AlreadyNotified(SignalSide),
    /// A new episode starts: send one notification, then `confirm_delivery`
    Notify(SignalSide),
}

/// Edge-triggered latch allowing one notification per signal episode.
///
/// The latch only closes on [`NotificationGate::confirm_delivery`], so a failed
/// send is attempted again on the next cycle that is still strong.
#[derive(Debug, Clone, Default)]
pub struct NotificationGate {
    episode: SignalEpisode,
}

impl NotificationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn episode(&self) -> SignalEpisode {
        self.episode
    }

    pub fn on_signal(&mut self, classification: Classification) -> GateDecision {
        match classification.strong_side() {
            None => {
                if let SignalEpisode::Active(side) = self.episode {
                    info!("NotificationGate: {} episode ended", side.as_str());
                }
                self.episode = SignalEpisode::Inactive;
                GateDecision::Idle
            }
            Some(side) if self.episode == SignalEpisode::Active(side) => {
                GateDecision::AlreadyNotified(side)
            }
            Some(side) => {
                if let SignalEpisode::Active(previous) = self.episode {
                    info!(
                        "NotificationGate: Signal flipped from {} to {}",
                        previous.as_str(),
                        side.as_str()
                    );
                }
                // A flip closes the previous episode before the new one is confirmed
                self.episode = SignalEpisode::Inactive;
                GateDecision::Notify(side)
            }
        }
    }

    /// Latch the episode after the notification for `side` was delivered
    pub fn confirm_delivery(&mut self, side: SignalSide) {
        info!("NotificationGate: {} episode notified", side.as_str());
        self.episode = SignalEpisode::Active(side);
    }
}
