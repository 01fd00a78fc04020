use std::time::Duration;

use log::debug;

use crate::clock::{Clock, wait_for};
use crate::page::{Page, ReadyState};

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const STATE_WAIT: Duration = Duration::from_millis(3000);
pub const PLAYER_WAIT: Duration = Duration::from_millis(5000);

/// Polls the page until its embedded state or its player is usable
pub struct PlayerStateWaiter<'a> {
    page: &'a dyn Page,
    clock: &'a dyn Clock,
    interval: Duration,
}

impl<'a> PlayerStateWaiter<'a> {
    pub fn new(page: &'a dyn Page, clock: &'a dyn Clock) -> Self {
        Self {
            page,
            clock,
            interval: POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Wait until the embedded player response carries a captions section
    pub async fn await_player_state(&self, max_wait: Duration) -> bool {
        let page = self.page;
        let ready = wait_for(self.clock, self.interval, max_wait, || {
            page.player_response().is_some_and(|pr| pr.captions.is_some())
        })
        .await;
        if ready {
            debug!("Player response with captions is available");
        } else {
            debug!("Player response wait timed out after {max_wait:?}");
        }
        ready
    }

    /// Wait until a playback element exists and can play its current frame
    pub async fn await_player_ready(&self, max_wait: Duration) -> bool {
        let page = self.page;
        let ready = wait_for(self.clock, self.interval, max_wait, || {
            page.media_ready_state()
                .is_some_and(|state| state >= ReadyState::HaveCurrentData)
        })
        .await;
        if ready {
            debug!("Player is ready");
        } else {
            debug!("Player readiness wait timed out after {max_wait:?}");
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::ManualClock;
    use crate::page::testing::{StubPage, player_response_json};

    #[tokio::test]
    async fn test_state_ready_after_hydration() {
        let clock = ManualClock::new();
        let page = StubPage {
            hydrate_after_reads: 3,
            ..StubPage::with_player_response(player_response_json(serde_json::json!({
                "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": []}}
            })))
        };
        let waiter = PlayerStateWaiter::new(&page, &clock);
        assert!(waiter.await_player_state(STATE_WAIT).await);
        assert_eq!(clock.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_state_without_captions_times_out() {
        let clock = ManualClock::new();
        let page = StubPage::with_player_response(player_response_json(serde_json::json!({
            "videoDetails": {"title": "no captions here"}
        })));
        let waiter = PlayerStateWaiter::new(&page, &clock);
        assert!(!waiter.await_player_state(STATE_WAIT).await);
        assert_eq!(clock.elapsed(), STATE_WAIT);
    }

    #[tokio::test]
    async fn test_player_ready_threshold() {
        let clock = ManualClock::new();
        let page = StubPage {
            ready_state: Some(ReadyState::HaveMetadata),
            ..Default::default()
        };
        let waiter = PlayerStateWaiter::new(&page, &clock);
        assert!(!waiter.await_player_ready(PLAYER_WAIT).await);
        assert_eq!(clock.elapsed(), PLAYER_WAIT);

        let clock = ManualClock::new();
        let page = StubPage {
            ready_state: Some(ReadyState::HaveCurrentData),
            ..Default::default()
        };
        let waiter = PlayerStateWaiter::new(&page, &clock);
        assert!(waiter.await_player_ready(PLAYER_WAIT).await);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_no_player_times_out() {
        let clock = ManualClock::new();
        let page = StubPage::default();
        let waiter = PlayerStateWaiter::new(&page, &clock).with_interval(Duration::from_millis(250));
        assert!(!waiter.await_player_ready(Duration::from_millis(1000)).await);
        assert_eq!(clock.sleeps().len(), 4);
    }
}
