//! Transcript acquisition: wait for the page, resolve tracks, run the
//! strategy chain, retry on exhaustion.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::dom::{DomTranscriptScraper, SETTLE_DELAY};
use crate::metadata::{Metadata, MetadataExtractor};
use crate::page::Page;
use crate::strategy::{LanguageListStrategy, Outcome, PreferredTrackStrategy, TranscriptStrategy};
use crate::tracks::{CaptionTrackResolver, default_fallback_languages};
use crate::waiter::{PLAYER_WAIT, POLL_INTERVAL, PlayerStateWaiter, STATE_WAIT};
use crate::youtube::TranscriptFetcher;
use crate::{Segment, TranscriptError, TranscriptResult, VideoInfo, plain_text};

pub const MAX_RETRIES: u32 = 2;
pub const RETRY_BACKOFF: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub poll_interval: Duration,
    pub state_wait: Duration,
    pub player_wait: Duration,
    pub settle_delay: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub fallback_languages: Vec<String>,
    /// Stop at once when every source reports that captions do not exist
    pub fail_fast_without_captions: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            state_wait: STATE_WAIT,
            player_wait: PLAYER_WAIT,
            settle_delay: SETTLE_DELAY,
            max_retries: MAX_RETRIES,
            retry_backoff: RETRY_BACKOFF,
            fallback_languages: default_fallback_languages(),
            fail_fast_without_captions: true,
        }
    }
}

/// Retry state machine for one transcript request
#[derive(Debug)]
pub enum AttemptState {
    Attempting(u32),
    Success(Vec<Segment>),
    /// Carries the error seen on the final attempt, if any
    ExhaustedFailure(Option<TranscriptError>),
}

enum AttemptResult {
    Found(Vec<Segment>),
    Exhausted {
        definitive: bool,
        cause: Option<TranscriptError>,
    },
}

/// Reported instead of a [`VideoInfo`] when no transcript could be obtained
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfoError {
    pub error: String,
    pub video_id: String,
    pub title: String,
}

impl std::fmt::Display for VideoInfoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for VideoInfoError {}

pub struct Pipeline {
    page: Arc<dyn Page>,
    clock: Arc<dyn Clock>,
    strategies: Vec<Box<dyn TranscriptStrategy>>,
    settings: PipelineSettings,
    in_flight: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        page: Arc<dyn Page>,
        clock: Arc<dyn Clock>,
        strategies: Vec<Box<dyn TranscriptStrategy>>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            page,
            clock,
            strategies,
            settings,
            in_flight: Mutex::new(()),
        }
    }

    /// The full chain: preferred track, language list, then the page's transcript panel
    pub fn standard(
        page: Arc<dyn Page>,
        clock: Arc<dyn Clock>,
        fetcher: TranscriptFetcher,
        settings: PipelineSettings,
    ) -> Self {
        let dom = DomTranscriptScraper::new(page.clone(), clock.clone()).with_settle_delay(settings.settle_delay);
        let strategies: Vec<Box<dyn TranscriptStrategy>> = vec![
            Box::new(PreferredTrackStrategy::new(fetcher.clone())),
            Box::new(LanguageListStrategy::new(fetcher)),
            Box::new(dom),
        ];
        Self::new(page, clock, strategies, settings)
    }

    /// Transcript plus metadata, or a single error. Runs on one pipeline are serialized.
    pub async fn run(&self, video_id: &str) -> Result<TranscriptResult, TranscriptError> {
        let (metadata, segments) = self.run_with_metadata(video_id).await;
        Ok(TranscriptResult {
            segments: segments?,
            description: metadata.description,
            channel_info: metadata.channel_info,
        })
    }

    /// Everything the summary backend needs for one video
    pub async fn video_info(&self, video_id: &str) -> Result<VideoInfo, VideoInfoError> {
        let (metadata, segments) = self.run_with_metadata(video_id).await;
        match segments {
            Ok(segments) => Ok(VideoInfo {
                video_id: video_id.to_string(),
                title: metadata.title,
                url: self.page.location(),
                transcript: plain_text(&segments),
                transcript_segments: segments,
                description: metadata.description,
                channel_info: metadata.channel_info,
            }),
            Err(e) => Err(VideoInfoError {
                error: e.to_string(),
                video_id: video_id.to_string(),
                title: metadata.title,
            }),
        }
    }

    async fn run_with_metadata(&self, video_id: &str) -> (Metadata, Result<Vec<Segment>, TranscriptError>) {
        let _guard = self.in_flight.lock().await;
        let metadata = MetadataExtractor::new(&*self.page)
            .extract(&*self.clock, self.settings.state_wait)
            .await;
        let segments = self.fetch_transcript(video_id).await;
        (metadata, segments)
    }

    /// Run attempts until one finds segments or the retry budget is spent
    pub async fn fetch_transcript(&self, video_id: &str) -> Result<Vec<Segment>, TranscriptError> {
        let mut state = AttemptState::Attempting(0);
        loop {
            state = match state {
                AttemptState::Attempting(n) => {
                    info!("Attempting to fetch transcript for {video_id} (attempt {})", n + 1);
                    match self.attempt(video_id).await {
                        AttemptResult::Found(segments) => AttemptState::Success(segments),
                        AttemptResult::Exhausted { definitive: true, .. }
                            if self.settings.fail_fast_without_captions =>
                        {
                            info!("No source has captions for {video_id}, not retrying");
                            return Err(TranscriptError::NoCaptions);
                        }
                        AttemptResult::Exhausted { cause, .. } if n < self.settings.max_retries => {
                            if let Some(ref e) = cause {
                                debug!("Attempt {} ended with error: {e}", n + 1);
                            }
                            info!(
                                "Retrying transcript fetch ({}/{}) in {:?}",
                                n + 1,
                                self.settings.max_retries,
                                self.settings.retry_backoff
                            );
                            self.clock.sleep(self.settings.retry_backoff).await;
                            AttemptState::Attempting(n + 1)
                        }
                        AttemptResult::Exhausted { cause, .. } => AttemptState::ExhaustedFailure(cause),
                    }
                }
                AttemptState::Success(segments) => {
                    info!("Fetched transcript for {video_id}: {} segments", segments.len());
                    return Ok(segments);
                }
                AttemptState::ExhaustedFailure(cause) => {
                    warn!("No transcript found for {video_id} using any method");
                    return Err(match cause {
                        Some(e) => TranscriptError::FetchFailed(e.to_string()),
                        None => TranscriptError::NoCaptions,
                    });
                }
            };
        }
    }

    async fn attempt(&self, video_id: &str) -> AttemptResult {
        let waiter = PlayerStateWaiter::new(&*self.page, &*self.clock).with_interval(self.settings.poll_interval);
        waiter.await_player_ready(self.settings.player_wait).await;
        waiter.await_player_state(self.settings.state_wait).await;

        let plan = CaptionTrackResolver::new(&*self.page).plan(video_id, &self.settings.fallback_languages);

        let mut all_absent = true;
        let mut cause = None;
        for strategy in &self.strategies {
            match strategy.attempt(&plan).await {
                Ok(Outcome::Found(segments)) if !segments.is_empty() => {
                    debug!("Strategy {} found {} segments", strategy.name(), segments.len());
                    return AttemptResult::Found(segments);
                }
                Ok(Outcome::Absent) => debug!("Strategy {} reports no captions", strategy.name()),
                Ok(_) => {
                    debug!("Strategy {} missed", strategy.name());
                    all_absent = false;
                }
                Err(e) => {
                    warn!("Strategy {} failed: {e}", strategy.name());
                    all_absent = false;
                    cause = Some(e);
                }
            }
        }

        // Missing player state proves nothing; it may still be loading
        AttemptResult::Exhausted {
            definitive: all_absent && plan.has_player_state && !plan.has_embedded_tracks,
            cause,
        }
    }
}
