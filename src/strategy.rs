use async_trait::async_trait;
use log::debug;

use crate::tracks::FetchPlan;
use crate::youtube::TranscriptFetcher;
use crate::{Segment, TranscriptError};

/// Result of one strategy within one attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Found(Vec<Segment>),
    /// Nothing usable this time; worth retrying
    Miss,
    /// The source positively reported that there is nothing to find
    Absent,
}

impl Outcome {
    pub fn into_segments(self) -> Option<Vec<Segment>> {
        match self {
            Outcome::Found(segments) => Some(segments),
            Outcome::Miss | Outcome::Absent => None,
        }
    }
}

/// One way of getting a transcript; strategies run in a fixed order until one finds segments
#[async_trait]
pub trait TranscriptStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, plan: &FetchPlan) -> Result<Outcome, TranscriptError>;
}

/// Fetch the page's own signed URL for the preferred track
pub struct PreferredTrackStrategy {
    fetcher: TranscriptFetcher,
}

impl PreferredTrackStrategy {
    pub fn new(fetcher: TranscriptFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl TranscriptStrategy for PreferredTrackStrategy {
    fn name(&self) -> &'static str {
        "preferred-track"
    }

    async fn attempt(&self, plan: &FetchPlan) -> Result<Outcome, TranscriptError> {
        let Some(ref url) = plan.preferred_url else {
            debug!("No preferred track URL to try");
            return Ok(Outcome::Absent);
        };
        self.fetcher.fetch_via_preferred_track(url).await
    }
}

/// Walk the language list against the public timed-text endpoint
pub struct LanguageListStrategy {
    fetcher: TranscriptFetcher,
}

impl LanguageListStrategy {
    pub fn new(fetcher: TranscriptFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl TranscriptStrategy for LanguageListStrategy {
    fn name(&self) -> &'static str {
        "language-list"
    }

    async fn attempt(&self, plan: &FetchPlan) -> Result<Outcome, TranscriptError> {
        self.fetcher.fetch_via_language_list(&plan.video_id, &plan.languages).await
    }
}
