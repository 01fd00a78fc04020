use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::clock::Clock;
use crate::page::Page;
use crate::strategy::{Outcome, TranscriptStrategy};
use crate::tracks::FetchPlan;
use crate::{Segment, TranscriptError};

pub const SETTLE_DELAY: Duration = Duration::from_millis(1500);

/// Last resort: open the page's transcript panel and read what it renders
pub struct DomTranscriptScraper {
    page: Arc<dyn Page>,
    clock: Arc<dyn Clock>,
    settle: Duration,
}

impl DomTranscriptScraper {
    pub fn new(page: Arc<dyn Page>, clock: Arc<dyn Clock>) -> Self {
        Self {
            page,
            clock,
            settle: SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// `Absent` when the page has no transcript control, `Miss` when the panel rendered nothing
    pub async fn scrape(&self) -> Outcome {
        debug!("Trying to get transcript from page UI");
        if !self.page.click_transcript_control() {
            debug!("No transcript control on the page");
            return Outcome::Absent;
        }

        self.clock.sleep(self.settle).await;

        let segments: Vec<Segment> = self
            .page
            .transcript_panel()
            .into_iter()
            .filter(|row| !row.text.trim().is_empty())
            .map(|row| Segment {
                start: row.timestamp.as_deref().map(parse_timestamp).unwrap_or(0.0),
                duration: 0.0,
                text: row.text.trim().to_string(),
            })
            .collect();

        if segments.is_empty() {
            debug!("Transcript panel rendered no segments");
            return Outcome::Miss;
        }
        debug!("Read {} segments from transcript panel", segments.len());
        Outcome::Found(segments)
    }
}

#[async_trait]
impl TranscriptStrategy for DomTranscriptScraper {
    fn name(&self) -> &'static str {
        "dom-transcript"
    }

    async fn attempt(&self, _plan: &FetchPlan) -> Result<Outcome, TranscriptError> {
        Ok(self.scrape().await)
    }
}

/// Parse "h:mm:ss", "m:ss" or "s" into seconds; the last field is seconds.
/// Unparsable fields count as 0.
pub fn parse_timestamp(stamp: &str) -> f64 {
    stamp
        .trim()
        .split(':')
        .rev()
        .enumerate()
        .map(|(i, part)| part.trim().parse::<u64>().unwrap_or(0).saturating_mul(60u64.saturating_pow(i as u32)))
        .fold(0u64, u64::saturating_add) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::ManualClock;
    use crate::page::RenderedSegment;
    use crate::page::testing::StubPage;

    fn row(stamp: &str, text: &str) -> RenderedSegment {
        RenderedSegment {
            text: text.to_string(),
            timestamp: Some(stamp.to_string()),
        }
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("1:25:30"), 5130.0);
        assert_eq!(parse_timestamp("0:30"), 30.0);
        assert_eq!(parse_timestamp("45"), 45.0);
        assert_eq!(parse_timestamp(" 12:05 "), 725.0);
        assert_eq!(parse_timestamp("x:10"), 10.0);
        assert_eq!(parse_timestamp(""), 0.0);
    }

    #[tokio::test]
    async fn test_scrape_reads_panel_after_settle() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(StubPage {
            has_transcript_control: true,
            panel: vec![row("0:05", " first "), row("0:07", "   "), row("1:00:01", "last")],
            ..Default::default()
        });
        let scraper = DomTranscriptScraper::new(page.clone(), clock.clone());

        let segments = scraper.scrape().await.into_segments().unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "first");
        assert_eq!(segments[0].start, 5.0);
        assert_eq!(segments[1].start, 3601.0);
        assert!(segments.iter().all(|s| s.duration == 0.0));
        assert_eq!(clock.sleeps(), vec![SETTLE_DELAY]);
        assert_eq!(page.clicks(), 1);
    }

    #[tokio::test]
    async fn test_scrape_without_control_is_absent_and_does_not_wait() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(StubPage::default());
        let scraper = DomTranscriptScraper::new(page, clock.clone());
        assert_eq!(scraper.scrape().await, Outcome::Absent);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_scrape_empty_panel_is_miss() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(StubPage {
            has_transcript_control: true,
            panel: vec![row("0:01", "")],
            ..Default::default()
        });
        let scraper = DomTranscriptScraper::new(page, clock).with_settle_delay(Duration::from_millis(10));
        assert_eq!(scraper.scrape().await, Outcome::Miss);
    }

    #[tokio::test]
    async fn test_missing_timestamp_starts_at_zero() {
        let clock = Arc::new(ManualClock::new());
        let page = Arc::new(StubPage {
            has_transcript_control: true,
            panel: vec![RenderedSegment {
                text: "untimed".to_string(),
                timestamp: None,
            }],
            ..Default::default()
        });
        let scraper = DomTranscriptScraper::new(page, clock);
        let segments = scraper.scrape().await.into_segments().unwrap();
        assert_eq!(segments[0].start, 0.0);
    }
}
