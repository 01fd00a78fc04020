//! The hosting page as seen by the transcript pipeline.
//!
//! Everything here is read-only except [`Page::click_transcript_control`],
//! the one UI action the DOM fallback performs.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use serde::Deserialize;

use crate::TranscriptError;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const WATCH_URL: &str = "https://www.youtube.com/watch";
const PLAYER_SELECTOR: &str = "#movie_player, .html5-video-player";
const TRANSCRIPT_ROW_SELECTOR: &str = "ytd-transcript-segment-renderer";

static PLAYER_RESPONSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ytInitialPlayerResponse\s*=\s*\{").unwrap());

/// Embedded player state, the subset this crate reads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub captions: Option<Captions>,
    pub video_details: Option<VideoDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    pub tracklist: Option<CaptionTracklist>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTracklist {
    #[serde(default)]
    pub caption_tracks: Vec<TrackDescriptor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackDescriptor {
    pub language_code: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoDetails {
    pub title: Option<String>,
    pub short_description: Option<String>,
    pub author: Option<String>,
    pub channel_id: Option<String>,
}

impl PlayerResponse {
    pub fn caption_tracks(&self) -> &[TrackDescriptor] {
        self.captions
            .as_ref()
            .and_then(|c| c.tracklist.as_ref())
            .map(|t| t.caption_tracks.as_slice())
            .unwrap_or_default()
    }
}

/// HTML media element readiness, ordered like `HTMLMediaElement.readyState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub text: String,
    pub href: Option<String>,
}

/// One row of the page's rendered transcript panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSegment {
    pub text: String,
    pub timestamp: Option<String>,
}

pub trait Page: Send + Sync {
    /// Embedded player state, `None` until the page has hydrated it
    fn player_response(&self) -> Option<PlayerResponse>;

    /// Readiness of the playback element, `None` when there is no player
    fn media_ready_state(&self) -> Option<ReadyState>;

    /// Trimmed text content of the first element matching `selector`
    fn select_text(&self, selector: &str) -> Option<String>;

    fn select_link(&self, selector: &str) -> Option<Link>;

    /// Activate the first control whose accessible label mentions "transcript".
    /// Returns false when no such control exists.
    fn click_transcript_control(&self) -> bool;

    fn transcript_panel(&self) -> Vec<RenderedSegment>;

    /// Scheme, host and port of the page, e.g. `https://www.youtube.com`
    fn origin(&self) -> String;

    fn location(&self) -> String;
}

/// Static HTML snapshot of a watch page
#[derive(Debug)]
pub struct WatchPage {
    url: Url,
    html: String,
    player_response: Option<PlayerResponse>,
    transcript_opened: AtomicBool,
}

impl WatchPage {
    pub fn from_html(url: &str, html: impl Into<String>) -> Result<Self, TranscriptError> {
        let url = Url::parse(url).map_err(|e| TranscriptError::Page(format!("invalid page url {url}: {e}")))?;
        let html = html.into();
        let player_response = extract_player_response(&html);
        debug!(
            "Watch page snapshot: {} bytes, player response {}",
            html.len(),
            if player_response.is_some() { "present" } else { "absent" }
        );
        Ok(Self {
            url,
            html,
            player_response,
            transcript_opened: AtomicBool::new(false),
        })
    }

    /// Fetch the watch page for `video_id` and snapshot it
    pub async fn load(client: &reqwest::Client, video_id: &str) -> Result<Self, TranscriptError> {
        let url = format!("{WATCH_URL}?v={video_id}");
        debug!("Fetching watch page: {url}");

        let html = client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Self::from_html(&url, html)
    }

    fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }
}

impl Page for WatchPage {
    fn player_response(&self) -> Option<PlayerResponse> {
        self.player_response.clone()
    }

    fn media_ready_state(&self) -> Option<ReadyState> {
        // A snapshot never loads further, so a present player is as ready as it gets
        let has_player = Selector::parse(PLAYER_SELECTOR)
            .map(|sel| self.document().select(&sel).next().is_some())
            .unwrap_or(false);
        (has_player || self.player_response.is_some()).then_some(ReadyState::HaveEnoughData)
    }

    fn select_text(&self, selector: &str) -> Option<String> {
        let sel = Selector::parse(selector).ok()?;
        let document = self.document();
        let el = document.select(&sel).next()?;
        Some(el.text().collect::<String>().trim().to_string())
    }

    fn select_link(&self, selector: &str) -> Option<Link> {
        let sel = Selector::parse(selector).ok()?;
        let document = self.document();
        let el = document.select(&sel).next()?;
        Some(Link {
            text: el.text().collect::<String>().trim().to_string(),
            href: el.value().attr("href").map(str::to_string),
        })
    }

    fn click_transcript_control(&self) -> bool {
        let Ok(sel) = Selector::parse("[aria-label]") else {
            return false;
        };
        let found = self.document().select(&sel).any(|el| {
            el.value()
                .attr("aria-label")
                .is_some_and(|label| label.to_ascii_lowercase().contains("transcript"))
        });
        if found {
            self.transcript_opened.store(true, Ordering::SeqCst);
        }
        found
    }

    fn transcript_panel(&self) -> Vec<RenderedSegment> {
        if !self.transcript_opened.load(Ordering::SeqCst) {
            return Vec::new();
        }
        let (Ok(row), Ok(text), Ok(stamp)) = (
            Selector::parse(TRANSCRIPT_ROW_SELECTOR),
            Selector::parse(".segment-text"),
            Selector::parse(".segment-timestamp"),
        ) else {
            return Vec::new();
        };

        self.document()
            .select(&row)
            .map(|el| RenderedSegment {
                text: el
                    .select(&text)
                    .next()
                    .map(|t| t.text().collect::<String>().trim().to_string())
                    .unwrap_or_default(),
                timestamp: el
                    .select(&stamp)
                    .next()
                    .map(|t| t.text().collect::<String>().trim().to_string()),
            })
            .collect()
    }

    fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    fn location(&self) -> String {
        self.url.to_string()
    }
}

/// Decode the first `ytInitialPlayerResponse = {...}` assignment in the page
fn extract_player_response(html: &str) -> Option<PlayerResponse> {
    PLAYER_RESPONSE_RE.find_iter(html).find_map(|m| {
        let json_start = m.end() - 1;
        serde_json::Deserializer::from_str(&html[json_start..])
            .into_iter::<PlayerResponse>()
            .next()?
            .map_err(|e| debug!("Skipping undecodable player response at {json_start}: {e}"))
            .ok()
    })
}
