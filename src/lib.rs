pub mod clock;
pub mod config;
pub mod dom;
pub mod error;
pub mod metadata;
pub mod output;
pub mod page;
pub mod pipeline;
pub mod strategy;
pub mod summarize;
pub mod tracks;
pub mod view;
pub mod waiter;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

pub use error::TranscriptError;

/// A single captioned segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

/// One caption stream advertised by the page.
///
/// `fetch_url` is signed for the current page session and must not outlive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    pub language_code: String,
    pub fetch_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
    pub name: String,
    pub url: String,
    pub channel_id: String,
}

/// Output of the transcript pipeline for one video
#[derive(Debug, Clone)]
pub struct TranscriptResult {
    pub segments: Vec<Segment>,
    pub description: String,
    pub channel_info: ChannelInfo,
}

impl Serialize for TranscriptResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TranscriptResult", 4)?;
        state.serialize_field("segments", &self.segments)?;
        state.serialize_field("plainText", &self.plain_text())?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("channelInfo", &self.channel_info)?;
        state.end()
    }
}

impl TranscriptResult {
    /// Segment texts joined with single spaces, in source order
    pub fn plain_text(&self) -> String {
        plain_text(&self.segments)
    }
}

pub fn plain_text(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ")
}

/// Everything the summary flow needs about one video
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub transcript: String,
    pub transcript_segments: Vec<Segment>,
    pub description: String,
    pub channel_info: ChannelInfo,
}

static VIDEO_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^([a-zA-Z0-9_-]{11})$",
        r"youtube\.com/watch\?(?:.*&)?v=([a-zA-Z0-9_-]{11})",
        r"youtu\.be/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/embed/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/shorts/([a-zA-Z0-9_-]{11})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Extract video ID from a bare ID or any of the common YouTube URL shapes
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(input))
        .map(|caps| caps[1].to_string())
}
