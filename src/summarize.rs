//! Client for the remote summary service. The service owns caching; this
//! side only looks summaries up by video id and requests new ones.

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ChannelInfo, VideoInfo};

pub const DEFAULT_STYLE: &str = "paragraph";

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("{0}")]
    Backend(String),

    #[error("summary request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Segment as the backend wants it: whole seconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummarySegment {
    pub start: u64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub transcript: String,
    pub description: String,
    #[serde(rename = "channel_info")]
    pub channel_info: ChannelInfo,
    #[serde(rename = "transcript_segments")]
    pub transcript_segments: Vec<SummarySegment>,
    pub style: String,
}

impl SummaryRequest {
    pub fn from_video_info(info: &VideoInfo, style: &str) -> Self {
        Self {
            video_id: info.video_id.clone(),
            title: info.title.clone(),
            url: info.url.clone(),
            transcript: info.transcript.clone(),
            description: info.description.clone(),
            channel_info: info.channel_info.clone(),
            transcript_segments: info
                .transcript_segments
                .iter()
                .map(|s| SummarySegment {
                    start: s.start.max(0.0).floor() as u64,
                    text: s.text.clone(),
                })
                .collect(),
            style: style.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SectionSummary {
    pub start: String,
    pub end: String,
    pub summary: String,
    pub takeaway: String,
    pub key_points: Vec<String>,
    pub key_takeaways: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Summary {
    pub title: String,
    pub style: String,
    pub summary: String,
    pub key_takeaways: Vec<String>,
    pub notable_examples: Vec<String>,
    pub notable_references: Vec<String>,
    pub notable_quotes: Vec<String>,
    pub summaries: Vec<SectionSummary>,
    #[serde(rename = "_cache")]
    pub from_cache: bool,
}

#[derive(Debug, Deserialize)]
struct BackendError {
    error: Option<String>,
}

pub struct SummaryClient {
    client: reqwest::Client,
    base_url: String,
}

impl SummaryClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Look up an existing summary; any failure is a miss
    pub async fn lookup(&self, video_id: &str) -> Option<Summary> {
        let url = format!("{}/summarize/", self.base_url);
        debug!("Checking cached summary for {video_id}");

        let resp = match self.client.get(&url).query(&[("video_id", video_id)]).send().await {
            Ok(resp) => resp,
            Err(e) => {
                debug!("Cache check failed: {e}");
                return None;
            }
        };
        if !resp.status().is_success() {
            debug!("Cache miss for {video_id} ({})", resp.status());
            return None;
        }
        match resp.json::<Summary>().await {
            Ok(summary) => {
                debug!("Cache hit for {video_id}");
                Some(summary)
            }
            Err(e) => {
                debug!("Unreadable cached summary: {e}");
                None
            }
        }
    }

    pub async fn summarize(&self, request: &SummaryRequest) -> Result<Summary, SummaryError> {
        // The backend's route is spelled this way
        let url = format!("{}/summerize", self.base_url);
        debug!(
            "Requesting summary for {} ({} segments, style={})",
            request.video_id,
            request.transcript_segments.len(),
            request.style
        );

        let resp = self.client.post(&url).json(request).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<BackendError>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| "Failed to generate summary".to_string());
            debug!("Summary backend returned {status}: {body}");
            return Err(SummaryError::Backend(message));
        }

        Ok(resp.json().await?)
    }
}
