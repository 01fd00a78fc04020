use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::{StatusCode, Url};

use crate::page::USER_AGENT;
use crate::strategy::Outcome;
use crate::{Segment, TranscriptError};

pub const TIMEDTEXT_ENDPOINT: &str = "https://www.youtube.com/api/timedtext";

/// Fetches caption markup over HTTP and turns it into segments
#[derive(Debug, Clone)]
pub struct TranscriptFetcher {
    client: reqwest::Client,
    timedtext_endpoint: String,
}

impl TranscriptFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_endpoint(client, TIMEDTEXT_ENDPOINT)
    }

    pub fn with_endpoint(client: reqwest::Client, timedtext_endpoint: impl Into<String>) -> Self {
        Self {
            client,
            timedtext_endpoint: timedtext_endpoint.into(),
        }
    }

    /// Fetch the signed track URL taken from the page's player state
    pub async fn fetch_via_preferred_track(&self, url: &str) -> Result<Outcome, TranscriptError> {
        debug!("Fetching preferred track: {url}");
        Ok(self.fetch_markup(url).await?)
    }

    /// Try the timed-text endpoint one language at a time; first usable response wins.
    ///
    /// Returns `Absent` only when every language came back 404 or 410, and an
    /// error only when nothing was found and at least one request failed outright.
    pub async fn fetch_via_language_list(&self, video_id: &str, languages: &[String]) -> Result<Outcome, TranscriptError> {
        let mut all_absent = true;
        let mut last_err = None;

        for lang in languages {
            let url = self.timedtext_url(video_id, lang)?;
            match self.fetch_markup(url.as_str()).await {
                Ok(Outcome::Found(segments)) => {
                    debug!("Fetched {} segments for lang={lang}", segments.len());
                    return Ok(Outcome::Found(segments));
                }
                Ok(Outcome::Absent) => {}
                Ok(Outcome::Miss) => all_absent = false,
                Err(e) => {
                    debug!("Failed to fetch timedtext for lang={lang}: {e}");
                    all_absent = false;
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) => Err(e.into()),
            None if all_absent => Ok(Outcome::Absent),
            None => Ok(Outcome::Miss),
        }
    }

    fn timedtext_url(&self, video_id: &str, lang: &str) -> Result<Url, TranscriptError> {
        Url::parse_with_params(&self.timedtext_endpoint, &[("v", video_id), ("lang", lang)])
            .map_err(|e| TranscriptError::Page(format!("invalid timedtext endpoint {}: {e}", self.timedtext_endpoint)))
    }

    async fn fetch_markup(&self, url: &str) -> Result<Outcome, reqwest::Error> {
        let resp = self.client.get(url).header("User-Agent", USER_AGENT).send().await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            debug!("Caption fetch returned {status}: {url}");
            return Ok(Outcome::Absent);
        }
        if !status.is_success() {
            debug!("Caption fetch returned {status}: {url}");
            return Ok(Outcome::Miss);
        }

        // Only a 404 or 410 means the track is not there; empty 200s happen routinely
        let body = resp.text().await?;
        if body.trim().is_empty() {
            debug!("Caption fetch returned an empty body: {url}");
            return Ok(Outcome::Miss);
        }

        Ok(match parse_caption_xml(&body) {
            Ok(segments) if !segments.is_empty() => Outcome::Found(segments),
            Ok(_) => {
                debug!("Caption markup had no segments: {url}");
                Outcome::Miss
            }
            Err(e) => {
                debug!("Unparseable caption markup from {url}: {e}");
                Outcome::Miss
            }
        })
    }
}

/// Parse timed-text markup: every `<text start=".." dur="..">` becomes a segment.
///
/// Missing or unparsable timings default to 0. Text is XML-unescaped, then
/// HTML-entity-decoded (the service double-escapes), then trimmed; empty
/// segments are dropped.
pub fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current: Option<(f64, f64, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) if e.name().as_ref() == b"text" => {
                let (start, duration) = timing(e);
                current = Some((start, duration, String::new()));
            }
            Event::Text(ref e) => {
                if let Some((_, _, ref mut body)) = current {
                    let raw = e
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(e).into_owned());
                    body.push_str(&raw);
                }
            }
            Event::CData(ref e) => {
                if let Some((_, _, ref mut body)) = current {
                    body.push_str(&String::from_utf8_lossy(e));
                }
            }
            Event::End(ref e) if e.name().as_ref() == b"text" => {
                if let Some((start, duration, body)) = current.take() {
                    let text = html_escape::decode_html_entities(&body).trim().to_string();
                    if !text.is_empty() {
                        segments.push(Segment { start, duration, text });
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(segments)
}

fn timing(e: &BytesStart) -> (f64, f64) {
    let mut start = 0.0;
    let mut duration = 0.0;
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value)
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(0.0);
        match attr.key.as_ref() {
            b"start" => start = value,
            b"dur" => duration = value,
            _ => {}
        }
    }
    (start, duration)
}
