use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::CaptionTrack;
use crate::page::{Page, PlayerResponse};

pub const PREFERRED_LANGUAGE: &str = "en";

/// Languages tried against the timed-text endpoint when the page advertises no tracks
pub const FALLBACK_LANGUAGES: &[&str] = &[
    "en", "en-US", "en-GB", "en-CA", "en-AU", "es", "fr", "de", "it", "pt", "ja", "ko", "zh", "hi", "ar",
];

static FORMAT_OVERRIDE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&fmt=\w+$").unwrap());

/// What one attempt of the strategy chain should try, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub video_id: String,
    pub preferred_url: Option<String>,
    pub languages: Vec<String>,
    /// Player state was readable when the plan was built
    pub has_player_state: bool,
    pub has_embedded_tracks: bool,
}

/// Reads caption tracks out of the page's embedded player state
pub struct CaptionTrackResolver<'a> {
    page: &'a dyn Page,
}

impl<'a> CaptionTrackResolver<'a> {
    pub fn new(page: &'a dyn Page) -> Self {
        Self { page }
    }

    /// Tracks in source order, or `None` when the page advertises none
    pub fn resolve(&self) -> Option<Vec<CaptionTrack>> {
        tracks_from(&self.page.player_response()?)
    }

    /// Build the plan for one attempt, using `fallback_languages` when no tracks exist.
    ///
    /// Player state is read once, so the plan also records whether it was there at all.
    pub fn plan(&self, video_id: &str, fallback_languages: &[String]) -> FetchPlan {
        let player_response = self.page.player_response();
        let has_player_state = player_response.is_some();
        match player_response.as_ref().and_then(tracks_from) {
            Some(tracks) => {
                let preferred_url = preferred_track(&tracks)
                    .map(|t| strip_format_override(&t.fetch_url))
                    .filter(|url| !url.is_empty());
                if let Some(ref url) = preferred_url {
                    debug!("Preferred track URL: {url}");
                }
                FetchPlan {
                    video_id: video_id.to_string(),
                    preferred_url,
                    languages: tracks.into_iter().map(|t| t.language_code).collect(),
                    has_player_state,
                    has_embedded_tracks: true,
                }
            }
            None => {
                if has_player_state {
                    debug!("Player state lists no caption tracks, trying common languages");
                } else {
                    debug!("No player state yet, trying common languages");
                }
                FetchPlan {
                    video_id: video_id.to_string(),
                    preferred_url: None,
                    languages: fallback_languages.to_vec(),
                    has_player_state,
                    has_embedded_tracks: false,
                }
            }
        }
    }
}

fn tracks_from(pr: &PlayerResponse) -> Option<Vec<CaptionTrack>> {
    let tracks: Vec<CaptionTrack> = pr
        .caption_tracks()
        .iter()
        .map(|t| CaptionTrack {
            language_code: t.language_code.clone(),
            fetch_url: t.base_url.clone(),
        })
        .collect();

    if tracks.is_empty() {
        debug!("No caption tracks found in player state");
        return None;
    }
    debug!("Found {} caption tracks in player state", tracks.len());
    Some(tracks)
}

/// The English track if there is one, else the first track
pub fn preferred_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.language_code == PREFERRED_LANGUAGE)
        .or_else(|| tracks.first())
}

/// Drop a trailing `&fmt=<word>`; signed track URLs fail to fetch with it
pub fn strip_format_override(url: &str) -> String {
    FORMAT_OVERRIDE_RE.replace(url, "").into_owned()
}

pub fn default_fallback_languages() -> Vec<String> {
    FALLBACK_LANGUAGES.iter().map(|l| l.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::testing::{StubPage, player_response_json};

    fn track(lang: &str, url: &str) -> CaptionTrack {
        CaptionTrack {
            language_code: lang.to_string(),
            fetch_url: url.to_string(),
        }
    }

    fn page_with_tracks(tracks: serde_json::Value) -> StubPage {
        StubPage::with_player_response(player_response_json(serde_json::json!({
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": tracks}}
        })))
    }

    #[test]
    fn test_preferred_track_picks_english_regardless_of_order() {
        let tracks = vec![track("de", "d"), track("es", "s"), track("en", "e"), track("en-GB", "g")];
        assert_eq!(preferred_track(&tracks).unwrap().fetch_url, "e");
    }

    #[test]
    fn test_preferred_track_falls_back_to_first() {
        let tracks = vec![track("fr", "f"), track("en-US", "u")];
        assert_eq!(preferred_track(&tracks).unwrap().fetch_url, "f");
        assert!(preferred_track(&[]).is_none());
    }

    #[test]
    fn test_strip_format_override_only_trailing() {
        assert_eq!(
            strip_format_override("https://h/api/timedtext?v=x&sig=1&fmt=srv3"),
            "https://h/api/timedtext?v=x&sig=1"
        );
        assert_eq!(
            strip_format_override("https://h/api/timedtext?fmt=json3&v=x&sig=1"),
            "https://h/api/timedtext?fmt=json3&v=x&sig=1"
        );
        assert_eq!(
            strip_format_override("https://h/api/timedtext?v=x&fmt=vtt&lang=en"),
            "https://h/api/timedtext?v=x&fmt=vtt&lang=en"
        );
    }

    #[test]
    fn test_plan_with_embedded_tracks() {
        let page = page_with_tracks(serde_json::json!([
            {"languageCode": "en", "baseUrl": "https://h/tt?v=x&sig=A&fmt=srv3"},
            {"languageCode": "es", "baseUrl": "https://h/tt?v=x&sig=B"}
        ]));
        let plan = CaptionTrackResolver::new(&page).plan("x", &default_fallback_languages());
        assert_eq!(plan.preferred_url.as_deref(), Some("https://h/tt?v=x&sig=A"));
        assert_eq!(plan.languages, vec!["en", "es"]);
        assert!(plan.has_embedded_tracks);
        assert!(plan.has_player_state);
    }

    #[test]
    fn test_plan_without_tracks_uses_fallback_list() {
        let page = page_with_tracks(serde_json::json!([]));
        let resolver = CaptionTrackResolver::new(&page);
        assert!(resolver.resolve().is_none());
        let plan = resolver.plan("x", &default_fallback_languages());
        assert_eq!(plan.preferred_url, None);
        assert_eq!(plan.languages.len(), 15);
        assert_eq!(&plan.languages[..5], &["en", "en-US", "en-GB", "en-CA", "en-AU"]);
        assert!(!plan.has_embedded_tracks);
        assert!(plan.has_player_state);
    }

    #[test]
    fn test_resolve_without_player_state() {
        let page = StubPage::default();
        let resolver = CaptionTrackResolver::new(&page);
        assert!(resolver.resolve().is_none());

        let plan = resolver.plan("x", &default_fallback_languages());
        assert!(!plan.has_player_state);
        assert!(!plan.has_embedded_tracks);
        assert_eq!(plan.languages.len(), 15);
    }

    #[test]
    fn test_plan_reads_player_state_once() {
        let page = StubPage {
            hydrate_after_reads: 1,
            ..page_with_tracks(serde_json::json!([{"languageCode": "en", "baseUrl": "https://h/tt"}]))
        };
        let resolver = CaptionTrackResolver::new(&page);
        assert!(!resolver.plan("x", &[]).has_player_state);
        assert!(resolver.plan("x", &[]).has_embedded_tracks);
    }
}
