use std::time::Duration;

use log::debug;
use reqwest::Url;

use crate::ChannelInfo;
use crate::clock::Clock;
use crate::page::Page;
use crate::waiter::PlayerStateWaiter;

const CHANNEL_URL_PREFIX: &str = "https://www.youtube.com/channel/";

const TITLE_SELECTOR: &str = "h1.ytd-watch-metadata yt-formatted-string";

// Ordered; the layout changes often so several known spots are tried
const DESCRIPTION_SELECTORS: &[&str] = &[
    "#description yt-formatted-string",
    "#snippet",
    "#expanded",
    "#description",
    "#snippet yt-core-attributed-string--link-inherit-color",
    "ytd-text-inline-expander yt-formatted-string",
    "ytd-text-inline-expander #description-inline-expander",
    "yt-attributed-string.ytd-watch-metadata",
];

const CHANNEL_SELECTORS: &[&str] = &[
    "ytd-video-owner-renderer a.yt-simple-endpoint",
    "#channel-name a",
    "ytd-channel-name a",
    "#owner-container a.yt-simple-endpoint",
];

/// Best-effort video metadata; never fails, empty strings when nothing is found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub description: String,
    pub channel_info: ChannelInfo,
}

pub struct MetadataExtractor<'a> {
    page: &'a dyn Page,
}

impl<'a> MetadataExtractor<'a> {
    pub fn new(page: &'a dyn Page) -> Self {
        Self { page }
    }

    /// Wait (bounded) for the player state, then read every field
    pub async fn extract(&self, clock: &dyn Clock, state_wait: Duration) -> Metadata {
        PlayerStateWaiter::new(self.page, clock)
            .await_player_state(state_wait)
            .await;
        let metadata = Metadata {
            title: self.title(),
            description: self.description(),
            channel_info: self.channel_info(),
        };
        debug!(
            "Metadata: title={:?} description={} chars channel={:?}",
            metadata.title,
            metadata.description.len(),
            metadata.channel_info.name
        );
        metadata
    }

    pub fn title(&self) -> String {
        self.page
            .select_text(TITLE_SELECTOR)
            .filter(|t| !t.is_empty())
            .or_else(|| {
                self.page
                    .player_response()
                    .and_then(|pr| pr.video_details)
                    .and_then(|vd| vd.title)
                    .map(|t| t.trim().to_string())
            })
            .unwrap_or_default()
    }

    pub fn description(&self) -> String {
        let embedded = self
            .page
            .player_response()
            .and_then(|pr| pr.video_details)
            .and_then(|vd| vd.short_description)
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if let Some(description) = embedded {
            return description;
        }

        DESCRIPTION_SELECTORS
            .iter()
            .find_map(|sel| self.page.select_text(sel).filter(|t| !t.is_empty()))
            .unwrap_or_default()
    }

    pub fn channel_info(&self) -> ChannelInfo {
        if let Some(details) = self.page.player_response().and_then(|pr| pr.video_details) {
            let name = details.author.map(|a| a.trim().to_string()).unwrap_or_default();
            let channel_id = details.channel_id.unwrap_or_default();
            let url = if channel_id.is_empty() {
                String::new()
            } else {
                format!("{CHANNEL_URL_PREFIX}{channel_id}")
            };
            if !name.is_empty() || !url.is_empty() {
                return ChannelInfo { name, url, channel_id };
            }
        }

        for sel in CHANNEL_SELECTORS {
            let Some(link) = self.page.select_link(sel) else {
                continue;
            };
            if link.text.is_empty() {
                continue;
            }
            let url = link
                .href
                .filter(|h| !h.is_empty())
                .and_then(|h| resolve_href(&self.page.origin(), &h))
                .unwrap_or_default();
            return ChannelInfo {
                name: link.text,
                url,
                channel_id: String::new(),
            };
        }

        ChannelInfo::default()
    }
}

fn resolve_href(origin: &str, href: &str) -> Option<String> {
    let base = Url::parse(origin).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::ManualClock;
    use crate::page::Link;
    use crate::page::testing::{StubPage, player_response_json};

    fn link(text: &str, href: Option<&str>) -> Link {
        Link {
            text: text.to_string(),
            href: href.map(str::to_string),
        }
    }

    #[test]
    fn test_embedded_state_is_preferred() {
        let mut page = StubPage::with_player_response(player_response_json(serde_json::json!({
            "videoDetails": {
                "title": "Embedded title",
                "shortDescription": "  from state  ",
                "author": " Rick ",
                "channelId": "UC42"
            }
        })));
        page.texts.push(("#description".to_string(), "from dom".to_string()));
        let extractor = MetadataExtractor::new(&page);

        assert_eq!(extractor.description(), "from state");
        assert_eq!(
            extractor.channel_info(),
            ChannelInfo {
                name: "Rick".to_string(),
                url: "https://www.youtube.com/channel/UC42".to_string(),
                channel_id: "UC42".to_string(),
            }
        );
        assert_eq!(extractor.title(), "Embedded title");
    }

    #[test]
    fn test_description_dom_fallback_skips_empty_matches() {
        let page = StubPage {
            texts: vec![
                ("#snippet".to_string(), "   ".to_string()),
                ("#description".to_string(), "dom description".to_string()),
                ("yt-attributed-string.ytd-watch-metadata".to_string(), "later".to_string()),
            ],
            ..Default::default()
        };
        assert_eq!(MetadataExtractor::new(&page).description(), "dom description");
    }

    #[test]
    fn test_channel_dom_fallback_resolves_relative_href() {
        let page = StubPage {
            links: vec![
                ("ytd-video-owner-renderer a.yt-simple-endpoint".to_string(), link("", Some("/@empty"))),
                ("#channel-name a".to_string(), link("Rick Astley", Some("/@RickAstley"))),
            ],
            ..Default::default()
        };
        assert_eq!(
            MetadataExtractor::new(&page).channel_info(),
            ChannelInfo {
                name: "Rick Astley".to_string(),
                url: "https://www.youtube.com/@RickAstley".to_string(),
                channel_id: String::new(),
            }
        );
    }

    #[test]
    fn test_channel_without_href_has_empty_url() {
        let page = StubPage {
            links: vec![("ytd-channel-name a".to_string(), link("Someone", None))],
            ..Default::default()
        };
        let info = MetadataExtractor::new(&page).channel_info();
        assert_eq!(info.name, "Someone");
        assert_eq!(info.url, "");
    }

    #[tokio::test]
    async fn test_nothing_available_yields_empty_metadata_after_bounded_wait() {
        let clock = ManualClock::new();
        let page = StubPage::default();
        let metadata = MetadataExtractor::new(&page)
            .extract(&clock, Duration::from_millis(3000))
            .await;
        assert_eq!(metadata, Metadata::default());
        assert_eq!(clock.elapsed(), Duration::from_millis(3000));
    }
}
