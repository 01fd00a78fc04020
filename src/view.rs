//! Presentation state for one run. Front ends read `view()` and never
//! decide transitions themselves.

use std::fmt;

use log::debug;

use crate::VideoInfo;
use crate::summarize::Summary;

const HELP_KEYWORDS: &[&str] = &["transcript", "caption", "subtitle"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    NotYoutube,
    Initial,
    Loading,
    Transcript,
    Summary { from_cache: bool },
    Error { message: String, show_help: bool },
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::NotYoutube => write!(f, "Not a YouTube video"),
            View::Initial => write!(f, "Ready"),
            View::Loading => write!(f, "Loading transcript..."),
            View::Transcript => write!(f, "Transcript ready"),
            View::Summary { from_cache: true } => write!(f, "Summary (cached)"),
            View::Summary { from_cache: false } => write!(f, "Summary"),
            View::Error { message, show_help } => {
                write!(f, "Error: {message}")?;
                if *show_help {
                    write!(f, "\nThis video may not have captions enabled.")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug)]
pub struct ViewModel {
    view: View,
    video: Option<VideoInfo>,
    summary: Option<Summary>,
}

impl Default for ViewModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewModel {
    pub fn new() -> Self {
        Self {
            view: View::Initial,
            video: None,
            summary: None,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn video(&self) -> Option<&VideoInfo> {
        self.video.as_ref()
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    fn set(&mut self, view: View) {
        debug!("View: {:?} -> {:?}", self.view, view);
        self.view = view;
    }

    pub fn not_youtube(&mut self) {
        self.video = None;
        self.summary = None;
        self.set(View::NotYoutube);
    }

    pub fn loading(&mut self) {
        self.summary = None;
        self.set(View::Loading);
    }

    pub fn transcript_ready(&mut self, info: VideoInfo) {
        self.video = Some(info);
        self.set(View::Transcript);
    }

    pub fn summary_ready(&mut self, summary: Summary) {
        let from_cache = summary.from_cache;
        self.summary = Some(summary);
        self.set(View::Summary { from_cache });
    }

    pub fn failed(&mut self, message: impl Into<String>) {
        let message = message.into();
        let show_help = wants_help(&message);
        self.set(View::Error { message, show_help });
    }

    /// Back to `Initial`, dropping the current video
    pub fn reset(&mut self) {
        self.video = None;
        self.summary = None;
        self.set(View::Initial);
    }
}

fn wants_help(message: &str) -> bool {
    let lower = message.to_lowercase();
    HELP_KEYWORDS.iter().any(|k| lower.contains(k))
}
