use thiserror::Error;

pub const NO_CAPTIONS_MESSAGE: &str =
    "No captions/transcript available. This video doesn't have captions enabled. Please try a video with captions.";

#[derive(Debug, Error)]
pub enum TranscriptError {
    /// The video has no captions by any strategy
    #[error("{}", NO_CAPTIONS_MESSAGE)]
    NoCaptions,

    /// The retry budget ran out while attempts were failing with errors
    #[error("Unable to fetch transcript: {0}")]
    FetchFailed(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("page error: {0}")]
    Page(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_distinguish_no_captions_from_fetch_failure() {
        let none = TranscriptError::NoCaptions.to_string();
        let failed = TranscriptError::FetchFailed("connection reset".to_string()).to_string();
        assert!(none.contains("doesn't have captions enabled"));
        assert_eq!(failed, "Unable to fetch transcript: connection reset");
    }
}
