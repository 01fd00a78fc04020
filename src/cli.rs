use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Srt,
}

impl OutputFormat {
    /// Parse a config value; unknown names are ignored
    pub fn from_config(name: &str) -> Option<Self> {
        <Self as clap::ValueEnum>::from_str(name, true).ok()
    }
}

#[derive(Parser)]
#[command(
    name = "ytbrief",
    about = "YouTube transcript fetcher and summarizer",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// YouTube video URL or video ID (reads from stdin if omitted)
    pub url: Option<String>,

    /// Send the transcript to the summary service
    #[arg(short, long)]
    pub summarize: bool,

    /// Summary style requested from the service [default: paragraph]
    #[arg(long)]
    pub style: Option<String>,

    /// Output format [default: text]
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Base URL of the summary service
    #[arg(long)]
    pub api_url: Option<String>,

    /// Show progress and metadata on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from(["ytbrief", "dQw4w9WgXcQ", "-s", "--style", "bullets", "-f", "srt"]).unwrap();
        assert_eq!(cli.url.as_deref(), Some("dQw4w9WgXcQ"));
        assert!(cli.summarize);
        assert_eq!(cli.style.as_deref(), Some("bullets"));
        assert_eq!(cli.format, Some(OutputFormat::Srt));
        assert!(cli.api_url.is_none());
    }

    #[test]
    fn test_format_from_config() {
        assert_eq!(OutputFormat::from_config("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_config("yaml"), None);
    }
}
