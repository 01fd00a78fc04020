use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Result, bail};
use log::{debug, info};

use ytbrief::clock::TokioClock;
use ytbrief::config::Config;
use ytbrief::output;
use ytbrief::page::WatchPage;
use ytbrief::pipeline::Pipeline;
use ytbrief::summarize::{DEFAULT_STYLE, SummaryClient, SummaryRequest};
use ytbrief::view::{View, ViewModel};
use ytbrief::youtube::{TIMEDTEXT_ENDPOINT, TranscriptFetcher};

mod cli;

use cli::{Cli, OutputFormat};

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytbrief.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytbrief")
        .join("logs")
}

fn build_after_help(config: &Config) -> String {
    format!(
        "\nSummary service: {}\nConfig: {}\nLogs are written to: {}",
        config.api_url(),
        ytbrief::config::config_path().display(),
        log_dir().join("ytbrief.log").display()
    )
}

/// Options resolved from CLI flags over config values
struct Settings {
    format: OutputFormat,
    style: String,
    api_url: String,
    output: Option<PathBuf>,
    summarize: bool,
    verbose: bool,
}

impl Settings {
    fn resolve(cli: Cli, config: &Config) -> Self {
        let format = cli
            .format
            .or_else(|| config.default_format.as_deref().and_then(OutputFormat::from_config))
            .unwrap_or(OutputFormat::Text);
        let style = cli
            .style
            .or_else(|| config.default_style.clone())
            .unwrap_or_else(|| DEFAULT_STYLE.to_string());
        let api_url = cli.api_url.unwrap_or_else(|| config.api_url().to_string());
        Self {
            format,
            style,
            api_url,
            output: cli.output,
            summarize: cli.summarize,
            verbose: cli.verbose,
        }
    }
}

fn show(vm: &ViewModel, verbose: bool) {
    if verbose || matches!(vm.view(), View::Error { .. } | View::NotYoutube) {
        eprintln!("{}", vm.view());
    }
}

/// Render whatever the view model currently holds
fn render(vm: &ViewModel, format: OutputFormat) -> Result<String> {
    match (vm.view(), vm.video(), vm.summary()) {
        (View::Summary { .. }, _, Some(summary)) => Ok(output::render_summary(summary)),
        (View::Transcript, Some(info), _) => Ok(match format {
            OutputFormat::Text => output::render_text(info),
            OutputFormat::Json => output::render_json(info)?,
            OutputFormat::Srt => output::render_srt(info),
        }),
        (view, ..) => bail!("nothing to render in state: {view}"),
    }
}

fn emit(settings: &Settings, vm: &ViewModel) -> Result<()> {
    let rendered = render(vm, settings.format)?;
    if let Some(ref path) = settings.output {
        std::fs::write(path, &rendered)?;
        if settings.verbose {
            eprintln!("Output written to: {}", path.display());
        }
    } else {
        println!("{rendered}");
    }
    Ok(())
}

async fn process(
    input: &str,
    client: &reqwest::Client,
    config: &Config,
    settings: &Settings,
    vm: &mut ViewModel,
) -> Result<()> {
    let Some(video_id) = ytbrief::extract_video_id(input) else {
        vm.not_youtube();
        show(vm, settings.verbose);
        bail!("could not extract video ID from: {input}\n\nSupported formats:\n  https://www.youtube.com/watch?v=ID\n  https://youtu.be/ID\n  https://www.youtube.com/embed/ID\n  https://www.youtube.com/shorts/ID\n  <11-character video ID>");
    };

    let summaries = SummaryClient::new(client.clone(), settings.api_url.clone());

    if settings.summarize {
        if let Some(summary) = summaries.lookup(&video_id).await {
            debug!("Using cached summary for {video_id}");
            vm.summary_ready(summary);
            show(vm, settings.verbose);
            return emit(settings, vm);
        }
    }

    vm.loading();
    show(vm, settings.verbose);

    let page = match WatchPage::load(client, &video_id).await {
        Ok(page) => Arc::new(page),
        Err(e) => {
            vm.failed(e.to_string());
            show(vm, settings.verbose);
            return Err(e.into());
        }
    };
    let endpoint = config.timedtext_endpoint.as_deref().unwrap_or(TIMEDTEXT_ENDPOINT);
    let fetcher = TranscriptFetcher::with_endpoint(client.clone(), endpoint);
    let pipeline = Pipeline::standard(page, Arc::new(TokioClock::new()), fetcher, config.pipeline_settings());

    let info = match pipeline.video_info(&video_id).await {
        Ok(info) => info,
        Err(e) => {
            vm.failed(e.error.clone());
            show(vm, settings.verbose);
            return Err(e.into());
        }
    };

    if settings.verbose {
        eprintln!(
            "Video: {} ({})\nChannel: {}\nSegments: {}",
            info.title,
            info.video_id,
            info.channel_info.name,
            info.transcript_segments.len(),
        );
    }

    vm.transcript_ready(info);
    show(vm, settings.verbose);
    if !settings.summarize {
        return emit(settings, vm);
    }

    let Some(request) = vm.video().map(|info| SummaryRequest::from_video_info(info, &settings.style)) else {
        bail!("no transcript to summarize for {video_id}");
    };
    match summaries.summarize(&request).await {
        Ok(summary) => vm.summary_ready(summary),
        Err(e) => {
            vm.failed(e.to_string());
            show(vm, settings.verbose);
            return Err(e.into());
        }
    }
    show(vm, settings.verbose);
    emit(settings, vm)
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_default();

    let cmd = <Cli as clap::CommandFactory>::command().after_help(build_after_help(&config));
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // CLI flags take priority over config
    let url = cli.url.clone();
    let settings = Settings::resolve(cli, &config);

    if settings.verbose {
        let config_path = ytbrief::config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
        debug!("Summary service: {}", settings.api_url);
    }

    let client = reqwest::Client::new();

    // Collect URLs: from arg or stdin
    let urls = if let Some(url) = url {
        vec![url]
    } else {
        let stdin = io::stdin();
        stdin.lock().lines().collect::<Result<Vec<_>, _>>()?
    };

    if urls.iter().all(|u| u.trim().is_empty()) {
        bail!("no URL or video ID provided\n\nUsage: ytbrief <URL>\n       echo <URL> | ytbrief");
    }

    let mut vm = ViewModel::new();
    for url_input in &urls {
        let url_input = url_input.trim();
        if url_input.is_empty() {
            continue;
        }
        process(url_input, &client, &config, &settings, &mut vm).await?;
        vm.reset();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ytbrief::summarize::Summary;
    use ytbrief::{ChannelInfo, Segment, VideoInfo};

    fn info() -> VideoInfo {
        VideoInfo {
            video_id: "dQw4w9WgXcQ".to_string(),
            title: "t".to_string(),
            url: String::new(),
            transcript: "one two".to_string(),
            transcript_segments: vec![
                Segment {
                    start: 0.0,
                    duration: 1.0,
                    text: "one".to_string(),
                },
                Segment {
                    start: 1.0,
                    duration: 1.0,
                    text: "two".to_string(),
                },
            ],
            description: String::new(),
            channel_info: ChannelInfo::default(),
        }
    }

    #[test]
    fn test_render_follows_view_model() {
        let mut vm = ViewModel::new();
        assert!(render(&vm, OutputFormat::Text).is_err());

        vm.transcript_ready(info());
        assert_eq!(render(&vm, OutputFormat::Text).unwrap(), "one\ntwo");
        assert!(render(&vm, OutputFormat::Srt).unwrap().starts_with("1\n00:00:00,000 --> 00:00:01,000"));

        vm.summary_ready(Summary {
            summary: "short".to_string(),
            ..Default::default()
        });
        assert_eq!(render(&vm, OutputFormat::Text).unwrap(), "short");
    }
}
