use eyre::Result;

use crate::summarize::Summary;
use crate::{Segment, VideoInfo};

/// Cue length for the final segment when its duration is unknown
const LAST_CUE_SECONDS: f64 = 2.0;

/// Render transcript as plain text (one segment per line, no timestamps)
pub fn render_text(info: &VideoInfo) -> String {
    info.transcript_segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_json(info: &VideoInfo) -> Result<String> {
    Ok(serde_json::to_string_pretty(info)?)
}

/// Render as SRT. Segments scraped from the page carry no duration, so
/// those cues run until the next segment starts.
pub fn render_srt(info: &VideoInfo) -> String {
    let segments = &info.transcript_segments;
    segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            let end = cue_end(seg, segments.get(i + 1));
            format!(
                "{}\n{} --> {}\n{}\n",
                i + 1,
                srt_timestamp(seg.start),
                srt_timestamp(end),
                seg.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn cue_end(seg: &Segment, next: Option<&Segment>) -> f64 {
    if seg.duration > 0.0 {
        return seg.start + seg.duration;
    }
    match next {
        Some(next) if next.start > seg.start => next.start,
        _ => seg.start + LAST_CUE_SECONDS,
    }
}

fn srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let s = (total_ms / 1000) % 60;
    let m = (total_ms / 60_000) % 60;
    let h = total_ms / 3_600_000;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

fn bullets(out: &mut Vec<String>, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push(String::new());
    out.push(format!("{heading}:"));
    out.extend(items.iter().map(|i| format!("  - {i}")));
}

pub fn render_summary(summary: &Summary) -> String {
    let mut out = Vec::new();
    if !summary.title.is_empty() {
        out.push(format!("# {}", summary.title));
        out.push(String::new());
    }
    out.push(summary.summary.trim().to_string());

    bullets(&mut out, "Key takeaways", &summary.key_takeaways);
    bullets(&mut out, "Examples", &summary.notable_examples);
    bullets(&mut out, "References", &summary.notable_references);
    bullets(&mut out, "Quotes", &summary.notable_quotes);

    if !summary.summaries.is_empty() {
        out.push(String::new());
        out.push("Sections:".to_string());
        for section in &summary.summaries {
            out.push(format!("  [{} - {}] {}", section.start, section.end, section.summary.trim()));
            if !section.takeaway.is_empty() {
                out.push(format!("    => {}", section.takeaway));
            }
            for point in section.key_points.iter().chain(&section.key_takeaways) {
                out.push(format!("    - {point}"));
            }
        }
    }

    out.join("\n")
}
