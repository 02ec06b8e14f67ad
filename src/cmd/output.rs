use anyhow::Result;
use serde::Serialize;

use medialink::{TrackMetadata, Variant};

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `m:ss`, or `h:mm:ss` past the hour.
pub fn format_duration(total_secs: u64) -> String {
    let (h, m, s) = (total_secs / 3600, (total_secs % 3600) / 60, total_secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

pub fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

pub fn print_track_line(index: usize, track: &TrackMetadata) {
    let artist = track
        .owner
        .username
        .as_deref()
        .or(track.owner.display_name.as_deref())
        .unwrap_or("unknown");
    let duration = track
        .duration_ms
        .map(|ms| format!(" ({})", format_duration(ms / 1000)))
        .unwrap_or_default();
    println!("{:>2}. {} - {}{duration}", index + 1, artist, truncate_text(&track.title, 60));
    if let Some(url) = &track.canonical_url {
        println!("    {url}");
    }
}

pub fn print_variant_line(variant: &Variant) {
    let id = variant.format_id.as_deref().unwrap_or("-");
    let kind = match (variant.has_audio, variant.has_video) {
        (true, true) => "av",
        (false, true) => "video",
        (true, false) => "audio",
        (false, false) => "?",
    };
    let label = variant.quality_label.as_deref().unwrap_or("");
    let container = variant.container.as_deref().unwrap_or("?");
    let bitrate = variant
        .bitrate
        .map(|b| format!("{}k", b / 1000))
        .unwrap_or_default();
    let note = if variant.is_usable() { "" } else { " (no direct url)" };
    println!("  {id:>4}  {kind:<5}  {container:<5}  {label:<20}  {bitrate:>6}{note}");
}
