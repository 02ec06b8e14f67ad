use anyhow::{Context as _, Result};
use serde_json::json;

use medialink::StreamQuality;

use super::output::{format_duration, print_json, print_variant_line};
use super::Context;

pub async fn cmd_info(ctx: &Context, url: &str) -> Result<()> {
    let info = ctx
        .youtube
        .info(url)
        .await
        .with_context(|| format!("failed to load {url}"))?;

    if ctx.json {
        return print_json(&info);
    }
    println!("🎬 {}", info.title);
    if let Some(channel) = &info.channel {
        println!("📺 {channel}");
    }
    if let Some(secs) = info.duration_secs {
        println!("⏱️  {}", format_duration(secs));
    }
    println!("Formats ({}):", info.formats.len());
    for variant in &info.formats {
        print_variant_line(variant);
    }
    Ok(())
}

pub async fn cmd_video(ctx: &Context, url: &str, quality: &str) -> Result<()> {
    let quality: StreamQuality = quality.parse()?;
    let chosen = ctx
        .youtube
        .video(url, quality)
        .await
        .with_context(|| format!("no video format for {url}"))?;

    if ctx.json {
        return print_json(&json!({
            "title": chosen.title,
            "url": chosen.url(),
            "quality": chosen.variant.quality_label,
            "container": chosen.variant.container,
        }));
    }
    eprintln!(
        "🎬 {} [{}]",
        chosen.title,
        chosen.variant.quality_label.as_deref().unwrap_or("?")
    );
    println!("{}", chosen.url());
    Ok(())
}

pub async fn cmd_audio(ctx: &Context, url: &str) -> Result<()> {
    let chosen = ctx
        .youtube
        .audio(url)
        .await
        .with_context(|| format!("no audio format for {url}"))?;

    if ctx.json {
        return print_json(&json!({
            "title": chosen.title,
            "url": chosen.url(),
            "container": chosen.variant.container,
            "audioBitrate": chosen.variant.bitrate.map(|b| b / 1000),
        }));
    }
    eprintln!("🎧 {}", chosen.title);
    println!("{}", chosen.url());
    Ok(())
}
