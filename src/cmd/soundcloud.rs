use anyhow::{Context as _, Result};

use super::output::{format_duration, print_json, print_track_line};
use super::Context;

pub async fn cmd_search(ctx: &Context, query: &str, limit: usize) -> Result<()> {
    let tracks = ctx
        .soundcloud
        .search(query, limit)
        .await
        .with_context(|| format!("search for {query:?} failed"))?;

    if ctx.json {
        return print_json(&tracks);
    }
    if tracks.is_empty() {
        println!("No tracks found for {query:?}");
        return Ok(());
    }
    for (i, track) in tracks.iter().enumerate() {
        print_track_line(i, track);
    }
    Ok(())
}

pub async fn cmd_resolve(ctx: &Context, url: &str) -> Result<()> {
    let track = ctx
        .soundcloud
        .resolve(url)
        .await
        .with_context(|| format!("failed to resolve {url}"))?;

    if ctx.json {
        return print_json(&track);
    }
    println!("🎵 {}", track.title);
    if let Some(user) = track.owner.username.as_deref() {
        println!("👤 {user}");
    }
    if let Some(ms) = track.duration_ms {
        println!("⏱️  {}", format_duration(ms / 1000));
    }
    println!("🆔 {}", track.id);
    println!("Variants:");
    for variant in &track.variants {
        println!(
            "  {:?} {} {}",
            variant.protocol,
            variant.container.as_deref().unwrap_or("?"),
            variant.quality_label.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

pub async fn cmd_stream(ctx: &Context, url: &str) -> Result<()> {
    let resolved = ctx
        .soundcloud
        .stream(url)
        .await
        .with_context(|| format!("failed to get a stream for {url}"))?;

    if ctx.json {
        return print_json(&resolved);
    }
    eprintln!("🎵 {}", resolved.track.title);
    println!("{}", resolved.direct_url);
    Ok(())
}
