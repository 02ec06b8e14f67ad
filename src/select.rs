//! Variant selection.
//!
//! Upstream order is treated as a quality-descending signal: whenever two
//! candidates are otherwise equal, the one that came first wins.

use std::str::FromStr;

use crate::error::{ResolveError, Result};
use crate::model::{Protocol, Variant};

/// Quality selection strategy for video formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamQuality {
    /// Highest available resolution.
    Best,
    /// Best format whose height does not exceed the given pixel count.
    AtMost(u32),
}

impl FromStr for StreamQuality {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" | "highest" | "best" => Ok(Self::Best),
            other => other
                .trim_end_matches('p')
                .parse::<u32>()
                .map(Self::AtMost)
                .map_err(|_| ResolveError::Validation(format!("Invalid quality: {s}"))),
        }
    }
}

/// What the caller wants out of a variant list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    /// Streaming tracks: progressive first, else whatever came first.
    Progressive,
    /// Muxed audio+video at the given quality.
    Video(StreamQuality),
    /// Highest-bitrate audio-only encoding.
    AudioOnly,
}

/// Pick one variant according to `preference`.
pub fn select<'a>(variants: &'a [Variant], preference: Preference) -> Result<&'a Variant> {
    let usable = variants.iter().filter(|v| v.is_usable());

    let chosen = match preference {
        Preference::Progressive => usable
            .clone()
            .find(|v| v.protocol == Protocol::Progressive)
            .or_else(|| usable.clone().next()),
        Preference::Video(quality) => {
            let candidates: Vec<&Variant> = usable.filter(|v| v.has_audio && v.has_video).collect();
            let capped = match quality {
                StreamQuality::AtMost(max) => candidates
                    .iter()
                    .find(|v| v.height_px.is_some_and(|h| h <= max))
                    .copied(),
                StreamQuality::Best => None,
            };
            capped.or_else(|| first_max_by_key(candidates, |v| (v.height_px, v.bitrate)))
        }
        Preference::AudioOnly => {
            let candidates = usable.filter(|v| v.has_audio && !v.has_video);
            first_max_by_key(candidates, |v| v.bitrate)
        }
    };

    chosen.ok_or(ResolveError::NoVariant)
}

/// Like `Iterator::max_by_key`, but the earliest element wins ties.
fn first_max_by_key<'a, I, K, F>(candidates: I, key: F) -> Option<&'a Variant>
where
    I: IntoIterator<Item = &'a Variant>,
    K: Ord,
    F: Fn(&Variant) -> K,
{
    candidates.into_iter().fold(None, |best, v| match best {
        Some(b) if key(b) >= key(v) => Some(b),
        _ => Some(v),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(protocol: Protocol, url: &str) -> Variant {
        Variant {
            protocol,
            source_url: Some(url.to_string()),
            container: Some("mp3".into()),
            has_audio: true,
            has_video: false,
            quality_label: Some("sq".into()),
            height_px: None,
            bitrate: None,
            format_id: None,
        }
    }

    fn video(height: u32, bitrate: u64) -> Variant {
        Variant {
            protocol: Protocol::Progressive,
            source_url: Some(format!("https://cdn.example/{height}.mp4")),
            container: Some("mp4".into()),
            has_audio: true,
            has_video: true,
            quality_label: Some(format!("{height}p")),
            height_px: Some(height),
            bitrate: Some(bitrate),
            format_id: None,
        }
    }

    fn audio(bitrate: u64) -> Variant {
        Variant {
            has_video: false,
            height_px: None,
            quality_label: None,
            bitrate: Some(bitrate),
            source_url: Some(format!("https://cdn.example/{bitrate}.m4a")),
            ..video(0, 0)
        }
    }

    #[test]
    fn progressive_wins_regardless_of_order() {
        let hls = track(Protocol::Hls, "https://a/hls");
        let prog = track(Protocol::Progressive, "https://a/prog");

        let list = vec![hls.clone(), prog.clone()];
        assert_eq!(select(&list, Preference::Progressive).unwrap(), &prog);

        let list = vec![prog.clone(), hls];
        assert_eq!(select(&list, Preference::Progressive).unwrap(), &prog);
    }

    #[test]
    fn falls_back_to_first_when_nothing_progressive() {
        let list = vec![
            track(Protocol::Hls, "https://a/hls-mp3"),
            track(Protocol::Hls, "https://a/hls-opus"),
        ];
        let chosen = select(&list, Preference::Progressive).unwrap();
        assert_eq!(chosen.source_url.as_deref(), Some("https://a/hls-mp3"));
    }

    #[test]
    fn progressive_without_url_is_skipped() {
        let mut broken = track(Protocol::Progressive, "");
        broken.source_url = None;
        let list = vec![broken, track(Protocol::Hls, "https://a/hls")];
        let chosen = select(&list, Preference::Progressive).unwrap();
        assert_eq!(chosen.protocol, Protocol::Hls);
    }

    #[test]
    fn empty_list_is_no_variant() {
        for pref in [
            Preference::Progressive,
            Preference::Video(StreamQuality::Best),
            Preference::AudioOnly,
        ] {
            assert_eq!(select(&[], pref), Err(ResolveError::NoVariant));
        }
    }

    #[test]
    fn all_unusable_is_no_variant() {
        let mut v = track(Protocol::Progressive, "x");
        v.source_url = Some(String::new());
        assert_eq!(
            select(&[v], Preference::Progressive),
            Err(ResolveError::NoVariant)
        );
    }

    #[test]
    fn height_cap_picks_first_at_or_below() {
        let list = vec![video(1080, 5), video(720, 4), video(480, 3)];
        let chosen = select(&list, Preference::Video(StreamQuality::AtMost(600))).unwrap();
        assert_eq!(chosen.height_px, Some(480));

        let chosen = select(&list, Preference::Video(StreamQuality::AtMost(720))).unwrap();
        assert_eq!(chosen.height_px, Some(720));
    }

    #[test]
    fn height_cap_falls_back_to_highest() {
        let list = vec![video(1080, 5), video(720, 4), video(480, 3)];
        let chosen = select(&list, Preference::Video(StreamQuality::AtMost(2000))).unwrap();
        assert_eq!(chosen.height_px, Some(1080));

        // Nothing small enough: fall back to the global best.
        let chosen = select(&list, Preference::Video(StreamQuality::AtMost(144))).unwrap();
        assert_eq!(chosen.height_px, Some(1080));
    }

    #[test]
    fn best_ignores_upstream_order_for_height() {
        let list = vec![video(480, 3), video(1080, 5), video(720, 4)];
        let chosen = select(&list, Preference::Video(StreamQuality::Best)).unwrap();
        assert_eq!(chosen.height_px, Some(1080));
    }

    #[test]
    fn video_requires_audio_and_video() {
        let mut silent = video(1080, 9);
        silent.has_audio = false;
        let list = vec![silent, audio(128_000)];
        assert_eq!(
            select(&list, Preference::Video(StreamQuality::Best)),
            Err(ResolveError::NoVariant)
        );
    }

    #[test]
    fn audio_only_picks_highest_bitrate_first_on_tie() {
        let mut first = audio(160_000);
        first.format_id = Some("first".into());
        let mut second = audio(160_000);
        second.format_id = Some("second".into());
        let list = vec![video(720, 900_000), audio(48_000), first, second];

        let chosen = select(&list, Preference::AudioOnly).unwrap();
        assert_eq!(chosen.format_id.as_deref(), Some("first"));
    }

    #[test]
    fn quality_parsing() {
        assert_eq!("highest".parse::<StreamQuality>().unwrap(), StreamQuality::Best);
        assert_eq!("BEST".parse::<StreamQuality>().unwrap(), StreamQuality::Best);
        assert_eq!("720".parse::<StreamQuality>().unwrap(), StreamQuality::AtMost(720));
        assert_eq!("480p".parse::<StreamQuality>().unwrap(), StreamQuality::AtMost(480));
        assert!(matches!(
            "ultra".parse::<StreamQuality>(),
            Err(ResolveError::Validation(_))
        ));
    }
}
