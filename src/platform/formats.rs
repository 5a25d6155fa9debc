//! Format ranking and the final single-format choice

use crate::core::filter::QualityHint;
use crate::core::video_info::FormatDescriptor;
use std::cmp::Ordering;

/// Compare two formats, best first.
///
/// Resolution wins, then video bitrate, then audio bitrate. Formats without a
/// video track rank below every video-capable one.
pub fn compare_quality(a: &FormatDescriptor, b: &FormatDescriptor) -> Ordering {
    b.height()
        .unwrap_or(0)
        .cmp(&a.height().unwrap_or(0))
        .then_with(|| b.bitrate.unwrap_or(0).cmp(&a.bitrate.unwrap_or(0)))
        .then_with(|| {
            b.audio_bitrate
                .unwrap_or(0)
                .cmp(&a.audio_bitrate.unwrap_or(0))
        })
}

/// Compare two formats by audio quality, best first
pub fn compare_audio(a: &FormatDescriptor, b: &FormatDescriptor) -> Ordering {
    b.audio_bitrate
        .unwrap_or(0)
        .cmp(&a.audio_bitrate.unwrap_or(0))
        // Prefer the smaller download when audio is equal
        .then_with(|| a.bitrate.unwrap_or(0).cmp(&b.bitrate.unwrap_or(0)))
}

/// Sort formats by quality (best first)
pub fn sort_formats_by_quality(formats: &mut [&FormatDescriptor]) {
    formats.sort_by(|a, b| compare_quality(a, b));
}

/// Pick one format out of an already-filtered candidate list
pub fn pick_format<'a>(
    candidates: &[&'a FormatDescriptor],
    quality: &QualityHint,
) -> Option<&'a FormatDescriptor> {
    let mut sorted: Vec<&'a FormatDescriptor> = candidates.to_vec();

    match quality {
        QualityHint::Highest => {
            sort_formats_by_quality(&mut sorted);
            sorted.first().copied()
        }
        QualityHint::Lowest => {
            sort_formats_by_quality(&mut sorted);
            sorted.last().copied()
        }
        QualityHint::HighestAudio | QualityHint::LowestAudio => {
            sorted.retain(|f| f.has_audio());
            sorted.sort_by(|a, b| compare_audio(a, b));
            if *quality == QualityHint::HighestAudio {
                sorted.first().copied()
            } else {
                sorted.last().copied()
            }
        }
        QualityHint::HighestVideo | QualityHint::LowestVideo => {
            sorted.retain(|f| f.has_video());
            sort_formats_by_quality(&mut sorted);
            if *quality == QualityHint::HighestVideo {
                sorted.first().copied()
            } else {
                sorted.last().copied()
            }
        }
        QualityHint::Itags(itags) => itags
            .iter()
            .find_map(|itag| candidates.iter().find(|f| &f.itag == itag).copied()),
    }
}
