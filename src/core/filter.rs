//! Format filtering: named predicates and quality hints

use crate::core::video_info::FormatDescriptor;
use crate::error::TubeError;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Named boolean test over a format
#[derive(Clone, Copy)]
pub struct Predicate {
    name: &'static str,
    test: fn(&FormatDescriptor) -> bool,
}

impl Predicate {
    /// Predicate name as shown to the user
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Evaluate the predicate
    pub fn test(&self, format: &FormatDescriptor) -> bool {
        (self.test)(format)
    }

    /// Format has an audio track
    pub fn audio() -> Self {
        Self {
            name: "audio",
            test: FormatDescriptor::has_audio,
        }
    }

    /// Format has a video track
    pub fn video() -> Self {
        Self {
            name: "video",
            test: FormatDescriptor::has_video,
        }
    }

    /// Format has a video track and no audio track
    pub fn video_only() -> Self {
        Self {
            name: "videoonly",
            test: |f| f.has_video() && !f.has_audio(),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.name).finish()
    }
}

/// Filter mode selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Formats with a video track
    Video,
    /// Formats with a video track and no audio
    VideoOnly,
    /// Formats with an audio track
    #[default]
    Audio,
}

/// Resolve a filter mode into its predicate
pub fn select_predicate(mode: FilterMode) -> Predicate {
    match mode {
        FilterMode::Video => Predicate::video(),
        FilterMode::VideoOnly => Predicate::video_only(),
        FilterMode::Audio => Predicate::audio(),
    }
}

/// Check a format against every predicate; an empty set matches everything
pub fn matches(format: &FormatDescriptor, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|p| p.test(format))
}

/// Quality hint handed to the choice algorithm
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QualityHint {
    /// Best overall format
    #[default]
    Highest,
    /// Worst overall format
    Lowest,
    /// Best audio
    HighestAudio,
    /// Worst audio
    LowestAudio,
    /// Best video
    HighestVideo,
    /// Worst video
    LowestVideo,
    /// Explicit itags in order of preference
    Itags(Vec<String>),
}

impl FromStr for QualityHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "" => Err("quality cannot be empty".to_string()),
            "highest" => Ok(QualityHint::Highest),
            "lowest" => Ok(QualityHint::Lowest),
            "highestaudio" => Ok(QualityHint::HighestAudio),
            "lowestaudio" => Ok(QualityHint::LowestAudio),
            "highestvideo" => Ok(QualityHint::HighestVideo),
            "lowestvideo" => Ok(QualityHint::LowestVideo),
            _ => {
                let itags: Vec<String> = s
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect();
                if itags.is_empty() {
                    Err(format!("invalid quality: {}", s))
                } else {
                    Ok(QualityHint::Itags(itags))
                }
            }
        }
    }
}

impl fmt::Display for QualityHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityHint::Highest => f.write_str("highest"),
            QualityHint::Lowest => f.write_str("lowest"),
            QualityHint::HighestAudio => f.write_str("highestaudio"),
            QualityHint::LowestAudio => f.write_str("lowestaudio"),
            QualityHint::HighestVideo => f.write_str("highestvideo"),
            QualityHint::LowestVideo => f.write_str("lowestvideo"),
            QualityHint::Itags(itags) => f.write_str(&itags.join(",")),
        }
    }
}

/// Narrow the catalog by predicates, then let the choice algorithm pick one
pub fn choose_format<'a>(
    catalog: &'a [FormatDescriptor],
    predicates: &[Predicate],
    quality: &QualityHint,
) -> Result<&'a FormatDescriptor, TubeError> {
    let candidates: Vec<&FormatDescriptor> = catalog
        .iter()
        .filter(|f| matches(f, predicates))
        .collect();
    debug!(
        "{} of {} formats match {:?}",
        candidates.len(),
        catalog.len(),
        predicates
    );

    crate::platform::formats::pick_format(&candidates, quality).ok_or_else(|| {
        TubeError::NoMatchingFormat {
            quality: quality.to_string(),
            filters: predicates.iter().map(|p| p.name().to_string()).collect(),
        }
    })
}
