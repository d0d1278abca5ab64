use super::types::{FormatDescriptor, FormatSummary, MediaMetadata};
use serde::{Deserialize, Serialize};

/// Which candidates a probe reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Best combined stream by height and best audio-only stream by bitrate.
    #[default]
    #[serde(rename = "best")]
    Best,
    /// Same as `Best`, plus the first combined stream that is exactly 480p.
    #[serde(rename = "prefer_480p")]
    Prefer480p,
}

const PREFERRED_HEIGHT: u32 = 480;

/// Candidates found in a single pass over a format list.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct FormatPicks<'a> {
    pub best_video_audio: Option<&'a FormatDescriptor>,
    pub best_audio_only: Option<&'a FormatDescriptor>,
    pub video_480p_audio: Option<&'a FormatDescriptor>,
}

/// Scans `formats` once. Candidates are only replaced on a strictly better
/// value, so the first entry wins ties.
pub fn pick_formats(formats: &[FormatDescriptor]) -> FormatPicks<'_> {
    let mut picks = FormatPicks::default();

    for format in formats {
        if format.is_audio_only() {
            let better = picks
                .best_audio_only
                .is_none_or(|best| format.abr.unwrap_or(0.0) > best.abr.unwrap_or(0.0));
            if better {
                picks.best_audio_only = Some(format);
            }
        }

        if format.is_combined() {
            let better = picks
                .best_video_audio
                .is_none_or(|best| format.height.unwrap_or(0) > best.height.unwrap_or(0));
            if better {
                picks.best_video_audio = Some(format);
            }

            if picks.video_480p_audio.is_none() && format.height == Some(PREFERRED_HEIGHT) {
                picks.video_480p_audio = Some(format);
            }
        }
    }

    picks
}

/// Probe response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub title: String,
    pub uploader: Option<String>,
    pub duration_sec: Option<u64>,
    pub thumbnail: Option<String>,
    pub best_video_audio: Option<FormatSummary>,
    pub best_audio_only: Option<FormatSummary>,
    /// Outer `None` omits the field; inner `None` reports that no 480p
    /// stream exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_480p_audio: Option<Option<FormatSummary>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<ProbeReport>,
}

impl ProbeReport {
    pub fn new(metadata: &MediaMetadata, policy: SelectionPolicy) -> Self {
        let picks = pick_formats(&metadata.formats);

        let video_480p_audio = match policy {
            SelectionPolicy::Best => None,
            SelectionPolicy::Prefer480p => Some(picks.video_480p_audio.map(FormatSummary::from)),
        };

        Self {
            title: metadata.title.clone(),
            uploader: metadata.uploader.clone(),
            duration_sec: metadata.duration,
            thumbnail: metadata.thumbnail.clone(),
            best_video_audio: picks.best_video_audio.map(FormatSummary::from),
            best_audio_only: picks.best_audio_only.map(FormatSummary::from),
            video_480p_audio,
            entries: metadata
                .entries
                .iter()
                .map(|entry| ProbeReport::new(entry, policy))
                .collect(),
        }
    }
}
