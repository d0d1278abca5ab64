use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Codec value the engine uses to mark a missing video or audio track.
pub const NO_CODEC: &str = "none";

/// One encoding variant of a media item, as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FormatDescriptor {
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub ext: String,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub abr: Option<f64>,
    pub filesize: Option<u64>,
}

impl FormatDescriptor {
    pub fn has_video(&self) -> bool {
        codec_present(self.vcodec.as_deref())
    }

    pub fn has_audio(&self) -> bool {
        codec_present(self.acodec.as_deref())
    }

    /// Video and audio in a single stream.
    pub fn is_combined(&self) -> bool {
        self.has_video() && self.has_audio()
    }

    pub fn is_audio_only(&self) -> bool {
        self.vcodec.as_deref() == Some(NO_CODEC) && self.has_audio()
    }
}

/// Only the `"none"` sentinel marks a missing track; generic extractors often
/// leave the codec out entirely.
fn codec_present(codec: Option<&str>) -> bool {
    codec.is_none_or(|c| c != NO_CODEC)
}

/// The projection of a [`FormatDescriptor`] returned to API clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatSummary {
    pub format_id: String,
    pub ext: String,
    pub resolution: Option<String>,
    pub fps: Option<f64>,
    pub filesize: Option<u64>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
}

impl From<&FormatDescriptor> for FormatSummary {
    fn from(format: &FormatDescriptor) -> Self {
        let resolution = match (format.width, format.height) {
            (Some(width), Some(height)) => Some(format!("{}x{}", width, height)),
            _ => None,
        };

        Self {
            format_id: format.format_id.clone(),
            ext: format.ext.clone(),
            resolution,
            fps: format.fps,
            filesize: format.filesize,
            video_codec: format.vcodec.clone(),
            audio_codec: format.acodec.clone(),
        }
    }
}

/// A single download the engine performed for an item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestedDownload {
    pub filepath: Option<String>,
}

/// Raw info dictionary emitted by the engine for a URL.
///
/// Playlists carry `entries`, where entries the engine could not resolve are
/// `null`. Downloads additionally carry the prepared output filename.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineInfo {
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
    pub formats: Option<Vec<FormatDescriptor>>,
    pub entries: Option<Vec<Option<EngineInfo>>>,
    pub filename: Option<String>,
    #[serde(rename = "_filename")]
    pub prepared_filename: Option<String>,
    pub requested_downloads: Option<Vec<RequestedDownload>>,
}

impl EngineInfo {
    pub fn is_playlist(&self) -> bool {
        self.entries.is_some()
    }

    /// Entries the engine managed to resolve, in playlist order.
    pub fn resolved_entries(&self) -> impl Iterator<Item = &EngineInfo> {
        self.entries.iter().flatten().flatten()
    }

    /// Where the engine wrote this single item.
    fn output_path(&self) -> Option<PathBuf> {
        self.requested_downloads
            .iter()
            .flatten()
            .rev()
            .find_map(|download| download.filepath.as_deref())
            .or(self.filename.as_deref())
            .or(self.prepared_filename.as_deref())
            .map(PathBuf::from)
    }

    /// One path per resolved item: the item itself, or every resolved
    /// playlist entry.
    pub fn output_paths(&self) -> Vec<PathBuf> {
        if self.is_playlist() {
            self.resolved_entries()
                .filter_map(EngineInfo::output_path)
                .collect()
        } else {
            self.output_path().into_iter().collect()
        }
    }
}

/// Request-scoped metadata for a probed URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaMetadata {
    pub title: String,
    pub uploader: Option<String>,
    pub duration: Option<u64>,
    pub thumbnail: Option<String>,
    pub formats: Vec<FormatDescriptor>,
    pub entries: Vec<MediaMetadata>,
}

impl From<&EngineInfo> for MediaMetadata {
    fn from(info: &EngineInfo) -> Self {
        Self {
            title: info
                .title
                .clone()
                .unwrap_or_else(|| "Unknown Title".to_string()),
            uploader: info.uploader.clone(),
            duration: info
                .duration
                .filter(|d| d.is_finite() && *d >= 0.0)
                .map(|d| d as u64),
            thumbnail: info.thumbnail.clone(),
            formats: info.formats.clone().unwrap_or_default(),
            entries: info.resolved_entries().map(MediaMetadata::from).collect(),
        }
    }
}
