mod engine;
mod error;
mod files;
mod select;
mod types;
mod ytdlp;

pub use engine::{AudioExtraction, Engine, FetchRequest};
pub use error::MediaError;
pub use select::{ProbeReport, SelectionPolicy};
pub use types::MediaMetadata;

use crate::{config::Config, utils::replace_extension};
use anyhow::Result;
use files::Staging;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use ytdlp::YtDlpEngine;

const AUDIO_SELECTOR: &str = "bestaudio/best";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
    Video,
    Audio,
}

impl FetchKind {
    fn placeholder(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }

    fn failure(self) -> MediaError {
        match self {
            Self::Video => MediaError::Download("Failed to download video".to_string()),
            Self::Audio => MediaError::Download("Failed to download audio".to_string()),
        }
    }
}

/// Probes and downloads media through an [`Engine`], placing results in the
/// downloads directory.
pub struct MediaService {
    engine: Box<dyn Engine>,
    downloads_dir: PathBuf,
    audio: AudioExtraction,
    policy: SelectionPolicy,
}

impl MediaService {
    pub fn new(
        engine: Box<dyn Engine>,
        downloads_dir: impl Into<PathBuf>,
        audio: AudioExtraction,
        policy: SelectionPolicy,
    ) -> Self {
        Self {
            engine,
            downloads_dir: downloads_dir.into(),
            audio,
            policy,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let engine = YtDlpEngine::new(config.engine.binary.clone())
            .with_ffmpeg_location(config.engine.ffmpeg_location.clone())
            .with_timeouts(config.engine.probe_timeout(), config.engine.fetch_timeout());

        info!(
            "Media service initialized - {} into {}",
            engine.name(),
            config.storage.downloads_dir.display()
        );

        Self::new(
            Box::new(engine),
            config.storage.downloads_dir.clone(),
            AudioExtraction {
                codec: config.audio.codec.clone(),
                bitrate_kbps: config.audio.bitrate_kbps,
            },
            config.selection.policy,
        )
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// Resolves metadata and the best format candidates for `url`.
    pub async fn probe(&self, url: &str) -> Result<ProbeReport, MediaError> {
        let url = require_url(url)?;
        info!("Probing formats for URL: {}", url);

        let info = self.engine.probe(url).await.map_err(|e| {
            warn!("{} could not resolve {}: {:#}", self.engine.name(), url, e);
            MediaError::Extraction("Video not found or unavailable".to_string())
        })?;

        let metadata = MediaMetadata::from(&info);
        Ok(ProbeReport::new(&metadata, self.policy))
    }

    /// Downloads `url` in the given engine format.
    pub async fn fetch_video(
        &self,
        url: &str,
        format_id: &str,
    ) -> Result<Vec<PathBuf>, MediaError> {
        let url = require_url(url)?;
        let format_id = format_id.trim();
        if format_id.is_empty() {
            return Err(MediaError::InvalidRequest(
                "format_id must not be empty".to_string(),
            ));
        }

        self.fetch(url, format_id, FetchKind::Video).await
    }

    /// Downloads the best audio stream of `url` and transcodes it.
    pub async fn fetch_audio(&self, url: &str) -> Result<Vec<PathBuf>, MediaError> {
        let url = require_url(url)?;
        self.fetch(url, AUDIO_SELECTOR, FetchKind::Audio).await
    }

    async fn fetch(
        &self,
        url: &str,
        format: &str,
        kind: FetchKind,
    ) -> Result<Vec<PathBuf>, MediaError> {
        info!("Starting {:?} download for URL: {}", kind, url);

        let staging = Staging::create(&self.downloads_dir).map_err(|e| {
            error!("Cannot prepare download: {:#}", e);
            kind.failure()
        })?;

        debug!("Staging download in {}", staging.path().display());

        let request = FetchRequest {
            url: url.to_string(),
            format: format.to_string(),
            output_template: staging.output_template(),
            audio: match kind {
                FetchKind::Video => None,
                FetchKind::Audio => Some(self.audio.clone()),
            },
        };

        let reported = self.engine.fetch(&request).await.map_err(|e| {
            warn!("{} failed to download {}: {:#}", self.engine.name(), url, e);
            kind.failure()
        })?;

        let mut placed = Vec::with_capacity(reported.len());
        for path in reported {
            // The engine reports the pre-transcode name
            let path = match kind {
                FetchKind::Video => path,
                FetchKind::Audio => replace_extension(&path, &self.audio.codec),
            };

            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                warn!("Engine reported {} but it does not exist", path.display());
                continue;
            }

            let target = files::place_file(&path, &self.downloads_dir, kind.placeholder())
                .await
                .map_err(|e| {
                    error!("Cannot store {}: {:#}", path.display(), e);
                    kind.failure()
                })?;
            placed.push(target);
        }

        info!("Downloaded {} file(s) for {}", placed.len(), url);
        Ok(placed)
    }

    pub async fn test_setup(&self) -> Result<()> {
        info!("Testing media engine setup...");

        if self.engine.test_availability().await {
            info!("{} is available", self.engine.name());
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "{} is not available. Please install it or set engine.binary.",
                self.engine.name()
            ))
        }
    }
}

fn require_url(url: &str) -> Result<&str, MediaError> {
    let url = url.trim();
    if url.is_empty() {
        Err(MediaError::InvalidRequest("url must not be empty".to_string()))
    } else {
        Ok(url)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::types::EngineInfo;
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory engine that writes fixed files into the requested output
    /// directory.
    #[derive(Default)]
    pub struct FakeEngine {
        pub info: Option<serde_json::Value>,
        /// Formats `fetch` accepts.
        pub formats: Vec<String>,
        /// One entry per playlist item; `None` models an unresolved item.
        pub outputs: Vec<Option<String>>,
        pub requests: Mutex<Vec<FetchRequest>>,
    }

    #[async_trait]
    impl Engine for FakeEngine {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn probe(&self, _url: &str) -> Result<EngineInfo> {
            let info = self
                .info
                .clone()
                .ok_or_else(|| anyhow::anyhow!("ERROR: Unsupported URL"))?;
            Ok(serde_json::from_value(info)?)
        }

        async fn fetch(&self, request: &FetchRequest) -> Result<Vec<PathBuf>> {
            self.requests.lock().unwrap().push(request.clone());

            if !self.formats.iter().any(|f| f == &request.format) {
                anyhow::bail!("ERROR: Requested format is not available");
            }

            let dir = Path::new(&request.output_template)
                .parent()
                .unwrap()
                .to_path_buf();

            let mut paths = Vec::new();
            for name in self.outputs.iter().flatten() {
                let reported = dir.join(name);
                let written = match &request.audio {
                    Some(audio) => replace_extension(&reported, &audio.codec),
                    None => reported.clone(),
                };
                std::fs::write(&written, name.as_bytes())?;
                paths.push(reported);
            }
            Ok(paths)
        }

        async fn test_availability(&self) -> bool {
            true
        }
    }

    pub fn service(engine: FakeEngine, downloads_dir: &Path) -> MediaService {
        MediaService::new(
            Box::new(engine),
            downloads_dir,
            AudioExtraction {
                codec: "mp3".to_string(),
                bitrate_kbps: 192,
            },
            SelectionPolicy::Best,
        )
    }
}
