use super::{
    engine::{Engine, FetchRequest},
    types::EngineInfo,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::{path::PathBuf, process::Stdio, time::Duration};
use tokio::process::Command;
use tracing::{debug, info, warn};

pub struct YtDlpEngine {
    binary: String,
    ffmpeg_location: Option<String>,
    probe_timeout: Option<Duration>,
    fetch_timeout: Option<Duration>,
}

impl YtDlpEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            ffmpeg_location: None,
            probe_timeout: None,
            fetch_timeout: None,
        }
    }

    pub fn with_ffmpeg_location(mut self, location: Option<String>) -> Self {
        self.ffmpeg_location = location;
        self
    }

    pub fn with_timeouts(mut self, probe: Option<Duration>, fetch: Option<Duration>) -> Self {
        self.probe_timeout = probe;
        self.fetch_timeout = fetch;
        self
    }

    fn probe_args(url: &str) -> Vec<String> {
        let mut args: Vec<String> = [
            "--dump-single-json",
            "--skip-download",
            "--no-warnings",
            "--ignore-errors",
            "--yes-playlist",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        // `--` keeps a URL starting with a dash from being read as an option
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    fn fetch_args(&self, request: &FetchRequest) -> Vec<String> {
        let mut args: Vec<String> = [
            "--dump-single-json",
            "--no-simulate",
            "--no-warnings",
            "--ignore-errors",
            "--yes-playlist",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        args.push("--format".to_string());
        args.push(request.format.clone());
        args.push("--output".to_string());
        args.push(request.output_template.clone());

        if let Some(location) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(location.clone());
        }

        if let Some(audio) = &request.audio {
            args.push("--extract-audio".to_string());
            args.push("--audio-format".to_string());
            args.push(audio.codec.clone());
            args.push("--audio-quality".to_string());
            args.push(format!("{}K", audio.bitrate_kbps));
            args.push("--embed-thumbnail".to_string());
            args.push("--embed-metadata".to_string());
        }

        args.push("--".to_string());
        args.push(request.url.clone());
        args
    }

    /// Runs the engine and parses the single JSON document it prints.
    ///
    /// With `--ignore-errors` the engine exits non-zero whenever any playlist
    /// entry failed, so the exit status alone is not treated as failure. An
    /// empty or `null` document is.
    async fn run_json(&self, args: Vec<String>, limit: Option<Duration>) -> Result<EngineInfo> {
        debug!("Running {} {}", self.binary, args.join(" "));

        let mut command = Command::new(&self.binary);
        command
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match limit {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .with_context(|| format!("{} timed out after {:?}", self.binary, limit))?,
            None => command.output().await,
        }
        .with_context(|| format!("Failed to run {}", self.binary))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);

        let info: Option<EngineInfo> = if stdout.trim().is_empty() {
            None
        } else {
            serde_json::from_str(stdout.trim()).context("Failed to parse yt-dlp output")?
        };

        match info {
            Some(info) => {
                if !output.status.success() {
                    warn!(
                        "yt-dlp exited with {} but produced a result: {}",
                        output.status,
                        stderr.trim()
                    );
                }
                Ok(info)
            }
            None => Err(anyhow::anyhow!(
                "yt-dlp produced no result ({}): {}",
                output.status,
                stderr.trim()
            )),
        }
    }
}

#[async_trait]
impl Engine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn probe(&self, url: &str) -> Result<EngineInfo> {
        debug!("Extracting metadata with yt-dlp for: {}", url);
        self.run_json(Self::probe_args(url), self.probe_timeout)
            .await
            .context("Media metadata extraction failed")
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<PathBuf>> {
        info!(
            "Downloading with yt-dlp: {} (format {})",
            request.url, request.format
        );
        let info = self
            .run_json(self.fetch_args(request), self.fetch_timeout)
            .await
            .context("Media download failed")?;
        Ok(info.output_paths())
    }

    async fn test_availability(&self) -> bool {
        let yt_dlp_available = match Command::new(&self.binary).arg("--version").output().await {
            Ok(output) => {
                if output.status.success() {
                    let version = String::from_utf8_lossy(&output.stdout);
                    info!("yt-dlp is available, version: {}", version.trim());
                    true
                } else {
                    warn!("yt-dlp command failed");
                    false
                }
            }
            Err(e) => {
                warn!("yt-dlp not found at {}: {}", self.binary, e);
                false
            }
        };

        let ffmpeg = match &self.ffmpeg_location {
            Some(location) => PathBuf::from(location).join("ffmpeg"),
            None => PathBuf::from("ffmpeg"),
        };
        // Audio extraction and thumbnail embedding need ffmpeg
        let ffmpeg_available = match Command::new(&ffmpeg).arg("-version").output().await {
            Ok(output) if output.status.success() => {
                let version_line = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .next()
                    .unwrap_or("unknown")
                    .to_string();
                info!("ffmpeg is available: {}", version_line);
                true
            }
            Ok(_) => {
                warn!("ffmpeg command failed");
                false
            }
            Err(e) => {
                warn!("ffmpeg not found: {} (required for audio extraction)", e);
                false
            }
        };

        if yt_dlp_available && !ffmpeg_available {
            warn!("yt-dlp will work but /music_download will fail without ffmpeg");
        }

        yt_dlp_available
    }
}
