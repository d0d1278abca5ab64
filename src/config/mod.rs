use crate::media::SelectionPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base of the links handed out for downloaded files. Defaults to
    /// `http://<host>:<port>`.
    pub public_base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9600,
            public_base_url: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn public_base_url(&self) -> Result<Url> {
        let raw = match &self.public_base_url {
            Some(url) => url.clone(),
            None => format!("http://{}:{}", self.host, self.port),
        };

        let url = Url::parse(&raw).with_context(|| format!("Invalid public base URL: {}", raw))?;
        if url.cannot_be_a_base() {
            anyhow::bail!("Public base URL cannot carry a path: {}", raw);
        }
        Ok(url)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub downloads_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            downloads_dir: PathBuf::from("downloads"),
            static_dir: PathBuf::from("static"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub binary: String,
    pub ffmpeg_location: Option<String>,
    /// No limit when unset.
    pub probe_timeout_secs: Option<u64>,
    pub fetch_timeout_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            ffmpeg_location: None,
            probe_timeout_secs: None,
            fetch_timeout_secs: None,
        }
    }
}

impl EngineConfig {
    pub fn probe_timeout(&self) -> Option<Duration> {
        self.probe_timeout_secs.map(Duration::from_secs)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub codec: String,
    pub bitrate_kbps: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            codec: "mp3".to_string(),
            bitrate_kbps: 192,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SelectionConfig {
    pub policy: SelectionPolicy,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `"json"` or `"pretty"`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub engine: EngineConfig,
    pub audio: AudioConfig,
    pub selection: SelectionConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port must be non-zero");
        }
        self.server.public_base_url()?;

        let codec = &self.audio.codec;
        if codec.is_empty() || !codec.chars().all(|c| c.is_ascii_alphanumeric()) {
            anyhow::bail!("audio.codec must be a plain extension like \"mp3\", got {:?}", codec);
        }
        if self.audio.bitrate_kbps == 0 {
            anyhow::bail!("audio.bitrate_kbps must be non-zero");
        }
        if self.engine.binary.trim().is_empty() {
            anyhow::bail!("engine.binary must not be empty");
        }

        Ok(())
    }

    pub fn get_logging_format(&self) -> &str {
        &self.logging.format
    }
}
