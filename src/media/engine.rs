use super::types::EngineInfo;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Post-processing that turns a download into an audio file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioExtraction {
    /// Target codec, also used as the output file extension.
    pub codec: String,
    pub bitrate_kbps: u32,
}

/// Parameters of a single download call.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    /// Engine format selector, e.g. `"22"` or `"bestaudio/best"`.
    pub format: String,
    /// Output path template in the engine's own substitution syntax.
    pub output_template: String,
    pub audio: Option<AudioExtraction>,
}

#[async_trait]
pub trait Engine: Send + Sync {
    /// Human-readable name of the engine
    fn name(&self) -> &'static str;

    /// Resolve metadata for the given URL without downloading anything
    async fn probe(&self, url: &str) -> Result<EngineInfo>;

    /// Download according to `request` and return one path per resolved item,
    /// exactly as the engine reports them
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<PathBuf>>;

    /// Test if this engine is available on the system
    async fn test_availability(&self) -> bool;
}
