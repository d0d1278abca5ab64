use super::{
    error::{ApiError, ApiResult},
    AppState,
};
use crate::media::ProbeReport;
use axum::{extract::State, Form, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
pub struct InfoForm {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadForm {
    #[serde(default)]
    url: String,
    #[serde(default)]
    format_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MusicForm {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    status: &'static str,
    download_urls: Vec<String>,
}

pub async fn home() -> Json<Value> {
    Json(json!({"message": "Hello World"}))
}

pub async fn probe_info(
    State(state): State<AppState>,
    Form(form): Form<InfoForm>,
) -> ApiResult<Json<ProbeReport>> {
    debug!("Received info request for {}", form.url);

    let report = state.media.probe(&form.url).await.map_err(|e| {
        warn!("Info request failed: {}", e);
        ApiError::info(e)
    })?;

    Ok(Json(report))
}

pub async fn download(
    State(state): State<AppState>,
    Form(form): Form<DownloadForm>,
) -> ApiResult<Json<DownloadResponse>> {
    info!(
        "Received download request for {} (format {})",
        form.url, form.format_id
    );

    let files = state
        .media
        .fetch_video(&form.url, &form.format_id)
        .await
        .map_err(|e| {
            warn!("Download request failed: {}", e);
            ApiError::detail(e)
        })?;

    Ok(Json(state.success(&files)))
}

pub async fn music_download(
    State(state): State<AppState>,
    Form(form): Form<MusicForm>,
) -> ApiResult<Json<DownloadResponse>> {
    info!("Received music download request for {}", form.url);

    let files = state.media.fetch_audio(&form.url).await.map_err(|e| {
        warn!("Music download request failed: {}", e);
        ApiError::detail(e)
    })?;

    Ok(Json(state.success(&files)))
}

impl AppState {
    fn success(&self, files: &[PathBuf]) -> DownloadResponse {
        let download_urls: Vec<String> = files
            .iter()
            .filter_map(|file| self.links.download_link(file))
            .map(String::from)
            .collect();

        debug!("Generated download URLs: {:?}", download_urls);

        DownloadResponse {
            status: "success",
            download_urls,
        }
    }
}
