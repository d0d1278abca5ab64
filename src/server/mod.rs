mod error;
mod routes;

use crate::{config::Config, media::MediaService};
use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{info, warn};
use url::Url;

/// Builds the public links for files in the downloads directory.
#[derive(Debug, Clone)]
pub struct PublicLinks {
    base: Url,
}

impl PublicLinks {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// `<base>/downloads/<basename>`, percent-encoded.
    pub fn download_link(&self, file: &Path) -> Option<Url> {
        let name = file.file_name()?.to_str()?;
        let mut link = self.base.clone();
        {
            let mut segments = link.path_segments_mut().ok()?;
            segments.pop_if_empty().push("downloads").push(name);
        }
        Some(link)
    }
}

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    media: Arc<MediaService>,
    links: PublicLinks,
    static_dir: PathBuf,
}

impl AppState {
    pub fn new(media: MediaService, links: PublicLinks, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            media: Arc::new(media),
            links,
            static_dir: static_dir.into(),
        }
    }
}

/// Wires every route to `state`. Each call returns an independent instance.
pub fn build_router(state: AppState) -> Router {
    let downloads = ServeDir::new(state.media.downloads_dir());
    let statics = ServeDir::new(&state.static_dir);
    let favicon = ServeFile::new(state.static_dir.join("favicon.ico"));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::home))
        .route_service("/favicon.ico", favicon)
        .route("/info", post(routes::probe_info))
        .route("/download", post(routes::download))
        .route("/music_download", post(routes::music_download))
        .nest_service("/downloads", downloads)
        .nest_service("/static", statics)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run(config: Config) -> Result<()> {
    let media = MediaService::from_config(&config);

    if let Err(e) = media.test_setup().await {
        warn!("Media engine test failed: {}", e);
    }

    tokio::fs::create_dir_all(media.downloads_dir())
        .await
        .with_context(|| {
            format!(
                "Failed to create downloads directory {}",
                media.downloads_dir().display()
            )
        })?;

    let links = PublicLinks::new(config.server.public_base_url()?);
    info!("Public base URL: {}", links.base);

    let state = AppState::new(media, links, config.storage.static_dir.clone());
    let app = build_router(state);

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::testing::{service, FakeEngine};
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use tempfile::TempDir;

    struct TestServer {
        addr: SocketAddr,
        downloads: TempDir,
        _statics: TempDir,
        client: reqwest::Client,
    }

    impl TestServer {
        async fn start(engine: FakeEngine) -> Self {
            let downloads = tempfile::tempdir().unwrap();
            let statics = tempfile::tempdir().unwrap();
            std::fs::write(statics.path().join("favicon.ico"), b"icon").unwrap();

            let links = PublicLinks::new(Url::parse("http://media.example.com:9600").unwrap());
            let state = AppState::new(service(engine, downloads.path()), links, statics.path());
            let app = build_router(state);

            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            Self {
                addr,
                downloads,
                _statics: statics,
                client: reqwest::Client::new(),
            }
        }

        fn url(&self, path: &str) -> String {
            format!("http://{}{}", self.addr, path)
        }

        async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> reqwest::Response {
            let body = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(fields)
                .finish();
            self.client
                .post(self.url(path))
                .header("content-type", "application/x-www-form-urlencoded")
                .body(body)
                .send()
                .await
                .unwrap()
        }
    }

    fn clip_info() -> Value {
        json!({
            "title": "Clip",
            "uploader": "someone",
            "duration": 10,
            "formats": [
                {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a",
                 "abr": 129.5},
                {"format_id": "18", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a",
                 "width": 640, "height": 360, "fps": 25}
            ]
        })
    }

    #[test]
    fn test_download_link() {
        let links = PublicLinks::new(Url::parse("http://zap.example.com:9600").unwrap());
        assert_eq!(
            links
                .download_link(Path::new("downloads/My Video.mp4"))
                .unwrap()
                .as_str(),
            "http://zap.example.com:9600/downloads/My%20Video.mp4"
        );

        let links = PublicLinks::new(Url::parse("https://example.com/zap/").unwrap());
        assert_eq!(
            links.download_link(Path::new("/abs/a.mp3")).unwrap().as_str(),
            "https://example.com/zap/downloads/a.mp3"
        );
    }

    #[tokio::test]
    async fn test_home() {
        let server = TestServer::start(FakeEngine::default()).await;
        let body: Value = server
            .client
            .get(server.url("/"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, json!({"message": "Hello World"}));
    }

    #[tokio::test]
    async fn test_favicon() {
        let server = TestServer::start(FakeEngine::default()).await;
        let response = server
            .client
            .get(server.url("/favicon.ico"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.bytes().await.unwrap()[..], b"icon"[..]);
    }

    #[tokio::test]
    async fn test_info() {
        let server = TestServer::start(FakeEngine {
            info: Some(clip_info()),
            ..Default::default()
        })
        .await;

        let response = server
            .post_form("/info", &[("url", "https://example.com/clip")])
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["title"], "Clip");
        assert_eq!(body["duration_sec"], 10);
        assert_eq!(body["best_video_audio"]["format_id"], "18");
        assert_eq!(body["best_video_audio"]["resolution"], "640x360");
        assert_eq!(body["best_audio_only"]["format_id"], "140");
        assert!(body["best_audio_only"]["resolution"].is_null());
    }

    #[tokio::test]
    async fn test_info_failure() {
        let server = TestServer::start(FakeEngine::default()).await;
        let response = server
            .post_form("/info", &[("url", "https://example.com/gone")])
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"error": "Video not found or unavailable"}));
    }

    #[tokio::test]
    async fn test_download_and_serve() {
        let server = TestServer::start(FakeEngine {
            formats: vec!["18".to_string()],
            outputs: vec![Some("Clip: one!.mp4".to_string())],
            ..Default::default()
        })
        .await;

        let response = server
            .post_form(
                "/download",
                &[("url", "https://example.com/clip"), ("format_id", "18")],
            )
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body,
            json!({
                "status": "success",
                "download_urls": ["http://media.example.com:9600/downloads/Clip%20one.mp4"]
            })
        );
        assert!(server.downloads.path().join("Clip one.mp4").exists());

        let served = server
            .client
            .get(server.url("/downloads/Clip%20one.mp4"))
            .send()
            .await
            .unwrap();
        assert_eq!(served.status(), reqwest::StatusCode::OK);
        assert_eq!(served.bytes().await.unwrap()[..], b"Clip: one!.mp4"[..]);
    }

    #[tokio::test]
    async fn test_download_unknown_format() {
        let server = TestServer::start(FakeEngine {
            formats: vec!["18".to_string()],
            outputs: vec![Some("Clip.mp4".to_string())],
            ..Default::default()
        })
        .await;

        let response = server
            .post_form(
                "/download",
                &[("url", "https://example.com/clip"), ("format_id", "bogus")],
            )
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"detail": "Failed to download video"}));
    }

    #[tokio::test]
    async fn test_download_missing_format_id() {
        let server = TestServer::start(FakeEngine::default()).await;
        let response = server
            .post_form("/download", &[("url", "https://example.com/clip")])
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"detail": "format_id must not be empty"}));
    }

    #[tokio::test]
    async fn test_music_download_playlist() {
        let server = TestServer::start(FakeEngine {
            formats: vec!["bestaudio/best".to_string()],
            outputs: vec![
                Some("First.webm".to_string()),
                None,
                Some("Second.m4a".to_string()),
            ],
            ..Default::default()
        })
        .await;

        let response = server
            .post_form("/music_download", &[("url", "https://example.com/list")])
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body["download_urls"],
            json!([
                "http://media.example.com:9600/downloads/First.mp3",
                "http://media.example.com:9600/downloads/Second.mp3"
            ])
        );
    }

    #[tokio::test]
    async fn test_music_download_failure() {
        let server = TestServer::start(FakeEngine::default()).await;
        let response = server
            .post_form("/music_download", &[("url", "https://example.com/song")])
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"detail": "Failed to download audio"}));
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let server = TestServer::start(FakeEngine::default()).await;
        let response = server
            .client
            .get(server.url("/"))
            .header("origin", "https://app.example.com")
            .send()
            .await
            .unwrap();
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "*"
        );
    }
}
