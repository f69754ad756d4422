//! Static viewer web server
//!
//! Serves the viewer's static assets over HTTP and points a browser at the
//! studio page with the slicer URL as a query parameter.

use axum::Router;
use cubesext_core::ViewerSettings;
use std::path::{Path, PathBuf};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use url::Url;

/// Viewer server errors
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Static directory not found: {0}")]
    StaticDir(PathBuf),

    #[error("Failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Studio page URL for a viewer on `port` talking to the slicer at `cubes_url`
pub fn viewer_url(port: u16, cubes_url: &str) -> Result<Url, ViewerError> {
    let base = format!("http://localhost:{}/studio.html", port);
    Ok(Url::parse_with_params(&base, [("cubes_url", cubes_url)])?)
}

/// Static file server for the viewer assets
#[derive(Debug, Clone)]
pub struct StaticViewer {
    static_dir: PathBuf,
    host: String,
    port: u16,
}

impl StaticViewer {
    pub fn new(static_dir: impl Into<PathBuf>, host: impl Into<String>, port: u16) -> Self {
        Self {
            static_dir: static_dir.into(),
            host: host.into(),
            port,
        }
    }

    /// Viewer with the configured host and port, serving `static_dir`
    pub fn from_settings(settings: &ViewerSettings, static_dir: impl Into<PathBuf>) -> Self {
        Self::new(static_dir, settings.host.clone(), settings.port)
    }

    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Router serving every file under the static directory
    pub fn router(&self) -> Router {
        Router::new()
            .fallback_service(ServeDir::new(&self.static_dir))
            .layer(CorsLayer::permissive())
    }

    /// Serve until interrupted, blocking the calling thread
    pub fn serve(&self, cubes_url: &str, open_browser: bool) -> Result<(), ViewerError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ViewerError::Runtime)?;

        runtime.block_on(self.serve_async(cubes_url, open_browser))
    }

    /// Serve until interrupted
    pub async fn serve_async(&self, cubes_url: &str, open_browser: bool) -> Result<(), ViewerError> {
        if !self.static_dir.is_dir() {
            return Err(ViewerError::StaticDir(self.static_dir.clone()));
        }

        let url = viewer_url(self.port, cubes_url)?;
        let addr = self.address();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ViewerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        tracing::info!(
            addr = %addr,
            static_dir = %self.static_dir.display(),
            "viewer listening"
        );
        println!("Viewer: {}", url);

        if open_browser {
            if let Err(e) = open::that(url.as_str()) {
                tracing::warn!(error = %e, "could not open browser");
            }
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
            .map_err(ViewerError::Serve)
    }
}
