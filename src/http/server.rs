//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router mounting every path under the configured prefix
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind server to listener and shut down gracefully
//! - Hand each request to the ConfigServer and shape the response

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use percent_encoding::percent_decode_str;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::VanityConfig;
use crate::http::request::{request_id, request_id_layer};
use crate::server::{ConfigServer, Page};

const REFRESH: HeaderName = HeaderName::from_static("refresh");

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub server: Arc<ConfigServer>,
    /// Mount point without its trailing slash; empty when serving from `/`.
    pub mount: Arc<str>,
}

/// HTTP front end for a [`ConfigServer`].
pub struct HttpServer {
    router: Router,
    config: VanityConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving pages from `server`.
    pub fn new(config: VanityConfig, server: Arc<ConfigServer>) -> Self {
        let router = Self::build_router(&config, server);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &VanityConfig, server: Arc<ConfigServer>) -> Router {
        let mount = config.listener.mount_path.trim_end_matches('/').to_string();
        let app = if mount.is_empty() {
            Router::new()
                .route("/", any(page_handler))
                .route("/{*path}", any(page_handler))
        } else {
            // The mount point itself, with and without the trailing slash,
            // plus everything below it.
            Router::new()
                .route(&mount, any(page_handler))
                .route(&format!("{}/", mount), any(page_handler))
                .route(&format!("{}/{{*path}}", mount), any(page_handler))
        };
        let app = app.with_state(AppState {
            server,
            mount: mount.into(),
        });

        app.layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id = %request_id(req),
                )
            }))
            .layer(request_id_layer())
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mount_path = %self.config.listener.mount_path,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &VanityConfig {
        &self.config
    }
}

/// Serves every path: checks freshness, derives the context and renders.
async fn page_handler(State(state): State<AppState>, uri: Uri) -> Response {
    let sub_path = sub_path(uri.path(), &state.mount);
    let go_get = uri.query().map(is_go_get).unwrap_or(false);

    tracing::debug!(sub_path = %sub_path, go_get, "Serving page");

    // Staleness checks, reloads and rendering all touch the filesystem.
    let server = state.server.clone();
    match tokio::task::spawn_blocking(move || server.respond(&sub_path, go_get)).await {
        Ok(page) => page_response(page),
        Err(e) => {
            tracing::error!(error = %e, "Page task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "server error").into_response()
        }
    }
}

/// Strip the mount point and one separator, then percent-decode what is left.
fn sub_path(path: &str, mount: &str) -> String {
    let rest = path.strip_prefix(mount).unwrap_or(path);
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    percent_decode_str(rest).decode_utf8_lossy().into_owned()
}

fn is_go_get(query: &str) -> bool {
    query.split('&').any(|pair| pair == "go-get=1")
}

/// Render failures are already logged; whatever body was produced is sent
/// with the default status.
fn page_response(page: Page) -> Response {
    let mut response = Response::new(Body::from(page.body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );

    if let Some(refresh) = page.refresh {
        match HeaderValue::from_str(&refresh) {
            Ok(value) => {
                headers.insert(REFRESH, value);
            }
            Err(e) => tracing::warn!(refresh = %refresh, error = %e, "Unencodable Refresh header"),
        }
    }
    response
}
