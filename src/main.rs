//! Vanity package page server.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │                  VANITY SERVER                    │
//!                       │                                                   │
//!   Client Request      │  ┌─────────┐    ┌──────────────┐                  │
//!   ────────────────────┼─▶│  http   │───▶│ ConfigServer │                  │
//!                       │  │ server  │    │  (snapshot)  │                  │
//!                       │  └─────────┘    └──────┬───────┘                  │
//!                       │                        │ stale?                   │
//!                       │            ┌───────────┼────────────┐             │
//!                       │            ▼           ▼            ▼             │
//!                       │     ┌───────────┐ ┌─────────┐ ┌───────────┐       │
//!                       │     │  sources  │ │ catalog │ │ templates │◀──────┼── *.tpl.*
//!                       │     │fingerprint│ │ (JSON)  │◀┼───────────┼───────┼── *.json
//!                       │     └───────────┘ └─────────┘ └───────────┘       │
//!                       │                                                   │
//!   Client Response     │   page + Refresh: 3;url=<doc host><import path>   │
//!   ◀───────────────────┼───────────────────────────────────────────────────│
//!                       │                                                   │
//!                       │  Cross-cutting: config · lifecycle · observability│
//!                       └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use vanity::config::{read_config, validate_config, ConfigError, VanityConfig};
use vanity::http::HttpServer;
use vanity::lifecycle::{signals, Shutdown};
use vanity::observability::{logging, metrics};
use vanity::server::ConfigServer;
use vanity::sources::SourceWatcher;

#[derive(Parser)]
#[command(name = "vanity")]
#[command(about = "Serves vanity import path pages for Go packages", version)]
struct Cli {
    /// TOML configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log file (appended to, in addition to stderr)
    #[arg(long)]
    log: Option<String>,

    /// Directory containing templates (*.tpl.*)
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Glob matching JSON project files
    #[arg(long)]
    projects: Option<String>,

    /// Address on which to listen for http connections
    #[arg(long)]
    http: Option<String>,

    /// Analytics property ID exposed to templates
    #[arg(long)]
    analytics: Option<String>,

    /// Never reload sources while serving
    #[arg(long)]
    no_reload: bool,

    /// Reload sources in the background when their directories change
    #[arg(long)]
    watch: bool,
}

impl Cli {
    fn apply(self, config: &mut VanityConfig) {
        if let Some(log) = self.log {
            config.observability.log_file = log;
        }
        if let Some(dir) = self.templates {
            config.sources.templates = dir.join("*.tpl.*").to_string_lossy().into_owned();
        }
        if let Some(projects) = self.projects {
            config.sources.projects = projects;
        }
        if let Some(http) = self.http {
            config.listener.bind_address = http;
        }
        if let Some(analytics) = self.analytics {
            config.render.analytics_id = analytics;
        }
        if self.no_reload {
            config.reload.on_demand = false;
        }
        if self.watch {
            config.reload.watch = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => VanityConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    let _log_guard = logging::init_logging(&config.observability)?;

    tracing::info!("vanity v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        templates = %config.sources.templates,
        projects = %config.sources.projects,
        reload_on_demand = config.reload.on_demand,
        watch = config.reload.watch,
        "Configuration loaded"
    );

    // Without an initial snapshot there is nothing to serve.
    let server = ConfigServer::load(
        &config.sources,
        config.render.clone(),
        config.reload.on_demand,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Initial source load failed");
        e
    })?;
    let server = Arc::new(server);

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let _watcher = if config.reload.watch {
        Some(SourceWatcher::new(server.clone()).run()?)
    } else {
        None
    };

    let shutdown = Shutdown::new();
    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));
    tokio::spawn(signals::reload_on_hangup(server.clone(), shutdown.clone()));

    let listener = TcpListener::bind(config.listener.socket_addr()?).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let http = HttpServer::new(config, server);
    http.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
