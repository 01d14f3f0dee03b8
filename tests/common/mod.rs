//! Shared utilities for integration testing.

use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::net::TcpListener;
use vanity::config::{RenderConfig, SourcesConfig, VanityConfig};
use vanity::{ConfigServer, HttpServer, Shutdown};

/// Root template used by most tests.
pub const MAIN: &str = r#"<html><head>
{%- if go_get and project %}<meta name="go-import" content="{{ project.import_path }} {{ project.vcs }} {{ project.repo }}">{% endif %}
</head><body>
{%- if redirect_url %}Redirecting to <a href="{{ redirect_url }}">{{ ga_arg }}</a>
{%- elif ga_action == "List" %}{% for key, p in projects|items %}{% if not p.hidden %}[{{ key }}]{% endif %}{% endfor %}
{%- else %}Nothing here{% endif %}
{%- if site %} on {{ site }}{% endif %} ga={{ ga_id }}</body></html>"#;

pub const PROJECTS: &str = r#"{
    "rx": {
        "name": "rx",
        "description": "Package version and dependency manager",
        "import_path": "kylelemons.net/go/rx",
        "vcs": "git",
        "repo": "https://github.com/kylelemons/rx"
    },
    "atom": {
        "Name": "atom",
        "Desc": "Atom Syndication",
        "Import": "kylelemons.net/go/atom",
        "VCS": "git",
        "Repo": "git://kylelemons.net/go/atom.git",
        "Hidden": true
    }
}"#;

/// A temporary site directory with templates/ and projects/.
pub struct Site {
    pub dir: tempfile::TempDir,
}

#[allow(dead_code)]
impl Site {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("templates")).unwrap();
        std::fs::create_dir(dir.path().join("projects")).unwrap();
        let site = Self { dir };
        site.write("templates/main.tpl.html", MAIN);
        site.write("projects/kylelemons.json", PROJECTS);
        site
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write a file and push its mtime ahead so the change is always seen.
    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.path(rel);
        std::fs::write(&path, contents).unwrap();
        bump_mtime(&path);
    }

    pub fn sources(&self) -> SourcesConfig {
        SourcesConfig {
            templates: format!("{}/templates/*.tpl.*", self.dir.path().display()),
            projects: format!("{}/projects/*.json", self.dir.path().display()),
        }
    }

    pub fn config(&self) -> VanityConfig {
        let mut config = VanityConfig::default();
        config.listener.bind_address = "127.0.0.1:0".to_string();
        config.sources = self.sources();
        config.render = RenderConfig {
            analytics_id: "UA-1350650-1".to_string(),
            ..Default::default()
        };
        config
    }
}

fn bump_mtime(path: &Path) {
    static TICK: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);
    let ahead = TICK.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(ahead))
        .unwrap();
}

/// A running server bound to an ephemeral port.
pub struct Running {
    pub addr: SocketAddr,
    pub server: Arc<ConfigServer>,
    pub shutdown: Shutdown,
}

#[allow(dead_code)]
impl Running {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Load `config`'s sources and serve them on 127.0.0.1.
pub async fn start_server(config: VanityConfig) -> Running {
    let server = Arc::new(
        ConfigServer::load(&config.sources, config.render.clone(), config.reload.on_demand)
            .unwrap(),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let http = HttpServer::new(config, server.clone());
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = http.run(listener, rx).await;
    });

    Running {
        addr,
        server,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
