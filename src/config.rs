//! Layered configuration: defaults, `crucible.toml`, environment, then CLI flags

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use crucible_core::{DEFAULT_DATA_PATH, DEFAULT_PAGE_SIZE};
use crucible_engine::EngineSpec;
use crucible_server::{DEFAULT_IMAGE_BASE_URL, ServerConfig, SessionConfig};
use serde::Deserialize;

/// Read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "crucible.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub data: DataSection,
    pub catalog: CatalogSection,
    pub session: SessionSection,
    pub engine: EngineSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub elements: PathBuf,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            elements: PathBuf::from(DEFAULT_DATA_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    pub page_size: usize,
    pub base_url: String,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub search_timeout_ms: Option<u64>,
    pub report_stats: bool,
    pub coalesce_duplicates: bool,
    pub frame_buffer: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            search_timeout_ms: None,
            report_stats: defaults.report_stats,
            coalesce_duplicates: defaults.coalesce_duplicates,
            frame_buffer: defaults.frame_buffer,
        }
    }
}

/// `kind` is one of `process`, `http` or `scripted`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub kind: Option<String>,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub url: Option<String>,
    pub script: Option<PathBuf>,
}

impl Config {
    /// Load from `path`, or from `crucible.toml` when present, then apply
    /// the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Apply `CRUCIBLE_HOST`, `CRUCIBLE_PORT`, `CRUCIBLE_DATA` and `BASE_URL`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = var("CRUCIBLE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("CRUCIBLE_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("CRUCIBLE_PORT is not a port: {}", port))?;
        }
        if let Some(data) = var("CRUCIBLE_DATA") {
            self.data.elements = PathBuf::from(data);
        }
        if let Some(base_url) = var("BASE_URL") {
            self.catalog.base_url = base_url;
        }
        Ok(())
    }

    /// The engine named by the `[engine]` section, if any.
    pub fn engine_spec(&self) -> Result<Option<EngineSpec>> {
        let engine = &self.engine;
        let Some(kind) = engine.kind.as_deref() else {
            return Ok(None);
        };
        let spec = match kind {
            "process" => EngineSpec::Process {
                program: engine
                    .command
                    .clone()
                    .context("[engine] kind = \"process\" needs `command`")?,
                args: engine.args.clone(),
            },
            "http" => EngineSpec::Http {
                url: engine
                    .url
                    .clone()
                    .context("[engine] kind = \"http\" needs `url`")?,
            },
            "scripted" => EngineSpec::Scripted {
                path: engine
                    .script
                    .clone()
                    .context("[engine] kind = \"scripted\" needs `script`")?,
            },
            other => bail!("unknown engine kind in config: {}", other),
        };
        Ok(Some(spec))
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            static_dir: self.server.static_dir.clone(),
            page_size: self.catalog.page_size,
            image_base_url: self.catalog.base_url.clone(),
            session: SessionConfig {
                search_timeout: self.session.search_timeout_ms.map(Duration::from_millis),
                report_stats: self.session.report_stats,
                coalesce_duplicates: self.session.coalesce_duplicates,
                frame_buffer: self.session.frame_buffer.max(1),
            },
        }
    }
}
