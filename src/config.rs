//! Server configuration.
//!
//! Settings come from an optional YAML file and the command line; flags win
//! over file values. The document root is always taken from the command line.
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 12306
//!   tls:
//!     enabled: true
//!     cert: /etc/docserve/cert
//!     key: /etc/docserve/pkey
//! logging:
//!   level: debug
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 12306;

/// Command line of the `docserve` binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "docserve")]
#[command(about = "Serves and accepts files under a document root over HTTP/1.x")]
#[command(version)]
pub struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "DOCSERVE_PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Terminate TLS using the certificate and key files
    #[arg(long)]
    pub tls: bool,

    /// PEM certificate chain
    #[arg(long)]
    pub cert: Option<PathBuf>,

    /// PEM private key
    #[arg(long)]
    pub key: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long = "log-level")]
    pub log_level: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory to serve
    pub docroot: PathBuf,
}

/// Process exit code for a command line that did not parse.
///
/// Help and version requests are successful exits; everything else is a
/// usage error.
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    use clap::error::ErrorKind;

    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tls: TlsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            tls: TlsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cert: PathBuf::from("cert"),
            key: PathBuf::from("pkey"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(text).context("invalid configuration")
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml_str(&text)
    }

    /// Builds the effective configuration: file (if any), then flags.
    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        let mut cfg = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(port) = cli.port {
            cfg.server.port = port;
        }
        if let Some(host) = cli.host {
            cfg.server.host = host;
        }
        if cli.tls {
            cfg.server.tls.enabled = true;
        }
        if let Some(cert) = cli.cert {
            cfg.server.tls.cert = cert;
        }
        if let Some(key) = cli.key {
            cfg.server.tls.key = key;
        }
        if let Some(level) = cli.log_level {
            cfg.logging.level = level;
        }
        cfg.static_files.root = cli.docroot;

        Ok(cfg)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn log_level(&self) -> anyhow::Result<tracing::Level> {
        self.logging
            .level
            .parse()
            .map_err(|_| anyhow::anyhow!("unknown log level {:?}", self.logging.level))
    }

    /// Checks that the document root is an existing directory.
    pub fn validate(&self) -> anyhow::Result<()> {
        let root = &self.static_files.root;
        let meta = std::fs::metadata(root)
            .with_context(|| format!("document root {}", root.display()))?;
        if !meta.is_dir() {
            bail!("document root {} is not a directory", root.display());
        }
        self.log_level()?;
        Ok(())
    }
}
