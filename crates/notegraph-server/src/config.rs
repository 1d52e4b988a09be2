//! Server configuration: a TOML file with every field defaulted, overridden
//! by command-line flags.

use anyhow::{Context, Result};
use notegraph_core::graph::DEFAULT_UNTITLED_TITLE;
use notegraph_core::sqlite::SqliteConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub server: ListenConfig,
    pub database: DatabaseConfig,
    pub graph: GraphConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub wal_mode: bool,
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let sqlite = SqliteConfig::default();
        Self {
            path: sqlite.path,
            wal_mode: sqlite.wal_mode,
            busy_timeout_ms: sqlite.busy_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Title shown for graph nodes whose note has no title.
    pub untitled_title: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            untitled_title: DEFAULT_UNTITLED_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ServerConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid configuration")
    }

    /// Read `path`, or use defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("In config file {}", path.display()))
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(path) = overrides.database {
            self.database.path = path;
        }
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        self
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .with_context(|| format!("Invalid listen address {}", addr))
    }

    pub fn sqlite(&self) -> SqliteConfig {
        SqliteConfig {
            wal_mode: self.database.wal_mode,
            busy_timeout_ms: self.database.busy_timeout_ms,
            ..SqliteConfig::new(&self.database.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.graph.untitled_title, "Untitled");
        assert_eq!(config.log.filter, "info");
        assert!(config.database.wal_mode);
    }

    #[test]
    fn sections_override_defaults() {
        let config = ServerConfig::from_toml(
            r#"
            [server]
            port = 9000

            [database]
            path = ":memory:"
            wal_mode = false

            [graph]
            untitled_title = "(untitled)"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert!(config.sqlite().is_memory());
        assert!(!config.sqlite().wal_mode);
        assert_eq!(config.graph.untitled_title, "(untitled)");
    }

    #[test]
    fn unknown_sections_are_rejected() {
        assert!(ServerConfig::from_toml("[servr]\nport = 1").is_err());
    }

    #[test]
    fn cli_overrides_win() {
        let config = ServerConfig::default().apply(Overrides {
            database: Some(PathBuf::from("/tmp/x.db")),
            host: Some("0.0.0.0".into()),
            port: Some(3000),
        });
        assert_eq!(config.database.path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[log]\nfilter = \"debug\"").unwrap();
        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.log.filter, "debug");

        assert!(ServerConfig::load(Some(Path::new("/nonexistent/notegraph.toml"))).is_err());
    }
}
