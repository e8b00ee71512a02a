//! Application configuration, read from TOML.
//!
//! Every section and field is optional:
//!
//! ```toml
//! [server]
//! addr = "0.0.0.0:3000"
//!
//! [templates]
//! root = "web/templates"
//!
//! [log]
//! level = "info"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub templates: TemplateConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// `host:port` to listen on.
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: "0.0.0.0:3000".to_owned() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Directory template identifiers are resolved against.
    pub root: PathBuf,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self { root: PathBuf::from("web/templates") }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_owned() }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, Error> {
        Ok(toml::from_str(content)?)
    }

    /// The listen address, parsed.
    pub fn socket_addr(&self) -> Result<SocketAddr, Error> {
        self.server.addr.parse()
            .map_err(|_| Error::InvalidAddress(self.server.addr.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.addr, "0.0.0.0:3000");
        assert_eq!(config.templates.root, PathBuf::from("web/templates"));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml("[server]\naddr = \"127.0.0.1:8080\"\n").unwrap();
        assert_eq!(config.socket_addr().unwrap(), "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn bad_address_is_reported() {
        let config = Config::from_toml("[server]\naddr = \"nowhere\"\n").unwrap();
        assert!(matches!(config.socket_addr(), Err(Error::InvalidAddress(a)) if a == "nowhere"));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        assert!(matches!(Config::from_toml("[server"), Err(Error::Config(_))));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        std::fs::write(&path, "[templates]\nroot = \"views\"\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().templates.root, PathBuf::from("views"));
    }
}
