use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::service::{IndexMode, ServiceConfig};
use crate::store::CollectionNames;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Holds the database, document content and the search index.
    pub data_dir: PathBuf,
    pub index_mode: IndexMode,
    /// Per-call backend timeout. Unset means wait indefinitely.
    pub op_timeout_ms: Option<u64>,
    pub collections: CollectionNames,
}

impl ServerConfig {
    /// Reads a TOML config file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid config {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.op_timeout_ms == Some(0) {
            return Err(Error::Config("op_timeout_ms must be positive".to_string()));
        }
        self.collections.validate()
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("docshelf.db")
    }

    #[must_use]
    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }

    #[must_use]
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            index_mode: self.index_mode,
            op_timeout: self.op_timeout_ms.map(Duration::from_millis),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            index_mode: IndexMode::default(),
            op_timeout_ms: None,
            collections: CollectionNames::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docshelf.toml");
        fs::write(
            &path,
            r#"
port = 9090
index_mode = "background"
op_timeout_ms = 2500

[collections]
docs = "shelf_docs"
"#,
        )
        .unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.index_mode, IndexMode::Background);
        assert_eq!(config.collections.docs, "shelf_docs");
        assert_eq!(config.collections.users, "ds_user");

        let service = config.service_config();
        assert_eq!(service.op_timeout, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_load_rejects_bad_collection_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docshelf.toml");
        fs::write(&path, "[collections]\nusers = \"drop table;\"\n").unwrap();

        let err = ServerConfig::load(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ServerConfig::load("/nonexistent/docshelf.toml").unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_paths_and_addr() {
        let config = ServerConfig {
            data_dir: PathBuf::from("/srv/shelf"),
            ..ServerConfig::default()
        };
        assert_eq!(config.db_path(), PathBuf::from("/srv/shelf/docshelf.db"));
        assert_eq!(config.index_dir(), PathBuf::from("/srv/shelf/index"));
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }
}
