use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::error::ConfigError;

/// Credential file, relative to the project root.
pub const DETAILS_FILE: &str = "database_details.yaml";

const DEFAULT_PORT: u16 = 5432;

/// Connection details for the events database.
///
/// The file must hold exactly these four string keys; anything missing or extra is rejected.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseDetails {
    pub host: String,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DatabaseDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseDetails")
            .field("host", &self.host)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl DatabaseDetails {
    pub fn path(project_root: &Path) -> PathBuf {
        project_root.join(DETAILS_FILE)
    }

    /// Read `<project_root>/database_details.yaml`.
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(project_root);
        if !path.is_file() {
            return Err(ConfigError::Missing(path));
        }
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let details = Self::from_yaml(&text, &path)?;
        debug!(?details, "loaded {}", path.display());
        Ok(details)
    }

    pub fn from_yaml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Connection options on PostgreSQL's default port.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(DEFAULT_PORT)
            .database(&self.name)
            .username(&self.user)
            .password(&self.password)
    }
}
