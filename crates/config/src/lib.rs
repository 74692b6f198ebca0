//! Layered configuration for folio.
//!
//! Settings are assembled from three layers, later layers winning: built-in
//! defaults, an optional TOML file in the platform config directory, and
//! `FOLIO_`-prefixed environment variables.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "FOLIO_";
const CONFIG_FILENAME: &str = "config.toml";

/// Runtime settings for the folio service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the calibredb executable. Resolved against `PATH` when bare.
    pub calibredb: PathBuf,
    /// Path to the calibre library directory (the one holding `metadata.db`).
    pub library: PathBuf,
    /// Calibre content-server username. Only used together with `password`.
    pub username: String,
    /// Calibre content-server password. Only used together with `username`.
    pub password: String,
    /// Address the HTTP server binds to, as `host:port`.
    pub bind: String,
    /// Log level filter: `error`, `warn`, `info`, `debug`, or `trace`.
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            calibredb: PathBuf::from("/opt/calibre/calibredb"),
            library: PathBuf::from("./library"),
            username: String::new(),
            password: String::new(),
            bind: "localhost:5000".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from defaults, the platform config file, and the
    /// environment (`FOLIO_CALIBREDB`, `FOLIO_LIBRARY`, ...).
    pub fn load() -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Self::default()));
        let figment = match config_file() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "merging configuration file");
                figment.merge(Toml::file(path))
            },
            None => figment,
        };
        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load settings from defaults, an explicit TOML file, and the
    /// environment. The file does not have to exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::extract(
            Figment::from(Serialized::defaults(Self::default()))
                .merge(Toml::file(path.as_ref()))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    fn extract(figment: Figment) -> Result<Self> {
        let settings: Self = figment.extract().or_raise(|| ErrorKind::Extraction)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.calibredb.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid { field: "calibredb", value: String::new() });
        }
        if self.library.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid { field: "library", value: String::new() });
        }
        // "localhost" is accepted as a convenience even though SocketAddr
        // only parses literal IPs.
        let normalized = self.bind.replace("localhost", "127.0.0.1");
        if normalized.parse::<SocketAddr>().is_err() {
            exn::bail!(ErrorKind::Invalid { field: "bind", value: self.bind.clone() });
        }
        if !matches!(self.log_level.to_lowercase().as_str(), "error" | "warn" | "info" | "debug" | "trace") {
            exn::bail!(ErrorKind::Invalid { field: "log_level", value: self.log_level.clone() });
        }
        Ok(())
    }

    /// The bind address with `localhost` normalized to a literal IP.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind
            .replace("localhost", "127.0.0.1")
            .parse::<SocketAddr>()
            .or_raise(|| ErrorKind::Invalid { field: "bind", value: self.bind.clone() })
    }
}

/// The per-user configuration file, when the platform exposes a config dir.
fn config_file() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", "folio")?;
    Some(dirs.config_dir().join(CONFIG_FILENAME))
}
