//! Server configuration
//!
//! Layered with figment, later layers win:
//! 1. `Config::default()`
//! 2. TOML file, when one is given
//! 3. `AVATARD_*` environment variables (`__` separates nested keys,
//!    e.g. `AVATARD_PLACEHOLDERS__IMAGE`)
//!
//! CLI flags are applied on top by the binary.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::avatars::Placeholders;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "AVATARD_";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// SQLite file; None = in-memory
    pub db_path: Option<String>,
    /// Directory served under /images, for the placeholders
    pub static_dir: Option<PathBuf>,
    pub placeholders: Placeholders,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            db_path: None,
            static_dir: None,
            placeholders: Placeholders::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Provider stack for an optional config file
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load configuration from defaults, file and environment
    pub fn load(file: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(file).extract()
    }
}
