//! Layered configuration.
//!
//! Compiled defaults, then an optional TOML / YAML / JSON file, then
//! `FOLIO_`-prefixed environment variables (`__` separates nested keys, so
//! `FOLIO_FETCH__ATTEMPTS=5` sets `fetch.attempts`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use folio_catalog::Collection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "FOLIO_";
const CONFIG_FILE: &str = "config.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "folio")
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub reader: ReaderConfig,
    pub storage: StorageConfig,
}

/// Where listings and documents are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Repository contents API root; listings are read from
    /// `{api_host}/contents/{directory}`.
    pub api_host: String,
    /// Raw file host; documents are read from `{raw_host}/{path}`.
    pub raw_host: String,
    pub primary_dir: String,
    pub profile_dir: String,
}
impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_host: "https://api.github.com/repos/LYC-gh/lyc-gh.github.io".to_string(),
            raw_host: "https://raw.githubusercontent.com/LYC-gh/lyc-gh.github.io/main".to_string(),
            primary_dir: "chapters".to_string(),
            profile_dir: "characters".to_string(),
        }
    }
}
impl RemoteConfig {
    pub fn directory(&self, collection: Collection) -> &str {
        match collection {
            Collection::Primary => &self.primary_dir,
            Collection::Profile => &self.profile_dir,
        }
    }

    pub fn listing_url(&self, collection: Collection) -> String {
        format!("{}/contents/{}", self.api_host.trim_end_matches('/'), self.directory(collection))
    }

    pub fn document_url(&self, identifier: &str) -> String {
        format!("{}/{}", self.raw_host.trim_end_matches('/'), identifier.trim_start_matches('/'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub attempts: u32,
    pub initial_backoff_ms: u64,
    pub timeout_ms: u64,
    /// Empty disables the check.
    pub not_found_sentinel: String,
    pub user_agent: String,
}
impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff_ms: 1000,
            timeout_ms: 10_000,
            not_found_sentinel: "404: Not Found".to_string(),
            user_agent: concat!("folio/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
impl FetchConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn not_found_sentinel(&self) -> Option<&str> {
        Some(self.not_found_sentinel.as_str()).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub listing_ttl_days: u64,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self { listing_ttl_days: 7 }
    }
}
impl CacheConfig {
    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_days.saturating_mul(24 * 60 * 60))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Fraction of the document height past which the next document is preloaded.
    pub preload_threshold: f64,
    pub bookmark_restore_delay_ms: u64,
    pub notice_delay_ms: u64,
}
impl Default for ReaderConfig {
    fn default() -> Self {
        Self { preload_threshold: 0.7, bookmark_restore_delay_ms: 500, notice_delay_ms: 300 }
    }
}
impl ReaderConfig {
    pub fn bookmark_restore_delay(&self) -> Duration {
        Duration::from_millis(self.bookmark_restore_delay_ms)
    }

    pub fn notice_delay(&self) -> Duration {
        Duration::from_millis(self.notice_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Defaults to the platform data directory.
    pub state_dir: Option<PathBuf>,
}

impl Config {
    /// The configuration file used when none is given explicitly, if the
    /// platform has a config directory.
    pub fn default_file() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Build the layered figment without extracting it.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            if !file.is_file() {
                tracing::debug!(file = %file.display(), "Configuration file does not exist");
                exn::bail!(ErrorKind::Load);
            }
            let extension = file.extension().and_then(|ext| ext.to_str()).unwrap_or_default().to_ascii_lowercase();
            figment = match extension.as_str() {
                "toml" => figment.merge(Toml::file(file)),
                "yaml" | "yml" => figment.merge(Yaml::file(file)),
                "json" => figment.merge(Json::file(file)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(file.display().to_string())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate.
    ///
    /// An explicitly given file must exist. Without one, the default file is
    /// used when present.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(file) => Some(file.to_path_buf()),
            None => Self::default_file().filter(|path| path.is_file()),
        };
        tracing::debug!(file = ?file, "Loading configuration");
        let config: Config = Self::figment(file.as_deref())?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch.attempts == 0 {
            exn::bail!(ErrorKind::Invalid("fetch.attempts must be at least 1".to_string()));
        }
        if self.fetch.timeout_ms == 0 {
            exn::bail!(ErrorKind::Invalid("fetch.timeout_ms must be greater than 0".to_string()));
        }
        let threshold = self.reader.preload_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            exn::bail!(ErrorKind::Invalid(format!("reader.preload_threshold must be in (0, 1], got {threshold}")));
        }
        for (name, host) in [("remote.api_host", &self.remote.api_host), ("remote.raw_host", &self.remote.raw_host)] {
            if !(host.starts_with("https://") || host.starts_with("http://")) {
                exn::bail!(ErrorKind::Invalid(format!("{name} must be an http(s) URL, got {host:?}")));
            }
        }
        for (name, dir) in [("remote.primary_dir", &self.remote.primary_dir), ("remote.profile_dir", &self.remote.profile_dir)] {
            if dir.trim().is_empty() {
                exn::bail!(ErrorKind::Invalid(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    /// Directory the persisted reader state lives in.
    pub fn state_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.storage.state_dir {
            return Ok(dir.clone());
        }
        let dirs = project_dirs().ok_or_raise(|| ErrorKind::NoDataDirectory)?;
        Ok(dirs.data_dir().join("state"))
    }
}
