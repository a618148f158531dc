//! Shared configuration loader for the mdnotion toolchain.
//!
//! `defaults/mdnotion.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files, the environment and
//! command-line overrides on top of those defaults via [`Loader`] before deserializing into
//! [`MdNotionConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, ValueKind};
use mdnotion::remote::http::RetryPolicy;
use mdnotion::{HashOptions, HashStore, HashWriteOrder, NotionSettings, SyncMode, SyncOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use config::ConfigError as LoadError;

const DEFAULT_TOML: &str = include_str!("../defaults/mdnotion.default.toml");

/// Environment variables with this prefix override config keys, `__` separating sections
/// (e.g. `MDNOTION_NOTION__TOKEN`).
pub const ENV_PREFIX: &str = "MDNOTION";

/// Top-level configuration consumed by mdnotion applications.
#[derive(Debug, Clone, Deserialize)]
pub struct MdNotionConfig {
    pub notion: NotionConfig,
    pub sync: SyncConfig,
    pub hash: HashConfig,
    pub log: LogConfig,
}

/// Connection to the Notion API.
#[derive(Debug, Clone, Deserialize)]
pub struct NotionConfig {
    pub api_base: String,
    pub version: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    #[serde(default)]
    pub token: Option<String>,
}

impl From<&NotionConfig> for NotionSettings {
    fn from(config: &NotionConfig) -> Self {
        NotionSettings {
            api_base: config.api_base.clone(),
            version: config.version.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff: Duration::from_millis(config.retry_backoff_ms),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub mode: SyncMode,
    pub extract_title: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashStoreKind {
    Property,
    Block,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HashConfig {
    pub enabled: bool,
    pub store: HashStoreKind,
    pub property: String,
    pub write_order: HashWriteOrder,
}

impl HashConfig {
    /// Hash options for the pipeline, `None` when hashing is disabled.
    pub fn options(&self) -> Option<HashOptions> {
        if !self.enabled {
            return None;
        }
        let store = match self.store {
            HashStoreKind::Property => HashStore::Property(self.property.clone()),
            HashStoreKind::Block => HashStore::Block,
        };
        Some(HashOptions {
            store,
            write_order: self.write_order,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub debug: bool,
}

impl MdNotionConfig {
    /// Pipeline options for one run.
    pub fn sync_options(&self, rewrite_mapping: Option<PathBuf>) -> SyncOptions {
        SyncOptions {
            mode: self.sync.mode,
            extract_title: self.sync.extract_title,
            hash: self.hash.options(),
            rewrite_mapping,
            dry_run: self.sync.dry_run,
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer `MDNOTION_*` environment variables.
    pub fn with_env(mut self) -> Self {
        let source = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<MdNotionConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<MdNotionConfig, ConfigError> {
    Loader::new().build()
}
