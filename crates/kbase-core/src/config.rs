//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_SEARCH__THRESHOLD`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::AxisConfig;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    /// Load a single explicit file on top of the defaults, still honouring `APP_*` overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::InvalidConfig(format!("config file {} does not exist", path.display())));
        }
        let figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("APP_").split("__"));
        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub store: StoreSettings,
    pub embedding: EmbeddingSettings,
    pub search: SearchSettings,
    #[serde(default)]
    pub axes: Vec<AxisConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    pub uri: String,
    pub documents_table: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Local,
    Remote,
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub provider: ProviderKind,
    pub model: String,
    pub dimension: usize,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model_dir: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    pub max_per_axis: usize,
    pub max_total: usize,
    /// Maximum distance at which a first tier is trusted without consulting the next.
    pub threshold: f32,
    pub timeout_ms: u64,
    pub fetch_concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreSettings { uri: "./data/lancedb".to_string(), documents_table: "documents".to_string() },
            embedding: EmbeddingSettings {
                provider: ProviderKind::Local,
                model: "bge-m3".to_string(),
                dimension: 1024,
                base_url: None,
                api_key: None,
                model_dir: None,
                timeout_secs: 30,
            },
            search: SearchSettings { max_per_axis: 5, max_total: 10, threshold: 0.3, timeout_ms: 10_000, fetch_concurrency: 8 },
            axes: Vec::new(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be positive".to_string()));
        }
        if self.embedding.provider == ProviderKind::Remote && self.embedding.base_url.is_none() {
            return Err(Error::InvalidConfig("embedding.base_url is required for the remote provider".to_string()));
        }
        if !self.search.threshold.is_finite() || self.search.threshold < 0.0 {
            return Err(Error::InvalidConfig(format!("search.threshold must be a non-negative number, got {}", self.search.threshold)));
        }
        for axis in &self.axes {
            if axis.tiers.is_empty() {
                return Err(Error::InvalidConfig(format!("axis '{}' has no tiers", axis.name)));
            }
        }
        Ok(())
    }

    pub fn store_path(&self) -> PathBuf {
        expand_path(&self.store.uri)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
