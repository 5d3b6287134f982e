use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

use crate::core::{Currency, FactorTable};
use crate::settings::MoneySettings;
use crate::sources::{CachingSource, FactorSource, FileSource, FixedSource, RemoteSource};
use crate::strategies::{FileWatchStrategy, OneShotStrategy, ScheduledStrategy, UpdateStrategy};

fn default_remote_url() -> String {
    RemoteSource::DEFAULT_BASE_URL.to_string()
}

/// Where factor tables come from.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    Remote {
        #[serde(default = "default_remote_url")]
        base_url: String,
    },
    File {
        path: PathBuf,
    },
    Fixed {
        rates: BTreeMap<Currency, Decimal>,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Remote {
            base_url: default_remote_url(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// File cache holding the last good table.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Defaults to `factors_cache.csv` in the data directory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    OneShot,
    #[default]
    Scheduled,
    Watch,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RefreshConfig {
    pub mode: RefreshMode,
    pub success_interval_ms: u64,
    pub failure_interval_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            mode: RefreshMode::Scheduled,
            success_interval_ms: 6 * 60 * 60 * 1000,
            failure_interval_ms: 60 * 1000,
            poll_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub default_currency: Currency,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    #[serde(default)]
    pub refresh: RefreshConfig,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            default_currency: Currency::PIVOT,
            source: SourceConfig::default(),
            cache: None,
            refresh: RefreshConfig::default(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "fxmoney", "fxmoney")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("in", "fxmoney", "fxmoney")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Cache file location, `None` when caching is off.
    pub fn cache_path(&self) -> Result<Option<PathBuf>> {
        match &self.cache {
            Some(CacheConfig {
                enabled: true,
                path: Some(path),
            }) => Ok(Some(path.clone())),
            Some(CacheConfig {
                enabled: true,
                path: None,
            }) => Ok(Some(self.default_data_path()?.join("factors_cache.csv"))),
            _ => Ok(None),
        }
    }

    /// The configured source, cache-wrapped when a cache is configured.
    pub fn build_source(&self) -> Result<Arc<dyn FactorSource>> {
        let source: Arc<dyn FactorSource> = match &self.source {
            SourceConfig::Remote { base_url } => Arc::new(
                RemoteSource::new(base_url)
                    .with_context(|| format!("Failed to create remote source for {base_url}"))?,
            ),
            SourceConfig::File { path } => Arc::new(FileSource::new(path.clone())),
            SourceConfig::Fixed { rates } => Arc::new(FixedSource::new(FactorTable::from_rates(
                rates.iter().map(|(c, f)| (*c, *f)),
            ))),
        };

        match self.cache_path()? {
            Some(path) => {
                debug!(path = %path.display(), "Caching factor tables");
                Ok(Arc::new(CachingSource::with_file(source, path)))
            }
            None => Ok(source),
        }
    }

    pub fn build_strategy(&self) -> Result<Arc<dyn UpdateStrategy>> {
        let source = self.build_source()?;
        let refresh = &self.refresh;
        let strategy: Arc<dyn UpdateStrategy> = match refresh.mode {
            RefreshMode::OneShot => Arc::new(OneShotStrategy::new(source)),
            RefreshMode::Scheduled => Arc::new(ScheduledStrategy::with_intervals(
                source,
                Duration::from_millis(refresh.success_interval_ms),
                Duration::from_millis(refresh.failure_interval_ms),
            )),
            RefreshMode::Watch => {
                let SourceConfig::File { path } = &self.source else {
                    bail!("Refresh mode 'watch' requires a 'file' source");
                };
                Arc::new(FileWatchStrategy::with_source(
                    source,
                    path.clone(),
                    Duration::from_millis(refresh.poll_interval_ms),
                ))
            }
        };
        Ok(strategy)
    }

    /// Builds and initializes the strategy, ready for [`crate::settings::install`].
    pub async fn build_settings(&self) -> Result<MoneySettings> {
        let strategy = self.build_strategy()?;
        MoneySettings::new(strategy, self.default_currency)
            .await
            .context("Failed to initialize conversion factors")
    }
}
