//! Configuration management for taxscrape using the prefer crate.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;
use crate::repository::CheckpointWriter;
use crate::scrapers::{FieldExtractor, HttpClient, PageFetcher, RetryPolicy, UrlTemplate};
use crate::scrapers::{DEFAULT_PAYMENT_TABLE_ID, DEFAULT_TOTAL_DUE_ID};
use crate::services::ScrapeConfig;

/// Property detail page for the Grayson County tax office.
pub const DEFAULT_URL_TEMPLATE: &str =
    "http://taxsearch.co.grayson.tx.us:8443/Property-Detail/PropertyQuickRefID/{id}";

pub const ENV_URL_TEMPLATE: &str = "TAXSCRAPE_URL_TEMPLATE";
pub const ENV_WORKERS: &str = "TAXSCRAPE_WORKERS";

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    /// Directory holding the identifier list and all outputs.
    pub data_dir: PathBuf,
    /// Identifier list, one per line. Relative to `data_dir`.
    pub ids_file: String,
    /// Raw results CSV. Relative to `data_dir`.
    pub results_file: String,
    /// Identifiers whose scrape failed. Relative to `data_dir`.
    pub failed_file: String,
    /// Processed results CSV. Relative to `data_dir`.
    pub processed_file: String,
    /// Detail page URL with an `{id}` placeholder.
    pub url_template: String,
    /// Overrides the default browser user agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub batch_size: usize,
    pub num_workers: usize,
    pub checkpoint_size: usize,
    /// Delay before every request attempt, in milliseconds.
    pub delay_ms: u64,
    pub max_retries: u32,
    /// Per-request timeout; unset means a request may wait indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// Element id of the total-due cell.
    pub total_due_id: String,
    /// Element id of the payment history table.
    pub payment_table_id: String,
    /// Extra request headers.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            ids_file: "id_list.txt".to_string(),
            results_file: "tax_results.csv".to_string(),
            failed_file: "failed_ids.txt".to_string(),
            processed_file: "processed_results.csv".to_string(),
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            user_agent: None,
            batch_size: 3,
            num_workers: 5,
            checkpoint_size: 100,
            delay_ms: 500,
            max_retries: 3,
            request_timeout_secs: None,
            total_due_id: DEFAULT_TOTAL_DUE_ID.to_string(),
            payment_table_id: DEFAULT_PAYMENT_TABLE_ID.to_string(),
            headers: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn ids_path(&self) -> PathBuf {
        self.data_dir.join(&self.ids_file)
    }

    pub fn results_path(&self) -> PathBuf {
        self.data_dir.join(&self.results_file)
    }

    pub fn failed_path(&self) -> PathBuf {
        self.data_dir.join(&self.failed_file)
    }

    pub fn processed_path(&self) -> PathBuf {
        self.data_dir.join(&self.processed_file)
    }

    pub fn scrape_config(&self) -> ScrapeConfig {
        ScrapeConfig {
            batch_size: self.batch_size,
            num_workers: self.num_workers,
            checkpoint_size: self.checkpoint_size,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.delay_ms))
    }

    /// Reject settings a run cannot start with.
    pub fn validate(&self) -> Result<(), ScrapeError> {
        self.scrape_config().validate()?;
        UrlTemplate::new(self.url_template.as_str())?;
        if self.request_timeout_secs == Some(0) {
            return Err(ScrapeError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn http_client(&self) -> Result<HttpClient, ScrapeError> {
        HttpClient::new(
            self.user_agent.as_deref(),
            &self.headers,
            self.request_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn page_fetcher(&self) -> Result<PageFetcher, ScrapeError> {
        let urls = UrlTemplate::new(self.url_template.as_str())?;
        let extractor = FieldExtractor::new(&self.total_due_id, &self.payment_table_id)?;
        Ok(PageFetcher::new(urls, extractor, self.retry_policy()))
    }

    pub fn checkpoint_writer(&self) -> CheckpointWriter {
        CheckpointWriter::new(self.results_path(), self.failed_path())
    }

    /// Apply `TAXSCRAPE_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(template) = lookup(ENV_URL_TEMPLATE).filter(|s| !s.is_empty()) {
            tracing::debug!("Using {} from environment: {}", ENV_URL_TEMPLATE, template);
            self.url_template = template;
        }

        if let Some(workers) = lookup(ENV_WORKERS).filter(|s| !s.is_empty()) {
            match workers.trim().parse::<usize>() {
                Ok(n) => {
                    tracing::debug!("Using {} from environment: {}", ENV_WORKERS, n);
                    self.num_workers = n;
                }
                Err(_) => tracing::warn!("Ignoring invalid {}: {:?}", ENV_WORKERS, workers),
            }
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "workers")]
    pub num_workers: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_size: Option<usize>,
    /// Delay before every request in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_due_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_table_id: Option<String>,
    /// Extra request headers, merged over nothing.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Path the config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers taxscrape config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("taxscrape").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// The format follows the file extension; anything unknown is read as JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, ScrapeError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ScrapeError::io(path, e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| ScrapeError::Config(format!("Failed to parse TOML config: {}", e)))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| ScrapeError::Config(format!("Failed to parse YAML config: {}", e)))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| ScrapeError::Config(format!("Failed to parse JSON config: {}", e)))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory of the config file, if it came from one.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// Absolute paths are kept, `~` is expanded, anything else joins `base_dir`.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        for (value, slot) in [
            (&self.ids_file, &mut settings.ids_file),
            (&self.results_file, &mut settings.results_file),
            (&self.failed_file, &mut settings.failed_file),
            (&self.processed_file, &mut settings.processed_file),
            (&self.url_template, &mut settings.url_template),
            (&self.total_due_id, &mut settings.total_due_id),
            (&self.payment_table_id, &mut settings.payment_table_id),
        ] {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = Some(user_agent.clone());
        }
        if let Some(n) = self.batch_size {
            settings.batch_size = n;
        }
        if let Some(n) = self.num_workers {
            settings.num_workers = n;
        }
        if let Some(n) = self.checkpoint_size {
            settings.checkpoint_size = n;
        }
        if let Some(delay) = self.delay_ms {
            settings.delay_ms = delay;
        }
        if let Some(retries) = self.max_retries {
            settings.max_retries = retries;
        }
        if let Some(timeout) = self.request_timeout_secs {
            settings.request_timeout_secs = Some(timeout);
        }
        settings
            .headers
            .extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
}

/// Load settings with explicit options.
///
/// Precedence, lowest first: defaults, config file, environment.
pub async fn load_settings_with_options(
    options: LoadOptions,
) -> Result<(Settings, Config), ScrapeError> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    if let Some(ref path) = config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = if options.use_cwd {
        cwd
    } else {
        config.base_dir().unwrap_or(cwd)
    };

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    settings.apply_env_overrides(|key| std::env::var(key).ok());

    Ok((settings, config))
}
