use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Default eTenders listing endpoint (open tenders only).
pub const DEFAULT_SOURCE_URL: &str =
    "https://www.etenders.gov.za/Home/PaginatedTenderOpportunities";

/// SQS refuses batches larger than this.
pub const MAX_QUEUE_BATCH: usize = 10;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

// ── Lookup helpers ────────────────────────────────────────────

/// Profiled key lookup over an arbitrary variable source.
///
/// Tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`. Empty values count
/// as unset.
struct Vars<'a> {
    profile: &'a str,
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Vars<'_> {
    fn opt(&self, key: &str) -> Option<String> {
        let get = |k: &str| (self.lookup)(k).filter(|s| !s.trim().is_empty());
        if !self.profile.is_empty() {
            if let Some(v) = get(&format!("{}_{}", self.profile, key)) {
                return Some(v);
            }
        }
        get(key)
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        match self.opt(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn date(&self, key: &str) -> Result<Option<NaiveDate>, ConfigError> {
        self.opt(key)
            .map(|raw| {
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
                    ConfigError::Invalid {
                        key: key.to_string(),
                        value: raw.clone(),
                        reason: e.to_string(),
                    }
                })
            })
            .transpose()
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub aws: AwsConfig,
    pub queue: QueueConfig,
    pub source: SourceConfig,
    pub run: RunConfig,
}

impl Config {
    /// Build config from process environment (call `load_dotenv()` first).
    /// Profile is read from `TENDER_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build config from an in-memory map, same rules as [`Config::from_env`].
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let profile = lookup("TENDER_PROFILE")
            .unwrap_or_default()
            .trim()
            .to_uppercase();
        let vars = Vars {
            profile: &profile,
            lookup: &lookup,
        };
        let config = Self {
            aws: AwsConfig::from_vars(&vars),
            queue: QueueConfig::from_vars(&vars)?,
            source: SourceConfig::from_vars(&vars)?,
            run: RunConfig::from_vars(&vars)?,
            profile,
        };
        config.check_ranges()?;
        Ok(config)
    }

    /// Require everything a live run needs. `QUEUE_URL` may be omitted when
    /// nothing is going to be sent.
    pub fn validate(&self, require_queue: bool) -> Result<(), ConfigError> {
        if require_queue {
            let url = self
                .queue
                .queue_url
                .as_deref()
                .ok_or_else(|| ConfigError::Missing("QUEUE_URL".to_string()))?;
            Url::parse(url).map_err(|e| ConfigError::Invalid {
                key: "QUEUE_URL".to_string(),
                value: url.to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Reject values no run can work with. Re-run after applying overrides.
    pub fn check_ranges(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, value: String, reason: &str| ConfigError::Invalid {
            key: key.to_string(),
            value,
            reason: reason.to_string(),
        };

        Url::parse(&self.source.base_url)
            .map_err(|e| invalid("SOURCE_BASE_URL", self.source.base_url.clone(), &e.to_string()))?;
        if self.source.page_size == 0 {
            return Err(invalid("SOURCE_PAGE_SIZE", "0".into(), "must be at least 1"));
        }
        if self.source.max_pages == 0 {
            return Err(invalid("SOURCE_MAX_PAGES", "0".into(), "must be at least 1"));
        }
        if self.queue.batch_size == 0 || self.queue.batch_size > MAX_QUEUE_BATCH {
            return Err(invalid(
                "QUEUE_BATCH_SIZE",
                self.queue.batch_size.to_string(),
                "must be between 1 and 10",
            ));
        }
        if self.queue.max_attempts == 0 {
            return Err(invalid("QUEUE_MAX_ATTEMPTS", "0".into(), "must be at least 1"));
        }
        if let (Some(from), Some(to)) = (self.source.date_from, self.source.date_to) {
            if to < from {
                return Err(invalid(
                    "SOURCE_DATE_TO",
                    to.to_string(),
                    "date window ends before it starts",
                ));
            }
        }
        Ok(())
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  aws:     region={}, static_credentials={}",
            self.aws.region,
            self.aws.has_static_credentials()
        );
        tracing::info!(
            "  queue:   url={}, batch_size={}, max_attempts={}, send_timeout={}s",
            self.queue.queue_url.as_deref().unwrap_or("(none)"),
            self.queue.batch_size,
            self.queue.max_attempts,
            self.queue.send_timeout_secs
        );
        tracing::info!(
            "  source:  url={}, page_size={}, max_pages={}, window={:?}..{:?}",
            self.source.base_url,
            self.source.page_size,
            self.source.max_pages,
            self.source.date_from,
            self.source.date_to
        );
        tracing::info!(
            "  run:     fetch_budget={}s, dispatch_budget={}s",
            self.run.fetch_budget_secs,
            self.run.dispatch_budget_secs
        );
    }
}

// ── AWS ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    fn from_vars(v: &Vars<'_>) -> Self {
        Self {
            region: v.or("AWS_REGION", "af-south-1"),
            access_key_id: v.opt("AWS_ACCESS_KEY_ID"),
            secret_access_key: v.opt("AWS_SECRET_ACCESS_KEY"),
            session_token: v.opt("AWS_SESSION_TOKEN"),
            endpoint_url: v.opt("QUEUE_AWS_ENDPOINT_URL"),
        }
    }

    pub fn has_static_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

// ── Queue ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub queue_url: Option<String>,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub send_timeout_secs: u64,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl QueueConfig {
    fn from_vars(v: &Vars<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            queue_url: v.opt("QUEUE_URL"),
            batch_size: v.parsed("QUEUE_BATCH_SIZE", MAX_QUEUE_BATCH)?,
            max_attempts: v.parsed("QUEUE_MAX_ATTEMPTS", 3)?,
            send_timeout_secs: v.parsed("QUEUE_SEND_TIMEOUT_SECS", 10)?,
            backoff_base_ms: v.parsed("QUEUE_BACKOFF_BASE_MS", 200)?,
            backoff_max_ms: v.parsed("QUEUE_BACKOFF_MAX_MS", 5_000)?,
        })
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

// ── Source API ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub request_timeout_secs: u64,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl SourceConfig {
    fn from_vars(v: &Vars<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: v.or("SOURCE_BASE_URL", DEFAULT_SOURCE_URL),
            page_size: v.parsed("SOURCE_PAGE_SIZE", 100)?,
            max_pages: v.parsed("SOURCE_MAX_PAGES", 50)?,
            request_timeout_secs: v.parsed("REQUEST_TIMEOUT_SECS", 30)?,
            date_from: v.date("SOURCE_DATE_FROM")?,
            date_to: v.date("SOURCE_DATE_TO")?,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ── Run limits ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Pagination stops once this much time has passed since the run began.
    pub fetch_budget_secs: u64,
    /// Ceiling for delivering everything that was collected.
    pub dispatch_budget_secs: u64,
}

impl RunConfig {
    fn from_vars(v: &Vars<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            fetch_budget_secs: v.parsed("RUN_FETCH_BUDGET_SECS", 600)?,
            dispatch_budget_secs: v.parsed("RUN_DISPATCH_BUDGET_SECS", 240)?,
        })
    }

    pub fn fetch_budget(&self) -> Duration {
        Duration::from_secs(self.fetch_budget_secs)
    }

    pub fn dispatch_budget(&self) -> Duration {
        Duration::from_secs(self.dispatch_budget_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_map(&HashMap::new()).unwrap();

        assert_eq!(config.profile_label(), "default");
        assert_eq!(config.source.base_url, DEFAULT_SOURCE_URL);
        assert_eq!(config.source.page_size, 100);
        assert_eq!(config.queue.batch_size, 10);
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.queue.send_timeout(), Duration::from_secs(10));
        assert_eq!(config.aws.region, "af-south-1");
        assert!(config.queue.queue_url.is_none());
    }

    #[test]
    fn profile_prefixed_keys_win() {
        let config = Config::from_map(&vars(&[
            ("TENDER_PROFILE", "prod"),
            ("QUEUE_URL", "https://sqs.example/dev.fifo"),
            ("PROD_QUEUE_URL", "https://sqs.example/prod.fifo"),
            ("SOURCE_PAGE_SIZE", "25"),
        ]))
        .unwrap();

        assert_eq!(config.profile, "PROD");
        assert_eq!(
            config.queue.queue_url.as_deref(),
            Some("https://sqs.example/prod.fifo")
        );
        assert_eq!(config.source.page_size, 25);
    }

    #[test]
    fn malformed_numbers_are_errors() {
        let err = Config::from_map(&vars(&[("QUEUE_MAX_ATTEMPTS", "three")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "QUEUE_MAX_ATTEMPTS"));
    }

    #[test]
    fn batch_size_above_queue_limit_is_rejected() {
        let err = Config::from_map(&vars(&[("QUEUE_BATCH_SIZE", "11")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "QUEUE_BATCH_SIZE"));
    }

    #[test]
    fn inverted_date_window_is_rejected() {
        let err = Config::from_map(&vars(&[
            ("SOURCE_DATE_FROM", "2025-10-31"),
            ("SOURCE_DATE_TO", "2025-10-01"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "SOURCE_DATE_TO"));

        let ok = Config::from_map(&vars(&[
            ("SOURCE_DATE_FROM", "2025-10-01"),
            ("SOURCE_DATE_TO", "2025-10-31"),
        ]))
        .unwrap();
        assert_eq!(ok.source.date_from, NaiveDate::from_ymd_opt(2025, 10, 1));
    }

    #[test]
    fn validate_requires_queue_url_for_live_runs() {
        let config = Config::from_map(&HashMap::new()).unwrap();
        assert_eq!(
            config.validate(true),
            Err(ConfigError::Missing("QUEUE_URL".to_string()))
        );
        assert!(config.validate(false).is_ok());

        let config = Config::from_map(&vars(&[("QUEUE_URL", "not a url")])).unwrap();
        assert!(matches!(config.validate(true), Err(ConfigError::Invalid { .. })));
    }
}
