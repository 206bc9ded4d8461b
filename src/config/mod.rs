#[cfg(feature = "cli")]
pub mod cli;
pub mod credentials;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use credentials::Credentials;
pub use toml_config::StreamConfigFile;

use crate::core::consumer::Budget;
use crate::core::filter::{StreamFilter, DEFAULT_LANGUAGE};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_api_base_url, validate_budget, validate_field_list, validate_language_code,
    validate_output_path, Validate,
};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.twitter.com";
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000;
pub const DEFAULT_DAILY_COUNT_WARNING: u64 = 300_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSettings {
    pub terms: Vec<String>,
    pub language: String,
    pub tweet_fields: Vec<String>,
    pub expansions: Vec<String>,
    /// 單日推文數超過此值時提出警告
    pub daily_count_warning: u64,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            terms: Vec::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            tweet_fields: vec!["created_at".to_string()],
            expansions: vec![
                "author_id".to_string(),
                "referenced_tweets.id.author_id".to_string(),
            ],
            daily_count_warning: DEFAULT_DAILY_COUNT_WARNING,
        }
    }
}

/// Everything a session needs, resolved from defaults, the TOML file and the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api: ApiSettings,
    pub budget: Budget,
    pub progress_interval: u64,
    pub filter: FilterSettings,
    /// `None` writes to stdout.
    pub output: Option<PathBuf>,
    pub monitor: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            budget: Budget::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            filter: FilterSettings::default(),
            output: None,
            monitor: false,
        }
    }
}

impl Settings {
    /// 以 TOML 檔案中有設定的欄位覆蓋目前的值
    pub fn apply_file(&mut self, file: &StreamConfigFile) {
        if let Some(base_url) = &file.api.base_url {
            self.api.base_url = base_url.clone();
        }
        if let Some(secs) = file.api.request_timeout_secs {
            self.api.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.api.connect_timeout_secs {
            self.api.connect_timeout = Duration::from_secs(secs);
        }

        if let Some(record_budget) = file.limits.record_budget {
            self.budget.record_limit = record_budget;
        }
        if let Some(secs) = file.limits.time_budget_secs {
            self.budget.time_limit = Duration::from_secs(secs);
        }
        if let Some(interval) = file.limits.progress_interval {
            self.progress_interval = interval;
        }

        if let Some(terms) = &file.filter.terms {
            self.filter.terms = terms.clone();
        }
        if let Some(language) = &file.filter.language {
            self.filter.language = language.clone();
        }
        if let Some(fields) = &file.filter.tweet_fields {
            self.filter.tweet_fields = fields.clone();
        }
        if let Some(expansions) = &file.filter.expansions {
            self.filter.expansions = expansions.clone();
        }
        if let Some(warning) = file.filter.daily_count_warning {
            self.filter.daily_count_warning = warning;
        }
    }

    pub fn stream_filter(&self) -> Option<StreamFilter> {
        StreamFilter::from_terms(&self.filter.terms, &self.filter.language)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_api_base_url("api.base_url", &self.api.base_url)?;
        validate_budget(&self.budget)?;
        validate_language_code("filter.language", &self.filter.language)?;
        validate_field_list("filter.tweet_fields", &self.filter.tweet_fields)?;
        validate_field_list("filter.expansions", &self.filter.expansions)?;

        if let Some(output) = &self.output {
            validate_output_path("gzip", output)?;
        }

        Ok(())
    }
}
