use crate::config::{Settings, StreamConfigFile};
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "tweet-stream")]
#[command(about = "Fetch data with Twitter Streaming API")]
pub struct CliConfig {
    /// File with user credentials (`key value` per line)
    #[arg(long, value_name = "PATH")]
    pub keyfile: PathBuf,

    /// File to write compressed results to (default: stdout)
    #[arg(long, value_name = "OUTPUT_FILE")]
    pub gzip: Option<PathBuf>,

    /// Space-separated list of words used to build the stream filter rule
    #[arg(long, value_name = "W", num_args = 0..)]
    pub filter: Option<Vec<String>>,

    /// Optional TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Record budget; the stream stops once 80% of it has been received
    #[arg(long)]
    pub record_budget: Option<u64>,

    /// Time budget in hours
    #[arg(long)]
    pub time_budget_hours: Option<u64>,

    /// Language constraint added to the filter rule
    #[arg(long)]
    pub language: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log process CPU and memory usage
    #[arg(long)]
    pub monitor: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl CliConfig {
    /// 預設值 ← TOML 檔案 ← 命令列參數
    pub fn resolve(&self) -> Result<Settings> {
        let mut settings = Settings::default();

        if let Some(path) = &self.config {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            let file = StreamConfigFile::from_file(path)?;
            settings.apply_file(&file);
        }

        if let Some(terms) = &self.filter {
            settings.filter.terms = terms.clone();
        }
        if let Some(language) = &self.language {
            settings.filter.language = language.clone();
        }
        if let Some(record_budget) = self.record_budget {
            settings.budget.record_limit = record_budget;
        }
        if let Some(hours) = self.time_budget_hours {
            settings.budget.time_limit = Duration::from_secs(hours.saturating_mul(3600));
        }

        settings.output = self.gzip.clone();
        settings.monitor = self.monitor;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::Validate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_minimal_arguments() {
        let cli = CliConfig::try_parse_from(["tweet-stream", "--keyfile", "keys.txt"]).unwrap();
        let settings = cli.resolve().unwrap();

        assert_eq!(cli.keyfile, PathBuf::from("keys.txt"));
        assert!(settings.output.is_none());
        assert!(settings.stream_filter().is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_keyfile_is_required() {
        assert!(CliConfig::try_parse_from(["tweet-stream"]).is_err());
    }

    #[test]
    fn test_filter_words_and_gzip() {
        let cli = CliConfig::try_parse_from([
            "tweet-stream",
            "--keyfile",
            "keys.txt",
            "--gzip",
            "out.json.gz",
            "--filter",
            "rust",
            "systems",
        ])
        .unwrap();
        let settings = cli.resolve().unwrap();

        assert_eq!(settings.output, Some(PathBuf::from("out.json.gz")));
        assert_eq!(
            settings.stream_filter().unwrap().query(),
            "rust systems lang:en"
        );
    }

    #[test]
    fn test_empty_filter_flag_means_sample() {
        let cli = CliConfig::try_parse_from(["tweet-stream", "--keyfile", "k", "--filter"]).unwrap();
        assert_eq!(cli.filter, Some(vec![]));
        assert!(cli.resolve().unwrap().stream_filter().is_none());
    }

    #[test]
    fn test_command_line_overrides_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[limits]\nrecord_budget = 100\ntime_budget_secs = 60\n\n[filter]\nterms = [\"tokio\"]\n")
            .unwrap();

        let path = file.path().to_str().unwrap();
        let cli = CliConfig::try_parse_from([
            "tweet-stream",
            "--keyfile",
            "k",
            "--config",
            path,
            "--record-budget",
            "10",
        ])
        .unwrap();
        let settings = cli.resolve().unwrap();

        assert_eq!(settings.budget.record_limit, 10);
        assert_eq!(settings.budget.time_limit, Duration::from_secs(60));
        assert_eq!(settings.filter.terms, vec!["tokio".to_string()]);
    }

    #[test]
    fn test_time_budget_hours() {
        let cli = CliConfig::try_parse_from([
            "tweet-stream",
            "--keyfile",
            "k",
            "--time-budget-hours",
            "2",
        ])
        .unwrap();
        assert_eq!(
            cli.resolve().unwrap().budget.time_limit,
            Duration::from_secs(7200)
        );
    }
}
