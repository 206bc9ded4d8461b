use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Twitter API returned {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Malformed credential file {path}, line {line}: expected `key value`")]
    CredentialFormatError { path: String, line: usize },

    #[error("Stream reported an error: {message}")]
    SourceError { message: String },

    #[error("Stream connection closed by the server")]
    Disconnected,

    #[error("Stream session has already terminated")]
    SessionClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Stream,
    Output,
    Session,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl StreamError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::CredentialFormatError { .. } => ErrorCategory::Configuration,
            Self::ApiError(_) | Self::ApiStatus { .. } => ErrorCategory::Network,
            Self::SerializationError(_) | Self::SourceError { .. } | Self::Disconnected => {
                ErrorCategory::Stream
            }
            Self::IoError(_) => ErrorCategory::Output,
            Self::SessionClosed => ErrorCategory::Session,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::SessionClosed => ErrorSeverity::Low,
            // 429 / 5xx 可以稍後重新執行
            Self::ApiStatus { status, .. } if *status == 429 || *status >= 500 => {
                ErrorSeverity::Medium
            }
            Self::ApiError(e) if e.is_timeout() || e.is_connect() => ErrorSeverity::Medium,
            Self::Disconnected => ErrorSeverity::Medium,
            Self::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// 依嚴重程度決定的行程結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::MissingConfigError { .. } | Self::CredentialFormatError { .. } => {
                "Check the key file: one `key value` pair per line, including bearer_token"
            }
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "Fix the command line arguments or the TOML configuration file"
            }
            Self::ApiStatus { status: 401, .. } | Self::ApiStatus { status: 403, .. } => {
                "Verify that the bearer token is valid and has streaming access"
            }
            Self::ApiStatus { status: 429, .. } => {
                "Rate limited or another stream is already connected; wait before retrying"
            }
            Self::ApiStatus { .. } | Self::ApiError(_) => {
                "Check network connectivity and the API base URL"
            }
            Self::SerializationError(_) | Self::SourceError { .. } | Self::Disconnected => {
                "The stream ended unexpectedly; run the command again to start a new session"
            }
            Self::IoError(_) => "Check that the output path is writable and the disk is not full",
            Self::SessionClosed => "Create a new session instead of re-running a finished one",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::MissingConfigError { field } => {
                format!("Missing `{}` in the credential file", field)
            }
            Self::ApiStatus { status, message } => {
                format!("Twitter rejected the request (HTTP {}): {}", status, message)
            }
            Self::Disconnected => "The stream connection was closed by Twitter".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
