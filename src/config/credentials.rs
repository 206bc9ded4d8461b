use crate::utils::error::{Result, StreamError};
use crate::utils::validation::validate_required_field;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

pub const BEARER_TOKEN: &str = "bearer_token";

/// Key file contents: one whitespace-separated `key value` pair per line.
#[derive(Clone, Default)]
pub struct Credentials {
    entries: HashMap<String, String>,
}

impl Credentials {
    /// 從金鑰檔載入憑證
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse_with_source(&content, &path.display().to_string())
    }

    pub fn parse(content: &str) -> Result<Self> {
        Self::parse_with_source(content, "<inline>")
    }

    fn parse_with_source(content: &str, source: &str) -> Result<Self> {
        let mut entries = HashMap::new();

        for (index, line) in content.lines().enumerate() {
            let row = line.trim();
            if row.is_empty() || row.starts_with('#') {
                continue;
            }

            let mut parts = row.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => {
                    entries.insert(key.to_string(), value.to_string());
                }
                _ => {
                    return Err(StreamError::CredentialFormatError {
                        path: source.to_string(),
                        line: index + 1,
                    })
                }
            }
        }

        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        let value = self.get(key);
        validate_required_field(key, &value).copied()
    }

    pub fn bearer_token(&self) -> Result<&str> {
        self.require(BEARER_TOKEN)
    }
}

// 不輸出任何憑證內容
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Credentials").field("keys", &keys).finish()
    }
}
