use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One post exactly as received from the stream: the raw JSON line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    raw: String,
}

impl Record {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn into_inner(self) -> String {
        self.raw
    }
}

/// What a source yields for one non-empty line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Record(Record),
    /// The stream sent an empty payload (`null` or an object without `data`).
    NullPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    CountLimit,
    TimeLimit,
    Interrupted,
    NullPayload,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::CountLimit => "record budget reached",
            Self::TimeLimit => "time budget reached",
            Self::Interrupted => "interrupted",
            Self::NullPayload => "stream delivered an empty payload",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming,
    Stopped(StopReason),
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped(_) | Self::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct StreamSummary {
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
    /// Records delivered by the source, including the one that tripped a cutoff.
    pub received: u64,
    pub forwarded: u64,
    pub stop: StopReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl StreamRule {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            id: None,
            value: value.into(),
            tag: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TweetCount {
    pub start: String,
    pub end: String,
    pub tweet_count: u64,
}
