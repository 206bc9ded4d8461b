pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{Credentials, Settings};

pub use adapters::{LineSink, OutputSink, SystemClock, TweetStream, TwitterClient};
pub use crate::core::consumer::{BoundedConsumer, Budget};
pub use crate::core::filter::StreamFilter;
pub use crate::core::session::StreamSession;
pub use utils::error::{Result, StreamError};
