pub mod consumer;
pub mod filter;
pub mod session;

pub use crate::domain::model::{
    Delivery, Record, SessionState, StopReason, StreamRule, StreamSummary, TweetCount,
};
pub use crate::domain::ports::{Clock, RecordSink, RecordSource};
pub use crate::utils::error::Result;
