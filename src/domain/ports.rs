use crate::domain::model::{Delivery, Record};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Instant;

/// A lazy, non-restartable sequence of deliveries.
#[async_trait]
pub trait RecordSource: Send {
    /// Waits for the next delivery. `Ok(None)` means the source is exhausted.
    async fn next_delivery(&mut self) -> Result<Option<Delivery>>;
}

pub trait RecordSink: Send {
    fn write_record(&mut self, record: &Record) -> Result<()>;

    /// Flushes and releases the underlying writer. Calling it twice is a no-op.
    fn close(&mut self) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}
