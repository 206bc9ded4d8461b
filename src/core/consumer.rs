use crate::core::{Clock, Delivery, RecordSink, RecordSource, SessionState, StopReason, StreamSummary};
use crate::utils::error::{Result, StreamError};
use chrono::Local;
use std::future::Future;
use std::time::{Duration, Instant};

/// Record and wall-clock limits for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub record_limit: u64,
    pub time_limit: Duration,
}

impl Budget {
    pub const DEFAULT_RECORD_LIMIT: u64 = 500_000;
    pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(24 * 60 * 60);

    pub fn new(record_limit: u64, time_limit: Duration) -> Self {
        Self {
            record_limit,
            time_limit,
        }
    }

    /// `count > 0.8 × record_limit`, evaluated without floating point.
    pub fn count_exceeded(&self, count: u64) -> bool {
        u128::from(count) * 5 > u128::from(self.record_limit) * 4
    }

    /// Largest count still inside the budget.
    pub fn cutoff(&self) -> u64 {
        (u128::from(self.record_limit) * 4 / 5) as u64
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RECORD_LIMIT, Self::DEFAULT_TIME_LIMIT)
    }
}

/// Forwards deliveries from a source to a sink until a budget runs out,
/// the shutdown future resolves, or the source fails.
pub struct BoundedConsumer<K: RecordSink, C: Clock> {
    sink: K,
    clock: C,
    budget: Budget,
    progress_interval: u64,
    state: SessionState,
    received: u64,
    forwarded: u64,
    sink_closed: bool,
}

impl<K: RecordSink, C: Clock> BoundedConsumer<K, C> {
    pub fn new(sink: K, clock: C, budget: Budget) -> Self {
        Self {
            sink,
            clock,
            budget,
            progress_interval: 0,
            state: SessionState::Idle,
            received: 0,
            forwarded: 0,
            sink_closed: false,
        }
    }

    /// 每轉發 `interval` 筆記錄輸出一次進度，0 表示關閉
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Streams until a terminal state is reached. The sink is closed on every
    /// exit path; source and sink errors are returned after the close.
    pub async fn run<S, F>(&mut self, source: &mut S, shutdown: F) -> Result<StreamSummary>
    where
        S: RecordSource + ?Sized,
        F: Future<Output = ()>,
    {
        if self.state != SessionState::Idle {
            return Err(StreamError::SessionClosed);
        }

        let started_at = Local::now();
        let start = self.clock.now();
        let deadline = start.checked_add(self.budget.time_limit);
        self.state = SessionState::Streaming;

        tracing::info!("🚀 Started running at {}", started_at.format("%Y-%m-%d %H:%M:%S"));
        tracing::debug!(
            "Budget: {} records (cutoff after {}), {:?}",
            self.budget.record_limit,
            self.budget.cutoff(),
            self.budget.time_limit
        );

        tokio::pin!(shutdown);

        let outcome = loop {
            // 中斷訊號優先：只在兩筆資料之間檢查
            let next = tokio::select! {
                biased;
                _ = &mut shutdown => None,
                next = source.next_delivery() => Some(next),
            };

            let Some(next) = next else {
                tracing::info!("🛑 Interrupt received, shutting down");
                break Ok(StopReason::Interrupted);
            };

            match next {
                Ok(Some(Delivery::Record(record))) => {
                    if let Some(reason) = self.check_budget(deadline) {
                        break Ok(reason);
                    }
                    if let Err(e) = self.sink.write_record(&record) {
                        break Err(e);
                    }
                    self.forwarded += 1;
                    self.report_progress(start);
                }
                Ok(Some(Delivery::NullPayload)) => {
                    tracing::warn!("Stream delivered an empty payload, ending session");
                    break Ok(StopReason::NullPayload);
                }
                Ok(None) => break Err(StreamError::Disconnected),
                Err(e) => break Err(e),
            }
        };

        let elapsed = self.clock.now().saturating_duration_since(start);

        match outcome {
            Ok(stop) => {
                self.state = SessionState::Stopped(stop);
                self.close_sink()?;
                Ok(StreamSummary {
                    started_at,
                    elapsed,
                    received: self.received,
                    forwarded: self.forwarded,
                    stop,
                })
            }
            Err(e) => {
                self.state = SessionState::Failed;
                tracing::error!(
                    "❌ Stream failed after {} records: {}",
                    self.forwarded,
                    e
                );
                if let Err(close_err) = self.close_sink() {
                    tracing::warn!("Failed to close output after stream error: {}", close_err);
                }
                Err(e)
            }
        }
    }

    /// Ends an idle session without streaming, e.g. when interrupted while
    /// the stream was still being set up.
    pub fn abort(&mut self, stop: StopReason) -> Result<StreamSummary> {
        if self.state != SessionState::Idle {
            return Err(StreamError::SessionClosed);
        }

        self.state = SessionState::Stopped(stop);
        self.close_sink()?;

        Ok(StreamSummary {
            started_at: Local::now(),
            elapsed: Duration::ZERO,
            received: 0,
            forwarded: 0,
            stop,
        })
    }

    /// Marks an idle session failed and closes the sink. Close errors are
    /// logged; the caller reports the setup error.
    pub fn fail(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        self.state = SessionState::Failed;
        if let Err(close_err) = self.close_sink() {
            tracing::warn!("Failed to close output: {}", close_err);
        }
    }

    fn check_budget(&mut self, deadline: Option<Instant>) -> Option<StopReason> {
        self.received += 1;

        if self.budget.count_exceeded(self.received) {
            tracing::warn!(
                "⚠️ Received {} records, over 80% of the {} record budget; stopping stream",
                self.received,
                self.budget.record_limit
            );
            return Some(StopReason::CountLimit);
        }

        if deadline.is_some_and(|deadline| self.clock.now() > deadline) {
            tracing::info!(
                "⏰ Time budget of {:?} exhausted after {} records",
                self.budget.time_limit,
                self.forwarded
            );
            return Some(StopReason::TimeLimit);
        }

        None
    }

    fn progress_due(&self) -> bool {
        self.progress_interval > 0 && self.forwarded % self.progress_interval == 0
    }

    fn report_progress(&self, start: Instant) {
        if self.progress_due() {
            tracing::info!(
                "Forwarded {} records in {:?}",
                self.forwarded,
                self.clock.now().saturating_duration_since(start)
            );
        }
    }

    fn close_sink(&mut self) -> Result<()> {
        if self.sink_closed {
            return Ok(());
        }
        self.sink_closed = true;
        self.sink.close()
    }
}
