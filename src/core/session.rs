use crate::adapters::{SystemClock, TweetStream, TwitterClient};
use crate::config::{Credentials, FilterSettings, Settings};
use crate::core::consumer::BoundedConsumer;
use crate::core::filter::StreamFilter;
use crate::core::{RecordSink, SessionState, StopReason, StreamSummary, TweetCount};
use crate::utils::error::{Result, StreamError};
use crate::utils::monitor::SystemMonitor;
use std::future::Future;

/// One configured run: rule setup against the API, then the bounded consumer.
pub struct StreamSession<K: RecordSink> {
    client: TwitterClient,
    filter: Option<StreamFilter>,
    filter_settings: FilterSettings,
    consumer: BoundedConsumer<K, SystemClock>,
    monitor: SystemMonitor,
}

impl<K: RecordSink> StreamSession<K> {
    /// Fails with a configuration error when the key file has no bearer token.
    pub fn configure(settings: &Settings, credentials: &Credentials, sink: K) -> Result<Self> {
        Self::configure_with(settings, credentials, || Ok(sink))
    }

    /// Like `configure`, but the sink is only opened once the credentials and
    /// HTTP client are ready, so a bad key file never truncates the output.
    pub fn configure_with<F>(
        settings: &Settings,
        credentials: &Credentials,
        open_sink: F,
    ) -> Result<Self>
    where
        F: FnOnce() -> Result<K>,
    {
        let bearer_token = credentials.bearer_token()?;
        let client = TwitterClient::new(&settings.api, bearer_token)?;
        let sink = open_sink()?;
        let consumer = BoundedConsumer::new(sink, SystemClock, settings.budget)
            .with_progress_interval(settings.progress_interval);

        Ok(Self {
            client,
            filter: settings.stream_filter(),
            filter_settings: settings.filter.clone(),
            consumer,
            monitor: SystemMonitor::new(settings.monitor),
        })
    }

    pub fn filter(&self) -> Option<&StreamFilter> {
        self.filter.as_ref()
    }

    pub fn consumer(&self) -> &BoundedConsumer<K, SystemClock> {
        &self.consumer
    }

    pub fn into_sink(self) -> K {
        self.consumer.into_sink()
    }

    /// Sets up the stream and consumes it until a budget runs out, `shutdown`
    /// resolves, or the API fails. An interrupt during setup ends the session
    /// gracefully with nothing forwarded. A session that already ended
    /// returns `SessionClosed` without touching the API.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<StreamSummary>
    where
        F: Future<Output = ()>,
    {
        // 結束的 session 不可重新設定規則或重連
        if self.consumer.state() != SessionState::Idle {
            return Err(StreamError::SessionClosed);
        }

        tokio::pin!(shutdown);

        let opened = tokio::select! {
            biased;
            _ = &mut shutdown => None,
            opened = self.open_source() => Some(opened),
        };

        let summary = match opened {
            None => {
                tracing::info!("🛑 Interrupted before the stream was opened");
                self.consumer.abort(StopReason::Interrupted)?
            }
            Some(Err(e)) => {
                self.consumer.fail();
                return Err(e);
            }
            Some(Ok(mut source)) => {
                self.monitor.log_stats("Streaming", 0);
                self.consumer.run(&mut source, shutdown.as_mut()).await?
            }
        };

        self.monitor.log_final_stats(summary.forwarded);
        tracing::info!(
            "✅ Stream stopped ({}): {} records forwarded, {} received",
            summary.stop,
            summary.forwarded,
            summary.received
        );
        tracing::info!("Total run time {:?}", summary.elapsed);

        Ok(summary)
    }

    async fn open_source(&self) -> Result<TweetStream> {
        // 舊規則會繼續生效，先全部刪除
        let removed = self.client.clear_stream_rules().await?;
        if removed > 0 {
            tracing::info!("🧹 Removed {} old stream rules", removed);
        }

        match &self.filter {
            Some(filter) => {
                let query = filter.query();
                self.preview_counts(&query).await;

                self.client.add_stream_rules(&[filter.to_rule()]).await?;
                tracing::info!("🔎 Tracking rule: {}", query);

                self.client
                    .open_filtered_stream(
                        &self.filter_settings.tweet_fields,
                        &self.filter_settings.expansions,
                    )
                    .await
            }
            None => {
                tracing::info!("🎲 No filter words given, sampling the volume stream");
                self.client.open_sample_stream(&[], &[]).await
            }
        }
    }

    /// Logs the last seven days of counts for the query. Failures only warn:
    /// the counts endpoint needs a higher access level than streaming.
    async fn preview_counts(&self, query: &str) {
        match self.client.recent_tweet_counts(query).await {
            Ok(counts) => {
                tracing::info!("Last 7 days of tweet counts for query: {}", query);
                tracing::info!("start_time | tweet_count");
                for count in &counts {
                    tracing::info!("{} | {}", count.start, count.tweet_count);
                }
                if exceeds_daily_warning(&counts, self.filter_settings.daily_count_warning) {
                    tracing::warn!(
                        "⚠️ You might exceed the {} tweet budget with this query!",
                        self.consumer.budget().record_limit
                    );
                }
            }
            Err(e) => tracing::warn!("Could not fetch recent tweet counts: {}", e),
        }
    }
}

pub fn exceeds_daily_warning(counts: &[TweetCount], threshold: u64) -> bool {
    counts.iter().any(|count| count.tweet_count > threshold)
}
