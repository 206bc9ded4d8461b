use crate::adapters::tweet_stream::TweetStream;
use crate::config::ApiSettings;
use crate::core::{StreamRule, TweetCount};
use crate::utils::error::{Result, StreamError};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const RULES_ENDPOINT: &str = "/2/tweets/search/stream/rules";
const FILTERED_STREAM_ENDPOINT: &str = "/2/tweets/search/stream";
const SAMPLE_STREAM_ENDPOINT: &str = "/2/tweets/sample/stream";
const RECENT_COUNTS_ENDPOINT: &str = "/2/tweets/counts/recent";

#[derive(Debug, Deserialize)]
struct RulesResponse {
    #[serde(default)]
    data: Option<Vec<StreamRule>>,
    #[serde(default)]
    errors: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct CountsResponse {
    #[serde(default)]
    data: Vec<TweetCount>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// Bearer-token client for the Twitter v2 rules, counts and stream endpoints.
pub struct TwitterClient {
    client: Client,
    base_url: String,
    bearer_token: String,
    request_timeout: Duration,
}

impl fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitterClient")
            .field("base_url", &self.base_url)
            .field("bearer_token", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl TwitterClient {
    pub fn new(api: &ApiSettings, bearer_token: &str) -> Result<Self> {
        // 串流連線不能設定整體 timeout，只限制建立連線的時間
        let client = Client::builder()
            .connect_timeout(api.connect_timeout)
            .user_agent(format!("tweet-stream/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            bearer_token: bearer_token.to_string(),
            request_timeout: api.request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_stream_rules(&self) -> Result<Vec<StreamRule>> {
        let request = self
            .authorized(self.client.get(self.url(RULES_ENDPOINT)))
            .timeout(self.request_timeout);
        let response: RulesResponse = self.send_json(request).await?;
        Ok(response.data.unwrap_or_default())
    }

    pub async fn add_stream_rules(&self, rules: &[StreamRule]) -> Result<Vec<StreamRule>> {
        #[derive(Serialize)]
        struct AddRulesRequest<'a> {
            add: &'a [StreamRule],
        }

        let request = self
            .authorized(self.client.post(self.url(RULES_ENDPOINT)))
            .timeout(self.request_timeout)
            .json(&AddRulesRequest { add: rules });
        let response: RulesResponse = self.send_json(request).await?;

        let created = response.data.unwrap_or_default();
        if created.is_empty() {
            if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
                return Err(StreamError::ConfigError {
                    message: format!("stream rule rejected: {}", serde_json::Value::Array(errors)),
                });
            }
        }
        Ok(created)
    }

    pub async fn delete_stream_rules(&self, ids: &[String]) -> Result<()> {
        #[derive(Serialize)]
        struct DeleteRulesRequest<'a> {
            delete: DeleteIds<'a>,
        }

        #[derive(Serialize)]
        struct DeleteIds<'a> {
            ids: &'a [String],
        }

        let request = self
            .authorized(self.client.post(self.url(RULES_ENDPOINT)))
            .timeout(self.request_timeout)
            .json(&DeleteRulesRequest {
                delete: DeleteIds { ids },
            });
        let _: RulesResponse = self.send_json(request).await?;
        Ok(())
    }

    /// 刪除所有既有規則，回傳刪除數量
    pub async fn clear_stream_rules(&self) -> Result<usize> {
        let ids: Vec<String> = self
            .get_stream_rules()
            .await?
            .into_iter()
            .filter_map(|rule| rule.id)
            .collect();

        if ids.is_empty() {
            return Ok(0);
        }

        tracing::debug!("Deleting {} existing stream rules", ids.len());
        self.delete_stream_rules(&ids).await?;
        Ok(ids.len())
    }

    /// Daily tweet counts for the last seven days.
    pub async fn recent_tweet_counts(&self, query: &str) -> Result<Vec<TweetCount>> {
        let request = self
            .authorized(self.client.get(self.url(RECENT_COUNTS_ENDPOINT)))
            .timeout(self.request_timeout)
            .query(&[("query", query), ("granularity", "day")]);
        let response: CountsResponse = self.send_json(request).await?;
        Ok(response.data)
    }

    pub async fn open_filtered_stream(
        &self,
        tweet_fields: &[String],
        expansions: &[String],
    ) -> Result<TweetStream> {
        let params = field_params(tweet_fields, expansions);
        let request = self
            .authorized(self.client.get(self.url(FILTERED_STREAM_ENDPOINT)))
            .query(&params);
        self.open_stream(request).await
    }

    pub async fn open_sample_stream(
        &self,
        tweet_fields: &[String],
        expansions: &[String],
    ) -> Result<TweetStream> {
        let params = field_params(tweet_fields, expansions);
        let request = self
            .authorized(self.client.get(self.url(SAMPLE_STREAM_ENDPOINT)))
            .query(&params);
        self.open_stream(request).await
    }

    async fn open_stream(&self, request: RequestBuilder) -> Result<TweetStream> {
        let response = check_status(request.send().await?).await?;
        tracing::info!("🔌 Connected to {}", response.url().path());
        Ok(TweetStream::new(response))
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.bearer_token)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = check_status(request.send().await?).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn field_params(tweet_fields: &[String], expansions: &[String]) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if !tweet_fields.is_empty() {
        params.push(("tweet.fields", tweet_fields.join(",")));
    }
    if !expansions.is_empty() {
        params.push(("expansions", expansions.join(",")));
    }
    params
}

/// Turns a non-2xx response into `ApiStatus`, using the `detail` or `title` of the body.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|e| e.detail.or(e.title))
        .unwrap_or_else(|| {
            if body.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                body
            }
        });

    Err(StreamError::ApiStatus {
        status: status.as_u16(),
        message,
    })
}
