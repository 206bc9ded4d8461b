use flate2::read::GzDecoder;
use httpmock::prelude::*;
use serde_json::json;
use std::io::Read;
use tempfile::TempDir;
use tweet_stream::core::StopReason;
use tweet_stream::{Credentials, LineSink, OutputSink, Settings, StreamError, StreamSession};

const RULES_PATH: &str = "/2/tweets/search/stream/rules";
const FILTERED_PATH: &str = "/2/tweets/search/stream";
const SAMPLE_PATH: &str = "/2/tweets/sample/stream";
const COUNTS_PATH: &str = "/2/tweets/counts/recent";

fn credentials() -> Credentials {
    Credentials::parse("api_key k\napi_secret s\nbearer_token test-token\n").unwrap()
}

fn settings_for(server: &MockServer) -> Settings {
    let mut settings = Settings::default();
    settings.api.base_url = server.base_url();
    settings
}

fn tweet(i: usize) -> String {
    format!(
        r#"{{"data":{{"id":"{}","text":"tweet number {}","created_at":"2026-10-18T00:00:0{}.000Z"}}}}"#,
        i,
        i,
        i % 10
    )
}

fn stream_body(count: usize) -> String {
    let mut body = String::new();
    for i in 1..=count {
        body.push_str(&tweet(i));
        body.push_str("\r\n");
        if i % 3 == 0 {
            // keep-alive
            body.push_str("\r\n");
        }
    }
    body
}

fn no_rules(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path(RULES_PATH);
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({"meta": {"sent": "2026-10-18T00:00:00.000Z", "result_count": 0}}));
    })
}

#[tokio::test]
async fn test_filtered_session_replaces_rules_and_stops_at_budget() {
    let server = MockServer::start();

    let list_rules = server.mock(|when, then| {
        when.method(GET)
            .path(RULES_PATH)
            .header("Authorization", "Bearer test-token");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({
                "data": [{"id": "111", "value": "old rule"}],
                "meta": {"sent": "2026-10-18T00:00:00.000Z", "result_count": 1}
            }));
    });

    let delete_rules = server.mock(|when, then| {
        when.method(POST)
            .path(RULES_PATH)
            .json_body(json!({"delete": {"ids": ["111"]}}));
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({
                "meta": {"sent": "2026-10-18T00:00:00.000Z", "summary": {"deleted": 1, "not_deleted": 0}}
            }));
    });

    let counts = server.mock(|when, then| {
        when.method(GET)
            .path(COUNTS_PATH)
            .query_param("query", "rust systems lang:en")
            .query_param("granularity", "day");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({
                "data": [
                    {"start": "2026-10-16T00:00:00.000Z", "end": "2026-10-17T00:00:00.000Z", "tweet_count": 1200},
                    {"start": "2026-10-17T00:00:00.000Z", "end": "2026-10-18T00:00:00.000Z", "tweet_count": 400000}
                ],
                "meta": {"total_tweet_count": 401200}
            }));
    });

    let add_rule = server.mock(|when, then| {
        when.method(POST)
            .path(RULES_PATH)
            .json_body(json!({"add": [{"value": "rust systems lang:en"}]}));
        then.status(201)
            .header("Content-Type", "application/json")
            .json_body(json!({
                "data": [{"id": "222", "value": "rust systems lang:en"}],
                "meta": {"sent": "2026-10-18T00:00:00.000Z", "summary": {"created": 1, "not_created": 0}}
            }));
    });

    let stream = server.mock(|when, then| {
        when.method(GET)
            .path(FILTERED_PATH)
            .query_param("tweet.fields", "created_at")
            .query_param("expansions", "author_id,referenced_tweets.id.author_id");
        then.status(200).body(stream_body(10));
    });

    let mut settings = settings_for(&server);
    settings.filter.terms = vec!["rust".to_string(), "systems".to_string()];
    settings.budget.record_limit = 5;

    let mut session =
        StreamSession::configure(&settings, &credentials(), LineSink::new(Vec::new())).unwrap();
    let summary = session.run(std::future::pending()).await.unwrap();

    list_rules.assert();
    delete_rules.assert();
    counts.assert();
    add_rule.assert();
    stream.assert();

    // 5 的 80% 是 4：第 5 筆觸發停止且不寫出
    assert_eq!(summary.stop, StopReason::CountLimit);
    assert_eq!(summary.received, 5);
    assert_eq!(summary.forwarded, 4);

    let output = String::from_utf8(session.into_sink().into_inner().unwrap()).unwrap();
    let expected: Vec<String> = (1..=4).map(tweet).collect();
    assert_eq!(output.lines().collect::<Vec<_>>(), expected);
}

#[tokio::test]
async fn test_sample_session_writes_gzip_and_fails_on_disconnect() {
    let server = MockServer::start();
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("sample.json.gz");

    let list_rules = no_rules(&server);
    let delete_rules = server.mock(|when, then| {
        when.method(POST).path(RULES_PATH);
        then.status(200).json_body(json!({"meta": {"sent": "x"}}));
    });
    let stream = server.mock(|when, then| {
        when.method(GET)
            .path(SAMPLE_PATH)
            .header("Authorization", "Bearer test-token");
        then.status(200).body(stream_body(3));
    });

    let settings = settings_for(&server);
    let sink = OutputSink::gzip(&output_path).unwrap();
    let mut session = StreamSession::configure(&settings, &credentials(), sink).unwrap();

    let err = session.run(std::future::pending()).await.unwrap_err();

    list_rules.assert();
    delete_rules.assert_hits(0);
    stream.assert();
    assert!(matches!(err, StreamError::Disconnected));

    // 失敗時仍會關閉 gzip 檔
    let mut decoder = GzDecoder::new(std::fs::File::open(&output_path).unwrap());
    let mut content = String::new();
    decoder.read_to_string(&mut content).unwrap();
    let expected: Vec<String> = (1..=3).map(tweet).collect();
    assert_eq!(content.lines().collect::<Vec<_>>(), expected);
}

#[tokio::test]
async fn test_null_payload_ends_session_without_error() {
    let server = MockServer::start();
    no_rules(&server);

    let body = format!("{}\r\n{}\r\nnull\r\n{}\r\n", tweet(1), tweet(2), tweet(3));
    server.mock(|when, then| {
        when.method(GET).path(SAMPLE_PATH);
        then.status(200).body(body);
    });

    let mut session = StreamSession::configure(
        &settings_for(&server),
        &credentials(),
        LineSink::new(Vec::new()),
    )
    .unwrap();
    let summary = session.run(std::future::pending()).await.unwrap();

    assert_eq!(summary.stop, StopReason::NullPayload);
    assert_eq!(summary.forwarded, 2);
}

#[tokio::test]
async fn test_stream_error_payload_is_fatal() {
    let server = MockServer::start();
    no_rules(&server);

    let body = format!(
        "{}\r\n{}\r\n",
        tweet(1),
        r#"{"errors":[{"title":"operational-disconnect","detail":"This stream has been disconnected upstream for operational reasons."}]}"#
    );
    server.mock(|when, then| {
        when.method(GET).path(SAMPLE_PATH);
        then.status(200).body(body);
    });

    let mut session = StreamSession::configure(
        &settings_for(&server),
        &credentials(),
        LineSink::new(Vec::new()),
    )
    .unwrap();
    let err = session.run(std::future::pending()).await.unwrap_err();

    assert!(matches!(err, StreamError::SourceError { .. }));
    assert_eq!(session.consumer().forwarded(), 1);
}

#[tokio::test]
async fn test_unauthorized_rules_request_propagates() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(RULES_PATH);
        then.status(401)
            .header("Content-Type", "application/problem+json")
            .json_body(json!({
                "title": "Unauthorized",
                "type": "about:blank",
                "status": 401,
                "detail": "Unauthorized"
            }));
    });
    let stream = server.mock(|when, then| {
        when.method(GET).path(SAMPLE_PATH);
        then.status(200).body(stream_body(1));
    });

    let mut session = StreamSession::configure(
        &settings_for(&server),
        &credentials(),
        LineSink::new(Vec::new()),
    )
    .unwrap();
    let err = session.run(std::future::pending()).await.unwrap_err();

    stream.assert_hits(0);
    match err {
        StreamError::ApiStatus { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Unauthorized");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_counts_failure_does_not_block_filtered_stream() {
    let server = MockServer::start();
    no_rules(&server);

    let counts = server.mock(|when, then| {
        when.method(GET).path(COUNTS_PATH);
        then.status(403).json_body(json!({"title": "Forbidden", "detail": "Client Forbidden"}));
    });
    server.mock(|when, then| {
        when.method(POST).path(RULES_PATH);
        then.status(201)
            .json_body(json!({"data": [{"id": "1", "value": "tokio lang:en"}]}));
    });
    server.mock(|when, then| {
        when.method(GET).path(FILTERED_PATH);
        then.status(200).body(format!("{}\r\nnull\r\n", tweet(7)));
    });

    let mut settings = settings_for(&server);
    settings.filter.terms = vec!["tokio".to_string()];

    let mut session =
        StreamSession::configure(&settings, &credentials(), LineSink::new(Vec::new())).unwrap();
    let summary = session.run(std::future::pending()).await.unwrap();

    counts.assert();
    assert_eq!(summary.forwarded, 1);
    assert_eq!(summary.stop, StopReason::NullPayload);
}

#[tokio::test]
async fn test_rejected_rule_is_configuration_error() {
    let server = MockServer::start();
    no_rules(&server);
    server.mock(|when, then| {
        when.method(GET).path(COUNTS_PATH);
        then.status(200).json_body(json!({"data": []}));
    });
    server.mock(|when, then| {
        when.method(POST).path(RULES_PATH);
        then.status(200).json_body(json!({
            "meta": {"sent": "x", "summary": {"created": 0, "not_created": 1}},
            "errors": [{"value": "(( lang:en", "title": "Invalid Rule"}]
        }));
    });
    let stream = server.mock(|when, then| {
        when.method(GET).path(FILTERED_PATH);
        then.status(200).body(stream_body(1));
    });

    let mut settings = settings_for(&server);
    settings.filter.terms = vec!["((".to_string()];

    let mut session =
        StreamSession::configure(&settings, &credentials(), LineSink::new(Vec::new())).unwrap();
    let err = session.run(std::future::pending()).await.unwrap_err();

    stream.assert_hits(0);
    assert!(matches!(err, StreamError::ConfigError { .. }));
}

#[tokio::test]
async fn test_finished_session_does_not_touch_api_again() {
    let server = MockServer::start();
    let list_rules = no_rules(&server);
    let delete_rules = server.mock(|when, then| {
        when.method(POST).path(RULES_PATH);
        then.status(200).json_body(json!({"meta": {"sent": "x"}}));
    });
    let stream = server.mock(|when, then| {
        when.method(GET).path(SAMPLE_PATH);
        then.status(200).body(format!("{}\r\nnull\r\n", tweet(1)));
    });

    let mut session = StreamSession::configure(
        &settings_for(&server),
        &credentials(),
        LineSink::new(Vec::new()),
    )
    .unwrap();
    let summary = session.run(std::future::pending()).await.unwrap();
    assert_eq!(summary.stop, StopReason::NullPayload);

    let err = session.run(std::future::pending()).await.unwrap_err();

    assert!(matches!(err, StreamError::SessionClosed));
    list_rules.assert_hits(1);
    delete_rules.assert_hits(0);
    stream.assert_hits(1);
    assert_eq!(session.consumer().forwarded(), 1);
}

#[test]
fn test_missing_bearer_token_keeps_existing_output_file() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("previous.json.gz");
    std::fs::write(&output_path, b"earlier run").unwrap();

    let credentials = Credentials::parse("api_key k\napi_secret s\n").unwrap();
    let result = StreamSession::configure_with(&Settings::default(), &credentials, || {
        OutputSink::gzip(&output_path)
    });

    assert!(matches!(
        result.err(),
        Some(StreamError::MissingConfigError { field }) if field == "bearer_token"
    ));
    assert_eq!(std::fs::read(&output_path).unwrap(), b"earlier run");
}
