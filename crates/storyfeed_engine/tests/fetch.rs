use std::sync::{Arc, Mutex};
use std::time::Duration;

use storyfeed_engine::{
    FailureKind, FeedEvent, FetchSettings, Fetcher, ProgressSink, ReqwestFetcher, Stage,
    StoryProgress,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<FeedEvent>>>,
}

impl TestSink {
    fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn take(&self) -> Vec<FeedEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: FeedEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[tokio::test]
async fn fetcher_returns_story_text_and_emits_progress() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("Once upon a time.", "text/plain; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default()).expect("client");
    let sink = TestSink::new();
    let url = format!("{}/story", server.uri());

    let output = fetcher.fetch(1, &url, &sink).await.expect("fetch ok");
    assert_eq!(output.metadata.requested_url, url);
    assert_eq!(output.metadata.final_url, output.metadata.requested_url);
    assert!(output
        .metadata
        .content_type
        .as_deref()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(output.bytes, b"Once upon a time.");
    assert_eq!(output.metadata.byte_len, 17);

    let stages = sink
        .take()
        .into_iter()
        .filter_map(|event| match event {
            FeedEvent::Progress(StoryProgress { stage, .. }) => Some(stage),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert!(stages.contains(&Stage::Fetching));
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default()).expect("client");
    let sink = TestSink::new();
    let url = format!("{}/missing", server.uri());

    let err = fetcher.fetch(7, &url, &sink).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings).expect("client");
    let sink = TestSink::new();
    let url = format!("{}/slow", server.uri());

    let err = fetcher.fetch(2, &url, &sink).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn fetcher_rejects_too_large_story() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/plain")
                .insert_header("Content-Length", "11")
                .set_body_string("01234567890"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings).expect("client");
    let sink = TestSink::new();
    let url = format!("{}/large", server.uri());

    let err = fetcher.fetch(3, &url, &sink).await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
}

#[tokio::test]
async fn fetcher_rejects_unsupported_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/binary"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 4], "application/pdf"))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default()).expect("client");
    let sink = TestSink::new();
    let url = format!("{}/binary", server.uri());

    let err = fetcher.fetch(4, &url, &sink).await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::UnsupportedContentType {
            content_type: "application/pdf".to_string()
        }
    );
}

#[tokio::test]
async fn fetcher_rejects_invalid_urls() {
    let fetcher = ReqwestFetcher::new(FetchSettings::default()).expect("client");
    let sink = TestSink::new();

    let err = fetcher.fetch(5, "not a url", &sink).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
