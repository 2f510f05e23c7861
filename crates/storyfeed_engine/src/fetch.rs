use std::sync::mpsc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;

use crate::types::{
    FailureKind, FeedEvent, FetchError, FetchMetadata, FetchOutput, Stage, StoryId, StoryProgress,
};

/// Network limits and content gates for story downloads.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub accepted_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 2 * 1024 * 1024,
            accepted_content_types: vec![
                "text/plain".to_string(),
                "text/html".to_string(),
                "application/json".to_string(),
            ],
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: FeedEvent);
}

/// Forwards engine events over a std channel, e.g. to the app's bookkeeping.
pub struct ChannelProgressSink {
    tx: mpsc::Sender<FeedEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<FeedEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: FeedEvent) {
        let _ = self.tx.send(event);
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        story_id: StoryId,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client, settings })
    }

    fn accepts_content_type(&self, value: &str) -> bool {
        let essence = value.split(';').next().unwrap_or(value).trim();
        self.settings
            .accepted_content_types
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(essence))
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        story_id: StoryId,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(length) = response.content_length() {
            if length > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(length),
                    },
                    "story too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        if let Some(ct) = content_type.as_deref() {
            if !self.accepts_content_type(ct) {
                return Err(FetchError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        sink.emit(FeedEvent::Progress(StoryProgress {
            story_id,
            stage: Stage::Fetching,
            bytes: Some(0),
        }));

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let total = body.len() as u64 + chunk.len() as u64;
            if total > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(total),
                    },
                    "story too large",
                ));
            }
            body.extend_from_slice(&chunk);
            sink.emit(FeedEvent::Progress(StoryProgress {
                story_id,
                stage: Stage::Fetching,
                bytes: Some(body.len() as u64),
            }));
        }

        let metadata = FetchMetadata {
            requested_url: url.to_string(),
            final_url,
            content_type,
            byte_len: body.len() as u64,
        };

        Ok(FetchOutput {
            bytes: body,
            metadata,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
