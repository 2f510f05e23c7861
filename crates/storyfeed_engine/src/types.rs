use std::fmt;

use crate::decode::DecodeError;

pub type StoryId = u64;

/// Lifecycle stages a story moves through during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Queued,
    Fetching,
    Decoding,
    Displaying,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryProgress {
    pub story_id: StoryId,
    pub stage: Stage,
    pub bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Progress(StoryProgress),
    StoryDone {
        story_id: StoryId,
        result: Result<StoryOutcome, StoryError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub requested_url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

/// What a displayed story looked like once it was on the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryOutcome {
    pub final_url: String,
    pub byte_len: u64,
    pub encoding: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    ProcessingError,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "story too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::ProcessingError => write!(f, "processing error"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Everything that can go wrong for a single story between fetch start and
/// display.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoryError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
}
