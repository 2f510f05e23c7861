//! Storyfeed engine: fetching, decoding, and ordered display of stories.
mod decode;
mod display;
mod fetch;
mod sequence;
mod types;

pub use decode::{decode_story, DecodeError, DecodedStory};
pub use display::{StdoutDisplay, StoryDisplay};
pub use fetch::{ChannelProgressSink, FetchSettings, Fetcher, ProgressSink, ReqwestFetcher};
pub use sequence::{
    DeliveryMode, ErrorPolicy, SequenceChain, SequenceError, Sequencer, SequencerConfig,
};
pub use types::{
    FailureKind, FeedEvent, FetchError, FetchMetadata, FetchOutput, Stage, StoryError, StoryId,
    StoryOutcome, StoryProgress,
};
