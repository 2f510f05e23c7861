use std::future::Future;
use std::mem;
use std::str::FromStr;
use std::sync::Arc;

use futures_util::future::{self, try_join_all, BoxFuture};
use futures_util::FutureExt;
use tokio::task::JoinHandle;

use crate::decode::decode_story;
use crate::display::StoryDisplay;
use crate::fetch::{Fetcher, ProgressSink};
use crate::types::{
    FailureKind, FeedEvent, FetchError, FetchOutput, Stage, StoryError, StoryId, StoryOutcome,
    StoryProgress,
};

/// How fetches and displays are ordered relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// One story at a time; the next fetch starts only after the previous
    /// story is on the surface.
    Serial,
    /// Every fetch starts immediately; stories are displayed in manifest
    /// order as each predecessor finishes displaying.
    Overlapped,
    /// Everything is fetched and decoded first, then displayed as one batch.
    Batch,
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "serial" => Ok(DeliveryMode::Serial),
            "overlapped" => Ok(DeliveryMode::Overlapped),
            "batch" => Ok(DeliveryMode::Batch),
            other => Err(format!("unknown delivery mode {other:?}")),
        }
    }
}

/// What to do when a single story fails under serial or overlapped delivery.
///
/// Batch delivery is all-or-nothing regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Abort the run at the first failed story.
    Halt,
    /// Log the failure, append a marker in the story's slot, keep going.
    SkipAndMark,
}

#[derive(Debug, Clone, Copy)]
pub struct SequencerConfig {
    pub on_story_error: ErrorPolicy,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            on_story_error: ErrorPolicy::Halt,
        }
    }
}

/// A run-level failure: the story that sank the run, and why.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("story {story_id} failed: {source}")]
pub struct SequenceError {
    pub story_id: StoryId,
    #[source]
    pub source: StoryError,
}

/// Display steps that must run in enqueue order.
///
/// The chain owns a single tail future; `push` swaps in a new tail that
/// first awaits the old one. Steps therefore execute strictly in the order
/// they were pushed, no matter how early each story's fetch finishes, and an
/// error short-circuits every later step.
pub struct SequenceChain {
    tail: BoxFuture<'static, Result<(), SequenceError>>,
}

impl SequenceChain {
    pub fn new() -> Self {
        Self {
            tail: future::ready(Ok(())).boxed(),
        }
    }

    pub fn push<F>(&mut self, step: F)
    where
        F: Future<Output = Result<(), SequenceError>> + Send + 'static,
    {
        let prev = mem::replace(&mut self.tail, future::ready(Ok(())).boxed());
        self.tail = async move {
            prev.await?;
            step.await
        }
        .boxed();
    }

    /// Wait for every pushed step, stopping at the first error.
    pub async fn drain(self) -> Result<(), SequenceError> {
        self.tail.await
    }
}

impl Default for SequenceChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetches stories and appends their text to a display surface under a
/// [`DeliveryMode`].
///
/// Holds no cross-run state; each run builds its own chain.
#[derive(Clone)]
pub struct Sequencer {
    fetcher: Arc<dyn Fetcher>,
    display: Arc<dyn StoryDisplay>,
    sink: Arc<dyn ProgressSink>,
    config: SequencerConfig,
}

struct ReadyStory {
    text: String,
    outcome: StoryOutcome,
}

impl Sequencer {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        display: Arc<dyn StoryDisplay>,
        sink: Arc<dyn ProgressSink>,
        config: SequencerConfig,
    ) -> Self {
        Self {
            fetcher,
            display,
            sink,
            config,
        }
    }

    pub async fn run(
        &self,
        mode: DeliveryMode,
        stories: Vec<String>,
    ) -> Result<(), SequenceError> {
        match mode {
            DeliveryMode::Serial => self.run_serial(stories).await,
            DeliveryMode::Overlapped => self.run_overlapped(stories).await,
            DeliveryMode::Batch => self.run_batch(stories).await,
        }
    }

    /// Fetch and display one story at a time, in manifest order.
    ///
    /// No two stories' network activity ever overlaps; total latency is the
    /// sum of the per-story latencies.
    pub async fn run_serial(&self, stories: Vec<String>) -> Result<(), SequenceError> {
        for (index, url) in stories.into_iter().enumerate() {
            let story_id = index as StoryId + 1;
            let ready = self.fetch_and_decode(story_id, &url).await;
            self.deliver(story_id, &url, ready)?;
        }
        Ok(())
    }

    /// Start every fetch immediately; display in manifest order.
    ///
    /// Each chain link waits for its predecessor's display before touching
    /// its own fetch handle, so a slow early story holds back later,
    /// already-fetched stories. That ordering is the point of this mode.
    pub async fn run_overlapped(&self, stories: Vec<String>) -> Result<(), SequenceError> {
        let mut chain = SequenceChain::new();
        for (index, url) in stories.into_iter().enumerate() {
            let story_id = index as StoryId + 1;
            let handle = self.spawn_fetch(story_id, url.clone());
            let sequencer = self.clone();
            chain.push(async move {
                let ready = match join_fetch(handle).await {
                    Ok(output) => decode_output(story_id, output, sequencer.sink.as_ref()),
                    Err(err) => Err(err),
                };
                sequencer.deliver(story_id, &url, ready)
            });
        }
        chain.drain().await
    }

    /// Fetch and decode everything, then display the whole run at once.
    ///
    /// All-or-nothing: the first failed story fails the batch and nothing is
    /// displayed.
    pub async fn run_batch(&self, stories: Vec<String>) -> Result<(), SequenceError> {
        if stories.is_empty() {
            return Ok(());
        }

        let handles: Vec<_> = stories
            .into_iter()
            .enumerate()
            .map(|(index, url)| {
                let story_id = index as StoryId + 1;
                (story_id, self.spawn_fetch(story_id, url))
            })
            .collect();

        let joined = try_join_all(handles.into_iter().map(|(story_id, handle)| async move {
            join_fetch(handle)
                .await
                .map(|output| (story_id, output))
                .map_err(|source| SequenceError { story_id, source })
        }))
        .await;

        let outputs = match joined {
            Ok(outputs) => outputs,
            Err(err) => {
                self.sink.emit(FeedEvent::StoryDone {
                    story_id: err.story_id,
                    result: Err(err.source.clone()),
                });
                return Err(err);
            }
        };

        let mut texts = Vec::with_capacity(outputs.len());
        let mut delivered = Vec::with_capacity(outputs.len());
        for (story_id, output) in outputs {
            match decode_output(story_id, output, self.sink.as_ref()) {
                Ok(ready) => {
                    texts.push(ready.text);
                    delivered.push((story_id, ready.outcome));
                }
                Err(source) => {
                    self.sink.emit(FeedEvent::StoryDone {
                        story_id,
                        result: Err(source.clone()),
                    });
                    return Err(SequenceError { story_id, source });
                }
            }
        }

        self.display.append_all(&texts);
        for (story_id, outcome) in delivered {
            self.sink.emit(FeedEvent::StoryDone {
                story_id,
                result: Ok(outcome),
            });
        }
        Ok(())
    }

    fn spawn_fetch(
        &self,
        story_id: StoryId,
        url: String,
    ) -> JoinHandle<Result<FetchOutput, FetchError>> {
        let fetcher = Arc::clone(&self.fetcher);
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move { fetcher.fetch(story_id, &url, sink.as_ref()).await })
    }

    async fn fetch_and_decode(
        &self,
        story_id: StoryId,
        url: &str,
    ) -> Result<ReadyStory, StoryError> {
        let output = self.fetcher.fetch(story_id, url, self.sink.as_ref()).await?;
        decode_output(story_id, output, self.sink.as_ref())
    }

    /// Put one story (or its failure) on the surface according to policy.
    fn deliver(
        &self,
        story_id: StoryId,
        url: &str,
        ready: Result<ReadyStory, StoryError>,
    ) -> Result<(), SequenceError> {
        match ready {
            Ok(story) => {
                self.sink.emit(FeedEvent::Progress(StoryProgress {
                    story_id,
                    stage: Stage::Displaying,
                    bytes: Some(story.outcome.byte_len),
                }));
                self.display.append(&story.text);
                self.sink.emit(FeedEvent::StoryDone {
                    story_id,
                    result: Ok(story.outcome),
                });
                Ok(())
            }
            Err(err) => {
                self.sink.emit(FeedEvent::StoryDone {
                    story_id,
                    result: Err(err.clone()),
                });
                match self.config.on_story_error {
                    ErrorPolicy::Halt => Err(SequenceError {
                        story_id,
                        source: err,
                    }),
                    ErrorPolicy::SkipAndMark => {
                        feed_logging::feed_warn!("story {story_id} ({url}) skipped: {err}");
                        self.display.append(&format!("[story unavailable: {url}]\n"));
                        Ok(())
                    }
                }
            }
        }
    }
}

/// Await a spawned fetch, folding panics and cancellation into a story error.
async fn join_fetch(
    handle: JoinHandle<Result<FetchOutput, FetchError>>,
) -> Result<FetchOutput, StoryError> {
    match handle.await {
        Ok(result) => result.map_err(StoryError::Fetch),
        Err(join_err) => Err(StoryError::Fetch(FetchError::new(
            FailureKind::ProcessingError,
            join_err.to_string(),
        ))),
    }
}

fn decode_output(
    story_id: StoryId,
    output: FetchOutput,
    sink: &dyn ProgressSink,
) -> Result<ReadyStory, StoryError> {
    sink.emit(FeedEvent::Progress(StoryProgress {
        story_id,
        stage: Stage::Decoding,
        bytes: Some(output.metadata.byte_len),
    }));
    let decoded = decode_story(&output.bytes, output.metadata.content_type.as_deref())?;
    Ok(ReadyStory {
        text: decoded.text,
        outcome: StoryOutcome {
            final_url: output.metadata.final_url,
            byte_len: output.metadata.byte_len,
            encoding: decoded.encoding_label,
        },
    })
}
