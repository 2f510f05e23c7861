mod logging;

use std::sync::mpsc;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use feed_logging::{feed_info, feed_warn};
use storyfeed_core::{parse_manifest, RunState, StoryResultKind};
use storyfeed_engine::{
    decode_story, ChannelProgressSink, DeliveryMode, ErrorPolicy, FeedEvent, FetchSettings,
    Fetcher, ReqwestFetcher, Sequencer, SequencerConfig, StdoutDisplay,
};
use url::Url;

use crate::logging::LogDestination;

/// Story id used for the manifest download itself.
const MANIFEST_ID: storyfeed_engine::StoryId = 0;

const USAGE: &str =
    "usage: storyfeed_app <manifest-url> [--mode serial|overlapped|batch] [--on-error halt|skip] [--log terminal|file|both]";

struct Options {
    manifest_url: String,
    mode: DeliveryMode,
    on_error: ErrorPolicy,
    log_destination: LogDestination,
}

fn main() -> Result<()> {
    let options = parse_args(std::env::args().skip(1))?;
    logging::initialize(options.log_destination);

    let runtime = tokio::runtime::Runtime::new().context("tokio runtime")?;
    runtime.block_on(run(options))
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options> {
    let mut manifest_url = None;
    let mut mode = DeliveryMode::Overlapped;
    let mut on_error = ErrorPolicy::Halt;
    let mut log_destination = LogDestination::Terminal;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mode" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --mode"))?;
                mode = value.parse().map_err(|err: String| anyhow!(err))?;
            }
            "--on-error" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --on-error"))?;
                on_error = match value.as_str() {
                    "halt" => ErrorPolicy::Halt,
                    "skip" => ErrorPolicy::SkipAndMark,
                    other => bail!("unknown error policy {other:?}"),
                };
            }
            "--log" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --log"))?;
                log_destination = match value.as_str() {
                    "terminal" => LogDestination::Terminal,
                    "file" => LogDestination::File,
                    "both" => LogDestination::Both,
                    other => bail!("unknown log destination {other:?}"),
                };
            }
            other if other.starts_with("--") => bail!("unknown flag {other:?}\n{USAGE}"),
            other => {
                if manifest_url.replace(other.to_string()).is_some() {
                    bail!("expected exactly one manifest url\n{USAGE}");
                }
            }
        }
    }

    Ok(Options {
        manifest_url: manifest_url.ok_or_else(|| anyhow!(USAGE))?,
        mode,
        on_error,
        log_destination,
    })
}

async fn run(options: Options) -> Result<()> {
    let manifest_url = Url::parse(&options.manifest_url)
        .with_context(|| format!("invalid manifest url {:?}", options.manifest_url))?;

    let fetcher = Arc::new(
        ReqwestFetcher::new(FetchSettings::default())
            .map_err(|err| anyhow!("http client setup failed: {err}"))?,
    );
    let (event_tx, event_rx) = mpsc::channel();
    let sink = Arc::new(ChannelProgressSink::new(event_tx));

    feed_info!("fetching manifest {manifest_url}");
    let manifest = fetcher
        .fetch(MANIFEST_ID, manifest_url.as_str(), sink.as_ref())
        .await
        .map_err(|err| anyhow!("manifest fetch failed: {err}"))?;
    let decoded = decode_story(&manifest.bytes, manifest.metadata.content_type.as_deref())
        .context("manifest decode failed")?;
    let stories = parse_manifest(&decoded.text, &manifest_url).context("manifest parse failed")?;
    feed_info!("manifest lists {} stories", stories.len());

    let mut state = RunState::new();
    for (index, url) in stories.iter().enumerate() {
        state.track(index as u64 + 1, url.clone());
    }

    let sequencer = Sequencer::new(
        fetcher,
        Arc::new(StdoutDisplay),
        sink,
        SequencerConfig {
            on_story_error: options.on_error,
        },
    );
    let outcome = sequencer.run(options.mode, stories).await;

    drain_events(&mut state, &event_rx);
    let summary = state.summary();
    feed_info!(
        "run finished: {} displayed, {} failed of {} ({} bytes fetched)",
        summary.displayed,
        summary.failed,
        summary.total,
        summary.bytes_fetched
    );

    outcome.map_err(|err| anyhow!("run aborted: {err}"))
}

fn drain_events(state: &mut RunState, rx: &mpsc::Receiver<FeedEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            FeedEvent::Progress(progress) => {
                if progress.story_id == MANIFEST_ID {
                    continue;
                }
                state.apply_progress(progress.story_id, map_stage(progress.stage), progress.bytes);
            }
            FeedEvent::StoryDone { story_id, result } => {
                let kind = match result {
                    Ok(_) => StoryResultKind::Displayed,
                    Err(err) => {
                        feed_warn!("story {story_id} failed: {err}");
                        StoryResultKind::Failed
                    }
                };
                state.apply_done(story_id, kind);
            }
        }
    }
}

fn map_stage(stage: storyfeed_engine::Stage) -> storyfeed_core::Stage {
    match stage {
        storyfeed_engine::Stage::Queued => storyfeed_core::Stage::Queued,
        storyfeed_engine::Stage::Fetching => storyfeed_core::Stage::Fetching,
        storyfeed_engine::Stage::Decoding => storyfeed_core::Stage::Decoding,
        storyfeed_engine::Stage::Displaying => storyfeed_core::Stage::Displaying,
        storyfeed_engine::Stage::Done => storyfeed_core::Stage::Done,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn parse_args_defaults_to_overlapped_halt_terminal() {
        let options = parse_args(args(&["https://example.com/stories.json"])).unwrap();
        assert_eq!(options.manifest_url, "https://example.com/stories.json");
        assert_eq!(options.mode, DeliveryMode::Overlapped);
        assert_eq!(options.on_error, ErrorPolicy::Halt);
    }

    #[test]
    fn parse_args_accepts_mode_and_policy() {
        let options = parse_args(args(&[
            "--mode",
            "serial",
            "https://example.com/stories.json",
            "--on-error",
            "skip",
        ]))
        .unwrap();
        assert_eq!(options.mode, DeliveryMode::Serial);
        assert_eq!(options.on_error, ErrorPolicy::SkipAndMark);
    }

    #[test]
    fn parse_args_rejects_unknown_flags_and_missing_url() {
        assert!(parse_args(args(&["--frobnicate"])).is_err());
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["a", "b"])).is_err());
        assert!(parse_args(args(&["--mode", "sideways", "a"])).is_err());
    }
}
