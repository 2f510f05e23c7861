//! Storyfeed core: pure manifest parsing and run bookkeeping.
mod manifest;
mod state;

pub use manifest::{parse_manifest, ManifestError};
pub use state::{RunState, RunSummary, Stage, StoryId, StoryRecord, StoryResultKind};
