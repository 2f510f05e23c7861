use std::collections::BTreeMap;

pub type StoryId = u64;

/// Lifecycle stages as the run tracker sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Queued,
    Fetching,
    Decoding,
    Displaying,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryResultKind {
    Displayed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRecord {
    pub url: String,
    pub stage: Stage,
    pub bytes: Option<u64>,
    pub outcome: Option<StoryResultKind>,
}

/// Pure bookkeeping for one run.
///
/// Keyed by story id so iteration order is manifest order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunState {
    stories: BTreeMap<StoryId, StoryRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub total: usize,
    pub displayed: usize,
    pub failed: usize,
    pub bytes_fetched: u64,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a story before the run starts.
    pub fn track(&mut self, story_id: StoryId, url: impl Into<String>) {
        self.stories.insert(
            story_id,
            StoryRecord {
                url: url.into(),
                stage: Stage::Queued,
                bytes: None,
                outcome: None,
            },
        );
    }

    /// Progress for an untracked story is dropped.
    pub fn apply_progress(&mut self, story_id: StoryId, stage: Stage, bytes: Option<u64>) {
        if let Some(record) = self.stories.get_mut(&story_id) {
            record.stage = stage;
            if bytes.is_some() {
                record.bytes = bytes;
            }
        }
    }

    pub fn apply_done(&mut self, story_id: StoryId, result: StoryResultKind) {
        if let Some(record) = self.stories.get_mut(&story_id) {
            record.stage = Stage::Done;
            record.outcome = Some(result);
        }
    }

    pub fn records(&self) -> impl Iterator<Item = (&StoryId, &StoryRecord)> {
        self.stories.iter()
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total: self.stories.len(),
            ..RunSummary::default()
        };
        for record in self.stories.values() {
            match record.outcome {
                Some(StoryResultKind::Displayed) => summary.displayed += 1,
                Some(StoryResultKind::Failed) => summary.failed += 1,
                None => {}
            }
            summary.bytes_fetched += record.bytes.unwrap_or(0);
        }
        summary
    }
}
