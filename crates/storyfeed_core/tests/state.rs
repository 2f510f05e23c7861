use storyfeed_core::{RunState, RunSummary, Stage, StoryResultKind};

#[test]
fn tracked_stories_iterate_in_id_order() {
    let mut state = RunState::new();
    state.track(2, "https://example.com/b");
    state.track(1, "https://example.com/a");
    state.track(3, "https://example.com/c");

    let ids: Vec<_> = state.records().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn progress_updates_stage_and_bytes() {
    let mut state = RunState::new();
    state.track(1, "https://example.com/a");

    state.apply_progress(1, Stage::Fetching, Some(512));
    let record = state.records().next().unwrap().1.clone();
    assert_eq!(record.stage, Stage::Fetching);
    assert_eq!(record.bytes, Some(512));

    // A later stage without a byte count keeps the last known count.
    state.apply_progress(1, Stage::Decoding, None);
    let record = state.records().next().unwrap().1.clone();
    assert_eq!(record.stage, Stage::Decoding);
    assert_eq!(record.bytes, Some(512));
}

#[test]
fn progress_for_untracked_story_is_ignored() {
    let mut state = RunState::new();
    state.apply_progress(9, Stage::Fetching, Some(100));
    state.apply_done(9, StoryResultKind::Displayed);
    assert_eq!(state.summary(), RunSummary::default());
}

#[test]
fn summary_counts_outcomes_and_bytes() {
    let mut state = RunState::new();
    state.track(1, "https://example.com/a");
    state.track(2, "https://example.com/b");
    state.track(3, "https://example.com/c");

    state.apply_progress(1, Stage::Fetching, Some(100));
    state.apply_done(1, StoryResultKind::Displayed);
    state.apply_progress(2, Stage::Fetching, Some(250));
    state.apply_done(2, StoryResultKind::Failed);

    let summary = state.summary();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.displayed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.bytes_fetched, 350);

    let done = state
        .records()
        .map(|(_, record)| record.outcome)
        .collect::<Vec<_>>();
    assert_eq!(
        done,
        vec![
            Some(StoryResultKind::Displayed),
            Some(StoryResultKind::Failed),
            None
        ]
    );
}
