//! End-to-end tests for the `case_engine_core` crate.
//!
//! Included from `lib.rs` under `#[cfg(test)]`.
//!
//! # Coverage
//!
//! | Group | What is tested |
//! |-------|----------------|
//! | Traversal | Random walks over valid graphs stay on defined nodes; instant timer loops never start |
//! | Terminal | n1 -> n2 example; finalize once, second call rejected |
//! | Replay | Same score twice is a no-op; worse score never replaces best |
//! | Corruption | Corrupt stored progress reads back empty without panicking |
//! | Timers | Teardown before the deadline cancels auto-advance |
//! | Collection | 1 of 3 characters caught reports 33% |
//! | Storage | A full run persists through `FileStore` and reloads |

use std::time::Duration;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use crate::case_engine::{
    complete_session,
    helpers::{choice, manifest, node, timed_node},
    AuthoredCase, CaseManifest, CaseNode, CaseSession, EngineConfig, EngineError, FileStore,
    ManifestIssue, MemoryStore, ProgressTracker, RecordOutcome, ScoreError, ScoringTable, Unscored,
    VirtualClock,
};

// ── helpers ──────────────────────────────────────────────────────────────────

fn config() -> EngineConfig {
    EngineConfig::default().with_seed(2026)
}

fn play(
    m: CaseManifest,
    key: ScoringTable,
    path: &[&str],
) -> CaseSession<ScoringTable, VirtualClock> {
    let mut session = CaseSession::start(m, key, VirtualClock::new(), config()).unwrap();
    for step in path {
        session.select_choice(step).unwrap();
    }
    session
}

/// start -> (history | discharge); history -> exam -> (ecg | wait) -> end.
fn chest_pain() -> (CaseManifest, ScoringTable) {
    let mut m = manifest(
        "chest-pain",
        "start",
        vec![
            node("start", &[("history", "exam"), ("discharge", "end")]),
            node("exam", &[("ecg", "end"), ("wait", "end")]),
            node("end", &[]),
        ],
    );
    m.character_id = Some("dr-lee".into());
    let key = ScoringTable::new()
        .with("start", "history", true, 2)
        .with("start", "discharge", false, -3)
        .with("exam", "ecg", true, 4)
        .with("exam", "wait", false, 0);
    (m, key)
}

// ── traversal ────────────────────────────────────────────────────────────────

/// Builds a valid graph of `n` nodes from per-node edge lists.
fn graph_from(edges: Vec<Vec<usize>>, timed: Vec<Option<(usize, u64)>>) -> CaseManifest {
    let n = edges.len();
    let nodes: Vec<CaseNode> = edges
        .into_iter()
        .zip(timed)
        .enumerate()
        .map(|(i, (targets, auto))| {
            let id = format!("n{i}");
            let mut built = match auto {
                Some((to, ms)) => timed_node(&id, &format!("n{}", to % n), ms),
                None => node(&id, &[]),
            };
            built.choices = targets
                .iter()
                .enumerate()
                .map(|(j, t)| choice(&format!("c{j}"), &format!("n{}", t % n)))
                .collect();
            built
        })
        .collect();
    manifest("random", "n0", nodes)
}

proptest! {
    #[test]
    fn walks_over_valid_graphs_never_leave_the_graph(
        edges in prop::collection::vec(prop::collection::vec(0usize..8, 0..3), 1..8),
        timed_seed in prop::collection::vec(prop::option::of((0usize..8, 0u64..500)), 8),
        picks in prop::collection::vec((0usize..3, 0u64..600), 0..25),
    ) {
        let timed = timed_seed.into_iter().take(edges.len()).collect();
        let m = graph_from(edges, timed);
        if let Err(e) = m.validate() {
            // Only an instant auto-advance loop can make these graphs invalid.
            prop_assert!(e
                .issues
                .iter()
                .all(|i| matches!(i, ManifestIssue::InstantAutoAdvanceLoop { .. })),
                "unexpected validation issue");
            prop_assert!(CaseSession::start(m, Unscored, VirtualClock::new(), config()).is_err());
            return Ok(());
        }

        let mut s = CaseSession::start(m.clone(), Unscored, VirtualClock::new(), config()).unwrap();
        for (pick, wait) in picks {
            s.advance_clock(Duration::from_millis(wait));
            let choices = s.view().available_choices.to_vec();
            if !choices.is_empty() {
                let id = choices[pick % choices.len()].id.clone();
                s.select_choice(&id).unwrap();
            }
            prop_assert!(m.nodes.contains_key(s.current_node_id()));
            prop_assert_eq!(s.view().node.id.as_str(), s.current_node_id());
        }
        prop_assert!(s.visited().iter().all(|id| m.nodes.contains_key(id)));
    }
}

// ── terminal detection ───────────────────────────────────────────────────────

#[test]
fn two_node_example_finalizes_exactly_once() {
    let m = manifest("example", "n1", vec![node("n1", &[("c1", "n2")]), node("n2", &[])]);
    assert!(m.nodes["n2"].is_terminal());

    let mut s = play(m, ScoringTable::new(), &["c1"]);
    assert_eq!(s.current_node_id(), "n2");
    let score = s.finalize().unwrap();
    assert_eq!(score.choices.len(), 1);
    assert!(matches!(
        s.finalize(),
        Err(EngineError::Score(ScoreError::AlreadyFinalized))
    ));
}

// ── replay policy ────────────────────────────────────────────────────────────

#[test]
fn replaying_a_case_keeps_only_the_best_run() {
    let (m, key) = chest_pain();
    let mut tracker = ProgressTracker::load(MemoryStore::new(), &config());
    let day = |d| Utc.with_ymd_and_hms(2026, 6, d, 9, 0, 0).unwrap();

    let mut good = play(m.clone(), key.clone(), &["history", "ecg"]);
    let first = complete_session(&mut good, &mut tracker, day(1)).unwrap();
    assert_eq!(first.score.total_score, 6);
    assert_eq!(first.case_outcome, RecordOutcome::First { xp_delta: 20 });
    let xp_after_best = tracker.total_xp();

    let mut poor = play(m.clone(), key.clone(), &["discharge"]);
    let second = complete_session(&mut poor, &mut tracker, day(2)).unwrap();
    assert_eq!(second.case_outcome, RecordOutcome::Kept);
    assert_eq!(second.character.as_ref().map(|(_, o)| *o), Some(RecordOutcome::Kept));
    assert_eq!(tracker.total_xp(), xp_after_best);
    assert_eq!(tracker.best_result("chest-pain").unwrap().score.total_score, 6);

    let mut same = play(m, key, &["history", "ecg"]);
    let third = complete_session(&mut same, &mut tracker, day(3)).unwrap();
    assert_eq!(third.case_outcome.xp_delta(), 0);
    assert_eq!(tracker.best_result("chest-pain").unwrap().completed_at, day(1));
    assert_eq!(tracker.collection().characters["dr-lee"].caught_at, day(1));
}

// ── corruption ───────────────────────────────────────────────────────────────

#[test]
fn corrupt_progress_blob_reads_back_empty() {
    let mut tracker = ProgressTracker::load(MemoryStore::new(), &config());
    let (m, key) = chest_pain();
    let mut s = play(m, key, &["history", "ecg"]);
    complete_session(&mut s, &mut tracker, Utc::now()).unwrap();

    let raw = tracker.persistence().store().raw("case-progress").unwrap().to_string();
    let mut value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    value["completedCases"] = serde_json::Value::String("corrupted".into());
    assert_eq!(value["totalXp"], 20);
    tracker
        .persistence_mut()
        .store_mut()
        .insert_raw("case-progress", value.to_string());

    tracker.reload();
    assert!(tracker.progress().completed_cases.is_empty());
    assert_eq!(tracker.total_xp(), 0);
    // The collection blob lives under its own key and is unaffected.
    assert!(tracker.is_caught("dr-lee"));

    // A fresh run counts only its own XP, not the lost cases'.
    let (m, key) = chest_pain();
    let mut again = play(m, key, &["history", "ecg"]);
    complete_session(&mut again, &mut tracker, Utc::now()).unwrap();
    assert_eq!(tracker.total_xp(), 20);
    assert_eq!(tracker.progress().completed_cases.len(), 1);
}

// ── timers ───────────────────────────────────────────────────────────────────

#[test]
fn teardown_before_deadline_prevents_auto_advance() {
    let m = manifest(
        "intro",
        "A",
        vec![timed_node("A", "B", 5000), node("B", &[])],
    );
    let mut s = CaseSession::start(m, Unscored, VirtualClock::new(), config()).unwrap();
    s.advance_clock(Duration::from_millis(2000));
    s.teardown();
    assert!(s.advance_clock(Duration::from_millis(3000)).is_empty());
    assert_eq!(s.current_node_id(), "A");
}

// ── collection ───────────────────────────────────────────────────────────────

#[test]
fn one_of_three_characters_is_33_percent() {
    let (mut m, key) = chest_pain();
    m.character_id = Some("nurse-ana".into());
    let mut tracker = ProgressTracker::load(MemoryStore::new(), &config());
    let mut s = play(m, key, &["history", "ecg"]);
    complete_session(&mut s, &mut tracker, Utc::now()).unwrap();

    let stats = tracker.collection_stats(["nurse-ana", "dr-lee", "paramedic-sam"]);
    assert_eq!(stats.caught, 1);
    assert_eq!(stats.total, 3);
    assert_eq!(stats.completion_percent, 33);
}

// ── storage ──────────────────────────────────────────────────────────────────

#[test]
fn authored_case_runs_end_to_end_through_file_store() {
    let authored = AuthoredCase::from_json(
        r#"{
            "id": "asthma",
            "languageLevel": "B1",
            "startNodeId": "arrive",
            "characterId": "nurse-ana",
            "nodes": {
                "arrive": {
                    "id": "arrive",
                    "asset": { "type": "remote", "src": "arrive.mp4" },
                    "autoAdvance": { "next": "decide", "afterMs": 3000 }
                },
                "decide": {
                    "id": "decide",
                    "choices": [
                        { "id": "salbutamol", "label": "Give salbutamol", "next": "done",
                          "optimal": true, "points": 5 },
                        { "id": "xray", "label": "Chest X-ray first", "next": "done", "points": 1 }
                    ]
                },
                "done": { "id": "done", "asset": { "type": "static", "src": "done.png" } }
            }
        }"#,
    )
    .unwrap();
    let (m, key) = authored.split().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let mut tracker = ProgressTracker::load(store, &config());

    let mut s = CaseSession::start(m, key, VirtualClock::new(), config()).unwrap();
    assert!(s.select_choice("salbutamol").is_err());
    s.advance_clock(Duration::from_millis(3000));
    s.select_choice("salbutamol").unwrap();
    let done = complete_session(&mut s, &mut tracker, Utc::now()).unwrap();
    assert_eq!(done.score.total_score, 5);
    assert_eq!(done.score.xp_earned, 15);
    assert_eq!(s.segment_trail().len(), 3);

    let reopened = ProgressTracker::load(FileStore::open(dir.path()).unwrap(), &config());
    assert_eq!(reopened.total_xp(), 15);
    assert!(reopened.is_caught("nurse-ana"));
}
