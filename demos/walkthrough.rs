//! Play one clinical case end to end.
//!
//! Run with: `cargo run --example walkthrough`
//! Set `RUST_LOG=case_engine_core=debug` to see every transition.
//!
//! This example shows how `case_engine_core` fits together:
//!
//! 1. **Authoring split**: one instructor document is split into the
//!    student manifest and the hidden scoring key.
//! 2. **Traversal**: an intro clip auto-advances on a virtual clock, then
//!    the learner answers two prompts.
//! 3. **Progress**: the run is recorded twice, once well and once poorly,
//!    showing that only the best attempt is kept.

use std::time::Duration;

use case_engine_core::{
    complete_session, AuthoredCase, CaseSession, EngineConfig, MemoryStore, ProgressTracker,
    VirtualClock,
};
use tracing_subscriber::EnvFilter;

const CASE: &str = r#"{
    "id": "chest-pain",
    "title": "Crushing chest pain",
    "chiefComplaint": "Chest pressure radiating to the left arm",
    "summary": "A 58-year-old man arrives at the emergency department.",
    "languageLevel": "B2",
    "skills": ["history-taking", "ecg"],
    "startNodeId": "arrival",
    "characterId": "dr-lee",
    "nodes": {
        "arrival": {
            "id": "arrival",
            "title": "Arrival",
            "asset": { "type": "remote", "src": "https://media.example/arrival.mp4" },
            "autoAdvance": { "next": "first-step", "afterMs": 4000 }
        },
        "first-step": {
            "id": "first-step",
            "prompt": "What do you do first?",
            "asset": { "type": "placeholder", "label": "Triage bay" },
            "choices": [
                { "id": "ecg", "label": "12-lead ECG within 10 minutes", "next": "ecg-result",
                  "optimal": true, "points": 4,
                  "rationale": "An early ECG identifies STEMI." },
                { "id": "xray", "label": "Chest X-ray", "next": "ecg-result", "points": 0 }
            ]
        },
        "ecg-result": {
            "id": "ecg-result",
            "prompt": "ST elevation in II, III, aVF. Next?",
            "asset": { "type": "static", "src": "/img/inferior-stemi.png" },
            "choices": [
                { "id": "cath", "label": "Activate cath lab", "next": "outcome",
                  "optimal": true, "points": 5 },
                { "id": "observe", "label": "Observe and repeat troponin", "next": "outcome",
                  "points": -3 }
            ]
        },
        "outcome": { "id": "outcome", "title": "Outcome" }
    }
}"#;

fn run(
    tracker: &mut ProgressTracker<MemoryStore>,
    config: &EngineConfig,
    path: &[&str],
) -> Result<(), Box<dyn std::error::Error>> {
    let (manifest, key) = AuthoredCase::from_json(CASE)?.split()?;
    let mut session = CaseSession::start(manifest, key, VirtualClock::new(), config.clone())?;

    let view = session.view();
    println!("━━━ {} [{}]", session.manifest().title, view.session_id);
    println!("  Scene: {}  (auto-advance in {:?})", view.node.id, view.pending_auto_advance);

    for t in session.advance_clock(Duration::from_secs(4)) {
        println!("  ⏱  {} → {}", t.from, t.to);
    }

    for step in path {
        let prompt = session.view().node.prompt.clone().unwrap_or_default();
        println!("  Q: {prompt}");
        for c in session.view().available_choices {
            let mark = if c.id == *step { ">" } else { " " };
            println!("   [{mark}] {}", c.label);
        }
        session.select_choice(step)?;
        if let Some(last) = session.view().last_scored {
            println!("      {:+} pts  {}", last.points, last.rationale.as_deref().unwrap_or(""));
        }
    }

    let done = complete_session(&mut session, tracker, chrono::Utc::now())?;
    println!(
        "  Score {}  XP {}  case: {:?}  character: {:?}",
        done.score.total_score, done.score.xp_earned, done.case_outcome, done.character
    );
    let trail: Vec<_> = session.segment_trail().iter().filter_map(|a| a.src()).collect();
    println!("  Segments watched: {}", trail.join(" → "));
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = EngineConfig::default();
    let mut tracker = ProgressTracker::load(MemoryStore::new(), &config);

    run(&mut tracker, &config, &["ecg", "cath"])?;
    run(&mut tracker, &config, &["xray", "observe"])?;

    let best = tracker.best_result("chest-pain").map(|r| r.score.total_score);
    let stats = tracker.collection_stats(["dr-lee", "nurse-ana", "paramedic-sam"]);
    println!("━━━ Best score kept: {:?}  Total XP: {}", best, tracker.total_xp());
    println!(
        "━━━ Characters: {}/{} ({}%)",
        stats.caught, stats.total, stats.completion_percent
    );
    Ok(())
}
