//! # case_engine_core
//!
//! A headless engine for interactive clinical cases.
//!
//! A case is an authored graph of scenes (nodes). Each scene shows some
//! media and offers the learner a few choices; some scenes move on by
//! themselves after a delay. The engine walks that graph, scores each
//! choice against a hidden scoring key, and keeps the learner's best result
//! per case in local storage.
//!
//! ## How it works
//!
//! 1. Load a [`CaseManifest`] (or split an [`AuthoredCase`] into a manifest
//!    and a [`ScoringTable`]). Dangling references are rejected here.
//! 2. [`CaseSession::start`] enters the start node. Call
//!    [`CaseSession::view`] to render, [`CaseSession::select_choice`] on
//!    input, and [`CaseSession::fire_timer`] when a scheduled auto-advance
//!    elapses.
//! 3. At a terminal node, [`complete_session`] finalizes the score and hands
//!    it to a [`ProgressTracker`], which applies the best-score-wins policy
//!    and writes one blob per collection.
//!
//! ## Key properties
//!
//! - **Never fatal**: bad content fails at load, bad input is rejected
//!   without changing state, and storage failures degrade to "not saved".
//! - **Headless timers**: auto-advance goes through the [`Scheduler`] trait;
//!   [`VirtualClock`] drives it in tests and offline hosts.
//! - **Replay-safe progress**: recording the same or a worse result twice
//!   leaves stored progress and XP untouched.
//!
//! ## Quick start
//!
//! ```rust
//! use case_engine_core::{
//!     helpers::{manifest, node},
//!     CaseSession, EngineConfig, MemoryStore, ProgressTracker, ScoringTable, VirtualClock,
//!     complete_session,
//! };
//!
//! let case = manifest("demo", "n1", vec![node("n1", &[("c1", "n2")]), node("n2", &[])]);
//! let key = ScoringTable::new().with("n1", "c1", true, 3);
//! let config = EngineConfig::default();
//!
//! let mut session = CaseSession::start(case, key, VirtualClock::new(), config.clone()).unwrap();
//! session.select_choice("c1").unwrap();
//! assert!(session.view().is_terminal);
//!
//! let mut tracker = ProgressTracker::load(MemoryStore::new(), &config);
//! let done = complete_session(&mut session, &mut tracker, chrono::Utc::now()).unwrap();
//! assert_eq!(done.score.total_score, 3);
//! assert_eq!(tracker.total_xp(), 15);
//! ```

pub mod case_engine;

// Convenience re-exports so callers can use `case_engine_core::CaseSession`
// directly without reaching into `case_engine::`.
pub use case_engine::{
    apply_case_result, apply_catch, complete_session, helpers, AuthoredCase, CaseAsset,
    CaseChoice, CaseManifest, CaseNode, CaseProgress, CaseResult, CaseScore, CaseSession,
    CaseView, CaughtCharacter, CharacterCollection, ChoiceScore, CollectionStats, Completion,
    EngineConfig, EngineError, FileStore, KeyValueStore, LanguageLevel, ManifestError,
    ManifestIssue, MemoryStore, Persistence, ProgressTracker, RecordOutcome, ScoreError,
    Scheduler, ScoringKey, ScoringTable, StoreError, TimerId, Transition, TransitionCause,
    Unscored, VirtualClock,
};

#[cfg(test)]
mod tests;
