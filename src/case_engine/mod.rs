//! Core case engine: traversal, scoring, persistence and progress.
//!
//! ## Module overview
//!
//! | Module        | Purpose |
//! |---------------|---------|
//! | `models`      | Shared types: manifest, nodes, choices, scores, progress records |
//! | `manifest`    | Load-time referential-integrity checks |
//! | `authoring`   | Split instructor documents into student manifest + scoring key |
//! | `scoring`     | `ScoringKey` trait, `ScoringTable`, per-run `Scorecard` |
//! | `timer`       | Cancelable `Scheduler` abstraction and `VirtualClock` |
//! | `session`     | `CaseSession` state machine and the completion helper |
//! | `persistence` | Fallible key-value stores and the infallible `Persistence` wrapper |
//! | `sanitize`    | Per-field validation of stored blobs |
//! | `progress`    | Best-score-wins tracking of cases and characters |
//! | `config`      | `EngineConfig` with defaults for keys and XP |
//! | `helpers`     | Builders for cases in code, id generation, percent rounding |
//! | `error`       | Error types |

pub mod authoring;
pub mod config;
pub mod error;
pub mod helpers;
pub mod manifest;
pub mod models;
pub mod persistence;
pub mod progress;
pub mod sanitize;
pub mod scoring;
pub mod session;
pub mod timer;

// Re-export the public API surface so callers can use
// `case_engine::CaseSession` without reaching into sub-modules.
pub use authoring::{AuthoredCase, AuthoredChoice, AuthoredNode};
pub use config::EngineConfig;
pub use error::{EngineError, ManifestError, ManifestIssue, Result, ScoreError, StoreError};
pub use models::{
    AutoAdvanceRule, CaseAsset, CaseChoice, CaseManifest, CaseNode, CaseProgress, CaseResult,
    CaseScore, CaughtCharacter, CharacterCollection, CollectionStats, LanguageLevel, ScoredChoice,
};
pub use persistence::{FileStore, KeyValueStore, MemoryStore, Persistence};
pub use progress::{apply_case_result, apply_catch, ProgressTracker, RecordOutcome};
pub use sanitize::Sanitize;
pub use scoring::{ChoiceScore, Scorecard, ScoringKey, ScoringTable, Unscored};
pub use session::{complete_session, CaseSession, CaseView, Completion, Transition, TransitionCause};
pub use timer::{Scheduler, TimerId, VirtualClock};
