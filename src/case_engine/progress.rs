//! Completed-case and character-collection tracking.
//!
//! ## Replay policy
//!
//! Each case (and each character) keeps only its best attempt. A new
//! result replaces the stored one only when its `total_score` is strictly
//! greater. The aggregate `total_xp` moves by the explicit difference
//! between the new and the replaced `xp_earned`; it is never recomputed
//! from scratch.
//!
//! The replacement logic lives in pure functions ([`apply_case_result`],
//! [`apply_catch`]) so it can be tested without storage. [`ProgressTracker`]
//! wraps them with an explicit `load` / `save` lifecycle, and every update
//! is written back as one blob so cases and XP cannot drift apart.

use chrono::{DateTime, Utc};

use crate::case_engine::{
    config::EngineConfig,
    helpers::percent,
    models::*,
    persistence::{KeyValueStore, Persistence},
};

/// What an update did to the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// No previous entry existed.
    First { xp_delta: i64 },
    /// The new attempt beat the stored one.
    Improved { xp_delta: i64 },
    /// The stored attempt was as good or better; nothing changed.
    Kept,
}

impl RecordOutcome {
    pub fn xp_delta(self) -> i64 {
        match self {
            RecordOutcome::First { xp_delta } | RecordOutcome::Improved { xp_delta } => xp_delta,
            RecordOutcome::Kept => 0,
        }
    }

    pub fn replaced(self) -> bool {
        !matches!(self, RecordOutcome::Kept)
    }
}

/// Best-score-wins update of the completed-case blob.
pub fn apply_case_result(
    prev: &CaseProgress,
    case_id: &str,
    result: CaseResult,
) -> (CaseProgress, RecordOutcome) {
    let existing = prev.completed_cases.get(case_id);
    if let Some(old) = existing {
        if result.score.total_score <= old.score.total_score {
            return (prev.clone(), RecordOutcome::Kept);
        }
    }

    let old_xp = existing.map_or(0, |old| i64::from(old.score.xp_earned));
    let xp_delta = i64::from(result.score.xp_earned) - old_xp;
    let outcome = if existing.is_some() {
        RecordOutcome::Improved { xp_delta }
    } else {
        RecordOutcome::First { xp_delta }
    };

    let mut next = prev.clone();
    next.completed_cases.insert(case_id.to_string(), result);
    next.total_xp += xp_delta;
    (next, outcome)
}

/// Best-score-wins update of the collection. `caught_at` of an existing
/// entry survives any improvement.
pub fn apply_catch(
    prev: &CharacterCollection,
    character_id: &str,
    catch: CaughtCharacter,
) -> (CharacterCollection, RecordOutcome) {
    let existing = prev.characters.get(character_id);
    if let Some(old) = existing {
        if catch.case_score <= old.case_score {
            return (prev.clone(), RecordOutcome::Kept);
        }
    }

    let old_xp = existing.map_or(0, |old| i64::from(old.xp_earned));
    let xp_delta = i64::from(catch.xp_earned) - old_xp;
    let entry = CaughtCharacter {
        caught_at: existing.map_or(catch.caught_at, |old| old.caught_at),
        ..catch
    };
    let outcome = if existing.is_some() {
        RecordOutcome::Improved { xp_delta }
    } else {
        RecordOutcome::First { xp_delta }
    };

    let mut next = prev.clone();
    next.characters.insert(character_id.to_string(), entry);
    next.total_xp += xp_delta;
    (next, outcome)
}

/// Owns the two persisted blobs and the store they live in.
#[derive(Debug)]
pub struct ProgressTracker<S> {
    persistence: Persistence<S>,
    progress_key: String,
    collection_key: String,
    progress: CaseProgress,
    collection: CharacterCollection,
}

impl<S: KeyValueStore> ProgressTracker<S> {
    /// Create a tracker and hydrate it from `store`.
    pub fn load(store: S, config: &EngineConfig) -> Self {
        let mut tracker = Self {
            persistence: Persistence::new(store),
            progress_key: config.progress_key.clone(),
            collection_key: config.collection_key.clone(),
            progress: CaseProgress::default(),
            collection: CharacterCollection::default(),
        };
        tracker.reload();
        tracker
    }

    /// Re-read both blobs, discarding in-memory state.
    pub fn reload(&mut self) {
        self.progress = self.persistence.read(&self.progress_key);
        self.collection = self.persistence.read(&self.collection_key);
        tracing::debug!(
            cases = self.progress.completed_cases.len(),
            characters = self.collection.characters.len(),
            "progress loaded"
        );
    }

    /// Write both blobs. Returns whether both writes landed.
    pub fn save(&mut self) -> bool {
        let cases = self.persistence.write(&self.progress_key, &self.progress);
        let characters = self.persistence.write(&self.collection_key, &self.collection);
        cases && characters
    }

    pub fn record_completion(
        &mut self,
        case_id: &str,
        score: CaseScore,
        completed_at: DateTime<Utc>,
    ) -> RecordOutcome {
        let (next, outcome) =
            apply_case_result(&self.progress, case_id, CaseResult { score, completed_at });
        if outcome.replaced() {
            self.progress = next;
            self.persistence.write(&self.progress_key, &self.progress);
        }
        tracing::info!(case_id, ?outcome, total_xp = self.progress.total_xp, "case completion recorded");
        outcome
    }

    pub fn catch_character(
        &mut self,
        character_id: &str,
        score: &CaseScore,
        caught_at: DateTime<Utc>,
    ) -> RecordOutcome {
        let catch = CaughtCharacter {
            caught_at,
            case_score: score.total_score,
            xp_earned: score.xp_earned,
        };
        let (next, outcome) = apply_catch(&self.collection, character_id, catch);
        if outcome.replaced() {
            self.collection = next;
            self.persistence.write(&self.collection_key, &self.collection);
        }
        tracing::info!(character_id, ?outcome, "character catch recorded");
        outcome
    }

    pub fn progress(&self) -> &CaseProgress {
        &self.progress
    }

    pub fn collection(&self) -> &CharacterCollection {
        &self.collection
    }

    pub fn total_xp(&self) -> i64 {
        self.progress.total_xp
    }

    pub fn best_result(&self, case_id: &str) -> Option<&CaseResult> {
        self.progress.completed_cases.get(case_id)
    }

    pub fn is_completed(&self, case_id: &str) -> bool {
        self.progress.completed_cases.contains_key(case_id)
    }

    pub fn is_caught(&self, character_id: &str) -> bool {
        self.collection.characters.contains_key(character_id)
    }

    /// Completion over a known roster. Caught ids outside the roster are ignored.
    pub fn collection_stats<I, T>(&self, known: I) -> CollectionStats
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut total = 0;
        let mut caught = 0;
        for id in known {
            total += 1;
            if self.is_caught(id.as_ref()) {
                caught += 1;
            }
        }
        CollectionStats { total, caught, completion_percent: percent(caught, total) }
    }

    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    pub fn persistence_mut(&mut self) -> &mut Persistence<S> {
        &mut self.persistence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case_engine::persistence::MemoryStore;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, day, 12, 0, 0).unwrap()
    }

    fn score(total: i32, xp: u32) -> CaseScore {
        CaseScore { case_id: "c".into(), total_score: total, xp_earned: xp, ..Default::default() }
    }

    fn tracker() -> ProgressTracker<MemoryStore> {
        ProgressTracker::load(MemoryStore::new(), &EngineConfig::default())
    }

    #[test]
    fn recording_same_score_twice_is_idempotent() {
        let mut t = tracker();
        assert_eq!(t.record_completion("c", score(5, 30), at(1)), RecordOutcome::First { xp_delta: 30 });
        let before = t.progress().clone();
        assert_eq!(t.record_completion("c", score(5, 30), at(2)), RecordOutcome::Kept);
        assert_eq!(t.progress(), &before);
        assert_eq!(t.total_xp(), 30);
    }

    #[test]
    fn lower_score_never_replaces_best() {
        let mut t = tracker();
        t.record_completion("c", score(8, 40), at(1));
        t.record_completion("c", score(3, 90), at(2));
        let best = t.best_result("c").unwrap();
        assert_eq!(best.score.total_score, 8);
        assert_eq!(best.completed_at, at(1));
        assert_eq!(t.total_xp(), 40);
    }

    #[test]
    fn improvement_applies_xp_difference() {
        let mut t = tracker();
        t.record_completion("a", score(2, 15), at(1));
        t.record_completion("b", score(1, 10), at(1));
        let outcome = t.record_completion("a", score(6, 35), at(3));
        assert_eq!(outcome, RecordOutcome::Improved { xp_delta: 20 });
        assert_eq!(t.total_xp(), 45);
    }

    #[test]
    fn delta_is_computed_even_when_negative() {
        let (next, outcome) = apply_case_result(
            &CaseProgress::default(),
            "c",
            CaseResult { score: score(1, 50), completed_at: at(1) },
        );
        let (next, outcome2) =
            apply_case_result(&next, "c", CaseResult { score: score(2, 20), completed_at: at(2) });
        assert_eq!(outcome, RecordOutcome::First { xp_delta: 50 });
        assert_eq!(outcome2, RecordOutcome::Improved { xp_delta: -30 });
        assert_eq!(next.total_xp, 20);
    }

    #[test]
    fn recorded_progress_survives_reload() {
        let mut t = tracker();
        t.record_completion("c", score(5, 30), at(1));
        let store = t.persistence.into_inner();
        let reloaded = ProgressTracker::load(store, &EngineConfig::default());
        assert_eq!(reloaded.total_xp(), 30);
        assert!(reloaded.is_completed("c"));
    }

    #[test]
    fn progress_is_one_blob_under_one_key() {
        let mut t = tracker();
        t.record_completion("c", score(5, 30), at(1));
        let raw = t.persistence().store().raw("case-progress").unwrap();
        let value: serde_json::Value = serde_json::from_str(raw).unwrap();
        assert_eq!(value["totalXp"], 30);
        assert_eq!(value["completedCases"]["c"]["score"]["totalScore"], 5);
    }

    #[test]
    fn corrupt_stored_blob_loads_as_empty() {
        let mut store = MemoryStore::new();
        store.insert_raw("case-progress", r#"{"completedCases":"nope","totalXp":30}"#);
        let mut t = ProgressTracker::load(store, &EngineConfig::default());
        assert_eq!(t.progress(), &CaseProgress::default());

        t.record_completion("c", score(5, 20), at(1));
        assert_eq!(t.total_xp(), 20);
    }

    #[test]
    fn unavailable_storage_keeps_in_memory_progress() {
        let mut store = MemoryStore::new();
        store.set_unavailable(true);
        let mut t = ProgressTracker::load(store, &EngineConfig::default());
        t.record_completion("c", score(5, 30), at(1));
        assert_eq!(t.total_xp(), 30);
        assert!(!t.save());
    }

    #[test]
    fn catch_keeps_first_capture_time() {
        let mut t = tracker();
        t.catch_character("dr-lee", &score(4, 20), at(1));
        let outcome = t.catch_character("dr-lee", &score(9, 45), at(9));
        assert_eq!(outcome, RecordOutcome::Improved { xp_delta: 25 });
        let lee = &t.collection().characters["dr-lee"];
        assert_eq!(lee.caught_at, at(1));
        assert_eq!(lee.case_score, 9);
        assert_eq!(t.collection().total_xp, 45);
    }

    #[test]
    fn worse_catch_is_ignored() {
        let mut t = tracker();
        t.catch_character("dr-lee", &score(4, 20), at(1));
        assert_eq!(t.catch_character("dr-lee", &score(4, 99), at(2)), RecordOutcome::Kept);
        assert_eq!(t.collection().characters["dr-lee"].xp_earned, 20);
    }

    #[test]
    fn collection_stats_round_to_whole_percent() {
        let mut t = tracker();
        t.catch_character("a", &score(1, 1), at(1));
        t.catch_character("stranger", &score(1, 1), at(1));
        let stats = t.collection_stats(["a", "b", "c"]);
        assert_eq!(stats, CollectionStats { total: 3, caught: 1, completion_percent: 33 });

        t.catch_character("b", &score(1, 1), at(1));
        assert_eq!(t.collection_stats(["a", "b", "c"]).completion_percent, 67);
        assert_eq!(t.collection_stats(Vec::<String>::new()).completion_percent, 0);
    }

    proptest! {
        #[test]
        fn total_xp_always_equals_sum_of_kept_results(
            attempts in prop::collection::vec((0usize..4, -20i32..20, 0u32..200), 0..40)
        ) {
            let mut progress = CaseProgress::default();
            for (case, total, xp) in attempts {
                let id = format!("case-{case}");
                let result = CaseResult { score: score(total, xp), completed_at: at(1) };
                progress = apply_case_result(&progress, &id, result).0;
            }
            let sum: i64 = progress
                .completed_cases
                .values()
                .map(|r| i64::from(r.score.xp_earned))
                .sum();
            prop_assert_eq!(progress.total_xp, sum);
        }

        #[test]
        fn stored_best_never_decreases(
            totals in prop::collection::vec(-50i32..50, 1..30)
        ) {
            let mut progress = CaseProgress::default();
            let mut best = i32::MIN;
            for total in totals {
                let result = CaseResult { score: score(total, 1), completed_at: at(1) };
                progress = apply_case_result(&progress, "c", result).0;
                best = best.max(total);
                prop_assert_eq!(progress.completed_cases["c"].score.total_score, best);
            }
        }
    }
}
