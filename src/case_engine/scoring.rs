//! Per-choice scoring and the one-shot finalization of a playthrough.
//!
//! Point values and optimality come from a [`ScoringKey`]; the engine never
//! invents them. A choice the key does not know about is worth nothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::case_engine::{
    error::{EngineError, ScoreError},
    models::{CaseScore, ScoredChoice},
};

/// Authored verdict for one `(node, choice)` edge.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceScore {
    pub optimal: bool,
    #[serde(default)]
    pub points: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Instructor-facing teaching note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teaching: Option<String>,
}

/// Source of per-choice scores, kept away from the student-facing manifest.
pub trait ScoringKey {
    fn score(&self, node_id: &str, choice_id: &str) -> Option<ChoiceScore>;
}

/// Scoring key stored as `{ nodeId: { choiceId: ChoiceScore } }`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoringTable {
    entries: BTreeMap<String, BTreeMap<String, ChoiceScore>>,
}

impl ScoringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, node_id: &str, choice_id: &str, score: ChoiceScore) {
        self.entries
            .entry(node_id.to_string())
            .or_default()
            .insert(choice_id.to_string(), score);
    }

    /// Builder form of [`insert`](Self::insert) for tests and demos.
    pub fn with(mut self, node_id: &str, choice_id: &str, optimal: bool, points: i32) -> Self {
        self.insert(node_id, choice_id, ChoiceScore { optimal, points, ..Default::default() });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScoringKey for ScoringTable {
    fn score(&self, node_id: &str, choice_id: &str) -> Option<ChoiceScore> {
        self.entries.get(node_id)?.get(choice_id).cloned()
    }
}

/// A key that scores nothing; every run finishes with zero points.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unscored;

impl ScoringKey for Unscored {
    fn score(&self, _node_id: &str, _choice_id: &str) -> Option<ChoiceScore> {
        None
    }
}

/// Mutable accumulator for one playthrough.
#[derive(Debug, Clone)]
pub struct Scorecard {
    case_id: String,
    total: i32,
    optimal: u32,
    choices: Vec<ScoredChoice>,
    finalized: bool,
}

impl Scorecard {
    pub fn new(case_id: &str) -> Self {
        Self {
            case_id: case_id.to_string(),
            total: 0,
            optimal: 0,
            choices: Vec::new(),
            finalized: false,
        }
    }

    /// Score the edge taken and return the recorded entry.
    pub fn on_choice<K: ScoringKey + ?Sized>(
        &mut self,
        key: &K,
        node_id: &str,
        choice_id: &str,
        fallback_rationale: Option<&str>,
    ) -> &ScoredChoice {
        let verdict = key.score(node_id, choice_id).unwrap_or_else(|| {
            tracing::debug!(node_id, choice_id, "no scoring entry; counting 0 points");
            ChoiceScore::default()
        });

        self.total = self.total.saturating_add(verdict.points);
        if verdict.optimal {
            self.optimal += 1;
        }
        self.choices.push(ScoredChoice {
            node_id: node_id.to_string(),
            choice_id: choice_id.to_string(),
            optimal: verdict.optimal,
            points: verdict.points,
            rationale: verdict.rationale.or_else(|| fallback_rationale.map(str::to_string)),
        });
        &self.choices[self.choices.len() - 1]
    }

    pub fn total(&self) -> i32 {
        self.total
    }

    pub fn optimal_count(&self) -> u32 {
        self.optimal
    }

    pub fn choices(&self) -> &[ScoredChoice] {
        &self.choices
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Freeze the run into a [`CaseScore`]. Allowed once, and only at a terminal node.
    pub fn finalize(&mut self, at_terminal: bool, xp_earned: u32) -> Result<CaseScore, ScoreError> {
        if self.finalized {
            return Err(ScoreError::AlreadyFinalized);
        }
        if !at_terminal {
            return Err(ScoreError::NotTerminal);
        }
        self.finalized = true;
        Ok(CaseScore {
            case_id: self.case_id.clone(),
            total_score: self.total,
            xp_earned,
            optimal_choices: self.optimal,
            choices: self.choices.clone(),
        })
    }
}
