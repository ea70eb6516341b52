//! Field-by-field validation of stored blobs.
//!
//! Stored JSON may be corrupt or written by an older build. Each persisted
//! shape is rebuilt here from a loose `serde_json::Value`: a wrong-typed or
//! missing field takes its own default and a malformed map entry is dropped
//! on its own. A non-object root, or a record map that is not an object,
//! resets the whole blob.
//!
//! A blob's `totalXp` must equal the sum of its kept entries' `xpEarned`.
//! When it does not (entries were dropped, or the total itself is bad) the
//! total is rebuilt from the entries that survived.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::case_engine::models::*;

pub trait Sanitize: Default {
    fn sanitize(value: &Value) -> Self;
}

fn str_field(obj: &Map<String, Value>, name: &str) -> String {
    obj.get(name).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn opt_str_field(obj: &Map<String, Value>, name: &str) -> Option<String> {
    obj.get(name).and_then(Value::as_str).map(str::to_string)
}

fn bool_field(obj: &Map<String, Value>, name: &str) -> bool {
    obj.get(name).and_then(Value::as_bool).unwrap_or(false)
}

fn i32_field(obj: &Map<String, Value>, name: &str) -> i32 {
    obj.get(name)
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
        .unwrap_or(0)
}

fn u32_field(obj: &Map<String, Value>, name: &str) -> u32 {
    obj.get(name)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn time_field(obj: &Map<String, Value>, name: &str) -> DateTime<Utc> {
    obj.get(name)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

/// Sanitize each object-valued entry of `obj[name]`, dropping the rest.
/// `None` when the field itself is missing or not an object.
fn map_field<T>(
    obj: &Map<String, Value>,
    name: &str,
    entry: impl Fn(&Map<String, Value>) -> T,
) -> Option<BTreeMap<String, T>> {
    let map = obj.get(name).and_then(Value::as_object)?;
    Some(
        map.iter()
            .filter_map(|(k, v)| v.as_object().map(|o| (k.clone(), entry(o))))
            .collect(),
    )
}

fn reconciled_xp(obj: &Map<String, Value>, kept: impl Iterator<Item = u32>, blob: &str) -> i64 {
    let sum: i64 = kept.map(i64::from).sum();
    let stored = obj.get("totalXp").and_then(Value::as_i64);
    if stored != Some(sum) {
        tracing::warn!(blob, ?stored, rebuilt = sum, "stored totalXp disagrees with entries");
    }
    sum
}

fn scored_choice(obj: &Map<String, Value>) -> ScoredChoice {
    ScoredChoice {
        node_id: str_field(obj, "nodeId"),
        choice_id: str_field(obj, "choiceId"),
        optimal: bool_field(obj, "optimal"),
        points: i32_field(obj, "points"),
        rationale: opt_str_field(obj, "rationale"),
    }
}

fn case_score(obj: &Map<String, Value>) -> CaseScore {
    let choices: Vec<ScoredChoice> = obj
        .get("choices")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).map(scored_choice).collect())
        .unwrap_or_default();
    CaseScore {
        case_id: str_field(obj, "caseId"),
        total_score: i32_field(obj, "totalScore"),
        xp_earned: u32_field(obj, "xpEarned"),
        optimal_choices: u32_field(obj, "optimalChoices"),
        choices,
    }
}

fn case_result(obj: &Map<String, Value>) -> CaseResult {
    CaseResult {
        score: obj
            .get("score")
            .and_then(Value::as_object)
            .map(case_score)
            .unwrap_or_default(),
        completed_at: time_field(obj, "completedAt"),
    }
}

fn caught_character(obj: &Map<String, Value>) -> CaughtCharacter {
    CaughtCharacter {
        caught_at: time_field(obj, "caughtAt"),
        case_score: i32_field(obj, "caseScore"),
        xp_earned: u32_field(obj, "xpEarned"),
    }
}

impl Sanitize for CaseScore {
    fn sanitize(value: &Value) -> Self {
        value.as_object().map(case_score).unwrap_or_default()
    }
}

impl Sanitize for CaseProgress {
    fn sanitize(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        let Some(completed_cases) = map_field(obj, "completedCases", case_result) else {
            return Self::default();
        };
        let total_xp = reconciled_xp(
            obj,
            completed_cases.values().map(|r| r.score.xp_earned),
            "progress",
        );
        CaseProgress { completed_cases, total_xp }
    }
}

impl Sanitize for CharacterCollection {
    fn sanitize(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        let Some(characters) = map_field(obj, "characters", caught_character) else {
            return Self::default();
        };
        let total_xp =
            reconciled_xp(obj, characters.values().map(|c| c.xp_earned), "collection");
        CharacterCollection { characters, total_xp }
    }
}
