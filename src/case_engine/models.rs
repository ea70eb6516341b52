use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type NodeId = String;
pub type ChoiceId = String;

// ---------------------------------------------------------------------------
// Manifest metadata
// ---------------------------------------------------------------------------

/// CEFR proficiency level the case text is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LanguageLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl fmt::Display for LanguageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LanguageLevel::A1 => "A1",
            LanguageLevel::A2 => "A2",
            LanguageLevel::B1 => "B1",
            LanguageLevel::B2 => "B2",
            LanguageLevel::C1 => "C1",
            LanguageLevel::C2 => "C2",
        };
        write!(f, "{}", s)
    }
}

// ---------------------------------------------------------------------------
// Graph content
// ---------------------------------------------------------------------------

/// Media shown for a node. Exactly one variant applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CaseAsset {
    Placeholder {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Remote {
        src: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thumbnail: Option<String>,
    },
    Static {
        src: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thumbnail: Option<String>,
    },
}

impl CaseAsset {
    /// Media source, if the asset has one.
    pub fn src(&self) -> Option<&str> {
        match self {
            CaseAsset::Placeholder { .. } => None,
            CaseAsset::Remote { src, .. } | CaseAsset::Static { src, .. } => Some(src),
        }
    }
}

impl Default for CaseAsset {
    fn default() -> Self {
        CaseAsset::Placeholder { label: None, description: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseChoice {
    pub id: ChoiceId,
    pub label: String,
    pub next: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Shown to the learner after the choice is made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Timed transition to `next` once `after_ms` has elapsed on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoAdvanceRule {
    pub next: NodeId,
    pub after_ms: u64,
}

impl AutoAdvanceRule {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.after_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseNode {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default)]
    pub asset: CaseAsset,
    /// Presentation order of the options.
    #[serde(default)]
    pub choices: Vec<CaseChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_advance: Option<AutoAdvanceRule>,
}

impl CaseNode {
    /// A node with nowhere to go ends the session.
    pub fn is_terminal(&self) -> bool {
        self.choices.is_empty() && self.auto_advance.is_none()
    }

    pub fn choice(&self, choice_id: &str) -> Option<&CaseChoice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }
}

/// Immutable authored description of a branching case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseManifest {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub chief_complaint: String,
    #[serde(default)]
    pub summary: String,
    pub language_level: LanguageLevel,
    #[serde(default)]
    pub skills: BTreeSet<String>,
    pub start_node_id: NodeId,
    pub nodes: BTreeMap<NodeId, CaseNode>,
    /// Collectible character unlocked by finishing the case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_id: Option<String>,
}

impl CaseManifest {
    pub fn node(&self, node_id: &str) -> Option<&CaseNode> {
        self.nodes.get(node_id)
    }
}

// ---------------------------------------------------------------------------
// Scoring records
// ---------------------------------------------------------------------------

/// One scored step of a playthrough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredChoice {
    pub node_id: NodeId,
    pub choice_id: ChoiceId,
    pub optimal: bool,
    pub points: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Final result of one playthrough.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseScore {
    pub case_id: String,
    pub total_score: i32,
    pub xp_earned: u32,
    pub optimal_choices: u32,
    pub choices: Vec<ScoredChoice>,
}

// ---------------------------------------------------------------------------
// Progress records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    pub score: CaseScore,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaughtCharacter {
    /// First capture time; never moves on later improvements.
    pub caught_at: DateTime<Utc>,
    pub case_score: i32,
    pub xp_earned: u32,
}

/// Persisted under the progress key as one blob.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseProgress {
    pub completed_cases: BTreeMap<String, CaseResult>,
    pub total_xp: i64,
}

/// Persisted under the collection key as one blob.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterCollection {
    pub characters: BTreeMap<String, CaughtCharacter>,
    pub total_xp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub total: usize,
    pub caught: usize,
    pub completion_percent: u32,
}
