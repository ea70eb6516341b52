//! Instructor-side case documents.
//!
//! Authors write one document where each choice carries its verdict
//! (`optimal`, `points`, `teaching`). Before anything reaches a learner it
//! is split: the student manifest keeps only what can be shown, and the
//! verdicts move into a [`ScoringTable`] that stays on the build side.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::case_engine::{
    error::EngineError,
    models::*,
    scoring::{ChoiceScore, ScoringTable},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoredChoice {
    #[serde(flatten)]
    pub choice: CaseChoice,
    #[serde(default)]
    pub optimal: bool,
    #[serde(default)]
    pub points: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teaching: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoredNode {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default)]
    pub asset: CaseAsset,
    #[serde(default)]
    pub choices: Vec<AuthoredChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_advance: Option<AutoAdvanceRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoredCase {
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
    pub nodes: BTreeMap<NodeId, AuthoredNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_id: Option<String>,
}

impl AuthoredCase {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Verdicts for every choice, keyed by node and choice id.
    pub fn scoring_key(&self) -> ScoringTable {
        let mut table = ScoringTable::new();
        for (node_id, node) in &self.nodes {
            for authored in &node.choices {
                table.insert(
                    node_id,
                    &authored.choice.id,
                    ChoiceScore {
                        optimal: authored.optimal,
                        points: authored.points,
                        rationale: authored.choice.rationale.clone(),
                        teaching: authored.teaching.clone(),
                    },
                );
            }
        }
        table
    }

    /// Learner-safe manifest with all verdicts removed.
    pub fn student_manifest(&self) -> CaseManifest {
        let nodes = self
            .nodes
            .iter()
            .map(|(id, node)| {
                let student = CaseNode {
                    id: node.id.clone(),
                    title: node.title.clone(),
                    description: node.description.clone(),
                    prompt: node.prompt.clone(),
                    asset: node.asset.clone(),
                    choices: node.choices.iter().map(|c| c.choice.clone()).collect(),
                    auto_advance: node.auto_advance.clone(),
                };
                (id.clone(), student)
            })
            .collect();

        CaseManifest {
            id: self.id.clone(),
            title: self.title.clone(),
            chief_complaint: self.chief_complaint.clone(),
            summary: self.summary.clone(),
            language_level: self.language_level,
            skills: self.skills.clone(),
            start_node_id: self.start_node_id.clone(),
            nodes,
            character_id: self.character_id.clone(),
        }
    }

    /// Split into the validated student manifest and its scoring key.
    pub fn split(&self) -> Result<(CaseManifest, ScoringTable), EngineError> {
        let manifest = self.student_manifest();
        manifest.validate()?;
        Ok((manifest, self.scoring_key()))
    }
}
