//! Load-time checks for authored manifests.
//!
//! A manifest that references a node it does not contain is a content bug.
//! It is reported here, with every issue listed, so a session is never
//! started on a graph that could strand the learner mid-case.

use std::collections::HashSet;

use crate::case_engine::{
    error::{EngineError, ManifestError, ManifestIssue},
    models::CaseManifest,
};

impl CaseManifest {
    /// Parse and validate a manifest from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let manifest: CaseManifest = serde_json::from_str(json)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Collect all referential-integrity issues.
    pub fn issues(&self) -> Vec<ManifestIssue> {
        let mut issues = Vec::new();

        if !self.nodes.contains_key(&self.start_node_id) {
            issues.push(ManifestIssue::MissingStartNode(self.start_node_id.clone()));
        }

        for (key, node) in &self.nodes {
            if *key != node.id {
                issues.push(ManifestIssue::NodeIdMismatch {
                    key: key.clone(),
                    id: node.id.clone(),
                });
            }

            let mut seen = HashSet::new();
            for choice in &node.choices {
                if !seen.insert(choice.id.as_str()) {
                    issues.push(ManifestIssue::DuplicateChoice {
                        node: key.clone(),
                        choice: choice.id.clone(),
                    });
                }
                if !self.nodes.contains_key(&choice.next) {
                    issues.push(ManifestIssue::DanglingChoice {
                        node: key.clone(),
                        choice: choice.id.clone(),
                        target: choice.next.clone(),
                    });
                }
            }

            if let Some(rule) = &node.auto_advance {
                if !self.nodes.contains_key(&rule.next) {
                    issues.push(ManifestIssue::DanglingAutoAdvance {
                        node: key.clone(),
                        target: rule.next.clone(),
                    });
                }
            }
        }

        issues.extend(self.instant_loops());
        issues
    }

    /// Cycles made only of `afterMs: 0` auto-advances. A session entering
    /// one would keep re-arming a timer that is already due. Each cycle is
    /// reported once, under its smallest node id.
    fn instant_loops(&self) -> Vec<ManifestIssue> {
        let mut looped: HashSet<&str> = HashSet::new();
        let mut issues = Vec::new();

        for start in self.nodes.keys() {
            let mut path: Vec<&str> = Vec::new();
            let mut cur = start.as_str();
            loop {
                if let Some(pos) = path.iter().position(|n| *n == cur) {
                    let cycle = &path[pos..];
                    if !cycle.iter().any(|n| looped.contains(n)) {
                        if let Some(first) = cycle.iter().min() {
                            issues.push(ManifestIssue::InstantAutoAdvanceLoop {
                                node: first.to_string(),
                            });
                        }
                        looped.extend(cycle.iter().copied());
                    }
                    break;
                }
                let Some(rule) = self.nodes.get(cur).and_then(|n| n.auto_advance.as_ref()) else {
                    break;
                };
                if rule.after_ms != 0 {
                    break;
                }
                path.push(cur);
                cur = rule.next.as_str();
            }
        }
        issues
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        let issues = self.issues();
        if issues.is_empty() {
            return Ok(());
        }
        for issue in &issues {
            tracing::warn!(case_id = %self.id, "manifest issue: {}", issue);
        }
        Err(ManifestError { case_id: self.id.clone(), issues })
    }
}
