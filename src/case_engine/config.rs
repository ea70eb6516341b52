use serde::{Deserialize, Serialize};

use crate::case_engine::error::EngineError;

pub const DEFAULT_PROGRESS_KEY: &str = "case-progress";
pub const DEFAULT_COLLECTION_KEY: &str = "character-collection";

/// Engine settings, resolved once by the host and passed in.
///
/// Every field has a default, so a partial JSON document (or `{}`) is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Storage key for the completed-case blob.
    pub progress_key: String,
    /// Storage key for the character-collection blob.
    pub collection_key: String,
    /// XP granted for reaching any terminal node.
    pub completion_xp: u32,
    /// Extra XP per choice the scoring key marks optimal.
    pub xp_per_optimal: u32,
    /// Fixes session ids for reproducible runs.
    pub session_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            progress_key: DEFAULT_PROGRESS_KEY.to_string(),
            collection_key: DEFAULT_COLLECTION_KEY.to_string(),
            completion_xp: 10,
            xp_per_optimal: 5,
            session_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.session_seed = Some(seed);
        self
    }

    /// XP for a finished run with `optimal` optimal choices.
    pub fn xp_for(&self, optimal: u32) -> u32 {
        self.completion_xp
            .saturating_add(self.xp_per_optimal.saturating_mul(optimal))
    }
}
