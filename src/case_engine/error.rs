use thiserror::Error;

/// A single referential-integrity problem found in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestIssue {
    #[error("start node '{0}' does not exist")]
    MissingStartNode(String),

    #[error("node key '{key}' holds a node with id '{id}'")]
    NodeIdMismatch { key: String, id: String },

    #[error("choice '{choice}' on node '{node}' points to missing node '{target}'")]
    DanglingChoice { node: String, choice: String, target: String },

    #[error("auto-advance on node '{node}' points to missing node '{target}'")]
    DanglingAutoAdvance { node: String, target: String },

    #[error("node '{node}' has more than one choice with id '{choice}'")]
    DuplicateChoice { node: String, choice: String },

    #[error("zero-delay auto-advance loop through node '{node}'")]
    InstantAutoAdvanceLoop { node: String },
}

/// Manifest rejected at load time; carries every issue found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("case '{case_id}' failed validation with {} issue(s)", .issues.len())]
pub struct ManifestError {
    pub case_id: String,
    pub issues: Vec<ManifestIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("cannot finalize before reaching a terminal node")]
    NotTerminal,

    #[error("score has already been finalized")]
    AlreadyFinalized,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("failed to parse case data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("choice '{choice}' is not available at node '{node}'")]
    UnknownChoice { node: String, choice: String },

    #[error("session has been torn down")]
    SessionClosed,

    #[error(transparent)]
    Score(#[from] ScoreError),
}

/// Storage failures. These never escape [`super::persistence::Persistence`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable")]
    Unavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
