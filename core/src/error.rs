use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Framework '{id}' not found")]
    UnknownFramework { id: String },

    #[error("Playbook '{id}' not found")]
    UnknownPlaybook { id: String },

    #[error("Framework '{id}' is invalid: {reason}")]
    InvalidFramework { id: String, reason: String },

    #[error("Playbook '{id}' references unknown framework '{framework_id}'")]
    DanglingFramework { id: String, framework_id: String },

    #[error("Run not initialized")]
    RunNotInitialized,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
