//! Engine error types.
//!
//! The taxonomy distinguishes failures by how the caller should react:
//! degraded parses never reach here (they become editable drafts),
//! resolution misses surface as empty states inside flow state, and the
//! variants below cover the genuinely refusing or failing paths.

use thiserror::Error;

use crate::traits::CollaboratorError;

/// Alias for `Result<T, EngineError>`.
pub type EngineResult<T> = Result<T, EngineError>;

/// Unified error type for the orchestration engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The validation gate reported blocking errors; execution was
    /// refused locally and no network call was attempted.
    #[error("execution blocked: {}", .reasons.join("; "))]
    ValidationBlocked { reasons: Vec<String> },

    /// A single action step failed at execution time.
    #[error("action {action_id} failed: {reason}")]
    ActionFailed { action_id: String, reason: String },

    /// An operation requiring a session was invoked before one existed.
    #[error("no active session")]
    NoSession,

    /// The flow is not in a state where the requested operation applies.
    #[error("invalid flow state: {0}")]
    InvalidFlowState(String),

    /// A required collaborator call failed.
    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
