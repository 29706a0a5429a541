//! Session snapshot types — the serializable record of an in-progress
//! workflow.
//!
//! A snapshot is created on the first successful parse or on resume, and
//! is mutated by autosave and explicit completion.  The orchestrator never
//! deletes a session; lifecycle beyond completion is owned by the session
//! store collaborator.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{ActionStep, Draft};
use crate::intent::ParseResult;

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

/// The persisted, resumable snapshot of an in-progress workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Unique identifier (UUID v7).
    pub id: String,
    /// Wire name of the intent variant, for store-side filtering.
    pub intent_type: String,
    /// The parse result that started this workflow, replayed on resume to
    /// rehydrate the variant's resolution pipeline.
    pub parsed: ParseResult,
    /// The user-edited draft, when the variant has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<Draft>,
    /// Queued actions with their current statuses.
    #[serde(default)]
    pub actions: Vec<ActionStep>,
    /// Raw query results, for information-query sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_result: Option<serde_json::Value>,
    pub status: SessionStatus,
    /// Unix timestamp when the session was created.
    pub created_at: i64,
    /// Unix timestamp when the session was last updated.
    pub updated_at: i64,
}

impl SessionSnapshot {
    /// Create a fresh in-progress snapshot for a parse result.
    pub fn new(parsed: ParseResult) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id: Uuid::now_v7().to_string(),
            intent_type: parsed.intent_name().to_string(),
            parsed,
            draft: None,
            actions: Vec::new(),
            query_result: None,
            status: SessionStatus::InProgress,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump the updated-at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().timestamp();
    }
}
