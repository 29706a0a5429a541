//! Collaborator traits — the external services the orchestrator drives.
//!
//! Hosts supply implementations of these traits (network, persistence);
//! the engine never touches a transport or a store schema directly.  All
//! methods are async and return [`CollaboratorError`] on failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use billflow_core::{
    ClientInfo, ClientRecord, ClientSuggestion, DeliveryMethod, DocumentType, Draft, QueryRequest,
    SessionSnapshot, SourceDocument,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure surfaced by a collaborator call.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Transport-level failure (connectivity, timeout, 5xx).
    #[error("network error: {0}")]
    Network(String),

    /// The referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The collaborator refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// Document repository
// ---------------------------------------------------------------------------

/// Search filter passed to the document repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFilter {
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    pub limit: u32,
}

/// What a document search produced.
///
/// When `documents` is empty the repository includes similarity-ranked
/// `suggestions` whenever it can compute them, so callers can offer a
/// "did you mean" affordance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub documents: Vec<SourceDocument>,
    #[serde(default)]
    pub suggestions: Vec<ClientSuggestion>,
}

/// A structured diff between the draft's client fields and an existing
/// stored client record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConflict {
    pub existing_client: ClientRecord,
    pub new_data: ClientInfo,
    /// Names of the fields that differ.
    pub differences: Vec<String>,
}

/// How a client conflict should be resolved when the create is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictDecision {
    /// Keep the existing stored values.
    Keep,
    /// Use the draft's values for this document without touching the record.
    UseNew,
    /// Update the stored record to the draft's values.
    Update,
}

/// Result of persisting a draft.
#[derive(Debug)]
pub enum CreateOutcome {
    /// The document was persisted.
    Created { id: String },
    /// The repository detected an existing client record whose fields
    /// differ from the draft's; the save is suspended pending a decision.
    ClientConflict(ClientConflict),
}

/// Persistent store for documents.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Search documents by client name with an optional type hint.
    async fn search(&self, filter: &DocumentFilter) -> Result<SearchOutcome, CollaboratorError>;

    /// Fetch a full document by id.
    async fn fetch(&self, id: &str) -> Result<SourceDocument, CollaboratorError>;

    /// Persist a draft, optionally carrying a conflict decision from a
    /// previous suspended attempt.
    async fn create(
        &self,
        draft: &Draft,
        decision: Option<ConflictDecision>,
    ) -> Result<CreateOutcome, CollaboratorError>;

    /// Apply a partial update to a stored document.
    async fn update(&self, id: &str, patch: serde_json::Value) -> Result<(), CollaboratorError>;

    /// Delete a stored document.
    async fn delete(&self, id: &str) -> Result<(), CollaboratorError>;
}

// ---------------------------------------------------------------------------
// Client repository
// ---------------------------------------------------------------------------

/// What a client suggestion query produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestOutcome {
    pub suggestions: Vec<ClientSuggestion>,
    /// Present when a suggestion matched the canonicalized query exactly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_match: Option<ClientSuggestion>,
}

/// Persistent store for client records.
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Fuzzy name lookup returning ranked suggestions.
    async fn suggest(&self, query: &str, limit: u32) -> Result<SuggestOutcome, CollaboratorError>;

    /// Apply a partial update to a stored client record.
    async fn update(&self, id: &str, patch: serde_json::Value) -> Result<(), CollaboratorError>;
}

// ---------------------------------------------------------------------------
// Email dispatch
// ---------------------------------------------------------------------------

/// Delivery transport for finished documents.
#[async_trait]
pub trait EmailDispatch: Send + Sync {
    /// Dispatch a persisted document to a recipient.
    async fn send(
        &self,
        document_id: &str,
        document_type: DocumentType,
        method: DeliveryMethod,
        recipient: &str,
    ) -> Result<(), CollaboratorError>;
}

// ---------------------------------------------------------------------------
// Query execution
// ---------------------------------------------------------------------------

/// Executes structured information queries; the engine only relays the
/// raw results.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn run(&self, query: &QueryRequest) -> Result<serde_json::Value, CollaboratorError>;
}

// ---------------------------------------------------------------------------
// Session store
// ---------------------------------------------------------------------------

/// Persistent store for session snapshots.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a snapshot, inserting or replacing by id.
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), CollaboratorError>;

    /// Load a previously saved snapshot.
    async fn load(&self, id: &str) -> Result<SessionSnapshot, CollaboratorError>;

    /// Mark a session completed with the document it produced.
    async fn complete(
        &self,
        id: &str,
        document_id: &str,
        document_type: DocumentType,
    ) -> Result<(), CollaboratorError>;
}
