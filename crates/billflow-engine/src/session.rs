//! Session lifecycle — begin, debounced autosave, resume, complete.
//!
//! Autosave is trailing-edge debounced with last-write-wins: rapid edits
//! coalesce into a single snapshot write carrying the latest state.
//! Resume replays the stored parse result through the router to rebuild
//! the variant's resolution state, then overlays the persisted draft and
//! action statuses so user edits survive the round trip.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use billflow_core::{Draft, SessionSnapshot};

use crate::config::EngineConfig;
use crate::debounce::Debouncer;
use crate::error::{EngineError, EngineResult};
use crate::flow::FlowState;
use crate::router::IntentRouter;
use crate::traits::{ClientConflict, ClientRepository, ConflictDecision, SessionStore};

/// Identity carried across saves of the same session.
#[derive(Debug, Clone)]
struct SessionMeta {
    id: String,
    created_at: i64,
}

/// Owns the active session's persistence lifecycle.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    clients: Arc<dyn ClientRepository>,
    debouncer: Debouncer,
    /// The most recent snapshot queued for autosave; last write wins.
    pending: Mutex<Option<SessionSnapshot>>,
    active: Mutex<Option<SessionMeta>>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        clients: Arc<dyn ClientRepository>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            clients,
            debouncer: Debouncer::new(config.autosave_debounce),
            pending: Mutex::new(None),
            active: Mutex::new(None),
        }
    }

    /// The active session's id, when one has begun.
    pub fn session_id(&self) -> Option<String> {
        self.active.lock().unwrap().as_ref().map(|meta| meta.id.clone())
    }

    /// Start a session for a freshly routed flow and persist the initial
    /// snapshot immediately (not debounced).
    pub async fn begin(&self, flow: &FlowState) -> EngineResult<String> {
        let snapshot = Self::snapshot_of(flow, None);
        self.store.save(&snapshot).await?;
        info!(session_id = %snapshot.id, intent = %snapshot.intent_type, "session started");
        *self.active.lock().unwrap() = Some(SessionMeta {
            id: snapshot.id.clone(),
            created_at: snapshot.created_at,
        });
        Ok(snapshot.id)
    }

    /// Queue a debounced autosave of the flow's current state.
    ///
    /// Returns `true` when this call's snapshot was the one persisted,
    /// `false` when it was superseded by a later edit (or no session is
    /// active).  Persistence failures are advisory: logged, not surfaced.
    pub async fn autosave(&self, flow: &FlowState) -> bool {
        let Some(meta) = self.active.lock().unwrap().clone() else {
            debug!("autosave skipped, no active session");
            return false;
        };

        let mut snapshot = Self::snapshot_of(flow, Some(meta));
        snapshot.touch();
        *self.pending.lock().unwrap() = Some(snapshot);

        if !self.debouncer.settle().await {
            return false;
        }
        let Some(snapshot) = self.pending.lock().unwrap().take() else {
            return false;
        };
        match self.store.save(&snapshot).await {
            Ok(()) => {
                debug!(session_id = %snapshot.id, "session autosaved");
                true
            }
            Err(e) => {
                warn!(session_id = %snapshot.id, error = %e, "session autosave failed");
                false
            }
        }
    }

    /// Drop any queued autosave without persisting it.
    pub fn cancel_pending(&self) {
        self.debouncer.cancel();
        self.pending.lock().unwrap().take();
    }

    /// Resume a stored session: replay the parse result through the
    /// router, then overlay the persisted draft, actions, and results.
    pub async fn resume(&self, id: &str, router: &IntentRouter) -> EngineResult<FlowState> {
        let snapshot = self.store.load(id).await?;
        info!(session_id = id, intent = %snapshot.intent_type, "resuming session");

        let mut flow = router.route(snapshot.parsed.clone()).await?;
        Self::overlay(&mut flow, &snapshot);

        *self.active.lock().unwrap() = Some(SessionMeta {
            id: snapshot.id,
            created_at: snapshot.created_at,
        });
        Ok(flow)
    }

    /// Mark the active session completed with the document it produced.
    pub async fn complete(
        &self,
        document_id: &str,
        document_type: billflow_core::DocumentType,
    ) -> EngineResult<()> {
        let Some(meta) = self.active.lock().unwrap().clone() else {
            return Err(EngineError::NoSession);
        };
        self.cancel_pending();
        self.store
            .complete(&meta.id, document_id, document_type)
            .await?;
        info!(session_id = %meta.id, document_id, "session completed");
        Ok(())
    }

    /// Apply the user's client-conflict decision to the draft and the
    /// client repository, returning the decision to carry into the
    /// retried create.
    pub async fn resolve_conflict(
        &self,
        draft: &mut Draft,
        conflict: &ClientConflict,
        decision: ConflictDecision,
    ) -> EngineResult<ConflictDecision> {
        match decision {
            ConflictDecision::Keep => {
                // Stored values win; the draft reflects them.
                draft.client = conflict.existing_client.info.clone();
            }
            ConflictDecision::UseNew => {
                // The draft's values are used for this document only.
            }
            ConflictDecision::Update => {
                let patch = serde_json::to_value(&conflict.new_data)?;
                self.clients
                    .update(&conflict.existing_client.id, patch)
                    .await?;
            }
        }
        Ok(decision)
    }

    fn snapshot_of(flow: &FlowState, meta: Option<SessionMeta>) -> SessionSnapshot {
        let mut snapshot = SessionSnapshot::new(flow.to_parse_result());
        if let Some(meta) = meta {
            snapshot.id = meta.id;
            snapshot.created_at = meta.created_at;
        }
        snapshot.draft = flow.draft().cloned();
        snapshot.actions = flow.actions().to_vec();
        if let FlowState::Query(query) = flow {
            snapshot.query_result = query.result.clone();
        }
        snapshot
    }

    /// Overlay persisted state onto a freshly routed flow.  The stored
    /// draft and actions win over the re-resolved ones; resolution state
    /// (candidates, suggestions) stays fresh.
    fn overlay(flow: &mut FlowState, snapshot: &SessionSnapshot) {
        match flow {
            FlowState::Action(f) => {
                if let Some(draft) = &snapshot.draft {
                    f.draft = draft.clone();
                }
                if !snapshot.actions.is_empty() {
                    f.actions = snapshot.actions.clone();
                }
            }
            FlowState::Query(f) => {
                if snapshot.query_result.is_some() {
                    f.result = snapshot.query_result.clone();
                }
            }
            FlowState::Clone(f) => {
                if snapshot.draft.is_some() {
                    f.draft = snapshot.draft.clone();
                }
                if !snapshot.actions.is_empty() {
                    f.actions = snapshot.actions.clone();
                }
            }
            FlowState::Merge(f) => {
                if snapshot.draft.is_some() {
                    f.draft = snapshot.draft.clone();
                }
                if !snapshot.actions.is_empty() {
                    f.actions = snapshot.actions.clone();
                }
            }
            FlowState::Send(f) => {
                if snapshot.draft.is_some() {
                    f.draft = snapshot.draft.clone();
                }
                if !snapshot.actions.is_empty() {
                    f.actions = snapshot.actions.clone();
                }
            }
            FlowState::Transform(f) => {
                if snapshot.draft.is_some() {
                    f.draft = snapshot.draft.clone();
                }
                if !snapshot.actions.is_empty() {
                    f.actions = snapshot.actions.clone();
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::ActionFlow;
    use crate::traits::{
        CollaboratorError, CreateOutcome, DocumentFilter, DocumentRepository, QueryExecutor,
        SearchOutcome, SuggestOutcome,
    };
    use async_trait::async_trait;
    use billflow_core::{
        ActionRequest, ClientInfo, ClientRecord, DocumentType, LineItem, SourceDocument,
    };
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeStore {
        saved: Mutex<Vec<SessionSnapshot>>,
        completed: Mutex<Vec<(String, String)>>,
        by_id: Mutex<HashMap<String, SessionSnapshot>>,
    }

    #[async_trait]
    impl SessionStore for FakeStore {
        async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), CollaboratorError> {
            self.saved.lock().unwrap().push(snapshot.clone());
            self.by_id
                .lock()
                .unwrap()
                .insert(snapshot.id.clone(), snapshot.clone());
            Ok(())
        }

        async fn load(&self, id: &str) -> Result<SessionSnapshot, CollaboratorError> {
            self.by_id
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or(CollaboratorError::NotFound {
                    entity: "session",
                    id: id.to_string(),
                })
        }

        async fn complete(
            &self,
            id: &str,
            document_id: &str,
            _document_type: DocumentType,
        ) -> Result<(), CollaboratorError> {
            self.completed
                .lock()
                .unwrap()
                .push((id.to_string(), document_id.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeClients {
        updates: Mutex<Vec<(String, serde_json::Value)>>,
    }

    #[async_trait]
    impl ClientRepository for FakeClients {
        async fn suggest(
            &self,
            _query: &str,
            _limit: u32,
        ) -> Result<SuggestOutcome, CollaboratorError> {
            Ok(SuggestOutcome::default())
        }

        async fn update(
            &self,
            id: &str,
            patch: serde_json::Value,
        ) -> Result<(), CollaboratorError> {
            self.updates.lock().unwrap().push((id.to_string(), patch));
            Ok(())
        }
    }

    struct EmptyDocuments;

    #[async_trait]
    impl DocumentRepository for EmptyDocuments {
        async fn search(
            &self,
            _filter: &DocumentFilter,
        ) -> Result<SearchOutcome, CollaboratorError> {
            Ok(SearchOutcome::default())
        }

        async fn fetch(&self, id: &str) -> Result<SourceDocument, CollaboratorError> {
            Err(CollaboratorError::NotFound {
                entity: "document",
                id: id.to_string(),
            })
        }

        async fn create(
            &self,
            _draft: &Draft,
            _decision: Option<ConflictDecision>,
        ) -> Result<CreateOutcome, CollaboratorError> {
            Ok(CreateOutcome::Created { id: "d1".into() })
        }

        async fn update(
            &self,
            _id: &str,
            _patch: serde_json::Value,
        ) -> Result<(), CollaboratorError> {
            Ok(())
        }

        async fn delete(&self, _id: &str) -> Result<(), CollaboratorError> {
            Ok(())
        }
    }

    struct NoQueries;

    #[async_trait]
    impl QueryExecutor for NoQueries {
        async fn run(
            &self,
            _query: &billflow_core::QueryRequest,
        ) -> Result<serde_json::Value, CollaboratorError> {
            Ok(serde_json::Value::Null)
        }
    }

    fn manager(store: Arc<FakeStore>, clients: Arc<FakeClients>) -> SessionManager {
        SessionManager::new(store, clients, &EngineConfig::default())
    }

    fn router(clients: Arc<FakeClients>) -> IntentRouter {
        IntentRouter::new(
            Arc::new(EmptyDocuments),
            clients,
            Arc::new(NoQueries),
            EngineConfig::default(),
        )
    }

    fn action_flow() -> FlowState {
        FlowState::Action(ActionFlow::new(ActionRequest {
            client: ClientInfo {
                name: "John".into(),
                ..ClientInfo::default()
            },
            ..ActionRequest::default()
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_mutations_coalesce_to_one_save() {
        let store = Arc::new(FakeStore::default());
        let manager = manager(store.clone(), Arc::new(FakeClients::default()));

        let mut flow = action_flow();
        manager.begin(&flow).await.unwrap();
        assert_eq!(store.saved.lock().unwrap().len(), 1);

        // Five rapid edits within the debounce window.
        flow.draft_mut().unwrap().client.name = "John Smith".into();
        let (a, b, c, d, e) = tokio::join!(
            manager.autosave(&flow),
            manager.autosave(&flow),
            manager.autosave(&flow),
            manager.autosave(&flow),
            manager.autosave(&flow),
        );
        assert_eq!(
            [a, b, c, d, e].iter().filter(|saved| **saved).count(),
            1
        );
        assert!(e);

        // begin + exactly one coalesced autosave.
        let saved = store.saved.lock().unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[1].draft.as_ref().unwrap().client.name, "John Smith");
        assert_eq!(saved[1].id, saved[0].id);
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_without_session_is_a_no_op() {
        let store = Arc::new(FakeStore::default());
        let manager = manager(store.clone(), Arc::new(FakeClients::default()));

        assert!(!manager.autosave(&action_flow()).await);
        assert!(store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_queued_autosave() {
        let store = Arc::new(FakeStore::default());
        let manager = Arc::new(manager(store.clone(), Arc::new(FakeClients::default())));

        let flow = action_flow();
        manager.begin(&flow).await.unwrap();

        let pending = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.autosave(&action_flow()).await })
        };
        tokio::task::yield_now().await;
        manager.cancel_pending();

        assert!(!pending.await.unwrap());
        assert_eq!(store.saved.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_overlays_persisted_edits() {
        let store = Arc::new(FakeStore::default());
        let clients = Arc::new(FakeClients::default());
        let manager = manager(store.clone(), clients.clone());
        let router = router(clients);

        // Begin, edit, autosave.
        let mut flow = action_flow();
        let id = manager.begin(&flow).await.unwrap();
        {
            let draft = flow.draft_mut().unwrap();
            draft.client.name = "John Smith".into();
            draft.items.push(LineItem::new("Labor", 2.0, "hour", 75.0));
        }
        assert!(manager.autosave(&flow).await);

        // Resume in a fresh manager, as after a restart.
        let manager2 = SessionManager::new(
            store.clone(),
            Arc::new(FakeClients::default()),
            &EngineConfig::default(),
        );
        let resumed = manager2.resume(&id, &router).await.unwrap();

        let draft = resumed.draft().unwrap();
        assert_eq!(draft.client.name, "John Smith");
        assert_eq!(draft.subtotal(), 150.0);
        assert_eq!(resumed.intent_name(), "document_action");
        assert_eq!(manager2.session_id().as_deref(), Some(id.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn resume_missing_session_fails() {
        let store = Arc::new(FakeStore::default());
        let clients = Arc::new(FakeClients::default());
        let manager = manager(store, clients.clone());

        let err = manager.resume("nope", &router(clients)).await.unwrap_err();
        assert!(matches!(err, EngineError::Collaborator(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn complete_requires_and_marks_active_session() {
        let store = Arc::new(FakeStore::default());
        let manager = manager(store.clone(), Arc::new(FakeClients::default()));

        assert!(matches!(
            manager.complete("d1", DocumentType::Invoice).await,
            Err(EngineError::NoSession)
        ));

        let id = manager.begin(&action_flow()).await.unwrap();
        manager.complete("d1", DocumentType::Invoice).await.unwrap();
        assert_eq!(
            *store.completed.lock().unwrap(),
            vec![(id, "d1".to_string())]
        );
    }

    #[tokio::test]
    async fn conflict_keep_restores_stored_client() {
        let manager = manager(
            Arc::new(FakeStore::default()),
            Arc::new(FakeClients::default()),
        );
        let conflict = ClientConflict {
            existing_client: ClientRecord {
                id: "c1".into(),
                info: ClientInfo {
                    name: "John".into(),
                    email: Some("stored@example.com".into()),
                    ..ClientInfo::default()
                },
            },
            new_data: ClientInfo {
                name: "John".into(),
                email: Some("typed@example.com".into()),
                ..ClientInfo::default()
            },
            differences: vec!["email".into()],
        };

        let mut draft = Draft {
            client: conflict.new_data.clone(),
            ..Draft::default()
        };
        let decision = manager
            .resolve_conflict(&mut draft, &conflict, ConflictDecision::Keep)
            .await
            .unwrap();
        assert_eq!(decision, ConflictDecision::Keep);
        assert_eq!(draft.client.email.as_deref(), Some("stored@example.com"));
    }

    #[tokio::test]
    async fn conflict_update_patches_client_record() {
        let clients = Arc::new(FakeClients::default());
        let manager = manager(Arc::new(FakeStore::default()), clients.clone());
        let conflict = ClientConflict {
            existing_client: ClientRecord {
                id: "c1".into(),
                info: ClientInfo {
                    name: "John".into(),
                    ..ClientInfo::default()
                },
            },
            new_data: ClientInfo {
                name: "John".into(),
                phone: Some("555-0100".into()),
                ..ClientInfo::default()
            },
            differences: vec!["phone".into()],
        };

        let mut draft = Draft::default();
        manager
            .resolve_conflict(&mut draft, &conflict, ConflictDecision::Update)
            .await
            .unwrap();

        let updates = clients.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "c1");
        assert_eq!(updates[0].1["phone"], "555-0100");
    }
}
