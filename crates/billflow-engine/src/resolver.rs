//! Fuzzy lookup adapters over the repository collaborators.
//!
//! [`DocumentResolver`] enforces the search contract by construction: a
//! single candidate auto-selects, zero candidates carry suggestions, and
//! multiple candidates force a picker.  [`ClientResolver`] debounces
//! keystroke queries and discards superseded results.

use std::sync::Arc;

use tracing::{debug, warn};

use billflow_core::DocumentType;

use crate::config::EngineConfig;
use crate::debounce::Debouncer;
use crate::traits::{
    ClientRepository, CollaboratorError, DocumentFilter, DocumentRepository, SearchOutcome,
    SuggestOutcome,
};

// ---------------------------------------------------------------------------
// Document resolution
// ---------------------------------------------------------------------------

/// What a document search resolved to, shaped by candidate count.
#[derive(Debug)]
pub enum Resolution {
    /// Nothing matched; `suggestions` carry "did you mean" alternatives
    /// when the repository could compute them.
    NoMatch {
        suggestions: Vec<billflow_core::ClientSuggestion>,
    },
    /// Exactly one candidate — the caller auto-selects without prompting.
    Single(billflow_core::SourceDocument),
    /// Multiple candidates — the caller must render a picker and must not
    /// proceed until one is chosen.
    Multiple(Vec<billflow_core::SourceDocument>),
}

/// Searches for candidate source documents by client name.
#[derive(Clone)]
pub struct DocumentResolver {
    documents: Arc<dyn DocumentRepository>,
    limit: u32,
}

impl DocumentResolver {
    pub fn new(documents: Arc<dyn DocumentRepository>, config: &EngineConfig) -> Self {
        Self {
            documents,
            limit: config.search_limit,
        }
    }

    /// Search by client name with an optional document-type hint.
    pub async fn search(
        &self,
        client_name: &str,
        hint: Option<DocumentType>,
    ) -> Result<Resolution, CollaboratorError> {
        let filter = DocumentFilter {
            client_name: client_name.to_string(),
            document_type: hint,
            limit: self.limit,
        };
        let SearchOutcome {
            mut documents,
            suggestions,
        } = self.documents.search(&filter).await?;

        debug!(
            client = client_name,
            candidates = documents.len(),
            suggestions = suggestions.len(),
            "document search resolved"
        );

        Ok(match documents.len() {
            0 => Resolution::NoMatch { suggestions },
            1 => Resolution::Single(documents.remove(0)),
            _ => Resolution::Multiple(documents),
        })
    }
}

// ---------------------------------------------------------------------------
// Client suggestions
// ---------------------------------------------------------------------------

/// Outcome of a debounced suggestion query.
#[derive(Debug)]
pub enum SuggestResult {
    /// The query was too short; any prior suggestion list must be cleared.
    Cleared,
    /// A newer keystroke superseded this query; discard it.
    Superseded,
    /// Fresh suggestions, possibly with an exact match that should
    /// overwrite the draft client without confirmation.
    Ready(SuggestOutcome),
}

/// Debounced fuzzy client-name lookup for autocomplete.
pub struct ClientResolver {
    clients: Arc<dyn ClientRepository>,
    debouncer: Debouncer,
    min_len: usize,
    limit: u32,
}

impl ClientResolver {
    pub fn new(clients: Arc<dyn ClientRepository>, config: &EngineConfig) -> Self {
        Self {
            clients,
            debouncer: Debouncer::new(config.suggest_debounce),
            min_len: config.min_suggest_len,
            limit: config.suggest_limit,
        }
    }

    /// Run a suggestion query for the current keystroke state.
    ///
    /// Queries shorter than the configured minimum return
    /// [`SuggestResult::Cleared`] immediately.  Otherwise the query waits
    /// out the debounce window; a superseding keystroke invalidates it
    /// (last-write-wins on the suggestion list).  Lookup failures are
    /// advisory and are swallowed into an empty result.
    pub async fn suggest(&self, query: &str) -> SuggestResult {
        let query = query.trim();
        if query.chars().count() < self.min_len {
            return SuggestResult::Cleared;
        }

        if !self.debouncer.settle().await {
            return SuggestResult::Superseded;
        }

        match self.clients.suggest(query, self.limit).await {
            Ok(outcome) => {
                debug!(
                    query,
                    suggestions = outcome.suggestions.len(),
                    exact = outcome.exact_match.is_some(),
                    "client suggestions ready"
                );
                SuggestResult::Ready(outcome)
            }
            Err(e) => {
                // Suggestions are advisory, not required for correctness.
                warn!(query, error = %e, "client suggestion lookup failed");
                SuggestResult::Ready(SuggestOutcome::default())
            }
        }
    }

    /// Invalidate any pending debounced query (navigation-away).
    pub fn cancel(&self) {
        self.debouncer.cancel();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use billflow_core::{ClientSuggestion, SourceDocument};
    use std::sync::Mutex;

    struct FakeDocuments {
        documents: Vec<SourceDocument>,
        suggestions: Vec<ClientSuggestion>,
    }

    #[async_trait]
    impl DocumentRepository for FakeDocuments {
        async fn search(
            &self,
            _filter: &DocumentFilter,
        ) -> Result<SearchOutcome, CollaboratorError> {
            Ok(SearchOutcome {
                documents: self.documents.clone(),
                suggestions: self.suggestions.clone(),
            })
        }

        async fn fetch(&self, id: &str) -> Result<SourceDocument, CollaboratorError> {
            Err(CollaboratorError::NotFound {
                entity: "document",
                id: id.to_string(),
            })
        }

        async fn create(
            &self,
            _draft: &billflow_core::Draft,
            _decision: Option<crate::traits::ConflictDecision>,
        ) -> Result<crate::traits::CreateOutcome, CollaboratorError> {
            unimplemented!("not exercised")
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

    struct FakeClients {
        calls: Mutex<Vec<String>>,
        outcome: SuggestOutcome,
    }

    #[async_trait]
    impl ClientRepository for FakeClients {
        async fn suggest(
            &self,
            query: &str,
            _limit: u32,
        ) -> Result<SuggestOutcome, CollaboratorError> {
            self.calls.lock().unwrap().push(query.to_string());
            Ok(self.outcome.clone())
        }

        async fn update(
            &self,
            _id: &str,
            _patch: serde_json::Value,
        ) -> Result<(), CollaboratorError> {
            Ok(())
        }
    }

    fn sample_doc(id: &str) -> SourceDocument {
        SourceDocument {
            id: id.into(),
            doc_type: billflow_core::DocumentType::Invoice,
            title: format!("INV-{id}"),
            client: "John".into(),
            amount: 100.0,
            date: None,
            line_items: vec![],
            client_email: None,
            client_phone: None,
        }
    }

    #[tokio::test]
    async fn single_candidate_resolves_single() {
        let repo = Arc::new(FakeDocuments {
            documents: vec![sample_doc("1")],
            suggestions: vec![],
        });
        let resolver = DocumentResolver::new(repo, &EngineConfig::default());

        match resolver.search("John", None).await.unwrap() {
            Resolution::Single(doc) => assert_eq!(doc.id, "1"),
            other => panic!("expected Single, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_candidates_carry_suggestions() {
        let repo = Arc::new(FakeDocuments {
            documents: vec![],
            suggestions: vec![ClientSuggestion {
                id: "c1".into(),
                name: "Jon Smith".into(),
                email: None,
                phone: None,
                address: None,
                similarity: 0.8,
            }],
        });
        let resolver = DocumentResolver::new(repo, &EngineConfig::default());

        match resolver.search("John", None).await.unwrap() {
            Resolution::NoMatch { suggestions } => {
                assert_eq!(suggestions.len(), 1);
                assert_eq!(suggestions[0].name, "Jon Smith");
            }
            other => panic!("expected NoMatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn multiple_candidates_require_picker() {
        let repo = Arc::new(FakeDocuments {
            documents: vec![sample_doc("1"), sample_doc("2")],
            suggestions: vec![],
        });
        let resolver = DocumentResolver::new(repo, &EngineConfig::default());

        match resolver.search("John", None).await.unwrap() {
            Resolution::Multiple(docs) => assert_eq!(docs.len(), 2),
            other => panic!("expected Multiple, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn short_query_clears_without_a_call() {
        let clients = Arc::new(FakeClients {
            calls: Mutex::new(vec![]),
            outcome: SuggestOutcome::default(),
        });
        let resolver = ClientResolver::new(clients.clone(), &EngineConfig::default());

        assert!(matches!(resolver.suggest("j").await, SuggestResult::Cleared));
        assert!(clients.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn superseding_keystroke_wins() {
        let clients = Arc::new(FakeClients {
            calls: Mutex::new(vec![]),
            outcome: SuggestOutcome::default(),
        });
        let resolver = Arc::new(ClientResolver::new(
            clients.clone(),
            &EngineConfig::default(),
        ));

        let (first, second) = tokio::join!(resolver.suggest("jo"), resolver.suggest("joh"));
        assert!(matches!(first, SuggestResult::Superseded));
        assert!(matches!(second, SuggestResult::Ready(_)));
        // Only the surviving query reached the repository.
        assert_eq!(*clients.calls.lock().unwrap(), vec!["joh".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_lookup_is_swallowed() {
        struct FailingClients;

        #[async_trait]
        impl ClientRepository for FailingClients {
            async fn suggest(
                &self,
                _query: &str,
                _limit: u32,
            ) -> Result<SuggestOutcome, CollaboratorError> {
                Err(CollaboratorError::Network("offline".into()))
            }

            async fn update(
                &self,
                _id: &str,
                _patch: serde_json::Value,
            ) -> Result<(), CollaboratorError> {
                Ok(())
            }
        }

        let resolver = ClientResolver::new(Arc::new(FailingClients), &EngineConfig::default());
        match resolver.suggest("john").await {
            SuggestResult::Ready(outcome) => {
                assert!(outcome.suggestions.is_empty());
                assert!(outcome.exact_match.is_none());
            }
            other => panic!("expected empty Ready, got {other:?}"),
        }
    }
}
