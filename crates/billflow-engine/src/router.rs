//! Intent router — top-level dispatcher from parse results to flow state.
//!
//! Dispatches purely on the intent variant, delegating to the resolvers
//! for candidate lookup and to the modification engine (inside the flow
//! types) for previews.  Resolution here is everything that can happen
//! without the user: single candidates auto-select, zero candidates pull
//! "did you mean" suggestions, multiple candidates wait for an explicit
//! selection via the `select_*` operations.

use std::sync::Arc;

use futures::future;
use tracing::{debug, info, warn};

use billflow_core::{
    ClientSuggestion, CloneRequest, MergeRequest, ParseResult, SendRequest, SourceDocument,
    TransformRequest,
};

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::flow::{
    ActionFlow, ClientPicker, CloneFlow, FlowState, MergeFlow, MergeSlot, QueryFlow, SendFlow,
    TransformFlow,
};
use crate::resolver::{DocumentResolver, Resolution};
use crate::traits::{ClientRepository, DocumentFilter, DocumentRepository, QueryExecutor};

/// Top-level dispatcher: builds the initial [`FlowState`] for a parse
/// result and drives the explicit-selection steps the user takes after.
pub struct IntentRouter {
    documents: Arc<dyn DocumentRepository>,
    clients: Arc<dyn ClientRepository>,
    queries: Arc<dyn QueryExecutor>,
    resolver: DocumentResolver,
    config: EngineConfig,
}

impl IntentRouter {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        clients: Arc<dyn ClientRepository>,
        queries: Arc<dyn QueryExecutor>,
        config: EngineConfig,
    ) -> Self {
        let resolver = DocumentResolver::new(documents.clone(), &config);
        Self {
            documents,
            clients,
            queries,
            resolver,
            config,
        }
    }

    /// Route a parse result to its variant-specific flow state.
    pub async fn route(&self, parsed: ParseResult) -> EngineResult<FlowState> {
        debug!(intent = parsed.intent_name(), "routing parse result");
        match parsed {
            ParseResult::DocumentAction(request) => {
                Ok(FlowState::Action(ActionFlow::new(request)))
            }
            ParseResult::InformationQuery(request) => {
                let result = self.queries.run(&request).await?;
                Ok(FlowState::Query(QueryFlow {
                    request,
                    result: Some(result),
                }))
            }
            ParseResult::DocumentClone(request) => self.route_clone(request).await,
            ParseResult::DocumentMerge(request) => self.route_merge(request).await,
            ParseResult::DocumentSend(request) => self.route_send(request).await,
            ParseResult::DocumentTransform(request) => self.route_transform(request).await,
        }
    }

    /// Route a raw parse payload, degrading unusable payloads to an
    /// editable `document_action` draft instead of failing.
    pub async fn route_value(&self, value: serde_json::Value) -> EngineResult<FlowState> {
        self.route(ParseResult::from_value(value)).await
    }

    // -- Variant resolution --------------------------------------------------

    async fn route_clone(&self, request: CloneRequest) -> EngineResult<FlowState> {
        let mut flow = CloneFlow::new(request);
        match self
            .resolver
            .search(&flow.request.source_client, flow.request.document_type)
            .await?
        {
            Resolution::Single(document) => {
                info!(
                    source = %flow.request.source_client,
                    document_id = %document.id,
                    "single clone candidate auto-selected"
                );
                flow.select(document);
            }
            Resolution::NoMatch { suggestions } => {
                flow.suggestions = self
                    .with_fallback_suggestions(suggestions, &flow.request.source_client)
                    .await;
            }
            Resolution::Multiple(documents) => flow.candidates = documents,
        }
        Ok(FlowState::Clone(flow))
    }

    async fn route_merge(&self, request: MergeRequest) -> EngineResult<FlowState> {
        // Independent reads: fan out one search per source client, keeping
        // each slot's outcome as its own Result.
        let searches = request.source_clients.iter().map(|name| {
            let filter = DocumentFilter {
                client_name: name.clone(),
                document_type: request.document_type,
                limit: self.config.search_limit,
            };
            async move { self.documents.search(&filter).await }
        });
        let outcomes = future::join_all(searches).await;

        let slots: Vec<MergeSlot> = request
            .source_clients
            .iter()
            .zip(outcomes)
            .map(|(name, outcome)| {
                let mut slot = MergeSlot {
                    client_name: name.clone(),
                    outcome,
                    selected: None,
                };
                if let Ok(found) = &slot.outcome {
                    match found.documents.as_slice() {
                        [only] => slot.selected = Some(only.clone()),
                        [] => debug!(client = %slot.client_name, "merge slot found no documents"),
                        _ => {}
                    }
                } else if let Err(e) = &slot.outcome {
                    warn!(client = %slot.client_name, error = %e, "merge slot search failed");
                }
                slot
            })
            .collect();

        let mut flow = MergeFlow {
            request,
            slots,
            draft: None,
            actions: Vec::new(),
        };
        flow.refresh_draft();
        Ok(FlowState::Merge(flow))
    }

    async fn route_send(&self, request: SendRequest) -> EngineResult<FlowState> {
        let mut flow = SendFlow::new(request);
        match self
            .resolver
            .search(&flow.request.client_name, flow.request.document_type)
            .await?
        {
            Resolution::Single(document) => {
                let recipient = self.resolve_recipient(&flow.request, &document).await;
                flow.apply_selection(document, recipient);
            }
            Resolution::NoMatch { suggestions } => {
                flow.suggestions = self
                    .with_fallback_suggestions(suggestions, &flow.request.client_name)
                    .await;
            }
            Resolution::Multiple(documents) => flow.candidates = documents,
        }
        Ok(FlowState::Send(flow))
    }

    async fn route_transform(&self, request: TransformRequest) -> EngineResult<FlowState> {
        let mut flow = TransformFlow::new(request);
        match self
            .resolver
            .search(
                &flow.request.source.client_name,
                flow.request.source.document_type,
            )
            .await
        {
            Ok(Resolution::Single(document)) => flow.select(document),
            Ok(Resolution::NoMatch { suggestions }) => {
                let suggestions = self
                    .with_fallback_suggestions(suggestions, &flow.request.source.client_name)
                    .await;
                flow.picker = Some(ClientPicker { suggestions });
            }
            Ok(Resolution::Multiple(documents)) => flow.candidates = documents,
            Err(e) => {
                // Resolution failure surfaces a picker, not a hard error.
                warn!(
                    client = %flow.request.source.client_name,
                    error = %e,
                    "transform source resolution failed, surfacing client picker"
                );
                let suggestions = self
                    .with_fallback_suggestions(Vec::new(), &flow.request.source.client_name)
                    .await;
                flow.picker = Some(ClientPicker { suggestions });
            }
        }
        Ok(FlowState::Transform(flow))
    }

    // -- Explicit selections -------------------------------------------------

    /// Select the clone source when multiple candidates matched.
    pub fn select_clone_source(&self, flow: &mut CloneFlow, document: SourceDocument) {
        flow.select(document);
    }

    /// Select one merge slot's source document.
    pub fn select_merge_source(
        &self,
        flow: &mut MergeFlow,
        slot: usize,
        document: SourceDocument,
    ) -> EngineResult<()> {
        flow.select(slot, document)
    }

    /// Select the send source, resolving the recipient contact.
    pub async fn select_send_source(&self, flow: &mut SendFlow, document: SourceDocument) {
        let recipient = self.resolve_recipient(&flow.request, &document).await;
        flow.apply_selection(document, recipient);
    }

    /// Select the transform source.
    pub fn select_transform_source(&self, flow: &mut TransformFlow, document: SourceDocument) {
        flow.select(document);
    }

    /// Free-text search from the transform client picker.
    pub async fn search_transform_client(
        &self,
        flow: &mut TransformFlow,
        query: &str,
    ) -> EngineResult<()> {
        match self
            .resolver
            .search(query, flow.request.source.document_type)
            .await?
        {
            Resolution::Single(document) => flow.select(document),
            Resolution::NoMatch { suggestions } => {
                flow.picker = Some(ClientPicker { suggestions });
            }
            Resolution::Multiple(documents) => {
                flow.candidates = documents;
                flow.picker = None;
            }
        }
        Ok(())
    }

    // -- Helpers -------------------------------------------------------------

    /// Use the repository's suggestions when present, else fall back to a
    /// fuzzy client lookup.  Advisory: lookup failures are swallowed.
    async fn with_fallback_suggestions(
        &self,
        suggestions: Vec<ClientSuggestion>,
        name: &str,
    ) -> Vec<ClientSuggestion> {
        if !suggestions.is_empty() {
            return suggestions;
        }
        match self.clients.suggest(name, self.config.suggest_limit).await {
            Ok(outcome) => outcome.suggestions,
            Err(e) => {
                warn!(query = name, error = %e, "fallback client suggestion lookup failed");
                Vec::new()
            }
        }
    }

    /// Resolve the recipient contact for a send: a separately named
    /// recipient client wins, else the document's own client record.
    async fn resolve_recipient(
        &self,
        request: &SendRequest,
        document: &SourceDocument,
    ) -> Option<String> {
        use billflow_core::DeliveryMethod;

        if let Some(name) = &request.recipient {
            match self.clients.suggest(name, 1).await {
                Ok(outcome) => {
                    let pick = outcome
                        .exact_match
                        .or_else(|| outcome.suggestions.into_iter().next());
                    if let Some(client) = pick {
                        let contact = match request.delivery_method {
                            DeliveryMethod::Email => client.email,
                            DeliveryMethod::Sms | DeliveryMethod::Whatsapp => client.phone,
                        };
                        if contact.is_some() {
                            return contact;
                        }
                    }
                }
                Err(e) => {
                    warn!(recipient = %name, error = %e, "recipient client lookup failed");
                }
            }
        }

        match request.delivery_method {
            DeliveryMethod::Email => document.client_email.clone(),
            DeliveryMethod::Sms | DeliveryMethod::Whatsapp => document.client_phone.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
