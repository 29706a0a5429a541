//! Per-variant flow state — the mutable workflow state the presentation
//! layer drives.
//!
//! [`FlowState`] is the uniform surface over the six intent variants: it
//! exposes the current draft, the queued actions, and validation, while
//! each variant struct carries its own resolution state (candidates,
//! suggestions, selections, previews).

use billflow_core::{
    ActionDetails, ActionKind, ActionStep, ClientInfo, ClientSuggestion, CloneOutcome, Draft,
    ParseResult, SourceDocument, ValidationReport, apply_clone, combine_for_merge, validate,
};
use billflow_core::{
    ActionRequest, CloneRequest, MergeRequest, QueryRequest, SendRequest, TransformRequest,
};

use crate::error::{EngineError, EngineResult};
use crate::traits::{CollaboratorError, SearchOutcome};

// ---------------------------------------------------------------------------
// FlowState
// ---------------------------------------------------------------------------

/// The variant-specific workflow state produced by routing a parse result.
#[derive(Debug)]
pub enum FlowState {
    Action(ActionFlow),
    Query(QueryFlow),
    Clone(CloneFlow),
    Merge(MergeFlow),
    Send(SendFlow),
    Transform(TransformFlow),
}

impl FlowState {
    /// The wire name of the underlying intent variant.
    pub fn intent_name(&self) -> &'static str {
        self.to_parse_result().intent_name()
    }

    /// Reconstruct the parse result this flow was routed from, for
    /// session snapshots.
    pub fn to_parse_result(&self) -> ParseResult {
        match self {
            Self::Action(flow) => ParseResult::DocumentAction(flow.request.clone()),
            Self::Query(flow) => ParseResult::InformationQuery(flow.request.clone()),
            Self::Clone(flow) => ParseResult::DocumentClone(flow.request.clone()),
            Self::Merge(flow) => ParseResult::DocumentMerge(flow.request.clone()),
            Self::Send(flow) => ParseResult::DocumentSend(flow.request.clone()),
            Self::Transform(flow) => ParseResult::DocumentTransform(flow.request.clone()),
        }
    }

    /// The current draft, when this variant has materialized one.
    pub fn draft(&self) -> Option<&Draft> {
        match self {
            Self::Action(flow) => Some(&flow.draft),
            Self::Query(_) => None,
            Self::Clone(flow) => flow.draft.as_ref(),
            Self::Merge(flow) => flow.draft.as_ref(),
            Self::Send(flow) => flow.draft.as_ref(),
            Self::Transform(flow) => flow.draft.as_ref(),
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut Draft> {
        match self {
            Self::Action(flow) => Some(&mut flow.draft),
            Self::Query(_) => None,
            Self::Clone(flow) => flow.draft.as_mut(),
            Self::Merge(flow) => flow.draft.as_mut(),
            Self::Send(flow) => flow.draft.as_mut(),
            Self::Transform(flow) => flow.draft.as_mut(),
        }
    }

    /// The queued actions (empty for read-only queries).
    pub fn actions(&self) -> &[ActionStep] {
        match self {
            Self::Action(flow) => &flow.actions,
            Self::Query(_) => &[],
            Self::Clone(flow) => &flow.actions,
            Self::Merge(flow) => &flow.actions,
            Self::Send(flow) => &flow.actions,
            Self::Transform(flow) => &flow.actions,
        }
    }

    pub fn actions_mut(&mut self) -> Option<&mut Vec<ActionStep>> {
        match self {
            Self::Action(flow) => Some(&mut flow.actions),
            Self::Query(_) => None,
            Self::Clone(flow) => Some(&mut flow.actions),
            Self::Merge(flow) => Some(&mut flow.actions),
            Self::Send(flow) => Some(&mut flow.actions),
            Self::Transform(flow) => Some(&mut flow.actions),
        }
    }

    /// An already-persisted document this flow operates on (send flows).
    pub fn document_id(&self) -> Option<&str> {
        match self {
            Self::Send(flow) => flow.document_id.as_deref(),
            _ => None,
        }
    }

    /// Validate the current draft state, when a draft exists.
    pub fn validation(&self) -> Option<ValidationReport> {
        self.draft().map(|draft| validate(draft, self.actions()))
    }
}

// ---------------------------------------------------------------------------
// document_action
// ---------------------------------------------------------------------------

/// Flow state for a direct document creation request.
#[derive(Debug)]
pub struct ActionFlow {
    pub request: ActionRequest,
    pub draft: Draft,
    pub actions: Vec<ActionStep>,
}

impl ActionFlow {
    /// Normalize a parsed request into an editable draft.  No network
    /// call is required to initialize this variant.
    pub fn new(request: ActionRequest) -> Self {
        let draft = Draft {
            document_type: request.document_type,
            client: request.client.clone(),
            items: request.items.iter().map(|item| item.to_line_item()).collect(),
            tax_rate: request.tax_rate,
            due_date: request.due_date,
            summary: request.summary.clone(),
            parse_error: request.parse_error.clone(),
            ..Draft::default()
        };

        let mut actions: Vec<ActionStep> = request
            .actions
            .iter()
            .enumerate()
            .map(|(index, action)| {
                ActionStep::new(action.kind, (index + 1) as u32).with_details(ActionDetails {
                    recipient: action.recipient.clone(),
                    frequency: action.frequency.clone(),
                    ..ActionDetails::default()
                })
            })
            .collect();
        if actions.is_empty() {
            actions.push(ActionStep::new(ActionKind::CreateDocument, 1));
        }

        Self {
            request,
            draft,
            actions,
        }
    }
}

// ---------------------------------------------------------------------------
// information_query
// ---------------------------------------------------------------------------

/// Flow state for a read-only information query.  No draft, no actions.
#[derive(Debug)]
pub struct QueryFlow {
    pub request: QueryRequest,
    /// Raw results from the query-execution collaborator.
    pub result: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// document_clone
// ---------------------------------------------------------------------------

/// Flow state for cloning an existing document to a (possibly new) client.
#[derive(Debug)]
pub struct CloneFlow {
    pub request: CloneRequest,
    /// Candidates awaiting explicit selection (when more than one matched).
    pub candidates: Vec<SourceDocument>,
    /// "Did you mean" alternatives (when nothing matched).
    pub suggestions: Vec<ClientSuggestion>,
    pub selected: Option<SourceDocument>,
    pub preview: Option<CloneOutcome>,
    pub draft: Option<Draft>,
    pub actions: Vec<ActionStep>,
}

impl CloneFlow {
    pub fn new(request: CloneRequest) -> Self {
        Self {
            request,
            candidates: Vec::new(),
            suggestions: Vec::new(),
            selected: None,
            preview: None,
            draft: None,
            actions: Vec::new(),
        }
    }

    /// Select the clone source and immediately compute the preview and
    /// editable draft.
    pub fn select(&mut self, document: SourceDocument) {
        let preview = apply_clone(&document, &self.request.modifications);

        // Contact details carry over only when the target is the same
        // client the source belongs to.
        let target = self.request.target_client.clone();
        let same_client = target
            .as_deref()
            .is_none_or(|t| t.eq_ignore_ascii_case(&document.client));
        let client = ClientInfo {
            name: target.unwrap_or_else(|| document.client.clone()),
            email: document.client_email.clone().filter(|_| same_client),
            phone: document.client_phone.clone().filter(|_| same_client),
            address: None,
        };

        self.draft = Some(Draft {
            document_type: self.request.document_type.unwrap_or(document.doc_type),
            client,
            items: preview.items.clone(),
            total_override: self.request.modifications.new_total,
            ..Draft::default()
        });
        self.actions = vec![ActionStep::new(ActionKind::CreateDocument, 1)];
        self.preview = Some(preview);
        self.selected = Some(document);
        self.candidates.clear();
    }
}

// ---------------------------------------------------------------------------
// document_merge
// ---------------------------------------------------------------------------

/// One source client's resolution state within a merge.
///
/// The search outcome is an explicit per-slot `Result` so partial fan-out
/// failures are observable rather than defaulting to an empty list.
#[derive(Debug)]
pub struct MergeSlot {
    pub client_name: String,
    pub outcome: Result<SearchOutcome, CollaboratorError>,
    pub selected: Option<SourceDocument>,
}

/// Flow state for combining documents from several source clients.
#[derive(Debug)]
pub struct MergeFlow {
    pub request: MergeRequest,
    pub slots: Vec<MergeSlot>,
    pub draft: Option<Draft>,
    pub actions: Vec<ActionStep>,
}

impl MergeFlow {
    /// Whether every slot has a selected source document.
    pub fn ready(&self) -> bool {
        !self.slots.is_empty() && self.slots.iter().all(|slot| slot.selected.is_some())
    }

    /// Select a source document for one slot, rebuilding the combined
    /// draft once every slot is resolved.
    pub fn select(&mut self, slot: usize, document: SourceDocument) -> EngineResult<()> {
        let slot = self
            .slots
            .get_mut(slot)
            .ok_or_else(|| EngineError::InvalidFlowState(format!("no merge slot {slot}")))?;
        slot.selected = Some(document);
        self.refresh_draft();
        Ok(())
    }

    /// Recompute the combined draft from the current selections.
    pub fn refresh_draft(&mut self) {
        if !self.ready() {
            return;
        }
        let selections: Vec<SourceDocument> = self
            .slots
            .iter()
            .filter_map(|slot| slot.selected.clone())
            .collect();
        let combined = combine_for_merge(&selections);

        let client_name = self
            .request
            .target_client
            .clone()
            .unwrap_or_else(|| self.slots[0].client_name.clone());

        self.draft = Some(Draft {
            document_type: self.request.document_type.unwrap_or_default(),
            client: ClientInfo {
                name: client_name,
                ..ClientInfo::default()
            },
            items: combined.items,
            ..Draft::default()
        });
        self.actions = vec![ActionStep::new(ActionKind::CreateDocument, 1)];
    }
}

// ---------------------------------------------------------------------------
// document_send
// ---------------------------------------------------------------------------

/// Flow state for dispatching an existing document.
#[derive(Debug)]
pub struct SendFlow {
    pub request: SendRequest,
    pub candidates: Vec<SourceDocument>,
    pub suggestions: Vec<ClientSuggestion>,
    pub selected: Option<SourceDocument>,
    /// The resolved recipient address or number, when one was found.
    pub recipient: Option<String>,
    /// The already-persisted document to send; seeds the executor so no
    /// second save happens.
    pub document_id: Option<String>,
    pub draft: Option<Draft>,
    pub actions: Vec<ActionStep>,
}

impl SendFlow {
    pub fn new(request: SendRequest) -> Self {
        Self {
            request,
            candidates: Vec::new(),
            suggestions: Vec::new(),
            selected: None,
            recipient: None,
            document_id: None,
            draft: None,
            actions: Vec::new(),
        }
    }

    /// Apply a selected source document and its resolved recipient.
    pub(crate) fn apply_selection(
        &mut self,
        document: SourceDocument,
        recipient: Option<String>,
    ) {
        let combined = combine_for_merge(std::slice::from_ref(&document));
        self.draft = Some(Draft {
            document_type: document.doc_type,
            client: ClientInfo {
                name: document.client.clone(),
                email: document.client_email.clone(),
                phone: document.client_phone.clone(),
                address: None,
            },
            items: combined.items,
            ..Draft::default()
        });
        self.actions = vec![
            ActionStep::new(ActionKind::SendEmail, 1).with_details(ActionDetails {
                recipient: recipient.clone(),
                frequency: None,
                method: self.request.delivery_method,
            }),
        ];
        self.document_id = Some(document.id.clone());
        self.recipient = recipient;
        self.selected = Some(document);
        self.candidates.clear();
    }
}

// ---------------------------------------------------------------------------
// document_transform
// ---------------------------------------------------------------------------

/// The client picker surfaced when transform-source resolution fails.
#[derive(Debug, Default)]
pub struct ClientPicker {
    pub suggestions: Vec<ClientSuggestion>,
}

/// Flow state for converting an existing document to another type.
#[derive(Debug)]
pub struct TransformFlow {
    pub request: TransformRequest,
    pub candidates: Vec<SourceDocument>,
    /// Present when resolution failed and the user must pick or search a
    /// client by hand.
    pub picker: Option<ClientPicker>,
    pub selected: Option<SourceDocument>,
    pub draft: Option<Draft>,
    pub actions: Vec<ActionStep>,
}

impl TransformFlow {
    pub fn new(request: TransformRequest) -> Self {
        Self {
            request,
            candidates: Vec::new(),
            picker: None,
            selected: None,
            draft: None,
            actions: Vec::new(),
        }
    }

    /// Select the transform source and build the converted draft.
    pub fn select(&mut self, document: SourceDocument) {
        let document_type = if self.request.conversion.enabled {
            self.request
                .conversion
                .target_type
                .unwrap_or(document.doc_type)
        } else {
            document.doc_type
        };

        let combined = combine_for_merge(std::slice::from_ref(&document));
        self.draft = Some(Draft {
            document_type,
            client: ClientInfo {
                name: document.client.clone(),
                email: document.client_email.clone(),
                phone: document.client_phone.clone(),
                address: None,
            },
            items: combined.items,
            ..Draft::default()
        });
        self.actions = vec![ActionStep::new(ActionKind::CreateDocument, 1)];
        self.selected = Some(document);
        self.picker = None;
        self.candidates.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
