//! Sequential action execution behind the validation gate.
//!
//! Steps run strictly in `order`.  A failed step halts the run: later
//! steps stay `Pending` and are never attempted.  A client conflict
//! suspends the run without marking anything failed, so the same steps
//! re-run cleanly once the user decides.

use std::sync::Arc;

use tracing::{info, warn};

use billflow_core::{ActionKind, ActionStatus, ActionStep, DeliveryMethod, Draft, validate};

use crate::error::{EngineError, EngineResult};
use crate::traits::{
    ClientConflict, ConflictDecision, CreateOutcome, DocumentRepository, EmailDispatch,
};

// ---------------------------------------------------------------------------
// Execution context and outcomes
// ---------------------------------------------------------------------------

/// Carry-over state threaded through a run and its resumptions.
///
/// `document_id` is preset when the flow already has a persisted document
/// (sends) or when a previous suspended run created one; `decision`
/// carries the user's conflict resolution into the retried create.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub document_id: Option<String>,
    pub decision: Option<ConflictDecision>,
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every step completed.
    Completed,
    /// A create detected a client conflict; the run is suspended and the
    /// triggering step is back to `Pending` for a clean re-run.
    ConflictPending(ClientConflict),
    /// A step failed; it is marked `Failed` and later steps were never
    /// attempted.
    Failed { action_id: String },
}

/// Result of a run, with the document it produced (when one was created
/// before the run ended).
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub document_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Runs a flow's queued actions against the persistence and delivery
/// collaborators.
pub struct ActionExecutor {
    documents: Arc<dyn DocumentRepository>,
    email: Arc<dyn EmailDispatch>,
}

impl ActionExecutor {
    pub fn new(documents: Arc<dyn DocumentRepository>, email: Arc<dyn EmailDispatch>) -> Self {
        Self { documents, email }
    }

    /// Execute every non-completed step in order.
    ///
    /// Refuses to start while validation has blocking problems.  Steps
    /// already `Completed` (from a run resumed after a conflict) are
    /// skipped, so a `send_email` never re-creates a document its earlier
    /// attempt already persisted.
    pub async fn execute_all(
        &self,
        draft: &Draft,
        actions: &mut [ActionStep],
        ctx: ExecutionContext,
    ) -> EngineResult<RunReport> {
        let report = validate(draft, actions);
        if !report.can_execute {
            return Err(EngineError::ValidationBlocked {
                reasons: report.blocking,
            });
        }

        actions.sort_by_key(|step| step.order);
        let mut document_id = ctx.document_id;

        for step in actions.iter_mut() {
            if step.status == ActionStatus::Completed {
                continue;
            }
            step.status = ActionStatus::InProgress;
            step.error = None;

            // Both kinds persist the draft first when no document exists
            // yet: an explicit create directly, a send implicitly.  A
            // client conflict from either suspends the run the same way.
            let result = match self.create_document(draft, ctx.decision, &mut document_id).await {
                Ok(Some(conflict)) => {
                    // Suspended, not failed: reset for a clean re-run.
                    step.status = ActionStatus::Pending;
                    info!(
                        action_id = %step.id,
                        client = %conflict.existing_client.info.name,
                        "create suspended on client conflict"
                    );
                    return Ok(RunReport {
                        outcome: RunOutcome::ConflictPending(conflict),
                        document_id,
                    });
                }
                Ok(None) => match step.kind {
                    ActionKind::CreateDocument => Ok(()),
                    ActionKind::SendEmail => match document_id.as_deref() {
                        Some(id) => self.send_email(draft, step, id).await,
                        None => Err(EngineError::InvalidFlowState(
                            "send with no document".to_string(),
                        )),
                    },
                },
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {
                    step.status = ActionStatus::Completed;
                    info!(action_id = %step.id, kind = ?step.kind, "action completed");
                }
                Err(e) => {
                    // Halt: later steps stay Pending, never attempted.
                    step.status = ActionStatus::Failed;
                    step.error = Some(e.to_string());
                    warn!(action_id = %step.id, kind = ?step.kind, error = %e, "action failed");
                    return Ok(RunReport {
                        outcome: RunOutcome::Failed {
                            action_id: step.id.clone(),
                        },
                        document_id,
                    });
                }
            }
        }

        Ok(RunReport {
            outcome: RunOutcome::Completed,
            document_id,
        })
    }

    /// Reset a failed step to `Pending` so a later run re-attempts it.
    pub fn retry_action(&self, actions: &mut [ActionStep], action_id: &str) -> EngineResult<()> {
        let step = actions
            .iter_mut()
            .find(|step| step.id == action_id)
            .ok_or_else(|| EngineError::InvalidFlowState(format!("no action {action_id}")))?;
        if step.status != ActionStatus::Failed {
            return Err(EngineError::InvalidFlowState(format!(
                "action {action_id} is not failed"
            )));
        }
        step.status = ActionStatus::Pending;
        step.error = None;
        Ok(())
    }

    /// Persist the draft unless this run already has a document.  Returns
    /// a conflict instead of a document id when the repository suspends
    /// the save.
    async fn create_document(
        &self,
        draft: &Draft,
        decision: Option<ConflictDecision>,
        document_id: &mut Option<String>,
    ) -> Result<Option<ClientConflict>, EngineError> {
        if document_id.is_some() {
            return Ok(None);
        }
        match self.documents.create(draft, decision).await? {
            CreateOutcome::Created { id } => {
                *document_id = Some(id);
                Ok(None)
            }
            CreateOutcome::ClientConflict(conflict) => Ok(Some(conflict)),
        }
    }

    /// Dispatch an already-persisted document.
    async fn send_email(
        &self,
        draft: &Draft,
        step: &ActionStep,
        id: &str,
    ) -> Result<(), EngineError> {
        // Explicit action detail wins; else fall back to the draft's own
        // contact for the delivery method.
        let fallback = match step.details.method {
            DeliveryMethod::Email => draft.client.email.as_deref(),
            DeliveryMethod::Sms | DeliveryMethod::Whatsapp => draft.client.phone.as_deref(),
        };
        let recipient = step
            .details
            .recipient
            .as_deref()
            .or(fallback)
            .ok_or_else(|| EngineError::ActionFailed {
                action_id: step.id.clone(),
                reason: "no recipient resolved".to_string(),
            })?;

        self.email
            .send(id, draft.document_type, step.details.method, recipient)
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
