//! Validation gate — executability and human-readable blocking/warning
//! reasons computed from the current draft state.
//!
//! Pure function over a draft and its queued actions; never performs I/O.
//! A missing client email is only a warning here — it becomes a hard
//! failure for the affected action at actual send time.

use serde::{Deserialize, Serialize};

use crate::document::{ActionKind, ActionStatus, ActionStep, Draft};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Outcome of a single field check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    Valid,
    Warning,
    Invalid,
}

/// A field check with an optional human-readable reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCheck {
    pub state: CheckState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FieldCheck {
    fn valid() -> Self {
        Self {
            state: CheckState::Valid,
            message: None,
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self {
            state: CheckState::Invalid,
            message: Some(message.into()),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            state: CheckState::Warning,
            message: Some(message.into()),
        }
    }

    /// Whether this check blocks execution.
    pub fn is_blocking(&self) -> bool {
        self.state == CheckState::Invalid
    }
}

/// The full validation picture for a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub client_name: FieldCheck,
    pub client_email: FieldCheck,
    pub total: FieldCheck,
    pub items: FieldCheck,
    /// Reasons that block execution.
    pub blocking: Vec<String>,
    /// Advisory reasons that do not block execution.
    pub warnings: Vec<String>,
    /// True iff no blocking errors exist and at least one action is queued.
    pub can_execute: bool,
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Compute executability and reasons for the current draft state.
pub fn validate(draft: &Draft, actions: &[ActionStep]) -> ValidationReport {
    let client_name = if draft.client.name.trim().is_empty() {
        FieldCheck::invalid("client name is required")
    } else {
        FieldCheck::valid()
    };

    let total = if draft.total() > 0.0 {
        FieldCheck::valid()
    } else {
        FieldCheck::invalid("total must be greater than zero")
    };

    let items = if draft.items.is_empty() {
        FieldCheck::invalid("at least one line item is required")
    } else {
        FieldCheck::valid()
    };

    let email_needed = actions
        .iter()
        .any(|a| a.kind == ActionKind::SendEmail && a.status == ActionStatus::Pending);
    let email_missing = draft
        .client
        .email
        .as_deref()
        .map_or(true, |e| e.trim().is_empty());
    let client_email = if email_needed && email_missing {
        FieldCheck::warning("client email is missing; sending will fail without one")
    } else {
        FieldCheck::valid()
    };

    let mut blocking = Vec::new();
    let mut warnings = Vec::new();
    for check in [&client_name, &client_email, &total, &items] {
        match (check.state, &check.message) {
            (CheckState::Invalid, Some(msg)) => blocking.push(msg.clone()),
            (CheckState::Warning, Some(msg)) => warnings.push(msg.clone()),
            _ => {}
        }
    }

    let can_execute = blocking.is_empty() && !actions.is_empty();

    ValidationReport {
        client_name,
        client_email,
        total,
        items,
        blocking,
        warnings,
        can_execute,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
