//! Document domain types — line items, drafts, action steps, and the
//! records returned by the repository collaborators.
//!
//! The central invariant lives on [`LineItem`]: `total == quantity * rate`
//! while the total is derived.  An explicit edit to `total` breaks the
//! derived relationship until quantity or rate is touched again, which
//! re-derives it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

// ---------------------------------------------------------------------------
// Document and measurement kinds
// ---------------------------------------------------------------------------

/// The kind of document a draft or stored record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// A billable invoice (the default when the parse omits a type).
    Invoice,
    /// A non-binding estimate.
    Estimate,
    /// A formal quote.
    Quote,
    /// A payment receipt.
    Receipt,
}

impl Default for DocumentType {
    fn default() -> Self {
        Self::Invoice
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invoice => write!(f, "invoice"),
            Self::Estimate => write!(f, "estimate"),
            Self::Quote => write!(f, "quote"),
            Self::Receipt => write!(f, "receipt"),
        }
    }
}

/// How a line item is measured and priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    Service,
    Sqft,
    LinearFt,
    Unit,
    Hour,
    Job,
}

impl Default for MeasurementType {
    fn default() -> Self {
        Self::Unit
    }
}

/// Physical dimensions attached to area- or length-measured items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub length: f64,
    pub unit: String,
}

// ---------------------------------------------------------------------------
// Line items
// ---------------------------------------------------------------------------

/// A single billable line on a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Opaque identifier, unique within a document.
    pub id: String,
    pub description: String,
    /// Quantity, always >= 0.
    pub quantity: f64,
    pub unit: String,
    /// Unit rate, always >= 0.
    pub rate: f64,
    /// Line total.  Derived from `quantity * rate` unless overridden.
    pub total: f64,
    /// Whether `total` was directly edited by the user.
    #[serde(default)]
    pub total_overridden: bool,
    #[serde(default)]
    pub measurement_type: MeasurementType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
}

impl LineItem {
    /// Create a derived-total line item with a fresh id.
    pub fn new(
        description: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
        rate: f64,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            description: description.into(),
            quantity,
            unit: unit.into(),
            rate,
            total: quantity * rate,
            total_overridden: false,
            measurement_type: MeasurementType::default(),
            dimensions: None,
        }
    }

    /// Set the quantity, re-deriving the total and clearing any override.
    pub fn set_quantity(&mut self, quantity: f64) -> CoreResult<()> {
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(CoreError::InvalidQuantity { value: quantity });
        }
        self.quantity = quantity;
        self.rederive_total();
        Ok(())
    }

    /// Set the rate, re-deriving the total and clearing any override.
    pub fn set_rate(&mut self, rate: f64) -> CoreResult<()> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(CoreError::InvalidRate { value: rate });
        }
        self.rate = rate;
        self.rederive_total();
        Ok(())
    }

    /// Directly override the total, breaking the derived relationship.
    pub fn set_total(&mut self, total: f64) -> CoreResult<()> {
        if !total.is_finite() {
            return Err(CoreError::InvalidTotal { value: total });
        }
        self.total = total;
        self.total_overridden = true;
        Ok(())
    }

    fn rederive_total(&mut self) {
        self.total = self.quantity * self.rate;
        self.total_overridden = false;
    }
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

/// Client contact fields carried on a draft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// A stored client record, as known to the client repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: String,
    #[serde(flatten)]
    pub info: ClientInfo,
}

/// A ranked, similarity-scored lookup alternative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSuggestion {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Similarity to the queried name, in `[0, 1]`.
    pub similarity: f64,
}

impl ClientSuggestion {
    /// Whether this suggestion is an exact match on the canonicalized name.
    pub fn is_exact(&self) -> bool {
        self.similarity >= 1.0
    }
}

// ---------------------------------------------------------------------------
// Stored documents
// ---------------------------------------------------------------------------

/// A document already persisted by the repository, used as a clone,
/// merge, send, or transform source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    pub doc_type: DocumentType,
    /// Title or number shown in pickers.
    pub title: String,
    pub client: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_phone: Option<String>,
}

// ---------------------------------------------------------------------------
// Action steps
// ---------------------------------------------------------------------------

/// The side-effecting operation an action step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CreateDocument,
    SendEmail,
}

/// Per-step execution status.
///
/// `Completed` is terminal; `Failed` is terminal unless explicitly retried
/// back to `Pending`.  At most one step is `InProgress` at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// How a sent document should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Email,
    Sms,
    Whatsapp,
}

impl Default for DeliveryMethod {
    fn default() -> Self {
        Self::Email
    }
}

/// Optional details attached to an action step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionDetails {
    /// Explicit recipient override (takes precedence over the draft client).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default)]
    pub method: DeliveryMethod,
}

/// One queued side-effecting operation with independent status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStep {
    pub id: String,
    pub kind: ActionKind,
    /// 1-based execution order, strictly increasing within a draft.
    pub order: u32,
    pub status: ActionStatus,
    #[serde(default)]
    pub details: ActionDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionStep {
    /// Create a pending step with a fresh id.
    pub fn new(kind: ActionKind, order: u32) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            kind,
            order,
            status: ActionStatus::Pending,
            details: ActionDetails::default(),
            error: None,
        }
    }

    /// Attach details, builder-style.
    pub fn with_details(mut self, details: ActionDetails) -> Self {
        self.details = details;
        self
    }
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// The mutable, user-editable in-progress document state before execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub document_type: DocumentType,
    #[serde(default)]
    pub client: ClientInfo,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<chrono::NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Explicit document total (e.g. a clone's `new_total`), overriding
    /// the computed subtotal-plus-tax.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_override: Option<f64>,
    /// Set when the parse degraded; surfaced as a non-blocking warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl Draft {
    /// Sum of line-item totals.
    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(|item| item.total).sum()
    }

    /// The document total: the explicit override when present, else
    /// subtotal plus tax.
    pub fn total(&self) -> f64 {
        self.total_override
            .unwrap_or_else(|| self.subtotal() * (1.0 + self.tax_rate))
    }

    /// Overwrite the client fields from an exact-match suggestion.
    pub fn apply_client(&mut self, suggestion: &ClientSuggestion) {
        self.client = ClientInfo {
            name: suggestion.name.clone(),
            email: suggestion.email.clone(),
            phone: suggestion.phone.clone(),
            address: suggestion.address.clone(),
        };
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
