//! Parsed intent types — the tagged union produced by the parsing
//! collaborator.
//!
//! [`ParseResult`] is a discriminated sum type over the six workflow
//! variants, dispatched exhaustively by the engine's router.  The parsing
//! call itself is external; this crate only consumes its shape.
//!
//! [`ParseResult::from_value`] implements the deliberate degraded path: a
//! payload with a missing or unrecognized `intent_type` becomes a default
//! `document_action` request carrying a `parse_error`, so the user always
//! lands on an editable draft rather than a hard failure.

use serde::{Deserialize, Serialize};

use crate::document::{
    ActionKind, ClientInfo, DeliveryMethod, Dimensions, DocumentType, LineItem, MeasurementType,
};

// ---------------------------------------------------------------------------
// Tagged union
// ---------------------------------------------------------------------------

/// The classified purpose of a parsed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "intent_type", rename_all = "snake_case")]
pub enum ParseResult {
    DocumentAction(ActionRequest),
    InformationQuery(QueryRequest),
    DocumentClone(CloneRequest),
    DocumentMerge(MergeRequest),
    DocumentSend(SendRequest),
    DocumentTransform(TransformRequest),
}

impl ParseResult {
    /// The wire name of this variant's intent type.
    pub fn intent_name(&self) -> &'static str {
        match self {
            Self::DocumentAction(_) => "document_action",
            Self::InformationQuery(_) => "information_query",
            Self::DocumentClone(_) => "document_clone",
            Self::DocumentMerge(_) => "document_merge",
            Self::DocumentSend(_) => "document_send",
            Self::DocumentTransform(_) => "document_transform",
        }
    }

    /// Interpret a raw parse payload, degrading instead of failing.
    ///
    /// A missing or unrecognized `intent_type` yields a default
    /// `document_action` request with `parse_error` set and a single
    /// default `create_document` action.
    pub fn from_value(value: serde_json::Value) -> Self {
        match serde_json::from_value::<ParseResult>(value) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "unrecognized parse payload, degrading to document_action");
                Self::DocumentAction(ActionRequest::degraded(e.to_string()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// document_action
// ---------------------------------------------------------------------------

/// A line item as it arrives from the parser, before id assignment and
/// defensive recovery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedItem {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_type: Option<MeasurementType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
}

impl ParsedItem {
    /// Materialize a line item with a fresh id, defaulting and recovering
    /// missing or broken fields: quantity falls back to 1, and a missing
    /// rate is recomputed from the parsed total.
    pub fn to_line_item(&self) -> LineItem {
        let quantity = self
            .quantity
            .filter(|q| q.is_finite() && *q > 0.0)
            .unwrap_or(1.0);
        let rate = match self.rate {
            Some(r) if r.is_finite() && r >= 0.0 => r,
            _ => match self.total {
                Some(t) if t.is_finite() && t > 0.0 => t / quantity,
                _ => 0.0,
            },
        };
        let mut item = LineItem::new(
            self.description.clone(),
            quantity,
            self.unit.clone().unwrap_or_else(|| "unit".to_string()),
            rate,
        );
        if let Some(measurement) = self.measurement_type {
            item.measurement_type = measurement;
        }
        item.dimensions = self.dimensions.clone();
        item
    }
}

/// A queued action as it arrives from the parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

/// Payload for the `document_action` variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub document_type: DocumentType,
    #[serde(default)]
    pub client: ClientInfo,
    #[serde(default)]
    pub items: Vec<ParsedItem>,
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub actions: Vec<ParsedAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Parser confidence in `[0, 1]`; zero when absent.
    #[serde(default)]
    pub confidence: f64,
    /// Set when this request is a degraded fallback for an unusable parse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl ActionRequest {
    /// The degraded-but-usable fallback request for an unusable parse.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            actions: vec![ParsedAction {
                kind: ActionKind::CreateDocument,
                recipient: None,
                frequency: None,
            }],
            parse_error: Some(reason.into()),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// information_query
// ---------------------------------------------------------------------------

/// An inclusive date range filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: chrono::NaiveDate,
    pub to: chrono::NaiveDate,
}

/// Payload for the `information_query` variant — a structured, read-only
/// query executed by an external collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,
    #[serde(default)]
    pub document_types: Vec<DocumentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

// ---------------------------------------------------------------------------
// document_clone
// ---------------------------------------------------------------------------

/// An edit applied to every source item matching a keyword.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateItem {
    /// Fuzzy keyword matched against item descriptions.
    #[serde(rename = "match")]
    pub match_keyword: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
}

/// A new item appended during a clone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_type: Option<MeasurementType>,
}

/// The set of edits applied when cloning a source document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Modifications {
    #[serde(default)]
    pub update_items: Vec<UpdateItem>,
    #[serde(default)]
    pub remove_items: Vec<String>,
    #[serde(default)]
    pub add_items: Vec<NewItem>,
    /// Explicit final total, overriding the computed subtotal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_total: Option<f64>,
    /// Single-item shortcut: replaces the first item's rate when no
    /// `update_items` were specified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_amount: Option<f64>,
}

/// Payload for the `document_clone` variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneRequest {
    pub source_client: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(default)]
    pub modifications: Modifications,
}

// ---------------------------------------------------------------------------
// document_merge
// ---------------------------------------------------------------------------

/// Payload for the `document_merge` variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequest {
    pub source_clients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
}

// ---------------------------------------------------------------------------
// document_send
// ---------------------------------------------------------------------------

/// Which of a client's documents a send or transform targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSelector {
    /// The most recently created document.
    Last,
    /// Any recent document (caller picks when ambiguous).
    Recent,
}

impl Default for DocumentSelector {
    fn default() -> Self {
        Self::Last
    }
}

/// Payload for the `document_send` variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(default)]
    pub selector: DocumentSelector,
    #[serde(default)]
    pub delivery_method: DeliveryMethod,
    /// A separately named recipient client overriding the document's own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

// ---------------------------------------------------------------------------
// document_transform
// ---------------------------------------------------------------------------

/// The source document a transform operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformSource {
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(default)]
    pub selector: DocumentSelector,
}

/// Type-conversion settings for a transform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversion {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<DocumentType>,
}

/// Payload for the `document_transform` variant.
///
/// Split and schedule configuration are carried through untouched for the
/// host; the engine only resolves the source and applies the conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRequest {
    pub source: TransformSource,
    #[serde(default)]
    pub conversion: Conversion,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub split: serde_json::Value,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub schedule: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clone_intent_deserializes() {
        let value = json!({
            "intent_type": "document_clone",
            "source_client": "John",
            "target_client": "Mike",
            "modifications": {
                "remove_items": ["rush fee"],
                "new_total": 450.0
            }
        });
        match ParseResult::from_value(value) {
            ParseResult::DocumentClone(req) => {
                assert_eq!(req.source_client, "John");
                assert_eq!(req.target_client.as_deref(), Some("Mike"));
                assert_eq!(req.modifications.remove_items, vec!["rush fee"]);
                assert_eq!(req.modifications.new_total, Some(450.0));
            }
            other => panic!("expected DocumentClone, got {other:?}"),
        }
    }

    #[test]
    fn missing_intent_type_degrades_to_document_action() {
        let value = json!({"transcript": "invoice John $500"});
        match ParseResult::from_value(value) {
            ParseResult::DocumentAction(req) => {
                assert!(req.parse_error.is_some());
                assert_eq!(req.confidence, 0.0);
                assert_eq!(req.items.len(), 0);
                assert_eq!(req.document_type, DocumentType::Invoice);
                assert_eq!(req.actions.len(), 1);
                assert_eq!(req.actions[0].kind, ActionKind::CreateDocument);
            }
            other => panic!("expected degraded DocumentAction, got {other:?}"),
        }
    }

    #[test]
    fn unknown_intent_type_degrades() {
        let value = json!({"intent_type": "document_teleport"});
        let parsed = ParseResult::from_value(value);
        assert_eq!(parsed.intent_name(), "document_action");
    }

    #[test]
    fn send_defaults() {
        let value = json!({
            "intent_type": "document_send",
            "client_name": "Jackson"
        });
        match ParseResult::from_value(value) {
            ParseResult::DocumentSend(req) => {
                assert_eq!(req.selector, DocumentSelector::Last);
                assert_eq!(req.delivery_method, DeliveryMethod::Email);
                assert!(req.recipient.is_none());
            }
            other => panic!("expected DocumentSend, got {other:?}"),
        }
    }

    #[test]
    fn transform_passthrough_fields_survive() {
        let value = json!({
            "intent_type": "document_transform",
            "source": {"client_name": "Jackson"},
            "conversion": {"enabled": true, "target_type": "estimate"},
            "split": {"parts": 3}
        });
        match ParseResult::from_value(value) {
            ParseResult::DocumentTransform(req) => {
                assert!(req.conversion.enabled);
                assert_eq!(req.conversion.target_type, Some(DocumentType::Estimate));
                assert_eq!(req.split["parts"], 3);
                assert!(req.schedule.is_null());
            }
            other => panic!("expected DocumentTransform, got {other:?}"),
        }
    }
}
