//! Domain layer for Billflow — the intent-driven document workflow
//! orchestrator.
//!
//! This crate provides:
//!
//! - **Parsed intents**: The [`intent::ParseResult`] tagged union over the
//!   six workflow variants, with a degraded fallback for unusable parses.
//! - **Documents**: Line items with the derived-total invariant, drafts,
//!   action steps, and the records returned by repository collaborators.
//! - **Modification engine**: Pure clone and merge transformations via
//!   [`modify::apply_clone`] and [`modify::combine_for_merge`].
//! - **Validation gate**: [`validate::validate`] computes executability
//!   and human-readable reasons from draft state.
//! - **Sessions**: The serializable [`session::SessionSnapshot`].
//!
//! Everything here is pure and host-agnostic; orchestration and I/O live
//! in `billflow-engine`.

pub mod document;
pub mod error;
pub mod intent;
pub mod modify;
pub mod session;
pub mod validate;

pub use document::{
    ActionDetails, ActionKind, ActionStatus, ActionStep, ClientInfo, ClientRecord,
    ClientSuggestion, DeliveryMethod, Dimensions, DocumentType, Draft, LineItem, MeasurementType,
    SourceDocument,
};
pub use error::{CoreError, CoreResult};
pub use intent::{
    ActionRequest, CloneRequest, Conversion, DateRange, DocumentSelector, MergeRequest,
    Modifications, NewItem, ParseResult, ParsedAction, ParsedItem, QueryRequest, SendRequest,
    TransformRequest, TransformSource, UpdateItem,
};
pub use modify::{CloneOutcome, MergeOutcome, apply_clone, combine_for_merge, matches_keyword};
pub use session::{SessionSnapshot, SessionStatus};
pub use validate::{CheckState, FieldCheck, ValidationReport, validate};
