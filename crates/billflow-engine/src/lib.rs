//! Orchestration engine for Billflow — routes parsed intents into
//! per-variant workflows and drives them to completion.
//!
//! The engine is host-agnostic: all I/O goes through the collaborator
//! traits in [`traits`], which hosts implement over their own transport
//! and storage.  A typical embedding wires up:
//!
//! - [`router::IntentRouter`] — dispatches a [`billflow_core::ParseResult`]
//!   to its variant-specific [`flow::FlowState`], resolving source
//!   documents and recipients along the way.
//! - [`executor::ActionExecutor`] — runs the queued actions sequentially
//!   behind the validation gate, halting on failure and suspending on
//!   client conflicts.
//! - [`session::SessionManager`] — debounced autosave, resume by replay,
//!   and completion of the active session.

pub mod config;
pub mod debounce;
pub mod error;
pub mod executor;
pub mod flow;
pub mod resolver;
pub mod router;
pub mod session;
pub mod traits;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use executor::{ActionExecutor, ExecutionContext, RunOutcome, RunReport};
pub use flow::{
    ActionFlow, ClientPicker, CloneFlow, FlowState, MergeFlow, MergeSlot, QueryFlow, SendFlow,
    TransformFlow,
};
pub use resolver::{ClientResolver, DocumentResolver, Resolution, SuggestResult};
pub use router::IntentRouter;
pub use session::SessionManager;
pub use traits::{
    ClientConflict, ClientRepository, CollaboratorError, ConflictDecision, CreateOutcome,
    DocumentFilter, DocumentRepository, EmailDispatch, QueryExecutor, SearchOutcome, SessionStore,
    SuggestOutcome,
};
