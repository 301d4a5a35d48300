//! # Declarative
//!
//! A framework for reconciling declared configuration against a remote API.
//!
//! Each resource kind declares an attribute [`Schema`] and implements
//! [`Resource`] over a typed model. The framework handles the rest:
//!
//! - **Planning**: builds a planned record from config and prior state,
//!   applies plan modifiers, and picks an [`Action`]. Identical config and
//!   state always plan a no-op.
//! - **Values**: every attribute is tri-state ([`Value`]): null, unknown until
//!   apply, or known. Unknowns never reach persisted state.
//! - **Secrets**: write-only inputs are tracked by a version token; the
//!   stored ciphertext is echoed back until the version changes.
//! - **Execution**: applies planned changes in parallel with progress and
//!   confirmation callbacks.
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Attribute, Context, DynResource, Schema};
//!
//! let change = resource.plan(Some(&config), prior.as_ref())?;
//! if change.has_changes() {
//!     let state = resource.apply(&Context::new(), &change, Some(&config), prior.as_ref())?;
//! }
//! ```
//!
//! ## Host Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This keeps the crate free of any particular terminal UI.

pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod import;
pub mod json;
pub mod modifiers;
pub mod order;
pub mod planner;
pub mod resource;
pub mod schema;
pub mod secret;
pub mod types;
pub mod validators;
pub mod value;

// Re-export main types at crate root
pub use context::{AutoConfirm, AutoDecline, Cancellation, ConfirmCallback, Context, NoProgress, ProgressCallback};
pub use diff::{AttributeChange, DiffSummary, changed_attributes};
pub use error::{Error, ErrorCategory, Result};
pub use executor::{Applied, PendingChange, execute};
pub use import::ImportKeys;
pub use modifiers::Modifier;
pub use planner::PlannedChange;
pub use resource::{BoxedResource, DynResource, Resource};
pub use schema::{Attribute, Mode, Schema};
pub use secret::{Outgoing, SecretField, SecretInput, SecretState};
pub use types::{Action, ApplyResult, Diagnostic, ExecuteOptions, ExecuteSummary, Operation, Severity};
pub use validators::Validator;
pub use value::Value;
