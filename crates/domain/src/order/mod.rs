//! Order aggregate and related types.

mod aggregate;
mod service;
mod workflow;

pub use aggregate::{Order, OrderValues};
pub use service::{OrderService, PersistOutcome};
pub use workflow::{StaticWorkflowResolver, Transition, Workflow, WorkflowResolver};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// A required field is missing at persistence time.
    #[error("Validation failed: {field} is required")]
    Validation { field: &'static str },

    /// A setter was given a null or wrong-type reference.
    #[error("Invalid reference for {field}: {reason}")]
    InvalidReference { field: &'static str, reason: String },

    /// The store cannot change while line items are attached.
    #[error("Store cannot be changed on an order with line items")]
    StoreLocked,

    /// No workflow is registered for the order type.
    #[error("No workflow registered for order type {order_type}")]
    UnknownWorkflow { order_type: String },

    /// The transition does not exist or does not apply to the current state.
    #[error("Invalid transition: cannot {transition} from {state} state")]
    InvalidTransition { transition: String, state: String },
}
