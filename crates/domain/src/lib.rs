//! Domain layer for the commerce bookkeeping core.
//!
//! This crate provides:
//! - Order aggregate with default population and line item back-references
//! - Workflow model governing the order state field
//! - Order service running the persist and delete cycles against a store
//! - Promotion usage ledger for redemption counting

pub mod context;
pub mod error;
pub mod order;
pub mod promotion;

pub use context::{Account, Profile, RequestContext};
pub use error::DomainError;
pub use order::{
    Order, OrderError, OrderService, OrderValues, PersistOutcome, StaticWorkflowResolver,
    Transition, Workflow, WorkflowResolver,
};
pub use promotion::{Coupon, Promotion, PromotionUsageLedger};
pub use store::LineItem;
