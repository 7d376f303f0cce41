//! Caller-supplied context for order operations.
//!
//! The acting identity and the client address are passed in explicitly at
//! each call site instead of being read from global state.

use common::{ProfileId, UserId};
use serde::{Deserialize, Serialize};

/// A user account reference together with its email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub email: String,
}

impl Account {
    /// Creates an account reference.
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

/// A customer profile reference.
///
/// Only profiles of type [`Profile::BILLING`] may be used as an order's
/// billing profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub profile_type: String,
}

impl Profile {
    /// Profile type accepted as a billing profile.
    pub const BILLING: &'static str = "billing";

    /// Creates a billing profile reference.
    pub fn billing(id: ProfileId) -> Self {
        Self {
            id,
            profile_type: Self::BILLING.to_string(),
        }
    }

    /// Returns true if this is a billing profile.
    pub fn is_billing(&self) -> bool {
        self.profile_type == Self::BILLING
    }
}

/// Context of the request performing an order operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// The identity performing the operation.
    pub actor: Account,

    /// Network address of the caller.
    pub client_ip: String,
}

impl RequestContext {
    /// Creates a request context.
    pub fn new(actor: Account, client_ip: impl Into<String>) -> Self {
        Self {
            actor,
            client_ip: client_ip.into(),
        }
    }
}
