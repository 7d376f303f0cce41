//! Order aggregate implementation.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use common::{LineItemId, OrderId, ProfileId, StoreId, UserId};
use store::OrderRecord;

use crate::context::{Account, Profile, RequestContext};

use super::OrderError;

/// Order type used when none is given.
pub(crate) const DEFAULT_ORDER_TYPE: &str = "default";

/// State used when no workflow supplies an initial state.
const DEFAULT_STATE: &str = "draft";

/// Initial values for a new order.
#[derive(Debug, Clone, Default)]
pub struct OrderValues {
    pub order_type: Option<String>,
    pub order_number: Option<String>,
    pub store_id: Option<StoreId>,
    /// Owner account; takes precedence over `owner_id` and supplies the
    /// email default.
    pub owner: Option<Account>,
    pub owner_id: Option<UserId>,
    pub email: Option<String>,
    pub hostname: Option<String>,
    pub billing_profile_id: Option<ProfileId>,
    pub state: Option<String>,
    pub line_item_ids: Vec<LineItemId>,
    pub data: HashMap<String, serde_json::Value>,
}

impl OrderValues {
    /// Creates values for an order in the given store.
    pub fn for_store(store_id: StoreId) -> Self {
        Self {
            store_id: Some(store_id),
            ..Default::default()
        }
    }
}

/// Order aggregate root.
///
/// Holds the order's identity, status, references and the ordered list of
/// line item ids. Line items themselves live in the line item store and
/// point back at their order once the order has been persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: OrderId,
    order_type: String,
    order_number: String,
    store_id: Option<StoreId>,
    owner_id: Option<UserId>,
    /// Email of the owner, when known from an owner account or the acting identity.
    owner_email: Option<String>,
    email: Option<String>,
    hostname: Option<String>,
    billing_profile_id: Option<ProfileId>,
    state: String,
    line_item_ids: Vec<LineItemId>,
    data: HashMap<String, serde_json::Value>,
    created_at: DateTime<Utc>,
    changed_at: DateTime<Utc>,
    /// True until the first successful write.
    is_new: bool,
}

impl Order {
    /// Creates a new, not yet persisted order.
    ///
    /// When `values` carries no owner, the acting identity becomes the owner.
    pub fn create(values: OrderValues, actor: &Account) -> Self {
        let now = Utc::now();
        let (owner_id, owner_email) = match (values.owner, values.owner_id) {
            (Some(owner), _) => (owner.id, Some(owner.email)),
            (None, Some(owner_id)) if owner_id == actor.id => {
                (owner_id, Some(actor.email.clone()))
            }
            (None, Some(owner_id)) => (owner_id, None),
            (None, None) => (actor.id, Some(actor.email.clone())),
        };

        let mut line_item_ids = Vec::with_capacity(values.line_item_ids.len());
        for id in values.line_item_ids {
            if !line_item_ids.contains(&id) {
                line_item_ids.push(id);
            }
        }

        Self {
            id: OrderId::new(),
            order_type: values
                .order_type
                .unwrap_or_else(|| DEFAULT_ORDER_TYPE.to_string()),
            order_number: values.order_number.unwrap_or_default(),
            store_id: values.store_id,
            owner_id: Some(owner_id),
            owner_email,
            email: values.email,
            hostname: values.hostname,
            billing_profile_id: values.billing_profile_id,
            state: values.state.unwrap_or_else(|| DEFAULT_STATE.to_string()),
            line_item_ids,
            data: values.data,
            created_at: now,
            changed_at: now,
            is_new: true,
        }
    }

    /// Rebuilds a persisted order from its stored record.
    pub fn from_record(record: OrderRecord) -> Self {
        Self {
            id: record.id,
            order_type: record.order_type,
            order_number: record.order_number,
            store_id: Some(record.store_id),
            owner_id: record.owner_id,
            owner_email: None,
            email: record.email,
            hostname: record.hostname,
            billing_profile_id: record.billing_profile_id,
            state: record.state,
            line_item_ids: record.line_item_ids,
            data: record.data,
            created_at: record.created_at,
            changed_at: record.changed_at,
            is_new: false,
        }
    }

    /// Builds the stored record, enforcing required fields.
    pub fn to_record(&self) -> Result<OrderRecord, OrderError> {
        let store_id = self
            .store_id
            .ok_or(OrderError::Validation { field: "store_id" })?;
        if !self.is_new && self.order_number.is_empty() {
            return Err(OrderError::Validation {
                field: "order_number",
            });
        }

        Ok(OrderRecord {
            id: self.id,
            order_type: self.order_type.clone(),
            order_number: self.order_number.clone(),
            store_id,
            owner_id: self.owner_id,
            email: self.email.clone(),
            hostname: self.hostname.clone(),
            billing_profile_id: self.billing_profile_id,
            state: self.state.clone(),
            line_item_ids: self.line_item_ids.clone(),
            data: self.data.clone(),
            created_at: self.created_at,
            changed_at: self.changed_at,
        })
    }
}

// Persistence hooks
impl Order {
    /// Populates defaults before every write.
    ///
    /// An unset owner becomes the acting identity. On the first write only,
    /// an unset hostname becomes the caller's address and an unset email
    /// becomes the owner's email.
    pub fn before_persist(&mut self, ctx: &RequestContext) {
        if self.owner_id.is_none() {
            self.owner_id = Some(ctx.actor.id);
            self.owner_email = Some(ctx.actor.email.clone());
        }

        if self.is_new {
            if is_blank(&self.hostname) && !ctx.client_ip.is_empty() {
                self.hostname = Some(ctx.client_ip.clone());
            }

            if is_blank(&self.email)
                && let Some(email) = self.resolve_owner_email(&ctx.actor)
            {
                self.email = Some(email);
            }
        }

        self.changed_at = Utc::now();
    }

    /// Marks the order as persisted.
    pub(crate) fn mark_persisted(&mut self) {
        self.is_new = false;
    }

    /// Defaults an empty order number to the order id.
    ///
    /// Returns true if the order number changed and needs a corrective write.
    pub(crate) fn default_order_number(&mut self) -> bool {
        if self.order_number.is_empty() {
            self.order_number = self.id.to_string();
            self.touch();
            true
        } else {
            false
        }
    }

    /// Returns the union of line items referenced by `orders`, each id once,
    /// in first-seen order.
    pub fn cascade_line_item_ids(orders: &[Order]) -> Vec<LineItemId> {
        let mut seen = HashSet::new();
        orders
            .iter()
            .flat_map(|order| order.line_item_ids.iter().copied())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    fn resolve_owner_email(&self, actor: &Account) -> Option<String> {
        if let Some(email) = self.owner_email.as_ref().filter(|e| !e.is_empty()) {
            return Some(email.clone());
        }
        (self.owner_id == Some(actor.id) && !actor.email.is_empty()).then(|| actor.email.clone())
    }

    fn touch(&mut self) {
        self.changed_at = Utc::now();
    }
}

// Query methods
impl Order {
    /// Returns the order id.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the order type (bundle) selecting the workflow.
    pub fn order_type(&self) -> &str {
        &self.order_type
    }

    /// Returns the customer-facing order number. Empty until first persisted
    /// unless set explicitly.
    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    /// Returns the current workflow state.
    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn store_id(&self) -> Option<StoreId> {
        self.store_id
    }

    pub fn owner_id(&self) -> Option<UserId> {
        self.owner_id
    }

    pub fn billing_profile_id(&self) -> Option<ProfileId> {
        self.billing_profile_id
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// Returns the attached line item ids in insertion order.
    pub fn line_item_ids(&self) -> &[LineItemId] {
        &self.line_item_ids
    }

    /// Returns true if the line item is attached to this order.
    pub fn has_line_item(&self, item: impl Into<LineItemId>) -> bool {
        self.line_item_ids.contains(&item.into())
    }

    /// Returns the auxiliary data map.
    pub fn data(&self) -> &HashMap<String, serde_json::Value> {
        &self.data
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn changed_at(&self) -> DateTime<Utc> {
        self.changed_at
    }

    /// Returns true if the order has never been persisted.
    pub fn is_new(&self) -> bool {
        self.is_new
    }
}

// Mutators
impl Order {
    pub fn set_order_number(&mut self, order_number: impl Into<String>) -> &mut Self {
        self.order_number = order_number.into();
        self.touch();
        self
    }

    /// Sets the store.
    ///
    /// An assigned store cannot be replaced while line items are attached.
    pub fn set_store_id(&mut self, store_id: StoreId) -> Result<&mut Self, OrderError> {
        if store_id.is_nil() {
            return Err(null_reference("store_id"));
        }
        if let Some(current) = self.store_id
            && current != store_id
            && !self.line_item_ids.is_empty()
        {
            return Err(OrderError::StoreLocked);
        }
        self.store_id = Some(store_id);
        self.touch();
        Ok(self)
    }

    /// Sets the owner from an account, remembering its email.
    pub fn set_owner(&mut self, owner: &Account) -> Result<&mut Self, OrderError> {
        if owner.id.is_nil() {
            return Err(null_reference("owner"));
        }
        self.owner_id = Some(owner.id);
        self.owner_email = Some(owner.email.clone());
        self.touch();
        Ok(self)
    }

    /// Sets the owner by id.
    pub fn set_owner_id(&mut self, owner_id: UserId) -> Result<&mut Self, OrderError> {
        if owner_id.is_nil() {
            return Err(null_reference("owner"));
        }
        if self.owner_id != Some(owner_id) {
            self.owner_email = None;
        }
        self.owner_id = Some(owner_id);
        self.touch();
        Ok(self)
    }

    /// Sets the billing profile. Only billing profiles are accepted.
    pub fn set_billing_profile(&mut self, profile: &Profile) -> Result<&mut Self, OrderError> {
        if !profile.is_billing() {
            return Err(OrderError::InvalidReference {
                field: "billing_profile",
                reason: format!("expected a billing profile, got {}", profile.profile_type),
            });
        }
        self.set_billing_profile_id(profile.id)
    }

    pub fn set_billing_profile_id(
        &mut self,
        profile_id: ProfileId,
    ) -> Result<&mut Self, OrderError> {
        if profile_id.is_nil() {
            return Err(null_reference("billing_profile"));
        }
        self.billing_profile_id = Some(profile_id);
        self.touch();
        Ok(self)
    }

    pub fn set_email(&mut self, email: impl Into<String>) -> &mut Self {
        self.email = Some(email.into());
        self.touch();
        self
    }

    pub fn set_hostname(&mut self, hostname: impl Into<String>) -> &mut Self {
        self.hostname = Some(hostname.into());
        self.touch();
        self
    }

    pub fn set_data(&mut self, data: HashMap<String, serde_json::Value>) -> &mut Self {
        self.data = data;
        self.touch();
        self
    }

    /// Sets a single auxiliary data entry.
    pub fn set_data_value(&mut self, key: impl Into<String>, value: serde_json::Value) -> &mut Self {
        self.data.insert(key.into(), value);
        self.touch();
        self
    }

    pub fn set_created_at(&mut self, created_at: DateTime<Utc>) -> &mut Self {
        self.created_at = created_at;
        self.touch();
        self
    }

    /// Replaces the line item list, dropping duplicate ids.
    pub fn set_line_items(&mut self, items: impl IntoIterator<Item = LineItemId>) -> &mut Self {
        self.line_item_ids.clear();
        for id in items {
            if !self.line_item_ids.contains(&id) {
                self.line_item_ids.push(id);
            }
        }
        self.touch();
        self
    }

    /// Appends a line item unless it is already attached.
    pub fn add_line_item(&mut self, item: impl Into<LineItemId>) -> &mut Self {
        let id = item.into();
        if !self.line_item_ids.contains(&id) {
            self.line_item_ids.push(id);
            self.touch();
        }
        self
    }

    /// Removes a line item. No-op if it is not attached.
    pub fn remove_line_item(&mut self, item: impl Into<LineItemId>) -> &mut Self {
        let id = item.into();
        if let Some(index) = self.line_item_ids.iter().position(|i| *i == id) {
            self.line_item_ids.remove(index);
            self.touch();
        }
        self
    }

    /// Moves the order to a new workflow state. Validation happens in the
    /// order service.
    pub(crate) fn set_state(&mut self, state: impl Into<String>) {
        self.state = state.into();
        self.touch();
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(str::is_empty)
}

fn null_reference(field: &'static str) -> OrderError {
    OrderError::InvalidReference {
        field,
        reason: "null reference".to_string(),
    }
}
