//! Order service running the persist and delete cycles.

use common::OrderId;
use store::{LineItemStore, OrderStore};

use crate::context::{Account, RequestContext};
use crate::error::DomainError;

use super::{Order, OrderError, OrderValues, StaticWorkflowResolver, Workflow, WorkflowResolver};

/// What a save did beyond writing the order itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    /// True if the order number was defaulted to the id, costing one
    /// corrective order write.
    pub order_number_defaulted: bool,

    /// Number of line items whose back-reference was written.
    pub back_references_fixed: usize,
}

/// Service for managing orders.
///
/// Wraps a store holding both orders and line items, and a workflow resolver
/// for the order state field.
pub struct OrderService<S, W = StaticWorkflowResolver>
where
    S: OrderStore + LineItemStore,
    W: WorkflowResolver,
{
    store: S,
    workflows: W,
}

impl<S> OrderService<S>
where
    S: OrderStore + LineItemStore,
{
    /// Creates a new order service using the default workflows.
    pub fn new(store: S) -> Self {
        Self::with_workflows(store, StaticWorkflowResolver::default())
    }
}

impl<S, W> OrderService<S, W>
where
    S: OrderStore + LineItemStore,
    W: WorkflowResolver,
{
    /// Creates a new order service with a custom workflow resolver.
    pub fn with_workflows(store: S, workflows: W) -> Self {
        Self { store, workflows }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the workflow governing the order's state field.
    pub fn workflow(&self, order: &Order) -> Result<&Workflow, OrderError> {
        self.workflow_for_type(order.order_type())
    }

    fn workflow_for_type(&self, order_type: &str) -> Result<&Workflow, OrderError> {
        self.workflows
            .workflow_for(order_type)
            .ok_or_else(|| OrderError::UnknownWorkflow {
                order_type: order_type.to_string(),
            })
    }

    /// Creates a new order in the initial state of its workflow.
    ///
    /// Nothing is written until [`OrderService::save`] is called.
    pub fn create(&self, mut values: OrderValues, actor: &Account) -> Result<Order, DomainError> {
        let order_type = values
            .order_type
            .get_or_insert_with(|| super::aggregate::DEFAULT_ORDER_TYPE.to_string());
        let workflow = self.workflow_for_type(order_type)?;

        match &values.state {
            Some(state) if !workflow.has_state(state) => {
                return Err(OrderError::InvalidTransition {
                    transition: "create".to_string(),
                    state: state.clone(),
                }
                .into());
            }
            Some(_) => {}
            None => values.state = workflow.initial_state().map(str::to_string),
        }

        Ok(Order::create(values, actor))
    }

    /// Persists an order.
    ///
    /// Runs the pre-write defaults, writes the order, then reconciles:
    /// an empty order number is set to the order id with one corrective
    /// write, and every attached line item without a back-reference is
    /// pointed at this order.
    #[tracing::instrument(skip(self, order, ctx), fields(order_id = %order.id()))]
    pub async fn save(
        &self,
        order: &mut Order,
        ctx: &RequestContext,
    ) -> Result<PersistOutcome, DomainError> {
        order.before_persist(ctx);
        let is_update = !order.is_new();
        let record = order.to_record()?;

        self.store.save_order(&record).await?;
        order.mark_persisted();
        metrics::counter!("orders_saved_total").increment(1);

        self.after_persist(order, is_update).await
    }

    /// Post-write reconciliation. The corrective order write goes straight
    /// to the store so it never re-enters this step.
    async fn after_persist(
        &self,
        order: &mut Order,
        is_update: bool,
    ) -> Result<PersistOutcome, DomainError> {
        let mut outcome = PersistOutcome::default();

        if order.default_order_number() {
            let record = order.to_record()?;
            self.store.save_order(&record).await?;
            outcome.order_number_defaulted = true;
            metrics::counter!("order_number_defaulted_total").increment(1);
            tracing::debug!(order_number = %order.order_number(), "order number defaulted to id");
        }

        for &line_item_id in order.line_item_ids() {
            let Some(mut item) = self.store.get_line_item(line_item_id).await? else {
                tracing::warn!(%line_item_id, "order references a missing line item");
                continue;
            };
            if item.order_id.is_none() {
                item.order_id = Some(order.id());
                self.store.save_line_item(&item).await?;
                outcome.back_references_fixed += 1;
            }
        }

        if outcome.back_references_fixed > 0 {
            metrics::counter!("line_item_backrefs_fixed_total")
                .increment(outcome.back_references_fixed as u64);
        }
        tracing::debug!(
            is_update,
            back_references_fixed = outcome.back_references_fixed,
            "order persisted"
        );

        Ok(outcome)
    }

    /// Loads an order by id.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        let record = self.store.get_order(order_id).await?;
        Ok(record.map(Order::from_record))
    }

    /// Deletes orders together with every line item they reference.
    ///
    /// Returns the number of line items deleted.
    #[tracing::instrument(skip(self, orders), fields(count = orders.len()))]
    pub async fn delete(&self, orders: &[Order]) -> Result<u64, DomainError> {
        let ids: Vec<OrderId> = orders.iter().map(Order::id).collect();
        self.store.delete_orders(&ids).await?;
        self.after_delete(orders).await
    }

    /// Issues one bulk delete for the union of the orders' line items.
    /// Orders without line items contribute nothing, and no delete is issued
    /// when the union is empty.
    async fn after_delete(&self, orders: &[Order]) -> Result<u64, DomainError> {
        let line_item_ids = Order::cascade_line_item_ids(orders);
        if line_item_ids.is_empty() {
            return Ok(0);
        }

        let deleted = self.store.delete_line_items(&line_item_ids).await?;
        metrics::counter!("line_items_cascade_deleted_total").increment(deleted);
        Ok(deleted)
    }

    /// Applies a workflow transition to the order's state.
    ///
    /// The order is not written; call [`OrderService::save`] afterwards.
    pub fn apply_transition(&self, order: &mut Order, transition_id: &str) -> Result<(), DomainError> {
        let workflow = self.workflow(order)?;
        let to = workflow
            .transition(transition_id)
            .filter(|t| t.applies_to(order.state()))
            .map(|t| t.to.clone())
            .ok_or_else(|| OrderError::InvalidTransition {
                transition: transition_id.to_string(),
                state: order.state().to_string(),
            })?;

        order.set_state(to);
        Ok(())
    }
}
