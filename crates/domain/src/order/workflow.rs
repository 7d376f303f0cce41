//! Workflows governing the order state field.

use std::collections::HashMap;

/// A named move between workflow states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    pub from: Vec<String>,
    pub to: String,
}

impl Transition {
    /// Returns true if the transition can be taken from `state`.
    pub fn applies_to(&self, state: &str) -> bool {
        self.from.iter().any(|s| s == state)
    }
}

/// A state machine for the order state field.
///
/// The first declared state is the initial state of new orders.
///
/// ```text
/// order_default:
///
/// draft ──place──► completed
///   │
///   └───cancel───► canceled
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    id: String,
    states: Vec<String>,
    transitions: Vec<Transition>,
}

impl Workflow {
    /// Identifier of the default order workflow.
    pub const ORDER_DEFAULT: &'static str = "order_default";

    /// Creates a workflow with the given states and no transitions.
    pub fn new(id: impl Into<String>, states: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            id: id.into(),
            states: states.into_iter().map(Into::into).collect(),
            transitions: Vec::new(),
        }
    }

    /// Adds a transition.
    pub fn with_transition(
        mut self,
        id: impl Into<String>,
        from: impl IntoIterator<Item = impl Into<String>>,
        to: impl Into<String>,
    ) -> Self {
        self.transitions.push(Transition {
            id: id.into(),
            from: from.into_iter().map(Into::into).collect(),
            to: to.into(),
        });
        self
    }

    /// The standard order workflow: draft orders are placed or canceled.
    pub fn order_default() -> Self {
        Self::new(Self::ORDER_DEFAULT, ["draft", "completed", "canceled"])
            .with_transition("place", ["draft"], "completed")
            .with_transition("cancel", ["draft"], "canceled")
    }

    /// Returns the workflow identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the state new orders start in.
    pub fn initial_state(&self) -> Option<&str> {
        self.states.first().map(String::as_str)
    }

    /// Returns true if `state` belongs to this workflow.
    pub fn has_state(&self, state: &str) -> bool {
        self.states.iter().any(|s| s == state)
    }

    /// Looks up a transition by id.
    pub fn transition(&self, id: &str) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.id == id)
    }

    /// Returns the transitions that can be taken from `state`.
    pub fn allowed_transitions<'a>(&'a self, state: &'a str) -> impl Iterator<Item = &'a Transition> {
        self.transitions.iter().filter(move |t| t.applies_to(state))
    }
}

/// Resolves the workflow governing an order type.
pub trait WorkflowResolver: Send + Sync {
    /// Returns the workflow for `order_type`, if one is registered.
    fn workflow_for(&self, order_type: &str) -> Option<&Workflow>;
}

/// Resolver backed by a fixed order type to workflow map.
///
/// The default instance maps the `default` order type to
/// [`Workflow::order_default`].
#[derive(Debug, Clone)]
pub struct StaticWorkflowResolver {
    by_type: HashMap<String, Workflow>,
}

impl StaticWorkflowResolver {
    /// Creates a resolver with no registered workflows.
    pub fn empty() -> Self {
        Self {
            by_type: HashMap::new(),
        }
    }

    /// Registers the workflow for an order type.
    pub fn register(mut self, order_type: impl Into<String>, workflow: Workflow) -> Self {
        self.by_type.insert(order_type.into(), workflow);
        self
    }
}

impl Default for StaticWorkflowResolver {
    fn default() -> Self {
        Self::empty().register(super::aggregate::DEFAULT_ORDER_TYPE, Workflow::order_default())
    }
}

impl WorkflowResolver for StaticWorkflowResolver {
    fn workflow_for(&self, order_type: &str) -> Option<&Workflow> {
        self.by_type.get(order_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_default_initial_state_is_draft() {
        let workflow = Workflow::order_default();
        assert_eq!(workflow.id(), "order_default");
        assert_eq!(workflow.initial_state(), Some("draft"));
        assert!(workflow.has_state("canceled"));
        assert!(!workflow.has_state("shipped"));
    }

    #[test]
    fn test_draft_can_be_placed_or_canceled() {
        let workflow = Workflow::order_default();
        let ids: Vec<_> = workflow
            .allowed_transitions("draft")
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, ["place", "cancel"]);
    }

    #[test]
    fn test_terminal_states_have_no_transitions() {
        let workflow = Workflow::order_default();
        assert_eq!(workflow.allowed_transitions("completed").count(), 0);
        assert_eq!(workflow.allowed_transitions("canceled").count(), 0);
    }

    #[test]
    fn test_default_resolver_knows_default_type() {
        let resolver = StaticWorkflowResolver::default();
        assert_eq!(
            resolver.workflow_for("default").map(Workflow::id),
            Some("order_default")
        );
        assert!(resolver.workflow_for("wholesale").is_none());
    }

    #[test]
    fn test_custom_workflow_registration() {
        let fulfillment = Workflow::new("order_fulfillment", ["draft", "fulfillment", "completed"])
            .with_transition("place", ["draft"], "fulfillment")
            .with_transition("fulfill", ["fulfillment"], "completed");
        let resolver = StaticWorkflowResolver::empty().register("physical", fulfillment);

        let workflow = resolver.workflow_for("physical").unwrap();
        assert_eq!(workflow.transition("fulfill").unwrap().to, "completed");
        assert!(resolver.workflow_for("default").is_none());
    }
}
