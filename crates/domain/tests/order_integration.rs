//! Integration tests for the order persist and delete cycles.
//!
//! These tests run the order service against the in-memory store and check
//! default population, order number fixup, line item back-references and
//! the delete cascade.

use common::{LineItemId, Money, StoreId, UserId};
use domain::{
    Account, DomainError, LineItem, Order, OrderError, OrderService, OrderValues, RequestContext,
    StaticWorkflowResolver, Workflow,
};
use store::{InMemoryStore, LineItemStore};

/// Helper to create a test order service
fn create_service() -> OrderService<InMemoryStore> {
    OrderService::new(InMemoryStore::new())
}

fn actor(email: &str) -> Account {
    Account::new(UserId::new(), email)
}

fn request(actor: &Account, ip: &str) -> RequestContext {
    RequestContext::new(actor.clone(), ip)
}

async fn stored_line_item(service: &OrderService<InMemoryStore>, title: &str) -> LineItem {
    let item = LineItem::new(title, 1, Money::from_cents(1000));
    service.store().save_line_item(&item).await.unwrap();
    item
}

mod defaults {
    use super::*;

    #[tokio::test]
    async fn owner_defaults_to_acting_identity() {
        let service = create_service();
        let actor = actor("clerk@example.com");

        let order = service
            .create(OrderValues::for_store(StoreId::new()), &actor)
            .unwrap();

        assert_eq!(order.owner_id(), Some(actor.id));
    }

    #[tokio::test]
    async fn email_and_hostname_are_set_on_first_save_only() {
        let service = create_service();
        let customer = actor("customer@example.com");
        let mut order = service
            .create(OrderValues::for_store(StoreId::new()), &customer)
            .unwrap();

        service
            .save(&mut order, &request(&customer, "203.0.113.5"))
            .await
            .unwrap();
        assert_eq!(order.email(), Some("customer@example.com"));
        assert_eq!(order.hostname(), Some("203.0.113.5"));

        // A later save from another identity and address changes nothing.
        let admin = actor("admin@example.com");
        order.set_email("").set_hostname("");
        service
            .save(&mut order, &request(&admin, "198.51.100.1"))
            .await
            .unwrap();
        assert_eq!(order.email(), Some(""));
        assert_eq!(order.hostname(), Some(""));
        assert_eq!(order.owner_id(), Some(customer.id));
    }

    #[tokio::test]
    async fn explicit_owner_email_is_used_for_default() {
        let service = create_service();
        let clerk = actor("clerk@example.com");
        let customer = actor("customer@example.com");

        let mut order = service
            .create(OrderValues::for_store(StoreId::new()), &clerk)
            .unwrap();
        order.set_owner(&customer).unwrap();
        service
            .save(&mut order, &request(&clerk, "10.1.1.1"))
            .await
            .unwrap();

        assert_eq!(order.owner_id(), Some(customer.id));
        assert_eq!(order.email(), Some("customer@example.com"));
    }

    #[tokio::test]
    async fn owner_account_in_initial_values_supplies_email() {
        let service = create_service();
        let clerk = actor("clerk@example.com");
        let customer = actor("customer@example.com");
        let values = OrderValues {
            owner: Some(customer.clone()),
            ..OrderValues::for_store(StoreId::new())
        };

        let mut order = service.create(values, &clerk).unwrap();
        service
            .save(&mut order, &request(&clerk, "10.1.1.1"))
            .await
            .unwrap();

        let stored = service.load(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.owner_id(), Some(customer.id));
        assert_eq!(stored.email(), Some("customer@example.com"));
    }
}

mod order_number {
    use super::*;

    #[tokio::test]
    async fn defaults_to_id_after_save() {
        let service = create_service();
        let actor = actor("a@example.com");
        let mut order = service
            .create(OrderValues::for_store(StoreId::new()), &actor)
            .unwrap();
        assert_eq!(order.order_number(), "");

        let outcome = service
            .save(&mut order, &request(&actor, "127.0.0.1"))
            .await
            .unwrap();

        assert!(outcome.order_number_defaulted);
        assert_eq!(order.order_number(), order.id().to_string());

        let stored = service.load(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.order_number(), order.id().to_string());
    }

    #[tokio::test]
    async fn explicit_number_is_kept() {
        let service = create_service();
        let actor = actor("a@example.com");
        let mut order = service
            .create(OrderValues::for_store(StoreId::new()), &actor)
            .unwrap();
        order.set_order_number("INV-42");

        service
            .save(&mut order, &request(&actor, "127.0.0.1"))
            .await
            .unwrap();

        assert_eq!(order.order_number(), "INV-42");
        assert_eq!(service.store().order_save_count(), 1);
    }

    #[tokio::test]
    async fn clearing_number_after_first_save_fails_validation() {
        let service = create_service();
        let actor = actor("a@example.com");
        let ctx = request(&actor, "127.0.0.1");
        let mut order = service
            .create(OrderValues::for_store(StoreId::new()), &actor)
            .unwrap();
        service.save(&mut order, &ctx).await.unwrap();

        order.set_order_number("");
        let result = service.save(&mut order, &ctx).await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::Validation {
                field: "order_number"
            }))
        ));
    }
}

mod line_items {
    use super::*;

    #[tokio::test]
    async fn every_attached_item_points_back_after_save() {
        let service = create_service();
        let actor = actor("a@example.com");
        let items = [
            stored_line_item(&service, "Widget").await,
            stored_line_item(&service, "Gadget").await,
            stored_line_item(&service, "Gizmo").await,
        ];

        let mut order = service
            .create(OrderValues::for_store(StoreId::new()), &actor)
            .unwrap();
        for item in &items {
            order.add_line_item(item);
        }
        service
            .save(&mut order, &request(&actor, "127.0.0.1"))
            .await
            .unwrap();

        for item in &items {
            let stored = service
                .store()
                .get_line_item(item.id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(stored.order_id, Some(order.id()));
        }
    }

    #[tokio::test]
    async fn existing_back_reference_is_not_rewritten() {
        let service = create_service();
        let actor = actor("a@example.com");
        let ctx = request(&actor, "127.0.0.1");
        let first = stored_line_item(&service, "Widget").await;

        let mut order = service
            .create(OrderValues::for_store(StoreId::new()), &actor)
            .unwrap();
        order.add_line_item(&first);
        service.save(&mut order, &ctx).await.unwrap();
        let writes_after_first_save = service.store().line_item_save_count();

        let second = stored_line_item(&service, "Gadget").await;
        order.add_line_item(&second);
        let outcome = service.save(&mut order, &ctx).await.unwrap();

        assert_eq!(outcome.back_references_fixed, 1);
        // One write to store `second`, one to fix its back-reference.
        assert_eq!(
            service.store().line_item_save_count(),
            writes_after_first_save + 2
        );
    }

    #[tokio::test]
    async fn add_line_item_twice_keeps_one_entry() {
        let service = create_service();
        let actor = actor("a@example.com");
        let item = stored_line_item(&service, "Widget").await;

        let mut order = service
            .create(OrderValues::for_store(StoreId::new()), &actor)
            .unwrap();
        order.add_line_item(&item);
        order.add_line_item(&item);

        assert_eq!(order.line_item_ids(), &[item.id]);
    }

    #[tokio::test]
    async fn line_items_survive_reload() {
        let service = create_service();
        let actor = actor("a@example.com");
        let a = stored_line_item(&service, "A").await;
        let b = stored_line_item(&service, "B").await;

        let mut order = service
            .create(OrderValues::for_store(StoreId::new()), &actor)
            .unwrap();
        order.add_line_item(&a).add_line_item(&b).remove_line_item(&a);
        service
            .save(&mut order, &request(&actor, "127.0.0.1"))
            .await
            .unwrap();

        let loaded = service.load(order.id()).await.unwrap().unwrap();
        assert_eq!(loaded.line_item_ids(), &[b.id]);
        assert!(!loaded.has_line_item(&a));
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn deletes_exactly_the_union_of_line_items() {
        let service = create_service();
        let actor = actor("a@example.com");
        let ctx = request(&actor, "127.0.0.1");
        let shared = stored_line_item(&service, "Shared").await;
        let only_first = stored_line_item(&service, "First").await;
        let unrelated = stored_line_item(&service, "Unrelated").await;

        let mut first = service
            .create(OrderValues::for_store(StoreId::new()), &actor)
            .unwrap();
        first.add_line_item(&shared).add_line_item(&only_first);
        service.save(&mut first, &ctx).await.unwrap();

        let mut second = service
            .create(OrderValues::for_store(StoreId::new()), &actor)
            .unwrap();
        second.add_line_item(&shared);
        service.save(&mut second, &ctx).await.unwrap();

        let deleted = service.delete(&[first.clone(), second.clone()]).await.unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(service.store().line_item_delete_calls(), 1);
        assert!(service.load(first.id()).await.unwrap().is_none());
        assert!(service.load(second.id()).await.unwrap().is_none());
        assert!(
            service
                .store()
                .get_line_item(unrelated.id)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn order_without_line_items_deletes_none() {
        let service = create_service();
        let actor = actor("a@example.com");
        let kept = stored_line_item(&service, "Kept").await;
        let mut order = service
            .create(OrderValues::for_store(StoreId::new()), &actor)
            .unwrap();
        service
            .save(&mut order, &request(&actor, "127.0.0.1"))
            .await
            .unwrap();

        let deleted = service.delete(&[order]).await.unwrap();

        assert_eq!(deleted, 0);
        assert_eq!(service.store().line_item_delete_calls(), 0);
        assert_eq!(service.store().line_item_count().await, 1);
        assert!(
            service
                .store()
                .get_line_item(kept.id)
                .await
                .unwrap()
                .is_some()
        );
    }
}

mod workflow {
    use super::*;

    #[tokio::test]
    async fn custom_order_type_uses_its_workflow() {
        let workflows = StaticWorkflowResolver::default().register(
            "digital",
            Workflow::new("order_digital", ["cart", "fulfilled"])
                .with_transition("fulfill", ["cart"], "fulfilled"),
        );
        let service = OrderService::with_workflows(InMemoryStore::new(), workflows);
        let actor = actor("a@example.com");
        let values = OrderValues {
            order_type: Some("digital".to_string()),
            ..OrderValues::for_store(StoreId::new())
        };

        let mut order = service.create(values, &actor).unwrap();
        assert_eq!(order.state(), "cart");
        assert_eq!(service.workflow(&order).unwrap().id(), "order_digital");

        service.apply_transition(&mut order, "fulfill").unwrap();
        service
            .save(&mut order, &request(&actor, "127.0.0.1"))
            .await
            .unwrap();

        let loaded: Order = service.load(order.id()).await.unwrap().unwrap();
        assert_eq!(loaded.state(), "fulfilled");
    }

    #[tokio::test]
    async fn store_change_is_rejected_with_line_items() {
        let service = create_service();
        let actor = actor("a@example.com");
        let mut order = service
            .create(OrderValues::for_store(StoreId::new()), &actor)
            .unwrap();
        order.add_line_item(LineItemId::new());

        assert_eq!(
            order.set_store_id(StoreId::new()).err(),
            Some(OrderError::StoreLocked)
        );
    }
    #[tokio::test]
    async fn store_can_be_assigned_after_line_items() {
        let service = create_service();
        let actor = actor("a@example.com");
        let item = stored_line_item(&service, "Widget").await;
        let values = OrderValues {
            line_item_ids: vec![item.id],
            ..Default::default()
        };
        let mut order = service.create(values, &actor).unwrap();

        order.set_store_id(StoreId::new()).unwrap();
        service
            .save(&mut order, &request(&actor, "127.0.0.1"))
            .await
            .unwrap();

        let stored = service.load(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.store_id(), order.store_id());
        assert_eq!(stored.line_item_ids(), &[item.id]);
    }
}
