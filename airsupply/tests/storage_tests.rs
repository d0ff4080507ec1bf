mod test_helpers;

use airsupply::catalog::CatalogService;
use airsupply::error::Error;
use airsupply::model::{OrderStatus, Priority};
use airsupply::storage::{CartStorage, DispatchStorage, OrderStorage};
use chrono::Utc;
use test_helpers::{place_order, setup};

#[tokio::test]
async fn catalog_browse_filter_and_search() {
    let fixture = setup().await;
    let catalog = CatalogService::new(fixture.storage.clone());

    let vaccines = fixture.storage.insert_category("Vaccines").await.unwrap();
    fixture
        .storage
        .insert_item("Rabies vaccine", vaccines, 2.8)
        .await
        .unwrap();

    let all = catalog.browse(&fixture.manager).await.unwrap();
    assert_eq!(all.len(), 4);

    let filtered = catalog
        .browse_category(&fixture.manager, vaccines)
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].description, "Rabies vaccine");

    let found = catalog.search(&fixture.manager, "vaccine").await.unwrap();
    assert_eq!(found.len(), 1);
    let none = catalog.search(&fixture.manager, "oxygen").await.unwrap();
    assert!(none.is_empty());

    let categories = catalog.categories(&fixture.manager).await.unwrap();
    let counts: Vec<_> = categories
        .iter()
        .map(|(c, n)| (c.name.as_str(), *n))
        .collect();
    assert_eq!(counts, vec![("Medication", 3), ("Vaccines", 1)]);
}

#[tokio::test]
async fn catalog_is_role_gated() {
    let fixture = setup().await;
    let catalog = CatalogService::new(fixture.storage.clone());

    let err = catalog.browse(&fixture.warehouse).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));
}

#[tokio::test]
async fn status_cas_refuses_a_stale_from_state() {
    let fixture = setup().await;

    let order = place_order(
        &fixture,
        &fixture.manager,
        &[(fixture.item_a, 1)],
        Priority::High,
    )
    .await;

    // Order is QueuedForProcessing; a CAS asserting ProcessingByWarehouse
    // must not fire
    let advanced = fixture
        .storage
        .advance_status(
            order.id,
            OrderStatus::ProcessingByWarehouse,
            OrderStatus::QueuedForDispatch,
        )
        .await
        .unwrap();
    assert!(!advanced);

    let current = fixture.storage.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(current.status, OrderStatus::QueuedForProcessing);

    let advanced = fixture
        .storage
        .advance_status(
            order.id,
            OrderStatus::QueuedForProcessing,
            OrderStatus::ProcessingByWarehouse,
        )
        .await
        .unwrap();
    assert!(advanced);
}

#[tokio::test]
async fn submit_cart_cas_only_fires_from_cart_state() {
    let fixture = setup().await;

    let order = place_order(
        &fixture,
        &fixture.manager,
        &[(fixture.item_b, 1)],
        Priority::Low,
    )
    .await;

    // Already checked out; a second submit must not fire
    let submitted = fixture
        .storage
        .submit_cart(order.id, Priority::High, Utc::now())
        .await
        .unwrap();
    assert!(!submitted);

    let current = fixture.storage.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(current.priority, Some(Priority::Low));
}

#[tokio::test]
async fn load_creation_refuses_orders_that_are_not_dispatch_ready() {
    let fixture = setup().await;

    let order = place_order(
        &fixture,
        &fixture.manager,
        &[(fixture.item_c, 1)],
        Priority::Medium,
    )
    .await;

    let err = fixture
        .storage
        .create_load(&[order.id])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // The failed claim rolled back: no load exists, order unclaimed
    let loads = fixture.storage.undispatched_loads().await.unwrap();
    assert!(loads.is_empty());
    let current = fixture.storage.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(current.drone_load_id, None);
}

#[tokio::test]
async fn load_creation_needs_at_least_one_order() {
    let fixture = setup().await;

    let err = fixture.storage.create_load(&[]).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn order_weight_is_derived_from_line_items() {
    let fixture = setup().await;

    let manager_id = fixture.manager.clinic_manager.unwrap();
    let cart = fixture.storage.create_cart(manager_id).await.unwrap();
    fixture
        .storage
        .insert_line_item(cart.id, fixture.item_a, 1)
        .await
        .unwrap();
    fixture
        .storage
        .insert_line_item(cart.id, fixture.item_c, 2)
        .await
        .unwrap();

    let order = fixture.storage.get_order(cart.id).await.unwrap().unwrap();
    assert_eq!(order.total_weight_kg, 20.0);

    let lines = fixture.storage.cart_lines(cart.id).await.unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1].weight_kg(), 10.0);
}
