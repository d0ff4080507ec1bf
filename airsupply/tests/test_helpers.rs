#![allow(dead_code)]

use airsupply::access::{Actor, Role};
use airsupply::cart::CartService;
use airsupply::lifecycle::LifecycleService;
use airsupply::model::{ModelId, Order, Place, Priority};
use airsupply::sqlite_storage::SqliteStorage;
use std::sync::Arc;

pub const CART_CEILING_KG: f64 = 20.0;
pub const LOAD_CEILING_KG: f64 = 25.0;

/// Shared fixture: schema-initialized in-memory database seeded with the
/// three-item catalog from the acceptance scenario (A 10 kg, B 8 kg,
/// C 5 kg), two clinics, and one actor per role.
pub struct Fixture {
    pub storage: Arc<SqliteStorage>,
    pub manager: Actor,
    pub second_manager: Actor,
    pub warehouse: Actor,
    pub dispatcher: Actor,
    pub item_a: ModelId,
    pub item_b: ModelId,
    pub item_c: ModelId,
    pub clinic_one: ModelId,
    pub clinic_two: ModelId,
}

pub async fn setup() -> Fixture {
    let storage = SqliteStorage::new(&common::get_test_database_url())
        .await
        .expect("failed to create storage");
    storage
        .initialize_schema()
        .await
        .expect("failed to initialize schema");

    let category = storage.insert_category("Medication").await.unwrap();
    let item_a = storage
        .insert_item("Item A", category, 10.0)
        .await
        .unwrap();
    let item_b = storage.insert_item("Item B", category, 8.0).await.unwrap();
    let item_c = storage.insert_item("Item C", category, 5.0).await.unwrap();

    let clinic_one = storage
        .insert_place("Tai O Clinic", 22.266040, 113.997882, 17.0)
        .await
        .unwrap();
    let clinic_two = storage
        .insert_place("Mui Wo Clinic", 22.265040, 113.927482, 5.0)
        .await
        .unwrap();

    let manager_one = storage.insert_clinic_manager(1, clinic_one).await.unwrap();
    let manager_two = storage.insert_clinic_manager(2, clinic_two).await.unwrap();

    Fixture {
        storage: Arc::new(storage),
        manager: Actor::new(1, Role::ClinicManager).with_clinic_manager(manager_one),
        second_manager: Actor::new(2, Role::ClinicManager).with_clinic_manager(manager_two),
        warehouse: Actor::new(3, Role::WarehousePersonnel),
        dispatcher: Actor::new(4, Role::Dispatcher),
        item_a,
        item_b,
        item_c,
        clinic_one,
        clinic_two,
    }
}

pub fn cart_service(fixture: &Fixture) -> CartService<SqliteStorage> {
    CartService::new(fixture.storage.clone(), CART_CEILING_KG)
}

pub fn lifecycle_service(fixture: &Fixture) -> LifecycleService<SqliteStorage> {
    LifecycleService::new(fixture.storage.clone())
}

pub fn depot() -> Place {
    Place {
        id: 0,
        name: "Depot".to_string(),
        latitude: 22.170257,
        longitude: 114.131376,
        altitude_m: 161.0,
    }
}

/// Fills the actor's cart with the given (item, quantity) pairs and checks
/// it out at the given priority.
pub async fn place_order(
    fixture: &Fixture,
    actor: &Actor,
    items: &[(ModelId, i64)],
    priority: Priority,
) -> Order {
    let carts = cart_service(fixture);
    for &(item_id, quantity) in items {
        carts
            .add_line_item(actor, item_id, quantity)
            .await
            .expect("failed to add line item");
    }
    carts
        .checkout(actor, priority)
        .await
        .expect("failed to check out")
}

/// Walks an order through the warehouse to the dispatch-ready state.
pub async fn make_dispatch_ready(fixture: &Fixture, order_id: ModelId) {
    let lifecycle = lifecycle_service(fixture);
    lifecycle
        .begin_processing(&fixture.warehouse, order_id)
        .await
        .expect("failed to begin processing");
    lifecycle
        .finish_processing(&fixture.warehouse, order_id)
        .await
        .expect("failed to finish processing");
}
