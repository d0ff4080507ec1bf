use crate::error::Error;
use crate::model::*;
use crate::storage::{CartStorage, CatalogStorage, DispatchStorage, OrderStorage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use std::str::FromStr;
use tracing::{debug, info};

/// Order row projection with the computed total weight. Weight is always
/// derived from the line items on read, never stored.
const ORDER_SELECT: &str = "SELECT o.id, o.clinic_manager_id, o.status, o.priority, \
     o.time_ordered, o.drone_load_id, \
     COALESCE((SELECT SUM(li.quantity * i.weight_kg) \
               FROM line_items li JOIN items i ON i.id = li.item_id \
               WHERE li.order_id = o.id), 0.0) AS total_weight_kg \
     FROM orders o";

/// Presentation ordering for pending orders: priority rank, then FIFO by
/// checkout time, id as the final tie-break.
const PENDING_ORDER_BY: &str = "CASE o.priority \
     WHEN 'High' THEN 1 WHEN 'Medium' THEN 2 WHEN 'Low' THEN 3 ELSE 4 END, \
     o.time_ordered ASC, o.id ASC";

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub async fn new(database_url: &str) -> Result<Self, Error> {
        // An in-memory database exists per connection, so the pool must not
        // fan out across connections for it.
        let max_connections = if database_url.contains(":memory:") || database_url.contains("mode=memory") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn initialize_schema(&self) -> Result<(), Error> {
        let init_sql = include_str!("../resources/init.sql");
        sqlx::raw_sql(init_sql).execute(&self.pool).await?;
        debug!("schema initialized");
        Ok(())
    }

    // Fixture/seed helpers, used by the seed binary and the test suites.

    pub async fn insert_category(&self, name: &str) -> Result<ModelId, Error> {
        let row = sqlx::query("INSERT INTO categories (name) VALUES (?) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("id")?)
    }

    pub async fn insert_item(
        &self,
        description: &str,
        category_id: ModelId,
        weight_kg: f64,
    ) -> Result<ModelId, Error> {
        let row = sqlx::query(
            "INSERT INTO items (description, category_id, weight_kg) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(description)
        .bind(category_id)
        .bind(weight_kg)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("id")?)
    }

    pub async fn insert_place(
        &self,
        name: &str,
        latitude: f64,
        longitude: f64,
        altitude_m: f64,
    ) -> Result<ModelId, Error> {
        let row = sqlx::query(
            "INSERT INTO places (name, latitude, longitude, altitude_m) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(latitude)
        .bind(longitude)
        .bind(altitude_m)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("id")?)
    }

    pub async fn insert_clinic_manager(
        &self,
        user_id: ModelId,
        clinic_id: ModelId,
    ) -> Result<ModelId, Error> {
        let row = sqlx::query(
            "INSERT INTO clinic_managers (user_id, clinic_id) VALUES (?, ?) RETURNING id",
        )
        .bind(user_id)
        .bind(clinic_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("id")?)
    }
}

fn order_from_row(row: &SqliteRow) -> Result<Order, Error> {
    let status_raw: String = row.try_get("status")?;
    let status = OrderStatus::from_str(&status_raw).map_err(Error::Validation)?;
    let priority = row
        .try_get::<Option<String>, _>("priority")?
        .map(|p| Priority::from_str(&p).map_err(Error::Validation))
        .transpose()?;
    Ok(Order {
        id: row.try_get("id")?,
        clinic_manager_id: row.try_get("clinic_manager_id")?,
        status,
        priority,
        time_ordered: row.try_get::<Option<DateTime<Utc>>, _>("time_ordered")?,
        drone_load_id: row.try_get("drone_load_id")?,
        total_weight_kg: row.try_get("total_weight_kg")?,
    })
}

fn item_from_row(row: &SqliteRow) -> Result<Item, Error> {
    Ok(Item {
        id: row.try_get("id")?,
        description: row.try_get("description")?,
        category_id: row.try_get("category_id")?,
        weight_kg: row.try_get("weight_kg")?,
    })
}

fn place_from_row(row: &SqliteRow) -> Result<Place, Error> {
    Ok(Place {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        altitude_m: row.try_get("altitude_m")?,
    })
}

#[async_trait]
impl CatalogStorage for SqliteStorage {
    async fn list_items(&self) -> Result<Vec<Item>, Error> {
        let rows = sqlx::query("SELECT id, description, category_id, weight_kg FROM items ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn get_item(&self, id: ModelId) -> Result<Option<Item>, Error> {
        let row = sqlx::query("SELECT id, description, category_id, weight_kg FROM items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn items_in_category(&self, category_id: ModelId) -> Result<Vec<Item>, Error> {
        let rows = sqlx::query(
            "SELECT id, description, category_id, weight_kg FROM items WHERE category_id = ? ORDER BY id",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn search_items(&self, needle: &str) -> Result<Vec<Item>, Error> {
        let pattern = format!("%{}%", needle.replace('%', "\\%").replace('_', "\\_"));
        let rows = sqlx::query(
            "SELECT id, description, category_id, weight_kg FROM items \
             WHERE description LIKE ? ESCAPE '\\' ORDER BY id",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn list_categories(&self) -> Result<Vec<(Category, i64)>, Error> {
        let rows = sqlx::query(
            "SELECT c.id, c.name, COUNT(i.id) AS item_count \
             FROM categories c LEFT JOIN items i ON i.category_id = c.id \
             GROUP BY c.id, c.name ORDER BY c.id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok((
                    Category {
                        id: row.try_get("id")?,
                        name: row.try_get("name")?,
                    },
                    row.try_get("item_count")?,
                ))
            })
            .collect()
    }

    async fn get_place(&self, id: ModelId) -> Result<Option<Place>, Error> {
        let row = sqlx::query(
            "SELECT id, name, latitude, longitude, altitude_m FROM places WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(place_from_row).transpose()
    }

    async fn get_clinic_manager(&self, id: ModelId) -> Result<Option<ClinicManager>, Error> {
        let row = sqlx::query("SELECT id, user_id, clinic_id FROM clinic_managers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| {
            Ok(ClinicManager {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                clinic_id: row.try_get("clinic_id")?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl CartStorage for SqliteStorage {
    async fn open_cart(&self, clinic_manager_id: ModelId) -> Result<Option<Order>, Error> {
        let sql = format!(
            "{ORDER_SELECT} WHERE o.clinic_manager_id = ? AND o.status = ? ORDER BY o.id LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(clinic_manager_id)
            .bind(OrderStatus::Cart.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn create_cart(&self, clinic_manager_id: ModelId) -> Result<Order, Error> {
        let row = sqlx::query(
            "INSERT INTO orders (clinic_manager_id, status) VALUES (?, ?) RETURNING id",
        )
        .bind(clinic_manager_id)
        .bind(OrderStatus::Cart.as_str())
        .fetch_one(&self.pool)
        .await?;
        let id: ModelId = row.try_get("id")?;
        debug!(clinic_manager_id, cart = id, "created fresh cart");
        Ok(Order {
            id,
            clinic_manager_id: Some(clinic_manager_id),
            status: OrderStatus::Cart,
            priority: None,
            time_ordered: None,
            drone_load_id: None,
            total_weight_kg: 0.0,
        })
    }

    async fn insert_line_item(
        &self,
        order_id: ModelId,
        item_id: ModelId,
        quantity: i64,
    ) -> Result<LineItem, Error> {
        let row = sqlx::query(
            "INSERT INTO line_items (order_id, item_id, quantity) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(order_id)
        .bind(item_id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await?;
        Ok(LineItem {
            id: row.try_get("id")?,
            order_id,
            item_id,
            quantity,
        })
    }

    async fn cart_lines(&self, order_id: ModelId) -> Result<Vec<CartLine>, Error> {
        let rows = sqlx::query(
            "SELECT li.id AS line_id, li.order_id, li.item_id, li.quantity, \
                    i.description, i.category_id, i.weight_kg \
             FROM line_items li JOIN items i ON i.id = li.item_id \
             WHERE li.order_id = ? ORDER BY li.id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(CartLine {
                    line_item: LineItem {
                        id: row.try_get("line_id")?,
                        order_id: row.try_get("order_id")?,
                        item_id: row.try_get("item_id")?,
                        quantity: row.try_get("quantity")?,
                    },
                    item: Item {
                        id: row.try_get("item_id")?,
                        description: row.try_get("description")?,
                        category_id: row.try_get("category_id")?,
                        weight_kg: row.try_get("weight_kg")?,
                    },
                })
            })
            .collect()
    }

    async fn submit_cart(
        &self,
        order_id: ModelId,
        priority: Priority,
        time_ordered: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            "UPDATE orders SET status = ?, priority = ?, time_ordered = ? \
             WHERE id = ? AND status = ?",
        )
        .bind(OrderStatus::QueuedForProcessing.as_str())
        .bind(priority.as_str())
        .bind(time_ordered)
        .bind(order_id)
        .bind(OrderStatus::Cart.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl OrderStorage for SqliteStorage {
    async fn get_order(&self, id: ModelId) -> Result<Option<Order>, Error> {
        let sql = format!("{ORDER_SELECT} WHERE o.id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn orders_with_status(&self, status: OrderStatus) -> Result<Vec<Order>, Error> {
        let sql = format!("{ORDER_SELECT} WHERE o.status = ? ORDER BY {PENDING_ORDER_BY}");
        let rows = sqlx::query(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn orders_for_manager(&self, clinic_manager_id: ModelId) -> Result<Vec<Order>, Error> {
        let sql = format!(
            "{ORDER_SELECT} WHERE o.clinic_manager_id = ? AND o.status != ? \
             ORDER BY o.time_ordered DESC, o.id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(clinic_manager_id)
            .bind(OrderStatus::Cart.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn advance_status(
        &self,
        id: ModelId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, Error> {
        let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(id)
            .bind(from.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl DispatchStorage for SqliteStorage {
    async fn unassigned_dispatchable(&self) -> Result<Vec<Order>, Error> {
        let sql = format!(
            "{ORDER_SELECT} WHERE o.status = ? AND o.drone_load_id IS NULL \
             ORDER BY {PENDING_ORDER_BY}"
        );
        let rows = sqlx::query(&sql)
            .bind(OrderStatus::QueuedForDispatch.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn create_load(&self, order_ids: &[ModelId]) -> Result<ModelId, Error> {
        if order_ids.is_empty() {
            return Err(Error::Validation(
                "a drone load needs at least one order".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let load_id: ModelId =
            sqlx::query("INSERT INTO drone_loads (dispatched) VALUES (0) RETURNING id")
                .fetch_one(&mut *tx)
                .await?
                .try_get("id")?;

        // Claim each order; a claim fails if the order was grabbed by
        // another load or left the dispatch-ready state in the meantime.
        for &order_id in order_ids {
            let result = sqlx::query(
                "UPDATE orders SET drone_load_id = ? \
                 WHERE id = ? AND drone_load_id IS NULL AND status = ?",
            )
            .bind(load_id)
            .bind(order_id)
            .bind(OrderStatus::QueuedForDispatch.as_str())
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() != 1 {
                tx.rollback().await?;
                return Err(Error::Validation(format!(
                    "order {} is no longer dispatch-ready",
                    order_id
                )));
            }
        }

        tx.commit().await?;
        info!(load = load_id, orders = order_ids.len(), "formed drone load");
        Ok(load_id)
    }

    async fn undispatched_loads(&self) -> Result<Vec<DroneLoadDetail>, Error> {
        let rows = sqlx::query("SELECT id FROM drone_loads WHERE dispatched = 0 ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        let mut loads = Vec::with_capacity(rows.len());
        for row in rows {
            let id: ModelId = row.try_get("id")?;
            loads.push(DroneLoadDetail {
                id,
                dispatched: false,
                orders: self.load_orders(id).await?,
            });
        }
        Ok(loads)
    }

    async fn get_load(&self, id: ModelId) -> Result<Option<DroneLoadDetail>, Error> {
        let row = sqlx::query("SELECT id, dispatched FROM drone_loads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let dispatched: i64 = row.try_get("dispatched")?;
        Ok(Some(DroneLoadDetail {
            id,
            dispatched: dispatched != 0,
            orders: self.load_orders(id).await?,
        }))
    }

    async fn mark_dispatched(&self, id: ModelId) -> Result<bool, Error> {
        let mut tx = self.pool.begin().await?;
        let result =
            sqlx::query("UPDATE drone_loads SET dispatched = 1 WHERE id = ? AND dispatched = 0")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }
        // Dispatching the load is what moves its orders to their terminal
        // state.
        sqlx::query("UPDATE orders SET status = ? WHERE drone_load_id = ? AND status = ?")
            .bind(OrderStatus::Dispatched.as_str())
            .bind(id)
            .bind(OrderStatus::QueuedForDispatch.as_str())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn load_clinics(&self, id: ModelId) -> Result<Vec<Place>, Error> {
        let sql = format!(
            "SELECT p.id, p.name, p.latitude, p.longitude, p.altitude_m \
             FROM orders o \
             JOIN clinic_managers cm ON cm.id = o.clinic_manager_id \
             JOIN places p ON p.id = cm.clinic_id \
             WHERE o.drone_load_id = ? ORDER BY {PENDING_ORDER_BY}"
        );
        let rows = sqlx::query(&sql).bind(id).fetch_all(&self.pool).await?;
        rows.iter().map(place_from_row).collect()
    }
}

impl SqliteStorage {
    /// Orders in a load, in the priority/FIFO order they were packed in.
    async fn load_orders(&self, load_id: ModelId) -> Result<Vec<Order>, Error> {
        let sql = format!("{ORDER_SELECT} WHERE o.drone_load_id = ? ORDER BY {PENDING_ORDER_BY}");
        let rows = sqlx::query(&sql).bind(load_id).fetch_all(&self.pool).await?;
        rows.iter().map(order_from_row).collect()
    }
}
