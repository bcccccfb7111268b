use chrono::{Duration, Utc};
use log::*;
use sqlx::{types::Json, Execute, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId},
    order_objects::OrderQueryFilter,
    traits::{InsertOrderResult, ReconciliationError},
};

/// Inserts the order if its id is unused, otherwise returns the stored row untouched.
///
/// The insert itself is a single `ON CONFLICT DO NOTHING` statement, so two racing creation calls
/// for the same order id cannot both insert; the loser just reads back what the winner wrote.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<InsertOrderResult, ReconciliationError> {
    match insert_order(&order, &mut *conn).await? {
        Some(inserted) => {
            debug!("📝️ Order {} saved in the database", inserted.order_id);
            Ok(InsertOrderResult::Inserted(inserted))
        },
        None => {
            let existing = fetch_order_by_order_id(&order.order_id, conn)
                .await?
                .ok_or_else(|| ReconciliationError::OrderNotFound(order.order_id.clone()))?;
            debug!("📝️ Order {} already exists. Returning the stored row", existing.order_id);
            Ok(InsertOrderResult::AlreadyExists(existing))
        },
    }
}

async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let now = Utc::now();
    let result = sqlx::query_as::<_, Order>(
        r#"INSERT INTO orders (
            order_id, customer_id, customer_email,
            pickup_address, dropoff_address, pickup_date, dropoff_date,
            items, total_amount, metadata, status, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'Pending', $11, $11)
        ON CONFLICT (order_id) DO NOTHING
        RETURNING *"#,
    )
    .bind(order.order_id.as_str())
    .bind(&order.customer_id)
    .bind(&order.customer_email)
    .bind(&order.pickup_address)
    .bind(&order.dropoff_address)
    .bind(order.pickup_date)
    .bind(order.dropoff_date)
    .bind(Json(&order.items))
    .bind(order.total_amount)
    .bind(order.metadata.as_ref().map(Json))
    .bind(now)
    .fetch_optional(conn)
    .await?;
    Ok(result)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await
}

/// All orders placed by one customer, newest first. Row id breaks ties for orders created within
/// the same second.
pub async fn fetch_orders_for_customer(
    customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE customer_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(customer_id)
        .fetch_all(conn)
        .await
}

pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders");
    if !query.is_empty() {
        builder.push(" WHERE ");
        let mut clauses = builder.separated(" AND ");
        if let Some(order_id) = query.order_id {
            clauses.push("order_id = ").push_bind_unseparated(order_id.0);
        }
        if let Some(customer_id) = query.customer_id {
            clauses.push("customer_id = ").push_bind_unseparated(customer_id);
        }
        if let Some(reference) = query.reference {
            clauses.push("payment_reference = ").push_bind_unseparated(reference);
        }
        if let Some(since) = query.since {
            clauses.push("created_at >= ").push_bind_unseparated(since);
        }
        if let Some(until) = query.until {
            clauses.push("created_at <= ").push_bind_unseparated(until);
        }
        if let Some(statuses) = query.status {
            if !statuses.is_empty() {
                clauses.push("status IN (");
                let count = statuses.len();
                for (i, status) in statuses.into_iter().enumerate() {
                    clauses.push_bind_unseparated(status);
                    if i < count - 1 {
                        clauses.push_unseparated(",");
                    }
                }
                clauses.push_unseparated(")");
            }
        }
    }
    builder.push(" ORDER BY created_at, id");
    let query = builder.build_query_as::<Order>();
    trace!("📝️ Executing query: {}", query.sql());
    query.fetch_all(conn).await
}

/// Pending orders that were created more than `older_than` ago. The settlement worker sweeps
/// these, since a long-pending order usually means its confirmation went missing.
pub async fn fetch_stale_pending_orders(
    older_than: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let cutoff = Utc::now() - older_than;
    sqlx::query_as("SELECT * FROM orders WHERE status = 'Pending' AND created_at <= $1 ORDER BY created_at, id")
        .bind(cutoff)
        .fetch_all(conn)
        .await
}
