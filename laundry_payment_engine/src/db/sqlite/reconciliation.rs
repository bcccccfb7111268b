use chrono::Utc;
use log::*;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{Order, OrderId, PaymentEvent, PaymentEventRecord},
    traits::{MarkFailedOutcome, MarkPaidOutcome, ReconciliationError},
};

/// The `Pending -> Paid` compare-and-swap.
///
/// One conditional UPDATE carries the whole concurrency story: the WHERE clause only matches a
/// `Pending` row, so of any number of racing callers exactly one gets the row back. When the
/// update matches nothing, a follow-up read distinguishes "already settled" from "no such order".
pub async fn conditional_mark_paid(
    order_id: &OrderId,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<MarkPaidOutcome, ReconciliationError> {
    let updated = sqlx::query_as::<_, Order>(
        r#"UPDATE orders SET
            status = 'Paid',
            payment_reference = COALESCE(payment_reference, $1),
            updated_at = $2
        WHERE order_id = $3 AND status = 'Pending'
        RETURNING *"#,
    )
    .bind(reference)
    .bind(Utc::now())
    .bind(order_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(order) = updated {
        debug!("📝️ Order {} moved to Paid, settled by reference {reference}", order.order_id);
        return Ok(MarkPaidOutcome::Applied(order));
    }
    match super::orders::fetch_order_by_order_id(order_id, conn).await? {
        Some(order) => Ok(MarkPaidOutcome::AlreadyPaid(order)),
        None => Ok(MarkPaidOutcome::NotFound),
    }
}

/// The `Pending -> Failed` compare-and-swap. Identical scheme to [`conditional_mark_paid`], and
/// in particular it will never pull an order out of `Paid`.
pub async fn conditional_mark_failed(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<MarkFailedOutcome, ReconciliationError> {
    let updated = sqlx::query_as::<_, Order>(
        r#"UPDATE orders SET
            status = 'Failed',
            updated_at = $1
        WHERE order_id = $2 AND status = 'Pending'
        RETURNING *"#,
    )
    .bind(Utc::now())
    .bind(order_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(order) = updated {
        debug!("📝️ Order {} moved to Failed", order.order_id);
        return Ok(MarkFailedOutcome::Applied(order));
    }
    match super::orders::fetch_order_by_order_id(order_id, conn).await? {
        Some(order) => Ok(MarkFailedOutcome::AlreadyTerminal(order)),
        None => Ok(MarkFailedOutcome::NotFound),
    }
}

/// Appends a signal to the payment event ledger. Returns `false` when the `(reference, kind)`
/// pair is already on file.
///
/// A redelivery is not entirely a no-op: if the first delivery arrived before its order existed,
/// the stored row has no order link, and a later matched delivery fills it in. That keeps the
/// unmatched report honest once the order turns up.
pub async fn insert_payment_event(
    event: &PaymentEvent,
    order_id: Option<&OrderId>,
    conn: &mut SqliteConnection,
) -> Result<bool, ReconciliationError> {
    let result = sqlx::query(
        r#"INSERT INTO payment_events
            (reference, kind, source, amount_minor, customer_email, metadata, order_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (reference, kind) DO NOTHING"#,
    )
    .bind(&event.reference)
    .bind(event.kind.to_string())
    .bind(event.source.to_string())
    .bind(event.amount_minor)
    .bind(&event.customer_email)
    .bind(event.metadata.as_ref().map(Json))
    .bind(order_id.map(|id| id.as_str()))
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    let fresh = result.rows_affected() > 0;
    if fresh {
        trace!("📝️ Recorded {} event for reference {}", event.kind, event.reference);
    } else if let Some(id) = order_id {
        sqlx::query(
            "UPDATE payment_events SET order_id = $1 WHERE reference = $2 AND kind = $3 AND order_id IS NULL",
        )
        .bind(id.as_str())
        .bind(&event.reference)
        .bind(event.kind.to_string())
        .execute(conn)
        .await?;
    }
    Ok(fresh)
}

pub async fn fetch_unmatched_events(conn: &mut SqliteConnection) -> Result<Vec<PaymentEventRecord>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_events WHERE order_id IS NULL ORDER BY created_at DESC, id DESC")
        .fetch_all(conn)
        .await
}
