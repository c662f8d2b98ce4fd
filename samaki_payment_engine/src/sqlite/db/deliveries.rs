use sqlx::SqliteConnection;

use crate::{
    db_types::{Delivery, DeliveryAuditEntry, DeliveryStatus},
    traits::SettlementError,
};

/// Creates or refreshes the one delivery record for an order. Used when an order reaches full settlement, seeding
/// the status from the fulfillment method.
pub async fn upsert_for_order(
    order_id: i64,
    seller_id: &str,
    status: DeliveryStatus,
    updated_by: &str,
    conn: &mut SqliteConnection,
) -> Result<Delivery, SettlementError> {
    let row: Delivery = sqlx::query_as(
        r#"
            INSERT INTO deliveries (order_id, seller_id, status, updated_by)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (order_id) DO UPDATE SET
                seller_id = excluded.seller_id,
                status = excluded.status,
                updated_by = excluded.updated_by,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(seller_id)
    .bind(status)
    .bind(updated_by)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn fetch_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Delivery>, sqlx::Error> {
    let row = sqlx::query_as("SELECT * FROM deliveries WHERE order_id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(row)
}

pub(crate) async fn update_status(
    id: i64,
    status: DeliveryStatus,
    updated_by: &str,
    conn: &mut SqliteConnection,
) -> Result<Delivery, SettlementError> {
    let row: Option<Delivery> = sqlx::query_as(
        "UPDATE deliveries SET status = $1, updated_by = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3 RETURNING *",
    )
    .bind(status)
    .bind(updated_by)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    row.ok_or_else(|| SettlementError::DatabaseError(format!("delivery {id} vanished mid-transaction")))
}

/// Appends one entry to the delivery audit trail. Every status transition writes exactly one of these.
pub async fn insert_audit(
    delivery_id: i64,
    order_id: i64,
    previous_status: DeliveryStatus,
    new_status: DeliveryStatus,
    actor: &str,
    note: &str,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO delivery_audit_log (delivery_id, order_id, previous_status, new_status, actor, note)
            VALUES ($1, $2, $3, $4, $5, $6);
        "#,
    )
    .bind(delivery_id)
    .bind(order_id)
    .bind(previous_status)
    .bind(new_status)
    .bind(actor)
    .bind(note)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_audit(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<DeliveryAuditEntry>, sqlx::Error> {
    let rows = sqlx::query_as("SELECT * FROM delivery_audit_log WHERE order_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}
