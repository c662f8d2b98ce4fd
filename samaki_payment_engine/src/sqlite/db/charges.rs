use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{ChargeRequest, NewChargeRequest},
    traits::SettlementError,
};

pub async fn insert(charge: NewChargeRequest, conn: &mut SqliteConnection) -> Result<ChargeRequest, SettlementError> {
    let row: ChargeRequest = sqlx::query_as(
        r#"
            INSERT INTO charge_requests (
                order_id,
                line_item_id,
                seller_id,
                checkout_request_id,
                merchant_request_id,
                amount,
                platform_fee,
                net_payout,
                payer_phone,
                status,
                result_desc
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *;
        "#,
    )
    .bind(charge.order_id)
    .bind(charge.line_item_id)
    .bind(&charge.seller_id)
    .bind(&charge.checkout_request_id)
    .bind(&charge.merchant_request_id)
    .bind(charge.amount)
    .bind(charge.platform_fee)
    .bind(charge.net_payout)
    .bind(&charge.payer_phone)
    .bind(charge.status)
    .bind(&charge.result_desc)
    .fetch_one(conn)
    .await?;
    debug!("🧾️ Charge request [{}] recorded as {} for order id {}", row.checkout_request_id, row.status, row.order_id);
    Ok(row)
}

/// Fetches the charge request for the given gateway id while taking the write lock on it.
///
/// Claiming via `UPDATE … RETURNING` (rather than a plain SELECT) forces the enclosing transaction to acquire the
/// database write lock up front, so two deliveries of the same callback serialise before either has branched on
/// the charge's status.
pub async fn claim_by_checkout_request_id(
    checkout_request_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ChargeRequest>, sqlx::Error> {
    let row: Option<ChargeRequest> =
        sqlx::query_as("UPDATE charge_requests SET updated_at = CURRENT_TIMESTAMP WHERE checkout_request_id = $1 RETURNING *")
            .bind(checkout_request_id)
            .fetch_optional(conn)
            .await?;
    Ok(row)
}

pub(crate) async fn mark_completed(
    id: i64,
    result_code: i64,
    result_desc: &str,
    receipt_number: &str,
    conn: &mut SqliteConnection,
) -> Result<ChargeRequest, SettlementError> {
    let row: Option<ChargeRequest> = sqlx::query_as(
        r#"
            UPDATE charge_requests
            SET status = 'COMPLETED',
                result_code = $1,
                result_desc = $2,
                receipt_number = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
            RETURNING *;
        "#,
    )
    .bind(result_code)
    .bind(result_desc)
    .bind(receipt_number)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    row.ok_or_else(|| SettlementError::DatabaseError(format!("charge request {id} vanished mid-transaction")))
}

pub(crate) async fn mark_failed(
    id: i64,
    result_code: i64,
    result_desc: &str,
    conn: &mut SqliteConnection,
) -> Result<ChargeRequest, SettlementError> {
    let row: Option<ChargeRequest> = sqlx::query_as(
        r#"
            UPDATE charge_requests
            SET status = 'FAILED', result_code = $1, result_desc = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(result_code)
    .bind(result_desc)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    row.ok_or_else(|| SettlementError::DatabaseError(format!("charge request {id} vanished mid-transaction")))
}

/// Counts the (PENDING, FAILED) charges for an order. (0, 0) is the full-settlement condition.
pub async fn count_open(order_id: i64, conn: &mut SqliteConnection) -> Result<(i64, i64), sqlx::Error> {
    let (pending, failed): (i64, i64) = sqlx::query_as(
        r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'PENDING' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'FAILED' THEN 1 ELSE 0 END), 0)
            FROM charge_requests
            WHERE order_id = $1;
        "#,
    )
    .bind(order_id)
    .fetch_one(conn)
    .await?;
    Ok((pending, failed))
}

pub async fn fetch_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<ChargeRequest>, sqlx::Error> {
    let rows = sqlx::query_as("SELECT * FROM charge_requests WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}
