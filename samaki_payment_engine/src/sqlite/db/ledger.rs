//! Append-only ledger records: seller payout notifications and platform fee entries.
//!
//! Both tables carry a unique constraint on `charge_request_id`, and inserts go through
//! `ON CONFLICT DO NOTHING` followed by a fetch. That pair is what guarantees at-most-once emission per settled
//! charge even if a duplicate callback somehow races past the status guard.
use sqlx::SqliteConnection;

use crate::{
    db_types::{ChargeRequest, Order, OrderLineItem, PlatformFeeEntry, SellerNotification},
    traits::SettlementError,
};

pub async fn get_or_create_notification(
    order: &Order,
    line: &OrderLineItem,
    charge: &ChargeRequest,
    conn: &mut SqliteConnection,
) -> Result<SellerNotification, SettlementError> {
    let message = format!(
        "Payment received from {} for {}. {}, {} gross, {} net, receipt {}.",
        order.customer_id,
        line.name,
        line.weight,
        charge.amount,
        charge.net_payout,
        charge.receipt_number
    );
    sqlx::query(
        r#"
            INSERT INTO seller_notifications (
                seller_id, buyer_id, order_id, charge_request_id,
                item_name, weight, gross_amount, net_amount, receipt_number, message
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (charge_request_id) DO NOTHING;
        "#,
    )
    .bind(&charge.seller_id)
    .bind(&order.customer_id)
    .bind(order.id)
    .bind(charge.id)
    .bind(&line.name)
    .bind(line.weight)
    .bind(charge.amount)
    .bind(charge.net_payout)
    .bind(&charge.receipt_number)
    .bind(message)
    .execute(&mut *conn)
    .await?;
    let row: SellerNotification = sqlx::query_as("SELECT * FROM seller_notifications WHERE charge_request_id = $1")
        .bind(charge.id)
        .fetch_one(conn)
        .await?;
    Ok(row)
}

pub async fn get_or_create_fee_entry(
    order: &Order,
    charge: &ChargeRequest,
    conn: &mut SqliteConnection,
) -> Result<PlatformFeeEntry, SettlementError> {
    sqlx::query(
        r#"
            INSERT INTO platform_fee_log (order_id, charge_request_id, seller_id, gross_amount, fee_amount, net_amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (charge_request_id) DO NOTHING;
        "#,
    )
    .bind(order.id)
    .bind(charge.id)
    .bind(&charge.seller_id)
    .bind(charge.amount)
    .bind(charge.platform_fee)
    .bind(charge.net_payout)
    .execute(&mut *conn)
    .await?;
    let row: PlatformFeeEntry = sqlx::query_as("SELECT * FROM platform_fee_log WHERE charge_request_id = $1")
        .bind(charge.id)
        .fetch_one(conn)
        .await?;
    Ok(row)
}

pub async fn fetch_notifications_for_seller(
    seller_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<SellerNotification>, sqlx::Error> {
    let rows = sqlx::query_as("SELECT * FROM seller_notifications WHERE seller_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(seller_id)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

pub async fn fetch_fee_entries_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<PlatformFeeEntry>, sqlx::Error> {
    let rows = sqlx::query_as("SELECT * FROM platform_fee_log WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}
