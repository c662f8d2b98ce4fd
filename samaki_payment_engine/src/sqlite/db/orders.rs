use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewLineItem, NewOrder, Order, OrderLineItem, OrderNumber, OrderStatusType},
    traits::SettlementError,
};

/// Inserts the order row. Line items are inserted separately so the caller can wrap the whole checkout block in
/// one transaction and pass `&mut *tx` here.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, SettlementError> {
    let row: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                customer_id,
                customer_phone,
                customer_email,
                status,
                total_amount,
                platform_fee,
                sellers_net_amount,
                fulfillment_method,
                pickup_point,
                delivery_location,
                delivery_address,
                delivery_notes
            ) VALUES ($1, $2, $3, $4, 'PENDING', $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *;
        "#,
    )
    .bind(&order.order_number)
    .bind(&order.customer_id)
    .bind(&order.customer_phone)
    .bind(&order.customer_email)
    .bind(order.total_amount)
    .bind(order.platform_fee)
    .bind(order.sellers_net_amount)
    .bind(order.fulfillment_method)
    .bind(&order.pickup_point)
    .bind(&order.delivery_location)
    .bind(&order.delivery_address)
    .bind(&order.delivery_notes)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order {} has been saved in the DB with id {}", row.order_number, row.id);
    Ok(row)
}

pub async fn insert_line_item(
    order_id: i64,
    line: &NewLineItem,
    conn: &mut SqliteConnection,
) -> Result<OrderLineItem, SettlementError> {
    let row = sqlx::query_as(
        r#"
            INSERT INTO order_items (
                order_id,
                catalog_item_id,
                seller_id,
                name,
                species,
                unit_price,
                weight,
                line_total,
                platform_fee,
                seller_net_payout
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(line.catalog_item_id)
    .bind(&line.seller_id)
    .bind(&line.name)
    .bind(&line.species)
    .bind(line.unit_price)
    .bind(line.weight)
    .bind(line.line_total)
    .bind(line.platform_fee)
    .bind(line.seller_net_payout)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(number.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub(crate) async fn update_order_status(
    id: i64,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, SettlementError> {
    let result: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(id)
            .fetch_optional(conn)
            .await?;
    result.ok_or(SettlementError::OrderIdNotFound(id))
}

pub async fn fetch_line_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderLineItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn fetch_line_item(id: i64, conn: &mut SqliteConnection) -> Result<Option<OrderLineItem>, sqlx::Error> {
    let item = sqlx::query_as("SELECT * FROM order_items WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(item)
}

/// Marks a line item PAID iff it is not already. Returns the updated row on the first transition and `None` on
/// every subsequent call, which is what gates the once-only ledger emission.
pub(crate) async fn mark_line_paid_once(
    line_item_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderLineItem>, sqlx::Error> {
    let row: Option<OrderLineItem> =
        sqlx::query_as("UPDATE order_items SET status = 'PAID' WHERE id = $1 AND status <> 'PAID' RETURNING *")
            .bind(line_item_id)
            .fetch_optional(conn)
            .await?;
    Ok(row)
}
