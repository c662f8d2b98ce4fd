use log::debug;
use smk_common::Kg;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CatalogAction, CatalogItem, CatalogLogEntry, NewCatalogItem},
    traits::SettlementError,
};

pub async fn fetch_item(id: i64, conn: &mut SqliteConnection) -> Result<Option<CatalogItem>, sqlx::Error> {
    let item = sqlx::query_as("SELECT * FROM catalog_items WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(item)
}

pub async fn insert_item(item: NewCatalogItem, conn: &mut SqliteConnection) -> Result<CatalogItem, SettlementError> {
    let item: CatalogItem = sqlx::query_as(
        r#"
            INSERT INTO catalog_items (seller_id, name, species, price_per_kg, available_weight)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(item.seller_id)
    .bind(item.name)
    .bind(item.species)
    .bind(item.price_per_kg)
    .bind(item.available_weight)
    .fetch_one(conn)
    .await?;
    debug!("🐟️ Catalogue item '{}' listed with id {}", item.name, item.id);
    Ok(item)
}

/// Deducts sold stock from a catalogue item, marking it sold when nothing remains. Called only when an order
/// reaches full settlement.
pub async fn reduce_stock(
    item_id: i64,
    weight: Kg,
    conn: &mut SqliteConnection,
) -> Result<CatalogItem, SettlementError> {
    let item: Option<CatalogItem> = sqlx::query_as(
        r#"
            UPDATE catalog_items
            SET available_weight = MAX(available_weight - $1, 0),
                status = CASE WHEN available_weight - $1 <= 0 THEN 'sold' ELSE status END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(weight)
    .bind(item_id)
    .fetch_optional(conn)
    .await?;
    item.ok_or(SettlementError::CatalogItemNotFound(item_id))
}

/// Appends one entry to the catalogue audit log.
pub async fn log_action(
    catalog_item_id: Option<i64>,
    action: CatalogAction,
    actor: &str,
    weight_change: Option<Kg>,
    note: &str,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO catalog_log (catalog_item_id, action, actor, weight_change, note) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(catalog_item_id)
    .bind(action)
    .bind(actor)
    .bind(weight_change)
    .bind(note)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_log_for_item(
    catalog_item_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<CatalogLogEntry>, sqlx::Error> {
    let entries =
        sqlx::query_as("SELECT * FROM catalog_log WHERE catalog_item_id = $1 ORDER BY created_at ASC, id ASC")
            .bind(catalog_item_id)
            .fetch_all(conn)
            .await?;
    Ok(entries)
}
