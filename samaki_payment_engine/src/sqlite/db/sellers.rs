use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewSellerProfile, SellerProfile},
    traits::SettlementError,
};

pub async fn fetch_profile(seller_id: &str, conn: &mut SqliteConnection) -> Result<Option<SellerProfile>, sqlx::Error> {
    let profile = sqlx::query_as("SELECT * FROM seller_profiles WHERE seller_id = $1")
        .bind(seller_id)
        .fetch_optional(conn)
        .await?;
    Ok(profile)
}

pub async fn upsert_profile(
    profile: NewSellerProfile,
    conn: &mut SqliteConnection,
) -> Result<SellerProfile, SettlementError> {
    let profile: SellerProfile = sqlx::query_as(
        r#"
            INSERT INTO seller_profiles (
                seller_id,
                contact_phone,
                payout_phone,
                payout_kind,
                paybill_number,
                till_number,
                account_reference,
                verified
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (seller_id) DO UPDATE SET
                contact_phone = excluded.contact_phone,
                payout_phone = excluded.payout_phone,
                payout_kind = excluded.payout_kind,
                paybill_number = excluded.paybill_number,
                till_number = excluded.till_number,
                account_reference = excluded.account_reference,
                verified = excluded.verified,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(profile.seller_id)
    .bind(profile.contact_phone)
    .bind(profile.payout_phone)
    .bind(profile.payout_kind)
    .bind(profile.paybill_number)
    .bind(profile.till_number)
    .bind(profile.account_reference)
    .bind(profile.verified)
    .fetch_one(conn)
    .await?;
    Ok(profile)
}

pub async fn mark_verified(seller_id: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE seller_profiles SET verified = 1, updated_at = CURRENT_TIMESTAMP WHERE seller_id = $1")
        .bind(seller_id)
        .execute(conn)
        .await?;
    debug!("🧑‍🌾️ Seller {seller_id} marked as verified");
    Ok(())
}

pub async fn mark_phone_verified(seller_id: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE seller_profiles SET phone_verified = 1, updated_at = CURRENT_TIMESTAMP WHERE seller_id = $1")
        .bind(seller_id)
        .execute(conn)
        .await?;
    debug!("🧑‍🌾️ Seller {seller_id} phone ownership verified");
    Ok(())
}
