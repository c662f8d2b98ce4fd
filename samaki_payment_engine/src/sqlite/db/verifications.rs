use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPhoneVerification, PhoneVerificationCharge},
    traits::SettlementError,
};

pub async fn insert(
    verification: NewPhoneVerification,
    conn: &mut SqliteConnection,
) -> Result<PhoneVerificationCharge, SettlementError> {
    let row = sqlx::query_as(
        r#"
            INSERT INTO phone_verifications (seller_id, phone_number, amount, merchant_request_id, checkout_request_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(&verification.seller_id)
    .bind(&verification.phone_number)
    .bind(verification.amount)
    .bind(&verification.merchant_request_id)
    .bind(&verification.checkout_request_id)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// The verification-flow twin of [`super::charges::claim_by_checkout_request_id`]: fetch-with-write-lock, so
/// duplicate verification callbacks serialise too.
pub async fn claim_by_checkout_request_id(
    checkout_request_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PhoneVerificationCharge>, sqlx::Error> {
    let row: Option<PhoneVerificationCharge> = sqlx::query_as(
        "UPDATE phone_verifications SET updated_at = CURRENT_TIMESTAMP WHERE checkout_request_id = $1 RETURNING *",
    )
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
) -> Result<PhoneVerificationCharge, SettlementError> {
    let row: Option<PhoneVerificationCharge> = sqlx::query_as(
        r#"
            UPDATE phone_verifications
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
    row.ok_or_else(|| SettlementError::DatabaseError(format!("phone verification {id} vanished mid-transaction")))
}

pub(crate) async fn mark_failed(
    id: i64,
    result_code: i64,
    result_desc: &str,
    conn: &mut SqliteConnection,
) -> Result<PhoneVerificationCharge, SettlementError> {
    let row: Option<PhoneVerificationCharge> = sqlx::query_as(
        r#"
            UPDATE phone_verifications
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
    row.ok_or_else(|| SettlementError::DatabaseError(format!("phone verification {id} vanished mid-transaction")))
}
