use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use log::*;
use reqwest::Client;
use serde::Deserialize;
use smk_common::Kes;

use crate::{
    data_objects::{DarajaErrorResponse, StkPushRequest, StkPushResponse, StkQueryResponse, TransactionType},
    helpers::normalize_msisdn,
    DarajaApiError,
    DarajaConfig,
};

/// OAuth tokens are valid for an hour; refresh with a 10 minute safety margin.
const TOKEN_LIFETIME_MINUTES: i64 = 50;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Everything needed to issue one STK push against a specific settlement destination.
#[derive(Debug, Clone)]
pub struct StkPushArgs {
    /// The payer's phone, in any of the accepted local formats.
    pub phone_number: String,
    pub amount: Kes,
    /// The marketplace order this charge belongs to. Only used for the transaction description.
    pub order_number: String,
    /// Seller-specific paybill/till. Falls back to the configured business shortcode when absent.
    pub business_shortcode: Option<String>,
    pub account_reference: String,
    pub transaction_type: TransactionType,
}

#[derive(Clone)]
pub struct DarajaApi {
    config: DarajaConfig,
    client: Arc<Client>,
    token: Arc<Mutex<Option<CachedToken>>>,
}

impl DarajaApi {
    pub fn new(config: DarajaConfig) -> Result<Self, DarajaApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DarajaApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client), token: Arc::new(Mutex::new(None)) })
    }

    pub fn config(&self) -> &DarajaConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// Returns a valid OAuth access token, fetching a fresh one when the cached token has expired.
    pub async fn access_token(&self) -> Result<String, DarajaApiError> {
        if let Some(cached) = &*self.token.lock().map_err(|e| DarajaApiError::AccessToken(e.to_string()))? {
            if Utc::now() < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }
        let url = self.url("/oauth/v1/generate?grant_type=client_credentials");
        let response = self
            .client
            .get(url)
            .basic_auth(self.config.consumer_key.reveal(), Some(self.config.consumer_secret.reveal()))
            .send()
            .await
            .map_err(|e| DarajaApiError::AccessToken(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(DarajaApiError::QueryError { status, message });
        }
        let token =
            response.json::<TokenResponse>().await.map_err(|e| DarajaApiError::JsonError(e.to_string()))?.access_token;
        debug!("📡️ Obtained a fresh Daraja access token");
        let expires_at = Utc::now() + Duration::minutes(TOKEN_LIFETIME_MINUTES);
        *self.token.lock().map_err(|e| DarajaApiError::AccessToken(e.to_string()))? =
            Some(CachedToken { token: token.clone(), expires_at });
        Ok(token)
    }

    /// The request password: `base64(shortcode + passkey + timestamp)`, computed over the shortcode the request is
    /// actually made against.
    fn password(&self, shortcode: &str, timestamp: &str) -> String {
        base64::encode(format!("{shortcode}{}{timestamp}", self.config.passkey.reveal()))
    }

    /// Push a payment prompt to the payer's phone. Returns the gateway's request handles on acceptance; the actual
    /// payment outcome arrives later on the callback URL.
    pub async fn stk_push(&self, args: StkPushArgs) -> Result<StkPushResponse, DarajaApiError> {
        let access_token = self.access_token().await?;
        let timestamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        let shortcode = args.business_shortcode.unwrap_or_else(|| self.config.business_short_code.clone());
        let phone = normalize_msisdn(&args.phone_number);
        let payload = StkPushRequest {
            password: self.password(&shortcode, &timestamp),
            timestamp,
            transaction_type: args.transaction_type.as_str().to_string(),
            amount: args.amount.whole_shillings().to_string(),
            party_a: phone.clone(),
            party_b: shortcode.clone(),
            business_short_code: shortcode,
            phone_number: phone,
            callback_url: self.config.callback_url.clone(),
            account_reference: args.account_reference,
            transaction_desc: format!("Payment for Order #{}", args.order_number),
        };
        trace!("📡️ Sending STK push for order #{}", args.order_number);
        let response = self
            .client
            .post(self.url("/mpesa/stkpush/v1/processrequest"))
            .bearer_auth(&access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DarajaApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            let result =
                response.json::<StkPushResponse>().await.map_err(|e| DarajaApiError::JsonError(e.to_string()))?;
            info!("📡️ STK push accepted for order #{} [{}]", args.order_number, result.checkout_request_id);
            Ok(result)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| DarajaApiError::RestResponseError(e.to_string()))?;
            let message = serde_json::from_str::<DarajaErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error_message)
                .unwrap_or_else(|| "STK push request failed".to_string());
            warn!("📡️ STK push rejected with status {status}: {message}");
            Err(DarajaApiError::QueryError { status, message })
        }
    }

    /// Poll the status of a previously issued STK push. The callback is the authoritative settlement signal; this
    /// is only useful for support tooling when a callback has gone missing.
    pub async fn stk_query(&self, checkout_request_id: &str) -> Result<StkQueryResponse, DarajaApiError> {
        let access_token = self.access_token().await?;
        let timestamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        let shortcode = self.config.business_short_code.clone();
        let payload = serde_json::json!({
            "BusinessShortCode": shortcode,
            "Password": self.password(&shortcode, &timestamp),
            "Timestamp": timestamp,
            "CheckoutRequestID": checkout_request_id,
        });
        let response = self
            .client
            .post(self.url("/mpesa/stkpushquery/v1/query"))
            .bearer_auth(&access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DarajaApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            response.json::<StkQueryResponse>().await.map_err(|e| DarajaApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(DarajaApiError::QueryError { status, message })
        }
    }
}
