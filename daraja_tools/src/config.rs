use std::time::Duration;

use log::*;
use smk_common::Secret;

use crate::helpers::is_public_url;

const DEFAULT_BASE_URL: &str = "https://sandbox.safaricom.co.ke";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct DarajaConfig {
    pub consumer_key: Secret<String>,
    pub consumer_secret: Secret<String>,
    /// The paybill/till number that charges settle against when a seller has not supplied their own shortcode.
    pub business_short_code: String,
    pub passkey: Secret<String>,
    /// Where Daraja posts STK results. Must be publicly reachable or the gateway can never call back.
    pub callback_url: String,
    pub base_url: String,
    /// Applied to every outbound gateway call. A timed-out STK push counts as a charge-issuance failure.
    pub timeout: Duration,
}

impl Default for DarajaConfig {
    fn default() -> Self {
        Self {
            consumer_key: Secret::default(),
            consumer_secret: Secret::default(),
            business_short_code: String::default(),
            passkey: Secret::default(),
            callback_url: String::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl DarajaConfig {
    pub fn new_from_env_or_default() -> Self {
        let consumer_key = Secret::new(std::env::var("DARAJA_CONSUMER_KEY").unwrap_or_else(|_| {
            warn!("🪛️ DARAJA_CONSUMER_KEY is not set. STK push requests will be rejected by the gateway.");
            String::default()
        }));
        let consumer_secret = Secret::new(std::env::var("DARAJA_CONSUMER_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ DARAJA_CONSUMER_SECRET is not set. STK push requests will be rejected by the gateway.");
            String::default()
        }));
        let business_short_code = std::env::var("DARAJA_SHORT_CODE").unwrap_or_else(|_| {
            warn!("🪛️ DARAJA_SHORT_CODE is not set. Using the sandbox test paybill.");
            "174379".to_string()
        });
        let passkey = Secret::new(std::env::var("DARAJA_PASSKEY").unwrap_or_else(|_| {
            warn!("🪛️ DARAJA_PASSKEY is not set. STK push requests will be rejected by the gateway.");
            String::default()
        }));
        let callback_url = std::env::var("DARAJA_CALLBACK_URL").unwrap_or_else(|_| {
            warn!("🪛️ DARAJA_CALLBACK_URL is not set. Checkout will be refused until it points at a public URL.");
            String::default()
        });
        let base_url = std::env::var("DARAJA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout = std::env::var("DARAJA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid value for DARAJA_TIMEOUT_SECS ({s}): {e}. Using the default."))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        Self { consumer_key, consumer_secret, business_short_code, passkey, callback_url, base_url, timeout }
    }

    /// Whether the configured callback URL is one the gateway can actually reach. Local and loopback hosts are
    /// rejected, since an STK result posted there would be lost.
    pub fn has_public_callback_url(&self) -> bool {
        is_public_url(&self.callback_url)
    }
}
