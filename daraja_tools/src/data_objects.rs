//! Wire-format types for the Daraja STK push API.
//!
//! The JSON field names and nesting here are dictated by Safaricom and must be preserved exactly; everything the
//! settlement engine consumes is re-expressed through [`PaymentCallback`].
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smk_common::Kes;

use crate::DarajaApiError;

/// The result code recorded when a callback carries a code that does not parse as an integer. Treated as a failure,
/// never as success.
pub const INVALID_RESULT_CODE: i64 = -1;

//--------------------------------------   STK push request   --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    CustomerPayBillOnline,
    CustomerBuyGoodsOnline,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::CustomerPayBillOnline => "CustomerPayBillOnline",
            TransactionType::CustomerBuyGoodsOnline => "CustomerBuyGoodsOnline",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StkPushRequest {
    #[serde(rename = "BusinessShortCode")]
    pub business_short_code: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "TransactionType")]
    pub transaction_type: String,
    #[serde(rename = "Amount")]
    pub amount: String,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "PartyB")]
    pub party_b: String,
    #[serde(rename = "PhoneNumber")]
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    #[serde(rename = "AccountReference")]
    pub account_reference: String,
    #[serde(rename = "TransactionDesc")]
    pub transaction_desc: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResponseCode")]
    pub response_code: Option<String>,
    #[serde(rename = "ResponseDescription")]
    pub response_description: Option<String>,
    #[serde(rename = "CustomerMessage")]
    pub customer_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DarajaErrorResponse {
    #[serde(rename = "requestId")]
    pub request_id: Option<String>,
    #[serde(rename = "errorCode")]
    pub error_code: Option<String>,
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkQueryResponse {
    #[serde(rename = "ResponseCode")]
    pub response_code: Option<String>,
    #[serde(rename = "ResponseDescription")]
    pub response_description: Option<String>,
    #[serde(rename = "ResultCode")]
    pub result_code: Option<Value>,
    #[serde(rename = "ResultDesc")]
    pub result_desc: Option<String>,
}

//--------------------------------------   Callback envelope   -------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
struct CallbackEnvelope {
    #[serde(rename = "Body")]
    body: CallbackBody,
}

#[derive(Debug, Clone, Deserialize)]
struct CallbackBody {
    #[serde(rename = "stkCallback")]
    stk_callback: StkCallback,
}

#[derive(Debug, Clone, Deserialize)]
struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: Option<String>,
    #[serde(rename = "ResultCode")]
    result_code: Option<Value>,
    #[serde(rename = "ResultDesc")]
    result_desc: Option<String>,
    #[serde(rename = "CallbackMetadata")]
    callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    item: Vec<MetadataItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct MetadataItem {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Value")]
    value: Option<Value>,
}

//--------------------------------------   Parsed callback   ---------------------------------------------------------
/// A gateway payment result, as consumed by the settlement engine: one asynchronous message reporting the outcome
/// of a previously issued charge request.
#[derive(Debug, Clone)]
pub struct PaymentCallback {
    /// True iff the normalised result code signals success.
    pub success: bool,
    /// The gateway-assigned id of the charge request this result belongs to. The idempotency key.
    pub checkout_request_id: String,
    pub merchant_request_id: String,
    /// The gateway result code, normalised to [`INVALID_RESULT_CODE`] when it does not parse as an integer.
    pub result_code: i64,
    pub result_desc: String,
    /// The settled amount, when the gateway reports one. Absent on failures.
    pub amount: Option<Kes>,
    /// The M-Pesa receipt number, when present.
    pub receipt: Option<String>,
    pub phone_number: Option<String>,
    pub transaction_date: Option<i64>,
}

fn normalize_result_code(raw: Option<&Value>) -> i64 {
    match raw {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(INVALID_RESULT_CODE),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(INVALID_RESULT_CODE),
        _ => INVALID_RESULT_CODE,
    }
}

fn amount_from_value(value: &Value) -> Result<Kes, DarajaApiError> {
    match value {
        Value::Number(n) => {
            if let Some(shillings) = n.as_i64() {
                Ok(Kes::from_shillings(shillings))
            } else if let Some(f) = n.as_f64() {
                Kes::try_from_f64(f).map_err(|e| DarajaApiError::InvalidCurrencyAmount(e.to_string()))
            } else {
                Err(DarajaApiError::InvalidCurrencyAmount(n.to_string()))
            }
        },
        Value::String(s) => s.parse().map_err(|_| DarajaApiError::InvalidCurrencyAmount(s.clone())),
        other => Err(DarajaApiError::InvalidCurrencyAmount(other.to_string())),
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a raw STK result payload into a [`PaymentCallback`].
///
/// Result codes that fail to parse as integers are normalised to [`INVALID_RESULT_CODE`] and reported as failures.
/// A payload without a `CheckoutRequestID` is unusable and rejected outright, since there is nothing to reconcile
/// it against.
pub fn parse_callback(raw: &str) -> Result<PaymentCallback, DarajaApiError> {
    let envelope: CallbackEnvelope =
        serde_json::from_str(raw).map_err(|e| DarajaApiError::CallbackParse(e.to_string()))?;
    let cb = envelope.body.stk_callback;
    let checkout_request_id = match cb.checkout_request_id {
        Some(id) if !id.is_empty() => id,
        _ => return Err(DarajaApiError::CallbackParse("missing CheckoutRequestID".to_string())),
    };
    let result_code = normalize_result_code(cb.result_code.as_ref());
    let result_desc = cb.result_desc.unwrap_or_default();
    let merchant_request_id = cb.merchant_request_id.unwrap_or_default();

    let mut amount = None;
    let mut receipt = None;
    let mut phone_number = None;
    let mut transaction_date = None;
    if result_code == 0 {
        for item in cb.callback_metadata.map(|m| m.item).unwrap_or_default() {
            let (name, value) = match (item.name, item.value) {
                (Some(n), Some(v)) => (n, v),
                _ => continue,
            };
            match name.as_str() {
                "Amount" => match amount_from_value(&value) {
                    Ok(kes) => amount = Some(kes),
                    Err(e) => {
                        error!("📨️ Unusable Amount in callback for {checkout_request_id}: {e}");
                        return Err(e);
                    },
                },
                "MpesaReceiptNumber" => receipt = value_as_string(&value),
                "PhoneNumber" => phone_number = value_as_string(&value),
                "TransactionDate" => transaction_date = value.as_i64(),
                _ => {},
            }
        }
    }
    Ok(PaymentCallback {
        success: result_code == 0,
        checkout_request_id,
        merchant_request_id,
        result_code,
        result_desc,
        amount,
        receipt,
        phone_number,
        transaction_date,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    const SUCCESS_PAYLOAD: &str = r#"{
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": "ws_CO_191220191020363925",
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        {"Name": "Amount", "Value": 1000.00},
                        {"Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV"},
                        {"Name": "TransactionDate", "Value": 20191219102115},
                        {"Name": "PhoneNumber", "Value": 254708374149}
                    ]
                }
            }
        }
    }"#;

    #[test]
    fn parses_successful_callback() {
        let cb = parse_callback(SUCCESS_PAYLOAD).unwrap();
        assert!(cb.success);
        assert_eq!(cb.checkout_request_id, "ws_CO_191220191020363925");
        assert_eq!(cb.merchant_request_id, "29115-34620561-1");
        assert_eq!(cb.result_code, 0);
        assert_eq!(cb.amount, Some(Kes::from_shillings(1000)));
        assert_eq!(cb.receipt.as_deref(), Some("NLJ7RT61SV"));
        assert_eq!(cb.phone_number.as_deref(), Some("254708374149"));
        assert_eq!(cb.transaction_date, Some(20191219102115));
    }

    #[test]
    fn parses_failed_callback_without_metadata() {
        let payload = r#"{
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "29115-34620561-2",
                    "CheckoutRequestID": "ws_CO_failed",
                    "ResultCode": 1032,
                    "ResultDesc": "Request cancelled by user"
                }
            }
        }"#;
        let cb = parse_callback(payload).unwrap();
        assert!(!cb.success);
        assert_eq!(cb.result_code, 1032);
        assert_eq!(cb.result_desc, "Request cancelled by user");
        assert!(cb.amount.is_none());
        assert!(cb.receipt.is_none());
    }

    #[test]
    fn garbage_result_code_is_never_success() {
        let payload = r#"{
            "Body": {
                "stkCallback": {
                    "CheckoutRequestID": "ws_CO_odd",
                    "ResultCode": "not-a-number",
                    "ResultDesc": "???"
                }
            }
        }"#;
        let cb = parse_callback(payload).unwrap();
        assert!(!cb.success);
        assert_eq!(cb.result_code, INVALID_RESULT_CODE);
        // String-typed but numeric codes still parse
        let payload = payload.replace("not-a-number", "0");
        let cb = parse_callback(&payload).unwrap();
        assert!(cb.success);
        assert_eq!(cb.result_code, 0);
    }

    #[test]
    fn missing_checkout_request_id_is_rejected() {
        let payload = r#"{"Body": {"stkCallback": {"ResultCode": 0, "ResultDesc": "ok"}}}"#;
        let err = parse_callback(payload).unwrap_err();
        assert!(matches!(err, DarajaApiError::CallbackParse(_)));
        let err = parse_callback("this is not json").unwrap_err();
        assert!(matches!(err, DarajaApiError::CallbackParse(_)));
    }

    #[test]
    fn integral_and_fractional_amounts_normalise_to_cents() {
        let payload = SUCCESS_PAYLOAD.replace("1000.00", "499.95");
        let cb = parse_callback(&payload).unwrap();
        assert_eq!(cb.amount, Some(Kes::from_cents(49_995)));
        let payload = SUCCESS_PAYLOAD.replace("1000.00", "500");
        let cb = parse_callback(&payload).unwrap();
        assert_eq!(cb.amount, Some(Kes::from_shillings(500)));
    }
}
