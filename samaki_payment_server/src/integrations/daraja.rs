//! Adapts the Daraja client to the engine's [`PaymentGateway`] trait and its callback payloads to the engine's
//! provider-agnostic [`PaymentCallback`].
use daraja_tools::{DarajaApi, DarajaApiError, StkPushArgs, TransactionType};
use log::*;
use samaki_payment_engine::{
    db_types::{PaymentCallback, PayoutKind},
    traits::{ChargeHandle, ChargeInstruction, GatewayError, PaymentGateway},
};

#[derive(Clone)]
pub struct DarajaGateway {
    api: DarajaApi,
}

impl DarajaGateway {
    pub fn new(api: DarajaApi) -> Self {
        Self { api }
    }
}

impl PaymentGateway for DarajaGateway {
    async fn initiate_charge(&self, instruction: ChargeInstruction) -> Result<ChargeHandle, GatewayError> {
        // STK and paybill settlements ride the paybill transaction type; till settlements use buy-goods.
        let transaction_type = match instruction.payout_kind {
            PayoutKind::StkPush | PayoutKind::Paybill => TransactionType::CustomerPayBillOnline,
            PayoutKind::Till => TransactionType::CustomerBuyGoodsOnline,
        };
        let args = StkPushArgs {
            phone_number: instruction.payer_phone,
            amount: instruction.amount,
            order_number: instruction.order_number.as_str().to_string(),
            business_shortcode: instruction.settlement_shortcode,
            account_reference: instruction.account_reference,
            transaction_type,
        };
        match self.api.stk_push(args).await {
            Ok(response) => Ok(ChargeHandle {
                checkout_request_id: response.checkout_request_id,
                merchant_request_id: response.merchant_request_id,
            }),
            Err(DarajaApiError::QueryError { status, message }) => {
                debug!("📡️ Gateway rejected charge ({status}): {message}");
                Err(GatewayError::Rejected(message))
            },
            Err(DarajaApiError::AccessToken(e)) => Err(GatewayError::Authentication(e)),
            Err(e) => Err(GatewayError::Unreachable(e.to_string())),
        }
    }
}

/// Re-expresses a parsed Daraja callback as the engine's provider-agnostic payment result.
pub fn callback_from_daraja(callback: daraja_tools::PaymentCallback) -> PaymentCallback {
    PaymentCallback {
        external_id: callback.checkout_request_id,
        result_code: callback.result_code,
        result_desc: callback.result_desc,
        success: callback.success,
        amount: callback.amount,
        receipt: callback.receipt,
    }
}
