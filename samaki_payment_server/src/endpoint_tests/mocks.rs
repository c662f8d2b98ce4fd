use mockall::mock;
use samaki_payment_engine::traits::{ChargeHandle, ChargeInstruction, GatewayError, PaymentGateway};

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn initiate_charge(&self, instruction: ChargeInstruction) -> Result<ChargeHandle, GatewayError>;
    }
}

pub fn accepting_gateway(checkout_request_id: &'static str) -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_initiate_charge().returning(move |_| {
        Ok(ChargeHandle {
            checkout_request_id: checkout_request_id.to_string(),
            merchant_request_id: format!("MRQ-{checkout_request_id}"),
        })
    });
    gateway
}
