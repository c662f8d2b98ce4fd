//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will
//! cause the current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation
//! (I/O, database queries, the outbound gateway calls made during checkout) is expressed as a future so worker
//! threads keep serving other requests while it is in flight.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use samaki_payment_engine::{
    db_types::OrderNumber,
    traits::{PaymentGateway, ReconcileOutcome, SettlementDatabase, SettlementError},
    CheckoutApi,
    FulfillmentApi,
    SettlementApi,
};

use crate::{
    config::ServerOptions,
    data_objects::{CancelOrderRequest, CheckoutRequest, CheckoutResponse, DeliveryUpdateRequest, JsonResponse},
    errors::ServerError,
    integrations::daraja::callback_from_daraja,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl SettlementDatabase, PaymentGateway);
/// The checkout trigger. Invoked by the out-of-scope web-form handler with the validated cart, buyer identity and
/// fulfillment choice; returns the created order reference plus any per-line charge-issuance failures.
///
/// Validation failures abort with a 400 before anything is written. Charge-issuance failures do not: the order
/// exists (marked FAILED) and the response body lists which lines failed and why.
pub async fn checkout<B, G>(
    body: web::Json<CheckoutRequest>,
    api: web::Data<CheckoutApi<B, G>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    G: PaymentGateway,
{
    let request = body.into_inner();
    debug!("💻️ POST checkout for customer {} ({} lines)", request.buyer.customer_id, request.cart.lines.len());
    if !options.callback_url_public {
        // A gateway that cannot call back would strand every charge as PENDING forever.
        return Err(ServerError::ValidationError(
            "Payment callback URL is not publicly accessible. Set DARAJA_CALLBACK_URL to your live public URL."
                .to_string(),
        ));
    }
    let outcome = api.place_order(&request.buyer, &request.cart, &request.fulfillment).await?;
    if !outcome.all_charges_issued() {
        warn!(
            "💻️ Checkout for order {} completed with {} charge failures",
            outcome.order.order_number,
            outcome.charge_failures.len()
        );
    }
    Ok(HttpResponse::Ok().json(CheckoutResponse::from(outcome)))
}

//----------------------------------------------   Callback  ----------------------------------------------------
route!(mpesa_callback => Post "/mpesa/callback" impl SettlementDatabase);
/// The gateway's payment-result webhook.
///
/// Responds 200 on successful reconciliation (including the idempotent duplicate no-op and reconciled failure
/// results), 400 on validation failures (unparseable payload, amount mismatch), 404 when no charge matches the
/// external id, and 500 on unexpected internal errors. The gateway owns retry semantics; idempotency on our side
/// makes those retries safe.
pub async fn mpesa_callback<B>(body: web::Bytes, api: web::Data<SettlementApi<B>>) -> HttpResponse
where B: SettlementDatabase {
    let raw = match std::str::from_utf8(&body) {
        Ok(raw) => raw,
        Err(_) => return HttpResponse::BadRequest().json(JsonResponse::failure("Callback payload is not UTF-8")),
    };
    info!("📨️ M-Pesa callback payload: {raw}");
    let parsed = match daraja_tools::parse_callback(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!("📨️ Could not parse M-Pesa callback. {e}");
            return HttpResponse::BadRequest().json(JsonResponse::failure(format!("Could not parse callback: {e}")));
        },
    };
    match api.process_callback(callback_from_daraja(parsed)).await {
        Ok(ReconcileOutcome::Settled(settled)) => {
            let message =
                if settled.fully_settled { "Payment confirmed. Order is paid." } else { "Payment entry confirmed." };
            HttpResponse::Ok().json(JsonResponse::success(message))
        },
        Ok(ReconcileOutcome::DuplicateIgnored { checkout_request_id }) => {
            debug!("📨️ Duplicate callback ignored for [{checkout_request_id}]");
            HttpResponse::Ok().json(JsonResponse::success("Already processed"))
        },
        Ok(ReconcileOutcome::AmountMismatch { charge, expected, actual }) => {
            error!(
                "📨️ Amount mismatch for [{}]: expected {expected} got {actual}",
                charge.checkout_request_id
            );
            HttpResponse::BadRequest().json(JsonResponse::failure("Callback amount validation failed"))
        },
        Ok(ReconcileOutcome::ChargeFailed { charge, .. }) => {
            HttpResponse::Ok().json(JsonResponse::failure(charge.result_desc))
        },
        Ok(ReconcileOutcome::VerificationCompleted { .. }) => {
            HttpResponse::Ok().json(JsonResponse::success("Phone verification completed"))
        },
        Ok(ReconcileOutcome::VerificationFailed { .. }) => {
            HttpResponse::Ok().json(JsonResponse::failure("Phone verification failed"))
        },
        Err(SettlementError::ChargeNotFound(id)) => {
            error!("📨️ Transaction not found for checkout_request_id={id}");
            HttpResponse::NotFound().json(JsonResponse::failure("Transaction not found"))
        },
        Err(e) => {
            error!("📨️ Error processing M-Pesa callback. {e}");
            HttpResponse::InternalServerError().json(JsonResponse::failure(e.to_string()))
        },
    }
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_detail => Get "/orders/{order_number}" impl SettlementDatabase);
pub async fn order_detail<B>(
    path: web::Path<String>,
    api: web::Data<FulfillmentApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: SettlementDatabase {
    let number = OrderNumber(path.into_inner());
    debug!("💻️ GET order {number}");
    let summary = api
        .order_summary(&number)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No order {number}")))?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(delivery_update => Post "/orders/{order_number}/delivery" impl SettlementDatabase);
/// Delivery-role actors move the delivery through IN_TRANSIT/DELIVERED (or FAILED). Each transition writes one
/// audit entry with the acting identity.
pub async fn delivery_update<B>(
    path: web::Path<String>,
    body: web::Json<DeliveryUpdateRequest>,
    api: web::Data<FulfillmentApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: SettlementDatabase {
    let number = OrderNumber(path.into_inner());
    let request = body.into_inner();
    debug!("💻️ POST delivery update for {number}: {} (by {})", request.status, request.actor);
    let delivery = api.update_delivery_status(&number, request.status, &request.actor, &request.note).await?;
    Ok(HttpResponse::Ok().json(delivery))
}

route!(cancel_order => Post "/orders/{order_number}/cancel" impl SettlementDatabase);
pub async fn cancel_order<B>(
    path: web::Path<String>,
    body: web::Json<CancelOrderRequest>,
    api: web::Data<FulfillmentApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: SettlementDatabase {
    let number = OrderNumber(path.into_inner());
    let request = body.into_inner();
    debug!("💻️ POST cancel order {number} (by {})", request.actor);
    let order = api.cancel_order(&number, &request.actor).await?;
    Ok(HttpResponse::Ok().json(order))
}
