use serde::{Deserialize, Serialize};

use crate::db_types::{ChargeRequest, Delivery, Order, OrderLineItem};

/// One order with all of its satellite records, as returned to collaborators querying order state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    pub order: Order,
    pub line_items: Vec<OrderLineItem>,
    pub charges: Vec<ChargeRequest>,
    pub delivery: Option<Delivery>,
}
