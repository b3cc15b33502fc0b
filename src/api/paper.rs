//! Dry-run order gateway: acknowledges every order without sending it.

use anyhow::Result;
use serde_json::json;
use tracing::info;

use crate::models::OrderSide;

use super::{OrderAck, OrderGateway};

#[derive(Debug, Clone, Copy, Default)]
pub struct PaperGateway;

impl OrderGateway for PaperGateway {
    async fn place_order(&self, symbol: &str, side: OrderSide, quantity: u32) -> Result<OrderAck> {
        let order_id = format!("paper-{}", uuid::Uuid::new_v4());
        info!(
            symbol = %symbol,
            side = side.as_str(),
            quantity = quantity,
            order_id = %order_id,
            "[DRY RUN] Would place market order"
        );

        Ok(OrderAck {
            status: "ok".to_string(),
            message: "simulated".to_string(),
            order_id: Some(order_id.clone()),
            raw: json!({ "s": "ok", "id": order_id, "simulated": true }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_orders_are_acknowledged() {
        let ack = tokio_test::block_on(PaperGateway.place_order("NSE:SBIN-EQ", OrderSide::Buy, 5))
            .unwrap();
        assert!(ack.is_ok());
        assert!(ack.order_id.unwrap().starts_with("paper-"));
        assert_eq!(ack.raw["simulated"], true);
    }
}
