use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockPart {
    pub id: Uuid,
    pub code: String,
    pub description: String,
    pub supplier_id: Option<Uuid>,
    pub quantity: i64,
    pub minimum_quantity: i64,
    pub cost_cents: i64,
    pub price_cents: i64,
}
