use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ItemKind, ServiceOrderStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOrder {
    pub id: Uuid,
    pub number: i64,
    pub client_id: Uuid,
    pub vehicle_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub status: ServiceOrderStatus,
    pub opened_on: NaiveDate,
    pub closed_on: Option<NaiveDate>,
    pub mileage: Option<i64>,
    pub complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub discount_cents: i64,
}

/// A line of a service order: a part taken from stock or labor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub kind: ItemKind,
    pub part_id: Option<Uuid>,
    /// Mechanic credited with the labor, for commissions.
    pub employee_id: Option<Uuid>,
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Part cost snapshot taken when the item was added.
    pub unit_cost_cents: i64,
}

impl ServiceOrderItem {
    pub fn total_cents(&self) -> i64 {
        self.quantity * self.unit_price_cents
    }

    pub fn cost_cents(&self) -> i64 {
        self.quantity * self.unit_cost_cents
    }
}
