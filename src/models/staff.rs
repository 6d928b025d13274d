use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub person_id: Uuid,
    pub role: String,
    /// Commission on labor sold, in basis points.
    pub commission_bp: u32,
    pub hired_on: Option<NaiveDate>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub person_id: Uuid,
    pub contact_name: Option<String>,
}
