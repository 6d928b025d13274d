use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::PersonKind;

/// Shared identity record behind clients, employees and suppliers.
///
/// Individuals carry a CPF and may have a birth date; companies carry a
/// CNPJ plus trade name and state registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    pub kind: PersonKind,
    pub name: String,
    pub tax_id: Option<String>,
    pub trade_name: Option<String>,
    pub state_registration: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: NaiveDateTime,
}
