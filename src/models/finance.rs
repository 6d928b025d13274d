use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{CashDirection, PaymentMethod, Recurrence};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: Uuid,
    pub label: String,
    pub bank: String,
    pub agency: Option<String>,
    pub account_number: Option<String>,
    pub opening_balance_cents: i64,
    pub opened_on: NaiveDate,
    pub active: bool,
}

/// Payment received from a client against a service order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientPayment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount_cents: i64,
    pub paid_on: NaiveDate,
    pub method: PaymentMethod,
    pub installments: u32,
    pub bank_account_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// One installment of a card payment, settled by the acquirer later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardReceivable {
    pub id: Uuid,
    pub client_payment_id: Uuid,
    pub installment_number: u32,
    pub installment_count: u32,
    pub gross_cents: i64,
    pub fee_cents: i64,
    pub expected_on: NaiveDate,
    pub received_on: Option<NaiveDate>,
    pub bank_account_id: Option<Uuid>,
}

impl CardReceivable {
    pub fn net_cents(&self) -> i64 {
        self.gross_cents - self.fee_cents
    }
}

/// Payment made to a supplier for parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartPayment {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub part_id: Option<Uuid>,
    pub quantity: i64,
    pub description: String,
    pub amount_cents: i64,
    pub paid_on: NaiveDate,
    pub method: PaymentMethod,
    pub bank_account_id: Option<Uuid>,
}

/// A bill to pay, possibly recurring (rent, power, software licences).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payable {
    pub id: Uuid,
    pub description: String,
    pub category: String,
    pub amount_cents: i64,
    pub first_due_on: NaiveDate,
    pub recurrence: Recurrence,
    pub recurrence_until: Option<NaiveDate>,
    pub supplier_id: Option<Uuid>,
    pub bank_account_id: Option<Uuid>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayableSettlement {
    pub id: Uuid,
    pub payable_id: Uuid,
    pub due_on: NaiveDate,
    pub paid_on: NaiveDate,
    pub amount_cents: i64,
    pub bank_account_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionPayment {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub amount_cents: i64,
    pub paid_on: NaiveDate,
    pub bank_account_id: Option<Uuid>,
}

/// Manually booked cash-book line (float top-up, withdrawal, petty expense).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashBookEntry {
    pub id: Uuid,
    pub entry_date: NaiveDate,
    pub direction: CashDirection,
    pub category: String,
    pub description: String,
    pub amount_cents: i64,
    pub bank_account_id: Option<Uuid>,
}
