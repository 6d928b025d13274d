use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_date, parse_opt_date, parse_opt_uuid, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::PaymentMethod;
use crate::models::{CardReceivable, ClientPayment, PartPayment};

// ──────────────────────────────────────────────
// Client payments
// ──────────────────────────────────────────────

const CLIENT_PAYMENT_COLUMNS: &str =
    "id, order_id, amount_cents, paid_on, method, installments, bank_account_id, notes";

pub fn insert_client_payment(conn: &Connection, payment: &ClientPayment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO client_payments (id, order_id, amount_cents, paid_on, method,
         installments, bank_account_id, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            payment.id.to_string(),
            payment.order_id.to_string(),
            payment.amount_cents,
            payment.paid_on.to_string(),
            payment.method.as_str(),
            payment.installments,
            payment.bank_account_id.map(|id| id.to_string()),
            payment.notes,
        ],
    )?;
    Ok(())
}

pub fn list_client_payments_for_order(conn: &Connection, order_id: &Uuid) -> Result<Vec<ClientPayment>, DatabaseError> {
    let sql = format!(
        "SELECT {CLIENT_PAYMENT_COLUMNS} FROM client_payments WHERE order_id = ?1 ORDER BY paid_on, rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![order_id.to_string()], client_payment_row_from_rusqlite)?;
    rows.map(|row| client_payment_from_row(row?)).collect()
}

/// Every client payment dated on or before `until`.
pub fn list_client_payments_until(conn: &Connection, until: NaiveDate) -> Result<Vec<ClientPayment>, DatabaseError> {
    let sql = format!(
        "SELECT {CLIENT_PAYMENT_COLUMNS} FROM client_payments WHERE paid_on <= ?1 ORDER BY paid_on, rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![until.to_string()], client_payment_row_from_rusqlite)?;
    rows.map(|row| client_payment_from_row(row?)).collect()
}

/// Sum of payments received for an order.
pub fn sum_client_payments_for_order(conn: &Connection, order_id: &Uuid) -> Result<i64, DatabaseError> {
    let total = conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM client_payments WHERE order_id = ?1",
        params![order_id.to_string()],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(total)
}

struct ClientPaymentRow {
    id: String,
    order_id: String,
    amount_cents: i64,
    paid_on: String,
    method: String,
    installments: u32,
    bank_account_id: Option<String>,
    notes: Option<String>,
}

fn client_payment_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<ClientPaymentRow, rusqlite::Error> {
    Ok(ClientPaymentRow {
        id: row.get(0)?,
        order_id: row.get(1)?,
        amount_cents: row.get(2)?,
        paid_on: row.get(3)?,
        method: row.get(4)?,
        installments: row.get(5)?,
        bank_account_id: row.get(6)?,
        notes: row.get(7)?,
    })
}

fn client_payment_from_row(row: ClientPaymentRow) -> Result<ClientPayment, DatabaseError> {
    Ok(ClientPayment {
        id: parse_uuid(&row.id)?,
        order_id: parse_uuid(&row.order_id)?,
        amount_cents: row.amount_cents,
        paid_on: parse_date(&row.paid_on)?,
        method: PaymentMethod::from_str(&row.method)?,
        installments: row.installments,
        bank_account_id: parse_opt_uuid(row.bank_account_id)?,
        notes: row.notes,
    })
}

// ──────────────────────────────────────────────
// Card receivables
// ──────────────────────────────────────────────

const RECEIVABLE_COLUMNS: &str = "id, client_payment_id, installment_number, installment_count,
     gross_cents, fee_cents, expected_on, received_on, bank_account_id";

pub fn insert_card_receivable(conn: &Connection, receivable: &CardReceivable) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO card_receivables (id, client_payment_id, installment_number,
         installment_count, gross_cents, fee_cents, expected_on, received_on, bank_account_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            receivable.id.to_string(),
            receivable.client_payment_id.to_string(),
            receivable.installment_number,
            receivable.installment_count,
            receivable.gross_cents,
            receivable.fee_cents,
            receivable.expected_on.to_string(),
            receivable.received_on.map(|d| d.to_string()),
            receivable.bank_account_id.map(|id| id.to_string()),
        ],
    )?;
    Ok(())
}

pub fn list_card_receivables_for_payment(
    conn: &Connection,
    client_payment_id: &Uuid,
) -> Result<Vec<CardReceivable>, DatabaseError> {
    let sql = format!(
        "SELECT {RECEIVABLE_COLUMNS} FROM card_receivables
         WHERE client_payment_id = ?1 ORDER BY installment_number"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![client_payment_id.to_string()], receivable_row_from_rusqlite)?;
    rows.map(|row| receivable_from_row(row?)).collect()
}

/// Receivables already settled on or before `until`.
pub fn list_received_card_receivables_until(
    conn: &Connection,
    until: NaiveDate,
) -> Result<Vec<CardReceivable>, DatabaseError> {
    let sql = format!(
        "SELECT {RECEIVABLE_COLUMNS} FROM card_receivables
         WHERE received_on IS NOT NULL AND received_on <= ?1
         ORDER BY received_on, rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![until.to_string()], receivable_row_from_rusqlite)?;
    rows.map(|row| receivable_from_row(row?)).collect()
}

/// Receivables not yet settled, ordered by expected date.
pub fn list_pending_card_receivables(conn: &Connection) -> Result<Vec<CardReceivable>, DatabaseError> {
    let sql = format!(
        "SELECT {RECEIVABLE_COLUMNS} FROM card_receivables
         WHERE received_on IS NULL
         ORDER BY expected_on, rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], receivable_row_from_rusqlite)?;
    rows.map(|row| receivable_from_row(row?)).collect()
}

/// Mark every pending receivable expected by `as_of` as received on its expected date.
pub fn mark_card_receivables_received_until(conn: &Connection, as_of: NaiveDate) -> Result<usize, DatabaseError> {
    let updated = conn.execute(
        "UPDATE card_receivables SET received_on = expected_on
         WHERE received_on IS NULL AND expected_on <= ?1",
        params![as_of.to_string()],
    )?;
    Ok(updated)
}

struct ReceivableRow {
    id: String,
    client_payment_id: String,
    installment_number: u32,
    installment_count: u32,
    gross_cents: i64,
    fee_cents: i64,
    expected_on: String,
    received_on: Option<String>,
    bank_account_id: Option<String>,
}

fn receivable_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<ReceivableRow, rusqlite::Error> {
    Ok(ReceivableRow {
        id: row.get(0)?,
        client_payment_id: row.get(1)?,
        installment_number: row.get(2)?,
        installment_count: row.get(3)?,
        gross_cents: row.get(4)?,
        fee_cents: row.get(5)?,
        expected_on: row.get(6)?,
        received_on: row.get(7)?,
        bank_account_id: row.get(8)?,
    })
}

fn receivable_from_row(row: ReceivableRow) -> Result<CardReceivable, DatabaseError> {
    Ok(CardReceivable {
        id: parse_uuid(&row.id)?,
        client_payment_id: parse_uuid(&row.client_payment_id)?,
        installment_number: row.installment_number,
        installment_count: row.installment_count,
        gross_cents: row.gross_cents,
        fee_cents: row.fee_cents,
        expected_on: parse_date(&row.expected_on)?,
        received_on: parse_opt_date(row.received_on)?,
        bank_account_id: parse_opt_uuid(row.bank_account_id)?,
    })
}

// ──────────────────────────────────────────────
// Part payments (supplier side)
// ──────────────────────────────────────────────

const PART_PAYMENT_COLUMNS: &str = "id, supplier_id, part_id, quantity, description, amount_cents,
     paid_on, method, bank_account_id";

pub fn insert_part_payment(conn: &Connection, payment: &PartPayment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO part_payments (id, supplier_id, part_id, quantity, description,
         amount_cents, paid_on, method, bank_account_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            payment.id.to_string(),
            payment.supplier_id.to_string(),
            payment.part_id.map(|id| id.to_string()),
            payment.quantity,
            payment.description,
            payment.amount_cents,
            payment.paid_on.to_string(),
            payment.method.as_str(),
            payment.bank_account_id.map(|id| id.to_string()),
        ],
    )?;
    Ok(())
}

pub fn list_part_payments_until(conn: &Connection, until: NaiveDate) -> Result<Vec<PartPayment>, DatabaseError> {
    let sql = format!(
        "SELECT {PART_PAYMENT_COLUMNS} FROM part_payments WHERE paid_on <= ?1 ORDER BY paid_on, rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![until.to_string()], part_payment_row_from_rusqlite)?;
    rows.map(|row| part_payment_from_row(row?)).collect()
}

pub fn list_part_payments_for_supplier(conn: &Connection, supplier_id: &Uuid) -> Result<Vec<PartPayment>, DatabaseError> {
    let sql = format!(
        "SELECT {PART_PAYMENT_COLUMNS} FROM part_payments WHERE supplier_id = ?1 ORDER BY paid_on, rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![supplier_id.to_string()], part_payment_row_from_rusqlite)?;
    rows.map(|row| part_payment_from_row(row?)).collect()
}

struct PartPaymentRow {
    id: String,
    supplier_id: String,
    part_id: Option<String>,
    quantity: i64,
    description: String,
    amount_cents: i64,
    paid_on: String,
    method: String,
    bank_account_id: Option<String>,
}

fn part_payment_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<PartPaymentRow, rusqlite::Error> {
    Ok(PartPaymentRow {
        id: row.get(0)?,
        supplier_id: row.get(1)?,
        part_id: row.get(2)?,
        quantity: row.get(3)?,
        description: row.get(4)?,
        amount_cents: row.get(5)?,
        paid_on: row.get(6)?,
        method: row.get(7)?,
        bank_account_id: row.get(8)?,
    })
}

fn part_payment_from_row(row: PartPaymentRow) -> Result<PartPayment, DatabaseError> {
    Ok(PartPayment {
        id: parse_uuid(&row.id)?,
        supplier_id: parse_uuid(&row.supplier_id)?,
        part_id: parse_opt_uuid(row.part_id)?,
        quantity: row.quantity,
        description: row.description,
        amount_cents: row.amount_cents,
        paid_on: parse_date(&row.paid_on)?,
        method: PaymentMethod::from_str(&row.method)?,
        bank_account_id: parse_opt_uuid(row.bank_account_id)?,
    })
}
