use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_date, parse_opt_date, parse_opt_uuid, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::Recurrence;
use crate::models::{Payable, PayableSettlement};

const PAYABLE_COLUMNS: &str = "id, description, category, amount_cents, first_due_on, recurrence,
     recurrence_until, supplier_id, bank_account_id, active";

const SETTLEMENT_COLUMNS: &str = "id, payable_id, due_on, paid_on, amount_cents, bank_account_id";

pub fn insert_payable(conn: &Connection, payable: &Payable) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO payables (id, description, category, amount_cents, first_due_on,
         recurrence, recurrence_until, supplier_id, bank_account_id, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            payable.id.to_string(),
            payable.description,
            payable.category,
            payable.amount_cents,
            payable.first_due_on.to_string(),
            payable.recurrence.as_str(),
            payable.recurrence_until.map(|d| d.to_string()),
            payable.supplier_id.map(|id| id.to_string()),
            payable.bank_account_id.map(|id| id.to_string()),
            payable.active as i32,
        ],
    )?;
    Ok(())
}

pub fn get_payable(conn: &Connection, id: &Uuid) -> Result<Option<Payable>, DatabaseError> {
    let sql = format!("SELECT {PAYABLE_COLUMNS} FROM payables WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], payable_row_from_rusqlite)
        .optional()?;
    row.map(payable_from_row).transpose()
}

/// All payables, active or not; callers decide what inactive means.
pub fn list_payables(conn: &Connection) -> Result<Vec<Payable>, DatabaseError> {
    let sql = format!("SELECT {PAYABLE_COLUMNS} FROM payables ORDER BY first_due_on, description");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], payable_row_from_rusqlite)?;
    rows.map(|row| payable_from_row(row?)).collect()
}

pub fn set_payable_active(conn: &Connection, id: &Uuid, active: bool) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE payables SET active = ?2 WHERE id = ?1",
        params![id.to_string(), active as i32],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "payable".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

struct PayableRow {
    id: String,
    description: String,
    category: String,
    amount_cents: i64,
    first_due_on: String,
    recurrence: String,
    recurrence_until: Option<String>,
    supplier_id: Option<String>,
    bank_account_id: Option<String>,
    active: i32,
}

fn payable_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<PayableRow, rusqlite::Error> {
    Ok(PayableRow {
        id: row.get(0)?,
        description: row.get(1)?,
        category: row.get(2)?,
        amount_cents: row.get(3)?,
        first_due_on: row.get(4)?,
        recurrence: row.get(5)?,
        recurrence_until: row.get(6)?,
        supplier_id: row.get(7)?,
        bank_account_id: row.get(8)?,
        active: row.get(9)?,
    })
}

fn payable_from_row(row: PayableRow) -> Result<Payable, DatabaseError> {
    Ok(Payable {
        id: parse_uuid(&row.id)?,
        description: row.description,
        category: row.category,
        amount_cents: row.amount_cents,
        first_due_on: parse_date(&row.first_due_on)?,
        recurrence: Recurrence::from_str(&row.recurrence)?,
        recurrence_until: parse_opt_date(row.recurrence_until)?,
        supplier_id: parse_opt_uuid(row.supplier_id)?,
        bank_account_id: parse_opt_uuid(row.bank_account_id)?,
        active: row.active != 0,
    })
}

// ──────────────────────────────────────────────
// Settlements
// ──────────────────────────────────────────────

pub fn insert_payable_settlement(conn: &Connection, settlement: &PayableSettlement) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO payable_settlements (id, payable_id, due_on, paid_on, amount_cents, bank_account_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            settlement.id.to_string(),
            settlement.payable_id.to_string(),
            settlement.due_on.to_string(),
            settlement.paid_on.to_string(),
            settlement.amount_cents,
            settlement.bank_account_id.map(|id| id.to_string()),
        ],
    )?;
    Ok(())
}

pub fn get_payable_settlement(
    conn: &Connection,
    payable_id: &Uuid,
    due_on: NaiveDate,
) -> Result<Option<PayableSettlement>, DatabaseError> {
    let sql = format!(
        "SELECT {SETTLEMENT_COLUMNS} FROM payable_settlements WHERE payable_id = ?1 AND due_on = ?2"
    );
    let row = conn
        .query_row(&sql, params![payable_id.to_string(), due_on.to_string()], settlement_row_from_rusqlite)
        .optional()?;
    row.map(settlement_from_row).transpose()
}

pub fn list_payable_settlements(conn: &Connection) -> Result<Vec<PayableSettlement>, DatabaseError> {
    let sql = format!("SELECT {SETTLEMENT_COLUMNS} FROM payable_settlements ORDER BY paid_on, rowid");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], settlement_row_from_rusqlite)?;
    rows.map(|row| settlement_from_row(row?)).collect()
}

pub fn list_payable_settlements_paid_until(
    conn: &Connection,
    until: NaiveDate,
) -> Result<Vec<PayableSettlement>, DatabaseError> {
    let sql = format!(
        "SELECT {SETTLEMENT_COLUMNS} FROM payable_settlements WHERE paid_on <= ?1 ORDER BY paid_on, rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![until.to_string()], settlement_row_from_rusqlite)?;
    rows.map(|row| settlement_from_row(row?)).collect()
}

type SettlementRow = (String, String, String, String, i64, Option<String>);

fn settlement_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<SettlementRow, rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn settlement_from_row(row: SettlementRow) -> Result<PayableSettlement, DatabaseError> {
    let (id, payable_id, due_on, paid_on, amount_cents, bank_account_id) = row;
    Ok(PayableSettlement {
        id: parse_uuid(&id)?,
        payable_id: parse_uuid(&payable_id)?,
        due_on: parse_date(&due_on)?,
        paid_on: parse_date(&paid_on)?,
        amount_cents,
        bank_account_id: parse_opt_uuid(bank_account_id)?,
    })
}
