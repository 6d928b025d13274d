use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_date, parse_opt_uuid, parse_uuid};
use crate::db::DatabaseError;
use crate::models::CommissionPayment;

const COMMISSION_COLUMNS: &str =
    "id, employee_id, period_start, period_end, amount_cents, paid_on, bank_account_id";

pub fn insert_commission_payment(conn: &Connection, payment: &CommissionPayment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO commission_payments (id, employee_id, period_start, period_end,
         amount_cents, paid_on, bank_account_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            payment.id.to_string(),
            payment.employee_id.to_string(),
            payment.period_start.to_string(),
            payment.period_end.to_string(),
            payment.amount_cents,
            payment.paid_on.to_string(),
            payment.bank_account_id.map(|id| id.to_string()),
        ],
    )?;
    Ok(())
}

pub fn list_commission_payments_until(
    conn: &Connection,
    until: NaiveDate,
) -> Result<Vec<CommissionPayment>, DatabaseError> {
    let sql = format!(
        "SELECT {COMMISSION_COLUMNS} FROM commission_payments WHERE paid_on <= ?1 ORDER BY paid_on, rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![until.to_string()], commission_row_from_rusqlite)?;
    rows.map(|row| commission_from_row(row?)).collect()
}

pub fn insert_commission_payment_order(
    conn: &Connection,
    payment_id: &Uuid,
    order_id: &Uuid,
    amount_cents: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO commission_payment_orders (payment_id, order_id, amount_cents) VALUES (?1, ?2, ?3)",
        params![payment_id.to_string(), order_id.to_string(), amount_cents],
    )?;
    Ok(())
}

/// Commission already paid to an employee, keyed by service order.
pub fn commission_paid_by_order(conn: &Connection, employee_id: &Uuid) -> Result<HashMap<Uuid, i64>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT cpo.order_id, SUM(cpo.amount_cents)
         FROM commission_payment_orders cpo
         JOIN commission_payments cp ON cp.id = cpo.payment_id
         WHERE cp.employee_id = ?1
         GROUP BY cpo.order_id",
    )?;
    let rows = stmt.query_map(params![employee_id.to_string()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    let mut paid = HashMap::new();
    for row in rows {
        let (order_id, amount_cents) = row?;
        paid.insert(parse_uuid(&order_id)?, amount_cents);
    }
    Ok(paid)
}

type CommissionRow = (String, String, String, String, i64, String, Option<String>);

fn commission_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<CommissionRow, rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn commission_from_row(row: CommissionRow) -> Result<CommissionPayment, DatabaseError> {
    let (id, employee_id, period_start, period_end, amount_cents, paid_on, bank_account_id) = row;
    Ok(CommissionPayment {
        id: parse_uuid(&id)?,
        employee_id: parse_uuid(&employee_id)?,
        period_start: parse_date(&period_start)?,
        period_end: parse_date(&period_end)?,
        amount_cents,
        paid_on: parse_date(&paid_on)?,
        bank_account_id: parse_opt_uuid(bank_account_id)?,
    })
}
