use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection};

use super::{parse_date, parse_opt_uuid, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::CashDirection;
use crate::models::CashBookEntry;

pub fn insert_cash_book_entry(conn: &Connection, entry: &CashBookEntry) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO cash_book_entries (id, entry_date, direction, category, description,
         amount_cents, bank_account_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.id.to_string(),
            entry.entry_date.to_string(),
            entry.direction.as_str(),
            entry.category,
            entry.description,
            entry.amount_cents,
            entry.bank_account_id.map(|id| id.to_string()),
        ],
    )?;
    Ok(())
}

pub fn list_cash_book_entries_until(conn: &Connection, until: NaiveDate) -> Result<Vec<CashBookEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, entry_date, direction, category, description, amount_cents, bank_account_id
         FROM cash_book_entries WHERE entry_date <= ?1 ORDER BY entry_date, rowid",
    )?;
    let rows = stmt.query_map(params![until.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, Option<String>>(6)?,
        ))
    })?;

    rows.map(|row| {
        let (id, entry_date, direction, category, description, amount_cents, bank_account_id) = row?;
        Ok(CashBookEntry {
            id: parse_uuid(&id)?,
            entry_date: parse_date(&entry_date)?,
            direction: CashDirection::from_str(&direction)?,
            category,
            description,
            amount_cents,
            bank_account_id: parse_opt_uuid(bank_account_id)?,
        })
    })
    .collect()
}
