use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_date, parse_uuid};
use crate::db::DatabaseError;
use crate::models::BankAccount;

const ACCOUNT_COLUMNS: &str =
    "id, label, bank, agency, account_number, opening_balance_cents, opened_on, active";

pub fn insert_bank_account(conn: &Connection, account: &BankAccount) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO bank_accounts (id, label, bank, agency, account_number,
         opening_balance_cents, opened_on, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            account.id.to_string(),
            account.label,
            account.bank,
            account.agency,
            account.account_number,
            account.opening_balance_cents,
            account.opened_on.to_string(),
            account.active as i32,
        ],
    )?;
    Ok(())
}

pub fn get_bank_account(conn: &Connection, id: &Uuid) -> Result<Option<BankAccount>, DatabaseError> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM bank_accounts WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], account_row_from_rusqlite)
        .optional()?;
    row.map(account_from_row).transpose()
}

pub fn list_bank_accounts(conn: &Connection) -> Result<Vec<BankAccount>, DatabaseError> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM bank_accounts ORDER BY label");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], account_row_from_rusqlite)?;
    rows.map(|row| account_from_row(row?)).collect()
}

struct AccountRow {
    id: String,
    label: String,
    bank: String,
    agency: Option<String>,
    account_number: Option<String>,
    opening_balance_cents: i64,
    opened_on: String,
    active: i32,
}

fn account_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<AccountRow, rusqlite::Error> {
    Ok(AccountRow {
        id: row.get(0)?,
        label: row.get(1)?,
        bank: row.get(2)?,
        agency: row.get(3)?,
        account_number: row.get(4)?,
        opening_balance_cents: row.get(5)?,
        opened_on: row.get(6)?,
        active: row.get(7)?,
    })
}

fn account_from_row(row: AccountRow) -> Result<BankAccount, DatabaseError> {
    Ok(BankAccount {
        id: parse_uuid(&row.id)?,
        label: row.label,
        bank: row.bank,
        agency: row.agency,
        account_number: row.account_number,
        opening_balance_cents: row.opening_balance_cents,
        opened_on: parse_date(&row.opened_on)?,
        active: row.active != 0,
    })
}
