use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_opt_uuid, parse_uuid};
use crate::db::DatabaseError;
use crate::models::StockPart;

const PART_COLUMNS: &str =
    "id, code, description, supplier_id, quantity, minimum_quantity, cost_cents, price_cents";

pub fn insert_stock_part(conn: &Connection, part: &StockPart) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO stock_parts (id, code, description, supplier_id, quantity,
         minimum_quantity, cost_cents, price_cents)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            part.id.to_string(),
            part.code,
            part.description,
            part.supplier_id.map(|id| id.to_string()),
            part.quantity,
            part.minimum_quantity,
            part.cost_cents,
            part.price_cents,
        ],
    )?;
    Ok(())
}

pub fn get_stock_part(conn: &Connection, id: &Uuid) -> Result<Option<StockPart>, DatabaseError> {
    let sql = format!("SELECT {PART_COLUMNS} FROM stock_parts WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], part_row_from_rusqlite)
        .optional()?;
    row.map(part_from_row).transpose()
}

pub fn get_stock_part_by_code(conn: &Connection, code: &str) -> Result<Option<StockPart>, DatabaseError> {
    let sql = format!("SELECT {PART_COLUMNS} FROM stock_parts WHERE code = ?1");
    let row = conn
        .query_row(&sql, params![code], part_row_from_rusqlite)
        .optional()?;
    row.map(part_from_row).transpose()
}

pub fn list_stock_parts(conn: &Connection) -> Result<Vec<StockPart>, DatabaseError> {
    let sql = format!("SELECT {PART_COLUMNS} FROM stock_parts ORDER BY code");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], part_row_from_rusqlite)?;
    rows.map(|row| part_from_row(row?)).collect()
}

/// Parts at or below their minimum quantity.
pub fn list_low_stock_parts(conn: &Connection) -> Result<Vec<StockPart>, DatabaseError> {
    let sql = format!(
        "SELECT {PART_COLUMNS} FROM stock_parts
         WHERE quantity <= minimum_quantity
         ORDER BY (quantity - minimum_quantity), code"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], part_row_from_rusqlite)?;
    rows.map(|row| part_from_row(row?)).collect()
}

/// Add `delta` (may be negative) to the stock quantity.
///
/// The table's `quantity >= 0` check rejects withdrawals past zero.
pub fn adjust_stock_quantity(conn: &Connection, id: &Uuid, delta: i64) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE stock_parts SET quantity = quantity + ?2 WHERE id = ?1",
            params![id.to_string(), delta],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DatabaseError::ConstraintViolation(format!("stock for part {id} would go negative"))
            }
            other => DatabaseError::Sqlite(other),
        })?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "stock_part".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn update_stock_part_prices(
    conn: &Connection,
    id: &Uuid,
    cost_cents: i64,
    price_cents: i64,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE stock_parts SET cost_cents = ?2, price_cents = ?3 WHERE id = ?1",
        params![id.to_string(), cost_cents, price_cents],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "stock_part".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn update_stock_part_cost(conn: &Connection, id: &Uuid, cost_cents: i64) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE stock_parts SET cost_cents = ?2 WHERE id = ?1",
        params![id.to_string(), cost_cents],
    )?;
    Ok(())
}

struct PartRow {
    id: String,
    code: String,
    description: String,
    supplier_id: Option<String>,
    quantity: i64,
    minimum_quantity: i64,
    cost_cents: i64,
    price_cents: i64,
}

fn part_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<PartRow, rusqlite::Error> {
    Ok(PartRow {
        id: row.get(0)?,
        code: row.get(1)?,
        description: row.get(2)?,
        supplier_id: row.get(3)?,
        quantity: row.get(4)?,
        minimum_quantity: row.get(5)?,
        cost_cents: row.get(6)?,
        price_cents: row.get(7)?,
    })
}

fn part_from_row(row: PartRow) -> Result<StockPart, DatabaseError> {
    Ok(StockPart {
        id: parse_uuid(&row.id)?,
        code: row.code,
        description: row.description,
        supplier_id: parse_opt_uuid(row.supplier_id)?,
        quantity: row.quantity,
        minimum_quantity: row.minimum_quantity,
        cost_cents: row.cost_cents,
        price_cents: row.price_cents,
    })
}
