use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_date, parse_opt_date, parse_opt_uuid, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::{ItemKind, ServiceOrderStatus};
use crate::models::{ServiceOrder, ServiceOrderFilter, ServiceOrderItem};

const ORDER_COLUMNS: &str = "id, number, client_id, vehicle_id, employee_id, status, opened_on,
     closed_on, mileage, complaint, diagnosis, discount_cents";

const ITEM_COLUMNS: &str = "id, order_id, kind, part_id, employee_id, description, quantity,
     unit_price_cents, unit_cost_cents";

// ──────────────────────────────────────────────
// Orders
// ──────────────────────────────────────────────

pub fn insert_service_order(conn: &Connection, order: &ServiceOrder) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO service_orders (id, number, client_id, vehicle_id, employee_id, status,
         opened_on, closed_on, mileage, complaint, diagnosis, discount_cents)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            order.id.to_string(),
            order.number,
            order.client_id.to_string(),
            order.vehicle_id.to_string(),
            order.employee_id.map(|id| id.to_string()),
            order.status.as_str(),
            order.opened_on.to_string(),
            order.closed_on.map(|d| d.to_string()),
            order.mileage,
            order.complaint,
            order.diagnosis,
            order.discount_cents,
        ],
    )?;
    Ok(())
}

pub fn get_service_order(conn: &Connection, id: &Uuid) -> Result<Option<ServiceOrder>, DatabaseError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM service_orders WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], order_row_from_rusqlite)
        .optional()?;
    row.map(order_from_row).transpose()
}

pub fn get_service_order_by_number(conn: &Connection, number: i64) -> Result<Option<ServiceOrder>, DatabaseError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM service_orders WHERE number = ?1");
    let row = conn
        .query_row(&sql, params![number], order_row_from_rusqlite)
        .optional()?;
    row.map(order_from_row).transpose()
}

/// Next sequential order number (1 for an empty shop).
pub fn next_service_order_number(conn: &Connection) -> Result<i64, DatabaseError> {
    let number = conn.query_row(
        "SELECT COALESCE(MAX(number), 0) + 1 FROM service_orders",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(number)
}

/// Fetch orders with dynamic filters, newest number first.
pub fn list_service_orders(
    conn: &Connection,
    filter: &ServiceOrderFilter,
) -> Result<Vec<ServiceOrder>, DatabaseError> {
    let mut sql = format!("SELECT {ORDER_COLUMNS} FROM service_orders WHERE 1=1");
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1;

    if let Some(status) = &filter.status {
        sql.push_str(&format!(" AND status = ?{param_idx}"));
        params_vec.push(Box::new(status.as_str()));
        param_idx += 1;
    }
    if let Some(client_id) = &filter.client_id {
        sql.push_str(&format!(" AND client_id = ?{param_idx}"));
        params_vec.push(Box::new(client_id.to_string()));
        param_idx += 1;
    }
    if let Some(vehicle_id) = &filter.vehicle_id {
        sql.push_str(&format!(" AND vehicle_id = ?{param_idx}"));
        params_vec.push(Box::new(vehicle_id.to_string()));
        param_idx += 1;
    }
    if let Some(from) = &filter.opened_from {
        sql.push_str(&format!(" AND opened_on >= ?{param_idx}"));
        params_vec.push(Box::new(from.to_string()));
        param_idx += 1;
    }
    if let Some(to) = &filter.opened_to {
        sql.push_str(&format!(" AND opened_on <= ?{param_idx}"));
        params_vec.push(Box::new(to.to_string()));
    }
    sql.push_str(" ORDER BY number DESC");

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(param_refs.as_slice(), order_row_from_rusqlite)?;
    rows.map(|row| order_from_row(row?)).collect()
}

/// Completed or delivered orders whose `closed_on` falls in `[from, to]`.
pub fn list_orders_closed_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<ServiceOrder>, DatabaseError> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM service_orders
         WHERE status IN ('completed', 'delivered')
           AND closed_on >= ?1 AND closed_on <= ?2
         ORDER BY closed_on, number"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![from.to_string(), to.to_string()], order_row_from_rusqlite)?;
    rows.map(|row| order_from_row(row?)).collect()
}

/// Completed or delivered orders closed on or before `as_of`.
pub fn list_orders_closed_until(conn: &Connection, as_of: NaiveDate) -> Result<Vec<ServiceOrder>, DatabaseError> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM service_orders
         WHERE status IN ('completed', 'delivered') AND closed_on <= ?1
         ORDER BY closed_on, number"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![as_of.to_string()], order_row_from_rusqlite)?;
    rows.map(|row| order_from_row(row?)).collect()
}

pub fn update_service_order_status(
    conn: &Connection,
    id: &Uuid,
    status: ServiceOrderStatus,
    closed_on: Option<NaiveDate>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE service_orders SET status = ?2, closed_on = ?3 WHERE id = ?1",
        params![id.to_string(), status.as_str(), closed_on.map(|d| d.to_string())],
    )?;
    if changed == 0 {
        return Err(order_not_found(id));
    }
    Ok(())
}

pub fn update_service_order_discount(conn: &Connection, id: &Uuid, discount_cents: i64) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE service_orders SET discount_cents = ?2 WHERE id = ?1",
        params![id.to_string(), discount_cents],
    )?;
    if changed == 0 {
        return Err(order_not_found(id));
    }
    Ok(())
}

pub fn update_service_order_diagnosis(conn: &Connection, id: &Uuid, diagnosis: &str) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE service_orders SET diagnosis = ?2 WHERE id = ?1",
        params![id.to_string(), diagnosis],
    )?;
    if changed == 0 {
        return Err(order_not_found(id));
    }
    Ok(())
}

fn order_not_found(id: &Uuid) -> DatabaseError {
    DatabaseError::NotFound {
        entity_type: "service_order".into(),
        id: id.to_string(),
    }
}

struct OrderRow {
    id: String,
    number: i64,
    client_id: String,
    vehicle_id: String,
    employee_id: Option<String>,
    status: String,
    opened_on: String,
    closed_on: Option<String>,
    mileage: Option<i64>,
    complaint: Option<String>,
    diagnosis: Option<String>,
    discount_cents: i64,
}

fn order_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<OrderRow, rusqlite::Error> {
    Ok(OrderRow {
        id: row.get(0)?,
        number: row.get(1)?,
        client_id: row.get(2)?,
        vehicle_id: row.get(3)?,
        employee_id: row.get(4)?,
        status: row.get(5)?,
        opened_on: row.get(6)?,
        closed_on: row.get(7)?,
        mileage: row.get(8)?,
        complaint: row.get(9)?,
        diagnosis: row.get(10)?,
        discount_cents: row.get(11)?,
    })
}

fn order_from_row(row: OrderRow) -> Result<ServiceOrder, DatabaseError> {
    Ok(ServiceOrder {
        id: parse_uuid(&row.id)?,
        number: row.number,
        client_id: parse_uuid(&row.client_id)?,
        vehicle_id: parse_uuid(&row.vehicle_id)?,
        employee_id: parse_opt_uuid(row.employee_id)?,
        status: ServiceOrderStatus::from_str(&row.status)?,
        opened_on: parse_date(&row.opened_on)?,
        closed_on: parse_opt_date(row.closed_on)?,
        mileage: row.mileage,
        complaint: row.complaint,
        diagnosis: row.diagnosis,
        discount_cents: row.discount_cents,
    })
}

// ──────────────────────────────────────────────
// Items
// ──────────────────────────────────────────────

pub fn insert_service_order_item(conn: &Connection, item: &ServiceOrderItem) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO service_order_items (id, order_id, kind, part_id, employee_id, description,
         quantity, unit_price_cents, unit_cost_cents)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            item.id.to_string(),
            item.order_id.to_string(),
            item.kind.as_str(),
            item.part_id.map(|id| id.to_string()),
            item.employee_id.map(|id| id.to_string()),
            item.description,
            item.quantity,
            item.unit_price_cents,
            item.unit_cost_cents,
        ],
    )?;
    Ok(())
}

pub fn get_service_order_item(conn: &Connection, id: &Uuid) -> Result<Option<ServiceOrderItem>, DatabaseError> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM service_order_items WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], item_row_from_rusqlite)
        .optional()?;
    row.map(item_from_row).transpose()
}

pub fn list_service_order_items(conn: &Connection, order_id: &Uuid) -> Result<Vec<ServiceOrderItem>, DatabaseError> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM service_order_items WHERE order_id = ?1 ORDER BY rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![order_id.to_string()], item_row_from_rusqlite)?;
    rows.map(|row| item_from_row(row?)).collect()
}

pub fn delete_service_order_item(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM service_order_items WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(())
}

struct ItemRow {
    id: String,
    order_id: String,
    kind: String,
    part_id: Option<String>,
    employee_id: Option<String>,
    description: String,
    quantity: i64,
    unit_price_cents: i64,
    unit_cost_cents: i64,
}

fn item_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<ItemRow, rusqlite::Error> {
    Ok(ItemRow {
        id: row.get(0)?,
        order_id: row.get(1)?,
        kind: row.get(2)?,
        part_id: row.get(3)?,
        employee_id: row.get(4)?,
        description: row.get(5)?,
        quantity: row.get(6)?,
        unit_price_cents: row.get(7)?,
        unit_cost_cents: row.get(8)?,
    })
}

fn item_from_row(row: ItemRow) -> Result<ServiceOrderItem, DatabaseError> {
    Ok(ServiceOrderItem {
        id: parse_uuid(&row.id)?,
        order_id: parse_uuid(&row.order_id)?,
        kind: ItemKind::from_str(&row.kind)?,
        part_id: parse_opt_uuid(row.part_id)?,
        employee_id: parse_opt_uuid(row.employee_id)?,
        description: row.description,
        quantity: row.quantity,
        unit_price_cents: row.unit_price_cents,
        unit_cost_cents: row.unit_cost_cents,
    })
}
