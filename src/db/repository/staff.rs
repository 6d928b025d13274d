use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{parse_opt_date, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Employee, Supplier};

// ──────────────────────────────────────────────
// Employees
// ──────────────────────────────────────────────

pub fn insert_employee(conn: &Connection, employee: &Employee) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO employees (id, person_id, role, commission_bp, hired_on, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            employee.id.to_string(),
            employee.person_id.to_string(),
            employee.role,
            employee.commission_bp,
            employee.hired_on.map(|d| d.to_string()),
            employee.active as i32,
        ],
    )?;
    Ok(())
}

pub fn get_employee(conn: &Connection, id: &Uuid) -> Result<Option<Employee>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, person_id, role, commission_bp, hired_on, active
             FROM employees WHERE id = ?1",
            params![id.to_string()],
            employee_row_from_rusqlite,
        )
        .optional()?;
    row.map(employee_from_row).transpose()
}

pub fn get_employee_by_person(conn: &Connection, person_id: &Uuid) -> Result<Option<Employee>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, person_id, role, commission_bp, hired_on, active
             FROM employees WHERE person_id = ?1",
            params![person_id.to_string()],
            employee_row_from_rusqlite,
        )
        .optional()?;
    row.map(employee_from_row).transpose()
}

/// Employee joined with the person's name, for reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeSummary {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub commission_bp: u32,
    pub active: bool,
}

pub fn list_employees(conn: &Connection) -> Result<Vec<EmployeeSummary>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT e.id, p.name, e.role, e.commission_bp, e.active
         FROM employees e
         JOIN persons p ON p.id = e.person_id
         ORDER BY p.name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, u32>(3)?,
            row.get::<_, i32>(4)?,
        ))
    })?;

    rows.map(|row| {
        let (id, name, role, commission_bp, active) = row?;
        Ok(EmployeeSummary {
            id: parse_uuid(&id)?,
            name,
            role,
            commission_bp,
            active: active != 0,
        })
    })
    .collect()
}

pub fn set_employee_active(conn: &Connection, id: &Uuid, active: bool) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE employees SET active = ?2 WHERE id = ?1",
        params![id.to_string(), active as i32],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "employee".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

struct EmployeeRow {
    id: String,
    person_id: String,
    role: String,
    commission_bp: u32,
    hired_on: Option<String>,
    active: i32,
}

fn employee_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<EmployeeRow, rusqlite::Error> {
    Ok(EmployeeRow {
        id: row.get(0)?,
        person_id: row.get(1)?,
        role: row.get(2)?,
        commission_bp: row.get(3)?,
        hired_on: row.get(4)?,
        active: row.get(5)?,
    })
}

fn employee_from_row(row: EmployeeRow) -> Result<Employee, DatabaseError> {
    Ok(Employee {
        id: parse_uuid(&row.id)?,
        person_id: parse_uuid(&row.person_id)?,
        role: row.role,
        commission_bp: row.commission_bp,
        hired_on: parse_opt_date(row.hired_on)?,
        active: row.active != 0,
    })
}

// ──────────────────────────────────────────────
// Suppliers
// ──────────────────────────────────────────────

pub fn insert_supplier(conn: &Connection, supplier: &Supplier) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO suppliers (id, person_id, contact_name) VALUES (?1, ?2, ?3)",
        params![
            supplier.id.to_string(),
            supplier.person_id.to_string(),
            supplier.contact_name,
        ],
    )?;
    Ok(())
}

pub fn get_supplier(conn: &Connection, id: &Uuid) -> Result<Option<Supplier>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, person_id, contact_name FROM suppliers WHERE id = ?1",
            params![id.to_string()],
            supplier_row_from_rusqlite,
        )
        .optional()?;
    row.map(supplier_from_row).transpose()
}

pub fn get_supplier_by_person(conn: &Connection, person_id: &Uuid) -> Result<Option<Supplier>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, person_id, contact_name FROM suppliers WHERE person_id = ?1",
            params![person_id.to_string()],
            supplier_row_from_rusqlite,
        )
        .optional()?;
    row.map(supplier_from_row).transpose()
}

type SupplierRow = (String, String, Option<String>);

fn supplier_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<SupplierRow, rusqlite::Error> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn supplier_from_row((id, person_id, contact_name): SupplierRow) -> Result<Supplier, DatabaseError> {
    Ok(Supplier {
        id: parse_uuid(&id)?,
        person_id: parse_uuid(&person_id)?,
        contact_name,
    })
}

