use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Client, Vehicle};

// ──────────────────────────────────────────────
// Clients
// ──────────────────────────────────────────────

pub fn insert_client(conn: &Connection, client: &Client) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO clients (id, person_id, notes, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            client.id.to_string(),
            client.person_id.to_string(),
            client.notes,
            format_datetime(&client.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_client(conn: &Connection, id: &Uuid) -> Result<Option<Client>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, person_id, notes, created_at FROM clients WHERE id = ?1",
            params![id.to_string()],
            client_row_from_rusqlite,
        )
        .optional()?;
    row.map(client_from_row).transpose()
}

pub fn get_client_by_person(conn: &Connection, person_id: &Uuid) -> Result<Option<Client>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, person_id, notes, created_at FROM clients WHERE person_id = ?1",
            params![person_id.to_string()],
            client_row_from_rusqlite,
        )
        .optional()?;
    row.map(client_from_row).transpose()
}

/// Client list row joined with the person's name and contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSummary {
    pub id: Uuid,
    pub name: String,
    pub tax_id: Option<String>,
    pub phone: Option<String>,
    pub vehicle_count: u32,
}

pub fn list_clients(conn: &Connection) -> Result<Vec<ClientSummary>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT c.id, p.name, p.tax_id, p.phone,
                (SELECT COUNT(*) FROM vehicles v WHERE v.client_id = c.id)
         FROM clients c
         JOIN persons p ON p.id = c.person_id
         ORDER BY p.name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, u32>(4)?,
        ))
    })?;

    rows.map(|row| {
        let (id, name, tax_id, phone, vehicle_count) = row?;
        Ok(ClientSummary {
            id: parse_uuid(&id)?,
            name,
            tax_id,
            phone,
            vehicle_count,
        })
    })
    .collect()
}

struct ClientRow {
    id: String,
    person_id: String,
    notes: Option<String>,
    created_at: String,
}

fn client_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<ClientRow, rusqlite::Error> {
    Ok(ClientRow {
        id: row.get(0)?,
        person_id: row.get(1)?,
        notes: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn client_from_row(row: ClientRow) -> Result<Client, DatabaseError> {
    Ok(Client {
        id: parse_uuid(&row.id)?,
        person_id: parse_uuid(&row.person_id)?,
        notes: row.notes,
        created_at: parse_datetime(&row.created_at)?,
    })
}

// ──────────────────────────────────────────────
// Vehicles
// ──────────────────────────────────────────────

const VEHICLE_COLUMNS: &str = "id, client_id, plate, brand, model, year, color, mileage";

pub fn insert_vehicle(conn: &Connection, vehicle: &Vehicle) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO vehicles (id, client_id, plate, brand, model, year, color, mileage)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            vehicle.id.to_string(),
            vehicle.client_id.to_string(),
            vehicle.plate,
            vehicle.brand,
            vehicle.model,
            vehicle.year,
            vehicle.color,
            vehicle.mileage,
        ],
    )?;
    Ok(())
}

pub fn get_vehicle(conn: &Connection, id: &Uuid) -> Result<Option<Vehicle>, DatabaseError> {
    let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], vehicle_row_from_rusqlite)
        .optional()?;
    row.map(vehicle_from_row).transpose()
}

pub fn get_vehicle_by_plate(conn: &Connection, plate: &str) -> Result<Option<Vehicle>, DatabaseError> {
    let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE plate = ?1");
    let row = conn
        .query_row(&sql, params![plate], vehicle_row_from_rusqlite)
        .optional()?;
    row.map(vehicle_from_row).transpose()
}

pub fn list_vehicles_for_client(conn: &Connection, client_id: &Uuid) -> Result<Vec<Vehicle>, DatabaseError> {
    let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE client_id = ?1 ORDER BY plate");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![client_id.to_string()], vehicle_row_from_rusqlite)?;
    rows.map(|row| vehicle_from_row(row?)).collect()
}

/// Raise the recorded mileage; lower readings are ignored.
pub fn raise_vehicle_mileage(conn: &Connection, id: &Uuid, mileage: i64) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE vehicles SET mileage = ?2 WHERE id = ?1 AND mileage < ?2",
        params![id.to_string(), mileage],
    )?;
    Ok(())
}

struct VehicleRow {
    id: String,
    client_id: String,
    plate: String,
    brand: String,
    model: String,
    year: Option<i32>,
    color: Option<String>,
    mileage: i64,
}

fn vehicle_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<VehicleRow, rusqlite::Error> {
    Ok(VehicleRow {
        id: row.get(0)?,
        client_id: row.get(1)?,
        plate: row.get(2)?,
        brand: row.get(3)?,
        model: row.get(4)?,
        year: row.get(5)?,
        color: row.get(6)?,
        mileage: row.get(7)?,
    })
}

fn vehicle_from_row(row: VehicleRow) -> Result<Vehicle, DatabaseError> {
    Ok(Vehicle {
        id: parse_uuid(&row.id)?,
        client_id: parse_uuid(&row.client_id)?,
        plate: row.plate,
        brand: row.brand,
        model: row.model,
        year: row.year,
        color: row.color,
        mileage: row.mileage,
    })
}
