//! Cascading create flow: person → client → vehicle → service order.
//!
//! Each step reuses what already exists (same tax id, same plate) so the
//! front desk can run the whole chain for a returning customer without
//! creating duplicates. `register_walk_in` runs the chain atomically.

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::error::ShopError;
use crate::models::enums::{PersonKind, ServiceOrderStatus};
use crate::models::{Client, Employee, Person, ServiceOrder, Supplier, Vehicle};
use crate::money::FULL_BP;
use crate::tax_id;

// ═══════════════════════════════════════════
// Input types
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPerson {
    pub kind: PersonKind,
    pub name: String,
    pub tax_id: Option<String>,
    pub trade_name: Option<String>,
    pub state_registration: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl NewPerson {
    pub fn individual(name: &str, cpf: Option<&str>) -> Self {
        Self::with_kind(PersonKind::Individual, name, cpf)
    }

    pub fn company(name: &str, cnpj: &str) -> Self {
        Self::with_kind(PersonKind::Company, name, Some(cnpj))
    }

    fn with_kind(kind: PersonKind, name: &str, tax_id: Option<&str>) -> Self {
        Self {
            kind,
            name: name.into(),
            tax_id: tax_id.map(str::to_string),
            trade_name: None,
            state_registration: None,
            birth_date: None,
            phone: None,
            email: None,
            address: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClient {
    pub person: NewPerson,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVehicle {
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub mileage: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewServiceOrder {
    pub client_id: Uuid,
    pub vehicle_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub opened_on: NaiveDate,
    pub mileage: Option<i64>,
    pub complaint: Option<String>,
}

/// Everything the front desk captures for a customer arriving with a car.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkIn {
    pub client: NewClient,
    pub vehicle: NewVehicle,
    pub employee_id: Option<Uuid>,
    pub opened_on: NaiveDate,
    pub complaint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkInReceipt {
    pub client: Client,
    pub vehicle: Vehicle,
    pub order: ServiceOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEmployee {
    pub person: NewPerson,
    pub role: String,
    pub commission_bp: u32,
    pub hired_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSupplier {
    pub person: NewPerson,
    pub contact_name: Option<String>,
}

// ═══════════════════════════════════════════
// Steps
// ═══════════════════════════════════════════

/// Find the person by tax id or create them.
pub fn resolve_person(conn: &Connection, input: &NewPerson) -> Result<Person, ShopError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ShopError::Validation("person name is required".into()));
    }

    let tax_id = match (&input.tax_id, input.kind) {
        (Some(raw), kind) => Some(tax_id::validate(kind, raw)?),
        (None, PersonKind::Company) => {
            return Err(ShopError::Validation("a company requires a CNPJ".into()));
        }
        (None, PersonKind::Individual) => None,
    };

    if let Some(tax_id) = &tax_id {
        if let Some(existing) = db::get_person_by_tax_id(conn, tax_id)? {
            if existing.kind != input.kind {
                return Err(ShopError::Validation(format!(
                    "tax id {tax_id} already belongs to a {} record",
                    existing.kind
                )));
            }
            return Ok(existing);
        }
    }

    let person = Person {
        id: Uuid::new_v4(),
        kind: input.kind,
        name: name.to_string(),
        tax_id,
        trade_name: input.trade_name.clone(),
        state_registration: input.state_registration.clone(),
        birth_date: input.birth_date,
        phone: input.phone.clone(),
        email: input.email.clone(),
        address: input.address.clone(),
        created_at: Utc::now().naive_utc(),
    };
    db::insert_person(conn, &person)?;
    tracing::debug!(person_id = %person.id, kind = %person.kind, "Person created");
    Ok(person)
}

/// Register a client, reusing the person and client records when they exist.
pub fn register_client(conn: &Connection, input: &NewClient) -> Result<Client, ShopError> {
    let person = resolve_person(conn, &input.person)?;

    if let Some(existing) = db::get_client_by_person(conn, &person.id)? {
        return Ok(existing);
    }

    let client = Client {
        id: Uuid::new_v4(),
        person_id: person.id,
        notes: input.notes.clone(),
        created_at: Utc::now().naive_utc(),
    };
    db::insert_client(conn, &client)?;
    tracing::info!(client_id = %client.id, "Client registered");
    Ok(client)
}

/// Uppercase, drop separators and check the legacy (`AAA9999`) or
/// Mercosul (`AAA9A99`) layout.
pub fn normalize_plate(raw: &str) -> Result<String, ShopError> {
    let plate: String = raw
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let b = plate.as_bytes();
    let valid = b.len() == 7
        && b[..3].iter().all(u8::is_ascii_uppercase)
        && b[3].is_ascii_digit()
        && (b[4].is_ascii_digit() || b[4].is_ascii_uppercase())
        && b[5..].iter().all(u8::is_ascii_digit);

    if valid {
        Ok(plate)
    } else {
        Err(ShopError::Validation(format!("invalid plate: {raw}")))
    }
}

/// Register a vehicle for a client.
///
/// A plate already on file for the same client returns that vehicle
/// with its mileage raised; a plate on file for someone else is refused.
pub fn register_vehicle(conn: &Connection, client_id: &Uuid, input: &NewVehicle) -> Result<Vehicle, ShopError> {
    if db::get_client(conn, client_id)?.is_none() {
        return Err(ShopError::not_found("client", client_id));
    }
    if input.mileage < 0 {
        return Err(ShopError::Validation("mileage cannot be negative".into()));
    }
    let plate = normalize_plate(&input.plate)?;

    if let Some(existing) = db::get_vehicle_by_plate(conn, &plate)? {
        if existing.client_id != *client_id {
            tracing::warn!(%plate, "Plate already registered to another client");
            return Err(ShopError::VehicleOwnedByAnotherClient { plate });
        }
        db::raise_vehicle_mileage(conn, &existing.id, input.mileage)?;
        return db::get_vehicle(conn, &existing.id)?
            .ok_or_else(|| ShopError::not_found("vehicle", existing.id));
    }

    let vehicle = Vehicle {
        id: Uuid::new_v4(),
        client_id: *client_id,
        plate,
        brand: input.brand.trim().to_string(),
        model: input.model.trim().to_string(),
        year: input.year,
        color: input.color.clone(),
        mileage: input.mileage,
    };
    db::insert_vehicle(conn, &vehicle)?;
    tracing::info!(vehicle_id = %vehicle.id, plate = %vehicle.plate, "Vehicle registered");
    Ok(vehicle)
}

/// Open a service order with the next sequential number.
pub fn open_service_order(conn: &Connection, input: &NewServiceOrder) -> Result<ServiceOrder, ShopError> {
    if db::get_client(conn, &input.client_id)?.is_none() {
        return Err(ShopError::not_found("client", input.client_id));
    }
    let vehicle = db::get_vehicle(conn, &input.vehicle_id)?
        .ok_or_else(|| ShopError::not_found("vehicle", input.vehicle_id))?;
    if vehicle.client_id != input.client_id {
        return Err(ShopError::Validation(format!(
            "vehicle {} does not belong to this client",
            vehicle.plate
        )));
    }
    if let Some(employee_id) = &input.employee_id {
        let employee = db::get_employee(conn, employee_id)?
            .ok_or_else(|| ShopError::not_found("employee", employee_id))?;
        if !employee.active {
            return Err(ShopError::Validation("responsible employee is inactive".into()));
        }
    }
    if let Some(mileage) = input.mileage {
        if mileage < 0 {
            return Err(ShopError::Validation("mileage cannot be negative".into()));
        }
        db::raise_vehicle_mileage(conn, &vehicle.id, mileage)?;
    }

    let order = ServiceOrder {
        id: Uuid::new_v4(),
        number: db::next_service_order_number(conn)?,
        client_id: input.client_id,
        vehicle_id: input.vehicle_id,
        employee_id: input.employee_id,
        status: ServiceOrderStatus::Open,
        opened_on: input.opened_on,
        closed_on: None,
        mileage: input.mileage,
        complaint: input.complaint.clone(),
        diagnosis: None,
        discount_cents: 0,
    };
    db::insert_service_order(conn, &order)?;
    tracing::info!(order_id = %order.id, number = order.number, "Service order opened");
    Ok(order)
}

/// Client, vehicle and service order in one transaction.
pub fn register_walk_in(conn: &Connection, input: &WalkIn) -> Result<WalkInReceipt, ShopError> {
    let tx = conn.unchecked_transaction()?;

    let client = register_client(&tx, &input.client)?;
    let vehicle = register_vehicle(&tx, &client.id, &input.vehicle)?;
    let order = open_service_order(
        &tx,
        &NewServiceOrder {
            client_id: client.id,
            vehicle_id: vehicle.id,
            employee_id: input.employee_id,
            opened_on: input.opened_on,
            mileage: Some(input.vehicle.mileage),
            complaint: input.complaint.clone(),
        },
    )?;

    tx.commit()?;
    Ok(WalkInReceipt {
        client,
        vehicle,
        order,
    })
}

pub fn register_employee(conn: &Connection, input: &NewEmployee) -> Result<Employee, ShopError> {
    if input.commission_bp > FULL_BP {
        return Err(ShopError::Validation(format!(
            "commission rate {} bp exceeds 100%",
            input.commission_bp
        )));
    }
    if input.role.trim().is_empty() {
        return Err(ShopError::Validation("employee role is required".into()));
    }
    let person = resolve_person(conn, &input.person)?;
    if let Some(existing) = db::get_employee_by_person(conn, &person.id)? {
        return Ok(existing);
    }

    let employee = Employee {
        id: Uuid::new_v4(),
        person_id: person.id,
        role: input.role.trim().to_string(),
        commission_bp: input.commission_bp,
        hired_on: input.hired_on,
        active: true,
    };
    db::insert_employee(conn, &employee)?;
    tracing::info!(employee_id = %employee.id, "Employee registered");
    Ok(employee)
}

/// Keep the employee's history but stop assigning new orders to them.
pub fn deactivate_employee(conn: &Connection, employee_id: &Uuid) -> Result<(), ShopError> {
    db::set_employee_active(conn, employee_id, false)?;
    tracing::info!(employee_id = %employee_id, "Employee deactivated");
    Ok(())
}

pub fn register_supplier(conn: &Connection, input: &NewSupplier) -> Result<Supplier, ShopError> {
    let person = resolve_person(conn, &input.person)?;
    if let Some(existing) = db::get_supplier_by_person(conn, &person.id)? {
        return Ok(existing);
    }

    let supplier = Supplier {
        id: Uuid::new_v4(),
        person_id: person.id,
        contact_name: input.contact_name.clone(),
    };
    db::insert_supplier(conn, &supplier)?;
    tracing::info!(supplier_id = %supplier.id, "Supplier registered");
    Ok(supplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::db::DatabaseError;

    const CPF: &str = "529.982.247-25";
    const CNPJ: &str = "11.222.333/0001-81";

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn new_client(name: &str, cpf: Option<&str>) -> NewClient {
        NewClient {
            person: NewPerson::individual(name, cpf),
            notes: None,
        }
    }

    fn new_vehicle(plate: &str, mileage: i64) -> NewVehicle {
        NewVehicle {
            plate: plate.into(),
            brand: "Volkswagen".into(),
            model: "Gol".into(),
            year: Some(2015),
            color: Some("Prata".into()),
            mileage,
        }
    }

    fn walk_in(cpf: &str, plate: &str) -> WalkIn {
        WalkIn {
            client: new_client("Maria Souza", Some(cpf)),
            vehicle: new_vehicle(plate, 85_000),
            employee_id: None,
            opened_on: d(2024, 3, 4),
            complaint: Some("Barulho na suspensão".into()),
        }
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn register_client_is_idempotent_by_tax_id() {
        let conn = open_memory_database().unwrap();
        let first = register_client(&conn, &new_client("Maria Souza", Some(CPF))).unwrap();
        let second = register_client(&conn, &new_client("Maria S.", Some("52998224725"))).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(count(&conn, "persons"), 1);
        assert_eq!(count(&conn, "clients"), 1);
    }

    #[test]
    fn clients_without_cpf_are_distinct() {
        let conn = open_memory_database().unwrap();
        let a = register_client(&conn, &new_client("João", None)).unwrap();
        let b = register_client(&conn, &new_client("João", None)).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn company_requires_cnpj() {
        let conn = open_memory_database().unwrap();
        let mut person = NewPerson::company("Transportes Lima", CNPJ);
        person.tax_id = None;
        let err = register_client(&conn, &NewClient { person, notes: None }).unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[test]
    fn invalid_cpf_rejected() {
        let conn = open_memory_database().unwrap();
        let err = register_client(&conn, &new_client("Maria", Some("123.456.789-00"))).unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
        assert_eq!(count(&conn, "persons"), 0);
    }

    #[test]
    fn blank_name_rejected() {
        let conn = open_memory_database().unwrap();
        let err = register_client(&conn, &new_client("   ", None)).unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[test]
    fn person_reused_across_roles() {
        let conn = open_memory_database().unwrap();
        let client = register_client(&conn, &new_client("Carlos Lima", Some(CPF))).unwrap();
        let employee = register_employee(&conn, &NewEmployee {
            person: NewPerson::individual("Carlos Lima", Some(CPF)),
            role: "Mecânico".into(),
            commission_bp: 1_000,
            hired_on: None,
        })
        .unwrap();
        assert_eq!(client.person_id, employee.person_id);
        assert_eq!(count(&conn, "persons"), 1);
    }

    #[test]
    fn plate_normalization() {
        assert_eq!(normalize_plate("abc-1234").unwrap(), "ABC1234");
        assert_eq!(normalize_plate("BRA 2E19").unwrap(), "BRA2E19");
        assert!(normalize_plate("AB-12345").is_err());
        assert!(normalize_plate("ABC12345").is_err());
        assert!(normalize_plate("1BC1234").is_err());
    }

    #[test]
    fn same_plate_same_client_raises_mileage() {
        let conn = open_memory_database().unwrap();
        let client = register_client(&conn, &new_client("Maria", Some(CPF))).unwrap();
        let first = register_vehicle(&conn, &client.id, &new_vehicle("ABC-1234", 50_000)).unwrap();
        let again = register_vehicle(&conn, &client.id, &new_vehicle("abc1234", 52_000)).unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(again.mileage, 52_000);

        let lower = register_vehicle(&conn, &client.id, &new_vehicle("ABC1234", 10_000)).unwrap();
        assert_eq!(lower.mileage, 52_000);
    }

    #[test]
    fn plate_of_another_client_refused() {
        let conn = open_memory_database().unwrap();
        let maria = register_client(&conn, &new_client("Maria", Some(CPF))).unwrap();
        let joao = register_client(&conn, &new_client("João", None)).unwrap();
        register_vehicle(&conn, &maria.id, &new_vehicle("ABC1234", 1)).unwrap();
        let err = register_vehicle(&conn, &joao.id, &new_vehicle("ABC1234", 1)).unwrap_err();
        assert!(matches!(err, ShopError::VehicleOwnedByAnotherClient { .. }));
    }

    #[test]
    fn order_numbers_are_sequential() {
        let conn = open_memory_database().unwrap();
        let first = register_walk_in(&conn, &walk_in(CPF, "ABC1234")).unwrap();
        let second = register_walk_in(&conn, &walk_in(CPF, "ABC1234")).unwrap();
        assert_eq!(first.order.number, 1);
        assert_eq!(second.order.number, 2);
        assert_eq!(first.client.id, second.client.id);
        assert_eq!(first.vehicle.id, second.vehicle.id);
        assert_eq!(first.order.status, ServiceOrderStatus::Open);
    }

    #[test]
    fn order_rejects_vehicle_of_other_client() {
        let conn = open_memory_database().unwrap();
        let maria = register_client(&conn, &new_client("Maria", Some(CPF))).unwrap();
        let joao = register_client(&conn, &new_client("João", None)).unwrap();
        let car = register_vehicle(&conn, &maria.id, &new_vehicle("ABC1234", 1)).unwrap();
        let err = open_service_order(&conn, &NewServiceOrder {
            client_id: joao.id,
            vehicle_id: car.id,
            employee_id: None,
            opened_on: d(2024, 3, 4),
            mileage: None,
            complaint: None,
        })
        .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[test]
    fn order_rejects_inactive_employee() {
        let conn = open_memory_database().unwrap();
        let mechanic = register_employee(&conn, &NewEmployee {
            person: NewPerson::individual("Pedro", None),
            role: "Mecânico".into(),
            commission_bp: 500,
            hired_on: None,
        })
        .unwrap();
        deactivate_employee(&conn, &mechanic.id).unwrap();
        assert!(!db::get_employee(&conn, &mechanic.id).unwrap().unwrap().active);
        assert!(matches!(
            deactivate_employee(&conn, &Uuid::new_v4()),
            Err(ShopError::Database(DatabaseError::NotFound { .. }))
        ));

        let mut input = walk_in(CPF, "ABC1234");
        input.employee_id = Some(mechanic.id);
        let err = register_walk_in(&conn, &input).unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[test]
    fn failed_walk_in_rolls_back_everything() {
        let conn = open_memory_database().unwrap();
        let mut input = walk_in(CPF, "ABC1234");
        input.employee_id = Some(Uuid::new_v4());

        let err = register_walk_in(&conn, &input).unwrap_err();
        assert!(matches!(err, ShopError::NotFound { entity_type: "employee", .. }));
        assert_eq!(count(&conn, "persons"), 0);
        assert_eq!(count(&conn, "clients"), 0);
        assert_eq!(count(&conn, "vehicles"), 0);
        assert_eq!(count(&conn, "service_orders"), 0);
    }

    #[test]
    fn commission_over_full_rate_rejected() {
        let conn = open_memory_database().unwrap();
        let err = register_employee(&conn, &NewEmployee {
            person: NewPerson::individual("Pedro", None),
            role: "Mecânico".into(),
            commission_bp: 10_001,
            hired_on: None,
        })
        .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[test]
    fn supplier_registration_reuses_company() {
        let conn = open_memory_database().unwrap();
        let input = NewSupplier {
            person: NewPerson::company("Auto Peças Central", CNPJ),
            contact_name: Some("Rita".into()),
        };
        let a = register_supplier(&conn, &input).unwrap();
        let b = register_supplier(&conn, &input).unwrap();
        assert_eq!(a.id, b.id);
    }
}
