use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_opt_date, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::PersonKind;
use crate::models::Person;

const PERSON_COLUMNS: &str = "id, kind, name, tax_id, trade_name, state_registration,
     birth_date, phone, email, address, created_at";

pub fn insert_person(conn: &Connection, person: &Person) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO persons (id, kind, name, tax_id, trade_name, state_registration,
         birth_date, phone, email, address, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            person.id.to_string(),
            person.kind.as_str(),
            person.name,
            person.tax_id,
            person.trade_name,
            person.state_registration,
            person.birth_date.map(|d| d.to_string()),
            person.phone,
            person.email,
            person.address,
            format_datetime(&person.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_person(conn: &Connection, id: &Uuid) -> Result<Option<Person>, DatabaseError> {
    let sql = format!("SELECT {PERSON_COLUMNS} FROM persons WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], person_row_from_rusqlite)
        .optional()?;
    row.map(person_from_row).transpose()
}

pub fn get_person_by_tax_id(conn: &Connection, tax_id: &str) -> Result<Option<Person>, DatabaseError> {
    let sql = format!("SELECT {PERSON_COLUMNS} FROM persons WHERE tax_id = ?1");
    let row = conn
        .query_row(&sql, params![tax_id], person_row_from_rusqlite)
        .optional()?;
    row.map(person_from_row).transpose()
}

/// Case-insensitive substring search on name and trade name.
pub fn search_persons(conn: &Connection, query: &str) -> Result<Vec<Person>, DatabaseError> {
    let pattern = format!("%{query}%");
    let sql = format!(
        "SELECT {PERSON_COLUMNS} FROM persons
         WHERE LOWER(name) LIKE LOWER(?1) OR LOWER(trade_name) LIKE LOWER(?1)
         ORDER BY name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![pattern], person_row_from_rusqlite)?;
    rows.map(|row| person_from_row(row?)).collect()
}

pub fn update_person_contact(
    conn: &Connection,
    id: &Uuid,
    phone: Option<&str>,
    email: Option<&str>,
    address: Option<&str>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE persons SET phone = ?2, email = ?3, address = ?4 WHERE id = ?1",
        params![id.to_string(), phone, email, address],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "person".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

struct PersonRow {
    id: String,
    kind: String,
    name: String,
    tax_id: Option<String>,
    trade_name: Option<String>,
    state_registration: Option<String>,
    birth_date: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    created_at: String,
}

fn person_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<PersonRow, rusqlite::Error> {
    Ok(PersonRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        name: row.get(2)?,
        tax_id: row.get(3)?,
        trade_name: row.get(4)?,
        state_registration: row.get(5)?,
        birth_date: row.get(6)?,
        phone: row.get(7)?,
        email: row.get(8)?,
        address: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn person_from_row(row: PersonRow) -> Result<Person, DatabaseError> {
    Ok(Person {
        id: parse_uuid(&row.id)?,
        kind: PersonKind::from_str(&row.kind)?,
        name: row.name,
        tax_id: row.tax_id,
        trade_name: row.trade_name,
        state_registration: row.state_registration,
        birth_date: parse_opt_date(row.birth_date)?,
        phone: row.phone,
        email: row.email,
        address: row.address,
        created_at: parse_datetime(&row.created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn make_person(conn: &Connection, kind: PersonKind, name: &str, tax_id: Option<&str>) -> Person {
        let person = Person {
            id: Uuid::new_v4(),
            kind,
            name: name.into(),
            tax_id: tax_id.map(str::to_string),
            trade_name: None,
            state_registration: None,
            birth_date: None,
            phone: None,
            email: None,
            address: None,
            created_at: parse_datetime("2024-01-02 10:00:00").unwrap(),
        };
        insert_person(conn, &person).unwrap();
        person
    }

    #[test]
    fn lookup_by_tax_id() {
        let conn = open_memory_database().unwrap();
        let person = make_person(&conn, PersonKind::Individual, "Maria Souza", Some("52998224725"));
        let found = get_person_by_tax_id(&conn, "52998224725").unwrap().unwrap();
        assert_eq!(found.id, person.id);
        assert_eq!(found.created_at, person.created_at);
        assert!(get_person_by_tax_id(&conn, "00000000000").unwrap().is_none());
    }

    #[test]
    fn duplicate_tax_id_rejected_by_schema() {
        let conn = open_memory_database().unwrap();
        make_person(&conn, PersonKind::Individual, "Maria", Some("52998224725"));
        let dup = Person {
            id: Uuid::new_v4(),
            ..get_person_by_tax_id(&conn, "52998224725").unwrap().unwrap()
        };
        assert!(insert_person(&conn, &dup).is_err());
    }

    #[test]
    fn search_is_case_insensitive() {
        let conn = open_memory_database().unwrap();
        make_person(&conn, PersonKind::Individual, "Maria Souza", None);
        make_person(&conn, PersonKind::Individual, "João Lima", None);
        let hits = search_persons(&conn, "maria").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Maria Souza");
    }

    #[test]
    fn contact_update() {
        let conn = open_memory_database().unwrap();
        let person = make_person(&conn, PersonKind::Company, "Auto Peças", Some("11222333000181"));
        update_person_contact(&conn, &person.id, Some("11 99999-0000"), None, Some("Rua A, 1")).unwrap();
        let stored = get_person(&conn, &person.id).unwrap().unwrap();
        assert_eq!(stored.phone.as_deref(), Some("11 99999-0000"));
        assert_eq!(stored.address.as_deref(), Some("Rua A, 1"));

        let err = update_person_contact(&conn, &Uuid::new_v4(), None, None, None).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
