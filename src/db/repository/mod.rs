//! Repository layer: entity-scoped database operations.
//!
//! One sub-module per table family. Every row is read into a raw row
//! struct first, then converted; malformed ids, dates or enum values
//! surface as `DatabaseError` instead of being silently defaulted.

mod bank_account;
mod cash_entry;
mod commission;
mod payable;
mod payment;
mod person;
mod registry;
mod service_order;
mod settings;
mod staff;
mod stock;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use super::DatabaseError;

pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad uuid {value:?}: {e}")))
}

pub(crate) fn parse_opt_uuid(value: Option<String>) -> Result<Option<Uuid>, DatabaseError> {
    value.as_deref().map(parse_uuid).transpose()
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad date {value:?}: {e}")))
}

pub(crate) fn parse_opt_date(value: Option<String>) -> Result<Option<NaiveDate>, DatabaseError> {
    value.as_deref().map(parse_date).transpose()
}

pub(crate) fn parse_datetime(value: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp {value:?}: {e}")))
}

pub(crate) fn format_datetime(value: &NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

// Re-export all public items from sub-modules
pub use bank_account::*;
pub use cash_entry::*;
pub use commission::*;
pub use payable::*;
pub use payment::*;
pub use person::*;
pub use registry::*;
pub use service_order::*;
pub use settings::*;
pub use staff::*;
pub use stock::*;
