//! Workflow and report errors.
//!
//! Repository functions return `DatabaseError`; everything above them
//! (registration, service orders, payments, reports) returns `ShopError`.

use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::enums::ServiceOrderStatus;

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: &'static str, id: String },

    #[error("Service order cannot go from {from} to {to}")]
    InvalidTransition {
        from: ServiceOrderStatus,
        to: ServiceOrderStatus,
    },

    #[error("Service order is {0} and can no longer be edited")]
    OrderLocked(ServiceOrderStatus),

    #[error("Insufficient stock for {code}: {available} available, {requested} requested")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    #[error("Payment of {amount_cents} exceeds outstanding balance {outstanding_cents}")]
    Overpayment {
        amount_cents: i64,
        outstanding_cents: i64,
    },

    #[error("Vehicle {plate} is registered to another client")]
    VehicleOwnedByAnotherClient { plate: String },

    #[error("Occurrence {due_on} of payable {payable_id} is already settled")]
    AlreadySettled { payable_id: String, due_on: String },

    #[error("Nothing to pay: {0}")]
    NothingToPay(String),
}

impl From<rusqlite::Error> for ShopError {
    fn from(err: rusqlite::Error) -> Self {
        ShopError::Database(DatabaseError::Sqlite(err))
    }
}

impl ShopError {
    pub(crate) fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        ShopError::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_message_uses_stored_names() {
        let err = ShopError::InvalidTransition {
            from: ServiceOrderStatus::Delivered,
            to: ServiceOrderStatus::Open,
        };
        assert_eq!(
            err.to_string(),
            "Service order cannot go from delivered to open"
        );
    }

    #[test]
    fn sqlite_errors_wrap_through_database_error() {
        let err: ShopError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, ShopError::Database(DatabaseError::Sqlite(_))));
    }
}
