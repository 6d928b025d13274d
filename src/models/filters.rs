use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ServiceOrderStatus;
use crate::error::ShopError;

/// Inclusive date range used by every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, ShopError> {
        if from > to {
            return Err(ShopError::Validation(format!(
                "date range starts after it ends ({from} > {to})"
            )));
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

#[derive(Debug, Default)]
pub struct ServiceOrderFilter {
    pub status: Option<ServiceOrderStatus>,
    pub client_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub opened_from: Option<NaiveDate>,
    pub opened_to: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn range_is_inclusive() {
        let range = DateRange::new(d(2024, 3, 1), d(2024, 3, 31)).unwrap();
        assert!(range.contains(d(2024, 3, 1)));
        assert!(range.contains(d(2024, 3, 31)));
        assert!(!range.contains(d(2024, 4, 1)));
    }

    #[test]
    fn inverted_range_rejected() {
        let err = DateRange::new(d(2024, 4, 1), d(2024, 3, 1)).unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[test]
    fn single_day_range() {
        assert!(DateRange::new(d(2024, 3, 1), d(2024, 3, 1)).is_ok());
    }
}
