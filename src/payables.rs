//! Bills to pay and their recurrence.

use std::collections::HashMap;

use chrono::{Days, Months, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::error::ShopError;
use crate::models::enums::Recurrence;
use crate::models::{DateRange, Payable, PayableSettlement};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayable {
    pub description: String,
    pub category: String,
    pub amount_cents: i64,
    pub first_due_on: NaiveDate,
    pub recurrence: Recurrence,
    pub recurrence_until: Option<NaiveDate>,
    pub supplier_id: Option<Uuid>,
    pub bank_account_id: Option<Uuid>,
}

/// One due date of a payable, with its settlement when paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayableOccurrence {
    pub payable_id: Uuid,
    pub description: String,
    pub category: String,
    pub due_on: NaiveDate,
    pub amount_cents: i64,
    pub settlement: Option<PayableSettlement>,
    pub overdue: bool,
}

pub fn create_payable(conn: &Connection, input: &NewPayable) -> Result<Payable, ShopError> {
    if input.description.trim().is_empty() {
        return Err(ShopError::Validation("payable description is required".into()));
    }
    if input.amount_cents <= 0 {
        return Err(ShopError::Validation("payable amount must be positive".into()));
    }
    if input.recurrence_until.is_some_and(|until| until < input.first_due_on) {
        return Err(ShopError::Validation("recurrence ends before the first due date".into()));
    }
    if let Some(account_id) = &input.bank_account_id {
        if db::get_bank_account(conn, account_id)?.is_none() {
            return Err(ShopError::not_found("bank account", account_id));
        }
    }

    let payable = Payable {
        id: Uuid::new_v4(),
        description: input.description.trim().to_string(),
        category: input.category.trim().to_string(),
        amount_cents: input.amount_cents,
        first_due_on: input.first_due_on,
        recurrence: input.recurrence,
        recurrence_until: input.recurrence_until,
        supplier_id: input.supplier_id,
        bank_account_id: input.bank_account_id,
        active: true,
    };
    db::insert_payable(conn, &payable)?;
    tracing::info!(payable_id = %payable.id, recurrence = %payable.recurrence, "Payable created");
    Ok(payable)
}

/// Stop future occurrences. Settlements already made are kept.
pub fn deactivate_payable(conn: &Connection, payable_id: &Uuid) -> Result<(), ShopError> {
    db::set_payable_active(conn, payable_id, false)?;
    tracing::info!(payable_id = %payable_id, "Payable deactivated");
    Ok(())
}

/// The `n`-th due date counting from the first (n = 0).
///
/// Months are always added to the first due date so a bill due on the
/// 31st comes back to the 31st after a short month.
fn nth_due_date(payable: &Payable, n: u32) -> Option<NaiveDate> {
    let first = payable.first_due_on;
    match payable.recurrence {
        Recurrence::Once => (n == 0).then_some(first),
        Recurrence::Weekly => first.checked_add_days(Days::new(7 * u64::from(n))),
        Recurrence::Monthly => first.checked_add_months(Months::new(n)),
        Recurrence::Yearly => first.checked_add_months(Months::new(n.checked_mul(12)?)),
    }
}

/// Due dates inside `range`, ignoring the active flag.
fn due_dates(payable: &Payable, range: &DateRange) -> Vec<NaiveDate> {
    let last = match payable.recurrence_until {
        Some(until) => until.min(range.to),
        None => range.to,
    };
    let mut dates = Vec::new();
    for n in 0.. {
        let Some(date) = nth_due_date(payable, n) else {
            break;
        };
        if date > last {
            break;
        }
        if date >= range.from {
            dates.push(date);
        }
    }
    dates
}

/// Due dates of an active payable inside `range`.
pub fn occurrences(payable: &Payable, range: &DateRange) -> Vec<NaiveDate> {
    if !payable.active {
        return Vec::new();
    }
    due_dates(payable, range)
}

/// Whether `date` is one of the payable's due dates.
pub fn is_due_date(payable: &Payable, date: NaiveDate) -> bool {
    let day = DateRange { from: date, to: date };
    due_dates(payable, &day).contains(&date)
}

/// Every occurrence in `range`, paired with its settlement.
///
/// Unpaid occurrences due before `as_of` are flagged overdue.
pub fn payable_schedule(
    conn: &Connection,
    range: &DateRange,
    as_of: NaiveDate,
) -> Result<Vec<PayableOccurrence>, ShopError> {
    let mut settled: HashMap<(Uuid, NaiveDate), PayableSettlement> = db::list_payable_settlements(conn)?
        .into_iter()
        .map(|s| ((s.payable_id, s.due_on), s))
        .collect();

    let mut schedule = Vec::new();
    for payable in db::list_payables(conn)? {
        for due_on in occurrences(&payable, range) {
            let settlement = settled.remove(&(payable.id, due_on));
            schedule.push(PayableOccurrence {
                payable_id: payable.id,
                description: payable.description.clone(),
                category: payable.category.clone(),
                due_on,
                amount_cents: payable.amount_cents,
                overdue: settlement.is_none() && due_on < as_of,
                settlement,
            });
        }
    }
    schedule.sort_by(|a, b| a.due_on.cmp(&b.due_on).then_with(|| a.description.cmp(&b.description)));
    tracing::debug!(occurrences = schedule.len(), "Payable schedule built");
    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn range(from: NaiveDate, to: NaiveDate) -> DateRange {
        DateRange::new(from, to).unwrap()
    }

    fn payable(first: NaiveDate, recurrence: Recurrence) -> Payable {
        Payable {
            id: Uuid::new_v4(),
            description: "Aluguel".into(),
            category: "rent".into(),
            amount_cents: 250_000,
            first_due_on: first,
            recurrence,
            recurrence_until: None,
            supplier_id: None,
            bank_account_id: None,
            active: true,
        }
    }

    #[test]
    fn monthly_clamps_to_month_end_and_recovers() {
        let p = payable(d(2024, 1, 31), Recurrence::Monthly);
        let dates = occurrences(&p, &range(d(2024, 1, 1), d(2024, 4, 30)));
        assert_eq!(dates, vec![d(2024, 1, 31), d(2024, 2, 29), d(2024, 3, 31), d(2024, 4, 30)]);
    }

    #[test]
    fn monthly_in_common_year() {
        let p = payable(d(2023, 1, 31), Recurrence::Monthly);
        let dates = occurrences(&p, &range(d(2023, 2, 1), d(2023, 2, 28)));
        assert_eq!(dates, vec![d(2023, 2, 28)]);
    }

    #[test]
    fn weekly_steps_seven_days() {
        let p = payable(d(2024, 3, 1), Recurrence::Weekly);
        let dates = occurrences(&p, &range(d(2024, 3, 5), d(2024, 3, 31)));
        assert_eq!(dates, vec![d(2024, 3, 8), d(2024, 3, 15), d(2024, 3, 22), d(2024, 3, 29)]);
    }

    #[test]
    fn once_yields_single_date() {
        let p = payable(d(2024, 6, 10), Recurrence::Once);
        assert_eq!(occurrences(&p, &range(d(2024, 1, 1), d(2024, 12, 31))), vec![d(2024, 6, 10)]);
        assert!(occurrences(&p, &range(d(2024, 7, 1), d(2024, 12, 31))).is_empty());
    }

    #[test]
    fn yearly_on_leap_day() {
        let p = payable(d(2024, 2, 29), Recurrence::Yearly);
        let dates = occurrences(&p, &range(d(2024, 1, 1), d(2028, 12, 31)));
        assert_eq!(
            dates,
            vec![d(2024, 2, 29), d(2025, 2, 28), d(2026, 2, 28), d(2027, 2, 28), d(2028, 2, 29)]
        );
    }

    #[test]
    fn recurrence_stops_at_until() {
        let mut p = payable(d(2024, 1, 10), Recurrence::Monthly);
        p.recurrence_until = Some(d(2024, 3, 10));
        let dates = occurrences(&p, &range(d(2024, 1, 1), d(2024, 12, 31)));
        assert_eq!(dates, vec![d(2024, 1, 10), d(2024, 2, 10), d(2024, 3, 10)]);
    }

    #[test]
    fn inactive_payable_has_no_occurrences() {
        let mut p = payable(d(2024, 1, 10), Recurrence::Monthly);
        p.active = false;
        assert!(occurrences(&p, &range(d(2024, 1, 1), d(2024, 12, 31))).is_empty());
        assert!(is_due_date(&p, d(2024, 2, 10)));
    }

    #[test]
    fn range_before_first_due_is_empty() {
        let p = payable(d(2024, 5, 1), Recurrence::Weekly);
        assert!(occurrences(&p, &range(d(2024, 1, 1), d(2024, 4, 30))).is_empty());
    }

    #[test]
    fn due_date_check() {
        let p = payable(d(2024, 1, 31), Recurrence::Monthly);
        assert!(is_due_date(&p, d(2024, 2, 29)));
        assert!(!is_due_date(&p, d(2024, 2, 28)));
        assert!(!is_due_date(&p, d(2023, 12, 31)));
    }

    #[test]
    fn schedule_flags_overdue_and_pairs_settlements() {
        let conn = open_memory_database().unwrap();
        let rent = create_payable(&conn, &NewPayable {
            description: "Aluguel".into(),
            category: "rent".into(),
            amount_cents: 250_000,
            first_due_on: d(2024, 1, 5),
            recurrence: Recurrence::Monthly,
            recurrence_until: None,
            supplier_id: None,
            bank_account_id: None,
        })
        .unwrap();
        db::insert_payable_settlement(&conn, &PayableSettlement {
            id: Uuid::new_v4(),
            payable_id: rent.id,
            due_on: d(2024, 1, 5),
            paid_on: d(2024, 1, 5),
            amount_cents: 250_000,
            bank_account_id: None,
        })
        .unwrap();

        let schedule = payable_schedule(&conn, &range(d(2024, 1, 1), d(2024, 3, 31)), d(2024, 2, 20)).unwrap();
        assert_eq!(schedule.len(), 3);
        assert!(schedule[0].settlement.is_some());
        assert!(!schedule[0].overdue);
        assert!(schedule[1].overdue);
        assert!(!schedule[2].overdue);
    }

    #[test]
    fn create_rejects_until_before_first() {
        let conn = open_memory_database().unwrap();
        let err = create_payable(&conn, &NewPayable {
            description: "Internet".into(),
            category: "utilities".into(),
            amount_cents: 15_000,
            first_due_on: d(2024, 5, 1),
            recurrence: Recurrence::Monthly,
            recurrence_until: Some(d(2024, 4, 1)),
            supplier_id: None,
            bank_account_id: None,
        })
        .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[test]
    fn deactivated_payable_leaves_schedule() {
        let conn = open_memory_database().unwrap();
        let power = create_payable(&conn, &NewPayable {
            description: "Energia".into(),
            category: "utilities".into(),
            amount_cents: 48_000,
            first_due_on: d(2024, 1, 15),
            recurrence: Recurrence::Monthly,
            recurrence_until: None,
            supplier_id: None,
            bank_account_id: None,
        })
        .unwrap();
        deactivate_payable(&conn, &power.id).unwrap();

        let schedule = payable_schedule(&conn, &range(d(2024, 1, 1), d(2024, 6, 30)), d(2024, 6, 30)).unwrap();
        assert!(schedule.is_empty());
        assert!(!db::get_payable(&conn, &power.id).unwrap().unwrap().active);
    }
}
