//! Cash book: every money movement of the shop, in one ledger.
//!
//! Movements are gathered from the tables that record money changing
//! hands, then folded by [`build_cash_book`] into an opening balance,
//! dated lines with a running balance, and totals. Card payments enter
//! the book only when the acquirer deposits them, net of fees.

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::error::ShopError;
use crate::models::enums::{CashDirection, MovementSource};
use crate::models::{BankAccount, DateRange, ServiceOrderFilter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBankAccount {
    pub label: String,
    pub bank: String,
    pub agency: Option<String>,
    pub account_number: Option<String>,
    pub opening_balance_cents: i64,
    pub opened_on: NaiveDate,
}

/// A single money movement, before aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub date: NaiveDate,
    pub direction: CashDirection,
    pub amount_cents: i64,
    pub source: MovementSource,
    pub reference_id: Uuid,
    pub description: String,
    /// `None` is the cash drawer.
    pub bank_account_id: Option<Uuid>,
}

impl Movement {
    pub fn signed_cents(&self) -> i64 {
        self.direction.signed(self.amount_cents)
    }
}

/// Which money the book covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "id")]
pub enum AccountScope {
    #[default]
    All,
    CashDrawer,
    Bank(Uuid),
}

impl AccountScope {
    pub fn includes(&self, bank_account_id: Option<Uuid>) -> bool {
        match self {
            Self::All => true,
            Self::CashDrawer => bank_account_id.is_none(),
            Self::Bank(id) => bank_account_id == Some(*id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBookLine {
    pub date: NaiveDate,
    pub direction: CashDirection,
    pub source: MovementSource,
    pub reference_id: Uuid,
    pub description: String,
    pub amount_cents: i64,
    pub bank_account_id: Option<Uuid>,
    pub balance_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBook {
    pub range: DateRange,
    pub opening_balance_cents: i64,
    pub lines: Vec<CashBookLine>,
    pub total_in_cents: i64,
    pub total_out_cents: i64,
    pub closing_balance_cents: i64,
}

pub fn create_bank_account(conn: &Connection, input: &NewBankAccount) -> Result<BankAccount, ShopError> {
    if input.label.trim().is_empty() || input.bank.trim().is_empty() {
        return Err(ShopError::Validation("bank account label and bank are required".into()));
    }
    let account = BankAccount {
        id: Uuid::new_v4(),
        label: input.label.trim().to_string(),
        bank: input.bank.trim().to_string(),
        agency: input.agency.clone(),
        account_number: input.account_number.clone(),
        opening_balance_cents: input.opening_balance_cents,
        opened_on: input.opened_on,
        active: true,
    };
    db::insert_bank_account(conn, &account)?;
    tracing::info!(account_id = %account.id, label = %account.label, "Bank account created");
    Ok(account)
}

/// Fold movements into a cash book for `range`.
///
/// Movements before `range.from` make up the opening balance; those
/// after `range.to` are ignored. Lines are ordered by date, inflows
/// before outflows on the same day, then by position in `movements`.
pub fn build_cash_book(movements: &[Movement], range: &DateRange) -> CashBook {
    let opening_balance_cents: i64 = movements
        .iter()
        .filter(|m| m.date < range.from)
        .map(Movement::signed_cents)
        .sum();

    let mut in_range: Vec<&Movement> = movements.iter().filter(|m| range.contains(m.date)).collect();
    in_range.sort_by_key(|m| (m.date, m.direction == CashDirection::Outflow));

    let mut balance = opening_balance_cents;
    let mut total_in_cents = 0;
    let mut total_out_cents = 0;
    let lines = in_range
        .into_iter()
        .map(|m| {
            match m.direction {
                CashDirection::Inflow => total_in_cents += m.amount_cents,
                CashDirection::Outflow => total_out_cents += m.amount_cents,
            }
            balance += m.signed_cents();
            CashBookLine {
                date: m.date,
                direction: m.direction,
                source: m.source,
                reference_id: m.reference_id,
                description: m.description.clone(),
                amount_cents: m.amount_cents,
                bank_account_id: m.bank_account_id,
                balance_cents: balance,
            }
        })
        .collect();

    CashBook {
        range: *range,
        opening_balance_cents,
        lines,
        total_in_cents,
        total_out_cents,
        closing_balance_cents: opening_balance_cents + total_in_cents - total_out_cents,
    }
}

/// Every movement dated on or before `until`.
pub fn gather_movements(conn: &Connection, until: NaiveDate) -> Result<Vec<Movement>, ShopError> {
    let mut movements = Vec::new();

    for account in db::list_bank_accounts(conn)? {
        if account.opened_on <= until && account.opening_balance_cents != 0 {
            let direction = if account.opening_balance_cents >= 0 {
                CashDirection::Inflow
            } else {
                CashDirection::Outflow
            };
            movements.push(Movement {
                date: account.opened_on,
                direction,
                amount_cents: account.opening_balance_cents.abs(),
                source: MovementSource::OpeningBalance,
                reference_id: account.id,
                description: format!("Opening balance {}", account.label),
                bank_account_id: Some(account.id),
            });
        }
    }

    let order_numbers: HashMap<Uuid, i64> = db::list_service_orders(conn, &ServiceOrderFilter::default())?
        .into_iter()
        .map(|o| (o.id, o.number))
        .collect();
    let order_label = |order_id: &Uuid| match order_numbers.get(order_id) {
        Some(number) => format!("SO #{number}"),
        None => format!("SO {order_id}"),
    };

    for payment in db::list_client_payments_until(conn, until)? {
        if payment.method.is_card() {
            continue;
        }
        movements.push(Movement {
            date: payment.paid_on,
            direction: CashDirection::Inflow,
            amount_cents: payment.amount_cents,
            source: MovementSource::ClientPayment,
            reference_id: payment.id,
            description: format!("{} ({})", order_label(&payment.order_id), payment.method),
            bank_account_id: payment.bank_account_id,
        });
    }

    for receivable in db::list_received_card_receivables_until(conn, until)? {
        let Some(received_on) = receivable.received_on else {
            continue;
        };
        movements.push(Movement {
            date: received_on,
            direction: CashDirection::Inflow,
            amount_cents: receivable.net_cents(),
            source: MovementSource::CardReceivable,
            reference_id: receivable.id,
            description: format!(
                "Card installment {}/{}",
                receivable.installment_number, receivable.installment_count
            ),
            bank_account_id: receivable.bank_account_id,
        });
    }

    for purchase in db::list_part_payments_until(conn, until)? {
        movements.push(Movement {
            date: purchase.paid_on,
            direction: CashDirection::Outflow,
            amount_cents: purchase.amount_cents,
            source: MovementSource::PartPayment,
            reference_id: purchase.id,
            description: purchase.description,
            bank_account_id: purchase.bank_account_id,
        });
    }

    let payable_names: HashMap<Uuid, String> = db::list_payables(conn)?
        .into_iter()
        .map(|p| (p.id, p.description))
        .collect();
    for settlement in db::list_payable_settlements_paid_until(conn, until)? {
        let name = payable_names.get(&settlement.payable_id).cloned().unwrap_or_default();
        movements.push(Movement {
            date: settlement.paid_on,
            direction: CashDirection::Outflow,
            amount_cents: settlement.amount_cents,
            source: MovementSource::Payable,
            reference_id: settlement.id,
            description: format!("{name} (due {})", settlement.due_on),
            bank_account_id: settlement.bank_account_id,
        });
    }

    for commission in db::list_commission_payments_until(conn, until)? {
        movements.push(Movement {
            date: commission.paid_on,
            direction: CashDirection::Outflow,
            amount_cents: commission.amount_cents,
            source: MovementSource::Commission,
            reference_id: commission.id,
            description: format!("Commission {} to {}", commission.period_start, commission.period_end),
            bank_account_id: commission.bank_account_id,
        });
    }

    for entry in db::list_cash_book_entries_until(conn, until)? {
        movements.push(Movement {
            date: entry.entry_date,
            direction: entry.direction,
            amount_cents: entry.amount_cents,
            source: MovementSource::Manual,
            reference_id: entry.id,
            description: entry.description,
            bank_account_id: entry.bank_account_id,
        });
    }

    tracing::debug!(count = movements.len(), %until, "Cash movements gathered");
    Ok(movements)
}

pub fn cash_book(conn: &Connection, range: &DateRange, scope: AccountScope) -> Result<CashBook, ShopError> {
    let movements: Vec<Movement> = gather_movements(conn, range.to)?
        .into_iter()
        .filter(|m| scope.includes(m.bank_account_id))
        .collect();
    Ok(build_cash_book(&movements, range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::PaymentMethod;
    use crate::payments::{record_client_payment, record_manual_entry, settle_due_card_receivables, NewCashEntry, NewClientPayment};
    use crate::registration::{register_walk_in, NewClient, NewPerson, NewVehicle, WalkIn};
    use crate::service_orders::add_labor_item;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn mv(date: NaiveDate, direction: CashDirection, amount: i64, description: &str) -> Movement {
        Movement {
            date,
            direction,
            amount_cents: amount,
            source: MovementSource::Manual,
            reference_id: Uuid::new_v4(),
            description: description.into(),
            bank_account_id: None,
        }
    }

    #[test]
    fn opening_lines_and_closing() {
        let movements = vec![
            mv(d(2024, 2, 28), CashDirection::Inflow, 10_000, "before"),
            mv(d(2024, 3, 1), CashDirection::Outflow, 3_000, "rent"),
            mv(d(2024, 3, 2), CashDirection::Inflow, 5_000, "service"),
            mv(d(2024, 4, 1), CashDirection::Inflow, 99_999, "after"),
        ];
        let range = DateRange::new(d(2024, 3, 1), d(2024, 3, 31)).unwrap();
        let book = build_cash_book(&movements, &range);

        assert_eq!(book.opening_balance_cents, 10_000);
        assert_eq!(book.lines.len(), 2);
        assert_eq!(book.lines[0].balance_cents, 7_000);
        assert_eq!(book.lines[1].balance_cents, 12_000);
        assert_eq!(book.total_in_cents, 5_000);
        assert_eq!(book.total_out_cents, 3_000);
        assert_eq!(book.closing_balance_cents, 12_000);
    }

    #[test]
    fn same_day_inflows_first_then_insertion_order() {
        let day = d(2024, 3, 5);
        let movements = vec![
            mv(day, CashDirection::Outflow, 100, "out-1"),
            mv(day, CashDirection::Inflow, 200, "in-1"),
            mv(day, CashDirection::Outflow, 300, "out-2"),
            mv(day, CashDirection::Inflow, 400, "in-2"),
        ];
        let book = build_cash_book(&movements, &DateRange::new(day, day).unwrap());
        let order: Vec<&str> = book.lines.iter().map(|l| l.description.as_str()).collect();
        assert_eq!(order, vec!["in-1", "in-2", "out-1", "out-2"]);
        assert_eq!(book.lines.last().unwrap().balance_cents, 200);
    }

    #[test]
    fn empty_book_carries_opening() {
        let movements = vec![mv(d(2024, 1, 1), CashDirection::Inflow, 500, "float")];
        let book = build_cash_book(&movements, &DateRange::new(d(2024, 2, 1), d(2024, 2, 29)).unwrap());
        assert!(book.lines.is_empty());
        assert_eq!(book.opening_balance_cents, 500);
        assert_eq!(book.closing_balance_cents, 500);
    }

    #[test]
    fn scope_filters_accounts() {
        let bank = Uuid::new_v4();
        assert!(AccountScope::All.includes(Some(bank)));
        assert!(AccountScope::CashDrawer.includes(None));
        assert!(!AccountScope::CashDrawer.includes(Some(bank)));
        assert!(AccountScope::Bank(bank).includes(Some(bank)));
        assert!(!AccountScope::Bank(bank).includes(None));
    }

    #[test]
    fn card_payment_enters_only_when_received() {
        let conn = open_memory_database().unwrap();
        let account = create_bank_account(&conn, &NewBankAccount {
            label: "Conta movimento".into(),
            bank: "Banco do Brasil".into(),
            agency: None,
            account_number: None,
            opening_balance_cents: 100_000,
            opened_on: d(2024, 1, 1),
        })
        .unwrap();
        let order = register_walk_in(&conn, &WalkIn {
            client: NewClient {
                person: NewPerson::individual("Clara Dias", None),
                notes: None,
            },
            vehicle: NewVehicle {
                plate: "RTY2B34".into(),
                brand: "Honda".into(),
                model: "Fit".into(),
                year: None,
                color: None,
                mileage: 70_000,
            },
            employee_id: None,
            opened_on: d(2024, 3, 1),
            complaint: None,
        })
        .unwrap()
        .order;
        add_labor_item(&conn, &order.id, "Troca de embreagem", 1, 50_000, None).unwrap();

        record_client_payment(&conn, &NewClientPayment {
            order_id: order.id,
            amount_cents: 20_000,
            paid_on: d(2024, 3, 4),
            method: PaymentMethod::Cash,
            installments: 1,
            bank_account_id: None,
            notes: None,
        })
        .unwrap();
        record_client_payment(&conn, &NewClientPayment {
            order_id: order.id,
            amount_cents: 30_000,
            paid_on: d(2024, 3, 4),
            method: PaymentMethod::DebitCard,
            installments: 1,
            bank_account_id: Some(account.id),
            notes: None,
        })
        .unwrap();
        record_manual_entry(&conn, &NewCashEntry {
            entry_date: d(2024, 3, 6),
            direction: CashDirection::Outflow,
            category: "petty".into(),
            description: "Café".into(),
            amount_cents: 1_500,
            bank_account_id: None,
        })
        .unwrap();

        let march = DateRange::new(d(2024, 3, 1), d(2024, 3, 31)).unwrap();
        let before = cash_book(&conn, &march, AccountScope::All).unwrap();
        assert_eq!(before.opening_balance_cents, 100_000);
        assert_eq!(before.total_in_cents, 20_000);

        settle_due_card_receivables(&conn, d(2024, 3, 31)).unwrap();
        let after = cash_book(&conn, &march, AccountScope::All).unwrap();
        let fee = crate::money::bp_of(30_000, crate::config::DEFAULT_DEBIT_FEE_BP);
        assert_eq!(after.total_in_cents, 20_000 + 30_000 - fee);
        assert_eq!(after.total_out_cents, 1_500);

        let drawer = cash_book(&conn, &march, AccountScope::CashDrawer).unwrap();
        assert_eq!(drawer.closing_balance_cents, 20_000 - 1_500);

        let bank = cash_book(&conn, &march, AccountScope::Bank(account.id)).unwrap();
        assert_eq!(bank.closing_balance_cents, 100_000 + 30_000 - fee);
        assert_eq!(bank.lines[0].date, d(2024, 3, 5));
    }
}
