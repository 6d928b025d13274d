//! Management reports built on top of orders, payments and the cash book.

use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cash_book::{cash_book, gather_movements, AccountScope, Movement};
use crate::db;
use crate::error::ShopError;
use crate::models::enums::{CashDirection, ItemKind};
use crate::models::{DateRange, ServiceOrder, StockPart};
use crate::money::bp_of;
use crate::payables::payable_schedule;
use crate::service_orders::OrderTotals;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub range: DateRange,
    pub orders_closed: usize,
    pub parts_revenue_cents: i64,
    pub labor_revenue_cents: i64,
    pub discounts_cents: i64,
    pub net_revenue_cents: i64,
    pub parts_cost_cents: i64,
    pub gross_margin_cents: i64,
    pub commissions_accrued_cents: i64,
    pub cash_in_cents: i64,
    pub cash_out_cents: i64,
    pub cash_net_cents: i64,
    pub receivables_outstanding_cents: i64,
    pub card_receivables_pending_cents: i64,
    pub payables_due_cents: i64,
    pub payables_overdue_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionLine {
    pub employee_id: Uuid,
    pub name: String,
    pub commission_bp: u32,
    pub labor_cents: i64,
    pub accrued_cents: i64,
    pub paid_cents: i64,
    pub balance_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankBalance {
    /// `None` is the cash drawer.
    pub bank_account_id: Option<Uuid>,
    pub label: String,
    pub balance_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivableLine {
    pub order_id: Uuid,
    pub number: i64,
    pub client_name: String,
    pub closed_on: NaiveDate,
    pub days_since_closing: i64,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub outstanding_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastLine {
    pub date: NaiveDate,
    pub direction: CashDirection,
    pub description: String,
    pub amount_cents: i64,
    pub projected_balance_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowForecast {
    pub range: DateRange,
    pub starting_balance_cents: i64,
    pub lines: Vec<ForecastLine>,
    pub ending_balance_cents: i64,
}

/// Labor sold per employee and order, on orders closed in `range`.
///
/// Labor without a mechanic is credited to the order's responsible
/// employee, if any.
pub fn labor_by_employee(
    conn: &Connection,
    range: &DateRange,
) -> Result<HashMap<Uuid, BTreeMap<Uuid, i64>>, ShopError> {
    let mut labor: HashMap<Uuid, BTreeMap<Uuid, i64>> = HashMap::new();
    for order in db::list_orders_closed_between(conn, range.from, range.to)? {
        for item in db::list_service_order_items(conn, &order.id)? {
            if item.kind != ItemKind::Labor {
                continue;
            }
            if let Some(employee_id) = item.employee_id.or(order.employee_id) {
                *labor.entry(employee_id).or_default().entry(order.id).or_default() += item.total_cents();
            }
        }
    }
    Ok(labor)
}

/// Commission of one employee over a set of orders, with what each order
/// still owes after earlier payouts.
pub(crate) struct CommissionDue {
    pub labor_cents: i64,
    pub accrued_cents: i64,
    pub paid_cents: i64,
    pub owed_by_order: Vec<(Uuid, i64)>,
}

impl CommissionDue {
    pub fn balance_cents(&self) -> i64 {
        self.accrued_cents - self.paid_cents
    }

    pub fn payable_cents(&self) -> i64 {
        self.owed_by_order.iter().map(|(_, owed)| owed).sum()
    }
}

pub(crate) fn commission_due(
    conn: &Connection,
    employee_id: &Uuid,
    commission_bp: u32,
    labor_by_order: &BTreeMap<Uuid, i64>,
) -> Result<CommissionDue, ShopError> {
    let paid_by_order = db::commission_paid_by_order(conn, employee_id)?;
    let mut due = CommissionDue {
        labor_cents: 0,
        accrued_cents: 0,
        paid_cents: 0,
        owed_by_order: Vec::new(),
    };
    for (order_id, labor_cents) in labor_by_order {
        let accrued = bp_of(*labor_cents, commission_bp);
        let paid = paid_by_order.get(order_id).copied().unwrap_or(0);
        due.labor_cents += labor_cents;
        due.accrued_cents += accrued;
        due.paid_cents += paid;
        if accrued > paid {
            due.owed_by_order.push((*order_id, accrued - paid));
        }
    }
    Ok(due)
}

fn closed_order_totals(conn: &Connection, order: &ServiceOrder, paid_cents: i64) -> Result<OrderTotals, ShopError> {
    let items = db::list_service_order_items(conn, &order.id)?;
    Ok(OrderTotals::from_items(&items, order.discount_cents, paid_cents))
}

pub fn financial_summary(conn: &Connection, range: &DateRange) -> Result<FinancialSummary, ShopError> {
    let orders = db::list_orders_closed_between(conn, range.from, range.to)?;
    let mut parts_revenue_cents = 0;
    let mut labor_revenue_cents = 0;
    let mut discounts_cents = 0;
    let mut parts_cost_cents = 0;
    for order in &orders {
        let totals = closed_order_totals(conn, order, 0)?;
        parts_revenue_cents += totals.parts_cents;
        labor_revenue_cents += totals.labor_cents;
        discounts_cents += totals.discount_cents;
        parts_cost_cents += totals.parts_cost_cents;
    }
    let net_revenue_cents = parts_revenue_cents + labor_revenue_cents - discounts_cents;

    let commissions_accrued_cents = commission_report(conn, range)?
        .iter()
        .map(|line| line.accrued_cents)
        .sum();

    let book = cash_book(conn, range, AccountScope::All)?;

    let receivables_outstanding_cents = receivables_report(conn, range.to)?
        .iter()
        .map(|line| line.outstanding_cents)
        .sum();

    let card_receivables_pending_cents = db::list_pending_card_receivables(conn)?
        .iter()
        .map(|r| r.net_cents())
        .sum();

    let schedule = payable_schedule(conn, range, range.to)?;
    let payables_due_cents = schedule.iter().map(|o| o.amount_cents).sum();
    let payables_overdue_cents = schedule.iter().filter(|o| o.overdue).map(|o| o.amount_cents).sum();

    tracing::debug!(orders = orders.len(), from = %range.from, to = %range.to, "Financial summary built");
    Ok(FinancialSummary {
        range: *range,
        orders_closed: orders.len(),
        parts_revenue_cents,
        labor_revenue_cents,
        discounts_cents,
        net_revenue_cents,
        parts_cost_cents,
        gross_margin_cents: net_revenue_cents - parts_cost_cents,
        commissions_accrued_cents,
        cash_in_cents: book.total_in_cents,
        cash_out_cents: book.total_out_cents,
        cash_net_cents: book.total_in_cents - book.total_out_cents,
        receivables_outstanding_cents,
        card_receivables_pending_cents,
        payables_due_cents,
        payables_overdue_cents,
    })
}

/// Commission per employee for orders closed in `range`.
///
/// Accrual is on gross labor; order discounts do not reduce it.
pub fn commission_report(conn: &Connection, range: &DateRange) -> Result<Vec<CommissionLine>, ShopError> {
    let labor = labor_by_employee(conn, range)?;
    let mut lines = Vec::new();
    for employee in db::list_employees(conn)? {
        let Some(orders) = labor.get(&employee.id) else {
            continue;
        };
        let due = commission_due(conn, &employee.id, employee.commission_bp, orders)?;
        lines.push(CommissionLine {
            employee_id: employee.id,
            name: employee.name,
            commission_bp: employee.commission_bp,
            labor_cents: due.labor_cents,
            accrued_cents: due.accrued_cents,
            paid_cents: due.paid_cents,
            balance_cents: due.balance_cents(),
        });
    }
    Ok(lines)
}

/// Balance of every bank account and the cash drawer at end of `as_of`.
pub fn bank_balances(conn: &Connection, as_of: NaiveDate) -> Result<Vec<BankBalance>, ShopError> {
    let mut by_account: HashMap<Option<Uuid>, i64> = HashMap::new();
    for movement in gather_movements(conn, as_of)? {
        *by_account.entry(movement.bank_account_id).or_default() += movement.signed_cents();
    }

    let mut balances = vec![BankBalance {
        bank_account_id: None,
        label: "Cash drawer".into(),
        balance_cents: by_account.get(&None).copied().unwrap_or(0),
    }];
    for account in db::list_bank_accounts(conn)? {
        balances.push(BankBalance {
            bank_account_id: Some(account.id),
            balance_cents: by_account.get(&Some(account.id)).copied().unwrap_or(0),
            label: account.label,
        });
    }
    Ok(balances)
}

/// Closed orders still owing money at `as_of`, oldest first.
pub fn receivables_report(conn: &Connection, as_of: NaiveDate) -> Result<Vec<ReceivableLine>, ShopError> {
    let mut lines = Vec::new();
    for order in db::list_orders_closed_until(conn, as_of)? {
        let Some(closed_on) = order.closed_on else {
            continue;
        };
        let paid_cents: i64 = db::list_client_payments_for_order(conn, &order.id)?
            .iter()
            .filter(|p| p.paid_on <= as_of)
            .map(|p| p.amount_cents)
            .sum();
        let totals = closed_order_totals(conn, &order, paid_cents)?;
        if totals.outstanding_cents <= 0 {
            continue;
        }

        let client_name = match db::get_client(conn, &order.client_id)? {
            Some(client) => db::get_person(conn, &client.person_id)?
                .map(|p| p.name)
                .unwrap_or_default(),
            None => String::new(),
        };
        lines.push(ReceivableLine {
            order_id: order.id,
            number: order.number,
            client_name,
            closed_on,
            days_since_closing: (as_of - closed_on).num_days(),
            total_cents: totals.total_cents,
            paid_cents,
            outstanding_cents: totals.outstanding_cents,
        });
    }
    Ok(lines)
}

pub fn low_stock(conn: &Connection) -> Result<Vec<StockPart>, ShopError> {
    Ok(db::list_low_stock_parts(conn)?)
}

/// Projected balance over `range` from pending card deposits and unpaid
/// bills, starting from the actual balance the day before.
pub fn cash_flow_forecast(conn: &Connection, range: &DateRange) -> Result<CashFlowForecast, ShopError> {
    let starting_balance_cents: i64 = match range.from.checked_sub_days(Days::new(1)) {
        Some(eve) => gather_movements(conn, eve)?.iter().map(Movement::signed_cents).sum(),
        None => 0,
    };

    let mut entries: Vec<(NaiveDate, CashDirection, String, i64)> = Vec::new();
    for receivable in db::list_pending_card_receivables(conn)? {
        if range.contains(receivable.expected_on) {
            entries.push((
                receivable.expected_on,
                CashDirection::Inflow,
                format!(
                    "Card installment {}/{}",
                    receivable.installment_number, receivable.installment_count
                ),
                receivable.net_cents(),
            ));
        }
    }
    for occurrence in payable_schedule(conn, range, range.from)? {
        if occurrence.settlement.is_none() {
            entries.push((
                occurrence.due_on,
                CashDirection::Outflow,
                occurrence.description,
                occurrence.amount_cents,
            ));
        }
    }
    entries.sort_by_key(|(date, direction, _, _)| (*date, *direction == CashDirection::Outflow));

    let mut balance = starting_balance_cents;
    let lines = entries
        .into_iter()
        .map(|(date, direction, description, amount_cents)| {
            balance += direction.signed(amount_cents);
            ForecastLine {
                date,
                direction,
                description,
                amount_cents,
                projected_balance_cents: balance,
            }
        })
        .collect();

    Ok(CashFlowForecast {
        range: *range,
        starting_balance_cents,
        lines,
        ending_balance_cents: balance,
    })
}
