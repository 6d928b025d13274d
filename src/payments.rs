//! Money in and out: client payments, card receivables, supplier
//! purchases, bill settlements, commission payouts and manual entries.

use chrono::{Days, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::MAX_CARD_INSTALLMENTS;
use crate::db::{self, ShopSettings};
use crate::error::ShopError;
use crate::models::enums::{CashDirection, PaymentMethod, ServiceOrderStatus};
use crate::models::{
    CardReceivable, CashBookEntry, ClientPayment, CommissionPayment, DateRange, PartPayment, PayableSettlement,
};
use crate::money::{bp_of, split_even};
use crate::payables::is_due_date;
use crate::reports::{commission_due, labor_by_employee};
use crate::service_orders::{load_order, order_totals};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClientPayment {
    pub order_id: Uuid,
    pub amount_cents: i64,
    pub paid_on: NaiveDate,
    pub method: PaymentMethod,
    pub installments: u32,
    pub bank_account_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPartPurchase {
    pub supplier_id: Uuid,
    pub part_id: Option<Uuid>,
    pub quantity: i64,
    pub description: Option<String>,
    pub amount_cents: i64,
    pub paid_on: NaiveDate,
    pub method: PaymentMethod,
    pub bank_account_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCashEntry {
    pub entry_date: NaiveDate,
    pub direction: CashDirection,
    pub category: String,
    pub description: String,
    pub amount_cents: i64,
    pub bank_account_id: Option<Uuid>,
}

/// One installment the acquirer will deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInstallment {
    pub number: u32,
    pub count: u32,
    pub gross_cents: i64,
    pub fee_cents: i64,
    pub expected_on: NaiveDate,
}

/// Installments for a card payment. Non-card methods yield none.
///
/// Remainder cents go to the first installments, so the grosses always
/// add up to `gross_cents`.
pub fn card_schedule(
    gross_cents: i64,
    method: PaymentMethod,
    installments: u32,
    paid_on: NaiveDate,
    settings: &ShopSettings,
) -> Vec<CardInstallment> {
    let count = installments.max(1);
    let (rate, step_days) = match method {
        PaymentMethod::DebitCard => (settings.debit_fee_bp, settings.debit_settlement_days),
        PaymentMethod::CreditCard if count > 1 => {
            (settings.credit_installment_fee_bp, settings.credit_settlement_days)
        }
        PaymentMethod::CreditCard => (settings.credit_fee_bp, settings.credit_settlement_days),
        _ => return Vec::new(),
    };

    split_even(gross_cents, count)
        .into_iter()
        .zip(1..)
        .map(|(gross, number)| {
            let offset = match method {
                PaymentMethod::DebitCard => u64::from(step_days),
                _ => u64::from(step_days) * u64::from(number),
            };
            CardInstallment {
                number,
                count,
                gross_cents: gross,
                fee_cents: bp_of(gross, rate),
                expected_on: paid_on.checked_add_days(Days::new(offset)).unwrap_or(NaiveDate::MAX),
            }
        })
        .collect()
}

fn check_bank_account(conn: &Connection, bank_account_id: Option<&Uuid>) -> Result<(), ShopError> {
    if let Some(id) = bank_account_id {
        if db::get_bank_account(conn, id)?.is_none() {
            return Err(ShopError::not_found("bank account", id));
        }
    }
    Ok(())
}

/// Receive money against a service order.
///
/// Card payments also book one receivable per installment using the
/// fees and delays in `shop_settings`. They must name the bank account
/// the acquirer deposits into.
pub fn record_client_payment(conn: &Connection, input: &NewClientPayment) -> Result<ClientPayment, ShopError> {
    if input.amount_cents <= 0 {
        return Err(ShopError::Validation("payment amount must be positive".into()));
    }
    if input.installments == 0 || input.installments > MAX_CARD_INSTALLMENTS {
        return Err(ShopError::Validation(format!(
            "installments must be between 1 and {MAX_CARD_INSTALLMENTS}"
        )));
    }
    if input.installments > 1 && input.method != PaymentMethod::CreditCard {
        return Err(ShopError::Validation(format!(
            "{} payments cannot be split into installments",
            input.method
        )));
    }
    if input.method.is_card() && input.bank_account_id.is_none() {
        return Err(ShopError::Validation(format!(
            "{} payments need the bank account the acquirer deposits into",
            input.method
        )));
    }
    check_bank_account(conn, input.bank_account_id.as_ref())?;

    let tx = conn.unchecked_transaction()?;
    let order = load_order(&tx, &input.order_id)?;
    if order.status == ServiceOrderStatus::Cancelled {
        return Err(ShopError::Validation(format!(
            "service order {} is cancelled",
            order.number
        )));
    }
    let totals = order_totals(&tx, &order.id)?;
    if input.amount_cents > totals.outstanding_cents {
        tracing::warn!(
            order_id = %order.id,
            amount_cents = input.amount_cents,
            outstanding_cents = totals.outstanding_cents,
            "Payment exceeds outstanding balance"
        );
        return Err(ShopError::Overpayment {
            amount_cents: input.amount_cents,
            outstanding_cents: totals.outstanding_cents,
        });
    }

    let payment = ClientPayment {
        id: Uuid::new_v4(),
        order_id: order.id,
        amount_cents: input.amount_cents,
        paid_on: input.paid_on,
        method: input.method,
        installments: input.installments,
        bank_account_id: input.bank_account_id,
        notes: input.notes.clone(),
    };
    db::insert_client_payment(&tx, &payment)?;

    if payment.method.is_card() {
        let settings = db::load_shop_settings(&tx)?;
        for installment in card_schedule(
            payment.amount_cents,
            payment.method,
            payment.installments,
            payment.paid_on,
            &settings,
        ) {
            db::insert_card_receivable(&tx, &CardReceivable {
                id: Uuid::new_v4(),
                client_payment_id: payment.id,
                installment_number: installment.number,
                installment_count: installment.count,
                gross_cents: installment.gross_cents,
                fee_cents: installment.fee_cents,
                expected_on: installment.expected_on,
                received_on: None,
                bank_account_id: payment.bank_account_id,
            })?;
        }
    }
    tx.commit()?;

    tracing::info!(
        order_id = %order.id,
        payment_id = %payment.id,
        method = %payment.method,
        amount_cents = payment.amount_cents,
        "Client payment recorded"
    );
    Ok(payment)
}

/// Mark every card receivable due by `as_of` as received on its
/// expected date. Returns how many were settled.
pub fn settle_due_card_receivables(conn: &Connection, as_of: NaiveDate) -> Result<usize, ShopError> {
    let settled = db::mark_card_receivables_received_until(conn, as_of)?;
    tracing::info!(%as_of, settled, "Card receivables reconciled");
    Ok(settled)
}

/// Pay a supplier. When a stocked part and quantity are given the
/// shelf grows and the part's unit cost becomes the purchase price.
pub fn record_part_purchase(conn: &Connection, input: &NewPartPurchase) -> Result<PartPayment, ShopError> {
    if input.amount_cents <= 0 {
        return Err(ShopError::Validation("purchase amount must be positive".into()));
    }
    if input.quantity < 0 {
        return Err(ShopError::Validation("quantity cannot be negative".into()));
    }
    if db::get_supplier(conn, &input.supplier_id)?.is_none() {
        return Err(ShopError::not_found("supplier", input.supplier_id));
    }
    check_bank_account(conn, input.bank_account_id.as_ref())?;

    let tx = conn.unchecked_transaction()?;
    let part = match &input.part_id {
        Some(id) => Some(db::get_stock_part(&tx, id)?.ok_or_else(|| ShopError::not_found("stock part", id))?),
        None => None,
    };
    let description = match (&input.description, &part) {
        (Some(text), _) if !text.trim().is_empty() => text.trim().to_string(),
        (_, Some(part)) => part.description.clone(),
        _ => return Err(ShopError::Validation("purchase description is required".into())),
    };

    let payment = PartPayment {
        id: Uuid::new_v4(),
        supplier_id: input.supplier_id,
        part_id: input.part_id,
        quantity: input.quantity,
        description,
        amount_cents: input.amount_cents,
        paid_on: input.paid_on,
        method: input.method,
        bank_account_id: input.bank_account_id,
    };
    db::insert_part_payment(&tx, &payment)?;

    if let Some(part) = &part {
        if input.quantity > 0 {
            let unit_cost = (input.amount_cents + input.quantity / 2) / input.quantity;
            db::adjust_stock_quantity(&tx, &part.id, input.quantity)?;
            db::update_stock_part_cost(&tx, &part.id, unit_cost)?;
            tracing::debug!(code = %part.code, unit_cost, "Part cost updated from purchase");
        }
    }
    tx.commit()?;

    tracing::info!(payment_id = %payment.id, supplier_id = %payment.supplier_id, "Part purchase recorded");
    Ok(payment)
}

/// Pay one occurrence of a bill. Amount and account default to the
/// payable's own.
pub fn settle_payable(
    conn: &Connection,
    payable_id: &Uuid,
    due_on: NaiveDate,
    paid_on: NaiveDate,
    amount_cents: Option<i64>,
    bank_account_id: Option<Uuid>,
) -> Result<PayableSettlement, ShopError> {
    let payable = db::get_payable(conn, payable_id)?.ok_or_else(|| ShopError::not_found("payable", payable_id))?;
    if !is_due_date(&payable, due_on) {
        return Err(ShopError::Validation(format!(
            "{due_on} is not a due date of {}",
            payable.description
        )));
    }
    if db::get_payable_settlement(conn, payable_id, due_on)?.is_some() {
        return Err(ShopError::AlreadySettled {
            payable_id: payable_id.to_string(),
            due_on: due_on.to_string(),
        });
    }
    let amount_cents = amount_cents.unwrap_or(payable.amount_cents);
    if amount_cents <= 0 {
        return Err(ShopError::Validation("settlement amount must be positive".into()));
    }
    let bank_account_id = bank_account_id.or(payable.bank_account_id);
    check_bank_account(conn, bank_account_id.as_ref())?;

    let settlement = PayableSettlement {
        id: Uuid::new_v4(),
        payable_id: *payable_id,
        due_on,
        paid_on,
        amount_cents,
        bank_account_id,
    };
    db::insert_payable_settlement(conn, &settlement)?;
    tracing::info!(payable_id = %payable_id, %due_on, amount_cents, "Payable settled");
    Ok(settlement)
}

/// Pay what is still owed to an employee for `period`.
pub fn pay_commission(
    conn: &Connection,
    employee_id: &Uuid,
    period: &DateRange,
    paid_on: NaiveDate,
    bank_account_id: Option<Uuid>,
) -> Result<CommissionPayment, ShopError> {
    let employee = db::get_employee(conn, employee_id)?.ok_or_else(|| ShopError::not_found("employee", employee_id))?;
    check_bank_account(conn, bank_account_id.as_ref())?;

    let orders = labor_by_employee(conn, period)?.remove(employee_id).unwrap_or_default();
    let due = commission_due(conn, employee_id, employee.commission_bp, &orders)?;
    let amount_cents = due.payable_cents();
    if amount_cents <= 0 {
        return Err(ShopError::NothingToPay(format!(
            "no commission owed for {} to {}",
            period.from, period.to
        )));
    }

    let payment = CommissionPayment {
        id: Uuid::new_v4(),
        employee_id: *employee_id,
        period_start: period.from,
        period_end: period.to,
        amount_cents,
        paid_on,
        bank_account_id,
    };
    let tx = conn.unchecked_transaction()?;
    db::insert_commission_payment(&tx, &payment)?;
    for (order_id, owed_cents) in &due.owed_by_order {
        db::insert_commission_payment_order(&tx, &payment.id, order_id, *owed_cents)?;
    }
    tx.commit()?;
    tracing::info!(
        employee_id = %employee_id,
        amount_cents,
        orders = due.owed_by_order.len(),
        "Commission paid"
    );
    Ok(payment)
}

pub fn record_manual_entry(conn: &Connection, input: &NewCashEntry) -> Result<CashBookEntry, ShopError> {
    if input.amount_cents <= 0 {
        return Err(ShopError::Validation("entry amount must be positive".into()));
    }
    if input.description.trim().is_empty() {
        return Err(ShopError::Validation("entry description is required".into()));
    }
    check_bank_account(conn, input.bank_account_id.as_ref())?;

    let entry = CashBookEntry {
        id: Uuid::new_v4(),
        entry_date: input.entry_date,
        direction: input.direction,
        category: input.category.trim().to_string(),
        description: input.description.trim().to_string(),
        amount_cents: input.amount_cents,
        bank_account_id: input.bank_account_id,
    };
    db::insert_cash_book_entry(conn, &entry)?;
    tracing::info!(entry_id = %entry.id, direction = %entry.direction, "Manual cash entry recorded");
    Ok(entry)
}
