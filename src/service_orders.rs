//! Service order lifecycle: items, totals, discount and status changes.
//!
//! Part items move stock: adding one takes the quantity out of
//! `stock_parts`, removing it or cancelling the order puts it back.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::error::ShopError;
use crate::models::enums::{ItemKind, ServiceOrderStatus};
use crate::models::{ClientPayment, ServiceOrder, ServiceOrderItem, StockPart};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStockPart {
    pub code: String,
    pub description: String,
    pub supplier_id: Option<Uuid>,
    pub quantity: i64,
    pub minimum_quantity: i64,
    pub cost_cents: i64,
    pub price_cents: i64,
}

/// Money view of a service order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub parts_cents: i64,
    pub labor_cents: i64,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub outstanding_cents: i64,
    /// Cost snapshot of the parts used.
    pub parts_cost_cents: i64,
}

impl OrderTotals {
    /// Totals from already-loaded items.
    pub fn from_items(items: &[ServiceOrderItem], discount_cents: i64, paid_cents: i64) -> Self {
        let mut parts_cents = 0;
        let mut labor_cents = 0;
        let mut parts_cost_cents = 0;
        for item in items {
            match item.kind {
                ItemKind::Part => {
                    parts_cents += item.total_cents();
                    parts_cost_cents += item.cost_cents();
                }
                ItemKind::Labor => labor_cents += item.total_cents(),
            }
        }
        let subtotal_cents = parts_cents + labor_cents;
        let total_cents = subtotal_cents - discount_cents;
        Self {
            parts_cents,
            labor_cents,
            subtotal_cents,
            discount_cents,
            total_cents,
            paid_cents,
            outstanding_cents: total_cents - paid_cents,
            parts_cost_cents,
        }
    }
}

/// An order with everything needed to print or review it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: ServiceOrder,
    pub items: Vec<ServiceOrderItem>,
    pub payments: Vec<ClientPayment>,
    pub totals: OrderTotals,
}

pub fn create_stock_part(conn: &Connection, input: &NewStockPart) -> Result<StockPart, ShopError> {
    let code = input.code.trim().to_uppercase();
    if code.is_empty() {
        return Err(ShopError::Validation("part code is required".into()));
    }
    if input.quantity < 0 || input.minimum_quantity < 0 {
        return Err(ShopError::Validation("stock quantities cannot be negative".into()));
    }
    if input.cost_cents < 0 || input.price_cents < 0 {
        return Err(ShopError::Validation("part prices cannot be negative".into()));
    }
    if db::get_stock_part_by_code(conn, &code)?.is_some() {
        return Err(ShopError::Validation(format!("part code {code} already exists")));
    }

    let part = StockPart {
        id: Uuid::new_v4(),
        code,
        description: input.description.trim().to_string(),
        supplier_id: input.supplier_id,
        quantity: input.quantity,
        minimum_quantity: input.minimum_quantity,
        cost_cents: input.cost_cents,
        price_cents: input.price_cents,
    };
    db::insert_stock_part(conn, &part)?;
    tracing::info!(part_id = %part.id, code = %part.code, "Stock part created");
    Ok(part)
}

/// New cost and sale price for a part. Items already on orders keep the
/// values they were added with.
pub fn reprice_stock_part(
    conn: &Connection,
    part_id: &Uuid,
    cost_cents: i64,
    price_cents: i64,
) -> Result<StockPart, ShopError> {
    if cost_cents < 0 || price_cents < 0 {
        return Err(ShopError::Validation("part prices cannot be negative".into()));
    }
    let mut part = db::get_stock_part(conn, part_id)?.ok_or_else(|| ShopError::not_found("stock part", part_id))?;
    db::update_stock_part_prices(conn, part_id, cost_cents, price_cents)?;
    tracing::info!(part_id = %part_id, cost_cents, price_cents, "Stock part repriced");
    part.cost_cents = cost_cents;
    part.price_cents = price_cents;
    Ok(part)
}

pub(crate) fn load_order(conn: &Connection, order_id: &Uuid) -> Result<ServiceOrder, ShopError> {
    db::get_service_order(conn, order_id)?.ok_or_else(|| ShopError::not_found("service order", order_id))
}

fn load_editable_order(conn: &Connection, order_id: &Uuid) -> Result<ServiceOrder, ShopError> {
    let order = load_order(conn, order_id)?;
    if !order.status.is_editable() {
        return Err(ShopError::OrderLocked(order.status));
    }
    Ok(order)
}

/// Add a part from stock, taking it out of the shelf.
///
/// The unit price defaults to the part's current sale price; the unit
/// cost is always the part's current cost.
pub fn add_part_item(
    conn: &Connection,
    order_id: &Uuid,
    part_id: &Uuid,
    quantity: i64,
    unit_price_cents: Option<i64>,
) -> Result<ServiceOrderItem, ShopError> {
    if quantity <= 0 {
        return Err(ShopError::Validation("quantity must be positive".into()));
    }
    if unit_price_cents.is_some_and(|price| price < 0) {
        return Err(ShopError::Validation("unit price cannot be negative".into()));
    }

    let tx = conn.unchecked_transaction()?;
    load_editable_order(&tx, order_id)?;
    let part = db::get_stock_part(&tx, part_id)?.ok_or_else(|| ShopError::not_found("stock part", part_id))?;
    if part.quantity < quantity {
        tracing::warn!(code = %part.code, available = part.quantity, requested = quantity, "Insufficient stock");
        return Err(ShopError::InsufficientStock {
            code: part.code,
            available: part.quantity,
            requested: quantity,
        });
    }

    let item = ServiceOrderItem {
        id: Uuid::new_v4(),
        order_id: *order_id,
        kind: ItemKind::Part,
        part_id: Some(part.id),
        employee_id: None,
        description: format!("{} {}", part.code, part.description),
        quantity,
        unit_price_cents: unit_price_cents.unwrap_or(part.price_cents),
        unit_cost_cents: part.cost_cents,
    };
    db::insert_service_order_item(&tx, &item)?;
    db::adjust_stock_quantity(&tx, &part.id, -quantity)?;
    tx.commit()?;

    tracing::info!(order_id = %order_id, code = %part.code, quantity, "Part item added");
    Ok(item)
}

/// Add labor, optionally credited to a mechanic for commission.
pub fn add_labor_item(
    conn: &Connection,
    order_id: &Uuid,
    description: &str,
    hours_or_units: i64,
    unit_price_cents: i64,
    employee_id: Option<Uuid>,
) -> Result<ServiceOrderItem, ShopError> {
    if description.trim().is_empty() {
        return Err(ShopError::Validation("labor description is required".into()));
    }
    if hours_or_units <= 0 {
        return Err(ShopError::Validation("quantity must be positive".into()));
    }
    if unit_price_cents < 0 {
        return Err(ShopError::Validation("unit price cannot be negative".into()));
    }
    load_editable_order(conn, order_id)?;
    if let Some(employee_id) = &employee_id {
        if db::get_employee(conn, employee_id)?.is_none() {
            return Err(ShopError::not_found("employee", employee_id));
        }
    }

    let item = ServiceOrderItem {
        id: Uuid::new_v4(),
        order_id: *order_id,
        kind: ItemKind::Labor,
        part_id: None,
        employee_id,
        description: description.trim().to_string(),
        quantity: hours_or_units,
        unit_price_cents,
        unit_cost_cents: 0,
    };
    db::insert_service_order_item(conn, &item)?;
    tracing::info!(order_id = %order_id, item_id = %item.id, "Labor item added");
    Ok(item)
}

/// Remove an item; part quantities go back to stock.
///
/// Refused when the remaining subtotal would fall below the discount, or
/// the remaining total below what the client already paid.
pub fn remove_item(conn: &Connection, item_id: &Uuid) -> Result<(), ShopError> {
    let tx = conn.unchecked_transaction()?;
    let item = db::get_service_order_item(&tx, item_id)?
        .ok_or_else(|| ShopError::not_found("service order item", item_id))?;
    let order = load_editable_order(&tx, &item.order_id)?;

    let items = db::list_service_order_items(&tx, &order.id)?;
    let subtotal: i64 = items.iter().map(ServiceOrderItem::total_cents).sum();
    if subtotal - item.total_cents() < order.discount_cents {
        return Err(ShopError::Validation(
            "removing this item leaves the discount above the subtotal".into(),
        ));
    }
    let paid = db::sum_client_payments_for_order(&tx, &order.id)?;
    if subtotal - item.total_cents() - order.discount_cents < paid {
        return Err(ShopError::Validation(
            "removing this item leaves the order below what was already paid".into(),
        ));
    }

    db::delete_service_order_item(&tx, item_id)?;
    if let Some(part_id) = &item.part_id {
        db::adjust_stock_quantity(&tx, part_id, item.quantity)?;
    }
    tx.commit()?;

    tracing::info!(order_id = %order.id, item_id = %item_id, "Item removed");
    Ok(())
}

pub fn order_totals(conn: &Connection, order_id: &Uuid) -> Result<OrderTotals, ShopError> {
    let order = load_order(conn, order_id)?;
    let items = db::list_service_order_items(conn, order_id)?;
    let paid = db::sum_client_payments_for_order(conn, order_id)?;
    Ok(OrderTotals::from_items(&items, order.discount_cents, paid))
}

pub fn order_detail(conn: &Connection, number: i64) -> Result<OrderDetail, ShopError> {
    let order = db::get_service_order_by_number(conn, number)?
        .ok_or_else(|| ShopError::not_found("service order", number))?;
    let items = db::list_service_order_items(conn, &order.id)?;
    let payments = db::list_client_payments_for_order(conn, &order.id)?;
    let paid = payments.iter().map(|p| p.amount_cents).sum();
    let totals = OrderTotals::from_items(&items, order.discount_cents, paid);
    Ok(OrderDetail {
        order,
        items,
        payments,
        totals,
    })
}

pub fn set_discount(conn: &Connection, order_id: &Uuid, discount_cents: i64) -> Result<OrderTotals, ShopError> {
    let order = load_editable_order(conn, order_id)?;
    let items = db::list_service_order_items(conn, order_id)?;
    let paid = db::sum_client_payments_for_order(conn, order_id)?;
    let current = OrderTotals::from_items(&items, order.discount_cents, paid);

    if discount_cents < 0 || discount_cents > current.subtotal_cents {
        return Err(ShopError::Validation(format!(
            "discount must be between 0 and {}",
            current.subtotal_cents
        )));
    }
    if current.subtotal_cents - discount_cents < paid {
        return Err(ShopError::Validation(
            "discount would leave the order below what was already paid".into(),
        ));
    }

    db::update_service_order_discount(conn, order_id, discount_cents)?;
    tracing::info!(order_id = %order_id, discount_cents, "Discount set");
    Ok(OrderTotals::from_items(&items, discount_cents, paid))
}

pub fn set_diagnosis(conn: &Connection, order_id: &Uuid, diagnosis: &str) -> Result<(), ShopError> {
    load_editable_order(conn, order_id)?;
    db::update_service_order_diagnosis(conn, order_id, diagnosis.trim())?;
    Ok(())
}

fn transition_allowed(from: ServiceOrderStatus, to: ServiceOrderStatus) -> bool {
    use ServiceOrderStatus::*;
    matches!(
        (from, to),
        (Open, InProgress)
            | (Open | InProgress, Completed)
            | (Completed, Delivered)
            | (Open | InProgress, Cancelled)
    )
}

fn check_transition(order: &ServiceOrder, to: ServiceOrderStatus) -> Result<(), ShopError> {
    if transition_allowed(order.status, to) {
        Ok(())
    } else {
        tracing::warn!(order_id = %order.id, from = %order.status, to = %to, "Rejected status change");
        Err(ShopError::InvalidTransition {
            from: order.status,
            to,
        })
    }
}

pub fn start_work(conn: &Connection, order_id: &Uuid) -> Result<ServiceOrder, ShopError> {
    let order = load_order(conn, order_id)?;
    check_transition(&order, ServiceOrderStatus::InProgress)?;
    db::update_service_order_status(conn, order_id, ServiceOrderStatus::InProgress, None)?;
    tracing::info!(order_id = %order_id, number = order.number, "Work started");
    load_order(conn, order_id)
}

/// Close the order. Revenue and commissions count from `closed_on`.
pub fn complete(conn: &Connection, order_id: &Uuid, closed_on: NaiveDate) -> Result<ServiceOrder, ShopError> {
    let order = load_order(conn, order_id)?;
    check_transition(&order, ServiceOrderStatus::Completed)?;
    if closed_on < order.opened_on {
        return Err(ShopError::Validation(format!(
            "closing date {closed_on} is before opening date {}",
            order.opened_on
        )));
    }
    if db::list_service_order_items(conn, order_id)?.is_empty() {
        return Err(ShopError::Validation("cannot complete an order without items".into()));
    }
    db::update_service_order_status(conn, order_id, ServiceOrderStatus::Completed, Some(closed_on))?;
    tracing::info!(order_id = %order_id, number = order.number, %closed_on, "Service order completed");
    load_order(conn, order_id)
}

pub fn deliver(conn: &Connection, order_id: &Uuid) -> Result<ServiceOrder, ShopError> {
    let order = load_order(conn, order_id)?;
    check_transition(&order, ServiceOrderStatus::Delivered)?;
    db::update_service_order_status(conn, order_id, ServiceOrderStatus::Delivered, order.closed_on)?;
    tracing::info!(order_id = %order_id, number = order.number, "Vehicle delivered");
    load_order(conn, order_id)
}

/// Cancel an unpaid order and return its parts to stock.
pub fn cancel(conn: &Connection, order_id: &Uuid) -> Result<ServiceOrder, ShopError> {
    let tx = conn.unchecked_transaction()?;
    let order = load_order(&tx, order_id)?;
    check_transition(&order, ServiceOrderStatus::Cancelled)?;
    if db::sum_client_payments_for_order(&tx, order_id)? > 0 {
        return Err(ShopError::Validation("cannot cancel an order with payments".into()));
    }

    let mut restored = 0;
    for item in db::list_service_order_items(&tx, order_id)? {
        if let Some(part_id) = &item.part_id {
            db::adjust_stock_quantity(&tx, part_id, item.quantity)?;
            restored += 1;
        }
    }
    db::update_service_order_status(&tx, order_id, ServiceOrderStatus::Cancelled, None)?;
    tx.commit()?;

    tracing::info!(order_id = %order_id, number = order.number, restored, "Service order cancelled");
    load_order(conn, order_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::PaymentMethod;
    use crate::payments::{record_client_payment, NewClientPayment};
    use crate::registration::{register_walk_in, NewClient, NewPerson, NewVehicle, WalkIn};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn open_order(conn: &Connection) -> ServiceOrder {
        register_walk_in(conn, &WalkIn {
            client: NewClient {
                person: NewPerson::individual("Ana Costa", None),
                notes: None,
            },
            vehicle: NewVehicle {
                plate: "QWE1A23".into(),
                brand: "Fiat".into(),
                model: "Uno".into(),
                year: None,
                color: None,
                mileage: 120_000,
            },
            employee_id: None,
            opened_on: d(2024, 5, 2),
            complaint: None,
        })
        .unwrap()
        .order
    }

    fn brake_pads(conn: &Connection, quantity: i64) -> StockPart {
        create_stock_part(conn, &NewStockPart {
            code: "pf-100".into(),
            description: "Pastilha de freio".into(),
            supplier_id: None,
            quantity,
            minimum_quantity: 2,
            cost_cents: 6_000,
            price_cents: 9_500,
        })
        .unwrap()
    }

    fn stock_of(conn: &Connection, part: &StockPart) -> i64 {
        db::get_stock_part(conn, &part.id).unwrap().unwrap().quantity
    }

    #[test]
    fn part_item_takes_price_and_cost_and_stock() {
        let conn = open_memory_database().unwrap();
        let order = open_order(&conn);
        let part = brake_pads(&conn, 5);

        let item = add_part_item(&conn, &order.id, &part.id, 2, None).unwrap();
        assert_eq!(item.unit_price_cents, 9_500);
        assert_eq!(item.unit_cost_cents, 6_000);
        assert_eq!(stock_of(&conn, &part), 3);

        let custom = add_part_item(&conn, &order.id, &part.id, 1, Some(8_000)).unwrap();
        assert_eq!(custom.unit_price_cents, 8_000);
        assert_eq!(stock_of(&conn, &part), 2);
    }

    #[test]
    fn repricing_keeps_existing_items() {
        let conn = open_memory_database().unwrap();
        let order = open_order(&conn);
        let part = brake_pads(&conn, 5);
        let before = add_part_item(&conn, &order.id, &part.id, 1, None).unwrap();

        let repriced = reprice_stock_part(&conn, &part.id, 6_600, 10_400).unwrap();
        assert_eq!(repriced.price_cents, 10_400);
        let after = add_part_item(&conn, &order.id, &part.id, 1, None).unwrap();
        assert_eq!((after.unit_cost_cents, after.unit_price_cents), (6_600, 10_400));

        let kept = db::get_service_order_item(&conn, &before.id).unwrap().unwrap();
        assert_eq!((kept.unit_cost_cents, kept.unit_price_cents), (6_000, 9_500));
        assert!(matches!(
            reprice_stock_part(&conn, &part.id, -1, 10_400),
            Err(ShopError::Validation(_))
        ));
        assert!(matches!(
            reprice_stock_part(&conn, &Uuid::new_v4(), 1, 1),
            Err(ShopError::NotFound { .. })
        ));
    }

    #[test]
    fn insufficient_stock_leaves_everything_untouched() {
        let conn = open_memory_database().unwrap();
        let order = open_order(&conn);
        let part = brake_pads(&conn, 1);

        let err = add_part_item(&conn, &order.id, &part.id, 2, None).unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock { available: 1, requested: 2, .. }));
        assert_eq!(stock_of(&conn, &part), 1);
        assert!(db::list_service_order_items(&conn, &order.id).unwrap().is_empty());
    }

    #[test]
    fn remove_item_restores_stock() {
        let conn = open_memory_database().unwrap();
        let order = open_order(&conn);
        let part = brake_pads(&conn, 4);
        let item = add_part_item(&conn, &order.id, &part.id, 3, None).unwrap();

        remove_item(&conn, &item.id).unwrap();
        assert_eq!(stock_of(&conn, &part), 4);
        assert!(db::get_service_order_item(&conn, &item.id).unwrap().is_none());
    }

    #[test]
    fn totals_split_parts_and_labor() {
        let conn = open_memory_database().unwrap();
        let order = open_order(&conn);
        let part = brake_pads(&conn, 4);
        add_part_item(&conn, &order.id, &part.id, 2, None).unwrap();
        add_labor_item(&conn, &order.id, "Troca de pastilhas", 1, 12_000, None).unwrap();
        set_discount(&conn, &order.id, 1_000).unwrap();

        let totals = order_totals(&conn, &order.id).unwrap();
        assert_eq!(totals.parts_cents, 19_000);
        assert_eq!(totals.labor_cents, 12_000);
        assert_eq!(totals.subtotal_cents, 31_000);
        assert_eq!(totals.total_cents, 30_000);
        assert_eq!(totals.outstanding_cents, 30_000);
        assert_eq!(totals.parts_cost_cents, 12_000);
    }

    #[test]
    fn discount_bounds() {
        let conn = open_memory_database().unwrap();
        let order = open_order(&conn);
        add_labor_item(&conn, &order.id, "Revisão", 1, 5_000, None).unwrap();

        assert!(set_discount(&conn, &order.id, -1).is_err());
        assert!(set_discount(&conn, &order.id, 5_001).is_err());
        assert_eq!(set_discount(&conn, &order.id, 5_000).unwrap().total_cents, 0);
    }

    #[test]
    fn removal_cannot_undercut_discount() {
        let conn = open_memory_database().unwrap();
        let order = open_order(&conn);
        let item = add_labor_item(&conn, &order.id, "Revisão", 1, 5_000, None).unwrap();
        set_discount(&conn, &order.id, 1_000).unwrap();
        assert!(matches!(remove_item(&conn, &item.id), Err(ShopError::Validation(_))));
    }

    #[test]
    fn removal_cannot_undercut_payment() {
        let conn = open_memory_database().unwrap();
        let order = open_order(&conn);
        let oil = add_labor_item(&conn, &order.id, "Troca de óleo", 1, 10_000, None).unwrap();
        add_labor_item(&conn, &order.id, "Filtro de ar", 1, 10_000, None).unwrap();
        record_client_payment(&conn, &NewClientPayment {
            order_id: order.id,
            amount_cents: 20_000,
            paid_on: d(2024, 5, 2),
            method: PaymentMethod::Cash,
            installments: 1,
            bank_account_id: None,
            notes: None,
        })
        .unwrap();

        assert!(matches!(remove_item(&conn, &oil.id), Err(ShopError::Validation(_))));
        let totals = order_totals(&conn, &order.id).unwrap();
        assert_eq!(totals.total_cents, 20_000);
        assert_eq!(totals.outstanding_cents, 0);
    }

    #[test]
    fn diagnosis_editable_until_closed() {
        let conn = open_memory_database().unwrap();
        let order = open_order(&conn);
        add_labor_item(&conn, &order.id, "Diagnóstico", 1, 8_000, None).unwrap();
        set_diagnosis(&conn, &order.id, "  Bobina de ignição queimada ").unwrap();
        let stored = db::get_service_order(&conn, &order.id).unwrap().unwrap();
        assert_eq!(stored.diagnosis.as_deref(), Some("Bobina de ignição queimada"));

        complete(&conn, &order.id, d(2024, 5, 3)).unwrap();
        let err = set_diagnosis(&conn, &order.id, "Outro").unwrap_err();
        assert!(matches!(err, ShopError::OrderLocked(ServiceOrderStatus::Completed)));
    }

    #[test]
    fn lifecycle_open_to_delivered() {
        let conn = open_memory_database().unwrap();
        let order = open_order(&conn);
        add_labor_item(&conn, &order.id, "Alinhamento", 1, 8_000, None).unwrap();

        assert_eq!(start_work(&conn, &order.id).unwrap().status, ServiceOrderStatus::InProgress);
        let done = complete(&conn, &order.id, d(2024, 5, 3)).unwrap();
        assert_eq!(done.status, ServiceOrderStatus::Completed);
        assert_eq!(done.closed_on, Some(d(2024, 5, 3)));

        let delivered = deliver(&conn, &order.id).unwrap();
        assert_eq!(delivered.status, ServiceOrderStatus::Delivered);
        assert_eq!(delivered.closed_on, Some(d(2024, 5, 3)));
    }

    #[test]
    fn closed_orders_are_locked() {
        let conn = open_memory_database().unwrap();
        let order = open_order(&conn);
        add_labor_item(&conn, &order.id, "Alinhamento", 1, 8_000, None).unwrap();
        complete(&conn, &order.id, d(2024, 5, 2)).unwrap();

        let err = add_labor_item(&conn, &order.id, "Extra", 1, 100, None).unwrap_err();
        assert!(matches!(err, ShopError::OrderLocked(ServiceOrderStatus::Completed)));
        assert!(matches!(set_discount(&conn, &order.id, 0), Err(ShopError::OrderLocked(_))));
    }

    #[test]
    fn invalid_transitions_rejected() {
        let conn = open_memory_database().unwrap();
        let order = open_order(&conn);

        assert!(matches!(deliver(&conn, &order.id), Err(ShopError::InvalidTransition { .. })));
        assert!(matches!(complete(&conn, &order.id, d(2024, 5, 2)), Err(ShopError::Validation(_))));

        add_labor_item(&conn, &order.id, "Alinhamento", 1, 8_000, None).unwrap();
        complete(&conn, &order.id, d(2024, 5, 2)).unwrap();
        assert!(matches!(start_work(&conn, &order.id), Err(ShopError::InvalidTransition { .. })));
        assert!(matches!(cancel(&conn, &order.id), Err(ShopError::InvalidTransition { .. })));
    }

    #[test]
    fn closing_before_opening_rejected() {
        let conn = open_memory_database().unwrap();
        let order = open_order(&conn);
        add_labor_item(&conn, &order.id, "Alinhamento", 1, 8_000, None).unwrap();
        assert!(matches!(complete(&conn, &order.id, d(2024, 5, 1)), Err(ShopError::Validation(_))));
    }

    #[test]
    fn cancel_returns_parts() {
        let conn = open_memory_database().unwrap();
        let order = open_order(&conn);
        let part = brake_pads(&conn, 6);
        add_part_item(&conn, &order.id, &part.id, 2, None).unwrap();
        add_part_item(&conn, &order.id, &part.id, 1, None).unwrap();
        assert_eq!(stock_of(&conn, &part), 3);

        let cancelled = cancel(&conn, &order.id).unwrap();
        assert_eq!(cancelled.status, ServiceOrderStatus::Cancelled);
        assert_eq!(stock_of(&conn, &part), 6);
    }

    #[test]
    fn duplicate_part_code_rejected() {
        let conn = open_memory_database().unwrap();
        brake_pads(&conn, 1);
        let err = create_stock_part(&conn, &NewStockPart {
            code: "PF-100".into(),
            description: "Outra".into(),
            supplier_id: None,
            quantity: 0,
            minimum_quantity: 0,
            cost_cents: 0,
            price_cents: 0,
        })
        .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[test]
    fn detail_by_number() {
        let conn = open_memory_database().unwrap();
        let order = open_order(&conn);
        add_labor_item(&conn, &order.id, "Diagnóstico", 1, 4_000, None).unwrap();
        add_labor_item(&conn, &order.id, "Limpeza de bicos", 1, 9_000, None).unwrap();

        let detail = order_detail(&conn, order.number).unwrap();
        assert_eq!(detail.order.id, order.id);
        let descriptions: Vec<&str> = detail.items.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(descriptions, vec!["Diagnóstico", "Limpeza de bicos"]);
        assert_eq!(detail.totals.total_cents, 13_000);
        assert!(matches!(order_detail(&conn, 99), Err(ShopError::NotFound { .. })));
    }
}
