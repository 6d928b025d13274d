use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::cash_book::{cash_book, AccountScope};
use crate::config;
use crate::db::{self, DatabaseError};
use crate::error::ShopError;
use crate::models::enums::ServiceOrderStatus;
use crate::models::{DateRange, ServiceOrderFilter};
use crate::payables::payable_schedule;
use crate::payments::settle_due_card_receivables;
use crate::reports;
use crate::service_orders::order_detail;

/// Oficina - repair shop management and financial reports
#[derive(Parser, Debug)]
#[command(name = "oficina")]
#[command(about = "Repair shop registry, service orders and cash-flow reports")]
#[command(version)]
pub struct Cli {
    /// Database file (defaults to $OFICINA_DB or ~/Oficina/oficina.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and apply the schema
    Init,
    /// Cash book with opening balance, dated lines and totals
    CashBook {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        /// Only this bank account
        #[arg(long, conflicts_with = "drawer")]
        account: Option<Uuid>,
        /// Only the cash drawer
        #[arg(long)]
        drawer: bool,
    },
    /// Revenue, margin, cash and open balances for a period
    Summary {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Commission accrued, paid and owed per employee
    Commissions {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Balance of each bank account and the cash drawer
    BankBalances {
        /// Defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Closed service orders with money still owed
    Receivables {
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Parts at or below their minimum quantity
    LowStock,
    /// Bill occurrences with settlement and overdue flag
    Payables {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Projected balance from card deposits and unpaid bills
    Forecast {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Mark card receivables due by the given date as received
    SettleCardReceivables {
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Clients with contact and vehicle count
    Clients,
    /// Find people by name or trade name
    Search { query: String },
    /// Vehicles registered to a client
    Vehicles {
        #[arg(long)]
        client: Uuid,
    },
    /// Employees with commission rates
    Employees,
    /// Every stocked part
    Stock,
    /// Service orders, newest first
    Orders {
        /// open, in_progress, completed, delivered or cancelled
        #[arg(long)]
        status: Option<ServiceOrderStatus>,
        #[arg(long)]
        client: Option<Uuid>,
    },
    /// One service order with items, payments and totals
    Order { number: i64 },
    /// Purchases paid to a supplier
    SupplierPayments {
        #[arg(long)]
        supplier: Uuid,
    },
    /// Show or change acquirer fees and settlement delays
    Settings {
        #[arg(long)]
        debit_fee_bp: Option<u32>,
        #[arg(long)]
        credit_fee_bp: Option<u32>,
        #[arg(long)]
        credit_installment_fee_bp: Option<u32>,
        #[arg(long)]
        debit_settlement_days: Option<u32>,
        #[arg(long)]
        credit_settlement_days: Option<u32>,
    },
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Shop(#[from] ShopError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Could not create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Output encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open(path: Option<PathBuf>) -> Result<(PathBuf, rusqlite::Connection), CliError> {
    let path = path.unwrap_or_else(config::database_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| CliError::DataDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    tracing::debug!(path = %path.display(), "Opening database");
    let conn = db::open_database(&path)?;
    Ok((path, conn))
}

pub fn execute(cli: Cli) -> Result<(), CliError> {
    let (path, conn) = open(cli.db)?;

    match cli.command {
        Commands::Init => {
            tracing::info!(path = %path.display(), "Database ready");
            println!("{}", path.display());
        }
        Commands::CashBook {
            from,
            to,
            account,
            drawer,
        } => {
            let scope = match (account, drawer) {
                (Some(id), _) => AccountScope::Bank(id),
                (None, true) => AccountScope::CashDrawer,
                (None, false) => AccountScope::All,
            };
            print_json(&cash_book(&conn, &DateRange::new(from, to)?, scope)?)?;
        }
        Commands::Summary { from, to } => {
            print_json(&reports::financial_summary(&conn, &DateRange::new(from, to)?)?)?;
        }
        Commands::Commissions { from, to } => {
            print_json(&reports::commission_report(&conn, &DateRange::new(from, to)?)?)?;
        }
        Commands::BankBalances { as_of } => {
            print_json(&reports::bank_balances(&conn, as_of.unwrap_or_else(today))?)?;
        }
        Commands::Receivables { as_of } => {
            print_json(&reports::receivables_report(&conn, as_of.unwrap_or_else(today))?)?;
        }
        Commands::LowStock => {
            print_json(&reports::low_stock(&conn)?)?;
        }
        Commands::Payables { from, to, as_of } => {
            let range = DateRange::new(from, to)?;
            print_json(&payable_schedule(&conn, &range, as_of.unwrap_or_else(today))?)?;
        }
        Commands::Forecast { from, to } => {
            print_json(&reports::cash_flow_forecast(&conn, &DateRange::new(from, to)?)?)?;
        }
        Commands::SettleCardReceivables { as_of } => {
            let settled = settle_due_card_receivables(&conn, as_of.unwrap_or_else(today))?;
            println!("{settled}");
        }
        Commands::Clients => print_json(&db::list_clients(&conn)?)?,
        Commands::Search { query } => print_json(&db::search_persons(&conn, query.trim())?)?,
        Commands::Vehicles { client } => print_json(&db::list_vehicles_for_client(&conn, &client)?)?,
        Commands::Employees => print_json(&db::list_employees(&conn)?)?,
        Commands::Stock => print_json(&db::list_stock_parts(&conn)?)?,
        Commands::Orders { status, client } => {
            let filter = ServiceOrderFilter {
                status,
                client_id: client,
                ..Default::default()
            };
            print_json(&db::list_service_orders(&conn, &filter)?)?;
        }
        Commands::Order { number } => print_json(&order_detail(&conn, number)?)?,
        Commands::SupplierPayments { supplier } => {
            print_json(&db::list_part_payments_for_supplier(&conn, &supplier)?)?;
        }
        Commands::Settings {
            debit_fee_bp,
            credit_fee_bp,
            credit_installment_fee_bp,
            debit_settlement_days,
            credit_settlement_days,
        } => {
            let mut settings = db::load_shop_settings(&conn)?;
            let before = settings;
            settings.debit_fee_bp = debit_fee_bp.unwrap_or(settings.debit_fee_bp);
            settings.credit_fee_bp = credit_fee_bp.unwrap_or(settings.credit_fee_bp);
            settings.credit_installment_fee_bp =
                credit_installment_fee_bp.unwrap_or(settings.credit_installment_fee_bp);
            settings.debit_settlement_days = debit_settlement_days.unwrap_or(settings.debit_settlement_days);
            settings.credit_settlement_days = credit_settlement_days.unwrap_or(settings.credit_settlement_days);
            if settings != before {
                db::save_shop_settings(&conn, &settings)?;
                tracing::info!(?settings, "Shop settings updated");
            }
            print_json(&settings)?;
        }
    }
    Ok(())
}
