use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Oficina";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable that overrides the database location.
pub const DB_PATH_ENV: &str = "OFICINA_DB";

/// Database file name inside the data directory.
pub const DB_FILE_NAME: &str = "oficina.db";

/// Credit card payments can be split in at most this many installments.
pub const MAX_CARD_INSTALLMENTS: u32 = 12;

/// Default acquirer fees, in basis points.
pub const DEFAULT_DEBIT_FEE_BP: u32 = 199;
pub const DEFAULT_CREDIT_FEE_BP: u32 = 349;
pub const DEFAULT_CREDIT_INSTALLMENT_FEE_BP: u32 = 499;

/// Default settlement delays, in days after the sale.
pub const DEFAULT_DEBIT_SETTLEMENT_DAYS: u32 = 1;
pub const DEFAULT_CREDIT_SETTLEMENT_DAYS: u32 = 30;

/// Default tracing filter when `RUST_LOG` is unset
pub fn default_log_filter() -> &'static str {
    "oficina_lib=info,oficina=info,warn"
}

/// Get the application data directory
/// ~/Oficina/ on all platforms, falling back to the working directory
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Database path: `$OFICINA_DB` when set, else `~/Oficina/oficina.db`
pub fn database_path() -> PathBuf {
    std::env::var_os(DB_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| app_data_dir().join(DB_FILE_NAME))
}
