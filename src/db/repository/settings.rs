use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::db::DatabaseError;
use crate::money::FULL_BP;

const KEY_DEBIT_FEE: &str = "card.debit_fee_bp";
const KEY_CREDIT_FEE: &str = "card.credit_fee_bp";
const KEY_CREDIT_INSTALLMENT_FEE: &str = "card.credit_installment_fee_bp";
const KEY_DEBIT_DAYS: &str = "card.debit_settlement_days";
const KEY_CREDIT_DAYS: &str = "card.credit_settlement_days";

/// Acquirer fees and settlement delays used to schedule card receivables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopSettings {
    pub debit_fee_bp: u32,
    pub credit_fee_bp: u32,
    pub credit_installment_fee_bp: u32,
    pub debit_settlement_days: u32,
    pub credit_settlement_days: u32,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            debit_fee_bp: config::DEFAULT_DEBIT_FEE_BP,
            credit_fee_bp: config::DEFAULT_CREDIT_FEE_BP,
            credit_installment_fee_bp: config::DEFAULT_CREDIT_INSTALLMENT_FEE_BP,
            debit_settlement_days: config::DEFAULT_DEBIT_SETTLEMENT_DAYS,
            credit_settlement_days: config::DEFAULT_CREDIT_SETTLEMENT_DAYS,
        }
    }
}

impl ShopSettings {
    /// Fee rates cannot exceed the whole payment.
    pub fn validate(&self) -> Result<(), DatabaseError> {
        let fees = [
            (KEY_DEBIT_FEE, self.debit_fee_bp),
            (KEY_CREDIT_FEE, self.credit_fee_bp),
            (KEY_CREDIT_INSTALLMENT_FEE, self.credit_installment_fee_bp),
        ];
        for (key, bp) in fees {
            if bp > FULL_BP {
                return Err(DatabaseError::ConstraintViolation(format!(
                    "{key} is {bp} bp, above the {FULL_BP} bp maximum"
                )));
            }
        }
        Ok(())
    }
}

/// Get a setting by key. Returns None if not set.
pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT value FROM shop_settings WHERE key = ?1")?;
    match stmt.query_row([key], |row| row.get::<_, String>(0)) {
        Ok(val) => Ok(Some(val)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DatabaseError::from(e)),
    }
}

/// Set a setting (upsert).
pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO shop_settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

/// Load settings, falling back to compiled defaults for missing keys.
pub fn load_shop_settings(conn: &Connection) -> Result<ShopSettings, DatabaseError> {
    let defaults = ShopSettings::default();
    let settings = ShopSettings {
        debit_fee_bp: get_u32(conn, KEY_DEBIT_FEE, defaults.debit_fee_bp)?,
        credit_fee_bp: get_u32(conn, KEY_CREDIT_FEE, defaults.credit_fee_bp)?,
        credit_installment_fee_bp: get_u32(
            conn,
            KEY_CREDIT_INSTALLMENT_FEE,
            defaults.credit_installment_fee_bp,
        )?,
        debit_settlement_days: get_u32(conn, KEY_DEBIT_DAYS, defaults.debit_settlement_days)?,
        credit_settlement_days: get_u32(conn, KEY_CREDIT_DAYS, defaults.credit_settlement_days)?,
    };
    settings.validate()?;
    Ok(settings)
}

pub fn save_shop_settings(conn: &Connection, settings: &ShopSettings) -> Result<(), DatabaseError> {
    settings.validate()?;
    set_setting(conn, KEY_DEBIT_FEE, &settings.debit_fee_bp.to_string())?;
    set_setting(conn, KEY_CREDIT_FEE, &settings.credit_fee_bp.to_string())?;
    set_setting(
        conn,
        KEY_CREDIT_INSTALLMENT_FEE,
        &settings.credit_installment_fee_bp.to_string(),
    )?;
    set_setting(conn, KEY_DEBIT_DAYS, &settings.debit_settlement_days.to_string())?;
    set_setting(conn, KEY_CREDIT_DAYS, &settings.credit_settlement_days.to_string())?;
    Ok(())
}

fn get_u32(conn: &Connection, key: &str, default: u32) -> Result<u32, DatabaseError> {
    match get_setting(conn, key)? {
        Some(raw) => raw.parse().map_err(|_| DatabaseError::InvalidEnum {
            field: key.into(),
            value: raw,
        }),
        None => Ok(default),
    }
}
