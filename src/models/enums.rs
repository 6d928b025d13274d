use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(PersonKind {
    Individual => "individual",
    Company => "company",
});

str_enum!(ServiceOrderStatus {
    Open => "open",
    InProgress => "in_progress",
    Completed => "completed",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

str_enum!(ItemKind {
    Part => "part",
    Labor => "labor",
});

str_enum!(PaymentMethod {
    Cash => "cash",
    Pix => "pix",
    BankTransfer => "bank_transfer",
    Boleto => "boleto",
    Check => "check",
    DebitCard => "debit_card",
    CreditCard => "credit_card",
});

str_enum!(Recurrence {
    Once => "once",
    Weekly => "weekly",
    Monthly => "monthly",
    Yearly => "yearly",
});

str_enum!(CashDirection {
    Inflow => "inflow",
    Outflow => "outflow",
});

str_enum!(MovementSource {
    OpeningBalance => "opening_balance",
    ClientPayment => "client_payment",
    CardReceivable => "card_receivable",
    PartPayment => "part_payment",
    Payable => "payable",
    Commission => "commission",
    Manual => "manual",
});

impl ServiceOrderStatus {
    /// Items and discount can only change while work is not finished.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Open | Self::InProgress)
    }

    /// Completed or delivered: the order counts as revenue.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Completed | Self::Delivered)
    }
}

impl PaymentMethod {
    pub fn is_card(&self) -> bool {
        matches!(self, Self::DebitCard | Self::CreditCard)
    }
}

impl CashDirection {
    /// Signed amount: inflows add, outflows subtract.
    pub fn signed(&self, amount_cents: i64) -> i64 {
        match self {
            Self::Inflow => amount_cents,
            Self::Outflow => -amount_cents,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn status_parses_stored_value() {
        assert_eq!(
            ServiceOrderStatus::from_str("in_progress").unwrap(),
            ServiceOrderStatus::InProgress
        );
        assert_eq!(ServiceOrderStatus::Delivered.as_str(), "delivered");
    }

    #[test]
    fn unknown_value_is_invalid_enum() {
        let err = PaymentMethod::from_str("barter").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
        assert!(err.to_string().contains("PaymentMethod"));
    }

    #[test]
    fn serde_uses_stored_names() {
        let json = serde_json::to_string(&PaymentMethod::CreditCard).unwrap();
        assert_eq!(json, "\"credit_card\"");
        let back: Recurrence = serde_json::from_str("\"monthly\"").unwrap();
        assert_eq!(back, Recurrence::Monthly);
    }

    #[test]
    fn card_methods() {
        assert!(PaymentMethod::DebitCard.is_card());
        assert!(PaymentMethod::CreditCard.is_card());
        assert!(!PaymentMethod::Pix.is_card());
    }

    #[test]
    fn editable_and_closed_states() {
        assert!(ServiceOrderStatus::Open.is_editable());
        assert!(!ServiceOrderStatus::Completed.is_editable());
        assert!(ServiceOrderStatus::Delivered.is_closed());
        assert!(!ServiceOrderStatus::Cancelled.is_closed());
    }

    #[test]
    fn direction_sign() {
        assert_eq!(CashDirection::Inflow.signed(500), 500);
        assert_eq!(CashDirection::Outflow.signed(500), -500);
    }
}
