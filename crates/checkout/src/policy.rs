//! Stock decrement policy applied per reserved cart line.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How many stock units a reserved cart line consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StockDecrementPolicy {
    /// Every line takes exactly one unit, whatever its quantity.
    #[default]
    OneUnitPerLine,

    /// Every line takes its full quantity.
    FullQuantity,
}

impl StockDecrementPolicy {
    /// Returns the units to take from stock for a line of `quantity`.
    pub fn units_for(&self, quantity: u32) -> u32 {
        match self {
            StockDecrementPolicy::OneUnitPerLine => 1,
            StockDecrementPolicy::FullQuantity => quantity,
        }
    }

    /// Returns the policy name as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            StockDecrementPolicy::OneUnitPerLine => "one-unit",
            StockDecrementPolicy::FullQuantity => "full-quantity",
        }
    }
}

impl std::fmt::Display for StockDecrementPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StockDecrementPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one-unit" | "one_unit" => Ok(StockDecrementPolicy::OneUnitPerLine),
            "full-quantity" | "full_quantity" => Ok(StockDecrementPolicy::FullQuantity),
            other => Err(format!("unknown stock decrement policy: {other}")),
        }
    }
}
