use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::Rate;
use crate::errors::{LedgerError, Result};
use crate::interest::RecalculationMode;

/// ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// rate the global settings record is created with on first read
    #[serde(default = "default_interest_rate")]
    pub default_interest_rate: Rate,
    /// how pending installments are rewritten after a rate change
    #[serde(default)]
    pub recalculation_mode: RecalculationMode,
}

fn default_interest_rate() -> Rate {
    Rate::from_percentage(dec!(7))
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_interest_rate: default_interest_rate(),
            recalculation_mode: RecalculationMode::default(),
        }
    }
}

impl LedgerConfig {
    /// configuration that rewrites only the amount due and principal portion on a rate change
    pub fn payment_only() -> Self {
        Self {
            recalculation_mode: RecalculationMode::PaymentOnly,
            ..Self::default()
        }
    }

    /// parse from json, missing fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_interest_rate.is_negative() {
            return Err(LedgerError::InvalidConfiguration {
                message: format!(
                    "default interest rate must not be negative, got {}",
                    self.default_interest_rate
                ),
            });
        }
        Ok(())
    }
}
