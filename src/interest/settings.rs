use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::LedgerConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::loan::Loan;

use super::recalculation::{
    RateRecalculator, RecalculationOutcome, RecalculationReport, SkipReason,
};

pub const GLOBAL_SETTINGS_KEY: &str = "global";

/// the single settings record new loans read their rate from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub key: String,
    pub interest_rate: Rate,
}

impl GlobalSettings {
    pub fn new(interest_rate: Rate) -> Self {
        Self {
            key: GLOBAL_SETTINGS_KEY.to_string(),
            interest_rate,
        }
    }
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self::new(LedgerConfig::default().default_interest_rate)
    }
}

/// holder for the global settings, created with the configured default on first read
#[derive(Debug, Clone)]
pub struct InterestSettings {
    settings: Option<GlobalSettings>,
    default_rate: Rate,
}

impl InterestSettings {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            settings: None,
            default_rate: config.default_interest_rate,
        }
    }

    /// start from an existing record, e.g. one loaded from storage
    pub fn from_record(settings: GlobalSettings, config: &LedgerConfig) -> Self {
        Self {
            settings: Some(settings),
            default_rate: config.default_interest_rate,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.settings.is_some()
    }

    pub fn get(&mut self) -> &GlobalSettings {
        let default_rate = self.default_rate;
        self.settings.get_or_insert_with(|| {
            debug!(rate = %default_rate, "creating global interest settings");
            GlobalSettings::new(default_rate)
        })
    }

    pub fn current_rate(&mut self) -> Rate {
        self.get().interest_rate
    }

    /// overwrite the global rate without touching any loan, returning the previous rate
    pub fn set_rate(&mut self, new_rate: Rate) -> Result<Rate> {
        if new_rate.is_negative() {
            return Err(LedgerError::InvalidInterestRate { rate: new_rate });
        }
        let old_rate = self.current_rate();
        if let Some(settings) = self.settings.as_mut() {
            settings.interest_rate = new_rate;
        }
        Ok(old_rate)
    }

    /// change the global rate and reprice the pending installments of every approved loan
    ///
    /// Loans in any other status are left alone. A loan that fails to reprice is
    /// reported and keeps its previous terms; the rate change itself still stands.
    pub fn update_rate(
        &mut self,
        new_rate: Rate,
        loans: &mut [Loan],
        recalculator: &RateRecalculator,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<RecalculationReport> {
        let old_rate = self.set_rate(new_rate)?;
        let now = time_provider.now();

        events.emit(Event::InterestRateChanged {
            old_rate,
            new_rate,
            timestamp: now,
        });
        info!(old_rate = %old_rate, new_rate = %new_rate, "global interest rate changed");

        let active = loans.iter_mut().filter(|l| l.is_active());
        let report = recalculator.recalculate(new_rate, active);

        for (loan_id, outcome) in &report.outcomes {
            let event = match outcome {
                RecalculationOutcome::Updated(recalculation) => Event::LoanRecalculated {
                    loan_id: *loan_id,
                    old_rate: recalculation.old_rate,
                    new_rate,
                    new_installment: recalculation.new_installment,
                    pending_installments: recalculation.pending_installments,
                    credit_released: recalculation.credit_released,
                    timestamp: now,
                },
                RecalculationOutcome::Skipped(SkipReason::NoPendingInstallments) => {
                    Event::RecalculationSkipped {
                        loan_id: *loan_id,
                        reason: "no pending installments".to_string(),
                        timestamp: now,
                    }
                }
                RecalculationOutcome::Failed(error) => Event::RecalculationFailed {
                    loan_id: *loan_id,
                    reason: error.to_string(),
                    timestamp: now,
                },
            };
            events.emit(event);

            if let RecalculationOutcome::Updated(recalculation) = outcome {
                if recalculation.paid_off {
                    let advance_credit = loans
                        .iter()
                        .find(|l| l.id == *loan_id)
                        .map(|l| l.advance_credit.signed())
                        .unwrap_or(Money::ZERO);
                    events.emit(Event::LoanPaidOff {
                        loan_id: *loan_id,
                        advance_credit,
                        timestamp: now,
                    });
                    info!(loan_id = %loan_id, "loan paid off by repricing");
                }
            }
        }

        Ok(report)
    }
}
