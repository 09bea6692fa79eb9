use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{InstallmentIndex, InstallmentStatus};

/// one row of a repayment schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    pub due_date: NaiveDate,
    /// total amount due, principal plus interest
    pub installment: Money,
    /// principal portion
    pub amount: Money,
    /// interest portion
    pub interest: Money,
    /// principal balance after this installment
    pub remaining_balance: Money,
    #[serde(default)]
    pub amount_paid: Money,
    #[serde(default)]
    pub status: InstallmentStatus,
}

impl Installment {
    pub fn new(
        due_date: NaiveDate,
        amount: Money,
        interest: Money,
        remaining_balance: Money,
    ) -> Self {
        let installment = amount + interest;
        let status = if installment.is_zero() {
            InstallmentStatus::Paid
        } else {
            InstallmentStatus::Pending
        };

        Self {
            due_date,
            installment,
            amount,
            interest,
            remaining_balance,
            amount_paid: Money::ZERO,
            status,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == InstallmentStatus::Paid
    }

    pub fn is_pending(&self) -> bool {
        self.status == InstallmentStatus::Pending
    }

    /// amount still owed on this installment
    pub fn amount_due(&self) -> Money {
        (self.installment - self.amount_paid).max(Money::ZERO)
    }

    /// mark fully paid, returning the amount that settled it
    pub(crate) fn settle(&mut self) -> Money {
        let due = self.amount_due();
        self.amount_paid = self.installment;
        self.status = InstallmentStatus::Paid;
        due
    }

    /// record a payment smaller than the amount due
    pub(crate) fn apply_partial(&mut self, amount: Money) {
        debug_assert!(amount < self.amount_due());
        self.amount_paid += amount;
    }

    /// re-derive status after the amount due changed, returning any overpaid excess
    pub(crate) fn reconcile(&mut self) -> Money {
        if self.amount_paid >= self.installment {
            let excess = self.amount_paid - self.installment;
            self.amount_paid = self.installment;
            self.status = InstallmentStatus::Paid;
            excess
        } else {
            Money::ZERO
        }
    }
}

/// ordered installments owned by a single loan
///
/// Positions are stable: nothing inserts, removes or reorders rows after
/// generation, so an [`InstallmentIndex`] keeps identifying the same row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepaymentSchedule {
    installments: Vec<Installment>,
}

impl RepaymentSchedule {
    pub fn new(installments: Vec<Installment>) -> Self {
        Self { installments }
    }

    pub fn len(&self) -> usize {
        self.installments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installments.is_empty()
    }

    pub fn get(&self, index: InstallmentIndex) -> Option<&Installment> {
        self.installments.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: InstallmentIndex) -> Option<&mut Installment> {
        self.installments.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Installment> {
        self.installments.iter()
    }

    pub fn installments(&self) -> &[Installment] {
        &self.installments
    }

    /// positions in due-date order, ties keep their stored order
    pub fn allocation_order(&self) -> Vec<InstallmentIndex> {
        let mut order: Vec<InstallmentIndex> = (0..self.installments.len()).collect();
        order.sort_by_key(|&i| self.installments[i].due_date);
        order
    }

    /// pending positions in due-date order
    pub fn pending_indices(&self) -> Vec<InstallmentIndex> {
        self.allocation_order()
            .into_iter()
            .filter(|&i| self.installments[i].is_pending())
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.installments.iter().filter(|i| i.is_pending()).count()
    }

    pub fn paid_count(&self) -> usize {
        self.installments.iter().filter(|i| i.is_paid()).count()
    }

    pub fn is_fully_paid(&self) -> bool {
        !self.is_empty() && self.installments.iter().all(|i| i.is_paid())
    }

    pub fn total_principal(&self) -> Money {
        self.installments.iter().map(|i| i.amount).sum()
    }

    pub fn total_interest(&self) -> Money {
        self.installments.iter().map(|i| i.interest).sum()
    }

    pub fn total_repayable(&self) -> Money {
        self.installments.iter().map(|i| i.installment).sum()
    }

    pub fn total_paid(&self) -> Money {
        self.installments.iter().map(|i| i.amount_paid).sum()
    }

    /// sum of amounts still due across pending installments
    pub fn outstanding(&self) -> Money {
        self.installments
            .iter()
            .filter(|i| i.is_pending())
            .map(|i| i.amount_due())
            .sum()
    }

    /// oldest pending installment
    pub fn next_due(&self) -> Option<&Installment> {
        self.pending_indices()
            .first()
            .map(|&i| &self.installments[i])
    }

    /// check the per-row bookkeeping invariants
    pub fn validate(&self) -> Result<()> {
        for (index, row) in self.installments.iter().enumerate() {
            if row.installment.is_negative()
                || row.amount.is_negative()
                || row.interest.is_negative()
            {
                return Err(LedgerError::MalformedSchedule {
                    message: format!("installment {} has a negative amount", index),
                });
            }
            if row.remaining_balance.is_negative() {
                return Err(LedgerError::MalformedSchedule {
                    message: format!("installment {} has a negative remaining balance", index),
                });
            }
            if row.amount_paid.is_negative() || row.amount_paid > row.installment {
                return Err(LedgerError::MalformedSchedule {
                    message: format!(
                        "installment {} has amount paid {} outside 0..={}",
                        index, row.amount_paid, row.installment
                    ),
                });
            }
            if row.is_paid() && row.amount_paid != row.installment {
                return Err(LedgerError::MalformedSchedule {
                    message: format!("installment {} is marked paid but not settled", index),
                });
            }
        }
        Ok(())
    }
}
