use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a payment record
pub type PaymentId = Uuid;

/// unique identifier for a borrower, owned by the identity layer
pub type BorrowerId = Uuid;

/// position of an installment inside its loan's schedule
pub type InstallmentIndex = usize;

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// requested, awaiting review
    Pending,
    /// rate snapshotted, schedule generated
    Approved,
    /// declined, never scheduled
    Rejected,
    /// every installment settled
    Paid,
}

impl LoanStatus {
    /// whether the loan carries a rate and a schedule
    pub fn is_scheduled(&self) -> bool {
        matches!(self, LoanStatus::Approved | LoanStatus::Paid)
    }
}

/// installment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    #[default]
    Pending,
    Paid,
}

/// payment review status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// money held against a loan outside its installments
///
/// Exchanged as a signed decimal: positive is banked credit from overpayment,
/// negative is a shortfall that the next payment must clear first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Money", into = "Money")]
pub enum AdvanceCredit {
    #[default]
    None,
    Credit(Money),
    Shortfall(Money),
}

impl AdvanceCredit {
    /// build from the signed representation
    pub fn from_signed(amount: Money) -> Self {
        if amount.is_positive() {
            AdvanceCredit::Credit(amount)
        } else if amount.is_negative() {
            AdvanceCredit::Shortfall(amount.abs())
        } else {
            AdvanceCredit::None
        }
    }

    /// signed value, negative for a shortfall
    pub fn signed(&self) -> Money {
        match self {
            AdvanceCredit::None => Money::ZERO,
            AdvanceCredit::Credit(amount) => *amount,
            AdvanceCredit::Shortfall(amount) => -*amount,
        }
    }

    pub fn shortfall(&self) -> Money {
        match self {
            AdvanceCredit::Shortfall(amount) => *amount,
            _ => Money::ZERO,
        }
    }

    pub fn credit(&self) -> Money {
        match self {
            AdvanceCredit::Credit(amount) => *amount,
            _ => Money::ZERO,
        }
    }

    /// apply up to `available` against an outstanding shortfall, returning what was used
    pub fn clear_shortfall(&mut self, available: Money) -> Money {
        let cleared = available.min(self.shortfall()).max(Money::ZERO);
        if cleared.is_positive() {
            *self = AdvanceCredit::from_signed(self.signed() + cleared);
        }
        cleared
    }

    /// bank an amount as credit
    pub fn deposit(&mut self, amount: Money) {
        *self = AdvanceCredit::from_signed(self.signed() + amount);
    }
}

impl From<Money> for AdvanceCredit {
    fn from(amount: Money) -> Self {
        AdvanceCredit::from_signed(amount)
    }
}

impl From<AdvanceCredit> for Money {
    fn from(credit: AdvanceCredit) -> Self {
        credit.signed()
    }
}
