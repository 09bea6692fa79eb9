use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::loan::Loan;
use crate::types::{InstallmentIndex, LoanStatus};

/// money applied to a single installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentCredit {
    pub index: InstallmentIndex,
    pub due_date: NaiveDate,
    pub amount: Money,
    /// whether this credit settled the installment
    pub settled: bool,
}

/// breakdown of how one payment was spread over a loan
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Allocation {
    pub payment_amount: Money,
    pub shortfall_cleared: Money,
    pub applied: Vec<InstallmentCredit>,
    pub advance_credit_added: Money,
}

impl Allocation {
    pub fn applied_to_installments(&self) -> Money {
        self.applied.iter().map(|c| c.amount).sum()
    }

    pub fn settled_installments(&self) -> impl Iterator<Item = &InstallmentCredit> {
        self.applied.iter().filter(|c| c.settled)
    }

    pub fn total_allocated(&self) -> Money {
        self.shortfall_cleared + self.applied_to_installments() + self.advance_credit_added
    }
}

/// check that a payment can be applied to the loan
pub fn validate_allocation(loan: &Loan, amount: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidPaymentAmount { amount });
    }
    if loan.status != LoanStatus::Approved {
        return Err(LedgerError::LoanNotApproved { status: loan.status });
    }
    if loan.schedule.is_empty() {
        return Err(LedgerError::EmptySchedule);
    }
    loan.schedule.validate()
}

/// apply a payment to the loan: shortfall first, then installments oldest due first, then credit
///
/// Nothing is mutated when validation fails.
pub fn apply_payment(loan: &mut Loan, amount: Money) -> Result<Allocation> {
    validate_allocation(loan, amount)?;

    let mut remaining = amount;
    let mut allocation = Allocation {
        payment_amount: amount,
        ..Allocation::default()
    };

    // a carried shortfall is cleared before any installment
    let cleared = loan.advance_credit.clear_shortfall(remaining);
    remaining -= cleared;
    allocation.shortfall_cleared = cleared;

    for index in loan.schedule.allocation_order() {
        if remaining.is_zero() {
            break;
        }

        let Some(installment) = loan.schedule.get_mut(index) else {
            continue;
        };
        if !installment.is_pending() {
            continue;
        }

        let due = installment.amount_due();
        if remaining >= due {
            let settled_with = installment.settle();
            remaining -= settled_with;
            allocation.applied.push(InstallmentCredit {
                index,
                due_date: installment.due_date,
                amount: settled_with,
                settled: true,
            });
        } else {
            installment.apply_partial(remaining);
            allocation.applied.push(InstallmentCredit {
                index,
                due_date: installment.due_date,
                amount: remaining,
                settled: false,
            });
            remaining = Money::ZERO;
            // a partial payment stops allocation
            break;
        }
    }

    debug_assert!(!remaining.is_negative());

    if remaining.is_positive() {
        loan.advance_credit.deposit(remaining);
        allocation.advance_credit_added = remaining;
    }

    Ok(allocation)
}
