use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::LedgerConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::loan::Loan;
use crate::types::{InstallmentIndex, LoanId, LoanStatus};

/// how pending installments are rewritten when the rate changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecalculationMode {
    /// overwrite only the amount due and the principal portion
    PaymentOnly,
    /// also rewrite interest and remaining balance so every row stays consistent
    #[default]
    FullRow,
}

/// what happened to one loan during a rate change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecalculation {
    pub loan_id: LoanId,
    pub old_rate: Option<Rate>,
    pub new_rate: Rate,
    pub monthly_principal: Money,
    pub monthly_interest: Money,
    pub new_installment: Money,
    pub pending_installments: usize,
    /// partially paid rows the new amount due already covers
    pub settled_by_repricing: Vec<InstallmentIndex>,
    /// excess moved from those rows into advance credit
    pub credit_released: Money,
    /// repricing settled the last pending row and closed the loan
    pub paid_off: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    NoPendingInstallments,
}

#[derive(Debug)]
pub enum RecalculationOutcome {
    Updated(LoanRecalculation),
    Skipped(SkipReason),
    Failed(LedgerError),
}

/// per-loan results of a bulk recalculation, in input order
#[derive(Debug)]
pub struct RecalculationReport {
    pub new_rate: Rate,
    pub outcomes: Vec<(LoanId, RecalculationOutcome)>,
}

impl RecalculationReport {
    pub fn updated(&self) -> impl Iterator<Item = &LoanRecalculation> {
        self.outcomes.iter().filter_map(|(_, outcome)| match outcome {
            RecalculationOutcome::Updated(recalculation) => Some(recalculation),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&LoanId, &SkipReason)> {
        self.outcomes.iter().filter_map(|(id, outcome)| match outcome {
            RecalculationOutcome::Skipped(reason) => Some((id, reason)),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&LoanId, &LedgerError)> {
        self.outcomes.iter().filter_map(|(id, outcome)| match outcome {
            RecalculationOutcome::Failed(error) => Some((id, error)),
            _ => None,
        })
    }

    pub fn updated_count(&self) -> usize {
        self.updated().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }
}

/// rewrites the pending part of approved loans after a rate change
///
/// Monthly principal is `principal / term` and monthly interest is
/// `principal * rate / 12`, both on the original principal. Paid rows are never
/// touched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateRecalculator {
    mode: RecalculationMode,
}

impl RateRecalculator {
    pub fn new(mode: RecalculationMode) -> Self {
        Self { mode }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.recalculation_mode)
    }

    pub fn mode(&self) -> RecalculationMode {
        self.mode
    }

    /// reprice one loan; `Ok(None)` when it has nothing pending
    ///
    /// All checks run before the first write, so an error leaves the loan as it was.
    pub fn recalculate_loan(
        &self,
        new_rate: Rate,
        loan: &mut Loan,
    ) -> Result<Option<LoanRecalculation>> {
        if new_rate.is_negative() {
            return Err(LedgerError::InvalidInterestRate { rate: new_rate });
        }
        if loan.status != LoanStatus::Approved {
            return Err(LedgerError::LoanNotApproved { status: loan.status });
        }
        if loan.term_months == 0 {
            return Err(LedgerError::InvalidTerm { term_months: loan.term_months });
        }
        if loan.schedule.is_empty() {
            return Err(LedgerError::EmptySchedule);
        }
        loan.schedule.validate()?;

        let pending = loan.schedule.pending_indices();
        if pending.is_empty() {
            return Ok(None);
        }

        let principal = loan.principal.as_decimal();
        let monthly_interest = principal * new_rate.as_decimal() / Decimal::from(12);
        let monthly_principal = principal / Decimal::from(loan.term_months);
        let new_installment = Money::from_decimal(monthly_principal + monthly_interest);

        let mut recalculation = LoanRecalculation {
            loan_id: loan.id,
            old_rate: loan.interest_rate,
            new_rate,
            monthly_principal: Money::from_decimal(monthly_principal),
            monthly_interest: Money::from_decimal(monthly_interest),
            new_installment,
            pending_installments: pending.len(),
            settled_by_repricing: Vec::new(),
            credit_released: Money::ZERO,
            paid_off: false,
        };

        match self.mode {
            RecalculationMode::PaymentOnly => {
                for &index in &pending {
                    if let Some(row) = loan.schedule.get_mut(index) {
                        row.installment = new_installment;
                        row.amount = recalculation.monthly_principal;
                    }
                }
            }
            RecalculationMode::FullRow => {
                rewrite_full_rows(loan, &pending, &recalculation);
            }
        }

        // a cut can leave a partial payment covering the new amount due
        for &index in &pending {
            if let Some(row) = loan.schedule.get_mut(index) {
                let excess = row.reconcile();
                if row.is_paid() {
                    recalculation.settled_by_repricing.push(index);
                }
                if excess.is_positive() {
                    recalculation.credit_released += excess;
                }
            }
        }
        if recalculation.credit_released.is_positive() {
            loan.advance_credit.deposit(recalculation.credit_released);
        }

        loan.interest_rate = Some(new_rate);
        recalculation.paid_off = loan.close_if_settled();

        Ok(Some(recalculation))
    }

    /// reprice every loan independently; a failure on one never stops the rest
    pub fn recalculate<'a, I>(&self, new_rate: Rate, loans: I) -> RecalculationReport
    where
        I: IntoIterator<Item = &'a mut Loan>,
    {
        let mut outcomes = Vec::new();

        for loan in loans {
            let outcome = match self.recalculate_loan(new_rate, loan) {
                Ok(Some(recalculation)) => RecalculationOutcome::Updated(recalculation),
                Ok(None) => RecalculationOutcome::Skipped(SkipReason::NoPendingInstallments),
                Err(error) => {
                    warn!(loan_id = %loan.id, error = %error, "loan recalculation failed");
                    RecalculationOutcome::Failed(error)
                }
            };
            outcomes.push((loan.id, outcome));
        }

        let report = RecalculationReport { new_rate, outcomes };
        info!(
            rate = %new_rate,
            updated = report.updated_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            "recalculated active loans"
        );
        report
    }
}

/// rewrite every pending row so installment = amount + interest and balances chain
fn rewrite_full_rows(
    loan: &mut Loan,
    pending: &[InstallmentIndex],
    recalculation: &LoanRecalculation,
) {
    let last_pending = pending.last().copied();
    let mut balance = loan.principal;

    for index in loan.schedule.allocation_order() {
        let Some(row) = loan.schedule.get_mut(index) else {
            continue;
        };

        if row.is_paid() {
            balance = row.remaining_balance;
            continue;
        }

        // the final pending row absorbs whatever principal is left
        let amount = if Some(index) == last_pending || balance < recalculation.monthly_principal {
            balance
        } else {
            recalculation.monthly_principal
        };
        balance -= amount;

        row.amount = amount;
        row.interest = recalculation.monthly_interest;
        row.installment = amount + recalculation.monthly_interest;
        row.remaining_balance = balance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::amortization::generate_schedule;
    use crate::payments::apply_payment;
    use crate::types::AdvanceCredit;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn approved_loan(principal: i64, term: u32, rate_percent: Decimal) -> Loan {
        let rate = Rate::from_percentage(rate_percent);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut loan = Loan::new(Uuid::new_v4(), Money::from_major(principal), term);
        loan.status = LoanStatus::Approved;
        loan.interest_rate = Some(rate);
        loan.schedule =
            generate_schedule(Money::from_major(principal), term, rate, start).unwrap();
        loan
    }

    fn money(d: Decimal) -> Money {
        Money::from_decimal(d)
    }

    #[test]
    fn test_payment_only_rewrites_amount_due_and_principal() {
        let mut loan = approved_loan(1200, 12, dec!(12));
        apply_payment(&mut loan, money(dec!(106.62))).unwrap();
        let paid_row = loan.schedule.get(0).unwrap().clone();
        let old_interest = loan.schedule.get(1).unwrap().interest;
        let old_balance = loan.schedule.get(1).unwrap().remaining_balance;

        let recalculator = RateRecalculator::new(RecalculationMode::PaymentOnly);
        let result = recalculator
            .recalculate_loan(Rate::from_percentage(dec!(6)), &mut loan)
            .unwrap()
            .unwrap();

        assert_eq!(result.new_installment, Money::from_major(106));
        assert_eq!(result.pending_installments, 11);
        assert_eq!(loan.schedule.get(0).unwrap(), &paid_row);

        let second = loan.schedule.get(1).unwrap();
        assert_eq!(second.installment, Money::from_major(106));
        assert_eq!(second.amount, Money::from_major(100));
        // left as generated in this mode
        assert_eq!(second.interest, old_interest);
        assert_eq!(second.remaining_balance, old_balance);
        assert_eq!(loan.interest_rate, Some(Rate::from_percentage(dec!(6))));
    }

    #[test]
    fn test_full_row_keeps_rows_consistent() {
        let mut loan = approved_loan(1200, 12, dec!(12));
        apply_payment(&mut loan, money(dec!(106.62))).unwrap();

        let recalculator = RateRecalculator::new(RecalculationMode::FullRow);
        recalculator
            .recalculate_loan(Rate::from_percentage(dec!(6)), &mut loan)
            .unwrap()
            .unwrap();

        // paid row keeps its original split
        assert_eq!(loan.schedule.get(0).unwrap().amount, money(dec!(94.62)));

        let second = loan.schedule.get(1).unwrap();
        assert_eq!(second.amount, Money::from_major(100));
        assert_eq!(second.interest, Money::from_major(6));
        assert_eq!(second.installment, Money::from_major(106));
        assert_eq!(second.remaining_balance, money(dec!(1005.38)));

        let last = loan.schedule.get(11).unwrap();
        assert_eq!(last.amount, money(dec!(105.38)));
        assert_eq!(last.installment, money(dec!(111.38)));
        assert_eq!(last.remaining_balance, Money::ZERO);

        assert_eq!(loan.schedule.total_principal(), Money::from_major(1200));
        for row in loan.schedule.iter() {
            assert_eq!(row.installment, row.amount + row.interest);
        }
    }

    #[test]
    fn test_partial_payment_preserved_through_increase() {
        let mut loan = approved_loan(1000, 10, dec!(0));
        apply_payment(&mut loan, Money::from_major(60)).unwrap();

        RateRecalculator::default()
            .recalculate_loan(Rate::from_percentage(dec!(12)), &mut loan)
            .unwrap()
            .unwrap();

        let first = loan.schedule.get(0).unwrap();
        assert!(first.is_pending());
        assert_eq!(first.amount_paid, Money::from_major(60));
        assert_eq!(first.installment, Money::from_major(110));
        assert_eq!(first.amount_due(), Money::from_major(50));
    }

    #[test]
    fn test_rate_cut_settles_covered_partial_row() {
        let mut loan = approved_loan(1200, 12, dec!(24));
        apply_payment(&mut loan, Money::from_major(110)).unwrap();
        assert!(loan.schedule.get(0).unwrap().is_pending());

        let result = RateRecalculator::new(RecalculationMode::PaymentOnly)
            .recalculate_loan(Rate::ZERO, &mut loan)
            .unwrap()
            .unwrap();

        let first = loan.schedule.get(0).unwrap();
        assert!(first.is_paid());
        assert_eq!(first.amount_paid, Money::from_major(100));
        assert_eq!(result.settled_by_repricing, vec![0]);
        assert_eq!(result.credit_released, Money::from_major(10));
        assert!(!result.paid_off);
        assert_eq!(loan.status, LoanStatus::Approved);
        assert_eq!(loan.advance_credit, AdvanceCredit::Credit(Money::from_major(10)));
        // money in equals money on the books
        assert_eq!(
            loan.schedule.total_paid() + loan.advance_credit.signed(),
            Money::from_major(110)
        );
    }

    #[test]
    fn test_rate_cut_settling_last_row_closes_loan() {
        let mut loan = approved_loan(300, 3, dec!(24));
        // two full rows of 104.03 and 101 against the last one
        apply_payment(&mut loan, money(dec!(309.06))).unwrap();
        assert_eq!(loan.schedule.pending_count(), 1);

        let result = RateRecalculator::new(RecalculationMode::PaymentOnly)
            .recalculate_loan(Rate::ZERO, &mut loan)
            .unwrap()
            .unwrap();

        assert!(result.paid_off);
        assert_eq!(result.settled_by_repricing, vec![2]);
        assert!(loan.schedule.is_fully_paid());
        assert_eq!(loan.status, LoanStatus::Paid);
        assert!(!loan.is_active());
        assert_eq!(loan.advance_credit.credit(), Money::from_major(1));
    }

    #[test]
    fn test_no_pending_installments_is_noop() {
        let mut loan = approved_loan(600, 3, dec!(10));
        let total = loan.schedule.total_repayable();
        apply_payment(&mut loan, total).unwrap();
        let before = loan.clone();

        let result = RateRecalculator::default()
            .recalculate_loan(Rate::from_percentage(dec!(20)), &mut loan)
            .unwrap();

        assert!(result.is_none());
        assert_eq!(loan, before);
    }

    #[test]
    fn test_failures_are_isolated() {
        let healthy = approved_loan(1200, 12, dec!(12));
        let mut broken = approved_loan(1200, 12, dec!(12));
        broken.schedule.get_mut(3).unwrap().amount_paid = Money::from_major(5_000);
        let broken_before = broken.clone();
        let pending = Loan::new(Uuid::new_v4(), Money::from_major(100), 2);
        let mut settled = approved_loan(300, 3, dec!(0));
        apply_payment(&mut settled, Money::from_major(300)).unwrap();

        let mut loans = vec![broken, healthy, pending, settled];

        let report =
            RateRecalculator::default().recalculate(Rate::from_percentage(dec!(6)), &mut loans);

        assert_eq!(report.updated_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.failed_count(), 2);
        assert!(matches!(
            report.outcomes[0].1,
            RecalculationOutcome::Failed(LedgerError::MalformedSchedule { .. })
        ));
        assert!(matches!(
            report.outcomes[2].1,
            RecalculationOutcome::Failed(LedgerError::LoanNotApproved { .. })
        ));

        assert_eq!(loans[0], broken_before);
        assert_eq!(loans[1].schedule.get(0).unwrap().installment, Money::from_major(106));
    }

    #[test]
    fn test_negative_rate_rejected() {
        let mut loan = approved_loan(1200, 12, dec!(12));
        let before = loan.clone();

        let negative = Rate::from_percentage(dec!(-2));
        let result = RateRecalculator::default().recalculate_loan(negative, &mut loan);
        assert!(matches!(result, Err(LedgerError::InvalidInterestRate { .. })));
        assert_eq!(loan, before);
    }
}
