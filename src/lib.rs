pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod interest;
pub mod loan;
pub mod payments;
pub mod schedule;
pub mod types;
pub mod views;

// re-export key types
pub use config::LedgerConfig;
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use interest::{
    GlobalSettings, InterestSettings, LoanRecalculation, RateRecalculator, RecalculationMode,
    RecalculationOutcome, RecalculationReport, SkipReason,
};
pub use loan::Loan;
pub use payments::{
    apply_payment, calculate_emi, generate_schedule, generate_schedule_now, quote, Allocation,
    InstallmentCredit, Payment, RepaymentQuote,
};
pub use schedule::{Installment, RepaymentSchedule};
pub use types::{
    AdvanceCredit, BorrowerId, InstallmentIndex, InstallmentStatus, LoanId, LoanStatus, PaymentId,
    PaymentStatus,
};
pub use views::{LoanView, PortfolioStats, StatusTotals};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;

/// generate a schedule whose first installment falls one month from today
pub fn generate(
    principal: Money,
    term_months: u32,
    annual_rate: Rate,
) -> Result<RepaymentSchedule> {
    let time_provider = SafeTimeProvider::new(TimeSource::System);
    generate_schedule_now(principal, term_months, annual_rate, &time_provider)
}

/// allocate a payment against an approved loan and hand back the updated loan
pub fn allocate(mut loan: Loan, amount: Money) -> Result<Loan> {
    apply_payment(&mut loan, amount)?;
    Ok(loan)
}

/// reprice the pending installments of every approved loan
///
/// Every loan comes back in input order. Loans that are not approved pass through
/// untouched; approved ones with nothing pending or a malformed schedule are also
/// returned unchanged and recorded in the report.
pub fn recalculate(new_rate: Rate, mut loans: Vec<Loan>) -> (Vec<Loan>, RecalculationReport) {
    let recalculator = RateRecalculator::default();
    let active = loans.iter_mut().filter(|l| l.is_active());
    let report = recalculator.recalculate(new_rate, active);
    (loans, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn approved(principal: i64, term: u32, rate: Rate) -> Loan {
        let mut loan = Loan::new(Uuid::new_v4(), Money::from_major(principal), term);
        loan.status = LoanStatus::Approved;
        loan.interest_rate = Some(rate);
        loan.schedule = generate(Money::from_major(principal), term, rate).unwrap();
        loan
    }

    #[test]
    fn test_generate_uses_today() {
        let schedule =
            generate(Money::from_major(1200), 12, Rate::from_percentage(dec!(12))).unwrap();
        let today = chrono::Utc::now().date_naive();

        assert_eq!(schedule.len(), 12);
        assert!(schedule.get(0).unwrap().due_date > today);
        assert_eq!(schedule.total_principal(), Money::from_major(1200));
    }

    #[test]
    fn test_allocate_returns_updated_loan() {
        let loan = approved(1000, 10, Rate::ZERO);

        let loan = allocate(loan, Money::from_major(250)).unwrap();

        assert_eq!(loan.schedule.paid_count(), 2);
        assert_eq!(loan.schedule.get(2).unwrap().amount_paid, Money::from_major(50));
    }

    #[test]
    fn test_allocate_rejects_pending_loan() {
        let loan = Loan::new(Uuid::new_v4(), Money::from_major(1000), 10);
        assert!(matches!(
            allocate(loan, Money::from_major(10)),
            Err(LedgerError::LoanNotApproved { .. })
        ));
    }

    #[test]
    fn test_recalculate_returns_every_loan() {
        let active = approved(1200, 12, Rate::from_percentage(dec!(12)));
        let mut settled = approved(300, 3, Rate::ZERO);
        apply_payment(&mut settled, Money::from_major(300)).unwrap();
        let mut broken = approved(600, 6, Rate::from_percentage(dec!(12)));
        broken.schedule = RepaymentSchedule::default();
        let pending = Loan::new(Uuid::new_v4(), Money::from_major(900), 9);

        let input = vec![active.clone(), settled.clone(), broken.clone(), pending.clone()];
        let (loans, report) = recalculate(Rate::from_percentage(dec!(6)), input);

        assert_eq!(loans.len(), 4);
        assert_eq!(loans[0].id, active.id);
        assert_eq!(loans[0].interest_rate, Some(Rate::from_percentage(dec!(6))));
        // skipped, failed and non-approved loans are handed back as they were
        assert_eq!(loans[1], settled);
        assert_eq!(loans[2], broken);
        assert_eq!(loans[3], pending);

        assert_eq!(report.updated_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(*failed[0].0, broken.id);
        assert!(matches!(failed[0].1, LedgerError::EmptySchedule));
    }
}
