use chrono::{Months, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::decimal::{round_money, Money, Rate, MONEY_SCALE};
use crate::errors::{LedgerError, Result};
use crate::schedule::{Installment, RepaymentSchedule};

/// headline figures for a prospective loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentQuote {
    pub monthly_payment: Money,
    pub total_repayment: Money,
    pub total_interest: Money,
}

/// generate a level-payment schedule with the first installment due one month after `start_date`
pub fn generate_schedule(
    principal: Money,
    term_months: u32,
    annual_rate: Rate,
    start_date: NaiveDate,
) -> Result<RepaymentSchedule> {
    validate_terms(principal, term_months, annual_rate)?;

    let emi = calculate_emi(principal, term_months, annual_rate)?;

    // a payment rounded up can retire the balance before the last month and
    // leave empty rows behind, so retry with it rounded down
    for payment in [
        round_money(emi),
        emi.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::ToZero),
    ] {
        let installments = build_rows(principal, term_months, annual_rate, payment, start_date)?;
        if installments.iter().all(|i| i.installment.is_positive()) {
            return Ok(RepaymentSchedule::new(installments));
        }
    }

    Err(LedgerError::InstallmentTooSmall {
        principal,
        term_months,
    })
}

fn build_rows(
    principal: Money,
    term_months: u32,
    annual_rate: Rate,
    payment: Decimal,
    start_date: NaiveDate,
) -> Result<Vec<Installment>> {
    let monthly_rate = annual_rate.monthly_rate();
    let mut installments = Vec::with_capacity(term_months as usize);
    let mut balance = principal.as_decimal();

    for period in 1..=term_months {
        let due_date = add_months(start_date, period)?;
        let interest = round_money(balance * monthly_rate);
        let mut principal_portion = payment - interest;

        // last row absorbs rounding drift so the principal column sums exactly
        if period == term_months || balance < principal_portion {
            principal_portion = balance;
        }
        balance -= principal_portion;

        installments.push(Installment::new(
            due_date,
            Money::from_decimal(principal_portion),
            Money::from_decimal(interest),
            Money::from_decimal(balance.max(Decimal::ZERO)),
        ));
    }

    Ok(installments)
}

/// generate a schedule anchored at the provider's current date
pub fn generate_schedule_now(
    principal: Money,
    term_months: u32,
    annual_rate: Rate,
    time_provider: &SafeTimeProvider,
) -> Result<RepaymentSchedule> {
    let start_date = time_provider.now().date_naive();
    generate_schedule(principal, term_months, annual_rate, start_date)
}

/// unrounded level monthly payment
pub fn calculate_emi(principal: Money, term_months: u32, annual_rate: Rate) -> Result<Decimal> {
    validate_terms(principal, term_months, annual_rate)?;

    let monthly_rate = annual_rate.monthly_rate();

    if monthly_rate.is_zero() {
        return Ok(principal.as_decimal() / Decimal::from(term_months));
    }

    // EMI = P * r * (1 + r)^n / ((1 + r)^n - 1)
    let base = Decimal::ONE + monthly_rate;
    let mut compound = Decimal::ONE;
    for _ in 0..term_months {
        compound = compound.checked_mul(base).ok_or_else(|| overflow("compound factor"))?;
    }

    let numerator = principal
        .as_decimal()
        .checked_mul(monthly_rate)
        .and_then(|v| v.checked_mul(compound))
        .ok_or_else(|| overflow("payment numerator"))?;
    let denominator = compound - Decimal::ONE;

    numerator
        .checked_div(denominator)
        .ok_or_else(|| overflow("payment denominator"))
}

/// monthly payment and totals without building a schedule
pub fn quote(principal: Money, term_months: u32, annual_rate: Rate) -> Result<RepaymentQuote> {
    let emi = calculate_emi(principal, term_months, annual_rate)?;
    let total_repayment = Money::from_decimal(emi * Decimal::from(term_months));

    Ok(RepaymentQuote {
        monthly_payment: Money::from_decimal(emi),
        total_repayment,
        total_interest: total_repayment - principal,
    })
}

fn validate_terms(principal: Money, term_months: u32, annual_rate: Rate) -> Result<()> {
    if !principal.is_positive() {
        return Err(LedgerError::InvalidPrincipal { principal });
    }
    if term_months == 0 {
        return Err(LedgerError::InvalidTerm { term_months });
    }
    if annual_rate.is_negative() {
        return Err(LedgerError::InvalidInterestRate { rate: annual_rate });
    }
    Ok(())
}

fn overflow(what: &str) -> LedgerError {
    LedgerError::CalculationError {
        message: format!("overflow computing {}", what),
    }
}

/// add calendar months, clamping to the end of shorter months
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| LedgerError::InvalidDate {
            message: format!("{} plus {} months is out of range", date, months),
        })
}
