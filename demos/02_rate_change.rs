/// rate change - update the global rate and reprice active loans
use chrono::{TimeZone, Utc};
use loan_ledger::{
    EventStore, InterestSettings, LedgerConfig, Loan, Money, Payment, PortfolioStats, Rate,
    RateRecalculator, SafeTimeProvider, TimeSource, Uuid,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== rate change example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    ));
    let mut events = EventStore::new();
    let config = LedgerConfig::from_json(r#"{"default_interest_rate": "12"}"#)?;
    let mut settings = InterestSettings::new(&config);
    let recalculator = RateRecalculator::from_config(&config);

    let mut loans = Vec::new();
    for (principal, term) in [(1_200, 12), (3_000, 24), (800, 4)] {
        let principal = Money::from_major(principal);
        let mut loan = Loan::request(Uuid::new_v4(), principal, term, &time, &mut events)?;
        loan.approve(&mut settings, &time, &mut events)?;
        loans.push(loan);
    }
    // one loan still waiting for review
    loans.push(Loan::request(Uuid::new_v4(), Money::from_major(2_000), 10, &time, &mut events)?);

    // first installment on the first loan
    let borrower = loans[0].borrower_id;
    let amount = loans[0].schedule.get(0).map(|i| i.installment).unwrap_or(Money::ZERO);
    let mut payment =
        Payment::submit(&loans[0], borrower, amount, "transfer-1", &time, &mut events)?;
    payment.approve(&mut loans[0], &time, &mut events)?;

    let report = settings.update_rate(
        Rate::from_percentage(dec!(6)),
        &mut loans,
        &recalculator,
        &time,
        &mut events,
    )?;

    println!("repriced {} loan(s), {} failed", report.updated_count(), report.failed_count());
    for r in report.updated() {
        println!(
            "  {}: new installment {} across {} pending row(s)",
            r.loan_id, r.new_installment, r.pending_installments
        );
    }

    let stats = PortfolioStats::from_loans(&loans);
    println!("\n{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
