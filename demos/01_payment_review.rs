/// payment review - request, approve, submit and review payments with controlled time
use chrono::{Duration, TimeZone, Utc};
use loan_ledger::{
    EventStore, InterestSettings, LedgerConfig, Loan, Money, Payment, SafeTimeProvider, TimeSource,
    Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== payment review example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();
    let mut events = EventStore::new();
    let mut settings = InterestSettings::new(&LedgerConfig::default());

    let borrower = Uuid::new_v4();
    let mut loan = Loan::request(borrower, Money::from_major(5_000), 6, &time, &mut events)?;
    println!("requested on {}", time.now().format("%Y-%m-%d"));

    // approval a few days later anchors the schedule
    controller.advance(Duration::days(3));
    loan.approve(&mut settings, &time, &mut events)?;
    println!("approved at {} on {}", settings.current_rate(), time.now().format("%Y-%m-%d"));
    println!("first due: {:?}", loan.next_due_date());

    // first payment goes through
    controller.advance(Duration::days(30));
    let installment = loan.schedule.get(0).map(|i| i.installment).unwrap_or(Money::ZERO);
    let mut first =
        Payment::submit(&loan, borrower, installment, "transfer-0001", &time, &mut events)?;
    let allocation = first.approve(&mut loan, &time, &mut events)?;
    println!("\npayment 1 settled {} installment(s)", allocation.settled_installments().count());

    // second one is rejected, loan untouched
    let amount = Money::from_major(900);
    let mut second =
        Payment::submit(&loan, borrower, amount, "blurry-photo", &time, &mut events)?;
    second.reject(&time, &mut events)?;
    println!("payment 2: {:?}", second.status);

    // pay off the rest with some left over
    let rest = loan.outstanding_balance() + Money::from_major(25);
    let mut last = Payment::submit(&loan, borrower, rest, "transfer-0002", &time, &mut events)?;
    last.approve(&mut loan, &time, &mut events)?;
    println!("loan status: {:?}, advance credit: {}", loan.status, loan.advance_credit.signed());

    println!("\n{} events recorded", events.len());
    for event in events.take_events() {
        println!("  {:?}", event);
    }

    Ok(())
}
