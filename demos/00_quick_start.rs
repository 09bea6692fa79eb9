/// quick start - quote, generate and pay down a schedule
use loan_ledger::{allocate, generate, quote, Loan, LoanStatus, Money, Rate, Uuid};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let principal = Money::from_major(1_200);
    let rate = Rate::from_percentage(dec!(12));

    // headline figures before committing
    let q = quote(principal, 12, rate)?;
    println!(
        "monthly: {}  total: {}  interest: {}",
        q.monthly_payment, q.total_repayment, q.total_interest
    );

    // build an approved loan by hand
    let mut loan = Loan::new(Uuid::new_v4(), principal, 12);
    loan.status = LoanStatus::Approved;
    loan.interest_rate = Some(rate);
    loan.schedule = generate(principal, 12, rate)?;

    for row in loan.schedule.iter() {
        println!(
            "{}  {:>8}  principal {:>8}  interest {:>6}  balance {:>8}",
            row.due_date, row.installment, row.amount, row.interest, row.remaining_balance
        );
    }

    // two and a half installments
    let loan = allocate(loan, Money::from_decimal(dec!(266.55)))?;

    println!("{}", loan.json());

    Ok(())
}
