use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::interest::InterestSettings;
use crate::payments::amortization::generate_schedule_now;
use crate::schedule::RepaymentSchedule;
use crate::types::{AdvanceCredit, BorrowerId, LoanId, LoanStatus};
use crate::views::LoanView;

/// a loan and the schedule it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub borrower_id: BorrowerId,
    pub principal: Money,
    pub term_months: u32,
    /// snapshotted at approval, absent before
    pub interest_rate: Option<Rate>,
    pub status: LoanStatus,
    #[serde(default)]
    pub schedule: RepaymentSchedule,
    #[serde(default)]
    pub advance_credit: AdvanceCredit,
    pub requested_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl Loan {
    /// bare pending loan record, no validation
    pub fn new(borrower_id: BorrowerId, principal: Money, term_months: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            borrower_id,
            principal,
            term_months,
            interest_rate: None,
            status: LoanStatus::Pending,
            schedule: RepaymentSchedule::default(),
            advance_credit: AdvanceCredit::None,
            requested_at: None,
            approved_at: None,
        }
    }

    /// validate and record a loan request
    pub fn request(
        borrower_id: BorrowerId,
        principal: Money,
        term_months: u32,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Self> {
        if !principal.is_positive() {
            return Err(LedgerError::InvalidPrincipal { principal });
        }
        if term_months == 0 {
            return Err(LedgerError::InvalidTerm { term_months });
        }

        let now = time_provider.now();
        let mut loan = Self::new(borrower_id, principal, term_months);
        loan.requested_at = Some(now);

        events.emit(Event::LoanRequested {
            loan_id: loan.id,
            borrower_id,
            principal,
            term_months,
            timestamp: now,
        });

        Ok(loan)
    }

    /// approve: snapshot the global rate and generate the schedule from today
    ///
    /// Approving an approved loan is a no-op.
    pub fn approve(
        &mut self,
        settings: &mut InterestSettings,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        if self.status == LoanStatus::Approved {
            return Ok(());
        }
        self.ensure_pending(LoanStatus::Approved)?;

        let rate = settings.current_rate();
        let schedule =
            generate_schedule_now(self.principal, self.term_months, rate, time_provider)?;
        let first_due_date = schedule
            .get(0)
            .map(|i| i.due_date)
            .ok_or(LedgerError::EmptySchedule)?;
        let now = time_provider.now();

        self.interest_rate = Some(rate);
        self.schedule = schedule;
        self.status = LoanStatus::Approved;
        self.approved_at = Some(now);

        events.emit(Event::LoanApproved {
            loan_id: self.id,
            interest_rate: rate,
            installments: self.schedule.len(),
            first_due_date,
            timestamp: now,
        });
        debug!(loan_id = %self.id, rate = %rate, "loan approved");

        Ok(())
    }

    /// reject a pending loan; rejecting a rejected loan is a no-op
    pub fn reject(
        &mut self,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        if self.status == LoanStatus::Rejected {
            return Ok(());
        }
        self.ensure_pending(LoanStatus::Rejected)?;

        self.status = LoanStatus::Rejected;
        events.emit(Event::LoanRejected {
            loan_id: self.id,
            timestamp: time_provider.now(),
        });

        Ok(())
    }

    /// close out an approved loan whose schedule is fully settled
    pub(crate) fn mark_paid(
        &mut self,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        if !self.close_if_settled() {
            return Err(LedgerError::InvalidStatusTransition {
                from: self.status,
                to: LoanStatus::Paid,
            });
        }

        events.emit(Event::LoanPaidOff {
            loan_id: self.id,
            advance_credit: self.advance_credit.signed(),
            timestamp: time_provider.now(),
        });

        Ok(())
    }

    /// move an approved loan with nothing left to pay to paid
    pub(crate) fn close_if_settled(&mut self) -> bool {
        if self.status != LoanStatus::Approved || !self.schedule.is_fully_paid() {
            return false;
        }
        self.status = LoanStatus::Paid;
        true
    }

    fn ensure_pending(&self, to: LoanStatus) -> Result<()> {
        if self.status != LoanStatus::Pending {
            return Err(LedgerError::InvalidStatusTransition {
                from: self.status,
                to,
            });
        }
        Ok(())
    }

    /// approved and therefore subject to allocation and repricing
    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Approved
    }

    pub fn outstanding_balance(&self) -> Money {
        self.schedule.outstanding()
    }

    pub fn next_due_date(&self) -> Option<NaiveDate> {
        self.schedule.next_due().map(|i| i.due_date)
    }

    /// get json representation of current state
    pub fn to_json_pretty(&self) -> String {
        let view = LoanView::from_loan(self);
        serde_json::to_string_pretty(&view).unwrap_or_else(|e| format!("JSON error: {}", e))
    }

    /// short alias for json output
    pub fn json(&self) -> String {
        self.to_json_pretty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use chrono::{Duration, TimeZone};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    fn time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn test_request_validation() {
        let time = time();
        let mut events = EventStore::new();
        let borrower = Uuid::new_v4();

        assert!(matches!(
            Loan::request(borrower, Money::ZERO, 12, &time, &mut events),
            Err(LedgerError::InvalidPrincipal { .. })
        ));
        assert!(matches!(
            Loan::request(borrower, Money::from_major(500), 0, &time, &mut events),
            Err(LedgerError::InvalidTerm { .. })
        ));
        assert!(events.is_empty());

        let loan = Loan::request(borrower, Money::from_major(500), 6, &time, &mut events).unwrap();
        assert_eq!(loan.status, LoanStatus::Pending);
        assert_eq!(loan.interest_rate, None);
        assert!(loan.schedule.is_empty());
        assert_eq!(loan.requested_at, Some(time.now()));
    }

    #[test]
    fn test_approval_snapshots_rate_and_anchors_schedule() {
        let time = time();
        let mut events = EventStore::new();
        let mut settings = InterestSettings::new(&LedgerConfig::default());

        let mut loan =
            Loan::request(Uuid::new_v4(), Money::from_major(1200), 12, &time, &mut events).unwrap();

        // approval happens later than the request
        time.test_control().unwrap().advance(Duration::days(10));
        loan.approve(&mut settings, &time, &mut events).unwrap();

        assert_eq!(loan.status, LoanStatus::Approved);
        assert_eq!(loan.interest_rate, Some(Rate::from_percentage(dec!(7))));
        assert_eq!(loan.schedule.len(), 12);
        assert_eq!(
            loan.schedule.get(0).unwrap().due_date,
            NaiveDate::from_ymd_opt(2024, 4, 15).unwrap()
        );
        assert_eq!(loan.approved_at, Some(time.now()));
        assert!(matches!(
            events.events().last(),
            Some(Event::LoanApproved { installments: 12, .. })
        ));

        // a later rate change does not touch the snapshot
        settings.set_rate(Rate::from_percentage(dec!(9))).unwrap();
        assert_eq!(loan.interest_rate, Some(Rate::from_percentage(dec!(7))));
    }

    #[test]
    fn test_repeat_approval_is_noop() {
        let time = time();
        let mut events = EventStore::new();
        let mut settings = InterestSettings::new(&LedgerConfig::default());
        let mut loan =
            Loan::request(Uuid::new_v4(), Money::from_major(900), 3, &time, &mut events).unwrap();

        loan.approve(&mut settings, &time, &mut events).unwrap();
        let snapshot = loan.clone();
        let emitted = events.len();

        time.test_control().unwrap().advance(Duration::days(40));
        loan.approve(&mut settings, &time, &mut events).unwrap();

        assert_eq!(loan, snapshot);
        assert_eq!(events.len(), emitted);
    }

    #[test]
    fn test_reject_and_invalid_transitions() {
        let time = time();
        let mut events = EventStore::new();
        let mut settings = InterestSettings::new(&LedgerConfig::default());
        let mut loan =
            Loan::request(Uuid::new_v4(), Money::from_major(900), 3, &time, &mut events).unwrap();

        loan.reject(&time, &mut events).unwrap();
        assert_eq!(loan.status, LoanStatus::Rejected);
        assert!(loan.schedule.is_empty());
        assert!(loan.interest_rate.is_none());

        loan.reject(&time, &mut events).unwrap();
        assert!(matches!(
            loan.approve(&mut settings, &time, &mut events),
            Err(LedgerError::InvalidStatusTransition {
                from: LoanStatus::Rejected,
                to: LoanStatus::Approved,
            })
        ));
    }

    #[test]
    fn test_mark_paid_requires_settled_schedule() {
        let time = time();
        let mut events = EventStore::new();
        let mut settings = InterestSettings::new(&LedgerConfig::default());
        let mut loan =
            Loan::request(Uuid::new_v4(), Money::from_major(900), 3, &time, &mut events).unwrap();
        loan.approve(&mut settings, &time, &mut events).unwrap();

        assert!(loan.mark_paid(&time, &mut events).is_err());
        assert_eq!(loan.status, LoanStatus::Approved);
    }

    #[test]
    fn test_loan_json_view() {
        let time = time();
        let mut events = EventStore::new();
        let mut settings = InterestSettings::new(&LedgerConfig::default());
        let mut loan =
            Loan::request(Uuid::new_v4(), Money::from_major(900), 3, &time, &mut events).unwrap();
        loan.approve(&mut settings, &time, &mut events).unwrap();

        let json: serde_json::Value = serde_json::from_str(&loan.json()).unwrap();
        assert_eq!(json["status"], "approved");
        assert_eq!(json["interest_rate"], "7");
        assert_eq!(json["next_due_date"], "2024-04-05");
    }

    #[test]
    fn test_loan_record_roundtrip() {
        let time = time();
        let mut events = EventStore::new();
        let mut settings = InterestSettings::new(&LedgerConfig::default());
        let mut loan =
            Loan::request(Uuid::new_v4(), Money::from_major(900), 3, &time, &mut events).unwrap();
        loan.approve(&mut settings, &time, &mut events).unwrap();
        loan.advance_credit = AdvanceCredit::Shortfall(Money::from_major(5));

        let json = serde_json::to_string(&loan).unwrap();
        let back: Loan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loan);
    }
}
