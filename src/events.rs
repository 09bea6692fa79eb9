use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{BorrowerId, InstallmentIndex, LoanId, PaymentId};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // loan lifecycle events
    LoanRequested {
        loan_id: LoanId,
        borrower_id: BorrowerId,
        principal: Money,
        term_months: u32,
        timestamp: DateTime<Utc>,
    },
    LoanApproved {
        loan_id: LoanId,
        interest_rate: Rate,
        installments: usize,
        first_due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    LoanRejected {
        loan_id: LoanId,
        timestamp: DateTime<Utc>,
    },
    LoanPaidOff {
        loan_id: LoanId,
        advance_credit: Money,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentSubmitted {
        payment_id: PaymentId,
        loan_id: LoanId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentAllocated {
        payment_id: PaymentId,
        loan_id: LoanId,
        amount: Money,
        shortfall_cleared: Money,
        applied_to_installments: Money,
        advance_credit_added: Money,
        timestamp: DateTime<Utc>,
    },
    InstallmentPaid {
        loan_id: LoanId,
        index: InstallmentIndex,
        due_date: NaiveDate,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentRejected {
        payment_id: PaymentId,
        loan_id: LoanId,
        timestamp: DateTime<Utc>,
    },

    // rate events
    InterestRateChanged {
        old_rate: Rate,
        new_rate: Rate,
        timestamp: DateTime<Utc>,
    },
    LoanRecalculated {
        loan_id: LoanId,
        old_rate: Option<Rate>,
        new_rate: Rate,
        new_installment: Money,
        pending_installments: usize,
        credit_released: Money,
        timestamp: DateTime<Utc>,
    },
    RecalculationSkipped {
        loan_id: LoanId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    RecalculationFailed {
        loan_id: LoanId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
