pub mod allocation;
pub mod amortization;

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::loan::Loan;
use crate::types::{BorrowerId, LoanId, PaymentId, PaymentStatus};

pub use allocation::{apply_payment, validate_allocation, Allocation, InstallmentCredit};
pub use amortization::{
    calculate_emi, generate_schedule, generate_schedule_now, quote, RepaymentQuote,
};

/// a borrower's request to have money allocated against a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub loan_id: LoanId,
    pub borrower_id: BorrowerId,
    pub amount: Money,
    /// opaque reference to the proof of payment
    pub receipt: String,
    pub status: PaymentStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// record a payment for review
    pub fn submit(
        loan: &Loan,
        borrower_id: BorrowerId,
        amount: Money,
        receipt: impl Into<String>,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Self> {
        let receipt = receipt.into();

        if !amount.is_positive() {
            return Err(LedgerError::InvalidPaymentAmount { amount });
        }
        if receipt.trim().is_empty() {
            return Err(LedgerError::MissingReceipt);
        }
        if loan.borrower_id != borrower_id {
            return Err(LedgerError::BorrowerMismatch {
                borrower_id,
                loan_id: loan.id,
            });
        }

        let now = time_provider.now();
        let payment = Self {
            id: Uuid::new_v4(),
            loan_id: loan.id,
            borrower_id,
            amount,
            receipt,
            status: PaymentStatus::Pending,
            submitted_at: now,
            reviewed_at: None,
        };

        events.emit(Event::PaymentSubmitted {
            payment_id: payment.id,
            loan_id: payment.loan_id,
            amount,
            timestamp: now,
        });

        Ok(payment)
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    /// approve the payment and allocate it against its loan
    ///
    /// The loan moves to paid once every installment is settled. On error neither
    /// the payment nor the loan is changed.
    pub fn approve(
        &mut self,
        loan: &mut Loan,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Allocation> {
        self.ensure_reviewable()?;
        if loan.id != self.loan_id {
            return Err(LedgerError::PaymentLoanMismatch {
                payment_id: self.id,
                expected: self.loan_id,
                actual: loan.id,
            });
        }

        let allocation = apply_payment(loan, self.amount)?;
        let now = time_provider.now();

        self.status = PaymentStatus::Approved;
        self.reviewed_at = Some(now);

        for credit in allocation.settled_installments() {
            events.emit(Event::InstallmentPaid {
                loan_id: loan.id,
                index: credit.index,
                due_date: credit.due_date,
                amount: credit.amount,
                timestamp: now,
            });
        }

        events.emit(Event::PaymentAllocated {
            payment_id: self.id,
            loan_id: loan.id,
            amount: self.amount,
            shortfall_cleared: allocation.shortfall_cleared,
            applied_to_installments: allocation.applied_to_installments(),
            advance_credit_added: allocation.advance_credit_added,
            timestamp: now,
        });

        debug!(
            payment_id = %self.id,
            loan_id = %loan.id,
            amount = %self.amount,
            settled = allocation.settled_installments().count(),
            "payment allocated"
        );

        if loan.schedule.is_fully_paid() {
            loan.mark_paid(time_provider, events)?;
            info!(loan_id = %loan.id, "loan paid off");
        }

        Ok(allocation)
    }

    /// reject the payment; the loan is never touched
    pub fn reject(
        &mut self,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        self.ensure_reviewable()?;

        let now = time_provider.now();
        self.status = PaymentStatus::Rejected;
        self.reviewed_at = Some(now);

        events.emit(Event::PaymentRejected {
            payment_id: self.id,
            loan_id: self.loan_id,
            timestamp: now,
        });

        Ok(())
    }

    fn ensure_reviewable(&self) -> Result<()> {
        if !self.is_pending() {
            return Err(LedgerError::PaymentAlreadyReviewed {
                status: self.status,
            });
        }
        Ok(())
    }
}
