use thiserror::Error;
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::types::{LoanStatus, PaymentStatus};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid principal: {principal}")]
    InvalidPrincipal {
        principal: Money,
    },

    #[error("invalid term: {term_months} months")]
    InvalidTerm {
        term_months: u32,
    },

    #[error("invalid interest rate: {rate}")]
    InvalidInterestRate {
        rate: Rate,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("payment receipt is required")]
    MissingReceipt,

    #[error("loan not approved: current status is {status:?}")]
    LoanNotApproved {
        status: LoanStatus,
    },

    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidStatusTransition {
        from: LoanStatus,
        to: LoanStatus,
    },

    #[error("loan has no repayment schedule")]
    EmptySchedule,

    #[error("malformed schedule: {message}")]
    MalformedSchedule {
        message: String,
    },

    #[error("payment already reviewed: current status is {status:?}")]
    PaymentAlreadyReviewed {
        status: PaymentStatus,
    },

    #[error("payment {payment_id} belongs to loan {expected}, not {actual}")]
    PaymentLoanMismatch {
        payment_id: Uuid,
        expected: Uuid,
        actual: Uuid,
    },

    #[error("borrower {borrower_id} does not own loan {loan_id}")]
    BorrowerMismatch {
        borrower_id: Uuid,
        loan_id: Uuid,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("principal {principal} is too small to spread over {term_months} months")]
    InstallmentTooSmall {
        principal: Money,
        term_months: u32,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
