/// serializable views over loans
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::loan::Loan;
use crate::types::{BorrowerId, LoanId, LoanStatus};

/// serializable view of a loan's state
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub borrower_id: BorrowerId,
    pub status: LoanStatus,
    pub principal: Money,
    pub term_months: u32,
    pub interest_rate: Option<Rate>,
    pub requested_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub next_due_date: Option<NaiveDate>,
    pub next_due_amount: Option<Money>,
    pub balances: BalanceView,
    pub installments: InstallmentCountView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceView {
    pub total_interest: Money,
    pub total_repayable: Money,
    pub total_paid: Money,
    pub outstanding_balance: Money,
    /// signed: negative is a shortfall
    pub advance_credit: Money,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InstallmentCountView {
    pub total: usize,
    pub paid: usize,
    pub pending: usize,
}

impl LoanView {
    pub fn from_loan(loan: &Loan) -> Self {
        let schedule = &loan.schedule;
        let next_due = schedule.next_due();

        LoanView {
            id: loan.id,
            borrower_id: loan.borrower_id,
            status: loan.status,
            principal: loan.principal,
            term_months: loan.term_months,
            interest_rate: loan.interest_rate,
            requested_at: loan.requested_at,
            approved_at: loan.approved_at,
            next_due_date: next_due.map(|i| i.due_date),
            next_due_amount: next_due.map(|i| i.amount_due()),
            balances: BalanceView {
                total_interest: schedule.total_interest(),
                total_repayable: schedule.total_repayable(),
                total_paid: schedule.total_paid(),
                outstanding_balance: loan.outstanding_balance(),
                advance_credit: loan.advance_credit.signed(),
            },
            installments: InstallmentCountView {
                total: schedule.len(),
                paid: schedule.paid_count(),
                pending: schedule.pending_count(),
            },
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// count and principal for one loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusTotals {
    pub count: usize,
    pub total_amount: Money,
}

/// loan counts and principal grouped by status
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub by_status: BTreeMap<LoanStatus, StatusTotals>,
    pub total_outstanding: Money,
    pub total_advance_credit: Money,
}

impl PortfolioStats {
    pub fn from_loans<'a>(loans: impl IntoIterator<Item = &'a Loan>) -> Self {
        let mut stats = PortfolioStats::default();

        for loan in loans {
            let totals = stats.by_status.entry(loan.status).or_default();
            totals.count += 1;
            totals.total_amount += loan.principal;

            stats.total_outstanding += loan.outstanding_balance();
            stats.total_advance_credit += loan.advance_credit.signed();
        }

        stats
    }

    pub fn totals(&self, status: LoanStatus) -> StatusTotals {
        self.by_status.get(&status).copied().unwrap_or_default()
    }

    pub fn loan_count(&self) -> usize {
        self.by_status.values().map(|t| t.count).sum()
    }
}
