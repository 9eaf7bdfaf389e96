//! Loan management service.
//!
//! `open_loan` and `close_loan` are the only ways a book's available copies
//! move with loans. Callers hand in the session claims of the authenticated
//! user; the ledger records them as the acting user but does no role checks.

use chrono::{NaiveDate, Utc};

use crate::{
    config::PaginationConfig,
    error::{AppResult, LedgerError},
    models::{
        loan::{LoanDetails, LoanId, LoanQuery},
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    pagination: PaginationConfig,
}

impl LoansService {
    pub fn new(repository: Repository, pagination: PaginationConfig) -> Self {
        Self { repository, pagination }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Lend one copy of a book to a borrower
    pub async fn open_loan(
        &self,
        session: &UserClaims,
        borrower_id: i32,
        book_id: i32,
    ) -> Result<LoanId, LedgerError> {
        match self.repository.loans.open(borrower_id, book_id, Self::today()).await {
            Ok(loan_id) => {
                tracing::info!(
                    loan_id,
                    book_id,
                    user_id = borrower_id,
                    acting_user = session.user_id,
                    "Loan opened"
                );
                Ok(loan_id)
            }
            Err(err) => {
                tracing::warn!(
                    book_id,
                    user_id = borrower_id,
                    acting_user = session.user_id,
                    error = %err,
                    "Loan refused"
                );
                Err(err)
            }
        }
    }

    /// Record the return of a loaned copy
    pub async fn close_loan(&self, session: &UserClaims, loan_id: LoanId) -> Result<(), LedgerError> {
        match self.repository.loans.close(loan_id, Self::today()).await {
            Ok(book_id) => {
                tracing::info!(loan_id, book_id, acting_user = session.user_id, "Loan closed");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(loan_id, acting_user = session.user_id, error = %err, "Return refused");
                Err(err)
            }
        }
    }

    pub async fn get_loan(&self, loan_id: LoanId) -> AppResult<LoanDetails> {
        self.repository.loans.get_details(loan_id).await
    }

    /// List loans; returns (loans, total, page, per_page)
    pub async fn list_loans(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64, i64, i64)> {
        let (page, per_page, offset) = self.pagination.resolve(query.page, query.per_page);
        let (loans, total) = self.repository.loans.list(query, per_page, offset).await?;
        Ok((loans, total, page, per_page))
    }

    /// Loans of one user (404 if the user does not exist)
    pub async fn get_user_loans(&self, user_id: i32, query: LoanQuery) -> AppResult<(Vec<LoanDetails>, i64, i64, i64)> {
        self.repository.users.get_by_id(user_id).await?;
        let query = LoanQuery {
            user_id: Some(user_id),
            ..query
        };
        self.list_loans(&query).await
    }
}
