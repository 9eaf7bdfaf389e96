//! Loans repository: the loan ledger and loan listings.
//!
//! `open` and `close` each run inside one transaction. The counter on
//! `books.available_copies` is only ever changed by a single conditional
//! UPDATE, so concurrent callers serialize on the book row lock and the
//! loser re-evaluates the predicate against the committed value.
//! A transaction dropped before `commit` is rolled back, which covers every
//! early return below.

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult, LedgerError},
    models::{
        loan::{Loan, LoanDetails, LoanDetailsRow, LoanId, LoanQuery, LoanStatusFilter},
        user::AccountType,
    },
};

const DETAILS_SELECT: &str = r#"
    SELECT l.id, l.book_id, b.title AS book_title, b.author AS book_author,
           l.user_id, u.login AS user_login,
           u.firstname AS user_firstname, u.lastname AS user_lastname,
           l.loan_date, l.return_date
    FROM loans l
    JOIN books b ON b.id = l.book_id
    JOIN users u ON u.id = l.user_id
"#;

const LIST_FILTER: &str = r#"
    WHERE ($1::text = 'all'
           OR ($1 = 'open' AND l.return_date IS NULL)
           OR ($1 = 'closed' AND l.return_date IS NOT NULL))
      AND ($2::int IS NULL OR l.user_id = $2)
      AND ($3::int IS NULL OR l.book_id = $3)
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Open a loan: take one copy of the book and record the loan, atomically.
    /// The borrower must exist and hold a borrower account.
    pub async fn open(
        &self,
        borrower_id: i32,
        book_id: i32,
        today: NaiveDate,
    ) -> Result<LoanId, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let account_type: Option<AccountType> =
            sqlx::query_scalar("SELECT account_type FROM users WHERE id = $1")
                .bind(borrower_id)
                .fetch_optional(&mut *tx)
                .await?;

        match account_type {
            None => return Err(LedgerError::NotFound(format!("Borrower {}", borrower_id))),
            Some(AccountType::Borrower) => {}
            Some(other) => return Err(LedgerError::Ineligible(other.to_string())),
        }

        let taken = sqlx::query(
            r#"
            UPDATE books
            SET available_copies = available_copies - 1
            WHERE id = $1 AND available_copies > 0
            "#,
        )
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        if taken.rows_affected() == 0 {
            let book_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
                    .bind(book_id)
                    .fetch_one(&mut *tx)
                    .await?;

            return Err(if book_exists {
                LedgerError::Unavailable
            } else {
                LedgerError::NotFound(format!("Book {}", book_id))
            });
        }

        let loan_id = sqlx::query_scalar::<_, LoanId>(
            r#"
            INSERT INTO loans (book_id, user_id, loan_date)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(book_id)
        .bind(borrower_id)
        .bind(today)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(loan_id)
    }

    /// Close an open loan and give its copy back, atomically.
    /// Returns the ID of the book the copy went back to.
    pub async fn close(&self, loan_id: LoanId, today: NaiveDate) -> Result<i32, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let book_id: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE loans
            SET return_date = $1
            WHERE id = $2 AND return_date IS NULL
            RETURNING book_id
            "#,
        )
        .bind(today)
        .bind(loan_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(book_id) = book_id else {
            let loan_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE id = $1)")
                    .bind(loan_id)
                    .fetch_one(&mut *tx)
                    .await?;

            return Err(if loan_exists {
                LedgerError::AlreadyClosed
            } else {
                LedgerError::NotFound(format!("Loan {}", loan_id))
            });
        };

        // The CHECK constraint on books aborts the transaction if this would
        // exceed total_copies.
        let returned = sqlx::query(
            "UPDATE books SET available_copies = available_copies + 1 WHERE id = $1",
        )
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        if returned.rows_affected() == 0 {
            return Err(LedgerError::NotFound(format!("Book {}", book_id)));
        }

        tx.commit().await?;

        Ok(book_id)
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: LoanId) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Get loan with book and borrower details
    pub async fn get_details(&self, id: LoanId) -> AppResult<LoanDetails> {
        let query = format!("{} WHERE l.id = $1", DETAILS_SELECT);
        sqlx::query_as::<_, LoanDetailsRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LoanDetails::from)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// List loans, newest first
    pub async fn list(
        &self,
        query: &LoanQuery,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<LoanDetails>, i64)> {
        let status = match query.status.unwrap_or_default() {
            LoanStatusFilter::Open => "open",
            LoanStatusFilter::Closed => "closed",
            LoanStatusFilter::All => "all",
        };

        let count_query = format!("SELECT COUNT(*) FROM loans l {}", LIST_FILTER);
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(status)
            .bind(query.user_id)
            .bind(query.book_id)
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            "{} {} ORDER BY l.loan_date DESC, l.id DESC LIMIT $4 OFFSET $5",
            DETAILS_SELECT, LIST_FILTER
        );
        let rows = sqlx::query_as::<_, LoanDetailsRow>(&select_query)
            .bind(status)
            .bind(query.user_id)
            .bind(query.book_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.into_iter().map(LoanDetails::from).collect(), total))
    }

    /// Count loans referencing a user, open or closed
    pub async fn count_for_user(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Count loans referencing a book, open or closed
    pub async fn count_for_book(&self, book_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE book_id = $1")
            .bind(book_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
