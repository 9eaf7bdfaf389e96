//! Statistics service

use chrono::Utc;
use sqlx::Row;

use crate::{
    api::stats::{BookStats, LoanStats, StatEntry, StatsResponse, UserStats},
    error::AppResult,
    repository::{books::LedgerDiscrepancy, Repository},
};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Dashboard counts for books, categories, users and loans
    pub async fn get_stats(&self) -> AppResult<StatsResponse> {
        let pool = &self.repository.pool;

        let book_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS titles,
                   COALESCE(SUM(total_copies), 0)::bigint AS total_copies,
                   COALESCE(SUM(available_copies), 0)::bigint AS available_copies
            FROM books
            "#,
        )
        .fetch_one(pool)
        .await?;

        let categories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(pool)
            .await?;

        let account_rows = sqlx::query(
            "SELECT account_type, COUNT(*) AS count FROM users GROUP BY account_type ORDER BY account_type",
        )
        .fetch_all(pool)
        .await?;

        let by_account_type: Vec<StatEntry> = account_rows
            .iter()
            .map(|r| StatEntry {
                label: r.get("account_type"),
                value: r.get("count"),
            })
            .collect();

        let today = Utc::now().date_naive();
        let loan_row = sqlx::query(
            r#"
            SELECT COUNT(*) FILTER (WHERE return_date IS NULL) AS open,
                   COUNT(*) FILTER (WHERE return_date IS NOT NULL) AS closed,
                   COUNT(*) FILTER (WHERE return_date = $1) AS returned_today,
                   COUNT(*) FILTER (WHERE loan_date = $1) AS opened_today
            FROM loans
            "#,
        )
        .bind(today)
        .fetch_one(pool)
        .await?;

        Ok(StatsResponse {
            books: BookStats {
                titles: book_row.get("titles"),
                total_copies: book_row.get("total_copies"),
                available_copies: book_row.get("available_copies"),
                categories,
            },
            users: UserStats {
                total: by_account_type.iter().map(|e| e.value).sum(),
                by_account_type,
            },
            loans: LoanStats {
                open: loan_row.get("open"),
                closed: loan_row.get("closed"),
                opened_today: loan_row.get("opened_today"),
                returned_today: loan_row.get("returned_today"),
            },
        })
    }

    /// Audit the loan ledger invariant across all books
    pub async fn ledger_consistency(&self) -> AppResult<Vec<LedgerDiscrepancy>> {
        let discrepancies = self.repository.books.ledger_discrepancies().await?;
        if !discrepancies.is_empty() {
            tracing::error!(books = discrepancies.len(), "Loan ledger discrepancies found");
        }
        Ok(discrepancies)
    }
}
