//! Loan model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

pub type LoanId = i32;

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: LoanId,
    pub book_id: i32,
    pub user_id: i32,
    pub loan_date: NaiveDate,
    /// Absent while the loan is open
    pub return_date: Option<NaiveDate>,
}

impl Loan {
    pub fn status(&self) -> LoanStatus {
        LoanStatus::from_return_date(self.return_date)
    }
}

/// A loan is open until its return date is recorded, then closed for good
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Open,
    Closed,
}

impl LoanStatus {
    pub fn from_return_date(return_date: Option<NaiveDate>) -> Self {
        match return_date {
            Some(_) => LoanStatus::Closed,
            None => LoanStatus::Open,
        }
    }
}

/// Internal row structure for loan listing queries
#[derive(Debug, Clone, FromRow)]
pub struct LoanDetailsRow {
    id: i32,
    book_id: i32,
    book_title: String,
    book_author: String,
    user_id: i32,
    user_login: String,
    user_firstname: Option<String>,
    user_lastname: Option<String>,
    loan_date: NaiveDate,
    return_date: Option<NaiveDate>,
}

impl From<LoanDetailsRow> for LoanDetails {
    fn from(row: LoanDetailsRow) -> Self {
        let borrower_name = match (row.user_firstname, row.user_lastname) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(name), None) | (None, Some(name)) => name,
            (None, None) => row.user_login.clone(),
        };

        LoanDetails {
            id: row.id,
            book_id: row.book_id,
            book_title: row.book_title,
            book_author: row.book_author,
            user_id: row.user_id,
            user_login: row.user_login,
            borrower_name,
            loan_date: row.loan_date,
            return_date: row.return_date,
            status: LoanStatus::from_return_date(row.return_date),
        }
    }
}

/// Loan with book and borrower details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: LoanId,
    pub book_id: i32,
    pub book_title: String,
    pub book_author: String,
    pub user_id: i32,
    pub user_login: String,
    pub borrower_name: String,
    pub loan_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: LoanStatus,
}

/// Status filter for loan listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatusFilter {
    #[default]
    Open,
    Closed,
    All,
}

/// Loan query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    /// open (default), closed or all
    pub status: Option<LoanStatusFilter>,
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Open loan request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoan {
    /// Borrower account ID
    pub user_id: i32,
    pub book_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(firstname: Option<&str>, lastname: Option<&str>, returned: bool) -> LoanDetailsRow {
        let loan_date = NaiveDate::from_ymd_opt(2025, 10, 6).unwrap();
        LoanDetailsRow {
            id: 1,
            book_id: 2,
            book_title: "Pedro Páramo".to_string(),
            book_author: "Juan Rulfo".to_string(),
            user_id: 3,
            user_login: "lgarcia".to_string(),
            user_firstname: firstname.map(String::from),
            user_lastname: lastname.map(String::from),
            loan_date,
            return_date: returned.then(|| loan_date + chrono::Duration::days(14)),
        }
    }

    #[test]
    fn status_follows_return_date() {
        assert_eq!(LoanStatus::from_return_date(None), LoanStatus::Open);
        let closed = NaiveDate::from_ymd_opt(2025, 10, 20);
        assert_eq!(LoanStatus::from_return_date(closed), LoanStatus::Closed);
    }

    #[test]
    fn details_carry_status_and_borrower_name() {
        let open: LoanDetails = row(Some("Lucía"), Some("García"), false).into();
        assert_eq!(open.status, LoanStatus::Open);
        assert_eq!(open.borrower_name, "Lucía García");

        let closed: LoanDetails = row(None, None, true).into();
        assert_eq!(closed.status, LoanStatus::Closed);
        assert_eq!(closed.borrower_name, "lgarcia");
    }

    #[test]
    fn status_filter_parses_from_query_values() {
        let query: LoanQuery = serde_json::from_str(r#"{"status": "all", "book_id": 4}"#).unwrap();
        assert_eq!(query.status, Some(LoanStatusFilter::All));
        assert_eq!(query.book_id, Some(4));
        assert_eq!(LoanStatusFilter::default(), LoanStatusFilter::Open);
    }
}
