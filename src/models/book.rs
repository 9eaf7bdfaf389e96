//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book record with its category name.
///
/// `available_copies` is owned by the loan ledger: it moves only when loans
/// are opened or closed, or when `total_copies` changes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub category_id: Option<i32>,
    pub category_name: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub crea_date: DateTime<Utc>,
    pub modif_date: Option<DateTime<Utc>>,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// Copies currently held by open loans
    pub fn copies_on_loan(&self) -> i32 {
        self.total_copies - self.available_copies
    }
}

/// Book query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Matches title, author or ISBN
    pub search: Option<String>,
    pub category_id: Option<i32>,
    /// Only books with at least one copy available
    pub available_only: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Author must be 1 to 255 characters"))]
    pub author: String,
    #[validate(length(min = 10, max = 20, message = "ISBN must be 10 to 20 characters"))]
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub category_id: Option<i32>,
    /// Number of physical copies; all start available
    #[validate(range(min = 0, max = 10000, message = "Copies must be between 0 and 10000"))]
    pub total_copies: i32,
}

/// Update book request. Available copies cannot be set directly.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Author must be 1 to 255 characters"))]
    pub author: Option<String>,
    #[validate(length(min = 10, max = 20, message = "ISBN must be 10 to 20 characters"))]
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub category_id: Option<i32>,
    #[validate(range(min = 0, max = 10000, message = "Copies must be between 0 and 10000"))]
    pub total_copies: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_on_loan_is_total_minus_available() {
        let book = Book {
            id: 1,
            title: "Cien años de soledad".to_string(),
            author: "Gabriel García Márquez".to_string(),
            isbn: None,
            publisher: None,
            publication_year: Some(1967),
            category_id: None,
            category_name: None,
            total_copies: 3,
            available_copies: 1,
            crea_date: Utc::now(),
            modif_date: None,
        };

        assert!(book.is_available());
        assert_eq!(book.copies_on_loan(), 2);
    }

    #[test]
    fn negative_copy_count_is_rejected() {
        let request = CreateBook {
            title: "Rayuela".to_string(),
            author: "Julio Cortázar".to_string(),
            isbn: None,
            publisher: None,
            publication_year: None,
            category_id: None,
            total_copies: -1,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn unknown_fields_like_available_copies_are_ignored() {
        let update: UpdateBook =
            serde_json::from_str(r#"{"title": "Ficciones", "available_copies": 99}"#).unwrap();
        assert_eq!(update.title.as_deref(), Some("Ficciones"));
        assert!(update.total_copies.is_none());
    }
}
