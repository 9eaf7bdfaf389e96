//! Books repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
};

const BOOK_SELECT: &str = r#"
    SELECT b.*, c.name AS category_name
    FROM books b
    LEFT JOIN categories c ON c.id = b.category_id
"#;

const SEARCH_FILTER: &str = r#"
    WHERE ($1::text IS NULL
           OR LOWER(b.title) LIKE $1
           OR LOWER(b.author) LIKE $1
           OR LOWER(b.isbn) LIKE $1)
      AND ($2::int IS NULL OR b.category_id = $2)
      AND (NOT $3 OR b.available_copies > 0)
"#;

/// A book whose counter disagrees with its open loans
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct LedgerDiscrepancy {
    pub book_id: i32,
    pub title: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub open_loans: i64,
    /// total_copies - open_loans
    pub expected_available: i64,
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let query = format!("{} WHERE b.id = $1", BOOK_SELECT);
        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Search books with pagination
    pub async fn search(&self, query: &BookQuery, limit: i64, offset: i64) -> AppResult<(Vec<Book>, i64)> {
        let pattern = query
            .search
            .as_ref()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));
        let available_only = query.available_only.unwrap_or(false);

        let count_query = format!("SELECT COUNT(*) FROM books b {}", SEARCH_FILTER);
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(&pattern)
            .bind(query.category_id)
            .bind(available_only)
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            "{} {} ORDER BY b.title, b.id LIMIT $4 OFFSET $5",
            BOOK_SELECT, SEARCH_FILTER
        );
        let books = sqlx::query_as::<_, Book>(&select_query)
            .bind(&pattern)
            .bind(query.category_id)
            .bind(available_only)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((books, total))
    }

    /// Create a book; every copy starts available
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO books (
                title, author, isbn, publisher, publication_year, category_id,
                total_copies, available_copies, crea_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8)
            RETURNING id
            "#,
        )
        .bind(book.title.trim())
        .bind(book.author.trim())
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(book.category_id)
        .bind(book.total_copies)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_constraint(e, "ISBN already exists or category is unknown"))?;

        self.get_by_id(id).await
    }

    /// Update a book.
    ///
    /// A change of `total_copies` moves `available_copies` by the same delta in
    /// the same statement, and is refused if fewer copies would remain than are
    /// currently on loan.
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        let updated: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE books SET
                title = COALESCE($1, title),
                author = COALESCE($2, author),
                isbn = COALESCE($3, isbn),
                publisher = COALESCE($4, publisher),
                publication_year = COALESCE($5, publication_year),
                category_id = COALESCE($6, category_id),
                available_copies = available_copies + (COALESCE($7, total_copies) - total_copies),
                total_copies = COALESCE($7, total_copies),
                modif_date = $8
            WHERE id = $9
              AND available_copies + (COALESCE($7, total_copies) - total_copies) >= 0
            RETURNING id
            "#,
        )
        .bind(book.title.as_deref().map(str::trim))
        .bind(book.author.as_deref().map(str::trim))
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(book.category_id)
        .bind(book.total_copies)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_constraint(e, "ISBN already exists or category is unknown"))?;

        if let Some(id) = updated {
            return self.get_by_id(id).await;
        }

        // Nothing matched: unknown book, or the copy count is below open loans
        let current = self.get_by_id(id).await?;
        Err(AppError::BusinessRule(format!(
            "Cannot reduce copies below the {} currently on loan",
            current.copies_on_loan()
        )))
    }

    /// Delete a book. Books referenced by loans are kept for the loan history.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_constraint(e, "Book has loans and cannot be deleted"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    /// Books whose available copies differ from total copies minus open loans
    pub async fn ledger_discrepancies(&self) -> AppResult<Vec<LedgerDiscrepancy>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.title, b.total_copies, b.available_copies,
                   COUNT(l.id) AS open_loans
            FROM books b
            LEFT JOIN loans l ON l.book_id = b.id AND l.return_date IS NULL
            GROUP BY b.id
            HAVING b.available_copies <> b.total_copies - COUNT(l.id)
            ORDER BY b.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let total_copies: i32 = row.get("total_copies");
                let open_loans: i64 = row.get("open_loans");
                LedgerDiscrepancy {
                    book_id: row.get("id"),
                    title: row.get("title"),
                    total_copies,
                    available_copies: row.get("available_copies"),
                    open_loans,
                    expected_available: total_copies as i64 - open_loans,
                }
            })
            .collect())
    }
}
