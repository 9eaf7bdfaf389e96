//! Catalog service (books and categories)

use validator::Validate;

use crate::{
    config::PaginationConfig,
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        category::{Category, CreateCategory, UpdateCategory},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    pagination: PaginationConfig,
}

impl CatalogService {
    pub fn new(repository: Repository, pagination: PaginationConfig) -> Self {
        Self { repository, pagination }
    }

    /// Search books; returns (books, total, page, per_page)
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64, i64, i64)> {
        let (page, per_page, offset) = self.pagination.resolve(query.page, query.per_page);
        let (books, total) = self.repository.books.search(query, per_page, offset).await?;
        Ok((books, total, page, per_page))
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;
        self.check_category(book.category_id).await?;

        let created = self.repository.books.create(&book).await?;
        tracing::info!(book_id = created.id, copies = created.total_copies, "Book created");
        Ok(created)
    }

    pub async fn update_book(&self, id: i32, book: UpdateBook) -> AppResult<Book> {
        book.validate()?;
        self.check_category(book.category_id).await?;

        let updated = self.repository.books.update(id, &book).await?;
        if book.total_copies.is_some() {
            tracing::info!(
                book_id = id,
                total_copies = updated.total_copies,
                available_copies = updated.available_copies,
                "Book stock changed"
            );
        }
        Ok(updated)
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        // Loans keep a reference to their book
        if self.repository.loans.count_for_book(id).await? > 0 {
            return Err(AppError::Conflict("Book has loans and cannot be deleted".to_string()));
        }

        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    async fn check_category(&self, category_id: Option<i32>) -> AppResult<()> {
        if let Some(category_id) = category_id {
            if !self.repository.categories.exists(category_id).await? {
                return Err(AppError::NotFound(format!("Category {} not found", category_id)));
            }
        }
        Ok(())
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    pub async fn get_category(&self, id: i32) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    pub async fn create_category(&self, data: CreateCategory) -> AppResult<Category> {
        data.validate()?;
        self.repository.categories.create(&data).await
    }

    pub async fn update_category(&self, id: i32, data: UpdateCategory) -> AppResult<Category> {
        data.validate()?;
        self.repository.categories.update(id, &data).await
    }

    pub async fn delete_category(&self, id: i32) -> AppResult<()> {
        let category = self.repository.categories.get_by_id(id).await?;
        if category.nb_books > 0 {
            return Err(AppError::Conflict(format!(
                "Category still has {} books",
                category.nb_books
            )));
        }
        self.repository.categories.delete(id).await
    }
}
