//! Data models for Biblioteca

pub mod book;
pub mod category;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use book::Book;
pub use category::Category;
pub use loan::{Loan, LoanDetails, LoanId, LoanStatus};
pub use user::{AccountType, User, UserClaims, UserShort};
