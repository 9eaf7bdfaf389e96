//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::loan::{CreateLoan, LoanDetails, LoanQuery},
};

use super::AuthenticatedUser;

/// Paginated loans response
#[derive(Serialize, ToSchema)]
pub struct LoansListResponse {
    pub items: Vec<LoanDetails>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Return response with loan details
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Return status
    pub status: String,
    /// Loan details
    pub loan: LoanDetails,
}

/// List loans.
///
/// Borrowers only ever see their own loans, whatever `user_id` they pass.
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "List of loans", body = LoansListResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(mut query): Query<LoanQuery>,
) -> AppResult<Json<LoansListResponse>> {
    if !claims.is_staff() {
        query.user_id = Some(claims.user_id);
    }

    let (items, total, page, per_page) = state.services.loans.list_loans(&query).await?;

    Ok(Json(LoansListResponse { items, total, page, per_page }))
}

/// Get loans for a specific user
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID"),
        LoanQuery
    ),
    responses(
        (status = 200, description = "Loans of the user", body = LoansListResponse),
        (status = 403, description = "Cannot access another user's loans"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<LoansListResponse>> {
    claims.require_self_or_staff(id)?;

    let (items, total, page, per_page) = state.services.loans.get_user_loans(id, query).await?;

    Ok(Json(LoansListResponse { items, total, page, per_page }))
}

/// Get loan details by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 403, description = "Loan of another user"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get_loan(id).await?;
    claims.require_self_or_staff(loan.user_id)?;

    Ok(Json(loan))
}

/// Lend a copy of a book to a borrower
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan opened", body = LoanDetails),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Book or borrower not found"),
        (status = 409, description = "No copies available"),
        (status = 422, description = "Account cannot borrow"),
        (status = 503, description = "Loan store unavailable")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    claims.require_staff()?;

    let loan_id = state
        .services
        .loans
        .open_loan(&claims, request.user_id, request.book_id)
        .await?;

    let loan = state.services.loans.get_loan(loan_id).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a loaned copy
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan closed", body = ReturnResponse),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan already returned"),
        (status = 503, description = "Loan store unavailable")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    claims.require_staff()?;

    state.services.loans.close_loan(&claims, id).await?;

    let loan = state.services.loans.get_loan(id).await?;
    Ok(Json(ReturnResponse {
        status: "returned".to_string(),
        loan,
    }))
}
