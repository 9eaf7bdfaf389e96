//! Statistics endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, repository::books::LedgerDiscrepancy};

use super::AuthenticatedUser;

/// Statistics response
#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub books: BookStats,
    pub users: UserStats,
    pub loans: LoanStats,
}

#[derive(Serialize, ToSchema)]
pub struct BookStats {
    /// Number of distinct titles
    pub titles: i64,
    pub total_copies: i64,
    /// Copies on the shelf
    pub available_copies: i64,
    pub categories: i64,
}

#[derive(Serialize, ToSchema)]
pub struct UserStats {
    pub total: i64,
    pub by_account_type: Vec<StatEntry>,
}

#[derive(Serialize, ToSchema)]
pub struct LoanStats {
    pub open: i64,
    pub closed: i64,
    pub opened_today: i64,
    pub returned_today: i64,
}

#[derive(Serialize, ToSchema)]
pub struct StatEntry {
    pub label: String,
    pub value: i64,
}

/// Ledger audit result
#[derive(Serialize, ToSchema)]
pub struct ConsistencyResponse {
    /// True when every book satisfies available = total - open loans
    pub consistent: bool,
    pub discrepancies: Vec<LedgerDiscrepancy>,
}

/// Get library statistics
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Library statistics", body = StatsResponse),
        (status = 403, description = "Staff only")
    )
)]
pub async fn get_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<StatsResponse>> {
    claims.require_staff()?;

    let stats = state.services.stats.get_stats().await?;
    Ok(Json(stats))
}

/// Check every book's available copies against its open loans
#[utoipa::path(
    get,
    path = "/stats/consistency",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Ledger audit", body = ConsistencyResponse),
        (status = 403, description = "Staff only")
    )
)]
pub async fn get_ledger_consistency(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ConsistencyResponse>> {
    claims.require_staff()?;

    let discrepancies = state.services.stats.ledger_consistency().await?;
    Ok(Json(ConsistencyResponse {
        consistent: discrepancies.is_empty(),
        discrepancies,
    }))
}
