use axum::{
    Extension, Json,
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{CurrentUser, page_context};
use super::error::JsonError;
use super::flash::{self, Flash};
use super::{AppState, ApiError, DataResponse};
use crate::db::PunchMonthRow;
use crate::views;

/// GET /vypisy
pub async fn vypisy(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
) -> Result<Html<String>, ApiError> {
    let card_number = user.card_number;
    let months = match card_number {
        Some(card) => state.attendance_service.months(card).await?,
        None => Vec::new(),
    };

    let ctx = page_context(&session, Some(user)).await?;
    Ok(Html(views::reports::months_page(&ctx, card_number, &months)))
}

/// GET /mesicni_vypis/{month}
pub async fn mesicni_vypis(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(month): Path<String>,
    session: Session,
) -> Result<Response, ApiError> {
    let Some(card_number) = user.card_number else {
        return flash::redirect(
            &session,
            Flash::warning("Set your card number on the account page first"),
            "/account?next=%2Fvypisy",
        )
        .await;
    };

    let report = state
        .attendance_service
        .monthly_report(card_number, &month)
        .await?;

    let ctx = page_context(&session, Some(user)).await?;
    Ok(Html(views::reports::monthly_report_page(&ctx, &report)).into_response())
}

/// GET /tbl_isdata/{from}/{to}
pub async fn tbl_isdata(
    State(state): State<Arc<AppState>>,
    Path((from, to)): Path<(u64, u64)>,
) -> Result<Json<DataResponse<Vec<PunchMonthRow>>>, JsonError> {
    let rows = state.attendance_service.punch_table(from, to).await?;
    Ok(Json(DataResponse::new(rows)))
}

/// GET /tabletest
pub async fn tabletest(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    session: Session,
) -> Result<Html<String>, ApiError> {
    let ctx = page_context(&session, Some(user)).await?;
    Ok(Html(views::reports::table_page(&ctx)))
}

/// GET /static/table.js
pub async fn table_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        views::reports::TABLE_SCRIPT,
    )
}
