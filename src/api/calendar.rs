use axum::{
    Extension, Form, Json,
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{CurrentUser, page_context};
use super::error::JsonError;
use super::flash::{self, Flash};
use super::forms::{EditDateForm, FormErrors};
use super::validation::{validate_card_number, validate_day, validate_month};
use super::{ApiError, AppState, DataResponse};
use crate::domain::calendar::DayTemplate;
use crate::services::AttendanceError;
use crate::views;

/// GET /caljsonr/{card}/{year}/{month}
///
/// Every day of the month with the default work window.
pub async fn caljsonr(
    State(state): State<Arc<AppState>>,
    Path((card_number, year, month)): Path<(i64, i32, u32)>,
) -> Result<Json<DataResponse<Vec<DayTemplate>>>, JsonError> {
    let card_number = validate_card_number(card_number)?;
    let (year, month) = validate_month(year, month)?;

    let days = state
        .attendance_service
        .month_template(card_number, year, month)?;

    Ok(Json(DataResponse::new(days)))
}

/// GET /calendar/{card}/{year}/{month}
pub async fn calendar(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((card_number, year, month)): Path<(i64, i32, u32)>,
    session: Session,
) -> Result<Html<String>, ApiError> {
    let card_number = validate_card_number(card_number)?;
    let (year, month) = validate_month(year, month)?;

    let calendar = state
        .attendance_service
        .calendar(card_number, year, month)
        .await?;

    let ctx = page_context(&session, Some(user)).await?;
    Ok(Html(views::reports::calendar_page(
        &ctx,
        card_number,
        &calendar,
    )))
}

/// GET /calendar_edit/{card}/{year}/{month}/{day}
pub async fn calendar_edit_page(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((card_number, year, month, day)): Path<(i64, i32, u32, u32)>,
    session: Session,
) -> Result<Html<String>, ApiError> {
    let card_number = validate_card_number(card_number)?;
    let date = validate_day(year, month, day)?;

    let window = state
        .attendance_service
        .day_window(card_number, date)
        .await?;

    let ctx = page_context(&session, Some(user)).await?;
    Ok(Html(views::reports::calendar_edit_page(
        &ctx,
        card_number,
        date,
        &EditDateForm::from_window(window),
        &FormErrors::default(),
    )))
}

/// POST /calendar_edit/{card}/{year}/{month}/{day}
pub async fn calendar_edit(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((card_number, year, month, day)): Path<(i64, i32, u32, u32)>,
    session: Session,
    Form(form): Form<EditDateForm>,
) -> Result<Response, ApiError> {
    let card_number = validate_card_number(card_number)?;
    let date = validate_day(year, month, day)?;

    let errors = match form.validate() {
        Ok(()) => match state
            .attendance_service
            .edit_day(card_number, date, &form.startdate, &form.enddate)
            .await
        {
            Ok(_) => {
                let target = format!("/calendar/{card_number}/{year}/{month}");
                return flash::redirect(&session, Flash::info("Saved successfully"), &target).await;
            }
            Err(AttendanceError::InvalidWorkHours(msg)) => {
                let mut errors = FormErrors::default();
                errors.add("enddate", msg);
                errors
            }
            Err(e) => return Err(e.into()),
        },
        Err(errors) => errors,
    };

    let ctx = page_context(&session, Some(user)).await?;
    Ok(Html(views::reports::calendar_edit_page(
        &ctx,
        card_number,
        date,
        &form,
        &errors,
    ))
    .into_response())
}
