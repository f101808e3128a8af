//! HTTP surface: query-parameter validation, JSON envelopes and the
//! per-request fault boundary.

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::calendar::{semester_window, DateWindow, Semester};
use crate::composer::{ReportComposer, ReportError};
use crate::models::{CourseReport, GroupReport, StudentReport};

#[derive(Clone)]
pub struct AppState {
    pub composer: Arc<ReportComposer>,
}

impl AppState {
    pub fn new(composer: ReportComposer) -> Self {
        Self {
            composer: Arc::new(composer),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/api/v1/attendance-report", get(attendance_report))
        .route("/api/v1/course-report", get(course_report))
        .route("/api/v1/group-report", get(group_report))
        .route("/api/v1/groups", get(groups))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed request parameter
    Validation(String),
    Report(ReportError),
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        ApiError::Report(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Report(err) => {
                tracing::error!(stage = %err.stage, error = %err, "report generation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal server error" })),
    )
        .into_response()
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ApiError::Validation(format!(
            "missing required query parameter '{name}'"
        ))),
    }
}

fn parse_date(value: Option<String>, name: &str) -> Result<NaiveDate, ApiError> {
    let raw = required(value, name)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| ApiError::Validation(format!("'{name}' must be in the format YYYY-MM-DD")))
}

fn parse_uint(value: Option<String>, name: &str) -> Result<u32, ApiError> {
    let raw = required(value, name)?;
    raw.parse()
        .map_err(|_| ApiError::Validation(format!("'{name}' must be an unsigned integer")))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::Validation(rejection.body_text()))
}

async fn status() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
pub struct AttendanceParams {
    term: Option<String>,
    #[serde(rename = "startDate")]
    start_date: Option<String>,
    #[serde(rename = "endDate")]
    end_date: Option<String>,
}

/// GET /api/v1/attendance-report?term=..&startDate=YYYY-MM-DD&endDate=YYYY-MM-DD
async fn attendance_report(
    State(state): State<AppState>,
    query: Result<Query<AttendanceParams>, QueryRejection>,
) -> Result<Json<Vec<StudentReport>>, ApiError> {
    let params = query_params(query)?;
    let term = required(params.term, "term")?;
    let start = parse_date(params.start_date, "startDate")?;
    let end = parse_date(params.end_date, "endDate")?;
    let window = DateWindow::new(start, end).map_err(ApiError::Validation)?;

    let reports = state.composer.attendance_report(&term, window).await?;
    Ok(Json(reports))
}

#[derive(Debug, Deserialize)]
pub struct CourseParams {
    year: Option<String>,
    sem: Option<String>,
}

/// GET /api/v1/course-report?year=2024&sem=1
async fn course_report(
    State(state): State<AppState>,
    query: Result<Query<CourseParams>, QueryRejection>,
) -> Result<Json<Vec<CourseReport>>, ApiError> {
    let params = query_params(query)?;
    let year = parse_uint(params.year, "year")?;
    let semester =
        Semester::try_from(parse_uint(params.sem, "sem")?).map_err(ApiError::Validation)?;
    let window = i32::try_from(year)
        .ok()
        .and_then(|year| semester_window(year, semester))
        .ok_or_else(|| ApiError::Validation(format!("'year' {year} is out of range")))?;

    let reports = state.composer.course_report(window).await?;
    Ok(Json(reports))
}

#[derive(Debug, Deserialize)]
pub struct GroupParams {
    group: Option<String>,
}

/// GET /api/v1/group-report?group=NAME
async fn group_report(
    State(state): State<AppState>,
    query: Result<Query<GroupParams>, QueryRejection>,
) -> Result<Json<GroupReport>, ApiError> {
    let group = required(query_params(query)?.group, "group")?;
    let report = state.composer.group_report(&group).await?;
    Ok(Json(report))
}

/// GET /api/v1/groups
async fn groups(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.composer.group_names().await?))
}
