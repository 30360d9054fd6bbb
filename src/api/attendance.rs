use crate::api::month_or_current;
use crate::attendance::summary::{StatusCounts, summarize};
use crate::auth::auth::AuthUser;
use crate::model::attendance::AttendanceRecord;
use crate::state::AppState;
use crate::store::RecordQuery;
use crate::utils::calendar;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

const DEFAULT_HISTORY_LIMIT: u32 = 100;
const MAX_HISTORY_LIMIT: u32 = 500;

#[derive(Debug, Deserialize, ToSchema)]
pub struct HistoryQuery {
    /// `YYYY-MM`
    pub month: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MonthQuery {
    /// `YYYY-MM`, defaults to the current month
    pub month: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthlySummaryResponse {
    #[schema(example = "2026-03")]
    pub month: String,
    pub summary: StatusCounts,
    pub rows: Vec<AttendanceRecord>,
}

/// Check in for today
#[utoipa::path(
    post,
    path = "/api/attendance/checkin",
    responses(
        (status = 200, description = "Checked in", body = AttendanceRecord),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> actix_web::Result<HttpResponse> {
    let record = state
        .attendance
        .record_check_in(auth.user_id, state.now())
        .await?;

    Ok(HttpResponse::Ok().json(record))
}

/// Check out for today
#[utoipa::path(
    post,
    path = "/api/attendance/checkout",
    responses(
        (status = 200, description = "Checked out", body = AttendanceRecord),
        (status = 400, description = "No check-in today, or already checked out", body = Object, example = json!({
            "message": "No check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> actix_web::Result<HttpResponse> {
    let record = state
        .attendance
        .record_check_out(auth.user_id, state.now())
        .await?;

    Ok(HttpResponse::Ok().json(record))
}

/// Today's attendance, or an explicit absence
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's record or absence", body = crate::model::attendance::DayAttendance),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(auth: AuthUser, state: web::Data<AppState>) -> actix_web::Result<HttpResponse> {
    let day = state.attendance.today(auth.user_id, state.now()).await?;
    debug!(user_id = auth.user_id, status = %day.status(), "Today's attendance");
    Ok(HttpResponse::Ok().json(day))
}

/// Own attendance history, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/my-history",
    params(
        ("month", Query, description = "Restrict to a month (YYYY-MM)"),
        ("limit", Query, description = "Max rows, default 100, at most 500")
    ),
    responses(
        (status = 200, description = "Attendance records", body = [AttendanceRecord]),
        (status = 400, description = "Malformed month"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_history(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<HttpResponse> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let mut filter = RecordQuery::for_employee(auth.user_id).limit(limit);
    if query.month.is_some() {
        let month = month_or_current(query.month.as_deref(), state.today())?;
        let (first, last) = calendar::month_bounds(month);
        filter = filter.between(first, last);
    }

    let records = state.records.list_records(&filter).await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Own monthly status counts
#[utoipa::path(
    get,
    path = "/api/attendance/my-summary",
    params(
        ("month", Query, description = "Month (YYYY-MM), defaults to the current month")
    ),
    responses(
        (status = 200, description = "Monthly summary", body = MonthlySummaryResponse),
        (status = 400, description = "Malformed month"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_summary(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<MonthQuery>,
) -> actix_web::Result<HttpResponse> {
    let month = month_or_current(query.month.as_deref(), state.today())?;
    let (first, last) = calendar::month_bounds(month);

    let rows = state
        .records
        .list_records(&RecordQuery::for_employee(auth.user_id).between(first, last))
        .await?;

    Ok(HttpResponse::Ok().json(MonthlySummaryResponse {
        month: calendar::format_month(month),
        summary: summarize(&rows),
        rows,
    }))
}
