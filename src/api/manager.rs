use std::collections::HashMap;
use std::str::FromStr;

use crate::api::{bad_request, month_or_current, optional_date};
use crate::attendance::export::render_csv;
use crate::attendance::summary::{team_summary, team_summary_window};
use crate::auth::auth::AuthUser;
use crate::model::attendance::{AttendanceEntry, AttendanceRecord, AttendanceStatus};
use crate::model::employee::EmployeeSummary;
use crate::model::role::Role;
use crate::state::AppState;
use crate::store::{RecordQuery, StoreError, UserStore};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

const DEFAULT_PAGE_LIMIT: u32 = 50;
const MAX_PAGE_LIMIT: u32 = 500;
const EMPLOYEE_HISTORY_LIMIT: u32 = 500;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AllAttendanceQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub employee_code: Option<String>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    #[schema(example = "late")]
    pub status: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendancePage {
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 50)]
    pub limit: u32,
    #[schema(example = 120)]
    pub total: u64,
    pub data: Vec<AttendanceEntry>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExportQuery {
    /// `YYYY-MM-DD`, inclusive
    pub from: Option<String>,
    /// `YYYY-MM-DD`, inclusive
    pub to: Option<String>,
    pub employee_code: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TeamSummaryQuery {
    /// `YYYY-MM`, defaults to the current month
    pub month: Option<String>,
}

/// Joins each record with its owner's employee details.
async fn with_employees(
    users: &dyn UserStore,
    records: Vec<AttendanceRecord>,
) -> Result<Vec<AttendanceEntry>, StoreError> {
    let mut ids: Vec<u64> = records.iter().map(|r| r.employee_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let employees: HashMap<u64, EmployeeSummary> = users
        .users_by_ids(&ids)
        .await?
        .iter()
        .map(|u| (u.id, EmployeeSummary::from(u)))
        .collect();

    Ok(records
        .into_iter()
        .map(|record| AttendanceEntry {
            employee: employees.get(&record.employee_id).cloned(),
            record,
        })
        .collect())
}

/// Ids of the employee with this code; empty when nobody has it.
async fn ids_for_code(users: &dyn UserStore, code: &str) -> Result<Vec<u64>, StoreError> {
    Ok(users
        .find_by_employee_code(code.trim())
        .await?
        .map(|u| vec![u.id])
        .unwrap_or_default())
}

/// Paginated attendance of everyone
#[utoipa::path(
    get,
    path = "/api/attendance/all",
    params(
        ("page", Query, description = "Page number, from 1"),
        ("limit", Query, description = "Items per page, default 50"),
        ("employee_code", Query, description = "Filter by employee code"),
        ("date", Query, description = "Filter by date (YYYY-MM-DD)"),
        ("status", Query, description = "Filter by status"),
        ("department", Query, description = "Filter by department")
    ),
    responses(
        (status = 200, description = "Paginated attendance", body = AttendancePage),
        (status = 400, description = "Malformed filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Manager"
)]
pub async fn all_attendance(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<AllAttendanceQuery>,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager()?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);

    let mut filter = RecordQuery {
        date: optional_date("date", query.date.as_deref())?,
        limit: Some(limit),
        offset: (page - 1).saturating_mul(limit),
        ..RecordQuery::default()
    };

    if let Some(status) = query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        let status = AttendanceStatus::from_str(status.trim())
            .map_err(|_| bad_request("status must be present, late, half-day or absent"))?;
        filter.statuses = Some(vec![status]);
    }

    if let Some(code) = query.employee_code.as_deref().filter(|c| !c.trim().is_empty()) {
        filter.employee_ids = Some(ids_for_code(state.users.as_ref(), code).await?);
    }

    if let Some(department) = query.department.as_deref().filter(|d| !d.trim().is_empty()) {
        let members: Vec<u64> = state
            .users
            .list_users(None, Some(department.trim()))
            .await?
            .iter()
            .map(|u| u.id)
            .collect();
        filter.employee_ids = Some(match filter.employee_ids.take() {
            Some(ids) => ids.into_iter().filter(|id| members.contains(id)).collect(),
            None => members,
        });
    }

    let total = state.records.count_records(&filter).await?;
    let records = state.records.list_records(&filter).await?;
    let data = with_employees(state.users.as_ref(), records).await?;

    Ok(HttpResponse::Ok().json(AttendancePage {
        page,
        limit,
        total,
        data,
    }))
}

/// Attendance history of one employee
#[utoipa::path(
    get,
    path = "/api/attendance/employee/{id}",
    params(
        ("id", Path, description = "User id or employee code")
    ),
    responses(
        (status = 200, description = "Up to 500 records, newest first; empty for an unknown employee", body = [AttendanceEntry]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Manager"
)]
pub async fn employee_attendance(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager()?;

    let id = path.into_inner();
    // employee codes win over numeric ids
    let employee_id = match state.users.find_by_employee_code(id.trim()).await? {
        Some(user) => Some(user.id),
        None => id.trim().parse::<u64>().ok(),
    };

    let Some(employee_id) = employee_id else {
        return Ok(HttpResponse::Ok().json(Vec::<AttendanceEntry>::new()));
    };

    let records = state
        .records
        .list_records(&RecordQuery::for_employee(employee_id).limit(EMPLOYEE_HISTORY_LIMIT))
        .await?;
    let entries = with_employees(state.users.as_ref(), records).await?;

    Ok(HttpResponse::Ok().json(entries))
}

/// Export attendance as CSV
#[utoipa::path(
    get,
    path = "/api/attendance/export",
    params(
        ("from", Query, description = "First date (YYYY-MM-DD), inclusive"),
        ("to", Query, description = "Last date (YYYY-MM-DD), inclusive"),
        ("employee_code", Query, description = "Only this employee")
    ),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String),
        (status = 400, description = "Malformed date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Manager"
)]
pub async fn export_csv(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<ExportQuery>,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager()?;

    let mut filter = RecordQuery {
        from: optional_date("from", query.from.as_deref())?,
        to: optional_date("to", query.to.as_deref())?,
        ..RecordQuery::default()
    };
    if let Some(code) = query.employee_code.as_deref().filter(|c| !c.trim().is_empty()) {
        filter.employee_ids = Some(ids_for_code(state.users.as_ref(), code).await?);
    }

    let records = state.records.list_records(&filter).await?;
    let entries = with_employees(state.users.as_ref(), records).await?;
    info!(rows = entries.len(), manager = %auth.email, "Attendance exported");

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            "Content-Disposition",
            format!(
                "attachment; filename=\"attendance_{}.csv\"",
                state.now().timestamp_millis()
            ),
        ))
        .body(render_csv(&entries)))
}

/// Who is in today
#[utoipa::path(
    get,
    path = "/api/attendance/today-status",
    responses(
        (status = 200, description = "Today's present, late and half-day records", body = [AttendanceEntry]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Manager"
)]
pub async fn today_status(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager()?;

    let filter = RecordQuery {
        statuses: Some(vec![
            AttendanceStatus::Present,
            AttendanceStatus::Late,
            AttendanceStatus::HalfDay,
        ]),
        ..RecordQuery::default()
    }
    .on(state.today());

    let records = state.records.list_records(&filter).await?;
    let entries = with_employees(state.users.as_ref(), records).await?;

    Ok(HttpResponse::Ok().json(entries))
}

/// Team dashboard for a month
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(
        ("month", Query, description = "Month (YYYY-MM), defaults to the current month")
    ),
    responses(
        (status = 200, description = "Team summary", body = crate::attendance::summary::TeamSummary),
        (status = 400, description = "Malformed month"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Manager"
)]
pub async fn team_summary_report(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<TeamSummaryQuery>,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager()?;

    let today = state.today();
    let month = month_or_current(query.month.as_deref(), today)?;

    let employees = state.users.list_users(Some(Role::Employee), None).await?;
    let (from, to) = team_summary_window(today, month);
    let records = state
        .records
        .list_records(&RecordQuery::default().between(from, to))
        .await?;

    Ok(HttpResponse::Ok().json(team_summary(today, month, &employees, &records)))
}
