use crate::api::attendance::{HistoryQuery, MonthQuery, MonthlySummaryResponse};
use crate::api::manager::{AllAttendanceQuery, AttendancePage, ExportQuery, TeamSummaryQuery};
use crate::attendance::summary::{
    AbsentEmployee, DayCounts, DepartmentCount, StatusCounts, TeamSummary, TeamTotals, TrendPoint,
};
use crate::model::attendance::{
    AbsentDay, AttendanceEntry, AttendanceRecord, AttendanceStatus, DayAttendance,
};
use crate::model::employee::EmployeeSummary;
use crate::model::role::Role;
use crate::model::user::UserProfile;
use crate::models::{AuthResponse, LoginReqDto, RegisterReq};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Tracker API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Tracker

Daily check-in and check-out with automatic status derivation.

### Status rules
- Check-in after the office cutoff (default **09:45** local time) is **late**
- A day shorter than the half-day threshold (default **4 hours**) is **half-day**, even when late
- No record for a day means **absent**

### Roles
- **employee**: own check-in/check-out, history and monthly summary
- **manager**: team listings, per-employee history, CSV export and the team dashboard

### Security
Attendance endpoints require a **JWT Bearer** access token from `/auth/login`.
"#,
    ),
    paths(
        crate::routes::health,

        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::my_history,
        crate::api::attendance::my_summary,

        crate::api::manager::all_attendance,
        crate::api::manager::employee_attendance,
        crate::api::manager::export_csv,
        crate::api::manager::today_status,
        crate::api::manager::team_summary_report
    ),
    components(
        schemas(
            Role,
            UserProfile,
            RegisterReq,
            LoginReqDto,
            AuthResponse,
            AttendanceStatus,
            AttendanceRecord,
            AbsentDay,
            DayAttendance,
            EmployeeSummary,
            AttendanceEntry,
            HistoryQuery,
            MonthQuery,
            MonthlySummaryResponse,
            StatusCounts,
            AllAttendanceQuery,
            AttendancePage,
            ExportQuery,
            TeamSummaryQuery,
            TeamSummary,
            TeamTotals,
            TrendPoint,
            DepartmentCount,
            AbsentEmployee,
            DayCounts
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and token rotation"),
        (name = "Attendance", description = "Employee check-in/check-out"),
        (name = "Manager", description = "Team attendance views and reports"),
        (name = "Health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
