use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

use crate::model::employee::EmployeeSummary;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
    ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AttendanceStatus {
    Present,
    Late,
    HalfDay,
    Absent,
}

impl AttendanceStatus {
    /// Stored and wire representation.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// One row per (employee, calendar date). `status` and `total_hours` are
/// always derived from the two timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 7,
    "date": "2026-01-05",
    "check_in_time": "2026-01-05T09:30:00Z",
    "check_out_time": "2026-01-05T18:00:00Z",
    "status": "present",
    "total_hours": 8.5
}))]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub total_hours: f64,
}

/// Raw `attendance` table row; `status` is stored as text.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub id: u64,
    pub employee_id: u64,
    pub date: NaiveDate,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub status: String,
    pub total_hours: f64,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = strum::ParseError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            check_in_time: row.check_in_time,
            check_out_time: row.check_out_time,
            status: AttendanceStatus::from_str(&row.status)?,
            total_hours: row.total_hours,
        })
    }
}

/// A day with no stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "employee_id": 7,
    "date": "2026-01-05",
    "status": "absent"
}))]
pub struct AbsentDay {
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

/// Result of looking up one employee's day. Absence is explicit rather than a
/// missing value.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum DayAttendance {
    Recorded(AttendanceRecord),
    Absent(AbsentDay),
}

impl DayAttendance {
    pub fn absent(employee_id: u64, date: NaiveDate) -> Self {
        DayAttendance::Absent(AbsentDay {
            employee_id,
            date,
            status: AttendanceStatus::Absent,
        })
    }

    pub fn status(&self) -> AttendanceStatus {
        match self {
            DayAttendance::Recorded(record) => record.status,
            DayAttendance::Absent(day) => day.status,
        }
    }
}

/// Attendance row joined with the owning employee, for manager views.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceEntry {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    /// Missing when the owning user no longer resolves.
    pub employee: Option<EmployeeSummary>,
}
