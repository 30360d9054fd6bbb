//! Read-side aggregation over stored records. No invariants of its own:
//! absence is derived from the roster minus who has a record that day.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::user::User;
use crate::utils::calendar;

const UNASSIGNED_DEPARTMENT: &str = "Unassigned";
const TREND_DAYS: u32 = 7;

#[derive(Debug, Default, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatusCounts {
    pub total: u32,
    pub present: u32,
    pub late: u32,
    pub half_day: u32,
    pub absent: u32,
    pub total_hours: f64,
}

impl StatusCounts {
    fn add(&mut self, record: &AttendanceRecord) {
        self.total += 1;
        match record.status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::HalfDay => self.half_day += 1,
            AttendanceStatus::Absent => self.absent += 1,
        }
        self.total_hours += record.total_hours;
    }
}

/// Per-status counts and summed hours for a set of records.
pub fn summarize(records: &[AttendanceRecord]) -> StatusCounts {
    let mut counts = records.iter().fold(StatusCounts::default(), |mut acc, r| {
        acc.add(r);
        acc
    });
    counts.total_hours = (counts.total_hours * 100.0).round() / 100.0;
    counts
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct DayCounts {
    /// Present and half-day records.
    pub present: u32,
    pub late: u32,
    /// Roster members without a record.
    pub absent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrendPoint {
    /// `MM-DD`
    pub label: String,
    pub present: u32,
    pub late: u32,
    pub absent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DepartmentCount {
    pub name: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AbsentEmployee {
    pub name: String,
    pub employee_code: String,
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TeamTotals {
    pub total_employees: u32,
    pub present_today: u32,
    pub late_today: u32,
    pub absent_today: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TeamSummary {
    #[schema(example = "2026-03")]
    pub month: String,
    pub totals: TeamTotals,
    pub trend: Vec<TrendPoint>,
    pub departments: Vec<DepartmentCount>,
    pub absent_list: Vec<AbsentEmployee>,
    #[schema(value_type = Object)]
    pub per_day: BTreeMap<NaiveDate, DayCounts>,
}

/// First and last date whose records `team_summary` reads.
pub fn team_summary_window(today: NaiveDate, month: NaiveDate) -> (NaiveDate, NaiveDate) {
    let (month_start, month_end) = calendar::month_bounds(month);
    let trend = calendar::trailing_days(today, TREND_DAYS);
    let trend_start = trend.first().copied().unwrap_or(today);
    (month_start.min(trend_start), month_end.max(today))
}

/// Counts records of roster members only; records owned by anyone else are
/// ignored.
fn day_counts(roster: &HashSet<u64>, records: &[&AttendanceRecord]) -> DayCounts {
    let mut counts = DayCounts::default();
    let mut seen = HashSet::new();
    for record in records {
        if !roster.contains(&record.employee_id) || !seen.insert(record.employee_id) {
            continue;
        }
        match record.status {
            AttendanceStatus::Present | AttendanceStatus::HalfDay => counts.present += 1,
            AttendanceStatus::Late => counts.late += 1,
            AttendanceStatus::Absent => {}
        }
    }
    counts.absent = (roster.len() - seen.len()) as u32;
    counts
}

/// Manager dashboard for `today` and the month starting at `month`.
/// `employees` is the roster; `records` must cover `team_summary_window`.
pub fn team_summary(
    today: NaiveDate,
    month: NaiveDate,
    employees: &[User],
    records: &[AttendanceRecord],
) -> TeamSummary {
    let roster: HashSet<u64> = employees.iter().map(|e| e.id).collect();

    let mut by_date: BTreeMap<NaiveDate, Vec<&AttendanceRecord>> = BTreeMap::new();
    for record in records {
        by_date.entry(record.date).or_default().push(record);
    }
    let counts_on = |date: NaiveDate| {
        by_date
            .get(&date)
            .map(|rs| day_counts(&roster, rs))
            .unwrap_or(DayCounts {
                absent: roster.len() as u32,
                ..DayCounts::default()
            })
    };

    let today_counts = counts_on(today);
    let totals = TeamTotals {
        total_employees: roster.len() as u32,
        present_today: today_counts.present,
        late_today: today_counts.late,
        absent_today: today_counts.absent,
    };

    let trend = calendar::trailing_days(today, TREND_DAYS)
        .into_iter()
        .map(|date| {
            let counts = counts_on(date);
            TrendPoint {
                label: date.format("%m-%d").to_string(),
                present: counts.present,
                late: counts.late,
                absent: counts.absent,
            }
        })
        .collect();

    let mut departments: BTreeMap<&str, u32> = BTreeMap::new();
    for employee in employees {
        let name = employee
            .department
            .as_deref()
            .unwrap_or(UNASSIGNED_DEPARTMENT);
        *departments.entry(name).or_default() += 1;
    }
    let departments = departments
        .into_iter()
        .map(|(name, value)| DepartmentCount {
            name: name.to_string(),
            value,
        })
        .collect();

    let present_today: HashSet<u64> = by_date
        .get(&today)
        .map(|rs| rs.iter().map(|r| r.employee_id).collect())
        .unwrap_or_default();
    let absent_list = employees
        .iter()
        .filter(|e| !present_today.contains(&e.id))
        .map(|e| AbsentEmployee {
            name: e.name.clone(),
            employee_code: e.employee_code.clone(),
            department: e.department.clone(),
        })
        .collect();

    let (month_start, month_end) = calendar::month_bounds(month);
    let per_day = by_date
        .keys()
        .filter(|date| (month_start..=month_end).contains(*date))
        .map(|date| (*date, counts_on(*date)))
        .collect();

    TeamSummary {
        month: calendar::format_month(month_start),
        totals,
        trend,
        departments,
        absent_list,
        per_day,
    }
}
