//! Status and hour accounting for a single attendance day.
//!
//! Status is a pure function of the check-in/check-out timestamps and the
//! office policy. It is never set independently.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};

use crate::model::attendance::AttendanceStatus;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttendancePolicy {
    /// Check-ins strictly after this local wall-clock time are late.
    pub check_in_cutoff: NaiveTime,
    /// Days shorter than this many hours are half-days.
    pub half_day_hours: f64,
    /// Offset of the office's local time from UTC.
    pub utc_offset: FixedOffset,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            check_in_cutoff: NaiveTime::from_hms_opt(9, 45, 0).expect("09:45:00 is a valid time"),
            half_day_hours: 4.0,
            utc_offset: Utc.fix(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayClassification {
    pub status: AttendanceStatus,
    pub total_hours: f64,
}

impl AttendancePolicy {
    /// Calendar date of `at` in office local time.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.utc_offset).date_naive()
    }

    pub fn local_time(&self, at: DateTime<Utc>) -> NaiveTime {
        at.with_timezone(&self.utc_offset).time()
    }

    /// Status assigned at check-in.
    pub fn arrival_status(&self, check_in: DateTime<Utc>) -> AttendanceStatus {
        if self.local_time(check_in) > self.check_in_cutoff {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        }
    }

    /// Status assigned at check-out. A short day overrides lateness.
    pub fn departure_status(&self, prior: AttendanceStatus, total_hours: f64) -> AttendanceStatus {
        if total_hours < self.half_day_hours {
            AttendanceStatus::HalfDay
        } else if prior == AttendanceStatus::Late {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        }
    }

    pub fn classify_day(
        &self,
        check_in: Option<DateTime<Utc>>,
        check_out: Option<DateTime<Utc>>,
    ) -> DayClassification {
        match (check_in, check_out) {
            (None, _) => DayClassification {
                status: AttendanceStatus::Absent,
                total_hours: 0.0,
            },
            (Some(check_in), None) => DayClassification {
                status: self.arrival_status(check_in),
                total_hours: 0.0,
            },
            (Some(check_in), Some(check_out)) => {
                let total_hours = worked_hours(check_in, check_out);
                DayClassification {
                    status: self.departure_status(self.arrival_status(check_in), total_hours),
                    total_hours,
                }
            }
        }
    }
}

/// Elapsed hours rounded to two decimals; never negative.
pub fn worked_hours(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> f64 {
    let millis = (check_out - check_in).num_milliseconds().max(0);
    round_hours(millis as f64 / 3_600_000.0)
}

fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}
