use chrono::{DateTime, SecondsFormat, Utc};

use crate::model::attendance::AttendanceEntry;

pub const CSV_HEADER: &str =
    "employee_code,name,department,date,check_in_time,check_out_time,status,total_hours\n";

fn esc(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// Renders entries as CSV, one line per record, in the given order.
pub fn render_csv(entries: &[AttendanceEntry]) -> String {
    let mut csv = String::from(CSV_HEADER);

    for entry in entries {
        let record = &entry.record;
        let (code, name, department) = match &entry.employee {
            Some(e) => (
                e.employee_code.as_str(),
                e.name.as_str(),
                e.department.as_deref().unwrap_or(""),
            ),
            None => ("", "", ""),
        };

        let row = format!(
            "{},{},{},{},{},{},{},{:.2}\n",
            esc(code),
            esc(name),
            esc(department),
            record.date,
            timestamp(record.check_in_time),
            timestamp(record.check_out_time),
            record.status,
            record.total_hours,
        );
        csv.push_str(&row);
    }

    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
    use crate::model::employee::EmployeeSummary;
    use chrono::{NaiveDate, TimeZone};

    fn entry(employee: Option<EmployeeSummary>, check_out: bool) -> AttendanceEntry {
        let check_in = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
        AttendanceEntry {
            record: AttendanceRecord {
                id: 1,
                employee_id: 7,
                date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                check_in_time: Some(check_in),
                check_out_time: check_out
                    .then(|| Utc.with_ymd_and_hms(2026, 3, 2, 12, 30, 0).unwrap()),
                status: if check_out {
                    AttendanceStatus::HalfDay
                } else {
                    AttendanceStatus::Present
                },
                total_hours: if check_out { 3.0 } else { 0.0 },
            },
            employee,
        }
    }

    #[test]
    fn renders_header_and_rows() {
        let employee = EmployeeSummary {
            id: 7,
            name: "Jane Doe".into(),
            employee_code: "EMP007".into(),
            department: Some("Engineering".into()),
        };

        let csv = render_csv(&[entry(Some(employee), true), entry(None, false)]);
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines[0], CSV_HEADER.trim_end());
        assert_eq!(
            lines[1],
            "EMP007,Jane Doe,Engineering,2026-03-02,2026-03-02T09:30:00Z,2026-03-02T12:30:00Z,half-day,3.00"
        );
        assert_eq!(lines[2], ",,,2026-03-02,2026-03-02T09:30:00Z,,present,0.00");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn quotes_fields_that_need_it() {
        assert_eq!(esc("plain"), "plain");
        assert_eq!(esc("Doe, Jane"), "\"Doe, Jane\"");
        assert_eq!(esc("the \"boss\""), "\"the \"\"boss\"\"\"");
    }

    #[test]
    fn empty_export_is_just_the_header() {
        assert_eq!(render_csv(&[]), CSV_HEADER);
    }
}
