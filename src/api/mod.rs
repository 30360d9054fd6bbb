pub mod attendance;
pub mod manager;

use actix_web::{HttpResponse, error::InternalError};
use chrono::NaiveDate;
use serde_json::json;

use crate::utils::calendar;

/// 400 with the usual `{"message": ...}` body.
pub(crate) fn bad_request(message: &str) -> actix_web::Error {
    InternalError::from_response(
        message.to_string(),
        HttpResponse::BadRequest().json(json!({ "message": message })),
    )
    .into()
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty())
}

/// First day of the `YYYY-MM` month in `raw`, or of the month containing
/// `today` when absent.
pub(crate) fn month_or_current(raw: Option<&str>, today: NaiveDate) -> actix_web::Result<NaiveDate> {
    match non_empty(raw) {
        Some(month) => {
            calendar::parse_month(month).ok_or_else(|| bad_request("month must be YYYY-MM"))
        }
        None => Ok(calendar::first_of_month(today)),
    }
}

pub(crate) fn optional_date(field: &str, raw: Option<&str>) -> actix_web::Result<Option<NaiveDate>> {
    non_empty(raw)
        .map(|value| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map_err(|_| bad_request(&format!("{} must be YYYY-MM-DD", field)))
        })
        .transpose()
}
