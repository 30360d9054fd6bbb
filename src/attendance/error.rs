use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Rejected check-in/check-out sequences, plus infrastructure failures
/// passed through untouched.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("Already checked in")]
    AlreadyCheckedIn,

    #[error("Already checked out")]
    AlreadyCheckedOut,

    #[error("No check-in found for today")]
    NoCheckInFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::AlreadyCheckedIn
            | AttendanceError::AlreadyCheckedOut
            | AttendanceError::NoCheckInFound => StatusCode::BAD_REQUEST,
            AttendanceError::Store(e) => e.status_code(),
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AttendanceError::Store(e) => e.error_response(),
            _ => HttpResponse::build(self.status_code()).json(json!({
                "message": self.to_string()
            })),
        }
    }
}

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        tracing::error!(error = %self, "Store operation failed");
        HttpResponse::InternalServerError().json(json!({
            "message": "Internal Server Error"
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_violations_are_client_errors() {
        for err in [
            AttendanceError::AlreadyCheckedIn,
            AttendanceError::AlreadyCheckedOut,
            AttendanceError::NoCheckInFound,
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(
            AttendanceError::NoCheckInFound.to_string(),
            "No check-in found for today"
        );
    }

    #[test]
    fn store_failures_stay_generic() {
        let err = AttendanceError::from(StoreError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(err, AttendanceError::Store(StoreError::Database(_))));
    }
}
