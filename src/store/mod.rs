//! Persistence contracts for attendance records and users.
//!
//! Writes that guard an attendance invariant are conditional: they only apply
//! when the record is still in the expected state and report `None` otherwise,
//! so concurrent requests for the same (employee, date) cannot both succeed.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::role::Role;
use crate::model::user::{NewUser, User};

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Duplicate(&'static str),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<strum::ParseError> for StoreError {
    fn from(e: strum::ParseError) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

/// Filter for attendance listings. Every set field narrows the result.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub employee_ids: Option<Vec<u64>>,
    pub date: Option<NaiveDate>,
    /// Inclusive lower bound.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound.
    pub to: Option<NaiveDate>,
    pub statuses: Option<Vec<AttendanceStatus>>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl RecordQuery {
    pub fn for_employee(employee_id: u64) -> Self {
        Self {
            employee_ids: Some(vec![employee_id]),
            ..Self::default()
        }
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        if let Some(ids) = &self.employee_ids {
            if !ids.contains(&record.employee_id) {
                return false;
            }
        }
        if self.date.is_some_and(|d| d != record.date) {
            return false;
        }
        if self.from.is_some_and(|from| record.date < from) {
            return false;
        }
        if self.to.is_some_and(|to| record.date > to) {
            return false;
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&record.status) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_record(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Creates the record or fills in its check-in, only if no check-in is set.
    async fn record_check_in(
        &self,
        employee_id: u64,
        date: NaiveDate,
        check_in: DateTime<Utc>,
        status: AttendanceStatus,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Sets check-out, hours and status, only if the record is checked in and
    /// not yet checked out.
    async fn record_check_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        check_out: DateTime<Utc>,
        total_hours: f64,
        status: AttendanceStatus,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Newest date first, then by id.
    async fn list_records(&self, query: &RecordQuery) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Ignores `limit` and `offset`.
    async fn count_records(&self, query: &RecordQuery) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `StoreError::Duplicate` when the email or employee code is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: u64) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_employee_code(&self, code: &str) -> Result<Option<User>, StoreError>;

    async fn identity_exists(&self, email: &str, employee_code: &str) -> Result<bool, StoreError>;

    /// Ordered by id.
    async fn list_users(
        &self,
        role: Option<Role>,
        department: Option<&str>,
    ) -> Result<Vec<User>, StoreError>;

    async fn users_by_ids(&self, ids: &[u64]) -> Result<Vec<User>, StoreError>;

    async fn touch_last_login(&self, user_id: u64) -> Result<(), StoreError>;

    async fn save_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Revokes an active, unexpired refresh token and returns its owner.
    /// `None` if the token is unknown, expired, or already revoked.
    async fn revoke_refresh_token(&self, jti: &str) -> Result<Option<u64>, StoreError>;
}
