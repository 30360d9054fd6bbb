use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use crate::attendance::error::AttendanceError;
use crate::attendance::rules::{AttendancePolicy, DayClassification, worked_hours};
use crate::model::attendance::{AttendanceRecord, DayAttendance};
use crate::store::AttendanceStore;

/// Check-in/check-out against the store, one (employee, local date) record
/// at a time.
pub struct AttendanceService {
    store: Arc<dyn AttendanceStore>,
    policy: AttendancePolicy,
}

impl AttendanceService {
    pub fn new(store: Arc<dyn AttendanceStore>, policy: AttendancePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &AttendancePolicy {
        &self.policy
    }

    pub async fn record_check_in(
        &self,
        employee_id: u64,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let date = self.policy.local_date(now);
        let DayClassification { status, .. } = self.policy.classify_day(Some(now), None);

        match self
            .store
            .record_check_in(employee_id, date, now, status)
            .await?
        {
            Some(record) => {
                info!(employee_id, %date, status = %record.status, "Checked in");
                Ok(record)
            }
            None => {
                info!(employee_id, %date, "Check-in rejected: already checked in");
                Err(AttendanceError::AlreadyCheckedIn)
            }
        }
    }

    pub async fn record_check_out(
        &self,
        employee_id: u64,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let date = self.policy.local_date(now);

        let (check_in, prior) = match self.store.find_record(employee_id, date).await? {
            Some(AttendanceRecord {
                check_in_time: Some(check_in),
                check_out_time: None,
                status,
                ..
            }) => (check_in, status),
            Some(record) if record.check_in_time.is_some() => {
                info!(employee_id, %date, "Check-out rejected: already checked out");
                return Err(AttendanceError::AlreadyCheckedOut);
            }
            _ => {
                info!(employee_id, %date, "Check-out rejected: no check-in");
                return Err(AttendanceError::NoCheckInFound);
            }
        };

        let total_hours = worked_hours(check_in, now);
        let status = self.policy.departure_status(prior, total_hours);

        // Another request may have checked out since the read above
        let record = self
            .store
            .record_check_out(employee_id, date, now, total_hours, status)
            .await?
            .ok_or(AttendanceError::AlreadyCheckedOut)?;

        info!(employee_id, %date, status = %record.status, total_hours, "Checked out");
        Ok(record)
    }

    pub async fn day_attendance(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<DayAttendance, AttendanceError> {
        Ok(match self.store.find_record(employee_id, date).await? {
            Some(record) => DayAttendance::Recorded(record),
            None => DayAttendance::absent(employee_id, date),
        })
    }

    pub async fn today(
        &self,
        employee_id: u64,
        now: DateTime<Utc>,
    ) -> Result<DayAttendance, AttendanceError> {
        self.day_attendance(employee_id, self.policy.local_date(now))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;
    use crate::store::{MemoryStore, RecordQuery, StoreError};
    use async_trait::async_trait;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn service() -> AttendanceService {
        AttendanceService::new(Arc::new(MemoryStore::new()), AttendancePolicy::default())
    }

    #[actix_web::test]
    async fn on_time_full_day_stays_present() {
        let svc = service();

        let checked_in = svc.record_check_in(1, at(9, 30)).await.unwrap();
        assert_eq!(checked_in.status, AttendanceStatus::Present);
        assert_eq!(checked_in.total_hours, 0.0);
        assert!(checked_in.check_out_time.is_none());

        let checked_out = svc.record_check_out(1, at(18, 0)).await.unwrap();
        assert_eq!(checked_out.status, AttendanceStatus::Present);
        assert_eq!(checked_out.total_hours, 8.5);
        assert_eq!(checked_out.check_in_time, Some(at(9, 30)));
        assert_eq!(checked_out.check_out_time, Some(at(18, 0)));
    }

    #[actix_web::test]
    async fn late_full_day_stays_late() {
        let svc = service();

        let checked_in = svc.record_check_in(1, at(10, 15)).await.unwrap();
        assert_eq!(checked_in.status, AttendanceStatus::Late);

        let checked_out = svc.record_check_out(1, at(18, 0)).await.unwrap();
        assert_eq!(checked_out.status, AttendanceStatus::Late);
        assert_eq!(checked_out.total_hours, 7.75);
    }

    #[actix_web::test]
    async fn short_day_becomes_half_day() {
        let svc = service();

        svc.record_check_in(1, at(9, 30)).await.unwrap();
        let checked_out = svc.record_check_out(1, at(12, 30)).await.unwrap();
        assert_eq!(checked_out.status, AttendanceStatus::HalfDay);
        assert_eq!(checked_out.total_hours, 3.0);
    }

    #[actix_web::test]
    async fn half_day_overrides_late() {
        let svc = service();

        svc.record_check_in(1, at(11, 0)).await.unwrap();
        let checked_out = svc.record_check_out(1, at(14, 0)).await.unwrap();
        assert_eq!(checked_out.status, AttendanceStatus::HalfDay);
    }

    #[actix_web::test]
    async fn second_check_in_is_rejected() {
        let svc = service();

        svc.record_check_in(1, at(9, 0)).await.unwrap();
        let again = svc.record_check_in(1, at(9, 5)).await;
        assert!(matches!(again, Err(AttendanceError::AlreadyCheckedIn)));

        // other employees are unaffected
        assert!(svc.record_check_in(2, at(9, 5)).await.is_ok());
    }

    #[actix_web::test]
    async fn check_out_without_check_in_is_rejected() {
        let svc = service();
        let result = svc.record_check_out(1, at(18, 0)).await;
        assert!(matches!(result, Err(AttendanceError::NoCheckInFound)));
    }

    #[actix_web::test]
    async fn second_check_out_is_rejected_and_keeps_first() {
        let svc = service();

        svc.record_check_in(1, at(9, 0)).await.unwrap();
        svc.record_check_out(1, at(17, 0)).await.unwrap();
        let again = svc.record_check_out(1, at(19, 0)).await;
        assert!(matches!(again, Err(AttendanceError::AlreadyCheckedOut)));

        let day = svc
            .day_attendance(1, at(0, 0).date_naive())
            .await
            .unwrap();
        match day {
            DayAttendance::Recorded(record) => {
                assert_eq!(record.check_out_time, Some(at(17, 0)));
                assert_eq!(record.total_hours, 8.0);
            }
            DayAttendance::Absent(_) => panic!("expected a stored record"),
        }
    }

    #[actix_web::test]
    async fn check_in_after_check_out_is_still_rejected() {
        let svc = service();

        svc.record_check_in(1, at(9, 0)).await.unwrap();
        svc.record_check_out(1, at(17, 0)).await.unwrap();
        let again = svc.record_check_in(1, at(17, 30)).await;
        assert!(matches!(again, Err(AttendanceError::AlreadyCheckedIn)));
    }

    /// Yields to the executor before every store call, so futures driven by
    /// `join_all` interleave their reads and writes.
    struct InterleavingStore(MemoryStore);

    #[async_trait]
    impl AttendanceStore for InterleavingStore {
        async fn find_record(
            &self,
            employee_id: u64,
            date: NaiveDate,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            actix_web::rt::task::yield_now().await;
            self.0.find_record(employee_id, date).await
        }

        async fn record_check_in(
            &self,
            employee_id: u64,
            date: NaiveDate,
            check_in: DateTime<Utc>,
            status: AttendanceStatus,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            actix_web::rt::task::yield_now().await;
            self.0
                .record_check_in(employee_id, date, check_in, status)
                .await
        }

        async fn record_check_out(
            &self,
            employee_id: u64,
            date: NaiveDate,
            check_out: DateTime<Utc>,
            total_hours: f64,
            status: AttendanceStatus,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            actix_web::rt::task::yield_now().await;
            self.0
                .record_check_out(employee_id, date, check_out, total_hours, status)
                .await
        }

        async fn list_records(
            &self,
            query: &RecordQuery,
        ) -> Result<Vec<AttendanceRecord>, StoreError> {
            self.0.list_records(query).await
        }

        async fn count_records(&self, query: &RecordQuery) -> Result<u64, StoreError> {
            self.0.count_records(query).await
        }
    }

    fn interleaving_service() -> AttendanceService {
        AttendanceService::new(
            Arc::new(InterleavingStore(MemoryStore::new())),
            AttendancePolicy::default(),
        )
    }

    #[actix_web::test]
    async fn interleaved_check_ins_admit_exactly_one() {
        let svc = interleaving_service();

        let attempts =
            futures::future::join_all((0..8).map(|i| svc.record_check_in(1, at(9, i)))).await;

        let accepted: Vec<_> = attempts.iter().filter_map(|r| r.as_ref().ok()).collect();
        let rejected = attempts
            .iter()
            .filter(|r| matches!(r, Err(AttendanceError::AlreadyCheckedIn)))
            .count();
        assert_eq!(accepted.len(), 1);
        assert_eq!(rejected, 7);

        let stored = svc.day_attendance(1, at(0, 0).date_naive()).await.unwrap();
        match stored {
            DayAttendance::Recorded(record) => {
                assert_eq!(record.check_in_time, accepted[0].check_in_time)
            }
            DayAttendance::Absent(_) => panic!("expected a stored record"),
        }
    }

    #[actix_web::test]
    async fn interleaved_check_outs_admit_exactly_one() {
        let svc = interleaving_service();
        svc.record_check_in(1, at(9, 0)).await.unwrap();

        // both read the open record before either writes
        let (first, second) = futures::join!(
            svc.record_check_out(1, at(17, 0)),
            svc.record_check_out(1, at(19, 0))
        );

        let winner = first.unwrap();
        assert_eq!(winner.check_out_time, Some(at(17, 0)));
        assert!(matches!(second, Err(AttendanceError::AlreadyCheckedOut)));

        let stored = svc.day_attendance(1, at(0, 0).date_naive()).await.unwrap();
        match stored {
            DayAttendance::Recorded(record) => {
                assert_eq!(record.check_out_time, Some(at(17, 0)));
                assert_eq!(record.total_hours, 8.0);
            }
            DayAttendance::Absent(_) => panic!("expected a stored record"),
        }
    }

    /// Reports every stored record as still open, as a reader that lost the
    /// race to another check-out would see it.
    struct StaleReadStore(MemoryStore);

    #[async_trait]
    impl AttendanceStore for StaleReadStore {
        async fn find_record(
            &self,
            employee_id: u64,
            date: NaiveDate,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            Ok(self
                .0
                .find_record(employee_id, date)
                .await?
                .map(|record| AttendanceRecord {
                    check_out_time: None,
                    ..record
                }))
        }

        async fn record_check_in(
            &self,
            employee_id: u64,
            date: NaiveDate,
            check_in: DateTime<Utc>,
            status: AttendanceStatus,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            self.0
                .record_check_in(employee_id, date, check_in, status)
                .await
        }

        async fn record_check_out(
            &self,
            employee_id: u64,
            date: NaiveDate,
            check_out: DateTime<Utc>,
            total_hours: f64,
            status: AttendanceStatus,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            self.0
                .record_check_out(employee_id, date, check_out, total_hours, status)
                .await
        }

        async fn list_records(
            &self,
            query: &RecordQuery,
        ) -> Result<Vec<AttendanceRecord>, StoreError> {
            self.0.list_records(query).await
        }

        async fn count_records(&self, query: &RecordQuery) -> Result<u64, StoreError> {
            self.0.count_records(query).await
        }
    }

    #[actix_web::test]
    async fn check_out_losing_the_write_keeps_the_first() {
        let store = Arc::new(StaleReadStore(MemoryStore::new()));
        let svc = AttendanceService::new(store.clone(), AttendancePolicy::default());

        svc.record_check_in(1, at(9, 0)).await.unwrap();
        svc.record_check_out(1, at(17, 0)).await.unwrap();

        let late = svc.record_check_out(1, at(19, 0)).await;
        assert!(matches!(late, Err(AttendanceError::AlreadyCheckedOut)));

        let stored = store
            .0
            .find_record(1, at(0, 0).date_naive())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.check_out_time, Some(at(17, 0)));
        assert_eq!(stored.total_hours, 8.0);
    }

    #[actix_web::test]
    async fn missing_record_is_an_explicit_absence() {
        let svc = service();
        let date = at(0, 0).date_naive();

        let day = svc.day_attendance(5, date).await.unwrap();
        assert_eq!(day, DayAttendance::absent(5, date));
        assert_eq!(day.status(), AttendanceStatus::Absent);
    }

    #[actix_web::test]
    async fn today_uses_office_local_date() {
        let policy = AttendancePolicy {
            utc_offset: chrono::FixedOffset::west_opt(5 * 3600).unwrap(),
            ..AttendancePolicy::default()
        };
        let svc = AttendanceService::new(Arc::new(MemoryStore::new()), policy);

        // 02:00 UTC on the 2nd is 21:00 on the 1st at -05:00
        let record = svc.record_check_in(1, at(2, 0)).await.unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(record.status, AttendanceStatus::Late);

        let today = svc.today(1, at(3, 0)).await.unwrap();
        assert!(matches!(today, DayAttendance::Recorded(_)));
    }

    struct BrokenStore;

    #[async_trait]
    impl AttendanceStore for BrokenStore {
        async fn find_record(
            &self,
            _employee_id: u64,
            _date: NaiveDate,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn record_check_in(
            &self,
            _employee_id: u64,
            _date: NaiveDate,
            _check_in: DateTime<Utc>,
            _status: AttendanceStatus,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn record_check_out(
            &self,
            _employee_id: u64,
            _date: NaiveDate,
            _check_out: DateTime<Utc>,
            _total_hours: f64,
            _status: AttendanceStatus,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn list_records(
            &self,
            _query: &RecordQuery,
        ) -> Result<Vec<AttendanceRecord>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn count_records(&self, _query: &RecordQuery) -> Result<u64, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    #[actix_web::test]
    async fn store_failures_are_not_mapped_to_domain_errors() {
        let svc = AttendanceService::new(Arc::new(BrokenStore), AttendancePolicy::default());

        assert!(matches!(
            svc.record_check_in(1, at(9, 0)).await,
            Err(AttendanceError::Store(_))
        ));
        assert!(matches!(
            svc.record_check_out(1, at(18, 0)).await,
            Err(AttendanceError::Store(_))
        ));
    }
}
