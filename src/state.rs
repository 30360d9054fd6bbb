use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::attendance::{AttendancePolicy, AttendanceService};
use crate::store::{AttendanceStore, MemoryStore, UserStore};

/// Source of "now" for request handlers.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct AppState {
    pub attendance: AttendanceService,
    pub records: Arc<dyn AttendanceStore>,
    pub users: Arc<dyn UserStore>,
    clock: Clock,
}

impl AppState {
    pub fn new(
        records: Arc<dyn AttendanceStore>,
        users: Arc<dyn UserStore>,
        policy: AttendancePolicy,
    ) -> Self {
        Self {
            attendance: AttendanceService::new(records.clone(), policy),
            records,
            users,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn in_memory(policy: AttendancePolicy) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store, policy)
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Today's date in office local time.
    pub fn today(&self) -> NaiveDate {
        self.attendance.policy().local_date(self.now())
    }
}
