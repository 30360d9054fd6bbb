use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::role::Role;
use crate::model::user::{NewUser, User};
use crate::store::{AttendanceStore, RecordQuery, StoreError, UserStore};

struct RefreshToken {
    user_id: u64,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

#[derive(Default)]
struct Inner {
    next_record_id: u64,
    records: HashMap<(u64, NaiveDate), AttendanceRecord>,
    next_user_id: u64,
    users: BTreeMap<u64, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
}

/// Process-local store. Each guarded write runs under one write lock, which
/// gives the same at-most-one-writer guarantee as the SQL conditions.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Employee codes match case-insensitively, as under MySQL's default collation.
fn same_code(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn sort_records(records: &mut [AttendanceRecord]) {
    records.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)));
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_record(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let inner = self.inner.read().expect("memory store poisoned");
        Ok(inner.records.get(&(employee_id, date)).cloned())
    }

    async fn record_check_in(
        &self,
        employee_id: u64,
        date: NaiveDate,
        check_in: DateTime<Utc>,
        status: AttendanceStatus,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let mut inner = self.inner.write().expect("memory store poisoned");

        if let Some(existing) = inner.records.get_mut(&(employee_id, date)) {
            if existing.check_in_time.is_some() {
                return Ok(None);
            }
            existing.check_in_time = Some(check_in);
            existing.status = status;
            return Ok(Some(existing.clone()));
        }

        inner.next_record_id += 1;
        let record = AttendanceRecord {
            id: inner.next_record_id,
            employee_id,
            date,
            check_in_time: Some(check_in),
            check_out_time: None,
            status,
            total_hours: 0.0,
        };
        inner.records.insert((employee_id, date), record.clone());
        Ok(Some(record))
    }

    async fn record_check_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        check_out: DateTime<Utc>,
        total_hours: f64,
        status: AttendanceStatus,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let mut inner = self.inner.write().expect("memory store poisoned");

        match inner.records.get_mut(&(employee_id, date)) {
            Some(record) if record.check_in_time.is_some() && record.check_out_time.is_none() => {
                record.check_out_time = Some(check_out);
                record.total_hours = total_hours;
                record.status = status;
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_records(&self, query: &RecordQuery) -> Result<Vec<AttendanceRecord>, StoreError> {
        let inner = self.inner.read().expect("memory store poisoned");
        let mut records: Vec<_> = inner
            .records
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        sort_records(&mut records);

        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(records
            .into_iter()
            .skip(query.offset as usize)
            .take(limit)
            .collect())
    }

    async fn count_records(&self, query: &RecordQuery) -> Result<u64, StoreError> {
        let inner = self.inner.read().expect("memory store poisoned");
        Ok(inner.records.values().filter(|r| query.matches(r)).count() as u64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().expect("memory store poisoned");

        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        if inner
            .users
            .values()
            .any(|u| same_code(&u.employee_code, &user.employee_code))
        {
            return Err(StoreError::Duplicate("employee code"));
        }

        inner.next_user_id += 1;
        let created = User {
            id: inner.next_user_id,
            name: user.name,
            email: user.email,
            password: user.password,
            role_id: user.role.id(),
            employee_code: user.employee_code,
            department: user.department,
            created_at: Utc::now(),
        };
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().expect("memory store poisoned");
        Ok(inner.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().expect("memory store poisoned");
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_employee_code(&self, code: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().expect("memory store poisoned");
        Ok(inner
            .users
            .values()
            .find(|u| same_code(&u.employee_code, code))
            .cloned())
    }

    async fn identity_exists(&self, email: &str, employee_code: &str) -> Result<bool, StoreError> {
        let inner = self.inner.read().expect("memory store poisoned");
        Ok(inner
            .users
            .values()
            .any(|u| u.email == email || same_code(&u.employee_code, employee_code)))
    }

    async fn list_users(
        &self,
        role: Option<Role>,
        department: Option<&str>,
    ) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.read().expect("memory store poisoned");
        Ok(inner
            .users
            .values()
            .filter(|u| role.is_none_or(|r| u.role_id == r.id()))
            .filter(|u| department.is_none_or(|d| u.department.as_deref() == Some(d)))
            .cloned()
            .collect())
    }

    async fn users_by_ids(&self, ids: &[u64]) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.read().expect("memory store poisoned");
        Ok(inner
            .users
            .values()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    /// No login history is kept in memory; only the MySQL cache warmup reads it.
    async fn touch_last_login(&self, _user_id: u64) -> Result<(), StoreError> {
        Ok(())
    }

    async fn save_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().expect("memory store poisoned");
        inner.refresh_tokens.insert(
            jti.to_string(),
            RefreshToken {
                user_id,
                expires_at,
                revoked: false,
            },
        );
        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> Result<Option<u64>, StoreError> {
        let mut inner = self.inner.write().expect("memory store poisoned");
        match inner.refresh_tokens.get_mut(jti) {
            Some(token) if !token.revoked && token.expires_at > Utc::now() => {
                token.revoked = true;
                Ok(Some(token.user_id))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn new_user(email: &str, code: &str, role: Role, department: Option<&str>) -> NewUser {
        NewUser {
            name: format!("User {code}"),
            email: email.into(),
            password: "hash".into(),
            role,
            employee_code: code.into(),
            department: department.map(Into::into),
        }
    }

    #[actix_web::test]
    async fn check_in_is_written_at_most_once() {
        let store = MemoryStore::new();

        let first = store
            .record_check_in(1, day(), at(9, 0), AttendanceStatus::Present)
            .await
            .unwrap();
        let second = store
            .record_check_in(1, day(), at(9, 5), AttendanceStatus::Present)
            .await
            .unwrap();

        assert_eq!(first.unwrap().check_in_time, Some(at(9, 0)));
        assert!(second.is_none());
        let stored = store.find_record(1, day()).await.unwrap().unwrap();
        assert_eq!(stored.check_in_time, Some(at(9, 0)));
    }

    #[actix_web::test]
    async fn check_out_requires_open_record() {
        let store = MemoryStore::new();

        let missing = store
            .record_check_out(1, day(), at(18, 0), 9.0, AttendanceStatus::Present)
            .await
            .unwrap();
        assert!(missing.is_none());

        store
            .record_check_in(1, day(), at(9, 0), AttendanceStatus::Present)
            .await
            .unwrap();
        let closed = store
            .record_check_out(1, day(), at(18, 0), 9.0, AttendanceStatus::Present)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed.total_hours, 9.0);

        let again = store
            .record_check_out(1, day(), at(19, 0), 10.0, AttendanceStatus::Present)
            .await
            .unwrap();
        assert!(again.is_none());
        let stored = store.find_record(1, day()).await.unwrap().unwrap();
        assert_eq!(stored.check_out_time, Some(at(18, 0)));
    }

    #[actix_web::test]
    async fn listing_filters_sorts_and_pages() {
        let store = MemoryStore::new();
        for (employee, offset) in [(1, 0), (1, 1), (2, 0), (1, 2)] {
            let date = day() - Duration::days(offset);
            store
                .record_check_in(
                    employee,
                    date,
                    at(9, 0) - Duration::days(offset),
                    AttendanceStatus::Late,
                )
                .await
                .unwrap();
        }

        let query = RecordQuery::for_employee(1);
        let all = store.list_records(&query).await.unwrap();
        let dates: Vec<_> = all.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![day(), day() - Duration::days(1), day() - Duration::days(2)]
        );
        assert_eq!(store.count_records(&query).await.unwrap(), 3);

        let page = RecordQuery {
            offset: 1,
            ..RecordQuery::for_employee(1).limit(1)
        };
        let paged = store.list_records(&page).await.unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].date, day() - Duration::days(1));

        let on_day = store
            .list_records(&RecordQuery::default().on(day()))
            .await
            .unwrap();
        assert_eq!(on_day.len(), 2);
    }

    #[actix_web::test]
    async fn users_are_unique_by_email_and_code() {
        let store = MemoryStore::new();
        store
            .create_user(new_user("a@x.io", "E1", Role::Employee, Some("Sales")))
            .await
            .unwrap();

        let same_email = store
            .create_user(new_user("a@x.io", "E2", Role::Employee, None))
            .await;
        assert!(matches!(same_email, Err(StoreError::Duplicate("email"))));

        let dup_code = store
            .create_user(new_user("b@x.io", "E1", Role::Employee, None))
            .await;
        assert!(matches!(
            dup_code,
            Err(StoreError::Duplicate("employee code"))
        ));

        assert!(store.identity_exists("a@x.io", "nope").await.unwrap());
        assert!(store.identity_exists("nope", "E1").await.unwrap());
        assert!(!store.identity_exists("c@x.io", "E3").await.unwrap());
    }

    #[actix_web::test]
    async fn employee_codes_ignore_case() {
        let store = MemoryStore::new();
        let created = store
            .create_user(new_user("case@x.io", "EMP1", Role::Employee, None))
            .await
            .unwrap();

        let lower = store
            .create_user(new_user("other@x.io", "emp1", Role::Employee, None))
            .await;
        assert!(matches!(lower, Err(StoreError::Duplicate("employee code"))));

        let found = store.find_by_employee_code("emp1").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.employee_code, "EMP1");
        assert!(store.identity_exists("nope", "Emp1").await.unwrap());
    }

    #[actix_web::test]
    async fn lists_users_by_role_and_department() {
        let store = MemoryStore::new();
        store
            .create_user(new_user("m@x.io", "M1", Role::Manager, Some("Sales")))
            .await
            .unwrap();
        store
            .create_user(new_user("a@x.io", "E1", Role::Employee, Some("Sales")))
            .await
            .unwrap();
        store
            .create_user(new_user("b@x.io", "E2", Role::Employee, Some("Support")))
            .await
            .unwrap();

        let employees = store.list_users(Some(Role::Employee), None).await.unwrap();
        assert_eq!(employees.len(), 2);

        let sales = store.list_users(None, Some("Sales")).await.unwrap();
        let codes: Vec<_> = sales.iter().map(|u| u.employee_code.as_str()).collect();
        assert_eq!(codes, vec!["M1", "E1"]);
    }

    #[actix_web::test]
    async fn refresh_tokens_revoke_once() {
        let store = MemoryStore::new();
        store
            .save_refresh_token(4, "jti-1", Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        store
            .save_refresh_token(4, "jti-old", Utc::now() - Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(store.revoke_refresh_token("jti-1").await.unwrap(), Some(4));
        assert_eq!(store.revoke_refresh_token("jti-1").await.unwrap(), None);
        assert_eq!(store.revoke_refresh_token("jti-old").await.unwrap(), None);
        assert_eq!(store.revoke_refresh_token("unknown").await.unwrap(), None);
    }
}
