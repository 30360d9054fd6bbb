use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlArguments;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::MySql;
use tracing::debug;

use crate::db::is_unique_violation;
use crate::model::attendance::{AttendanceRecord, AttendanceRow, AttendanceStatus};
use crate::model::role::Role;
use crate::model::user::{NewUser, User};
use crate::store::{AttendanceStore, RecordQuery, StoreError, UserStore};

const RECORD_COLUMNS: &str =
    "id, employee_id, date, check_in_time, check_out_time, status, total_hours";

const USER_COLUMNS: &str = "id, name, email, password, role_id, employee_code, department, created_at";

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

// Helper enum for typed SQLx binding
#[derive(Debug)]
enum FilterValue {
    U64(u64),
    Date(NaiveDate),
    Str(&'static str),
}

struct WhereClause {
    sql: String,
    values: Vec<FilterValue>,
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn build_where(query: &RecordQuery) -> WhereClause {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(ids) = &query.employee_ids {
        if ids.is_empty() {
            conditions.push("1 = 0".to_string());
        } else {
            conditions.push(format!("employee_id IN ({})", placeholders(ids.len())));
            values.extend(ids.iter().map(|id| FilterValue::U64(*id)));
        }
    }

    if let Some(date) = query.date {
        conditions.push("date = ?".to_string());
        values.push(FilterValue::Date(date));
    }

    if let Some(from) = query.from {
        conditions.push("date >= ?".to_string());
        values.push(FilterValue::Date(from));
    }

    if let Some(to) = query.to {
        conditions.push("date <= ?".to_string());
        values.push(FilterValue::Date(to));
    }

    if let Some(statuses) = &query.statuses {
        if statuses.is_empty() {
            conditions.push("1 = 0".to_string());
        } else {
            conditions.push(format!("status IN ({})", placeholders(statuses.len())));
            values.extend(statuses.iter().map(|s| FilterValue::Str(s.as_str())));
        }
    }

    let sql = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    WhereClause { sql, values }
}

fn bind_rows<'q, O>(
    mut query: QueryAs<'q, MySql, O, MySqlArguments>,
    values: &[FilterValue],
) -> QueryAs<'q, MySql, O, MySqlArguments> {
    for value in values {
        query = match value {
            FilterValue::U64(v) => query.bind(*v),
            FilterValue::Date(v) => query.bind(*v),
            FilterValue::Str(v) => query.bind(*v),
        };
    }
    query
}

fn bind_scalar<'q, O>(
    mut query: QueryScalar<'q, MySql, O, MySqlArguments>,
    values: &[FilterValue],
) -> QueryScalar<'q, MySql, O, MySqlArguments> {
    for value in values {
        query = match value {
            FilterValue::U64(v) => query.bind(*v),
            FilterValue::Date(v) => query.bind(*v),
            FilterValue::Str(v) => query.bind(*v),
        };
    }
    query
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn find_record(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM attendance WHERE employee_id = ? AND date = ?",
            RECORD_COLUMNS
        );

        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(AttendanceRecord::try_from).transpose()?)
    }

    async fn record_check_in(
        &self,
        employee_id: u64,
        date: NaiveDate,
        check_in: DateTime<Utc>,
        status: AttendanceStatus,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        // A row without a check-in is claimed in place.
        let claimed = sqlx::query(
            r#"
            UPDATE attendance
            SET check_in_time = ?, status = ?
            WHERE employee_id = ?
            AND date = ?
            AND check_in_time IS NULL
            "#,
        )
        .bind(check_in)
        .bind(status.as_str())
        .bind(employee_id)
        .bind(date)
        .execute(&self.pool)
        .await?;

        if claimed.rows_affected() == 0 {
            let inserted = sqlx::query(
                r#"
                INSERT INTO attendance (employee_id, date, check_in_time, status, total_hours)
                VALUES (?, ?, ?, ?, 0)
                "#,
            )
            .bind(employee_id)
            .bind(date)
            .bind(check_in)
            .bind(status.as_str())
            .execute(&self.pool)
            .await;

            match inserted {
                Ok(_) => {}
                // The unique (employee_id, date) key rejects a second check-in
                Err(e) if is_unique_violation(&e) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }

        self.find_record(employee_id, date).await
    }

    async fn record_check_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        check_out: DateTime<Utc>,
        total_hours: f64,
        status: AttendanceStatus,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out_time = ?, total_hours = ?, status = ?
            WHERE employee_id = ?
            AND date = ?
            AND check_in_time IS NOT NULL
            AND check_out_time IS NULL
            "#,
        )
        .bind(check_out)
        .bind(total_hours)
        .bind(status.as_str())
        .bind(employee_id)
        .bind(date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_record(employee_id, date).await
    }

    async fn list_records(&self, query: &RecordQuery) -> Result<Vec<AttendanceRecord>, StoreError> {
        let clause = build_where(query);
        let mut sql = format!(
            "SELECT {} FROM attendance {} ORDER BY date DESC, id ASC",
            RECORD_COLUMNS, clause.sql
        );
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, query.offset));
        }
        debug!(sql = %sql, bindings = ?clause.values, "Listing attendance");

        let rows = bind_rows(sqlx::query_as::<_, AttendanceRow>(&sql), &clause.values)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| AttendanceRecord::try_from(row).map_err(StoreError::from))
            .collect()
    }

    async fn count_records(&self, query: &RecordQuery) -> Result<u64, StoreError> {
        let clause = build_where(query);
        let sql = format!("SELECT COUNT(*) FROM attendance {}", clause.sql);
        debug!(sql = %sql, bindings = ?clause.values, "Counting attendance");

        let total = bind_scalar(sqlx::query_scalar::<_, i64>(&sql), &clause.values)
            .fetch_one(&self.pool)
            .await?;

        Ok(total.max(0) as u64)
    }
}

#[async_trait]
impl UserStore for MySqlStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password, role_id, employee_code, department, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.role.id())
        .bind(&user.employee_code)
        .bind(&user.department)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_id(),
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::Duplicate("email or employee code"));
            }
            Err(e) => return Err(e.into()),
        };

        self.find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("user {} vanished after insert", id)))
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_employee_code(&self, code: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE employee_code = ?", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn identity_exists(&self, email: &str, employee_code: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? OR employee_code = ? LIMIT 1)",
        )
        .bind(email)
        .bind(employee_code)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_users(
        &self,
        role: Option<Role>,
        department: Option<&str>,
    ) -> Result<Vec<User>, StoreError> {
        let mut conditions = Vec::new();
        if role.is_some() {
            conditions.push("role_id = ?");
        }
        if department.is_some() {
            conditions.push("department = ?");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!("SELECT {} FROM users {} ORDER BY id", USER_COLUMNS, where_clause);

        let mut query = sqlx::query_as::<_, User>(&sql);
        if let Some(role) = role {
            query = query.bind(role.id());
        }
        if let Some(department) = department {
            query = query.bind(department);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn users_by_ids(&self, ids: &[u64]) -> Result<Vec<User>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM users WHERE id IN ({}) ORDER BY id",
            USER_COLUMNS,
            placeholders(ids.len())
        );

        let mut query = sqlx::query_as::<_, User>(&sql);
        for id in ids {
            query = query.bind(*id);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn touch_last_login(&self, user_id: u64) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, jti, expires_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> Result<Option<u64>, StoreError> {
        let owner = sqlx::query_scalar::<_, u64>("SELECT user_id FROM refresh_tokens WHERE jti = ?")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await?;

        let Some(user_id) = owner else {
            return Ok(None);
        };

        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE jti = ?
            AND revoked = FALSE
            AND expires_at > ?
            "#,
        )
        .bind(jti)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok((result.rows_affected() == 1).then_some(user_id))
    }
}
