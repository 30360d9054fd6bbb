use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

/// Registered user row. Every user is also an employee that can check in.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    /// argon2 PHC string
    #[serde(skip_serializing)]
    pub password: String,
    pub role_id: u8,
    pub employee_code: String,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a user; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub employee_code: String,
    pub department: Option<String>,
}

/// Public view of a user, safe to return to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 7,
    "name": "Jane Doe",
    "email": "jane.doe@company.com",
    "role": "employee",
    "employee_code": "EMP007",
    "department": "Engineering"
}))]
pub struct UserProfile {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub employee_code: String,
    pub department: Option<String>,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        Role::from_id(self.role_id)
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role().unwrap_or_default(),
            employee_code: self.employee_code.clone(),
            department: self.department.clone(),
        }
    }
}
