use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::user::User;

/// Employee details attached to attendance rows in manager views and exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 7,
    "name": "Jane Doe",
    "employee_code": "EMP007",
    "department": "Engineering"
}))]
pub struct EmployeeSummary {
    pub id: u64,
    pub name: String,
    pub employee_code: String,
    pub department: Option<String>,
}

impl From<&User> for EmployeeSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            employee_code: user.employee_code.clone(),
            department: user.department.clone(),
        }
    }
}
