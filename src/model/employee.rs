use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Balance granted to every new profile, and assumed when a stored profile has none.
pub const DEFAULT_LEAVE_AMOUNT: i64 = 15;

fn default_leave_amount() -> i64 {
    DEFAULT_LEAVE_AMOUNT
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserType {
    Employee,
    Admin,
}

/// Employee profile, keyed by `uid`.
///
/// `leave_amount` is signed and has no floor. It only moves through
/// [`crate::store::LeaveStore::increment_leave_amount`] or a store operation
/// that commits a debit together with an approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "uid": "0b9d6f0e-3f1c-4a53-9c55-2d1f3f8d7a10",
    "name": "Jane Doe",
    "email": "jane@company.com",
    "userType": "employee",
    "leaveAmount": 15,
    "createdAt": "2026-01-01T00:00:00Z"
}))]
pub struct Employee {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub user_type: UserType,
    #[serde(default = "default_leave_amount")]
    pub leave_amount: i64,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl Employee {
    pub fn new(uid: String, name: String, email: String, user_type: UserType) -> Self {
        Self {
            uid,
            name,
            email,
            user_type,
            leave_amount: DEFAULT_LEAVE_AMOUNT,
            created_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }

    /// Name recorded on a request snapshot, falling back when the profile has none.
    pub fn display_name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        let name = self.name.trim();
        if name.is_empty() { fallback } else { name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_leave_amount_reads_as_default() {
        let employee: Employee = serde_json::from_value(serde_json::json!({
            "uid": "u1",
            "name": "Jane",
            "email": "jane@company.com",
            "userType": "employee",
            "createdAt": "2026-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(employee.leave_amount, DEFAULT_LEAVE_AMOUNT);
    }

    #[test]
    fn user_type_round_trips_through_strum() {
        assert_eq!("admin".parse::<UserType>().unwrap(), UserType::Admin);
        assert_eq!(UserType::Employee.as_ref(), "employee");
        assert!("manager".parse::<UserType>().is_err());
    }

    #[test]
    fn blank_name_uses_fallback() {
        let mut employee = Employee::new("u1".into(), "  ".into(), "a@b.c".into(), UserType::Admin);
        assert_eq!(employee.display_name_or("Admin"), "Admin");
        employee.name = "Root".into();
        assert_eq!(employee.display_name_or("Admin"), "Root");
    }
}
