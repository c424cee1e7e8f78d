use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Candidate,
    Recruiter,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Candidate => "candidate",
            Role::Recruiter => "recruiter",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "candidate" => Some(Role::Candidate),
            "recruiter" => Some(Role::Recruiter),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub phone: String,
    pub linkedin: String,
    pub github: String,
    pub portfolio: String,
    pub about: String,
    pub skills: Vec<String>,
    pub cv_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Account as returned over the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub phone: String,
    pub linkedin: String,
    pub github: String,
    pub portfolio: String,
    pub about: String,
    pub skills: Vec<String>,
    pub cv_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for PublicUser {
    fn from(row: UserRow) -> Self {
        PublicUser {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            role: row.role,
            title: row.title,
            company: row.company,
            location: row.location,
            phone: row.phone,
            linkedin: row.linkedin,
            github: row.github,
            portfolio: row.portfolio,
            about: row.about,
            skills: row.skills,
            cv_key: row.cv_key,
            created_at: row.created_at,
            last_login_at: row.last_login_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::Candidate, Role::Recruiter, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }
}
