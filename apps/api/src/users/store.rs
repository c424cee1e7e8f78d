use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::user::{Role, UserRow};
use crate::offers::store::LabelCount;
use crate::pagination::Page;

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub role: Role,
    pub title: &'a str,
    pub company: &'a str,
    pub location: &'a str,
    pub phone: &'a str,
}

/// Editable profile fields. Email, password and role are never touched here.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub portfolio: Option<String>,
    pub about: Option<String>,
    pub skills: Option<Vec<String>>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct UserStats {
    pub offers_published: i64,
    pub applications_received: i64,
    pub applications_sent: i64,
}

/// Platform-wide counters for the admin dashboard.
#[derive(Debug, Serialize)]
pub struct PlatformStats {
    pub users_total: i64,
    pub users_by_role: Vec<LabelCount>,
    /// Users who logged in during the last 30 days.
    pub users_active_30d: i64,
    /// Oldest month first, always `SIGNUP_MONTHS` entries.
    pub signups_per_month: Vec<LabelCount>,
    pub offers_total: i64,
    pub offers_open: i64,
    pub applications_total: i64,
    pub applications_by_status: Vec<LabelCount>,
    pub talent_requests_total: i64,
    pub matches_total: i64,
    pub matches_by_status: Vec<LabelCount>,
    pub average_match_score: f64,
}

pub const SIGNUP_MONTHS: u32 = 12;

pub async fn insert_user(pool: &PgPool, user: NewUser<'_>) -> Result<UserRow, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, role, title, company, location, phone)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.email.trim().to_lowercase())
    .bind(user.password_hash)
    .bind(user.first_name.trim())
    .bind(user.last_name.trim())
    .bind(user.role.as_str())
    .bind(user.title)
    .bind(user.company)
    .bind(user.location)
    .bind(user.phone)
    .fetch_one(pool)
    .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn touch_last_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
        .bind(id)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    update: &ProfileUpdate,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE users SET
            first_name = COALESCE($2, first_name),
            last_name  = COALESCE($3, last_name),
            title      = COALESCE($4, title),
            company    = COALESCE($5, company),
            location   = COALESCE($6, location),
            phone      = COALESCE($7, phone),
            linkedin   = COALESCE($8, linkedin),
            github     = COALESCE($9, github),
            portfolio  = COALESCE($10, portfolio),
            about      = COALESCE($11, about),
            skills     = COALESCE($12, skills)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(update.first_name.as_deref())
    .bind(update.last_name.as_deref())
    .bind(update.title.as_deref())
    .bind(update.company.as_deref())
    .bind(update.location.as_deref())
    .bind(update.phone.as_deref())
    .bind(update.linkedin.as_deref())
    .bind(update.github.as_deref())
    .bind(update.portfolio.as_deref())
    .bind(update.about.as_deref())
    .bind(update.skills.clone())
    .fetch_optional(pool)
    .await
}

pub async fn set_cv_key(pool: &PgPool, id: Uuid, key: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET cv_key = $2 WHERE id = $1")
        .bind(id)
        .bind(key)
        .execute(pool)
        .await?;
    Ok(())
}

/// Admin listing with an optional ILIKE search over name and email.
pub async fn list_users(
    pool: &PgPool,
    search: Option<&str>,
    role: Option<Role>,
    page: Page,
) -> Result<(Vec<UserRow>, i64), sqlx::Error> {
    let pattern = search.map(|s| format!("%{}%", s.trim()));
    let role = role.map(|r| r.as_str());

    let rows: Vec<UserRow> = sqlx::query_as(
        r#"
        SELECT * FROM users
        WHERE ($1::text IS NULL OR email ILIKE $1 OR first_name ILIKE $1 OR last_name ILIKE $1)
          AND ($2::text IS NULL OR role = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(pattern.as_deref())
    .bind(role)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM users
        WHERE ($1::text IS NULL OR email ILIKE $1 OR first_name ILIKE $1 OR last_name ILIKE $1)
          AND ($2::text IS NULL OR role = $2)
        "#,
    )
    .bind(pattern.as_deref())
    .bind(role)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

pub async fn user_stats(pool: &PgPool, id: Uuid) -> Result<UserStats, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM offers WHERE recruiter_id = $1) AS offers_published,
            (SELECT COUNT(*) FROM applications a JOIN offers o ON o.id = a.offer_id
              WHERE o.recruiter_id = $1) AS applications_received,
            (SELECT COUNT(*) FROM applications WHERE candidate_id = $1) AS applications_sent
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn platform_stats(pool: &PgPool) -> Result<PlatformStats, sqlx::Error> {
    let (users_total, users_active_30d): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE last_login_at >= NOW() - INTERVAL '30 days')
        FROM users
        "#,
    )
    .fetch_one(pool)
    .await?;

    let users_by_role = sqlx::query_as(
        "SELECT role AS label, COUNT(*) AS count FROM users GROUP BY role ORDER BY count DESC, role",
    )
    .fetch_all(pool)
    .await?;

    let signups: Vec<LabelCount> = sqlx::query_as(
        r#"
        SELECT to_char(date_trunc('month', created_at), 'YYYY-MM') AS label, COUNT(*) AS count
        FROM users
        WHERE created_at >= date_trunc('month', NOW()) - INTERVAL '11 months'
        GROUP BY 1 ORDER BY 1
        "#,
    )
    .fetch_all(pool)
    .await?;

    let (offers_total, offers_open, applications_total, talent_requests_total): (i64, i64, i64, i64) =
        sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM offers),
                (SELECT COUNT(*) FROM offers WHERE status = 'open'),
                (SELECT COUNT(*) FROM applications),
                (SELECT COUNT(*) FROM talent_requests)
            "#,
        )
        .fetch_one(pool)
        .await?;

    let applications_by_status = sqlx::query_as(
        "SELECT status AS label, COUNT(*) AS count FROM applications GROUP BY status ORDER BY count DESC, status",
    )
    .fetch_all(pool)
    .await?;

    let (matches_total, average_match_score): (i64, f64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(AVG(match_score), 0)::float8 FROM match_results",
    )
    .fetch_one(pool)
    .await?;

    let matches_by_status = sqlx::query_as(
        "SELECT status AS label, COUNT(*) AS count FROM match_results GROUP BY status ORDER BY count DESC, status",
    )
    .fetch_all(pool)
    .await?;

    Ok(PlatformStats {
        users_total,
        users_by_role,
        users_active_30d,
        signups_per_month: fill_months(signups, Utc::now().date_naive(), SIGNUP_MONTHS),
        offers_total,
        offers_open,
        applications_total,
        applications_by_status,
        talent_requests_total,
        matches_total,
        matches_by_status,
        average_match_score,
    })
}

/// One `YYYY-MM` bucket per month ending with `today`'s month; months without
/// rows count zero.
pub fn fill_months(rows: Vec<LabelCount>, today: NaiveDate, months: u32) -> Vec<LabelCount> {
    let current = today.year() * 12 + today.month0() as i32;
    (0..months as i32)
        .rev()
        .map(|back| {
            let index = current - back;
            let label = format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1);
            let count = rows
                .iter()
                .find(|row| row.label == label)
                .map_or(0, |row| row.count);
            LabelCount { label, count }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_months_spans_year_boundary() {
        let rows = vec![
            LabelCount {
                label: "2024-01".into(),
                count: 4,
            },
            LabelCount {
                label: "2023-11".into(),
                count: 2,
            },
        ];
        let today = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        let filled = fill_months(rows, today, SIGNUP_MONTHS);

        assert_eq!(filled.len(), 12);
        assert_eq!(filled.first().unwrap().label, "2023-03");
        assert_eq!(filled.last().unwrap().label, "2024-02");
        let counts: Vec<i64> = filled.iter().map(|m| m.count).collect();
        assert_eq!(counts, vec![0, 0, 0, 0, 0, 0, 0, 0, 2, 0, 4, 0]);
    }
}
