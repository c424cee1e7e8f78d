use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::matching::types::Requirement;
use crate::models::offer::{
    ApplicationRow, ApplicationStatus, ApplicationWithOffer, OfferRow, OfferWithCount,
};
use crate::pagination::Page;

#[derive(Debug, Clone, Deserialize)]
pub struct OfferInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub location: String,
    pub country: Option<String>,
    pub city: Option<String>,
    #[serde(default = "default_remote_type")]
    pub remote_type: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    pub domain: Option<String>,
    pub requirement: Option<Requirement>,
}

fn default_remote_type() -> String {
    "on_site".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<String>,
    pub location: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub remote_type: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub domain: Option<String>,
    pub requirement: Option<Requirement>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct OfferStats {
    pub total: i64,
    pub open: i64,
    pub by_kind: Vec<LabelCount>,
    pub top_technologies: Vec<LabelCount>,
    pub top_locations: Vec<LabelCount>,
    pub per_month: Vec<LabelCount>,
}

pub async fn insert_offer(pool: &PgPool, recruiter_id: Uuid, input: &OfferInput) -> Result<OfferRow, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO offers
            (id, recruiter_id, title, description, kind, location, country, city,
             remote_type, technologies, domain, requirement)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(recruiter_id)
    .bind(input.title.trim())
    .bind(&input.description)
    .bind(&input.kind)
    .bind(&input.location)
    .bind(input.country.as_deref())
    .bind(input.city.as_deref())
    .bind(&input.remote_type)
    .bind(&input.technologies)
    .bind(input.domain.as_deref())
    .bind(input.requirement.as_ref().map(Json))
    .fetch_one(pool)
    .await
}

pub async fn find_offer(pool: &PgPool, id: Uuid) -> Result<Option<OfferRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM offers WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn update_offer(pool: &PgPool, id: Uuid, patch: &OfferPatch) -> Result<OfferRow, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE offers SET
            title        = COALESCE($2, title),
            description  = COALESCE($3, description),
            kind         = COALESCE($4, kind),
            location     = COALESCE($5, location),
            country      = COALESCE($6, country),
            city         = COALESCE($7, city),
            remote_type  = COALESCE($8, remote_type),
            technologies = COALESCE($9, technologies),
            domain       = COALESCE($10, domain),
            requirement  = COALESCE($11, requirement),
            status       = COALESCE($12, status),
            updated_at   = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(patch.title.as_deref())
    .bind(patch.description.as_deref())
    .bind(patch.kind.as_deref())
    .bind(patch.location.as_deref())
    .bind(patch.country.as_deref())
    .bind(patch.city.as_deref())
    .bind(patch.remote_type.as_deref())
    .bind(patch.technologies.clone())
    .bind(patch.domain.as_deref())
    .bind(patch.requirement.as_ref().map(Json))
    .bind(patch.status.as_deref())
    .fetch_one(pool)
    .await
}

pub async fn delete_offer(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM offers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Newest first. `search` matches kind, location or any technology.
pub async fn list_offers(
    pool: &PgPool,
    search: Option<&str>,
    status: Option<&str>,
    page: Page,
) -> Result<(Vec<OfferRow>, i64), sqlx::Error> {
    let pattern = search.map(|s| format!("%{}%", s.trim()));

    let rows = sqlx::query_as(
        r#"
        SELECT * FROM offers
        WHERE ($1::text IS NULL
               OR title ILIKE $1 OR kind ILIKE $1 OR location ILIKE $1
               OR array_to_string(technologies, ' ') ILIKE $1)
          AND ($2::text IS NULL OR status = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(pattern.as_deref())
    .bind(status)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM offers
        WHERE ($1::text IS NULL
               OR title ILIKE $1 OR kind ILIKE $1 OR location ILIKE $1
               OR array_to_string(technologies, ' ') ILIKE $1)
          AND ($2::text IS NULL OR status = $2)
        "#,
    )
    .bind(pattern.as_deref())
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

pub async fn list_recruiter_offers(pool: &PgPool, recruiter_id: Uuid) -> Result<Vec<OfferWithCount>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT o.*, (SELECT COUNT(*) FROM applications a WHERE a.offer_id = o.id) AS application_count
        FROM offers o
        WHERE o.recruiter_id = $1
        ORDER BY o.created_at DESC
        "#,
    )
    .bind(recruiter_id)
    .fetch_all(pool)
    .await
}

/// Open offers the candidate has not applied to, newest first.
pub async fn open_offers_not_applied(
    pool: &PgPool,
    candidate_id: Uuid,
    limit: i64,
) -> Result<Vec<OfferRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT o.* FROM offers o
        WHERE o.status = 'open'
          AND NOT EXISTS (
              SELECT 1 FROM applications a WHERE a.offer_id = o.id AND a.candidate_id = $1
          )
        ORDER BY o.created_at DESC
        LIMIT $2
        "#,
    )
    .bind(candidate_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

// ────────────────────────────────────────────────────────────────────────────
// Applications
// ────────────────────────────────────────────────────────────────────────────

pub async fn insert_application(
    pool: &PgPool,
    offer_id: Uuid,
    candidate_id: Uuid,
    snapshot: &Value,
) -> Result<ApplicationRow, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO applications (id, offer_id, candidate_id, profile_snapshot)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(offer_id)
    .bind(candidate_id)
    .bind(snapshot)
    .fetch_one(pool)
    .await
}

pub async fn find_application(pool: &PgPool, id: Uuid) -> Result<Option<ApplicationRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM applications WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn set_application_status(
    pool: &PgPool,
    id: Uuid,
    status: ApplicationStatus,
) -> Result<ApplicationRow, sqlx::Error> {
    sqlx::query_as("UPDATE applications SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(status.as_str())
        .fetch_one(pool)
        .await
}

pub async fn list_candidate_applications(
    pool: &PgPool,
    candidate_id: Uuid,
) -> Result<Vec<ApplicationWithOffer>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT a.*, o.title AS offer_title, o.kind AS offer_kind
        FROM applications a
        JOIN offers o ON o.id = a.offer_id
        WHERE a.candidate_id = $1
        ORDER BY a.created_at DESC
        "#,
    )
    .bind(candidate_id)
    .fetch_all(pool)
    .await
}

pub async fn list_offer_applications(pool: &PgPool, offer_id: Uuid) -> Result<Vec<ApplicationRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM applications WHERE offer_id = $1 ORDER BY created_at DESC")
        .bind(offer_id)
        .fetch_all(pool)
        .await
}

// ────────────────────────────────────────────────────────────────────────────
// Dashboard
// ────────────────────────────────────────────────────────────────────────────

pub async fn offer_stats(pool: &PgPool) -> Result<OfferStats, sqlx::Error> {
    let (total, open): (i64, i64) =
        sqlx::query_as("SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'open') FROM offers")
            .fetch_one(pool)
            .await?;

    let by_kind = sqlx::query_as(
        r#"
        SELECT COALESCE(NULLIF(kind, ''), 'unspecified') AS label, COUNT(*) AS count
        FROM offers GROUP BY 1 ORDER BY count DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let top_technologies = sqlx::query_as(
        r#"
        SELECT t AS label, COUNT(*) AS count
        FROM offers, unnest(technologies) AS t
        GROUP BY t ORDER BY count DESC, t LIMIT 10
        "#,
    )
    .fetch_all(pool)
    .await?;

    let top_locations = sqlx::query_as(
        r#"
        SELECT location AS label, COUNT(*) AS count
        FROM offers WHERE location <> ''
        GROUP BY location ORDER BY count DESC, location LIMIT 10
        "#,
    )
    .fetch_all(pool)
    .await?;

    let per_month = sqlx::query_as(
        r#"
        SELECT to_char(date_trunc('month', created_at), 'YYYY-MM') AS label, COUNT(*) AS count
        FROM offers
        WHERE created_at >= date_trunc('month', NOW()) - INTERVAL '11 months'
        GROUP BY 1 ORDER BY 1
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(OfferStats {
        total,
        open,
        by_kind,
        top_technologies,
        top_locations,
        per_month,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    use crate::marketplace::store::{upsert_profile, TalentProfileInput};
    use crate::matching::scorer::compute_match;
    use crate::matching::store::{find_match, upsert_match};
    use crate::matching::types::Profile;
    use crate::matching::weights::MatchWeights;
    use crate::models::matching::RequirementKind;
    use crate::models::user::Role;
    use crate::users::store::{insert_user, NewUser};

    async fn user(pool: &PgPool, email: &str, role: Role) -> Uuid {
        insert_user(
            pool,
            NewUser {
                email,
                password_hash: "hash",
                first_name: "Mariama",
                last_name: "Bah",
                role,
                title: "",
                company: "",
                location: "",
                phone: "",
            },
        )
        .await
        .unwrap()
        .id
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_deleting_offer_removes_its_matches(pool: PgPool) {
        let recruiter = user(&pool, "recruiter@example.com", Role::Recruiter).await;
        let candidate = user(&pool, "candidate@example.com", Role::Candidate).await;

        let profile_input: TalentProfileInput =
            serde_json::from_value(json!({ "title": "Rust developer" })).unwrap();
        let profile = upsert_profile(&pool, candidate, &profile_input).await.unwrap();

        let offer_input: OfferInput =
            serde_json::from_value(json!({ "title": "Backend developer" })).unwrap();
        let offer = insert_offer(&pool, recruiter, &offer_input).await.unwrap();

        let outcome = compute_match(
            &Profile::default(),
            &Requirement::default(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            &MatchWeights::default(),
        );
        let stored = upsert_match(&pool, profile.id, RequirementKind::Offer, offer.id, &outcome)
            .await
            .unwrap();

        delete_offer(&pool, offer.id).await.unwrap();
        assert!(find_match(&pool, stored.id).await.unwrap().is_none());
    }
}
