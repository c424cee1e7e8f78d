use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::matching::types::{Profile, Requirement};
use crate::models::talent::{TalentProfileRow, TalentRequestRow};
use crate::pagination::Page;

pub const REQUEST_TTL_DAYS: i64 = 30;
const QUALITY_MATCH_SCORE: i32 = 70;

#[derive(Debug, Clone, Deserialize)]
pub struct TalentProfileInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub profile: Profile,
}

fn default_visibility() -> String {
    "public".to_string()
}

fn default_status() -> String {
    "active".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TalentRequestInput {
    pub company_name: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub requirement: Requirement,
}

/// Columns derived from the profile document so search can use indexes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileProjection {
    pub country: Option<String>,
    pub region: Option<String>,
    pub remote: bool,
    pub skill_names: Vec<String>,
    pub language_names: Vec<String>,
    pub hourly_min: Option<f64>,
    pub hourly_max: Option<f64>,
    pub availability_kind: Option<String>,
}

pub fn project(profile: &Profile) -> ProfileProjection {
    let lowered = |names: Vec<&str>| {
        let mut out: Vec<String> = names
            .into_iter()
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        out.sort();
        out.dedup();
        out
    };

    let hourly = profile.rates.hourly.unwrap_or_default();
    ProfileProjection {
        country: profile.location.country.clone(),
        region: profile.location.region.clone(),
        remote: profile.location.remote.unwrap_or(true),
        skill_names: lowered(profile.skills.iter().map(|s| s.name.as_str()).collect()),
        language_names: lowered(profile.languages.iter().map(|l| l.language.as_str()).collect()),
        hourly_min: hourly.min,
        hourly_max: hourly.max,
        availability_kind: profile.availability.kind.clone(),
    }
}

#[derive(Debug, Default)]
pub struct TalentSearch {
    pub skills: Vec<String>,
    pub domains: Vec<String>,
    pub languages: Vec<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub remote: Option<bool>,
    pub availability: Option<String>,
    pub hourly_min: Option<f64>,
    pub hourly_max: Option<f64>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarketplaceStats {
    pub active_talents: i64,
    pub active_requests: i64,
    pub quality_matches: i64,
    pub talents_by_region: Vec<LabelCount>,
    pub top_domains: Vec<LabelCount>,
}

// ────────────────────────────────────────────────────────────────────────────
// Talent profiles
// ────────────────────────────────────────────────────────────────────────────

/// One profile per user: inserts on first write, replaces afterwards.
pub async fn upsert_profile(
    pool: &PgPool,
    user_id: Uuid,
    input: &TalentProfileInput,
) -> Result<TalentProfileRow, sqlx::Error> {
    let p = project(&input.profile);
    sqlx::query_as(
        r#"
        INSERT INTO talent_profiles
            (id, user_id, title, description, domains, visibility, status,
             country, region, remote, skill_names, language_names,
             hourly_min, hourly_max, availability_kind, profile)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        ON CONFLICT (user_id) DO UPDATE SET
            title = EXCLUDED.title,
            description = EXCLUDED.description,
            domains = EXCLUDED.domains,
            visibility = EXCLUDED.visibility,
            status = EXCLUDED.status,
            country = EXCLUDED.country,
            region = EXCLUDED.region,
            remote = EXCLUDED.remote,
            skill_names = EXCLUDED.skill_names,
            language_names = EXCLUDED.language_names,
            hourly_min = EXCLUDED.hourly_min,
            hourly_max = EXCLUDED.hourly_max,
            availability_kind = EXCLUDED.availability_kind,
            profile = EXCLUDED.profile,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(input.title.trim())
    .bind(&input.description)
    .bind(&input.domains)
    .bind(&input.visibility)
    .bind(&input.status)
    .bind(p.country)
    .bind(p.region)
    .bind(p.remote)
    .bind(p.skill_names)
    .bind(p.language_names)
    .bind(p.hourly_min)
    .bind(p.hourly_max)
    .bind(p.availability_kind)
    .bind(Json(&input.profile))
    .fetch_one(pool)
    .await
}

pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<TalentProfileRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM talent_profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_profile(pool: &PgPool, id: Uuid) -> Result<Option<TalentProfileRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM talent_profiles WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Public profile lookup; bumps the view counter in the same statement.
pub async fn view_public_profile(pool: &PgPool, id: Uuid) -> Result<Option<TalentProfileRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE talent_profiles SET views = views + 1
        WHERE id = $1 AND visibility = 'public'
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn search_profiles(
    pool: &PgPool,
    filters: &TalentSearch,
    page: Page,
) -> Result<(Vec<TalentProfileRow>, i64), sqlx::Error> {
    const WHERE: &str = r#"
        WHERE status = 'active' AND visibility = 'public'
          AND (cardinality($1::text[]) = 0 OR skill_names && $1)
          AND (cardinality($2::text[]) = 0 OR domains && $2)
          AND (cardinality($3::text[]) = 0 OR language_names && $3)
          AND ($4::text IS NULL OR lower(country) = lower($4))
          AND ($5::text IS NULL OR lower(region) = lower($5))
          AND ($6::bool IS NULL OR remote = $6)
          AND ($7::text IS NULL OR availability_kind = $7)
          AND ($8::float8 IS NULL OR COALESCE(hourly_max, hourly_min) IS NULL
               OR COALESCE(hourly_max, hourly_min) >= $8)
          AND ($9::float8 IS NULL OR COALESCE(hourly_min, hourly_max) IS NULL
               OR COALESCE(hourly_min, hourly_max) <= $9)
    "#;

    let select = format!(
        "SELECT * FROM talent_profiles {WHERE} ORDER BY rating_avg DESC, updated_at DESC LIMIT $10 OFFSET $11"
    );
    let rows = sqlx::query_as(&select)
        .bind(&filters.skills)
        .bind(&filters.domains)
        .bind(&filters.languages)
        .bind(filters.country.as_deref())
        .bind(filters.region.as_deref())
        .bind(filters.remote)
        .bind(filters.availability.as_deref())
        .bind(filters.hourly_min)
        .bind(filters.hourly_max)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    let count = format!("SELECT COUNT(*) FROM talent_profiles {WHERE}");
    let total = sqlx::query_scalar(&count)
        .bind(&filters.skills)
        .bind(&filters.domains)
        .bind(&filters.languages)
        .bind(filters.country.as_deref())
        .bind(filters.region.as_deref())
        .bind(filters.remote)
        .bind(filters.availability.as_deref())
        .bind(filters.hourly_min)
        .bind(filters.hourly_max)
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

/// Active public profiles for batch matching. Empty filters match everything.
pub async fn candidates_for_request(
    pool: &PgPool,
    domains: &[String],
    regions: &[String],
    limit: i64,
) -> Result<Vec<TalentProfileRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM talent_profiles
        WHERE status = 'active' AND visibility = 'public'
          AND (cardinality($1::text[]) = 0 OR domains && $1)
          AND (cardinality($2::text[]) = 0 OR lower(region) = ANY($2))
        ORDER BY rating_avg DESC, updated_at DESC
        LIMIT $3
        "#,
    )
    .bind(domains)
    .bind(region_keys(regions))
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Lowercased, trimmed region names; blanks dropped.
pub fn region_keys(regions: &[String]) -> Vec<String> {
    regions
        .iter()
        .map(|region| region.trim().to_lowercase())
        .filter(|region| !region.is_empty())
        .collect()
}

/// Active public profiles whose owner has not applied to the offer yet.
pub async fn candidates_for_offer(
    pool: &PgPool,
    offer_id: Uuid,
    limit: i64,
) -> Result<Vec<TalentProfileRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT t.* FROM talent_profiles t
        WHERE t.status = 'active' AND t.visibility = 'public'
          AND NOT EXISTS (
              SELECT 1 FROM applications a WHERE a.offer_id = $1 AND a.candidate_id = t.user_id
          )
        ORDER BY t.rating_avg DESC, t.updated_at DESC
        LIMIT $2
        "#,
    )
    .bind(offer_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

// ────────────────────────────────────────────────────────────────────────────
// Talent requests
// ────────────────────────────────────────────────────────────────────────────

pub async fn insert_request(
    pool: &PgPool,
    recruiter_id: Uuid,
    input: &TalentRequestInput,
) -> Result<TalentRequestRow, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO talent_requests
            (id, recruiter_id, company_name, title, description, domains, requirement, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(recruiter_id)
    .bind(input.company_name.trim())
    .bind(input.title.trim())
    .bind(&input.description)
    .bind(&input.domains)
    .bind(Json(&input.requirement))
    .bind(Utc::now() + Duration::days(REQUEST_TTL_DAYS))
    .fetch_one(pool)
    .await
}

pub async fn find_request(pool: &PgPool, id: Uuid) -> Result<Option<TalentRequestRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM talent_requests WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_recruiter_requests(
    pool: &PgPool,
    recruiter_id: Uuid,
    page: Page,
) -> Result<(Vec<TalentRequestRow>, i64), sqlx::Error> {
    let rows = sqlx::query_as(
        "SELECT * FROM talent_requests WHERE recruiter_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(recruiter_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar("SELECT COUNT(*) FROM talent_requests WHERE recruiter_id = $1")
        .bind(recruiter_id)
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

pub async fn set_match_count(pool: &PgPool, id: Uuid, count: i32) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE talent_requests SET match_count = $2 WHERE id = $1")
        .bind(id)
        .bind(count)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn marketplace_stats(pool: &PgPool) -> Result<MarketplaceStats, sqlx::Error> {
    let (active_talents, active_requests, quality_matches): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM talent_profiles WHERE status = 'active'),
            (SELECT COUNT(*) FROM talent_requests WHERE status = 'active' AND expires_at > NOW()),
            (SELECT COUNT(*) FROM match_results WHERE match_score >= $1)
        "#,
    )
    .bind(QUALITY_MATCH_SCORE)
    .fetch_one(pool)
    .await?;

    let talents_by_region = sqlx::query_as(
        r#"
        SELECT COALESCE(region, 'unspecified') AS label, COUNT(*) AS count
        FROM talent_profiles WHERE status = 'active'
        GROUP BY 1 ORDER BY count DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let top_domains = sqlx::query_as(
        r#"
        SELECT d AS label, COUNT(*) AS count
        FROM talent_profiles, unnest(domains) AS d
        WHERE status = 'active'
        GROUP BY d ORDER BY count DESC, d LIMIT 10
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(MarketplaceStats {
        active_talents,
        active_requests,
        quality_matches,
        talents_by_region,
        top_domains,
    })
}
