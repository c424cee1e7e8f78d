use chrono::Utc;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::matching::scorer::{MatchCriteria, MatchOutcome};
use crate::models::matching::{
    Actor, Interaction, MatchResultRow, MatchStatus, RequirementKind, RequirementMatchView,
    TalentMatchView,
};
use crate::pagination::Page;

const TOP_MISSING_SKILLS: usize = 5;

#[derive(Debug, Serialize, FromRow)]
pub struct ScoreSummary {
    pub total: i64,
    pub average: Option<f64>,
    pub excellent: i64,
    pub good: i64,
    pub weak: i64,
}

#[derive(Debug, Serialize)]
pub struct SkillGap {
    pub skill: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct TalentMatchStats {
    #[serde(flatten)]
    pub summary: ScoreSummary,
    pub top_missing_skills: Vec<SkillGap>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct RequirementMatchStats {
    pub requirement_kind: String,
    pub requirement_id: Uuid,
    pub title: Option<String>,
    pub matches: i64,
    pub best_score: Option<i32>,
    pub average_score: Option<f64>,
}

/// Inserts the result, or overwrites score, criteria and recommendations of
/// the existing row for the same (profile, requirement). Status and
/// interactions survive a recompute.
pub async fn upsert_match(
    pool: &PgPool,
    profile_id: Uuid,
    kind: RequirementKind,
    requirement_id: Uuid,
    outcome: &MatchOutcome,
) -> Result<MatchResultRow, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO match_results
            (id, profile_id, requirement_kind, requirement_id, match_score, criteria, recommendations)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (profile_id, requirement_kind, requirement_id) DO UPDATE SET
            match_score = EXCLUDED.match_score,
            criteria = EXCLUDED.criteria,
            recommendations = EXCLUDED.recommendations,
            computed_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(profile_id)
    .bind(kind.as_str())
    .bind(requirement_id)
    .bind(outcome.match_score as i32)
    .bind(Json(&outcome.criteria))
    .bind(Json(&outcome.recommendations))
    .fetch_one(pool)
    .await
}

pub async fn find_match(pool: &PgPool, id: Uuid) -> Result<Option<MatchResultRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM match_results WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Matches for one offer or request, best first.
pub async fn list_for_requirement(
    pool: &PgPool,
    kind: RequirementKind,
    requirement_id: Uuid,
    page: Page,
) -> Result<(Vec<TalentMatchView>, i64), sqlx::Error> {
    let rows = sqlx::query_as(
        r#"
        SELECT m.*, t.user_id AS talent_user_id, t.title AS talent_title
        FROM match_results m
        JOIN talent_profiles t ON t.id = m.profile_id
        WHERE m.requirement_kind = $1 AND m.requirement_id = $2
        ORDER BY m.match_score DESC, m.computed_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(kind.as_str())
    .bind(requirement_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar(
        "SELECT COUNT(*) FROM match_results WHERE requirement_kind = $1 AND requirement_id = $2",
    )
    .bind(kind.as_str())
    .bind(requirement_id)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

const REQUIREMENT_VIEW: &str = r#"
    SELECT m.*, COALESCE(r.title, o.title) AS requirement_title
    FROM match_results m
    LEFT JOIN talent_requests r ON m.requirement_kind = 'talent_request' AND r.id = m.requirement_id
    LEFT JOIN offers o ON m.requirement_kind = 'offer' AND o.id = m.requirement_id
"#;

/// A talent's matches, best first.
pub async fn list_for_profile(
    pool: &PgPool,
    profile_id: Uuid,
    page: Page,
) -> Result<(Vec<RequirementMatchView>, i64), sqlx::Error> {
    let sql = format!(
        "{REQUIREMENT_VIEW} WHERE m.profile_id = $1 ORDER BY m.match_score DESC, m.computed_at DESC LIMIT $2 OFFSET $3"
    );
    let rows = sqlx::query_as(&sql)
        .bind(profile_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    let total = count_for_profile(pool, profile_id).await?;
    Ok((rows, total))
}

/// A talent's matches, most recently computed first.
pub async fn history_for_profile(
    pool: &PgPool,
    profile_id: Uuid,
    page: Page,
) -> Result<(Vec<RequirementMatchView>, i64), sqlx::Error> {
    let sql = format!(
        "{REQUIREMENT_VIEW} WHERE m.profile_id = $1 ORDER BY m.computed_at DESC LIMIT $2 OFFSET $3"
    );
    let rows = sqlx::query_as(&sql)
        .bind(profile_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    let total = count_for_profile(pool, profile_id).await?;
    Ok((rows, total))
}

/// Matches against every offer and request a recruiter owns, most recent first.
pub async fn history_for_recruiter(
    pool: &PgPool,
    recruiter_id: Uuid,
    page: Page,
) -> Result<(Vec<RequirementMatchView>, i64), sqlx::Error> {
    let sql = format!(
        "{REQUIREMENT_VIEW} WHERE COALESCE(r.recruiter_id, o.recruiter_id) = $1 ORDER BY m.computed_at DESC LIMIT $2 OFFSET $3"
    );
    let rows = sqlx::query_as(&sql)
        .bind(recruiter_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    let total = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM match_results m
        LEFT JOIN talent_requests r ON m.requirement_kind = 'talent_request' AND r.id = m.requirement_id
        LEFT JOIN offers o ON m.requirement_kind = 'offer' AND o.id = m.requirement_id
        WHERE COALESCE(r.recruiter_id, o.recruiter_id) = $1
        "#,
    )
    .bind(recruiter_id)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

async fn count_for_profile(pool: &PgPool, profile_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM match_results WHERE profile_id = $1")
        .bind(profile_id)
        .fetch_one(pool)
        .await
}

/// Recruiter who owns the offer or request a match was computed against.
pub async fn requirement_owner(
    pool: &PgPool,
    kind: RequirementKind,
    requirement_id: Uuid,
) -> Result<Option<Uuid>, sqlx::Error> {
    let sql = match kind {
        RequirementKind::TalentRequest => "SELECT recruiter_id FROM talent_requests WHERE id = $1",
        RequirementKind::Offer => "SELECT recruiter_id FROM offers WHERE id = $1",
    };
    sqlx::query_scalar(sql)
        .bind(requirement_id)
        .fetch_optional(pool)
        .await
}

pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    status: MatchStatus,
    actor: Actor,
) -> Result<MatchResultRow, sqlx::Error> {
    let interaction = Interaction {
        actor,
        action: status.as_str().to_string(),
        at: Utc::now(),
    };
    sqlx::query_as(
        r#"
        UPDATE match_results
        SET status = $2, interactions = interactions || $3::jsonb
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(Json(vec![interaction]))
    .fetch_one(pool)
    .await
}

// ────────────────────────────────────────────────────────────────────────────
// Statistics
// ────────────────────────────────────────────────────────────────────────────

pub async fn talent_stats(pool: &PgPool, profile_id: Uuid) -> Result<TalentMatchStats, sqlx::Error> {
    let summary: ScoreSummary = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) AS total,
            AVG(match_score)::float8 AS average,
            COUNT(*) FILTER (WHERE match_score >= 80) AS excellent,
            COUNT(*) FILTER (WHERE match_score >= 60 AND match_score < 80) AS good,
            COUNT(*) FILTER (WHERE match_score < 60) AS weak
        FROM match_results
        WHERE profile_id = $1
        "#,
    )
    .bind(profile_id)
    .fetch_one(pool)
    .await?;

    let criteria: Vec<Json<MatchCriteria>> =
        sqlx::query_scalar("SELECT criteria FROM match_results WHERE profile_id = $1")
            .bind(profile_id)
            .fetch_all(pool)
            .await?;
    let criteria: Vec<MatchCriteria> = criteria.into_iter().map(|c| c.0).collect();

    Ok(TalentMatchStats {
        summary,
        top_missing_skills: top_missing_skills(&criteria, TOP_MISSING_SKILLS),
    })
}

pub async fn recruiter_stats(
    pool: &PgPool,
    recruiter_id: Uuid,
) -> Result<Vec<RequirementMatchStats>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT m.requirement_kind, m.requirement_id,
               MAX(COALESCE(r.title, o.title)) AS title,
               COUNT(*) AS matches,
               MAX(m.match_score) AS best_score,
               AVG(m.match_score)::float8 AS average_score
        FROM match_results m
        LEFT JOIN talent_requests r ON m.requirement_kind = 'talent_request' AND r.id = m.requirement_id
        LEFT JOIN offers o ON m.requirement_kind = 'offer' AND o.id = m.requirement_id
        WHERE COALESCE(r.recruiter_id, o.recruiter_id) = $1
        GROUP BY m.requirement_kind, m.requirement_id
        ORDER BY best_score DESC NULLS LAST
        "#,
    )
    .bind(recruiter_id)
    .fetch_all(pool)
    .await
}

/// Skills most often missing or under-levelled across a set of matches.
/// Ties are broken alphabetically so the output is stable.
pub fn top_missing_skills(criteria: &[MatchCriteria], limit: usize) -> Vec<SkillGap> {
    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for c in criteria {
        for detail in c.skills.details.iter().filter(|d| d.credit < 1.0) {
            *counts.entry(detail.name.trim().to_lowercase()).or_default() += 1;
        }
    }

    let mut gaps: Vec<SkillGap> = counts
        .into_iter()
        .map(|(skill, count)| SkillGap { skill, count })
        .collect();
    gaps.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.skill.cmp(&b.skill)));
    gaps.truncate(limit);
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::scorer::compute_match;
    use crate::matching::types::{Profile, RequiredSkill, Requirement};
    use crate::matching::weights::MatchWeights;
    use chrono::NaiveDate;

    fn criteria_missing(skills: &[&str]) -> MatchCriteria {
        let requirement = Requirement {
            skills: skills
                .iter()
                .map(|s| RequiredSkill {
                    name: s.to_string(),
                    level: "avance".to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        compute_match(
            &Profile::default(),
            &requirement,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            &MatchWeights::default(),
        )
        .criteria
    }

    #[test]
    fn test_top_missing_skills_counts_and_orders() {
        let criteria = vec![
            criteria_missing(&["Kafka", "Rust"]),
            criteria_missing(&["kafka"]),
            criteria_missing(&["Go", "Rust"]),
        ];
        let gaps = top_missing_skills(&criteria, 2);
        assert_eq!(gaps.len(), 2);
        assert_eq!((gaps[0].skill.as_str(), gaps[0].count), ("kafka", 2));
        assert_eq!((gaps[1].skill.as_str(), gaps[1].count), ("rust", 2));
    }

    #[test]
    fn test_top_missing_skills_empty() {
        assert!(top_missing_skills(&[], 5).is_empty());
    }
}
