//! Match scoring: pluggable trait-based scorer that measures a talent profile
//! against an offer or talent request.
//!
//! Default: `WeightedMatchScorer` (pure-Rust, deterministic, fully testable).
//! `AppState` holds an `Arc<dyn MatchScorer>`, built once at startup.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::criteria::{
    score_availability, score_budget, score_experience, score_languages, score_location,
    score_skills, AvailabilityCriterion, BudgetCriterion, ExperienceCriterion, LevelCriterion,
    LocationCriterion,
};
use crate::matching::recommendations::{build_recommendations, Recommendation};
use crate::matching::types::{Profile, Requirement};
use crate::matching::weights::{combine, CriterionScores, MatchWeights};

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCriteria {
    pub skills: LevelCriterion,
    pub location: LocationCriterion,
    pub budget: BudgetCriterion,
    pub experience: ExperienceCriterion,
    pub languages: LevelCriterion,
    pub availability: AvailabilityCriterion,
}

impl MatchCriteria {
    pub fn scores(&self) -> CriterionScores {
        CriterionScores {
            skills: self.skills.score,
            location: self.location.score,
            budget: self.budget.score,
            experience: self.experience.score,
            languages: self.languages.score,
            availability: self.availability.score,
        }
    }
}

/// Result document persisted per (profile, requirement) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub match_score: u32, // 0 – 100
    pub criteria: MatchCriteria,
    pub recommendations: Vec<Recommendation>,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Implement this to swap scoring backends without touching handlers or the
/// match engine. Carried in `AppState` as `Arc<dyn MatchScorer>`.
#[async_trait]
pub trait MatchScorer: Send + Sync {
    async fn score(
        &self,
        profile: &Profile,
        requirement: &Requirement,
        as_of: NaiveDate,
    ) -> Result<MatchOutcome, AppError>;

    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// WeightedMatchScorer: default implementation
// ────────────────────────────────────────────────────────────────────────────

/// Weighted sum of six criterion scores.
///
/// skills 30% · location 20% · budget 20% · experience 15% · languages 10% ·
/// availability 5% (see `MatchWeights::default`).
#[derive(Debug, Clone, Default)]
pub struct WeightedMatchScorer {
    weights: MatchWeights,
}

impl WeightedMatchScorer {
    pub fn new(weights: MatchWeights) -> anyhow::Result<Self> {
        if !weights.is_convex() {
            anyhow::bail!(
                "match weights must be non-negative and sum to 1.0 (got {:.3})",
                weights.sum()
            );
        }
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &MatchWeights {
        &self.weights
    }
}

#[async_trait]
impl MatchScorer for WeightedMatchScorer {
    async fn score(
        &self,
        profile: &Profile,
        requirement: &Requirement,
        as_of: NaiveDate,
    ) -> Result<MatchOutcome, AppError> {
        Ok(compute_match(profile, requirement, as_of, &self.weights))
    }

    fn backend(&self) -> &'static str {
        "weighted"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Core algorithm
// ────────────────────────────────────────────────────────────────────────────

pub fn compute_match(
    profile: &Profile,
    requirement: &Requirement,
    as_of: NaiveDate,
    weights: &MatchWeights,
) -> MatchOutcome {
    let criteria = MatchCriteria {
        skills: score_skills(&profile.skills, &requirement.skills),
        location: score_location(&profile.location, &requirement.location),
        budget: score_budget(&profile.rates, requirement.budget.as_ref()),
        experience: score_experience(&profile.experience, &requirement.skills, as_of),
        languages: score_languages(&profile.languages, &requirement.languages),
        availability: score_availability(&profile.availability, &requirement.mission),
    };

    let match_score = combine(&criteria.scores(), weights);
    let recommendations = build_recommendations(&criteria);

    MatchOutcome {
        match_score,
        criteria,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::types::{
        Availability, Budget, BudgetKind, ExperienceEntry, LanguageSkill, LocationPreference,
        Mission, ProfileLocation, ProfileSkill, RateRange, Rates, RequiredSkill,
    };

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn strong_profile() -> Profile {
        Profile {
            skills: vec![
                ProfileSkill {
                    name: "React".to_string(),
                    level: "expert".to_string(),
                    years_experience: Some(6.0),
                },
                ProfileSkill {
                    name: "Node.js".to_string(),
                    level: "avance".to_string(),
                    years_experience: Some(4.0),
                },
            ],
            location: ProfileLocation {
                country: Some("Guinea".to_string()),
                city: Some("Conakry".to_string()),
                region: Some("west_africa".to_string()),
                remote: Some(true),
            },
            experience: vec![ExperienceEntry {
                company: "Acme".to_string(),
                title: "Frontend engineer".to_string(),
                start_date: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
                end_date: None,
            }],
            languages: vec![LanguageSkill {
                language: "Anglais".to_string(),
                level: "courant".to_string(),
            }],
            rates: Rates {
                hourly: Some(RateRange {
                    min: Some(40.0),
                    max: Some(50.0),
                }),
                daily: None,
                currency: Some("USD".to_string()),
            },
            availability: Availability {
                kind: Some("freelance".to_string()),
                available_from: Some(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
                hours_per_week: Some(30),
            },
        }
    }

    fn requirement() -> Requirement {
        Requirement {
            skills: vec![
                RequiredSkill {
                    name: "react".to_string(),
                    level: "avance".to_string(),
                    years_experience: Some(3.0),
                    mandatory: true,
                },
                RequiredSkill {
                    name: "node.js".to_string(),
                    level: "intermediaire".to_string(),
                    years_experience: None,
                    mandatory: false,
                },
            ],
            location: LocationPreference {
                regions: vec!["west_africa".to_string()],
                countries: vec!["Guinea".to_string()],
                remote: true,
            },
            budget: Some(Budget {
                kind: BudgetKind::Hourly,
                min: Some(45.0),
                max: Some(55.0),
                currency: Some("USD".to_string()),
            }),
            languages: vec![LanguageSkill {
                language: "anglais".to_string(),
                level: "courant".to_string(),
            }],
            mission: Mission {
                kind: Some("freelance".to_string()),
                start_date: Some(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()),
            },
        }
    }

    #[test]
    fn test_perfect_fit_scores_100() {
        let outcome = compute_match(&strong_profile(), &requirement(), as_of(), &MatchWeights::default());
        assert_eq!(outcome.criteria.skills.score, 100);
        assert_eq!(outcome.criteria.budget.score, 100);
        assert_eq!(outcome.match_score, 100);
        assert!(outcome.recommendations.is_empty());
    }

    #[test]
    fn test_empty_inputs_stay_in_bounds() {
        let outcome = compute_match(
            &Profile::default(),
            &Requirement::default(),
            as_of(),
            &MatchWeights::default(),
        );
        // skills 100, location 80 (remote unstated), budget 50, experience 100,
        // languages 100, availability 70
        // 30 + 16 + 10 + 15 + 10 + 3.5 = 84.5 → 85 (±rounding)
        assert!(outcome.match_score <= 100);
        assert!((84..=85).contains(&outcome.match_score));
    }

    #[test]
    fn test_empty_profile_against_demanding_requirement() {
        let outcome = compute_match(&Profile::default(), &requirement(), as_of(), &MatchWeights::default());
        assert_eq!(outcome.criteria.skills.score, 0);
        assert_eq!(outcome.criteria.languages.score, 0);
        assert!(outcome.match_score <= 100);
        assert!(outcome
            .recommendations
            .iter()
            .any(|r| r.kind == crate::matching::recommendations::RecommendationKind::Skills));
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let weights = MatchWeights::default();
        let first = compute_match(&strong_profile(), &requirement(), as_of(), &weights);
        let second = compute_match(&strong_profile(), &requirement(), as_of(), &weights);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_non_convex_weights() {
        let weights = MatchWeights {
            skills: 0.5,
            ..MatchWeights::default()
        };
        assert!(WeightedMatchScorer::new(weights).is_err());
        assert!(WeightedMatchScorer::new(MatchWeights::default()).is_ok());
    }

    #[tokio::test]
    async fn test_trait_object_delegates_to_compute_match() {
        let scorer: std::sync::Arc<dyn MatchScorer> = std::sync::Arc::new(WeightedMatchScorer::default());
        let outcome = scorer
            .score(&strong_profile(), &requirement(), as_of())
            .await
            .unwrap();
        assert_eq!(outcome.match_score, 100);
        assert_eq!(scorer.backend(), "weighted");
    }

    #[test]
    fn test_outcome_serializes_expected_shape() {
        let outcome = compute_match(&strong_profile(), &requirement(), as_of(), &MatchWeights::default());
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["match_score"], 100);
        assert!(value["criteria"]["skills"]["details"].is_array());
        assert!(value["recommendations"].is_array());
    }
}
