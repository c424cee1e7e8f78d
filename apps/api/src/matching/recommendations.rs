use serde::{Deserialize, Serialize};

use crate::matching::scorer::MatchCriteria;

const SKILLS_THRESHOLD: u32 = 70;
const EXPERIENCE_THRESHOLD: u32 = 60;
const BUDGET_THRESHOLD: u32 = 50;
const LANGUAGES_THRESHOLD: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Skills,
    Experience,
    Budget,
    Languages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub message: String,
    pub priority: Priority,
}

/// Threshold rules over the criterion reports. Order carries no meaning.
pub fn build_recommendations(criteria: &MatchCriteria) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if criteria.skills.score < SKILLS_THRESHOLD {
        let missing: Vec<&str> = criteria
            .skills
            .details
            .iter()
            .filter(|d| d.credit < 1.0)
            .take(2)
            .map(|d| d.name.as_str())
            .collect();
        let message = if missing.is_empty() {
            "Strengthen the skills this mission asks for.".to_string()
        } else {
            format!(
                "Strengthen your skills in {} to better fit this mission.",
                missing.join(", ")
            )
        };
        recommendations.push(Recommendation {
            kind: RecommendationKind::Skills,
            message,
            priority: Priority::High,
        });
    }

    if criteria.experience.score < EXPERIENCE_THRESHOLD {
        recommendations.push(Recommendation {
            kind: RecommendationKind::Experience,
            message: format!(
                "The mission expects about {:.0} years of experience; side projects or volunteering can close the gap.",
                criteria.experience.required_years
            ),
            priority: Priority::Medium,
        });
    }

    if criteria.budget.score < BUDGET_THRESHOLD {
        recommendations.push(Recommendation {
            kind: RecommendationKind::Budget,
            message: format!(
                "Your rate is {}% away from the mission budget; consider adjusting it.",
                criteria.budget.deviation_pct
            ),
            priority: Priority::Medium,
        });
    }

    if criteria.languages.score < LANGUAGES_THRESHOLD {
        let missing: Vec<&str> = criteria
            .languages
            .details
            .iter()
            .filter(|d| d.credit < 1.0)
            .map(|d| d.name.as_str())
            .collect();
        recommendations.push(Recommendation {
            kind: RecommendationKind::Languages,
            message: if missing.is_empty() {
                "Improve the language skills this mission requires.".to_string()
            } else {
                format!("Improve your level in: {}.", missing.join(", "))
            },
            priority: Priority::Medium,
        });
    }

    recommendations
}
