use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Profile: what a talent offers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub skills: Vec<ProfileSkill>,
    pub location: ProfileLocation,
    pub experience: Vec<ExperienceEntry>,
    pub languages: Vec<LanguageSkill>,
    pub rates: Rates,
    pub availability: Availability,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSkill {
    pub name: String,
    pub level: String,
    pub years_experience: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileLocation {
    pub country: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    /// `None` means "not stated"; only an explicit `false` rules out remote work.
    pub remote: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub title: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageSkill {
    pub language: String,
    pub level: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RateRange {
    /// The figure used for comparisons: the upper bound, falling back to the lower one.
    pub fn reference(&self) -> Option<f64> {
        self.max.or(self.min).filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rates {
    pub hourly: Option<RateRange>,
    pub daily: Option<RateRange>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Availability {
    /// Engagement type: full_time, part_time, freelance, contract, internship.
    pub kind: Option<String>,
    pub available_from: Option<NaiveDate>,
    pub hours_per_week: Option<u32>,
}

// ────────────────────────────────────────────────────────────────────────────
// Requirement: what an offer or talent request asks for
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirement {
    pub skills: Vec<RequiredSkill>,
    pub location: LocationPreference,
    pub budget: Option<Budget>,
    pub languages: Vec<LanguageSkill>,
    pub mission: Mission,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredSkill {
    pub name: String,
    pub level: String,
    pub years_experience: Option<f64>,
    pub mandatory: bool,
}

impl Default for RequiredSkill {
    fn default() -> Self {
        Self {
            name: String::new(),
            level: String::new(),
            years_experience: None,
            mandatory: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationPreference {
    pub regions: Vec<String>,
    pub countries: Vec<String>,
    pub remote: bool,
}

impl Default for LocationPreference {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            countries: Vec::new(),
            remote: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetKind {
    Hourly,
    Daily,
    Monthly,
    Project,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub kind: BudgetKind,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mission {
    pub kind: Option<String>,
    pub start_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_documents_deserialize_with_defaults() {
        let profile: Profile = serde_json::from_value(json!({})).unwrap();
        assert!(profile.skills.is_empty());
        assert_eq!(profile.location.remote, None);

        let requirement: Requirement = serde_json::from_value(json!({})).unwrap();
        assert!(requirement.location.remote);
        assert!(requirement.budget.is_none());
    }

    #[test]
    fn test_required_skill_defaults_to_mandatory() {
        let skill: RequiredSkill = serde_json::from_value(json!({"name": "Rust"})).unwrap();
        assert!(skill.mandatory);
        assert_eq!(skill.level, "");
    }

    #[test]
    fn test_rate_reference_prefers_max() {
        let range = RateRange {
            min: Some(40.0),
            max: Some(60.0),
        };
        assert_eq!(range.reference(), Some(60.0));
        let only_min = RateRange {
            min: Some(40.0),
            max: None,
        };
        assert_eq!(only_min.reference(), Some(40.0));
        assert_eq!(RateRange::default().reference(), None);
    }
}
