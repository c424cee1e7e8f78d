//! Per-criterion scoring. Every function is total: missing or malformed data
//! degrades to a neutral or "no match" score, never to an error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::matching::levels::{language_rank, level_credit, skill_rank};
use crate::matching::types::{
    Availability, Budget, BudgetKind, ExperienceEntry, LanguageSkill, LocationPreference, Mission,
    ProfileLocation, ProfileSkill, RateRange, Rates, RequiredSkill,
};

/// Score used when one side of a comparison carries no usable data.
pub const NEUTRAL_SCORE: u32 = 50;

const HOURS_PER_DAY: f64 = 8.0;
const HOURS_PER_MONTH: f64 = 160.0;
const DAYS_PER_YEAR: f64 = 365.0;
const EXPERIENCE_FLOOR: f64 = 20.0;

// ────────────────────────────────────────────────────────────────────────────
// Criterion reports
// ────────────────────────────────────────────────────────────────────────────

/// One required skill or language and what the profile brings against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelMatch {
    pub name: String,
    pub required: String,
    pub possessed: Option<String>,
    pub credit: f64,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelCriterion {
    pub score: u32,
    pub details: Vec<LevelMatch>,
}

impl LevelCriterion {
    pub fn missing(&self) -> impl Iterator<Item = &LevelMatch> {
        self.details.iter().filter(|d| !d.matched)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCriterion {
    pub score: u32,
    pub remote: bool,
    pub same_region: bool,
    pub same_country: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetCriterion {
    pub score: u32,
    pub compatible: bool,
    /// Relative gap between the two hourly-equivalent rates, in percent.
    pub deviation_pct: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceCriterion {
    pub score: u32,
    pub required_years: f64,
    pub possessed_years: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityCriterion {
    pub score: u32,
    pub type_match: bool,
    pub date_match: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Skills & languages
// ────────────────────────────────────────────────────────────────────────────

pub fn score_skills(possessed: &[ProfileSkill], required: &[RequiredSkill]) -> LevelCriterion {
    let pairs = required.iter().map(|r| {
        let found = possessed
            .iter()
            .find(|p| same_name(&p.name, &r.name))
            .map(|p| p.level.as_str());
        (r.name.as_str(), r.level.as_str(), found)
    });
    score_levels(pairs, skill_rank)
}

pub fn score_languages(possessed: &[LanguageSkill], required: &[LanguageSkill]) -> LevelCriterion {
    let pairs = required.iter().map(|r| {
        let found = possessed
            .iter()
            .find(|p| same_name(&p.language, &r.language))
            .map(|p| p.level.as_str());
        (r.language.as_str(), r.level.as_str(), found)
    });
    score_levels(pairs, language_rank)
}

fn score_levels<'a>(
    pairs: impl ExactSizeIterator<Item = (&'a str, &'a str, Option<&'a str>)>,
    rank: fn(&str) -> u8,
) -> LevelCriterion {
    let total = pairs.len();
    if total == 0 {
        return LevelCriterion {
            score: 100,
            details: vec![],
        };
    }

    let mut earned = 0.0_f64;
    let mut details = Vec::with_capacity(total);

    for (name, required_level, possessed_level) in pairs {
        let credit = possessed_level
            .map(|level| level_credit(rank(level), rank(required_level)))
            .unwrap_or(0.0);
        earned += credit;
        details.push(LevelMatch {
            name: name.to_string(),
            required: required_level.to_string(),
            possessed: possessed_level.map(str::to_string),
            credit,
            matched: credit > 0.0,
        });
    }

    LevelCriterion {
        score: to_score(earned / total as f64 * 100.0),
        details,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Location
// ────────────────────────────────────────────────────────────────────────────

pub fn score_location(location: &ProfileLocation, preference: &LocationPreference) -> LocationCriterion {
    let remote = preference.remote && location.remote != Some(false);
    let same_region = location
        .region
        .as_deref()
        .map(|region| preference.regions.iter().any(|r| same_name(r, region)))
        .unwrap_or(false);
    let same_country = location
        .country
        .as_deref()
        .map(|country| preference.countries.iter().any(|c| same_name(c, country)))
        .unwrap_or(false);

    let mut score = NEUTRAL_SCORE;
    if remote {
        score += 30;
    }
    if same_region {
        score += 20;
    }
    if same_country {
        score += 20;
    }

    LocationCriterion {
        score: score.min(100),
        remote,
        same_region,
        same_country,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Budget
// ────────────────────────────────────────────────────────────────────────────

pub fn score_budget(rates: &Rates, budget: Option<&Budget>) -> BudgetCriterion {
    let neutral = BudgetCriterion {
        score: NEUTRAL_SCORE,
        compatible: true,
        deviation_pct: 0,
    };

    let (Some(requested), Some(offered)) = (
        budget.and_then(requested_hourly_rate),
        profile_hourly_rate(rates),
    ) else {
        return neutral;
    };
    if requested <= 0.0 {
        return neutral;
    }

    let deviation = (offered - requested).abs() / requested;
    BudgetCriterion {
        score: budget_band(deviation),
        compatible: deviation <= 0.5,
        deviation_pct: to_score_unbounded(deviation * 100.0),
    }
}

/// Discrete score for a relative deviation. Non-increasing in `deviation`.
pub fn budget_band(deviation: f64) -> u32 {
    match deviation {
        d if d <= 0.1 => 100,
        d if d <= 0.2 => 90,
        d if d <= 0.3 => 70,
        d if d <= 0.5 => 50,
        _ => 20,
    }
}

fn requested_hourly_rate(budget: &Budget) -> Option<f64> {
    let amount = RateRange {
        min: budget.min,
        max: budget.max,
    }
    .reference()?;
    match budget.kind {
        BudgetKind::Hourly => Some(amount),
        BudgetKind::Daily => Some(amount / HOURS_PER_DAY),
        BudgetKind::Monthly => Some(amount / HOURS_PER_MONTH),
        BudgetKind::Project => None,
    }
}

fn profile_hourly_rate(rates: &Rates) -> Option<f64> {
    rates
        .hourly
        .as_ref()
        .and_then(RateRange::reference)
        .or_else(|| {
            rates
                .daily
                .as_ref()
                .and_then(RateRange::reference)
                .map(|daily| daily / HOURS_PER_DAY)
        })
}

// ────────────────────────────────────────────────────────────────────────────
// Experience
// ────────────────────────────────────────────────────────────────────────────

pub fn score_experience(
    experience: &[ExperienceEntry],
    required: &[RequiredSkill],
    as_of: NaiveDate,
) -> ExperienceCriterion {
    let possessed_years = total_years(experience, as_of);
    let required_years = required
        .iter()
        .filter_map(|s| s.years_experience)
        .filter(|y| y.is_finite())
        .fold(0.0_f64, f64::max);

    let score = if required.is_empty() || required_years <= 0.0 || possessed_years >= required_years {
        100.0
    } else {
        (possessed_years / required_years * 100.0).max(EXPERIENCE_FLOOR)
    };

    ExperienceCriterion {
        score: to_score(score),
        required_years,
        possessed_years: (possessed_years * 10.0).round() / 10.0,
    }
}

/// Sum of all experience spans in years. Open-ended entries run until `as_of`.
pub fn total_years(experience: &[ExperienceEntry], as_of: NaiveDate) -> f64 {
    experience
        .iter()
        .map(|e| {
            let end = e.end_date.unwrap_or(as_of);
            let days = (end - e.start_date).num_days().max(0);
            days as f64 / DAYS_PER_YEAR
        })
        .sum()
}

// ────────────────────────────────────────────────────────────────────────────
// Availability
// ────────────────────────────────────────────────────────────────────────────

pub fn score_availability(availability: &Availability, mission: &Mission) -> AvailabilityCriterion {
    let type_match = match (availability.kind.as_deref(), mission.kind.as_deref()) {
        (Some(a), Some(m)) => same_name(a, m),
        _ => false,
    };

    let mut score: i32 = 100;
    if !type_match {
        score -= 30;
    }

    let date_match = match (availability.available_from, mission.start_date) {
        (Some(available), Some(start)) if start < available => {
            let gap = (available - start).num_days();
            if gap > 30 {
                score -= 40;
            } else if gap > 7 {
                score -= 20;
            }
            false
        }
        _ => true,
    };

    AvailabilityCriterion {
        score: score.max(0) as u32,
        type_match,
        date_match,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn same_name(a: &str, b: &str) -> bool {
    let a = a.trim();
    !a.is_empty() && a.to_lowercase() == b.trim().to_lowercase()
}

fn to_score(value: f64) -> u32 {
    if value.is_finite() {
        value.round().clamp(0.0, 100.0) as u32
    } else {
        0
    }
}

fn to_score_unbounded(value: f64) -> u32 {
    if value.is_finite() {
        value.round().max(0.0).min(u32::MAX as f64) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(name: &str, level: &str) -> ProfileSkill {
        ProfileSkill {
            name: name.to_string(),
            level: level.to_string(),
            years_experience: None,
        }
    }

    fn required(name: &str, level: &str, years: Option<f64>) -> RequiredSkill {
        RequiredSkill {
            name: name.to_string(),
            level: level.to_string(),
            years_experience: years,
            mandatory: true,
        }
    }

    fn lang(language: &str, level: &str) -> LanguageSkill {
        LanguageSkill {
            language: language.to_string(),
            level: level.to_string(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hourly(min: Option<f64>, max: Option<f64>) -> Rates {
        Rates {
            hourly: Some(RateRange { min, max }),
            daily: None,
            currency: None,
        }
    }

    fn budget(kind: BudgetKind, min: Option<f64>, max: Option<f64>) -> Budget {
        Budget {
            kind,
            min,
            max,
            currency: None,
        }
    }

    #[test]
    fn test_skills_empty_requirement_is_vacuous_match() {
        let report = score_skills(&[skill("React", "expert")], &[]);
        assert_eq!(report.score, 100);
        assert!(report.details.is_empty());
    }

    #[test]
    fn test_skills_same_level_full_credit() {
        let report = score_skills(
            &[skill("React", "intermediaire")],
            &[required("React", "intermediaire", None)],
        );
        assert_eq!(report.details[0].credit, 1.0);
        assert_eq!(report.score, 100);
    }

    #[test]
    fn test_skills_one_level_below_partial_credit() {
        let report = score_skills(
            &[skill("React", "intermediaire")],
            &[required("React", "avance", None)],
        );
        assert_eq!(report.details[0].credit, 0.7);
        assert!(report.details[0].matched);
        assert_eq!(report.score, 70);
    }

    #[test]
    fn test_skills_name_match_is_case_insensitive() {
        let report = score_skills(&[skill("react", "expert")], &[required("React", "avance", None)]);
        assert_eq!(report.score, 100);
        assert_eq!(report.details[0].possessed.as_deref(), Some("expert"));
    }

    #[test]
    fn test_skills_missing_skill_gets_no_credit() {
        let report = score_skills(
            &[skill("React", "expert")],
            &[required("React", "expert", None), required("Go", "debutant", None)],
        );
        assert_eq!(report.score, 50);
        let missing: Vec<_> = report.missing().map(|d| d.name.as_str()).collect();
        assert_eq!(missing, vec!["Go"]);
    }

    #[test]
    fn test_skills_two_levels_below_is_no_match() {
        let report = score_skills(&[skill("Rust", "debutant")], &[required("Rust", "avance", None)]);
        assert_eq!(report.score, 0);
        assert!(!report.details[0].matched);
    }

    #[test]
    fn test_skills_unknown_level_does_not_panic() {
        let report = score_skills(&[skill("Rust", "???")], &[required("Rust", "debutant", None)]);
        // unknown possessed level ranks 0, one below debutant
        assert_eq!(report.score, 70);
    }

    #[test]
    fn test_languages_ladder() {
        let report = score_languages(
            &[lang("Anglais", "courant"), lang("Français", "natif")],
            &[lang("anglais", "natif"), lang("français", "courant")],
        );
        // anglais: courant(3) vs natif(4) → 0.7; français: natif ≥ courant → 1.0
        assert_eq!(report.score, 85);
    }

    #[test]
    fn test_languages_empty_requirement() {
        assert_eq!(score_languages(&[], &[]).score, 100);
    }

    #[test]
    fn test_location_base_score() {
        let pref = LocationPreference {
            regions: vec![],
            countries: vec![],
            remote: false,
        };
        let report = score_location(&ProfileLocation::default(), &pref);
        assert_eq!(report.score, 50);
        assert!(!report.remote);
    }

    #[test]
    fn test_location_all_bonuses_capped() {
        let location = ProfileLocation {
            country: Some("Senegal".to_string()),
            city: Some("Dakar".to_string()),
            region: Some("west_africa".to_string()),
            remote: Some(true),
        };
        let pref = LocationPreference {
            regions: vec!["west_africa".to_string()],
            countries: vec!["senegal".to_string()],
            remote: true,
        };
        let report = score_location(&location, &pref);
        assert_eq!(report.score, 100);
        assert!(report.same_region && report.same_country && report.remote);
    }

    #[test]
    fn test_location_explicit_no_remote_blocks_bonus() {
        let location = ProfileLocation {
            remote: Some(false),
            ..Default::default()
        };
        let report = score_location(&location, &LocationPreference::default());
        assert_eq!(report.score, 50);

        let unstated = score_location(&ProfileLocation::default(), &LocationPreference::default());
        assert_eq!(unstated.score, 80);
    }

    #[test]
    fn test_budget_within_ten_percent() {
        let report = score_budget(
            &hourly(None, Some(50.0)),
            Some(&budget(BudgetKind::Hourly, Some(40.0), Some(55.0))),
        );
        assert_eq!(report.score, 100);
        assert_eq!(report.deviation_pct, 9);
        assert!(report.compatible);
    }

    #[test]
    fn test_budget_daily_normalisation() {
        // 400/day → 50/h against 500/day → 62.5/h: deviation 20%
        let rates = Rates {
            hourly: None,
            daily: Some(RateRange {
                min: None,
                max: Some(400.0),
            }),
            currency: None,
        };
        let report = score_budget(&rates, Some(&budget(BudgetKind::Daily, None, Some(500.0))));
        assert_eq!(report.score, 90);
    }

    #[test]
    fn test_budget_missing_data_is_neutral() {
        assert_eq!(score_budget(&Rates::default(), None).score, NEUTRAL_SCORE);
        assert_eq!(
            score_budget(&hourly(Some(10.0), None), Some(&budget(BudgetKind::Hourly, None, None))).score,
            NEUTRAL_SCORE
        );
        assert_eq!(
            score_budget(&hourly(Some(10.0), None), Some(&budget(BudgetKind::Project, None, Some(5000.0))))
                .score,
            NEUTRAL_SCORE
        );
    }

    #[test]
    fn test_budget_zero_request_does_not_divide() {
        let report = score_budget(&hourly(Some(10.0), None), Some(&budget(BudgetKind::Hourly, Some(0.0), None)));
        assert_eq!(report.score, NEUTRAL_SCORE);
    }

    #[test]
    fn test_budget_far_apart() {
        let report = score_budget(&hourly(None, Some(200.0)), Some(&budget(BudgetKind::Hourly, None, Some(50.0))));
        assert_eq!(report.score, 20);
        assert!(!report.compatible);
    }

    #[test]
    fn test_budget_band_is_non_increasing() {
        let mut previous = u32::MAX;
        for step in 0..=200 {
            let score = budget_band(step as f64 / 100.0);
            assert!(score <= previous, "band rose at deviation {step}%");
            previous = score;
        }
    }

    #[test]
    fn test_experience_meets_requirement() {
        let experience = vec![ExperienceEntry {
            company: "Acme".to_string(),
            title: "Dev".to_string(),
            start_date: date(2015, 1, 1),
            end_date: Some(date(2020, 1, 1)),
        }];
        let report = score_experience(&experience, &[required("Rust", "expert", Some(3.0))], date(2024, 1, 1));
        assert_eq!(report.score, 100);
        assert_eq!(report.required_years, 3.0);
    }

    #[test]
    fn test_experience_proportional_with_floor() {
        let experience = vec![ExperienceEntry {
            company: "Acme".to_string(),
            title: "Dev".to_string(),
            start_date: date(2022, 1, 1),
            end_date: None,
        }];
        let as_of = date(2024, 1, 1);
        let report = score_experience(&experience, &[required("Rust", "expert", Some(4.0))], as_of);
        // ≈2 years of 4 → 50
        assert_eq!(report.score, 50);

        let none = score_experience(&[], &[required("Rust", "expert", Some(10.0))], as_of);
        assert_eq!(none.score, 20);
    }

    #[test]
    fn test_experience_without_requirements() {
        assert_eq!(score_experience(&[], &[], date(2024, 1, 1)).score, 100);
        assert_eq!(
            score_experience(&[], &[required("Rust", "expert", None)], date(2024, 1, 1)).score,
            100
        );
    }

    #[test]
    fn test_negative_span_counts_as_zero() {
        let experience = vec![ExperienceEntry {
            company: String::new(),
            title: String::new(),
            start_date: date(2024, 1, 1),
            end_date: Some(date(2020, 1, 1)),
        }];
        assert_eq!(total_years(&experience, date(2024, 6, 1)), 0.0);
    }

    #[test]
    fn test_availability_perfect() {
        let availability = Availability {
            kind: Some("freelance".to_string()),
            available_from: Some(date(2024, 1, 1)),
            hours_per_week: None,
        };
        let mission = Mission {
            kind: Some("Freelance".to_string()),
            start_date: Some(date(2024, 2, 1)),
        };
        let report = score_availability(&availability, &mission);
        assert_eq!(report.score, 100);
        assert!(report.type_match && report.date_match);
    }

    #[test]
    fn test_availability_penalties() {
        let availability = Availability {
            kind: Some("full_time".to_string()),
            available_from: Some(date(2024, 3, 15)),
            hours_per_week: None,
        };
        let mission = Mission {
            kind: Some("freelance".to_string()),
            start_date: Some(date(2024, 1, 1)),
        };
        // type mismatch −30, gap 74 days −40
        let report = score_availability(&availability, &mission);
        assert_eq!(report.score, 30);
        assert!(!report.date_match);

        let short_gap = Mission {
            kind: Some("full_time".to_string()),
            start_date: Some(date(2024, 3, 1)),
        };
        assert_eq!(score_availability(&availability, &short_gap).score, 80);
    }

    #[test]
    fn test_availability_missing_kind_is_mismatch() {
        let report = score_availability(&Availability::default(), &Mission::default());
        assert_eq!(report.score, 70);
        assert!(!report.type_match);
        assert!(report.date_match);
    }
}
