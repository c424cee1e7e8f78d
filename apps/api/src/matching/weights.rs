use serde::{Deserialize, Serialize};

/// Fixed criterion weights. They must form a convex combination so the total
/// stays inside [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    pub skills: f64,
    pub location: f64,
    pub budget: f64,
    pub experience: f64,
    pub languages: f64,
    pub availability: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            skills: 0.30,
            location: 0.20,
            budget: 0.20,
            experience: 0.15,
            languages: 0.10,
            availability: 0.05,
        }
    }
}

impl MatchWeights {
    pub fn sum(&self) -> f64 {
        self.skills + self.location + self.budget + self.experience + self.languages + self.availability
    }

    /// True when every weight is non-negative and they sum to 1.0.
    pub fn is_convex(&self) -> bool {
        let all_non_negative = [
            self.skills,
            self.location,
            self.budget,
            self.experience,
            self.languages,
            self.availability,
        ]
        .iter()
        .all(|w| *w >= 0.0);
        all_non_negative && (self.sum() - 1.0).abs() < 1e-9
    }
}

/// Sub-scores for the six criteria, each in [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CriterionScores {
    pub skills: u32,
    pub location: u32,
    pub budget: u32,
    pub experience: u32,
    pub languages: u32,
    pub availability: u32,
}

/// Weighted sum of the sub-scores, rounded and clamped to [0, 100].
pub fn combine(scores: &CriterionScores, weights: &MatchWeights) -> u32 {
    let total = weights.skills * scores.skills as f64
        + weights.location * scores.location as f64
        + weights.budget * scores.budget as f64
        + weights.experience * scores.experience as f64
        + weights.languages * scores.languages as f64
        + weights.availability * scores.availability as f64;
    total.round().clamp(0.0, 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_are_convex() {
        let w = MatchWeights::default();
        assert!(w.is_convex(), "sum was {}", w.sum());
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let w = MatchWeights {
            skills: 1.1,
            location: -0.1,
            budget: 0.0,
            experience: 0.0,
            languages: 0.0,
            availability: 0.0,
        };
        assert!(!w.is_convex());
    }

    #[test]
    fn test_combine_full_scores() {
        let scores = CriterionScores {
            skills: 100,
            location: 100,
            budget: 100,
            experience: 100,
            languages: 100,
            availability: 100,
        };
        assert_eq!(combine(&scores, &MatchWeights::default()), 100);
    }

    #[test]
    fn test_combine_partial() {
        // 0.3*80 + 0.2*50 + 0.2*100 + 0.15*20 + 0.1*100 + 0.05*80
        // = 24 + 10 + 20 + 3 + 10 + 4 = 71
        let scores = CriterionScores {
            skills: 80,
            location: 50,
            budget: 100,
            experience: 20,
            languages: 100,
            availability: 80,
        };
        assert_eq!(combine(&scores, &MatchWeights::default()), 71);
    }

    #[test]
    fn test_combine_zero() {
        assert_eq!(combine(&CriterionScores::default(), &MatchWeights::default()), 0);
    }
}
