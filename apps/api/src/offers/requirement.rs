//! Offers may carry a structured requirement. Older or quickly-posted offers
//! only have free-form fields, so a requirement is derived from those.

use crate::matching::types::{LocationPreference, Mission, RequiredSkill, Requirement};
use crate::models::offer::OfferRow;

/// Level assumed for technologies listed without one.
const DEFAULT_SKILL_LEVEL: &str = "debutant";

pub fn effective_requirement(offer: &OfferRow) -> Requirement {
    match &offer.requirement {
        Some(requirement) => requirement.0.clone(),
        None => derive_requirement(offer),
    }
}

pub fn derive_requirement(offer: &OfferRow) -> Requirement {
    let skills = offer
        .technologies
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| RequiredSkill {
            name: t.to_string(),
            level: DEFAULT_SKILL_LEVEL.to_string(),
            years_experience: None,
            mandatory: true,
        })
        .collect();

    Requirement {
        skills,
        location: LocationPreference {
            regions: Vec::new(),
            countries: offer.country.iter().cloned().collect(),
            remote: offer.remote_type == "remote",
        },
        budget: None,
        languages: Vec::new(),
        mission: Mission {
            kind: mission_kind(&offer.kind),
            start_date: None,
        },
    }
}

/// Maps a contract type onto the availability vocabulary used by profiles.
fn mission_kind(contract: &str) -> Option<String> {
    let contract = contract.trim().to_lowercase();
    let kind = match contract.as_str() {
        "" => return None,
        "cdi" | "cdd" | "full_time" | "full-time" => "full_time",
        "part_time" | "part-time" | "temps_partiel" => "part_time",
        "stage" | "internship" => "internship",
        "alternance" | "contract" => "contract",
        "freelance" | "mission" => "freelance",
        other => other,
    };
    Some(kind.to_string())
}
