//! Proficiency ladders shared by the skill and language criteria.
//!
//! Level strings come straight from user input, so parsing is lenient: both the
//! French labels used by existing clients and their English equivalents are
//! accepted, case- and accent-insensitively. Anything else ranks 0.

/// Credit for meeting or exceeding the required level.
pub const FULL_CREDIT: f64 = 1.0;
/// Credit for being exactly one level short.
pub const PARTIAL_CREDIT: f64 = 0.7;

pub fn skill_rank(level: &str) -> u8 {
    match normalize(level).as_str() {
        "debutant" | "beginner" | "junior" => 1,
        "intermediaire" | "intermediate" => 2,
        "avance" | "advanced" | "senior" => 3,
        "expert" => 4,
        _ => 0,
    }
}

pub fn language_rank(level: &str) -> u8 {
    match normalize(level).as_str() {
        "debutant" | "beginner" | "basic" => 1,
        "intermediaire" | "intermediate" => 2,
        "courant" | "fluent" | "avance" | "advanced" => 3,
        "natif" | "native" | "bilingue" | "bilingual" => 4,
        _ => 0,
    }
}

/// Credit earned by a possessed rank against a required rank.
pub fn level_credit(possessed: u8, required: u8) -> f64 {
    if possessed >= required {
        FULL_CREDIT
    } else if possessed + 1 == required {
        PARTIAL_CREDIT
    } else {
        0.0
    }
}

fn normalize(level: &str) -> String {
    level
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' => 'e',
            'à' | 'â' => 'a',
            'î' | 'ï' => 'i',
            ' ' | '-' => '_',
            other => other,
        })
        .collect()
}
