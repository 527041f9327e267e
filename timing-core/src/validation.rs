// Race entry validation against server-declared constraints.
// Invariants: without a loaded config only the non-empty name and positive lap count rules apply.

use serde::Serialize;
use thiserror::Error;

use crate::model::ServerConfig;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    #[error("Please enter a name")]
    NameEmpty,
    #[error("Name must be at most {max} characters")]
    NameTooLong { max: usize },
    #[error("Name may only contain letters, digits and spaces")]
    NameInvalidChars,
    #[error("Lap count must be a positive integer")]
    LapsNotPositive,
    #[error("Lap count must be between {min} and {max}")]
    LapsOutOfRange { min: u32, max: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RaceEntry {
    pub name: String,
    pub laps: u32,
}

pub fn is_allowed_name_char(c: char) -> bool {
    c.is_alphanumeric() || c.is_whitespace()
}

fn check_name(name: &str, config: Option<&ServerConfig>, issues: &mut Vec<ValidationIssue>) {
    if name.is_empty() {
        issues.push(ValidationIssue::NameEmpty);
        return;
    }
    let Some(config) = config else {
        return;
    };
    if name.chars().count() > config.name_max_len {
        issues.push(ValidationIssue::NameTooLong {
            max: config.name_max_len,
        });
    }
    if !name.chars().all(is_allowed_name_char) {
        issues.push(ValidationIssue::NameInvalidChars);
    }
}

fn check_laps(laps: &str, config: Option<&ServerConfig>, issues: &mut Vec<ValidationIssue>) -> Option<u32> {
    let laps = match laps.trim().parse::<u32>() {
        Ok(laps) if laps > 0 => laps,
        _ => {
            issues.push(ValidationIssue::LapsNotPositive);
            return None;
        }
    };
    if let Some(config) = config {
        if laps < config.min_laps || laps > config.max_laps {
            issues.push(ValidationIssue::LapsOutOfRange {
                min: config.min_laps,
                max: config.max_laps,
            });
            return None;
        }
    }
    Some(laps)
}

/// Validates raw form input. Name rules run first; a failing name stops before the lap rules.
pub fn validate_entry(
    name: &str,
    laps: &str,
    config: Option<&ServerConfig>,
) -> Result<RaceEntry, Vec<ValidationIssue>> {
    let name = name.trim();
    let mut issues = Vec::new();
    check_name(name, config, &mut issues);
    if !issues.is_empty() {
        return Err(issues);
    }
    let laps = check_laps(laps, config, &mut issues);

    match laps {
        Some(laps) if issues.is_empty() => Ok(RaceEntry {
            name: name.to_string(),
            laps,
        }),
        _ => Err(issues),
    }
}
