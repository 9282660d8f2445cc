//! Local predicates the upstream search endpoint cannot express.
//!
//! All matching is case-insensitive substring matching. Missing fields
//! count as empty text, so every predicate is total.

use crate::model::task::{CustomField, Task};

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn name_matches(field: &CustomField, fragment: &str) -> bool {
    contains_ci(&field.name, fragment)
}

/// Free-text search over name, description and custom field values.
pub fn matches_search(task: &Task, term: &str) -> bool {
    let term = term.to_lowercase();
    contains_ci(task.name(), &term)
        || contains_ci(task.description(), &term)
        || task.custom_fields.iter().any(|field| {
            let value = field.normalized();
            contains_ci(value.as_text().unwrap_or(&field.name), &term)
        })
}

/// True when a custom field named like "sector" holds the sector term.
pub fn matches_sector(task: &Task, sector: &str) -> bool {
    let sector = sector.to_lowercase();
    task.custom_fields
        .iter()
        .filter(|field| name_matches(field, "sector"))
        .any(|field| {
            field
                .normalized()
                .as_text()
                .is_some_and(|value| contains_ci(value, &sector))
        })
}

/// Job numbers live in the name, the description, or a "Job Number" field.
pub fn matches_job_number(task: &Task, job_number: &str) -> bool {
    let job_number = job_number.to_lowercase();
    if contains_ci(task.name(), &job_number) || contains_ci(task.description(), &job_number) {
        return true;
    }
    task.custom_fields
        .iter()
        .filter(|field| name_matches(field, "job number"))
        .any(|field| {
            field.normalized().as_text().is_some_and(|value| {
                let value = value.to_lowercase();
                value == job_number || value.contains(&job_number)
            })
        })
}
