use crate::date::parse_date_string;
use crate::error::CliError;
use crate::machine::machine_type_for;
use crate::model::RawShift;

/// Required-field check run before every append and edit. Returns every
/// violated rule, not just the first; the caller surfaces them together.
pub fn validate(raw: &RawShift) -> Vec<String> {
    let mut rules: Vec<String> = Vec::new();

    if parse_date_string(&raw.date, "date").is_err() {
        rules.push(format!("Date must be YYYY-MM-DD, got '{}'.", raw.date));
    }
    if machine_type_for(&raw.machine_id).is_none() {
        rules.push(format!("Unknown machine number '{}'.", raw.machine_id));
    }
    if raw.supervisor.trim().is_empty() {
        rules.push("Supervisor name is required.".to_string());
    }
    if raw.crew_size == 0 {
        rules.push("Crew size must be greater than 0.".to_string());
    }
    if !(raw.rated_speed > 0.0) {
        rules.push("Rated speed must be greater than 0.".to_string());
    }
    if raw.shift_duration_min == 0 {
        rules.push("Shift duration must be greater than 0.".to_string());
    }
    // The store is line-oriented; a line break inside a cell would split the
    // record on the next load.
    for (label, value) in [
        ("Supervisor", raw.supervisor.as_str()),
        ("Product code", raw.product_code.as_deref().unwrap_or("")),
        ("Remark", raw.remark.as_str()),
    ] {
        if value.contains(['\n', '\r']) {
            rules.push(format!("{} must not contain line breaks.", label));
        }
    }
    // units_produced_total may legitimately be 0 (total line stoppage), but
    // rejects beyond production would push quality below zero.
    if raw.units_rejected > raw.units_produced_total {
        rules.push(format!(
            "Rejected units ({}) exceed produced units ({}).",
            raw.units_rejected, raw.units_produced_total
        ));
    }

    rules
}

pub fn validate_or_err(raw: &RawShift) -> Result<(), CliError> {
    let rules = validate(raw);
    if rules.is_empty() {
        Ok(())
    } else {
        Err(CliError::validation(&rules))
    }
}
