use crate::error::CliError;
use crate::model::RawShift;
use crate::store::{parse_number, split_row};
use crate::validate::validate;
use std::collections::HashMap;

/// Result of scanning an external table: the rows worth keeping and the
/// count of rows dropped on the floor.
#[derive(Debug)]
pub struct ImportOutcome {
    pub accepted: Vec<RawShift>,
    pub dropped: usize,
}

const REQUIRED_COLUMNS: &[&str] = &[
    "date",
    "machine_id",
    "supervisor",
    "crew_size",
    "rated_speed",
    "shift_duration_min",
    "units_produced_total",
];

const OPTIONAL_COLUMNS: &[&str] = &[
    "product_code",
    "scheduled_break_min",
    "stop_startup_min",
    "stop_changeover_min",
    "stop_cleaning_min",
    "wait_mechanic_min",
    "wait_qc_min",
    "wait_material_min",
    "wait_misc_min",
    "units_rejected",
    "remark",
];

fn header_index(header: &[String]) -> Result<HashMap<String, usize>, CliError> {
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, name) in header.iter().enumerate() {
        index.entry(name.trim().to_string()).or_insert(i);
    }
    for required in REQUIRED_COLUMNS {
        if !index.contains_key(*required) {
            return Err(CliError::usage(format!(
                "Import file is missing required column '{}'",
                required
            )));
        }
    }
    Ok(index)
}

fn cell<'a>(fields: &'a [String], index: &HashMap<String, usize>, name: &str) -> &'a str {
    index
        .get(name)
        .and_then(|i| fields.get(*i))
        .map(|s| s.trim())
        .unwrap_or("")
}

fn numeric_u32(fields: &[String], index: &HashMap<String, usize>, name: &str) -> Option<u32> {
    let s = cell(fields, index, name);
    if s.is_empty() && OPTIONAL_COLUMNS.contains(&name) {
        return Some(0);
    }
    let v = parse_number(s)?;
    if v < 0.0 || v.fract() != 0.0 {
        return None;
    }
    Some(v as u32)
}

fn numeric_u64(fields: &[String], index: &HashMap<String, usize>, name: &str) -> Option<u64> {
    let s = cell(fields, index, name);
    if s.is_empty() && OPTIONAL_COLUMNS.contains(&name) {
        return Some(0);
    }
    let v = parse_number(s)?;
    if v < 0.0 || v.fract() != 0.0 {
        return None;
    }
    Some(v as u64)
}

fn parse_row(fields: &[String], index: &HashMap<String, usize>) -> Option<RawShift> {
    let product = cell(fields, index, "product_code");
    let raw = RawShift {
        date: cell(fields, index, "date").to_string(),
        machine_id: cell(fields, index, "machine_id").to_string(),
        supervisor: cell(fields, index, "supervisor").to_string(),
        crew_size: numeric_u32(fields, index, "crew_size")?,
        product_code: if product.is_empty() {
            None
        } else {
            Some(product.to_string())
        },
        rated_speed: parse_number(cell(fields, index, "rated_speed"))?,
        shift_duration_min: numeric_u32(fields, index, "shift_duration_min")?,
        scheduled_break_min: numeric_u32(fields, index, "scheduled_break_min")?,
        stop_startup_min: numeric_u32(fields, index, "stop_startup_min")?,
        stop_changeover_min: numeric_u32(fields, index, "stop_changeover_min")?,
        stop_cleaning_min: numeric_u32(fields, index, "stop_cleaning_min")?,
        wait_mechanic_min: numeric_u32(fields, index, "wait_mechanic_min")?,
        wait_qc_min: numeric_u32(fields, index, "wait_qc_min")?,
        wait_material_min: numeric_u32(fields, index, "wait_material_min")?,
        wait_misc_min: numeric_u32(fields, index, "wait_misc_min")?,
        units_produced_total: numeric_u64(fields, index, "units_produced_total")?,
        units_rejected: numeric_u64(fields, index, "units_rejected")?,
        remark: cell(fields, index, "remark").to_string(),
    };

    // A row that parses but violates the save-time rules is dropped too;
    // import never half-accepts a shift.
    if !validate(&raw).is_empty() {
        return None;
    }
    Some(raw)
}

/// Parse an external semicolon-delimited table of raw shift columns. Columns
/// are located by header name, numeric cells may use a decimal comma, and
/// unparseable or invalid rows are dropped and counted, never read as zero.
pub fn scan_table(text: &str) -> Result<ImportOutcome, CliError> {
    let mut lines = text.lines();
    let header = lines
        .next()
        .ok_or_else(|| CliError::usage("Import file is empty"))?;
    let index = header_index(&split_row(header))?;

    let mut accepted: Vec<RawShift> = Vec::new();
    let mut dropped = 0usize;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(&split_row(line), &index) {
            Some(raw) => accepted.push(raw),
            None => dropped += 1,
        }
    }

    Ok(ImportOutcome { accepted, dropped })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "date;machine_id;supervisor;crew_size;product_code;rated_speed;\
shift_duration_min;scheduled_break_min;stop_startup_min;units_produced_total;units_rejected";

    fn table(rows: &[&str]) -> String {
        let mut t = String::from(HEADER);
        for r in rows {
            t.push('\n');
            t.push_str(r);
        }
        t.push('\n');
        t
    }

    #[test]
    fn decimal_comma_rows_are_normalized() {
        let text = table(&["2026-03-02;24;Marla;5;P-1;30,5;525;45;5;14250;0"]);
        let out = scan_table(&text).unwrap();
        assert_eq!(out.dropped, 0);
        assert_eq!(out.accepted.len(), 1);
        assert_eq!(out.accepted[0].rated_speed, 30.5);
        assert_eq!(out.accepted[0].stop_changeover_min, 0); // absent column
    }

    #[test]
    fn unparseable_rows_are_dropped_not_zeroed() {
        let text = table(&[
            "2026-03-02;24;Marla;5;P-1;30;525;45;5;14250;0",
            "garbage-date;24;Marla;5;P-1;30;525;45;5;14250;0",
            "2026-03-03;24;Marla;5;P-1;not-a-number;525;45;5;14250;0",
            "2026-03-04;24;Marla;5;P-1;30;525;45;5;;0",
        ]);
        let out = scan_table(&text).unwrap();
        assert_eq!(out.accepted.len(), 1);
        assert_eq!(out.dropped, 3);
    }

    #[test]
    fn rows_violating_save_rules_are_dropped() {
        let text = table(&[
            "2026-03-02;99;Marla;5;P-1;30;525;45;5;14250;0",
            "2026-03-02;24;;5;P-1;30;525;45;5;14250;0",
        ]);
        let out = scan_table(&text).unwrap();
        assert_eq!(out.accepted.len(), 0);
        assert_eq!(out.dropped, 2);
    }

    #[test]
    fn missing_required_column_is_a_usage_error() {
        let err = scan_table("date;machine_id\n2026-03-02;24\n").unwrap_err();
        assert_eq!(err.exit_code, 2);
        assert!(err.message.contains("supervisor"));
    }
}
