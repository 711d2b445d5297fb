use crate::error::CliError;
use crate::machine::machine_type_for;
use crate::model::{Ledger, RawShift, ShiftRecord};
use crate::oee::compute;
use crate::validate::validate_or_err;

/// Next surrogate id. Derived from the highest stored id so deletes never
/// cause reuse within the surviving range.
pub fn next_shift_id(ledger: &Ledger) -> String {
    let max = ledger
        .records
        .iter()
        .filter_map(|r| r.id.strip_prefix('s'))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("s{:04}", max + 1)
}

pub fn select_record_index(ledger: &Ledger, id: &str) -> Result<usize, CliError> {
    let s = id.trim();
    if s.is_empty() {
        return Err(CliError::usage("Record id is required"));
    }
    ledger
        .records
        .iter()
        .position(|r| r.id == s)
        .ok_or_else(|| CliError::not_found(format!("Record not found: {}", id)))
}

/// Validate raw fields, derive everything, and build the record. The only
/// path that constructs a `ShiftRecord`; append and edit both go through it,
/// so stored derived fields are always consistent with their raw fields.
///
/// Text keys are trimmed here, before validation, so a padded machine id is
/// stored in the same form the list filters match against.
pub fn make_record(id: String, mut raw: RawShift) -> Result<ShiftRecord, CliError> {
    raw.date = raw.date.trim().to_string();
    raw.machine_id = raw.machine_id.trim().to_string();
    raw.supervisor = raw.supervisor.trim().to_string();
    raw.product_code = raw
        .product_code
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    raw.remark = raw.remark.trim().to_string();

    validate_or_err(&raw)?;

    // validate() already refused unknown machines.
    let machine_type = machine_type_for(&raw.machine_id)
        .ok_or_else(|| CliError::usage(format!("Unknown machine number '{}'", raw.machine_id)))?;

    let derived = compute(&raw);
    Ok(ShiftRecord {
        id,
        machine_type,
        raw,
        derived,
    })
}

pub fn append_record(ledger: &mut Ledger, raw: RawShift) -> Result<ShiftRecord, CliError> {
    let id = next_shift_id(ledger);
    let record = make_record(id, raw)?;
    ledger.records.push(record.clone());
    Ok(record)
}

/// Replaces the record under `id` with one rebuilt from `new_raw`. All
/// derived fields are regenerated; nothing from the pre-edit record survives
/// except the id itself.
pub fn update_record(
    ledger: &mut Ledger,
    id: &str,
    new_raw: RawShift,
) -> Result<ShiftRecord, CliError> {
    let idx = select_record_index(ledger, id)?;
    let record = make_record(ledger.records[idx].id.clone(), new_raw)?;
    ledger.records[idx] = record.clone();
    Ok(record)
}

pub fn delete_record(ledger: &mut Ledger, id: &str) -> Result<ShiftRecord, CliError> {
    let idx = select_record_index(ledger, id)?;
    Ok(ledger.records.remove(idx))
}

/// Exact-match filters; a repeatable machine filter gives set membership over
/// several lines at once. Empty filter lists match everything.
#[derive(Debug, Clone, Default)]
pub struct ShiftFilter {
    pub date: Option<String>,
    pub machines: Vec<String>,
    pub supervisor: Option<String>,
    pub product: Option<String>,
    pub crew_size: Option<u32>,
}

impl ShiftFilter {
    fn matches(&self, r: &ShiftRecord) -> bool {
        if let Some(d) = self.date.as_deref() {
            if r.raw.date != d {
                return false;
            }
        }
        if !self.machines.is_empty() && !self.machines.iter().any(|m| *m == r.raw.machine_id) {
            return false;
        }
        if let Some(s) = self.supervisor.as_deref() {
            if r.raw.supervisor != s {
                return false;
            }
        }
        if let Some(p) = self.product.as_deref() {
            if r.raw.product_code.as_deref() != Some(p) {
                return false;
            }
        }
        if let Some(c) = self.crew_size {
            if r.raw.crew_size != c {
                return false;
            }
        }
        true
    }
}

/// Insertion order by default; `reverse` gives the newest-first view used by
/// the recent-entries table.
pub fn list_records(ledger: &Ledger, filter: &ShiftFilter, reverse: bool) -> Vec<ShiftRecord> {
    let mut out: Vec<ShiftRecord> = ledger
        .records
        .iter()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect();
    if reverse {
        out.reverse();
    }
    out
}
