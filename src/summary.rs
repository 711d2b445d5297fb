use crate::date::iso_week_id;
use crate::error::CliError;
use crate::model::{Ledger, ShiftRecord};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Machine,
    MachineType,
    Supervisor,
    Product,
    Crew,
    Date,
    Week,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Oee,
    Availability,
    Performance,
    Quality,
    Units,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agg {
    Mean,
    Min,
    Max,
    Sum,
    Count,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SummaryRow {
    pub key: String,
    pub shifts: u32,
    pub value: f64,
}

fn group_label(record: &ShiftRecord, key: GroupKey) -> Result<String, CliError> {
    Ok(match key {
        GroupKey::Machine => record.raw.machine_id.clone(),
        GroupKey::MachineType => record.machine_type.as_str().to_string(),
        GroupKey::Supervisor => record.raw.supervisor.clone(),
        GroupKey::Product => record
            .raw
            .product_code
            .clone()
            .unwrap_or_else(|| "(none)".to_string()),
        GroupKey::Crew => record.raw.crew_size.to_string(),
        GroupKey::Date => record.raw.date.clone(),
        GroupKey::Week => iso_week_id(&record.raw.date)?,
    })
}

fn metric_value(record: &ShiftRecord, metric: Metric) -> f64 {
    match metric {
        Metric::Oee => record.derived.oee_pct,
        Metric::Availability => record.derived.availability_pct,
        Metric::Performance => record.derived.performance_pct,
        Metric::Quality => record.derived.quality_pct,
        Metric::Units => record.derived.units_good as f64,
    }
}

fn reduce(values: &[f64], agg: Agg) -> f64 {
    match agg {
        Agg::Mean => values.iter().sum::<f64>() / values.len() as f64,
        Agg::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
        Agg::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        Agg::Sum => values.iter().sum(),
        Agg::Count => values.len() as f64,
    }
}

/// Pure read-side reduction over the ledger; groups sort by key. Groups are
/// non-empty by construction so every aggregate is defined.
pub fn build_summary(
    ledger: &Ledger,
    key: GroupKey,
    metric: Metric,
    agg: Agg,
) -> Result<Vec<SummaryRow>, CliError> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in ledger.records.iter() {
        groups
            .entry(group_label(r, key)?)
            .or_default()
            .push(metric_value(r, metric));
    }

    Ok(groups
        .into_iter()
        .map(|(key, values)| SummaryRow {
            key,
            shifts: values.len() as u32,
            value: reduce(&values, agg),
        })
        .collect())
}
