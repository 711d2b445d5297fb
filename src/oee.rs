use crate::model::{Derived, RawShift};

/// Derive every computed field from one shift's raw inputs.
///
/// Fixed evaluation order, each step feeding the next. Every degenerate
/// denominator has a defined zero fallback: a shift with no meaningful
/// scheduled time or output reports 0%, it does not error. Percentages stay
/// at full precision here; rounding happens only at display/persist time.
pub fn compute(raw: &RawShift) -> Derived {
    let planned_stop_total =
        raw.stop_startup_min + raw.stop_changeover_min + raw.stop_cleaning_min;

    let scheduled_production_time = raw.shift_duration_min as i64
        - raw.scheduled_break_min as i64
        - planned_stop_total as i64;

    let unplanned_stop_total =
        raw.wait_mechanic_min + raw.wait_qc_min + raw.wait_material_min + raw.wait_misc_min;

    // Can go negative when unplanned stoppage exceeds scheduled time; that is
    // a valid signed value, not an error.
    let actual_run_time = scheduled_production_time - unplanned_stop_total as i64;

    let availability_pct = if scheduled_production_time > 0 {
        100.0 * actual_run_time as f64 / scheduled_production_time as f64
    } else {
        0.0
    };

    let theoretical_max_output = if raw.rated_speed > 0.0 {
        actual_run_time as f64 * raw.rated_speed
    } else {
        0.0
    };

    let performance_pct = if theoretical_max_output > 0.0 {
        100.0 * raw.units_produced_total as f64 / theoretical_max_output
    } else {
        0.0
    };

    let units_good = raw.units_produced_total.saturating_sub(raw.units_rejected);

    let quality_pct = if raw.units_produced_total > 0 {
        100.0 * units_good as f64 / raw.units_produced_total as f64
    } else {
        0.0
    };

    let oee_pct = availability_pct * performance_pct * quality_pct / 10_000.0;

    Derived {
        planned_stop_total,
        scheduled_production_time,
        unplanned_stop_total,
        actual_run_time,
        availability_pct,
        performance_pct,
        quality_pct,
        oee_pct,
        theoretical_max_output,
        units_good,
    }
}

/// One-decimal rounding for display and persistence.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
