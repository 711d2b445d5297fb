#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MachineType {
    Pot,
    Parfum,
    Tube,
}

impl MachineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineType::Pot => "Pot",
            MachineType::Parfum => "Parfum",
            MachineType::Tube => "Tube",
        }
    }
}

/// Raw shift fields as entered by the operator. Everything here is input;
/// nothing in `Derived` is.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RawShift {
    pub date: String,
    pub machine_id: String,
    pub supervisor: String,
    pub crew_size: u32,
    pub product_code: Option<String>,
    /// Rated line speed in units per minute.
    pub rated_speed: f64,
    pub shift_duration_min: u32,
    pub scheduled_break_min: u32,
    pub stop_startup_min: u32,
    pub stop_changeover_min: u32,
    pub stop_cleaning_min: u32,
    pub wait_mechanic_min: u32,
    pub wait_qc_min: u32,
    pub wait_material_min: u32,
    pub wait_misc_min: u32,
    pub units_produced_total: u64,
    pub units_rejected: u64,
    pub remark: String,
}

/// Calculator output. Regenerated from `RawShift` on every append and edit;
/// stale values never survive a mutation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Derived {
    pub planned_stop_total: u32,
    pub scheduled_production_time: i64,
    pub unplanned_stop_total: u32,
    pub actual_run_time: i64,
    pub availability_pct: f64,
    pub performance_pct: f64,
    pub quality_pct: f64,
    pub oee_pct: f64,
    pub theoretical_max_output: f64,
    pub units_good: u64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ShiftRecord {
    /// Surrogate key (`s0001`, `s0002`, ...) persisted as a first-class
    /// column; edits and deletes key off this, never off the row position.
    pub id: String,
    pub machine_type: MachineType,
    #[serde(flatten)]
    pub raw: RawShift,
    #[serde(flatten)]
    pub derived: Derived,
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub records: Vec<ShiftRecord>,
}
