mod auth;
mod date;
mod error;
mod import;
mod ledger;
mod machine;
mod model;
mod oee;
mod output;
mod store;
mod summary;
mod validate;

use crate::auth::verify_password;
use crate::date::{parse_date_string, system_today_utc};
use crate::error::CliError;
use crate::import::scan_table;
use crate::ledger::{
    append_record, delete_record, list_records, select_record_index, update_record, ShiftFilter,
};
use crate::model::{RawShift, ShiftRecord};
use crate::output::{fmt_pct, render_simple_table, Styler};
use crate::store::{read_ledger, resolve_store_path, update_ledger};
use crate::summary::{build_summary, Agg, GroupKey, Metric};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "oee", version, about = "OEE shift ledger for the production floor")]
struct Cli {
    /// Overrides the ledger file path for this invocation.
    #[arg(long, global = true)]
    store: Option<String>,

    /// Overrides logical "today" for deterministic output/testing.
    #[arg(long, global = true)]
    today: Option<String>,

    #[arg(long, global = true, value_enum, default_value = "table")]
    format: Format,

    /// Disables ANSI color output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record one shift: validates, computes the OEE metrics, appends.
    Add(AddArgs),
    List(ListArgs),
    Show(ShowArgs),
    /// Change raw fields of a stored record; every derived field is recomputed.
    Edit(EditArgs),
    Delete(DeleteArgs),
    /// Aggregate a metric over the ledger, grouped by a key.
    Summary(SummaryArgs),
    /// Load shifts from an external semicolon-delimited table.
    Import(ImportArgs),
}

#[derive(Args, Debug)]
struct AddArgs {
    /// Shift date, YYYY-MM-DD (defaults to today).
    #[arg(long)]
    date: Option<String>,

    /// Machine number (must be in the fixed machine table).
    #[arg(long)]
    machine: String,

    #[arg(long)]
    supervisor: String,

    #[arg(long, default_value_t = 5)]
    crew: u32,

    #[arg(long)]
    product: Option<String>,

    /// Rated line speed in units per minute.
    #[arg(long)]
    speed: f64,

    /// Total shift duration in minutes.
    #[arg(long, default_value_t = 525)]
    duration: u32,

    /// Scheduled break in minutes.
    #[arg(long = "break", default_value_t = 45)]
    break_min: u32,

    /// Planned stop: startup/shutdown minutes.
    #[arg(long, default_value_t = 5)]
    startup: u32,

    /// Planned stop: changeover minutes.
    #[arg(long, default_value_t = 0)]
    changeover: u32,

    /// Planned stop: cleaning minutes.
    #[arg(long, default_value_t = 0)]
    cleaning: u32,

    /// Unplanned stop: waiting for the mechanic, minutes.
    #[arg(long, default_value_t = 0)]
    mechanic: u32,

    /// Unplanned stop: waiting for QC, minutes.
    #[arg(long, default_value_t = 0)]
    qc: u32,

    /// Unplanned stop: waiting for material, minutes.
    #[arg(long, default_value_t = 0)]
    material: u32,

    /// Unplanned stop: miscellaneous minutes.
    #[arg(long, default_value_t = 0)]
    misc: u32,

    /// Total units produced, rejects included. May be 0 (full stoppage).
    #[arg(long, default_value_t = 0)]
    produced: u64,

    #[arg(long, default_value_t = 0)]
    rejected: u64,

    #[arg(long)]
    remark: Option<String>,
}

impl AddArgs {
    fn into_raw(self, today: &str) -> RawShift {
        RawShift {
            date: self.date.unwrap_or_else(|| today.to_string()),
            machine_id: self.machine,
            supervisor: self.supervisor,
            crew_size: self.crew,
            product_code: self.product,
            rated_speed: self.speed,
            shift_duration_min: self.duration,
            scheduled_break_min: self.break_min,
            stop_startup_min: self.startup,
            stop_changeover_min: self.changeover,
            stop_cleaning_min: self.cleaning,
            wait_mechanic_min: self.mechanic,
            wait_qc_min: self.qc,
            wait_material_min: self.material,
            wait_misc_min: self.misc,
            units_produced_total: self.produced,
            units_rejected: self.rejected,
            remark: self.remark.unwrap_or_default(),
        }
    }
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long)]
    date: Option<String>,

    /// Machine number; repeat to select several lines at once.
    #[arg(long)]
    machine: Vec<String>,

    #[arg(long)]
    supervisor: Option<String>,

    #[arg(long)]
    product: Option<String>,

    #[arg(long)]
    crew: Option<u32>,

    /// Newest first (the recent-entries view).
    #[arg(long)]
    reverse: bool,
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Record id (s0001)
    id: String,
}

#[derive(Args, Debug)]
struct EditArgs {
    /// Record id (s0001)
    id: String,

    /// Shared secret gating the editing surface.
    #[arg(long)]
    password: Option<String>,

    #[arg(long)]
    date: Option<String>,

    #[arg(long)]
    machine: Option<String>,

    #[arg(long)]
    supervisor: Option<String>,

    #[arg(long)]
    crew: Option<u32>,

    #[arg(long)]
    product: Option<String>,

    #[arg(long)]
    speed: Option<f64>,

    #[arg(long)]
    duration: Option<u32>,

    #[arg(long = "break")]
    break_min: Option<u32>,

    #[arg(long)]
    startup: Option<u32>,

    #[arg(long)]
    changeover: Option<u32>,

    #[arg(long)]
    cleaning: Option<u32>,

    #[arg(long)]
    mechanic: Option<u32>,

    #[arg(long)]
    qc: Option<u32>,

    #[arg(long)]
    material: Option<u32>,

    #[arg(long)]
    misc: Option<u32>,

    #[arg(long)]
    produced: Option<u64>,

    #[arg(long)]
    rejected: Option<u64>,

    #[arg(long)]
    remark: Option<String>,
}

impl EditArgs {
    fn apply_to(&self, raw: &mut RawShift) {
        if let Some(v) = self.date.clone() {
            raw.date = v;
        }
        if let Some(v) = self.machine.clone() {
            raw.machine_id = v;
        }
        if let Some(v) = self.supervisor.clone() {
            raw.supervisor = v;
        }
        if let Some(v) = self.crew {
            raw.crew_size = v;
        }
        if let Some(v) = self.product.clone() {
            raw.product_code = if v.is_empty() { None } else { Some(v) };
        }
        if let Some(v) = self.speed {
            raw.rated_speed = v;
        }
        if let Some(v) = self.duration {
            raw.shift_duration_min = v;
        }
        if let Some(v) = self.break_min {
            raw.scheduled_break_min = v;
        }
        if let Some(v) = self.startup {
            raw.stop_startup_min = v;
        }
        if let Some(v) = self.changeover {
            raw.stop_changeover_min = v;
        }
        if let Some(v) = self.cleaning {
            raw.stop_cleaning_min = v;
        }
        if let Some(v) = self.mechanic {
            raw.wait_mechanic_min = v;
        }
        if let Some(v) = self.qc {
            raw.wait_qc_min = v;
        }
        if let Some(v) = self.material {
            raw.wait_material_min = v;
        }
        if let Some(v) = self.misc {
            raw.wait_misc_min = v;
        }
        if let Some(v) = self.produced {
            raw.units_produced_total = v;
        }
        if let Some(v) = self.rejected {
            raw.units_rejected = v;
        }
        if let Some(v) = self.remark.clone() {
            raw.remark = v;
        }
    }
}

#[derive(Args, Debug)]
struct DeleteArgs {
    /// Record id (s0001)
    id: String,

    /// Shared secret gating the editing surface.
    #[arg(long)]
    password: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum GroupKeyArg {
    Machine,
    MachineType,
    Supervisor,
    Product,
    Crew,
    Date,
    Week,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum MetricArg {
    Oee,
    Availability,
    Performance,
    Quality,
    Units,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum AggArg {
    Mean,
    Min,
    Max,
    Sum,
    Count,
}

#[derive(Args, Debug)]
struct SummaryArgs {
    #[arg(long, value_enum)]
    by: GroupKeyArg,

    #[arg(long, value_enum, default_value = "oee")]
    metric: MetricArg,

    #[arg(long, value_enum, default_value = "mean")]
    agg: AggArg,
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Path to the semicolon-delimited table of raw shift columns.
    path: String,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let exit = match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}", e);
            e.exit_code
        }
    };

    std::process::exit(exit);
}

fn print_line(s: &str) {
    println!("{}", s);
}

fn print_json<T: serde::Serialize>(obj: &T) -> Result<(), CliError> {
    let s = serde_json::to_string_pretty(obj).map_err(|_| CliError::io("Store IO error"))?;
    println!("{}", s);
    Ok(())
}

fn resolve_today(cli_today: Option<&str>) -> Result<String, CliError> {
    if let Some(t) = cli_today {
        parse_date_string(t, "today")?;
        return Ok(t.to_string());
    }

    if let Ok(t) = std::env::var("OEE_TODAY") {
        let tt = t.trim();
        if !tt.is_empty() {
            parse_date_string(tt, "today")?;
            return Ok(tt.to_string());
        }
    }

    Ok(system_today_utc())
}

fn resolve_color_enabled(no_color_flag: bool) -> bool {
    if no_color_flag {
        return false;
    }
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    true
}

fn metric_strip(record: &ShiftRecord) -> String {
    render_simple_table(
        &["availability", "performance", "quality", "oee"],
        &[vec![
            fmt_pct(record.derived.availability_pct),
            fmt_pct(record.derived.performance_pct),
            fmt_pct(record.derived.quality_pct),
            fmt_pct(record.derived.oee_pct),
        ]],
    )
}

fn record_rows(records: &[ShiftRecord]) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|r| {
            vec![
                r.id.clone(),
                r.raw.date.clone(),
                r.raw.machine_id.clone(),
                r.machine_type.as_str().to_string(),
                r.raw.supervisor.clone(),
                r.raw.crew_size.to_string(),
                r.raw.units_produced_total.to_string(),
                fmt_pct(r.derived.oee_pct),
            ]
        })
        .collect()
}

const RECORD_HEADERS: &[&str] = &[
    "id",
    "date",
    "machine",
    "type",
    "supervisor",
    "crew",
    "produced",
    "oee",
];

fn print_record_detail(record: &ShiftRecord) {
    let r = &record.raw;
    let d = &record.derived;
    print_line(&format!(
        "{}  {}  {} line {}",
        record.id,
        r.date,
        record.machine_type.as_str(),
        r.machine_id
    ));
    print_line(&format!("supervisor: {} (crew {})", r.supervisor, r.crew_size));
    if let Some(p) = r.product_code.as_deref() {
        print_line(&format!("product: {}", p));
    }
    print_line(&format!("rated speed: {} units/min", r.rated_speed));
    print_line(&format!(
        "shift: {} min, break {} min",
        r.shift_duration_min, r.scheduled_break_min
    ));
    print_line(&format!(
        "planned stops: startup {} + changeover {} + cleaning {} = {} min",
        r.stop_startup_min, r.stop_changeover_min, r.stop_cleaning_min, d.planned_stop_total
    ));
    print_line(&format!(
        "unplanned stops: mechanic {} + qc {} + material {} + misc {} = {} min",
        r.wait_mechanic_min, r.wait_qc_min, r.wait_material_min, r.wait_misc_min,
        d.unplanned_stop_total
    ));
    print_line(&format!(
        "scheduled production time: {} min, actual run time: {} min",
        d.scheduled_production_time, d.actual_run_time
    ));
    print_line(&format!(
        "produced: {} (good {}, rejected {}), theoretical max {}",
        r.units_produced_total, d.units_good, r.units_rejected, d.theoretical_max_output
    ));
    print_line(&metric_strip(record));
    if !r.remark.is_empty() {
        print_line(&format!("remark: {}", r.remark));
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let store_path = resolve_store_path(cli.store.as_deref())?;
    let today = resolve_today(cli.today.as_deref())?;

    let styler = Styler::new(resolve_color_enabled(cli.no_color));

    match cli.command {
        Command::Add(args) => {
            let raw = args.into_raw(&today);
            let created = update_ledger(&store_path, |ledger| append_record(ledger, raw))?;

            if cli.format == Format::Json {
                #[derive(serde::Serialize)]
                struct Out {
                    record: ShiftRecord,
                }
                print_json(&Out { record: created })?;
            } else {
                print_line(&metric_strip(&created));
                print_line(&styler.green(&format!(
                    "Saved {}: {} line {} on {}",
                    created.id,
                    created.machine_type.as_str(),
                    created.raw.machine_id,
                    created.raw.date
                )));
            }

            Ok(())
        }

        Command::List(args) => {
            let ledger = read_ledger(&store_path)?;
            let filter = ShiftFilter {
                date: args.date,
                machines: args.machine,
                supervisor: args.supervisor,
                product: args.product,
                crew_size: args.crew,
            };
            let records = list_records(&ledger, &filter, args.reverse);

            if cli.format == Format::Json {
                #[derive(serde::Serialize)]
                struct Out {
                    records: Vec<ShiftRecord>,
                }
                print_json(&Out { records })?;
            } else if records.is_empty() {
                print_line(&styler.gray("(no shifts recorded)"));
            } else {
                print_line(&render_simple_table(RECORD_HEADERS, &record_rows(&records)));
            }

            Ok(())
        }

        Command::Show(args) => {
            let ledger = read_ledger(&store_path)?;
            let idx = select_record_index(&ledger, &args.id)?;
            let record = ledger.records[idx].clone();

            if cli.format == Format::Json {
                #[derive(serde::Serialize)]
                struct Out {
                    record: ShiftRecord,
                }
                print_json(&Out { record })?;
            } else {
                print_record_detail(&record);
            }

            Ok(())
        }

        Command::Edit(args) => {
            verify_password(args.password.as_deref())?;

            let updated = update_ledger(&store_path, |ledger| {
                let idx = select_record_index(ledger, &args.id)?;
                let mut raw = ledger.records[idx].raw.clone();
                args.apply_to(&mut raw);
                update_record(ledger, &args.id, raw)
            })?;

            if cli.format == Format::Json {
                #[derive(serde::Serialize)]
                struct Out {
                    record: ShiftRecord,
                }
                print_json(&Out { record: updated })?;
            } else {
                print_line(&metric_strip(&updated));
                print_line(&styler.green(&format!("Updated and recomputed: {}", updated.id)));
            }

            Ok(())
        }

        Command::Delete(args) => {
            verify_password(args.password.as_deref())?;

            let removed =
                update_ledger(&store_path, |ledger| delete_record(ledger, &args.id))?;

            if cli.format == Format::Json {
                #[derive(serde::Serialize)]
                struct Out {
                    deleted: String,
                }
                print_json(&Out { deleted: removed.id })?;
            } else {
                print_line(&format!(
                    "Deleted {}: {} line {} on {}",
                    removed.id,
                    removed.machine_type.as_str(),
                    removed.raw.machine_id,
                    removed.raw.date
                ));
            }

            Ok(())
        }

        Command::Summary(args) => {
            let key = match args.by {
                GroupKeyArg::Machine => GroupKey::Machine,
                GroupKeyArg::MachineType => GroupKey::MachineType,
                GroupKeyArg::Supervisor => GroupKey::Supervisor,
                GroupKeyArg::Product => GroupKey::Product,
                GroupKeyArg::Crew => GroupKey::Crew,
                GroupKeyArg::Date => GroupKey::Date,
                GroupKeyArg::Week => GroupKey::Week,
            };
            let metric = match args.metric {
                MetricArg::Oee => Metric::Oee,
                MetricArg::Availability => Metric::Availability,
                MetricArg::Performance => Metric::Performance,
                MetricArg::Quality => Metric::Quality,
                MetricArg::Units => Metric::Units,
            };
            let agg = match args.agg {
                AggArg::Mean => Agg::Mean,
                AggArg::Min => Agg::Min,
                AggArg::Max => Agg::Max,
                AggArg::Sum => Agg::Sum,
                AggArg::Count => Agg::Count,
            };

            let ledger = read_ledger(&store_path)?;
            let rows = build_summary(&ledger, key, metric, agg)?;

            if cli.format == Format::Json {
                #[derive(serde::Serialize)]
                struct Out {
                    summary: Vec<crate::summary::SummaryRow>,
                }
                print_json(&Out { summary: rows })?;
            } else if rows.is_empty() {
                print_line(&styler.gray("(no shifts recorded)"));
            } else {
                let pct_metric = !matches!(metric, Metric::Units) && !matches!(agg, Agg::Count);
                let table_rows: Vec<Vec<String>> = rows
                    .iter()
                    .map(|r| {
                        let value = if pct_metric {
                            fmt_pct(r.value)
                        } else {
                            format!("{}", r.value)
                        };
                        vec![r.key.clone(), r.shifts.to_string(), value]
                    })
                    .collect();
                print_line(&render_simple_table(&["key", "shifts", "value"], &table_rows));
            }

            Ok(())
        }

        Command::Import(args) => {
            let text = fs::read_to_string(&args.path)
                .map_err(|_| CliError::io(format!("Cannot read import file: {}", args.path)))?;
            let outcome = scan_table(&text)?;

            let accepted = outcome.accepted;
            let dropped = outcome.dropped;

            let ids: Vec<String> = if accepted.is_empty() {
                Vec::new()
            } else {
                update_ledger(&store_path, |ledger| {
                    let mut ids = Vec::with_capacity(accepted.len());
                    for raw in accepted.iter().cloned() {
                        ids.push(append_record(ledger, raw)?.id);
                    }
                    Ok(ids)
                })?
            };

            if cli.format == Format::Json {
                #[derive(serde::Serialize)]
                struct Out {
                    imported: usize,
                    dropped: usize,
                    ids: Vec<String>,
                }
                print_json(&Out {
                    imported: ids.len(),
                    dropped,
                    ids,
                })?;
            } else {
                print_line(&format!(
                    "Imported {} record(s), dropped {} row(s).",
                    ids.len(),
                    dropped
                ));
                if dropped > 0 {
                    print_line(&styler.red(
                        "Dropped rows were unparseable or invalid; they were not read as zero.",
                    ));
                }
            }

            Ok(())
        }
    }
}
