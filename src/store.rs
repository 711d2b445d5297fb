use crate::error::CliError;
use crate::model::{Derived, Ledger, MachineType, RawShift, ShiftRecord};
use crate::oee::round1;
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Column order of the backing store: id, raw fields, then derived fields.
pub const STORE_COLUMNS: &[&str] = &[
    "id",
    "date",
    "machine_id",
    "machine_type",
    "supervisor",
    "crew_size",
    "product_code",
    "rated_speed",
    "shift_duration_min",
    "scheduled_break_min",
    "stop_startup_min",
    "stop_changeover_min",
    "stop_cleaning_min",
    "wait_mechanic_min",
    "wait_qc_min",
    "wait_material_min",
    "wait_misc_min",
    "units_produced_total",
    "units_rejected",
    "remark",
    "planned_stop_total",
    "scheduled_production_time",
    "unplanned_stop_total",
    "actual_run_time",
    "availability_pct",
    "performance_pct",
    "quality_pct",
    "oee_pct",
    "theoretical_max_output",
    "units_good",
];

const SEP: char = ';';

pub fn resolve_store_path(cli_store_path: Option<&str>) -> Result<String, CliError> {
    if let Some(p) = cli_store_path.map(|s| s.trim()).filter(|s| !s.is_empty()) {
        return Ok(p.to_string());
    }

    if let Ok(p) = std::env::var("OEE_STORE_PATH") {
        let p = p.trim().to_string();
        if !p.is_empty() {
            return Ok(p);
        }
    }

    let base = std::env::var("XDG_DATA_HOME")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let home = std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok());

    let base = match (base, home) {
        (Some(b), _) => b,
        (None, Some(h)) => Path::new(&h)
            .join(".local")
            .join("share")
            .to_string_lossy()
            .to_string(),
        (None, None) => return Err(CliError::io("Store IO error")),
    };

    Ok(Path::new(&base)
        .join("oee-cli")
        .join("logbook.csv")
        .to_string_lossy()
        .to_string())
}

fn field_escape(value: &str) -> String {
    // The reader is line-oriented; validate() refuses line breaks in text
    // fields so none should ever reach a cell.
    debug_assert!(!value.contains(['\n', '\r']));
    if value.contains([SEP, '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Quote-aware split of one semicolon-delimited row.
pub fn split_row(line: &str) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    cur.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                cur.push(c);
            }
        } else if c == '"' {
            in_quotes = true;
        } else if c == SEP {
            fields.push(std::mem::take(&mut cur));
        } else {
            cur.push(c);
        }
    }
    fields.push(cur);
    fields
}

/// Numeric cell parser tolerant of a locale decimal comma ("92,5" == "92.5").
pub fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim().replace(',', ".");
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok()
}

fn fmt_f64(v: f64) -> String {
    // Shortest round-trip form; integral speeds/outputs print without ".0".
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

fn encode_record(r: &ShiftRecord) -> String {
    let cells: Vec<String> = vec![
        r.id.clone(),
        r.raw.date.clone(),
        r.raw.machine_id.clone(),
        r.machine_type.as_str().to_string(),
        r.raw.supervisor.clone(),
        r.raw.crew_size.to_string(),
        r.raw.product_code.clone().unwrap_or_default(),
        fmt_f64(r.raw.rated_speed),
        r.raw.shift_duration_min.to_string(),
        r.raw.scheduled_break_min.to_string(),
        r.raw.stop_startup_min.to_string(),
        r.raw.stop_changeover_min.to_string(),
        r.raw.stop_cleaning_min.to_string(),
        r.raw.wait_mechanic_min.to_string(),
        r.raw.wait_qc_min.to_string(),
        r.raw.wait_material_min.to_string(),
        r.raw.wait_misc_min.to_string(),
        r.raw.units_produced_total.to_string(),
        r.raw.units_rejected.to_string(),
        r.raw.remark.clone(),
        r.derived.planned_stop_total.to_string(),
        r.derived.scheduled_production_time.to_string(),
        r.derived.unplanned_stop_total.to_string(),
        r.derived.actual_run_time.to_string(),
        format!("{:.1}", round1(r.derived.availability_pct)),
        format!("{:.1}", round1(r.derived.performance_pct)),
        format!("{:.1}", round1(r.derived.quality_pct)),
        format!("{:.1}", round1(r.derived.oee_pct)),
        fmt_f64(r.derived.theoretical_max_output),
        r.derived.units_good.to_string(),
    ];

    cells
        .iter()
        .map(|c| field_escape(c))
        .collect::<Vec<String>>()
        .join(&SEP.to_string())
}

pub fn encode_ledger(ledger: &Ledger) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(ledger.records.len() + 1);
    lines.push(STORE_COLUMNS.join(&SEP.to_string()));
    for r in ledger.records.iter() {
        lines.push(encode_record(r));
    }
    lines.join("\n") + "\n"
}

fn corrupted() -> CliError {
    CliError::io("Store corrupted")
}

fn cell_u32(f: &str) -> Result<u32, CliError> {
    let v = parse_number(f).ok_or_else(corrupted)?;
    if v < 0.0 || v.fract() != 0.0 {
        return Err(corrupted());
    }
    Ok(v as u32)
}

fn cell_u64(f: &str) -> Result<u64, CliError> {
    let v = parse_number(f).ok_or_else(corrupted)?;
    if v < 0.0 || v.fract() != 0.0 {
        return Err(corrupted());
    }
    Ok(v as u64)
}

fn cell_i64(f: &str) -> Result<i64, CliError> {
    let v = parse_number(f).ok_or_else(corrupted)?;
    if v.fract() != 0.0 {
        return Err(corrupted());
    }
    Ok(v as i64)
}

fn cell_f64(f: &str) -> Result<f64, CliError> {
    parse_number(f).ok_or_else(corrupted)
}

fn parse_machine_type(f: &str) -> Result<MachineType, CliError> {
    match f {
        "Pot" => Ok(MachineType::Pot),
        "Parfum" => Ok(MachineType::Parfum),
        "Tube" => Ok(MachineType::Tube),
        _ => Err(corrupted()),
    }
}

fn parse_record(line: &str) -> Result<ShiftRecord, CliError> {
    let f = split_row(line);
    if f.len() != STORE_COLUMNS.len() {
        return Err(corrupted());
    }

    let raw = RawShift {
        date: f[1].clone(),
        machine_id: f[2].clone(),
        supervisor: f[4].clone(),
        crew_size: cell_u32(&f[5])?,
        product_code: if f[6].is_empty() {
            None
        } else {
            Some(f[6].clone())
        },
        rated_speed: cell_f64(&f[7])?,
        shift_duration_min: cell_u32(&f[8])?,
        scheduled_break_min: cell_u32(&f[9])?,
        stop_startup_min: cell_u32(&f[10])?,
        stop_changeover_min: cell_u32(&f[11])?,
        stop_cleaning_min: cell_u32(&f[12])?,
        wait_mechanic_min: cell_u32(&f[13])?,
        wait_qc_min: cell_u32(&f[14])?,
        wait_material_min: cell_u32(&f[15])?,
        wait_misc_min: cell_u32(&f[16])?,
        units_produced_total: cell_u64(&f[17])?,
        units_rejected: cell_u64(&f[18])?,
        remark: f[19].clone(),
    };

    let derived = Derived {
        planned_stop_total: cell_u32(&f[20])?,
        scheduled_production_time: cell_i64(&f[21])?,
        unplanned_stop_total: cell_u32(&f[22])?,
        actual_run_time: cell_i64(&f[23])?,
        availability_pct: cell_f64(&f[24])?,
        performance_pct: cell_f64(&f[25])?,
        quality_pct: cell_f64(&f[26])?,
        oee_pct: cell_f64(&f[27])?,
        theoretical_max_output: cell_f64(&f[28])?,
        units_good: cell_u64(&f[29])?,
    };

    Ok(ShiftRecord {
        id: f[0].clone(),
        machine_type: parse_machine_type(&f[3])?,
        raw,
        derived,
    })
}

pub fn parse_ledger(text: &str) -> Result<Ledger, CliError> {
    let mut lines = text.lines();
    let header = lines.next().ok_or_else(corrupted)?;
    if split_row(header) != STORE_COLUMNS {
        return Err(corrupted());
    }

    let mut records: Vec<ShiftRecord> = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_record(line)?);
    }
    Ok(Ledger { records })
}

/// Missing file reads as an empty ledger; the file is created with its header
/// row on the first persist. A malformed file is an io error, never a silent
/// row drop.
pub fn read_ledger(store_path: &str) -> Result<Ledger, CliError> {
    match fs::read_to_string(store_path) {
        Ok(txt) => parse_ledger(&txt),
        Err(e) => {
            if e.kind() == std::io::ErrorKind::NotFound {
                Ok(Ledger::default())
            } else {
                Err(CliError::io("Store IO error"))
            }
        }
    }
}

fn ensure_parent_dir(store_path: &str) -> Result<(), CliError> {
    let dir = Path::new(store_path)
        .parent()
        .ok_or_else(|| CliError::io("Store IO error"))?;
    fs::create_dir_all(dir).map_err(|_| CliError::io("Store IO error"))?;
    Ok(())
}

struct WriteLock {
    path: PathBuf,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn with_write_lock<R>(
    store_path: &str,
    f: impl FnOnce() -> Result<R, CliError>,
) -> Result<R, CliError> {
    let lock_path = PathBuf::from(format!("{}.lock", store_path));

    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&lock_path)
    {
        Ok(_) => {
            let _guard = WriteLock { path: lock_path };
            f()
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                Err(CliError::io("Store is locked by another session"))
            } else {
                Err(CliError::io("Store IO error"))
            }
        }
    }
}

fn write_ledger_inner(store_path: &str, ledger: &Ledger) -> Result<(), CliError> {
    ensure_parent_dir(store_path)?;

    let dir = Path::new(store_path)
        .parent()
        .ok_or_else(|| CliError::io("Store IO error"))?;

    // Write-to-temp-then-rename: a failed write never truncates the store.
    let tmp_path = dir.join(format!(".logbook.csv.tmp.{}", std::process::id()));
    let data = encode_ledger(ledger);

    {
        let mut f = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(|_| CliError::io("Store IO error"))?;

        f.write_all(data.as_bytes())
            .map_err(|_| CliError::io("Store IO error"))?;
        let _ = f.flush();
    }

    fs::rename(&tmp_path, store_path).map_err(|_| {
        let _ = fs::remove_file(&tmp_path);
        CliError::io("Store IO error")
    })?;

    Ok(())
}

/// Load, mutate, persist under a lock. The mutator's error aborts the write
/// and leaves the backing store untouched.
pub fn update_ledger<R>(
    store_path: &str,
    mutator: impl FnOnce(&mut Ledger) -> Result<R, CliError>,
) -> Result<R, CliError> {
    ensure_parent_dir(store_path)?;
    with_write_lock(store_path, || {
        let mut ledger = read_ledger(store_path)?;
        let out = mutator(&mut ledger)?;
        write_ledger_inner(store_path, &ledger)?;
        Ok(out)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oee::compute;

    fn sample_record(id: &str, remark: &str) -> ShiftRecord {
        let raw = RawShift {
            date: "2026-03-02".to_string(),
            machine_id: "24".to_string(),
            supervisor: "Marla".to_string(),
            crew_size: 5,
            product_code: Some("INP1120573".to_string()),
            rated_speed: 30.0,
            shift_duration_min: 525,
            scheduled_break_min: 45,
            stop_startup_min: 5,
            stop_changeover_min: 0,
            stop_cleaning_min: 0,
            wait_mechanic_min: 0,
            wait_qc_min: 0,
            wait_material_min: 0,
            wait_misc_min: 0,
            units_produced_total: 14250,
            units_rejected: 0,
            remark: remark.to_string(),
        };
        let derived = compute(&raw);
        ShiftRecord {
            id: id.to_string(),
            machine_type: MachineType::Parfum,
            raw,
            derived,
        }
    }

    #[test]
    fn split_row_handles_quoted_separators() {
        assert_eq!(split_row("a;b;c"), vec!["a", "b", "c"]);
        assert_eq!(split_row("a;\"x;y\";c"), vec!["a", "x;y", "c"]);
        assert_eq!(split_row("a;\"he said \"\"hi\"\"\";c"), vec![
            "a",
            "he said \"hi\"",
            "c"
        ]);
        assert_eq!(split_row("a;;c"), vec!["a", "", "c"]);
    }

    #[test]
    fn parse_number_normalizes_decimal_comma() {
        assert_eq!(parse_number("92,5"), Some(92.5));
        assert_eq!(parse_number(" 92.5 "), Some(92.5));
        assert_eq!(parse_number("14250"), Some(14250.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn ledger_roundtrips_through_the_store_format() {
        let ledger = Ledger {
            records: vec![
                sample_record("s0001", "smooth run"),
                sample_record("s0002", "label jam; see QC \"note\""),
            ],
        };

        let text = encode_ledger(&ledger);
        assert!(text.starts_with("id;date;machine_id;"));

        let back = parse_ledger(&text).unwrap();
        assert_eq!(back.records.len(), 2);
        assert_eq!(back.records[0].id, "s0001");
        assert_eq!(back.records[1].raw.remark, "label jam; see QC \"note\"");
        assert_eq!(back.records[0].derived.oee_pct, 100.0);
        assert_eq!(back.records[0].derived.theoretical_max_output, 14250.0);
    }

    #[test]
    fn missing_store_reads_as_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logbook.csv");
        let ledger = read_ledger(path.to_str().unwrap()).unwrap();
        assert!(ledger.records.is_empty());
    }

    #[test]
    fn malformed_store_is_an_io_error() {
        assert!(parse_ledger("not;the;header\n").is_err());

        let mut text = STORE_COLUMNS.join(";");
        text.push_str("\ntoo;few;cells\n");
        assert!(parse_ledger(&text).is_err());
    }

    #[test]
    fn update_persists_atomically_and_releases_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logbook.csv");
        let path_s = path.to_str().unwrap();

        update_ledger(path_s, |ledger| {
            ledger.records.push(sample_record("s0001", ""));
            Ok(())
        })
        .unwrap();

        let ledger = read_ledger(path_s).unwrap();
        assert_eq!(ledger.records.len(), 1);
        assert!(!dir.path().join("logbook.csv.lock").exists());

        // A failing mutator leaves the prior store contents intact.
        let before = fs::read_to_string(path_s).unwrap();
        let err = update_ledger(path_s, |_| -> Result<(), CliError> {
            Err(CliError::usage("boom"))
        })
        .unwrap_err();
        assert_eq!(err.exit_code, 2);
        assert_eq!(fs::read_to_string(path_s).unwrap(), before);
    }

    #[test]
    fn held_lock_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logbook.csv");
        let path_s = path.to_str().unwrap().to_string();
        fs::write(format!("{}.lock", path_s), b"").unwrap();

        let err = update_ledger(&path_s, |_| Ok(())).unwrap_err();
        assert!(err.message.contains("locked"));
        assert_eq!(err.exit_code, 5);
    }
}
