use crate::error::CliError;
use std::time::{SystemTime, UNIX_EPOCH};

fn is_valid_date(y: i32, m: u32, d: u32) -> bool {
    if !(1..=12).contains(&m) || d < 1 {
        return false;
    }
    let dim = match m {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            let leap = (y % 4 == 0 && y % 100 != 0) || (y % 400 == 0);
            if leap {
                29
            } else {
                28
            }
        }
    };
    d <= dim
}

// Howard Hinnant's algorithm: days since 1970-01-01.
fn days_from_civil(mut y: i32, m: u32, d: u32) -> i32 {
    let m = m as i32;
    let d = d as i32;
    y -= if m <= 2 { 1 } else { 0 };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = m + if m > 2 { -3 } else { 9 };
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe - 719468
}

fn civil_from_days(z: i32) -> (i32, u32, u32) {
    let z = z + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let mut y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = mp + if mp < 10 { 3 } else { -9 };
    y += if m <= 2 { 1 } else { 0 };
    (y, m as u32, d as u32)
}

fn parse_ymd(s: &str, label: &str) -> Result<(i32, u32, u32), CliError> {
    let ss = s.trim();
    let bad = || CliError::usage(format!("Invalid {}: {}", label, s));

    if ss.len() != 10 {
        return Err(bad());
    }
    let bytes = ss.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(bad());
    }

    let y: i32 = ss[0..4].parse().map_err(|_| bad())?;
    let m: u32 = ss[5..7].parse().map_err(|_| bad())?;
    let d: u32 = ss[8..10].parse().map_err(|_| bad())?;

    if !is_valid_date(y, m, d) {
        return Err(bad());
    }
    Ok((y, m, d))
}

/// Validates a `YYYY-MM-DD` date string, including leap years.
pub fn parse_date_string(s: &str, label: &str) -> Result<(), CliError> {
    let _ = parse_ymd(s, label)?;
    Ok(())
}

/// ISO week id (`2026-W05`) for weekly aggregation. Week year is the year of
/// that week's Thursday.
pub fn iso_week_id(date: &str) -> Result<String, CliError> {
    let (y, m, d) = parse_ymd(date, "date")?;
    let days = days_from_civil(y, m, d);
    // Mon=1..Sun=7
    let wd = (days + 3).rem_euclid(7) + 1;
    let thursday = days + (4 - wd);
    let (wy, _, _) = civil_from_days(thursday);

    let (j4y, j4m, j4d) = parse_ymd(&format!("{:04}-01-04", wy), "date")?;
    let jan4 = days_from_civil(j4y, j4m, j4d);
    let week1_monday = jan4 - ((jan4 + 3).rem_euclid(7));

    let monday = days - (wd - 1);
    let week = 1 + (monday - week1_monday) / 7;
    Ok(format!("{:04}-W{:02}", wy, week))
}

pub fn system_today_utc() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let (y, m, d) = civil_from_days((secs / 86_400) as i32);
    format!("{:04}-{:02}-{:02}", y, m, d)
}
