//! Cleaned dataset CSV.
//!
//! Fixed columns followed by one `flag_<name>` column per feature flag:
//!
//! ```text
//! job_id,title,specialty,state,city,region,start_date,end_date,duration_days,rate_hourly,rate_daily,flag_...
//! ```
//!
//! Missing values are empty cells. Flags are written as `1` / `0`. Rates are
//! written at full precision so `rate_daily` stays exactly `rate_hourly * 8`.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use tracing::info;

use crate::clean::parse_date;
use crate::domain::{CleanedRecord, FeatureFlags, Region, daily_from_hourly};
use crate::error::AppError;

const FLAG_PREFIX: &str = "flag_";

const FIXED_COLUMNS: [&str; 11] = [
    "job_id",
    "title",
    "specialty",
    "state",
    "city",
    "region",
    "start_date",
    "end_date",
    "duration_days",
    "rate_hourly",
    "rate_daily",
];

/// Write cleaned records. Rows keep their input order.
pub fn write_dataset_csv(path: &Path, records: &[CleanedRecord]) -> Result<(), AppError> {
    let flag_names: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.flags.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create dataset CSV '{}': {e}", path.display())))?;

    let header: Vec<String> = FIXED_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(flag_names.iter().map(|f| format!("{FLAG_PREFIX}{f}")))
        .collect();
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write dataset CSV header: {e}")))?;

    for r in records {
        let mut row = vec![
            r.job_id.clone().unwrap_or_default(),
            r.title.clone().unwrap_or_default(),
            r.specialty.clone(),
            r.state.clone(),
            r.city.clone().unwrap_or_default(),
            r.region.map(|g| g.display_name().to_string()).unwrap_or_default(),
            r.start_date.map(|d| d.to_string()).unwrap_or_default(),
            r.end_date.map(|d| d.to_string()).unwrap_or_default(),
            r.duration_days.map(|d| d.to_string()).unwrap_or_default(),
            r.rate_hourly.map(|v| v.to_string()).unwrap_or_default(),
            r.rate_daily.map(|v| v.to_string()).unwrap_or_default(),
        ];
        row.extend(flag_names.iter().map(|f| if r.flag(f) { "1" } else { "0" }.to_string()));

        writer
            .write_record(&row)
            .map_err(|e| AppError::new(2, format!("Failed to write dataset CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush dataset CSV: {e}")))?;

    info!(path = %path.display(), rows = records.len(), "wrote cleaned dataset");
    Ok(())
}

/// Read a cleaned dataset written by `write_dataset_csv`.
///
/// `rate_daily` is re-derived from `rate_hourly` so the pair can never disagree.
pub fn read_dataset_csv(path: &Path) -> Result<Vec<CleanedRecord>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open dataset CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read dataset CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for required in ["specialty", "state", "rate_hourly"] {
        if !header_map.contains_key(required) {
            return Err(AppError::new(
                2,
                format!("Dataset CSV is missing required column `{required}`."),
            ));
        }
    }

    let flag_columns: Vec<(String, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| {
            let name = name.trim().trim_start_matches('\u{feff}');
            name.strip_prefix(FLAG_PREFIX).map(|f| (f.to_string(), idx))
        })
        .collect();

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record = result
            .map_err(|e| AppError::new(2, format!("Dataset CSV parse error at line {line}: {e}")))?;
        let parsed = parse_row(&record, &header_map, &flag_columns)
            .map_err(|e| AppError::new(2, format!("Dataset CSV line {line}: {e}")))?;
        records.push(parsed);
    }

    info!(path = %path.display(), rows = records.len(), "loaded cleaned dataset");
    Ok(records)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase(), idx))
        .collect()
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    flag_columns: &[(String, usize)],
) -> Result<CleanedRecord, String> {
    let specialty = get_required(record, header_map, "specialty")?.to_string();
    let state = get_required(record, header_map, "state")?.to_string();

    let rate_hourly = match get_optional(record, header_map, "rate_hourly") {
        Some(s) => Some(
            s.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or_else(|| format!("invalid `rate_hourly` '{s}'"))?,
        ),
        None => None,
    };

    let duration_days = match get_optional(record, header_map, "duration_days") {
        Some(s) => Some(
            s.parse::<i64>()
                .map_err(|_| format!("invalid `duration_days` '{s}'"))?,
        ),
        None => None,
    };

    let region = get_optional(record, header_map, "region").and_then(Region::from_display_name);

    let mut flags = FeatureFlags::new();
    for (name, idx) in flag_columns {
        let cell = record.get(*idx).map(str::trim).unwrap_or("");
        let on = match cell {
            "1" | "true" | "True" | "TRUE" => true,
            "0" | "false" | "False" | "FALSE" | "" => false,
            other => return Err(format!("invalid value '{other}' for flag `{name}`")),
        };
        flags.insert(name.clone(), on);
    }

    Ok(CleanedRecord {
        job_id: get_optional(record, header_map, "job_id").map(str::to_string),
        title: get_optional(record, header_map, "title").map(str::to_string),
        specialty,
        state,
        city: get_optional(record, header_map, "city").map(str::to_string),
        region,
        start_date: get_optional(record, header_map, "start_date").and_then(parse_date),
        end_date: get_optional(record, header_map, "end_date").and_then(parse_date),
        duration_days,
        rate_hourly,
        rate_daily: daily_from_hourly(rate_hourly),
        flags,
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    get_optional(record, header_map, name).ok_or_else(|| format!("missing required value `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}
