//! Per-day status vectors and the small bookkeeping CSVs written next to the
//! sleep log: the evaluator audit log and the completion log.

use crate::data_loading::DaySource;
use crate::file_manager::FileManager;
use crate::sleeplog;
use anyhow::{anyhow, Context, Result};
use chrono::Local;
use log::{debug, info};
use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::str::FromStr;

/// The per-day flags a reviewer can toggle, one CSV file each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    ReviewNight,
    MultipleSleep,
    DataCleaning,
    MissingSleep,
}

impl StatusKind {
    pub const ALL: [StatusKind; 4] = [
        StatusKind::ReviewNight,
        StatusKind::MultipleSleep,
        StatusKind::DataCleaning,
        StatusKind::MissingSleep,
    ];
}

impl FromStr for StatusKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "review-night" => Ok(StatusKind::ReviewNight),
            "multiple-sleep" => Ok(StatusKind::MultipleSleep),
            "data-cleaning" => Ok(StatusKind::DataCleaning),
            "missing-sleep" => Ok(StatusKind::MissingSleep),
            _ => Err(format!(
                "Invalid status kind: {}. Use review-night, multiple-sleep, data-cleaning or missing-sleep",
                s
            )),
        }
    }
}

/// Reads record `line_number` (0-based, no header handling) of a CSV file.
pub(crate) fn read_one_line_from_csv_file(
    path: &Path,
    line_number: usize,
) -> Result<Option<Vec<String>>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    match rdr.records().nth(line_number) {
        Some(record) => {
            let record = record.with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(Some(record.iter().map(str::to_string).collect()))
        }
        None => Ok(None),
    }
}

pub fn write_vector<T: Display>(path: &Path, vector: &[T]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(file);
    writer.write_record(vector.iter().map(|value| value.to_string()))?;
    writer.flush()?;
    Ok(())
}

/// Reads the single row of a status vector, optionally keeping only the first
/// `up_to_column` values.
pub fn read_vector(path: &Path, up_to_column: Option<usize>) -> Result<Vec<String>> {
    let mut data = read_one_line_from_csv_file(path, 0)?
        .ok_or_else(|| anyhow!("Vector file {} is empty", path.display()))?;
    if let Some(columns) = up_to_column {
        data.truncate(columns);
    }
    Ok(data)
}

/// Interprets a stored vector value as a switch position.
pub fn vector_flag(value: &str) -> bool {
    !matches!(value.trim(), "" | "0" | "0.0" | "false" | "False" | "FALSE")
}

pub fn toggle_vector_value(path: &Path, index: usize, on: bool) -> Result<()> {
    debug!(
        "Setting index {} to value {} for file {}",
        index,
        on,
        path.display()
    );
    let mut vector = read_vector(path, None)?;
    let len = vector.len();
    let slot = vector.get_mut(index).ok_or_else(|| {
        anyhow!(
            "Day {} is outside the {} days stored in {}",
            index,
            len,
            path.display()
        )
    })?;
    *slot = if on { "1" } else { "0" }.to_string();
    write_vector(path, &vector)
}

/// Appends one row to the evaluator audit log, creating it with a header when
/// it does not exist yet.
pub fn write_log_file(name: &str, path: &Path, identifier: &str) -> Result<()> {
    let exists = path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

    if !exists {
        writer.write_record(["Username", "Participant", "Date", "Filename"])?;
    }
    writer.write_record([
        name.to_string(),
        identifier.to_string(),
        Local::now().date_naive().format("%Y-%m-%d").to_string(),
        format!("sleeplog_{}.csv", identifier),
    ])?;
    writer.flush()?;
    Ok(())
}

pub fn write_log_analysis_completed(
    is_completed: bool,
    identifier: &str,
    path: &Path,
) -> Result<()> {
    let completion_word = if is_completed { "Yes" } else { "No" };
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);

    writer.write_record([
        "Participant",
        "Is the sleep log analysis completed?",
        "Last modified",
    ])?;
    writer.write_record([
        identifier.to_string(),
        completion_word.to_string(),
        Local::now().naive_local().format("%Y-%m-%d %H:%M:%S").to_string(),
    ])?;
    writer.flush()?;
    Ok(())
}

/// Creates the files a review session needs.
///
/// Existing files are left alone, except for the audit log which always gets
/// a new row.
pub fn initialize_files<S: DaySource + ?Sized>(
    file_manager: &FileManager,
    source: &S,
    evaluator_name: &str,
) -> Result<()> {
    if !file_manager.sleeplog_file.exists() {
        info!("Seeding sleep log {}", file_manager.sleeplog_file.display());
        let tz = source.timezone();
        let mut entries = Vec::with_capacity(2 * source.day_count());
        for date in source.dates() {
            let placeholder = crate::time_points::point_to_time(None, *date, &tz)?;
            entries.extend([Some(placeholder), Some(placeholder)]);
        }
        sleeplog::write_sleeplog(
            &file_manager.sleeplog_file,
            &file_manager.identifier,
            &entries,
        )?;
    }

    let day_count = source.day_count();
    for kind in StatusKind::ALL {
        let path = file_manager.vector_file(kind);
        if !path.exists() {
            debug!("Creating {:?} vector with {} days", kind, day_count);
            write_vector(path, &vec![0; day_count])?;
        }
    }

    write_log_file(evaluator_name, &file_manager.log_file, &file_manager.identifier)
}
