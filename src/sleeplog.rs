//! The per-subject sleep log: one onset/wake-up pair per recording day,
//! stored as a header row plus a single data row.

use crate::data_loading::DaySource;
use crate::file_manager::FileManager;
use crate::minor_files::read_one_line_from_csv_file;
use crate::time_points::{point_to_time, time_to_point, WINDOW_MINUTES};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone};
use log::{debug, info};
use std::fs::File;
use std::path::Path;
use thiserror::Error;

pub const MISSING: &str = "NA";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SleepLogError {
    #[error("the sleep log file is empty")]
    Empty,
    #[error("the sleep log file has an odd number of entries ({0})")]
    OddEntryCount(usize),
    #[error("day {day} is outside the {days} days in the sleep log")]
    DayOutOfRange { day: usize, days: usize },
    #[error("malformed sleep log timestamp: {0}")]
    MalformedTimestamp(String),
    #[error("sleep onset {onset} is after wake-up {wakeup}")]
    OnsetAfterWakeup { onset: String, wakeup: String },
    #[error("sleep window from {onset} to {wakeup} is longer than 24 hours")]
    WindowTooLong { onset: String, wakeup: String },
    #[error("slider point {point} is outside the 0 to {window} minute display window")]
    PointOutsideWindow { point: i64, window: i64 },
}

/// Reads the onset and wake-up columns of a sleep log.
///
/// Entries after the identifier alternate onset, wake-up, onset, ...
pub fn read_sleeplog(path: &Path) -> Result<(Vec<String>, Vec<String>)> {
    let row = read_one_line_from_csv_file(path, 1)?.unwrap_or_default();
    let entries = row.get(1..).unwrap_or_default();

    if entries.is_empty() {
        return Err(SleepLogError::Empty.into());
    }
    if entries.len() % 2 != 0 {
        return Err(SleepLogError::OddEntryCount(entries.len()).into());
    }

    let (onsets, wakeups): (Vec<_>, Vec<_>) = entries
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .unzip();
    Ok((onsets, wakeups))
}

pub fn format_timestamp(time: Option<&DateTime<FixedOffset>>) -> String {
    time.map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

/// Parses a stored timestamp into `tz`. `NA` and empty cells are unset.
/// Timestamps without an offset are taken to be in `tz`.
pub fn parse_timestamp(
    value: &str,
    tz: &FixedOffset,
) -> Result<Option<DateTime<FixedOffset>>, SleepLogError> {
    let value = value.trim();
    if value.is_empty() || value == MISSING {
        return Ok(None);
    }

    if let Ok(time) = DateTime::parse_from_str(value, TIMESTAMP_FORMAT) {
        return Ok(Some(time.with_timezone(tz)));
    }
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(time.with_timezone(tz)));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            if let Some(time) = tz.from_local_datetime(&naive).single() {
                return Ok(Some(time));
            }
        }
    }
    Err(SleepLogError::MalformedTimestamp(value.to_string()))
}

/// Writes a fresh sleep log. `entries` holds onset, wake-up, onset, ... and
/// is expected to have even length; unset entries are written as `NA`.
pub fn write_sleeplog(
    path: &Path,
    identifier: &str,
    entries: &[Option<DateTime<FixedOffset>>],
) -> Result<()> {
    let header = std::iter::once("ID".to_string()).chain((0..entries.len() / 2).flat_map(|day| {
        [
            format!("onset_N{}", day + 1),
            format!("wakeup_N{}", day + 1),
        ]
    }));
    let data_line = std::iter::once(identifier.to_string())
        .chain(entries.iter().map(|entry| format_timestamp(entry.as_ref())));

    write_rows(path, [header.collect(), data_line.collect()])
}

fn write_rows<const N: usize>(path: &Path, rows: [Vec<String>; N]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(file);
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Onset must not be after wake-up and the window must not span more than
/// 24 hours. Equal endpoints mean no selection and are accepted.
pub fn validate_sleep_window(
    onset: &DateTime<FixedOffset>,
    wakeup: &DateTime<FixedOffset>,
) -> Result<(), SleepLogError> {
    if onset > wakeup {
        return Err(SleepLogError::OnsetAfterWakeup {
            onset: onset.to_string(),
            wakeup: wakeup.to_string(),
        });
    }
    if *wakeup - *onset > Duration::hours(24) {
        return Err(SleepLogError::WindowTooLong {
            onset: onset.to_string(),
            wakeup: wakeup.to_string(),
        });
    }
    Ok(())
}

/// Stores the sleep window selected for `day`, given as slider points, and
/// returns the timestamps that were written.
pub fn modify_sleeplog<S: DaySource + ?Sized>(
    file_manager: &FileManager,
    source: &S,
    day: usize,
    sleep_point: i64,
    wake_point: i64,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let path = &file_manager.sleeplog_file;
    let date = *source.dates().get(day).ok_or(SleepLogError::DayOutOfRange {
        day,
        days: source.dates().len(),
    })?;
    for point in [sleep_point, wake_point] {
        if !(0..=WINDOW_MINUTES).contains(&point) {
            return Err(SleepLogError::PointOutsideWindow {
                point,
                window: WINDOW_MINUTES,
            }
            .into());
        }
    }
    let tz = source.timezone();
    let sleep_time = point_to_time(Some(sleep_point), date, &tz)?;
    let wake_time = point_to_time(Some(wake_point), date, &tz)?;
    validate_sleep_window(&sleep_time, &wake_time)?;

    let file = File::open(path)
        .with_context(|| format!("Failed to open sleep log: {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);
    let mut sleeplog = Vec::new();
    for record in rdr.records() {
        let record = record.with_context(|| format!("Failed to parse {}", path.display()))?;
        sleeplog.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let row = sleeplog.get_mut(1).ok_or(SleepLogError::Empty)?;
    let days = row.len().saturating_sub(1) / 2;
    if day >= days {
        return Err(SleepLogError::DayOutOfRange { day, days }.into());
    }
    row[0] = file_manager.identifier.clone();
    row[day * 2 + 1] = format_timestamp(Some(&sleep_time));
    row[day * 2 + 2] = format_timestamp(Some(&wake_time));

    info!(
        "Day {}: sleep window {} to {}",
        day, row[day * 2 + 1], row[day * 2 + 2]
    );

    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(file);
    for record in &sleeplog {
        writer.write_record(record)?;
    }
    writer.flush()?;

    Ok((sleep_time, wake_time))
}

/// The stored window of one day, as timestamps and as slider points.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredWindow {
    pub onset: DateTime<FixedOffset>,
    pub wakeup: DateTime<FixedOffset>,
    pub points: [i64; 2],
}

/// Reads the window stored for `day`. Unset entries fall back to the 03:00
/// placeholder.
pub fn read_sleep_window<S: DaySource + ?Sized>(
    file_manager: &FileManager,
    source: &S,
    day: usize,
) -> Result<StoredWindow> {
    let (onsets, wakeups) = read_sleeplog(&file_manager.sleeplog_file)?;
    let date = *source.dates().get(day).ok_or(SleepLogError::DayOutOfRange {
        day,
        days: source.dates().len(),
    })?;
    let (onset, wakeup) = onsets
        .get(day)
        .zip(wakeups.get(day))
        .ok_or(SleepLogError::DayOutOfRange {
            day,
            days: onsets.len(),
        })?;

    let tz = source.timezone();
    let placeholder = point_to_time(None, date, &tz)?;
    let onset = parse_timestamp(onset, &tz)?.unwrap_or(placeholder);
    let wakeup = parse_timestamp(wakeup, &tz)?.unwrap_or(placeholder);
    debug!("Day {}: stored window {} to {}", day, onset, wakeup);

    let points = [
        time_to_point(&onset, date, &tz)?,
        time_to_point(&wakeup, date, &tz)?,
    ];
    Ok(StoredWindow {
        onset,
        wakeup,
        points,
    })
}
