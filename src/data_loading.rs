use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use log::{debug, info, warn};
use ndarray::{s, Array2};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Arm-movement value of a sample with no acceleration, and of padding.
pub const ARM_MOVEMENT_FLOOR: f64 = -210.0;

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_HOUR: i64 = 3_600;

#[derive(Debug, Error)]
pub enum DataImportError {
    #[error("missing export file: {0}")]
    MissingFile(PathBuf),
    #[error("need at least two epochs in {0} to determine the window size")]
    TooFewEpochs(PathBuf),
    #[error("epochs in {0} are not strictly increasing")]
    UnorderedEpochs(PathBuf),
    #[error("no midnight found in the data")]
    NoMidnight,
    #[error("day {day} is outside the {days} days of the recording")]
    DayOutOfRange { day: usize, days: usize },
    #[error("unparseable epoch timestamp: {0}")]
    BadTimestamp(String),
}

/// One short-epoch row of `meta/basic/metashort.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShortEpoch {
    pub timestamp: String,
    pub anglez: f64,
    #[serde(rename = "ENMO")]
    pub enmo: f64,
}

/// One long-epoch row of `meta/basic/metalong.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct LongEpoch {
    pub timestamp: String,
    pub nonwearscore: f64,
}

/// The three equal-length series shown for one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySeries {
    pub sensor_angle: Vec<f64>,
    pub arm_movement: Vec<f64>,
    pub non_wear: Vec<f64>,
}

impl DaySeries {
    /// Flat series used when a day lies beyond the recording.
    pub fn placeholder(n_points_per_day: usize) -> Self {
        Self {
            sensor_angle: vec![0.0; n_points_per_day],
            arm_movement: vec![ARM_MOVEMENT_FLOOR; n_points_per_day],
            non_wear: vec![0.0; n_points_per_day],
        }
    }
}

/// Everything the review needs to know about a recording.
pub trait DaySource {
    fn dates(&self) -> &[NaiveDate];
    fn timezone(&self) -> FixedOffset;
    fn n_points_per_day(&self) -> usize;
    fn day_series(&self, day: usize) -> Result<DaySeries>;

    fn day_count(&self) -> usize {
        self.dates().len()
    }

    /// First day (0-based) whose length was adjusted for daylight saving time.
    fn dst_day(&self) -> Option<usize> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct Recording {
    dates: Vec<NaiveDate>,
    timezone: FixedOffset,
    short_window: i64,
    n_points_per_day: usize,
    dst_day: Option<usize>,
    sensor_angle: Array2<f64>,
    arm_movement: Array2<f64>,
    non_wear: Array2<f64>,
}

fn parse_epoch_timestamp(value: &str) -> Result<DateTime<FixedOffset>, DataImportError> {
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map_err(|_| DataImportError::BadTimestamp(value.to_string()))
}

fn read_epochs<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(DataImportError::MissingFile(path.to_path_buf()).into());
    }
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut epochs = Vec::new();
    for result in rdr.deserialize() {
        let epoch: T = result.with_context(|| format!("Failed to parse {}", path.display()))?;
        epochs.push(epoch);
    }
    Ok(epochs)
}

impl Recording {
    /// Loads a subject folder's exported epoch tables.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let basic = base_dir.join("meta").join("basic");
        let short_path = basic.join("metashort.csv");
        let long_path = basic.join("metalong.csv");

        info!("Loading recording from {}", basic.display());
        let short_epochs: Vec<ShortEpoch> = read_epochs(&short_path)?;
        let long_epochs: Vec<LongEpoch> = read_epochs(&long_path)?;

        if short_epochs.len() < 2 {
            return Err(DataImportError::TooFewEpochs(short_path).into());
        }
        Self::from_epochs(&short_epochs, &long_epochs)
            .with_context(|| format!("Failed to build recording from {}", basic.display()))
    }

    pub fn from_epochs(short_epochs: &[ShortEpoch], long_epochs: &[LongEpoch]) -> Result<Self> {
        let timestamps = short_epochs
            .iter()
            .map(|epoch| parse_epoch_timestamp(&epoch.timestamp))
            .collect::<Result<Vec<_>, _>>()?;
        if timestamps.len() < 2 {
            return Err(DataImportError::TooFewEpochs(PathBuf::from("metashort")).into());
        }

        let short_window = (timestamps[1] - timestamps[0]).num_seconds();
        if short_window <= 0 {
            return Err(DataImportError::UnorderedEpochs(PathBuf::from("metashort")).into());
        }
        let n_points_per_day = (SECONDS_PER_DAY / short_window) as usize;
        let points_per_hour = (SECONDS_PER_HOUR / short_window).max(1) as usize;
        let timezone = *timestamps[0].offset();

        let local_dates: Vec<NaiveDate> = timestamps.iter().map(|t| t.date_naive()).collect();
        let dates: Vec<NaiveDate> = local_dates
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let midnights: Vec<usize> = (1..local_dates.len())
            .filter(|&i| local_dates[i] != local_dates[i - 1])
            .collect();
        if midnights.is_empty() {
            return Err(DataImportError::NoMidnight.into());
        }
        debug!("Found {} midnights", midnights.len());

        let non_wear = expand_nonwear(&timestamps, long_epochs, short_window)?;

        let n_days = midnights.len() + 1;
        let mut boundaries = Vec::with_capacity(n_days + 1);
        boundaries.push(0);
        boundaries.extend(&midnights);
        boundaries.push(timestamps.len());

        let mut sensor_angle = Array2::zeros((n_days, n_points_per_day));
        let mut arm_movement = Array2::from_elem((n_days, n_points_per_day), ARM_MOVEMENT_FLOOR);
        let mut non_wear_days = Array2::zeros((n_days, n_points_per_day));
        let mut dst_day = None;

        for day in 0..n_days {
            let start = boundaries[day];
            let mut end = boundaries[day + 1];

            // Only full days can be a daylight saving transition.
            if day > 0 && day < n_days - 1 {
                let hours = (end - start) / points_per_hour;
                if hours == 25 {
                    end -= points_per_hour;
                    dst_day.get_or_insert(day);
                } else if hours == 23 {
                    end = (end + points_per_hour).min(timestamps.len());
                    dst_day.get_or_insert(day);
                }
            }

            let length = (end - start).min(n_points_per_day);
            // The first day is partial at its start, all others at their end.
            let (source_start, target_start) = if day == 0 {
                (end - length, n_points_per_day - length)
            } else {
                (start, 0)
            };

            for offset in 0..length {
                let epoch = &short_epochs[source_start + offset];
                let column = target_start + offset;
                sensor_angle[[day, column]] = epoch.anglez;
                arm_movement[[day, column]] =
                    (epoch.enmo * 1000.0).abs() / 14.0 + ARM_MOVEMENT_FLOOR;
                non_wear_days[[day, column]] = non_wear[source_start + offset];
            }
        }

        if let Some(day) = dst_day {
            warn!("Daylight saving time transition detected on day {}", day + 1);
        }
        info!(
            "Loaded {} days of {} points ({} s epochs)",
            n_days, n_points_per_day, short_window
        );

        Ok(Self {
            dates,
            timezone,
            short_window,
            n_points_per_day,
            dst_day,
            sensor_angle,
            arm_movement,
            non_wear: non_wear_days,
        })
    }

    pub fn short_window(&self) -> i64 {
        self.short_window
    }
}

/// Maps long-epoch non-wear scores onto the short-epoch timeline. A long
/// epoch with a score above 1 marks every short epoch it covers.
fn expand_nonwear(
    timestamps: &[DateTime<FixedOffset>],
    long_epochs: &[LongEpoch],
    short_window: i64,
) -> Result<Vec<f64>> {
    let mut non_wear = vec![0.0; timestamps.len()];
    let long_times = long_epochs
        .iter()
        .map(|epoch| parse_epoch_timestamp(&epoch.timestamp))
        .collect::<Result<Vec<_>, _>>()?;
    let long_window = match long_times.as_slice() {
        [first, second, ..] => (*second - *first).num_seconds(),
        _ => short_window,
    };
    let span = (long_window / short_window).max(1) as usize;

    for (epoch, time) in long_epochs.iter().zip(&long_times) {
        if epoch.nonwearscore <= 1.0 {
            continue;
        }
        let offset = (*time - timestamps[0]).num_seconds() / short_window;
        if offset < 0 {
            continue;
        }
        let start = (offset as usize).min(non_wear.len());
        let end = (start + span).min(non_wear.len());
        non_wear[start..end].iter_mut().for_each(|flag| *flag = 1.0);
    }
    Ok(non_wear)
}

impl DaySource for Recording {
    fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    fn timezone(&self) -> FixedOffset {
        self.timezone
    }

    fn n_points_per_day(&self) -> usize {
        self.n_points_per_day
    }

    fn dst_day(&self) -> Option<usize> {
        self.dst_day
    }

    fn day_series(&self, day: usize) -> Result<DaySeries> {
        let days = self.sensor_angle.nrows();
        if day >= days {
            return Err(DataImportError::DayOutOfRange { day, days }.into());
        }
        debug!("Loading data for day {}", day);
        Ok(DaySeries {
            sensor_angle: self.sensor_angle.slice(s![day, ..]).to_vec(),
            arm_movement: self.arm_movement.slice(s![day, ..]).to_vec(),
            non_wear: self.non_wear.slice(s![day, ..]).to_vec(),
        })
    }
}

/// Subject folders (`output_*`) directly below `input_folder`, sorted by name.
pub fn get_subject_folders(input_folder: &Path) -> Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    for entry in WalkDir::new(input_folder).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to list {}", input_folder.display()))?;
        let is_subject = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with("output_"));
        if entry.file_type().is_dir() && is_subject {
            folders.push(entry.into_path());
        }
    }
    folders.sort();
    Ok(folders)
}
