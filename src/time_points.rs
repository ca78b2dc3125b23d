use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use thiserror::Error;

/// Length of the display window in slider minutes (36 hours).
pub const WINDOW_MINUTES: i64 = 36 * 60;

const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimePointError {
    #[error("{time} is {minutes} minutes from noon of {date}, outside the 36 hour display window")]
    OutsideWindow {
        time: String,
        date: NaiveDate,
        minutes: i64,
    },
    #[error("slider point {0} is outside the 0 to 2160 minute display window")]
    PointOutsideWindow(i64),
}

fn noon(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::hours(12)
}

/// Minutes between noon of `date` and `time`, floored.
///
/// `time` is first moved into `tz`, the recording offset, so a timestamp
/// stored with any offset maps back onto the slider it came from.
pub fn time_to_point(
    time: &DateTime<FixedOffset>,
    date: NaiveDate,
    tz: &FixedOffset,
) -> Result<i64, TimePointError> {
    let delta = time.with_timezone(tz).naive_local() - noon(date);
    let minutes = delta.num_seconds().div_euclid(60);
    if !(0..=WINDOW_MINUTES).contains(&minutes) {
        return Err(TimePointError::OutsideWindow {
            time: time.to_string(),
            date,
            minutes,
        });
    }
    Ok(minutes)
}

/// Inverse of [`time_to_point`]. An unset point maps to 03:00 on the day
/// after `date`.
pub fn point_to_time(
    point: Option<i64>,
    date: NaiveDate,
    tz: &FixedOffset,
) -> Result<DateTime<FixedOffset>, TimePointError> {
    let naive = match point {
        None => date.and_time(NaiveTime::MIN) + Duration::days(1) + Duration::hours(3),
        Some(point) if (0..=WINDOW_MINUTES).contains(&point) => {
            noon(date) + Duration::minutes(point)
        }
        Some(point) => return Err(TimePointError::PointOutsideWindow(point)),
    };
    Ok(match tz.from_local_datetime(&naive).single() {
        Some(time) => time,
        None => tz.from_utc_datetime(&(naive - *tz)),
    })
}

/// `HH:MM` label for a sample index in a day of `n_points_per_day` samples,
/// shifted forward by `offset_hours`.
pub fn point_to_time_of_day(point: usize, n_points_per_day: usize, offset_hours: usize) -> String {
    let n = n_points_per_day as f64;
    let offset_in_points = offset_hours as f64 * n / 24.0;
    let scaled_point = (point as f64 + offset_in_points) * 24.0 / n;
    let hour = scaled_point % 24.0;
    let minute = (scaled_point - scaled_point.trunc()) * 60.0;
    format!("{:02}:{:02}", hour as u32, minute as u32)
}

/// Maps the two slider handles (minutes from noon) to sample indexes in the
/// concatenated display window.
pub fn slider_values_to_graph_values(values: [i64; 2], n_points_per_day: usize) -> (usize, usize) {
    let scale = |value: i64| -> usize {
        let value = value.clamp(0, WINDOW_MINUTES) as usize;
        value * n_points_per_day / MINUTES_PER_DAY as usize
    };
    (scale(values[0]), scale(values[1]))
}

/// Formats a duration as `HH:MM`.
pub fn duration_as_hh_mm(delta: Duration) -> String {
    let total_minutes = delta.num_minutes();
    let sign = if total_minutes < 0 { "-" } else { "" };
    let total_minutes = total_minutes.abs();
    format!("{}{:02}:{:02}", sign, total_minutes / 60, total_minutes % 60)
}
