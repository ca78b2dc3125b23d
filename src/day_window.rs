//! Builds the 36 hour view of one night: the second half of day `d`
//! followed by all of day `d + 1`, starting at noon.

use crate::data_loading::{DaySeries, DaySource};
use crate::nonwear::nonwear_spans;
use crate::time_points::{point_to_time_of_day, slider_values_to_graph_values};
use anyhow::{anyhow, Result};
use chrono::Duration;
use log::debug;
use serde::Serialize;

pub const SLEEP_WINDOW_COLOR: &str = "red";
pub const NONWEAR_COLOR: &str = "green";

/// Highlighted index range drawn over the plot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rectangle {
    pub start: usize,
    pub end: usize,
    pub color: &'static str,
    pub label: &'static str,
}

/// Everything needed to draw one day: the series, the x-axis labels and the
/// overlay rectangles.
#[derive(Debug, Clone, Serialize)]
pub struct DayWindow {
    pub day: usize,
    pub title: String,
    pub timestamps: Vec<String>,
    pub sensor_angle: Vec<f64>,
    pub arm_movement: Vec<f64>,
    pub non_wear: Vec<f64>,
    pub sleep_window: Option<Rectangle>,
    pub nonwear: Vec<Rectangle>,
}

impl DayWindow {
    /// All overlays in drawing order.
    pub fn rectangles(&self) -> impl Iterator<Item = &Rectangle> {
        self.sleep_window.iter().chain(self.nonwear.iter())
    }
}

fn concatenate(first: &[f64], second: &[f64]) -> Vec<f64> {
    first.iter().chain(second).copied().collect()
}

pub fn assemble_day_window<S: DaySource + ?Sized>(
    source: &S,
    day: usize,
    slider: [i64; 2],
) -> Result<DayWindow> {
    let dates = source.dates();
    let n_points_per_day = source.n_points_per_day();
    let half = n_points_per_day / 2;
    let date = *dates
        .get(day)
        .ok_or_else(|| {
            anyhow!("Day {} is outside the {} days of the recording", day, dates.len())
        })?;

    let first = source.day_series(day)?;
    let second = if day + 1 < dates.len() {
        source.day_series(day + 1)?
    } else {
        debug!("Day {} is the last day, padding the window", day);
        DaySeries::placeholder(n_points_per_day)
    };

    let sensor_angle = concatenate(&first.sensor_angle[half..], &second.sensor_angle);
    let arm_movement = concatenate(&first.arm_movement[half..], &second.arm_movement);
    let non_wear = concatenate(&first.non_wear[half..], &second.non_wear);

    let next_date = date + Duration::days(1);
    let timestamps = (0..half + n_points_per_day)
        .map(|point| {
            let label_date = if point < half { date } else { next_date };
            format!(
                "{} {}",
                label_date.format("%d/%b/%Y"),
                point_to_time_of_day(point, n_points_per_day, 12)
            )
        })
        .collect();

    let (start, end) = slider_values_to_graph_values(slider, n_points_per_day);
    let sleep_window = (start != end).then_some(Rectangle {
        start,
        end,
        color: SLEEP_WINDOW_COLOR,
        label: "sleep window",
    });

    let nonwear = nonwear_spans(&non_wear)
        .into_iter()
        .map(|span| Rectangle {
            start: span.start,
            end: span.end,
            color: NONWEAR_COLOR,
            label: "non-wear",
        })
        .collect();

    Ok(DayWindow {
        day,
        title: format!("Day {}: {}", day + 1, date.format("%A - %d %B %Y")),
        timestamps,
        sensor_angle,
        arm_movement,
        non_wear,
        sleep_window,
        nonwear,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loading::ARM_MOVEMENT_FLOOR;
    use chrono::{FixedOffset, NaiveDate};

    struct Stub {
        dates: Vec<NaiveDate>,
        days: Vec<DaySeries>,
    }

    impl Stub {
        /// Days whose angle equals the day index; non-wear in the given days.
        fn new(n_days: usize, n_points_per_day: usize, nonwear_days: &[usize]) -> Self {
            let start = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
            Self {
                dates: (0..n_days)
                    .map(|d| start + Duration::days(d as i64))
                    .collect(),
                days: (0..n_days)
                    .map(|d| DaySeries {
                        sensor_angle: vec![d as f64; n_points_per_day],
                        arm_movement: vec![d as f64 * 10.0; n_points_per_day],
                        non_wear: vec![
                            if nonwear_days.contains(&d) { 1.0 } else { 0.0 };
                            n_points_per_day
                        ],
                    })
                    .collect(),
            }
        }
    }

    impl DaySource for Stub {
        fn dates(&self) -> &[NaiveDate] {
            &self.dates
        }
        fn timezone(&self) -> FixedOffset {
            FixedOffset::east_opt(0).unwrap()
        }
        fn n_points_per_day(&self) -> usize {
            self.days[0].sensor_angle.len()
        }
        fn day_series(&self, day: usize) -> Result<DaySeries> {
            self.days.get(day).cloned().ok_or_else(|| anyhow!("no day {}", day))
        }
    }

    #[test]
    fn window_is_second_half_then_next_day() {
        let stub = Stub::new(3, 8, &[]);

        let window = assemble_day_window(&stub, 0, [0, 0]).unwrap();

        assert_eq!(window.sensor_angle.len(), 12);
        assert_eq!(window.sensor_angle[..4], [0.0; 4]);
        assert_eq!(window.sensor_angle[4..], [1.0; 8]);
        assert_eq!(window.arm_movement[4], 10.0);
        assert_eq!(window.title, "Day 1: Wednesday - 01 March 2023");
    }

    #[test]
    fn labels_start_at_noon_and_switch_date_at_midnight() {
        let stub = Stub::new(2, 24, &[]);

        let window = assemble_day_window(&stub, 0, [0, 0]).unwrap();

        assert_eq!(window.timestamps.len(), 36);
        assert_eq!(window.timestamps[0], "01/Mar/2023 12:00");
        assert_eq!(window.timestamps[11], "01/Mar/2023 23:00");
        assert_eq!(window.timestamps[12], "02/Mar/2023 00:00");
        assert_eq!(window.timestamps[35], "02/Mar/2023 23:00");
    }

    #[test]
    fn last_day_is_padded_with_placeholder() {
        let stub = Stub::new(2, 8, &[]);

        let window = assemble_day_window(&stub, 1, [0, 0]).unwrap();

        assert_eq!(window.arm_movement.len(), 12);
        assert!(window.arm_movement[4..].iter().all(|v| *v == ARM_MOVEMENT_FLOOR));
        assert!(window.sensor_angle[4..].iter().all(|v| *v == 0.0));
        assert!(window.non_wear[4..].iter().all(|v| *v == 0.0));
        assert_eq!(window.sensor_angle[..4], [1.0; 4]);
    }

    #[test]
    fn day_beyond_recording_is_an_error() {
        let stub = Stub::new(2, 8, &[]);
        assert!(assemble_day_window(&stub, 2, [0, 0]).is_err());
    }

    #[test]
    fn equal_slider_handles_hide_sleep_window() {
        let stub = Stub::new(2, 1440, &[]);

        let window = assemble_day_window(&stub, 0, [900, 900]).unwrap();
        assert!(window.sleep_window.is_none());

        let window = assemble_day_window(&stub, 0, [600, 1200]).unwrap();
        assert_eq!(
            window.sleep_window,
            Some(Rectangle {
                start: 600,
                end: 1200,
                color: SLEEP_WINDOW_COLOR,
                label: "sleep window",
            })
        );
    }

    #[test]
    fn nonwear_overlays_follow_flags() {
        // Day 1 is entirely non-wear, so the window is worn then non-wear to the end.
        let stub = Stub::new(3, 8, &[1]);

        let window = assemble_day_window(&stub, 0, [0, 0]).unwrap();

        let spans: Vec<(usize, usize)> = window.nonwear.iter().map(|r| (r.start, r.end)).collect();
        assert_eq!(spans, vec![(4, 11)]);
        assert!(window.rectangles().all(|r| r.color == NONWEAR_COLOR));
    }

    #[test]
    fn window_serializes_to_json() {
        let stub = Stub::new(2, 4, &[0]);
        let window = assemble_day_window(&stub, 0, [0, 60]).unwrap();

        let json = serde_json::to_value(&window).unwrap();

        assert_eq!(json["day"], 0);
        assert_eq!(json["nonwear"][0]["label"], "non-wear");
        assert_eq!(json["timestamps"].as_array().unwrap().len(), 6);
    }
}
