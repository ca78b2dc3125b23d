//! Handlers behind each part of the review surface: subject loading, the
//! graph with its range slider, the per-night switches and the completion
//! checkbox.

use crate::day_window::assemble_day_window;
use crate::handlers::{Event, EventKind, HandlerRegistry, Reply, Session, SleepLabels};
use crate::minor_files::{self, vector_flag, StatusKind};
use crate::sleeplog;
use crate::time_points::duration_as_hh_mm;
use anyhow::{anyhow, Result};
use chrono::{DateTime, FixedOffset};
use log::debug;

const TIME_FORMATTING: &str = "%A - %d %B %Y %H:%M";

pub fn register_all(registry: &mut HandlerRegistry) {
    register_file_selection(registry);
    register_graph(registry);
    register_switches(registry);
    register_finished_checkbox(registry);
}

pub fn register_file_selection(registry: &mut HandlerRegistry) {
    registry.register("parse_files", EventKind::LoadFiles, parse_files);
}

pub fn register_graph(registry: &mut HandlerRegistry) {
    registry.register("refresh_range_slider", EventKind::DaySelected, refresh_range_slider);
    registry.register("create_graph", EventKind::DaySelected, create_graph);
    registry.register("adjust_range_slider", EventKind::RangeCommitted, adjust_range_slider);
}

pub fn register_switches(registry: &mut HandlerRegistry) {
    registry.register("update_switches", EventKind::DaySelected, update_switches);
    registry.register("toggle_switch", EventKind::SwitchToggled, toggle_switch);
}

pub fn register_finished_checkbox(registry: &mut HandlerRegistry) {
    registry.register("write_log_done", EventKind::CompletionChecked, write_log_done);
}

fn dst_warning(day: usize) -> String {
    format!(
        "One or more daylight saving time events were detected in this participant, \
         with the first one on day {}. The length of that day was adjusted by one hour; \
         please check the sleep window times on that day.",
        day + 1
    )
}

fn parse_files(session: &Session, event: &Event) -> Result<Option<Reply>> {
    let Event::LoadFiles { evaluator } = event else {
        return Ok(None);
    };
    let evaluator = match evaluator.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => return Ok(Some(Reply::MissingEvaluator)),
    };

    let file_manager = &session.file_manager;
    minor_files::initialize_files(file_manager, session.recording.as_ref(), evaluator)?;

    let dst_day = session.recording.dst_day();
    Ok(Some(Reply::Loaded {
        identifier: file_manager.identifier.clone(),
        days: session.recording.day_count(),
        dst_warning: dst_day.map(dst_warning),
    }))
}

fn sleep_labels(
    onset: &DateTime<FixedOffset>,
    wakeup: &DateTime<FixedOffset>,
    slider: [i64; 2],
) -> SleepLabels {
    SleepLabels {
        onset: format!("Sleep onset: {}", onset.format(TIME_FORMATTING)),
        offset: format!("Sleep offset: {}", wakeup.format(TIME_FORMATTING)),
        duration: format!("Sleep duration: {}", duration_as_hh_mm(*wakeup - *onset)),
        slider,
    }
}

fn refresh_range_slider(session: &Session, event: &Event) -> Result<Option<Reply>> {
    let Event::DaySelected { day, .. } = event else {
        return Ok(None);
    };
    let stored =
        sleeplog::read_sleep_window(&session.file_manager, session.recording.as_ref(), *day)?;
    Ok(Some(Reply::SleepLabels(sleep_labels(
        &stored.onset,
        &stored.wakeup,
        stored.points,
    ))))
}

fn create_graph(session: &Session, event: &Event) -> Result<Option<Reply>> {
    let Event::DaySelected { day, range } = event else {
        return Ok(None);
    };
    let slider = match range {
        Some(range) => *range,
        None => {
            sleeplog::read_sleep_window(&session.file_manager, session.recording.as_ref(), *day)?
                .points
        }
    };
    debug!("Creating graph for day {} with slider {:?}", day, slider);
    let window = assemble_day_window(session.recording.as_ref(), *day, slider)?;
    Ok(Some(Reply::Figure(Box::new(window))))
}

fn adjust_range_slider(session: &Session, event: &Event) -> Result<Option<Reply>> {
    let Event::RangeCommitted { day, range } = event else {
        return Ok(None);
    };
    let (sleep_time, wake_time) = sleeplog::modify_sleeplog(
        &session.file_manager,
        session.recording.as_ref(),
        *day,
        range[0],
        range[1],
    )?;
    Ok(Some(Reply::SleepLabels(sleep_labels(&sleep_time, &wake_time, *range))))
}

fn update_switches(session: &Session, event: &Event) -> Result<Option<Reply>> {
    let Event::DaySelected { day, .. } = event else {
        return Ok(None);
    };
    let flag = |kind: StatusKind| -> Result<bool> {
        let path = session.file_manager.vector_file(kind);
        let vector = minor_files::read_vector(path, None)?;
        let value = vector
            .get(*day)
            .ok_or_else(|| anyhow!("Day {} is missing from {}", day, path.display()))?;
        Ok(vector_flag(value))
    };
    Ok(Some(Reply::Switches {
        multiple_sleep: flag(StatusKind::MultipleSleep)?,
        missing_sleep: flag(StatusKind::MissingSleep)?,
        review_night: flag(StatusKind::ReviewNight)?,
    }))
}

fn toggle_switch(session: &Session, event: &Event) -> Result<Option<Reply>> {
    let Event::SwitchToggled { day, kind, on } = event else {
        return Ok(None);
    };
    minor_files::toggle_vector_value(session.file_manager.vector_file(*kind), *day, *on)?;
    Ok(Some(Reply::Toggled {
        kind: *kind,
        day: *day,
        on: *on,
    }))
}

fn write_log_done(session: &Session, event: &Event) -> Result<Option<Reply>> {
    let Event::CompletionChecked { done } = event else {
        return Ok(None);
    };
    let file_manager = &session.file_manager;
    minor_files::write_log_analysis_completed(
        *done,
        &file_manager.identifier,
        &file_manager.completed_analysis_file,
    )?;
    Ok(Some(Reply::Completion { done: *done }))
}
