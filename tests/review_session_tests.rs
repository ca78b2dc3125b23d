use actigraphy_review::build_dispatcher;
use actigraphy_review::data_loading::{DaySource, Recording, ARM_MOVEMENT_FLOOR};
use actigraphy_review::day_window::assemble_day_window;
use actigraphy_review::file_manager::FileManager;
use actigraphy_review::handlers::{Event, Reply, Session};
use actigraphy_review::minor_files::{self, StatusKind};
use actigraphy_review::sleeplog::{self, SleepLogError};
use actigraphy_review::time_points::point_to_time;
use chrono::{Duration, FixedOffset, TimeZone};
use std::path::{Path, PathBuf};

/// Writes a participant folder with 30 minute epochs from 2023-03-01 18:00
/// until 2023-03-04 09:30, i.e. four calendar days, in UTC+01:00.
fn write_subject(root: &Path) -> PathBuf {
    let base = root.join("output_0042");
    let basic = base.join("meta").join("basic");
    std::fs::create_dir_all(&basic).unwrap();

    let tz = FixedOffset::east_opt(3600).unwrap();
    let start = tz.with_ymd_and_hms(2023, 3, 1, 18, 0, 0).unwrap();
    let end = tz.with_ymd_and_hms(2023, 3, 4, 10, 0, 0).unwrap();

    let mut short = String::from("timestamp,anglez,ENMO\n");
    let mut time = start;
    while time < end {
        short.push_str(&format!("{},45.0,0.028\n", time.format("%Y-%m-%dT%H:%M:%S%z")));
        time += Duration::minutes(30);
    }
    std::fs::write(basic.join("metashort.csv"), short).unwrap();

    // Non-wear from 2023-03-02 14:00 to 16:00.
    let mut long = String::from("timestamp,nonwearscore\n");
    let mut time = start;
    while time < end {
        let flagged = time >= tz.with_ymd_and_hms(2023, 3, 2, 14, 0, 0).unwrap()
            && time < tz.with_ymd_and_hms(2023, 3, 2, 16, 0, 0).unwrap();
        long.push_str(&format!(
            "{},{}\n",
            time.format("%Y-%m-%dT%H:%M:%S%z"),
            if flagged { 3 } else { 0 }
        ));
        time += Duration::hours(1);
    }
    std::fs::write(basic.join("metalong.csv"), long).unwrap();

    base
}

fn open_session(base: &Path) -> Session {
    let file_manager = FileManager::new(base).unwrap();
    let recording = Recording::load(base).unwrap();
    Session::new(file_manager, Box::new(recording))
}

fn load(session: &Session) -> Vec<Reply> {
    build_dispatcher()
        .dispatch(
            session,
            &Event::LoadFiles {
                evaluator: Some("ada".into()),
            },
        )
        .unwrap()
}

#[test]
fn load_requires_an_evaluator() {
    let tmp = tempfile::tempdir().unwrap();
    let session = open_session(&write_subject(tmp.path()));

    let replies = build_dispatcher()
        .dispatch(&session, &Event::LoadFiles { evaluator: Some("  ".into()) })
        .unwrap();

    assert!(matches!(replies.as_slice(), [Reply::MissingEvaluator]));
    assert!(!session.file_manager.sleeplog_file.exists());
}

#[test]
fn load_initializes_all_files() {
    let tmp = tempfile::tempdir().unwrap();
    let session = open_session(&write_subject(tmp.path()));

    let replies = load(&session);

    match replies.as_slice() {
        [Reply::Loaded {
            identifier, days, ..
        }] => {
            assert_eq!(identifier, "0042");
            assert_eq!(*days, 4);
        }
        other => panic!("unexpected replies: {:?}", other),
    }

    let (onsets, wakeups) = sleeplog::read_sleeplog(&session.file_manager.sleeplog_file).unwrap();
    assert_eq!(onsets.len(), 4);
    assert_eq!(onsets[0], "2023-03-02 03:00:00+01:00");
    assert_eq!(wakeups[3], "2023-03-05 03:00:00+01:00");

    for kind in StatusKind::ALL {
        let vector =
            minor_files::read_vector(session.file_manager.vector_file(kind), None).unwrap();
        assert_eq!(vector, vec!["0"; 4]);
    }

    let audit = std::fs::read_to_string(&session.file_manager.log_file).unwrap();
    assert!(audit.starts_with("Username,Participant,Date,Filename\nada,0042,"));
}

#[test]
fn reloading_keeps_existing_files() {
    let tmp = tempfile::tempdir().unwrap();
    let session = open_session(&write_subject(tmp.path()));
    load(&session);

    let review = session.file_manager.vector_file(StatusKind::ReviewNight);
    minor_files::write_vector(review, &[1, 0, 1, 0]).unwrap();
    sleeplog::modify_sleeplog(&session.file_manager, session.recording.as_ref(), 1, 600, 1260)
        .unwrap();
    let sleeplog_before = std::fs::read_to_string(&session.file_manager.sleeplog_file).unwrap();

    load(&session);

    assert_eq!(minor_files::read_vector(review, None).unwrap(), vec!["1", "0", "1", "0"]);
    assert_eq!(
        std::fs::read_to_string(&session.file_manager.sleeplog_file).unwrap(),
        sleeplog_before
    );
    let audit = std::fs::read_to_string(&session.file_manager.log_file).unwrap();
    assert_eq!(audit.lines().count(), 3);
}

#[test]
fn committed_window_round_trips_through_the_log() {
    let tmp = tempfile::tempdir().unwrap();
    let session = open_session(&write_subject(tmp.path()));
    load(&session);
    let dispatcher = build_dispatcher();

    dispatcher
        .dispatch(&session, &Event::RangeCommitted { day: 2, range: [630, 1290] })
        .unwrap();

    let recording = session.recording.as_ref();
    let date = recording.dates()[2];
    let tz = recording.timezone();
    let (onsets, wakeups) = sleeplog::read_sleeplog(&session.file_manager.sleeplog_file).unwrap();
    assert_eq!(
        sleeplog::parse_timestamp(&onsets[2], &tz).unwrap(),
        Some(point_to_time(Some(630), date, &tz).unwrap())
    );
    assert_eq!(
        sleeplog::parse_timestamp(&wakeups[2], &tz).unwrap(),
        Some(point_to_time(Some(1290), date, &tz).unwrap())
    );
    // Other days keep their placeholder.
    assert_eq!(onsets[1], "2023-03-03 03:00:00+01:00");

    let replies = dispatcher
        .dispatch(&session, &Event::DaySelected { day: 2, range: None })
        .unwrap();
    let labels = replies
        .iter()
        .find_map(|reply| match reply {
            Reply::SleepLabels(labels) => Some(labels.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(labels.slider, [630, 1290]);
    assert_eq!(labels.onset, "Sleep onset: Friday - 03 March 2023 22:30");
    assert_eq!(labels.offset, "Sleep offset: Saturday - 04 March 2023 09:30");
    assert_eq!(labels.duration, "Sleep duration: 11:00");
}

#[test]
fn commit_rejects_onset_after_wakeup() {
    let tmp = tempfile::tempdir().unwrap();
    let session = open_session(&write_subject(tmp.path()));
    load(&session);
    let before = std::fs::read_to_string(&session.file_manager.sleeplog_file).unwrap();

    let err = build_dispatcher()
        .dispatch(&session, &Event::RangeCommitted { day: 0, range: [900, 600] })
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<SleepLogError>(),
        Some(SleepLogError::OnsetAfterWakeup { .. })
    ));
    assert_eq!(
        std::fs::read_to_string(&session.file_manager.sleeplog_file).unwrap(),
        before
    );
}

#[test]
fn commit_rejects_points_outside_the_window() {
    let tmp = tempfile::tempdir().unwrap();
    let session = open_session(&write_subject(tmp.path()));
    load(&session);
    let before = std::fs::read_to_string(&session.file_manager.sleeplog_file).unwrap();
    let dispatcher = build_dispatcher();

    for range in [[2200, 2300], [-10, 600], [0, i64::MAX]] {
        let err = dispatcher
            .dispatch(&session, &Event::RangeCommitted { day: 1, range })
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SleepLogError>(),
            Some(SleepLogError::PointOutsideWindow { .. })
        ));
    }
    assert_eq!(
        std::fs::read_to_string(&session.file_manager.sleeplog_file).unwrap(),
        before
    );

    // The stored window is still readable afterwards.
    let replies = dispatcher
        .dispatch(&session, &Event::DaySelected { day: 1, range: None })
        .unwrap();
    assert_eq!(replies.len(), 3);
}

#[test]
fn show_builds_figure_labels_and_switches() {
    let tmp = tempfile::tempdir().unwrap();
    let session = open_session(&write_subject(tmp.path()));
    load(&session);
    let dispatcher = build_dispatcher();
    dispatcher
        .dispatch(
            &session,
            &Event::SwitchToggled {
                day: 0,
                kind: StatusKind::MissingSleep,
                on: true,
            },
        )
        .unwrap();

    let replies = dispatcher
        .dispatch(&session, &Event::DaySelected { day: 0, range: Some([600, 1200]) })
        .unwrap();

    assert_eq!(replies.len(), 3);
    let figure = replies
        .iter()
        .find_map(|reply| match reply {
            Reply::Figure(window) => Some(window),
            _ => None,
        })
        .unwrap();
    // 48 points per day: 24 from the second half of day 0, 48 from day 1.
    assert_eq!(figure.timestamps.len(), 72);
    assert_eq!(figure.timestamps[0], "01/Mar/2023 12:00");
    let sleep = figure.sleep_window.as_ref().unwrap();
    assert_eq!((sleep.start, sleep.end), (20, 40));
    // Non-wear 14:00 to 16:00 on 2 March: points 24 + 28 to 24 + 32.
    let spans: Vec<(usize, usize)> = figure.nonwear.iter().map(|r| (r.start, r.end)).collect();
    assert_eq!(spans, vec![(52, 56)]);

    assert!(replies.iter().any(|reply| matches!(
        reply,
        Reply::Switches {
            multiple_sleep: false,
            missing_sleep: true,
            review_night: false
        }
    )));
}

#[test]
fn last_day_window_is_padded() {
    let tmp = tempfile::tempdir().unwrap();
    let session = open_session(&write_subject(tmp.path()));
    let recording = session.recording.as_ref();
    let last = recording.day_count() - 1;
    let n = recording.n_points_per_day();

    let window = assemble_day_window(recording, last, [0, 0]).unwrap();

    assert_eq!(window.arm_movement.len(), n / 2 + n);
    assert!(window.arm_movement[n / 2..]
        .iter()
        .all(|value| *value == ARM_MOVEMENT_FLOOR));
    assert!(window.sensor_angle[n / 2..].iter().all(|value| *value == 0.0));
    assert!(window.sleep_window.is_none());
}

#[test]
fn completion_is_logged() {
    let tmp = tempfile::tempdir().unwrap();
    let session = open_session(&write_subject(tmp.path()));

    build_dispatcher()
        .dispatch(&session, &Event::CompletionChecked { done: true })
        .unwrap();

    let content = std::fs::read_to_string(&session.file_manager.completed_analysis_file).unwrap();
    assert!(content.lines().nth(1).unwrap().starts_with("0042,Yes,"));
}
