use actigraphy_review::config::{slider_range, Args, Command, APP_NAME};
use actigraphy_review::data_loading::{get_subject_folders, Recording};
use actigraphy_review::file_manager::FileManager;
use actigraphy_review::handlers::{Event, Reply, Session};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;

fn select_subject(args: &Args, folders: &[PathBuf]) -> Result<PathBuf> {
    match &args.subject {
        Some(name) => folders
            .iter()
            .find(|folder| folder.file_name().is_some_and(|f| f == name.as_str()))
            .cloned()
            .ok_or_else(|| anyhow!("No participant folder named {}", name)),
        None => folders
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("No output_* folders in {}", args.input_folder.display())),
    }
}

fn to_event(command: &Command) -> Result<Event> {
    let event = match command {
        Command::List => bail!("list does not need a participant"),
        Command::Load { evaluator } => Event::LoadFiles {
            evaluator: evaluator.clone(),
        },
        Command::Show { day, range, .. } => Event::DaySelected {
            day: *day,
            range: range.as_deref().and_then(slider_range),
        },
        Command::Commit { day, range } => Event::RangeCommitted {
            day: *day,
            range: slider_range(range).ok_or_else(|| anyhow!("--range takes two values"))?,
        },
        Command::Flag { day, kind, off } => Event::SwitchToggled {
            day: *day,
            kind: *kind,
            on: !*off,
        },
        Command::Done { no } => Event::CompletionChecked { done: !*no },
    };
    Ok(event)
}

fn print_reply(reply: &Reply, figure_path: Option<&PathBuf>) -> Result<()> {
    match reply {
        Reply::Loaded {
            identifier,
            days,
            dst_warning,
        } => {
            println!("Loaded participant {} ({} days)", identifier, days);
            if let Some(warning) = dst_warning {
                println!("\nWARNING: {}", warning);
            }
        }
        Reply::MissingEvaluator => {
            println!("Insert the evaluator's name before continuing (--evaluator).");
        }
        Reply::Figure(window) => {
            println!("\n{}", window.title);
            println!(
                "  {} points, {} to {}",
                window.timestamps.len(),
                window.timestamps.first().map(String::as_str).unwrap_or("-"),
                window.timestamps.last().map(String::as_str).unwrap_or("-")
            );
            for rectangle in window.rectangles() {
                println!(
                    "  {} ({}): {} to {}",
                    rectangle.label,
                    rectangle.color,
                    window.timestamps.get(rectangle.start).map(String::as_str).unwrap_or("-"),
                    window.timestamps.get(rectangle.end).map(String::as_str).unwrap_or("-")
                );
            }
            if let Some(path) = figure_path {
                let file = std::fs::File::create(path)
                    .with_context(|| format!("Failed to create file: {}", path.display()))?;
                serde_json::to_writer_pretty(file, window)?;
                println!("  Figure written to {}", path.display());
            }
        }
        Reply::SleepLabels(labels) => {
            println!("{}", labels.onset);
            println!("{}", labels.offset);
            println!("{}", labels.duration);
            println!("Slider: {} to {}", labels.slider[0], labels.slider[1]);
        }
        Reply::Switches {
            multiple_sleep,
            missing_sleep,
            review_night,
        } => {
            println!("Multiple sleep periods in this 24h period: {}", multiple_sleep);
            println!("More than 2 hours of missing sleep data from 8PM to 8AM: {}", missing_sleep);
            println!("Night needs review: {}", review_night);
        }
        Reply::Toggled { kind, day, on } => {
            println!("{:?} for day {} set to {}", kind, day + 1, on);
        }
        Reply::Completion { done } => {
            println!(
                "Sleep log analysis marked as {}",
                if *done { "completed" } else { "not completed" }
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    info!("Starting {}", APP_NAME);

    let folders = get_subject_folders(&args.input_folder)?;
    if args.command == Command::List {
        println!("Found {} participants:", folders.len());
        for folder in &folders {
            println!("  {}", folder.display());
        }
        return Ok(());
    }

    let subject = select_subject(&args, &folders)?;
    debug!("Selected participant folder {}", subject.display());

    let file_manager = FileManager::new(&subject)?;
    let recording = Recording::load(&subject)?;
    let session = Session::new(file_manager, Box::new(recording));

    let dispatcher = actigraphy_review::build_dispatcher();
    let event = to_event(&args.command)?;
    let replies = dispatcher.dispatch(&session, &event)?;

    let figure_path = match &args.command {
        Command::Show { figure, .. } => figure.as_ref(),
        _ => None,
    };
    for reply in &replies {
        print_reply(reply, figure_path)?;
    }

    Ok(())
}
