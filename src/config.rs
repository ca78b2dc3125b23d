use crate::minor_files::StatusKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const APP_NAME: &str = "Actigraphy";

/// Review and annotate sleep windows of GGIR actigraphy output
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// GGIR output folder containing one `output_<id>` folder per participant
    #[arg(help = "GGIR output folder")]
    pub input_folder: PathBuf,

    /// Participant folder name (e.g. output_0042), defaults to the first one found
    #[arg(long, env = "ACTIGRAPHY_SUBJECT")]
    pub subject: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List the participant folders
    List,

    /// Initialize the review files of a participant
    Load {
        /// Name of the evaluator, recorded in the audit log
        #[arg(long, env = "ACTIGRAPHY_EVALUATOR")]
        evaluator: Option<String>,
    },

    /// Show one day: sleep window labels, switches and the plot data
    Show {
        /// Day index (0-based)
        #[arg(long)]
        day: usize,

        /// Slider values in minutes from noon (0 to 2160), defaults to the stored sleep window
        #[arg(long, num_args = 2, value_names = ["ONSET", "WAKEUP"])]
        range: Option<Vec<i64>>,

        /// Write the assembled figure as JSON to this path
        #[arg(long)]
        figure: Option<PathBuf>,
    },

    /// Store the sleep window of one day
    Commit {
        /// Day index (0-based)
        #[arg(long)]
        day: usize,

        /// Slider values in minutes from noon (0 to 2160)
        #[arg(long, num_args = 2, value_names = ["ONSET", "WAKEUP"], required = true)]
        range: Vec<i64>,
    },

    /// Set or clear a per-night flag
    Flag {
        /// Day index (0-based)
        #[arg(long)]
        day: usize,

        /// review-night, multiple-sleep, data-cleaning or missing-sleep
        #[arg(long)]
        kind: StatusKind,

        /// Clear the flag instead of setting it
        #[arg(long)]
        off: bool,
    },

    /// Mark the participant's sleep log analysis as completed
    Done {
        /// Record the analysis as not completed
        #[arg(long)]
        no: bool,
    },
}

/// Turns the two values of a `--range` option into slider handles.
pub fn slider_range(values: &[i64]) -> Option<[i64; 2]> {
    match values {
        [onset, wakeup] => Some([*onset, *wakeup]),
        _ => None,
    }
}
