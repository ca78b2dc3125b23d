use crate::minor_files::StatusKind;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Paths of every file that belongs to one subject's review session.
///
/// The subject folder is named `output_<identifier>`; all files written by the
/// review live under its `logs/` directory.
#[derive(Debug, Clone)]
pub struct FileManager {
    pub base_dir: PathBuf,
    pub log_dir: PathBuf,
    pub identifier: String,
    pub log_file: PathBuf,
    pub sleeplog_file: PathBuf,
    pub multiple_sleeplog_file: PathBuf,
    pub data_cleaning_file: PathBuf,
    pub missing_sleep_file: PathBuf,
    pub review_night_file: PathBuf,
    pub completed_analysis_file: PathBuf,
}

impl FileManager {
    /// Builds the path mapping and creates the `logs/` directory.
    pub fn new(base_dir: &Path) -> Result<Self> {
        let manager = Self::from_base_dir(base_dir);
        std::fs::create_dir_all(&manager.log_dir).with_context(|| {
            format!("Failed to create log directory: {}", manager.log_dir.display())
        })?;
        Ok(manager)
    }

    fn from_base_dir(base_dir: &Path) -> Self {
        let log_dir = base_dir.join("logs");
        let folder_name = base_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let identifier = folder_name
            .rsplit('_')
            .next()
            .unwrap_or(&folder_name)
            .to_string();

        let per_subject = |prefix: &str| log_dir.join(format!("{}_{}.csv", prefix, identifier));

        Self {
            log_file: log_dir.join("log_file.csv"),
            sleeplog_file: per_subject("sleeplog"),
            multiple_sleeplog_file: per_subject("multiple_sleeplog"),
            data_cleaning_file: per_subject("data_cleaning"),
            missing_sleep_file: per_subject("missing_sleep"),
            review_night_file: per_subject("review_night"),
            completed_analysis_file: log_dir.join("participants_with_completed_analysis.csv"),
            base_dir: base_dir.to_path_buf(),
            log_dir,
            identifier,
        }
    }

    pub fn vector_file(&self, kind: StatusKind) -> &Path {
        match kind {
            StatusKind::ReviewNight => &self.review_night_file,
            StatusKind::MultipleSleep => &self.multiple_sleeplog_file,
            StatusKind::DataCleaning => &self.data_cleaning_file,
            StatusKind::MissingSleep => &self.missing_sleep_file,
        }
    }
}
