use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::{RatingCode, RatingEvent};

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to open rating log {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to write rating log: {0}")]
    Write(#[from] io::Error),
}

/// Destination for rating events. Events are never read back.
pub trait RatingSink: fmt::Debug {
    fn record(&mut self, event: &RatingEvent) -> Result<(), LogError>;
}

#[derive(Debug)]
pub struct FileRatingLog {
    file: File,
    code: RatingCode,
}

impl FileRatingLog {
    pub fn open(path: &Path, code: RatingCode) -> Result<Self, LogError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LogError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self { file, code })
    }
}

impl RatingSink for FileRatingLog {
    fn record(&mut self, event: &RatingEvent) -> Result<(), LogError> {
        let mut line = event.to_line(self.code);
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct NullRatingLog;

impl RatingSink for NullRatingLog {
    fn record(&mut self, _event: &RatingEvent) -> Result<(), LogError> {
        Ok(())
    }
}

pub fn open_rating_log(path: &Path, code: RatingCode) -> Box<dyn RatingSink> {
    match FileRatingLog::open(path, code) {
        Ok(log) => Box::new(log),
        Err(err) => {
            log::warn!("{err}; ratings will not be persisted");
            Box::new(NullRatingLog)
        }
    }
}
