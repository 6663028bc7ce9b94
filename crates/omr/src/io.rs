use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

/// Errors from file-based helpers (configs, reports, snapshots, replays).
#[derive(thiserror::Error, Debug)]
pub enum OmrIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Image(#[from] ::image::ImageError),
    #[error(transparent)]
    Buffer(#[from] omr_core::ImageError),
    #[error("no frames found in {0}")]
    NoFrames(String),
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, OmrIoError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), OmrIoError> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}
