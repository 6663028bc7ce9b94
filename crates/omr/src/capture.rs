//! Camera abstraction.
//!
//! A capture device is exclusively owned by one session. [`DeviceGuard`]
//! opens it and releases it when dropped, so every exit path of the scan
//! loop (completion, cancellation, `?` on an error, unwinding) stops the
//! camera.

use std::path::Path;

use log::{debug, warn};
use omr_core::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::io::OmrIoError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Front camera.
    User,
    /// Rear camera.
    Environment,
}

/// Requested capture mode. Devices treat these as preferences.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConstraints {
    pub facing: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub min_frame_rate: f32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::Environment,
            ideal_width: 1280,
            ideal_height: 720,
            min_frame_rate: 15.0,
        }
    }
}

/// Capture failures. All of them end the session.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("camera permission denied: allow camera access for this application and restart the scan")]
    PermissionDenied,
    #[error("no camera found: connect a camera and restart the scan")]
    NotFound,
    #[error("camera does not support the requested mode: try another camera or a lower resolution")]
    Unsupported,
    #[error("camera is in use by another application: close it and restart the scan")]
    Busy,
    #[error("camera stopped delivering frames: check the connection and restart the scan")]
    Disconnected,
    #[error("camera error: {0}")]
    Other(String),
}

/// Source of RGBA frames.
pub trait CaptureDevice {
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<(), DeviceError>;

    /// Latest frame. Only valid between `open` and `release`.
    fn grab(&mut self) -> Result<RgbaImage, DeviceError>;

    /// Stop all tracks. Must be safe to call more than once.
    fn release(&mut self);
}

/// Open device that is released on drop.
pub struct DeviceGuard<'a, D: CaptureDevice + ?Sized> {
    device: &'a mut D,
}

impl<'a, D: CaptureDevice + ?Sized> DeviceGuard<'a, D> {
    pub fn acquire(
        device: &'a mut D,
        constraints: &CaptureConstraints,
    ) -> Result<Self, DeviceError> {
        if let Err(err) = device.open(constraints) {
            warn!("failed to open capture device: {err}");
            device.release();
            return Err(err);
        }
        debug!("capture device opened");
        Ok(Self { device })
    }

    pub fn grab(&mut self) -> Result<RgbaImage, DeviceError> {
        self.device.grab()
    }
}

impl<D: CaptureDevice + ?Sized> Drop for DeviceGuard<'_, D> {
    fn drop(&mut self) {
        self.device.release();
        debug!("capture device released");
    }
}

/// Plays back a fixed list of frames, for tests and offline demos.
#[derive(Clone, Debug, Default)]
pub struct ReplayDevice {
    frames: Vec<RgbaImage>,
    cursor: usize,
    looping: bool,
    open: bool,
    releases: usize,
    fail_open: Option<DeviceError>,
}

impl ReplayDevice {
    pub fn new(frames: Vec<RgbaImage>) -> Self {
        Self {
            frames,
            ..Self::default()
        }
    }

    /// Restart from the first frame instead of disconnecting at the end.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Make the next `open` fail with `err`.
    pub fn failing_open(mut self, err: DeviceError) -> Self {
        self.fail_open = Some(err);
        self
    }

    /// Load every PNG/JPEG/BMP in `dir`, in file-name order.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, OmrIoError> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| {
                        matches!(
                            e.to_ascii_lowercase().as_str(),
                            "png" | "jpg" | "jpeg" | "bmp"
                        )
                    })
            })
            .collect();
        paths.sort();
        if paths.is_empty() {
            return Err(OmrIoError::NoFrames(dir.display().to_string()));
        }

        let frames = paths
            .iter()
            .map(|p| -> Result<RgbaImage, OmrIoError> {
                let img = ::image::open(p)?.to_rgba8();
                let (w, h) = img.dimensions();
                Ok(RgbaImage::from_raw(w as usize, h as usize, img.into_raw())?)
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!("loaded {} replay frames from {}", frames.len(), dir.display());
        Ok(Self::new(frames))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Number of `release` calls so far.
    pub fn releases(&self) -> usize {
        self.releases
    }
}

impl CaptureDevice for ReplayDevice {
    fn open(&mut self, _constraints: &CaptureConstraints) -> Result<(), DeviceError> {
        if let Some(err) = self.fail_open.take() {
            return Err(err);
        }
        if self.frames.is_empty() {
            return Err(DeviceError::NotFound);
        }
        self.open = true;
        self.cursor = 0;
        Ok(())
    }

    fn grab(&mut self) -> Result<RgbaImage, DeviceError> {
        if !self.open {
            return Err(DeviceError::Disconnected);
        }
        if self.cursor >= self.frames.len() {
            if !self.looping {
                return Err(DeviceError::Disconnected);
            }
            self.cursor = 0;
        }
        let frame = self.frames[self.cursor].clone();
        self.cursor += 1;
        Ok(frame)
    }

    fn release(&mut self) {
        self.open = false;
        self.releases += 1;
    }
}
