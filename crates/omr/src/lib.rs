//! Optical answer-sheet recognition from a live camera.
//!
//! This facade ties the workspace together:
//! - [`SessionController`] runs anchors → alignment → bubble fills →
//!   debounce on each frame and moves from scanning to confirmation,
//! - [`ScanLoop`] drives a session from a [`CaptureDevice`] at a fixed
//!   period and guarantees the device is released,
//! - [`Snapshots`] are the raw and annotated frames kept for audit.
//!
//! ## Quickstart
//!
//! ```no_run
//! use omr::{
//!     AnswerKey, CancelToken, Layout, ReplayDevice, ScanConfig, ScanExit, ScanLoop,
//!     SessionController,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let layout = Layout::load_json("layout.json")?;
//! let key = AnswerKey::from_json(&std::fs::read_to_string("answers.json")?)?;
//! let config = ScanConfig::default();
//!
//! let mut session = SessionController::new(layout, &key, &config)?;
//! let mut camera = ReplayDevice::from_dir("frames")?;
//! let exit = ScanLoop::from_config(&config).run(
//!     &mut session,
//!     &mut camera,
//!     &config.capture,
//!     &CancelToken::new(),
//! )?;
//! if let ScanExit::Completed(snapshots) = exit {
//!     snapshots.save_png("out")?;
//!     println!("{:?}", session.confirm()?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `omr::core`: image buffers, filters, homographies, logging.
//! - `omr::anchor`: fiducial anchor detection.
//! - `omr::sheet`: layout model, alignment, bubble reading, grading.

pub use omr_anchor as anchor;
pub use omr_core as core;
pub use omr_sheet as sheet;

mod capture;
mod config;
mod io;
mod render;
mod report;
mod scan_loop;
mod session;

pub use capture::{
    CaptureConstraints, CaptureDevice, DeviceError, DeviceGuard, FacingMode, ReplayDevice,
};
pub use config::ScanConfig;
pub use io::OmrIoError;
pub use render::{render_snapshots, Snapshots};
pub use report::ScanReport;
pub use scan_loop::{CancelToken, ScanExit, ScanLoop};
pub use session::{Phase, SessionController, SessionError, TickOutcome};

pub use omr_anchor::{AnchorDetector, AnchorError, AnchorParams, AnchorQuad};
pub use omr_sheet::{
    AnswerKey, BubbleParams, CorrectionResult, CorrectionResults, Layout, LayoutError,
    QuestionState, StabilizerParams, Stats,
};
