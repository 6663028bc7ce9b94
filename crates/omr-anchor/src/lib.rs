//! Fiducial anchor detection for printed bubble answer sheets.
//!
//! Each sheet carries four solid dark discs near its corners. The detector
//! binarizes a camera frame, keeps round blobs of similar size, checks that
//! they look like ink on paper, and returns their centres ordered
//! top-left, top-right, bottom-right, bottom-left.
//!
//! ## Quickstart
//!
//! ```
//! use omr_anchor::{AnchorDetector, AnchorError};
//! use omr_core::GrayImage;
//!
//! let blank = GrayImage::filled(64, 48, 255);
//! let detector = AnchorDetector::default();
//! let result = detector.find_anchors_gray(&blank.view());
//! assert!(matches!(result, Err(AnchorError::NotFound { .. })));
//! ```

mod contour;
mod detector;
mod error;
mod params;
mod types;

pub use contour::{find_contours, Contour};
pub use detector::AnchorDetector;
pub use error::AnchorError;
pub use params::AnchorParams;
pub use types::{AnchorCandidate, AnchorQuad};
