//! Core image and geometry primitives for optical answer-sheet recognition.
//!
//! This crate is intentionally small: plain row-major 8-bit buffers, the
//! handful of filters the recognition stages need, and planar homographies.
//! Buffers are only handed to `imageproc` for morphology; nothing here knows
//! about capture backends.

mod filter;
mod homography;
mod image;
mod logger;

pub use filter::{adaptive_threshold_mean_inv, close_3x3, gaussian_blur_5};
pub use homography::{homography_from_4pt, warp_perspective_gray, Homography};
pub use image::{
    luminance, sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView, ImageError,
    RgbaImage, RgbaImageView,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_filter, init_with_level, LogFilter};

pub use nalgebra::Point2;
