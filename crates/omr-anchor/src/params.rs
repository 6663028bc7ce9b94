use serde::{Deserialize, Serialize};

/// Tunables of the anchor detector.
///
/// `Default` yields the values the printed sheets are designed for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorParams {
    /// Side of the square window used for the local mean, in pixels (odd).
    pub block_size: usize,
    /// Offset subtracted from the local mean before comparing.
    pub threshold_c: f32,
    /// Contours with fewer boundary points are discarded.
    pub min_contour_points: usize,
    /// Contours with a smaller pixel area are discarded.
    pub min_area: usize,
    /// Accepted `4πA/P²` range, inclusive.
    pub circularity_min: f32,
    pub circularity_max: f32,
    /// A group of four is only considered when `max_area < ratio * min_area`.
    pub max_area_ratio: f32,
    /// Probe offset as a fraction of the equivalent radius `sqrt(min_area / π)`.
    pub probe_radius_frac: f32,
    /// Centre pixel must be darker than this.
    pub dark_max: u8,
    /// Probe pixel at `centre + (r, r)` must be lighter than this.
    pub light_min: u8,
}

impl Default for AnchorParams {
    fn default() -> Self {
        Self {
            block_size: 21,
            threshold_c: 5.0,
            min_contour_points: 8,
            min_area: 95,
            circularity_min: 0.8,
            circularity_max: 1.2,
            max_area_ratio: 1.6,
            probe_radius_frac: 0.7,
            dark_max: 120,
            light_min: 130,
        }
    }
}
