//! Crop rectangle and privacy-filter regions.
//!
//! All coordinates are normalized to `[0.0, 1.0]` relative to the source
//! frame, so they survive any change in the rendered preview size.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Smallest crop extent the editor allows on either axis.
pub const MIN_CROP_EXTENT: f64 = 0.01;

/// The visible part of the frame, as edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl CropRect {
    /// No crop.
    pub const FULL: CropRect = CropRect {
        left: 0.0,
        top: 0.0,
        right: 1.0,
        bottom: 1.0,
    };

    /// Create a crop, clamping edges to `[0, 1]` and keeping at least
    /// [`MIN_CROP_EXTENT`] between opposite edges.
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        let (left, right) = ordered_span(left, right);
        let (top, bottom) = ordered_span(top, bottom);
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Fraction of the frame kept (0.0 to 1.0).
    pub fn area(&self) -> f64 {
        (self.width() * self.height()).clamp(0.0, 1.0)
    }

    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }
}

impl Default for CropRect {
    fn default() -> Self {
        Self::FULL
    }
}

fn ordered_span(a: f64, b: f64) -> (f64, f64) {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let lo = lo.clamp(0.0, 1.0 - MIN_CROP_EXTENT);
    let hi = hi.clamp(lo + MIN_CROP_EXTENT, 1.0);
    (lo, hi)
}

/// How a filter region hides what is under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Blur,
    Pixelate,
    Solid,
}

impl FilterMode {
    pub const ALL: [FilterMode; 3] = [FilterMode::Blur, FilterMode::Pixelate, FilterMode::Solid];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::Blur => "blur",
            FilterMode::Pixelate => "pixelate",
            FilterMode::Solid => "solid",
        }
    }

    /// The next mode in display order, wrapping around.
    pub fn cycled(self) -> Self {
        match self {
            FilterMode::Blur => FilterMode::Pixelate,
            FilterMode::Pixelate => FilterMode::Solid,
            FilterMode::Solid => FilterMode::Blur,
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blur" => Ok(FilterMode::Blur),
            "pixelate" | "pixel" => Ok(FilterMode::Pixelate),
            "solid" | "box" | "black" => Ok(FilterMode::Solid),
            other => Err(format!(
                "unknown filter mode '{other}' (expected blur, pixelate or solid)"
            )),
        }
    }
}

/// A rectangle to obscure in every exported frame.
///
/// Degenerate regions (zero or negative extent) may exist at rest; export
/// skips them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterRegion {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    #[serde(default)]
    pub mode: FilterMode,
}

impl FilterRegion {
    /// Create a region from two opposite corners in any order, clamped to
    /// the frame.
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64, mode: FilterMode) -> Self {
        Self {
            left: x0.min(x1).clamp(0.0, 1.0),
            top: y0.min(y1).clamp(0.0, 1.0),
            right: x0.max(x1).clamp(0.0, 1.0),
            bottom: y0.max(y1).clamp(0.0, 1.0),
            mode,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.left < self.right && self.top < self.bottom)
    }

    /// Check if a normalized point is within this region.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.left && px <= self.right && py >= self.top && py <= self.bottom
    }
}

/// Crop plus the ordered list of filter regions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionSet {
    #[serde(default)]
    pub crop: CropRect,
    #[serde(default)]
    pub regions: Vec<FilterRegion>,
}

impl RegionSet {
    pub fn set_crop(&mut self, crop: CropRect) {
        self.crop = crop;
    }

    pub fn reset_crop(&mut self) {
        self.crop = CropRect::FULL;
    }

    /// Append a region, returning its index.
    pub fn add_region(&mut self, region: FilterRegion) -> usize {
        self.regions.push(region);
        self.regions.len() - 1
    }

    pub fn remove_region(&mut self, index: usize) -> Option<FilterRegion> {
        (index < self.regions.len()).then(|| self.regions.remove(index))
    }

    pub fn set_region_mode(&mut self, index: usize, mode: FilterMode) -> bool {
        match self.regions.get_mut(index) {
            Some(region) => {
                region.mode = mode;
                true
            }
            None => false,
        }
    }

    /// Topmost region under a normalized point.
    pub fn region_at(&self, px: f64, py: f64) -> Option<usize> {
        self.regions.iter().rposition(|r| r.contains(px, py))
    }

    pub fn clear_regions(&mut self) {
        self.regions.clear();
    }

    /// Regions that will actually render.
    pub fn active_regions(&self) -> impl Iterator<Item = &FilterRegion> {
        self.regions.iter().filter(|r| !r.is_degenerate())
    }

    pub fn has_regions(&self) -> bool {
        self.active_regions().next().is_some()
    }
}
