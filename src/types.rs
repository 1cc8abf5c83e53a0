// Strong typing over strings. Newtypes for frame indices, pixel points and result keys.
// See DESIGN.md: Data model

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::shapes::{ShapeId, ShapeRows};

/// Decimal places kept for time-inside-shape totals.
pub const TIME_DECIMALS: u32 = 3;

/// Decimal places kept for bout start/end/duration times.
pub const BOUT_TIME_DECIMALS: u32 = 2;

/// Millimeters per centimeter. Pixel distances are divided by px/mm, then by this.
pub const MM_PER_CM: f64 = 10.0;

/// Frame index (0-based row of the trajectory table). Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct FrameIndex(usize);

impl FrameIndex {
    pub fn new(index: usize) -> Self {
        FrameIndex(index)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }

    /// Elapsed time at the end of this frame, in seconds: `(frame + 1) / fps`.
    pub fn elapsed_secs(&self, fps: f64) -> f64 {
        (self.0 as f64 + 1.0) / fps
    }
}

/// Point in the pixel space of one video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One body-part observation at one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackedPoint {
    pub position: Point,
    pub confidence: f64, // 0.0-1.0
}

impl TrackedPoint {
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        TrackedPoint {
            position: Point::new(x, y),
            confidence,
        }
    }
}

/// Maximal run of consecutive "inside" frames. Both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bout {
    pub start_frame: FrameIndex,
    pub end_frame: FrameIndex,
}

impl Bout {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Bout {
            start_frame: FrameIndex::new(start),
            end_frame: FrameIndex::new(end),
        }
    }

    /// Number of frames covered by this bout.
    pub fn frame_count(&self) -> usize {
        self.end_frame.as_usize() - self.start_frame.as_usize() + 1
    }

    /// Duration of the covered frames in seconds.
    pub fn duration_secs(&self, fps: f64) -> f64 {
        self.frame_count() as f64 / fps
    }
}

/// Composite accumulator key: one slot per (video, animal, shape) triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResultKey {
    pub video: String,
    pub animal: String,
    pub shape: ShapeId,
}

impl ResultKey {
    pub fn new(video: &str, animal: &str, shape: ShapeId) -> Self {
        ResultKey {
            video: video.to_string(),
            animal: animal.to_string(),
            shape,
        }
    }
}

/// Per-video calibration metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct VideoMeta {
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub pixels_per_mm: Option<f64>,
}

impl VideoMeta {
    pub fn new(fps: f64, pixels_per_mm: f64) -> Self {
        VideoMeta {
            fps: Some(fps),
            pixels_per_mm: Some(pixels_per_mm),
        }
    }
}

/// Project-level description of the tracked body parts.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectConfig {
    /// Tracked body parts, in trajectory column order.
    pub body_parts: Vec<String>,
    /// Animal name -> body parts belonging to that animal. Optional.
    #[serde(default)]
    pub animals: BTreeMap<String, Vec<String>>,
}

impl ProjectConfig {
    /// Expected trajectory headers: `{bp}_x, {bp}_y, {bp}_p` per body part.
    pub fn column_headers(&self) -> Vec<String> {
        self.body_parts
            .iter()
            .flat_map(|bp| [format!("{bp}_x"), format!("{bp}_y"), format!("{bp}_p")])
            .collect()
    }

    /// Animal whose body-part list contains `body_part`, if declared.
    pub fn animal_for_body_part(&self, body_part: &str) -> Option<&str> {
        self.animals
            .iter()
            .find(|(_, parts)| parts.iter().any(|p| p == body_part))
            .map(|(name, _)| name.as_str())
    }
}

/// Analysis settings shared by every video of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Animal label -> body part used to locate that animal.
    pub body_parts: BTreeMap<String, String>,
    /// Minimum confidence for a frame to count as inside any shape.
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub calculate_distances: bool,
    #[serde(default)]
    pub detailed_bout_data: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            body_parts: BTreeMap::new(),
            threshold: 0.0,
            calculate_distances: false,
            detailed_bout_data: false,
        }
    }
}

/// Engine configuration passed from JS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub project: ProjectConfig,
    pub settings: AnalysisSettings,
    #[serde(default)]
    pub shapes: ShapeRows,
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
