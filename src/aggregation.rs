// Folds bouts into per-(video, animal, shape) occupancy and movement results.
// Results are built per video and committed only once the whole video succeeded.
// See DESIGN.md: AggregationEngine

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::RoiError;
use crate::types::*;

/// Validated per-video calibration. Both values are finite and positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub fps: f64,
    pub pixels_per_mm: f64,
}

impl Calibration {
    pub fn from_meta(video: &str, meta: &VideoMeta) -> Result<Self, RoiError> {
        Ok(Calibration {
            fps: positive(video, "fps", meta.fps)?,
            pixels_per_mm: positive(video, "pixels_per_mm", meta.pixels_per_mm)?,
        })
    }
}

fn positive(video: &str, field: &'static str, value: Option<f64>) -> Result<f64, RoiError> {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(RoiError::InvalidVideoMeta {
            video: video.to_string(),
            field,
        }),
    }
}

/// Start/end times of one bout, as reported in the detailed bout table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoutTiming {
    pub bout: Bout,
    pub start_time_s: f64,
    pub end_time_s: f64,
    pub duration_s: f64,
}

impl BoutTiming {
    /// Times are `(frame + 1) / fps` rounded to 2 places; duration is end minus start.
    pub fn new(bout: Bout, fps: f64) -> Self {
        let start_time_s = round_to(bout.start_frame.elapsed_secs(fps), BOUT_TIME_DECIMALS);
        let end_time_s = round_to(bout.end_frame.elapsed_secs(fps), BOUT_TIME_DECIMALS);
        BoutTiming {
            bout,
            start_time_s,
            end_time_s,
            duration_s: round_to(end_time_s - start_time_s, BOUT_TIME_DECIMALS),
        }
    }
}

/// Occupancy statistics for one (video, animal, shape) triple. Write-once.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyResult {
    pub body_part: String,
    pub time_inside_seconds: f64,
    pub entry_count: usize,
    pub bouts: Vec<Bout>,
    /// Empty unless detailed bout data was requested.
    pub bout_timings: Vec<BoutTiming>,
}

/// Movement inside a shape for one (video, animal, shape) triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementResult {
    /// Sum of per-bout distances.
    pub distance_cm: f64,
    /// Mean of per-bout velocities, not total distance over total time.
    pub mean_velocity_cm_per_s: f64,
}

/// Which optional statistics to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregationOptions {
    pub calculate_distances: bool,
    pub detailed_bout_data: bool,
}

impl From<&AnalysisSettings> for AggregationOptions {
    fn from(settings: &AnalysisSettings) -> Self {
        AggregationOptions {
            calculate_distances: settings.calculate_distances,
            detailed_bout_data: settings.detailed_bout_data,
        }
    }
}

/// Everything computed for one shape of one animal.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeAggregate {
    pub occupancy: OccupancyResult,
    pub movement: Option<MovementResult>,
}

/// Results of one video, staged until the video completes.
#[derive(Debug, Clone, Default)]
pub struct VideoAggregate {
    entries: Vec<(ResultKey, ShapeAggregate)>,
}

impl VideoAggregate {
    pub fn new() -> Self {
        VideoAggregate {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, key: ResultKey, aggregate: ShapeAggregate) {
        self.entries.push((key, aggregate));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Owns every occupancy and movement result of a run.
#[derive(Debug, Clone, Default)]
pub struct AggregationEngine {
    options: AggregationOptions,
    occupancy: BTreeMap<ResultKey, OccupancyResult>,
    movement: BTreeMap<ResultKey, MovementResult>,
}

impl AggregationEngine {
    pub fn new(options: AggregationOptions) -> Self {
        AggregationEngine {
            options,
            occupancy: BTreeMap::new(),
            movement: BTreeMap::new(),
        }
    }

    pub fn options(&self) -> AggregationOptions {
        self.options
    }

    /// Fold the bouts of one (animal, shape) pair. `series` is the animal's full body-part series.
    pub fn aggregate(
        &self,
        body_part: &str,
        bouts: Vec<Bout>,
        series: &[TrackedPoint],
        calibration: Calibration,
    ) -> ShapeAggregate {
        let fps = calibration.fps;
        let frames_inside: usize = bouts.iter().map(Bout::frame_count).sum();

        let bout_timings = if self.options.detailed_bout_data {
            bouts.iter().map(|b| BoutTiming::new(*b, fps)).collect()
        } else {
            Vec::new()
        };

        let movement = self
            .options
            .calculate_distances
            .then(|| movement_inside(&bouts, series, calibration));

        ShapeAggregate {
            occupancy: OccupancyResult {
                body_part: body_part.to_string(),
                time_inside_seconds: round_to(frames_inside as f64 / fps, TIME_DECIMALS),
                entry_count: bouts.len(),
                bouts,
                bout_timings,
            },
            movement,
        }
    }

    /// Move a finished video's results into the run accumulators.
    pub fn commit(&mut self, video: VideoAggregate) {
        for (key, aggregate) in video.entries {
            if let Some(movement) = aggregate.movement {
                self.movement.insert(key.clone(), movement);
            }
            self.occupancy.insert(key, aggregate.occupancy);
        }
    }

    pub fn occupancy(&self) -> &BTreeMap<ResultKey, OccupancyResult> {
        &self.occupancy
    }

    pub fn movement(&self) -> &BTreeMap<ResultKey, MovementResult> {
        &self.movement
    }

    pub fn total_bouts(&self) -> usize {
        self.occupancy.values().map(|r| r.bouts.len()).sum()
    }
}

/// Distance traveled during one bout, in centimeters.
fn bout_distance_cm(bout: &Bout, series: &[TrackedPoint], pixels_per_mm: f64) -> f64 {
    let start = bout.start_frame.as_usize();
    let end = bout.end_frame.as_usize().min(series.len().saturating_sub(1));
    if series.is_empty() || start > end {
        return 0.0;
    }

    let pixels: f64 = series[start..=end]
        .windows(2)
        .map(|w| w[0].position.distance_to(&w[1].position))
        .sum();

    pixels / pixels_per_mm / MM_PER_CM
}

fn movement_inside(
    bouts: &[Bout],
    series: &[TrackedPoint],
    calibration: Calibration,
) -> MovementResult {
    if bouts.is_empty() {
        return MovementResult {
            distance_cm: 0.0,
            mean_velocity_cm_per_s: 0.0,
        };
    }

    let mut distance_cm = 0.0;
    let mut velocity_sum = 0.0;

    for bout in bouts {
        let distance = bout_distance_cm(bout, series, calibration.pixels_per_mm);
        distance_cm += distance;
        velocity_sum += distance / bout.duration_secs(calibration.fps);
    }

    MovementResult {
        distance_cm,
        mean_velocity_cm_per_s: velocity_sum / bouts.len() as f64,
    }
}
