// roi_engine: ROI occupancy, bout and movement analysis over tracked body-part time series.
// See DESIGN.md for module layout. Loading trajectories and writing tables is the host's job.

mod aggregation;
mod analyzer;
mod bouts;
mod error;
mod occupancy;
mod report;
mod shapes;
mod trajectory;
mod types;

use wasm_bindgen::prelude::*;

pub use aggregation::{
    AggregationEngine, AggregationOptions, BoutTiming, Calibration, MovementResult,
    OccupancyResult, ShapeAggregate, VideoAggregate,
};
pub use analyzer::{AnalysisBatch, CentroidDistanceSeries, RoiAnalyzer, VideoInput};
pub use bouts::BoutExtractor;
pub use error::RoiError;
pub use occupancy::OccupancyClassifier;
pub use report::*;
pub use shapes::*;
pub use trajectory::{BodyPartColumns, TrajectoryTable};
pub use types::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_error(err: RoiError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

/// ROI engine exposed to JavaScript.
/// Batch interface: one call analyzes every video of a run.
#[wasm_bindgen]
pub struct RoiEngine {
    analyzer: RoiAnalyzer,
}

#[wasm_bindgen]
impl RoiEngine {
    /// Parse and validate the engine configuration (project, settings, shape rows).
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<RoiEngine, JsValue> {
        let config: EngineConfig = serde_json::from_str(config_json)
            .map_err(|e| js_error(RoiError::InvalidConfig(e.to_string())))?;

        let analyzer = RoiAnalyzer::from_config(config).map_err(js_error)?;
        Ok(RoiEngine { analyzer })
    }

    /// Analyze a batch of videos and return the report tables as JSON.
    pub fn analyze(&self, batch_json: &str) -> Result<String, JsValue> {
        let report = self.run_batch(batch_json).map_err(js_error)?;
        serde_json::to_string(&report).map_err(|e| js_error(e.into()))
    }

    /// Framewise distances to every shape centroid for one video, as JSON.
    pub fn centroid_distances(&self, video_json: &str) -> Result<String, JsValue> {
        let video: VideoInput =
            serde_json::from_str(video_json).map_err(|e| js_error(e.into()))?;
        let series = self.analyzer.centroid_distances(&video).map_err(js_error)?;
        serde_json::to_string(&series).map_err(|e| js_error(e.into()))
    }
}

impl RoiEngine {
    fn run_batch(&self, batch_json: &str) -> Result<RoiReport, RoiError> {
        let batch: AnalysisBatch = serde_json::from_str(batch_json)?;
        Ok(self.analyzer.run(&batch.videos))
    }
}
