// Batch orchestration: video -> animal -> shape -> mask -> bouts -> aggregate.
// Startup errors abort the run; per-video errors fail only that video.
// See DESIGN.md: RoiAnalyzer

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregation::{AggregationEngine, AggregationOptions, Calibration, VideoAggregate};
use crate::bouts::BoutExtractor;
use crate::error::RoiError;
use crate::occupancy::OccupancyClassifier;
use crate::report::{ReportAssembler, RoiReport, RunSummary, VideoStatus};
use crate::shapes::{ShapeCatalog, ShapeKind};
use crate::trajectory::{BodyPartColumns, TrajectoryTable};
use crate::types::*;

/// One video of a batch: calibration plus its loaded trajectory table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInput {
    pub name: String,
    #[serde(default)]
    pub meta: VideoMeta,
    pub trajectory: TrajectoryTable,
}

/// Batch of videos from JS (one call per run).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisBatch {
    pub videos: Vec<VideoInput>,
}

/// Framewise distance from one animal's body part to one shape centroid, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidDistanceSeries {
    pub video: String,
    pub animal: String,
    pub shape: String,
    pub shape_kind: ShapeKind,
    pub distances: Vec<f64>,
}

#[derive(Debug, Clone)]
struct AnimalTrack {
    label: String,
    body_part: String,
    columns: BodyPartColumns,
}

/// ROI analyzer for a validated configuration and a pre-populated shape catalog.
#[derive(Debug, Clone)]
pub struct RoiAnalyzer {
    settings: AnalysisSettings,
    catalog: ShapeCatalog,
    animals: Vec<AnimalTrack>,
    animal_names: BTreeMap<String, String>,
    expected_columns: usize,
    classifier: OccupancyClassifier,
    extractor: BoutExtractor,
}

impl RoiAnalyzer {
    /// Validate settings against the project. Fails before any video is touched.
    pub fn new(
        project: ProjectConfig,
        settings: AnalysisSettings,
        catalog: ShapeCatalog,
    ) -> Result<Self, RoiError> {
        if !(0.0..=1.0).contains(&settings.threshold) {
            return Err(RoiError::InvalidConfig(format!(
                "probability threshold must be within [0, 1], got {}",
                settings.threshold
            )));
        }
        if settings.body_parts.is_empty() {
            return Err(RoiError::InvalidConfig(
                "no animal body-parts configured for ROI analysis".to_string(),
            ));
        }

        let mut animals = Vec::with_capacity(settings.body_parts.len());
        let mut animal_names = BTreeMap::new();

        for (label, body_part) in &settings.body_parts {
            let columns = BodyPartColumns::resolve(&project, body_part).ok_or_else(|| {
                RoiError::BodypartColumnNotFound {
                    animal: label.clone(),
                    body_part: body_part.clone(),
                }
            })?;

            if let Some(name) = project.animal_for_body_part(body_part) {
                animal_names.insert(label.clone(), name.to_string());
            }

            animals.push(AnimalTrack {
                label: label.clone(),
                body_part: body_part.clone(),
                columns,
            });
        }

        Ok(RoiAnalyzer {
            classifier: OccupancyClassifier::new(settings.threshold),
            extractor: BoutExtractor::new(),
            expected_columns: project.column_headers().len(),
            settings,
            catalog,
            animals,
            animal_names,
        })
    }

    pub fn from_config(config: EngineConfig) -> Result<Self, RoiError> {
        let catalog = ShapeCatalog::from_rows(&config.shapes);
        Self::new(config.project, config.settings, catalog)
    }

    pub fn catalog(&self) -> &ShapeCatalog {
        &self.catalog
    }

    /// Analyze every video and assemble the report. Never aborts on a per-video error.
    pub fn run(&self, videos: &[VideoInput]) -> RoiReport {
        info!(
            videos = videos.len(),
            animals = self.animals.len(),
            threshold = self.settings.threshold,
            "Starting ROI analysis"
        );

        let mut engine = AggregationEngine::new(AggregationOptions::from(&self.settings));
        let mut summary = RunSummary::default();
        let mut seen = BTreeSet::new();

        for video in videos {
            if !seen.insert(video.name.as_str()) {
                let err = RoiError::DuplicateVideo {
                    video: video.name.clone(),
                };
                warn!(video = %video.name, error = %err, "ROI analysis failed for video");
                summary.record(
                    &video.name,
                    VideoStatus::Failed {
                        reason: err.to_string(),
                    },
                );
                continue;
            }

            if self.catalog.shapes_for_video(&video.name).is_empty()
                && self.catalog.rejection(&video.name).is_none()
            {
                warn!(
                    video = %video.name,
                    "Skipping video: no user-defined ROI data found for this video"
                );
                summary.record(
                    &video.name,
                    VideoStatus::Skipped {
                        reason: "no user-defined ROI data found for this video".to_string(),
                    },
                );
                continue;
            }

            match self.analyze_video(video, &engine) {
                Ok(staged) => {
                    engine.commit(staged);
                    summary.record(&video.name, VideoStatus::Analyzed);
                }
                Err(err) => {
                    warn!(video = %video.name, error = %err, "ROI analysis failed for video");
                    summary.record(
                        &video.name,
                        VideoStatus::Failed {
                            reason: err.to_string(),
                        },
                    );
                }
            }
        }

        if self.settings.detailed_bout_data && engine.total_bouts() == 0 {
            warn!("No ROI bouts found: detailed bout table is empty");
        }

        info!(
            analyzed = summary.analyzed(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            "ROI analysis complete"
        );

        ReportAssembler::new(&self.animal_names).assemble(&engine, summary)
    }

    /// Compute every (animal, shape) result of one video without committing it.
    pub fn analyze_video(
        &self,
        video: &VideoInput,
        engine: &AggregationEngine,
    ) -> Result<VideoAggregate, RoiError> {
        info!(video = %video.name, frames = video.trajectory.frame_count(), "Analysing ROI data");

        if let Some(err) = self.catalog.rejection(&video.name) {
            return Err(err.clone());
        }
        let calibration = Calibration::from_meta(&video.name, &video.meta)?;
        video
            .trajectory
            .check_columns(&video.name, self.expected_columns)?;

        let shapes = self.catalog.shapes_for_video(&video.name);
        let mut staged = VideoAggregate::new();

        for animal in &self.animals {
            let series = video.trajectory.series(&video.name, animal.columns)?;

            for shape in shapes.iter() {
                let mask = self.classifier.classify(&series, &shape.shape);
                let bouts = self.extractor.extract(&mask);
                let aggregate = engine.aggregate(&animal.body_part, bouts, &series, calibration);

                debug!(
                    video = %video.name,
                    animal = %animal.label,
                    shape = %shape.name,
                    entries = aggregate.occupancy.entry_count,
                    time_s = aggregate.occupancy.time_inside_seconds,
                    "Shape aggregated"
                );

                staged.push(
                    ResultKey::new(&video.name, &animal.label, shape.id()),
                    aggregate,
                );
            }
        }

        Ok(staged)
    }

    /// Framewise distance from each animal to each shape centroid of a video.
    pub fn centroid_distances(
        &self,
        video: &VideoInput,
    ) -> Result<Vec<CentroidDistanceSeries>, RoiError> {
        if let Some(err) = self.catalog.rejection(&video.name) {
            return Err(err.clone());
        }
        video
            .trajectory
            .check_columns(&video.name, self.expected_columns)?;

        let shapes = self.catalog.shapes_for_video(&video.name);
        let mut out = Vec::with_capacity(self.animals.len() * shapes.len());

        for animal in &self.animals {
            let series = video.trajectory.series(&video.name, animal.columns)?;
            let animal_name = self
                .animal_names
                .get(&animal.label)
                .cloned()
                .unwrap_or_else(|| animal.label.clone());

            for shape in shapes.iter() {
                let centroid = shape.shape.centroid();
                out.push(CentroidDistanceSeries {
                    video: video.name.clone(),
                    animal: animal_name.clone(),
                    shape: shape.name.clone(),
                    shape_kind: shape.shape.kind(),
                    distances: series
                        .iter()
                        .map(|p| p.position.distance_to(&centroid))
                        .collect(),
                });
            }
        }

        Ok(out)
    }
}
