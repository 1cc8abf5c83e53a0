// Flattens run accumulators into export tables. Pure reshape: nothing is recomputed here.
// See DESIGN.md: ReportAssembler

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregation::AggregationEngine;
use crate::shapes::ShapeKind;
use crate::types::{FrameIndex, ResultKey};

/// Row of the entries table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntriesRow {
    pub video: String,
    pub animal: String,
    pub body_part: String,
    pub shape: String,
    pub shape_kind: ShapeKind,
    pub entry_count: usize,
}

/// Row of the time table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRow {
    pub video: String,
    pub animal: String,
    pub body_part: String,
    pub shape: String,
    pub shape_kind: ShapeKind,
    pub time_inside_seconds: f64,
}

/// One bout as entry/exit frame pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryExitRow {
    pub video: String,
    pub animal: String,
    pub body_part: String,
    pub shape: String,
    pub shape_kind: ShapeKind,
    pub entry_frame: FrameIndex,
    pub exit_frame: FrameIndex,
}

/// One bout with start/end times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedBoutRow {
    pub video: String,
    pub animal: String,
    pub body_part: String,
    pub shape: String,
    pub shape_kind: ShapeKind,
    pub start_frame: FrameIndex,
    pub end_frame: FrameIndex,
    pub start_time_s: f64,
    pub end_time_s: f64,
    pub duration_s: f64,
}

/// Row of the movement table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRow {
    pub video: String,
    pub animal: String,
    pub body_part: String,
    pub shape: String,
    pub shape_kind: ShapeKind,
    pub distance_cm: f64,
    pub mean_velocity_cm_per_s: f64,
}

/// How one video of the batch ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum VideoStatus {
    Analyzed,
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoOutcome {
    pub video: String,
    #[serde(flatten)]
    pub status: VideoStatus,
}

/// Per-video outcome of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RunSummary {
    pub outcomes: Vec<VideoOutcome>,
}

impl RunSummary {
    pub fn record(&mut self, video: &str, status: VideoStatus) {
        self.outcomes.push(VideoOutcome {
            video: video.to_string(),
            status,
        });
    }

    pub fn analyzed(&self) -> usize {
        self.count(|s| matches!(s, VideoStatus::Analyzed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, VideoStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, VideoStatus::Failed { .. }))
    }

    pub fn status_of(&self, video: &str) -> Option<&VideoStatus> {
        self.outcomes
            .iter()
            .find(|o| o.video == video)
            .map(|o| &o.status)
    }

    fn count(&self, pred: impl Fn(&VideoStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Complete output of a run, handed to the export collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiReport {
    pub entries: Vec<EntriesRow>,
    pub time: Vec<TimeRow>,
    pub entry_exit: Vec<EntryExitRow>,
    pub detailed_bouts: Option<Vec<DetailedBoutRow>>,
    pub movement: Option<Vec<MovementRow>>,
    pub summary: RunSummary,
}

/// Borrows the accumulators read-only and reshapes them into tables.
pub struct ReportAssembler<'a> {
    animal_names: &'a BTreeMap<String, String>,
}

impl<'a> ReportAssembler<'a> {
    /// `animal_names` maps settings labels to reported animal names.
    pub fn new(animal_names: &'a BTreeMap<String, String>) -> Self {
        ReportAssembler { animal_names }
    }

    pub fn assemble(&self, engine: &AggregationEngine, summary: RunSummary) -> RoiReport {
        let options = engine.options();
        let mut entries = Vec::new();
        let mut time = Vec::new();
        let mut entry_exit = Vec::new();
        let mut detailed = Vec::new();

        for (key, result) in engine.occupancy() {
            let animal = self.animal_name(key);
            let video = key.video.clone();
            let shape = key.shape.name.clone();
            let body_part = result.body_part.clone();

            entries.push(EntriesRow {
                video: video.clone(),
                animal: animal.clone(),
                body_part: body_part.clone(),
                shape: shape.clone(),
                shape_kind: key.shape.kind,
                entry_count: result.entry_count,
            });
            time.push(TimeRow {
                video: video.clone(),
                animal: animal.clone(),
                body_part: body_part.clone(),
                shape: shape.clone(),
                shape_kind: key.shape.kind,
                time_inside_seconds: result.time_inside_seconds,
            });
            for bout in &result.bouts {
                entry_exit.push(EntryExitRow {
                    video: video.clone(),
                    animal: animal.clone(),
                    body_part: body_part.clone(),
                    shape: shape.clone(),
                    shape_kind: key.shape.kind,
                    entry_frame: bout.start_frame,
                    exit_frame: bout.end_frame,
                });
            }
            for timing in &result.bout_timings {
                detailed.push(DetailedBoutRow {
                    video: video.clone(),
                    animal: animal.clone(),
                    body_part: body_part.clone(),
                    shape: shape.clone(),
                    shape_kind: key.shape.kind,
                    start_frame: timing.bout.start_frame,
                    end_frame: timing.bout.end_frame,
                    start_time_s: timing.start_time_s,
                    end_time_s: timing.end_time_s,
                    duration_s: timing.duration_s,
                });
            }
        }

        let movement = options.calculate_distances.then(|| {
            engine
                .movement()
                .iter()
                .map(|(key, m)| MovementRow {
                    video: key.video.clone(),
                    animal: self.animal_name(key),
                    body_part: engine
                        .occupancy()
                        .get(key)
                        .map(|r| r.body_part.clone())
                        .unwrap_or_default(),
                    shape: key.shape.name.clone(),
                    shape_kind: key.shape.kind,
                    distance_cm: m.distance_cm,
                    mean_velocity_cm_per_s: m.mean_velocity_cm_per_s,
                })
                .collect()
        });

        RoiReport {
            entries,
            time,
            entry_exit,
            detailed_bouts: options.detailed_bout_data.then_some(detailed),
            movement,
            summary,
        }
    }

    fn animal_name(&self, key: &ResultKey) -> String {
        self.animal_names
            .get(&key.animal)
            .cloned()
            .unwrap_or_else(|| key.animal.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{AggregationOptions, Calibration, VideoAggregate};
    use crate::shapes::ShapeId;
    use crate::types::{Bout, TrackedPoint};

    fn key(video: &str, shape: &str) -> ResultKey {
        ResultKey::new(
            video,
            "animal_1_bp",
            ShapeId {
                kind: ShapeKind::Circle,
                name: shape.to_string(),
            },
        )
    }

    fn engine(options: AggregationOptions) -> AggregationEngine {
        let mut engine = AggregationEngine::new(options);
        let calibration = Calibration {
            fps: 10.0,
            pixels_per_mm: 1.0,
        };
        let series = vec![TrackedPoint::new(0.0, 0.0, 1.0); 10];
        let mut staged = VideoAggregate::new();
        staged.push(
            key("Video1", "Center"),
            engine.aggregate(
                "Nose",
                vec![Bout::new(0, 1), Bout::new(5, 9)],
                &series,
                calibration,
            ),
        );
        staged.push(
            key("Video1", "Corner"),
            engine.aggregate("Nose", Vec::new(), &series, calibration),
        );
        engine.commit(staged);
        engine
    }

    #[test]
    fn tables_mirror_accumulators() {
        let names = BTreeMap::new();
        let engine = engine(AggregationOptions::default());
        let report = ReportAssembler::new(&names).assemble(&engine, RunSummary::default());

        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.time.len(), 2);
        assert_eq!(report.entries[0].shape, "Center");
        assert_eq!(report.entries[0].shape_kind, ShapeKind::Circle);
        assert_eq!(report.entries[0].entry_count, 2);
        assert_eq!(report.entries[0].animal, "animal_1_bp");
        assert_eq!(report.entries[1].entry_count, 0);
        assert!((report.time[0].time_inside_seconds - 0.7).abs() < 1e-9);

        assert_eq!(report.entry_exit.len(), 2);
        assert_eq!(report.entry_exit[1].entry_frame, FrameIndex::new(5));
        assert_eq!(report.entry_exit[1].exit_frame, FrameIndex::new(9));

        assert!(report.detailed_bouts.is_none());
        assert!(report.movement.is_none());
    }

    #[test]
    fn optional_tables_and_name_mapping() {
        let mut names = BTreeMap::new();
        names.insert("animal_1_bp".to_string(), "Simon".to_string());
        let engine = engine(AggregationOptions {
            calculate_distances: true,
            detailed_bout_data: true,
        });
        let report = ReportAssembler::new(&names).assemble(&engine, RunSummary::default());

        let detailed = report.detailed_bouts.unwrap();
        assert_eq!(detailed.len(), 2);
        assert_eq!(detailed[0].animal, "Simon");
        assert!((detailed[1].start_time_s - 0.6).abs() < 1e-9);
        assert!((detailed[1].end_time_s - 1.0).abs() < 1e-9);

        let movement = report.movement.unwrap();
        assert_eq!(movement.len(), 2);
        assert_eq!(movement[0].body_part, "Nose");
        assert_eq!(movement[0].distance_cm, 0.0);
    }

    #[test]
    fn same_name_different_kinds_stay_distinguishable() {
        let names = BTreeMap::new();
        let mut engine = AggregationEngine::new(AggregationOptions::default());
        let calibration = Calibration {
            fps: 10.0,
            pixels_per_mm: 1.0,
        };
        let mut staged = VideoAggregate::new();
        for kind in [ShapeKind::Rectangle, ShapeKind::Circle] {
            staged.push(
                ResultKey::new(
                    "Video1",
                    "animal_1_bp",
                    ShapeId {
                        kind,
                        name: "Arena".to_string(),
                    },
                ),
                engine.aggregate("Nose", Vec::new(), &[], calibration),
            );
        }
        engine.commit(staged);

        let report = ReportAssembler::new(&names).assemble(&engine, RunSummary::default());
        let kinds: Vec<ShapeKind> = report.entries.iter().map(|r| r.shape_kind).collect();
        assert_eq!(kinds, vec![ShapeKind::Rectangle, ShapeKind::Circle]);
        assert_ne!(report.time[0], report.time[1]);
    }

    #[test]
    fn summary_counts() {
        let mut summary = RunSummary::default();
        summary.record("a", VideoStatus::Analyzed);
        summary.record(
            "b",
            VideoStatus::Skipped {
                reason: "no shapes".to_string(),
            },
        );
        summary.record(
            "c",
            VideoStatus::Failed {
                reason: "fps".to_string(),
            },
        );
        assert_eq!(summary.analyzed(), 1);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.status_of("a"), Some(&VideoStatus::Analyzed));
        assert!(summary.status_of("z").is_none());
    }

    #[test]
    fn outcome_serializes_flat() {
        let outcome = VideoOutcome {
            video: "Video2".to_string(),
            status: VideoStatus::Skipped {
                reason: "no ROI".to_string(),
            },
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(
            json,
            r#"{"video":"Video2","status":"Skipped","reason":"no ROI"}"#
        );
    }
}
