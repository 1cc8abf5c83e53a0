// In-memory trajectory table: one row per frame, `{bp}_x, {bp}_y, {bp}_p` per tracked body part.
// Loading from disk is the caller's job; this only validates shape and slices series out.

use serde::{Deserialize, Serialize};

use crate::error::RoiError;
use crate::types::{ProjectConfig, TrackedPoint};

/// Frame-major table of body-part coordinates and confidences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TrajectoryTable {
    rows: Vec<Vec<f64>>,
}

impl TrajectoryTable {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        TrajectoryTable { rows }
    }

    pub fn frame_count(&self) -> usize {
        self.rows.len()
    }

    /// Check that every row carries exactly `expected` columns.
    pub fn check_columns(&self, video: &str, expected: usize) -> Result<(), RoiError> {
        if let Some(row) = self.rows.iter().find(|r| r.len() != expected) {
            return Err(RoiError::MissingColumns {
                video: video.to_string(),
                found: row.len(),
                expected,
            });
        }
        Ok(())
    }

    /// Extract one body part's series. A row too narrow for `columns` is a MissingColumns error.
    pub fn series(
        &self,
        video: &str,
        columns: BodyPartColumns,
    ) -> Result<Vec<TrackedPoint>, RoiError> {
        self.rows
            .iter()
            .map(|row| match (row.get(columns.x), row.get(columns.y), row.get(columns.p)) {
                (Some(&x), Some(&y), Some(&p)) => Ok(TrackedPoint::new(x, y, p)),
                _ => Err(RoiError::MissingColumns {
                    video: video.to_string(),
                    found: row.len(),
                    expected: columns.width(),
                }),
            })
            .collect()
    }
}

/// Column positions of one body part within a trajectory row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyPartColumns {
    pub x: usize,
    pub y: usize,
    pub p: usize,
}

impl BodyPartColumns {
    /// Minimum row width that holds these columns.
    pub fn width(&self) -> usize {
        self.x.max(self.y).max(self.p) + 1
    }

    /// Resolve a body part against the project's column layout.
    pub fn resolve(project: &ProjectConfig, body_part: &str) -> Option<Self> {
        project
            .body_parts
            .iter()
            .position(|bp| bp == body_part)
            .map(|i| BodyPartColumns {
                x: 3 * i,
                y: 3 * i + 1,
                p: 3 * i + 2,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn project() -> ProjectConfig {
        ProjectConfig {
            body_parts: vec!["Nose".to_string(), "Tail".to_string()],
            animals: BTreeMap::new(),
        }
    }

    #[test]
    fn resolves_columns_by_body_part_position() {
        let cols = BodyPartColumns::resolve(&project(), "Tail").unwrap();
        assert_eq!(cols, BodyPartColumns { x: 3, y: 4, p: 5 });
        assert!(BodyPartColumns::resolve(&project(), "Ear").is_none());
    }

    #[test]
    fn series_slices_one_body_part() {
        let table = TrajectoryTable::new(vec![
            vec![1.0, 2.0, 0.9, 10.0, 20.0, 0.5],
            vec![3.0, 4.0, 0.8, 30.0, 40.0, 0.4],
        ]);
        let cols = BodyPartColumns::resolve(&project(), "Tail").unwrap();
        let series = table.series("Video1", cols).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[1], TrackedPoint::new(30.0, 40.0, 0.4));
    }

    #[test]
    fn narrow_row_is_an_error_not_a_panic() {
        let table = TrajectoryTable::new(vec![vec![1.0, 2.0]]);
        let err = table
            .series("Video1", BodyPartColumns { x: 0, y: 1, p: 2 })
            .unwrap_err();
        assert_eq!(
            err,
            RoiError::MissingColumns {
                video: "Video1".to_string(),
                found: 2,
                expected: 3,
            }
        );
    }

    #[test]
    fn column_mismatch_is_reported() {
        let table = TrajectoryTable::new(vec![vec![1.0, 2.0, 0.9], vec![1.0, 2.0]]);
        let err = table.check_columns("Video1", 3).unwrap_err();
        assert_eq!(
            err,
            RoiError::MissingColumns {
                video: "Video1".to_string(),
                found: 2,
                expected: 3,
            }
        );
    }

    #[test]
    fn empty_table_passes_column_check() {
        assert!(TrajectoryTable::default().check_columns("v", 6).is_ok());
    }
}
