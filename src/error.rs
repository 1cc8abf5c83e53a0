// Typed errors with thiserror. Per-video failures are isolated by the analyzer;
// everything else aborts the run before the first video.
// See DESIGN.md: Error handling

use thiserror::Error;

use crate::shapes::ShapeKind;

/// ROI engine error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoiError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Body-part '{body_part}' configured for animal '{animal}' is not a tracked body-part of the project")]
    BodypartColumnNotFound { animal: String, body_part: String },

    #[error(
        "Trajectory data for video '{video}' has {found} columns, but the project body-parts require {expected}"
    )]
    MissingColumns {
        video: String,
        found: usize,
        expected: usize,
    },

    #[error("Video '{video}' has a missing or non-positive {field}")]
    InvalidVideoMeta { video: String, field: &'static str },

    #[error("Duplicate {kind} '{name}' registered for video '{video}'")]
    DuplicateShape {
        video: String,
        kind: ShapeKind,
        name: String,
    },

    #[error("Invalid shape '{name}' for video '{video}': {reason}")]
    InvalidShape {
        video: String,
        name: String,
        reason: String,
    },

    #[error("Video '{video}' appears more than once in the batch")]
    DuplicateVideo { video: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RoiError {
    /// True for errors that only invalidate the video they were raised for.
    pub fn is_per_video(&self) -> bool {
        matches!(
            self,
            RoiError::MissingColumns { .. }
                | RoiError::InvalidVideoMeta { .. }
                | RoiError::DuplicateShape { .. }
                | RoiError::InvalidShape { .. }
                | RoiError::DuplicateVideo { .. }
        )
    }
}

impl From<serde_json::Error> for RoiError {
    fn from(err: serde_json::Error) -> Self {
        RoiError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RoiError::InvalidConfig("threshold out of range".to_string());
        assert!(err.to_string().contains("threshold out of range"));
    }

    #[test]
    fn missing_columns_names_counts() {
        let err = RoiError::MissingColumns {
            video: "Video1".to_string(),
            found: 6,
            expected: 9,
        };
        let msg = err.to_string();
        assert!(msg.contains("Video1"));
        assert!(msg.contains('6'));
        assert!(msg.contains('9'));
    }

    #[test]
    fn per_video_classification() {
        assert!(RoiError::InvalidVideoMeta {
            video: "v".to_string(),
            field: "fps",
        }
        .is_per_video());
        assert!(RoiError::InvalidShape {
            video: "v".to_string(),
            name: "Bad".to_string(),
            reason: "too few vertices".to_string(),
        }
        .is_per_video());
        assert!(RoiError::DuplicateVideo {
            video: "v".to_string(),
        }
        .is_per_video());
        assert!(!RoiError::BodypartColumnNotFound {
            animal: "animal_1".to_string(),
            body_part: "Nose".to_string(),
        }
        .is_per_video());
    }
}
