// Per-frame occupancy: inside the shape AND confidence at or above the threshold.
// Pure function of the series and the shape.

use crate::shapes::Shape;
use crate::types::TrackedPoint;

/// Classifies every frame of one body-part series against one shape.
#[derive(Debug, Clone, Copy)]
pub struct OccupancyClassifier {
    threshold: f64,
}

impl OccupancyClassifier {
    pub fn new(threshold: f64) -> Self {
        OccupancyClassifier { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Boolean mask with one entry per frame.
    pub fn classify(&self, series: &[TrackedPoint], shape: &Shape) -> Vec<bool> {
        series.iter().map(|point| self.is_inside(point, shape)).collect()
    }

    fn is_inside(&self, point: &TrackedPoint, shape: &Shape) -> bool {
        // Low-confidence frames are never inside, whatever the geometry says.
        point.confidence >= self.threshold && shape.contains(&point.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn unit_rect() -> Shape {
        Shape::Rectangle {
            top_left: Point::new(0.0, 0.0),
            bottom_right: Point::new(10.0, 10.0),
        }
    }

    #[test]
    fn mask_has_one_entry_per_frame() {
        let classifier = OccupancyClassifier::new(0.5);
        let series = vec![
            TrackedPoint::new(5.0, 5.0, 1.0),
            TrackedPoint::new(50.0, 5.0, 1.0),
            TrackedPoint::new(5.0, 5.0, 0.1),
        ];
        assert_eq!(
            classifier.classify(&series, &unit_rect()),
            vec![true, false, false]
        );
    }

    #[test]
    fn threshold_is_inclusive() {
        let classifier = OccupancyClassifier::new(0.5);
        let series = vec![TrackedPoint::new(5.0, 5.0, 0.5)];
        assert_eq!(classifier.classify(&series, &unit_rect()), vec![true]);
    }

    #[test]
    fn low_confidence_at_circle_center_is_outside() {
        let classifier = OccupancyClassifier::new(0.9);
        let circle = Shape::Circle {
            center: Point::new(100.0, 100.0),
            radius: 20.0,
        };
        let series = vec![TrackedPoint::new(100.0, 100.0, 0.89)];
        assert_eq!(classifier.classify(&series, &circle), vec![false]);
    }

    #[test]
    fn empty_series_yields_empty_mask() {
        let classifier = OccupancyClassifier::new(0.0);
        assert!(classifier.classify(&[], &unit_rect()).is_empty());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn shape_strategy() -> impl Strategy<Value = Shape> {
            prop_oneof![
                (0.0f64..100.0, 0.0f64..100.0, 1.0f64..100.0, 1.0f64..100.0).prop_map(
                    |(x, y, w, h)| Shape::Rectangle {
                        top_left: Point::new(x, y),
                        bottom_right: Point::new(x + w, y + h),
                    }
                ),
                (0.0f64..100.0, 0.0f64..100.0, 0.0f64..50.0).prop_map(|(x, y, r)| {
                    Shape::Circle {
                        center: Point::new(x, y),
                        radius: r,
                    }
                }),
            ]
        }

        proptest! {
            /// A frame below the threshold is outside, even at the shape's centroid.
            #[test]
            fn confidence_gates_every_frame(
                shape in shape_strategy(),
                threshold in 0.01f64..=1.0,
                shortfall in 0.0001f64..0.01,
            ) {
                let classifier = OccupancyClassifier::new(threshold);
                let center = shape.centroid();
                let confidence = (threshold - shortfall).max(0.0);
                let series = vec![TrackedPoint::new(center.x, center.y, confidence)];
                prop_assert_eq!(classifier.classify(&series, &shape), vec![false]);
            }

            /// With full confidence the mask equals the geometric test frame by frame.
            #[test]
            fn full_confidence_matches_geometry(
                shape in shape_strategy(),
                points in prop::collection::vec((-50.0f64..200.0, -50.0f64..200.0), 0..50),
            ) {
                let classifier = OccupancyClassifier::new(0.5);
                let series: Vec<TrackedPoint> = points
                    .iter()
                    .map(|&(x, y)| TrackedPoint::new(x, y, 1.0))
                    .collect();
                let mask = classifier.classify(&series, &shape);
                prop_assert_eq!(mask.len(), series.len());
                for (inside, point) in mask.iter().zip(&series) {
                    prop_assert_eq!(*inside, shape.contains(&point.position));
                }
            }

            /// Rectangle corners are always inside.
            #[test]
            fn rectangle_corners_inside(
                x in -100.0f64..100.0,
                y in -100.0f64..100.0,
                w in 0.0f64..100.0,
                h in 0.0f64..100.0,
            ) {
                let shape = Shape::Rectangle {
                    top_left: Point::new(x, y),
                    bottom_right: Point::new(x + w, y + h),
                };
                prop_assert!(shape.contains(&Point::new(x, y)));
                prop_assert!(shape.contains(&Point::new(x + w, y + h)));
            }
        }
    }
}
