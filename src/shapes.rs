// Regions of interest and the per-video shape catalog.
// One Shape variant type with a shared `contains`; bout and aggregation logic is written once against it.
// See DESIGN.md: ShapeCatalog

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RoiError;
use crate::types::Point;

/// Tolerance for treating a point as lying on a polygon edge.
const EDGE_EPSILON: f64 = 1e-9;

/// Geometric primitive of a region of interest, in video pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Shape {
    Rectangle { top_left: Point, bottom_right: Point },
    Circle { center: Point, radius: f64 },
    Polygon { vertices: Vec<Point> },
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Rectangle { .. } => ShapeKind::Rectangle,
            Shape::Circle { .. } => ShapeKind::Circle,
            Shape::Polygon { .. } => ShapeKind::Polygon,
        }
    }

    /// Containment test.
    ///
    /// Rectangles and circles include their boundary. Polygons exclude it: a
    /// point lying exactly on an edge or vertex is outside.
    pub fn contains(&self, p: &Point) -> bool {
        match self {
            Shape::Rectangle {
                top_left,
                bottom_right,
            } => {
                top_left.x <= p.x
                    && p.x <= bottom_right.x
                    && top_left.y <= p.y
                    && p.y <= bottom_right.y
            }
            Shape::Circle { center, radius } => center.distance_to(p) <= *radius,
            Shape::Polygon { vertices } => polygon_contains(vertices, p),
        }
    }

    /// Geometric center used for framewise distance series.
    pub fn centroid(&self) -> Point {
        match self {
            Shape::Rectangle {
                top_left,
                bottom_right,
            } => Point::new(
                (top_left.x + bottom_right.x) / 2.0,
                (top_left.y + bottom_right.y) / 2.0,
            ),
            Shape::Circle { center, .. } => *center,
            Shape::Polygon { vertices } => polygon_centroid(vertices),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Shape::Rectangle { .. } => Ok(()),
            Shape::Circle { radius, .. } => {
                if radius.is_finite() && *radius >= 0.0 {
                    Ok(())
                } else {
                    Err(format!("radius must be a non-negative number, got {radius}"))
                }
            }
            Shape::Polygon { vertices } => {
                if vertices.len() >= 3 {
                    Ok(())
                } else {
                    Err(format!(
                        "polygon needs at least 3 vertices, got {}",
                        vertices.len()
                    ))
                }
            }
        }
    }
}

/// Ray casting with an explicit on-edge check (edge points are outside).
fn polygon_contains(vertices: &[Point], p: &Point) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let a = vertices[i];
        let b = vertices[j];

        if on_segment(&a, &b, p) {
            return false;
        }

        if ((a.y > p.y) != (b.y > p.y)) && (p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

fn on_segment(a: &Point, b: &Point, p: &Point) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if cross.abs() > EDGE_EPSILON {
        return false;
    }
    p.x >= a.x.min(b.x) - EDGE_EPSILON
        && p.x <= a.x.max(b.x) + EDGE_EPSILON
        && p.y >= a.y.min(b.y) - EDGE_EPSILON
        && p.y <= a.y.max(b.y) + EDGE_EPSILON
}

fn polygon_centroid(vertices: &[Point]) -> Point {
    if vertices.is_empty() {
        return Point::default();
    }

    let n = vertices.len();
    let mut twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;

    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let cross = a.x * b.y - b.x * a.y;
        twice_area += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }

    if twice_area.abs() < EDGE_EPSILON {
        // Degenerate ring: fall back to the vertex mean.
        let sx: f64 = vertices.iter().map(|v| v.x).sum();
        let sy: f64 = vertices.iter().map(|v| v.y).sum();
        return Point::new(sx / n as f64, sy / n as f64);
    }

    Point::new(cx / (3.0 * twice_area), cy / (3.0 * twice_area))
}

/// Shape variant tag. Names are unique per (video, kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Polygon,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Circle => "circle",
            ShapeKind::Polygon => "polygon",
        };
        f.write_str(name)
    }
}

/// Identity of a shape within one video.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShapeId {
    pub kind: ShapeKind,
    pub name: String,
}

/// A registered region of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedShape {
    pub name: String,
    pub shape: Shape,
}

impl NamedShape {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        NamedShape {
            name: name.into(),
            shape,
        }
    }

    pub fn id(&self) -> ShapeId {
        ShapeId {
            kind: self.shape.kind(),
            name: self.name.clone(),
        }
    }
}

/// The three shape collections registered for one video.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoShapes {
    pub rectangles: Vec<NamedShape>,
    pub circles: Vec<NamedShape>,
    pub polygons: Vec<NamedShape>,
}

static NO_SHAPES: VideoShapes = VideoShapes::empty();

impl VideoShapes {
    pub const fn empty() -> Self {
        VideoShapes {
            rectangles: Vec::new(),
            circles: Vec::new(),
            polygons: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.rectangles.len() + self.circles.len() + self.polygons.len()
    }

    /// Rectangles, then circles, then polygons, each in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &NamedShape> {
        self.rectangles
            .iter()
            .chain(self.circles.iter())
            .chain(self.polygons.iter())
    }

    fn bucket_mut(&mut self, kind: ShapeKind) -> &mut Vec<NamedShape> {
        match kind {
            ShapeKind::Rectangle => &mut self.rectangles,
            ShapeKind::Circle => &mut self.circles,
            ShapeKind::Polygon => &mut self.polygons,
        }
    }
}

/// Shapes registered per video.
#[derive(Debug, Clone, Default)]
pub struct ShapeCatalog {
    videos: BTreeMap<String, VideoShapes>,
    rejected: BTreeMap<String, RoiError>,
}

impl ShapeCatalog {
    pub fn new() -> Self {
        ShapeCatalog {
            videos: BTreeMap::new(),
            rejected: BTreeMap::new(),
        }
    }

    /// Register a shape for a video. Rejects duplicate names within the same kind.
    pub fn register(&mut self, video: &str, shape: NamedShape) -> Result<(), RoiError> {
        shape
            .shape
            .validate()
            .map_err(|reason| RoiError::InvalidShape {
                video: video.to_string(),
                name: shape.name.clone(),
                reason,
            })?;

        let kind = shape.shape.kind();
        let bucket = self
            .videos
            .entry(video.to_string())
            .or_default()
            .bucket_mut(kind);

        if bucket.iter().any(|s| s.name == shape.name) {
            return Err(RoiError::DuplicateShape {
                video: video.to_string(),
                kind,
                name: shape.name,
            });
        }

        bucket.push(shape);
        Ok(())
    }

    /// Shapes for a video; empty collections when none were registered.
    pub fn shapes_for_video(&self, video: &str) -> &VideoShapes {
        self.videos.get(video).unwrap_or(&NO_SHAPES)
    }

    pub fn video_count(&self) -> usize {
        self.videos.len()
    }

    /// Error recorded for a video whose shape rows could not be registered.
    pub fn rejection(&self, video: &str) -> Option<&RoiError> {
        self.rejected.get(video)
    }

    /// Build a catalog from tabular shape registrations.
    ///
    /// A bad row only poisons its own video: the first error per video is kept
    /// in the catalog and the remaining rows are still registered.
    pub fn from_rows(rows: &ShapeRows) -> Self {
        let rectangles = rows.rectangles.iter().map(|row| {
            (
                &row.video,
                NamedShape::new(
                    row.name.clone(),
                    Shape::Rectangle {
                        top_left: Point::new(row.top_left_x, row.top_left_y),
                        bottom_right: Point::new(row.bottom_right_x, row.bottom_right_y),
                    },
                ),
            )
        });
        let circles = rows.circles.iter().map(|row| {
            (
                &row.video,
                NamedShape::new(
                    row.name.clone(),
                    Shape::Circle {
                        center: Point::new(row.center_x, row.center_y),
                        radius: row.radius,
                    },
                ),
            )
        });
        let polygons = rows.polygons.iter().map(|row| {
            let vertices = row.vertices.iter().map(|[x, y]| Point::new(*x, *y)).collect();
            (
                &row.video,
                NamedShape::new(row.name.clone(), Shape::Polygon { vertices }),
            )
        });

        let mut catalog = ShapeCatalog::new();
        for (video, shape) in rectangles.chain(circles).chain(polygons) {
            if let Err(err) = catalog.register(video, shape) {
                catalog.rejected.entry(video.clone()).or_insert(err);
            }
        }
        catalog
    }
}

/// Tabular shape registrations, using the ROI definition column names.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShapeRows {
    #[serde(default)]
    pub rectangles: Vec<RectangleRow>,
    #[serde(default)]
    pub circles: Vec<CircleRow>,
    #[serde(default)]
    pub polygons: Vec<PolygonRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RectangleRow {
    #[serde(rename = "Video")]
    pub video: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "topLeftX")]
    pub top_left_x: f64,
    #[serde(rename = "topLeftY")]
    pub top_left_y: f64,
    #[serde(rename = "Bottom_right_X")]
    pub bottom_right_x: f64,
    #[serde(rename = "Bottom_right_Y")]
    pub bottom_right_y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircleRow {
    #[serde(rename = "Video")]
    pub video: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "centerX")]
    pub center_x: f64,
    #[serde(rename = "centerY")]
    pub center_y: f64,
    pub radius: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonRow {
    #[serde(rename = "Video")]
    pub video: String,
    #[serde(rename = "Name")]
    pub name: String,
    pub vertices: Vec<[f64; 2]>,
}
