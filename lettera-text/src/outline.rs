//! Glyph outlines in pixel space (y up, origin on the pen/baseline).
//!
//! Outlines are collected from the font through [`OutlineCollector`] and
//! queried by the distance-field generators in [`crate::distance`]. Curves
//! are flattened into line segments; every segment remembers the edge it
//! came from so edge colouring stays per-edge.

use glam::Vec2;
use rustybuzz::ttf_parser::OutlineBuilder;

/// Line segments per quadratic edge when flattening.
const QUAD_STEPS: usize = 8;
/// Line segments per cubic edge when flattening.
const CUBIC_STEPS: usize = 12;

/// One outline edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Edge {
    Line(Vec2, Vec2),
    Quad(Vec2, Vec2, Vec2),
    Cubic(Vec2, Vec2, Vec2, Vec2),
}

impl Edge {
    pub fn start(&self) -> Vec2 {
        match *self {
            Self::Line(p0, _) | Self::Quad(p0, _, _) | Self::Cubic(p0, _, _, _) => p0,
        }
    }

    pub fn end(&self) -> Vec2 {
        match *self {
            Self::Line(_, p1) | Self::Quad(_, _, p1) | Self::Cubic(_, _, _, p1) => p1,
        }
    }

    /// Point at parameter `t` in [0, 1].
    pub fn point(&self, t: f32) -> Vec2 {
        let u = 1.0 - t;
        match *self {
            Self::Line(p0, p1) => p0.lerp(p1, t),
            Self::Quad(p0, c, p1) => p0 * (u * u) + c * (2.0 * u * t) + p1 * (t * t),
            Self::Cubic(p0, c0, c1, p1) => {
                p0 * (u * u * u) + c0 * (3.0 * u * u * t) + c1 * (3.0 * u * t * t) + p1 * (t * t * t)
            }
        }
    }

    /// Tangent direction leaving the start point.
    pub fn start_direction(&self) -> Vec2 {
        let d = match *self {
            Self::Line(p0, p1) => p1 - p0,
            Self::Quad(p0, c, p1) => first_distinct(p0, &[c, p1]),
            Self::Cubic(p0, c0, c1, p1) => first_distinct(p0, &[c0, c1, p1]),
        };
        d.normalize_or_zero()
    }

    /// Tangent direction arriving at the end point.
    pub fn end_direction(&self) -> Vec2 {
        let d = match *self {
            Self::Line(p0, p1) => p1 - p0,
            Self::Quad(p0, c, p1) => -first_distinct(p1, &[c, p0]),
            Self::Cubic(p0, c0, c1, p1) => -first_distinct(p1, &[c1, c0, p0]),
        };
        d.normalize_or_zero()
    }

    fn steps(&self) -> usize {
        match self {
            Self::Line(..) => 1,
            Self::Quad(..) => QUAD_STEPS,
            Self::Cubic(..) => CUBIC_STEPS,
        }
    }
}

/// Vector from `from` to the first control point that differs from it.
fn first_distinct(from: Vec2, points: &[Vec2]) -> Vec2 {
    points
        .iter()
        .map(|&p| p - from)
        .find(|d| d.length_squared() > f32::EPSILON)
        .unwrap_or(Vec2::ZERO)
}

/// A closed sequence of edges.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Contour {
    pub edges: Vec<Edge>,
}

impl Contour {
    /// Shoelace area of the flattened contour (positive = counter-clockwise).
    pub fn signed_area(&self) -> f32 {
        let mut area = 0.0;
        for edge in &self.edges {
            let steps = edge.steps();
            let mut prev = edge.start();
            for i in 1..=steps {
                let p = edge.point(i as f32 / steps as f32);
                area += prev.perp_dot(p);
                prev = p;
            }
        }
        area * 0.5
    }
}

/// A flattened piece of an edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub a: Vec2,
    pub b: Vec2,
    /// Index of the source edge across the whole outline.
    pub edge: usize,
}

impl Segment {
    /// Closest point on the segment to `p`.
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        let ab = self.b - self.a;
        let len2 = ab.length_squared();
        if len2 <= f32::EPSILON {
            return self.a;
        }
        let t = ((p - self.a).dot(ab) / len2).clamp(0.0, 1.0);
        self.a + ab * t
    }

    /// Unsigned distance plus the side of `p` relative to the segment
    /// direction (`cross > 0` = left) and how perpendicular the hit is.
    pub fn distance(&self, p: Vec2) -> SegmentDistance {
        let q = self.closest_point(p);
        let to_p = p - q;
        let dir = (self.b - self.a).normalize_or_zero();
        let dist = to_p.length();
        let cross = dir.perp_dot(p - self.a);
        let orthogonality = if dist > f32::EPSILON {
            dir.perp_dot(to_p / dist).abs()
        } else {
            1.0
        };
        SegmentDistance {
            distance: dist,
            cross,
            orthogonality,
        }
    }
}

/// Result of a point/segment query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentDistance {
    pub distance: f32,
    pub cross: f32,
    pub orthogonality: f32,
}

impl SegmentDistance {
    pub const FAR: Self = Self {
        distance: f32::INFINITY,
        cross: 0.0,
        orthogonality: 0.0,
    };

    /// Whether `self` is a better (closer, or equally close but more
    /// perpendicular) hit than `other`.
    pub fn beats(&self, other: &Self) -> bool {
        const TIE: f32 = 1e-4;
        if (self.distance - other.distance).abs() <= TIE {
            self.orthogonality > other.orthogonality
        } else {
            self.distance < other.distance
        }
    }
}

/// A full glyph outline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outline {
    pub contours: Vec<Contour>,
}

impl Outline {
    pub fn is_empty(&self) -> bool {
        self.contours.iter().all(|c| c.edges.is_empty())
    }

    /// Total number of edges across contours.
    pub fn edge_count(&self) -> usize {
        self.contours.iter().map(|c| c.edges.len()).sum()
    }

    /// Sum of contour areas; its sign tells the outline's fill orientation.
    pub fn signed_area(&self) -> f32 {
        self.contours.iter().map(Contour::signed_area).sum()
    }

    /// Flatten every edge into line segments, tagged with the edge index.
    pub fn segments(&self) -> Vec<Segment> {
        let mut out = Vec::new();
        let mut edge_id = 0;
        for contour in &self.contours {
            for edge in &contour.edges {
                let steps = edge.steps();
                let mut prev = edge.start();
                for i in 1..=steps {
                    let p = edge.point(i as f32 / steps as f32);
                    out.push(Segment {
                        a: prev,
                        b: p,
                        edge: edge_id,
                    });
                    prev = p;
                }
                edge_id += 1;
            }
        }
        out
    }

    /// Non-zero winding number of `p` against the flattened outline.
    pub fn winding(segments: &[Segment], p: Vec2) -> i32 {
        let mut winding = 0;
        for s in segments {
            if s.a.y <= p.y {
                if s.b.y > p.y && (s.b - s.a).perp_dot(p - s.a) > 0.0 {
                    winding += 1;
                }
            } else if s.b.y <= p.y && (s.b - s.a).perp_dot(p - s.a) < 0.0 {
                winding -= 1;
            }
        }
        winding
    }

    /// Integer pixel bounds `(left, bottom, right, top)` covering every edge.
    pub fn pixel_bounds(&self) -> Option<(i32, i32, i32, i32)> {
        let mut min = Vec2::splat(f32::INFINITY);
        let mut max = Vec2::splat(f32::NEG_INFINITY);
        for seg in self.segments() {
            min = min.min(seg.a).min(seg.b);
            max = max.max(seg.a).max(seg.b);
        }
        if !min.x.is_finite() || !max.x.is_finite() {
            return None;
        }
        Some((
            min.x.floor() as i32,
            min.y.floor() as i32,
            max.x.ceil() as i32,
            max.y.ceil() as i32,
        ))
    }
}

/// `OutlineBuilder` that scales font units to pixels while collecting edges.
pub struct OutlineCollector {
    scale: f32,
    outline: Outline,
    current: Vec<Edge>,
    start: Vec2,
    pen: Vec2,
}

impl OutlineCollector {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            outline: Outline::default(),
            current: Vec::new(),
            start: Vec2::ZERO,
            pen: Vec2::ZERO,
        }
    }

    pub fn finish(mut self) -> Outline {
        self.flush();
        self.outline
    }

    fn point(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y) * self.scale
    }

    fn flush(&mut self) {
        if self.pen.distance_squared(self.start) > f32::EPSILON && !self.current.is_empty() {
            self.current.push(Edge::Line(self.pen, self.start));
        }
        if !self.current.is_empty() {
            self.outline.contours.push(Contour {
                edges: std::mem::take(&mut self.current),
            });
        }
        self.pen = self.start;
    }
}

impl OutlineBuilder for OutlineCollector {
    fn move_to(&mut self, x: f32, y: f32) {
        self.flush();
        self.start = self.point(x, y);
        self.pen = self.start;
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.point(x, y);
        if p.distance_squared(self.pen) > f32::EPSILON {
            self.current.push(Edge::Line(self.pen, p));
        }
        self.pen = p;
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let c = self.point(x1, y1);
        let p = self.point(x, y);
        self.current.push(Edge::Quad(self.pen, c, p));
        self.pen = p;
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let c0 = self.point(x1, y1);
        let c1 = self.point(x2, y2);
        let p = self.point(x, y);
        self.current.push(Edge::Cubic(self.pen, c0, c1, p));
        self.pen = p;
    }

    fn close(&mut self) {
        self.flush();
    }
}

// ===================================================================
// Tests
// ===================================================================
