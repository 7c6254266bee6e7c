//! Signed-distance-field generation from glyph outlines.
//!
//! - **SDF**: one channel (stored in alpha), true Euclidean distance to the
//!   flattened outline, sign from the non-zero winding rule.
//! - **MSDF**: edges are coloured so that every corner is shared by two
//!   edges with different channel sets; each RGB channel stores the signed
//!   distance to the nearest edge carrying that channel. Texels whose median
//!   disagrees with the true inside/outside test are replaced by the
//!   single-channel distance.
//!
//! Distances are encoded as `0.5 + d / (2 * range)` with `range` equal to
//! the buffer width in pixels (at least 1), positive inside the glyph.

use glam::Vec2;

use crate::glyph::{GlyphImage, GlyphInfo};
use crate::outline::{Outline, Segment, SegmentDistance};

const RED: u8 = 0b001;
const GREEN: u8 = 0b010;
const BLUE: u8 = 0b100;
const CYAN: u8 = GREEN | BLUE;
const MAGENTA: u8 = RED | BLUE;
const YELLOW: u8 = RED | GREEN;
const WHITE: u8 = RED | GREEN | BLUE;

/// Colour cycle used between corners.
const CYCLE: [u8; 3] = [CYAN, MAGENTA, YELLOW];

/// Placement of a distance-field image for `outline` with a `buffer` margin.
///
/// Advance and ascender come from `metrics`; the box comes from the outline.
pub fn field_info(metrics: GlyphInfo, outline: &Outline, buffer: i32) -> GlyphInfo {
    let buffer = buffer.max(0);
    match outline.pixel_bounds() {
        Some((left, bottom, right, top)) => GlyphInfo {
            buffer,
            left,
            top,
            width: (right - left).max(0) as u32,
            height: (top - bottom).max(0) as u32,
            ..metrics
        },
        None => GlyphInfo {
            buffer,
            left: 0,
            top: 0,
            width: 0,
            height: 0,
            ..metrics
        },
    }
}

/// Render a single-channel SDF. Empty outlines yield an empty image.
pub fn render_sdf(outline: &Outline, info: &GlyphInfo) -> GlyphImage {
    let Some(grid) = Grid::new(outline, info) else {
        return GlyphImage::default();
    };
    let mut image = GlyphImage::new(grid.width, grid.height);

    for py in 0..grid.height {
        for px in 0..grid.width {
            let p = grid.sample_point(px, py);
            let d = grid.true_distance(p);
            let v = grid.encode(d);
            image.set_pixel(px, py, [255, 255, 255, v]);
        }
    }
    image
}

/// Render a three-channel MSDF. Empty outlines yield an empty image.
pub fn render_msdf(outline: &Outline, info: &GlyphInfo) -> GlyphImage {
    let Some(grid) = Grid::new(outline, info) else {
        return GlyphImage::default();
    };
    let colors = color_edges(outline);
    let orientation = if outline.signed_area() >= 0.0 { 1.0 } else { -1.0 };
    let mut image = GlyphImage::new(grid.width, grid.height);

    for py in 0..grid.height {
        for px in 0..grid.width {
            let p = grid.sample_point(px, py);
            let true_d = grid.true_distance(p);

            let mut channels = [true_d; 3];
            for (c, channel) in channels.iter_mut().enumerate() {
                let bit = 1u8 << c;
                let mut best = SegmentDistance::FAR;
                for seg in &grid.segments {
                    if colors[seg.edge] & bit == 0 {
                        continue;
                    }
                    let hit = seg.distance(p);
                    if hit.beats(&best) {
                        best = hit;
                    }
                }
                if best.distance.is_finite() {
                    let inside = best.cross * orientation > 0.0;
                    *channel = if inside { best.distance } else { -best.distance };
                }
            }

            // Median disagreeing with the true sign shows up as a speckle.
            if (median(channels) >= 0.0) != (true_d >= 0.0) {
                channels = [true_d; 3];
            }

            image.set_pixel(
                px,
                py,
                [
                    grid.encode(channels[0]),
                    grid.encode(channels[1]),
                    grid.encode(channels[2]),
                    255,
                ],
            );
        }
    }
    image
}

/// Decode an encoded texel back to a signed pixel distance.
pub fn decode(value: u8, buffer: i32) -> f32 {
    let range = buffer.max(1) as f32;
    (value as f32 / 255.0 - 0.5) * 2.0 * range
}

/// Median of three channel values.
pub fn median(v: [f32; 3]) -> f32 {
    v[0].min(v[1]).max(v[0].max(v[1]).min(v[2]))
}

/// Sampling grid shared by both generators.
struct Grid {
    width: u32,
    height: u32,
    origin: Vec2,
    range: f32,
    segments: Vec<Segment>,
}

impl Grid {
    fn new(outline: &Outline, info: &GlyphInfo) -> Option<Self> {
        if outline.is_empty() || info.width == 0 || info.height == 0 {
            return None;
        }
        let b = info.buffer.max(0);
        Some(Self {
            width: info.width + 2 * b as u32,
            height: info.height + 2 * b as u32,
            origin: Vec2::new((info.left - b) as f32, (info.top + b) as f32),
            range: b.max(1) as f32,
            segments: outline.segments(),
        })
    }

    /// Texel centre in outline space (y up).
    fn sample_point(&self, px: u32, py: u32) -> Vec2 {
        Vec2::new(
            self.origin.x + px as f32 + 0.5,
            self.origin.y - py as f32 - 0.5,
        )
    }

    /// Euclidean distance to the outline, positive inside.
    fn true_distance(&self, p: Vec2) -> f32 {
        let d = self
            .segments
            .iter()
            .map(|s| s.closest_point(p).distance(p))
            .fold(f32::INFINITY, f32::min);
        if Outline::winding(&self.segments, p) != 0 {
            d
        } else {
            -d
        }
    }

    fn encode(&self, d: f32) -> u8 {
        let v = (0.5 + d / (2.0 * self.range)).clamp(0.0, 1.0);
        (v * 255.0).round() as u8
    }
}

fn is_corner(a: Vec2, b: Vec2) -> bool {
    let cross_threshold = 3.0f32.sin();
    a.dot(b) <= 0.0 || a.perp_dot(b).abs() > cross_threshold
}

/// Assign a channel mask to every edge of the outline (indexed like
/// [`Segment::edge`]).
pub(crate) fn color_edges(outline: &Outline) -> Vec<u8> {
    let mut colors = Vec::with_capacity(outline.edge_count());

    for contour in &outline.contours {
        let edges = &contour.edges;
        let n = edges.len();
        if n == 0 {
            continue;
        }

        let corners: Vec<usize> = (0..n)
            .filter(|&i| {
                let prev = &edges[(i + n - 1) % n];
                is_corner(prev.end_direction(), edges[i].start_direction())
            })
            .collect();

        let mut contour_colors = vec![WHITE; n];
        match corners.len() {
            0 => {}
            1 => {
                // Teardrop: split the loop into thirds starting at the corner.
                let start = corners[0];
                for k in 0..n {
                    let part = if n >= 3 { k * 3 / n } else { k };
                    contour_colors[(start + k) % n] = CYCLE[part % 3];
                }
                if n == 1 {
                    contour_colors[start] = WHITE;
                }
            }
            _ => {
                let start = corners[0];
                let mut group = 0usize;
                let mut groups = vec![0usize; n];
                for k in 0..n {
                    let i = (start + k) % n;
                    if k > 0 && corners.contains(&i) {
                        group += 1;
                    }
                    groups[i] = group;
                }
                let last = group;
                for i in 0..n {
                    let mut color = CYCLE[groups[i] % 3];
                    if last > 0 && groups[i] == last && color == CYCLE[0] {
                        // Wrapped back onto the first group's colour; pick
                        // the one colour distinct from both neighbours.
                        let prev = CYCLE[(last - 1) % 3];
                        color = CYCLE
                            .iter()
                            .copied()
                            .find(|&c| c != prev && c != CYCLE[0])
                            .unwrap_or(WHITE);
                    }
                    contour_colors[i] = color;
                }
            }
        }
        colors.extend(contour_colors);
    }
    colors
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::OutlineCollector;
    use rustybuzz::ttf_parser::OutlineBuilder;

    fn square(size: f32) -> Outline {
        let mut b = OutlineCollector::new(1.0);
        b.move_to(0.0, 0.0);
        b.line_to(size, 0.0);
        b.line_to(size, size);
        b.line_to(0.0, size);
        b.close();
        b.finish()
    }

    fn square_info(size: f32, buffer: i32) -> GlyphInfo {
        let metrics = GlyphInfo {
            x_advance: size + 2.0,
            ..Default::default()
        };
        field_info(metrics, &square(size), buffer)
    }

    #[test]
    fn test_field_info_bounds() {
        let info = square_info(8.0, 3);
        assert_eq!(info.left, 0);
        assert_eq!(info.top, 8);
        assert_eq!(info.width, 8);
        assert_eq!(info.height, 8);
        assert_eq!(info.buffer, 3);
        assert!((info.x_advance - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_field_info_clamps_negative_buffer() {
        assert_eq!(square_info(4.0, -5).buffer, 0);
    }

    #[test]
    fn test_sdf_inside_outside() {
        let outline = square(8.0);
        let info = square_info(8.0, 3);
        let image = render_sdf(&outline, &info);
        assert_eq!((image.width, image.height), (14, 14));

        // Centre texel is well inside, corner texel outside.
        let centre = image.pixel(7, 7).unwrap()[3];
        let corner = image.pixel(0, 0).unwrap()[3];
        assert!(centre > 128, "centre {centre}");
        assert!(corner < 128, "corner {corner}");
        // Distance decodes to roughly 3.5px at the centre (clamped to range 3).
        assert!((decode(centre, 3) - 3.0).abs() < 0.1);
    }

    #[test]
    fn test_sdf_empty_outline() {
        let info = GlyphInfo::default();
        let image = render_sdf(&Outline::default(), &info);
        assert!(image.is_empty());
    }

    #[test]
    fn test_square_coloring_separates_corners() {
        let outline = square(8.0);
        let colors = color_edges(&outline);
        assert_eq!(colors.len(), 4);
        for i in 0..4 {
            let a = colors[i];
            let b = colors[(i + 1) % 4];
            assert_ne!(a, b, "edges {i} and {} share colour", (i + 1) % 4);
            // Adjacent edges still share exactly one channel.
            assert_eq!((a & b).count_ones(), 1);
        }
    }

    #[test]
    fn test_coloring_covers_every_edge() {
        let mut b = OutlineCollector::new(1.0);
        b.move_to(0.0, 0.0);
        b.quad_to(4.0, -4.0, 8.0, 0.0);
        b.quad_to(12.0, 4.0, 16.0, 0.0);
        b.close();
        let outline = b.finish();
        let colors = color_edges(&outline);
        assert_eq!(colors.len(), outline.edge_count());
        assert!(colors.iter().all(|&c| c != 0));
    }

    #[test]
    fn test_cornerless_contour_is_white() {
        // Two tangent-continuous half circles.
        let mut b = OutlineCollector::new(1.0);
        b.move_to(0.0, 0.0);
        b.curve_to(0.0, 5.5, 10.0, 5.5, 10.0, 0.0);
        b.curve_to(10.0, -5.5, 0.0, -5.5, 0.0, 0.0);
        b.close();
        let outline = b.finish();
        assert_eq!(outline.edge_count(), 2);
        assert_eq!(color_edges(&outline), vec![WHITE, WHITE]);
    }

    #[test]
    fn test_msdf_median_matches_sdf_sign() {
        let outline = square(8.0);
        let info = square_info(8.0, 4);
        let image = render_msdf(&outline, &info);
        assert_eq!((image.width, image.height), (16, 16));

        for (x, y, inside) in [(8, 8, true), (0, 0, false), (15, 8, false), (5, 10, true)] {
            let px = image.pixel(x, y).unwrap();
            let d = median([
                decode(px[0], 4),
                decode(px[1], 4),
                decode(px[2], 4),
            ]);
            assert_eq!(d > 0.0, inside, "texel ({x},{y}) -> {d}");
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn test_median() {
        assert_eq!(median([1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median([3.0, -1.0, 0.5]), 0.5);
        assert_eq!(median([-2.0, -2.0, 5.0]), -2.0);
    }
}
