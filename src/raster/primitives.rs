//! Per-primitive rasterizers: point splat, Bresenham line, midpoint circle,
//! and the ellipse/arc polyline approximation.

use crate::core::math::Vec3;
use crate::framebuffer::Framebuffer;

/// Draws a filled `size x size` square centered at `(cx, cy)`.
///
/// With depth test on, a single depth read at the integer center gates the
/// whole splat: if the center passes, every pixel in the square is written
/// (and the depth buffer updated) unconditionally; otherwise nothing is
/// drawn. Without depth test, the square is always drawn.
pub fn point_splat(fb: &mut Framebuffer, cx: i64, cy: i64, z: f32, size: i64, depth_test: bool, color: Vec3) {
    let half = (size / 2).max(0);
    if depth_test {
        match fb.depth_at(cx, cy) {
            Some(center_depth) if z < center_depth => {}
            _ => return,
        }
        for dy in -half..=half {
            for dx in -half..=half {
                fb.put_pixel_depth(cx + dx, cy + dy, z, color);
            }
        }
    } else {
        for dy in -half..=half {
            for dx in -half..=half {
                fb.put_pixel(cx + dx, cy + dy, color);
            }
        }
    }
}

/// Integer DDA (Bresenham) from `(x0,y0)` to `(x1,y1)` inclusive of both
/// endpoints, symmetric across all eight octants. Depth is linearly
/// interpolated across the pixel sequence by step fraction, not by
/// Euclidean distance.
pub fn bresenham_line(
    fb: &mut Framebuffer,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    z0: f32,
    z1: f32,
    depth_test: bool,
    color: Vec3,
) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let mut x = x0;
    let mut y = y0;
    let total_steps = dx.max(-dy).max(1) as f32;
    let mut step = 0i64;
    loop {
        let t = step as f32 / total_steps;
        let z = z0 + (z1 - z0) * t;
        if depth_test {
            fb.put_pixel_depth(x, y, z, color);
        } else {
            fb.put_pixel(x, y, color);
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
        step += 1;
    }
}

/// One octant's worth of midpoint-circle offsets, `x <= y`, for a circle of
/// the given integer radius centered at the origin.
fn midpoint_circle_octant(radius: i64) -> Vec<(i64, i64)> {
    let mut pts = Vec::new();
    let mut x = 0i64;
    let mut y = radius;
    let mut d = 1 - radius;
    while x <= y {
        pts.push((x, y));
        x += 1;
        if d < 0 {
            d += 2 * x + 1;
        } else {
            y -= 1;
            d += 2 * (x - y) + 1;
        }
    }
    pts
}

fn plot(fb: &mut Framebuffer, x: i64, y: i64, z: f32, depth_test: bool, color: Vec3) {
    if depth_test {
        fb.put_pixel_depth(x, y, z, color);
    } else {
        fb.put_pixel(x, y, color);
    }
}

/// Eight-way symmetric midpoint-circle outline.
pub fn circle_outline(fb: &mut Framebuffer, cx: i64, cy: i64, radius: i64, z: f32, depth_test: bool, color: Vec3) {
    for (ox, oy) in midpoint_circle_octant(radius) {
        plot(fb, cx + ox, cy + oy, z, depth_test, color);
        plot(fb, cx - ox, cy + oy, z, depth_test, color);
        plot(fb, cx + ox, cy - oy, z, depth_test, color);
        plot(fb, cx - ox, cy - oy, z, depth_test, color);
        plot(fb, cx + oy, cy + ox, z, depth_test, color);
        plot(fb, cx - oy, cy + ox, z, depth_test, color);
        plot(fb, cx + oy, cy - ox, z, depth_test, color);
        plot(fb, cx - oy, cy - ox, z, depth_test, color);
    }
}

/// Filled midpoint circle: replaces the eight-pixel emission with four
/// horizontal spans connecting symmetric pairs per iteration.
pub fn circle_fill(fb: &mut Framebuffer, cx: i64, cy: i64, radius: i64, z: f32, depth_test: bool, color: Vec3) {
    let span = |fb: &mut Framebuffer, x0: i64, x1: i64, y: i64| {
        if depth_test {
            fb.put_span_depth(x0, x1 + 1, y, z, z, color);
        } else {
            fb.put_span(x0, x1 + 1, y, color);
        }
    };
    for (ox, oy) in midpoint_circle_octant(radius) {
        span(fb, cx - ox, cx + ox, cy + oy);
        span(fb, cx - ox, cx + ox, cy - oy);
        span(fb, cx - oy, cx + oy, cy + ox);
        span(fb, cx - oy, cx + oy, cy - ox);
    }
}

/// All eight-way symmetric offsets of a midpoint-circle outline, for
/// callers that splat vertices themselves rather than plotting pixels
/// directly (duplicate offsets at the octant boundaries are left in; a
/// redundant splat of the same pixel is harmless).
pub fn circle_outline_points(radius: i64) -> Vec<(i64, i64)> {
    let mut pts = Vec::new();
    for (ox, oy) in midpoint_circle_octant(radius) {
        pts.push((ox, oy));
        pts.push((-ox, oy));
        pts.push((ox, -oy));
        pts.push((-ox, -oy));
        pts.push((oy, ox));
        pts.push((-oy, ox));
        pts.push((oy, -ox));
        pts.push((-oy, -ox));
    }
    pts
}

const ELLIPSE_VERTEX_COUNT: usize = 40;

/// 40-vertex polyline approximating a full ellipse of semi-axes `(a, b)`
/// centered on the origin, in the primitive's local frame.
pub fn ellipse_polyline(a: f32, b: f32) -> Vec<(f32, f32)> {
    (0..ELLIPSE_VERTEX_COUNT)
        .map(|i| {
            let t = i as f32 / ELLIPSE_VERTEX_COUNT as f32 * std::f32::consts::TAU;
            (a * t.cos(), b * t.sin())
        })
        .collect()
}

/// Polyline approximating the arc from angle `from` to `to` (radians),
/// with vertex count scaled by `40 * |to-from| / (2*pi)`.
pub fn arc_polyline(a: f32, b: f32, from: f32, to: f32) -> Vec<(f32, f32)> {
    let n = ((ELLIPSE_VERTEX_COUNT as f32 * (to - from).abs() / std::f32::consts::TAU).round() as usize).max(2);
    (0..=n)
        .map(|i| {
            let t = from + (to - from) * (i as f32 / n as f32);
            (a * t.cos(), b * t.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bresenham_endpoints_match_spec_example() {
        let mut fb = Framebuffer::new(8, 8);
        bresenham_line(&mut fb, 0, 0, 4, 2, 0.0, 0.0, false, Vec3::new(1.0, 1.0, 1.0));
        let mut lit = Vec::new();
        for y in 0..8 {
            for x in 0..8 {
                if fb.color_at(x, y) == Some(Vec3::new(1.0, 1.0, 1.0)) {
                    lit.push((x, y));
                }
            }
        }
        assert!(lit.contains(&(0, 0)));
        assert!(lit.contains(&(4, 2)));
        assert_eq!(lit.len(), 5);
    }

    #[test]
    fn circle_outline_is_eight_way_symmetric() {
        let mut fb = Framebuffer::new(41, 41);
        circle_outline(&mut fb, 20, 20, 10, 0.0, false, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(fb.color_at(30, 20), fb.color_at(10, 20));
        assert_eq!(fb.color_at(20, 30), fb.color_at(20, 10));
    }

    #[test]
    fn ellipse_polyline_has_forty_vertices() {
        assert_eq!(ellipse_polyline(2.0, 1.0).len(), ELLIPSE_VERTEX_COUNT);
    }

    #[test]
    fn arc_polyline_scales_with_sweep() {
        let half = arc_polyline(1.0, 1.0, 0.0, std::f32::consts::PI);
        let full_ish = arc_polyline(1.0, 1.0, 0.0, std::f32::consts::TAU);
        assert!(half.len() < full_ish.len());
    }

    #[test]
    fn circle_outline_points_covers_cardinal_directions() {
        let pts = circle_outline_points(10);
        assert!(pts.contains(&(10, 0)));
        assert!(pts.contains(&(-10, 0)));
        assert!(pts.contains(&(0, 10)));
        assert!(pts.contains(&(0, -10)));
    }

    #[test]
    fn point_splat_depth_gate_blocks_farther_splat() {
        let mut fb = Framebuffer::new(5, 5);
        point_splat(&mut fb, 2, 2, 0.1, 3, true, Vec3::new(1.0, 0.0, 0.0));
        point_splat(&mut fb, 2, 2, 0.9, 3, true, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(fb.color_at(2, 2), Some(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(fb.color_at(1, 1), Some(Vec3::new(1.0, 0.0, 0.0)));
    }
}
