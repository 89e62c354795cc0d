//! Scanline polygon fill: edge table keyed by the integer `y_min` bucket,
//! active-edge-table sweep, parity fill rule.

use crate::core::math::Vec3;
use crate::framebuffer::Framebuffer;

#[derive(Clone, Copy)]
struct Edge {
    y_max: f32,
    x: f32,
    inv_slope: f32,
    z: f32,
    dz: f32,
}

/// Fills the polygon described by `verts` (screen-space x/y, with z used
/// for the depth variant of the span write). Vertices must already be in
/// screen space; the caller closes the polygon implicitly (edge `n-1 -> 0`
/// is synthesized here).
///
/// Horizontal edges (`floor(y0) == floor(y1)`) are skipped per the parity
/// fill rule; left edge of a span is inclusive, right edge exclusive at the
/// integer column boundary (`put_span`'s own convention).
pub fn scanline_fill(fb: &mut Framebuffer, verts: &[Vec3], depth_test: bool, color: Vec3) {
    if verts.len() < 3 {
        return;
    }
    let n = verts.len();
    let min_y = verts.iter().map(|v| v.y.floor() as i64).min().unwrap();
    let max_y = verts.iter().map(|v| v.y.ceil() as i64).max().unwrap();
    if max_y < min_y {
        return;
    }
    let bucket_count = (max_y - min_y + 1) as usize;
    let mut buckets: Vec<Vec<Edge>> = vec![Vec::new(); bucket_count];

    for i in 0..n {
        let p1 = verts[i];
        let p2 = verts[(i + 1) % n];
        if p1.y.floor() as i64 == p2.y.floor() as i64 {
            continue;
        }
        let (top, bottom) = if p1.y < p2.y { (p1, p2) } else { (p2, p1) };
        let dy = bottom.y - top.y;
        let inv_slope = (bottom.x - top.x) / dy;
        let dz = (bottom.z - top.z) / dy;
        let bucket_idx = (top.y.floor() as i64 - min_y) as usize;
        buckets[bucket_idx].push(Edge {
            y_max: bottom.y,
            x: top.x,
            inv_slope,
            z: top.z,
            dz,
        });
    }

    let mut active: Vec<Edge> = Vec::new();
    for y in min_y..=max_y {
        let bucket_idx = (y - min_y) as usize;
        active.append(&mut buckets[bucket_idx]);
        active.retain(|e| e.y_max > y as f32);
        active.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap());

        let mut i = 0;
        while i + 1 < active.len() {
            let a = active[i];
            let b = active[i + 1];
            let x0 = a.x.floor() as i64;
            let x1 = b.x.ceil() as i64;
            if depth_test {
                fb.put_span_depth(x0, x1, y, a.z, b.z, color);
            } else {
                fb.put_span(x0, x1, y, color);
            }
            i += 2;
        }

        for e in active.iter_mut() {
            e.x += e.inv_slope;
            e.z += e.dz;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_square_interior() {
        let mut fb = Framebuffer::new(10, 10);
        let verts = [
            Vec3::new(2.0, 2.0, 0.0),
            Vec3::new(8.0, 2.0, 0.0),
            Vec3::new(8.0, 8.0, 0.0),
            Vec3::new(2.0, 8.0, 0.0),
        ];
        scanline_fill(&mut fb, &verts, false, Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(fb.color_at(5, 5), Some(Vec3::new(1.0, 1.0, 1.0)));
        assert_eq!(fb.color_at(0, 0), Some(Vec3::ZERO));
    }

    #[test]
    fn depth_variant_keeps_nearer_triangle() {
        let mut fb = Framebuffer::new(10, 10);
        let a = Vec3::new(0.0, 0.0, 0.5);
        let b = Vec3::new(9.0, 0.0, 0.5);
        let c = Vec3::new(0.0, 9.0, 0.5);
        let verts_near = [a, b, c];
        scanline_fill(&mut fb, &verts_near, true, Vec3::new(1.0, 0.0, 0.0));

        let d = Vec3::new(0.0, 0.0, 0.9);
        let e = Vec3::new(9.0, 0.0, 0.9);
        let f = Vec3::new(0.0, 9.0, 0.9);
        scanline_fill(&mut fb, &[d, e, f], true, Vec3::new(0.0, 0.0, 1.0));

        assert_eq!(fb.color_at(2, 2), Some(Vec3::new(1.0, 0.0, 0.0)));
    }
}
