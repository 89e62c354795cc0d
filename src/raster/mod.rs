//! Primitive assembly and the rasterizers it dispatches to.
//!
//! [`assembly`] holds the vertex buffer and begin/end state machine;
//! [`primitives`] and [`polygon`] implement the actual pixel writers.
//! [`dispatch`] is the `(mode, area_mode)` table from the design: it is the
//! single place that decides which rasterizer a flushed primitive reaches,
//! and every arm returns rather than falling through to the next (the
//! likely-bug fallthrough in the system this crate reimplements does not
//! reappear here).

pub mod assembly;
pub mod polygon;
pub mod primitives;

pub use assembly::{AreaMode, Assembler, PrimitiveMode};

use crate::core::math::Vec3;
use crate::framebuffer::Framebuffer;

/// Dispatches a flushed primitive (vertices already in screen space, i.e.
/// post-PVM and perspective-divided) to the rasterizer selected by `(mode,
/// area)`.
pub fn dispatch(
    fb: &mut Framebuffer,
    mode: PrimitiveMode,
    area: AreaMode,
    verts: &[Vec3],
    depth_test: bool,
    color: Vec3,
    point_size: i64,
) {
    use PrimitiveMode::*;
    match mode {
        Points => splat_all(fb, verts, depth_test, color, point_size),
        Lines => match area {
            AreaMode::Point => splat_all(fb, verts, depth_test, color, point_size),
            AreaMode::Line | AreaMode::Fill => {
                for pair in verts.chunks(2) {
                    if let [a, b] = pair {
                        draw_edge(fb, *a, *b, depth_test, color);
                    }
                }
            }
        },
        LineStrip => match area {
            AreaMode::Point => splat_all(fb, verts, depth_test, color, point_size),
            AreaMode::Line | AreaMode::Fill => {
                for w in verts.windows(2) {
                    draw_edge(fb, w[0], w[1], depth_test, color);
                }
            }
        },
        LineLoop => match area {
            AreaMode::Point => splat_all(fb, verts, depth_test, color, point_size),
            AreaMode::Line | AreaMode::Fill => {
                for w in verts.windows(2) {
                    draw_edge(fb, w[0], w[1], depth_test, color);
                }
                if verts.len() >= 2 {
                    draw_edge(fb, verts[verts.len() - 1], verts[0], depth_test, color);
                }
            }
        },
        Polygon => {
            if verts.len() < 3 {
                return;
            }
            match area {
                AreaMode::Point => splat_all(fb, verts, depth_test, color, point_size),
                AreaMode::Line => {
                    for i in 0..verts.len() {
                        draw_edge(fb, verts[i], verts[(i + 1) % verts.len()], depth_test, color);
                    }
                }
                AreaMode::Fill => polygon::scanline_fill(fb, verts, depth_test, color),
            }
        }
        Triangles => {
            for tri in verts.chunks(3) {
                if tri.len() < 3 {
                    continue;
                }
                match area {
                    AreaMode::Point => splat_all(fb, tri, depth_test, color, point_size),
                    AreaMode::Line => {
                        draw_edge(fb, tri[0], tri[1], depth_test, color);
                        draw_edge(fb, tri[1], tri[2], depth_test, color);
                        draw_edge(fb, tri[2], tri[0], depth_test, color);
                    }
                    AreaMode::Fill => polygon::scanline_fill(fb, tri, depth_test, color),
                }
            }
        }
        AreaLight => {
            // Only meaningful inside scene specification; the context layer
            // intercepts AreaLight before it ever reaches this dispatch.
        }
    }
}

fn splat_all(fb: &mut Framebuffer, verts: &[Vec3], depth_test: bool, color: Vec3, point_size: i64) {
    for v in verts {
        primitives::point_splat(fb, v.x.round() as i64, v.y.round() as i64, v.z, point_size, depth_test, color);
    }
}

fn draw_edge(fb: &mut Framebuffer, a: Vec3, b: Vec3, depth_test: bool, color: Vec3) {
    primitives::bresenham_line(
        fb,
        a.x.round() as i64,
        a.y.round() as i64,
        b.x.round() as i64,
        b.y.round() as i64,
        a.z,
        b.z,
        depth_test,
        color,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_mode_splats_every_vertex() {
        let mut fb = Framebuffer::new(10, 10);
        let verts = [Vec3::new(2.0, 2.0, 0.0), Vec3::new(7.0, 7.0, 0.0)];
        dispatch(&mut fb, PrimitiveMode::Points, AreaMode::Point, &verts, false, Vec3::new(1.0, 1.0, 1.0), 1);
        assert_eq!(fb.color_at(2, 2), Some(Vec3::new(1.0, 1.0, 1.0)));
        assert_eq!(fb.color_at(7, 7), Some(Vec3::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn polygon_fill_dispatches_to_scanline() {
        let mut fb = Framebuffer::new(10, 10);
        let verts = [
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(8.0, 1.0, 0.0),
            Vec3::new(8.0, 8.0, 0.0),
            Vec3::new(1.0, 8.0, 0.0),
        ];
        dispatch(&mut fb, PrimitiveMode::Polygon, AreaMode::Fill, &verts, false, Vec3::new(1.0, 0.0, 0.0), 1);
        assert_eq!(fb.color_at(4, 4), Some(Vec3::new(1.0, 0.0, 0.0)));
    }
}
