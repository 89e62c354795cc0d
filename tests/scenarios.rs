//! End-to-end scenarios against the public (non-FFI) API, one per case in
//! the design document's "Testable Properties" section.

use goud_graphics::context::Context;
use goud_graphics::core::math::Vec3;
use goud_graphics::framebuffer::clear_bits;
use goud_graphics::raster::{AreaMode, PrimitiveMode};
use goud_graphics::scene::{Light, Material, Primitive};
use std::rc::Rc;

#[test]
fn single_red_pixel() {
    goud_graphics::core::logging::init();
    let mut ctx = Context::new(4, 4).unwrap();
    ctx.set_clear_color(0.0, 0.0, 0.0, 1.0).unwrap();
    ctx.clear(clear_bits::COLOR).unwrap();
    ctx.viewport(0.0, 0.0, 4.0, 4.0).unwrap();
    ctx.ortho(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0).unwrap();
    ctx.set_draw_color(1.0, 0.0, 0.0).unwrap();
    ctx.set_point_size(1.0).unwrap();
    ctx.begin(PrimitiveMode::Points).unwrap();
    ctx.vertex2f(0.0, 0.0).unwrap();
    ctx.end().unwrap();

    let red = Vec3::new(1.0, 0.0, 0.0);
    let mut lit = 0;
    for y in 0..4 {
        for x in 0..4 {
            if ctx.framebuffer().color_at(x, y) == Some(red) {
                lit += 1;
            }
        }
    }
    assert_eq!(lit, 1);
}

#[test]
fn depth_occlusion_keeps_nearer_fragment() {
    let mut ctx = Context::new(10, 10).unwrap();
    ctx.viewport(0.0, 0.0, 10.0, 10.0).unwrap();
    ctx.set_area_mode(AreaMode::Fill).unwrap();
    ctx.clear(clear_bits::DEPTH).unwrap();

    ctx.set_draw_color(1.0, 0.0, 0.0).unwrap();
    ctx.begin(PrimitiveMode::Triangles).unwrap();
    ctx.vertex3f(-1.0, -1.0, 0.5).unwrap();
    ctx.vertex3f(3.0, -1.0, 0.5).unwrap();
    ctx.vertex3f(-1.0, 3.0, 0.5).unwrap();
    ctx.end().unwrap();

    ctx.set_draw_color(0.0, 0.0, 1.0).unwrap();
    ctx.begin(PrimitiveMode::Triangles).unwrap();
    ctx.vertex3f(-1.0, -1.0, 0.9).unwrap();
    ctx.vertex3f(3.0, -1.0, 0.9).unwrap();
    ctx.vertex3f(-1.0, 3.0, 0.9).unwrap();
    ctx.end().unwrap();

    for y in 0..10 {
        for x in 0..10 {
            if let Some(depth) = ctx.framebuffer().depth_at(x, y) {
                if depth.is_finite() {
                    assert_eq!(ctx.framebuffer().color_at(x, y), Some(Vec3::new(1.0, 0.0, 0.0)));
                    assert_eq!(depth, 0.5);
                }
            }
        }
    }
}

#[test]
fn bresenham_endpoints_and_only_those_are_lit() {
    let mut ctx = Context::new(8, 8).unwrap();
    ctx.viewport(0.0, 0.0, 8.0, 8.0).unwrap();
    ctx.ortho(0.0, 8.0, 0.0, 8.0, -1.0, 1.0).unwrap();
    ctx.set_area_mode(AreaMode::Line).unwrap();
    ctx.set_draw_color(1.0, 1.0, 1.0).unwrap();
    ctx.begin(PrimitiveMode::Lines).unwrap();
    ctx.vertex2f(0.0, 0.0).unwrap();
    ctx.vertex2f(4.0, 2.0).unwrap();
    ctx.end().unwrap();

    let white = Vec3::new(1.0, 1.0, 1.0);
    let mut lit = Vec::new();
    for y in 0..8 {
        for x in 0..8 {
            if ctx.framebuffer().color_at(x, y) == Some(white) {
                lit.push((x, y));
            }
        }
    }
    assert_eq!(lit.len(), 5);
    assert!(lit.contains(&(0, 0)));
    assert!(lit.contains(&(4, 2)));
}

#[test]
fn circle_radius_scales_with_model_view() {
    // viewport and ortho are chosen so one world unit maps to one pixel;
    // scale(2,2,1) alone is then responsible for doubling the circle's
    // rendered radius, per the spec's worked example.
    let mut ctx = Context::new(41, 41).unwrap();
    ctx.viewport(0.0, 0.0, 41.0, 41.0).unwrap();
    ctx.ortho(-20.5, 20.5, -20.5, 20.5, -1.0, 1.0).unwrap();
    ctx.set_area_mode(AreaMode::Line).unwrap();
    ctx.set_draw_color(1.0, 1.0, 1.0).unwrap();
    ctx.push().unwrap();
    ctx.scale(2.0, 2.0, 1.0).unwrap();
    ctx.circle(0.0, 0.0, 0.0, 1.0).unwrap();
    ctx.pop().unwrap();

    let white = Vec3::new(1.0, 1.0, 1.0);
    let mut max_radius = 0i64;
    let center = 20i64;
    for y in 0..41 {
        for x in 0..41 {
            if ctx.framebuffer().color_at(x, y) == Some(white) {
                let r = (x - center).abs().max((y - center).abs());
                max_radius = max_radius.max(r);
            }
        }
    }
    assert!((1..=3).contains(&max_radius), "expected a rendered radius near 2, got {max_radius}");
}

#[test]
fn ray_traced_sphere_casts_shadow_on_backdrop() {
    let mut ctx = Context::new(16, 16).unwrap();
    ctx.viewport(0.0, 0.0, 16.0, 16.0).unwrap();
    ctx.ortho(-3.0, 3.0, -3.0, 3.0, 0.1, 100.0).unwrap();
    ctx.translate(0.0, 0.0, 5.0).unwrap();

    ctx.begin_scene().unwrap();
    ctx.material(1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0).unwrap();
    ctx.sphere(0.0, 0.0, 0.0, 1.0).unwrap();

    ctx.begin(PrimitiveMode::Triangles).unwrap();
    ctx.vertex3f(-10.0, -10.0, -5.0).unwrap();
    ctx.vertex3f(10.0, -10.0, -5.0).unwrap();
    ctx.vertex3f(0.0, 10.0, -5.0).unwrap();
    ctx.end().unwrap();

    ctx.point_light(0.0, -5.0, 3.0, 1.0, 1.0, 1.0).unwrap();
    ctx.end_scene().unwrap();

    assert_eq!(ctx.scene().primitives.len(), 2);
    assert_eq!(ctx.scene().lights.len(), 1);

    ctx.ray_trace_scene().unwrap();

    let mut brightest = 0.0f32;
    let mut darkest = f32::INFINITY;
    for y in 0..16 {
        for x in 0..16 {
            let c = ctx.framebuffer().color_at(x, y).unwrap();
            let lum = c.x + c.y + c.z;
            brightest = brightest.max(lum);
            darkest = darkest.min(lum);
        }
    }
    assert!(brightest > 0.1, "expected some lit surface facing the point light, brightest was {brightest}");
    assert_eq!(darkest, 0.0, "expected at least one fully shadowed or missed pixel");
}

#[test]
fn refractive_sphere_shows_background_through_its_center() {
    let mut ctx = Context::new(16, 16).unwrap();
    ctx.set_clear_color(1.0, 0.0, 0.0, 1.0).unwrap();
    ctx.viewport(0.0, 0.0, 16.0, 16.0).unwrap();
    ctx.ortho(-3.0, 3.0, -3.0, 3.0, 0.1, 100.0).unwrap();
    ctx.translate(0.0, 0.0, 5.0).unwrap();

    ctx.begin_scene().unwrap();
    ctx.material(1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.5).unwrap();
    ctx.sphere(0.0, 0.0, 0.0, 1.0).unwrap();
    ctx.end_scene().unwrap();

    ctx.ray_trace_scene().unwrap();

    let corner = ctx.framebuffer().color_at(0, 0).unwrap();
    assert_eq!(corner, Vec3::new(1.0, 0.0, 0.0), "rays missing the sphere should see the red clear color");
}

#[test]
fn scene_specification_rejects_non_triangle_modes() {
    let mut ctx = Context::new(4, 4).unwrap();
    ctx.begin_scene().unwrap();
    assert!(ctx.begin(PrimitiveMode::Lines).is_err());
    assert!(ctx.begin(PrimitiveMode::Points).is_err());
}

#[test]
fn matrix_stack_overflow_and_underflow() {
    let mut ctx = Context::new(1, 1).unwrap();
    for _ in 0..99 {
        ctx.push().unwrap();
    }
    assert!(ctx.push().is_err());
    for _ in 0..99 {
        ctx.pop().unwrap();
    }
    assert!(ctx.pop().is_err());
}

#[test]
fn emissive_triangle_hit_skips_shadow_test() {
    let mut ctx = Context::new(8, 8).unwrap();
    ctx.viewport(0.0, 0.0, 8.0, 8.0).unwrap();
    ctx.ortho(-3.0, 3.0, -3.0, 3.0, 0.1, 100.0).unwrap();
    ctx.translate(0.0, 0.0, 5.0).unwrap();

    ctx.begin_scene().unwrap();
    ctx.emissive_material(1.0, 1.0, 1.0, 1.0, 0.0, 0.0).unwrap();
    ctx.begin(PrimitiveMode::Triangles).unwrap();
    ctx.vertex3f(-5.0, -5.0, -1.0).unwrap();
    ctx.vertex3f(5.0, -5.0, -1.0).unwrap();
    ctx.vertex3f(0.0, 5.0, -1.0).unwrap();
    ctx.end().unwrap();
    ctx.end_scene().unwrap();

    ctx.ray_trace_scene().unwrap();
    assert_eq!(ctx.framebuffer().color_at(4, 4), Some(Vec3::new(1.0, 1.0, 1.0)));
}

#[test]
fn area_light_attenuates_with_distance() {
    let near = Light::area(
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 1.0),
        1.0,
        0.0,
        1.0,
    );
    let close = near.color(Vec3::new(0.0, 0.0, 1.0));
    let far = near.color(Vec3::new(0.0, 0.0, 10.0));
    assert!(close.x > far.x, "attenuation should dim light reaching a farther point");
}

#[test]
fn textured_material_defaults_present_in_scene_graph() {
    let material = Rc::new(Material::Plain { color: Vec3::new(0.2, 0.4, 0.6), kd: 1.0, ks: 0.2, t: 0.0, shine: 16.0, ior: 1.0 });
    let tri = Primitive::triangle(
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        (0.0, 0.0),
        (1.0, 0.0),
        (0.0, 1.0),
        material,
    );
    assert!(!tri.material().is_emissive());
}
