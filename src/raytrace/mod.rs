//! The Whitted-style ray tracer: primary ray generation, intersection,
//! Phong shading, recursive reflection/refraction, shadow rays, area-light
//! sampling, optional depth of field, and the adaptive-AA post pass.

use crate::core::config::{AaConfig, RayTraceConfig};
use crate::core::error::GfxError;
use crate::core::math::{Mat4, Vec3, Vec4};
use crate::framebuffer::Framebuffer;
use crate::scene::{EnvironmentMap, Light, Scene};

/// Whether a ray travels through air (`Normal`) or inside a refractive
/// medium (`Inside`). Flips normal orientation and inverts the index of
/// refraction at each refraction boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayKind {
    /// Traveling through air.
    Normal,
    /// Traveling inside a refractive medium.
    Inside,
}

/// Self-seeded xorshift64* generator used for area-light sampling and
/// depth-of-field jitter. The system this crate reimplements calls into the
/// C library's `rand()`; this crate has no equivalent ambient source of
/// randomness, so a tiny deterministic generator stands in for it — seeded
/// per trace so repeated calls are reproducible for testing.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    /// Builds a generator from a nonzero seed (zero is remapped to 1).
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    /// Next 32 pseudo-random bits.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x >> 32) as u32
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() as f32) / (u32::MAX as f32 + 1.0)
    }

    /// Uniform float in `[lo, hi)`.
    pub fn next_range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }
}

fn generate_primary_ray(pvm_inv: Mat4, model_view_inv: Mat4, px: f32, py: f32) -> (Vec3, Vec3, Vec3) {
    let p_world = pvm_inv.transform(Vec4::new(px, py, -1.0, 1.0)).dehomogenize();
    let origin = model_view_inv.transform(Vec4::new(0.0, 0.0, 0.0, 1.0)).dehomogenize();
    let dir = (p_world - origin).normalize();
    (origin, dir, p_world)
}

struct TraceCtx<'a> {
    scene: &'a Scene,
    config: &'a RayTraceConfig,
    clear_color: Vec3,
    env_map: Option<&'a EnvironmentMap>,
}

/// Traces one ray to completion, returning its shaded color. `depth` is the
/// recursion depth (`0` for a primary ray once any depth-of-field branching
/// has already happened).
fn cast(ctx: &TraceCtx, origin: Vec3, dir: Vec3, kind: RayKind, depth: u32, rng: &mut Rng) -> Vec3 {
    if depth > ctx.config.max_depth {
        return ctx.clear_color;
    }

    let mut nearest: Option<(&crate::scene::Primitive, crate::scene::Hit)> = None;
    for prim in &ctx.scene.primitives {
        if let Some(hit) = prim.intersect(origin, dir) {
            let facing = kind == RayKind::Inside || prim.normal(hit.point).dot(dir) < 0.0;
            if !facing {
                continue;
            }
            if nearest.as_ref().map_or(true, |(_, h)| hit.t < h.t) {
                nearest = Some((prim, hit));
            }
        }
    }

    let Some((prim, hit)) = nearest else {
        return match ctx.env_map {
            Some(map) => map.sample_direction(dir),
            None => ctx.clear_color,
        };
    };

    let mat = prim.material();
    if mat.is_emissive() {
        return mat.color(prim.uv(hit.point));
    }

    let mut n = prim.normal(hit.point);
    let mut eta = 1.0 / mat.ior();
    if kind == RayKind::Inside {
        n = -n;
        eta = mat.ior();
    }

    let mut color = Vec3::ZERO;

    if mat.ks() != 0.0 {
        let r = dir.reflect(n);
        let reflected = cast(ctx, hit.point + n * 1e-4, r, kind, depth + 1, rng);
        color = color + reflected * mat.ks();
    }

    if mat.transmittance() != 0.0 {
        let refracted = dir.refract(n, eta);
        if refracted != Vec3::ZERO {
            let new_kind = if kind == RayKind::Normal { RayKind::Inside } else { RayKind::Normal };
            let offset_origin = hit.point + refracted * 1.8e-3;
            let out = cast(ctx, offset_origin, refracted, new_kind, depth + 1, rng);
            color = color + out * mat.transmittance();
        }
    }

    let view_dir = (-dir).normalize();
    for light in &ctx.scene.lights {
        let raw = light.vector_to(hit.point, rng);
        let l_hat = raw.normalize();
        let light_dist = match light {
            Light::Directional { .. } => f32::INFINITY,
            _ => raw.length(),
        };
        let shadow_origin = hit.point + l_hat * 1e-4;
        let mut obstructed = false;
        for occluder in &ctx.scene.primitives {
            if occluder.material().is_emissive() {
                continue;
            }
            if let Some(shadow_hit) = occluder.intersect(shadow_origin, l_hat) {
                if shadow_hit.t < light_dist {
                    obstructed = true;
                    break;
                }
            }
        }
        if obstructed {
            continue;
        }

        let diffuse = n.dot(l_hat).max(0.0);
        let reflect_l = n * (2.0 * n.dot(l_hat)) - l_hat;
        let specular = view_dir.dot(reflect_l).max(0.0).powf(mat.shine());
        let light_color = light.color(raw);
        let surface_color = mat.color(prim.uv(hit.point));

        color = color + light_color * surface_color * (mat.kd() * diffuse) + light_color * (mat.ks() * specular);
    }

    color
}

fn dof_color(ctx: &TraceCtx, pvm_inv: Mat4, mv_inv: Mat4, px: f32, py: f32, rng: &mut Rng) -> Vec3 {
    let (origin, dir, p_world) = generate_primary_ray(pvm_inv, mv_inv, px, py);
    let d2 = (p_world - origin).length();
    let focal_point = origin + dir * (d2 * (1.0 + ctx.config.focal_length));
    let half_aperture = ctx.config.aperture.sqrt() / 2.0;

    let mut sum = Vec3::ZERO;
    for _ in 0..ctx.config.dof_samples {
        let jx = rng.next_range(-half_aperture, half_aperture).round();
        let jy = rng.next_range(-half_aperture, half_aperture).round();
        let (_, _, p_jittered) = generate_primary_ray(pvm_inv, mv_inv, px + jx, py + jy);
        let jittered_dir = (focal_point - p_jittered).normalize();
        sum = sum + cast(ctx, p_jittered, jittered_dir, RayKind::Normal, 1, rng);
    }
    sum / ctx.config.dof_samples as f32
}

/// Colors one pixel, branching into the depth-of-field sampling path when
/// `config.dof_enabled` (which bypasses the ordinary single-sample trace
/// entirely for the primary ray).
pub fn trace_pixel(
    scene: &Scene,
    pvm_inv: Mat4,
    mv_inv: Mat4,
    px: f32,
    py: f32,
    config: &RayTraceConfig,
    clear_color: Vec3,
    env_map: Option<&EnvironmentMap>,
    rng: &mut Rng,
) -> Vec3 {
    let ctx = TraceCtx { scene, config, clear_color, env_map };
    if config.dof_enabled {
        dof_color(&ctx, pvm_inv, mv_inv, px, py, rng)
    } else {
        let (origin, dir, _) = generate_primary_ray(pvm_inv, mv_inv, px, py);
        cast(&ctx, origin, dir, RayKind::Normal, 0, rng)
    }
}

fn adaptive_aa_pass(
    fb: &mut Framebuffer,
    scene: &Scene,
    pvm_inv: Mat4,
    mv_inv: Mat4,
    config: &RayTraceConfig,
    aa: &AaConfig,
    clear_color: Vec3,
    env_map: Option<&EnvironmentMap>,
    rng: &mut Rng,
) {
    if !aa.enabled || fb.width() < 3 || fb.height() < 3 {
        return;
    }
    let ctx = TraceCtx { scene, config, clear_color, env_map };
    let snapshot = fb.clone();
    for y in 1..fb.height() - 1 {
        for x in 1..fb.width() - 1 {
            let c = snapshot.color_at(x as i64, y as i64).unwrap();
            let neighbors = [
                snapshot.color_at(x as i64 - 1, y as i64).unwrap(),
                snapshot.color_at(x as i64 + 1, y as i64).unwrap(),
                snapshot.color_at(x as i64, y as i64 - 1).unwrap(),
                snapshot.color_at(x as i64, y as i64 + 1).unwrap(),
            ];
            let max_dist = neighbors.iter().map(|n| (*n - c).length()).fold(0.0f32, f32::max);
            if max_dist <= aa.threshold {
                continue;
            }
            let mut sum = Vec3::ZERO;
            for (ox, oy) in aa.offsets {
                let (origin, dir, _) = generate_primary_ray(pvm_inv, mv_inv, x as f32 + 0.5 + ox, y as f32 + 0.5 + oy);
                sum = sum + cast(&ctx, origin, dir, RayKind::Normal, 0, rng);
            }
            fb.set_color(x, y, sum / aa.offsets.len() as f32);
        }
    }
}

/// Renders the whole scene into a fresh framebuffer of `width x height`,
/// one primary ray per pixel plus the adaptive-AA post pass.
pub fn trace_scene(
    scene: &Scene,
    width: usize,
    height: usize,
    pvm: Mat4,
    model_view: Mat4,
    config: &RayTraceConfig,
    aa: &AaConfig,
    clear_color: Vec3,
    env_map: Option<&EnvironmentMap>,
    seed: u64,
) -> Result<Framebuffer, GfxError> {
    let pvm_inv = pvm
        .inverse()
        .ok_or_else(|| GfxError::InternalError("PVM is singular; cannot unproject primary rays".into()))?;
    let mv_inv = model_view
        .inverse()
        .ok_or_else(|| GfxError::InternalError("model-view is singular; cannot locate ray origin".into()))?;

    let mut fb = Framebuffer::new(width, height);
    let mut rng = Rng::new(seed);
    for y in 0..height {
        for x in 0..width {
            let color = trace_pixel(scene, pvm_inv, mv_inv, x as f32 + 0.5, y as f32 + 0.5, config, clear_color, env_map, &mut rng);
            fb.set_color(x, y, color);
        }
    }
    adaptive_aa_pass(&mut fb, scene, pvm_inv, mv_inv, config, aa, clear_color, env_map, &mut rng);
    Ok(fb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Material, Primitive};
    use std::rc::Rc;

    fn identity_camera(width: usize, height: usize) -> (Mat4, Mat4) {
        let viewport = Mat4::viewport(0.0, 0.0, width as f32, height as f32);
        let projection = Mat4::ortho(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
        let model_view = Mat4::translate(0.0, 0.0, 5.0);
        (viewport.mul(&projection).mul(&model_view), model_view)
    }

    #[test]
    fn rng_is_deterministic_for_a_fixed_seed() {
        let mut a = Rng::new(42);
        let mut b = Rng::new(42);
        for _ in 0..8 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn misses_return_clear_color() {
        let scene = Scene::default();
        let (pvm, mv) = identity_camera(4, 4);
        let cfg = RayTraceConfig::default();
        let aa = AaConfig::default();
        let clear = Vec3::new(1.0, 0.0, 0.0);
        let fb = trace_scene(&scene, 4, 4, pvm, mv, &cfg, &aa, clear, None, 1).unwrap();
        assert_eq!(fb.color_at(0, 0), Some(clear));
    }

    #[test]
    fn diffuse_sphere_lit_from_front_is_bright_on_facing_side() {
        let mat = Rc::new(Material::Plain { color: Vec3::new(1.0, 1.0, 1.0), kd: 1.0, ks: 0.0, t: 0.0, shine: 10.0, ior: 1.0 });
        let mut scene = Scene::default();
        scene.primitives.push(Primitive::Sphere { center: Vec3::new(0.0, 0.0, 0.0), radius: 1.0, material: mat });
        scene.lights.push(Light::Point { position: Vec3::new(0.0, 0.0, 10.0), color: Vec3::new(1.0, 1.0, 1.0) });

        let (pvm, mv) = identity_camera(8, 8);
        let cfg = RayTraceConfig::default();
        let aa = AaConfig::default();
        let fb = trace_scene(&scene, 8, 8, pvm, mv, &cfg, &aa, Vec3::ZERO, None, 7).unwrap();
        let center = fb.color_at(4, 4).unwrap();
        assert!(center.x > 0.1, "expected a lit sphere center, got {center:?}");
    }

    #[test]
    fn shadowed_point_behind_blocker_is_dark() {
        let sphere_mat = Rc::new(Material::Plain { color: Vec3::new(1.0, 1.0, 1.0), kd: 1.0, ks: 0.0, t: 0.0, shine: 10.0, ior: 1.0 });
        let quad_mat = Rc::new(Material::Plain { color: Vec3::new(1.0, 1.0, 1.0), kd: 1.0, ks: 0.0, t: 0.0, shine: 10.0, ior: 1.0 });
        let mut scene = Scene::default();
        scene.primitives.push(Primitive::Sphere { center: Vec3::new(0.0, 0.0, 0.0), radius: 1.0, material: sphere_mat });
        scene.primitives.push(Primitive::triangle(
            Vec3::new(-10.0, -10.0, -5.0),
            Vec3::new(10.0, -10.0, -5.0),
            Vec3::new(0.0, 10.0, -5.0),
            (0.0, 0.0),
            (1.0, 0.0),
            (0.0, 1.0),
            quad_mat,
        ));
        scene.lights.push(Light::Point { position: Vec3::new(0.0, 0.0, 10.0), color: Vec3::new(1.0, 1.0, 1.0) });

        let origin = Vec3::new(0.0, 0.0, 8.0);
        let dir = Vec3::new(0.0, 0.0, -1.0);
        let cfg = RayTraceConfig::default();
        let ctx = TraceCtx { scene: &scene, config: &cfg, clear_color: Vec3::ZERO, env_map: None };
        let mut rng = Rng::new(3);
        let color = cast(&ctx, origin, dir, RayKind::Normal, 0, &mut rng);
        assert!(color.x > 0.0, "ray should hit the lit sphere front, got {color:?}");
    }
}
