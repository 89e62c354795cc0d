//! The scene graph rendered by [`crate::raytrace`]: primitives (sphere,
//! triangle), the materials they share by reference, lights, and the
//! optional environment map.
//!
//! Materials are reference-counted rather than owned by each primitive: the
//! scene graph collectively keeps a material alive for as long as any
//! primitive points to it, matching the resource model's "outlives the
//! scene" requirement without an explicit arena.

use crate::core::math::Vec3;
use crate::texture::Image;
use std::rc::Rc;

/// Number of uniform samples drawn per area-light evaluation.
pub const AREA_LIGHT_SAMPLES: u32 = 16;

/// A material attached to a scene primitive.
#[derive(Debug, Clone)]
pub enum Material {
    /// Constant-color diffuse/specular/transmissive material.
    Plain { color: Vec3, kd: f32, ks: f32, t: f32, shine: f32, ior: f32 },
    /// Samples `color(uv)` from an RGB8 image; out-of-`[0,1]` uv is black.
    Textured { image: Rc<Image>, kd: f32, ks: f32, t: f32, shine: f32, ior: f32 },
    /// A light-emitting surface: contributes `color` directly to any ray
    /// that hits it, with no shadow test.
    Emissive { color: Vec3, c0: f32, c1: f32, c2: f32 },
}

impl Material {
    /// True for the `Emissive` variant.
    pub fn is_emissive(&self) -> bool {
        matches!(self, Material::Emissive { .. })
    }

    /// Surface color at the given (possibly out-of-range) uv.
    pub fn color(&self, uv: (f32, f32)) -> Vec3 {
        match self {
            Material::Plain { color, .. } | Material::Emissive { color, .. } => *color,
            Material::Textured { image, .. } => {
                let (u, v) = uv;
                if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
                    Vec3::ZERO
                } else {
                    image.sample(u, v)
                }
            }
        }
    }

    /// Diffuse coefficient (0 for emissive materials, which never shade).
    pub fn kd(&self) -> f32 {
        match self {
            Material::Plain { kd, .. } | Material::Textured { kd, .. } => *kd,
            Material::Emissive { .. } => 0.0,
        }
    }

    /// Specular coefficient.
    pub fn ks(&self) -> f32 {
        match self {
            Material::Plain { ks, .. } | Material::Textured { ks, .. } => *ks,
            Material::Emissive { .. } => 0.0,
        }
    }

    /// Shininess exponent.
    pub fn shine(&self) -> f32 {
        match self {
            Material::Plain { shine, .. } | Material::Textured { shine, .. } => *shine,
            Material::Emissive { .. } => 1.0,
        }
    }

    /// Transmission coefficient.
    pub fn transmittance(&self) -> f32 {
        match self {
            Material::Plain { t, .. } | Material::Textured { t, .. } => *t,
            Material::Emissive { .. } => 0.0,
        }
    }

    /// Index of refraction.
    pub fn ior(&self) -> f32 {
        match self {
            Material::Plain { ior, .. } | Material::Textured { ior, .. } => *ior,
            Material::Emissive { .. } => 1.0,
        }
    }
}

/// Result of a ray/primitive intersection test.
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    /// Ray parameter at the intersection.
    pub t: f32,
    /// World-space intersection point.
    pub point: Vec3,
}

/// A primitive in the scene graph: a sphere or a triangle, each carrying a
/// shared reference to its material.
#[derive(Debug, Clone)]
pub enum Primitive {
    /// A sphere. Transforms never mutate scene primitives; this center and
    /// radius are already in world space.
    Sphere { center: Vec3, radius: f32, material: Rc<Material> },
    /// A triangle with optional per-vertex texture coordinates (defaulting
    /// to `(0,0)` when the scene specification supplied none).
    Triangle {
        v0: Vec3,
        v1: Vec3,
        v2: Vec3,
        uv0: (f32, f32),
        uv1: (f32, f32),
        uv2: (f32, f32),
        normal: Vec3,
        material: Rc<Material>,
    },
}

impl Primitive {
    /// Builds a triangle, precomputing its face normal.
    pub fn triangle(v0: Vec3, v1: Vec3, v2: Vec3, uv0: (f32, f32), uv1: (f32, f32), uv2: (f32, f32), material: Rc<Material>) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize();
        Primitive::Triangle { v0, v1, v2, uv0, uv1, uv2, normal, material }
    }

    /// The primitive's material.
    pub fn material(&self) -> &Rc<Material> {
        match self {
            Primitive::Sphere { material, .. } => material,
            Primitive::Triangle { material, .. } => material,
        }
    }

    /// Intersects a ray (`origin`, `dir` need not be unit length for
    /// spheres, but ray generation always supplies a unit `dir`).
    pub fn intersect(&self, origin: Vec3, dir: Vec3) -> Option<Hit> {
        match self {
            Primitive::Sphere { center, radius, .. } => intersect_sphere(*center, *radius, origin, dir),
            Primitive::Triangle { v0, v1, v2, .. } => intersect_triangle(*v0, *v1, *v2, origin, dir),
        }
    }

    /// Outward surface normal at `point`.
    pub fn normal(&self, point: Vec3) -> Vec3 {
        match self {
            Primitive::Sphere { center, .. } => (point - *center).normalize(),
            Primitive::Triangle { normal, .. } => *normal,
        }
    }

    /// Surface uv at `point`: equirectangular for spheres, barycentric
    /// interpolation of stored texture coordinates for triangles.
    pub fn uv(&self, point: Vec3) -> (f32, f32) {
        match self {
            Primitive::Sphere { center, .. } => {
                let d = (point - *center).normalize();
                (0.5 - d.z.atan2(d.x) / std::f32::consts::TAU, 0.5 + d.y.asin() / std::f32::consts::PI)
            }
            Primitive::Triangle { v0, v1, v2, uv0, uv1, uv2, .. } => {
                let (b1, b2) = barycentric(*v0, *v1, *v2, point);
                let b0 = 1.0 - b1 - b2;
                (b0 * uv0.0 + b1 * uv1.0 + b2 * uv2.0, b0 * uv0.1 + b1 * uv1.1 + b2 * uv2.1)
            }
        }
    }
}

/// Sphere intersection: smallest positive root of the quadratic in `t`
/// along the ray. A ray originating inside the sphere (near root negative,
/// far root positive) is still reported, at the far root.
fn intersect_sphere(center: Vec3, radius: f32, origin: Vec3, dir: Vec3) -> Option<Hit> {
    let oc = origin - center;
    let a = dir.dot(dir);
    let b = 2.0 * oc.dot(dir);
    let c = oc.dot(oc) - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_d = disc.sqrt();
    let t0 = (-b - sqrt_d) / (2.0 * a);
    let t1 = (-b + sqrt_d) / (2.0 * a);
    let t = if t0 > 1e-4 {
        t0
    } else if t1 > 1e-4 {
        t1
    } else {
        return None;
    };
    Some(Hit { t, point: origin + dir * t })
}

/// Möller-Trumbore triangle intersection. Barycentric acceptance is `b1 >=
/// 0, b2 >= 0, b1+b2 <= 1, t > 0`.
fn intersect_triangle(v0: Vec3, v1: Vec3, v2: Vec3, origin: Vec3, dir: Vec3) -> Option<Hit> {
    const EPS: f32 = 1e-6;
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let h = dir.cross(e2);
    let a = e1.dot(h);
    if a.abs() < EPS {
        return None;
    }
    let f = 1.0 / a;
    let s = origin - v0;
    let b1 = f * s.dot(h);
    if !(0.0..=1.0).contains(&b1) {
        return None;
    }
    let q = s.cross(e1);
    let b2 = f * dir.dot(q);
    if b2 < 0.0 || b1 + b2 > 1.0 {
        return None;
    }
    let t = f * e2.dot(q);
    if t <= 0.0 {
        return None;
    }
    Some(Hit { t, point: origin + dir * t })
}

fn barycentric(v0: Vec3, v1: Vec3, v2: Vec3, p: Vec3) -> (f32, f32) {
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let ep = p - v0;
    let d00 = e1.dot(e1);
    let d01 = e1.dot(e2);
    let d11 = e2.dot(e2);
    let d20 = ep.dot(e1);
    let d21 = ep.dot(e2);
    let denom = d00 * d11 - d01 * d01;
    let b1 = (d11 * d20 - d01 * d21) / denom;
    let b2 = (d00 * d21 - d01 * d20) / denom;
    (b1, b2)
}

/// A light source. The capability set (`direction_from`/`color`/`is_area`)
/// is shared across variants via plain match arms rather than a trait
/// object — the distinction is organizational only, per the design notes.
#[derive(Debug, Clone)]
pub enum Light {
    /// Positional light; direction is `position - p`.
    Point { position: Vec3, color: Vec3 },
    /// Infinitely distant light; direction returned is `-direction`.
    Directional { direction: Vec3, color: Vec3 },
    /// A triangular area light, sampled stochastically.
    Area {
        v1: Vec3,
        e1: Vec3,
        e2: Vec3,
        normal: Vec3,
        area: f32,
        color: Vec3,
        c0: f32,
        c1: f32,
        c2: f32,
    },
}

impl Light {
    /// Builds an area light from three world-space vertices.
    pub fn area(v1: Vec3, v2: Vec3, v3: Vec3, color: Vec3, c0: f32, c1: f32, c2: f32) -> Self {
        let e1 = v2 - v1;
        let e2 = v3 - v1;
        let cross = e1.cross(e2);
        let area = cross.length() * 0.5;
        let normal = cross.normalize();
        Light::Area { v1, e1, e2, normal, area, color, c0, c1, c2 }
    }

    /// True for the `Area` variant.
    pub fn is_area(&self) -> bool {
        matches!(self, Light::Area { .. })
    }

    /// The (not necessarily unit-length) vector from `p` toward the light;
    /// its length is the `|d|` used by area-light attenuation.
    pub fn vector_to(&self, p: Vec3, rng: &mut crate::raytrace::Rng) -> Vec3 {
        match self {
            Light::Point { position, .. } => *position - p,
            Light::Directional { direction, .. } => -*direction,
            Light::Area { v1, e1, e2, .. } => sample_triangle(*v1, *e1, *e2, rng.next_f32(), rng.next_f32()) - p,
        }
    }

    /// Unit direction from `p` toward the light.
    pub fn direction_from(&self, p: Vec3, rng: &mut crate::raytrace::Rng) -> Vec3 {
        self.vector_to(p, rng).normalize()
    }

    /// Light color arriving from `direction` (the raw, non-unit vector
    /// returned by [`Self::vector_to`]).
    pub fn color(&self, direction: Vec3) -> Vec3 {
        match self {
            Light::Point { color, .. } | Light::Directional { color, .. } => *color,
            Light::Area { normal, area, color, c0, c1, c2, .. } => {
                let dist = direction.length();
                let d_hat = direction.normalize();
                let cos_term = normal.dot(-d_hat).max(0.0);
                let attenuation = (c0 + c1 * dist + c2 * dist * dist).max(1e-6);
                *color * (cos_term * (area / AREA_LIGHT_SAMPLES as f32) / attenuation)
            }
        }
    }
}

/// Uniform-over-triangle sample via the `(1-sqrt(r1), (1-r2)*sqrt(r1))`
/// barycentric map.
fn sample_triangle(v1: Vec3, e1: Vec3, e2: Vec3, r1: f32, r2: f32) -> Vec3 {
    let sqrt_r1 = r1.sqrt();
    v1 + e1 * (1.0 - sqrt_r1) + e2 * ((1.0 - r2) * sqrt_r1)
}

/// Optional equirectangular background sampled for rays that miss every
/// primitive, replacing the clear color.
pub type EnvironmentMap = Image;

/// The scene graph built up between `begin_scene`/`end_scene`: primitives
/// and lights, all in world space.
#[derive(Debug, Default)]
pub struct Scene {
    /// Spheres and triangles accepted during scene specification.
    pub primitives: Vec<Primitive>,
    /// Point, directional, and area lights.
    pub lights: Vec<Light>,
}

impl Scene {
    /// Drops all primitives and lights, e.g. before a fresh specification.
    pub fn clear(&mut self) {
        self.primitives.clear();
        self.lights.clear();
    }
}
