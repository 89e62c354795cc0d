//! Vector and matrix algebra: the arithmetic layer every other module builds
//! on.
//!
//! Vectors ([`Vec2`], [`Vec3`], [`Vec4`]) are plain `#[repr(C)]` componentwise
//! aggregates, FFI-safe the way the teacher's `core::math` types are, with
//! `From`/`Into` conversions to the matching `cgmath` vector for anywhere
//! that wants the battle-tested implementation. [`Mat4`] wraps
//! `cgmath::Matrix4<f32>` outright rather than hand-rolling matrix algebra:
//! composition, transform application, and inversion are all `cgmath`'s.
//!
//! `cgmath` types are not `#[repr(C)]`-guaranteed, so [`Mat4`] stays an
//! opaque newtype; its public surface is the 16-float column-major layout
//! the FFI load/multiply-matrix entry points already speak.

use std::ops::{Add, Div, Mul, Neg, Sub};

use cgmath::SquareMatrix;

macro_rules! vec_type {
    ($name:ident, $dim:expr, [$($field:ident),+], [$($idx:expr),+]) => {
        #[doc = concat!("A ", stringify!($dim), "-component single-precision vector.")]
        #[derive(Debug, Clone, Copy, PartialEq)]
        #[repr(C)]
        pub struct $name {
            $(
                #[allow(missing_docs)]
                pub $field: f32,
            )+
        }

        impl $name {
            /// Builds a new vector from its components.
            pub const fn new($($field: f32),+) -> Self {
                Self { $($field),+ }
            }

            /// The zero vector.
            pub const ZERO: Self = Self::new($(0.0 * $idx as f32 + 0.0),+);

            /// Dot product.
            pub fn dot(self, other: Self) -> f32 {
                let mut sum = 0.0;
                $(sum += self.$field * other.$field;)+
                sum
            }

            /// Euclidean length.
            pub fn length(self) -> f32 {
                self.dot(self).sqrt()
            }

            /// Returns this vector scaled to unit length.
            ///
            /// Returns the zero vector if the input has zero length.
            pub fn normalize(self) -> Self {
                let len = self.length();
                if len == 0.0 {
                    self
                } else {
                    self / len
                }
            }

            /// Componentwise linear interpolation.
            pub fn lerp(self, other: Self, t: f32) -> Self {
                self + (other - self) * t
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self { Self::new($(self.$field + rhs.$field),+) }
        }
        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self { Self::new($(self.$field - rhs.$field),+) }
        }
        impl Mul<f32> for $name {
            type Output = Self;
            fn mul(self, rhs: f32) -> Self { Self::new($(self.$field * rhs),+) }
        }
        impl Div<f32> for $name {
            type Output = Self;
            fn div(self, rhs: f32) -> Self { Self::new($(self.$field / rhs),+) }
        }
        impl Neg for $name {
            type Output = Self;
            fn neg(self) -> Self { Self::new($(-self.$field),+) }
        }
    };
}

vec_type!(Vec2, 2, [x, y], [0, 1]);
vec_type!(Vec3, 3, [x, y, z], [0, 1, 2]);
vec_type!(Vec4, 4, [x, y, z, w], [0, 1, 2, 3]);

impl From<cgmath::Vector2<f32>> for Vec2 {
    fn from(v: cgmath::Vector2<f32>) -> Self {
        Self::new(v.x, v.y)
    }
}
impl From<Vec2> for cgmath::Vector2<f32> {
    fn from(v: Vec2) -> Self {
        cgmath::Vector2::new(v.x, v.y)
    }
}

impl From<cgmath::Vector3<f32>> for Vec3 {
    fn from(v: cgmath::Vector3<f32>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}
impl From<Vec3> for cgmath::Vector3<f32> {
    fn from(v: Vec3) -> Self {
        cgmath::Vector3::new(v.x, v.y, v.z)
    }
}

impl From<cgmath::Vector4<f32>> for Vec4 {
    fn from(v: cgmath::Vector4<f32>) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }
}
impl From<Vec4> for cgmath::Vector4<f32> {
    fn from(v: Vec4) -> Self {
        cgmath::Vector4::new(v.x, v.y, v.z, v.w)
    }
}

impl Vec3 {
    /// Cross product.
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Reflects `self` (treated as an incident direction) across `n`.
    ///
    /// `reflect(i, n) = i - 2*(i.n)*n`. `n` is assumed unit length.
    pub fn reflect(self, n: Self) -> Self {
        self - n * (2.0 * self.dot(n))
    }

    /// Refracts `self` (an incident direction) across `n` with relative
    /// index of refraction `eta`.
    ///
    /// `refract(i,n,eta) = eta*i - (eta*(i.n) + sqrt(k))*n`, the form the
    /// ray tracer's refraction is grounded on. Returns the zero vector when
    /// `k` is negative, signaling total internal reflection.
    pub fn refract(self, n: Self, eta: f32) -> Self {
        let cos_i = self.dot(n);
        let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
        if k < 0.0 {
            Self::ZERO
        } else {
            (self * eta - n * (eta * cos_i + k.sqrt())).normalize()
        }
    }

    /// Promotes to a homogeneous point (`w = 1`).
    pub fn to_point4(self) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, 1.0)
    }

    /// Promotes to a homogeneous direction (`w = 0`).
    pub fn to_dir4(self) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, 0.0)
    }
}

impl Vec4 {
    /// Drops the homogeneous coordinate, dividing by `w` first.
    ///
    /// If `w == 0` the xyz components pass through unscaled.
    pub fn dehomogenize(self) -> Vec3 {
        if self.w == 0.0 {
            Vec3::new(self.x, self.y, self.z)
        } else {
            Vec3::new(self.x / self.w, self.y / self.w, self.z / self.w)
        }
    }

    /// The first three components.
    pub fn xyz(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// A 4x4 matrix of single-precision floats, wrapping `cgmath::Matrix4<f32>`.
///
/// `cgmath`'s column-major layout and `get`/`set` element order match the
/// FFI load/multiply-matrix entry points' 16-float column-major convention
/// directly; this type exists only to keep that convention `#[repr(C)]`-free
/// internally while giving every other module `cgmath`'s matrix algebra.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4(cgmath::Matrix4<f32>);

impl Mat4 {
    /// The identity matrix.
    pub fn identity() -> Self {
        Self(cgmath::Matrix4::identity())
    }

    /// Builds a matrix from 16 elements given in column-major order
    /// (`c0r0, c0r1, c0r2, c0r3, c1r0, ...`).
    fn from_col_major_elements(m: [f32; 16]) -> Self {
        Self(cgmath::Matrix4::new(
            m[0], m[1], m[2], m[3], m[4], m[5], m[6], m[7], m[8], m[9], m[10], m[11], m[12], m[13], m[14], m[15],
        ))
    }

    /// Reads element at column `i`, row `j`.
    pub fn get(&self, col: usize, row: usize) -> f32 {
        self.0[col][row]
    }

    /// Writes element at column `i`, row `j`.
    pub fn set(&mut self, col: usize, row: usize, value: f32) {
        self.0[col][row] = value;
    }

    /// Builds a matrix from 16 column-major floats, as used by the external
    /// `load_matrix`/`mult_matrix` entry points.
    pub fn from_col_major(m: &[f32; 16]) -> Self {
        Self::from_col_major_elements(*m)
    }

    /// Writes this matrix out as 16 column-major floats.
    pub fn to_col_major(&self) -> [f32; 16] {
        let m = self.0;
        [
            m[0][0], m[0][1], m[0][2], m[0][3], m[1][0], m[1][1], m[1][2], m[1][3], m[2][0], m[2][1], m[2][2],
            m[2][3], m[3][0], m[3][1], m[3][2], m[3][3],
        ]
    }

    /// Transforms a homogeneous vector: `v' = M*v`.
    pub fn transform(&self, v: Vec4) -> Vec4 {
        (self.0 * cgmath::Vector4::<f32>::from(v)).into()
    }

    /// Matrix product `self * other`.
    pub fn mul(&self, other: &Mat4) -> Mat4 {
        Mat4(self.0 * other.0)
    }

    /// Translation matrix.
    pub fn translate(x: f32, y: f32, z: f32) -> Self {
        Self(cgmath::Matrix4::from_translation(cgmath::Vector3::new(x, y, z)))
    }

    /// Scale matrix.
    pub fn scale(sx: f32, sy: f32, sz: f32) -> Self {
        Self(cgmath::Matrix4::from_nonuniform_scale(sx, sy, sz))
    }

    /// Rotation about the Z axis by `angle_rad`.
    pub fn rotate_z(angle_rad: f32) -> Self {
        Self(cgmath::Matrix4::from_angle_z(cgmath::Rad(angle_rad)))
    }

    /// Rotation about the Y axis by `angle_rad`.
    pub fn rotate_y(angle_rad: f32) -> Self {
        Self(cgmath::Matrix4::from_angle_y(cgmath::Rad(angle_rad)))
    }

    /// 2-D rotation about pivot `(cx, cy)`: `translate(cx,cy,0) * rotateZ(angle) * translate(-cx,-cy,0)`.
    pub fn rotate_2d(angle_rad: f32, cx: f32, cy: f32) -> Self {
        Self::translate(cx, cy, 0.0)
            .mul(&Self::rotate_z(angle_rad))
            .mul(&Self::translate(-cx, -cy, 0.0))
    }

    /// Orthographic projection matrix mapping `[l,r]x[b,t]x[-n,-f]` to the
    /// `[-1,1]` NDC cube.
    pub fn ortho(l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) -> Self {
        Self::from_col_major_elements([
            2.0 / (r - l),
            0.0,
            0.0,
            0.0,
            0.0,
            2.0 / (t - b),
            0.0,
            0.0,
            0.0,
            0.0,
            -2.0 / (f - n),
            0.0,
            -(r + l) / (r - l),
            -(t + b) / (t - b),
            -(f + n) / (f - n),
            1.0,
        ])
    }

    /// Perspective (frustum) projection matrix.
    pub fn frustum(l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) -> Self {
        Self::from_col_major_elements([
            2.0 * n / (r - l),
            0.0,
            0.0,
            0.0,
            0.0,
            2.0 * n / (t - b),
            0.0,
            0.0,
            (r + l) / (r - l),
            (t + b) / (t - b),
            -(f + n) / (f - n),
            -1.0,
            0.0,
            0.0,
            -2.0 * f * n / (f - n),
            0.0,
        ])
    }

    /// Viewport transform mapping NDC `[-1,1]` to window coordinates
    /// `x in [x0, x0+w)`, `y in [y0, y0+h)`, with `x_w = (x_nd+1)*w/2 + x0`.
    pub fn viewport(x0: f32, y0: f32, w: f32, h: f32) -> Self {
        Self::from_col_major_elements([
            w / 2.0,
            0.0,
            0.0,
            0.0,
            0.0,
            h / 2.0,
            0.0,
            0.0,
            0.0,
            0.0,
            1.0,
            0.0,
            x0 + w / 2.0,
            y0 + h / 2.0,
            0.0,
            1.0,
        ])
    }

    /// Inverts this matrix.
    ///
    /// Returns `None` if the matrix is singular.
    pub fn inverse(&self) -> Option<Mat4> {
        self.0.invert().map(Mat4)
    }
}

impl Mul for Mat4 {
    type Output = Mat4;
    fn mul(self, rhs: Mat4) -> Mat4 {
        Mat4::mul(&self, &rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn vec3_approx(a: Vec3, b: Vec3) -> bool {
        approx(a.x, b.x) && approx(a.y, b.y) && approx(a.z, b.z)
    }

    #[test]
    fn vec3_dot_cross() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(a.dot(b), 0.0);
        assert_eq!(a.cross(b), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn normalize_zero_vector_stays_zero() {
        assert_eq!(Vec3::ZERO.normalize(), Vec3::ZERO);
    }

    #[test]
    fn reflect_is_involutive() {
        let n = Vec3::new(0.0, 1.0, 0.0);
        let v = Vec3::new(1.0, -1.0, 0.3).normalize();
        let r = v.reflect(n);
        let back = r.reflect(n);
        assert!(vec3_approx(v, back));
    }

    #[test]
    fn refract_total_internal_reflection_returns_zero() {
        let n = Vec3::new(0.0, 1.0, 0.0);
        let grazing = Vec3::new(0.999, -0.001, 0.0).normalize();
        let refracted = grazing.refract(n, 2.0);
        assert_eq!(refracted, Vec3::ZERO);
    }

    #[test]
    fn identity_is_multiplicative_identity() {
        let m = Mat4::translate(1.0, 2.0, 3.0);
        assert_eq!(m.mul(&Mat4::identity()), m);
        assert_eq!(Mat4::identity().mul(&m), m);
    }

    #[test]
    fn translate_then_inverse_round_trips() {
        let m = Mat4::translate(4.0, -2.0, 7.0);
        let inv = m.inverse().expect("translation is invertible");
        let p = Vec3::new(1.0, 1.0, 1.0).to_point4();
        let round = inv.transform(m.transform(p));
        assert!(vec3_approx(round.dehomogenize(), Vec3::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn ortho_maps_corners_to_ndc_cube() {
        let m = Mat4::ortho(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
        let near_corner = m.transform(Vec3::new(-1.0, -1.0, -1.0).to_point4());
        let far_corner = m.transform(Vec3::new(1.0, 1.0, 1.0).to_point4());
        assert!(vec3_approx(near_corner.dehomogenize(), Vec3::new(-1.0, -1.0, -1.0)));
        assert!(vec3_approx(far_corner.dehomogenize(), Vec3::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn viewport_maps_ndc_cube_to_window() {
        let m = Mat4::viewport(0.0, 0.0, 4.0, 4.0);
        let bottom_left = m.transform(Vec3::new(-1.0, -1.0, 0.0).to_point4());
        let top_right = m.transform(Vec3::new(1.0, 1.0, 0.0).to_point4());
        assert!(vec3_approx(bottom_left.xyz(), Vec3::new(0.0, 0.0, 0.0)));
        assert!(vec3_approx(top_right.xyz(), Vec3::new(4.0, 4.0, 0.0)));
    }

    #[test]
    fn rotate_2d_about_pivot_is_identity_for_pivot_point() {
        let m = Mat4::rotate_2d(std::f32::consts::FRAC_PI_2, 5.0, 5.0);
        let p = m.transform(Vec3::new(5.0, 5.0, 0.0).to_point4());
        assert!(vec3_approx(p.xyz(), Vec3::new(5.0, 5.0, 0.0)));
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        let m = Mat4::scale(1.0, 0.0, 1.0);
        assert!(m.inverse().is_none());
    }

    #[test]
    fn col_major_round_trip() {
        let m = Mat4::translate(1.0, 2.0, 3.0).mul(&Mat4::scale(2.0, 2.0, 2.0));
        let flat = m.to_col_major();
        let back = Mat4::from_col_major(&flat);
        assert_eq!(m, back);
    }
}
