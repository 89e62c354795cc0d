//! # C ABI Entry Points
//!
//! Thin `extern "C"` wrappers around [`crate::context`]. Every fallible call
//! returns a sentinel (`false`, a negative id, a null pointer) and latches a
//! [`crate::core::error::GfxError`] that callers retrieve with
//! [`gfx_get_error`]/[`gfx_get_error_string`], mirroring the OpenGL-style
//! `glGetError` pattern this API imitates.
//!
//! ## Context model
//!
//! There is one process-wide [`ContextRegistry`] behind a [`Mutex`],
//! matching the single-threaded scheduling model: callers never hold the
//! lock across two calls, so there is no deadlock risk, but contexts
//! themselves are not `Send`-safe to share across threads simultaneously.
//!
//! Context ids here are plain slot indices (`u32`), not the generational
//! packed ids used elsewhere in this codebase's FFI conventions — the spec's
//! registry has no notion of stale-id detection beyond "unknown context id",
//! so a bare index is sufficient.

use crate::context::{ContextRegistry, MatrixSelector};
use crate::core::error::{latch_error, take_last_error_code, GfxError, GfxErrorCode};
use crate::raster::{AreaMode, PrimitiveMode};
use std::sync::{Mutex, OnceLock};

/// Sentinel returned by [`gfx_context_create`] on failure and by
/// [`gfx_context_get_active_id`] when no context is current.
pub const INVALID_CONTEXT_ID: u32 = u32::MAX;

static REGISTRY: OnceLock<Mutex<ContextRegistry>> = OnceLock::new();

fn registry() -> &'static Mutex<ContextRegistry> {
    REGISTRY.get_or_init(|| Mutex::new(ContextRegistry::new()))
}

fn lock_poisoned() -> GfxError {
    GfxError::InternalError("context registry mutex poisoned".into())
}

/// Creates a context of `width x height` and makes no change to which
/// context is active. Returns [`INVALID_CONTEXT_ID`] on failure.
#[no_mangle]
pub extern "C" fn gfx_context_create(width: u32, height: u32) -> u32 {
    let mut reg = match registry().lock() {
        Ok(r) => r,
        Err(_) => {
            latch_error(lock_poisoned());
            return INVALID_CONTEXT_ID;
        }
    };
    match reg.create(width, height) {
        Ok(id) => id as u32,
        Err(err) => {
            latch_error(err);
            INVALID_CONTEXT_ID
        }
    }
}

/// Destroys context `id`. Fails if `id` is current.
#[no_mangle]
pub extern "C" fn gfx_context_destroy(id: u32) -> bool {
    let mut reg = match registry().lock() {
        Ok(r) => r,
        Err(_) => {
            latch_error(lock_poisoned());
            return false;
        }
    };
    match reg.destroy(id as usize) {
        Ok(()) => true,
        Err(err) => {
            latch_error(err);
            false
        }
    }
}

/// Makes context `id` current.
#[no_mangle]
pub extern "C" fn gfx_context_set_active(id: u32) -> bool {
    let mut reg = match registry().lock() {
        Ok(r) => r,
        Err(_) => {
            latch_error(lock_poisoned());
            return false;
        }
    };
    match reg.set_active(id as usize) {
        Ok(()) => true,
        Err(err) => {
            latch_error(err);
            false
        }
    }
}

/// The current context's id, or [`INVALID_CONTEXT_ID`] if none is current.
#[no_mangle]
pub extern "C" fn gfx_context_get_active_id() -> u32 {
    match registry().lock() {
        Ok(reg) => reg.active_id().map(|i| i as u32).unwrap_or(INVALID_CONTEXT_ID),
        Err(_) => {
            latch_error(lock_poisoned());
            INVALID_CONTEXT_ID
        }
    }
}

/// Pointer to the current context's `3*width*height` row-major RGB floats.
/// Valid until the next call that touches this context's framebuffer.
/// Returns null if no context is current.
#[no_mangle]
pub extern "C" fn gfx_color_buffer_pointer() -> *const f32 {
    with_active_mut(|ctx| Ok(ctx.color_buffer_pointer())).unwrap_or(std::ptr::null())
}

/// Runs `f` against the active context, latching its error and returning
/// `None` on any failure (no active context, lock poisoned, or `f` itself
/// erroring).
fn with_active_mut<T>(f: impl FnOnce(&mut crate::context::Context) -> Result<T, GfxError>) -> Option<T> {
    let mut reg = match registry().lock() {
        Ok(r) => r,
        Err(_) => {
            latch_error(lock_poisoned());
            return None;
        }
    };
    let ctx = match reg.active_mut() {
        Some(c) => c,
        None => {
            latch_error(GfxError::InvalidOperation("no active context".into()));
            return None;
        }
    };
    match f(ctx) {
        Ok(v) => Some(v),
        Err(err) => {
            latch_error(err);
            None
        }
    }
}

fn bool_result(r: Option<()>) -> bool {
    r.is_some()
}

// ---- state changes --------------------------------------------------------

/// Sets the clear color; alpha is accepted for signature fidelity and
/// discarded.
#[no_mangle]
pub extern "C" fn gfx_set_clear_color(r: f32, g: f32, b: f32, a: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.set_clear_color(r, g, b, a)))
}

/// Sets the current draw color.
#[no_mangle]
pub extern "C" fn gfx_set_draw_color(r: f32, g: f32, b: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.set_draw_color(r, g, b)))
}

/// Sets the point splat's square side, in pixels.
#[no_mangle]
pub extern "C" fn gfx_set_point_size(size: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.set_point_size(size)))
}

/// Area mode enum accepted by [`gfx_set_area_mode`]: 0=POINT, 1=LINE, 2=FILL.
pub mod area_mode {
    /// Splat vertices only.
    pub const POINT: u32 = 0;
    /// Draw outlines only.
    pub const LINE: u32 = 1;
    /// Fill the interior.
    pub const FILL: u32 = 2;
}

fn decode_area_mode(mode: u32) -> Result<AreaMode, GfxError> {
    match mode {
        area_mode::POINT => Ok(AreaMode::Point),
        area_mode::LINE => Ok(AreaMode::Line),
        area_mode::FILL => Ok(AreaMode::Fill),
        _ => Err(GfxError::InvalidEnum("unrecognized area mode".into())),
    }
}

/// Sets whether closed primitives render as vertices, outlines, or filled
/// interiors. See [`area_mode`].
#[no_mangle]
pub extern "C" fn gfx_set_area_mode(mode: u32) -> bool {
    bool_result(with_active_mut(|ctx| {
        let decoded = decode_area_mode(mode)?;
        ctx.set_area_mode(decoded)
    }))
}

/// Feature flag bit accepted by [`gfx_enable`]/[`gfx_disable`]: the only
/// feature defined is depth testing.
pub const FEATURE_DEPTH_TEST: u32 = crate::context::features::DEPTH_TEST;

/// Enables a feature (see [`FEATURE_DEPTH_TEST`]).
#[no_mangle]
pub extern "C" fn gfx_enable(feature: u32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.enable(feature)))
}

/// Disables a feature (see [`FEATURE_DEPTH_TEST`]).
#[no_mangle]
pub extern "C" fn gfx_disable(feature: u32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.disable(feature)))
}

/// Matrix-stack selector accepted by [`gfx_matrix_mode`]: 0=MODELVIEW,
/// 1=PROJECTION.
pub mod matrix_mode_enum {
    /// The model-view stack.
    pub const MODELVIEW: u32 = 0;
    /// The projection stack.
    pub const PROJECTION: u32 = 1;
}

/// Selects which matrix stack subsequent transform ops target. See
/// [`matrix_mode_enum`].
#[no_mangle]
pub extern "C" fn gfx_matrix_mode(selector: u32) -> bool {
    bool_result(with_active_mut(|ctx| {
        let decoded = match selector {
            matrix_mode_enum::MODELVIEW => MatrixSelector::ModelView,
            matrix_mode_enum::PROJECTION => MatrixSelector::Projection,
            _ => return Err(GfxError::InvalidEnum("unrecognized matrix mode".into())),
        };
        ctx.matrix_mode(decoded)
    }))
}

/// Duplicates the current stack's top matrix.
#[no_mangle]
pub extern "C" fn gfx_push() -> bool {
    bool_result(with_active_mut(|ctx| ctx.push()))
}

/// Discards the current stack's top matrix.
#[no_mangle]
pub extern "C" fn gfx_pop() -> bool {
    bool_result(with_active_mut(|ctx| ctx.pop()))
}

/// Replaces the current stack's top with the identity matrix.
#[no_mangle]
pub extern "C" fn gfx_load_identity() -> bool {
    bool_result(with_active_mut(|ctx| ctx.load_identity()))
}

/// Replaces the current stack's top with a column-major 16-float matrix
/// read from `m`.
///
/// # Safety
///
/// `m` must be non-null and point to 16 valid, readable `f32`s.
#[no_mangle]
pub unsafe extern "C" fn gfx_load_matrix(m: *const f32) -> bool {
    if m.is_null() {
        latch_error(GfxError::InvalidValue("load_matrix received a null pointer".into()));
        return false;
    }
    let arr = std::slice::from_raw_parts(m, 16).try_into().expect("slice of 16 is array of 16");
    bool_result(with_active_mut(|ctx| ctx.load_matrix(&arr)))
}

/// Right-multiplies the current stack's top by a column-major 16-float
/// matrix read from `m`.
///
/// # Safety
///
/// `m` must be non-null and point to 16 valid, readable `f32`s.
#[no_mangle]
pub unsafe extern "C" fn gfx_mult_matrix(m: *const f32) -> bool {
    if m.is_null() {
        latch_error(GfxError::InvalidValue("mult_matrix received a null pointer".into()));
        return false;
    }
    let arr = std::slice::from_raw_parts(m, 16).try_into().expect("slice of 16 is array of 16");
    bool_result(with_active_mut(|ctx| ctx.mult_matrix(&arr)))
}

/// `M := M * translate(x,y,z)`.
#[no_mangle]
pub extern "C" fn gfx_translate(x: f32, y: f32, z: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.translate(x, y, z)))
}

/// `M := M * scale(sx,sy,sz)`.
#[no_mangle]
pub extern "C" fn gfx_scale(sx: f32, sy: f32, sz: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.scale(sx, sy, sz)))
}

/// `M := M * (T(cx,cy,0) * rotateZ(angle) * T(-cx,-cy,0))`.
#[no_mangle]
pub extern "C" fn gfx_rotate_2d(angle_rad: f32, cx: f32, cy: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.rotate_2d(angle_rad, cx, cy)))
}

/// `M := M * rotateY(angle)`.
#[no_mangle]
pub extern "C" fn gfx_rotate_y(angle_rad: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.rotate_y(angle_rad)))
}

/// Orthographic projection; requires `l != r`, `b != t`, `n != f`.
#[no_mangle]
pub extern "C" fn gfx_ortho(l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.ortho(l, r, b, t, n, f)))
}

/// Perspective (frustum) projection; requires `l != r`, `b != t`, `n != f`,
/// `n > 0`, `f > 0`.
#[no_mangle]
pub extern "C" fn gfx_frustum(l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.frustum(l, r, b, t, n, f)))
}

/// Replaces the viewport matrix; requires `w > 0`, `h > 0`.
#[no_mangle]
pub extern "C" fn gfx_viewport(x: f32, y: f32, w: f32, h: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.viewport(x, y, w, h)))
}

// ---- drawing ---------------------------------------------------------------

/// Primitive mode enum accepted by [`gfx_begin`].
pub mod primitive_mode {
    /// Independent points.
    pub const POINTS: u32 = 0;
    /// Independent segments.
    pub const LINES: u32 = 1;
    /// Connected segments.
    pub const LINE_STRIP: u32 = 2;
    /// Connected segments with a closing edge.
    pub const LINE_LOOP: u32 = 3;
    /// Independent triangles.
    pub const TRIANGLES: u32 = 4;
    /// A single closed polygon.
    pub const POLYGON: u32 = 5;
    /// A triangular area light (scene specification only).
    pub const AREA_LIGHT: u32 = 6;
}

fn decode_primitive_mode(mode: u32) -> Result<PrimitiveMode, GfxError> {
    use primitive_mode::*;
    match mode {
        POINTS => Ok(PrimitiveMode::Points),
        LINES => Ok(PrimitiveMode::Lines),
        LINE_STRIP => Ok(PrimitiveMode::LineStrip),
        LINE_LOOP => Ok(PrimitiveMode::LineLoop),
        TRIANGLES => Ok(PrimitiveMode::Triangles),
        POLYGON => Ok(PrimitiveMode::Polygon),
        AREA_LIGHT => Ok(PrimitiveMode::AreaLight),
        _ => Err(GfxError::InvalidEnum("unrecognized primitive mode".into())),
    }
}

/// Opens a vertex assembly. See [`primitive_mode`].
#[no_mangle]
pub extern "C" fn gfx_begin(mode: u32) -> bool {
    bool_result(with_active_mut(|ctx| {
        let decoded = decode_primitive_mode(mode)?;
        ctx.begin(decoded)
    }))
}

/// Appends a homogeneous vertex to the open assembly.
#[no_mangle]
pub extern "C" fn gfx_vertex4f(x: f32, y: f32, z: f32, w: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.vertex4f(x, y, z, w)))
}

/// `vertex4f(x, y, z, 1.0)`.
#[no_mangle]
pub extern "C" fn gfx_vertex3f(x: f32, y: f32, z: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.vertex3f(x, y, z)))
}

/// `vertex4f(x, y, 0.0, 1.0)`.
#[no_mangle]
pub extern "C" fn gfx_vertex2f(x: f32, y: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.vertex2f(x, y)))
}

/// Closes the open assembly.
#[no_mangle]
pub extern "C" fn gfx_end() -> bool {
    bool_result(with_active_mut(|ctx| ctx.end()))
}

/// Rasterizes a circle of object-space radius `r > 0`.
#[no_mangle]
pub extern "C" fn gfx_circle(x: f32, y: f32, z: f32, r: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.circle(x, y, z, r)))
}

/// Rasterizes an ellipse of object-space semi-axes `a > 0`, `b > 0`.
#[no_mangle]
pub extern "C" fn gfx_ellipse(x: f32, y: f32, z: f32, a: f32, b: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.ellipse(x, y, z, a, b)))
}

/// Rasterizes an arc of radius `r > 0` from `from` to `to` radians.
#[no_mangle]
pub extern "C" fn gfx_arc(x: f32, y: f32, z: f32, r: f32, from: f32, to: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.arc(x, y, z, r, from, to)))
}

/// Clear mask bits accepted by [`gfx_clear`].
pub mod clear_bits {
    pub use crate::framebuffer::clear_bits::{COLOR, DEPTH};
}

/// Clears the buffers named in `mask` (see [`clear_bits`]).
#[no_mangle]
pub extern "C" fn gfx_clear(mask: u32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.clear(mask)))
}

// ---- scene mode --------------------------------------------------------

/// Opens scene specification.
#[no_mangle]
pub extern "C" fn gfx_begin_scene() -> bool {
    bool_result(with_active_mut(|ctx| ctx.begin_scene()))
}

/// Closes scene specification.
#[no_mangle]
pub extern "C" fn gfx_end_scene() -> bool {
    bool_result(with_active_mut(|ctx| ctx.end_scene()))
}

/// Appends a sphere to the scene (scene specification only).
#[no_mangle]
pub extern "C" fn gfx_sphere(x: f32, y: f32, z: f32, r: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.sphere(x, y, z, r)))
}

/// Sets the current plain material.
#[no_mangle]
pub extern "C" fn gfx_material(r: f32, g: f32, b: f32, kd: f32, ks: f32, shine: f32, t: f32, ior: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.material(r, g, b, kd, ks, shine, t, ior)))
}

/// Sets the current material to an emissive surface.
#[no_mangle]
pub extern "C" fn gfx_emissive_material(r: f32, g: f32, b: f32, c0: f32, c1: f32, c2: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.emissive_material(r, g, b, c0, c1, c2)))
}

/// Appends a point light.
#[no_mangle]
pub extern "C" fn gfx_point_light(x: f32, y: f32, z: f32, r: f32, g: f32, b: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.point_light(x, y, z, r, g, b)))
}

/// Appends a directional light. Not named among the distilled spec's entry
/// points, but required by the `Directional` light variant the data model
/// defines; exposed the way [`gfx_point_light`] is.
#[no_mangle]
pub extern "C" fn gfx_directional_light(dx: f32, dy: f32, dz: f32, r: f32, g: f32, b: f32) -> bool {
    bool_result(with_active_mut(|ctx| ctx.directional_light(dx, dy, dz, r, g, b)))
}

/// Sets the current material to a texture sampled from the RGB8 image at
/// `path` (NUL-terminated UTF-8). Not named among the distilled spec's entry
/// points, but required by the `Textured` material variant the data model
/// defines; exposed the way [`gfx_material`] is.
///
/// # Safety
///
/// `path` must be non-null and point to a valid, NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn gfx_textured_material(path: *const std::os::raw::c_char, kd: f32, ks: f32, shine: f32, t: f32, ior: f32) -> bool {
    if path.is_null() {
        latch_error(GfxError::InvalidValue("textured_material received a null path".into()));
        return false;
    }
    let path = match std::ffi::CStr::from_ptr(path).to_str() {
        Ok(s) => s,
        Err(_) => {
            latch_error(GfxError::InvalidValue("textured_material path is not valid UTF-8".into()));
            return false;
        }
    };
    bool_result(with_active_mut(|ctx| ctx.textured_material(path, kd, ks, shine, t, ior)))
}

/// Binds a `width x height` RGB float environment map read from `rgb`
/// (`3*width*height` floats).
///
/// # Safety
///
/// `rgb` must be non-null and point to at least `3*width*height` valid,
/// readable `f32`s.
#[no_mangle]
pub unsafe extern "C" fn gfx_environment_map(width: u32, height: u32, rgb: *const f32) -> bool {
    if rgb.is_null() {
        latch_error(GfxError::InvalidValue("environment_map received a null pointer".into()));
        return false;
    }
    let len = width as usize * height as usize * 3;
    let slice = std::slice::from_raw_parts(rgb, len);
    bool_result(with_active_mut(|ctx| ctx.environment_map(width, height, slice)))
}

/// Ray traces the scene into the context's framebuffer.
#[no_mangle]
pub extern "C" fn gfx_ray_trace_scene() -> bool {
    bool_result(with_active_mut(|ctx| ctx.ray_trace_scene()))
}

/// Rasterizes the scene's triangles as a flat-shaded preview.
#[no_mangle]
pub extern "C" fn gfx_rasterize_scene() -> bool {
    bool_result(with_active_mut(|ctx| ctx.rasterize_scene()))
}

// ---- error API --------------------------------------------------------

/// Returns the first error latched since the last call, resetting to
/// no-error (code 0).
#[no_mangle]
pub extern "C" fn gfx_get_error() -> GfxErrorCode {
    take_last_error_code()
}

/// Returns the static message for `code` as a borrowed, NUL-free string
/// (valid for the process lifetime; callers must not free it). Returns
/// null on an out-of-range `out_len`.
///
/// Exposed as `(pointer, length)` rather than a C string because the
/// messages are static `&'static str` data with no interior NUL, and this
/// avoids allocating a fresh `CString` per call.
#[no_mangle]
pub extern "C" fn gfx_get_error_string(code: GfxErrorCode, out_len: *mut usize) -> *const u8 {
    let msg = GfxError::code_message(code);
    if !out_len.is_null() {
        unsafe { *out_len = msg.len() };
    }
    msg.as_ptr()
}
