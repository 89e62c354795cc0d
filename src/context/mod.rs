//! The context controller: owns the framebuffer, transform pipeline,
//! primitive assembler, and scene graph for one drawing context, and
//! enforces the begin/end and scene-specification interlocks that tie them
//! together. [`ContextRegistry`] owns a fixed-size pool of these.

pub mod matrix_stack;

pub use matrix_stack::{MatrixSelector, MatrixStack};

use crate::core::config::{AaConfig, RayTraceConfig};
use crate::core::error::{GfxError, GfxResult};
use crate::core::math::{Mat4, Vec3, Vec4};
use crate::framebuffer::{clear_bits, Framebuffer};
use crate::raster::{self, polygon, primitives, AreaMode, Assembler, PrimitiveMode};
use crate::raytrace;
use crate::scene::{Light, Material, Primitive, Scene};
use crate::texture::Image;
use std::rc::Rc;

/// Feature bits accepted by [`Context::enable`]/[`Context::disable`].
pub mod features {
    /// The only feature flag the design defines.
    pub const DEPTH_TEST: u32 = 1 << 0;
}

/// Fixed capacity of the process-wide context pool.
pub const MAX_CONTEXTS: usize = 32;

fn default_material() -> Rc<Material> {
    Rc::new(Material::Plain { color: Vec3::new(1.0, 1.0, 1.0), kd: 1.0, ks: 0.0, t: 0.0, shine: 1.0, ior: 1.0 })
}

/// One drawing context: framebuffer, transform stacks, assembler, and scene
/// graph, plus the small bundle of draw state every mutator reads or
/// writes.
pub struct Context {
    framebuffer: Framebuffer,
    model_view: MatrixStack,
    projection: MatrixStack,
    current_stack: MatrixSelector,
    viewport: Mat4,
    pvm_cache: Mat4,
    assembler: Assembler,
    area_mode: AreaMode,
    draw_color: Vec3,
    clear_color: Vec3,
    point_size: f32,
    depth_test: bool,
    is_specifying_scene: bool,
    scene: Scene,
    current_material: Rc<Material>,
    environment_map: Option<Rc<Image>>,
    raytrace_config: RayTraceConfig,
    aa_config: AaConfig,
    rng_seed: u64,
    color_cache: Vec<f32>,
}

impl Context {
    /// Creates a context with positive `width`/`height`, identity stacks,
    /// and depth test enabled.
    pub fn new(width: u32, height: u32) -> GfxResult<Self> {
        if width == 0 || height == 0 {
            return Err(GfxError::InvalidValue("context width and height must be positive".into()));
        }
        let model_view = MatrixStack::default();
        let projection = MatrixStack::default();
        let viewport = Mat4::viewport(0.0, 0.0, width as f32, height as f32);
        let mut ctx = Self {
            framebuffer: Framebuffer::new(width as usize, height as usize),
            model_view,
            projection,
            current_stack: MatrixSelector::ModelView,
            viewport,
            pvm_cache: Mat4::identity(),
            assembler: Assembler::default(),
            area_mode: AreaMode::Fill,
            draw_color: Vec3::new(1.0, 1.0, 1.0),
            clear_color: Vec3::ZERO,
            point_size: 1.0,
            depth_test: true,
            is_specifying_scene: false,
            scene: Scene::default(),
            current_material: default_material(),
            environment_map: None,
            raytrace_config: RayTraceConfig::default(),
            aa_config: AaConfig::default(),
            rng_seed: 0x9E37_79B9_7F4A_7C15,
            color_cache: Vec::new(),
        };
        ctx.refresh_pvm();
        Ok(ctx)
    }

    fn check_can_mutate(&self) -> GfxResult<()> {
        if self.assembler.is_assembling() {
            return Err(GfxError::InvalidOperation("begin/end interlock: state mutated mid-assembly".into()));
        }
        Ok(())
    }

    fn refresh_pvm(&mut self) {
        self.pvm_cache = self.viewport.mul(&self.projection.top()).mul(&self.model_view.top());
    }

    fn current_stack_mut(&mut self) -> &mut MatrixStack {
        match self.current_stack {
            MatrixSelector::ModelView => &mut self.model_view,
            MatrixSelector::Projection => &mut self.projection,
        }
    }

    fn apply_transform(&mut self, t: Mat4) -> GfxResult<()> {
        self.check_can_mutate()?;
        let top = self.current_stack_mut().top();
        self.current_stack_mut().set_top(top.mul(&t));
        self.refresh_pvm();
        Ok(())
    }

    // ---- lifecycle / accessors -------------------------------------------------

    /// Framebuffer width in pixels.
    pub fn width(&self) -> usize {
        self.framebuffer.width()
    }

    /// Framebuffer height in pixels.
    pub fn height(&self) -> usize {
        self.framebuffer.height()
    }

    /// The color buffer as `3*width*height` row-major floats.
    pub fn color_buffer_flat(&self) -> Vec<f32> {
        self.framebuffer.color_buffer_flat()
    }

    /// Recomputes the cached flat color buffer and returns a pointer to it,
    /// for the FFI surface's `color_buffer_pointer()`. Valid until the next
    /// call that touches this context's framebuffer.
    pub fn color_buffer_pointer(&mut self) -> *const f32 {
        self.color_cache = self.framebuffer.color_buffer_flat();
        self.color_cache.as_ptr()
    }

    /// Read-only access to the framebuffer, mostly for tests.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Read-only access to the scene graph, mostly for tests.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    // ---- state changes (forbidden while is_drawing) -----------------------------

    /// Sets the clear color. Alpha is accepted for signature fidelity but
    /// discarded — the color buffer stores RGB triples only.
    pub fn set_clear_color(&mut self, r: f32, g: f32, b: f32, _a: f32) -> GfxResult<()> {
        self.check_can_mutate()?;
        self.clear_color = Vec3::new(r, g, b);
        Ok(())
    }

    /// Sets the current draw color used by every rasterizer.
    pub fn set_draw_color(&mut self, r: f32, g: f32, b: f32) -> GfxResult<()> {
        self.check_can_mutate()?;
        self.draw_color = Vec3::new(r, g, b);
        Ok(())
    }

    /// Sets the point splat's square side, in pixels.
    pub fn set_point_size(&mut self, size: f32) -> GfxResult<()> {
        self.check_can_mutate()?;
        if size <= 0.0 {
            return Err(GfxError::InvalidValue("point size must be positive".into()));
        }
        self.point_size = size;
        Ok(())
    }

    /// Sets whether closed primitives render as vertices, outlines, or
    /// filled interiors.
    pub fn set_area_mode(&mut self, mode: AreaMode) -> GfxResult<()> {
        self.check_can_mutate()?;
        self.area_mode = mode;
        Ok(())
    }

    /// Enables a feature (only `DEPTH_TEST` is defined).
    pub fn enable(&mut self, feature: u32) -> GfxResult<()> {
        self.check_can_mutate()?;
        if feature != features::DEPTH_TEST {
            return Err(GfxError::InvalidEnum("unknown feature flag".into()));
        }
        self.depth_test = true;
        Ok(())
    }

    /// Disables a feature (only `DEPTH_TEST` is defined).
    pub fn disable(&mut self, feature: u32) -> GfxResult<()> {
        self.check_can_mutate()?;
        if feature != features::DEPTH_TEST {
            return Err(GfxError::InvalidEnum("unknown feature flag".into()));
        }
        self.depth_test = false;
        Ok(())
    }

    /// Selects which matrix stack subsequent transform ops target.
    pub fn matrix_mode(&mut self, selector: MatrixSelector) -> GfxResult<()> {
        self.check_can_mutate()?;
        self.current_stack = selector;
        Ok(())
    }

    /// Duplicates the current stack's top matrix.
    pub fn push(&mut self) -> GfxResult<()> {
        self.check_can_mutate()?;
        self.current_stack_mut().push()?;
        self.refresh_pvm();
        Ok(())
    }

    /// Discards the current stack's top matrix.
    pub fn pop(&mut self) -> GfxResult<()> {
        self.check_can_mutate()?;
        self.current_stack_mut().pop()?;
        self.refresh_pvm();
        Ok(())
    }

    /// Replaces the current stack's top with the identity matrix.
    pub fn load_identity(&mut self) -> GfxResult<()> {
        self.check_can_mutate()?;
        self.current_stack_mut().set_top(Mat4::identity());
        self.refresh_pvm();
        Ok(())
    }

    /// Replaces the current stack's top with a caller-supplied column-major
    /// matrix.
    pub fn load_matrix(&mut self, m: &[f32; 16]) -> GfxResult<()> {
        self.check_can_mutate()?;
        self.current_stack_mut().set_top(Mat4::from_col_major(m));
        self.refresh_pvm();
        Ok(())
    }

    /// Right-multiplies the current stack's top by a caller-supplied
    /// column-major matrix: `M := M * T`.
    pub fn mult_matrix(&mut self, m: &[f32; 16]) -> GfxResult<()> {
        self.apply_transform(Mat4::from_col_major(m))
    }

    /// `M := M * translate(x,y,z)`.
    pub fn translate(&mut self, x: f32, y: f32, z: f32) -> GfxResult<()> {
        self.apply_transform(Mat4::translate(x, y, z))
    }

    /// `M := M * scale(sx,sy,sz)`.
    pub fn scale(&mut self, sx: f32, sy: f32, sz: f32) -> GfxResult<()> {
        self.apply_transform(Mat4::scale(sx, sy, sz))
    }

    /// `M := M * (T(cx,cy,0) * rotateZ(angle) * T(-cx,-cy,0))`.
    pub fn rotate_2d(&mut self, angle_rad: f32, cx: f32, cy: f32) -> GfxResult<()> {
        self.apply_transform(Mat4::rotate_2d(angle_rad, cx, cy))
    }

    /// `M := M * rotateY(angle)`.
    pub fn rotate_y(&mut self, angle_rad: f32) -> GfxResult<()> {
        self.apply_transform(Mat4::rotate_y(angle_rad))
    }

    /// `M := M * ortho(...)`. Rejects degenerate bounds.
    pub fn ortho(&mut self, l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) -> GfxResult<()> {
        self.check_can_mutate()?;
        if l == r || b == t || n == f {
            return Err(GfxError::InvalidValue("ortho requires l != r, b != t, n != f".into()));
        }
        self.apply_transform_unchecked(Mat4::ortho(l, r, b, t, n, f));
        Ok(())
    }

    /// `M := M * frustum(...)`. Rejects degenerate bounds and non-positive
    /// near/far.
    pub fn frustum(&mut self, l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) -> GfxResult<()> {
        self.check_can_mutate()?;
        if l == r || b == t || n == f || n <= 0.0 || f <= 0.0 {
            return Err(GfxError::InvalidValue("frustum requires l != r, b != t, n != f, n > 0, f > 0".into()));
        }
        self.apply_transform_unchecked(Mat4::frustum(l, r, b, t, n, f));
        Ok(())
    }

    fn apply_transform_unchecked(&mut self, t: Mat4) {
        let top = self.current_stack_mut().top();
        self.current_stack_mut().set_top(top.mul(&t));
        self.refresh_pvm();
    }

    /// Replaces the viewport matrix outright (it is not part of either
    /// stack).
    pub fn viewport(&mut self, x: f32, y: f32, w: f32, h: f32) -> GfxResult<()> {
        self.check_can_mutate()?;
        if w <= 0.0 || h <= 0.0 {
            return Err(GfxError::InvalidValue("viewport width and height must be positive".into()));
        }
        self.viewport = Mat4::viewport(x, y, w, h);
        self.refresh_pvm();
        Ok(())
    }

    /// Clears the buffers named in `mask` (see [`clear_bits`]).
    pub fn clear(&mut self, mask: u32) -> GfxResult<()> {
        self.check_can_mutate()?;
        if mask & !(clear_bits::COLOR | clear_bits::DEPTH) != 0 {
            return Err(GfxError::InvalidValue("clear mask has undefined bits set".into()));
        }
        self.framebuffer.clear(mask, self.clear_color);
        Ok(())
    }

    // ---- drawing ------------------------------------------------------------

    /// Opens a new vertex assembly. Inside scene specification, only
    /// polygon/triangle/area-light modes are accepted.
    pub fn begin(&mut self, mode: PrimitiveMode) -> GfxResult<()> {
        self.check_can_mutate()?;
        if self.is_specifying_scene {
            match mode {
                PrimitiveMode::Polygon | PrimitiveMode::Triangles | PrimitiveMode::AreaLight => {}
                _ => return Err(GfxError::InvalidOperation("only polygon, triangles, or area_light are valid inside scene specification".into())),
            }
        }
        self.assembler.begin(mode);
        Ok(())
    }

    /// Appends a homogeneous vertex to the open assembly. Outside scene
    /// specification it is transformed by PVM and perspective-divided on
    /// insertion; inside scene specification it is stored verbatim.
    pub fn vertex4f(&mut self, x: f32, y: f32, z: f32, w: f32) -> GfxResult<()> {
        if !self.assembler.is_assembling() {
            return Err(GfxError::InvalidOperation("vertex() called outside begin/end".into()));
        }
        let v = Vec4::new(x, y, z, w);
        let stored = if self.is_specifying_scene { v } else { perspective_divide(self.pvm_cache.transform(v)) };
        self.assembler.push_vertex(stored);
        Ok(())
    }

    /// `vertex4f(x, y, z, 1.0)`.
    pub fn vertex3f(&mut self, x: f32, y: f32, z: f32) -> GfxResult<()> {
        self.vertex4f(x, y, z, 1.0)
    }

    /// `vertex4f(x, y, 0.0, 1.0)`.
    pub fn vertex2f(&mut self, x: f32, y: f32) -> GfxResult<()> {
        self.vertex4f(x, y, 0.0, 1.0)
    }

    /// Closes the open assembly, either appending to the scene (while
    /// specifying one) or flushing it through the rasterizer dispatch
    /// table.
    pub fn end(&mut self) -> GfxResult<()> {
        if !self.assembler.is_assembling() {
            return Err(GfxError::InvalidOperation("end() called while idle".into()));
        }
        let (mode, verts) = self.assembler.end();

        if self.is_specifying_scene {
            match mode {
                PrimitiveMode::AreaLight => {
                    if verts.len() != 3 {
                        return Err(GfxError::InvalidOperation("area_light requires exactly 3 vertices".into()));
                    }
                    self.scene.lights.push(Light::area(verts[0].xyz(), verts[1].xyz(), verts[2].xyz(), self.draw_color, 1.0, 0.0, 0.0));
                    Ok(())
                }
                PrimitiveMode::Polygon | PrimitiveMode::Triangles if verts.len() == 3 => {
                    self.scene.primitives.push(Primitive::triangle(
                        verts[0].xyz(),
                        verts[1].xyz(),
                        verts[2].xyz(),
                        (0.0, 0.0),
                        (0.0, 0.0),
                        (0.0, 0.0),
                        self.current_material.clone(),
                    ));
                    Ok(())
                }
                _ => Err(GfxError::InvalidOperation("scene specification accepts only 3-vertex polygon/triangles or area_light".into())),
            }
        } else {
            let screen_verts: Vec<Vec3> = verts.iter().map(|v| v.xyz()).collect();
            raster::dispatch(&mut self.framebuffer, mode, self.area_mode, &screen_verts, self.depth_test, self.draw_color, self.point_size as i64);
            Ok(())
        }
    }

    /// Rasterizes a circle of object-space radius `r`, scaled on screen by
    /// `sqrt(|det|)` of the PVM's upper-left 2x2 block.
    pub fn circle(&mut self, x: f32, y: f32, z: f32, r: f32) -> GfxResult<()> {
        self.check_can_mutate()?;
        if r <= 0.0 {
            return Err(GfxError::InvalidValue("circle radius must be positive".into()));
        }
        let center = perspective_divide(self.pvm_cache.transform(Vec4::new(x, y, z, 1.0)));
        let det = self.pvm_cache.get(0, 0) * self.pvm_cache.get(1, 1) - self.pvm_cache.get(1, 0) * self.pvm_cache.get(0, 1);
        let radius = (r * det.abs().sqrt()).round() as i64;
        let cx = center.x.round() as i64;
        let cy = center.y.round() as i64;
        match self.area_mode {
            AreaMode::Point => {
                for (dx, dy) in primitives::circle_outline_points(radius) {
                    primitives::point_splat(&mut self.framebuffer, cx + dx, cy + dy, center.z, self.point_size as i64, self.depth_test, self.draw_color);
                }
            }
            AreaMode::Line => primitives::circle_outline(&mut self.framebuffer, cx, cy, radius, center.z, self.depth_test, self.draw_color),
            AreaMode::Fill => primitives::circle_fill(&mut self.framebuffer, cx, cy, radius, center.z, self.depth_test, self.draw_color),
        }
        Ok(())
    }

    /// Rasterizes a 40-vertex ellipse polyline.
    pub fn ellipse(&mut self, x: f32, y: f32, z: f32, a: f32, b: f32) -> GfxResult<()> {
        self.check_can_mutate()?;
        if a <= 0.0 || b <= 0.0 {
            return Err(GfxError::InvalidValue("ellipse semi-axes must be positive".into()));
        }
        let mut local = primitives::ellipse_polyline(a, b);
        if self.area_mode == AreaMode::Fill {
            local.push((0.0, 0.0));
        }
        self.rasterize_polyline(x, y, z, &local, true);
        Ok(())
    }

    /// Rasterizes an arc polyline from `from` to `to` radians.
    pub fn arc(&mut self, x: f32, y: f32, z: f32, r: f32, from: f32, to: f32) -> GfxResult<()> {
        self.check_can_mutate()?;
        if r <= 0.0 {
            return Err(GfxError::InvalidValue("arc radius must be positive".into()));
        }
        let closed = self.area_mode == AreaMode::Fill;
        let mut local = primitives::arc_polyline(r, r, from, to);
        if closed {
            local.push((0.0, 0.0));
        }
        self.rasterize_polyline(x, y, z, &local, closed);
        Ok(())
    }

    fn rasterize_polyline(&mut self, x: f32, y: f32, z: f32, local: &[(f32, f32)], closed: bool) {
        let screen: Vec<Vec3> = local
            .iter()
            .map(|(ox, oy)| perspective_divide(self.pvm_cache.transform(Vec4::new(x + ox, y + oy, z, 1.0))).xyz())
            .collect();
        match self.area_mode {
            AreaMode::Point => {
                for v in &screen {
                    primitives::point_splat(&mut self.framebuffer, v.x.round() as i64, v.y.round() as i64, v.z, self.point_size as i64, self.depth_test, self.draw_color);
                }
            }
            AreaMode::Line => {
                let n = screen.len();
                let edges = if closed { n } else { n.saturating_sub(1) };
                for i in 0..edges {
                    let a = screen[i];
                    let b = screen[(i + 1) % n];
                    primitives::bresenham_line(
                        &mut self.framebuffer,
                        a.x.round() as i64,
                        a.y.round() as i64,
                        b.x.round() as i64,
                        b.y.round() as i64,
                        a.z,
                        b.z,
                        self.depth_test,
                        self.draw_color,
                    );
                }
            }
            AreaMode::Fill => polygon::scanline_fill(&mut self.framebuffer, &screen, self.depth_test, self.draw_color),
        }
    }

    // ---- scene specification ------------------------------------------------

    /// Opens scene specification: subsequent `sphere`/triangle
    /// assemblies/lights append to the scene graph instead of rasterizing.
    pub fn begin_scene(&mut self) -> GfxResult<()> {
        self.check_can_mutate()?;
        if self.is_specifying_scene {
            return Err(GfxError::InvalidOperation("begin_scene() called while already specifying a scene".into()));
        }
        self.is_specifying_scene = true;
        self.scene.clear();
        Ok(())
    }

    /// Closes scene specification.
    pub fn end_scene(&mut self) -> GfxResult<()> {
        self.check_can_mutate()?;
        if !self.is_specifying_scene {
            return Err(GfxError::InvalidOperation("end_scene() called without begin_scene()".into()));
        }
        self.is_specifying_scene = false;
        Ok(())
    }

    /// Appends a sphere to the scene (only valid inside scene
    /// specification).
    pub fn sphere(&mut self, x: f32, y: f32, z: f32, r: f32) -> GfxResult<()> {
        self.check_can_mutate()?;
        if !self.is_specifying_scene {
            return Err(GfxError::InvalidOperation("sphere() is only valid inside scene specification".into()));
        }
        if r <= 0.0 {
            return Err(GfxError::InvalidValue("sphere radius must be positive".into()));
        }
        self.scene.primitives.push(Primitive::Sphere { center: Vec3::new(x, y, z), radius: r, material: self.current_material.clone() });
        Ok(())
    }

    /// Sets the current plain material; subsequent `sphere`/triangle
    /// assemblies reference it.
    pub fn material(&mut self, r: f32, g: f32, b: f32, kd: f32, ks: f32, shine: f32, t: f32, ior: f32) -> GfxResult<()> {
        self.check_can_mutate()?;
        self.current_material = Rc::new(Material::Plain { color: Vec3::new(r, g, b), kd, ks, t, shine, ior });
        Ok(())
    }

    /// Sets the current material to an emissive (light-emitting) surface.
    pub fn emissive_material(&mut self, r: f32, g: f32, b: f32, c0: f32, c1: f32, c2: f32) -> GfxResult<()> {
        self.check_can_mutate()?;
        self.current_material = Rc::new(Material::Emissive { color: Vec3::new(r, g, b), c0, c1, c2 });
        Ok(())
    }

    /// Sets the current material to a texture-sampled one, decoding `path`
    /// via [`crate::texture::Image::load`].
    ///
    /// Not named among the distilled spec's entry points, but required by
    /// the `Textured` material variant the data model defines; added here
    /// the way `material`/`emissive_material` are specified.
    pub fn textured_material(&mut self, path: &str, kd: f32, ks: f32, shine: f32, t: f32, ior: f32) -> GfxResult<()> {
        self.check_can_mutate()?;
        let image = Rc::new(Image::load(path)?);
        self.current_material = Rc::new(Material::Textured { image, kd, ks, t, shine, ior });
        Ok(())
    }

    /// Appends a point light.
    pub fn point_light(&mut self, x: f32, y: f32, z: f32, r: f32, g: f32, b: f32) -> GfxResult<()> {
        self.check_can_mutate()?;
        self.scene.lights.push(Light::Point { position: Vec3::new(x, y, z), color: Vec3::new(r, g, b) });
        Ok(())
    }

    /// Appends a directional light. Not named among the distilled spec's
    /// entry points, but required by the `Directional` light variant the
    /// data model defines; added the way `point_light` is specified.
    pub fn directional_light(&mut self, dx: f32, dy: f32, dz: f32, r: f32, g: f32, b: f32) -> GfxResult<()> {
        self.check_can_mutate()?;
        self.scene.lights.push(Light::Directional { direction: Vec3::new(dx, dy, dz).normalize(), color: Vec3::new(r, g, b) });
        Ok(())
    }

    /// Binds a `width x height` RGB float environment map.
    pub fn environment_map(&mut self, width: u32, height: u32, rgb: &[f32]) -> GfxResult<()> {
        self.check_can_mutate()?;
        let image = Image::from_rgb_f32(width, height, rgb)?;
        self.environment_map = Some(Rc::new(image));
        Ok(())
    }

    /// Ray traces the scene into a fresh framebuffer, replacing the current
    /// one.
    pub fn ray_trace_scene(&mut self) -> GfxResult<()> {
        self.check_can_mutate()?;
        let pvm = self.pvm_cache;
        let model_view = self.model_view.top();
        let fb = raytrace::trace_scene(
            &self.scene,
            self.framebuffer.width(),
            self.framebuffer.height(),
            pvm,
            model_view,
            &self.raytrace_config,
            &self.aa_config,
            self.clear_color,
            self.environment_map.as_deref(),
            self.next_seed(),
        )?;
        self.framebuffer = fb;
        Ok(())
    }

    /// Rasterizes the scene's triangles (flat-shaded, no lighting) as a
    /// cheap preview. Spheres are not rasterizable in this simplified path
    /// and are skipped — projecting a sphere onto a screen-space conic is
    /// out of scope; use [`Self::ray_trace_scene`] for spheres.
    pub fn rasterize_scene(&mut self) -> GfxResult<()> {
        self.check_can_mutate()?;
        let pvm = self.pvm_cache;
        for prim in &self.scene.primitives {
            if let Primitive::Triangle { v0, v1, v2, material, .. } = prim {
                let screen: Vec<Vec3> = [*v0, *v1, *v2].iter().map(|v| perspective_divide(pvm.transform(v.to_point4())).xyz()).collect();
                let color = material.color((0.0, 0.0));
                raster::dispatch(&mut self.framebuffer, PrimitiveMode::Triangles, self.area_mode, &screen, self.depth_test, color, self.point_size as i64);
            }
        }
        Ok(())
    }

    fn next_seed(&mut self) -> u64 {
        self.rng_seed = self.rng_seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        self.rng_seed
    }
}

fn perspective_divide(v: Vec4) -> Vec4 {
    v.dehomogenize().to_point4()
}

/// A fixed-size pool of contexts and a reference to the current one. Only
/// one context is current at a time; destroying the current one is
/// refused.
#[derive(Default)]
pub struct ContextRegistry {
    slots: Vec<Option<Context>>,
    current: Option<usize>,
}

impl ContextRegistry {
    /// Builds an empty pool of [`MAX_CONTEXTS`] slots.
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(MAX_CONTEXTS);
        slots.resize_with(MAX_CONTEXTS, || None);
        Self { slots, current: None }
    }

    /// Allocates a context in the first free slot.
    pub fn create(&mut self, width: u32, height: u32) -> GfxResult<usize> {
        let ctx = Context::new(width, height)?;
        let slot = self.slots.iter().position(Option::is_none).ok_or(GfxError::OutOfResources)?;
        self.slots[slot] = Some(ctx);
        Ok(slot)
    }

    /// Destroys context `id`, refusing if it is current.
    pub fn destroy(&mut self, id: usize) -> GfxResult<()> {
        if self.current == Some(id) {
            return Err(GfxError::InvalidOperation("cannot destroy the current context".into()));
        }
        self.slot_mut(id)?;
        self.slots[id] = None;
        Ok(())
    }

    /// Makes context `id` current.
    pub fn set_active(&mut self, id: usize) -> GfxResult<()> {
        self.slot_mut(id)?;
        self.current = Some(id);
        Ok(())
    }

    /// The current context's id, if any.
    pub fn active_id(&self) -> Option<usize> {
        self.current
    }

    /// Read-only access to the current context.
    pub fn active(&self) -> Option<&Context> {
        self.current.and_then(|i| self.slots[i].as_ref())
    }

    /// Mutable access to the current context.
    pub fn active_mut(&mut self) -> Option<&mut Context> {
        self.current.and_then(move |i| self.slots[i].as_mut())
    }

    fn slot_mut(&mut self, id: usize) -> GfxResult<()> {
        match self.slots.get(id) {
            Some(Some(_)) => Ok(()),
            _ => Err(GfxError::InvalidValue("unknown context id".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_rejects_zero_dimensions() {
        assert!(Context::new(0, 10).is_err());
        assert!(Context::new(10, 0).is_err());
    }

    #[test]
    fn begin_while_assembling_is_invalid_operation() {
        let mut ctx = Context::new(4, 4).unwrap();
        ctx.begin(PrimitiveMode::Points).unwrap();
        let err = ctx.begin(PrimitiveMode::Points).unwrap_err();
        assert_eq!(err.code(), 3);
    }

    #[test]
    fn state_mutation_rejected_while_drawing() {
        let mut ctx = Context::new(4, 4).unwrap();
        ctx.begin(PrimitiveMode::Points).unwrap();
        assert_eq!(ctx.set_draw_color(1.0, 0.0, 0.0).unwrap_err().code(), 3);
        assert_eq!(ctx.push().unwrap_err().code(), 3);
    }

    #[test]
    fn single_red_pixel_scenario() {
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
    fn depth_occlusion_keeps_nearer_triangle() {
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

        assert_eq!(ctx.framebuffer().color_at(2, 2), Some(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(ctx.framebuffer().depth_at(2, 2), Some(0.5));
    }

    #[test]
    fn scene_specification_rejects_lines() {
        let mut ctx = Context::new(4, 4).unwrap();
        ctx.begin_scene().unwrap();
        assert_eq!(ctx.begin(PrimitiveMode::Lines).unwrap_err().code(), 3);
    }

    #[test]
    fn registry_refuses_to_destroy_current_context() {
        let mut reg = ContextRegistry::new();
        let id = reg.create(4, 4).unwrap();
        reg.set_active(id).unwrap();
        assert_eq!(reg.destroy(id).unwrap_err().code(), 3);
    }

    #[test]
    fn registry_exhausts_after_max_contexts() {
        let mut reg = ContextRegistry::new();
        for _ in 0..MAX_CONTEXTS {
            reg.create(1, 1).unwrap();
        }
        assert_eq!(reg.create(1, 1).unwrap_err().code(), 4);
    }
}
