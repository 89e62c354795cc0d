//! Tunable constants for the ray tracer and its anti-aliasing post-pass.
//!
//! These were hard-coded in the system this crate reimplements; grouping
//! them here keeps the algorithm free of magic numbers and leaves room for a
//! future FFI setter without touching `raytrace`.

/// Depth-of-field and recursion parameters for [`crate::raytrace::trace_scene`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayTraceConfig {
    /// Maximum recursion depth for reflection/refraction; rays deeper than
    /// this return the clear color.
    pub max_depth: u32,
    /// Whether depth-of-field sampling is active for primary rays.
    pub dof_enabled: bool,
    /// Aperture size used to jitter primary-ray origins, in pixels.
    pub aperture: f32,
    /// Distance beyond the focal point's natural depth, as a fraction.
    pub focal_length: f32,
    /// Number of jittered samples averaged per depth-of-field pixel.
    pub dof_samples: u32,
}

impl Default for RayTraceConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            dof_enabled: false,
            aperture: 256.0,
            focal_length: 900.0,
            dof_samples: 16,
        }
    }
}

/// Parameters for the adaptive anti-aliasing post-pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AaConfig {
    /// Whether the post-pass runs at all.
    pub enabled: bool,
    /// Minimum max-neighbor color distance that triggers resampling.
    pub threshold: f32,
    /// Sub-pixel offsets sampled when a pixel is resampled.
    pub offsets: [(f32, f32); 4],
}

impl Default for AaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.2,
            offsets: [(0.25, 0.25), (0.25, -0.25), (-0.25, 0.25), (-0.25, -0.25)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raytrace_defaults_match_original_constants() {
        let cfg = RayTraceConfig::default();
        assert_eq!(cfg.max_depth, 8);
        assert_eq!(cfg.aperture, 256.0);
        assert_eq!(cfg.focal_length, 900.0);
        assert_eq!(cfg.dof_samples, 16);
        assert!(!cfg.dof_enabled);
    }

    #[test]
    fn aa_defaults_match_original_threshold() {
        let cfg = AaConfig::default();
        assert_eq!(cfg.threshold, 0.2);
        assert_eq!(cfg.offsets.len(), 4);
    }
}
