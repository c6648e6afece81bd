//! SPH smoothing kernels (Müller et al. 2003).
//!
//! | Kernel | Used for | Constant |
//! |--------|----------|----------|
//! | poly6 | density | `315 / (64 π h⁹)` |
//! | spiky gradient | pressure force | `-45 / (π h⁶)` |
//! | viscosity laplacian | viscosity force | `45 / (π h⁶)` |

use std::f32::consts::PI;

/// Precomputed kernel constants for one smoothing radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelConstants {
    /// Smoothing radius `h`.
    pub radius: f32,
    /// `h²`, compared against squared distances.
    pub radius_sq: f32,
    pub poly6: f32,
    pub spiky: f32,
    pub viscosity: f32,
}

impl KernelConstants {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            radius_sq: radius * radius,
            poly6: 315.0 / (64.0 * PI * radius.powi(9)),
            spiky: -45.0 / (PI * radius.powi(6)),
            viscosity: 45.0 / (PI * radius.powi(6)),
        }
    }

    /// Density contribution of a neighbor at squared distance `r2` (< h²).
    #[inline]
    pub fn poly6(&self, r2: f32) -> f32 {
        let d = self.radius_sq - r2;
        self.poly6 * d * d * d
    }

    /// Spiky gradient magnitude at distance `r` (< h). Negative.
    #[inline]
    pub fn spiky_gradient(&self, r: f32) -> f32 {
        let d = self.radius - r;
        self.spiky * d * d
    }

    /// Viscosity laplacian at distance `r` (< h).
    #[inline]
    pub fn viscosity_laplacian(&self, r: f32) -> f32 {
        self.viscosity * (self.radius - r)
    }
}
