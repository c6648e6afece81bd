//! Simulation and session configuration.
//!
//! Every field has a default taken from the reference scene, so a config file
//! only needs the values it changes:
//!
//! ```toml
//! num_particles = 4000
//! particle_radius = 0.02
//!
//! [simulator]
//! smoothing_radius = 0.04
//! density_reference = 20000.0
//! pressure_constant = 4.0
//! gravity = [0.0, -9.8, 0.0]
//! ```

use crate::error::ConfigError;
use glam::Vec3;
use serde::Deserialize;
use std::path::Path;

/// Physical parameters of the SPH solver.
///
/// Changing `smoothing_radius` on a live simulator re-derives the kernel
/// constants and re-sizes the spatial hash; use
/// [`FluidSimulator::set_smoothing_radius`](crate::FluidSimulator::set_smoothing_radius).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Interaction cutoff and spatial-hash cell size.
    pub smoothing_radius: f32,
    /// Rest density; particle density never drops below it.
    pub density_reference: f32,
    /// Stiffness of the linear equation of state.
    pub pressure_constant: f32,
    /// Viscosity coefficient.
    pub viscosity: f32,
    /// Uniform body acceleration.
    pub gravity: Vec3,
    /// Lower bound of the adaptive sub-step.
    pub min_time_step: f32,
    /// Speed clamp applied after velocity integration.
    pub max_velocity: f32,
    /// Acceleration magnitude clamp.
    pub max_acceleration: f32,
    /// Mass assigned to every particle.
    pub mass: f32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            smoothing_radius: 0.2,
            density_reference: 2000.0,
            pressure_constant: 20.0,
            viscosity: 0.005,
            gravity: Vec3::new(0.0, -9.8, 0.0),
            min_time_step: 1.0 / 100.0,
            max_velocity: 75.0,
            max_acceleration: 2000.0,
            mass: 1.0,
        }
    }
}

impl SimulatorConfig {
    /// Parameters of the "box, sphere and wall" scene.
    pub fn box_demo() -> Self {
        Self {
            smoothing_radius: 0.04,
            density_reference: 20000.0,
            pressure_constant: 4.0,
            viscosity: 0.01,
            max_velocity: 3.0,
            max_acceleration: 2000.0,
            ..Self::default()
        }
    }

    pub fn with_smoothing_radius(mut self, radius: f32) -> Self {
        self.smoothing_radius = radius;
        self
    }

    pub fn with_density_reference(mut self, density: f32) -> Self {
        self.density_reference = density;
        self
    }

    pub fn with_pressure_constant(mut self, k: f32) -> Self {
        self.pressure_constant = k;
        self
    }

    pub fn with_viscosity(mut self, viscosity: f32) -> Self {
        self.viscosity = viscosity;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_min_time_step(mut self, step: f32) -> Self {
        self.min_time_step = step;
        self
    }

    pub fn with_max_velocity(mut self, v: f32) -> Self {
        self.max_velocity = v;
        self
    }

    pub fn with_max_acceleration(mut self, a: f32) -> Self {
        self.max_acceleration = a;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    /// Reject values that would stall or blow up the solver.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("simulator.smoothing_radius", self.smoothing_radius)?;
        positive("simulator.density_reference", self.density_reference)?;
        positive("simulator.min_time_step", self.min_time_step)?;
        positive("simulator.max_velocity", self.max_velocity)?;
        positive("simulator.max_acceleration", self.max_acceleration)?;
        positive("simulator.mass", self.mass)?;
        non_negative("simulator.pressure_constant", self.pressure_constant)?;
        non_negative("simulator.viscosity", self.viscosity)?;
        if !self.gravity.is_finite() {
            return Err(ConfigError::Invalid {
                field: "simulator.gravity",
                reason: "must be finite".into(),
            });
        }
        Ok(())
    }
}

/// Settings of a [`FluidSession`](crate::FluidSession) outside the solver itself.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Target particle count.
    pub num_particles: usize,
    /// Particle radius used by the generator and for collisions.
    pub particle_radius: f32,
    /// Size handed to the renderer; collisions use half of it.
    pub particle_size: f32,
    /// Restitution for shapes without their own override.
    pub shape_restitution: f32,
    /// Simulated time advanced per frame.
    pub frame_time_step: f32,
    /// Origin of the particle generator.
    pub generator_origin: Vec3,
    /// Replay file to load instead of streaming particles.
    pub replay_file: Option<String>,
    /// Seed for generator jitter; random if absent.
    pub seed: Option<u64>,
    pub simulator: SimulatorConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let particle_radius = 0.02;
        Self {
            num_particles: 6000,
            particle_radius,
            particle_size: particle_radius * 2.0 * 2.0,
            shape_restitution: 0.999,
            frame_time_step: 1.0 / 100.0,
            generator_origin: Vec3::new(0.0, -0.5, 0.0),
            replay_file: None,
            seed: None,
            simulator: SimulatorConfig {
                smoothing_radius: particle_radius * 2.0,
                max_velocity: 3.0,
                ..SimulatorConfig::default()
            },
        }
    }
}

impl SessionConfig {
    /// Session settings of the "box, sphere and wall" scene.
    pub fn box_demo() -> Self {
        Self {
            particle_size: 0.08,
            simulator: SimulatorConfig::box_demo(),
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("particle_radius", self.particle_radius)?;
        positive("particle_size", self.particle_size)?;
        positive("frame_time_step", self.frame_time_step)?;
        non_negative("shape_restitution", self.shape_restitution)?;
        self.simulator.validate()
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be positive, got {}", value),
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must not be negative, got {}", value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_scene() {
        let sim = SimulatorConfig::default();
        assert_eq!(sim.smoothing_radius, 0.2);
        assert_eq!(sim.density_reference, 2000.0);
        assert_eq!(sim.gravity, Vec3::new(0.0, -9.8, 0.0));

        let session = SessionConfig::default();
        assert_eq!(session.simulator.smoothing_radius, 0.04);
        assert!((session.particle_size - 0.08).abs() < 1e-6);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SessionConfig::from_toml_str(
            r#"
            num_particles = 1200
            seed = 7

            [simulator]
            viscosity = 0.02
            gravity = [0.0, -1.0, 0.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.num_particles, 1200);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.simulator.viscosity, 0.02);
        assert_eq!(config.simulator.gravity, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(config.simulator.density_reference, 2000.0);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = SessionConfig::from_toml_str("particle_count = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_value_names_field() {
        let err = SessionConfig::from_toml_str("[simulator]\nsmoothing_radius = -1.0").unwrap_err();
        match err {
            ConfigError::Invalid { field, .. } => assert_eq!(field, "simulator.smoothing_radius"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
