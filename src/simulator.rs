//! Weakly-compressible SPH solver.
//!
//! One call to [`FluidSimulator::update`] advances the live particle prefix by
//! `dt` using as many sub-steps as stability requires:
//!
//! 1. rebuild the [`SpatialHash`] over the live particles
//! 2. density (poly6) floored at the rest density, linear equation of state
//! 3. acceleration: pressure (spiky gradient) + viscosity (laplacian) + gravity,
//!    clamped to `max_acceleration`
//! 4. step size from the velocity, acceleration and speed-of-sound bounds,
//!    never below `min_time_step`
//! 5. semi-implicit Euler with a speed clamp
//!
//! Nothing here returns an error. Degenerate states (no neighbors, zero
//! particles) are absorbed by the density floor and the clamps.

use crate::buffers::ParticleBuffers;
use crate::config::SimulatorConfig;
use crate::kernels::KernelConstants;
use crate::spatial::SpatialHash;
use glam::Vec3;
use tracing::{debug, trace};

/// Per-particle solver state, stored as parallel arrays.
#[derive(Debug, Clone, Default)]
pub struct ParticleState {
    pub mass: Vec<f32>,
    pub density: Vec<f32>,
    pub pressure: Vec<f32>,
    pub acceleration: Vec<Vec3>,
}

impl ParticleState {
    fn len(&self) -> usize {
        self.mass.len()
    }

    fn grow_to(&mut self, count: usize, mass: f32) {
        if count <= self.len() {
            return;
        }
        self.mass.resize(count, mass);
        self.density.resize(count, 0.0);
        self.pressure.resize(count, 0.0);
        self.acceleration.resize(count, Vec3::ZERO);
    }
}

/// Summary of one [`FluidSimulator::update`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepStats {
    /// Number of sub-steps taken.
    pub substeps: u32,
    /// Size of the last (possibly shortened) sub-step.
    pub last_step: f32,
    /// Largest particle speed after the update.
    pub max_speed: f32,
    /// Largest particle density seen in the last sub-step.
    pub max_density: f32,
}

/// SPH fluid simulator over externally allocated [`ParticleBuffers`].
#[derive(Debug, Clone)]
pub struct FluidSimulator {
    config: SimulatorConfig,
    kernels: KernelConstants,
    hash: SpatialHash,
    particles: ParticleState,
    num_max_particles: usize,
    /// Size of the simulated live prefix. Clamped to the bound capacity.
    pub current_num_particles: usize,
}

impl FluidSimulator {
    /// Create a simulator with no particle data bound.
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            kernels: KernelConstants::new(config.smoothing_radius),
            hash: SpatialHash::new(config.smoothing_radius, 0),
            particles: ParticleState::default(),
            num_max_particles: 0,
            current_num_particles: 0,
            config,
        }
    }

    /// Create a simulator already bound to `buffers`, simulating all of them.
    pub fn with_particle_data(config: SimulatorConfig, buffers: &ParticleBuffers) -> Self {
        let mut sim = Self::new(config);
        sim.set_particle_data(buffers);
        sim.current_num_particles = sim.num_max_particles;
        sim
    }

    #[inline]
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Replace every parameter. A new smoothing radius rebuilds kernels and hash.
    pub fn set_config(&mut self, config: SimulatorConfig) {
        let radius_changed = config.smoothing_radius != self.config.smoothing_radius;
        let mass_changed = config.mass != self.config.mass;
        self.config = config;
        if radius_changed {
            self.set_smoothing_radius(config.smoothing_radius);
        }
        if mass_changed {
            self.set_mass(config.mass);
        }
    }

    #[inline]
    pub fn smoothing_radius(&self) -> f32 {
        self.config.smoothing_radius
    }

    /// Change the smoothing radius, re-deriving the kernel constants and
    /// re-sizing the spatial hash.
    pub fn set_smoothing_radius(&mut self, radius: f32) {
        self.config.smoothing_radius = radius;
        self.kernels = KernelConstants::new(radius);
        self.hash = SpatialHash::new(radius, self.num_max_particles);
        debug!(radius, "smoothing radius changed");
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.config.mass
    }

    /// Set the mass of every particle.
    pub fn set_mass(&mut self, mass: f32) {
        self.config.mass = mass;
        self.particles.mass.fill(mass);
    }

    pub fn set_density_reference(&mut self, density: f32) {
        self.config.density_reference = density;
    }

    pub fn set_pressure_constant(&mut self, k: f32) {
        self.config.pressure_constant = k;
    }

    pub fn set_viscosity(&mut self, viscosity: f32) {
        self.config.viscosity = viscosity;
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
    }

    pub fn set_min_time_step(&mut self, step: f32) {
        self.config.min_time_step = step;
    }

    pub fn set_max_velocity(&mut self, v: f32) {
        self.config.max_velocity = v;
    }

    pub fn set_max_acceleration(&mut self, a: f32) {
        self.config.max_acceleration = a;
    }

    /// Capacity of the bound buffers.
    #[inline]
    pub fn num_max_particles(&self) -> usize {
        self.num_max_particles
    }

    /// Per-particle density, pressure, acceleration and mass.
    #[inline]
    pub fn particles(&self) -> &ParticleState {
        &self.particles
    }

    /// Bind a buffer set.
    ///
    /// Derives the particle capacity, grows the per-particle arrays (existing
    /// entries keep their values) and re-sizes the spatial hash.
    pub fn set_particle_data(&mut self, buffers: &ParticleBuffers) {
        self.num_max_particles = buffers.capacity();
        self.particles.grow_to(self.num_max_particles, self.config.mass);
        self.hash = SpatialHash::new(self.config.smoothing_radius, self.num_max_particles);
        self.current_num_particles = self.current_num_particles.min(self.num_max_particles);
        debug!(capacity = self.num_max_particles, "particle data bound");
    }

    /// Advance the live particles by `delta_time` seconds.
    ///
    /// Buffers whose capacity differs from the bound one (the generator grew
    /// them) are re-bound first.
    pub fn update(&mut self, buffers: &mut ParticleBuffers, delta_time: f32) -> StepStats {
        if buffers.capacity() != self.num_max_particles {
            self.set_particle_data(buffers);
        }
        let count = self.current_num_particles.min(self.num_max_particles);
        let mut stats = StepStats::default();
        let mut time_left = delta_time;

        while time_left > 0.0 {
            let (positions, velocities) = buffers.split_mut();
            self.hash.build(positions, count);
            stats.max_density = self.compute_density_and_pressure(positions, count);
            self.compute_acceleration(positions, velocities, count);

            let mut time_step = self.calculate_time_step(velocities, count);
            time_left -= time_step;
            if time_left < 0.0 {
                time_step += time_left;
                time_left = 0.0;
            }

            stats.max_speed = self.integrate(positions, velocities, count, time_step);
            stats.substeps += 1;
            stats.last_step = time_step;
        }

        trace!(
            substeps = stats.substeps,
            max_speed = stats.max_speed,
            max_density = stats.max_density,
            "sph update"
        );
        stats
    }

    /// Release the per-particle arrays and the hash.
    pub fn dispose(&mut self) {
        self.particles = ParticleState::default();
        self.hash = SpatialHash::new(self.config.smoothing_radius, 0);
        self.num_max_particles = 0;
        self.current_num_particles = 0;
    }

    fn compute_density_and_pressure(&mut self, positions: &[Vec3], count: usize) -> f32 {
        let k = self.kernels;
        let density_ref = self.config.density_reference;
        let mut max_density = 0.0f32;

        for a in 0..count {
            let pa = positions[a];
            let mut density = 0.0;

            for &b in self.hash.query(positions, a, k.radius) {
                let r2 = (pa - positions[b]).length_squared();
                if r2 < k.radius_sq {
                    density += k.poly6(r2);
                }
            }

            let density = density.max(density_ref);
            self.particles.density[a] = density;
            self.particles.pressure[a] = self.config.pressure_constant * (density - density_ref);
            max_density = max_density.max(density);
        }

        max_density
    }

    fn compute_acceleration(&mut self, positions: &[Vec3], velocities: &[Vec3], count: usize) {
        let k = self.kernels;
        let state = &mut self.particles;

        for a in 0..count {
            let pa = positions[a];
            let va = velocities[a];
            let (mass_a, density_a, pressure_a) = (state.mass[a], state.density[a], state.pressure[a]);

            let mut pressure_accel = Vec3::ZERO;
            let mut viscosity_accel = Vec3::ZERO;

            for &b in self.hash.query(positions, a, k.radius) {
                let diff = pa - positions[b];
                let r2 = diff.length_squared();
                let r = r2.sqrt();
                if r <= 0.0 || r2 >= k.radius_sq {
                    continue;
                }

                let dir = diff / r;
                let density_b = state.density[b];
                let mass_ratio = state.mass[b] / mass_a;

                let fp = k.spiky_gradient(r)
                    * ((pressure_a + state.pressure[b]) / (2.0 * density_a * density_b))
                    * mass_ratio;
                pressure_accel -= fp * dir;

                let fv = k.viscosity_laplacian(r) * (1.0 / density_b) * mass_ratio * self.config.viscosity;
                viscosity_accel += fv * (velocities[b] - va);
            }

            let accel = pressure_accel + viscosity_accel + self.config.gravity;
            state.acceleration[a] = clamp_magnitude(accel, self.config.max_acceleration);
        }
    }

    fn calculate_time_step(&self, velocities: &[Vec3], count: usize) -> f32 {
        let mut max_vel_sq = 0.0f32;
        let mut max_acc_sq = 0.0f32;
        let mut max_sound_sq = 0.0f32;

        for a in 0..count {
            let density = self.particles.density[a];
            let sound_sq = if density < 0.00001 {
                0.0
            } else {
                self.particles.pressure[a] / density
            };
            max_vel_sq = max_vel_sq.max(velocities[a].length_squared());
            max_acc_sq = max_acc_sq.max(self.particles.acceleration[a].length_squared());
            max_sound_sq = max_sound_sq.max(sound_sq);
        }

        let h = self.config.smoothing_radius;
        let vel_step = 0.4 * h / max_vel_sq.sqrt().max(1.0);
        let acc_step = 0.4 * (h / max_acc_sq.sqrt()).sqrt();
        let sound_step = h / max_sound_sq.sqrt();

        // Zero maxima give +inf bounds, which `min` discards.
        vel_step.min(acc_step).min(sound_step).max(self.config.min_time_step)
    }

    fn integrate(&self, positions: &mut [Vec3], velocities: &mut [Vec3], count: usize, dt: f32) -> f32 {
        let mut max_speed = 0.0f32;
        for a in 0..count {
            let v = clamp_magnitude(
                velocities[a] + self.particles.acceleration[a] * dt,
                self.config.max_velocity,
            );
            velocities[a] = v;
            positions[a] += dt * v;
            max_speed = max_speed.max(v.length());
        }
        max_speed
    }
}

/// Scale `v` down to `max` length if it is longer; direction is kept.
#[inline]
fn clamp_magnitude(v: Vec3, max: f32) -> Vec3 {
    let mag = v.length();
    if mag > max {
        v / mag * max
    } else {
        v
    }
}
