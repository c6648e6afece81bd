//! # sphfluid - real-time SPH fluid core
//!
//! Smoothed-particle hydrodynamics on the CPU with a spatial hash for
//! neighbor search, adaptive sub-stepping and signed-distance collisions.
//! Rendering is left to the host: every frame the particle buffers are handed
//! to a [`RenderConsumer`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use sphfluid::prelude::*;
//!
//! fn main() -> Result<(), SessionError> {
//!     let mut session = FluidSession::new(SessionConfig::box_demo())?;
//!
//!     BoxContainer::new(session.collisions_mut(), Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 0.0, 1.0));
//!     session.collisions_mut().add_sphere(Vec3::new(0.0, -0.7, 0.0), 0.2);
//!
//!     pollster::block_on(session.start(&FsLoader::new("assets")))?;
//!     for _ in 0..600 {
//!         session.step();
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Particles
//!
//! Particle state lives in a [`ParticleBuffers`]: flat `f32` position and
//! velocity arrays, three floats per particle, ready to upload as vertex
//! data. The [`ParticleGenerator`] owns them and decides how many are live.
//!
//! ### Solver
//!
//! [`FluidSimulator::update`] advances the live particles by a frame's worth
//! of time, split into sub-steps small enough for the fastest particle:
//!
//! | Stage | What happens |
//! |-------|--------------|
//! | Neighbors | particles are binned into a [`SpatialHash`] with cell size `h` |
//! | Density | poly6 kernel sum over neighbors, then `p = k (rho - rho0)` |
//! | Forces | spiky pressure gradient, viscosity Laplacian and gravity |
//! | Integrate | symplectic Euler with velocity and acceleration clamps |
//!
//! ### Collisions
//!
//! A [`CollisionWorld`] holds analytic SDF shapes (box, sphere, plane, cut
//! hollow sphere, cylinder), sampled SDF volumes for arbitrary meshes and
//! heightmap terrain. Colliding particles are pushed out along the surface
//! normal and their velocity is reflected with the shape's restitution.
//!
//! ### Assets
//!
//! Mesh SDFs, heightmaps and replay files are fetched through an
//! [`AssetLoader`]; [`FsLoader`] reads from disk, [`MemoryLoader`] serves
//! bytes registered up front.

pub mod assets;
pub mod buffers;
pub mod collision;
pub mod config;
pub mod container;
pub mod error;
pub mod generator;
pub mod kernels;
pub mod mesh;
pub mod sdf;
pub mod session;
pub mod shapes;
pub mod simulator;
pub mod spatial;
pub mod time;

pub use assets::{AssetLoader, FsLoader, MemoryLoader};
pub use buffers::ParticleBuffers;
pub use bytemuck;
pub use collision::{CollisionWorld, ShapeId};
pub use config::{SessionConfig, SimulatorConfig};
pub use container::BoxContainer;
pub use error::{AssetError, ConfigError, ReplayError, SdfParseError, SessionError};
pub use generator::{GeneratorMode, ParticleGenerator, ReplayParseMode};
pub use glam::{Quat, Vec2, Vec3};
pub use kernels::KernelConstants;
pub use mesh::ShapeMesh;
pub use sdf::{Heightmap, SdfVolume};
pub use session::{FluidSession, FrameView, RenderConsumer};
pub use shapes::{CollisionShape, HeightmapSource, Rotation, ShapeDesc, ShapeKind, ShapeSource};
pub use simulator::{FluidSimulator, ParticleState, StepStats};
pub use spatial::SpatialHash;
pub use time::Time;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use sphfluid::prelude::*;
/// ```
pub mod prelude {
    pub use crate::assets::{AssetLoader, FsLoader, MemoryLoader};
    pub use crate::buffers::ParticleBuffers;
    pub use crate::collision::{CollisionWorld, ShapeId};
    pub use crate::config::{SessionConfig, SimulatorConfig};
    pub use crate::container::BoxContainer;
    pub use crate::error::SessionError;
    pub use crate::generator::{GeneratorMode, ParticleGenerator};
    pub use crate::session::{FluidSession, FrameView, RenderConsumer};
    pub use crate::shapes::{Rotation, ShapeDesc};
    pub use crate::simulator::{FluidSimulator, StepStats};
    pub use crate::time::Time;
    pub use crate::{Quat, Vec2, Vec3};
}
