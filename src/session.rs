//! Per-frame orchestration of generator, simulator, collisions and renderer.
//!
//! A [`FluidSession`] is owned by the host and stepped once per rendered
//! frame:
//!
//! 1. the generator reveals the next cross-section if there is room
//! 2. the simulator advances the live particles by the frame step
//! 3. collisions are resolved with half the particle size as radius
//! 4. the buffers are handed to the [`RenderConsumer`]
//!
//! Steps 2 and 3 are skipped while paused; the renderer still gets a frame.
//!
//! ```ignore
//! let mut session = FluidSession::new(SessionConfig::box_demo())?
//!     .with_renderer(|frame: FrameView<'_>| upload(frame.position_bytes()));
//! BoxContainer::new(session.collisions_mut(), Vec3::splat(-1.0), Vec3::new(1.0, 0.0, 1.0));
//! session.start(&FsLoader::new("assets")).await?;
//!
//! loop {
//!     session.step();
//! }
//! ```

use crate::assets::AssetLoader;
use crate::collision::CollisionWorld;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::generator::{GeneratorMode, ParticleGenerator};
use crate::simulator::{FluidSimulator, StepStats};
use crate::time::Time;
use tracing::{debug, info};

/// Particle data handed to the renderer each frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    /// Flat positions of all allocated particles; only the first
    /// `num_particles` are live.
    pub positions: &'a [f32],
    pub velocities: &'a [f32],
    pub num_particles: usize,
    pub particle_size: f32,
}

impl<'a> FrameView<'a> {
    /// Bytes of the live positions.
    pub fn position_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(&self.positions[..self.live_len()])
    }

    /// Bytes of the live velocities.
    pub fn velocity_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(&self.velocities[..self.live_len()])
    }

    fn live_len(&self) -> usize {
        (self.num_particles * 3).min(self.positions.len()).min(self.velocities.len())
    }
}

/// Receives particle data after every frame.
pub trait RenderConsumer {
    fn upload(&mut self, frame: FrameView<'_>);
}

impl<F: FnMut(FrameView<'_>)> RenderConsumer for F {
    fn upload(&mut self, frame: FrameView<'_>) {
        self(frame)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Configured,
    Running,
    Disposed,
}

/// A running fluid scene.
pub struct FluidSession {
    config: SessionConfig,
    simulator: FluidSimulator,
    generator: ParticleGenerator,
    collisions: CollisionWorld,
    time: Time,
    renderer: Option<Box<dyn RenderConsumer>>,
    state: SessionState,
    num_particles: usize,
    last_stats: StepStats,
}

impl std::fmt::Debug for FluidSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FluidSession")
            .field("state", &self.state)
            .field("num_particles", &self.num_particles)
            .field("live", &self.live_particles())
            .field("shapes", &self.collisions.len())
            .field("has_renderer", &self.renderer.is_some())
            .finish()
    }
}

impl FluidSession {
    /// Validate `config` and set up the parts. Nothing is loaded yet.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;

        let mode = match &config.replay_file {
            Some(file) => GeneratorMode::replay(file.clone()),
            None => GeneratorMode::Stream,
        };
        let mut generator =
            ParticleGenerator::new(mode, config.particle_radius).with_position(config.generator_origin);
        if let Some(seed) = config.seed {
            generator = generator.with_seed(seed);
        }

        Ok(Self {
            simulator: FluidSimulator::new(config.simulator),
            generator,
            collisions: CollisionWorld::new(config.shape_restitution),
            time: Time::with_frame_step(config.frame_time_step),
            renderer: None,
            state: SessionState::Configured,
            num_particles: config.num_particles,
            last_stats: StepStats::default(),
            config,
        })
    }

    pub fn with_renderer(mut self, renderer: impl RenderConsumer + 'static) -> Self {
        self.set_renderer(renderer);
        self
    }

    pub fn set_renderer(&mut self, renderer: impl RenderConsumer + 'static) {
        self.renderer = Some(Box::new(renderer));
    }

    /// Load collision shapes and particles. Must be awaited before stepping.
    pub async fn start<L: AssetLoader + ?Sized>(&mut self, loader: &L) -> Result<(), SessionError> {
        if self.state != SessionState::Configured {
            return Err(SessionError::AlreadyStarted);
        }

        self.collisions.load(loader).await?;
        self.generator
            .generate_particles(loader, self.num_particles, true)
            .await?;

        if matches!(self.generator.mode(), GeneratorMode::Replay { .. }) {
            self.num_particles = self.generator.curr_num_particles();
        }
        self.simulator.set_particle_data(self.generator.buffers());
        self.state = SessionState::Running;

        info!(
            particles = self.num_particles,
            capacity = self.generator.buffers().capacity(),
            shapes = self.collisions.len(),
            "fluid session started"
        );
        Ok(())
    }

    /// Advance one rendered frame.
    ///
    /// Returns the simulator statistics, or `None` if the session is not
    /// running or is paused.
    pub fn step(&mut self) -> Option<StepStats> {
        if self.state != SessionState::Running {
            return None;
        }

        self.generator.advance();
        let live = self.live_particles();
        self.simulator.current_num_particles = live;

        let mut stats = None;
        if let Some(dt) = self.time.tick() {
            let buffers = self.generator.buffers_mut();
            let step = self.simulator.update(buffers, dt);
            self.collisions
                .resolve(buffers, live, self.config.particle_size / 2.0);
            self.last_stats = step;
            stats = Some(step);
        }

        if let Some(renderer) = self.renderer.as_mut() {
            let buffers = self.generator.buffers();
            renderer.upload(FrameView {
                positions: buffers.positions(),
                velocities: buffers.velocities(),
                num_particles: live,
                particle_size: self.config.particle_size,
            });
        }

        stats
    }

    /// Change the target particle count of a streaming session.
    ///
    /// Growing appends cross-sections behind the visible ones; shrinking
    /// only lowers the target. Replay sessions ignore this.
    pub fn set_num_particles(&mut self, num_particles: usize) {
        if matches!(self.generator.mode(), GeneratorMode::Replay { .. }) {
            return;
        }
        self.num_particles = num_particles;
        if self.state == SessionState::Running {
            self.generator.generate_stream(num_particles, false);
        }
        debug!(num_particles, "particle target changed");
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.time.set_paused(paused);
    }

    pub fn toggle_pause(&mut self) {
        self.time.toggle_pause();
    }

    pub fn is_paused(&self) -> bool {
        self.time.is_paused()
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn is_disposed(&self) -> bool {
        self.state == SessionState::Disposed
    }

    /// Particles simulated and drawn this frame.
    pub fn live_particles(&self) -> usize {
        self.num_particles.min(self.generator.curr_num_particles())
    }

    /// Target particle count.
    pub fn num_particles(&self) -> usize {
        self.num_particles
    }

    pub fn last_stats(&self) -> StepStats {
        self.last_stats
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn simulator(&self) -> &FluidSimulator {
        &self.simulator
    }

    pub fn simulator_mut(&mut self) -> &mut FluidSimulator {
        &mut self.simulator
    }

    pub fn generator(&self) -> &ParticleGenerator {
        &self.generator
    }

    pub fn collisions(&self) -> &CollisionWorld {
        &self.collisions
    }

    /// Shapes added here before [`start`](Self::start) are loaded by it;
    /// later ones need [`CollisionWorld::load`].
    pub fn collisions_mut(&mut self) -> &mut CollisionWorld {
        &mut self.collisions
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    /// Detach the renderer and release shapes, particles and solver state.
    ///
    /// Later calls to [`step`](Self::step) do nothing.
    pub fn dispose(&mut self) {
        if self.state == SessionState::Disposed {
            return;
        }
        self.renderer = None;
        self.collisions.dispose();
        self.simulator.dispose();
        self.generator.dispose();
        self.state = SessionState::Disposed;
        info!(frames = self.time.frame(), "fluid session disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryLoader;
    use glam::Vec3;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn small_config() -> SessionConfig {
        SessionConfig {
            num_particles: 400,
            seed: Some(3),
            ..SessionConfig::box_demo()
        }
    }

    #[test]
    fn test_step_before_start_does_nothing() {
        let mut session = FluidSession::new(small_config()).unwrap();
        assert_eq!(session.step(), None);
        assert_eq!(session.time().frame(), 0);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let loader = MemoryLoader::new();
        let mut session = FluidSession::new(small_config()).unwrap();
        pollster::block_on(session.start(&loader)).unwrap();
        let err = pollster::block_on(session.start(&loader)).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyStarted));
    }

    #[test]
    fn test_first_step_reveals_a_cross_section_and_uploads() {
        let frames = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&frames);

        let mut session = FluidSession::new(small_config())
            .unwrap()
            .with_renderer(move |frame: FrameView<'_>| {
                sink.borrow_mut().push((frame.num_particles, frame.position_bytes().len()));
            });
        pollster::block_on(session.start(&MemoryLoader::new())).unwrap();

        let stats = session.step().unwrap();
        assert!(stats.substeps >= 1);

        let cs = session.generator().num_cross_section();
        assert_eq!(session.live_particles(), cs);
        assert_eq!(frames.borrow().as_slice(), &[(cs, cs * 12)]);
    }

    #[test]
    fn test_paused_session_keeps_particles_still() {
        let mut session = FluidSession::new(small_config()).unwrap();
        pollster::block_on(session.start(&MemoryLoader::new())).unwrap();
        session.step();

        session.set_paused(true);
        let before = session.generator().buffers().clone();
        assert_eq!(session.step(), None);
        assert_eq!(session.generator().buffers(), &before);
    }

    #[test]
    fn test_replay_session_uses_every_particle() {
        let loader = MemoryLoader::new().with_text("p.txt", "h\na,0,0,0\nb,0.1,0,0\nc,0.2,0,0\n");
        let config = SessionConfig {
            replay_file: Some("p.txt".into()),
            ..small_config()
        };
        let mut session = FluidSession::new(config).unwrap();
        pollster::block_on(session.start(&loader)).unwrap();
        assert_eq!(session.num_particles(), 3);
        assert_eq!(session.live_particles(), 3);
    }

    #[test]
    fn test_floor_collision_keeps_fluid_above_it() {
        let mut session = FluidSession::new(small_config()).unwrap();
        session.collisions_mut().add_plane(Vec3::Y, 1.0);
        pollster::block_on(session.start(&MemoryLoader::new())).unwrap();

        for _ in 0..50 {
            session.step();
        }
        let radius = session.config().particle_size / 2.0;
        let live = session.live_particles();
        for p in &session.generator().buffers().positions_vec3()[..live] {
            assert!(p.y >= -1.0 + radius - 1e-3, "particle below floor: {:?}", p);
        }
    }

    #[test]
    fn test_dispose_releases_everything() {
        let mut session = FluidSession::new(small_config()).unwrap();
        session.collisions_mut().add_sphere(Vec3::ZERO, 0.1);
        pollster::block_on(session.start(&MemoryLoader::new())).unwrap();
        session.step();

        session.dispose();
        assert!(session.is_disposed());
        assert!(session.collisions().is_empty());
        assert_eq!(session.generator().buffers().capacity(), 0);
        assert_eq!(session.step(), None);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SessionConfig {
            particle_radius: 0.0,
            ..SessionConfig::default()
        };
        assert!(matches!(FluidSession::new(config), Err(SessionError::Config(_))));
    }
}
