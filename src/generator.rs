//! Particle sources for the fluid.
//!
//! A [`ParticleGenerator`] owns the [`ParticleBuffers`] the simulator works
//! on. It fills them in one of two ways:
//!
//! | Mode | Description |
//! |------|-------------|
//! | [`GeneratorMode::Stream`] | stacked hemispherical cross-sections, revealed one per frame as the fluid moves away |
//! | [`GeneratorMode::Replay`] | positions read from a `label,x,y,z` table, all visible at once |
//!
//! # Example
//!
//! ```ignore
//! let mut generator = ParticleGenerator::new(GeneratorMode::Stream, 0.02)
//!     .with_position(Vec3::new(0.0, -0.5, 0.0))
//!     .with_seed(7);
//! generator.generate_particles(&loader, 6000, true).await?;
//!
//! // every frame
//! generator.advance();
//! let live = generator.curr_num_particles();
//! ```

use crate::assets::AssetLoader;
use crate::buffers::ParticleBuffers;
use crate::error::{AssetError, ReplayError};
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;
use tracing::{debug, info, warn};

/// Lattice samples per cross-section axis.
const DIM_X: usize = 12;
const DIM_Y: usize = 12;
/// Height of the first lattice row, before the generator offset.
const BASE_Y: f32 = -0.5;
/// Depth of the cross-section plane, before the generator offset.
const BASE_Z: f32 = 0.49;

/// How malformed replay rows are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplayParseMode {
    /// Skip quoted or short rows silently.
    ///
    /// A coordinate must parse as a whole `f32`; anything else, including a
    /// numeric prefix with trailing text such as `1.5abc`, becomes NaN.
    #[default]
    Lenient,
    /// Fail on the first row that is not `label,x,y,z`.
    Strict,
}

/// Where particles come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorMode {
    /// Procedural stream of lattice cross-sections.
    Stream,
    /// Positions loaded from a replay table.
    ///
    /// # Fields
    ///
    /// - `file` - Asset name handed to the [`AssetLoader`]
    /// - `parse_mode` - Treatment of malformed rows
    Replay {
        file: String,
        parse_mode: ReplayParseMode,
    },
}

impl GeneratorMode {
    /// Lenient replay of `file`.
    pub fn replay(file: impl Into<String>) -> Self {
        Self::Replay {
            file: file.into(),
            parse_mode: ReplayParseMode::Lenient,
        }
    }
}

/// Produces particle positions and velocities and reveals them over time.
#[derive(Debug, Clone)]
pub struct ParticleGenerator {
    mode: GeneratorMode,
    buffers: ParticleBuffers,
    num_particles: usize,
    curr_num_particles: usize,
    num_cross_section: usize,
    rng: SmallRng,
    /// Particle radius; lattice spacing is twice this.
    pub particle_radius: f32,
    /// Offset added to every generated position.
    pub position: Vec3,
}

impl ParticleGenerator {
    pub fn new(mode: GeneratorMode, particle_radius: f32) -> Self {
        Self {
            mode,
            buffers: ParticleBuffers::default(),
            num_particles: 0,
            curr_num_particles: 0,
            num_cross_section: 0,
            rng: SmallRng::from_entropy(),
            particle_radius,
            position: Vec3::ZERO,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Make the jitter and initial velocities reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    #[inline]
    pub fn mode(&self) -> &GeneratorMode {
        &self.mode
    }

    /// Number of particles revealed to the simulation.
    #[inline]
    pub fn curr_num_particles(&self) -> usize {
        self.curr_num_particles
    }

    /// Number of particles generated so far.
    #[inline]
    pub fn num_particles(&self) -> usize {
        self.num_particles
    }

    /// Particles per cross-section (or the whole replay).
    #[inline]
    pub fn num_cross_section(&self) -> usize {
        self.num_cross_section
    }

    #[inline]
    pub fn buffers(&self) -> &ParticleBuffers {
        &self.buffers
    }

    #[inline]
    pub fn buffers_mut(&mut self) -> &mut ParticleBuffers {
        &mut self.buffers
    }

    /// Flat positions of every allocated particle.
    #[inline]
    pub fn positions(&self) -> &[f32] {
        self.buffers.positions()
    }

    /// Flat velocities of every allocated particle.
    #[inline]
    pub fn velocities(&self) -> &[f32] {
        self.buffers.velocities()
    }

    /// Fill the buffers according to the generator mode.
    ///
    /// In stream mode this generates up to `num_tot_particles`; with
    /// `regenerate_all == false` existing revealed particles are kept and only
    /// new cross-sections are appended. Replay mode loads the whole table
    /// and ignores both arguments.
    pub async fn generate_particles<L: AssetLoader + ?Sized>(
        &mut self,
        loader: &L,
        num_tot_particles: usize,
        regenerate_all: bool,
    ) -> Result<(), AssetError> {
        match self.mode.clone() {
            GeneratorMode::Stream => {
                self.generate_stream(num_tot_particles, regenerate_all);
                Ok(())
            }
            GeneratorMode::Replay { file, parse_mode } => {
                let text = loader.load_text(&file).await?;
                self.load_replay_text(&text, parse_mode)?;
                info!(file = %file, particles = self.num_particles, "replay loaded");
                Ok(())
            }
        }
    }

    /// Generate lattice cross-sections until `num_tot_particles` is reached.
    ///
    /// Revealed particles restart at the first new cross-section; call
    /// [`advance`](Self::advance) every frame to reveal the rest.
    pub fn generate_stream(&mut self, num_tot_particles: usize, regenerate_all: bool) {
        if self.num_particles >= num_tot_particles && !regenerate_all {
            self.num_particles = num_tot_particles;
            self.curr_num_particles = self.curr_num_particles.min(self.num_particles);
            return;
        }

        let distance = self.particle_radius * 2.0;
        if !(distance > 0.0) {
            warn!(radius = self.particle_radius, "particle radius must be positive");
            return;
        }
        let jitter = distance * 0.1;
        let start = if regenerate_all { 0 } else { self.curr_num_particles };

        let mut positions = Vec::new();
        let mut velocities = Vec::new();
        self.num_particles = start;

        while self.num_particles + self.num_cross_section <= num_tot_particles {
            self.num_cross_section = 0;
            let mut y_coord = BASE_Y;

            for y in 1..DIM_Y - 1 {
                let angle = y as f32 * PI / (DIM_Y - 1) as f32;
                let x2 = (angle.sin() * DIM_X as f32 / 2.0 * distance).max(0.0);

                let mut x_coord = -x2;
                while x_coord <= x2 {
                    let edge = x_coord == -x2 || x_coord + distance > x2;
                    let local = if edge {
                        Vec3::new(x_coord, y_coord, BASE_Z)
                    } else {
                        Vec3::new(
                            x_coord + self.jitter(jitter),
                            y_coord + self.jitter(jitter),
                            BASE_Z + self.jitter(jitter),
                        )
                    };
                    positions.push(local + self.position);
                    velocities.push(self.initial_velocity());

                    x_coord += distance;
                    self.num_particles += 1;
                    self.num_cross_section += 1;
                }

                y_coord += distance;
            }

            if self.num_cross_section == 0 {
                break;
            }
        }

        if self.buffers.grow_to(self.num_particles) {
            debug!(capacity = self.num_particles, "generator buffers grown");
        }
        self.buffers.write_range(start, &positions, &velocities);
        self.curr_num_particles = start;

        debug!(
            generated = positions.len(),
            total = self.num_particles,
            cross_section = self.num_cross_section,
            "particle stream generated"
        );
    }

    /// Parse a replay table and make every particle visible.
    pub fn load_replay_text(&mut self, text: &str, mode: ReplayParseMode) -> Result<(), ReplayError> {
        let replay = parse_replay(text, mode)?;
        if replay.skipped > 0 {
            warn!(skipped = replay.skipped, "replay rows skipped");
        }

        let positions: Vec<Vec3> = replay.positions.iter().map(|&p| p + self.position).collect();
        let velocities = vec![Vec3::ZERO; positions.len()];

        self.num_particles = positions.len();
        self.num_cross_section = positions.len();
        self.buffers.grow_to(self.num_particles);
        self.buffers.write_range(0, &positions, &velocities);
        self.curr_num_particles = self.num_particles;
        Ok(())
    }

    /// Reveal the next cross-section once the stream has made room for it.
    ///
    /// The first cross-section appears as soon as it exists; each later one
    /// once the newest revealed cross-section has moved more than a particle
    /// diameter away from the one before it. Replay generators reveal
    /// everything on load, so this is a no-op for them.
    pub fn advance(&mut self) {
        if self.mode != GeneratorMode::Stream {
            return;
        }

        if self.curr_num_particles == 0 {
            if self.buffers.capacity() >= self.num_cross_section {
                self.curr_num_particles = self.num_cross_section;
            }
        } else if self.curr_num_particles < self.num_particles {
            let Some(previous) = self.curr_num_particles.checked_sub(self.num_cross_section) else {
                return;
            };
            let newest = self.buffers.position(self.curr_num_particles);
            let older = self.buffers.position(previous);
            if newest.distance(older) > self.particle_radius * 2.0 {
                self.curr_num_particles += self.num_cross_section;
            }
        }
    }

    /// Drop all particles and release the buffers.
    pub fn dispose(&mut self) {
        self.buffers = ParticleBuffers::default();
        self.num_particles = 0;
        self.curr_num_particles = 0;
        self.num_cross_section = 0;
    }

    fn jitter(&mut self, amount: f32) -> f32 {
        self.rng.gen::<f32>() * amount - amount / 2.0
    }

    fn initial_velocity(&mut self) -> Vec3 {
        let x = (self.rng.gen::<f32>() - 0.5) * 0.03;
        let y = (self.rng.gen::<f32>() - 0.5) * 0.03;
        let z = (self.rng.gen::<f32>() - 1.0) * 0.03 - 1.5;
        Vec3::new(x, y, z)
    }
}

/// Rows extracted from a replay table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayData {
    /// Positions in file order, without any generator offset.
    pub positions: Vec<Vec3>,
    /// Rows skipped in lenient mode.
    pub skipped: usize,
}

/// Parse a `label,x,y,z[,...]` table.
///
/// The first line is a header and is discarded. Blank lines are ignored in
/// both modes. In lenient mode rows starting with `"` or with fewer than four
/// fields are skipped, and unparsable coordinates become NaN.
pub fn parse_replay(text: &str, mode: ReplayParseMode) -> Result<ReplayData, ReplayError> {
    let mut data = ReplayData::default();

    for (i, line) in text.lines().enumerate().skip(1) {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        if line.starts_with('"') || fields.len() < 4 {
            match mode {
                ReplayParseMode::Lenient => {
                    data.skipped += 1;
                    continue;
                }
                ReplayParseMode::Strict => {
                    return Err(ReplayError::TooFewFields {
                        line: i + 1,
                        fields: if line.starts_with('"') { 0 } else { fields.len() },
                    });
                }
            }
        }

        let mut coords = [0.0f32; 3];
        for (c, value) in coords.iter_mut().zip(&fields[1..4]) {
            *c = match value.trim().parse::<f32>() {
                Ok(v) => v,
                Err(_) if mode == ReplayParseMode::Lenient => f32::NAN,
                Err(_) => {
                    return Err(ReplayError::InvalidCoordinate {
                        line: i + 1,
                        value: value.to_string(),
                    })
                }
            };
        }
        data.positions.push(Vec3::from_array(coords));
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryLoader;

    fn stream(seed: u64) -> ParticleGenerator {
        ParticleGenerator::new(GeneratorMode::Stream, 0.02)
            .with_position(Vec3::new(0.0, -0.5, 0.0))
            .with_seed(seed)
    }

    #[test]
    fn test_cross_section_shape() {
        let mut gen = stream(1);
        gen.generate_stream(1, true);

        // One cross-section is always produced.
        let n = gen.num_cross_section();
        assert!(n > 0);
        assert_eq!(gen.num_particles(), n);
        assert_eq!(gen.buffers().capacity(), n);
        assert_eq!(gen.curr_num_particles(), 0);

        // Rows are centered on x = 0 and start at y = -0.5 + offset.
        let first = gen.buffers().position(0);
        assert!((first.y - (-1.0)).abs() < 1e-6);
        assert!((first.z - 0.49).abs() < 1e-6);
    }

    #[test]
    fn test_stream_never_exceeds_target_after_first_section() {
        let mut gen = stream(2);
        gen.generate_stream(1000, true);
        let cs = gen.num_cross_section();
        assert!(gen.num_particles() <= 1000);
        assert!(gen.num_particles() + cs > 1000);
        assert_eq!(gen.num_particles() % cs, 0);
    }

    #[test]
    fn test_row_edges_are_not_jittered() {
        let mut gen = stream(3);
        gen.generate_stream(1, true);
        let z: Vec<f32> = gen.buffers().positions_vec3()[..gen.num_particles()]
            .iter()
            .map(|p| p.z)
            .collect();
        assert!((z[0] - 0.49).abs() < 1e-7);
        let jitter = 0.04 * 0.1 / 2.0;
        assert!(z.iter().all(|&v| (v - 0.49).abs() <= jitter + 1e-6));
    }

    #[test]
    fn test_velocities_point_down_the_stream() {
        let mut gen = stream(4);
        gen.generate_stream(500, true);
        for v in &gen.buffers().velocities_vec3()[..gen.num_particles()] {
            assert!(v.z <= -1.5 && v.z >= -1.53);
            assert!(v.x.abs() <= 0.015 && v.y.abs() <= 0.015);
        }
    }

    #[test]
    fn test_same_seed_same_particles() {
        let mut a = stream(42);
        let mut b = stream(42);
        a.generate_stream(300, true);
        b.generate_stream(300, true);
        assert_eq!(a.buffers(), b.buffers());
    }

    #[test]
    fn test_advance_reveals_cross_sections() {
        let mut gen = stream(5);
        gen.generate_stream(2000, true);
        let cs = gen.num_cross_section();

        gen.advance();
        assert_eq!(gen.curr_num_particles(), cs);

        // Sections are generated on top of each other, so nothing else is
        // revealed until the visible one moves away.
        gen.advance();
        assert_eq!(gen.curr_num_particles(), cs);

        for p in &mut gen.buffers_mut().positions_vec3_mut()[..cs] {
            p.z -= 0.1;
        }
        gen.advance();
        assert_eq!(gen.curr_num_particles(), 2 * cs);
    }

    #[test]
    fn test_lowering_target_without_regenerating() {
        let mut gen = stream(6);
        gen.generate_stream(2000, true);
        let cs = gen.num_cross_section();
        gen.advance();

        gen.generate_stream(cs / 2, false);
        assert_eq!(gen.num_particles(), cs / 2);
        assert_eq!(gen.curr_num_particles(), cs / 2);
    }

    #[test]
    fn test_parse_replay_lenient() {
        let text = "id,x,y,z\n\"quoted\",1,2,3\n0,1.0,2.0,3.0\nshort,1\n\n1,4,5,6,extra\r\n";
        let data = parse_replay(text, ReplayParseMode::Lenient).unwrap();
        assert_eq!(data.positions, vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)]);
        assert_eq!(data.skipped, 2);
    }

    #[test]
    fn test_parse_replay_lenient_trailing_text_is_nan() {
        let data = parse_replay("id,x,y,z\n0,1.5abc,2,3\n", ReplayParseMode::Lenient).unwrap();
        assert_eq!(data.positions.len(), 1);
        assert!(data.positions[0].x.is_nan());
        assert_eq!(data.positions[0].y, 2.0);
    }

    #[test]
    fn test_parse_replay_strict_reports_line() {
        let text = "id,x,y,z\n0,1,2,3\n1,2\n";
        let err = parse_replay(text, ReplayParseMode::Strict).unwrap_err();
        assert_eq!(err, ReplayError::TooFewFields { line: 3, fields: 2 });

        let text = "id,x,y,z\n0,1,oops,3\n";
        let err = parse_replay(text, ReplayParseMode::Strict).unwrap_err();
        assert_eq!(
            err,
            ReplayError::InvalidCoordinate {
                line: 2,
                value: "oops".into()
            }
        );
    }

    #[test]
    fn test_replay_mode_loads_everything_visible() {
        let loader = MemoryLoader::new().with_text("drop.txt", "header\na,0,0,0\nb,0.1,0,0\nc,0.2,0,0\n");
        let mut gen = ParticleGenerator::new(GeneratorMode::replay("drop.txt"), 0.02)
            .with_position(Vec3::new(0.0, -0.5, 0.0));

        pollster::block_on(gen.generate_particles(&loader, 0, true)).unwrap();

        assert_eq!(gen.curr_num_particles(), 3);
        assert_eq!(gen.num_particles(), 3);
        assert_eq!(gen.buffers().position(2), Vec3::new(0.2, -0.5, 0.0));
        assert_eq!(gen.buffers().velocity(1), Vec3::ZERO);

        gen.advance();
        assert_eq!(gen.curr_num_particles(), 3);
    }

    #[test]
    fn test_missing_replay_is_an_error() {
        let loader = MemoryLoader::new();
        let mut gen = ParticleGenerator::new(GeneratorMode::replay("gone.txt"), 0.02);
        let err = pollster::block_on(gen.generate_particles(&loader, 0, true)).unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
    }
}
