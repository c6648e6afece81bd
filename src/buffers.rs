//! Flat particle buffers shared between generator, simulator and renderer.
//!
//! Positions and velocities live in two contiguous `f32` arrays of length
//! `3 * capacity`. The layout is what a renderer uploads as a vertex buffer,
//! and `bytemuck` lets the simulation code look at the same memory as `[Vec3]`
//! without copying.
//!
//! Only a prefix of the buffers is live; the rest is pre-allocated room for
//! particles that have not been revealed yet.

use glam::Vec3;

/// Position and velocity storage for up to `capacity` particles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleBuffers {
    positions: Vec<f32>,
    velocities: Vec<f32>,
}

impl ParticleBuffers {
    /// Create zeroed buffers for `capacity` particles.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: vec![0.0; capacity * 3],
            velocities: vec![0.0; capacity * 3],
        }
    }

    /// Wrap existing flat arrays.
    ///
    /// Trailing components that do not form a full `xyz` triple are dropped,
    /// and the shorter of the two arrays decides the capacity.
    pub fn from_flat(mut positions: Vec<f32>, mut velocities: Vec<f32>) -> Self {
        let len = (positions.len().min(velocities.len()) / 3) * 3;
        positions.truncate(len);
        velocities.truncate(len);
        Self { positions, velocities }
    }

    /// Build buffers from per-particle vectors.
    pub fn from_vec3(positions: &[Vec3], velocities: &[Vec3]) -> Self {
        let n = positions.len().min(velocities.len());
        Self {
            positions: bytemuck::cast_slice(&positions[..n]).to_vec(),
            velocities: bytemuck::cast_slice(&velocities[..n]).to_vec(),
        }
    }

    /// Number of particles the buffers can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.positions.len() / 3
    }

    /// Grow to hold at least `capacity` particles, keeping existing data.
    ///
    /// Never shrinks. Returns `true` if the buffers were reallocated.
    pub fn grow_to(&mut self, capacity: usize) -> bool {
        if capacity <= self.capacity() {
            return false;
        }
        self.positions.resize(capacity * 3, 0.0);
        self.velocities.resize(capacity * 3, 0.0);
        true
    }

    /// Flat `[x0, y0, z0, x1, ...]` positions.
    #[inline]
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Flat velocities, same layout as [`positions`](Self::positions).
    #[inline]
    pub fn velocities(&self) -> &[f32] {
        &self.velocities
    }

    /// Positions viewed as vectors.
    #[inline]
    pub fn positions_vec3(&self) -> &[Vec3] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Velocities viewed as vectors.
    #[inline]
    pub fn velocities_vec3(&self) -> &[Vec3] {
        bytemuck::cast_slice(&self.velocities)
    }

    /// Mutable vector views of both buffers at once.
    #[inline]
    pub fn split_mut(&mut self) -> (&mut [Vec3], &mut [Vec3]) {
        (
            bytemuck::cast_slice_mut(&mut self.positions),
            bytemuck::cast_slice_mut(&mut self.velocities),
        )
    }

    /// Mutable position vectors.
    #[inline]
    pub fn positions_vec3_mut(&mut self) -> &mut [Vec3] {
        bytemuck::cast_slice_mut(&mut self.positions)
    }

    /// Mutable velocity vectors.
    #[inline]
    pub fn velocities_vec3_mut(&mut self) -> &mut [Vec3] {
        bytemuck::cast_slice_mut(&mut self.velocities)
    }

    /// Position of particle `i`.
    #[inline]
    pub fn position(&self, i: usize) -> Vec3 {
        self.positions_vec3()[i]
    }

    /// Velocity of particle `i`.
    #[inline]
    pub fn velocity(&self, i: usize) -> Vec3 {
        self.velocities_vec3()[i]
    }

    /// Overwrite particle `i`.
    #[inline]
    pub fn set(&mut self, i: usize, position: Vec3, velocity: Vec3) {
        let (p, v) = self.split_mut();
        p[i] = position;
        v[i] = velocity;
    }

    /// Copy `positions`/`velocities` into the buffers starting at particle `start`.
    ///
    /// The caller must have grown the buffers beforehand.
    pub fn write_range(&mut self, start: usize, positions: &[Vec3], velocities: &[Vec3]) {
        let (p, v) = self.split_mut();
        p[start..start + positions.len()].copy_from_slice(positions);
        v[start..start + velocities.len()].copy_from_slice(velocities);
    }

    /// Raw bytes of the first `count` positions, ready for a vertex-buffer upload.
    pub fn position_bytes(&self, count: usize) -> &[u8] {
        let count = count.min(self.capacity());
        bytemuck::cast_slice(&self.positions[..count * 3])
    }

    /// Raw bytes of the first `count` velocities.
    pub fn velocity_bytes(&self, count: usize) -> &[u8] {
        let count = count.min(self.capacity());
        bytemuck::cast_slice(&self.velocities[..count * 3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_and_vec3_view_agree() {
        let mut buffers = ParticleBuffers::with_capacity(4);
        assert_eq!(buffers.capacity(), 4);
        assert_eq!(buffers.positions().len(), 12);

        buffers.set(2, Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.0, 0.5));
        assert_eq!(&buffers.positions()[6..9], &[1.0, 2.0, 3.0]);
        assert_eq!(buffers.velocity(2), Vec3::new(-1.0, 0.0, 0.5));
    }

    #[test]
    fn test_grow_keeps_data_and_never_shrinks() {
        let mut buffers = ParticleBuffers::with_capacity(2);
        buffers.set(1, Vec3::ONE, Vec3::Y);

        assert!(buffers.grow_to(5));
        assert_eq!(buffers.capacity(), 5);
        assert_eq!(buffers.position(1), Vec3::ONE);
        assert_eq!(buffers.position(4), Vec3::ZERO);

        assert!(!buffers.grow_to(3));
        assert_eq!(buffers.capacity(), 5);
    }

    #[test]
    fn test_from_flat_drops_partial_triples() {
        let buffers = ParticleBuffers::from_flat(vec![0.0; 7], vec![0.0; 9]);
        assert_eq!(buffers.capacity(), 2);
        assert_eq!(buffers.positions().len() % 3, 0);
    }

    #[test]
    fn test_position_bytes_covers_live_prefix() {
        let buffers = ParticleBuffers::with_capacity(10);
        assert_eq!(buffers.position_bytes(3).len(), 3 * 3 * 4);
        assert_eq!(buffers.velocity_bytes(100).len(), 10 * 3 * 4);
    }
}
