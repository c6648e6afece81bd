//! Collision shape registry and particle collision response.
//!
//! Shapes are registered as descriptions, loaded together with
//! [`CollisionWorld::load`], and then resolved against the particles once per
//! frame. Resolution is a single pass: for each particle, every enabled shape
//! in registration order pushes the particle back to the surface and reflects
//! its velocity, scaled by the restitution.
//!
//! ```ignore
//! let mut world = CollisionWorld::new(0.999);
//! world.add_plane(Vec3::Y, 0.5);
//! let ball = world.add_sphere(Vec3::new(0.0, 1.0, 0.0), 0.16);
//! world.load(&loader).await?;
//!
//! // every frame, after the simulator step
//! world.resolve(&mut buffers, live, particle_size / 2.0);
//! ```

use crate::assets::AssetLoader;
use crate::buffers::ParticleBuffers;
use crate::error::AssetError;
use crate::shapes::{CollisionShape, HeightmapSource, ShapeDesc, ShapeSource};
use futures::future::try_join_all;
use glam::Vec3;
use tracing::{debug, info};

/// Handle to a registered shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(u32);

impl ShapeId {
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Pending(ShapeDesc),
    Loaded(CollisionShape),
}

/// Ordered set of collision shapes.
#[derive(Debug, Clone)]
pub struct CollisionWorld {
    entries: Vec<(ShapeId, Slot)>,
    next_id: u32,
    /// Restitution for shapes without an override.
    pub default_restitution: f32,
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self::new(0.999)
    }
}

impl CollisionWorld {
    pub fn new(default_restitution: f32) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            default_restitution,
        }
    }

    fn next_id(&mut self) -> ShapeId {
        let id = ShapeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Queue a shape for the next [`load`](Self::load).
    pub fn add(&mut self, desc: ShapeDesc) -> ShapeId {
        let id = self.next_id();
        self.entries.push((id, Slot::Pending(desc)));
        id
    }

    /// Register a shape that is already built.
    pub fn add_shape(&mut self, mut shape: CollisionShape) -> ShapeId {
        shape.update_transform();
        let id = self.next_id();
        self.entries.push((id, Slot::Loaded(shape)));
        id
    }

    /// Box with half-extents `extents`, rotated by Euler angles in radians.
    pub fn add_box(&mut self, position: Vec3, rotation: Vec3, extents: Vec3) -> ShapeId {
        self.add(
            ShapeDesc::new(ShapeSource::Box { extents })
                .with_position(position)
                .with_euler(rotation),
        )
    }

    pub fn add_sphere(&mut self, position: Vec3, radius: f32) -> ShapeId {
        self.add(ShapeDesc::new(ShapeSource::Sphere { radius }).with_position(position))
    }

    /// Half-space `dot(p, normal) + offset < 0`.
    pub fn add_plane(&mut self, normal: Vec3, offset: f32) -> ShapeId {
        self.add(ShapeDesc::new(ShapeSource::Plane { normal, offset }))
    }

    pub fn add_cut_hollow_sphere(
        &mut self,
        position: Vec3,
        rotation: Vec3,
        radius: f32,
        cut_height: f32,
        thickness: f32,
        segments: u32,
    ) -> ShapeId {
        self.add(
            ShapeDesc::new(ShapeSource::CutHollowSphere {
                radius,
                cut_height,
                thickness,
            })
            .with_position(position)
            .with_euler(rotation)
            .with_segments(segments),
        )
    }

    pub fn add_vertical_cylinder(
        &mut self,
        position: Vec3,
        rotation: Vec3,
        radius: f32,
        half_height: f32,
        segments: u32,
    ) -> ShapeId {
        self.add(
            ShapeDesc::new(ShapeSource::VerticalCylinder { radius, half_height })
                .with_position(position)
                .with_euler(rotation)
                .with_segments(segments),
        )
    }

    /// Shape backed by an SDF volume asset.
    pub fn add_mesh(
        &mut self,
        position: Vec3,
        rotation: Vec3,
        mesh_file: Option<String>,
        sdf_file: impl Into<String>,
        scale: f32,
    ) -> ShapeId {
        self.add(
            ShapeDesc::new(ShapeSource::Mesh {
                sdf_file: sdf_file.into(),
                mesh_file,
            })
            .with_position(position)
            .with_euler(rotation)
            .with_scale(scale),
        )
    }

    /// Terrain from a heightmap image covering `size × size`.
    pub fn add_terrain(&mut self, heightmap_file: impl Into<String>, size: f32) -> ShapeId {
        self.add(ShapeDesc::new(ShapeSource::Terrain(HeightmapSource::Image {
            file: heightmap_file.into(),
            size,
        })))
    }

    /// Build every pending shape.
    ///
    /// Assets are fetched concurrently; shapes keep their registration
    /// order. On error nothing is replaced and the pending shapes stay
    /// queued. Returns the number of shapes loaded.
    pub async fn load<L: AssetLoader + ?Sized>(&mut self, loader: &L) -> Result<usize, AssetError> {
        let pending: Vec<(usize, ShapeDesc)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(i, (_, slot))| match slot {
                Slot::Pending(desc) => Some((i, desc.clone())),
                Slot::Loaded(_) => None,
            })
            .collect();

        if pending.is_empty() {
            return Ok(0);
        }

        let (indices, descs): (Vec<usize>, Vec<ShapeDesc>) = pending.into_iter().unzip();
        let shapes = try_join_all(descs.into_iter().map(|d| d.build(loader))).await?;
        let loaded = shapes.len();

        for (i, shape) in indices.into_iter().zip(shapes) {
            debug!(id = self.entries[i].0.index(), kind = shape.kind().name(), "collision shape loaded");
            self.entries[i].1 = Slot::Loaded(shape);
        }

        info!(loaded, total = self.entries.len(), "collision world loaded");
        Ok(loaded)
    }

    /// Shapes waiting for [`load`](Self::load).
    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Pending(_)))
            .count()
    }

    /// Number of registered shapes, loaded or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn slot(&self, id: ShapeId) -> Option<&Slot> {
        self.entries.iter().find(|(i, _)| *i == id).map(|(_, s)| s)
    }

    fn slot_mut(&mut self, id: ShapeId) -> Option<&mut Slot> {
        self.entries.iter_mut().find(|(i, _)| *i == id).map(|(_, s)| s)
    }

    /// A loaded shape.
    pub fn shape(&self, id: ShapeId) -> Option<&CollisionShape> {
        match self.slot(id)? {
            Slot::Loaded(shape) => Some(shape),
            Slot::Pending(_) => None,
        }
    }

    pub fn shape_mut(&mut self, id: ShapeId) -> Option<&mut CollisionShape> {
        match self.slot_mut(id)? {
            Slot::Loaded(shape) => Some(shape),
            Slot::Pending(_) => None,
        }
    }

    /// Loaded shapes in registration order.
    pub fn shapes(&self) -> impl Iterator<Item = (ShapeId, &CollisionShape)> {
        self.entries.iter().filter_map(|(id, slot)| match slot {
            Slot::Loaded(shape) => Some((*id, shape)),
            Slot::Pending(_) => None,
        })
    }

    /// Move a shape within its drag plane. Returns `false` if the shape is
    /// unknown, not loaded, or not draggable.
    pub fn drag(&mut self, id: ShapeId, delta: Vec3) -> bool {
        self.shape_mut(id).is_some_and(|shape| shape.drag(delta))
    }

    /// Remove a shape and release its mesh.
    pub fn dispose_shape(&mut self, id: ShapeId) -> bool {
        let Some(pos) = self.entries.iter().position(|(i, _)| *i == id) else {
            return false;
        };
        if let (_, Slot::Loaded(mut shape)) = self.entries.remove(pos) {
            shape.release_mesh();
        }
        debug!(id = id.index(), "collision shape disposed");
        true
    }

    /// Remove every shape.
    pub fn dispose(&mut self) {
        while let Some((id, _)) = self.entries.first() {
            let id = *id;
            self.dispose_shape(id);
        }
    }

    /// Push the first `count` particles out of every enabled shape.
    ///
    /// A particle collides when its center is closer than `particle_radius`
    /// to a surface. Its velocity is reflected about the surface normal and
    /// scaled by the restitution, and it is moved back along the normal by
    /// the penetration depth. Pending shapes are ignored.
    pub fn resolve(&mut self, buffers: &mut ParticleBuffers, count: usize, particle_radius: f32) {
        if self.entries.is_empty() {
            return;
        }

        for (_, slot) in &mut self.entries {
            if let Slot::Loaded(shape) = slot {
                shape.update_transform();
            }
        }

        let shapes: Vec<&CollisionShape> = self
            .entries
            .iter()
            .filter_map(|(_, slot)| match slot {
                Slot::Loaded(shape) if !shape.disabled => Some(shape),
                _ => None,
            })
            .collect();

        let count = count.min(buffers.capacity());
        let (positions, velocities) = buffers.split_mut();

        for (p, v) in positions[..count].iter_mut().zip(&mut velocities[..count]) {
            for shape in &shapes {
                let local = shape.to_local(*p);
                let dist = shape.scale * shape.kind().signed_distance(local) - particle_radius;
                if dist < 0.0 {
                    let n = shape.normal_at_local(local);
                    let restitution = shape.restitution.unwrap_or(self.default_restitution);
                    *v = (*v - 2.0 * v.dot(n) * n) * restitution;
                    *p -= n * dist;
                }
            }
        }
    }
}
