//! Tiltable box container built from collision planes.
//!
//! Six inward-facing planes bound an axis-aligned box. A seventh floor plane
//! (restitution 0.98, disabled by default) can be switched on to catch
//! particles when the box is tilted; it sits just below the lowest corner of
//! the rotated box.

use crate::collision::{CollisionWorld, ShapeId};
use crate::shapes::{CollisionShape, ShapeKind};
use glam::{EulerRot, Quat, Vec3};
use tracing::debug;

/// Restitution of the catch floor.
pub const FLOOR_RESTITUTION: f32 = 0.98;
/// Gap between the catch floor and the lowest box corner.
const FLOOR_CLEARANCE: f32 = 0.02;

/// Axis-aligned box made of planes registered in a [`CollisionWorld`].
#[derive(Debug, Clone)]
pub struct BoxContainer {
    min: Vec3,
    max: Vec3,
    walls: [(ShapeId, Vec3, f32); 6],
    floor: ShapeId,
    angle_x: f32,
    angle_y: f32,
}

impl BoxContainer {
    /// Register the box planes in `world`.
    pub fn new(world: &mut CollisionWorld, min: Vec3, max: Vec3) -> Self {
        let planes = [
            (Vec3::NEG_Z, max.z.abs()),
            (Vec3::Z, min.z.abs()),
            (Vec3::X, min.x.abs()),
            (Vec3::NEG_X, max.x.abs()),
            (Vec3::NEG_Y, max.y.abs()),
            (Vec3::Y, min.y.abs()),
        ];
        let walls = planes.map(|(normal, offset)| {
            let id = world.add_shape(CollisionShape::new(ShapeKind::Plane { normal, offset }));
            (id, normal, offset)
        });

        let mut floor = CollisionShape::new(ShapeKind::Plane {
            normal: Vec3::Y,
            offset: min.y.abs(),
        });
        floor.restitution = Some(FLOOR_RESTITUTION);
        floor.disabled = true;
        let floor = world.add_shape(floor);

        Self {
            min,
            max,
            walls,
            floor,
            angle_x: 0.0,
            angle_y: 0.0,
        }
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        self.max
    }

    /// Current tilt in degrees, `(about X, about Z)`.
    #[inline]
    pub fn angles(&self) -> (f32, f32) {
        (self.angle_x, self.angle_y)
    }

    /// Ids of the six walls followed by the catch floor.
    pub fn shape_ids(&self) -> [ShapeId; 7] {
        let w = self.walls.map(|(id, _, _)| id);
        [w[0], w[1], w[2], w[3], w[4], w[5], self.floor]
    }

    /// Rotation for a tilt of `angle_x` degrees about X then `angle_y` about Z.
    pub fn rotation(angle_x: f32, angle_y: f32) -> Quat {
        Quat::from_euler(EulerRot::YXZ, 0.0, angle_x.to_radians(), angle_y.to_radians())
    }

    /// Tilt the box to absolute angles in degrees.
    ///
    /// Wall normals are rotated about the origin; offsets are unchanged. The
    /// catch floor is moved to just below the lowest rotated corner.
    pub fn rotate(&mut self, world: &mut CollisionWorld, angle_x: f32, angle_y: f32) {
        self.angle_x = angle_x;
        self.angle_y = angle_y;
        let rotation = Self::rotation(angle_x, angle_y);

        let (lo, hi) = (self.min, self.max);
        let y_min = [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
        ]
        .iter()
        .map(|&c| (rotation * c).y)
        .fold(f32::INFINITY, f32::min);

        if let Some(shape) = world.shape_mut(self.floor) {
            if let ShapeKind::Plane { offset, .. } = shape.kind_mut() {
                *offset = y_min.abs() + FLOOR_CLEARANCE;
            }
        }

        for &(id, base_normal, _) in &self.walls {
            if let Some(shape) = world.shape_mut(id) {
                if let ShapeKind::Plane { normal, .. } = shape.kind_mut() {
                    *normal = rotation * base_normal;
                }
            }
        }

        debug!(angle_x, angle_y, floor = y_min.abs() + FLOOR_CLEARANCE, "box container rotated");
    }

    /// Turn the catch floor on or off.
    pub fn set_floor_enabled(&self, world: &mut CollisionWorld, enabled: bool) {
        if let Some(shape) = world.shape_mut(self.floor) {
            shape.disabled = !enabled;
        }
    }
}
