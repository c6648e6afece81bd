//! Collision shapes.
//!
//! A [`CollisionShape`] pairs a [`ShapeKind`] (the SDF and its parameters)
//! with a placement in the world. Shapes are described up front by a
//! [`ShapeDesc`] and built asynchronously, since mesh and terrain shapes need
//! assets.
//!
//! # Shape Types
//!
//! | Kind | Parameters | Default drag axis | Visual mesh |
//! |------|------------|-------------------|-------------|
//! | [`ShapeKind::Box`] | half-extents | +Y | cuboid |
//! | [`ShapeKind::Sphere`] | radius | +Y | UV sphere |
//! | [`ShapeKind::Plane`] | normal, offset | none | none |
//! | [`ShapeKind::CutHollowSphere`] | radius, cut height, thickness | +Y | lathe |
//! | [`ShapeKind::VerticalCylinder`] | radius, half-height | +Y | lathe |
//! | [`ShapeKind::Mesh`] | SDF volume | +Y | host-provided |
//! | [`ShapeKind::Terrain`] | heightmap | none | grid |
//!
//! # Example
//!
//! ```ignore
//! let desc = ShapeDesc::new(ShapeSource::Sphere { radius: 0.16 })
//!     .with_position(Vec3::new(0.0, 1.0, -0.1))
//!     .with_restitution(0.5);
//! let shape = desc.build(&loader).await?;
//! ```

use crate::assets::AssetLoader;
use crate::error::AssetError;
use crate::mesh::ShapeMesh;
use crate::sdf::{self, Heightmap, SdfVolume};
use glam::{EulerRot, Mat4, Quat, Vec3};

/// Tessellation used when a description does not specify one.
pub const DEFAULT_SEGMENTS: u32 = 16;
/// Heightmap grid resolution for image terrains.
pub const TERRAIN_SUBDIVISIONS: usize = 128;

/// Orientation of a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rotation {
    /// Euler angles in radians: yaw about Y, then pitch about X, then roll
    /// about Z, given as `(pitch, yaw, roll)`.
    Euler(Vec3),
    Quat(Quat),
}

impl Rotation {
    pub fn to_quat(self) -> Quat {
        match self {
            Rotation::Euler(e) => Quat::from_euler(EulerRot::YXZ, e.y, e.x, e.z),
            Rotation::Quat(q) => q,
        }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Rotation::Euler(Vec3::ZERO)
    }
}

/// Geometry of a loaded shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// Box with half-extents.
    Box { extents: Vec3 },
    Sphere { radius: f32 },
    /// Half-space `dot(p, normal) + offset < 0`.
    Plane { normal: Vec3, offset: f32 },
    /// Spherical shell cut by a horizontal plane.
    ///
    /// # Fields
    ///
    /// - `radius` - Mid-surface radius
    /// - `cut_height` - Height of the cutting plane above the center
    /// - `thickness` - Half-thickness of the shell
    CutHollowSphere {
        radius: f32,
        cut_height: f32,
        thickness: f32,
    },
    /// Capped cylinder along Y spanning `-half_height..half_height`.
    VerticalCylinder { radius: f32, half_height: f32 },
    /// Sampled SDF. `mesh_asset` names the host's visual mesh, if any.
    Mesh {
        volume: SdfVolume,
        mesh_asset: Option<String>,
    },
    Terrain { heightmap: Heightmap },
}

impl ShapeKind {
    /// Signed distance at local point `p`.
    pub fn signed_distance(&self, p: Vec3) -> f32 {
        match self {
            ShapeKind::Box { extents } => sdf::sd_box(p, *extents),
            ShapeKind::Sphere { radius } => sdf::sd_sphere(p, *radius),
            ShapeKind::Plane { normal, offset } => sdf::sd_plane(p, *normal, *offset),
            ShapeKind::CutHollowSphere {
                radius,
                cut_height,
                thickness,
            } => sdf::sd_cut_hollow_sphere(p, *radius, *cut_height, *thickness),
            ShapeKind::VerticalCylinder { radius, half_height } => {
                sdf::sd_vertical_cylinder(p, *radius, *half_height)
            }
            ShapeKind::Mesh { volume, .. } => volume.sample(p),
            ShapeKind::Terrain { heightmap } => heightmap.sd(p),
        }
    }

    /// Unnormalized outward direction at local point `p`, in the local frame.
    pub fn local_normal(&self, p: Vec3) -> Vec3 {
        match self {
            ShapeKind::Terrain { heightmap } => heightmap.normal(p.x, p.z),
            _ => sdf::tetrahedron_normal(p, |q| self.signed_distance(q)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Box { .. } => "box",
            ShapeKind::Sphere { .. } => "sphere",
            ShapeKind::Plane { .. } => "plane",
            ShapeKind::CutHollowSphere { .. } => "cut hollow sphere",
            ShapeKind::VerticalCylinder { .. } => "vertical cylinder",
            ShapeKind::Mesh { .. } => "mesh",
            ShapeKind::Terrain { .. } => "terrain",
        }
    }

    fn build_mesh(&self, segments: u32) -> Option<ShapeMesh> {
        match self {
            ShapeKind::Box { extents } => Some(ShapeMesh::cuboid(*extents)),
            ShapeKind::Sphere { radius } => Some(ShapeMesh::sphere(*radius, segments)),
            ShapeKind::CutHollowSphere {
                radius,
                cut_height,
                thickness,
            } => Some(ShapeMesh::cut_hollow_sphere(*radius, *cut_height, *thickness, segments)),
            ShapeKind::VerticalCylinder { radius, half_height } => {
                Some(ShapeMesh::vertical_cylinder(*radius, *half_height, segments))
            }
            ShapeKind::Terrain { heightmap } => Some(ShapeMesh::terrain(heightmap)),
            ShapeKind::Plane { .. } | ShapeKind::Mesh { .. } => None,
        }
    }
}

/// Where a terrain's heights come from.
#[derive(Debug, Clone, PartialEq)]
pub enum HeightmapSource {
    /// Grayscale image asset, `size × size`, heights up to `size / 5`.
    Image { file: String, size: f32 },
    /// Ready-made heightmap.
    Procedural(Heightmap),
}

/// Shape geometry before any asset is loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeSource {
    Box { extents: Vec3 },
    Sphere { radius: f32 },
    Plane { normal: Vec3, offset: f32 },
    CutHollowSphere {
        radius: f32,
        cut_height: f32,
        thickness: f32,
    },
    VerticalCylinder { radius: f32, half_height: f32 },
    /// SDF volume asset, plus the name of the host's visual mesh.
    Mesh {
        sdf_file: String,
        mesh_file: Option<String>,
    },
    Terrain(HeightmapSource),
}

impl ShapeSource {
    /// Axis of the plane a shape is dragged in, unless overridden.
    pub fn default_drag_axis(&self) -> Option<Vec3> {
        match self {
            ShapeSource::Plane { .. } | ShapeSource::Terrain(_) => None,
            _ => Some(Vec3::Y),
        }
    }
}

/// Full description of a shape to build.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDesc {
    pub source: ShapeSource,
    pub position: Vec3,
    pub rotation: Rotation,
    /// Uniform scale; distances are evaluated at `p / scale` and scaled back.
    pub scale: f32,
    /// Overrides the world's default restitution.
    pub restitution: Option<f32>,
    pub disabled: bool,
    /// Normal of the plane the shape can be dragged in.
    pub drag_axis: Option<Vec3>,
    /// Skip building a visual mesh.
    pub dont_create_mesh: bool,
    pub segments: u32,
}

impl ShapeDesc {
    pub fn new(source: ShapeSource) -> Self {
        Self {
            drag_axis: source.default_drag_axis(),
            source,
            position: Vec3::ZERO,
            rotation: Rotation::default(),
            scale: 1.0,
            restitution: None,
            disabled: false,
            dont_create_mesh: false,
            segments: DEFAULT_SEGMENTS,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Euler rotation in radians, `(pitch, yaw, roll)`.
    pub fn with_euler(mut self, angles: Vec3) -> Self {
        self.rotation = Rotation::Euler(angles);
        self
    }

    pub fn with_quat(mut self, rotation: Quat) -> Self {
        self.rotation = Rotation::Quat(rotation);
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = Some(restitution);
        self
    }

    pub fn with_drag_axis(mut self, axis: Option<Vec3>) -> Self {
        self.drag_axis = axis;
        self
    }

    pub fn with_segments(mut self, segments: u32) -> Self {
        self.segments = segments;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn without_mesh(mut self) -> Self {
        self.dont_create_mesh = true;
        self
    }

    /// Load any assets and produce the shape.
    pub async fn build<L: AssetLoader + ?Sized>(self, loader: &L) -> Result<CollisionShape, AssetError> {
        let kind = match self.source {
            ShapeSource::Box { extents } => ShapeKind::Box { extents },
            ShapeSource::Sphere { radius } => ShapeKind::Sphere { radius },
            ShapeSource::Plane { normal, offset } => ShapeKind::Plane { normal, offset },
            ShapeSource::CutHollowSphere {
                radius,
                cut_height,
                thickness,
            } => ShapeKind::CutHollowSphere {
                radius,
                cut_height,
                thickness,
            },
            ShapeSource::VerticalCylinder { radius, half_height } => {
                ShapeKind::VerticalCylinder { radius, half_height }
            }
            ShapeSource::Mesh { sdf_file, mesh_file } => {
                let text = loader.load_text(&sdf_file).await?;
                ShapeKind::Mesh {
                    volume: SdfVolume::parse(&text)?,
                    mesh_asset: mesh_file,
                }
            }
            ShapeSource::Terrain(HeightmapSource::Procedural(heightmap)) => ShapeKind::Terrain { heightmap },
            ShapeSource::Terrain(HeightmapSource::Image { file, size }) => {
                let bytes = loader.load_bytes(&file).await?;
                ShapeKind::Terrain {
                    heightmap: decode_heightmap(&bytes, size)?,
                }
            }
        };

        let mesh = if self.dont_create_mesh {
            None
        } else {
            kind.build_mesh(self.segments)
        };

        let mut shape = CollisionShape::new(kind)
            .with_position(self.position)
            .with_rotation(self.rotation)
            .with_scale(self.scale)
            .with_drag_axis(self.drag_axis);
        shape.restitution = self.restitution;
        shape.disabled = self.disabled;
        shape.mesh = mesh;
        Ok(shape)
    }
}

#[cfg(feature = "heightmap-images")]
fn decode_heightmap(bytes: &[u8], size: f32) -> Result<Heightmap, AssetError> {
    Heightmap::from_image_bytes(bytes, size, TERRAIN_SUBDIVISIONS, size / 5.0)
}

#[cfg(not(feature = "heightmap-images"))]
fn decode_heightmap(_bytes: &[u8], _size: f32) -> Result<Heightmap, AssetError> {
    Err(AssetError::ImageSupportDisabled)
}

/// A placed collision shape.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionShape {
    kind: ShapeKind,
    pub position: Vec3,
    pub rotation: Rotation,
    pub scale: f32,
    /// Overrides the world's default restitution.
    pub restitution: Option<f32>,
    /// Disabled shapes are skipped by collision resolution.
    pub disabled: bool,
    /// Normal of the plane the shape can be dragged in.
    pub drag_axis: Option<Vec3>,
    mesh: Option<ShapeMesh>,
    transform: Mat4,
    inverse: Mat4,
}

impl CollisionShape {
    /// Unplaced shape at the origin with no visual mesh.
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            position: Vec3::ZERO,
            rotation: Rotation::default(),
            scale: 1.0,
            restitution: None,
            disabled: false,
            drag_axis: None,
            mesh: None,
            transform: Mat4::IDENTITY,
            inverse: Mat4::IDENTITY,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self.update_transform();
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self.update_transform();
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_drag_axis(mut self, axis: Option<Vec3>) -> Self {
        self.drag_axis = axis;
        self
    }

    #[inline]
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut ShapeKind {
        &mut self.kind
    }

    /// Visual mesh in the local frame, if one was built.
    pub fn mesh(&self) -> Option<&ShapeMesh> {
        self.mesh.as_ref()
    }

    /// Drop the visual mesh.
    pub fn release_mesh(&mut self) -> Option<ShapeMesh> {
        self.mesh.take()
    }

    /// Recompute the cached rigid transform from position and rotation.
    ///
    /// Scale is not part of the matrix; it is applied to distances.
    pub fn update_transform(&mut self) {
        self.transform = Mat4::from_rotation_translation(self.rotation.to_quat(), self.position);
        self.inverse = self.transform.inverse();
    }

    /// Rigid transform from the local frame to world space.
    #[inline]
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    /// Transform for drawing the visual mesh, including scale.
    pub fn world_matrix(&self) -> Mat4 {
        self.transform * Mat4::from_scale(Vec3::splat(self.scale))
    }

    /// World point mapped into the unscaled local frame.
    #[inline]
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.inverse.transform_point3(world) / self.scale
    }

    /// Signed distance from a world point to the surface.
    #[inline]
    pub fn distance(&self, world: Vec3) -> f32 {
        self.scale * self.kind.signed_distance(self.to_local(world))
    }

    /// Unit world-space normal at a local point; zero where the SDF is flat.
    pub fn normal_at_local(&self, local: Vec3) -> Vec3 {
        self.transform
            .transform_vector3(self.kind.local_normal(local))
            .normalize_or_zero()
    }

    /// Move by `delta` restricted to the drag plane.
    ///
    /// Returns `false` for shapes without a drag axis.
    pub fn drag(&mut self, delta: Vec3) -> bool {
        let Some(axis) = self.drag_axis.and_then(|a| a.try_normalize()) else {
            return false;
        };
        self.position += delta - axis * delta.dot(axis);
        self.update_transform();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryLoader;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_euler_matches_yaw_pitch_roll() {
        let q = Rotation::Euler(Vec3::new(0.3, 0.5, 0.7)).to_quat();
        let expected = Quat::from_rotation_y(0.5) * Quat::from_rotation_x(0.3) * Quat::from_rotation_z(0.7);
        assert!(q.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_distance_follows_position_and_scale() {
        let sphere = CollisionShape::new(ShapeKind::Sphere { radius: 1.0 })
            .with_position(Vec3::new(2.0, 0.0, 0.0))
            .with_scale(0.5);
        assert!((sphere.distance(Vec3::new(2.0, 2.0, 0.0)) - 1.5).abs() < 1e-5);
        assert!((sphere.distance(Vec3::new(2.0, 0.0, 0.0)) + 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_rotated_box_normal_is_in_world_space() {
        // Box rotated 90 degrees about X: its local +Y face now faces +Z.
        let b = CollisionShape::new(ShapeKind::Box {
            extents: Vec3::new(1.0, 0.1, 1.0),
        })
        .with_rotation(Rotation::Euler(Vec3::new(FRAC_PI_2, 0.0, 0.0)));

        let world = Vec3::new(0.0, 0.0, 0.05);
        let local = b.to_local(world);
        let n = b.normal_at_local(local);
        assert!((n - Vec3::Z).length() < 1e-3);
    }

    #[test]
    fn test_zero_plane_has_no_normal() {
        let plane = CollisionShape::new(ShapeKind::Plane {
            normal: Vec3::ZERO,
            offset: -0.5,
        });
        assert_eq!(plane.distance(Vec3::ONE), -0.5);
        assert_eq!(plane.normal_at_local(Vec3::ONE), Vec3::ZERO);
    }

    #[test]
    fn test_drag_is_projected_onto_plane() {
        let mut s = CollisionShape::new(ShapeKind::Sphere { radius: 0.1 }).with_drag_axis(Some(Vec3::Y));
        assert!(s.drag(Vec3::new(1.0, 5.0, -2.0)));
        assert_eq!(s.position, Vec3::new(1.0, 0.0, -2.0));

        let mut p = CollisionShape::new(ShapeKind::Plane {
            normal: Vec3::Y,
            offset: 0.0,
        });
        assert!(!p.drag(Vec3::X));
        assert_eq!(p.position, Vec3::ZERO);
    }

    #[test]
    fn test_desc_defaults() {
        let sphere = ShapeDesc::new(ShapeSource::Sphere { radius: 0.2 });
        assert_eq!(sphere.drag_axis, Some(Vec3::Y));
        let plane = ShapeDesc::new(ShapeSource::Plane {
            normal: Vec3::Y,
            offset: 0.0,
        });
        assert_eq!(plane.drag_axis, None);
    }

    #[test]
    fn test_build_creates_meshes_unless_told_not_to() {
        let loader = MemoryLoader::new();
        let with_mesh = pollster::block_on(ShapeDesc::new(ShapeSource::Sphere { radius: 0.2 }).build(&loader)).unwrap();
        assert!(with_mesh.mesh().is_some());

        let without = pollster::block_on(
            ShapeDesc::new(ShapeSource::Sphere { radius: 0.2 })
                .without_mesh()
                .build(&loader),
        )
        .unwrap();
        assert!(without.mesh().is_none());

        let plane = pollster::block_on(
            ShapeDesc::new(ShapeSource::Plane {
                normal: Vec3::Y,
                offset: 0.0,
            })
            .build(&loader),
        )
        .unwrap();
        assert!(plane.mesh().is_none());
    }

    #[test]
    fn test_build_mesh_shape_loads_volume() {
        let mut text = String::from("2 2 2\n-1 -1 -1\n2\n");
        for _ in 0..8 {
            text.push_str("0.25\n");
        }
        let loader = MemoryLoader::new().with_text("rock.sdf", text);
        let desc = ShapeDesc::new(ShapeSource::Mesh {
            sdf_file: "rock.sdf".into(),
            mesh_file: Some("rock.glb".into()),
        })
        .with_scale(2.0);

        let shape = pollster::block_on(desc.build(&loader)).unwrap();
        assert!(shape.mesh().is_none());
        assert_eq!(shape.kind().name(), "mesh");
        assert!((shape.distance(Vec3::ZERO) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_build_reports_bad_volume() {
        let loader = MemoryLoader::new().with_text("bad.sdf", "2 2\n");
        let desc = ShapeDesc::new(ShapeSource::Mesh {
            sdf_file: "bad.sdf".into(),
            mesh_file: None,
        });
        let err = pollster::block_on(desc.build(&loader)).unwrap_err();
        assert!(matches!(err, AssetError::SdfVolume(_)));
    }
}
