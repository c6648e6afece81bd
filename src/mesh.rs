//! Procedural triangle meshes for collision shapes.
//!
//! Collision uses the SDFs, not these meshes. They exist so a host can draw
//! the obstacles the fluid is hitting. Meshes are built in the shape's local
//! frame; draw them with [`CollisionShape::world_matrix`](crate::CollisionShape::world_matrix).
//!
//! # Built-in Shapes
//!
//! ```ignore
//! ShapeMesh::cuboid(Vec3::new(1.0, 0.5, 1.0))    // half-extents
//! ShapeMesh::sphere(0.3, 16)
//! ShapeMesh::vertical_cylinder(0.2, 0.5, 32)      // radius, half-height
//! ShapeMesh::cut_hollow_sphere(0.5, 0.2, 0.02, 32)
//! ShapeMesh::terrain(&heightmap)
//! ```

use crate::sdf::Heightmap;
use glam::{Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, TAU};

/// Indexed triangle mesh with per-vertex normals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Counter-clockwise triangles, three indices each.
    pub indices: Vec<u32>,
}

impl ShapeMesh {
    /// Box with half-extents `b`. Faces do not share vertices.
    pub fn cuboid(b: Vec3) -> Self {
        let mut mesh = Self::default();
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            for sign in [1.0, -1.0] {
                let n = axis * sign;
                // Two tangents forming a right-handed frame with n.
                let u = Vec3::new(axis.y, axis.z, axis.x) * sign;
                let v = n.cross(u);
                let base = mesh.positions.len() as u32;
                for (a, c) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                    mesh.positions.push((n + u * a + v * c) * b);
                    mesh.normals.push(n);
                }
                mesh.indices
                    .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
            }
        }
        mesh
    }

    /// UV sphere.
    pub fn sphere(radius: f32, segments: u32) -> Self {
        let rings = segments.max(2);
        let profile: Vec<Vec2> = (0..=rings)
            .map(|i| {
                let a = -FRAC_PI_2 + std::f32::consts::PI * i as f32 / rings as f32;
                Vec2::new(a.cos().max(0.0), a.sin()) * radius
            })
            .collect();
        Self::lathe(&profile, segments.max(3))
    }

    /// Capped cylinder along Y spanning `-half_height..half_height`.
    pub fn vertical_cylinder(radius: f32, half_height: f32, segments: u32) -> Self {
        let h = half_height;
        // Corner points are repeated so caps and side get separate normals.
        let profile = [
            Vec2::new(0.0, -h),
            Vec2::new(radius, -h),
            Vec2::new(radius, -h),
            Vec2::new(radius, h),
            Vec2::new(radius, h),
            Vec2::new(0.0, h),
        ];
        Self::lathe(&profile, segments.max(3))
    }

    /// Spherical shell of mid radius `radius` and half-thickness `thickness`,
    /// open above `cut_height`.
    pub fn cut_hollow_sphere(radius: f32, cut_height: f32, thickness: f32, segments: u32) -> Self {
        let outer = radius + thickness;
        let inner = (radius - thickness).max(0.0);
        let rim = (cut_height / radius).clamp(-1.0, 1.0).asin();
        let steps = (segments / 2).max(2);

        let arc = |r: f32, i: u32| {
            let a = -FRAC_PI_2 + (rim + FRAC_PI_2) * i as f32 / steps as f32;
            Vec2::new(a.cos().max(0.0), a.sin()) * r
        };

        // Outside from the bottom pole up to the rim, then back down inside.
        let mut profile: Vec<Vec2> = (0..=steps).map(|i| arc(outer, i)).collect();
        profile.extend((0..=steps).rev().map(|i| arc(inner, i)));
        Self::lathe(&profile, segments.max(3))
    }

    /// Grid over the heightmap's samples.
    pub fn terrain(map: &Heightmap) -> Self {
        let n = map.subdivisions() + 1;
        let cell = map.size() / map.subdivisions() as f32;
        let half = map.size() / 2.0;

        let mut mesh = Self::default();
        for iz in 0..n {
            for ix in 0..n {
                let x = ix as f32 * cell - half;
                let z = iz as f32 * cell - half;
                mesh.positions.push(Vec3::new(x, map.height(x, z), z));
                mesh.normals.push(map.normal(x, z));
            }
        }
        for iz in 0..n - 1 {
            for ix in 0..n - 1 {
                let i = (iz * n + ix) as u32;
                let row = n as u32;
                mesh.indices
                    .extend_from_slice(&[i, i + row, i + 1, i + 1, i + row, i + row + 1]);
            }
        }
        mesh
    }

    /// Revolve a `(radius, y)` profile around the Y axis.
    ///
    /// Normals are averaged face normals.
    pub fn lathe(profile: &[Vec2], segments: u32) -> Self {
        let mut mesh = Self::default();
        let ring = segments + 1;

        for p in profile {
            for s in 0..=segments {
                let a = TAU * s as f32 / segments as f32;
                mesh.positions.push(Vec3::new(p.x * a.cos(), p.y, p.x * a.sin()));
            }
        }
        for i in 0..profile.len().saturating_sub(1) as u32 {
            for s in 0..segments {
                let a = i * ring + s;
                let b = a + ring;
                mesh.indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        mesh.compute_normals();
        mesh
    }

    /// Recompute smooth normals from the triangles.
    pub fn compute_normals(&mut self) {
        self.normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let n = (self.positions[b] - self.positions[a]).cross(self.positions[c] - self.positions[a]);
            self.normals[a] += n;
            self.normals[b] += n;
            self.normals[c] += n;
        }
        for n in &mut self.normals {
            *n = n.normalize_or_zero();
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Interleaved `[px, py, pz, nx, ny, nz]` per vertex.
    pub fn to_vertices(&self) -> Vec<f32> {
        self.positions
            .iter()
            .zip(&self.normals)
            .flat_map(|(p, n)| [p.x, p.y, p.z, n.x, n.y, n.z])
            .collect()
    }

    /// Axis-aligned bounds, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p))),
        )
    }
}
