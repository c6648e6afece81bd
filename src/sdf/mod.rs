//! Signed distance functions for collision shapes.
//!
//! Distances are negative inside a shape and positive outside, evaluated in
//! the shape's local frame. Formulas follow Inigo Quilez's distance-function
//! catalogue.
//!
//! | Function | Shape |
//! |----------|-------|
//! | [`sd_box`] | axis-aligned box with half-extents `b` |
//! | [`sd_sphere`] | sphere of radius `r` |
//! | [`sd_plane`] | half-space `dot(p, n) + h < 0` |
//! | [`sd_cut_hollow_sphere`] | spherical shell cut by a horizontal plane |
//! | [`sd_vertical_cylinder`] | capped cylinder along Y |
//! | [`SdfVolume::sample`] | sampled grid, trilinear |
//! | [`Heightmap::height`] | terrain, `p.y - height(x, z)` |

mod terrain;
mod volume;

pub use terrain::Heightmap;
pub use volume::SdfVolume;

use glam::{Vec2, Vec3};

/// Offset used by [`tetrahedron_normal`].
pub const NORMAL_EPSILON: f32 = 0.0001;

const TETRAHEDRON: [Vec3; 4] = [
    Vec3::new(1.0, -1.0, -1.0),
    Vec3::new(-1.0, -1.0, 1.0),
    Vec3::new(-1.0, 1.0, -1.0),
    Vec3::new(1.0, 1.0, 1.0),
];

/// Box centered at the origin with half-extents `b`.
#[inline]
pub fn sd_box(p: Vec3, b: Vec3) -> f32 {
    let q = p.abs() - b;
    q.max(Vec3::ZERO).length() + q.max_element().min(0.0)
}

#[inline]
pub fn sd_sphere(p: Vec3, r: f32) -> f32 {
    p.length() - r
}

/// Plane with normal `n` at signed offset `h` from the origin.
#[inline]
pub fn sd_plane(p: Vec3, n: Vec3, h: f32) -> f32 {
    p.dot(n) + h
}

/// Shell of radius `r` and half-thickness `t`, cut at height `h`.
///
/// The opening faces +Y.
pub fn sd_cut_hollow_sphere(p: Vec3, r: f32, h: f32, t: f32) -> f32 {
    let w = (r * r - h * h).sqrt();
    let q = Vec2::new(Vec2::new(p.x, p.z).length(), p.y);
    if h * q.x < w * q.y {
        (q - Vec2::new(w, h)).length()
    } else {
        (q.length() - r).abs() - t
    }
}

/// Cylinder of radius `r` along Y, spanning `-h..h`.
pub fn sd_vertical_cylinder(p: Vec3, r: f32, h: f32) -> f32 {
    let d = Vec2::new(Vec2::new(p.x, p.z).length() - r, p.y.abs() - h);
    d.x.max(d.y).min(0.0) + d.max(Vec2::ZERO).length()
}

/// Unnormalized SDF gradient by the tetrahedron technique.
///
/// Four evaluations at `p + eps * k` for the corners `k` of a tetrahedron;
/// the weighted sum of the corners points away from the surface.
pub fn tetrahedron_normal(p: Vec3, sd: impl Fn(Vec3) -> f32) -> Vec3 {
    TETRAHEDRON
        .iter()
        .fold(Vec3::ZERO, |n, &k| n + k * sd(p + k * NORMAL_EPSILON))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_box_inside_and_outside() {
        let b = Vec3::new(1.0, 0.5, 2.0);
        assert!(approx(sd_box(Vec3::ZERO, b), -0.5));
        assert!(approx(sd_box(Vec3::new(2.0, 0.0, 0.0), b), 1.0));
        // Corner region: euclidean distance to the corner.
        assert!(approx(sd_box(Vec3::new(2.0, 1.5, 0.0), b), 2.0f32.sqrt()));
    }

    #[test]
    fn test_sphere_and_plane() {
        assert!(approx(sd_sphere(Vec3::new(0.0, 3.0, 4.0), 2.0), 3.0));
        assert!(approx(sd_plane(Vec3::new(5.0, 0.3, -2.0), Vec3::Y, 0.0), 0.3));
        assert!(approx(sd_plane(Vec3::new(0.0, 0.0, 0.5), Vec3::NEG_Z, 1.0), 0.5));
    }

    #[test]
    fn test_cut_hollow_sphere() {
        let (r, h, t) = (1.0, 0.5, 0.1);
        // On the shell, below the cut.
        assert!(approx(sd_cut_hollow_sphere(Vec3::new(0.0, -1.0, 0.0), r, h, t), -t));
        // Center of the bowl is one radius minus thickness from the shell.
        assert!(approx(sd_cut_hollow_sphere(Vec3::ZERO, r, h, t), 1.0 - t));
        // Above the rim: distance to the rim circle.
        let w = (r * r - h * h).sqrt();
        let p = Vec3::new(w, 1.5, 0.0);
        assert!(approx(sd_cut_hollow_sphere(p, r, h, t), 1.0));
    }

    #[test]
    fn test_vertical_cylinder() {
        assert!(approx(sd_vertical_cylinder(Vec3::ZERO, 1.0, 2.0), -1.0));
        assert!(approx(sd_vertical_cylinder(Vec3::new(3.0, 0.0, 0.0), 1.0, 2.0), 2.0));
        assert!(approx(sd_vertical_cylinder(Vec3::new(0.0, 5.0, 0.0), 1.0, 2.0), 3.0));
    }

    #[test]
    fn test_tetrahedron_normal_of_plane() {
        let n = tetrahedron_normal(Vec3::new(0.3, 0.01, -0.2), |p| sd_plane(p, Vec3::Y, 0.0));
        assert!((n.normalize() - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn test_tetrahedron_normal_of_sphere_is_radial() {
        let p = Vec3::new(1.0, 1.0, 0.0);
        let n = tetrahedron_normal(p, |q| sd_sphere(q, 1.0)).normalize();
        assert!((n - p.normalize()).length() < 1e-3);
    }
}
