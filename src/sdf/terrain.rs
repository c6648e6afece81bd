//! Heightmap terrain.
//!
//! A square grid of `(subdivisions + 1)²` height samples covering
//! `[-size/2, size/2]` on X and Z. Heights between samples are bilinear.
//! Image row 0 is the far (+Z) edge of the terrain.

#[cfg(feature = "heightmap-images")]
use crate::error::AssetError;
use glam::Vec3;

/// Sampled height field centered at the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightmap {
    size: f32,
    subdivisions: usize,
    /// Row-major by Z then X: `heights[iz * (subdivisions + 1) + ix]`.
    heights: Vec<f32>,
}

impl Heightmap {
    /// Sample `f(x, z)` on the grid.
    pub fn from_fn(size: f32, subdivisions: usize, f: impl Fn(f32, f32) -> f32) -> Self {
        let subdivisions = subdivisions.max(1);
        let n = subdivisions + 1;
        let cell = size / subdivisions as f32;
        let mut heights = Vec::with_capacity(n * n);
        for iz in 0..n {
            for ix in 0..n {
                let x = ix as f32 * cell - size / 2.0;
                let z = iz as f32 * cell - size / 2.0;
                heights.push(f(x, z));
            }
        }
        Self {
            size,
            subdivisions,
            heights,
        }
    }

    /// Flat terrain at height 0.
    pub fn flat(size: f32) -> Self {
        Self::from_fn(size, 1, |_, _| 0.0)
    }

    /// Decode a grayscale-ish image. Heights are `luma / 255 * max_height`.
    #[cfg(feature = "heightmap-images")]
    pub fn from_image_bytes(bytes: &[u8], size: f32, subdivisions: usize, max_height: f32) -> Result<Self, AssetError> {
        let image = image::load_from_memory(bytes)?.to_rgb8();
        let (w, h) = image.dimensions();
        let subdivisions = subdivisions.max(1);

        let map = Self::from_fn(size, subdivisions, |x, z| {
            let u = (x + size / 2.0) / size;
            let v = 1.0 - (z + size / 2.0) / size;
            let px = ((u * (w - 1) as f32) as u32).min(w - 1);
            let py = ((v * (h - 1) as f32) as u32).min(h - 1);
            let [r, g, b] = image.get_pixel(px, py).0;
            let luma = r as f32 * 0.3 + g as f32 * 0.59 + b as f32 * 0.11;
            luma / 255.0 * max_height
        });
        Ok(map)
    }

    #[inline]
    pub fn size(&self) -> f32 {
        self.size
    }

    #[inline]
    pub fn subdivisions(&self) -> usize {
        self.subdivisions
    }

    #[inline]
    fn cell(&self) -> f32 {
        self.size / self.subdivisions as f32
    }

    #[inline]
    fn at(&self, ix: usize, iz: usize) -> f32 {
        self.heights[iz * (self.subdivisions + 1) + ix]
    }

    /// Whether `(x, z)` lies on the terrain.
    pub fn contains(&self, x: f32, z: f32) -> bool {
        let half = self.size / 2.0;
        (-half..=half).contains(&x) && (-half..=half).contains(&z)
    }

    /// Height at `(x, z)`; 0 off the terrain.
    pub fn height(&self, x: f32, z: f32) -> f32 {
        if !self.contains(x, z) {
            return 0.0;
        }
        let gx = (x + self.size / 2.0) / self.cell();
        let gz = (z + self.size / 2.0) / self.cell();
        let ix = (gx.floor() as usize).min(self.subdivisions - 1);
        let iz = (gz.floor() as usize).min(self.subdivisions - 1);
        let fx = gx - ix as f32;
        let fz = gz - iz as f32;

        let h0 = self.at(ix, iz) * (1.0 - fx) + self.at(ix + 1, iz) * fx;
        let h1 = self.at(ix, iz + 1) * (1.0 - fx) + self.at(ix + 1, iz + 1) * fx;
        h0 * (1.0 - fz) + h1 * fz
    }

    /// Surface normal at `(x, z)` from central differences; +Y off the terrain.
    pub fn normal(&self, x: f32, z: f32) -> Vec3 {
        if !self.contains(x, z) {
            return Vec3::Y;
        }
        let e = self.cell();
        let dx = self.height(x + e, z) - self.height(x - e, z);
        let dz = self.height(x, z + e) - self.height(x, z - e);
        Vec3::new(-dx, 2.0 * e, -dz).try_normalize().unwrap_or(Vec3::Y)
    }

    /// Signed vertical distance to the surface.
    #[inline]
    pub fn sd(&self, p: Vec3) -> f32 {
        p.y - self.height(p.x, p.z)
    }
}
