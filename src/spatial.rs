//! Spatial hashing for neighbor queries.
//!
//! Space is divided into cubic cells of side `spacing`. Each integer cell
//! coordinate is hashed into a table of `2 * max_count` buckets, and the
//! particles are sorted into those buckets with a counting sort:
//!
//! 1. count particles per bucket
//! 2. prefix-sum the counts into bucket end offsets (plus a guard entry)
//! 3. walk the particles and decrement their bucket's offset while scattering
//!
//! After step 3 the offsets are bucket *starts*, and bucket `h` occupies
//! `entries[start[h]..start[h + 1]]`. Because the scatter fills each bucket
//! back to front, indices within a bucket are in descending order.
//!
//! The table is rebuilt from scratch every simulation sub-step; there is no
//! incremental insert or removal.

use glam::Vec3;

const HASH_X: i32 = 92_837_111;
const HASH_Y: i32 = 689_287_499;
const HASH_Z: i32 = 283_923_481;

/// Uniform-grid spatial hash over a flat particle position buffer.
#[derive(Debug, Clone)]
pub struct SpatialHash {
    spacing: f32,
    table_size: usize,
    /// `table_size + 1` entries; the last one is a guard equal to the particle count.
    cell_start: Vec<u32>,
    cell_entries: Vec<u32>,
    query_ids: Vec<usize>,
}

impl SpatialHash {
    /// Create a hash for up to `max_count` particles with cell size `spacing`.
    pub fn new(spacing: f32, max_count: usize) -> Self {
        let table_size = 2 * max_count;
        Self {
            spacing,
            table_size,
            cell_start: vec![0; table_size + 1],
            cell_entries: vec![0; max_count],
            query_ids: Vec::with_capacity(max_count),
        }
    }

    /// Cell size in world units.
    #[inline]
    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Number of buckets.
    #[inline]
    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Maximum number of particles the table can hold.
    #[inline]
    pub fn max_count(&self) -> usize {
        self.cell_entries.len()
    }

    /// Integer cell coordinate along one axis.
    #[inline]
    pub fn int_coord(&self, coord: f32) -> i32 {
        (coord / self.spacing).floor() as i32
    }

    /// Integer cell containing `pos`.
    #[inline]
    pub fn cell_of(&self, pos: Vec3) -> [i32; 3] {
        [self.int_coord(pos.x), self.int_coord(pos.y), self.int_coord(pos.z)]
    }

    /// Bucket index of an integer cell.
    #[inline]
    pub fn hash_coords(&self, xi: i32, yi: i32, zi: i32) -> usize {
        let h = xi.wrapping_mul(HASH_X) ^ yi.wrapping_mul(HASH_Y) ^ zi.wrapping_mul(HASH_Z);
        h.unsigned_abs() as usize % self.table_size
    }

    /// Bucket index of the cell containing `pos`.
    #[inline]
    pub fn bucket_of(&self, pos: Vec3) -> usize {
        let [x, y, z] = self.cell_of(pos);
        self.hash_coords(x, y, z)
    }

    /// Particle indices stored in bucket `h`, or `None` past the table.
    pub fn bucket(&self, h: usize) -> Option<&[u32]> {
        if h >= self.table_size {
            return None;
        }
        let start = self.cell_start[h] as usize;
        let end = self.cell_start[h + 1] as usize;
        self.cell_entries.get(start..end)
    }

    /// Rebuild the table from the first `count` positions.
    ///
    /// Particles beyond [`max_count`](Self::max_count) are ignored.
    pub fn build(&mut self, positions: &[Vec3], count: usize) {
        let num = count.min(self.cell_entries.len()).min(positions.len());
        if self.table_size == 0 {
            return;
        }

        self.cell_start.fill(0);
        self.cell_entries.fill(0);

        for &p in &positions[..num] {
            let h = self.bucket_of(p);
            self.cell_start[h] += 1;
        }

        let mut start = 0;
        for slot in &mut self.cell_start[..self.table_size] {
            start += *slot;
            *slot = start;
        }
        self.cell_start[self.table_size] = start;

        for (i, &p) in positions[..num].iter().enumerate() {
            let h = self.bucket_of(p);
            self.cell_start[h] -= 1;
            self.cell_entries[self.cell_start[h] as usize] = i as u32;
        }
    }

    /// Candidate neighbors of particle `index` within `max_distance`.
    ///
    /// Visits every cell overlapped by the cube of half-size `max_distance`
    /// around the particle (3x3x3 cells when `max_distance == spacing`). The
    /// result is a superset of the true neighbors and includes `index`
    /// itself; callers filter by distance. A bucket reached from two cells
    /// through a hash collision is listed twice.
    pub fn query(&mut self, positions: &[Vec3], index: usize, max_distance: f32) -> &[usize] {
        self.query_ids.clear();
        if self.table_size == 0 {
            return &self.query_ids;
        }

        let p = positions[index];
        let [x0, y0, z0] = self.cell_of(p - Vec3::splat(max_distance));
        let [x1, y1, z1] = self.cell_of(p + Vec3::splat(max_distance));

        for xi in x0..=x1 {
            for yi in y0..=y1 {
                for zi in z0..=z1 {
                    let h = self.hash_coords(xi, yi, zi);
                    let start = self.cell_start[h] as usize;
                    let end = self.cell_start[h + 1] as usize;
                    self.query_ids
                        .extend(self.cell_entries[start..end].iter().map(|&i| i as usize));
                }
            }
        }

        &self.query_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice(n: usize, step: f32) -> Vec<Vec3> {
        let mut out = Vec::new();
        for x in 0..n {
            for y in 0..n {
                for z in 0..n {
                    out.push(Vec3::new(x as f32, y as f32, z as f32) * step - Vec3::splat(0.3));
                }
            }
        }
        out
    }

    #[test]
    fn test_hash_matches_reference_formula() {
        let hash = SpatialHash::new(0.1, 50);
        let (x, y, z) = (3i32, -7i32, 12i32);
        let h = (x.wrapping_mul(92837111) ^ y.wrapping_mul(689287499) ^ z.wrapping_mul(283923481))
            .unsigned_abs() as usize
            % 100;
        assert_eq!(hash.hash_coords(x, y, z), h);
    }

    #[test]
    fn test_int_coord_floors_negative_values() {
        let hash = SpatialHash::new(0.5, 1);
        assert_eq!(hash.int_coord(0.49), 0);
        assert_eq!(hash.int_coord(-0.01), -1);
        assert_eq!(hash.int_coord(-0.5), -1);
        assert_eq!(hash.int_coord(-0.51), -2);
    }

    #[test]
    fn test_build_places_every_particle_in_its_bucket_once() {
        let positions = lattice(6, 0.07);
        let mut hash = SpatialHash::new(0.1, positions.len());
        hash.build(&positions, positions.len());

        let mut seen = vec![0usize; positions.len()];
        for h in 0..hash.table_size() {
            for &i in hash.bucket(h).unwrap() {
                seen[i as usize] += 1;
                assert_eq!(hash.bucket_of(positions[i as usize]), h);
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_bucket_entries_are_in_descending_index_order() {
        let positions = vec![Vec3::splat(0.01); 5];
        let mut hash = SpatialHash::new(0.1, 5);
        hash.build(&positions, 5);

        let h = hash.bucket_of(positions[0]);
        assert_eq!(hash.bucket(h), Some(&[4, 3, 2, 1, 0][..]));
    }

    #[test]
    fn test_build_respects_live_prefix() {
        let positions = lattice(3, 0.2);
        let mut hash = SpatialHash::new(0.1, positions.len());
        hash.build(&positions, 5);

        let total: usize = (0..hash.table_size()).map(|h| hash.bucket(h).map_or(0, |b| b.len())).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_query_has_no_false_negatives() {
        let positions = lattice(7, 0.045);
        let radius = 0.1;
        let mut hash = SpatialHash::new(radius, positions.len());
        hash.build(&positions, positions.len());

        for i in (0..positions.len()).step_by(13) {
            let found: Vec<usize> = hash.query(&positions, i, radius).to_vec();
            for (j, &q) in positions.iter().enumerate() {
                if (q - positions[i]).length() <= radius {
                    assert!(found.contains(&j), "particle {} missing from query of {}", j, i);
                }
            }
        }
    }

    #[test]
    fn test_query_includes_self() {
        let positions = vec![Vec3::new(10.0, -4.0, 2.5)];
        let mut hash = SpatialHash::new(0.2, 1);
        hash.build(&positions, 1);
        assert!(hash.query(&positions, 0, 0.2).contains(&0));
    }

    #[test]
    fn test_empty_hash_is_inert() {
        let positions = vec![Vec3::ZERO];
        let mut hash = SpatialHash::new(0.2, 0);
        hash.build(&positions, 1);
        assert!(hash.query(&positions, 0, 0.2).is_empty());
    }
}
