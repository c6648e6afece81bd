//! Sampled signed distance volumes for mesh-backed shapes.
//!
//! Text format:
//!
//! ```text
//! 64 48 64          dim_x dim_y dim_z
//! -1.0 -0.5 -1.0    origin
//! 0.03125           step
//! 0.512             one sample per line, x fastest, then y, then z
//! ...
//! ```

use crate::error::SdfParseError;
use glam::Vec3;

/// Regular grid of distance samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SdfVolume {
    dims: [usize; 3],
    origin: Vec3,
    step: f32,
    data: Vec<f32>,
}

impl SdfVolume {
    /// Build a volume from samples laid out `z * dim_y * dim_x + y * dim_x + x`.
    pub fn new(dims: [usize; 3], origin: Vec3, step: f32, data: Vec<f32>) -> Result<Self, SdfParseError> {
        let expected = sample_count(dims)?;
        if !(step.is_finite() && step > 0.0) {
            return Err(SdfParseError::InvalidStep(step));
        }
        if data.len() < expected {
            return Err(SdfParseError::SampleCount {
                expected,
                found: data.len(),
            });
        }
        Ok(Self {
            dims,
            origin,
            step,
            data,
        })
    }

    /// Sample a volume with `f` at every grid point.
    pub fn from_fn(dims: [usize; 3], origin: Vec3, step: f32, f: impl Fn(Vec3) -> f32) -> Result<Self, SdfParseError> {
        let [dx, dy, dz] = dims;
        let mut data = Vec::with_capacity(sample_count(dims)?);
        for z in 0..dz {
            for y in 0..dy {
                for x in 0..dx {
                    data.push(f(origin + Vec3::new(x as f32, y as f32, z as f32) * step));
                }
            }
        }
        Self::new(dims, origin, step, data)
    }

    /// Parse the text format described in the module docs.
    pub fn parse(text: &str) -> Result<Self, SdfParseError> {
        let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));

        let dims_line = lines.next().ok_or(SdfParseError::MissingHeader("dimensions"))?;
        let dims = parse_dims(dims_line)?;
        let origin_line = lines.next().ok_or(SdfParseError::MissingHeader("origin"))?;
        let origin = parse_triple(origin_line, 2)?;
        let step_line = lines.next().ok_or(SdfParseError::MissingHeader("step"))?;
        let step = parse_number(step_line.trim(), 3)?;

        let mut data = Vec::new();
        for (i, line) in lines.enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            data.push(parse_number(line, i + 4)?);
        }

        Self::new(dims, Vec3::from_array(origin), step, data)
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Far corner of the sampled region.
    pub fn extent(&self) -> Vec3 {
        let [dx, dy, dz] = self.dims;
        self.origin + Vec3::new((dx - 1) as f32, (dy - 1) as f32, (dz - 1) as f32) * self.step
    }

    #[inline]
    fn at(&self, x: usize, y: usize, z: usize) -> f32 {
        let [dx, dy, _] = self.dims;
        self.data[z * dy * dx + y * dx + x]
    }

    /// Trilinear distance at `p`.
    ///
    /// Outside the grid the boundary cell is extrapolated linearly: the cell
    /// index is clamped but the interpolation weights are not.
    pub fn sample(&self, p: Vec3) -> f32 {
        let g = (p - self.origin) / self.step;
        let [dx, dy, dz] = self.dims;

        let gx = (g.x.floor() as i64).clamp(0, dx as i64 - 2) as usize;
        let gy = (g.y.floor() as i64).clamp(0, dy as i64 - 2) as usize;
        let gz = (g.z.floor() as i64).clamp(0, dz as i64 - 2) as usize;

        let fx = g.x - gx as f32;
        let fy = g.y - gy as f32;
        let fz = g.z - gz as f32;

        let plane = |z: usize| {
            let c0 = self.at(gx, gy, z) * (1.0 - fx) + self.at(gx + 1, gy, z) * fx;
            let c1 = self.at(gx, gy + 1, z) * (1.0 - fx) + self.at(gx + 1, gy + 1, z) * fx;
            c0 * (1.0 - fy) + c1 * fy
        };

        plane(gz) * (1.0 - fz) + plane(gz + 1) * fz
    }
}

/// `dim_x * dim_y * dim_z`, checking the minimum size and overflow.
fn sample_count(dims: [usize; 3]) -> Result<usize, SdfParseError> {
    let [dx, dy, dz] = dims;
    if dx < 2 || dy < 2 || dz < 2 {
        return Err(SdfParseError::TooSmall(dx, dy, dz));
    }
    dx.checked_mul(dy)
        .and_then(|n| n.checked_mul(dz))
        .ok_or(SdfParseError::TooLarge(dx, dy, dz))
}

fn parse_dims(text: &str) -> Result<[usize; 3], SdfParseError> {
    let mut out = [0; 3];
    let mut parts = text.split_whitespace();
    for slot in &mut out {
        let value = parts.next().unwrap_or(text);
        *slot = value.parse::<usize>().map_err(|_| SdfParseError::InvalidNumber {
            line: 1,
            value: value.to_string(),
        })?;
    }
    Ok(out)
}

fn parse_number(value: &str, line: usize) -> Result<f32, SdfParseError> {
    value.parse::<f32>().map_err(|_| SdfParseError::InvalidNumber {
        line,
        value: value.to_string(),
    })
}

fn parse_triple(text: &str, line: usize) -> Result<[f32; 3], SdfParseError> {
    let mut out = [0.0; 3];
    let mut parts = text.split_whitespace();
    for slot in &mut out {
        let value = parts.next().ok_or_else(|| SdfParseError::InvalidNumber {
            line,
            value: text.to_string(),
        })?;
        *slot = parse_number(value, line)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdf::sd_sphere;

    fn cube_text() -> String {
        // 2x2x2 grid, value = x + 10y + 100z
        let mut text = String::from("2 2 2\n0 0 0\n1\n");
        for z in 0..2 {
            for y in 0..2 {
                for x in 0..2 {
                    text.push_str(&format!("{}\n", x + 10 * y + 100 * z));
                }
            }
        }
        text
    }

    #[test]
    fn test_parse_header_and_layout() {
        let vol = SdfVolume::parse(&cube_text()).unwrap();
        assert_eq!(vol.dims(), [2, 2, 2]);
        assert_eq!(vol.step(), 1.0);
        assert_eq!(vol.sample(Vec3::new(1.0, 0.0, 0.0)), 1.0);
        assert_eq!(vol.sample(Vec3::new(0.0, 1.0, 0.0)), 10.0);
        assert_eq!(vol.sample(Vec3::new(0.0, 0.0, 1.0)), 100.0);
    }

    #[test]
    fn test_trilinear_is_exact_for_linear_fields() {
        let vol = SdfVolume::parse(&cube_text()).unwrap();
        let p = Vec3::new(0.25, 0.5, 0.75);
        assert!((vol.sample(p) - (0.25 + 5.0 + 75.0)).abs() < 1e-4);
    }

    #[test]
    fn test_outside_grid_extrapolates() {
        let vol = SdfVolume::parse(&cube_text()).unwrap();
        assert!((vol.sample(Vec3::new(3.0, 0.0, 0.0)) - 3.0).abs() < 1e-5);
        assert!((vol.sample(Vec3::new(-1.0, 0.0, 0.0)) + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_sampled_sphere_close_to_analytic() {
        let vol = SdfVolume::from_fn([21, 21, 21], Vec3::splat(-1.0), 0.1, |p| sd_sphere(p, 0.6)).unwrap();
        let p = Vec3::new(0.33, -0.12, 0.27);
        assert!((vol.sample(p) - sd_sphere(p, 0.6)).abs() < 0.02);
        assert!((vol.extent() - Vec3::ONE).length() < 1e-5);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(SdfVolume::parse(""), Err(SdfParseError::MissingHeader("dimensions")));
        assert_eq!(SdfVolume::parse("2 2 2\n0 0 0"), Err(SdfParseError::MissingHeader("step")));
        assert_eq!(
            SdfVolume::parse("2 2 2\n0 0 0\n1\n0.5\n"),
            Err(SdfParseError::SampleCount { expected: 8, found: 1 })
        );
        assert_eq!(
            SdfVolume::parse("2 2 1\n0 0 0\n1\n"),
            Err(SdfParseError::TooSmall(2, 2, 1))
        );
        assert!(matches!(
            SdfVolume::parse("2 2\n0 0 0\n1\n"),
            Err(SdfParseError::InvalidNumber { line: 1, .. })
        ));
        assert!(matches!(
            SdfVolume::parse("2 2 2\n0 x 0\n1\n"),
            Err(SdfParseError::InvalidNumber { line: 2, .. })
        ));
    }

    #[test]
    fn test_fractional_dimensions_are_rejected() {
        let mut text = String::from("2.9 2 2\n0 0 0\n1\n");
        for _ in 0..8 {
            text.push_str("0.5\n");
        }
        assert_eq!(
            SdfVolume::parse(&text),
            Err(SdfParseError::InvalidNumber {
                line: 1,
                value: "2.9".into()
            })
        );
    }

    #[test]
    fn test_huge_dimensions_report_overflow() {
        let text = format!("{0} {0} 2\n0 0 0\n1\n0.5\n", usize::MAX / 2);
        assert_eq!(
            SdfVolume::parse(&text),
            Err(SdfParseError::TooLarge(usize::MAX / 2, usize::MAX / 2, 2))
        );
        assert!(matches!(
            SdfVolume::from_fn([usize::MAX, 2, 2], Vec3::ZERO, 1.0, |_| 0.0),
            Err(SdfParseError::TooLarge(..))
        ));
    }
}
