//! CPU cube maps with a full mip chain of RGBA `f32` faces.
//!
//! Faces are stored in the usual `+X, -X, +Y, -Y, +Z, -Z` order. Texel `(x, y)` of a
//! `w x h` face covers face coordinates `u = 2 (x + 0.5) / w - 1` and `v = 2 (y + 0.5) / h - 1`,
//! which [`face_direction`] turns into a world direction.

use anyhow::{ensure, Result};
use glam::{Vec3, Vec4};

mod convolve;
mod fetch;

pub use convolve::{ConvolveReport, GgxSettings, LobeStats, DEFAULT_SAMPLE_COUNT};

pub const FACE_COUNT: usize = 6;

pub type Face = Vec<Vec4>;
pub type Faces = [Face; FACE_COUNT];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; FACE_COUNT] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            CubeFace::PositiveX => "+X",
            CubeFace::NegativeX => "-X",
            CubeFace::PositiveY => "+Y",
            CubeFace::NegativeY => "-Y",
            CubeFace::PositiveZ => "+Z",
            CubeFace::NegativeZ => "-Z",
        }
    }
}

/// Direction through face coordinates `(u, v)`; not normalised. Coordinates outside
/// `[-1, 1]` extend the face plane past its edges.
pub fn face_direction(face: CubeFace, u: f32, v: f32) -> Vec3 {
    match face {
        CubeFace::PositiveX => Vec3::new(1.0, -v, -u),
        CubeFace::NegativeX => Vec3::new(-1.0, -v, u),
        CubeFace::PositiveY => Vec3::new(u, 1.0, v),
        CubeFace::NegativeY => Vec3::new(u, -1.0, -v),
        CubeFace::PositiveZ => Vec3::new(u, -v, 1.0),
        CubeFace::NegativeZ => Vec3::new(-u, -v, -1.0),
    }
}

/// Face hit by `dir` and the face coordinates in `[-1, 1]`. `dir` must be non-zero.
pub fn direction_to_face(dir: Vec3) -> (CubeFace, f32, f32) {
    let abs = dir.abs();
    if abs.x >= abs.y && abs.x >= abs.z {
        let inv = 1.0 / abs.x;
        if dir.x > 0.0 {
            (CubeFace::PositiveX, -dir.z * inv, -dir.y * inv)
        } else {
            (CubeFace::NegativeX, dir.z * inv, -dir.y * inv)
        }
    } else if abs.y >= abs.z {
        let inv = 1.0 / abs.y;
        if dir.y > 0.0 {
            (CubeFace::PositiveY, dir.x * inv, dir.z * inv)
        } else {
            (CubeFace::NegativeY, dir.x * inv, -dir.z * inv)
        }
    } else {
        let inv = 1.0 / abs.z;
        if dir.z > 0.0 {
            (CubeFace::PositiveZ, dir.x * inv, -dir.y * inv)
        } else {
            (CubeFace::NegativeZ, -dir.x * inv, -dir.y * inv)
        }
    }
}

/// Solid angle subtended by texel `(x, y)` of a `width x height` face.
pub fn texel_solid_angle(x: u32, y: u32, width: u32, height: u32) -> f32 {
    let du = 1.0 / width as f32;
    let dv = 1.0 / height as f32;
    let u = 2.0 * (x as f32 + 0.5) * du - 1.0;
    let v = 2.0 * (y as f32 + 0.5) * dv - 1.0;
    let (u0, u1) = (u - du, u + du);
    let (v0, v1) = (v - dv, v + dv);
    area_element(u0, v0) - area_element(u0, v1) - area_element(u1, v0) + area_element(u1, v1)
}

fn area_element(x: f32, y: f32) -> f32 {
    (x * y).atan2((x * x + y * y + 1.0).sqrt())
}

pub(crate) fn texel_center(x: u32, y: u32, width: u32, height: u32) -> (f32, f32) {
    (2.0 * (x as f32 + 0.5) / width as f32 - 1.0, 2.0 * (y as f32 + 0.5) / height as f32 - 1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CubeMap {
    width: u32,
    height: u32,
    mips: Vec<Faces>,
}

impl CubeMap {
    /// Allocates a zeroed cube map whose mip 0 faces are `width x height`.
    ///
    /// Each further level halves both dimensions, stopping at 1.
    pub fn new(width: u32, height: u32, mip_count: usize) -> Result<Self> {
        ensure!(width > 0 && height > 0, "Cube map faces must be non-empty (got {width}x{height})");
        ensure!(mip_count > 0, "Cube map needs at least one mip level");
        let mips = (0..mip_count)
            .map(|level| {
                let (w, h) = level_dimensions(width, height, level);
                std::array::from_fn(|_| vec![Vec4::ZERO; (w * h) as usize])
            })
            .collect();
        Ok(Self { width, height, mips })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn mip_count(&self) -> usize {
        self.mips.len()
    }

    pub fn mip_dimensions(&self, level: usize) -> (u32, u32) {
        self.check_level(level);
        level_dimensions(self.width, self.height, level)
    }

    pub fn mip(&self, level: usize) -> &Faces {
        self.check_level(level);
        &self.mips[level]
    }

    pub fn edit_mip(&mut self, level: usize) -> &mut Faces {
        self.check_level(level);
        &mut self.mips[level]
    }

    /// Number of texels across every face of every level.
    pub fn texel_count(&self) -> u64 {
        self.mips.iter().map(|faces| faces.iter().map(|face| face.len() as u64).sum::<u64>()).sum()
    }

    pub fn texel(&self, level: usize, face: CubeFace, x: u32, y: u32) -> Vec4 {
        let (w, h) = self.mip_dimensions(level);
        assert!(x < w && y < h, "texel ({x}, {y}) outside {w}x{h} mip {level}");
        self.mips[level][face.index()][(y * w + x) as usize]
    }

    pub fn fill(&mut self, color: Vec4) {
        for faces in &mut self.mips {
            for face in faces.iter_mut() {
                face.fill(color);
            }
        }
    }

    pub fn fill_face(&mut self, level: usize, face: CubeFace, color: Vec4) {
        self.edit_mip(level)[face.index()].fill(color);
    }

    /// Rebuilds levels 1.. from level 0 with a 2x2 box filter.
    pub fn generate_mips(&mut self) {
        for level in 1..self.mips.len() {
            let (src_w, src_h) = level_dimensions(self.width, self.height, level - 1);
            let (dst_w, dst_h) = level_dimensions(self.width, self.height, level);
            let (upper, lower) = self.mips.split_at_mut(level);
            let src_faces = &upper[level - 1];
            let dst_faces = &mut lower[0];
            for (src, dst) in src_faces.iter().zip(dst_faces.iter_mut()) {
                for y in 0..dst_h {
                    let y0 = (2 * y).min(src_h - 1);
                    let y1 = (2 * y + 1).min(src_h - 1);
                    for x in 0..dst_w {
                        let x0 = (2 * x).min(src_w - 1);
                        let x1 = (2 * x + 1).min(src_w - 1);
                        let sum = src[(y0 * src_w + x0) as usize]
                            + src[(y0 * src_w + x1) as usize]
                            + src[(y1 * src_w + x0) as usize]
                            + src[(y1 * src_w + x1) as usize];
                        dst[(y * dst_w + x) as usize] = sum * 0.25;
                    }
                }
            }
        }
    }

    /// Solid-angle weighted mean radiance over the whole sphere at `level`.
    pub fn level_mean(&self, level: usize) -> Vec4 {
        let (w, h) = self.mip_dimensions(level);
        let mut total = Vec4::ZERO;
        let mut area = 0.0f32;
        for face in self.mips[level].iter() {
            for y in 0..h {
                for x in 0..w {
                    let solid_angle = texel_solid_angle(x, y, w, h);
                    total += face[(y * w + x) as usize] * solid_angle;
                    area += solid_angle;
                }
            }
        }
        if area > 0.0 {
            total / area
        } else {
            Vec4::ZERO
        }
    }

    /// Content hash over dimensions and raw texel bits.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.width.to_le_bytes());
        hasher.update(&self.height.to_le_bytes());
        hasher.update(&(self.mips.len() as u32).to_le_bytes());
        let mut bytes = Vec::new();
        for faces in &self.mips {
            for face in faces.iter() {
                bytes.clear();
                for texel in face {
                    for component in texel.to_array() {
                        bytes.extend_from_slice(&component.to_bits().to_le_bytes());
                    }
                }
                hasher.update(&bytes);
            }
        }
        hasher.finalize()
    }

    fn check_level(&self, level: usize) {
        assert!(level < self.mips.len(), "mip level {level} out of range (mip count {})", self.mips.len());
    }
}

fn level_dimensions(width: u32, height: u32, level: usize) -> (u32, u32) {
    let shift = level.min(31) as u32;
    ((width >> shift).max(1), (height >> shift).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn new_allocates_shrinking_zeroed_levels() {
        let cubemap = CubeMap::new(16, 8, 6).expect("cube map");
        assert_eq!(cubemap.mip_count(), 6);
        let expected = [(16, 8), (8, 4), (4, 2), (2, 1), (1, 1), (1, 1)];
        for (level, dims) in expected.into_iter().enumerate() {
            assert_eq!(cubemap.mip_dimensions(level), dims);
            for face in cubemap.mip(level) {
                assert_eq!(face.len(), (dims.0 * dims.1) as usize);
                assert!(face.iter().all(|texel| *texel == Vec4::ZERO));
            }
        }
        assert_eq!(cubemap.texel_count(), 6 * (128 + 32 + 8 + 2 + 1 + 1));
    }

    #[test]
    fn new_rejects_empty_layouts() {
        assert!(CubeMap::new(0, 4, 1).is_err());
        assert!(CubeMap::new(4, 0, 1).is_err());
        assert!(CubeMap::new(4, 4, 0).is_err());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn edit_mip_past_chain_panics() {
        let mut cubemap = CubeMap::new(4, 4, 2).expect("cube map");
        cubemap.edit_mip(2);
    }

    #[test]
    fn edit_mip_writes_are_visible_through_mip() {
        let mut cubemap = CubeMap::new(4, 4, 2).expect("cube map");
        cubemap.edit_mip(1)[CubeFace::NegativeY.index()][3] = Vec4::splat(2.0);
        assert_eq!(cubemap.texel(1, CubeFace::NegativeY, 1, 1), Vec4::splat(2.0));
        assert_eq!(cubemap.texel(1, CubeFace::PositiveY, 1, 1), Vec4::ZERO);
    }

    #[test]
    fn face_coordinates_round_trip() {
        for face in CubeFace::ALL {
            for (u, v) in [(0.0, 0.0), (0.5, -0.25), (-0.9, 0.9), (0.99, 0.1)] {
                let (hit, hu, hv) = direction_to_face(face_direction(face, u, v) * 3.0);
                assert_eq!(hit, face, "{} ({u}, {v})", face.label());
                assert!((hu - u).abs() < 1e-5 && (hv - v).abs() < 1e-5, "{} ({u}, {v})", face.label());
            }
        }
    }

    #[test]
    fn solid_angles_cover_the_sphere() {
        let size = 8;
        let mut total = 0.0;
        for y in 0..size {
            for x in 0..size {
                total += texel_solid_angle(x, y, size, size);
            }
        }
        assert!((total * 6.0 - 4.0 * PI).abs() < 1e-3, "sphere area was {}", total * 6.0);
    }

    #[test]
    fn generate_mips_box_filters_each_level() {
        let mut cubemap = CubeMap::new(2, 2, 2).expect("cube map");
        let face = &mut cubemap.edit_mip(0)[CubeFace::PositiveZ.index()];
        face.copy_from_slice(&[Vec4::splat(1.0), Vec4::splat(2.0), Vec4::splat(3.0), Vec4::splat(6.0)]);
        cubemap.generate_mips();
        assert_eq!(cubemap.texel(1, CubeFace::PositiveZ, 0, 0), Vec4::splat(3.0));
        assert_eq!(cubemap.texel(1, CubeFace::NegativeZ, 0, 0), Vec4::ZERO);
    }

    #[test]
    fn level_mean_of_uniform_map_is_the_fill() {
        let mut cubemap = CubeMap::new(8, 8, 3).expect("cube map");
        cubemap.fill(Vec4::new(0.5, 0.25, 1.0, 1.0));
        let mean = cubemap.level_mean(2);
        assert!((mean - Vec4::new(0.5, 0.25, 1.0, 1.0)).abs().max_element() < 1e-5);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let mut a = CubeMap::new(4, 4, 2).expect("cube map");
        let b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        a.fill_face(1, CubeFace::PositiveX, Vec4::ONE);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
