//! Procedural source environments for bakes that do not come from an image decoder.

use crate::cubemap::{face_direction, texel_center, CubeFace, CubeMap};
use anyhow::{bail, Result};
use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentPreset {
    #[default]
    NeutralGradient,
    Uniform,
}

impl EnvironmentPreset {
    pub fn label(self) -> &'static str {
        match self {
            EnvironmentPreset::NeutralGradient => "Neutral Gradient",
            EnvironmentPreset::Uniform => "Uniform",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "neutral" | "neutral_gradient" => Ok(EnvironmentPreset::NeutralGradient),
            "uniform" => Ok(EnvironmentPreset::Uniform),
            other => bail!("Unknown environment preset '{other}'. Use neutral or uniform."),
        }
    }

    /// Builds the preset at `face_size` with `mip_count` box-filtered levels.
    pub fn build(self, face_size: u32, mip_count: usize) -> Result<CubeMap> {
        let mut cubemap = match self {
            EnvironmentPreset::NeutralGradient => from_radiance(face_size, mip_count, neutral_gradient)?,
            EnvironmentPreset::Uniform => uniform(face_size, mip_count, Vec4::new(0.5, 0.5, 0.5, 1.0))?,
        };
        cubemap.generate_mips();
        Ok(cubemap)
    }
}

pub fn uniform(face_size: u32, mip_count: usize, color: Vec4) -> Result<CubeMap> {
    let mut cubemap = CubeMap::new(face_size, face_size, mip_count)?;
    cubemap.fill(color);
    Ok(cubemap)
}

/// Fills mip 0 by evaluating `radiance` at every texel centre direction.
pub fn from_radiance(face_size: u32, mip_count: usize, radiance: impl Fn(Vec3) -> Vec3) -> Result<CubeMap> {
    let mut cubemap = CubeMap::new(face_size, face_size, mip_count)?;
    let (w, h) = cubemap.mip_dimensions(0);
    for face in CubeFace::ALL {
        let pixels = &mut cubemap.edit_mip(0)[face.index()];
        for y in 0..h {
            for x in 0..w {
                let (u, v) = texel_center(x, y, w, h);
                let color = radiance(face_direction(face, u, v).normalize());
                pixels[(y * w + x) as usize] = color.extend(1.0);
            }
        }
    }
    Ok(cubemap)
}

/// Sky gradient over a dim ground with a small warm sun.
pub fn neutral_gradient(dir: Vec3) -> Vec3 {
    let sun_dir = Vec3::new(0.45, 0.55, -0.7).normalize();
    let elevation = dir.y.clamp(-1.0, 1.0);
    let horizon = 1.0 - elevation.abs();
    let color = if elevation >= 0.0 {
        let sky = Vec3::new(0.25, 0.35, 0.6) * elevation + Vec3::new(0.65, 0.7, 0.9) * (1.0 - elevation);
        sky * (0.6 + 0.4 * horizon)
    } else {
        Vec3::new(0.08, 0.07, 0.05) * (1.0 - horizon) + Vec3::new(0.2, 0.18, 0.16) * horizon
    };
    let angle = dir.dot(sun_dir).clamp(-1.0, 1.0).acos();
    let sun = (1.0 - angle * 6.0).max(0.0).powf(12.0);
    color + Vec3::new(1.0, 0.9, 0.75) * sun * 8.0
}
