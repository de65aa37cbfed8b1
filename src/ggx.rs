//! GGX importance sample sets used to pre-filter cube maps.
//!
//! A [`GgxSamples`] set is built once per roughness and then shared read-only by every
//! worker convolving faces at that roughness. Samples live in lobe-local space where +Z is
//! the lobe axis (the surface normal, which is also the view and reflection direction under
//! the usual `N = V = R` pre-filtering assumption).

use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};

/// One importance sample of the GGX lobe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GgxSample {
    /// Light direction in lobe-local space, unit length with `z > 0`.
    pub direction: Vec3,
    /// Normalised weight; the weights of a set sum to one.
    pub weight: f32,
    /// Source mip level to read this sample from (filtered importance sampling).
    pub lod: f32,
}

#[derive(Debug, Clone)]
pub struct GgxSamples {
    roughness: f32,
    samples: Vec<GgxSample>,
}

impl GgxSamples {
    /// Builds the sample set for `roughness` from `sample_count` Hammersley points.
    ///
    /// `source_size` and `source_mips` describe the cube map the samples will be read from and
    /// drive the per-sample LOD: sparse samples in the tails of the lobe read from blurrier
    /// source mips so that a modest sample count does not alias.
    pub fn generate(roughness: f32, sample_count: usize, source_size: u32, source_mips: usize) -> Self {
        let roughness = if roughness.is_finite() { roughness.clamp(0.0, 1.0) } else { 0.0 };
        if roughness <= 0.0 || sample_count <= 1 {
            return Self::mirror(roughness);
        }

        let alpha = roughness * roughness;
        let count = sample_count as u32;
        let max_lod = source_mips.saturating_sub(1) as f32;
        let texel_solid_angle = 4.0 * PI / (6.0 * (source_size.max(1) as f32).powi(2));

        let mut samples = Vec::with_capacity(sample_count);
        let mut total_weight = 0.0f32;
        for i in 0..count {
            let xi = hammersley(i, count);
            let h = importance_sample_ggx(xi, alpha);
            let l = reflect(-Vec3::Z, h).normalize();
            let n_dot_l = l.z;
            if n_dot_l <= 0.0 {
                continue;
            }
            // N == V, so N.H == V.H and the half-vector Jacobian collapses to D / 4.
            let pdf = distribution_ggx(h.z, alpha) * 0.25;
            let sample_solid_angle = 1.0 / (count as f32 * pdf);
            let lod = (0.5 * (sample_solid_angle / texel_solid_angle).log2() + 1.0).clamp(0.0, max_lod);
            samples.push(GgxSample { direction: l, weight: n_dot_l, lod });
            total_weight += n_dot_l;
        }
        if total_weight <= 0.0 {
            return Self::mirror(roughness);
        }
        for sample in &mut samples {
            sample.weight /= total_weight;
        }
        Self { roughness, samples }
    }

    fn mirror(roughness: f32) -> Self {
        Self { roughness, samples: vec![GgxSample { direction: Vec3::Z, weight: 1.0, lod: 0.0 }] }
    }

    pub fn roughness(&self) -> f32 {
        self.roughness
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True when the set is the single on-axis sample of a perfect mirror.
    pub fn is_mirror(&self) -> bool {
        self.samples.len() == 1 && self.samples[0].direction == Vec3::Z
    }

    pub fn iter(&self) -> impl Iterator<Item = &GgxSample> {
        self.samples.iter()
    }

    pub fn as_slice(&self) -> &[GgxSample] {
        &self.samples
    }

    /// Weighted mean of `cos(theta)` between samples and the lobe axis; 1.0 for a mirror.
    pub fn mean_cosine(&self) -> f32 {
        self.samples.iter().map(|sample| sample.direction.z * sample.weight).sum()
    }
}

/// Roughness stored at `level` of a chain with `mip_count` levels.
pub fn roughness_for_mip(level: usize, mip_count: usize) -> f32 {
    if mip_count <= 1 {
        return 0.0;
    }
    (level as f32 / (mip_count - 1) as f32).clamp(0.0, 1.0)
}

/// Builds an orthonormal basis around `normal`, returning `(tangent, bitangent)`.
pub(crate) fn tangent_frame(normal: Vec3) -> (Vec3, Vec3) {
    let up = if normal.z.abs() < 0.999 { Vec3::Z } else { Vec3::X };
    let tangent = up.cross(normal).normalize();
    let bitangent = normal.cross(tangent);
    (tangent, bitangent)
}

fn importance_sample_ggx(xi: Vec2, alpha: f32) -> Vec3 {
    let phi = TAU * xi.x;
    let cos_theta = ((1.0 - xi.y) / (1.0 + (alpha * alpha - 1.0) * xi.y)).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta)
}

fn distribution_ggx(n_dot_h: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * denom * denom)
}

fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

fn hammersley(i: u32, n: u32) -> Vec2 {
    Vec2::new(i as f32 / n as f32, radical_inverse_vdc(i))
}

fn radical_inverse_vdc(bits: u32) -> f32 {
    (bits.reverse_bits() as f32) * 2.328_306_4e-10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_roughness_is_a_single_mirror_sample() {
        let samples = GgxSamples::generate(0.0, 512, 64, 7);
        assert!(samples.is_mirror());
        assert_eq!(samples.as_slice()[0], GgxSample { direction: Vec3::Z, weight: 1.0, lod: 0.0 });
    }

    #[test]
    fn weights_sum_to_one() {
        for roughness in [0.1, 0.35, 0.6, 1.0] {
            let samples = GgxSamples::generate(roughness, 256, 128, 8);
            let total: f32 = samples.iter().map(|s| s.weight).sum();
            assert!((total - 1.0).abs() < 1e-4, "roughness {roughness}: weights summed to {total}");
            assert!(samples.iter().all(|s| s.direction.z > 0.0 && s.weight > 0.0));
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let a = GgxSamples::generate(0.42, 300, 96, 6);
        let b = GgxSamples::generate(0.42, 300, 96, 6);
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn lobe_widens_with_roughness() {
        let mut previous = f32::INFINITY;
        for level in 0..6 {
            let samples = GgxSamples::generate(roughness_for_mip(level, 6), 512, 128, 8);
            let cosine = samples.mean_cosine();
            assert!(cosine < previous, "mip {level}: mean cosine {cosine} did not drop below {previous}");
            previous = cosine;
        }
    }

    #[test]
    fn sample_lod_stays_within_source_chain() {
        let samples = GgxSamples::generate(1.0, 64, 256, 5);
        assert!(samples.iter().all(|s| (0.0..=4.0).contains(&s.lod)));
        assert!(samples.iter().any(|s| s.lod > 0.0), "sparse rough samples should read blurrier mips");
    }

    #[test]
    fn roughness_mapping_spans_unit_range() {
        assert_eq!(roughness_for_mip(0, 1), 0.0);
        assert_eq!(roughness_for_mip(0, 5), 0.0);
        assert_eq!(roughness_for_mip(4, 5), 1.0);
        assert!((roughness_for_mip(2, 5) - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn tangent_frame_is_orthonormal() {
        for normal in [Vec3::X, Vec3::Z, -Vec3::Z, Vec3::new(0.3, -0.8, 0.2).normalize()] {
            let (t, b) = tangent_frame(normal);
            assert!((t.length() - 1.0).abs() < 1e-5);
            assert!((b.length() - 1.0).abs() < 1e-5);
            assert!(t.dot(normal).abs() < 1e-5);
            assert!(b.dot(normal).abs() < 1e-5);
            assert!(t.dot(b).abs() < 1e-5);
        }
    }
}
