use super::{face_direction, texel_center, CubeFace, CubeMap, Face};
use crate::abort::AbortSignal;
use crate::ggx::{roughness_for_mip, tangent_frame, GgxSamples};
use glam::{Vec3, Vec4};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

pub const DEFAULT_SAMPLE_COUNT: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GgxSettings {
    /// Hammersley points drawn per roughness; rejected points below the horizon are dropped.
    pub sample_count: usize,
    /// Spread (mip, face) tasks over the rayon pool.
    pub parallel: bool,
    /// Scanlines convolved between two polls of the abort signal.
    pub rows_per_abort_check: u32,
}

impl Default for GgxSettings {
    fn default() -> Self {
        Self { sample_count: DEFAULT_SAMPLE_COUNT, parallel: true, rows_per_abort_check: 1 }
    }
}

/// Sample set used for one output level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LobeStats {
    pub roughness: f32,
    pub samples: usize,
    pub mean_cosine: f32,
}

impl LobeStats {
    fn of(samples: &GgxSamples) -> Self {
        Self { roughness: samples.roughness(), samples: samples.len(), mean_cosine: samples.mean_cosine() }
    }
}

/// Work accounting for one convolution pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConvolveReport {
    pub pixels_written: u64,
    pub pixels_total: u64,
    /// The pass stopped early; the destination holds a partial result and must be discarded.
    pub aborted: bool,
    /// One entry per output level, in mip order.
    pub lobes: Vec<LobeStats>,
}

impl ConvolveReport {
    pub fn completed(&self) -> bool {
        !self.aborted && self.pixels_written == self.pixels_total
    }
}

struct FaceTask<'a> {
    level: usize,
    face: CubeFace,
    width: u32,
    height: u32,
    pixels: &'a mut Face,
}

impl CubeMap {
    /// Pre-filters `self` into every level of `output` with the default [`GgxSettings`].
    pub fn convolve_for_ggx<A>(&self, output: &mut CubeMap, abort: &A) -> ConvolveReport
    where
        A: AbortSignal + ?Sized,
    {
        self.convolve_for_ggx_with(output, abort, &GgxSettings::default())
    }

    /// Pre-filters `self` into `output`, level `L` holding the GGX lobe of
    /// roughness `L / (mip_count - 1)`.
    ///
    /// Level 0 is the mirror case and is copied (or resampled when the resolutions differ).
    /// Each (mip, face) pair is an independent task writing only its own face buffer.
    pub fn convolve_for_ggx_with<A>(&self, output: &mut CubeMap, abort: &A, settings: &GgxSettings) -> ConvolveReport
    where
        A: AbortSignal + ?Sized,
    {
        let mip_count = output.mip_count();
        let pixels_total = output.texel_count();
        let source_size = self.width.max(self.height);
        let sample_sets: Vec<GgxSamples> = (0..mip_count)
            .map(|level| {
                GgxSamples::generate(
                    roughness_for_mip(level, mip_count),
                    settings.sample_count,
                    source_size,
                    self.mip_count(),
                )
            })
            .collect();
        for (level, samples) in sample_sets.iter().enumerate() {
            debug!(
                "[prefilter] mip {level}: roughness {:.3}, {} samples, lobe mean cosine {:.4}",
                samples.roughness(),
                samples.len(),
                samples.mean_cosine()
            );
        }

        let (out_width, out_height) = (output.width, output.height);
        let mut tasks = Vec::with_capacity(mip_count * CubeFace::ALL.len());
        for (level, faces) in output.mips.iter_mut().enumerate() {
            let (width, height) = super::level_dimensions(out_width, out_height, level);
            for (face, pixels) in CubeFace::ALL.into_iter().zip(faces.iter_mut()) {
                tasks.push(FaceTask { level, face, width, height, pixels });
            }
        }

        let written = AtomicU64::new(0);
        let run = |task: FaceTask<'_>| {
            let samples = &sample_sets[task.level];
            self.convolve_face(task, samples, abort, settings, &written);
        };
        if settings.parallel {
            tasks.into_par_iter().for_each(run);
        } else {
            tasks.into_iter().for_each(run);
        }

        let pixels_written = written.into_inner();
        let report = ConvolveReport {
            pixels_written,
            pixels_total,
            aborted: pixels_written < pixels_total,
            lobes: sample_sets.iter().map(LobeStats::of).collect(),
        };
        if report.aborted {
            warn!("[prefilter] convolution aborted after {pixels_written}/{pixels_total} texels");
        } else {
            info!(
                "[prefilter] convolved {}x{} source into {mip_count} mips ({pixels_total} texels)",
                self.width, self.height
            );
        }
        report
    }

    fn convolve_face<A>(
        &self,
        task: FaceTask<'_>,
        samples: &GgxSamples,
        abort: &A,
        settings: &GgxSettings,
        written: &AtomicU64,
    ) where
        A: AbortSignal + ?Sized,
    {
        if abort.should_abort() {
            return;
        }
        let FaceTask { level, face, width, height, pixels } = task;

        if samples.is_mirror() && level < self.mip_count() && self.mip_dimensions(level) == (width, height) {
            pixels.copy_from_slice(&self.mips[level][face.index()]);
            written.fetch_add(pixels.len() as u64, Ordering::Relaxed);
            return;
        }

        // Resampling a mirror level reads the source mip closest to the output resolution.
        let source_size = self.width.max(self.height) as f32;
        let mirror_lod = (source_size / width.max(height) as f32).log2().max(0.0);
        let rows_per_check = settings.rows_per_abort_check.max(1);
        for y in 0..height {
            if y > 0 && y % rows_per_check == 0 && abort.should_abort() {
                return;
            }
            for x in 0..width {
                let (u, v) = texel_center(x, y, width, height);
                let normal = face_direction(face, u, v).normalize();
                pixels[(y * width + x) as usize] = if samples.is_mirror() {
                    self.fetch_lod(normal, mirror_lod)
                } else {
                    self.compute_convolution(normal, samples)
                };
            }
            written.fetch_add(width as u64, Ordering::Relaxed);
        }
    }

    /// Weighted sum of source radiance over the lobe oriented around `normal`.
    fn compute_convolution(&self, normal: Vec3, samples: &GgxSamples) -> Vec4 {
        let (tangent, bitangent) = tangent_frame(normal);
        samples.iter().fold(Vec4::ZERO, |acc, sample| {
            let d = sample.direction;
            let dir = tangent * d.x + bitangent * d.y + normal * d.z;
            acc + self.fetch_lod(dir, sample.lod) * sample.weight
        })
    }
}
