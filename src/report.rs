use crate::cubemap::{ConvolveReport, CubeMap};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LevelReport {
    pub level: usize,
    pub width: u32,
    pub height: u32,
    pub roughness: f32,
    pub samples: usize,
    pub lobe_mean_cosine: f32,
    pub mean_radiance: [f32; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BakeReport {
    pub preset: String,
    pub source_size: u32,
    pub source_mips: usize,
    pub output_size: u32,
    pub sample_count: usize,
    pub pixels_written: u64,
    pub pixels_total: u64,
    pub aborted: bool,
    pub elapsed_ms: f64,
    /// blake3 of the output texels; empty for aborted bakes.
    pub fingerprint: String,
    pub levels: Vec<LevelReport>,
}

impl BakeReport {
    pub fn new(
        preset: &str,
        source: &CubeMap,
        output: &CubeMap,
        sample_count: usize,
        convolve: ConvolveReport,
        elapsed_ms: f64,
    ) -> Self {
        let source_size = source.width().max(source.height());
        let levels = if convolve.aborted {
            Vec::new()
        } else {
            convolve
                .lobes
                .iter()
                .enumerate()
                .map(|(level, lobe)| {
                    let (width, height) = output.mip_dimensions(level);
                    LevelReport {
                        level,
                        width,
                        height,
                        roughness: lobe.roughness,
                        samples: lobe.samples,
                        lobe_mean_cosine: lobe.mean_cosine,
                        mean_radiance: output.level_mean(level).to_array(),
                    }
                })
                .collect()
        };
        let fingerprint = if convolve.aborted { String::new() } else { output.fingerprint().to_hex().to_string() };
        Self {
            preset: preset.to_string(),
            source_size,
            source_mips: source.mip_count(),
            output_size: output.width().max(output.height()),
            sample_count,
            pixels_written: convolve.pixels_written,
            pixels_total: convolve.pixels_total,
            aborted: convolve.aborted,
            elapsed_ms,
            fingerprint,
            levels,
        }
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let file = File::create(path).with_context(|| format!("creating report {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .with_context(|| format!("writing report {}", path.display()))?;
        writer.flush().with_context(|| format!("flushing report {}", path.display()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("parsing report {}", path.display()))
    }
}
