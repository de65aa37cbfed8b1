use crate::abort::AbortSignal;
use crate::config::BakeConfig;
use crate::cubemap::CubeMap;
use crate::report::BakeReport;
use anyhow::{Context, Result};
use log::info;
use std::time::Instant;

pub struct BakeOutput {
    pub source: CubeMap,
    pub prefiltered: CubeMap,
    pub report: BakeReport,
}

/// Builds the configured source environment and pre-filters it.
///
/// An aborted bake still returns `Ok`; check `report.aborted` before using `prefiltered`.
pub fn bake<A>(config: &BakeConfig, abort: &A) -> Result<BakeOutput>
where
    A: AbortSignal + ?Sized,
{
    let preset = config.source.preset;
    let source = preset
        .build(config.source.face_size, config.source.mip_count)
        .with_context(|| format!("building '{}' source environment", preset.label()))?;
    let mut prefiltered = CubeMap::new(config.output.face_size, config.output.face_size, config.output.mip_count)
        .context("allocating pre-filtered cube map")?;
    info!(
        "[bake] '{}' source {}px x{} mips -> {}px x{} mips, {} samples",
        preset.label(),
        config.source.face_size,
        source.mip_count(),
        config.output.face_size,
        prefiltered.mip_count(),
        config.sampling.sample_count
    );

    let settings = config.ggx_settings();
    let started = Instant::now();
    let convolve = source.convolve_for_ggx_with(&mut prefiltered, abort, &settings);
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    let report = BakeReport::new(preset.label(), &source, &prefiltered, settings.sample_count, convolve, elapsed_ms);
    Ok(BakeOutput { source, prefiltered, report })
}
