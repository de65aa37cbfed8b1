use crate::cubemap::{GgxSettings, DEFAULT_SAMPLE_COUNT};
use crate::procedural::EnvironmentPreset;
use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub preset: EnvironmentPreset,
    #[serde(default = "SourceConfig::default_face_size")]
    pub face_size: u32,
    #[serde(default = "SourceConfig::default_mip_count")]
    pub mip_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "OutputConfig::default_face_size")]
    pub face_size: u32,
    #[serde(default = "OutputConfig::default_mip_count")]
    pub mip_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "SamplingConfig::default_sample_count")]
    pub sample_count: usize,
    #[serde(default = "SamplingConfig::default_parallel")]
    pub parallel: bool,
    #[serde(default = "SamplingConfig::default_rows_per_abort_check")]
    pub rows_per_abort_check: u32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BakeConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BakeConfigOverrides {
    pub preset: Option<EnvironmentPreset>,
    pub face_size: Option<u32>,
    pub mip_count: Option<usize>,
    pub sample_count: Option<usize>,
    pub parallel: Option<bool>,
}

impl SourceConfig {
    const fn default_face_size() -> u32 {
        256
    }

    const fn default_mip_count() -> usize {
        9
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            preset: EnvironmentPreset::default(),
            face_size: Self::default_face_size(),
            mip_count: Self::default_mip_count(),
        }
    }
}

impl OutputConfig {
    const fn default_face_size() -> u32 {
        128
    }

    const fn default_mip_count() -> usize {
        6
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { face_size: Self::default_face_size(), mip_count: Self::default_mip_count() }
    }
}

impl SamplingConfig {
    const fn default_sample_count() -> usize {
        DEFAULT_SAMPLE_COUNT
    }

    const fn default_parallel() -> bool {
        true
    }

    const fn default_rows_per_abort_check() -> u32 {
        1
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_count: Self::default_sample_count(),
            parallel: Self::default_parallel(),
            rows_per_abort_check: Self::default_rows_per_abort_check(),
        }
    }
}

impl BakeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &BakeConfigOverrides) {
        if let Some(preset) = overrides.preset {
            self.source.preset = preset;
        }
        if let Some(face_size) = overrides.face_size {
            self.output.face_size = face_size;
        }
        if let Some(mip_count) = overrides.mip_count {
            self.output.mip_count = mip_count;
        }
        if let Some(sample_count) = overrides.sample_count {
            self.sampling.sample_count = sample_count;
        }
        if let Some(parallel) = overrides.parallel {
            self.sampling.parallel = parallel;
        }
    }

    pub fn ggx_settings(&self) -> GgxSettings {
        GgxSettings {
            sample_count: self.sampling.sample_count,
            parallel: self.sampling.parallel,
            rows_per_abort_check: self.sampling.rows_per_abort_check,
        }
    }
}

impl BakeConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.applied_fields().is_empty()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.preset.is_some() {
            fields.push("preset");
        }
        if self.face_size.is_some() {
            fields.push("face_size");
        }
        if self.mip_count.is_some() {
            fields.push("mip_count");
        }
        if self.sample_count.is_some() {
            fields.push("sample_count");
        }
        if self.parallel.is_some() {
            fields.push("parallel");
        }
        fields
    }
}
