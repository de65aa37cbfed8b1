use crate::config::BakeConfigOverrides;
use crate::procedural::EnvironmentPreset;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub verbose: bool,
    pub help: bool,
    overrides: BakeConfigOverrides,
}

impl CliOptions {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = CliOptions::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            match flag {
                "--sequential" => {
                    options.overrides.parallel = Some(false);
                    continue;
                }
                "--verbose" | "-v" => {
                    options.verbose = true;
                    continue;
                }
                "--help" | "-h" => {
                    options.help = true;
                    continue;
                }
                _ => {}
            }
            if !flag.starts_with("--") {
                bail!("Unexpected argument '{flag}'. Run with --help for usage.");
            }
            let key = &flag[2..];
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => options.config = Some(PathBuf::from(value)),
                "report" => options.report = Some(PathBuf::from(value)),
                "preset" => options.overrides.preset = Some(EnvironmentPreset::parse(&value)?),
                "size" => {
                    options.overrides.face_size =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid size '{value}'"))?);
                }
                "mips" => {
                    options.overrides.mip_count =
                        Some(value.parse::<usize>().with_context(|| format!("Invalid mip count '{value}'"))?);
                }
                "samples" => {
                    options.overrides.sample_count =
                        Some(value.parse::<usize>().with_context(|| format!("Invalid sample count '{value}'"))?);
                }
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --config, --report, --preset, --size, --mips, \
                     --samples, --sequential, --verbose."
                ),
            }
        }
        Ok(options)
    }

    pub fn overrides(&self) -> &BakeConfigOverrides {
        &self.overrides
    }

    pub fn usage() -> &'static str {
        "\
Usage: prefilter_bake [--config <path>] [--report <path>] [--preset neutral|uniform] \\
       [--size <face size>] [--mips <count>] [--samples <count>] [--sequential] [--verbose]

Defaults come from config/prefilter.json when present."
    }
}
