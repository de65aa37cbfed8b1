use anyhow::{Context, Result};
use kestrel_prefilter::abort::NeverAbort;
use kestrel_prefilter::bake::bake;
use kestrel_prefilter::cli::CliOptions;
use kestrel_prefilter::config::BakeConfig;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config/prefilter.json";

fn main() {
    let options = match CliOptions::parse_from_env() {
        Ok(options) => options,
        Err(err) => {
            eprintln!("[prefilter_bake] {err:?}\n\n{}", CliOptions::usage());
            std::process::exit(2);
        }
    };
    if options.help {
        println!("{}", CliOptions::usage());
        return;
    }
    init_logging(options.verbose);
    if let Err(err) = run(&options) {
        log::error!("[prefilter_bake] {err:?}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var("RUST_LOG").is_err() {
        builder.filter_level(if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info });
    }
    builder.init();
}

fn run(options: &CliOptions) -> Result<()> {
    let mut config = match &options.config {
        Some(path) => BakeConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => BakeConfig::load_or_default(DEFAULT_CONFIG_PATH),
        None => BakeConfig::default(),
    };
    let overrides = options.overrides();
    if !overrides.is_empty() {
        log::info!("[prefilter_bake] command-line overrides: {}", overrides.applied_fields().join(", "));
        config.apply_overrides(overrides);
    }

    let output = bake(&config, &NeverAbort)?;
    let report = &output.report;
    for level in &report.levels {
        log::info!(
            "[prefilter_bake] mip {} {}x{}: roughness {:.3}, {} samples, mean radiance ({:.3}, {:.3}, {:.3})",
            level.level,
            level.width,
            level.height,
            level.roughness,
            level.samples,
            level.mean_radiance[0],
            level.mean_radiance[1],
            level.mean_radiance[2]
        );
    }
    log::info!("[prefilter_bake] done in {:.1} ms, fingerprint {}", report.elapsed_ms, report.fingerprint);

    if let Some(path) = &options.report {
        report.write(path).with_context(|| format!("saving bake report to {}", path.display()))?;
        log::info!("[prefilter_bake] report written to {}", path.display());
    }
    Ok(())
}
