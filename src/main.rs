use anyhow::Context;
use cdot_subset::options::{ExtractOptions, FilterPolicy};
use cdot_subset::CdotSubset;
use clap::Parser;
use peak_alloc::PeakAlloc;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

#[global_allocator]
static PEAK_ALLOC: PeakAlloc = PeakAlloc;

/// Extract per-gene subsets from cdot transcript JSON files.
///
/// The identifiers to extract are taken from the HGNC_ID environment variable,
/// a comma separated list like "HGNC:1100,HGNC:1101".
#[derive(Parser)]
#[command(name = "cdot-subset", version, about)]
struct Cli {
    /// cdot JSON files to subset; gzip compressed inputs are detected automatically
    #[arg(value_name = "JSON", required = true)]
    json_paths: Vec<PathBuf>,

    /// gene matching policy, either "direct-key" (identifiers are keys of the genes
    /// collection) or "attribute-scan" (records are matched on their hgnc attribute)
    #[arg(long, default_value = "direct-key")]
    policy: FilterPolicy,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let opts = ExtractOptions::from_env(cli.policy);

    // each input file is processed on its own; the first failure aborts the run
    for json_path in &cli.json_paths {
        let mut subset = CdotSubset::from_json(json_path)?;
        let symbols = subset.extract(&opts)?;
        let out_path = subset.output_path(&symbols);
        subset
            .write_json(&out_path)
            .with_context(|| format!("while subsetting {}", json_path.display()))?;
    }

    debug!("peak memory usage was {} MB", PEAK_ALLOC.peak_usage_as_mb());
    Ok(())
}
