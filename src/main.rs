// CLI entry for hist_search
use anyhow::Result;
use clap::{ArgAction, Parser, ValueHint};
use hist_search::{default_config, search, Config, Params};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hist_search", version, about = "Rank images by color histogram similarity")]
struct Cli {
    /// Buckets per color channel (power of two, at most 256)
    #[arg(short = 'd', long = "depth")]
    depth: Option<u32>,
    /// Number of results to report
    #[arg(short = 'k', long = "top")]
    top: Option<usize>,
    /// Number of worker threads
    #[arg(long = "workers")]
    workers: Option<usize>,
    /// File name pattern for dataset images
    #[arg(long = "pattern")]
    pattern: Option<String>,
    /// Directory the query image name is resolved against ("" for none)
    #[arg(long = "query-dir", value_hint = ValueHint::DirPath)]
    query_dir: Option<PathBuf>,
    /// Read the query as a histogram dump (see --save-histogram) instead of an image
    #[arg(long = "from-histogram", action = ArgAction::SetTrue)]
    from_histogram: bool,
    /// Write the query histogram to this file
    #[arg(long = "save-histogram", value_hint = ValueHint::FilePath)]
    save_histogram: Option<PathBuf>,

    /// Query image file name
    query: String,
    /// Directory holding the candidate images
    #[arg(value_hint = ValueHint::DirPath)]
    dataset: PathBuf,
}

fn build_config(cli: &Cli) -> Config {
    let mut cfg = default_config();
    if let Some(v) = cli.depth { cfg.depth = v; }
    if let Some(v) = cli.top { cfg.top_k = v; }
    if let Some(v) = cli.workers { cfg.num_workers = v.max(1); }
    if let Some(v) = &cli.pattern { cfg.pattern = v.clone(); }
    if let Some(v) = &cli.query_dir { cfg.query_dir = v.clone(); }
    if cli.from_histogram { cfg.query_is_histogram = true; }
    if let Some(v) = &cli.save_histogram { cfg.save_query_histogram = Some(v.clone()); }
    cfg
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = build_config(&cli);
    let params = Params { query: cli.query, dataset_dir: cli.dataset, config };
    let report = search(&params)?;
    print!("{}", report);
    Ok(())
}
