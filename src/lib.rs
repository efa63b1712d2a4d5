use glob::Pattern;
use log::info;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

mod errors;
pub use errors::{Result, SearchError};

pub mod histogram;
pub use histogram::{Depth, Histogram};

pub mod similarity;
pub use similarity::{compare, intersection, SimilarityResult};

pub mod distributor;
pub use distributor::{distribute, distribute_with, effective_workers, partition_bounds, Distribution, SkippedCandidate};

pub mod rank;
pub use rank::{select_top, sort_results_desc, RankSelector};

pub const DEFAULT_DEPTH: u32 = 4;
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_PATTERN: &str = "*.jpg";
pub const DEFAULT_QUERY_DIR: &str = "queryImages";

#[derive(Debug, Clone)]
pub struct Config {
    pub depth: u32,
    pub top_k: usize,
    pub num_workers: usize,
    pub pattern: String,
    pub query_dir: PathBuf,
    /// The query names a histogram dump written by [`Histogram::save`] instead of an image.
    pub query_is_histogram: bool,
    pub save_query_histogram: Option<PathBuf>,
}

pub fn default_config() -> Config {
    Config {
        depth: DEFAULT_DEPTH,
        top_k: DEFAULT_TOP_K,
        num_workers: num_cpus::get().max(1),
        pattern: DEFAULT_PATTERN.to_string(),
        query_dir: PathBuf::from(DEFAULT_QUERY_DIR),
        query_is_histogram: false,
        save_query_histogram: None,
    }
}

#[derive(Debug, Clone)]
pub struct Params {
    pub query: String,
    pub dataset_dir: PathBuf,
    pub config: Config,
}

pub fn resolve_query_path(config: &Config, query: &str) -> PathBuf {
    if config.query_dir.as_os_str().is_empty() {
        PathBuf::from(query)
    } else {
        config.query_dir.join(query)
    }
}

/// Regular files directly inside `dir` whose file name matches `pattern`, sorted by path.
pub fn list_candidates(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = Pattern::new(pattern)?;
    let entries = fs::read_dir(dir).map_err(|e| SearchError::io(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SearchError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() && entry.file_name().to_str().is_some_and(|n| pattern.matches(n)) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[derive(Debug)]
pub struct SearchReport {
    pub top_k: usize,
    pub matches: Vec<SimilarityResult>,
    pub candidates: usize,
    pub ranked: usize,
    pub skipped: Vec<SkippedCandidate>,
    pub elapsed: Duration,
}

fn base_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Top {} similar images:", self.top_k)?;
        for (i, m) in self.matches.iter().enumerate() {
            writeln!(f, "{}: {} (Similarity: {:.2})", i + 1, base_name(&m.name), m.score)?;
        }
        writeln!(f, "Runtime = {:?}", self.elapsed)
    }
}

fn load_query(path: &Path, depth: Depth, is_histogram: bool) -> Result<Histogram> {
    if !is_histogram {
        return Histogram::from_file(path, depth);
    }
    let hist = Histogram::load(path)?;
    if hist.depth() != depth {
        return Err(SearchError::ShapeMismatch { left: hist.len(), right: depth.bin_count() });
    }
    Ok(hist)
}

/// Rank the images of `params.dataset_dir` by similarity to the query image.
/// Query and configuration failures abort, unreadable candidates are skipped.
pub fn search(params: &Params) -> Result<SearchReport> {
    let start = Instant::now();
    let Params { query, dataset_dir, config } = params;

    let depth = Depth::new(config.depth)?;
    if config.top_k == 0 {
        return Err(SearchError::Config("number of results must be at least 1".to_string()));
    }

    let query_path = resolve_query_path(config, query);
    info!("Query image: {}", query_path.display());
    info!("Dataset: {} ({})", dataset_dir.display(), config.pattern);
    info!("Depth: {} ({} bins)", depth.get(), depth.bin_count());

    let query_hist = load_query(&query_path, depth, config.query_is_histogram)?;
    if let Some(out) = &config.save_query_histogram {
        query_hist.save(out)?;
        info!("Query histogram saved: {}", out.display());
    }

    let candidates = list_candidates(dataset_dir, &config.pattern)?;
    info!("{} candidates found", candidates.len());

    let Distribution { output, skipped } = distribute(&candidates, depth, config.num_workers, |rx| {
        let mut selector = RankSelector::new(&query_hist);
        for hist in rx.iter() {
            selector.push(hist)?;
        }
        Ok::<_, SearchError>(selector)
    })?;
    let selector = output?;
    let ranked = selector.len();
    info!("{} ranked, {} skipped", ranked, skipped.len());

    Ok(SearchReport {
        top_k: config.top_k,
        matches: selector.top(config.top_k),
        candidates: candidates.len(),
        ranked,
        skipped,
        elapsed: start.elapsed(),
    })
}
