use flume::{Receiver, Sender};
use log::{debug, error, info, warn};
use std::ops::Range;
use std::panic;
use std::path::{Path, PathBuf};
use std::thread;

use crate::errors::{Result, SearchError};
use crate::histogram::{Depth, Histogram};

/// A dataset file that could not be turned into a histogram.
#[derive(Debug)]
pub struct SkippedCandidate {
    pub path: PathBuf,
    pub error: SearchError,
}

pub struct Distribution<R> {
    pub output: R,
    pub skipped: Vec<SkippedCandidate>,
}

/// Split `0..n` into `k` contiguous ranges whose sizes differ by at most one.
pub fn partition_bounds(n: usize, k: usize) -> Vec<Range<usize>> {
    (0..k).map(|i| (i * n / k)..((i + 1) * n / k)).collect()
}

/// Never more workers than candidates, so no partition is empty.
pub fn effective_workers(configured: usize, n_candidates: usize) -> usize {
    configured.max(1).min(n_candidates)
}

/// Compute histograms for `paths` on a scoped worker pool and feed them to `consume`, which
/// runs on the calling thread and sees the channel close once every worker has finished.
/// Files that fail to open or decode are logged and returned in `skipped`.
pub fn distribute<F, R>(paths: &[PathBuf], depth: Depth, num_workers: usize, consume: F) -> Result<Distribution<R>>
where
    F: FnOnce(Receiver<Histogram>) -> R,
{
    distribute_with(paths, num_workers, |path| Histogram::from_file(path, depth), consume)
}

/// [`distribute`] with a caller supplied per-path histogram builder. Recoverable errors of the
/// builder skip the path; any other error ends that worker's batch and is returned once all
/// workers have been joined.
pub fn distribute_with<B, F, R>(paths: &[PathBuf], num_workers: usize, build: B, consume: F) -> Result<Distribution<R>>
where
    B: Fn(&Path) -> Result<Histogram> + Sync,
    F: FnOnce(Receiver<Histogram>) -> R,
{
    let workers = effective_workers(num_workers, paths.len());
    info!("distributing {} candidates over {} workers", paths.len(), workers);

    let (tx, rx) = flume::bounded::<Histogram>(workers.max(1));
    let build = &build;

    thread::scope(|s| {
        let handles: Vec<_> = partition_bounds(paths.len(), workers)
            .into_iter()
            .map(|range| {
                let tx = tx.clone();
                let batch = &paths[range];
                s.spawn(move || process_batch(batch, build, &tx))
            })
            .collect();
        drop(tx); // only worker senders remain

        let output = consume(rx);

        let mut skipped = Vec::new();
        let mut fatal = None;
        for h in handles {
            match h.join() {
                Ok(Ok(mut batch_skipped)) => skipped.append(&mut batch_skipped),
                Ok(Err(e)) => { fatal.get_or_insert(e); }
                Err(e) => panic::resume_unwind(e),
            }
        }
        match fatal {
            Some(e) => Err(e),
            None => Ok(Distribution { output, skipped }),
        }
    })
}

fn process_batch<B>(batch: &[PathBuf], build: &B, tx: &Sender<Histogram>) -> Result<Vec<SkippedCandidate>>
where
    B: Fn(&Path) -> Result<Histogram>,
{
    let mut skipped = Vec::new();
    for path in batch {
        match build(path) {
            Ok(hist) => {
                if tx.send(hist).is_err() {
                    debug!("receiver dropped, abandoning rest of batch at {}", path.display());
                    break;
                }
            }
            Err(error) if error.is_candidate_recoverable() => {
                warn!("skipping {}: {}", path.display(), error);
                skipped.push(SkippedCandidate { path: path.clone(), error });
            }
            Err(error) => {
                error!("aborting batch at {}: {}", path.display(), error);
                return Err(error);
            }
        }
    }
    Ok(skipped)
}
