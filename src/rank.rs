use std::cmp::Ordering;

use crate::errors::Result;
use crate::histogram::Histogram;
use crate::similarity::{compare, SimilarityResult};

// higher score first, equal scores by name
fn result_cmp_desc(a: &SimilarityResult, b: &SimilarityResult) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.name.cmp(&b.name))
}

pub fn sort_results_desc(results: &mut [SimilarityResult]) {
    results.sort_by(result_cmp_desc);
}

/// Scores candidates against a fixed query as they arrive and keeps all results until asked
/// for the top entries.
pub struct RankSelector<'a> {
    query: &'a Histogram,
    results: Vec<SimilarityResult>,
}

impl<'a> RankSelector<'a> {
    pub fn new(query: &'a Histogram) -> Self {
        Self { query, results: Vec::new() }
    }

    /// Fails only on a shape mismatch, which means query and candidate were built with
    /// different depths.
    pub fn push(&mut self, candidate: Histogram) -> Result<()> {
        self.results.push(compare(self.query, candidate)?);
        Ok(())
    }

    pub fn len(&self) -> usize { self.results.len() }

    pub fn is_empty(&self) -> bool { self.results.is_empty() }

    /// At most `k` results, best first. Returns everything if fewer than `k` were scored.
    pub fn top(mut self, k: usize) -> Vec<SimilarityResult> {
        sort_results_desc(&mut self.results);
        let n = k.min(self.results.len());
        self.results.truncate(n);
        self.results
    }
}

pub fn select_top<I>(query: &Histogram, candidates: I, k: usize) -> Result<Vec<SimilarityResult>>
where
    I: IntoIterator<Item = Histogram>,
{
    let mut selector = RankSelector::new(query);
    for candidate in candidates {
        selector.push(candidate)?;
    }
    Ok(selector.top(k))
}
