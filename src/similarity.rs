use crate::errors::{Result, SearchError};
use crate::histogram::Histogram;

/// Score of one candidate against the query, in percent.
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityResult {
    pub name: String,
    pub score: f64,
}

/// Histogram intersection scaled to [0, 100]. Symmetric in its arguments.
pub fn intersection(a: &Histogram, b: &Histogram) -> Result<f64> {
    if a.len() != b.len() {
        return Err(SearchError::ShapeMismatch { left: a.len(), right: b.len() });
    }
    let sum: f64 = a.values().iter().zip(b.values()).map(|(x, y)| x.min(*y)).sum();
    // rounding can push a self-comparison a hair past 100
    Ok((sum * 100.0).clamp(0.0, 100.0))
}

pub fn compare(query: &Histogram, candidate: Histogram) -> Result<SimilarityResult> {
    let score = intersection(query, &candidate)?;
    Ok(SimilarityResult { name: candidate.into_name(), score })
}
