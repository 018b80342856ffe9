use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::db::types::AnalysisMethod;

/// Capability seam for plagiarism estimation: given a submission and one
/// reference text, return a similarity in [0, 1]. The session and
/// violation logic never sees anything but the resulting scores, so a
/// real model can replace the baseline without touching them.
pub(crate) trait SimilarityAnalyzer: Send + Sync {
    fn method(&self) -> AnalysisMethod;
    fn similarity(&self, submission: &str, reference: &str) -> f64;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct MatchedSource {
    pub(crate) source: String,
    /// Integer percentage in 0..=100.
    pub(crate) similarity: i32,
}

#[derive(Debug, Clone)]
pub(crate) struct AnalysisOutcome {
    pub(crate) score: i32,
    pub(crate) matched_sources: Vec<MatchedSource>,
}

/// Word-shingle Jaccard similarity. Deterministic by construction: the
/// same submission and reference set always produce the same estimate.
pub(crate) struct ShingleAnalyzer {
    shingle_len: usize,
}

impl Default for ShingleAnalyzer {
    fn default() -> Self {
        Self { shingle_len: 3 }
    }
}

impl ShingleAnalyzer {
    fn shingles(&self, text: &str) -> HashSet<String> {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(|word| word.to_lowercase())
            .collect();

        if words.is_empty() {
            return HashSet::new();
        }

        if words.len() < self.shingle_len {
            let mut set = HashSet::new();
            set.insert(words.join(" "));
            return set;
        }

        words.windows(self.shingle_len).map(|window| window.join(" ")).collect()
    }
}

impl SimilarityAnalyzer for ShingleAnalyzer {
    fn method(&self) -> AnalysisMethod {
        AnalysisMethod::TfIdf
    }

    fn similarity(&self, submission: &str, reference: &str) -> f64 {
        let left = self.shingles(submission);
        let right = self.shingles(reference);

        if left.is_empty() || right.is_empty() {
            return 0.0;
        }

        let intersection = left.intersection(&right).count();
        let union = left.len() + right.len() - intersection;

        intersection as f64 / union as f64
    }
}

/// Score a submission against each reference source. The overall
/// estimate is the strongest single match; sources come back ordered
/// most-similar-first.
pub(crate) fn analyze(
    analyzer: &dyn SimilarityAnalyzer,
    submission: &str,
    sources: &[(String, String)],
) -> AnalysisOutcome {
    let mut matched: Vec<MatchedSource> = sources
        .iter()
        .map(|(name, content)| MatchedSource {
            source: name.clone(),
            similarity: (analyzer.similarity(submission, content) * 100.0).round() as i32,
        })
        .collect();

    matched.sort_by(|a, b| b.similarity.cmp(&a.similarity).then_with(|| a.source.cmp(&b.source)));

    let score = matched.iter().map(|entry| entry.similarity).max().unwrap_or(0).clamp(0, 100);

    AnalysisOutcome { score, matched_sources: matched }
}
