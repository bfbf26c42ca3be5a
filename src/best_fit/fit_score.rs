use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::fitting::FitCandidate;

/// Scores are compared at this resolution, so that floating point noise between equivalent models
/// is resolved by the purity and ploidy preference
const SCORE_RESOLUTION: f64 = 1e9;

fn get_score_key(score: f64) -> i64 {
    (score * SCORE_RESOLUTION).round() as i64
}

/// Rank fit candidates by lowest score, then highest purity, then lowest ploidy
///
pub fn compare_fit_candidates(a: &FitCandidate, b: &FitCandidate) -> Ordering {
    get_score_key(a.score)
        .cmp(&get_score_key(b.score))
        .then(b.purity.total_cmp(&a.purity))
        .then(a.ploidy.total_cmp(&b.ploidy))
}

/// Summary of the candidates scoring close to the best candidate
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FitScoreRange {
    pub min_purity: f64,
    pub max_purity: f64,
    pub min_ploidy: f64,
    pub max_ploidy: f64,
    pub min_diploid_proportion: f64,
}

impl FitScoreRange {
    pub fn purity_spread(&self) -> f64 {
        self.max_purity - self.min_purity
    }
}

/// Summarize all candidates scoring within `score_range_fraction` of the best score
///
/// `ranked_candidates` must be non-empty and ranked with the best candidate first.
///
pub fn get_fit_score_range(
    ranked_candidates: &[FitCandidate],
    score_range_fraction: f64,
) -> FitScoreRange {
    let best = &ranked_candidates[0];
    let max_score = best.score * (1.0 + score_range_fraction);

    let mut range = FitScoreRange {
        min_purity: best.purity,
        max_purity: best.purity,
        min_ploidy: best.ploidy,
        max_ploidy: best.ploidy,
        min_diploid_proportion: best.diploid_proportion,
    };
    for candidate in ranked_candidates.iter().filter(|x| x.score <= max_score) {
        range.min_purity = range.min_purity.min(candidate.purity);
        range.max_purity = range.max_purity.max(candidate.purity);
        range.min_ploidy = range.min_ploidy.min(candidate.ploidy);
        range.max_ploidy = range.max_ploidy.max(candidate.ploidy);
        range.min_diploid_proportion = range
            .min_diploid_proportion
            .min(candidate.diploid_proportion);
    }
    range
}

#[cfg(test)]
pub mod test_utils {
    use super::*;

    pub fn get_test_candidate(purity: f64, ploidy: f64, score: f64) -> FitCandidate {
        FitCandidate {
            purity,
            ploidy,
            norm_factor: 1.0,
            score,
            somatic_penalty: 0.0,
            diploid_proportion: 1.0,
        }
    }
}
