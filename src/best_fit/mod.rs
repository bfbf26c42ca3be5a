//! Select the best purity and ploidy fit from the scored candidates
//!

mod fit_score;
mod somatic_fit;

use log::info;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};
use thousands::Separable;

pub use self::fit_score::FitScoreRange;
use self::fit_score::{compare_fit_candidates, get_fit_score_range};
use self::somatic_fit::{get_diploid_somatic_allele_frequencies, get_somatic_purity};
use crate::cli::BestFitSettings;
use crate::fitting::FitCandidate;
use crate::segmentation::ObservedRegions;
use crate::somatic_variant::GenomeSomaticVariants;
use crate::structural_variant::{StructuralVariant, get_pass_tumor_fragment_count};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum::Display)]
pub enum FitMethod {
    Normal,
    SomaticAssisted,
}

/// Selected fit with the context needed to report or revert it
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BestFit {
    pub fit: FitCandidate,
    pub method: FitMethod,

    /// Best scoring candidate, retained in case a somatic-assisted fit is reverted
    pub normal_fit: FitCandidate,

    pub score_range: FitScoreRange,

    /// All candidates, best first
    pub ranked_candidates: Vec<FitCandidate>,
}

impl BestFit {
    pub fn is_highly_diploid(&self, settings: &BestFitSettings) -> bool {
        self.score_range.min_diploid_proportion >= settings.highly_diploid_percentage_threshold
    }

    /// Replace a somatic-assisted fit with the normal fit
    ///
    pub fn revert_to_normal_fit(self) -> Self {
        Self {
            fit: self.normal_fit.clone(),
            method: FitMethod::Normal,
            ..self
        }
    }
}

/// Choose the candidate nearest to diploid ploidy and the somatic variant purity
///
fn get_somatic_fit(ranked_candidates: &[FitCandidate], somatic_purity: f64) -> Option<&FitCandidate> {
    ranked_candidates.iter().min_by(|a, b| {
        let ploidy_distance = |x: &FitCandidate| (x.ploidy - 2.0).abs();
        let purity_distance = |x: &FitCandidate| (x.purity - somatic_purity).abs();
        ploidy_distance(a)
            .total_cmp(&ploidy_distance(b))
            .then(purity_distance(a).total_cmp(&purity_distance(b)))
            .then(compare_fit_candidates(a, b))
    })
}

/// Return true if the sample has enough tumor evidence to attempt a somatic-assisted fit
///
/// The minimum usable somatic variant count is always required. Tumor evidence may then come from
/// either the usable variants or the passing structural variant tumor fragments.
///
fn has_somatic_fit_evidence(
    settings: &BestFitSettings,
    usable_variant_count: usize,
    structural_variants: &[StructuralVariant],
) -> bool {
    if usable_variant_count < settings.somatic_min_total_variants {
        return false;
    }
    usable_variant_count > 0
        || get_pass_tumor_fragment_count(structural_variants) >= settings.somatic_min_sv_fragments
}

/// Select the best fit from the full candidate set
///
/// The normal fit is the best ranked candidate. When the near-best candidates are highly diploid and
/// span a wide purity range, the copy number model alone can't determine purity, so the fit is instead
/// taken from the somatic variant allele frequency peak, given enough tumor evidence.
///
/// A somatic-assisted fit is provisional until checked against the resulting copy numbers.
///
pub fn select_best_fit(
    settings: &BestFitSettings,
    mut candidates: Vec<FitCandidate>,
    somatic_variants: Option<&GenomeSomaticVariants>,
    structural_variants: &[StructuralVariant],
    observed_regions: &ObservedRegions,
) -> SimpleResult<BestFit> {
    if candidates.is_empty() {
        bail!("No fit candidates available for best fit selection");
    }
    candidates.sort_by(compare_fit_candidates);
    let normal_fit = candidates[0].clone();
    let score_range = get_fit_score_range(&candidates, settings.score_range_fraction);

    let mut best_fit = BestFit {
        fit: normal_fit.clone(),
        method: FitMethod::Normal,
        normal_fit,
        score_range,
        ranked_candidates: candidates,
    };

    info!(
        "Normal fit purity: {:.2} ploidy: {:.2} score: {:.4}",
        best_fit.fit.purity, best_fit.fit.ploidy, best_fit.fit.score
    );

    if !best_fit.is_highly_diploid(settings) {
        return Ok(best_fit);
    }
    info!(
        "Sample is highly diploid, near-best purity range: [{:.2}, {:.2}]",
        best_fit.score_range.min_purity, best_fit.score_range.max_purity
    );
    if best_fit.score_range.purity_spread() < settings.somatic_min_purity_spread {
        return Ok(best_fit);
    }

    let allele_frequencies = match somatic_variants {
        Some(x) => get_diploid_somatic_allele_frequencies(x, observed_regions),
        None => Vec::new(),
    };
    if !has_somatic_fit_evidence(settings, allele_frequencies.len(), structural_variants) {
        info!(
            "Insufficient tumor evidence for somatic-assisted fit ({} usable somatic variants)",
            allele_frequencies.len().separate_with_commas()
        );
        return Ok(best_fit);
    }

    let Some(somatic_purity) = get_somatic_purity(settings, &allele_frequencies) else {
        info!("No somatic allele frequency peak supports a somatic-assisted fit");
        return Ok(best_fit);
    };

    if let Some(somatic_fit) = get_somatic_fit(&best_fit.ranked_candidates, somatic_purity) {
        info!(
            "Somatic-assisted fit purity: {:.2} ploidy: {:.2} score: {:.4}",
            somatic_fit.purity, somatic_fit.ploidy, somatic_fit.score
        );
        best_fit.fit = somatic_fit.clone();
        best_fit.method = FitMethod::SomaticAssisted;
    }
    Ok(best_fit)
}

/// Return true if a somatic-assisted fit implies too many deleted depth windows to be kept
///
pub fn is_somatic_fit_rejected(
    settings: &BestFitSettings,
    best_fit: &BestFit,
    deleted_window_fraction: f64,
) -> bool {
    best_fit.method == FitMethod::SomaticAssisted
        && deleted_window_fraction > settings.max_somatic_fit_deleted_percent
}
