use std::sync::mpsc::channel;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail, try_with};
use thousands::Separable;

use super::region_fitter::{RegionFitter, score_fitted_regions};
use super::somatic_penalty::get_somatic_penalty;
use crate::cli::PuritySearchSettings;
use crate::segmentation::{GermlineStatus, ObservedRegions};
use crate::somatic_variant::GenomeSomaticVariants;

/// Scored model for one (purity, ploidy) pair
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FitCandidate {
    pub purity: f64,
    pub ploidy: f64,
    pub norm_factor: f64,

    /// Total score including the weighted somatic penalty, lower is better
    pub score: f64,

    /// Unweighted somatic penalty component of the score
    pub somatic_penalty: f64,

    pub diploid_proportion: f64,
}

/// Evenly spaced values from min to max inclusive
///
/// Values are rounded to remove accumulated floating point error from the increment, so that grid
/// values can be reported and compared exactly.
///
pub fn get_grid_values(min: f64, max: f64, increment: f64) -> Vec<f64> {
    if min > max || increment <= 0.0 {
        return Vec::new();
    }
    let step_count = ((max - min) / increment + 1e-9).floor() as usize;
    (0..=step_count)
        .map(|i| {
            let value = min + i as f64 * increment;
            f64::min((value * 1e6).round() / 1e6, max)
        })
        .collect()
}

/// Window weighted mean tumor depth ratio over germline diploid autosomal regions
///
fn get_average_diploid_tumor_ratio(observed_regions: &ObservedRegions) -> SimpleResult<f64> {
    let mut total_weight = 0.0;
    let mut total_ratio = 0.0;
    for region in observed_regions.iter().filter(|x| {
        x.is_autosome && x.germline_status == GermlineStatus::Diploid && x.depth_window_count > 0
    }) {
        let weight = region.depth_window_count as f64;
        total_weight += weight;
        total_ratio += weight * region.mean_tumor_ratio;
    }
    if total_weight <= 0.0 {
        bail!(
            "No germline diploid autosomal depth windows found, unable to normalize tumor depth ratios"
        );
    }
    Ok(total_ratio / total_weight)
}

/// Normalization factor implied by a (purity, ploidy) pair, given the mean diploid tumor depth ratio
///
pub fn get_norm_factor(average_ratio: f64, purity: f64, ploidy: f64) -> f64 {
    average_ratio / (1.0 - purity + purity * ploidy / 2.0)
}

/// Score every ploidy value at one purity
///
fn get_purity_candidates(
    purity: f64,
    ploidy_values: &[f64],
    average_ratio: f64,
    somatic_penalty_weight: f64,
    fitter: &dyn RegionFitter,
    observed_regions: &ObservedRegions,
    somatic_variants: Option<&GenomeSomaticVariants>,
) -> Vec<FitCandidate> {
    let mut candidates = Vec::new();
    for &ploidy in ploidy_values {
        let norm_factor = get_norm_factor(average_ratio, purity, ploidy);
        let fitted_regions = fitter.fit_regions(purity, norm_factor, observed_regions);
        let Some(region_score) = score_fitted_regions(&fitted_regions) else {
            continue;
        };

        let somatic_penalty = match somatic_variants {
            Some(somatic_variants) => {
                let adjuster = fitter.get_purity_adjuster(purity, norm_factor);
                get_somatic_penalty(&adjuster, &fitted_regions, somatic_variants).unwrap_or(0.0)
            }
            None => 0.0,
        };

        candidates.push(FitCandidate {
            purity,
            ploidy,
            norm_factor,
            score: region_score.score + somatic_penalty_weight * somatic_penalty,
            somatic_penalty,
            diploid_proportion: region_score.diploid_proportion,
        });
    }
    candidates
}

/// Score all candidates on the purity and ploidy grid
///
/// Each purity value is evaluated as an independent task on a pool of `thread_count` workers. The
/// somatic penalty is only computed when `somatic_variants` is provided.
///
/// Returns the full candidate set sorted by purity and ploidy. Fails if no candidate can be scored.
///
pub fn search(
    settings: &PuritySearchSettings,
    thread_count: usize,
    fitter: &dyn RegionFitter,
    observed_regions: &ObservedRegions,
    somatic_variants: Option<&GenomeSomaticVariants>,
) -> SimpleResult<Vec<FitCandidate>> {
    let purity_values = get_grid_values(
        settings.min_purity,
        settings.max_purity,
        settings.purity_increment,
    );
    let ploidy_values = get_grid_values(
        settings.min_ploidy,
        settings.max_ploidy,
        settings.ploidy_increment,
    );
    info!(
        "Searching {} purity and {} ploidy values",
        purity_values.len().separate_with_commas(),
        ploidy_values.len().separate_with_commas()
    );

    let average_ratio = get_average_diploid_tumor_ratio(observed_regions)?;
    debug!("Average diploid tumor depth ratio: {average_ratio:.4}");

    let worker_pool = try_with!(
        rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .build(),
        "Unable to create purity search worker pool"
    );

    let somatic_penalty_weight = settings.somatic_penalty_weight;
    let ploidy_values = &ploidy_values;
    let (tx, rx) = channel();
    worker_pool.scope(move |scope| {
        for purity in purity_values {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let candidates = get_purity_candidates(
                    purity,
                    ploidy_values,
                    average_ratio,
                    somatic_penalty_weight,
                    fitter,
                    observed_regions,
                    somatic_variants,
                );
                tx.send(candidates).unwrap();
            });
        }
    });

    let mut candidates = rx.into_iter().flatten().collect::<Vec<_>>();
    if candidates.is_empty() {
        bail!(
            "No fit candidates could be scored for purity range [{}, {}] and ploidy range [{}, {}]",
            settings.min_purity,
            settings.max_purity,
            settings.min_ploidy,
            settings.max_ploidy
        );
    }
    candidates.sort_by(|a, b| {
        a.purity
            .total_cmp(&b.purity)
            .then(a.ploidy.total_cmp(&b.ploidy))
    });

    info!(
        "Scored {} fit candidates",
        candidates.len().separate_with_commas()
    );
    Ok(candidates)
}
