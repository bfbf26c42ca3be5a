use serde::{Deserialize, Serialize};

use super::ploidy_deviation::{PloidyDeviation, get_event_penalty};
use super::purity_adjuster::PurityAdjuster;
use crate::cli::RegionFitSettings;
use crate::segmentation::{GermlineStatus, ObservedRegion, ObservedRegions};

/// Maximum distance of both allele copy numbers from one copy for a region to be scored as diploid
const DIPLOID_ALLELE_TOLERANCE: f64 = 0.2;

/// Penalty mode of the region fit model
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum FitMode {
    WholeGenome,

    /// Targeted panel mode scales each region's deviation penalty by its GC content distance from 0.5
    TargetedPanel { gc_ratio_penalty_factor: f64 },
}

/// Observed region with the copy number model of one (purity, normalization factor) candidate
///
#[derive(Clone, Debug)]
pub struct FittedRegion<'a> {
    pub observed: &'a ObservedRegion,
    pub copy_number: f64,
    pub tumor_baf: f64,
    pub major_allele_copy_number: f64,
    pub minor_allele_copy_number: f64,
    pub deviation_penalty: f64,
    pub event_penalty: f64,

    /// True if the region contributes to the candidate score
    pub is_fittable: bool,
}

impl FittedRegion<'_> {
    pub fn is_diploid(&self) -> bool {
        (self.major_allele_copy_number - 1.0).abs() <= DIPLOID_ALLELE_TOLERANCE
            && (self.minor_allele_copy_number - 1.0).abs() <= DIPLOID_ALLELE_TOLERANCE
    }
}

/// Fitted regions for the whole genome, indexed by chromosome index
pub struct FittedRegions<'a> {
    pub chroms: Vec<Vec<FittedRegion<'a>>>,
}

impl<'a> FittedRegions<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &FittedRegion<'a>> {
        self.chroms.iter().flatten()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RegionFitScore {
    /// Depth window weighted mean penalty of all fittable regions
    pub score: f64,

    /// Depth window weighted fraction of fittable regions with diploid allele states
    pub diploid_proportion: f64,
}

/// Only autosomal, germline diploid regions with depth and allele frequency observations are scored
///
fn is_fittable_region(region: &ObservedRegion) -> bool {
    region.is_autosome
        && region.germline_status == GermlineStatus::Diploid
        && region.depth_window_count > 0
        && region.baf_count > 0
}

/// Score a set of fitted regions, returning None if no region is fittable
///
pub fn score_fitted_regions(fitted_regions: &FittedRegions) -> Option<RegionFitScore> {
    let mut total_weight = 0.0;
    let mut total_penalty = 0.0;
    let mut diploid_weight = 0.0;
    for region in fitted_regions.iter().filter(|x| x.is_fittable) {
        let weight = region.observed.depth_window_count as f64;
        total_weight += weight;
        total_penalty += weight * region.deviation_penalty * region.event_penalty;
        if region.is_diploid() {
            diploid_weight += weight;
        }
    }

    if total_weight <= 0.0 {
        return None;
    }
    Some(RegionFitScore {
        score: total_penalty / total_weight,
        diploid_proportion: diploid_weight / total_weight,
    })
}

/// Scoring strategy for one (purity, normalization factor) candidate against all observed regions
///
/// Implementations must be pure functions of their inputs, so that candidates can be fit concurrently.
///
pub trait RegionFitter: Sync {
    fn fit_regions<'a>(
        &self,
        purity: f64,
        norm_factor: f64,
        observed_regions: &'a ObservedRegions,
    ) -> FittedRegions<'a>;

    /// Expected mirrored BAF of balanced sites in this sample
    fn expected_baf(&self) -> f64;

    fn get_purity_adjuster(&self, purity: f64, norm_factor: f64) -> PurityAdjuster {
        PurityAdjuster::new(purity, norm_factor, self.expected_baf())
    }
}

/// Region fitter scoring each region by the allele copy number deviation from integer states
///
pub struct PloidyPenaltyFitter {
    mode: FitMode,
    deviation: PloidyDeviation,
    ploidy_penalty_factor: f64,
    expected_baf: f64,
}

impl PloidyPenaltyFitter {
    pub fn new(settings: &RegionFitSettings, targeted_panel: bool, expected_baf: f64) -> Self {
        let (mode, sub_one_major_allele_multiplier) = if targeted_panel {
            (
                FitMode::TargetedPanel {
                    gc_ratio_penalty_factor: settings.gc_ratio_penalty_factor,
                },
                settings.targeted_sub_one_major_allele_multiplier,
            )
        } else {
            (
                FitMode::WholeGenome,
                settings.sub_one_major_allele_multiplier,
            )
        };
        Self {
            mode,
            deviation: PloidyDeviation::new(settings, sub_one_major_allele_multiplier),
            ploidy_penalty_factor: settings.ploidy_penalty_factor,
            expected_baf,
        }
    }

    pub fn mode(&self) -> &FitMode {
        &self.mode
    }

    fn fit_region<'a>(
        &self,
        adjuster: &PurityAdjuster,
        region: &'a ObservedRegion,
    ) -> FittedRegion<'a> {
        let purity = adjuster.purity();
        let copy_number =
            adjuster.copy_number(region.mean_tumor_ratio, region.mean_reference_ratio);
        let tumor_baf = if region.is_low_confidence() {
            0.5
        } else {
            adjuster.tumor_baf(region.mean_baf, copy_number, region.mean_reference_ratio)
        };
        let major_allele_copy_number = tumor_baf * copy_number;
        let minor_allele_copy_number = (1.0 - tumor_baf) * copy_number;

        let mut deviation_penalty = self.deviation.deviation(
            purity,
            major_allele_copy_number,
            minor_allele_copy_number,
        );
        if let FitMode::TargetedPanel {
            gc_ratio_penalty_factor,
        } = self.mode
        {
            deviation_penalty *= 1.0 + gc_ratio_penalty_factor * (region.mean_gc - 0.5).abs();
        }

        let event_penalty = get_event_penalty(
            self.ploidy_penalty_factor,
            major_allele_copy_number,
            minor_allele_copy_number,
        );

        FittedRegion {
            observed: region,
            copy_number,
            tumor_baf,
            major_allele_copy_number,
            minor_allele_copy_number,
            deviation_penalty,
            event_penalty,
            is_fittable: is_fittable_region(region),
        }
    }
}

impl RegionFitter for PloidyPenaltyFitter {
    fn fit_regions<'a>(
        &self,
        purity: f64,
        norm_factor: f64,
        observed_regions: &'a ObservedRegions,
    ) -> FittedRegions<'a> {
        let adjuster = self.get_purity_adjuster(purity, norm_factor);
        let chroms = observed_regions
            .chroms
            .iter()
            .map(|regions| {
                regions
                    .iter()
                    .map(|region| self.fit_region(&adjuster, region))
                    .collect()
            })
            .collect();
        FittedRegions { chroms }
    }

    fn expected_baf(&self) -> f64 {
        self.expected_baf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::test_utils::get_test_region;
    use approx::{assert_abs_diff_eq, assert_ulps_eq};

    fn get_test_regions(regions: Vec<ObservedRegion>) -> ObservedRegions {
        ObservedRegions {
            window_size: 1000,
            chroms: vec![regions],
        }
    }

    #[test]
    fn test_clean_diploid_region() {
        let fitter = PloidyPenaltyFitter::new(&RegionFitSettings::default(), false, 0.5);
        let regions = get_test_regions(vec![get_test_region(0, 0, 100_000, 100, 1.0, 0.5)]);

        let fitted = fitter.fit_regions(0.7, 1.0, &regions);
        let region = &fitted.chroms[0][0];
        assert_abs_diff_eq!(region.copy_number, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(region.major_allele_copy_number, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(region.minor_allele_copy_number, 1.0, epsilon = 1e-12);
        assert!(region.is_fittable);

        let score = score_fitted_regions(&fitted).unwrap();
        assert_abs_diff_eq!(score.score, 0.002, epsilon = 1e-12);
        assert_ulps_eq!(score.diploid_proportion, 1.0);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let fitter = PloidyPenaltyFitter::new(&RegionFitSettings::default(), false, 0.52);
        let regions = get_test_regions(vec![
            get_test_region(0, 0, 50_000, 50, 1.1, 0.55),
            get_test_region(0, 50_000, 80_000, 30, 0.6, 0.9),
            get_test_region(0, 80_000, 100_000, 20, 1.7, 0.7),
        ]);
        let score1 = score_fitted_regions(&fitter.fit_regions(0.63, 1.04, &regions));
        let score2 = score_fitted_regions(&fitter.fit_regions(0.63, 1.04, &regions));
        assert_eq!(score1, score2);
    }

    #[test]
    fn test_window_weighting() {
        let fitter = PloidyPenaltyFitter::new(&RegionFitSettings::default(), false, 0.5);
        let regions = get_test_regions(vec![
            get_test_region(0, 0, 30_000, 30, 1.0, 0.5),
            get_test_region(0, 30_000, 40_000, 10, 0.5, 1.0),
        ]);
        let fitted = fitter.fit_regions(1.0, 1.0, &regions);

        // Single copy LOH region: deviation at baseline with an event penalty of 1.4
        let loh = &fitted.chroms[0][1];
        assert_abs_diff_eq!(loh.major_allele_copy_number, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(loh.minor_allele_copy_number, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(loh.event_penalty, 1.4, epsilon = 1e-12);

        let score = score_fitted_regions(&fitted).unwrap();
        assert_abs_diff_eq!(
            score.score,
            (30.0 * 0.002 + 10.0 * 0.002 * 1.4) / 40.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(score.diploid_proportion, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_unfittable_regions() {
        let fitter = PloidyPenaltyFitter::new(&RegionFitSettings::default(), false, 0.5);

        let mut no_baf = get_test_region(0, 0, 30_000, 30, 1.0, 0.5);
        no_baf.baf_count = 0;
        let mut deleted = get_test_region(0, 30_000, 40_000, 10, 0.5, 0.5);
        deleted.germline_status = GermlineStatus::HetDeletion;
        let mut sex_chrom = get_test_region(0, 40_000, 50_000, 10, 0.5, 0.5);
        sex_chrom.is_autosome = false;

        let regions = get_test_regions(vec![no_baf, deleted, sex_chrom]);
        let fitted = fitter.fit_regions(1.0, 1.0, &regions);
        assert!(fitted.iter().all(|x| !x.is_fittable));
        assert!(score_fitted_regions(&fitted).is_none());
    }

    #[test]
    fn test_targeted_panel_gc_penalty() {
        let settings = RegionFitSettings::default();
        let whole_genome = PloidyPenaltyFitter::new(&settings, false, 0.5);
        let panel = PloidyPenaltyFitter::new(&settings, true, 0.5);
        assert_eq!(
            panel.mode(),
            &FitMode::TargetedPanel {
                gc_ratio_penalty_factor: settings.gc_ratio_penalty_factor
            }
        );

        let mut region = get_test_region(0, 0, 30_000, 30, 1.0, 0.5);
        region.mean_gc = 0.6;
        let regions = get_test_regions(vec![region]);

        let wg_penalty = whole_genome.fit_regions(1.0, 1.0, &regions).chroms[0][0].deviation_penalty;
        let panel_penalty = panel.fit_regions(1.0, 1.0, &regions).chroms[0][0].deviation_penalty;
        assert_abs_diff_eq!(
            panel_penalty,
            wg_penalty * (1.0 + settings.gc_ratio_penalty_factor * 0.1),
            epsilon = 1e-12
        );
    }
}
