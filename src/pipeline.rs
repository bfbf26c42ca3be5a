//! Fit purity, ploidy and copy number segments for one sample
//!

use log::{debug, info, warn};
use simple_error::SimpleResult;

use crate::allele_frequency::get_expected_baf;
use crate::best_fit::{BestFit, is_somatic_fit_rejected, select_best_fit};
use crate::cli::FitSettings;
use crate::copy_number::{CopyNumberSegments, GermlineDeletion, build_copy_numbers};
use crate::fitting::{FitCandidate, PloidyPenaltyFitter, RegionFitter, search};
use crate::genome_regions::GenomeRegions;
use crate::segmentation::{ObservedRegions, create_observed_regions};
use crate::somatic_variant::GenomeSomaticVariants;
use crate::structural_variant::StructuralVariant;
use crate::sv_recovery::recover_structural_variants;
use crate::window_data::SampleWindowData;

/// All in-memory inputs for one sample
///
pub struct SampleInput {
    pub window_data: SampleWindowData,

    /// Passing structural variants used as segmentation breakpoints
    pub structural_variants: Vec<StructuralVariant>,

    /// Candidate structural variants which may be recovered at unsupported copy number changes
    pub sv_recovery_pool: Vec<StructuralVariant>,

    pub somatic_variants: Option<GenomeSomaticVariants>,
    pub germline_deletion_exclusions: GenomeRegions,
}

pub struct SampleFitResult {
    pub best_fit: BestFit,
    pub expected_baf: f64,

    /// Observed regions from the final segmentation pass
    pub observed_regions: ObservedRegions,

    pub copy_number_segments: CopyNumberSegments,
    pub germline_deletions: Vec<GermlineDeletion>,
    pub recovered_structural_variants: Vec<StructuralVariant>,

    /// Number of times the genome was segmented, 2 if any structural variants were recovered
    pub segmentation_passes: usize,

    /// True if a somatic-assisted fit was rejected in favor of the normal fit
    pub is_somatic_fit_reverted: bool,
}

/// Fit all observed regions with a fixed model, then build copy number segments from them
///
fn get_copy_numbers(
    settings: &FitSettings,
    input: &SampleInput,
    fitter: &dyn RegionFitter,
    fit: &FitCandidate,
    observed_regions: &ObservedRegions,
    structural_variants: &[StructuralVariant],
) -> SimpleResult<(CopyNumberSegments, Vec<GermlineDeletion>)> {
    let fitted_regions = fitter.fit_regions(fit.purity, fit.norm_factor, observed_regions);
    build_copy_numbers(
        &settings.copy_number,
        &input.window_data.chrom_list,
        &fitted_regions,
        structural_variants,
        &input.germline_deletion_exclusions,
    )
}

/// Run the full fitting procedure for one sample
///
/// The genome is segmented and the best purity and ploidy fit is selected from the candidate grid. Copy
/// number segments are built from the fit, after which structural variants supporting unexplained copy
/// number changes are recovered from the candidate pool. If any are recovered, the genome is segmented
/// again with the recovered variants and copy numbers are rebuilt with the same fit. This second pass is
/// never repeated.
///
pub fn fit_sample(
    settings: &FitSettings,
    thread_count: usize,
    input: &SampleInput,
) -> SimpleResult<SampleFitResult> {
    let window_data = &input.window_data;
    let observed_regions =
        create_observed_regions(settings.tumor_only, &input.structural_variants, window_data)?;

    let expected_baf = match window_data.baf_points.mean_depth() {
        Some(mean_depth) => get_expected_baf(mean_depth),
        None => {
            warn!("No allele frequency observations found");
            get_expected_baf(0.0)
        }
    };
    info!("Expected balanced BAF: {expected_baf:.4}");

    let fitter = PloidyPenaltyFitter::new(&settings.region_fit, settings.targeted_panel, expected_baf);
    debug!("Region fit mode: {:?}", fitter.mode());

    let somatic_variants = input.somatic_variants.as_ref().filter(|x| !x.is_empty());
    let penalty_somatic_variants = if settings.tumor_only {
        None
    } else {
        somatic_variants
    };
    let candidates = search(
        &settings.search,
        thread_count,
        &fitter,
        &observed_regions,
        penalty_somatic_variants,
    )?;

    let mut best_fit = select_best_fit(
        &settings.best_fit,
        candidates,
        somatic_variants,
        &input.structural_variants,
        &observed_regions,
    )?;

    let (mut copy_number_segments, mut germline_deletions) = get_copy_numbers(
        settings,
        input,
        &fitter,
        &best_fit.fit,
        &observed_regions,
        &input.structural_variants,
    )?;

    let deleted_window_fraction = copy_number_segments.deleted_window_fraction();
    let is_somatic_fit_reverted =
        is_somatic_fit_rejected(&settings.best_fit, &best_fit, deleted_window_fraction);
    if is_somatic_fit_reverted {
        info!(
            "Reverting somatic-assisted fit to normal fit: {:.2}% of depth windows are deleted",
            deleted_window_fraction * 100.0
        );
        best_fit = best_fit.revert_to_normal_fit();
        (copy_number_segments, germline_deletions) = get_copy_numbers(
            settings,
            input,
            &fitter,
            &best_fit.fit,
            &observed_regions,
            &input.structural_variants,
        )?;
    }

    info!(
        "Selected {} fit purity: {:.2} ploidy: {:.2}",
        best_fit.method, best_fit.fit.purity, best_fit.fit.ploidy
    );

    let adjuster = fitter.get_purity_adjuster(best_fit.fit.purity, best_fit.fit.norm_factor);
    let recovered_structural_variants = recover_structural_variants(
        &settings.recovery,
        &window_data.chrom_list,
        &copy_number_segments,
        &input.sv_recovery_pool,
        &input.structural_variants,
        &adjuster,
    );

    let mut segmentation_passes = 1;
    let observed_regions = if recovered_structural_variants.is_empty() {
        observed_regions
    } else {
        info!(
            "Recovered {} structural variants, segmenting genome again",
            recovered_structural_variants.len()
        );
        let structural_variants = input
            .structural_variants
            .iter()
            .chain(recovered_structural_variants.iter())
            .cloned()
            .collect::<Vec<_>>();
        let observed_regions =
            create_observed_regions(settings.tumor_only, &structural_variants, window_data)?;
        (copy_number_segments, germline_deletions) = get_copy_numbers(
            settings,
            input,
            &fitter,
            &best_fit.fit,
            &observed_regions,
            &structural_variants,
        )?;
        segmentation_passes += 1;
        observed_regions
    };

    Ok(SampleFitResult {
        best_fit,
        expected_baf,
        observed_regions,
        copy_number_segments,
        germline_deletions,
        recovered_structural_variants,
        segmentation_passes,
        is_somatic_fit_reverted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allele_frequency::{BafPoint, GenomeBafPoints};
    use crate::best_fit::FitMethod;
    use crate::chrom_list::{ChromInfo, ChromList};
    use crate::copy_number::SegmentSupport;
    use crate::depth_windows::{DepthWindow, GenomeDepthWindows};
    use crate::somatic_variant::SomaticVariant;
    use crate::structural_variant::BreakendDirection;
    use crate::structural_variant::test_utils::get_test_sv;
    use crate::window_data::Gender;
    use approx::assert_abs_diff_eq;

    const WINDOW_SIZE: i64 = 1000;

    /// Single chromosome sample where the tumor ratio and BAF of each window is set from its start
    fn get_test_window_data(
        chrom_length: u64,
        centromere_start: i64,
        observations: impl Fn(i64) -> (f64, f64),
        depth_ratio_pcf: Vec<i64>,
    ) -> SampleWindowData {
        let chrom_list = ChromList::from_chrom_info(vec![ChromInfo::new(
            "chr1",
            chrom_length,
            centromere_start,
            centromere_start + 100 * WINDOW_SIZE,
        )]);
        let mut depth_windows = GenomeDepthWindows::new(WINDOW_SIZE, 1);
        let mut baf_points = GenomeBafPoints::new(1);
        for start in (0..chrom_length as i64).step_by(WINDOW_SIZE as usize) {
            let (tumor_ratio, baf) = observations(start);
            depth_windows.chroms[0].push(DepthWindow::new(start, tumor_ratio, 1.0, 0.5));
            baf_points.chroms[0].push(BafPoint::new(start + 500, baf, 10_000));
        }
        SampleWindowData {
            chrom_list,
            gender: Gender::Female,
            depth_windows,
            baf_points,
            baf_pcf: vec![Vec::new()],
            depth_ratio_pcf: vec![depth_ratio_pcf],
        }
    }

    fn get_test_input(window_data: SampleWindowData) -> SampleInput {
        SampleInput {
            window_data,
            structural_variants: Vec::new(),
            sv_recovery_pool: Vec::new(),
            somatic_variants: None,
            germline_deletion_exclusions: GenomeRegions::new(),
        }
    }

    fn assert_segment_invariants(copy_number_segments: &CopyNumberSegments, chrom_length: i64) {
        for segments in copy_number_segments.chroms.iter() {
            assert_eq!(segments.first().unwrap().segment.range.start, 0);
            assert_eq!(segments.last().unwrap().segment.range.end, chrom_length);
            for pair in segments.windows(2) {
                assert_eq!(pair[0].segment.range.end, pair[1].segment.range.start);
                assert!(
                    pair[0].copy_number != pair[1].copy_number
                        || pair[0].end_support != SegmentSupport::None
                );
            }
        }
    }

    /// Clean diploid genome fits diploid ploidy at the penalty floor
    #[test]
    fn test_clean_diploid_fit() {
        let window_data = get_test_window_data(1_000_000, 500_000, |_| (1.0, 0.5), Vec::new());
        let input = get_test_input(window_data);
        let settings = FitSettings::default();

        let result = fit_sample(&settings, 2, &input).unwrap();
        let fit = &result.best_fit.fit;
        assert_eq!(result.best_fit.method, FitMethod::Normal);
        assert_abs_diff_eq!(fit.ploidy, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.purity, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.score, 0.002, epsilon = 1e-9);
        assert_eq!(result.segmentation_passes, 1);

        let search = &settings.search;
        for candidate in result.best_fit.ranked_candidates.iter() {
            assert!(candidate.purity >= search.min_purity && candidate.purity <= search.max_purity);
            assert!(candidate.ploidy >= search.min_ploidy && candidate.ploidy <= search.max_ploidy);
            assert!(fit.score <= candidate.score + 1e-9);
        }

        let segments = &result.copy_number_segments.chroms[0];
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].end_support, SegmentSupport::Centromere);
        for segment in segments.iter() {
            assert_abs_diff_eq!(segment.copy_number, 2.0, epsilon = 1e-9);
        }
        assert_segment_invariants(&result.copy_number_segments, 1_000_000);
    }

    /// Single copy loss with structural variant support on the left side only, with the right side
    /// recovered from the candidate pool
    #[test]
    fn test_loss_with_recovered_support() {
        let chrom_length = 10_000_000;
        let is_loss = |start: i64| (4_000_000..6_000_000).contains(&start);
        let window_data = get_test_window_data(
            chrom_length,
            9_000_000,
            |start| {
                if is_loss(start) { (0.5, 1.0) } else { (1.0, 0.5) }
            },
            vec![4_000_000, 6_000_000],
        );
        let mut input = get_test_input(window_data);
        input.structural_variants.push(get_test_sv(
            "left",
            0,
            3_999_999,
            BreakendDirection::LeftAnchor,
            800.0,
            false,
        ));
        input.sv_recovery_pool.push(get_test_sv(
            "right",
            0,
            6_000_000,
            BreakendDirection::RightAnchor,
            500.0,
            false,
        ));
        let settings = FitSettings::default();

        let result = fit_sample(&settings, 2, &input).unwrap();
        let fit = &result.best_fit.fit;
        assert_abs_diff_eq!(fit.purity, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.ploidy, 1.8, epsilon = 1e-9);

        assert_eq!(result.recovered_structural_variants.len(), 1);
        assert_eq!(result.recovered_structural_variants[0].id, "right");
        assert_eq!(result.segmentation_passes, 2);

        let segments = &result.copy_number_segments.chroms[0];
        let loss = segments
            .iter()
            .find(|x| x.segment.range.start == 4_000_000)
            .unwrap();
        assert_eq!(loss.segment.range.end, 6_000_000);
        assert_abs_diff_eq!(loss.copy_number, 1.0, epsilon = 1e-9);
        assert_eq!(loss.start_support, SegmentSupport::StructuralVariant);
        assert_eq!(loss.end_support, SegmentSupport::StructuralVariant);
        assert!(loss.sv_support);
        assert_segment_invariants(&result.copy_number_segments, chrom_length as i64);
    }

    /// Without a matching candidate the unsupported boundary is kept and segmentation runs once
    #[test]
    fn test_loss_without_recovery() {
        let chrom_length = 10_000_000;
        let is_loss = |start: i64| (4_000_000..6_000_000).contains(&start);
        let window_data = get_test_window_data(
            chrom_length,
            9_000_000,
            |start| {
                if is_loss(start) { (0.5, 1.0) } else { (1.0, 0.5) }
            },
            vec![4_000_000, 6_000_000],
        );
        let mut input = get_test_input(window_data);
        input.sv_recovery_pool.push(get_test_sv(
            "low_qual",
            0,
            6_000_000,
            BreakendDirection::RightAnchor,
            100.0,
            false,
        ));
        let settings = FitSettings::default();

        let result = fit_sample(&settings, 2, &input).unwrap();
        assert!(result.recovered_structural_variants.is_empty());
        assert_eq!(result.segmentation_passes, 1);
        let segments = &result.copy_number_segments.chroms[0];
        assert_eq!(segments[1].segment.range.start, 4_000_000);
        assert_eq!(segments[1].start_support, SegmentSupport::None);
        assert_eq!(segments[1].end_support, SegmentSupport::None);
    }

    /// Somatic variants on chr1 with an allele frequency peak at 0.2
    fn get_test_somatic_variants(chrom_count: usize, count: i64) -> GenomeSomaticVariants {
        let mut somatic_variants = GenomeSomaticVariants::new(chrom_count);
        for i in 0..count {
            somatic_variants.chroms[0].push(SomaticVariant {
                pos: 10_000 + i * 10_000,
                allele_frequency: if i % 2 == 0 { 0.19 } else { 0.21 },
                total_read_count: 80,
                is_pass: true,
            });
        }
        somatic_variants
    }

    /// Highly diploid genome with a clear somatic variant allele frequency peak
    #[test]
    fn test_somatic_assisted_fit() {
        let window_data = get_test_window_data(1_000_000, 500_000, |_| (1.0, 0.5), Vec::new());
        let mut input = get_test_input(window_data);
        input.somatic_variants = Some(get_test_somatic_variants(1, 40));
        let settings = FitSettings::default();

        let result = fit_sample(&settings, 2, &input).unwrap();
        let best_fit = &result.best_fit;
        assert_eq!(best_fit.method, FitMethod::SomaticAssisted);
        assert!(!result.is_somatic_fit_reverted);
        assert_abs_diff_eq!(best_fit.fit.purity, 0.4, epsilon = 1e-9);
        assert_abs_diff_eq!(best_fit.fit.ploidy, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(best_fit.normal_fit.purity, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            result.copy_number_segments.deleted_window_fraction(),
            0.0,
            epsilon = 1e-12
        );
    }

    /// Female sample with chrY windows at zero depth, which are not counted as tumor deletions
    #[test]
    fn test_somatic_assisted_fit_with_female_chr_y() {
        let mut window_data =
            get_test_window_data(1_000_000, 500_000, |_| (1.0, 0.5), Vec::new());
        window_data.chrom_list = ChromList::from_chrom_info(vec![
            ChromInfo::new("chr1", 1_000_000, 500_000, 600_000),
            ChromInfo::new("chrY", 50_000, 20_000, 22_000),
        ]);
        window_data.depth_windows.chroms.push(
            (0..50)
                .map(|i| DepthWindow::new(i * WINDOW_SIZE, 0.0, 0.0, 0.5))
                .collect(),
        );
        window_data.baf_points.chroms.push(Vec::new());
        window_data.baf_pcf.push(Vec::new());
        window_data.depth_ratio_pcf.push(Vec::new());
        let mut input = get_test_input(window_data);
        input.somatic_variants = Some(get_test_somatic_variants(2, 40));
        let settings = FitSettings::default();

        let result = fit_sample(&settings, 2, &input).unwrap();
        let chr_y = &result.copy_number_segments.chroms[1];
        assert!(!chr_y.is_empty());
        for segment in chr_y.iter() {
            assert!(segment.copy_number < 0.5);
            assert_eq!(segment.diploid_window_count, 0);
        }
        assert_abs_diff_eq!(
            result.copy_number_segments.deleted_window_fraction(),
            0.0,
            epsilon = 1e-12
        );
        assert_eq!(result.best_fit.method, FitMethod::SomaticAssisted);
        assert!(!result.is_somatic_fit_reverted);
        assert_abs_diff_eq!(result.best_fit.fit.purity, 0.4, epsilon = 1e-9);
    }

    /// A somatic-assisted fit rejected by the deleted window check is replaced by the normal fit, with
    /// copy numbers rebuilt from the normal fit
    #[test]
    fn test_somatic_assisted_fit_reverted() {
        let window_data = get_test_window_data(1_000_000, 500_000, |_| (1.0, 0.5), Vec::new());
        let mut input = get_test_input(window_data);
        input.somatic_variants = Some(get_test_somatic_variants(1, 40));
        let mut settings = FitSettings::default();
        settings.best_fit.max_somatic_fit_deleted_percent = -1.0;

        let result = fit_sample(&settings, 2, &input).unwrap();
        let best_fit = &result.best_fit;
        assert!(result.is_somatic_fit_reverted);
        assert_eq!(best_fit.method, FitMethod::Normal);
        assert_eq!(best_fit.fit, best_fit.normal_fit);
        assert_abs_diff_eq!(best_fit.fit.purity, 1.0, epsilon = 1e-9);

        let fitter = PloidyPenaltyFitter::new(&settings.region_fit, false, result.expected_baf);
        let (expected_segments, _) = get_copy_numbers(
            &settings,
            &input,
            &fitter,
            &best_fit.normal_fit,
            &result.observed_regions,
            &input.structural_variants,
        )
        .unwrap();
        let get_values = |x: &CopyNumberSegments| {
            x.iter()
                .map(|s| (s.segment.range.start, s.segment.range.end, s.copy_number, s.baf))
                .collect::<Vec<_>>()
        };
        assert_eq!(
            get_values(&result.copy_number_segments),
            get_values(&expected_segments)
        );
    }

    /// Passing structural variant tumor fragments don't stand in for the minimum somatic variant count
    #[test]
    fn test_somatic_fit_requires_min_variants_with_sv_evidence() {
        let window_data = get_test_window_data(1_000_000, 500_000, |_| (1.0, 0.5), Vec::new());
        let mut input = get_test_input(window_data);
        input.somatic_variants = Some(get_test_somatic_variants(1, 20));
        let mut sv = get_test_sv("sv1", 0, 250_000, BreakendDirection::LeftAnchor, 800.0, false);
        sv.tumor_fragment_count = 2000;
        input.structural_variants.push(sv);
        let mut settings = FitSettings::default();
        settings.best_fit.somatic_min_total_variants = 30;

        let result = fit_sample(&settings, 2, &input).unwrap();
        assert_eq!(result.best_fit.method, FitMethod::Normal);
        assert!(!result.is_somatic_fit_reverted);
        assert_abs_diff_eq!(result.best_fit.fit.purity, 1.0, epsilon = 1e-9);

        settings.best_fit.somatic_min_total_variants = 20;
        let result = fit_sample(&settings, 2, &input).unwrap();
        assert_eq!(result.best_fit.method, FitMethod::SomaticAssisted);
        assert_abs_diff_eq!(result.best_fit.fit.purity, 0.4, epsilon = 1e-9);
    }
}
