use serde::{Deserialize, Serialize};

use super::CopyNumberSegments;
use crate::chrom_list::ChromList;
use crate::fitting::FittedRegion;
use crate::genome_regions::GenomeRegions;
use crate::genome_segment::GenomeSegment;
use crate::segmentation::GermlineStatus;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum::Display)]
pub enum GermlineDeletionStatus {
    Het,
    Hom,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GermlineDeletion {
    pub segment: GenomeSegment,
    pub status: GermlineDeletionStatus,
    pub depth_window_count: usize,
    pub mean_reference_ratio: f64,

    /// Depth window weighted mean of the fitted tumor copy number over the deletion
    pub mean_tumor_copy_number: f64,

    /// Genome-wide indices of all copy number segments overlapping the deletion
    pub segment_indices: Vec<usize>,
}

/// Accumulate one contiguous run of germline deletion regions
///
struct DeletionRun {
    segment: GenomeSegment,
    is_hom: bool,
    depth_window_count: usize,
    reference_ratio_sum: f64,
    copy_number_sum: f64,
}

impl DeletionRun {
    fn new(region: &FittedRegion) -> Self {
        let mut run = Self {
            segment: region.observed.segment.clone(),
            is_hom: true,
            depth_window_count: 0,
            reference_ratio_sum: 0.0,
            copy_number_sum: 0.0,
        };
        run.add(region);
        run
    }

    fn add(&mut self, region: &FittedRegion) {
        let observed = region.observed;
        self.segment.range.merge(&observed.segment.range);
        self.is_hom &= observed.germline_status == GermlineStatus::HomDeletion;
        let weight = observed.depth_window_count;
        self.depth_window_count += weight;
        self.reference_ratio_sum += weight as f64 * observed.mean_reference_ratio;
        self.copy_number_sum += weight as f64 * region.copy_number;
    }

    fn into_deletion(self) -> GermlineDeletion {
        let weight = self.depth_window_count.max(1) as f64;
        GermlineDeletion {
            segment: self.segment,
            status: if self.is_hom {
                GermlineDeletionStatus::Hom
            } else {
                GermlineDeletionStatus::Het
            },
            depth_window_count: self.depth_window_count,
            mean_reference_ratio: self.reference_ratio_sum / weight,
            mean_tumor_copy_number: self.copy_number_sum / weight,
            segment_indices: Vec::new(),
        }
    }
}

/// Get all contiguous runs of germline deletion regions on one chromosome
///
fn get_chrom_deletion_runs(regions: &[FittedRegion]) -> Vec<DeletionRun> {
    let mut runs: Vec<DeletionRun> = Vec::new();
    let mut is_in_run = false;
    for region in regions.iter() {
        if region.observed.germline_status.is_deletion() {
            match runs.last_mut() {
                Some(run) if is_in_run => run.add(region),
                _ => runs.push(DeletionRun::new(region)),
            }
            is_in_run = true;
        } else {
            is_in_run = false;
        }
    }
    runs
}

/// Find germline deletions from runs of het or hom deleted fitted regions
///
/// Deletions shorter than `min_length` or intersecting any exclusion region are skipped. Each deletion
/// is annotated with the genome-wide indices of the copy number segments it overlaps.
///
pub fn get_germline_deletions(
    chrom_list: &ChromList,
    fitted_chroms: &[Vec<FittedRegion>],
    copy_number_segments: &CopyNumberSegments,
    exclusions: &GenomeRegions,
    min_length: i64,
) -> Vec<GermlineDeletion> {
    let mut deletions = Vec::new();
    let mut chrom_segment_offset = 0;
    for (chrom_index, regions) in fitted_chroms.iter().enumerate() {
        let chrom_label = &chrom_list.data[chrom_index].label;
        let chrom_segments = &copy_number_segments.chroms[chrom_index];
        for run in get_chrom_deletion_runs(regions) {
            let range = &run.segment.range;
            if range.size() < min_length || exclusions.intersect(chrom_label, range.start, range.end)
            {
                continue;
            }
            let mut deletion = run.into_deletion();
            deletion.segment_indices = chrom_segments
                .iter()
                .enumerate()
                .filter(|(_, x)| x.segment.intersect(&deletion.segment))
                .map(|(index, _)| chrom_segment_offset + index)
                .collect();
            deletions.push(deletion);
        }
        chrom_segment_offset += chrom_segments.len();
    }
    deletions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chrom_list::ChromInfo;
    use crate::cli::RegionFitSettings;
    use crate::copy_number::SegmentSupport;
    use crate::copy_number::test_utils::get_test_segment;
    use crate::fitting::{PloidyPenaltyFitter, RegionFitter};
    use crate::segmentation::ObservedRegions;
    use crate::segmentation::test_utils::get_test_region;
    use approx::assert_abs_diff_eq;

    fn get_deleted_region(
        start: i64,
        end: i64,
        status: GermlineStatus,
        reference_ratio: f64,
    ) -> crate::segmentation::ObservedRegion {
        let mut region = get_test_region(0, start, end, ((end - start) / 1000) as usize, 1.0, 0.5);
        region.germline_status = status;
        region.mean_reference_ratio = reference_ratio;
        region
    }

    #[test]
    fn test_get_germline_deletions() {
        let chrom_list = ChromList::from_chrom_info(vec![ChromInfo::new(
            "chr1", 100_000, 90_000, 91_000,
        )]);
        let observed_regions = ObservedRegions {
            window_size: 1000,
            chroms: vec![vec![
                get_test_region(0, 0, 10_000, 10, 1.0, 0.5),
                get_deleted_region(10_000, 12_000, GermlineStatus::HetDeletion, 0.5),
                get_deleted_region(12_000, 14_000, GermlineStatus::HomDeletion, 0.0),
                get_test_region(0, 14_000, 30_000, 16, 1.0, 0.5),
                get_deleted_region(30_000, 32_000, GermlineStatus::HomDeletion, 0.0),
                get_test_region(0, 32_000, 50_000, 18, 1.0, 0.5),
                get_deleted_region(50_000, 50_500, GermlineStatus::HetDeletion, 0.5),
                get_test_region(0, 50_500, 60_000, 10, 1.0, 0.5),
                get_deleted_region(60_000, 70_000, GermlineStatus::HetDeletion, 0.5),
                get_test_region(0, 70_000, 100_000, 30, 1.0, 0.5),
            ]],
        };
        let fitter = PloidyPenaltyFitter::new(&RegionFitSettings::default(), false, 0.5);
        let fitted = fitter.fit_regions(1.0, 1.0, &observed_regions);

        let copy_number_segments = CopyNumberSegments {
            chroms: vec![vec![
                get_test_segment(0, 13_000, 13, 2.0, SegmentSupport::Telomere, SegmentSupport::None),
                get_test_segment(13_000, 100_000, 87, 1.0, SegmentSupport::None, SegmentSupport::Telomere),
            ]],
        };

        let mut exclusions = GenomeRegions::new();
        exclusions.add_region("chr1", 65_000, 66_000);

        let deletions = get_germline_deletions(
            &chrom_list,
            &fitted.chroms,
            &copy_number_segments,
            &exclusions,
            1000,
        );
        assert_eq!(deletions.len(), 2);

        let deletion = &deletions[0];
        assert_eq!(deletion.segment.range.start, 10_000);
        assert_eq!(deletion.segment.range.end, 14_000);
        assert_eq!(deletion.status, GermlineDeletionStatus::Het);
        assert_eq!(deletion.depth_window_count, 4);
        assert_abs_diff_eq!(deletion.mean_reference_ratio, 0.25, epsilon = 1e-12);
        assert_eq!(deletion.segment_indices, vec![0, 1]);

        let deletion = &deletions[1];
        assert_eq!(deletion.segment.range.start, 30_000);
        assert_eq!(deletion.status, GermlineDeletionStatus::Hom);
        assert_eq!(deletion.segment_indices, vec![1]);
    }
}
