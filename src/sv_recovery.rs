//! Recover structural variants supporting unexplained copy number changes
//!

use std::collections::HashSet;

use log::{debug, info};

use crate::chrom_list::ChromList;
use crate::cli::RecoverySettings;
use crate::copy_number::{CopyNumberSegment, CopyNumberSegments, SegmentSupport};
use crate::fitting::PurityAdjuster;
use crate::structural_variant::{BreakendDirection, StructuralVariant, SvBreakend};

/// Return the minimum copy number change for a boundary between `left` and `right` to be examined
///
fn get_min_copy_number_change(
    settings: &RecoverySettings,
    left: &CopyNumberSegment,
    right: &CopyNumberSegment,
) -> f64 {
    let long_count = settings.recovery_long_segment_window_count;
    if left.depth_window_count >= long_count && right.depth_window_count >= long_count {
        settings.recovery_min_long_segment_copy_number_change
    } else {
        settings.recovery_min_copy_number_change
    }
}

fn get_min_qual(settings: &RecoverySettings, sv: &StructuralVariant) -> f64 {
    if sv.is_single_breakend() {
        settings.recovery_min_qual_score_single_breakend
    } else {
        settings.recovery_min_qual_score_two_breakend
    }
}

/// Unsupported copy number change between two adjacent segments
///
struct UnsupportedBoundary<'a> {
    left: &'a CopyNumberSegment,
    right: &'a CopyNumberSegment,
}

impl UnsupportedBoundary<'_> {
    fn copy_number_change(&self) -> f64 {
        self.right.copy_number - self.left.copy_number
    }

    /// Breakend direction consistent with the copy number change
    ///
    fn expected_direction(&self) -> BreakendDirection {
        if self.copy_number_change() < 0.0 {
            BreakendDirection::LeftAnchor
        } else {
            BreakendDirection::RightAnchor
        }
    }

    fn is_matching_breakend(&self, breakend: &SvBreakend) -> bool {
        let chrom_index = self.right.segment.chrom_index;
        let uncertainty = breakend.position_uncertainty;
        let region_start = breakend.region_start();
        breakend.chrom_index == chrom_index
            && breakend.dir == self.expected_direction()
            && region_start >= self.right.min_start - uncertainty
            && region_start <= self.right.max_start + uncertainty
    }

    /// Test whether the variant allele frequency can explain the copy number change
    ///
    /// Variants without an allele frequency are accepted.
    ///
    fn has_junction_support(
        &self,
        settings: &RecoverySettings,
        adjuster: &PurityAdjuster,
        sv: &StructuralVariant,
    ) -> bool {
        let Some(allele_frequency) = sv.allele_frequency else {
            return true;
        };
        let anchored_copy_number = match self.expected_direction() {
            BreakendDirection::LeftAnchor => self.left.copy_number,
            BreakendDirection::RightAnchor => self.right.copy_number,
        };
        let junction_copy_number =
            adjuster.variant_copy_number(allele_frequency, anchored_copy_number, 1.0);
        junction_copy_number
            >= settings.recovery_min_junction_fraction * self.copy_number_change().abs()
    }
}

/// Find all boundaries without support where the copy number change is large enough to examine
///
fn get_unsupported_boundaries<'a>(
    settings: &RecoverySettings,
    copy_number_segments: &'a CopyNumberSegments,
) -> Vec<UnsupportedBoundary<'a>> {
    copy_number_segments
        .chroms
        .iter()
        .flat_map(|x| x.windows(2))
        .filter(|pair| pair[0].end_support == SegmentSupport::None)
        .map(|pair| UnsupportedBoundary {
            left: &pair[0],
            right: &pair[1],
        })
        .filter(|x| {
            x.copy_number_change().abs() >= get_min_copy_number_change(settings, x.left, x.right)
        })
        .collect()
}

/// Search the candidate pool for structural variants supporting unexplained copy number changes
///
/// Each boundary without support is matched to at most one candidate, choosing the highest quality
/// candidate. Candidates already in `structural_variants` are never recovered, and each candidate is
/// recovered at most once.
///
/// Returns the recovered variants in boundary order.
///
pub fn recover_structural_variants(
    settings: &RecoverySettings,
    chrom_list: &ChromList,
    copy_number_segments: &CopyNumberSegments,
    candidate_pool: &[StructuralVariant],
    structural_variants: &[StructuralVariant],
    adjuster: &PurityAdjuster,
) -> Vec<StructuralVariant> {
    let boundaries = get_unsupported_boundaries(settings, copy_number_segments);
    debug!(
        "Found {} unsupported copy number boundaries for structural variant recovery",
        boundaries.len()
    );
    if boundaries.is_empty() || candidate_pool.is_empty() {
        return Vec::new();
    }

    let mut used_ids = structural_variants
        .iter()
        .map(|x| x.id.as_str())
        .collect::<HashSet<_>>();

    let mut recovered = Vec::new();
    for boundary in boundaries.iter() {
        let best_candidate = candidate_pool
            .iter()
            .filter(|sv| {
                !used_ids.contains(sv.id.as_str())
                    && sv.qual >= get_min_qual(settings, sv)
                    && sv.breakends().any(|x| boundary.is_matching_breakend(x))
                    && boundary.has_junction_support(settings, adjuster, sv)
            })
            .min_by(|a, b| b.qual.total_cmp(&a.qual).then(a.id.cmp(&b.id)));

        if let Some(sv) = best_candidate {
            info!(
                "Recovered structural variant {} at copy number change {:.2} -> {:.2} starting {}",
                sv.id,
                boundary.left.copy_number,
                boundary.right.copy_number,
                boundary.right.segment.to_region_str(chrom_list)
            );
            used_ids.insert(sv.id.as_str());
            recovered.push(sv.clone());
        }
    }
    recovered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chrom_list::ChromInfo;
    use crate::copy_number::test_utils::get_test_segment;
    use crate::structural_variant::test_utils::get_test_sv;

    fn get_test_chrom_list() -> ChromList {
        ChromList::from_chrom_info(vec![ChromInfo::new("chr1", 300_000, 250_000, 251_000)])
    }

    /// A single copy loss from 100-200kb, with no support at either end
    fn get_test_segments() -> CopyNumberSegments {
        let mut segments = vec![
            get_test_segment(0, 100_000, 100, 2.0, SegmentSupport::Telomere, SegmentSupport::None),
            get_test_segment(100_000, 200_000, 100, 1.0, SegmentSupport::None, SegmentSupport::None),
            get_test_segment(200_000, 300_000, 100, 2.0, SegmentSupport::None, SegmentSupport::Telomere),
        ];
        segments[1].min_start = 99_000;
        segments[1].max_start = 101_000;
        segments[2].min_start = 199_000;
        segments[2].max_start = 201_000;
        CopyNumberSegments {
            chroms: vec![segments],
        }
    }

    #[test]
    fn test_recover_structural_variants() {
        let settings = RecoverySettings::default();
        let adjuster = PurityAdjuster::new(1.0, 1.0, 0.5);
        let candidate_pool = vec![
            // Loss start, within uncertainty, two quality levels
            get_test_sv("loss_low", 0, 100_499, BreakendDirection::LeftAnchor, 400.0, false),
            get_test_sv("loss_high", 0, 99_499, BreakendDirection::LeftAnchor, 800.0, false),
            // Wrong orientation for the gain at 200kb
            get_test_sv("gain_wrong", 0, 199_999, BreakendDirection::LeftAnchor, 900.0, false),
            // Single breakend under the single breakend threshold
            get_test_sv("gain_single", 0, 200_000, BreakendDirection::RightAnchor, 900.0, true),
        ];

        let recovered = recover_structural_variants(
            &settings,
            &get_test_chrom_list(),
            &get_test_segments(),
            &candidate_pool,
            &[],
            &adjuster,
        );
        let ids = recovered.iter().map(|x| x.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["loss_high"]);
    }

    #[test]
    fn test_recovery_exclusions() {
        let settings = RecoverySettings::default();
        let adjuster = PurityAdjuster::new(1.0, 1.0, 0.5);

        let mut low_af = get_test_sv("gain_low_af", 0, 200_000, BreakendDirection::RightAnchor, 900.0, false);
        low_af.allele_frequency = Some(0.05);
        let mut high_af = get_test_sv("gain_high_af", 0, 200_500, BreakendDirection::RightAnchor, 500.0, false);
        high_af.allele_frequency = Some(0.4);
        let existing = get_test_sv("loss", 0, 99_999, BreakendDirection::LeftAnchor, 900.0, false);

        let recovered = recover_structural_variants(
            &settings,
            &get_test_chrom_list(),
            &get_test_segments(),
            &[low_af, high_af, existing.clone()],
            &[existing],
            &adjuster,
        );
        let ids = recovered.iter().map(|x| x.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["gain_high_af"]);
    }

    #[test]
    fn test_small_change_is_not_examined() {
        let settings = RecoverySettings::default();
        let adjuster = PurityAdjuster::new(1.0, 1.0, 0.5);
        let mut segments = get_test_segments();
        segments.chroms[0][1].copy_number = 1.7;
        segments.chroms[0][2].copy_number = 2.5;
        let candidate_pool = vec![get_test_sv(
            "loss",
            0,
            99_999,
            BreakendDirection::LeftAnchor,
            900.0,
            false,
        )];
        let recovered = recover_structural_variants(
            &settings,
            &get_test_chrom_list(),
            &segments,
            &candidate_pool,
            &[],
            &adjuster,
        );
        assert!(recovered.is_empty());
    }
}
