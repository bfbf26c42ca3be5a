use super::{CopyNumberSegment, SegmentSupport};
use crate::cli::CopyNumberSettings;

fn weighted_mean(v1: f64, w1: usize, v2: f64, w2: usize, fallback: f64) -> f64 {
    let total = w1 + w2;
    if total == 0 {
        fallback
    } else {
        (v1 * w1 as f64 + v2 * w2 as f64) / total as f64
    }
}

/// Combine two adjacent segments into one
///
/// Copy number is weighted by depth window count and BAF by BAF count. The start uncertainty and
/// outer boundary supports are kept from the corresponding side.
///
pub fn merge_segments(left: &CopyNumberSegment, right: &CopyNumberSegment) -> CopyNumberSegment {
    let dominant = if right.depth_window_count > left.depth_window_count {
        right
    } else {
        left
    };
    let mut segment = left.segment.clone();
    segment.range.merge(&right.segment.range);

    let start_support = left.start_support;
    let end_support = right.end_support;
    CopyNumberSegment {
        segment,
        copy_number: weighted_mean(
            left.copy_number,
            left.depth_window_count,
            right.copy_number,
            right.depth_window_count,
            dominant.copy_number,
        ),
        baf: weighted_mean(
            left.baf,
            left.baf_count,
            right.baf,
            right.baf_count,
            dominant.baf,
        ),
        baf_count: left.baf_count + right.baf_count,
        depth_window_count: left.depth_window_count + right.depth_window_count,
        diploid_window_count: left.diploid_window_count + right.diploid_window_count,
        start_support,
        end_support,
        sv_support: start_support == SegmentSupport::StructuralVariant
            || end_support == SegmentSupport::StructuralVariant,
        min_start: left.min_start,
        max_start: left.max_start,
    }
}

/// Merge segment `index` with its right-hand neighbor in place
///
fn merge_with_next(segments: &mut Vec<CopyNumberSegment>, index: usize) {
    let right = segments.remove(index + 1);
    segments[index] = merge_segments(&segments[index], &right);
}

/// Absorb all segments without depth windows into a neighbor
///
/// Each such segment is absorbed across its weaker boundary, or its left boundary when both are equally
/// supported. Expects at least one segment to have depth windows.
///
pub fn absorb_empty_segments(segments: &mut Vec<CopyNumberSegment>) {
    while segments.len() > 1 {
        let Some(index) = segments.iter().position(|x| x.depth_window_count == 0) else {
            break;
        };
        let absorb_left = if index == 0 {
            false
        } else if index + 1 == segments.len() {
            true
        } else {
            segments[index].start_support <= segments[index].end_support
        };
        if absorb_left {
            merge_with_next(segments, index - 1);
        } else {
            merge_with_next(segments, index);
        }
    }
}

/// Maximum copy number difference between two segments which can be merged across an unsupported
/// boundary
///
pub fn get_merge_tolerance(
    settings: &CopyNumberSettings,
    left: &CopyNumberSegment,
    right: &CopyNumberSegment,
) -> f64 {
    let max_copy_number = f64::max(left.copy_number, right.copy_number);
    let min_window_count = std::cmp::min(left.depth_window_count, right.depth_window_count).max(1);
    f64::max(
        settings.copy_number_abs_tolerance,
        settings.copy_number_rel_tolerance * max_copy_number,
    ) + settings.copy_number_window_noise / (min_window_count as f64).sqrt()
}

/// Merge adjacent segments across unsupported boundaries where copy number is within tolerance
///
/// Returns true if any segments were merged.
///
pub fn merge_within_tolerance(
    settings: &CopyNumberSettings,
    segments: &mut Vec<CopyNumberSegment>,
) -> bool {
    let mut is_merged = false;
    let mut index = 0;
    while index + 1 < segments.len() {
        let (left, right) = (&segments[index], &segments[index + 1]);
        if left.end_support == SegmentSupport::None
            && (left.copy_number - right.copy_number).abs()
                <= get_merge_tolerance(settings, left, right)
        {
            merge_with_next(segments, index);
            is_merged = true;
        } else {
            index += 1;
        }
    }
    is_merged
}

fn get_min_window_count(settings: &CopyNumberSettings, segment: &CopyNumberSegment) -> usize {
    if segment.start_support == SegmentSupport::Centromere
        || segment.end_support == SegmentSupport::Centromere
    {
        settings.min_diploid_tumor_ratio_count_at_centromere
    } else {
        settings.min_diploid_tumor_ratio_count
    }
}

/// Absorb the segment with the fewest depth windows, among those below the minimum window count with an
/// unsupported boundary, into the unsupported neighbor closest in copy number
///
/// Returns true if a segment was absorbed.
///
pub fn smooth_smallest_segment(
    settings: &CopyNumberSettings,
    segments: &mut Vec<CopyNumberSegment>,
) -> bool {
    let candidate = segments
        .iter()
        .enumerate()
        .filter(|(_, x)| {
            (x.start_support == SegmentSupport::None || x.end_support == SegmentSupport::None)
                && x.depth_window_count < get_min_window_count(settings, x)
        })
        .min_by_key(|(_, x)| x.depth_window_count)
        .map(|(index, _)| index);
    let Some(index) = candidate else {
        return false;
    };

    let segment = &segments[index];
    let left_distance = (index > 0 && segment.start_support == SegmentSupport::None)
        .then(|| (segments[index - 1].copy_number - segment.copy_number).abs());
    let right_distance = (index + 1 < segments.len() && segment.end_support == SegmentSupport::None)
        .then(|| (segments[index + 1].copy_number - segment.copy_number).abs());

    let absorb_left = match (left_distance, right_distance) {
        (Some(left), Some(right)) => left <= right,
        (Some(_), None) => true,
        (None, Some(_)) => false,
        (None, None) => return false,
    };
    if absorb_left {
        merge_with_next(segments, index - 1);
    } else {
        merge_with_next(segments, index);
    }
    true
}

/// Alternate tolerance merging and smoothing until neither changes the segments
///
pub fn consolidate_segments(settings: &CopyNumberSettings, segments: &mut Vec<CopyNumberSegment>) {
    loop {
        let is_merged = merge_within_tolerance(settings, segments);
        let is_smoothed = smooth_smallest_segment(settings, segments);
        if !(is_merged || is_smoothed) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copy_number::test_utils::get_test_segment;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_merge_segments() {
        let left = get_test_segment(0, 1000, 10, 2.0, SegmentSupport::Telomere, SegmentSupport::None);
        let mut right =
            get_test_segment(1000, 4000, 30, 3.0, SegmentSupport::None, SegmentSupport::StructuralVariant);
        right.baf = 0.7;
        let merged = merge_segments(&left, &right);
        assert_eq!(merged.segment.range.start, 0);
        assert_eq!(merged.segment.range.end, 4000);
        assert_abs_diff_eq!(merged.copy_number, 2.75, epsilon = 1e-12);
        assert_abs_diff_eq!(merged.baf, 0.65, epsilon = 1e-12);
        assert_eq!(merged.depth_window_count, 40);
        assert_eq!(merged.start_support, SegmentSupport::Telomere);
        assert_eq!(merged.end_support, SegmentSupport::StructuralVariant);
        assert!(merged.sv_support);
    }

    #[test]
    fn test_absorb_empty_segments() {
        let mut segments = vec![
            get_test_segment(0, 1000, 0, 0.0, SegmentSupport::Telomere, SegmentSupport::None),
            get_test_segment(1000, 5000, 40, 2.0, SegmentSupport::None, SegmentSupport::Centromere),
            get_test_segment(5000, 6000, 0, 0.0, SegmentSupport::Centromere, SegmentSupport::None),
            get_test_segment(6000, 9000, 30, 3.0, SegmentSupport::None, SegmentSupport::Telomere),
        ];
        absorb_empty_segments(&mut segments);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].segment.range.start, 0);
        assert_eq!(segments[0].segment.range.end, 5000);
        assert_eq!(segments[0].start_support, SegmentSupport::Telomere);
        assert_abs_diff_eq!(segments[0].copy_number, 2.0, epsilon = 1e-12);
        assert_eq!(segments[1].segment.range.start, 5000);
        assert_eq!(segments[1].start_support, SegmentSupport::Centromere);
        assert_abs_diff_eq!(segments[1].copy_number, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_merge_within_tolerance() {
        let settings = CopyNumberSettings::default();
        let mut segments = vec![
            get_test_segment(0, 100_000, 100, 2.0, SegmentSupport::Telomere, SegmentSupport::None),
            get_test_segment(100_000, 200_000, 100, 2.2, SegmentSupport::None, SegmentSupport::None),
            get_test_segment(200_000, 300_000, 100, 3.0, SegmentSupport::None, SegmentSupport::StructuralVariant),
            get_test_segment(300_000, 400_000, 100, 3.0, SegmentSupport::StructuralVariant, SegmentSupport::Telomere),
        ];
        assert!(merge_within_tolerance(&settings, &mut segments));
        assert_eq!(segments.len(), 3);
        assert_abs_diff_eq!(segments[0].copy_number, 2.1, epsilon = 1e-12);

        // Nothing left to merge
        assert!(!merge_within_tolerance(&settings, &mut segments));
    }

    #[test]
    fn test_smooth_smallest_segment() {
        let settings = CopyNumberSettings::default();
        let mut segments = vec![
            get_test_segment(0, 100_000, 100, 2.0, SegmentSupport::Telomere, SegmentSupport::None),
            get_test_segment(100_000, 110_000, 10, 5.0, SegmentSupport::None, SegmentSupport::None),
            get_test_segment(110_000, 200_000, 90, 4.0, SegmentSupport::None, SegmentSupport::Telomere),
        ];
        assert!(smooth_smallest_segment(&settings, &mut segments));
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].segment.range.start, 100_000);
        assert_eq!(segments[1].depth_window_count, 100);
        assert_abs_diff_eq!(segments[1].copy_number, 4.1, epsilon = 1e-12);

        assert!(!smooth_smallest_segment(&settings, &mut segments));
    }

    #[test]
    fn test_supported_segment_is_not_smoothed() {
        let settings = CopyNumberSettings::default();
        let mut segments = vec![
            get_test_segment(0, 100_000, 100, 2.0, SegmentSupport::Telomere, SegmentSupport::StructuralVariant),
            get_test_segment(100_000, 110_000, 10, 5.0, SegmentSupport::StructuralVariant, SegmentSupport::StructuralVariant),
            get_test_segment(110_000, 200_000, 90, 2.0, SegmentSupport::StructuralVariant, SegmentSupport::Telomere),
        ];
        consolidate_segments(&settings, &mut segments);
        assert_eq!(segments.len(), 3);
    }
}
