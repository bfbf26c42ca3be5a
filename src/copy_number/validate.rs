use simple_error::{SimpleResult, bail};

use super::{CopyNumberSegment, SegmentSupport};
use crate::chrom_list::ChromList;

/// Copy numbers closer than this are treated as equal
const COPY_NUMBER_EPSILON: f64 = 1e-6;

/// Check the copy number segment invariants for one chromosome
///
/// Segments must be non-empty, ordered and gapless from the chromosome start to its end, with matching
/// supports on each shared boundary. No unsupported boundary may separate segments with equal copy
/// number.
///
pub fn validate_chrom_segments(
    chrom_list: &ChromList,
    chrom_index: usize,
    segments: &[CopyNumberSegment],
) -> SimpleResult<()> {
    let chrom_info = &chrom_list.data[chrom_index];
    let chrom_label = &chrom_info.label;

    let (Some(first), Some(last)) = (segments.first(), segments.last()) else {
        bail!("Copy number builder produced no segments on chromosome {chrom_label}");
    };
    if first.segment.range.start != 0 {
        bail!(
            "First copy number segment does not start at the chromosome start: {}",
            first.segment.to_region_str(chrom_list)
        );
    }
    if last.segment.range.end != chrom_info.length as i64 {
        bail!(
            "Last copy number segment does not end at the chromosome end: {}",
            last.segment.to_region_str(chrom_list)
        );
    }

    for segment in segments.iter() {
        if segment.segment.chrom_index != chrom_index || segment.segment.range.is_empty() {
            bail!(
                "Invalid copy number segment on chromosome {chrom_label}: {}",
                segment.segment.to_region_str(chrom_list)
            );
        }
    }

    for pair in segments.windows(2) {
        let (s1, s2) = (&pair[0], &pair[1]);
        if s1.segment.range.end != s2.segment.range.start {
            bail!(
                "Copy number segments are not contiguous: {} and {}",
                s1.segment.to_region_str(chrom_list),
                s2.segment.to_region_str(chrom_list)
            );
        }
        if s1.end_support != s2.start_support {
            bail!(
                "Inconsistent boundary support between copy number segments: {} and {}",
                s1.segment.to_region_str(chrom_list),
                s2.segment.to_region_str(chrom_list)
            );
        }
        if s1.end_support == SegmentSupport::None
            && (s1.copy_number - s2.copy_number).abs() < COPY_NUMBER_EPSILON
        {
            bail!(
                "Unsupported boundary between copy number segments with equal copy number: {} and {}",
                s1.segment.to_region_str(chrom_list),
                s2.segment.to_region_str(chrom_list)
            );
        }
    }
    Ok(())
}
