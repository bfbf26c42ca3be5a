use simple_error::{SimpleResult, bail};

use super::breakpoints::Breakpoint;
use super::observed_region::ObservedRegion;
use crate::chrom_list::ChromList;
use crate::genome_segment::is_strict_order;

/// Check the observed region invariants for one chromosome
///
/// Regions must be non-empty, ordered and gapless from the chromosome start to its end, and every
/// region start after the first must be a breakpoint position.
///
pub fn validate_chrom_regions(
    chrom_list: &ChromList,
    chrom_index: usize,
    regions: &[ObservedRegion],
    breakpoints: &[Breakpoint],
) -> SimpleResult<()> {
    let chrom_info = &chrom_list.data[chrom_index];
    let chrom_label = &chrom_info.label;

    let (Some(first), Some(last)) = (regions.first(), regions.last()) else {
        bail!("Segmentation produced no regions on chromosome {chrom_label}");
    };
    if first.segment.range.start != 0 {
        bail!(
            "First region does not start at the chromosome start: {}",
            first.segment.to_region_str(chrom_list)
        );
    }
    if last.segment.range.end != chrom_info.length as i64 {
        bail!(
            "Last region does not end at the chromosome end: {}",
            last.segment.to_region_str(chrom_list)
        );
    }

    for region in regions.iter() {
        if region.segment.chrom_index != chrom_index {
            bail!(
                "Region assigned to the wrong chromosome: {}",
                region.segment.to_region_str(chrom_list)
            );
        }
        if region.segment.range.is_empty() {
            bail!(
                "Empty region: {}",
                region.segment.to_region_str(chrom_list)
            );
        }
    }

    for pair in regions.windows(2) {
        let (r1, r2) = (&pair[0], &pair[1]);
        if !is_strict_order(&r1.segment, &r2.segment) {
            bail!(
                "Overlapping regions: {} and {}",
                r1.segment.to_region_str(chrom_list),
                r2.segment.to_region_str(chrom_list)
            );
        }
        if r1.segment.range.end < r2.segment.range.start {
            bail!(
                "Gap between regions: {} and {}",
                r1.segment.to_region_str(chrom_list),
                r2.segment.to_region_str(chrom_list)
            );
        }
        let start = r2.segment.range.start;
        if !breakpoints.iter().any(|x| x.pos == start) {
            bail!(
                "Region start is not supported by a breakpoint: {}",
                r2.segment.to_region_str(chrom_list)
            );
        }
    }

    Ok(())
}
