//! Build observed genome regions from breakpoint evidence
//!

mod breakpoints;
mod observed_region;
mod validate;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use simple_error::SimpleResult;
use thousands::Separable;

use self::breakpoints::{Breakpoint, get_chrom_breakpoints};
use self::observed_region::RegionObservations;
pub use self::breakpoints::BreakpointSource;
pub use self::observed_region::{GermlineStatus, ObservedRegion};
use self::validate::validate_chrom_regions;
use crate::genome_segment::GenomeSegment;
use crate::structural_variant::StructuralVariant;
use crate::window_data::SampleWindowData;

/// Observed regions for the whole genome, indexed by chromosome index
///
#[derive(Clone, Deserialize, Serialize)]
pub struct ObservedRegions {
    pub window_size: i64,
    pub chroms: Vec<Vec<ObservedRegion>>,
}

impl ObservedRegions {
    pub fn iter(&self) -> impl Iterator<Item = &ObservedRegion> {
        self.chroms.iter().flatten()
    }

    pub fn region_count(&self) -> usize {
        self.chroms.iter().map(|x| x.len()).sum()
    }
}

/// Range of plausible true start positions for a region starting at `bp`
///
fn get_start_uncertainty(bp: &Breakpoint, window_size: i64, chrom_length: i64) -> (i64, i64) {
    if bp.source.is_pcf() {
        (
            std::cmp::max(bp.pos - window_size, 0),
            std::cmp::min(bp.pos + window_size, chrom_length),
        )
    } else {
        (bp.pos, bp.pos)
    }
}

/// Build observed regions for one chromosome
///
fn get_chrom_observed_regions(
    chrom_index: usize,
    tumor_only: bool,
    structural_variants: &[StructuralVariant],
    window_data: &SampleWindowData,
) -> SimpleResult<Vec<ObservedRegion>> {
    let chrom_list = &window_data.chrom_list;
    let chrom_info = &chrom_list.data[chrom_index];
    let chrom_length = chrom_info.length as i64;
    let window_size = window_data.depth_windows.window_size;
    let expected_reference_ratio = window_data.expected_reference_ratio(chrom_index);

    let breakpoints = get_chrom_breakpoints(
        chrom_index,
        chrom_info,
        window_size,
        structural_variants,
        &window_data.baf_pcf[chrom_index],
        &window_data.depth_ratio_pcf[chrom_index],
    );

    let windows = &window_data.depth_windows.chroms[chrom_index];
    let baf_points = &window_data.baf_points.chroms[chrom_index];
    let mut window_index = 0;
    let mut baf_index = 0;

    let mut regions = Vec::with_capacity(breakpoints.len() - 1);
    for bp_pair in breakpoints.windows(2) {
        let (start_bp, end_bp) = (&bp_pair[0], &bp_pair[1]);
        let segment = GenomeSegment::from_range(chrom_index, start_bp.pos, end_bp.pos);

        let mut obs = RegionObservations::default();
        while window_index < windows.len()
            && windows[window_index].midpoint(window_size) < segment.range.end
        {
            let window = &windows[window_index];
            if window.is_valid && window.midpoint(window_size) >= segment.range.start {
                obs.add_window(
                    window.tumor_ratio,
                    window.reference_ratio,
                    window.gc_content,
                );
            }
            window_index += 1;
        }
        while baf_index < baf_points.len() && baf_points[baf_index].pos < segment.range.end {
            let point = &baf_points[baf_index];
            if point.pos >= segment.range.start {
                obs.add_baf(point.baf);
            }
            baf_index += 1;
        }

        let germline_status = if obs.depth_window_count == 0 {
            GermlineStatus::Unknown
        } else if tumor_only {
            GermlineStatus::Diploid
        } else {
            GermlineStatus::from_ratio(obs.mean_reference_ratio(), expected_reference_ratio)
        };

        let (min_start, max_start) = get_start_uncertainty(start_bp, window_size, chrom_length);

        regions.push(ObservedRegion {
            segment,
            start_source: start_bp.source,
            end_source: end_bp.source,
            min_start,
            max_start,
            baf_count: obs.baf_count,
            mean_baf: obs.mean_baf(),
            depth_window_count: obs.depth_window_count,
            mean_tumor_ratio: obs.mean_tumor_ratio(),
            mean_reference_ratio: obs.mean_reference_ratio(),
            mean_gc: obs.mean_gc(),
            germline_status,
            is_autosome: chrom_info.is_autosome(),
            expected_reference_ratio,
        });
    }

    validate_chrom_regions(chrom_list, chrom_index, &regions, &breakpoints)?;
    Ok(regions)
}

/// Segment the genome into observed regions from all breakpoint sources
///
/// Breakpoints are combined from the allele frequency and depth ratio PCF streams, every breakend of the
/// given structural variants, and each chromosome's centromere and telomeres. Fails if any chromosome's
/// regions violate the ordering or coverage invariants.
///
pub fn create_observed_regions(
    tumor_only: bool,
    structural_variants: &[StructuralVariant],
    window_data: &SampleWindowData,
) -> SimpleResult<ObservedRegions> {
    let chrom_count = window_data.chrom_list.len();
    let mut chroms = Vec::with_capacity(chrom_count);
    for chrom_index in 0..chrom_count {
        let regions =
            get_chrom_observed_regions(chrom_index, tumor_only, structural_variants, window_data)?;
        debug!(
            "Segmented chromosome {} into {} regions",
            window_data.chrom_list.data[chrom_index].label,
            regions.len()
        );
        chroms.push(regions);
    }

    let observed_regions = ObservedRegions {
        window_size: window_data.depth_windows.window_size,
        chroms,
    };
    let low_confidence_count = observed_regions
        .iter()
        .filter(|x| x.is_low_confidence())
        .count();
    info!(
        "Segmented genome into {} observed regions ({} without allele frequency observations)",
        observed_regions.region_count().separate_with_commas(),
        low_confidence_count.separate_with_commas()
    );
    Ok(observed_regions)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::allele_frequency::{BafPoint, GenomeBafPoints};
    use crate::chrom_list::{ChromInfo, ChromList};
    use crate::depth_windows::{DepthWindow, GenomeDepthWindows};
    use crate::structural_variant::BreakendDirection;
    use crate::structural_variant::test_utils::get_test_sv;
    use crate::window_data::Gender;
    use approx::assert_ulps_eq;

    /// One 20kb chromosome with a centromere at 10kb and a ratio change at 4kb
    fn get_test_window_data() -> SampleWindowData {
        let chrom_list = ChromList::from_chrom_info(vec![ChromInfo::new(
            "chr1", 20_000, 9_500, 10_500,
        )]);
        let mut depth_windows = GenomeDepthWindows::new(1000, 1);
        let mut baf_points = GenomeBafPoints::new(1);
        for i in 0..20 {
            let start = i * 1000;
            let ratio = if start < 4000 { 0.5 } else { 1.0 };
            let reference_ratio = if i == 15 { 0.4 } else { 1.0 };
            depth_windows.chroms[0].push(DepthWindow::new(start, ratio, reference_ratio, 0.5));
            if start >= 2000 {
                baf_points.chroms[0].push(BafPoint::new(start + 100, 0.6, 50));
            }
        }
        // Mask one window
        depth_windows.chroms[0][7].is_valid = false;

        SampleWindowData {
            chrom_list,
            gender: Gender::Female,
            depth_windows,
            baf_points,
            baf_pcf: vec![vec![]],
            depth_ratio_pcf: vec![vec![4000, 15_000, 16_000]],
        }
    }

    #[test]
    fn test_create_observed_regions() {
        let window_data = get_test_window_data();
        let regions = create_observed_regions(false, &[], &window_data).unwrap();
        let regions = &regions.chroms[0];

        let ranges = regions
            .iter()
            .map(|x| (x.segment.range.start, x.segment.range.end))
            .collect::<Vec<_>>();
        assert_eq!(
            ranges,
            vec![
                (0, 4000),
                (4000, 10_000),
                (10_000, 15_000),
                (15_000, 16_000),
                (16_000, 20_000)
            ]
        );

        // Region ordering invariant
        for pair in regions.windows(2) {
            assert_eq!(pair[0].segment.range.end, pair[1].segment.range.start);
        }

        let r0 = &regions[0];
        assert_eq!(r0.start_source, BreakpointSource::Telomere);
        assert_eq!(r0.end_source, BreakpointSource::DepthRatioPcf);
        assert_eq!(r0.depth_window_count, 4);
        assert_ulps_eq!(r0.mean_tumor_ratio, 0.5);
        assert_eq!(r0.baf_count, 2);
        assert!(!r0.is_low_confidence());

        // One masked window
        let r1 = &regions[1];
        assert_eq!(r1.depth_window_count, 5);
        assert_eq!(r1.min_start, 3000);
        assert_eq!(r1.max_start, 5000);
        assert_eq!(r1.end_source, BreakpointSource::Centromere);

        let r2 = &regions[2];
        assert_eq!(r2.start_source, BreakpointSource::Centromere);
        assert_eq!(r2.min_start, 10_000);
        assert_eq!(r2.max_start, 10_000);

        let r3 = &regions[3];
        assert_eq!(r3.depth_window_count, 1);
        assert_eq!(r3.germline_status, GermlineStatus::HetDeletion);
        assert_eq!(regions[4].germline_status, GermlineStatus::Diploid);
    }

    #[test]
    fn test_tumor_only_germline_status() {
        let window_data = get_test_window_data();
        let regions = create_observed_regions(true, &[], &window_data).unwrap();
        assert!(
            regions
                .iter()
                .all(|x| x.germline_status == GermlineStatus::Diploid)
        );
    }

    #[test]
    fn test_low_confidence_region() {
        let mut window_data = get_test_window_data();
        window_data.depth_ratio_pcf = vec![vec![2000]];
        let regions = create_observed_regions(false, &[], &window_data).unwrap();
        let r0 = &regions.chroms[0][0];
        assert_eq!(r0.segment.range.end, 2000);
        assert!(r0.is_low_confidence());
        assert_eq!(r0.depth_window_count, 2);
    }

    #[test]
    fn test_sv_breakpoint_replaces_pcf() {
        let window_data = get_test_window_data();
        let svs = vec![get_test_sv(
            "sv1",
            0,
            4199,
            BreakendDirection::LeftAnchor,
            500.0,
            true,
        )];
        let regions = create_observed_regions(false, &svs, &window_data).unwrap();
        let r1 = &regions.chroms[0][1];
        assert_eq!(r1.segment.range.start, 4200);
        assert_eq!(r1.start_source, BreakpointSource::StructuralVariant);
        assert_eq!(r1.min_start, 4200);
        assert_eq!(r1.max_start, 4200);
        assert_eq!(regions.chroms[0][0].end_source, BreakpointSource::StructuralVariant);
    }

    #[test]
    fn test_validate_chrom_regions() {
        use super::test_utils::get_test_region;

        let window_data = get_test_window_data();
        let chrom_list = &window_data.chrom_list;
        let breakpoints = vec![
            Breakpoint::new(0, BreakpointSource::Telomere),
            Breakpoint::new(8000, BreakpointSource::DepthRatioPcf),
            Breakpoint::new(20_000, BreakpointSource::Telomere),
        ];

        let good = vec![
            get_test_region(0, 0, 8000, 8, 1.0, 0.5),
            get_test_region(0, 8000, 20_000, 12, 1.0, 0.5),
        ];
        assert!(validate_chrom_regions(chrom_list, 0, &good, &breakpoints).is_ok());

        let gap = vec![
            get_test_region(0, 0, 7000, 8, 1.0, 0.5),
            get_test_region(0, 8000, 20_000, 12, 1.0, 0.5),
        ];
        assert!(validate_chrom_regions(chrom_list, 0, &gap, &breakpoints).is_err());

        let overlap = vec![
            get_test_region(0, 0, 9000, 8, 1.0, 0.5),
            get_test_region(0, 8000, 20_000, 12, 1.0, 0.5),
        ];
        assert!(validate_chrom_regions(chrom_list, 0, &overlap, &breakpoints).is_err());

        let unsupported = vec![
            get_test_region(0, 0, 9000, 8, 1.0, 0.5),
            get_test_region(0, 9000, 20_000, 12, 1.0, 0.5),
        ];
        assert!(validate_chrom_regions(chrom_list, 0, &unsupported, &breakpoints).is_err());

        let short = vec![get_test_region(0, 0, 19_000, 8, 1.0, 0.5)];
        assert!(validate_chrom_regions(chrom_list, 0, &short, &breakpoints).is_err());
    }
}
