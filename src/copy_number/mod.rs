//! Build consolidated copy number segments from fitted regions
//!

mod germline_deletions;
mod smoothing;
mod validate;

use std::collections::HashSet;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use simple_error::SimpleResult;
use thousands::Separable;

pub use self::germline_deletions::{GermlineDeletion, GermlineDeletionStatus};
use self::germline_deletions::get_germline_deletions;
use self::smoothing::{absorb_empty_segments, consolidate_segments};
use self::validate::validate_chrom_segments;
use crate::chrom_list::ChromList;
use crate::cli::CopyNumberSettings;
use crate::fitting::{FittedRegion, FittedRegions};
use crate::genome_regions::GenomeRegions;
use crate::genome_segment::GenomeSegment;
use crate::segmentation::{BreakpointSource, GermlineStatus};
use crate::structural_variant::StructuralVariant;

/// Segments with a copy number below this value are counted as deleted
const DELETED_COPY_NUMBER: f64 = 0.5;

/// Evidence supporting a copy number segment boundary
///
/// Variants are ordered from the weakest to the strongest support.
///
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize, strum::Display,
)]
pub enum SegmentSupport {
    None,
    Telomere,
    Centromere,
    StructuralVariant,
}

impl SegmentSupport {
    fn from_source(source: BreakpointSource) -> Self {
        match source {
            BreakpointSource::StructuralVariant => Self::StructuralVariant,
            BreakpointSource::Centromere => Self::Centromere,
            BreakpointSource::Telomere => Self::Telomere,
            BreakpointSource::AlleleFrequencyPcf | BreakpointSource::DepthRatioPcf => Self::None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CopyNumberSegment {
    pub segment: GenomeSegment,

    /// Depth window weighted mean tumor copy number
    pub copy_number: f64,

    /// BAF count weighted mean tumor BAF
    pub baf: f64,

    pub baf_count: usize,
    pub depth_window_count: usize,

    /// Depth windows from regions expected to be diploid in the germline
    pub diploid_window_count: usize,

    pub start_support: SegmentSupport,
    pub end_support: SegmentSupport,

    /// True if either boundary is supported by a structural variant
    pub sv_support: bool,

    pub min_start: i64,
    pub max_start: i64,
}

/// Copy number segments for the whole genome, indexed by chromosome index
///
#[derive(Clone, Deserialize, Serialize)]
pub struct CopyNumberSegments {
    pub chroms: Vec<Vec<CopyNumberSegment>>,
}

impl CopyNumberSegments {
    pub fn iter(&self) -> impl Iterator<Item = &CopyNumberSegment> {
        self.chroms.iter().flatten()
    }

    pub fn segment_count(&self) -> usize {
        self.chroms.iter().map(|x| x.len()).sum()
    }

    /// Fraction of germline diploid depth windows in segments with copy number below 0.5
    ///
    /// Windows where a low copy number is expected from the germline, such as chrY in a female sample
    /// or germline deletions, are excluded.
    ///
    pub fn deleted_window_fraction(&self) -> f64 {
        let (deleted, total) = self.iter().fold((0, 0), |(deleted, total), x| {
            let deleted = if x.copy_number < DELETED_COPY_NUMBER {
                deleted + x.diploid_window_count
            } else {
                deleted
            };
            (deleted, total + x.diploid_window_count)
        });
        if total == 0 {
            0.0
        } else {
            deleted as f64 / total as f64
        }
    }
}

fn get_boundary_support(
    source: BreakpointSource,
    pos: i64,
    sv_positions: &HashSet<i64>,
) -> SegmentSupport {
    if sv_positions.contains(&pos) {
        SegmentSupport::StructuralVariant
    } else {
        SegmentSupport::from_source(source)
    }
}

/// Convert each fitted region into a copy number segment
///
fn get_seed_segments(
    regions: &[FittedRegion],
    sv_positions: &HashSet<i64>,
) -> Vec<CopyNumberSegment> {
    regions
        .iter()
        .map(|region| {
            let observed = region.observed;
            let range = &observed.segment.range;
            let start_support =
                get_boundary_support(observed.start_source, range.start, sv_positions);
            let end_support = get_boundary_support(observed.end_source, range.end, sv_positions);
            let is_germline_diploid = observed.germline_status == GermlineStatus::Diploid
                && observed.expected_reference_ratio > 0.0;
            CopyNumberSegment {
                segment: observed.segment.clone(),
                copy_number: region.copy_number,
                baf: region.tumor_baf,
                baf_count: observed.baf_count,
                depth_window_count: observed.depth_window_count,
                diploid_window_count: if is_germline_diploid {
                    observed.depth_window_count
                } else {
                    0
                },
                start_support,
                end_support,
                sv_support: start_support == SegmentSupport::StructuralVariant
                    || end_support == SegmentSupport::StructuralVariant,
                min_start: observed.min_start,
                max_start: observed.max_start,
            }
        })
        .collect()
}

/// Build copy number segments for one chromosome
///
fn build_chrom_segments(
    settings: &CopyNumberSettings,
    chrom_index: usize,
    regions: &[FittedRegion],
    structural_variants: &[StructuralVariant],
) -> Vec<CopyNumberSegment> {
    let sv_positions = structural_variants
        .iter()
        .flat_map(|x| x.breakends())
        .filter(|x| x.chrom_index == chrom_index)
        .map(|x| x.region_start())
        .collect::<HashSet<_>>();

    let mut segments = get_seed_segments(regions, &sv_positions);
    if segments.iter().all(|x| x.depth_window_count == 0) {
        // Without depth observations the chromosome is assumed to match its expected germline state
        for (segment, region) in segments.iter_mut().zip(regions.iter()) {
            segment.copy_number = 2.0 * region.observed.expected_reference_ratio;
            segment.baf = 0.5;
        }
    } else {
        absorb_empty_segments(&mut segments);
    }

    consolidate_segments(settings, &mut segments);
    segments
}

/// Convert fitted regions into consolidated copy number segments, and find germline deletions
///
/// Fails if the resulting segments violate the coverage or boundary invariants on any chromosome.
///
pub fn build_copy_numbers(
    settings: &CopyNumberSettings,
    chrom_list: &ChromList,
    fitted_regions: &FittedRegions,
    structural_variants: &[StructuralVariant],
    germline_deletion_exclusions: &GenomeRegions,
) -> SimpleResult<(CopyNumberSegments, Vec<GermlineDeletion>)> {
    let mut chroms = Vec::with_capacity(fitted_regions.chroms.len());
    for (chrom_index, regions) in fitted_regions.chroms.iter().enumerate() {
        let segments = build_chrom_segments(settings, chrom_index, regions, structural_variants);
        validate_chrom_segments(chrom_list, chrom_index, &segments)?;
        debug!(
            "Built {} copy number segments from {} regions on chromosome {}",
            segments.len(),
            regions.len(),
            chrom_list.data[chrom_index].label
        );
        chroms.push(segments);
    }
    let copy_number_segments = CopyNumberSegments { chroms };

    let germline_deletions = get_germline_deletions(
        chrom_list,
        &fitted_regions.chroms,
        &copy_number_segments,
        germline_deletion_exclusions,
        settings.min_germline_deletion_length,
    );

    info!(
        "Built {} copy number segments, found {} germline deletions",
        copy_number_segments.segment_count().separate_with_commas(),
        germline_deletions.len().separate_with_commas()
    );
    Ok((copy_number_segments, germline_deletions))
}
