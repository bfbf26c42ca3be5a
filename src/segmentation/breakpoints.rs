use serde::{Deserialize, Serialize};

use crate::chrom_list::ChromInfo;
use crate::depth_windows::get_window_index;
use crate::structural_variant::StructuralVariant;

/// Evidence source for a segmentation breakpoint
///
/// Sources are declared in increasing priority order, so that the derived ordering can be used
/// to resolve several breakpoints falling in the same depth window.
///
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, strum::Display,
)]
pub enum BreakpointSource {
    AlleleFrequencyPcf,
    DepthRatioPcf,
    Telomere,
    Centromere,
    StructuralVariant,
}

impl BreakpointSource {
    pub fn is_pcf(&self) -> bool {
        matches!(self, Self::AlleleFrequencyPcf | Self::DepthRatioPcf)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Breakpoint {
    /// Zero-indexed start of the region following this breakpoint
    pub pos: i64,
    pub source: BreakpointSource,
}

impl Breakpoint {
    pub fn new(pos: i64, source: BreakpointSource) -> Self {
        Self { pos, source }
    }
}

/// Reduce sorted interior breakpoints to one breakpoint per depth window
///
/// Within each window the highest priority source is kept, with ties going to the leftmost breakpoint.
///
fn dedup_breakpoints_by_window(breakpoints: Vec<Breakpoint>, window_size: i64) -> Vec<Breakpoint> {
    let mut deduped: Vec<Breakpoint> = Vec::new();
    for bp in breakpoints {
        if let Some(last) = deduped.last_mut()
            && get_window_index(last.pos, window_size) == get_window_index(bp.pos, window_size)
        {
            if bp.source > last.source {
                *last = bp;
            }
            continue;
        }
        deduped.push(bp);
    }
    deduped
}

/// Get the sorted, de-duplicated breakpoints for one chromosome
///
/// The chromosome start and end telomere breakpoints are always the first and last entries. Interior
/// breakpoints within one window of either telomere are absorbed by the telomere.
///
/// # Arguments
/// * `baf_pcf` - Zero-indexed allele frequency PCF region starts for this chromosome
/// * `depth_ratio_pcf` - Zero-indexed depth ratio PCF region starts for this chromosome
///
pub fn get_chrom_breakpoints(
    chrom_index: usize,
    chrom_info: &ChromInfo,
    window_size: i64,
    structural_variants: &[StructuralVariant],
    baf_pcf: &[i64],
    depth_ratio_pcf: &[i64],
) -> Vec<Breakpoint> {
    let chrom_length = chrom_info.length as i64;

    let mut interior = Vec::new();
    interior.extend(
        baf_pcf
            .iter()
            .map(|&x| Breakpoint::new(x, BreakpointSource::AlleleFrequencyPcf)),
    );
    interior.extend(
        depth_ratio_pcf
            .iter()
            .map(|&x| Breakpoint::new(x, BreakpointSource::DepthRatioPcf)),
    );
    interior.extend(
        structural_variants
            .iter()
            .flat_map(|x| x.breakends())
            .filter(|x| x.chrom_index == chrom_index)
            .map(|x| Breakpoint::new(x.region_start(), BreakpointSource::StructuralVariant)),
    );
    if let Some(pos) = chrom_info.centromere_breakpoint() {
        interior.push(Breakpoint::new(pos, BreakpointSource::Centromere));
    }

    interior.retain(|x| x.pos >= window_size && x.pos <= chrom_length - window_size);
    interior.sort_by(|a, b| a.pos.cmp(&b.pos).then(b.source.cmp(&a.source)));
    let interior = dedup_breakpoints_by_window(interior, window_size);

    let mut breakpoints = Vec::with_capacity(interior.len() + 2);
    breakpoints.push(Breakpoint::new(0, BreakpointSource::Telomere));
    breakpoints.extend(interior);
    breakpoints.push(Breakpoint::new(chrom_length, BreakpointSource::Telomere));
    breakpoints
}
