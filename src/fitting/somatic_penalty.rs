use super::purity_adjuster::PurityAdjuster;
use super::region_fitter::{FittedRegion, FittedRegions};
use crate::somatic_variant::GenomeSomaticVariants;

/// Find the fitted region containing `pos`, given regions sorted by position
///
fn find_region<'a, 'b>(regions: &'b [FittedRegion<'a>], pos: i64) -> Option<&'b FittedRegion<'a>> {
    let index = regions.partition_point(|x| x.observed.segment.range.end <= pos);
    regions
        .get(index)
        .filter(|x| x.observed.segment.range.intersect_pos(pos))
}

/// Mean excess of the somatic variant copy number over the fitted major allele copy number
///
/// Variants with a copy number above the major allele imply a purity too low for the observed
/// allele frequencies. Only usable variants in scored regions are considered. Returns None if no
/// such variant exists.
///
pub fn get_somatic_penalty(
    adjuster: &PurityAdjuster,
    fitted_regions: &FittedRegions,
    somatic_variants: &GenomeSomaticVariants,
) -> Option<f64> {
    let mut variant_count = 0usize;
    let mut total_penalty = 0.0;
    for (chrom_index, variants) in somatic_variants.chroms.iter().enumerate() {
        let Some(regions) = fitted_regions.chroms.get(chrom_index) else {
            continue;
        };
        for variant in variants.iter().filter(|x| x.is_usable()) {
            let Some(region) = find_region(regions, variant.pos) else {
                continue;
            };
            if !region.is_fittable {
                continue;
            }
            let variant_copy_number = adjuster.variant_copy_number(
                variant.allele_frequency,
                region.copy_number,
                region.observed.mean_reference_ratio,
            );
            total_penalty += f64::max(
                0.0,
                variant_copy_number - region.major_allele_copy_number,
            );
            variant_count += 1;
        }
    }

    if variant_count == 0 {
        None
    } else {
        Some(total_penalty / variant_count as f64)
    }
}
