use log::debug;
use statrs::distribution::{Continuous, Normal};

use crate::cli::BestFitSettings;
use crate::segmentation::{GermlineStatus, ObservedRegions};
use crate::somatic_variant::GenomeSomaticVariants;

/// Allele frequency resolution of the kernel density peak search
const PEAK_SEARCH_STEP: f64 = 0.001;

/// Allele frequencies of all usable somatic variants in germline diploid regions
///
pub fn get_diploid_somatic_allele_frequencies(
    somatic_variants: &GenomeSomaticVariants,
    observed_regions: &ObservedRegions,
) -> Vec<f64> {
    let mut allele_frequencies = Vec::new();
    for (chrom_index, variants) in somatic_variants.chroms.iter().enumerate() {
        let Some(regions) = observed_regions.chroms.get(chrom_index) else {
            continue;
        };
        for variant in variants.iter().filter(|x| x.is_usable()) {
            let index = regions.partition_point(|x| x.segment.range.end <= variant.pos);
            let is_diploid = regions.get(index).is_some_and(|x| {
                x.segment.range.intersect_pos(variant.pos)
                    && x.germline_status == GermlineStatus::Diploid
            });
            if is_diploid {
                allele_frequencies.push(variant.allele_frequency);
            }
        }
    }
    allele_frequencies
}

/// Allele frequency of the highest Gaussian kernel density over `allele_frequencies`
///
/// Returns None if there are no allele frequencies or the bandwidth is invalid.
///
pub fn get_allele_frequency_peak(allele_frequencies: &[f64], bandwidth: f64) -> Option<f64> {
    if allele_frequencies.is_empty() {
        return None;
    }
    let kernel = Normal::new(0.0, bandwidth).ok()?;

    let step_count = (1.0 / PEAK_SEARCH_STEP).round() as usize;
    let mut peak: Option<(f64, f64)> = None;
    for i in 1..step_count {
        let allele_frequency = i as f64 * PEAK_SEARCH_STEP;
        let density = allele_frequencies
            .iter()
            .map(|x| kernel.pdf(allele_frequency - x))
            .sum::<f64>();
        if peak.is_none_or(|(_, peak_density)| density > peak_density) {
            peak = Some((allele_frequency, density));
        }
    }
    peak.map(|(allele_frequency, _)| allele_frequency)
}

/// Tumor purity implied by the clonal peak of somatic variant allele frequencies
///
/// Clonal heterozygous variants in diploid regions are expected at half the purity. Returns None
/// if too few variants support the peak, or the implied purity is below the configured minimum.
///
pub fn get_somatic_purity(settings: &BestFitSettings, allele_frequencies: &[f64]) -> Option<f64> {
    let bandwidth = settings.somatic_peak_bandwidth;
    let peak = get_allele_frequency_peak(allele_frequencies, bandwidth)?;
    let peak_variant_count = allele_frequencies
        .iter()
        .filter(|&&x| (x - peak).abs() <= bandwidth)
        .count();
    let purity = f64::min(2.0 * peak, 1.0);
    debug!(
        "Somatic allele frequency peak: {peak:.3} supported by {peak_variant_count} variants, implied purity {purity:.3}"
    );

    if peak_variant_count < settings.somatic_min_peak_variants {
        return None;
    }
    if purity < settings.somatic_min_purity {
        return None;
    }
    Some(purity)
}
