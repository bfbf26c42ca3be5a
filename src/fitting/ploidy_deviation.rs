use statrs::distribution::{ContinuousCDF, Normal};

use crate::cli::RegionFitSettings;

/// Penalty model for the distance of fitted allele copy numbers from integer states
///
#[derive(Clone)]
pub struct PloidyDeviation {
    standard_deviation: f64,
    min_standard_deviation: f64,
    baseline: f64,
    sub_min_additional: f64,
    sub_one_major_allele_multiplier: f64,
    standard_normal: Normal,
}

impl PloidyDeviation {
    pub fn new(settings: &RegionFitSettings, sub_one_major_allele_multiplier: f64) -> Self {
        Self {
            standard_deviation: settings.ploidy_penalty_standard_deviation,
            min_standard_deviation: settings.ploidy_penalty_min_standard_deviation,
            baseline: settings.ploidy_penalty_baseline,
            sub_min_additional: settings.ploidy_penalty_sub_min_additional,
            sub_one_major_allele_multiplier,
            standard_normal: Normal::standard(),
        }
    }

    /// Deviation penalty of one allele copy number from the nearest integer state
    ///
    pub fn allele_deviation(&self, purity: f64, allele_copy_number: f64) -> f64 {
        if allele_copy_number < 0.0 {
            return 1.0 + self.sub_min_additional * allele_copy_number.abs();
        }
        let distance = (allele_copy_number - allele_copy_number.round()).abs();
        let sd = f64::max(
            self.min_standard_deviation,
            self.standard_deviation / purity,
        );
        let deviation = 2.0 * self.standard_normal.cdf(distance / sd) - 1.0;
        deviation.max(self.baseline)
    }

    /// Combined deviation penalty of the major and minor allele copy numbers
    ///
    pub fn deviation(&self, purity: f64, major_allele: f64, minor_allele: f64) -> f64 {
        let mut major_deviation = self.allele_deviation(purity, major_allele);
        if major_allele > 0.0 && major_allele < 1.0 {
            major_deviation *= self.sub_one_major_allele_multiplier;
        }
        major_deviation + self.allele_deviation(purity, minor_allele)
    }
}

/// Penalty for allele states requiring more copy number events from a normal diploid or haploid state
///
pub fn get_event_penalty(ploidy_penalty_factor: f64, major_allele: f64, minor_allele: f64) -> f64 {
    let from_haploid_events = (major_allele - 1.0).abs() + (minor_allele - 1.0).abs();
    let from_doubled_events = 1.0 + (major_allele - 2.0).abs() + (minor_allele - 2.0).abs();
    1.0 + ploidy_penalty_factor * f64::min(from_haploid_events, from_doubled_events)
}
