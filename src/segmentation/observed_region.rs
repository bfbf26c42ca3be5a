use serde::{Deserialize, Serialize};

use super::breakpoints::BreakpointSource;
use crate::genome_segment::GenomeSegment;

/// Germline copy number status of a region, from its reference depth ratio
///
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum::Display)]
pub enum GermlineStatus {
    HomDeletion,
    HetDeletion,
    Diploid,
    Amplification,
    Noise,
    Unknown,
}

impl GermlineStatus {
    /// Classify a reference depth ratio relative to the expected germline ratio of its chromosome
    ///
    pub fn from_ratio(mean_reference_ratio: f64, expected_reference_ratio: f64) -> Self {
        if expected_reference_ratio <= 0.0 {
            return Self::Unknown;
        }
        let relative = mean_reference_ratio / expected_reference_ratio;
        if relative < 0.1 {
            Self::HomDeletion
        } else if relative < 0.85 {
            Self::HetDeletion
        } else if relative <= 1.15 {
            Self::Diploid
        } else if relative <= 2.2 {
            Self::Amplification
        } else {
            Self::Noise
        }
    }

    pub fn is_deletion(&self) -> bool {
        matches!(self, Self::HomDeletion | Self::HetDeletion)
    }
}

/// Contiguous genome region between two consecutive breakpoints, with its aggregated observations
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ObservedRegion {
    pub segment: GenomeSegment,
    pub start_source: BreakpointSource,
    pub end_source: BreakpointSource,

    /// Range of plausible true start positions, given the resolution of the start breakpoint
    pub min_start: i64,
    pub max_start: i64,

    pub baf_count: usize,
    pub mean_baf: f64,

    /// Number of valid depth windows with a midpoint in the region
    pub depth_window_count: usize,
    pub mean_tumor_ratio: f64,
    pub mean_reference_ratio: f64,
    pub mean_gc: f64,

    pub germline_status: GermlineStatus,
    pub is_autosome: bool,

    /// Expected germline depth ratio of the chromosome, relative to a diploid autosome
    pub expected_reference_ratio: f64,
}

impl ObservedRegion {
    /// Regions without allele frequency observations are retained, with depth evidence only
    pub fn is_low_confidence(&self) -> bool {
        self.baf_count == 0
    }
}

/// Running totals used to build the observation means of one region
#[derive(Default)]
pub(super) struct RegionObservations {
    pub baf_count: usize,
    pub baf_total: f64,
    pub depth_window_count: usize,
    pub tumor_ratio_total: f64,
    pub reference_ratio_total: f64,
    pub gc_total: f64,
}

impl RegionObservations {
    pub fn add_baf(&mut self, baf: f64) {
        self.baf_count += 1;
        self.baf_total += baf;
    }

    pub fn add_window(&mut self, tumor_ratio: f64, reference_ratio: f64, gc: f64) {
        self.depth_window_count += 1;
        self.tumor_ratio_total += tumor_ratio;
        self.reference_ratio_total += reference_ratio;
        self.gc_total += gc;
    }

    fn mean(total: f64, count: usize) -> f64 {
        if count == 0 { 0.0 } else { total / count as f64 }
    }

    pub fn mean_baf(&self) -> f64 {
        Self::mean(self.baf_total, self.baf_count)
    }

    pub fn mean_tumor_ratio(&self) -> f64 {
        Self::mean(self.tumor_ratio_total, self.depth_window_count)
    }

    pub fn mean_reference_ratio(&self) -> f64 {
        Self::mean(self.reference_ratio_total, self.depth_window_count)
    }

    pub fn mean_gc(&self) -> f64 {
        Self::mean(self.gc_total, self.depth_window_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    #[test]
    fn test_germline_status() {
        assert_eq!(GermlineStatus::from_ratio(0.05, 1.0), GermlineStatus::HomDeletion);
        assert_eq!(GermlineStatus::from_ratio(0.5, 1.0), GermlineStatus::HetDeletion);
        assert_eq!(GermlineStatus::from_ratio(1.0, 1.0), GermlineStatus::Diploid);
        assert_eq!(GermlineStatus::from_ratio(1.15, 1.0), GermlineStatus::Diploid);
        assert_eq!(GermlineStatus::from_ratio(1.8, 1.0), GermlineStatus::Amplification);
        assert_eq!(GermlineStatus::from_ratio(3.0, 1.0), GermlineStatus::Noise);
        assert_eq!(GermlineStatus::from_ratio(0.5, 0.5), GermlineStatus::Diploid);
        assert_eq!(GermlineStatus::from_ratio(0.5, 0.0), GermlineStatus::Unknown);
    }

    #[test]
    fn test_region_observations() {
        let mut obs = RegionObservations::default();
        assert_ulps_eq!(obs.mean_tumor_ratio(), 0.0);

        obs.add_window(1.0, 1.0, 0.4);
        obs.add_window(2.0, 1.0, 0.6);
        obs.add_baf(0.6);
        assert_ulps_eq!(obs.mean_tumor_ratio(), 1.5);
        assert_ulps_eq!(obs.mean_gc(), 0.5);
        assert_ulps_eq!(obs.mean_baf(), 0.6);
    }
}
