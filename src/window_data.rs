use log::info;
use serde::{Deserialize, Serialize};

use crate::allele_frequency::GenomeBafPoints;
use crate::chrom_list::{ChromList, ChromRole};
use crate::depth_windows::GenomeDepthWindows;

/// Median X chromosome reference depth ratio below which the sample is treated as male
const MALE_X_REFERENCE_RATIO_THRESHOLD: f64 = 0.75;

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, clap::ValueEnum, strum::Display,
)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    /// Expected germline depth ratio for a chromosome of the given role, relative to a diploid autosome
    ///
    pub fn expected_reference_ratio(&self, role: ChromRole) -> f64 {
        match (role, self) {
            (ChromRole::X, Gender::Male) => 0.5,
            (ChromRole::Y, Gender::Male) => 0.5,
            (ChromRole::Y, Gender::Female) => 0.0,
            _ => 1.0,
        }
    }
}

/// All windowed sample observations required for segmentation and fitting
///
pub struct SampleWindowData {
    pub chrom_list: ChromList,
    pub gender: Gender,
    pub depth_windows: GenomeDepthWindows,
    pub baf_points: GenomeBafPoints,

    /// Zero-indexed region start positions from the allele frequency piecewise-constant fit, per chromosome
    pub baf_pcf: Vec<Vec<i64>>,

    /// Zero-indexed region start positions from the depth ratio piecewise-constant fit, per chromosome
    pub depth_ratio_pcf: Vec<Vec<i64>>,
}

impl SampleWindowData {
    pub fn expected_reference_ratio(&self, chrom_index: usize) -> f64 {
        self.gender
            .expected_reference_ratio(self.chrom_list.data[chrom_index].role)
    }
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Determine sample gender from the median reference depth ratio of valid X chromosome windows
///
/// Defaults to female if no X chromosome windows are found.
///
pub fn determine_gender(chrom_list: &ChromList, depth_windows: &GenomeDepthWindows) -> Gender {
    let x_ratios = chrom_list
        .data
        .iter()
        .zip(depth_windows.chroms.iter())
        .filter(|(chrom_info, _)| chrom_info.role == ChromRole::X)
        .flat_map(|(_, windows)| windows.iter())
        .filter(|x| x.is_valid)
        .map(|x| x.reference_ratio)
        .collect::<Vec<_>>();

    match median(x_ratios) {
        Some(x_median) => {
            let gender = if x_median < MALE_X_REFERENCE_RATIO_THRESHOLD {
                Gender::Male
            } else {
                Gender::Female
            };
            info!("Median X chromosome reference depth ratio {x_median:.3}, sample gender: {gender}");
            gender
        }
        None => {
            info!("No X chromosome depth windows found, assuming sample gender: Female");
            Gender::Female
        }
    }
}
