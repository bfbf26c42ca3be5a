//! Track stats for the whole purfit run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, try_with};

use crate::filenames::RUN_STATS_FILENAME;
use crate::pipeline::{SampleFitResult, SampleInput};
use crate::window_data::Gender;

#[derive(Default, Deserialize, Serialize)]
pub struct InputStats {
    pub chrom_count: usize,
    pub valid_depth_window_count: usize,
    pub baf_point_count: usize,
    pub structural_variant_count: usize,
    pub sv_recovery_pool_count: usize,
    pub usable_somatic_variant_count: usize,
}

impl InputStats {
    pub fn new(input: &SampleInput) -> Self {
        let window_data = &input.window_data;
        Self {
            chrom_count: window_data.chrom_list.len(),
            valid_depth_window_count: window_data.depth_windows.valid_window_count(),
            baf_point_count: window_data.baf_points.chroms.iter().map(|x| x.len()).sum(),
            structural_variant_count: input.structural_variants.len(),
            sv_recovery_pool_count: input.sv_recovery_pool.len(),
            usable_somatic_variant_count: input
                .somatic_variants
                .as_ref()
                .map_or(0, |x| x.usable_count()),
        }
    }
}

#[derive(Default, Deserialize, Serialize)]
pub struct FitStats {
    pub candidate_count: usize,
    pub observed_region_count: usize,
    pub copy_number_segment_count: usize,
    pub germline_deletion_count: usize,
    pub recovered_structural_variant_count: usize,
    pub segmentation_passes: usize,
    pub is_somatic_fit_reverted: bool,
    pub deleted_window_fraction: f64,
}

impl FitStats {
    pub fn new(result: &SampleFitResult) -> Self {
        Self {
            candidate_count: result.best_fit.ranked_candidates.len(),
            observed_region_count: result.observed_regions.region_count(),
            copy_number_segment_count: result.copy_number_segments.segment_count(),
            germline_deletion_count: result.germline_deletions.len(),
            recovered_structural_variant_count: result.recovered_structural_variants.len(),
            segmentation_passes: result.segmentation_passes,
            is_somatic_fit_reverted: result.is_somatic_fit_reverted,
            deleted_window_fraction: result.copy_number_segments.deleted_window_fraction(),
        }
    }
}

#[derive(Deserialize, Serialize)]
pub struct FitRunStats {
    pub gender: Gender,
    pub input_stats: InputStats,
    pub fit_stats: FitStats,
    pub total_fit_time_secs: f64,
}

/// Write run_stats structure out in json format
pub fn write_fit_run_stats(output_dir: &Utf8Path, run_stats: &FitRunStats) -> SimpleResult<()> {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = try_with!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    try_with!(
        serde_json::to_writer_pretty(&f, &run_stats),
        "Unable to write run statistics json file: '{filename}'"
    );
    Ok(())
}
