use camino::Utf8Path;
use hhmmss::Hhmmss;
use log::{error, info};
use simple_error::{SimpleResult, bail};
use thousands::Separable;

use crate::chrom_list::ChromRoleMatcher;
use crate::cli::{self, FitSettings, SharedSettings};
use crate::genome_regions::GenomeRegions;
use crate::input_readers::{
    read_baf_points, read_depth_windows, read_genome_table, read_pcf_breakpoints,
    read_somatic_variants, read_structural_variants,
};
use crate::output::{
    serialize_copy_number_segments, write_copy_number_bedgraph_file,
    write_copy_number_segments_file, write_germline_deletions_file, write_purity_file,
    write_purity_range_file,
};
use crate::pipeline::{SampleFitResult, SampleInput, fit_sample};
use crate::run_stats::{FitRunStats, FitStats, InputStats, write_fit_run_stats};
use crate::window_data::{SampleWindowData, determine_gender};

/// Read all input files into the in-memory sample representation
///
/// Non-passing variants from the structural variant file are moved to the recovery pool.
///
fn read_sample_input(settings: &FitSettings) -> SimpleResult<SampleInput> {
    let matcher = ChromRoleMatcher::new(
        &settings.autosome_regex,
        &settings.x_chrom_regex,
        &settings.y_chrom_regex,
    )?;
    let chrom_list = read_genome_table(&settings.genome_filename, &matcher)?;
    let depth_windows = read_depth_windows(
        &settings.depth_windows_filename,
        &chrom_list,
        settings.window_size,
    )?;
    let baf_points = read_baf_points(&settings.baf_filename, &chrom_list)?;
    let baf_pcf = read_pcf_breakpoints(&settings.baf_pcf_filename, &chrom_list, "allele frequency PCF")?;
    let depth_ratio_pcf = read_pcf_breakpoints(
        &settings.depth_ratio_pcf_filename,
        &chrom_list,
        "depth ratio PCF",
    )?;

    let gender = match settings.gender {
        Some(gender) => {
            info!("Using sample gender from command-line: {gender}");
            gender
        }
        None => determine_gender(&chrom_list, &depth_windows),
    };

    let mut structural_variants = Vec::new();
    let mut sv_recovery_pool = Vec::new();
    if let Some(filename) = &settings.sv_filename {
        let (pass, non_pass): (Vec<_>, Vec<_>) =
            read_structural_variants(filename, &chrom_list, "structural variants")?
                .into_iter()
                .partition(|x| x.is_pass());
        structural_variants = pass;
        sv_recovery_pool = non_pass;
    }
    if let Some(filename) = &settings.sv_recovery_pool_filename {
        sv_recovery_pool.extend(read_structural_variants(
            filename,
            &chrom_list,
            "structural variant recovery candidates",
        )?);
    }
    info!(
        "Using {} passing structural variants as breakpoints, with {} recovery candidates",
        structural_variants.len().separate_with_commas(),
        sv_recovery_pool.len().separate_with_commas()
    );

    let somatic_variants = match &settings.somatic_variants_filename {
        Some(filename) => Some(read_somatic_variants(filename, &chrom_list)?),
        None => None,
    };

    let germline_deletion_exclusions = match &settings.germline_deletion_exclusions_filename {
        Some(filename) => GenomeRegions::from_bed(filename, "germline deletion exclusion")?,
        None => GenomeRegions::new(),
    };

    Ok(SampleInput {
        window_data: SampleWindowData {
            chrom_list,
            gender,
            depth_windows,
            baf_points,
            baf_pcf,
            depth_ratio_pcf,
        },
        structural_variants,
        sv_recovery_pool,
        somatic_variants,
        germline_deletion_exclusions,
    })
}

/// Write every output artifact, continuing past failures
///
/// Returns an error if any artifact could not be written.
///
fn write_fit_output(
    output_dir: &Utf8Path,
    input: &SampleInput,
    result: &SampleFitResult,
    run_stats: &FitRunStats,
) -> SimpleResult<()> {
    let gender = run_stats.gender;
    let chrom_list = &input.window_data.chrom_list;
    let segments = &result.copy_number_segments;
    let results = [
        write_purity_range_file(output_dir, &result.best_fit),
        write_purity_file(output_dir, result, gender),
        write_copy_number_segments_file(output_dir, chrom_list, segments),
        write_copy_number_bedgraph_file(output_dir, chrom_list, segments),
        serialize_copy_number_segments(output_dir, segments),
        write_germline_deletions_file(output_dir, chrom_list, &result.germline_deletions),
        write_fit_run_stats(output_dir, run_stats),
    ];

    let mut failed_count = 0;
    for err in results.into_iter().filter_map(|x| x.err()) {
        error!("{err}");
        failed_count += 1;
    }
    if failed_count > 0 {
        bail!("Failed to write {failed_count} output files");
    }
    Ok(())
}

pub fn run_fit(shared_settings: &SharedSettings, settings: &FitSettings) -> SimpleResult<()> {
    cli::write_fit_settings(&settings.output_dir, settings)?;

    let input = read_sample_input(settings)?;

    let start = std::time::Instant::now();
    let result = fit_sample(settings, shared_settings.thread_count, &input)?;
    let fit_time = start.elapsed();
    info!("Finished fitting sample. Fit time: {}", fit_time.hhmmssxxx());

    let run_stats = FitRunStats {
        gender: input.window_data.gender,
        input_stats: InputStats::new(&input),
        fit_stats: FitStats::new(&result),
        total_fit_time_secs: fit_time.as_secs_f64(),
    };
    write_fit_output(&settings.output_dir, &input, &result, &run_stats)
}
