use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail, try_with};

use super::defaults::*;
use super::utils::{check_optional_filename, check_required_filename};
use crate::chrom_list::{
    ChromRoleMatcher, DEFAULT_AUTOSOME_REGEX, DEFAULT_X_CHROM_REGEX, DEFAULT_Y_CHROM_REGEX,
};
use crate::filenames::SETTINGS_FILENAME;
use crate::window_data::Gender;

/// Purity and ploidy candidate grid
#[derive(Args, Clone, Deserialize, Serialize)]
pub struct PuritySearchSettings {
    /// Minimum purity evaluated by the purity search
    #[arg(long, default_value_t = MIN_PURITY)]
    pub min_purity: f64,

    /// Maximum purity evaluated by the purity search
    #[arg(long, default_value_t = MAX_PURITY)]
    pub max_purity: f64,

    /// Step between consecutive purity values evaluated by the purity search
    #[arg(long, default_value_t = PURITY_INCREMENT)]
    pub purity_increment: f64,

    /// Minimum ploidy evaluated by the purity search
    #[arg(long, default_value_t = MIN_PLOIDY)]
    pub min_ploidy: f64,

    /// Maximum ploidy evaluated by the purity search
    #[arg(long, default_value_t = MAX_PLOIDY)]
    pub max_ploidy: f64,

    /// Step between consecutive ploidy values evaluated by the purity search
    #[arg(hide = true, long, default_value_t = PLOIDY_INCREMENT)]
    pub ploidy_increment: f64,

    /// Weight of the somatic variant penalty added to each candidate's region fit score
    #[arg(hide = true, long, default_value_t = SOMATIC_PENALTY_WEIGHT)]
    pub somatic_penalty_weight: f64,
}

impl Default for PuritySearchSettings {
    fn default() -> Self {
        Self {
            min_purity: MIN_PURITY,
            max_purity: MAX_PURITY,
            purity_increment: PURITY_INCREMENT,
            min_ploidy: MIN_PLOIDY,
            max_ploidy: MAX_PLOIDY,
            ploidy_increment: PLOIDY_INCREMENT,
            somatic_penalty_weight: SOMATIC_PENALTY_WEIGHT,
        }
    }
}

/// Region fit penalty model
#[derive(Args, Clone, Deserialize, Serialize)]
pub struct RegionFitSettings {
    /// Event penalty added per copy of divergence from a one or two copy allele state
    #[arg(long, default_value_t = PLOIDY_PENALTY_FACTOR)]
    pub ploidy_penalty_factor: f64,

    /// Allele deviation standard deviation at purity 1, scaled by the reciprocal of purity
    #[arg(long, default_value_t = PLOIDY_PENALTY_STANDARD_DEVIATION)]
    pub ploidy_penalty_standard_deviation: f64,

    /// Lower bound on the purity-scaled allele deviation standard deviation
    #[arg(long, default_value_t = PLOIDY_PENALTY_MIN_STANDARD_DEVIATION)]
    pub ploidy_penalty_min_standard_deviation: f64,

    /// Minimum deviation penalty of a single allele
    #[arg(hide = true, long, default_value_t = PLOIDY_PENALTY_BASELINE)]
    pub ploidy_penalty_baseline: f64,

    /// Additional deviation penalty per copy below zero for a negative allele copy number
    #[arg(hide = true, long, default_value_t = PLOIDY_PENALTY_SUB_MIN_ADDITIONAL)]
    pub ploidy_penalty_sub_min_additional: f64,

    /// Multiplier on the major allele deviation when the major allele is between zero and one copy
    #[arg(long, default_value_t = SUB_ONE_MAJOR_ALLELE_MULTIPLIER)]
    pub sub_one_major_allele_multiplier: f64,

    /// Sub-one major allele deviation multiplier used in targeted panel mode
    #[arg(long, default_value_t = TARGETED_SUB_ONE_MAJOR_ALLELE_MULTIPLIER)]
    pub targeted_sub_one_major_allele_multiplier: f64,

    /// Targeted panel mode deviation multiplier per unit of GC content distance from 0.5
    #[arg(hide = true, long, default_value_t = GC_RATIO_PENALTY_FACTOR)]
    pub gc_ratio_penalty_factor: f64,
}

impl Default for RegionFitSettings {
    fn default() -> Self {
        Self {
            ploidy_penalty_factor: PLOIDY_PENALTY_FACTOR,
            ploidy_penalty_standard_deviation: PLOIDY_PENALTY_STANDARD_DEVIATION,
            ploidy_penalty_min_standard_deviation: PLOIDY_PENALTY_MIN_STANDARD_DEVIATION,
            ploidy_penalty_baseline: PLOIDY_PENALTY_BASELINE,
            ploidy_penalty_sub_min_additional: PLOIDY_PENALTY_SUB_MIN_ADDITIONAL,
            sub_one_major_allele_multiplier: SUB_ONE_MAJOR_ALLELE_MULTIPLIER,
            targeted_sub_one_major_allele_multiplier: TARGETED_SUB_ONE_MAJOR_ALLELE_MULTIPLIER,
            gc_ratio_penalty_factor: GC_RATIO_PENALTY_FACTOR,
        }
    }
}

/// Best fit selection and somatic-assisted fit
#[derive(Args, Clone, Deserialize, Serialize)]
pub struct BestFitSettings {
    /// Minimum diploid proportion over near-best candidates for the genome to be treated as highly diploid
    #[arg(long, default_value_t = HIGHLY_DIPLOID_PERCENTAGE_THRESHOLD)]
    pub highly_diploid_percentage_threshold: f64,

    /// Candidates scoring within this fraction of the best score define the score range
    #[arg(hide = true, long, default_value_t = SCORE_RANGE_FRACTION)]
    pub score_range_fraction: f64,

    /// Minimum purity accepted from the somatic variant allele frequency peak
    #[arg(long, default_value_t = SOMATIC_MIN_PURITY)]
    pub somatic_min_purity: f64,

    /// Minimum purity range over near-best candidates required to attempt a somatic-assisted fit
    #[arg(long, default_value_t = SOMATIC_MIN_PURITY_SPREAD)]
    pub somatic_min_purity_spread: f64,

    /// Minimum number of somatic variants near the allele frequency peak
    #[arg(long, default_value_t = SOMATIC_MIN_PEAK_VARIANTS)]
    pub somatic_min_peak_variants: usize,

    /// Minimum number of usable somatic variants to consider as tumor evidence
    #[arg(long, default_value_t = SOMATIC_MIN_TOTAL_VARIANTS)]
    pub somatic_min_total_variants: usize,

    /// Minimum passing structural variant tumor fragment total to consider as tumor evidence
    #[arg(long, default_value_t = SOMATIC_MIN_SV_FRAGMENTS)]
    pub somatic_min_sv_fragments: u64,

    /// Gaussian kernel bandwidth used to find the somatic variant allele frequency peak
    #[arg(hide = true, long, default_value_t = SOMATIC_PEAK_BANDWIDTH)]
    pub somatic_peak_bandwidth: f64,

    /// Maximum fraction of depth windows with copy number below 0.5 for a somatic-assisted fit to be kept
    #[arg(long, default_value_t = MAX_SOMATIC_FIT_DELETED_PERCENT)]
    pub max_somatic_fit_deleted_percent: f64,
}

impl Default for BestFitSettings {
    fn default() -> Self {
        Self {
            highly_diploid_percentage_threshold: HIGHLY_DIPLOID_PERCENTAGE_THRESHOLD,
            score_range_fraction: SCORE_RANGE_FRACTION,
            somatic_min_purity: SOMATIC_MIN_PURITY,
            somatic_min_purity_spread: SOMATIC_MIN_PURITY_SPREAD,
            somatic_min_peak_variants: SOMATIC_MIN_PEAK_VARIANTS,
            somatic_min_total_variants: SOMATIC_MIN_TOTAL_VARIANTS,
            somatic_min_sv_fragments: SOMATIC_MIN_SV_FRAGMENTS,
            somatic_peak_bandwidth: SOMATIC_PEAK_BANDWIDTH,
            max_somatic_fit_deleted_percent: MAX_SOMATIC_FIT_DELETED_PERCENT,
        }
    }
}

/// Copy number segment consolidation
#[derive(Args, Clone, Deserialize, Serialize)]
pub struct CopyNumberSettings {
    /// Segments with fewer depth windows are smoothed into a neighbor across unsupported boundaries
    #[arg(long, default_value_t = MIN_DIPLOID_TUMOR_RATIO_COUNT)]
    pub min_diploid_tumor_ratio_count: usize,

    /// Smoothing depth window threshold used for segments adjacent to the centromere
    #[arg(long, default_value_t = MIN_DIPLOID_TUMOR_RATIO_COUNT_AT_CENTROMERE)]
    pub min_diploid_tumor_ratio_count_at_centromere: usize,

    /// Absolute copy number tolerance for merging adjacent segments
    #[arg(hide = true, long, default_value_t = COPY_NUMBER_ABS_TOLERANCE)]
    pub copy_number_abs_tolerance: f64,

    /// Copy number tolerance for merging adjacent segments, relative to the larger copy number
    #[arg(hide = true, long, default_value_t = COPY_NUMBER_REL_TOLERANCE)]
    pub copy_number_rel_tolerance: f64,

    /// Additional merge tolerance, divided by the square root of the smaller depth window count
    #[arg(hide = true, long, default_value_t = COPY_NUMBER_WINDOW_NOISE)]
    pub copy_number_window_noise: f64,

    /// Minimum length of a reported germline deletion
    #[arg(long, default_value_t = MIN_GERMLINE_DELETION_LENGTH)]
    pub min_germline_deletion_length: i64,
}

impl Default for CopyNumberSettings {
    fn default() -> Self {
        Self {
            min_diploid_tumor_ratio_count: MIN_DIPLOID_TUMOR_RATIO_COUNT,
            min_diploid_tumor_ratio_count_at_centromere:
                MIN_DIPLOID_TUMOR_RATIO_COUNT_AT_CENTROMERE,
            copy_number_abs_tolerance: COPY_NUMBER_ABS_TOLERANCE,
            copy_number_rel_tolerance: COPY_NUMBER_REL_TOLERANCE,
            copy_number_window_noise: COPY_NUMBER_WINDOW_NOISE,
            min_germline_deletion_length: MIN_GERMLINE_DELETION_LENGTH,
        }
    }
}

/// Structural variant recovery
#[derive(Args, Clone, Deserialize, Serialize)]
pub struct RecoverySettings {
    /// Minimum QUAL of a recovered structural variant with two breakends
    #[arg(long, default_value_t = RECOVERY_MIN_QUAL_SCORE_TWO_BREAKEND)]
    pub recovery_min_qual_score_two_breakend: f64,

    /// Minimum QUAL of a recovered single breakend
    #[arg(long, default_value_t = RECOVERY_MIN_QUAL_SCORE_SINGLE_BREAKEND)]
    pub recovery_min_qual_score_single_breakend: f64,

    /// Minimum copy number change across an unsupported boundary to attempt recovery
    #[arg(hide = true, long, default_value_t = RECOVERY_MIN_COPY_NUMBER_CHANGE)]
    pub recovery_min_copy_number_change: f64,

    /// Minimum copy number change to attempt recovery when both adjacent segments are long
    #[arg(hide = true, long, default_value_t = RECOVERY_MIN_LONG_SEGMENT_COPY_NUMBER_CHANGE)]
    pub recovery_min_long_segment_copy_number_change: f64,

    /// Depth window count at which a segment is treated as long for recovery
    #[arg(hide = true, long, default_value_t = RECOVERY_LONG_SEGMENT_WINDOW_COUNT)]
    pub recovery_long_segment_window_count: usize,

    /// Minimum junction copy number of a recovered variant, as a fraction of the copy number change
    #[arg(hide = true, long, default_value_t = RECOVERY_MIN_JUNCTION_FRACTION)]
    pub recovery_min_junction_fraction: f64,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            recovery_min_qual_score_two_breakend: RECOVERY_MIN_QUAL_SCORE_TWO_BREAKEND,
            recovery_min_qual_score_single_breakend: RECOVERY_MIN_QUAL_SCORE_SINGLE_BREAKEND,
            recovery_min_copy_number_change: RECOVERY_MIN_COPY_NUMBER_CHANGE,
            recovery_min_long_segment_copy_number_change:
                RECOVERY_MIN_LONG_SEGMENT_COPY_NUMBER_CHANGE,
            recovery_long_segment_window_count: RECOVERY_LONG_SEGMENT_WINDOW_COUNT,
            recovery_min_junction_fraction: RECOVERY_MIN_JUNCTION_FRACTION,
        }
    }
}

#[derive(Args, Deserialize, Serialize)]
pub struct FitSettings {
    /// Directory for all fit command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_output"))]
    pub output_dir: Utf8PathBuf,

    /// Genome table of chromosome lengths and centromere ranges
    #[arg(long = "genome", value_name = "FILE")]
    pub genome_filename: String,

    /// Tumor and reference depth ratio for each fixed-size depth window
    #[arg(long = "depth-windows", value_name = "FILE")]
    pub depth_windows_filename: String,

    /// B-allele frequency observations at heterozygous germline sites
    #[arg(long = "baf", value_name = "FILE")]
    pub baf_filename: String,

    /// Region start positions from the allele frequency piecewise-constant fit
    #[arg(long = "baf-pcf", value_name = "FILE")]
    pub baf_pcf_filename: String,

    /// Region start positions from the depth ratio piecewise-constant fit
    #[arg(long = "depth-ratio-pcf", value_name = "FILE")]
    pub depth_ratio_pcf_filename: String,

    /// Structural variants used as segmentation breakpoints
    ///
    /// Only passing variants are used as breakpoints. All other variants are added to the recovery pool.
    ///
    #[arg(long = "sv", value_name = "FILE")]
    pub sv_filename: Option<String>,

    /// Additional candidate structural variants which may be recovered at unsupported copy number changes
    #[arg(long = "sv-recovery-pool", value_name = "FILE")]
    pub sv_recovery_pool_filename: Option<String>,

    /// Somatic SNVs used for the somatic variant penalty and the somatic-assisted fit
    #[arg(long = "somatic-variants", value_name = "FILE")]
    pub somatic_variants_filename: Option<String>,

    /// Regions of the genome where germline deletions are not reported, in BED format
    #[arg(long = "germline-deletion-exclusions", value_name = "FILE")]
    pub germline_deletion_exclusions_filename: Option<String>,

    /// Sample gender, determined from the X chromosome reference depth ratio if not specified
    #[arg(long, value_enum)]
    pub gender: Option<Gender>,

    /// Run without a matched normal sample
    ///
    /// All regions with depth windows are treated as germline diploid and the somatic variant penalty
    /// is disabled.
    ///
    #[arg(long)]
    pub tumor_only: bool,

    /// Use the targeted panel penalty model
    #[arg(long)]
    pub targeted_panel: bool,

    /// Size of the depth windows in the depth window input
    #[arg(hide = true, long, default_value_t = DEPTH_WINDOW_SIZE)]
    pub window_size: i64,

    /// Regex used to identify autosomes, only autosomes contribute to the fit score
    #[arg(hide = true, long, default_value = DEFAULT_AUTOSOME_REGEX)]
    pub autosome_regex: String,

    /// Regex used to identify the X chromosome
    #[arg(hide = true, long, default_value = DEFAULT_X_CHROM_REGEX)]
    pub x_chrom_regex: String,

    /// Regex used to identify the Y chromosome
    #[arg(hide = true, long, default_value = DEFAULT_Y_CHROM_REGEX)]
    pub y_chrom_regex: String,

    #[command(flatten)]
    pub search: PuritySearchSettings,

    #[command(flatten)]
    pub region_fit: RegionFitSettings,

    #[command(flatten)]
    pub best_fit: BestFitSettings,

    #[command(flatten)]
    pub copy_number: CopyNumberSettings,

    #[command(flatten)]
    pub recovery: RecoverySettings,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            output_dir: Utf8PathBuf::from(concatcp!(env!("CARGO_PKG_NAME"), "_output")),
            genome_filename: String::new(),
            depth_windows_filename: String::new(),
            baf_filename: String::new(),
            baf_pcf_filename: String::new(),
            depth_ratio_pcf_filename: String::new(),
            sv_filename: None,
            sv_recovery_pool_filename: None,
            somatic_variants_filename: None,
            germline_deletion_exclusions_filename: None,
            gender: None,
            tumor_only: false,
            targeted_panel: false,
            window_size: DEPTH_WINDOW_SIZE,
            autosome_regex: DEFAULT_AUTOSOME_REGEX.to_string(),
            x_chrom_regex: DEFAULT_X_CHROM_REGEX.to_string(),
            y_chrom_regex: DEFAULT_Y_CHROM_REGEX.to_string(),
            search: PuritySearchSettings::default(),
            region_fit: RegionFitSettings::default(),
            best_fit: BestFitSettings::default(),
            copy_number: CopyNumberSettings::default(),
            recovery: RecoverySettings::default(),
        }
    }
}

fn check_fraction(value: f64, label: &str) -> SimpleResult<()> {
    if !(0.0..=1.0).contains(&value) {
        bail!("--{label} argument must be in [0,1]");
    }
    Ok(())
}

fn check_positive(value: f64, label: &str) -> SimpleResult<()> {
    if value.is_nan() || value <= 0.0 {
        bail!("--{label} argument must be greater than 0");
    }
    Ok(())
}

/// Check option values independent of the input data
///
fn validate_fit_setting_values(settings: &FitSettings) -> SimpleResult<()> {
    let search = &settings.search;
    check_positive(search.min_purity, "min-purity")?;
    check_fraction(search.max_purity, "max-purity")?;
    if search.min_purity > search.max_purity {
        bail!("--min-purity argument must not exceed --max-purity");
    }
    check_positive(search.purity_increment, "purity-increment")?;
    check_positive(search.min_ploidy, "min-ploidy")?;
    if search.min_ploidy > search.max_ploidy {
        bail!("--min-ploidy argument must not exceed --max-ploidy");
    }
    check_positive(search.ploidy_increment, "ploidy-increment")?;

    let region_fit = &settings.region_fit;
    check_positive(
        region_fit.ploidy_penalty_standard_deviation,
        "ploidy-penalty-standard-deviation",
    )?;
    check_positive(
        region_fit.ploidy_penalty_min_standard_deviation,
        "ploidy-penalty-min-standard-deviation",
    )?;

    let best_fit = &settings.best_fit;
    check_fraction(
        best_fit.highly_diploid_percentage_threshold,
        "highly-diploid-percentage-threshold",
    )?;
    check_fraction(
        best_fit.max_somatic_fit_deleted_percent,
        "max-somatic-fit-deleted-percent",
    )?;
    check_positive(best_fit.somatic_peak_bandwidth, "somatic-peak-bandwidth")?;

    if settings.window_size <= 0 {
        bail!("--window-size argument must be greater than 0");
    }

    ChromRoleMatcher::new(
        &settings.autosome_regex,
        &settings.x_chrom_regex,
        &settings.y_chrom_regex,
    )?;

    Ok(())
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_fit_settings(settings: FitSettings) -> SimpleResult<FitSettings> {
    check_required_filename(&settings.genome_filename, "genome table")?;
    check_required_filename(&settings.depth_windows_filename, "depth window")?;
    check_required_filename(&settings.baf_filename, "allele frequency")?;
    check_required_filename(&settings.baf_pcf_filename, "allele frequency PCF")?;
    check_required_filename(&settings.depth_ratio_pcf_filename, "depth ratio PCF")?;
    check_optional_filename(settings.sv_filename.as_deref(), "structural variant")?;
    check_optional_filename(
        settings.sv_recovery_pool_filename.as_deref(),
        "structural variant recovery pool",
    )?;
    check_optional_filename(
        settings.somatic_variants_filename.as_deref(),
        "somatic variant",
    )?;
    check_optional_filename(
        settings.germline_deletion_exclusions_filename.as_deref(),
        "germline deletion exclusion",
    )?;

    validate_fit_setting_values(&settings)?;

    Ok(settings)
}

/// Write fit settings out in json format
pub fn write_fit_settings(output_dir: &Utf8Path, settings: &FitSettings) -> SimpleResult<()> {
    use log::info;

    let filename = output_dir.join(SETTINGS_FILENAME);

    info!("Writing fit settings to file: '{filename}'");

    let f = try_with!(
        std::fs::File::create(&filename),
        "Unable to create fit settings json file: '{filename}'"
    );

    try_with!(
        serde_json::to_writer_pretty(&f, &settings),
        "Unable to write fit settings json file: '{filename}'"
    );
    Ok(())
}
