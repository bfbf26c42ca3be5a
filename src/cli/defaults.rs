pub const DEPTH_WINDOW_SIZE: i64 = 1000;

pub const DEFAULT_THREAD_COUNT: usize = 2;

// Purity search grid
pub const MIN_PURITY: f64 = 0.08;
pub const MAX_PURITY: f64 = 1.0;
pub const PURITY_INCREMENT: f64 = 0.01;
pub const MIN_PLOIDY: f64 = 1.0;
pub const MAX_PLOIDY: f64 = 8.0;
pub const PLOIDY_INCREMENT: f64 = 0.02;
pub const SOMATIC_PENALTY_WEIGHT: f64 = 1.0;

// Region fit penalties
pub const PLOIDY_PENALTY_FACTOR: f64 = 0.4;
pub const PLOIDY_PENALTY_STANDARD_DEVIATION: f64 = 0.05;
pub const PLOIDY_PENALTY_MIN_STANDARD_DEVIATION: f64 = 0.1;
pub const PLOIDY_PENALTY_BASELINE: f64 = 0.001;
pub const PLOIDY_PENALTY_SUB_MIN_ADDITIONAL: f64 = 1.5;
pub const SUB_ONE_MAJOR_ALLELE_MULTIPLIER: f64 = 3.0;
pub const TARGETED_SUB_ONE_MAJOR_ALLELE_MULTIPLIER: f64 = 1.5;
pub const GC_RATIO_PENALTY_FACTOR: f64 = 2.0;

// Best fit selection
pub const HIGHLY_DIPLOID_PERCENTAGE_THRESHOLD: f64 = 0.97;
pub const SCORE_RANGE_FRACTION: f64 = 0.1;
pub const SOMATIC_MIN_PURITY: f64 = 0.17;
pub const SOMATIC_MIN_PURITY_SPREAD: f64 = 0.15;
pub const SOMATIC_MIN_PEAK_VARIANTS: usize = 10;
pub const SOMATIC_MIN_TOTAL_VARIANTS: usize = 10;
pub const SOMATIC_MIN_SV_FRAGMENTS: u64 = 1000;
pub const SOMATIC_PEAK_BANDWIDTH: f64 = 0.03;
pub const MAX_SOMATIC_FIT_DELETED_PERCENT: f64 = 0.003;

// Copy number consolidation
pub const MIN_DIPLOID_TUMOR_RATIO_COUNT: usize = 30;
pub const MIN_DIPLOID_TUMOR_RATIO_COUNT_AT_CENTROMERE: usize = 150;
pub const COPY_NUMBER_ABS_TOLERANCE: f64 = 0.3;
pub const COPY_NUMBER_REL_TOLERANCE: f64 = 0.12;
pub const COPY_NUMBER_WINDOW_NOISE: f64 = 1.0;
pub const MIN_GERMLINE_DELETION_LENGTH: i64 = 1000;

// Structural variant recovery
pub const RECOVERY_MIN_QUAL_SCORE_TWO_BREAKEND: f64 = 350.0;
pub const RECOVERY_MIN_QUAL_SCORE_SINGLE_BREAKEND: f64 = 1000.0;
pub const RECOVERY_MIN_COPY_NUMBER_CHANGE: f64 = 0.6;
pub const RECOVERY_MIN_LONG_SEGMENT_COPY_NUMBER_CHANGE: f64 = 0.2;
pub const RECOVERY_LONG_SEGMENT_WINDOW_COUNT: usize = 1000;
pub const RECOVERY_MIN_JUNCTION_FRACTION: f64 = 0.5;
