//! Names of all files written to the output directory
//!

pub const SETTINGS_FILENAME: &str = "fit.settings.json";
pub const RUN_STATS_FILENAME: &str = "run.stats.json";
pub const PURITY_RANGE_FILENAME: &str = "purity.range.tsv";
pub const PURITY_FILENAME: &str = "purity.tsv";
pub const COPY_NUMBER_SEGMENTS_FILENAME: &str = "cnv.segments.tsv";
pub const COPY_NUMBER_SEGMENTS_BEDGRAPH_FILENAME: &str = "cnv.segments.bedgraph";
pub const COPY_NUMBER_SEGMENTS_MESSAGEPACK_FILENAME: &str = "cnv.segments.mpack";
pub const GERMLINE_DELETIONS_FILENAME: &str = "germline.deletions.tsv";
