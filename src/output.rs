//! Write fit results to the output directory
//!
//! All tabular outputs use one-indexed, fully-closed coordinates.
//!

use std::fs::File;
use std::io::{BufWriter, Write};

use camino::Utf8Path;
use itertools::Itertools;
use log::info;
use serde::Serialize;
use simple_error::{SimpleResult, try_with};

use crate::best_fit::BestFit;
use crate::chrom_list::ChromList;
use crate::copy_number::{CopyNumberSegments, GermlineDeletion};
use crate::filenames::{
    COPY_NUMBER_SEGMENTS_BEDGRAPH_FILENAME, COPY_NUMBER_SEGMENTS_FILENAME,
    COPY_NUMBER_SEGMENTS_MESSAGEPACK_FILENAME, GERMLINE_DELETIONS_FILENAME, PURITY_FILENAME,
    PURITY_RANGE_FILENAME,
};
use crate::pipeline::SampleFitResult;
use crate::window_data::Gender;

fn create_output_file(filename: &Utf8Path, label: &str) -> SimpleResult<BufWriter<File>> {
    info!("Writing {label} to file: '{filename}'");
    let f = try_with!(
        File::create(filename),
        "Unable to create {label} file: '{filename}'"
    );
    Ok(BufWriter::new(f))
}

fn write_ranked_candidates<W: Write>(f: &mut W, best_fit: &BestFit) -> std::io::Result<()> {
    writeln!(
        f,
        "rank\tpurity\tnorm_factor\tploidy\tscore\tsomatic_penalty\tdiploid_proportion"
    )?;
    for (rank, candidate) in best_fit.ranked_candidates.iter().enumerate() {
        writeln!(
            f,
            "{}\t{:.4}\t{:.4}\t{:.4}\t{:.6}\t{:.6}\t{:.4}",
            rank + 1,
            candidate.purity,
            candidate.norm_factor,
            candidate.ploidy,
            candidate.score,
            candidate.somatic_penalty,
            candidate.diploid_proportion,
        )?;
    }
    f.flush()
}

/// Write all fit candidates, best first
pub fn write_purity_range_file(output_dir: &Utf8Path, best_fit: &BestFit) -> SimpleResult<()> {
    let filename = output_dir.join(PURITY_RANGE_FILENAME);
    let mut f = create_output_file(&filename, "ranked fit candidates")?;
    try_with!(
        write_ranked_candidates(&mut f, best_fit),
        "Unable to write ranked fit candidates file: '{filename}'"
    );
    Ok(())
}

fn write_fit_summary<W: Write>(
    f: &mut W,
    result: &SampleFitResult,
    gender: Gender,
) -> std::io::Result<()> {
    let best_fit = &result.best_fit;
    let fit = &best_fit.fit;
    let range = &best_fit.score_range;
    writeln!(
        f,
        "purity\tnorm_factor\tploidy\tscore\tsomatic_penalty\tdiploid_proportion\tmethod\t\
        min_purity\tmax_purity\tmin_ploidy\tmax_ploidy\tmin_diploid_proportion\t\
        normal_purity\tnormal_ploidy\tgender\texpected_baf\tdeleted_window_fraction"
    )?;
    writeln!(
        f,
        "{:.4}\t{:.4}\t{:.4}\t{:.6}\t{:.6}\t{:.4}\t{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{}\t{:.4}\t{:.4}",
        fit.purity,
        fit.norm_factor,
        fit.ploidy,
        fit.score,
        fit.somatic_penalty,
        fit.diploid_proportion,
        best_fit.method,
        range.min_purity,
        range.max_purity,
        range.min_ploidy,
        range.max_ploidy,
        range.min_diploid_proportion,
        best_fit.normal_fit.purity,
        best_fit.normal_fit.ploidy,
        gender,
        result.expected_baf,
        result.copy_number_segments.deleted_window_fraction(),
    )?;
    f.flush()
}

/// Write the selected fit with its method and score ranges
pub fn write_purity_file(
    output_dir: &Utf8Path,
    result: &SampleFitResult,
    gender: Gender,
) -> SimpleResult<()> {
    let filename = output_dir.join(PURITY_FILENAME);
    let mut f = create_output_file(&filename, "best fit summary")?;
    try_with!(
        write_fit_summary(&mut f, result, gender),
        "Unable to write best fit summary file: '{filename}'"
    );
    Ok(())
}

fn write_segment_table<W: Write>(
    f: &mut W,
    chrom_list: &ChromList,
    copy_number_segments: &CopyNumberSegments,
) -> std::io::Result<()> {
    writeln!(
        f,
        "chromosome\tstart\tend\tcopy_number\tbaf\tbaf_count\tdepth_window_count\t\
        start_support\tend_support\tsv_support\tmin_start\tmax_start"
    )?;
    for s in copy_number_segments.iter() {
        let chrom_label = &chrom_list.data[s.segment.chrom_index].label;
        writeln!(
            f,
            "{}\t{}\t{}\t{:.4}\t{:.4}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            chrom_label,
            s.segment.range.start + 1,
            s.segment.range.end,
            s.copy_number,
            s.baf,
            s.baf_count,
            s.depth_window_count,
            s.start_support,
            s.end_support,
            s.sv_support,
            s.min_start + 1,
            s.max_start + 1,
        )?;
    }
    f.flush()
}

pub fn write_copy_number_segments_file(
    output_dir: &Utf8Path,
    chrom_list: &ChromList,
    copy_number_segments: &CopyNumberSegments,
) -> SimpleResult<()> {
    let filename = output_dir.join(COPY_NUMBER_SEGMENTS_FILENAME);
    let mut f = create_output_file(&filename, "copy number segments")?;
    try_with!(
        write_segment_table(&mut f, chrom_list, copy_number_segments),
        "Unable to write copy number segments file: '{filename}'"
    );
    Ok(())
}

/// Bedgraph tracks are zero-indexed and half-open, matching the internal coordinates
fn write_segment_bedgraph<W: Write>(
    f: &mut W,
    chrom_list: &ChromList,
    copy_number_segments: &CopyNumberSegments,
) -> std::io::Result<()> {
    for s in copy_number_segments.iter() {
        writeln!(
            f,
            "{}\t{}\t{}\t{:.3}",
            chrom_list.data[s.segment.chrom_index].label,
            s.segment.range.start,
            s.segment.range.end,
            s.copy_number
        )?;
    }
    f.flush()
}

/// Write out a bedgraph track for copy number segments
pub fn write_copy_number_bedgraph_file(
    output_dir: &Utf8Path,
    chrom_list: &ChromList,
    copy_number_segments: &CopyNumberSegments,
) -> SimpleResult<()> {
    let filename = output_dir.join(COPY_NUMBER_SEGMENTS_BEDGRAPH_FILENAME);
    let mut f = create_output_file(&filename, "bedgraph copy number track")?;
    try_with!(
        write_segment_bedgraph(&mut f, chrom_list, copy_number_segments),
        "Unable to write bedgraph copy number track file: '{filename}'"
    );
    Ok(())
}

pub fn serialize_copy_number_segments(
    output_dir: &Utf8Path,
    copy_number_segments: &CopyNumberSegments,
) -> SimpleResult<()> {
    let mut buf = Vec::new();
    try_with!(
        copy_number_segments.serialize(&mut rmp_serde::Serializer::new(&mut buf)),
        "Unable to serialize copy number segments"
    );

    let filename = output_dir.join(COPY_NUMBER_SEGMENTS_MESSAGEPACK_FILENAME);

    info!("Writing copy number segments to binary file: '{filename}'");

    try_with!(
        std::fs::write(&filename, buf.as_slice()),
        "Unable to open and write copy number segments binary file: '{filename}'"
    );
    Ok(())
}

fn write_deletion_table<W: Write>(
    f: &mut W,
    chrom_list: &ChromList,
    germline_deletions: &[GermlineDeletion],
) -> std::io::Result<()> {
    writeln!(
        f,
        "chromosome\tstart\tend\tstatus\tdepth_window_count\tmean_reference_ratio\t\
        mean_tumor_copy_number\tsegment_indices"
    )?;
    for d in germline_deletions.iter() {
        writeln!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{:.4}\t{:.4}\t{}",
            chrom_list.data[d.segment.chrom_index].label,
            d.segment.range.start + 1,
            d.segment.range.end,
            d.status,
            d.depth_window_count,
            d.mean_reference_ratio,
            d.mean_tumor_copy_number,
            d.segment_indices.iter().join(","),
        )?;
    }
    f.flush()
}

pub fn write_germline_deletions_file(
    output_dir: &Utf8Path,
    chrom_list: &ChromList,
    germline_deletions: &[GermlineDeletion],
) -> SimpleResult<()> {
    let filename = output_dir.join(GERMLINE_DELETIONS_FILENAME);
    let mut f = create_output_file(&filename, "germline deletions")?;
    try_with!(
        write_deletion_table(&mut f, chrom_list, germline_deletions),
        "Unable to write germline deletions file: '{filename}'"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chrom_list::ChromInfo;
    use crate::copy_number::test_utils::get_test_segment;
    use crate::copy_number::{GermlineDeletionStatus, SegmentSupport};
    use crate::genome_segment::GenomeSegment;

    fn get_test_chrom_list() -> ChromList {
        ChromList::from_chrom_info(vec![ChromInfo::new("chr1", 10_000, 4_000, 5_000)])
    }

    fn get_test_segments() -> CopyNumberSegments {
        CopyNumberSegments {
            chroms: vec![vec![
                get_test_segment(0, 4000, 4, 2.0, SegmentSupport::Telomere, SegmentSupport::Centromere),
                get_test_segment(4000, 10_000, 6, 3.0, SegmentSupport::Centromere, SegmentSupport::Telomere),
            ]],
        }
    }

    /// Accepts all writes, but fails when flushed
    struct FlushFailureWriter;

    impl Write for FlushFailureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("flush failed"))
        }
    }

    fn to_lines(buf: Vec<u8>) -> Vec<String> {
        String::from_utf8(buf)
            .unwrap()
            .lines()
            .map(|x| x.to_string())
            .collect()
    }

    #[test]
    fn test_segment_table_coordinates() {
        let mut buf = Vec::new();
        write_segment_table(&mut buf, &get_test_chrom_list(), &get_test_segments()).unwrap();
        let lines = to_lines(buf);
        assert_eq!(lines.len(), 3);

        let first = lines[1].split('\t').collect::<Vec<_>>();
        let second = lines[2].split('\t').collect::<Vec<_>>();
        assert_eq!(&first[..4], &["chr1", "1", "4000", "2.0000"]);
        assert_eq!(&second[..4], &["chr1", "4001", "10000", "3.0000"]);
        assert_eq!(first[8], "Centromere");

        // Consecutive segments do not share a coordinate in the output
        let end: i64 = first[2].parse().unwrap();
        let start: i64 = second[1].parse().unwrap();
        assert!(end < start);
    }

    #[test]
    fn test_segment_bedgraph() {
        let mut buf = Vec::new();
        write_segment_bedgraph(&mut buf, &get_test_chrom_list(), &get_test_segments()).unwrap();
        let lines = to_lines(buf);
        assert_eq!(lines, vec!["chr1\t0\t4000\t2.000", "chr1\t4000\t10000\t3.000"]);
    }

    #[test]
    fn test_deletion_table() {
        let deletions = vec![GermlineDeletion {
            segment: GenomeSegment::from_range(0, 1000, 3000),
            status: GermlineDeletionStatus::Hom,
            depth_window_count: 2,
            mean_reference_ratio: 0.0,
            mean_tumor_copy_number: 0.25,
            segment_indices: vec![0, 1],
        }];
        let mut buf = Vec::new();
        write_deletion_table(&mut buf, &get_test_chrom_list(), &deletions).unwrap();
        let lines = to_lines(buf);
        assert_eq!(lines[1], "chr1\t1001\t3000\tHom\t2\t0.0000\t0.2500\t0,1");
    }

    #[test]
    fn test_flush_failure_is_reported() {
        let chrom_list = get_test_chrom_list();
        let segments = get_test_segments();
        assert!(write_segment_table(&mut FlushFailureWriter, &chrom_list, &segments).is_err());
        assert!(write_segment_bedgraph(&mut FlushFailureWriter, &chrom_list, &segments).is_err());
        assert!(write_deletion_table(&mut FlushFailureWriter, &chrom_list, &[]).is_err());

        let mut f = BufWriter::new(FlushFailureWriter);
        assert!(write_segment_bedgraph(&mut f, &chrom_list, &segments).is_err());
    }
}
