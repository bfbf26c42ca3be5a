//! Loaders for the tab-separated sample input tables
//!
//! All readers check column presence, value parsing and sort order, then convert positions to the
//! zero-indexed convention used everywhere else.
//!

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;

use csv::{ReaderBuilder, Trim};
use flate2::read::MultiGzDecoder;
use log::{info, warn};
use serde::Deserialize;
use simple_error::{SimpleResult, bail, try_with};
use thousands::Separable;

use crate::allele_frequency::{BafPoint, GenomeBafPoints};
use crate::chrom_list::{ChromInfo, ChromList, ChromRoleMatcher};
use crate::depth_windows::{DepthWindow, GenomeDepthWindows};
use crate::somatic_variant::{GenomeSomaticVariants, SomaticVariant};
use crate::structural_variant::{BreakendDirection, StructuralVariant, SvBreakend};

fn get_tsv_reader_builder(has_headers: bool) -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .delimiter(b'\t')
        .has_headers(has_headers)
        .flexible(!has_headers)
        .trim(Trim::All)
        .comment(Some(b'#'));
    builder
}

/// Open a tab-separated file for reading, decompressing it if the filename ends in '.gz'
///
pub fn get_tsv_reader(
    filename: &str,
    has_headers: bool,
    label: &str,
) -> SimpleResult<csv::Reader<Box<dyn Read>>> {
    let file = try_with!(
        File::open(filename),
        "Unable to open {label} file: '{filename}'"
    );
    let reader: Box<dyn Read> = if filename.ends_with(".gz") {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(get_tsv_reader_builder(has_headers).from_reader(reader))
}

/// Verify that records are grouped by chromosome and sorted by position within each chromosome
///
struct SortOrderChecker<'a> {
    source: &'a str,
    last: Option<(usize, i64)>,
    finished_chroms: HashSet<usize>,
}

impl<'a> SortOrderChecker<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            last: None,
            finished_chroms: HashSet::new(),
        }
    }

    fn check(&mut self, chrom_index: usize, pos: i64, line_number: usize) -> SimpleResult<()> {
        if let Some((last_chrom_index, last_pos)) = self.last {
            if chrom_index == last_chrom_index {
                if pos < last_pos {
                    bail!(
                        "Records are not sorted by position on line {line_number} of {}",
                        self.source
                    );
                }
            } else {
                self.finished_chroms.insert(last_chrom_index);
                if self.finished_chroms.contains(&chrom_index) {
                    bail!(
                        "Records are not grouped by chromosome on line {line_number} of {}",
                        self.source
                    );
                }
            }
        }
        self.last = Some((chrom_index, pos));
        Ok(())
    }
}

/// Count records skipped because their chromosome is not in the genome table
///
fn report_unknown_chrom_records(count: usize, source: &str) {
    if count > 0 {
        warn!(
            "Skipped {} records on chromosomes missing from the genome table in {source}",
            count.separate_with_commas()
        );
    }
}

#[derive(Deserialize)]
struct GenomeRecord {
    chromosome: String,
    length: u64,
    centromere_start: i64,
    centromere_end: i64,
}

fn parse_genome_table<R: Read>(
    mut reader: csv::Reader<R>,
    source: &str,
    matcher: &ChromRoleMatcher,
) -> SimpleResult<ChromList> {
    let mut data = Vec::new();
    let mut labels = HashSet::new();
    for (line_index, result) in reader.deserialize().enumerate() {
        let line_number = line_index + 2;
        let record: GenomeRecord = try_with!(
            result,
            "Failed to parse line {line_number} of {source}"
        );
        if record.length == 0 {
            bail!("Chromosome has zero length on line {line_number} of {source}");
        }
        if record.centromere_end < record.centromere_start
            || record.centromere_start < 0
            || record.centromere_end > record.length as i64
        {
            bail!("Invalid centromere range on line {line_number} of {source}");
        }
        if !labels.insert(record.chromosome.clone()) {
            bail!(
                "Duplicate chromosome '{}' on line {line_number} of {source}",
                record.chromosome
            );
        }
        data.push(ChromInfo::new(
            &record.chromosome,
            record.length,
            record.centromere_start,
            record.centromere_end,
        ));
    }
    if data.is_empty() {
        bail!("No chromosomes found in {source}");
    }
    Ok(ChromList::from_chrom_info_with_roles(data, matcher))
}

/// Read the genome table of chromosome lengths and centromere ranges
pub fn read_genome_table(filename: &str, matcher: &ChromRoleMatcher) -> SimpleResult<ChromList> {
    info!("Reading genome table from file: '{filename}'");
    let label = "genome table";
    let reader = get_tsv_reader(filename, true, label)?;
    parse_genome_table(reader, &format!("{label} file '{filename}'"), matcher)
}

#[derive(Deserialize)]
struct DepthWindowRecord {
    chromosome: String,
    position: i64,
    tumor_ratio: f64,
    reference_ratio: f64,
    gc_content: f64,
}

fn parse_depth_windows<R: Read>(
    mut reader: csv::Reader<R>,
    source: &str,
    chrom_list: &ChromList,
    window_size: i64,
) -> SimpleResult<GenomeDepthWindows> {
    let mut windows = GenomeDepthWindows::new(window_size, chrom_list.len());
    let mut checker = SortOrderChecker::new(source);
    let mut unknown_chrom_count = 0;
    for (line_index, result) in reader.deserialize().enumerate() {
        let line_number = line_index + 2;
        let record: DepthWindowRecord = try_with!(
            result,
            "Failed to parse line {line_number} of {source}"
        );
        let Some(chrom_index) = chrom_list.get_index(&record.chromosome) else {
            unknown_chrom_count += 1;
            continue;
        };
        let start = record.position - 1;
        if start < 0 || start % window_size != 0 {
            bail!(
                "Window position {} is not aligned to the window size {window_size} on line {line_number} of {source}",
                record.position
            );
        }
        if start >= chrom_list.data[chrom_index].length as i64 {
            bail!("Window position beyond chromosome end on line {line_number} of {source}");
        }
        checker.check(chrom_index, start, line_number)?;

        let chrom_windows = &mut windows.chroms[chrom_index];
        if chrom_windows.last().is_some_and(|x| x.start == start) {
            bail!("Duplicate window position on line {line_number} of {source}");
        }
        chrom_windows.push(DepthWindow::new(
            start,
            record.tumor_ratio,
            record.reference_ratio,
            record.gc_content,
        ));
    }
    report_unknown_chrom_records(unknown_chrom_count, source);
    Ok(windows)
}

pub fn read_depth_windows(
    filename: &str,
    chrom_list: &ChromList,
    window_size: i64,
) -> SimpleResult<GenomeDepthWindows> {
    info!("Reading depth windows from file: '{filename}'");
    let label = "depth window";
    let reader = get_tsv_reader(filename, true, label)?;
    let windows = parse_depth_windows(
        reader,
        &format!("{label} file '{filename}'"),
        chrom_list,
        window_size,
    )?;
    info!(
        "Read {} valid depth windows",
        windows.valid_window_count().separate_with_commas()
    );
    Ok(windows)
}

#[derive(Deserialize)]
struct BafRecord {
    chromosome: String,
    position: i64,
    baf: f64,
    depth: u32,
}

fn parse_baf_points<R: Read>(
    mut reader: csv::Reader<R>,
    source: &str,
    chrom_list: &ChromList,
) -> SimpleResult<GenomeBafPoints> {
    let mut points = GenomeBafPoints::new(chrom_list.len());
    let mut checker = SortOrderChecker::new(source);
    let mut unknown_chrom_count = 0;
    for (line_index, result) in reader.deserialize().enumerate() {
        let line_number = line_index + 2;
        let record: BafRecord = try_with!(
            result,
            "Failed to parse line {line_number} of {source}"
        );
        let Some(chrom_index) = chrom_list.get_index(&record.chromosome) else {
            unknown_chrom_count += 1;
            continue;
        };
        if !(0.0..=1.0).contains(&record.baf) {
            bail!("BAF value outside of [0,1] on line {line_number} of {source}");
        }
        let pos = record.position - 1;
        checker.check(chrom_index, pos, line_number)?;
        points.chroms[chrom_index].push(BafPoint::new(pos, record.baf, record.depth));
    }
    report_unknown_chrom_records(unknown_chrom_count, source);
    Ok(points)
}

pub fn read_baf_points(filename: &str, chrom_list: &ChromList) -> SimpleResult<GenomeBafPoints> {
    info!("Reading allele frequency observations from file: '{filename}'");
    let label = "allele frequency";
    let reader = get_tsv_reader(filename, true, label)?;
    parse_baf_points(reader, &format!("{label} file '{filename}'"), chrom_list)
}

#[derive(Deserialize)]
struct PcfRecord {
    chromosome: String,
    position: i64,
}

fn parse_pcf_breakpoints<R: Read>(
    mut reader: csv::Reader<R>,
    source: &str,
    chrom_list: &ChromList,
) -> SimpleResult<Vec<Vec<i64>>> {
    let mut breakpoints = vec![Vec::new(); chrom_list.len()];
    let mut checker = SortOrderChecker::new(source);
    let mut unknown_chrom_count = 0;
    for (line_index, result) in reader.deserialize().enumerate() {
        let line_number = line_index + 2;
        let record: PcfRecord = try_with!(
            result,
            "Failed to parse line {line_number} of {source}"
        );
        let Some(chrom_index) = chrom_list.get_index(&record.chromosome) else {
            unknown_chrom_count += 1;
            continue;
        };
        let pos = record.position - 1;
        checker.check(chrom_index, pos, line_number)?;
        breakpoints[chrom_index].push(pos);
    }
    report_unknown_chrom_records(unknown_chrom_count, source);
    Ok(breakpoints)
}

/// Read region start positions of a piecewise-constant fit
pub fn read_pcf_breakpoints(
    filename: &str,
    chrom_list: &ChromList,
    label: &str,
) -> SimpleResult<Vec<Vec<i64>>> {
    info!("Reading {label} breakpoints from file: '{filename}'");
    let reader = get_tsv_reader(filename, true, label)?;
    parse_pcf_breakpoints(reader, &format!("{label} file '{filename}'"), chrom_list)
}

#[derive(Deserialize)]
struct SvRecord {
    id: String,
    chromosome: String,
    position: i64,
    orientation: i8,
    position_uncertainty: Option<i64>,
    mate_chromosome: Option<String>,
    mate_position: Option<i64>,
    mate_orientation: Option<i8>,
    mate_position_uncertainty: Option<i64>,
    filter: String,
    qual: f64,
    tumor_fragment_count: u32,
    allele_frequency: Option<f64>,
}

/// Convert one leg of the input record into a breakend, returning None for unknown chromosomes
///
fn get_sv_breakend(
    chrom_list: &ChromList,
    chrom: &str,
    position: i64,
    orientation: i8,
    position_uncertainty: Option<i64>,
    line_number: usize,
    source: &str,
) -> SimpleResult<Option<SvBreakend>> {
    let Some(chrom_index) = chrom_list.get_index(chrom) else {
        return Ok(None);
    };
    let Some(dir) = BreakendDirection::from_orientation(orientation) else {
        bail!("Invalid breakend orientation '{orientation}' on line {line_number} of {source}");
    };
    Ok(Some(SvBreakend {
        chrom_index,
        pos: position - 1,
        dir,
        position_uncertainty: position_uncertainty.unwrap_or(0).abs(),
    }))
}

fn parse_structural_variants<R: Read>(
    mut reader: csv::Reader<R>,
    source: &str,
    chrom_list: &ChromList,
) -> SimpleResult<Vec<StructuralVariant>> {
    let mut svs = Vec::new();
    let mut ids = HashSet::new();
    let mut unknown_chrom_count = 0;
    for (line_index, result) in reader.deserialize().enumerate() {
        let line_number = line_index + 2;
        let record: SvRecord = try_with!(
            result,
            "Failed to parse line {line_number} of {source}"
        );
        if !ids.insert(record.id.clone()) {
            bail!(
                "Duplicate variant id '{}' on line {line_number} of {source}",
                record.id
            );
        }

        let Some(breakend1) = get_sv_breakend(
            chrom_list,
            &record.chromosome,
            record.position,
            record.orientation,
            record.position_uncertainty,
            line_number,
            source,
        )?
        else {
            unknown_chrom_count += 1;
            continue;
        };

        let breakend2 = match (
            record.mate_chromosome,
            record.mate_position,
            record.mate_orientation,
        ) {
            (Some(chrom), Some(position), Some(orientation)) => {
                match get_sv_breakend(
                    chrom_list,
                    &chrom,
                    position,
                    orientation,
                    record.mate_position_uncertainty,
                    line_number,
                    source,
                )? {
                    Some(x) => Some(x),
                    None => {
                        unknown_chrom_count += 1;
                        continue;
                    }
                }
            }
            (None, None, None) => None,
            _ => {
                bail!("Incomplete mate breakend description on line {line_number} of {source}");
            }
        };

        svs.push(StructuralVariant {
            id: record.id,
            breakend1,
            breakend2,
            filter: record.filter,
            qual: record.qual,
            tumor_fragment_count: record.tumor_fragment_count,
            allele_frequency: record.allele_frequency,
        });
    }
    report_unknown_chrom_records(unknown_chrom_count, source);
    Ok(svs)
}

pub fn read_structural_variants(
    filename: &str,
    chrom_list: &ChromList,
    label: &str,
) -> SimpleResult<Vec<StructuralVariant>> {
    info!("Reading {label} from file: '{filename}'");
    let reader = get_tsv_reader(filename, true, label)?;
    let svs = parse_structural_variants(reader, &format!("{label} file '{filename}'"), chrom_list)?;
    info!("Read {} {label}", svs.len().separate_with_commas());
    Ok(svs)
}

#[derive(Deserialize)]
struct SomaticVariantRecord {
    chromosome: String,
    position: i64,
    allele_frequency: f64,
    total_read_count: u32,
    filter: String,
}

fn parse_somatic_variants<R: Read>(
    mut reader: csv::Reader<R>,
    source: &str,
    chrom_list: &ChromList,
) -> SimpleResult<GenomeSomaticVariants> {
    let mut variants = GenomeSomaticVariants::new(chrom_list.len());
    let mut checker = SortOrderChecker::new(source);
    let mut unknown_chrom_count = 0;
    for (line_index, result) in reader.deserialize().enumerate() {
        let line_number = line_index + 2;
        let record: SomaticVariantRecord = try_with!(
            result,
            "Failed to parse line {line_number} of {source}"
        );
        let Some(chrom_index) = chrom_list.get_index(&record.chromosome) else {
            unknown_chrom_count += 1;
            continue;
        };
        let pos = record.position - 1;
        checker.check(chrom_index, pos, line_number)?;
        variants.chroms[chrom_index].push(SomaticVariant {
            pos,
            allele_frequency: record.allele_frequency,
            total_read_count: record.total_read_count,
            is_pass: record.filter == "PASS" || record.filter == ".",
        });
    }
    report_unknown_chrom_records(unknown_chrom_count, source);
    Ok(variants)
}

pub fn read_somatic_variants(
    filename: &str,
    chrom_list: &ChromList,
) -> SimpleResult<GenomeSomaticVariants> {
    info!("Reading somatic variants from file: '{filename}'");
    let label = "somatic variant";
    let reader = get_tsv_reader(filename, true, label)?;
    let variants =
        parse_somatic_variants(reader, &format!("{label} file '{filename}'"), chrom_list)?;
    info!(
        "Read {} usable somatic variants",
        variants.usable_count().separate_with_commas()
    );
    Ok(variants)
}
