use std::collections::HashMap;

use bio::data_structures::interval_tree::IntervalTree;
use log::info;
use simple_error::{SimpleResult, bail, try_with};

use crate::input_readers::get_tsv_reader;

/// A set of chromosome regions which can be efficiently queried
///
#[derive(Clone)]
pub struct ChromRegions {
    regions: IntervalTree<i64, ()>,
}

impl ChromRegions {
    pub fn new() -> Self {
        Self {
            regions: IntervalTree::new(),
        }
    }

    /// Return true if the start-end range intersects with any regions stored in this object
    ///
    pub fn intersect(&self, start: i64, end: i64) -> bool {
        self.regions.find(start..end).next().is_some()
    }

    /// Add region, regions are not collapsed
    ///
    pub fn add_region(&mut self, start: i64, end: i64) {
        self.regions.insert(start..end, ());
    }
}

/// Genome regions keyed on chromosome label
#[derive(Clone, Default)]
pub struct GenomeRegions {
    pub chroms: HashMap<String, ChromRegions>,
}

impl GenomeRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create new object from bed file
    ///
    /// # Arguments
    ///
    /// * `label` - Used in error messages to describe what type of regions file this is
    ///
    pub fn from_bed(filename: &str, label: &str) -> SimpleResult<Self> {
        info!("Reading {label} regions from file '{filename}'");

        let mut regions = GenomeRegions::new();
        let mut reader = get_tsv_reader(filename, false, label)?;
        for (line_index, result) in reader.records().enumerate() {
            let record = try_with!(
                result,
                "Failed to parse line {} of {label} file '{filename}'",
                line_index + 1
            );
            if record.len() < 3 {
                bail!(
                    "Expected at least 3 columns on line {} of {label} file '{filename}'",
                    line_index + 1
                );
            }

            let chrom = &record[0];
            let start = try_with!(
                record[1].parse::<i64>(),
                "Invalid start on line {} of {label} file '{filename}'",
                line_index + 1
            );
            let end = try_with!(
                record[2].parse::<i64>(),
                "Invalid end on line {} of {label} file '{filename}'",
                line_index + 1
            );
            if end < start {
                bail!(
                    "Region end precedes start on line {} of {label} file '{filename}'",
                    line_index + 1
                );
            }
            regions.add_region(chrom, start, end);
        }

        Ok(regions)
    }

    pub fn is_empty(&self) -> bool {
        self.chroms.is_empty()
    }

    /// This will add a region
    /// # Arguments
    /// * `chrom` - the contig string
    /// * `start` - the start coordinate (included)
    /// * `end` - the end coordinates (excluded)
    pub fn add_region(&mut self, chrom: &str, start: i64, end: i64) {
        self.chroms
            .entry(chrom.to_owned())
            .or_insert_with(ChromRegions::new)
            .add_region(start, end);
    }

    /// Return true if the range intersects any region on chromosome `chrom`
    ///
    pub fn intersect(&self, chrom: &str, start: i64, end: i64) -> bool {
        self.chroms
            .get(chrom)
            .is_some_and(|x| x.intersect(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect() {
        let mut regions = ChromRegions::new();

        regions.add_region(100, 101);
        assert!(regions.intersect(100, 101));
        assert!(!regions.intersect(99, 100));
        assert!(!regions.intersect(101, 150));
    }

    #[test]
    fn test_genome_intersect() {
        let mut genome_regions = GenomeRegions::new();
        genome_regions.add_region("chr1", 10, 20);
        genome_regions.add_region("chr1", 19, 30);

        assert!(!genome_regions.intersect("chr1", 9, 10));
        assert!(genome_regions.intersect("chr1", 29, 30));
        assert!(!genome_regions.intersect("chr1", 30, 31));
        assert!(!genome_regions.intersect("chr2", 0, 100));
    }
}
