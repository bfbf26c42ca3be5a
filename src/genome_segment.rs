use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chrom_list::ChromList;
pub use crate::int_range::IntRange;

/// The structure represents a contiguous region of the genome on a single chromosome
#[derive(Clone, Deserialize, Eq, PartialEq, Ord, PartialOrd, Serialize)]
pub struct GenomeSegment {
    /// chrom_index is defined by the order of the input genome table
    pub chrom_index: usize,
    pub range: IntRange,
}

impl GenomeSegment {
    pub fn from_range(chrom_index: usize, start: i64, end: i64) -> Self {
        Self {
            chrom_index,
            range: IntRange::from_pair(start, end),
        }
    }

    /// Convert to a string in 'samtools' region format (e.g. chr20:100-200)
    ///
    /// This is the format used to identify intervals in all diagnostic messages
    ///
    pub fn to_region_str(&self, chrom_list: &ChromList) -> String {
        let chrom = &chrom_list.data[self.chrom_index].label;
        format!("{chrom}:{}-{}", self.range.start + 1, self.range.end)
    }

    pub fn intersect(&self, other: &Self) -> bool {
        self.chrom_index == other.chrom_index && self.range.intersect_range(&other.range)
    }
}

impl fmt::Debug for GenomeSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Segment: {}:{:?}", self.chrom_index, self.range)
    }
}

/// Strict order here means that `a` comes before `b` without intersection
///
pub fn is_strict_order(a: &GenomeSegment, b: &GenomeSegment) -> bool {
    a.chrom_index < b.chrom_index
        || (a.chrom_index == b.chrom_index && a.range.end <= b.range.start)
}
