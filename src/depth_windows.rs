use serde::{Deserialize, Serialize};

/// Return the zero-indexed window number of position `pos` given windows of size `window_size`
///
pub fn get_window_index(pos: i64, window_size: i64) -> i64 {
    pos / window_size
}

/// Depth ratio summary for one fixed-size genome window
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DepthWindow {
    /// Zero-indexed window start, aligned to the window size
    pub start: i64,
    pub tumor_ratio: f64,
    pub reference_ratio: f64,
    pub gc_content: f64,

    /// Masked windows are retained for position bookkeeping but excluded from all means
    pub is_valid: bool,
}

impl DepthWindow {
    /// Create a new window, masking it if any ratio or the GC content is negative
    ///
    pub fn new(start: i64, tumor_ratio: f64, reference_ratio: f64, gc_content: f64) -> Self {
        let is_valid = tumor_ratio >= 0.0 && reference_ratio >= 0.0 && gc_content >= 0.0;
        Self {
            start,
            tumor_ratio,
            reference_ratio,
            gc_content,
            is_valid,
        }
    }

    pub fn midpoint(&self, window_size: i64) -> i64 {
        self.start + window_size / 2
    }
}

/// Depth windows for the whole genome, indexed by chromosome index
///
/// Windows are sorted by start on each chromosome, but need not be contiguous.
///
#[derive(Clone, Deserialize, Serialize)]
pub struct GenomeDepthWindows {
    pub window_size: i64,
    pub chroms: Vec<Vec<DepthWindow>>,
}

impl GenomeDepthWindows {
    pub fn new(window_size: i64, chrom_count: usize) -> Self {
        Self {
            window_size,
            chroms: vec![Vec::new(); chrom_count],
        }
    }

    pub fn valid_window_count(&self) -> usize {
        self.chroms
            .iter()
            .flatten()
            .filter(|x| x.is_valid)
            .count()
    }
}
