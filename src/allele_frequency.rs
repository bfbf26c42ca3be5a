use serde::{Deserialize, Serialize};

/// B-allele frequency observation at one heterozygous germline site
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BafPoint {
    /// Zero-indexed site position
    pub pos: i64,

    /// Mirrored B-allele frequency in [0.5,1]
    pub baf: f64,

    pub depth: u32,
}

impl BafPoint {
    pub fn new(pos: i64, baf: f64, depth: u32) -> Self {
        Self {
            pos,
            baf: mirror_baf(baf),
            depth,
        }
    }
}

/// Reflect BAF values below 0.5 into the [0.5,1] range
pub fn mirror_baf(baf: f64) -> f64 {
    if baf < 0.5 { 1.0 - baf } else { baf }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct GenomeBafPoints {
    pub chroms: Vec<Vec<BafPoint>>,
}

impl GenomeBafPoints {
    pub fn new(chrom_count: usize) -> Self {
        Self {
            chroms: vec![Vec::new(); chrom_count],
        }
    }

    pub fn mean_depth(&self) -> Option<f64> {
        let mut count = 0usize;
        let mut total = 0f64;
        for point in self.chroms.iter().flatten() {
            count += 1;
            total += point.depth as f64;
        }
        if count == 0 {
            None
        } else {
            Some(total / count as f64)
        }
    }
}

/// Expected mirrored BAF of a balanced heterozygous site observed at the given depth
///
/// Mirroring a binomial sample of a 0.5 frequency biases the observed value upward, this returns the
/// expected value of the mirrored observation under a normal approximation.
///
pub fn get_expected_baf(mean_depth: f64) -> f64 {
    if mean_depth <= 0.0 {
        return 0.5;
    }
    let sd = (0.25 / mean_depth).sqrt();
    let expected = 0.5 + sd * (2.0 / std::f64::consts::PI).sqrt();
    expected.min(0.99)
}

/// Correct an observed mirrored BAF for the finite depth bias
///
/// Values at or below the expected balanced BAF are treated as fully balanced, and values above it are
/// rescaled so that the range [expected_baf, 1] maps to [0.5, 1].
///
pub fn get_corrected_baf(observed_baf: f64, expected_baf: f64) -> f64 {
    if observed_baf <= expected_baf {
        0.5
    } else {
        0.5 + 0.5 * (observed_baf - expected_baf) / (1.0 - expected_baf)
    }
}
