use crate::allele_frequency::get_corrected_baf;

/// Below this copy number the tumor BAF is undefined and treated as balanced
const MIN_BAF_COPY_NUMBER: f64 = 0.01;

/// Convert observed depth ratios and allele frequencies into tumor copy number estimates for one
/// (purity, normalization factor) pair
///
#[derive(Clone, Debug)]
pub struct PurityAdjuster {
    purity: f64,
    norm_factor: f64,
    expected_baf: f64,
}

impl PurityAdjuster {
    pub fn new(purity: f64, norm_factor: f64, expected_baf: f64) -> Self {
        Self {
            purity,
            norm_factor,
            expected_baf,
        }
    }

    pub fn purity(&self) -> f64 {
        self.purity
    }

    /// Tumor copy number implied by tumor depth ratio `t` and germline reference ratio `n`
    ///
    pub fn copy_number(&self, tumor_ratio: f64, reference_ratio: f64) -> f64 {
        let p = self.purity;
        let nf = self.norm_factor;
        2.0 * reference_ratio + 2.0 * (tumor_ratio - reference_ratio * nf) / (p * nf)
    }

    /// Tumor BAF implied by the observed mirrored BAF of a region with the given tumor copy number
    ///
    /// The observed BAF is first corrected for the finite depth bias of mirrored observations.
    ///
    pub fn tumor_baf(&self, observed_baf: f64, copy_number: f64, reference_ratio: f64) -> f64 {
        if copy_number < MIN_BAF_COPY_NUMBER {
            return 0.5;
        }
        let p = self.purity;
        let baf = get_corrected_baf(observed_baf, self.expected_baf);
        let normal_copies = reference_ratio * (1.0 - p);
        let total = p * copy_number + 2.0 * normal_copies;
        (baf * total - normal_copies) / (p * copy_number)
    }

    /// Tumor copy number of a somatic variant or breakend junction observed at allele frequency `vaf`
    /// in a region of the given tumor copy number
    ///
    pub fn variant_copy_number(&self, vaf: f64, copy_number: f64, reference_ratio: f64) -> f64 {
        let p = self.purity;
        vaf * (p * copy_number + 2.0 * reference_ratio * (1.0 - p)) / p
    }
}
