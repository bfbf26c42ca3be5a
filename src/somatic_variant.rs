use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SomaticVariant {
    /// Zero-indexed variant position
    pub pos: i64,
    pub allele_frequency: f64,
    pub total_read_count: u32,
    pub is_pass: bool,
}

impl SomaticVariant {
    /// Usable variants are passing variants with a defined allele frequency in (0,1)
    pub fn is_usable(&self) -> bool {
        self.is_pass
            && self.total_read_count > 0
            && self.allele_frequency > 0.0
            && self.allele_frequency < 1.0
    }
}

/// Somatic SNVs sorted by position on each chromosome, indexed by chromosome index
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct GenomeSomaticVariants {
    pub chroms: Vec<Vec<SomaticVariant>>,
}

impl GenomeSomaticVariants {
    pub fn new(chrom_count: usize) -> Self {
        Self {
            chroms: vec![Vec::new(); chrom_count],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chroms.iter().all(|x| x.is_empty())
    }

    pub fn usable_count(&self) -> usize {
        self.chroms
            .iter()
            .flatten()
            .filter(|x| x.is_usable())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_usable() {
        let mut variant = SomaticVariant {
            pos: 100,
            allele_frequency: 0.3,
            total_read_count: 40,
            is_pass: true,
        };
        assert!(variant.is_usable());

        variant.allele_frequency = 1.0;
        assert!(!variant.is_usable());

        variant.allele_frequency = 0.3;
        variant.is_pass = false;
        assert!(!variant.is_usable());
    }
}
