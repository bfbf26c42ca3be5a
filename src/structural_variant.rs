use serde::{Deserialize, Serialize};

/// Direction of the anchored sequence for one structural variant breakend
///
/// Left anchored breakends retain the sequence to the left of the breakend, such as the left side of
/// a deletion, so any copy number change associated with the breakend is a loss moving to the right.
///
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum::Display)]
pub enum BreakendDirection {
    LeftAnchor,
    RightAnchor,
}

impl BreakendDirection {
    /// Parse the input orientation convention, where 1 is left anchored and -1 is right anchored
    pub fn from_orientation(orientation: i8) -> Option<Self> {
        match orientation {
            1 => Some(Self::LeftAnchor),
            -1 => Some(Self::RightAnchor),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SvBreakend {
    pub chrom_index: usize,

    /// Zero-indexed position of the anchored base adjacent to the breakend
    pub pos: i64,

    pub dir: BreakendDirection,

    /// Uncertainty in pos, in bases on either side
    pub position_uncertainty: i64,
}

impl SvBreakend {
    /// Zero-indexed start position of the genome region beginning at this breakend
    ///
    /// Regions start on the base after a left anchored breakend, and on the anchored base of a right
    /// anchored breakend.
    ///
    pub fn region_start(&self) -> i64 {
        match self.dir {
            BreakendDirection::LeftAnchor => self.pos + 1,
            BreakendDirection::RightAnchor => self.pos,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct StructuralVariant {
    pub id: String,
    pub breakend1: SvBreakend,

    /// None for single breakend variants
    pub breakend2: Option<SvBreakend>,

    pub filter: String,
    pub qual: f64,
    pub tumor_fragment_count: u32,
    pub allele_frequency: Option<f64>,
}

impl StructuralVariant {
    pub fn is_pass(&self) -> bool {
        self.filter == "PASS" || self.filter == "."
    }

    pub fn is_single_breakend(&self) -> bool {
        self.breakend2.is_none()
    }

    pub fn breakends(&self) -> impl Iterator<Item = &SvBreakend> {
        std::iter::once(&self.breakend1).chain(self.breakend2.iter())
    }
}

/// Total tumor fragment support over all passing structural variants
pub fn get_pass_tumor_fragment_count(structural_variants: &[StructuralVariant]) -> u64 {
    structural_variants
        .iter()
        .filter(|x| x.is_pass())
        .map(|x| x.tumor_fragment_count as u64)
        .sum()
}
