use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, try_with};

use crate::int_range::IntRange;

pub const DEFAULT_AUTOSOME_REGEX: &str = r"^(chr)?\d{1,2}$";
pub const DEFAULT_X_CHROM_REGEX: &str = r"^(chr)?X$";
pub const DEFAULT_Y_CHROM_REGEX: &str = r"^(chr)?Y$";

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum::Display)]
pub enum ChromRole {
    Autosome,
    X,
    Y,
    Other,
}

/// Regexes used to assign a role to each chromosome from its label
pub struct ChromRoleMatcher {
    autosome: Regex,
    x: Regex,
    y: Regex,
}

impl ChromRoleMatcher {
    pub fn new(autosome_regex: &str, x_regex: &str, y_regex: &str) -> SimpleResult<Self> {
        Ok(Self {
            autosome: try_with!(
                Regex::new(autosome_regex),
                "Invalid autosome regex '{autosome_regex}'"
            ),
            x: try_with!(Regex::new(x_regex), "Invalid X chromosome regex '{x_regex}'"),
            y: try_with!(Regex::new(y_regex), "Invalid Y chromosome regex '{y_regex}'"),
        })
    }

    pub fn get_role(&self, label: &str) -> ChromRole {
        if self.autosome.is_match(label) {
            ChromRole::Autosome
        } else if self.x.is_match(label) {
            ChromRole::X
        } else if self.y.is_match(label) {
            ChromRole::Y
        } else {
            ChromRole::Other
        }
    }
}

#[cfg(test)]
impl Default for ChromRoleMatcher {
    fn default() -> Self {
        Self::new(
            DEFAULT_AUTOSOME_REGEX,
            DEFAULT_X_CHROM_REGEX,
            DEFAULT_Y_CHROM_REGEX,
        )
        .unwrap()
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChromInfo {
    pub label: String,
    pub length: u64,

    /// Centromere range on this chromosome, empty if no centromere is defined
    pub centromere: IntRange,

    pub role: ChromRole,
}

impl ChromInfo {
    pub fn new(label: &str, length: u64, centromere_start: i64, centromere_end: i64) -> Self {
        Self {
            label: label.to_string(),
            length,
            centromere: IntRange::from_pair(centromere_start, centromere_end),
            role: ChromRole::Other,
        }
    }

    /// Centromere breakpoint position, if this chromosome has a centromere strictly inside it
    pub fn centromere_breakpoint(&self) -> Option<i64> {
        if self.centromere.is_empty() {
            return None;
        }
        let pos = self.centromere.center();
        if pos > 0 && pos < self.length as i64 {
            Some(pos)
        } else {
            None
        }
    }

    pub fn is_autosome(&self) -> bool {
        self.role == ChromRole::Autosome
    }
}

/// Chromosome list in genome table order
#[derive(Clone, Default)]
pub struct ChromList {
    pub data: Vec<ChromInfo>,
    pub label_to_index: HashMap<String, usize>,
}

impl ChromList {
    /// Build the chromosome list, assigning chromosome roles with the given matcher
    pub fn from_chrom_info_with_roles(data: Vec<ChromInfo>, matcher: &ChromRoleMatcher) -> Self {
        let data = data
            .into_iter()
            .map(|mut x| {
                x.role = matcher.get_role(&x.label);
                x
            })
            .collect::<Vec<_>>();
        let label_to_index = data
            .iter()
            .enumerate()
            .map(|(i, x)| (x.label.clone(), i))
            .collect();
        Self {
            data,
            label_to_index,
        }
    }

    /// Build the chromosome list with the default chromosome role patterns
    #[cfg(test)]
    pub fn from_chrom_info(data: Vec<ChromInfo>) -> Self {
        Self::from_chrom_info_with_roles(data, &ChromRoleMatcher::default())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn get_index(&self, label: &str) -> Option<usize> {
        self.label_to_index.get(label).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrom_roles() {
        let chrom_list = ChromList::from_chrom_info(vec![
            ChromInfo::new("chr1", 1000, 400, 500),
            ChromInfo::new("chrX", 1000, 400, 500),
            ChromInfo::new("Y", 1000, 0, 0),
            ChromInfo::new("chrM", 100, 0, 0),
        ]);

        let roles = chrom_list.data.iter().map(|x| x.role).collect::<Vec<_>>();
        assert_eq!(
            roles,
            vec![
                ChromRole::Autosome,
                ChromRole::X,
                ChromRole::Y,
                ChromRole::Other
            ]
        );
        assert_eq!(chrom_list.get_index("chrX"), Some(1));
        assert_eq!(chrom_list.get_index("chr2"), None);
    }

    #[test]
    fn test_centromere_breakpoint() {
        let chrom = ChromInfo::new("chr1", 1000, 400, 500);
        assert_eq!(chrom.centromere_breakpoint(), Some(450));

        let chrom = ChromInfo::new("chr1", 1000, 0, 0);
        assert_eq!(chrom.centromere_breakpoint(), None);
    }

    #[test]
    fn test_bad_regex() {
        assert!(ChromRoleMatcher::new("(", "X", "Y").is_err());
    }
}
