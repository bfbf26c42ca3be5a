//! Purity and ploidy model fitting over observed regions
//!

mod ploidy_deviation;
mod purity_adjuster;
mod purity_search;
mod region_fitter;
mod somatic_penalty;

pub use self::purity_adjuster::PurityAdjuster;
pub use self::purity_search::{FitCandidate, search};
pub use self::region_fitter::{FittedRegion, FittedRegions, PloidyPenaltyFitter, RegionFitter};
