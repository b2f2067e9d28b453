//! Feature kinds that can be regressed, with their plot labels.
//!
//! Only a fixed set of trace features is analyzed. Datasets configured under
//! any other feature name are skipped without error.

use std::{fmt, str::FromStr};

/// Y axis label shared by every feature.
pub const FRACTION_OF_TASKS: &str = "Fraction of tasks";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureKind {
    /// Time between consecutive task arrivals
    Interarrival,
    /// Time from task start to task end
    Lifetime,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.id(), f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unsupported feature: {name}")]
pub struct UnsupportedFeature {
    pub name: String,
}

impl FromStr for FeatureKind {
    type Err = UnsupportedFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| UnsupportedFeature { name: s.to_owned() })
    }
}

impl FeatureKind {
    pub const ALL: [Self; 2] = [Self::Interarrival, Self::Lifetime];

    /// Name used in configuration files, CSV headers and output file names.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Interarrival => "interarrival",
            Self::Lifetime => "lifetime",
        }
    }

    #[must_use]
    pub fn axis_labels(self) -> AxisLabels {
        let x = match self {
            Self::Interarrival => "Interarrival Time of Tasks (ms)",
            Self::Lifetime => "Lifetime of Tasks (ms)",
        };
        AxisLabels {
            x: x.to_owned(),
            y: FRACTION_OF_TASKS.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisLabels {
    pub x: String,
    pub y: String,
}
