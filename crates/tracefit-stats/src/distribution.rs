//! Closed-form distribution families used as regression models.
//!
//! Every family is parameterized the same way: zero or one shape parameter
//! followed by `loc` and `scale`. A variate `x` is standardized as
//! `z = (x - loc) / scale`, the standard form of the family is evaluated at
//! `z`, and densities are divided by `scale`.
//!
//! | Family        | Id           | Parameters            |
//! |---------------|--------------|-----------------------|
//! | Weibull       | `weibull`    | `c, loc, scale`       |
//! | Pareto        | `pareto`     | `b, loc, scale`       |
//! | Gen. Pareto   | `gen_pareto` | `c, loc, scale`       |
//! | Exponential   | `expon`      | `loc, scale`          |
//! | Gamma         | `gamma`      | `a, loc, scale`       |
//! | Log-normal    | `lognormal`  | `s, loc, scale`       |
//! | Lévy          | `levy`       | `loc, scale`          |
//!
//! Invalid parameters (non-positive scale, non-positive shape where the
//! family requires a positive one, non-finite values) evaluate to `NaN` for
//! every variate instead of failing, so that a solver probing the parameter
//! space sees a non-finite residual and backs off.
//!
//! # Examples
//!
//! ```
//! use tracefit_stats::distribution::DistributionFamily;
//!
//! let family = DistributionFamily::Exponential;
//! let pdf = family.pdf(&[0.0, 1.0], &[0.0, 1.0]);
//! assert!((pdf[0] - 1.0).abs() < 1e-12);
//! assert!((pdf[1] - (-1.0f64).exp()).abs() < 1e-12);
//! ```

use std::{f64::consts::PI, fmt, str::FromStr};

use statrs::{
    distribution::{Continuous, ContinuousCDF, Exp, Gamma, LogNormal, Pareto, Weibull},
    function::erf,
};

/// A parametric probability model exposing pdf, cdf and survival functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DistributionFamily {
    Weibull,
    Pareto,
    GenPareto,
    Exponential,
    Gamma,
    LogNormal,
    Levy,
}

impl fmt::Display for DistributionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.id(), f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown distribution family '{id}'")]
pub struct ParseFamilyError {
    pub id: String,
}

impl FromStr for DistributionFamily {
    type Err = ParseFamilyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|family| family.id() == s)
            .ok_or_else(|| ParseFamilyError { id: s.to_owned() })
    }
}

impl DistributionFamily {
    /// Every family the library can evaluate.
    pub const ALL: [Self; 7] = [
        Self::Weibull,
        Self::Pareto,
        Self::GenPareto,
        Self::Exponential,
        Self::Gamma,
        Self::LogNormal,
        Self::Levy,
    ];

    /// Families fitted by default. Pareto is available but not part of the
    /// default regression table.
    pub const ACTIVE: [Self; 6] = [
        Self::Weibull,
        Self::GenPareto,
        Self::Exponential,
        Self::Gamma,
        Self::LogNormal,
        Self::Levy,
    ];

    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Weibull => "weibull",
            Self::Pareto => "pareto",
            Self::GenPareto => "gen_pareto",
            Self::Exponential => "expon",
            Self::Gamma => "gamma",
            Self::LogNormal => "lognormal",
            Self::Levy => "levy",
        }
    }

    /// Number of parameters (shape, if any, then `loc` and `scale`).
    #[must_use]
    pub fn num_params(self) -> usize {
        match self {
            Self::Exponential | Self::Levy => 2,
            Self::Weibull | Self::Pareto | Self::GenPareto | Self::Gamma | Self::LogNormal => 3,
        }
    }

    /// Probability density at each variate.
    ///
    /// # Panics
    ///
    /// Panics if `params.len()` differs from [`num_params`](Self::num_params).
    #[must_use]
    pub fn pdf(self, variates: &[f64], params: &[f64]) -> Vec<f64> {
        self.evaluate(variates, params, |standard, z, scale| standard.pdf(z) / scale)
    }

    /// Cumulative distribution at each variate.
    ///
    /// # Panics
    ///
    /// Panics if `params.len()` differs from [`num_params`](Self::num_params).
    #[must_use]
    pub fn cdf(self, variates: &[f64], params: &[f64]) -> Vec<f64> {
        self.evaluate(variates, params, |standard, z, _| standard.cdf(z))
    }

    /// Survival function (`1 - cdf`) at each variate.
    ///
    /// # Panics
    ///
    /// Panics if `params.len()` differs from [`num_params`](Self::num_params).
    #[must_use]
    pub fn sf(self, variates: &[f64], params: &[f64]) -> Vec<f64> {
        self.evaluate(variates, params, |standard, z, _| standard.sf(z))
    }

    fn evaluate<F>(self, variates: &[f64], params: &[f64], f: F) -> Vec<f64>
    where
        F: Fn(&Standard, f64, f64) -> f64,
    {
        assert_eq!(
            params.len(),
            self.num_params(),
            "{self} takes {} parameters",
            self.num_params()
        );

        let (shape, loc, scale) = match *params {
            [loc, scale] => (None, loc, scale),
            [shape, loc, scale] => (Some(shape), loc, scale),
            _ => unreachable!(),
        };

        let Some(standard) = Standard::new(self, shape, loc, scale) else {
            return vec![f64::NAN; variates.len()];
        };

        variates
            .iter()
            .map(|&x| f(&standard, (x - loc) / scale, scale))
            .collect()
    }
}

/// Standard form (`loc = 0`, `scale = 1`) of a family with its shape bound.
#[derive(Debug)]
enum Standard {
    Weibull(Weibull),
    Pareto(Pareto),
    GenPareto(f64),
    Exponential(Exp),
    Gamma(Gamma),
    LogNormal(LogNormal),
    Levy,
}

impl Standard {
    fn new(family: DistributionFamily, shape: Option<f64>, loc: f64, scale: f64) -> Option<Self> {
        if !loc.is_finite() || !scale.is_finite() || scale <= 0.0 {
            return None;
        }
        let standard = match (family, shape) {
            (DistributionFamily::Weibull, Some(c)) => Self::Weibull(Weibull::new(c, 1.0).ok()?),
            (DistributionFamily::Pareto, Some(b)) => Self::Pareto(Pareto::new(1.0, b).ok()?),
            (DistributionFamily::GenPareto, Some(c)) if c.is_finite() => Self::GenPareto(c),
            (DistributionFamily::Exponential, None) => Self::Exponential(Exp::new(1.0).ok()?),
            (DistributionFamily::Gamma, Some(a)) => Self::Gamma(Gamma::new(a, 1.0).ok()?),
            (DistributionFamily::LogNormal, Some(s)) => {
                Self::LogNormal(LogNormal::new(0.0, s).ok()?)
            }
            (DistributionFamily::Levy, None) => Self::Levy,
            _ => return None,
        };
        Some(standard)
    }

    fn pdf(&self, z: f64) -> f64 {
        match self {
            Self::Weibull(d) => d.pdf(z),
            Self::Pareto(d) => d.pdf(z),
            Self::GenPareto(c) => gen_pareto::pdf(z, *c),
            Self::Exponential(d) => d.pdf(z),
            Self::Gamma(d) => d.pdf(z),
            Self::LogNormal(d) => d.pdf(z),
            Self::Levy => levy::pdf(z),
        }
    }

    fn cdf(&self, z: f64) -> f64 {
        match self {
            Self::Weibull(d) => d.cdf(z),
            Self::Pareto(d) => d.cdf(z),
            Self::GenPareto(c) => gen_pareto::cdf(z, *c),
            Self::Exponential(d) => d.cdf(z),
            Self::Gamma(d) => d.cdf(z),
            Self::LogNormal(d) => d.cdf(z),
            Self::Levy => levy::cdf(z),
        }
    }

    fn sf(&self, z: f64) -> f64 {
        match self {
            Self::Weibull(d) => d.sf(z),
            Self::Pareto(d) => d.sf(z),
            Self::GenPareto(c) => gen_pareto::sf(z, *c),
            Self::Exponential(d) => d.sf(z),
            Self::Gamma(d) => d.sf(z),
            Self::LogNormal(d) => d.sf(z),
            Self::Levy => levy::sf(z),
        }
    }
}

/// Generalized Pareto with shape `c`; `c == 0` reduces to the exponential.
mod gen_pareto {
    /// Support is `z >= 0`, bounded above by `-1/c` when `c < 0`.
    fn in_support(z: f64, c: f64) -> bool {
        z >= 0.0 && (c >= 0.0 || z <= -1.0 / c)
    }

    fn log_sf(z: f64, c: f64) -> f64 {
        if c == 0.0 {
            -z
        } else {
            -(c * z).ln_1p() / c
        }
    }

    pub(super) fn pdf(z: f64, c: f64) -> f64 {
        if !in_support(z, c) {
            return 0.0;
        }
        (log_sf(z, c) - (c * z).ln_1p()).exp()
    }

    pub(super) fn cdf(z: f64, c: f64) -> f64 {
        if z < 0.0 {
            0.0
        } else if !in_support(z, c) {
            1.0
        } else {
            -log_sf(z, c).exp_m1()
        }
    }

    pub(super) fn sf(z: f64, c: f64) -> f64 {
        if z < 0.0 {
            1.0
        } else if !in_support(z, c) {
            0.0
        } else {
            log_sf(z, c).exp()
        }
    }
}

/// Standard Lévy distribution, supported on `z > 0`.
mod levy {
    use super::{PI, erf};

    pub(super) fn pdf(z: f64) -> f64 {
        if z <= 0.0 {
            return 0.0;
        }
        (-0.5 / z).exp() / (2.0 * PI * z.powi(3)).sqrt()
    }

    pub(super) fn cdf(z: f64) -> f64 {
        if z <= 0.0 {
            return 0.0;
        }
        erf::erfc((0.5 / z).sqrt())
    }

    pub(super) fn sf(z: f64) -> f64 {
        if z <= 0.0 {
            return 1.0;
        }
        erf::erf((0.5 / z).sqrt())
    }
}
