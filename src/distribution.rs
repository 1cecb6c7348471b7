//! Read-count probability models: Poisson and Negative Binomial, each
//! exposing `log_pmf(mean, value)`.
//!
//! Both variants round `mean` and `value` to the nearest integer before
//! evaluating, and both lean on a Stirling-series approximation of
//! `log(x!)` rather than an exact factorial, since window read counts can
//! be large.

use crate::error::{Result, SigmaError};

/// Which read-count model the run is configured to use, selected by the
/// `pdist_type` config key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PDistType {
    Poisson,
    NegativeBinomial,
}

impl PDistType {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "Poisson" => Ok(PDistType::Poisson),
            "NegativeBinomial" => Ok(PDistType::NegativeBinomial),
            other => Err(SigmaError::Config { key: "pdist_type", value: other.to_string() }),
        }
    }
}

/// Stirling's series approximation of `log(x!)`, via `log(x!) = log(gamma(x+1))`.
///
/// `S(0) := 0` by convention: the series itself is undefined at `x = 0`,
/// but `log_pmf` calls it with `k = 0` whenever a window has zero reads.
fn stirling_log_factorial(x: f64) -> f64 {
    if x == 0.0 {
        return 0.0;
    }

    let log_sqrt_2pi = 0.5 * (2.0 * std::f64::consts::PI).ln();
    const LC1: f64 = 1.0 / 12.0;
    const LC2: f64 = -1.0 / 360.0;
    const LC3: f64 = 1.0 / 1260.0;
    const LC4: f64 = -1.0 / 1680.0;

    let r1 = 1.0 / x;
    let r2 = r1 * r1;
    let r3 = r1 * r2;
    let r5 = r2 * r3;
    let r7 = r2 * r5;

    LC4 * r7 + LC3 * r5 + LC2 * r3 + LC1 * r1 + log_sqrt_2pi + 0.5 * x.ln() + x * (x.ln() - 1.0)
}

/// A read-count probability model, selected per the `pdist_type` config key.
pub trait ReadCountModel {
    /// Natural log of the pmf for a window/contig with the given mean
    /// arrival rate and observed value.
    fn log_pmf(&self, mean: f64, value: f64) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PoissonModel;

impl ReadCountModel for PoissonModel {
    fn log_pmf(&self, mean: f64, value: f64) -> f64 {
        let lambda = mean.round();
        let k = value.round();

        if lambda == 0.0 {
            return if k == 0.0 { -lambda - stirling_log_factorial(k) } else { f64::NEG_INFINITY };
        }

        k * lambda.ln() - lambda - stirling_log_factorial(k)
    }
}

/// Negative Binomial, parameterized by a variance-to-mean ratio `vmr > 1`.
#[derive(Debug, Clone, Copy)]
pub struct NegativeBinomialModel {
    log_p: f64,
    log_1mp: f64,
    alpha: f64,
}

impl NegativeBinomialModel {
    pub fn new(vmr: f64) -> Self {
        let p_success = 1.0 - 1.0 / vmr;
        let p_failure = 1.0 / vmr;
        NegativeBinomialModel {
            log_p: p_success.ln(),
            log_1mp: p_failure.ln(),
            alpha: p_failure / p_success,
        }
    }
}

impl ReadCountModel for NegativeBinomialModel {
    fn log_pmf(&self, mean: f64, value: f64) -> f64 {
        let r = (self.alpha * mean).round();
        let k = value.round();

        r * self.log_1mp + k * self.log_p + stirling_log_factorial(k + r - 1.0) - stirling_log_factorial(k) - stirling_log_factorial(r - 1.0)
    }
}
