//! Node-impurity metrics shared by every split finder.
//!
//! A criterion is a pure function of `(labels, indices) -> f64`: lower is
//! purer, and it must return `0.0` for an empty index set. Kept as a single
//! tagged enum (rather than a trait object) so dispatch happens once per
//! node, never once per sample.

use crate::error::{Error, Result};
use rayon::prelude::*;

/// Threshold above which a node's sum/sum-of-squares accumulation switches to
/// a parallel reduction (spec: "parallel sum reductions when |indices| > 1000").
const PARALLEL_THRESHOLD: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Criterion {
    SquaredError,
    AbsoluteError,
    Huber { delta: f64 },
    LogCosh,
    Poisson,
    Quantile { tau: f64 },
}

impl Criterion {
    /// Parses the `criterion` option grammar from the external interface:
    /// `mse`, `mae`, `huber`, `quantile[:tau]`, `logcosh`, `poisson`.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut parts = spec.splitn(2, ':');
        let name = parts.next().unwrap_or("");
        let param = parts.next();
        match name {
            "mse" => Ok(Criterion::SquaredError),
            "mae" => Ok(Criterion::AbsoluteError),
            "huber" => Ok(Criterion::Huber { delta: 1.0 }),
            "logcosh" => Ok(Criterion::LogCosh),
            "poisson" => Ok(Criterion::Poisson),
            "quantile" => {
                let tau: f64 = param
                    .unwrap_or("0.5")
                    .parse()
                    .map_err(|_| Error::InvalidParameter(format!("bad quantile tau in {spec:?}")))?;
                Criterion::quantile(tau)
            }
            other => Err(Error::InvalidParameter(format!(
                "unknown criterion {other:?}"
            ))),
        }
    }

    pub fn huber(delta: f64) -> Result<Self> {
        if !(delta > 0.0) {
            return Err(Error::InvalidParameter(
                "huber delta must be positive".into(),
            ));
        }
        Ok(Criterion::Huber { delta })
    }

    pub fn quantile(tau: f64) -> Result<Self> {
        if !(tau > 0.0 && tau < 1.0) {
            return Err(Error::InvalidParameter(
                "quantile tau must be in (0, 1)".into(),
            ));
        }
        Ok(Criterion::Quantile { tau })
    }

    pub fn node_metric(&self, labels: &[f64], indices: &[usize]) -> f64 {
        if indices.is_empty() {
            return 0.0;
        }
        match self {
            Criterion::SquaredError => squared_error(labels, indices),
            Criterion::AbsoluteError => absolute_error(labels, indices),
            Criterion::Huber { delta } => huber(labels, indices, *delta),
            Criterion::LogCosh => log_cosh(labels, indices),
            Criterion::Poisson => poisson(labels, indices),
            Criterion::Quantile { tau } => quantile(labels, indices, *tau),
        }
    }
}

fn sum_and_sum_sq(labels: &[f64], indices: &[usize]) -> (f64, f64) {
    if indices.len() > PARALLEL_THRESHOLD {
        indices
            .par_iter()
            .fold(
                || (0.0, 0.0),
                |(s, sq), &i| {
                    let y = labels[i];
                    (s + y, sq + y * y)
                },
            )
            .reduce(|| (0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1))
    } else {
        indices.iter().fold((0.0, 0.0), |(s, sq), &i| {
            let y = labels[i];
            (s + y, sq + y * y)
        })
    }
}

fn mean(labels: &[f64], indices: &[usize]) -> f64 {
    let (sum, _) = sum_and_sum_sq(labels, indices);
    sum / indices.len() as f64
}

fn squared_error(labels: &[f64], indices: &[usize]) -> f64 {
    let n = indices.len() as f64;
    let (sum, sum_sq) = sum_and_sum_sq(labels, indices);
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

fn subset_median(labels: &[f64], indices: &[usize]) -> f64 {
    let mut v: Vec<f64> = indices.iter().map(|&i| labels[i]).collect();
    let n = v.len();
    let mid = n / 2;
    v.select_nth_unstable_by(mid, |a, b| a.partial_cmp(b).unwrap());
    let upper = v[mid];
    if n % 2 == 1 {
        upper
    } else {
        let lower = v[..mid]
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        0.5 * (lower + upper)
    }
}

fn absolute_error(labels: &[f64], indices: &[usize]) -> f64 {
    let med = subset_median(labels, indices);
    let sum_abs: f64 = if indices.len() > PARALLEL_THRESHOLD {
        indices
            .par_iter()
            .map(|&i| (labels[i] - med).abs())
            .sum()
    } else {
        indices.iter().map(|&i| (labels[i] - med).abs()).sum()
    };
    sum_abs / indices.len() as f64
}

fn huber(labels: &[f64], indices: &[usize], delta: f64) -> f64 {
    let mu = mean(labels, indices);
    let loss: f64 = if indices.len() > PARALLEL_THRESHOLD {
        indices
            .par_iter()
            .map(|&i| huber_term(labels[i] - mu, delta))
            .sum()
    } else {
        indices
            .iter()
            .map(|&i| huber_term(labels[i] - mu, delta))
            .sum()
    };
    loss / indices.len() as f64
}

fn huber_term(r: f64, delta: f64) -> f64 {
    let abs_r = r.abs();
    if abs_r <= delta {
        0.5 * r * r
    } else {
        delta * (abs_r - 0.5 * delta)
    }
}

fn log_cosh(labels: &[f64], indices: &[usize]) -> f64 {
    let mu = mean(labels, indices);
    let loss: f64 = if indices.len() > PARALLEL_THRESHOLD {
        indices
            .par_iter()
            .map(|&i| (labels[i] - mu).cosh().ln())
            .sum()
    } else {
        indices.iter().map(|&i| (labels[i] - mu).cosh().ln()).sum()
    };
    loss / indices.len() as f64
}

fn poisson(labels: &[f64], indices: &[usize]) -> f64 {
    const FLOOR: f64 = 1e-12;
    let mu = mean(labels, indices).max(FLOOR);
    let loss: f64 = indices
        .iter()
        .map(|&i| {
            let yi = labels[i].max(FLOOR);
            mu - yi * mu.ln()
        })
        .sum();
    loss / indices.len() as f64
}

fn quantile(labels: &[f64], indices: &[usize], tau: f64) -> f64 {
    let mut vals: Vec<f64> = indices.iter().map(|&i| labels[i]).collect();
    let n = vals.len();
    let k = (tau * (n - 1) as f64) as usize;
    vals.select_nth_unstable_by(k, |a, b| a.partial_cmp(b).unwrap());
    let q = vals[k];
    let pinball: f64 = vals
        .iter()
        .map(|&v| if v < q { (tau - 1.0) * (v - q) } else { tau * (v - q) })
        .sum();
    pinball / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_indices_is_zero_for_every_variant() {
        let labels = [1.0, 2.0, 3.0];
        for c in [
            Criterion::SquaredError,
            Criterion::AbsoluteError,
            Criterion::Huber { delta: 1.0 },
            Criterion::LogCosh,
            Criterion::Poisson,
            Criterion::Quantile { tau: 0.5 },
        ] {
            assert_eq!(c.node_metric(&labels, &[]), 0.0);
        }
    }

    #[test]
    fn squared_error_matches_population_variance() {
        let labels = vec![1.0, 2.0, 3.0, 4.0];
        let indices: Vec<usize> = (0..4).collect();
        let mse = Criterion::SquaredError.node_metric(&labels, &indices);
        // population variance of 1,2,3,4 is 1.25
        assert!((mse - 1.25).abs() < 1e-9);
    }

    #[test]
    fn squared_error_clamped_nonnegative() {
        let labels = vec![5.0; 4];
        let indices: Vec<usize> = (0..4).collect();
        let mse = Criterion::SquaredError.node_metric(&labels, &indices);
        assert_eq!(mse, 0.0);
    }

    #[test]
    fn absolute_error_uses_median() {
        let labels = vec![1.0, 2.0, 3.0];
        let indices: Vec<usize> = (0..3).collect();
        let mae = Criterion::AbsoluteError.node_metric(&labels, &indices);
        // median is 2, abs deviations are 1,0,1 -> mean 2/3
        assert!((mae - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn absolute_error_even_count_averages_middle_two() {
        let labels = vec![1.0, 2.0, 3.0, 4.0];
        let indices: Vec<usize> = (0..4).collect();
        // median is 2.5, deviations: 1.5, 0.5, 0.5, 1.5 -> mean 1.0
        let mae = Criterion::AbsoluteError.node_metric(&labels, &indices);
        assert!((mae - 1.0).abs() < 1e-9);
    }

    #[test]
    fn huber_rejects_nonpositive_delta() {
        assert!(Criterion::huber(0.0).is_err());
        assert!(Criterion::huber(-1.0).is_err());
        assert!(Criterion::huber(1.0).is_ok());
    }

    #[test]
    fn quantile_rejects_tau_out_of_range() {
        assert!(Criterion::quantile(0.0).is_err());
        assert!(Criterion::quantile(1.0).is_err());
        assert!(Criterion::quantile(0.9).is_ok());
    }

    #[test]
    fn parse_recognizes_every_grammar_option() {
        assert_eq!(Criterion::parse("mse").unwrap(), Criterion::SquaredError);
        assert_eq!(Criterion::parse("mae").unwrap(), Criterion::AbsoluteError);
        assert_eq!(
            Criterion::parse("huber").unwrap(),
            Criterion::Huber { delta: 1.0 }
        );
        assert_eq!(Criterion::parse("logcosh").unwrap(), Criterion::LogCosh);
        assert_eq!(Criterion::parse("poisson").unwrap(), Criterion::Poisson);
        assert_eq!(
            Criterion::parse("quantile:0.9").unwrap(),
            Criterion::Quantile { tau: 0.9 }
        );
        assert!(Criterion::parse("nonsense").is_err());
    }

    #[test]
    fn poisson_floors_zero_values() {
        let labels = vec![0.0, 0.0, 0.0];
        let indices: Vec<usize> = (0..3).collect();
        let loss = Criterion::Poisson.node_metric(&labels, &indices);
        assert!(loss.is_finite());
    }
}
