//! Continuous curves fitted upstream and stored alongside the histograms.
//!
//! The primary-fraction correction is usually a sigmoid in momentum; constant
//! and polynomial shapes are accepted too so that stores produced with other
//! parameterizations still load.

use serde::{Deserialize, Serialize};

/// A fitted function of momentum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CurveFunction {
    /// `f(x) = value`
    Constant { value: f64 },
    /// `f(x) = Σ c_k x^k`, lowest order first.
    Polynomial { coefficients: Vec<f64> },
    /// `f(x) = amplitude / (1 + exp(-slope (x - midpoint)))`
    Sigmoid {
        amplitude: f64,
        slope: f64,
        midpoint: f64,
    },
}

impl CurveFunction {
    /// Evaluate the curve at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            CurveFunction::Constant { value } => *value,
            CurveFunction::Polynomial { coefficients } => {
                coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
            }
            CurveFunction::Sigmoid {
                amplitude,
                slope,
                midpoint,
            } => {
                let z = slope * (x - midpoint);
                // Written in two branches so exp never overflows.
                if z >= 0.0 {
                    amplitude / (1.0 + (-z).exp())
                } else {
                    let e = z.exp();
                    amplitude * e / (1.0 + e)
                }
            }
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            CurveFunction::Constant { .. } => "constant",
            CurveFunction::Polynomial { .. } => "polynomial",
            CurveFunction::Sigmoid { .. } => "sigmoid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_limits_and_midpoint() {
        let f = CurveFunction::Sigmoid {
            amplitude: 0.98,
            slope: 2.0,
            midpoint: 1.5,
        };
        assert!((f.eval(1.5) - 0.49).abs() < 1e-12);
        assert!((f.eval(50.0) - 0.98).abs() < 1e-12);
        assert!(f.eval(-1e6).abs() < 1e-12);
        assert!(f.eval(1e6).is_finite());
    }

    #[test]
    fn polynomial_uses_horner_order() {
        let f = CurveFunction::Polynomial {
            coefficients: vec![1.0, 2.0, 3.0],
        };
        assert!((f.eval(2.0) - 17.0).abs() < 1e-12);
        assert_eq!(CurveFunction::Polynomial { coefficients: vec![] }.eval(3.0), 0.0);
    }

    #[test]
    fn tagged_json_layout() {
        let f: CurveFunction = serde_json::from_str(r#"{"kind":"constant","value":0.9}"#).unwrap();
        assert_eq!(f.eval(7.0), 0.9);
        assert_eq!(f.kind_name(), "constant");
    }
}
