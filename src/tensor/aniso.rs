//! Scalar anisotropy measures computed from tensor eigenvalues.

use crate::tracing::ftr;
use std::fmt;

#[cfg(feature = "serialization")]
use serde::Serialize;

const SQRT6: ftr = 2.449_489_742_783_178;

/// Scalar measures of the shape of a diffusion ellipsoid.
///
/// All measures are pure functions of the three eigenvalues sorted in
/// descending order. The `*1` shape measures are normalized by the trace,
/// the `*2` measures by the largest eigenvalue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub enum AnisoMetric {
    /// Linear anisotropy, `(e0 - e1) / trace`.
    Cl1,
    /// Planar anisotropy, `2 (e1 - e2) / trace`.
    Cp1,
    /// Total anisotropy, `Cl1 + Cp1`.
    Ca1,
    /// Minimum of `Cl1` and `Cp1`.
    Clpmin1,
    /// Spherical isotropy, `3 e2 / trace`.
    Cs1,
    /// Planar over total anisotropy of the deviatoric eigenvalues.
    Ct1,
    /// Linear anisotropy, `(e0 - e1) / e0`.
    Cl2,
    /// Planar anisotropy, `(e1 - e2) / e0`.
    Cp2,
    /// Total anisotropy, `(e0 - e2) / e0`.
    Ca2,
    /// Minimum of `Cl2` and `Cp2`.
    Clpmin2,
    /// Spherical isotropy, `e2 / e0`.
    Cs2,
    /// `(e1 - e2) / (e0 - e2)`.
    Ct2,
    /// Relative anisotropy.
    RA,
    /// Fractional anisotropy.
    FA,
    /// Volume fraction, `1 - e0 e1 e2 / mean^3`.
    VF,
    /// Trace.
    Tr,
    /// Determinant.
    Det,
    /// Largest eigenvalue.
    Eval0,
    /// Middle eigenvalue.
    Eval1,
    /// Smallest eigenvalue.
    Eval2,
}

impl AnisoMetric {
    /// Evaluates the measure for the given eigenvalues.
    ///
    /// # Parameters
    ///
    /// - `values`: Eigenvalues in descending order.
    ///
    /// # Returns
    ///
    /// The value of the measure, or zero where its normalization vanishes.
    pub fn evaluate(&self, values: &[ftr; 3]) -> ftr {
        let [e0, e1, e2] = *values;
        let trace = e0 + e1 + e2;
        let positive_trace = trace.max(0.0);
        let positive_e0 = e0.max(0.0);
        let by_trace = |numerator: ftr| {
            if positive_trace != 0.0 {
                numerator / positive_trace
            } else {
                0.0
            }
        };
        let by_e0 = |numerator: ftr| {
            if positive_e0 != 0.0 {
                numerator / positive_e0
            } else {
                0.0
            }
        };
        let squared_deviation = || {
            let mean = trace / 3.0;
            (mean - e0).powi(2) + (mean - e1).powi(2) + (mean - e2).powi(2)
        };

        match self {
            Self::Cl1 => by_trace(e0 - e1),
            Self::Cp1 => by_trace(2.0 * (e1 - e2)),
            Self::Ca1 => by_trace(e0 + e1 - 2.0 * e2),
            Self::Clpmin1 => by_trace(e0 - e1).min(by_trace(2.0 * (e1 - e2))),
            Self::Cs1 => by_trace(3.0 * e2),
            Self::Ct1 => {
                let mean = trace / 3.0;
                let (d0, d1, d2) = (e0 - mean, e1 - mean, e2 - mean);
                let denominator = d0 + d1 - 2.0 * d2;
                if denominator != 0.0 {
                    2.0 * (d1 - d2) / denominator
                } else {
                    0.0
                }
            }
            Self::Cl2 => by_e0(e0 - e1),
            Self::Cp2 => by_e0(e1 - e2),
            Self::Ca2 => by_e0(e0 - e2),
            Self::Clpmin2 => by_e0(e0 - e1).min(by_e0(e1 - e2)),
            Self::Cs2 => by_e0(e2),
            Self::Ct2 => {
                let denominator = e0 - e2;
                if denominator != 0.0 {
                    (e1 - e2) / denominator
                } else {
                    0.0
                }
            }
            Self::RA => {
                let mean = trace / 3.0;
                if mean != 0.0 {
                    squared_deviation().sqrt() / (mean * SQRT6)
                } else {
                    0.0
                }
            }
            Self::FA => {
                let denominator = 2.0 * (e0 * e0 + e1 * e1 + e2 * e2);
                if denominator != 0.0 {
                    (3.0 * squared_deviation() / denominator).sqrt()
                } else {
                    0.0
                }
            }
            Self::VF => {
                let mean_cubed = (trace / 3.0).powi(3);
                1.0 - if mean_cubed != 0.0 {
                    e0 * e1 * e2 / mean_cubed
                } else {
                    0.0
                }
            }
            Self::Tr => trace,
            Self::Det => e0 * e1 * e2,
            Self::Eval0 => e0,
            Self::Eval1 => e1,
            Self::Eval2 => e2,
        }
    }

    /// Returns the conventional short name of the measure.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cl1 => "Cl1",
            Self::Cp1 => "Cp1",
            Self::Ca1 => "Ca1",
            Self::Clpmin1 => "Clpmin1",
            Self::Cs1 => "Cs1",
            Self::Ct1 => "Ct1",
            Self::Cl2 => "Cl2",
            Self::Cp2 => "Cp2",
            Self::Ca2 => "Ca2",
            Self::Clpmin2 => "Clpmin2",
            Self::Cs2 => "Cs2",
            Self::Ct2 => "Ct2",
            Self::RA => "RA",
            Self::FA => "FA",
            Self::VF => "VF",
            Self::Tr => "Tr",
            Self::Det => "Det",
            Self::Eval0 => "eval0",
            Self::Eval1 => "eval1",
            Self::Eval2 => "eval2",
        }
    }
}

impl fmt::Display for AnisoMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_abs_diff_eq;

    const LINEAR: [ftr; 3] = [1.0, 0.0, 0.0];
    const ISOTROPIC: [ftr; 3] = [2.0, 2.0, 2.0];

    #[test]
    fn fractional_anisotropy_spans_unit_interval() {
        assert_abs_diff_eq!(AnisoMetric::FA.evaluate(&LINEAR), 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(AnisoMetric::FA.evaluate(&ISOTROPIC), 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(AnisoMetric::FA.evaluate(&[0.0; 3]), 0.0);
    }

    #[test]
    fn westin_shape_measures_sum_to_one() {
        let values = [1.7, 0.6, 0.2];
        let sum = AnisoMetric::Cl1.evaluate(&values)
            + AnisoMetric::Cp1.evaluate(&values)
            + AnisoMetric::Cs1.evaluate(&values);
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(
            AnisoMetric::Ca1.evaluate(&values),
            1.0 - AnisoMetric::Cs1.evaluate(&values),
            epsilon = 1e-14
        );
    }

    #[test]
    fn eigenvalue_normalized_measures() {
        let values = [4.0, 2.0, 1.0];
        assert_abs_diff_eq!(AnisoMetric::Cl2.evaluate(&values), 0.5);
        assert_abs_diff_eq!(AnisoMetric::Cp2.evaluate(&values), 0.25);
        assert_abs_diff_eq!(AnisoMetric::Clpmin2.evaluate(&values), 0.25);
        assert_abs_diff_eq!(AnisoMetric::Cs2.evaluate(&values), 0.25);
        assert_abs_diff_eq!(AnisoMetric::Ct2.evaluate(&values), 1.0 / 3.0);
        assert_abs_diff_eq!(AnisoMetric::Det.evaluate(&values), 8.0);
        assert_abs_diff_eq!(AnisoMetric::Tr.evaluate(&values), 7.0);
    }

    #[test]
    fn isotropic_tensor_has_no_relative_anisotropy() {
        assert_abs_diff_eq!(AnisoMetric::RA.evaluate(&ISOTROPIC), 0.0);
        assert_abs_diff_eq!(AnisoMetric::VF.evaluate(&ISOTROPIC), 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(AnisoMetric::Ct1.evaluate(&ISOTROPIC), 0.0);
    }
}
