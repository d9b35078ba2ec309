//! Policies for computing the direction of the next step.

use super::{ftr, probing::ProbedSample, FiberHalf};
use crate::{error::ConfigError, geometry::Vec3, tensor::aniso::AnisoMetric};
use std::fmt;

/// Offset keeping the linear anisotropy of tensor lines finite.
const TENSOR_LINE_EPSILON: ftr = 1e-5;

/// Which eigenvector to follow, ranked by eigenvalue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EigenRank {
    /// Eigenvector of the largest eigenvalue.
    Principal = 0,
    /// Eigenvector of the middle eigenvalue.
    Secondary = 1,
    /// Eigenvector of the smallest eigenvalue.
    Tertiary = 2,
}

impl EigenRank {
    /// Returns the index of the eigenvector in descending eigenvalue order.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Strategy for computing the unit step direction from the local tensor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepPolicy {
    /// Follow the eigenvector of the given rank.
    Eigenvector(EigenRank),
    /// Blend the principal eigenvector with the incoming direction and the
    /// incoming direction deflected by the tensor, weighted by linear
    /// anisotropy. `weight` is the share of the deflected direction.
    TensorLine { weight: ftr },
    /// Placeholder for a pure tensor-line policy (not implemented).
    PureLine,
    /// Placeholder for Zhukov's oriented tensor reconstruction (not implemented).
    Zhukov,
}

impl StepPolicy {
    pub const DEFAULT_TENSOR_LINE_WEIGHT: ftr = 0.0;

    /// Creates the tensor-line policy with the default blend weight.
    pub fn tensor_line() -> Self {
        Self::TensorLine {
            weight: Self::DEFAULT_TENSOR_LINE_WEIGHT,
        }
    }

    /// Returns the name of the policy.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Eigenvector(EigenRank::Principal) => "principal eigenvector",
            Self::Eigenvector(EigenRank::Secondary) => "secondary eigenvector",
            Self::Eigenvector(EigenRank::Tertiary) => "tertiary eigenvector",
            Self::TensorLine { .. } => "tensor line",
            Self::PureLine => "pure tensor line",
            Self::Zhukov => "Zhukov",
        }
    }

    /// Checks that the policy is implemented and its parameters are valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Eigenvector(_) => Ok(()),
            Self::TensorLine { weight } => {
                if (0.0..=1.0).contains(&weight) {
                    Ok(())
                } else {
                    Err(ConfigError::InvalidParameter {
                        parameter: "tensor line weight",
                        reason: format!("must be in [0, 1], got {}", weight),
                    })
                }
            }
            Self::PureLine | Self::Zhukov => Err(ConfigError::UnimplementedPolicy(self.name())),
        }
    }

    /// Returns the rank of the eigenvector that orients the fiber at the seed.
    pub fn reference_rank(&self) -> EigenRank {
        match self {
            Self::Eigenvector(rank) => *rank,
            _ => EigenRank::Principal,
        }
    }

    /// Computes the oriented unit step direction for the given sample.
    ///
    /// # Parameters
    ///
    /// - `sample`: Tensor data in use at the evaluation position.
    /// - `orientation`: Orientation state of the fiber half.
    ///
    /// # Returns
    ///
    /// The unit step direction, oriented consistently with the half.
    pub fn direction(&self, sample: &ProbedSample, orientation: &Orientation) -> Vec3<ftr> {
        match *self {
            Self::Eigenvector(rank) => orientation.align(*sample.eigen().vector(rank.index())),
            Self::TensorLine { weight } => tensor_line_direction(sample, orientation, weight),
            // Rejected when configured.
            Self::PureLine | Self::Zhukov => {
                orientation.align(*sample.eigen().vector(EigenRank::Principal.index()))
            }
        }
    }
}

impl fmt::Display for StepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn tensor_line_direction(sample: &ProbedSample, orientation: &Orientation, weight: ftr) -> Vec3<ftr> {
    let principal = orientation.align(*sample.eigen().vector(0));

    let (incoming, deflected) = match orientation
        .previous_direction()
        .and_then(Vec3::normalized)
    {
        Some(incoming) => {
            let deflected = sample
                .tensor()
                .apply(&incoming)
                .normalized()
                .map_or(principal, |deflected| orientation.align(deflected));
            (incoming, deflected)
        }
        None => (principal, principal),
    };

    let values = sample.eigen().values();
    let linearity = (values[0] - values[1]) / (values[0] + TENSOR_LINE_EPSILON);
    let blended = &principal * linearity
        + &incoming * ((1.0 - linearity) * (1.0 - weight))
        + &deflected * ((1.0 - linearity) * weight);
    blended.normalized().unwrap_or(principal)
}

/// Orientation state of a fiber half, used to resolve the sign ambiguity
/// of eigenvectors.
#[derive(Clone, Copy, Debug)]
pub struct Orientation<'a> {
    half: FiberHalf,
    previous_direction: Option<&'a Vec3<ftr>>,
    seed_reference: &'a Vec3<ftr>,
}

impl<'a> Orientation<'a> {
    /// Creates a new orientation state.
    ///
    /// # Parameters
    ///
    /// - `half`: The half being traced.
    /// - `previous_direction`: The last accepted step of the half, if any.
    /// - `seed_reference`: Eigenvector recorded at the seed point.
    pub fn new(
        half: FiberHalf,
        previous_direction: Option<&'a Vec3<ftr>>,
        seed_reference: &'a Vec3<ftr>,
    ) -> Self {
        Self {
            half,
            previous_direction,
            seed_reference,
        }
    }

    /// Returns the last accepted step, if any.
    pub fn previous_direction(&self) -> Option<&'a Vec3<ftr>> {
        self.previous_direction
    }

    /// Returns the direction used to pick between candidate tensors.
    pub fn reference(&self) -> &'a Vec3<ftr> {
        self.previous_direction.unwrap_or(self.seed_reference)
    }

    /// Flips the given direction if needed to keep the half from reversing.
    ///
    /// Before the first step, the forward half follows the seed reference
    /// and the backward half goes against it. Afterwards, the direction is
    /// flipped if it points against the previous step.
    pub fn align(&self, mut direction: Vec3<ftr>) -> Vec3<ftr> {
        let flip = match self.previous_direction {
            Some(previous) => previous.dot(&direction) < 0.0,
            None => {
                let dot = self.seed_reference.dot(&direction);
                match self.half {
                    FiberHalf::Forward => dot < 0.0,
                    FiberHalf::Backward => dot > 0.0,
                }
            }
        };
        if flip {
            direction.reverse();
        }
        direction
    }
}

/// Anisotropy-dependent scaling of the step length.
///
/// The scale ramps from zero below `threshold - softness`, through a
/// parabola, to a line reaching one at unit anisotropy, and is blended with
/// a constant unit scale through `lerp_weight`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnisoSpeed {
    metric: AnisoMetric,
    lerp_weight: ftr,
    threshold: ftr,
    softness: ftr,
}

impl AnisoSpeed {
    /// Creates a new anisotropy speed function.
    ///
    /// # Parameters
    ///
    /// - `metric`: Anisotropy measure controlling the speed.
    /// - `lerp_weight`: Blend between no scaling (0) and the full ramp (1).
    /// - `threshold`: Anisotropy where the linear part of the ramp reaches zero.
    /// - `softness`: Half-width of the parabolic transition around the threshold.
    pub fn new(
        metric: AnisoMetric,
        lerp_weight: ftr,
        threshold: ftr,
        softness: ftr,
    ) -> Result<Self, ConfigError> {
        let invalid = |parameter: &'static str, reason: &str| ConfigError::InvalidParameter {
            parameter,
            reason: reason.to_string(),
        };
        if !(0.0..=1.0).contains(&lerp_weight) {
            return Err(invalid("aniso speed weight", "must be in [0, 1]"));
        }
        if !(threshold < 1.0 && threshold.is_finite()) {
            return Err(invalid("aniso speed threshold", "must be finite and below one"));
        }
        if !(softness >= 0.0 && softness.is_finite()) {
            return Err(invalid("aniso speed softness", "must be finite and non-negative"));
        }
        Ok(Self {
            metric,
            lerp_weight,
            threshold,
            softness,
        })
    }

    /// Returns the anisotropy measure controlling the speed.
    pub fn metric(&self) -> AnisoMetric {
        self.metric
    }

    /// Computes the step length scale for the given anisotropy value.
    pub fn scale(&self, anisotropy: ftr) -> ftr {
        let (t, d) = (self.threshold, self.softness);
        let a = 1.0 / (ftr::EPSILON + 4.0 * d * (1.0 - t));
        let y = anisotropy - t + d;
        let ramp = if anisotropy < t - d {
            0.0
        } else if anisotropy < t + d {
            a * y * y
        } else {
            (anisotropy - t) / (1.0 - t)
        };
        crate::num::lerp(self.lerp_weight, 1.0, ramp)
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{
        field::{FieldSample, TensorSample},
        geometry::Dim3::{X, Y},
        tensor::SymTensor3,
        tracing::probing::CandidateChoice,
    };
    use approx::assert_abs_diff_eq;

    fn probed(tensor: SymTensor3) -> ProbedSample {
        ProbedSample::from_field_sample(
            &FieldSample::Single(TensorSample::confident(tensor)),
            None,
            CandidateChoice::Requested(0),
            false,
        )
    }

    fn x_aligned() -> ProbedSample {
        probed(SymTensor3::new(1.0, 0.0, 0.0, 0.1, 0.0, 0.1))
    }

    #[test]
    fn halves_start_in_opposite_directions() {
        let reference = Vec3::new(1.0, 0.0, 0.0);
        let sample = x_aligned();
        let policy = StepPolicy::Eigenvector(EigenRank::Principal);
        let forward = policy.direction(&sample, &Orientation::new(FiberHalf::Forward, None, &reference));
        let backward =
            policy.direction(&sample, &Orientation::new(FiberHalf::Backward, None, &reference));
        assert_abs_diff_eq!(forward[X], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(backward[X], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn previous_direction_prevents_reversal() {
        let reference = Vec3::new(1.0, 0.0, 0.0);
        let previous = Vec3::new(-0.1, 0.0, 0.0);
        let orientation = Orientation::new(FiberHalf::Forward, Some(&previous), &reference);
        let direction = orientation.align(Vec3::new(1.0, 0.0, 0.0));
        assert!(direction.dot(&previous) > 0.0);
    }

    #[test]
    fn tensor_line_follows_eigenvector_in_linear_tensor() {
        let reference = Vec3::new(1.0, 0.0, 0.0);
        let previous = Vec3::new(0.6, 0.8, 0.0);
        let sample = probed(SymTensor3::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0));
        let policy = StepPolicy::TensorLine { weight: 0.5 };
        let direction = policy.direction(
            &sample,
            &Orientation::new(FiberHalf::Forward, Some(&previous), &reference),
        );
        assert_abs_diff_eq!(direction[X], 1.0, epsilon = 1e-4);
    }

    #[test]
    fn tensor_line_keeps_incoming_direction_in_isotropic_tensor() {
        let reference = Vec3::new(1.0, 0.0, 0.0);
        let previous = Vec3::new(0.0, 0.2, 0.0);
        let sample = probed(SymTensor3::isotropic(1.0));
        let direction = StepPolicy::tensor_line().direction(
            &sample,
            &Orientation::new(FiberHalf::Forward, Some(&previous), &reference),
        );
        assert_abs_diff_eq!(direction.length(), 1.0, epsilon = 1e-12);
        assert!(direction[Y] > 0.99);
    }

    #[test]
    fn unimplemented_policies_are_rejected() {
        assert_eq!(
            StepPolicy::Zhukov.validate(),
            Err(ConfigError::UnimplementedPolicy("Zhukov"))
        );
        assert!(StepPolicy::TensorLine { weight: 1.5 }.validate().is_err());
        assert!(StepPolicy::tensor_line().validate().is_ok());
    }

    #[test]
    fn aniso_speed_ramp() {
        let speed = AnisoSpeed::new(AnisoMetric::FA, 1.0, 0.4, 0.1).unwrap();
        assert_eq!(speed.scale(0.2), 0.0);
        assert_abs_diff_eq!(speed.scale(1.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(speed.scale(0.7), 0.5, epsilon = 1e-12);
        assert!(speed.scale(0.35) > 0.0 && speed.scale(0.35) < speed.scale(0.5));
        let unscaled = AnisoSpeed::new(AnisoMetric::FA, 0.0, 0.4, 0.1).unwrap();
        assert_eq!(unscaled.scale(0.1), 1.0);
    }
}
