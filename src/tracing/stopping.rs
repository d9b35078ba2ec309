//! Conditions for terminating fiber growth.

use super::{ftr, probing::ProbedSample};
use crate::{error::ConfigError, geometry::Vec3, tensor::aniso::AnisoMetric};
use std::fmt;

#[cfg(feature = "serialization")]
use serde::Serialize;

/// Reason for terminating a fiber half or rejecting a whole fiber.
///
/// Also identifies the corresponding stop condition when toggling conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub enum StopReason {
    /// The anisotropy fell below the threshold.
    Anisotropy,
    /// The half-length exceeded the maximum.
    Length,
    /// The number of steps in the half exceeded the maximum.
    StepCount,
    /// The fit confidence fell below the threshold.
    Confidence,
    /// The radius of curvature fell below the threshold.
    Radius,
    /// The fiber left the field domain.
    OutOfBounds,
    /// The mixture fraction of the followed tensor fell below the threshold.
    Fraction,
    /// Neither half advanced beyond the seed.
    Stub,
    /// The whole fiber was shorter than the minimum length.
    MinLength,
    /// The whole fiber took fewer steps than the minimum.
    MinStepCount,
}

impl StopReason {
    /// Returns a short name describing the reason.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Anisotropy => "anisotropy",
            Self::Length => "length",
            Self::StepCount => "step count",
            Self::Confidence => "confidence",
            Self::Radius => "radius of curvature",
            Self::OutOfBounds => "out of bounds",
            Self::Fraction => "mixture fraction",
            Self::Stub => "stub",
            Self::MinLength => "too short",
            Self::MinStepCount => "too few steps",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stop condition together with its parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StopCondition {
    /// Stop when the given anisotropy measure falls below `threshold`.
    Anisotropy { metric: AnisoMetric, threshold: ftr },
    /// Stop when the length of a half exceeds `max`.
    Length { max: ftr },
    /// Stop when the number of steps of a half exceeds `max`.
    StepCount { max: usize },
    /// Stop when the fit confidence falls below `min`.
    Confidence { min: ftr },
    /// Stop when the radius of curvature falls below `min`.
    Radius { min: ftr },
    /// Stop when leaving the field domain (always in effect).
    OutOfBounds,
    /// Stop when the mixture fraction of the followed tensor falls below `min`.
    Fraction { min: ftr },
    /// Reject fibers where neither half advanced.
    Stub,
    /// Reject fibers shorter than `min`.
    MinLength { min: ftr },
    /// Reject fibers with fewer than `min` steps in total.
    MinStepCount { min: usize },
}

impl StopCondition {
    /// Returns the stop reason reported when the condition fires.
    pub fn reason(&self) -> StopReason {
        match self {
            Self::Anisotropy { .. } => StopReason::Anisotropy,
            Self::Length { .. } => StopReason::Length,
            Self::StepCount { .. } => StopReason::StepCount,
            Self::Confidence { .. } => StopReason::Confidence,
            Self::Radius { .. } => StopReason::Radius,
            Self::OutOfBounds => StopReason::OutOfBounds,
            Self::Fraction { .. } => StopReason::Fraction,
            Self::Stub => StopReason::Stub,
            Self::MinLength { .. } => StopReason::MinLength,
            Self::MinStepCount { .. } => StopReason::MinStepCount,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |parameter: &'static str, reason: &str| -> Result<(), ConfigError> {
            Err(ConfigError::InvalidParameter {
                parameter,
                reason: reason.to_string(),
            })
        };
        match *self {
            Self::Anisotropy { threshold, .. } if !threshold.is_finite() => {
                invalid("anisotropy threshold", "must be finite")
            }
            Self::Length { max } if !(max > 0.0) => {
                invalid("maximum half-length", "must be larger than zero")
            }
            Self::StepCount { max } if max == 0 => {
                invalid("maximum step count", "must be larger than zero")
            }
            Self::Confidence { min } if !min.is_finite() => {
                invalid("confidence threshold", "must be finite")
            }
            Self::Radius { min } if !(min >= 0.0 && min.is_finite()) => {
                invalid("minimum radius", "must be finite and non-negative")
            }
            Self::Fraction { min } if !(0.0..=1.0).contains(&min) => {
                invalid("minimum fraction", "must be in [0, 1]")
            }
            Self::MinLength { min } if !(min >= 0.0 && min.is_finite()) => {
                invalid("minimum fiber length", "must be finite and non-negative")
            }
            _ => Ok(()),
        }
    }
}

/// Progress of a fiber half at the current position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalfProgress {
    /// Number of steps taken so far.
    pub steps: usize,
    /// Length accumulated so far.
    pub length: ftr,
    /// Radius of curvature at the current position.
    pub radius: ftr,
}

impl HalfProgress {
    /// Progress at the seed point, before any step has been taken.
    pub fn at_seed() -> Self {
        Self {
            steps: 0,
            length: 0.0,
            radius: ftr::INFINITY,
        }
    }
}

/// The set of enabled stop conditions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StopSet {
    anisotropy: Option<(AnisoMetric, ftr)>,
    max_length: Option<ftr>,
    max_steps: Option<usize>,
    min_confidence: Option<ftr>,
    min_radius: Option<ftr>,
    out_of_bounds: bool,
    min_fraction: Option<ftr>,
    stub: bool,
    min_total_length: Option<ftr>,
    min_total_steps: Option<usize>,
}

impl StopSet {
    /// Enables the given condition, replacing the parameters of the same
    /// condition if it was already enabled.
    pub fn enable(&mut self, condition: StopCondition) -> Result<(), ConfigError> {
        condition.validate()?;
        match condition {
            StopCondition::Anisotropy { metric, threshold } => {
                self.anisotropy = Some((metric, threshold))
            }
            StopCondition::Length { max } => self.max_length = Some(max),
            StopCondition::StepCount { max } => self.max_steps = Some(max),
            StopCondition::Confidence { min } => self.min_confidence = Some(min),
            StopCondition::Radius { min } => self.min_radius = Some(min),
            StopCondition::OutOfBounds => self.out_of_bounds = true,
            StopCondition::Fraction { min } => self.min_fraction = Some(min),
            StopCondition::Stub => self.stub = true,
            StopCondition::MinLength { min } => self.min_total_length = Some(min),
            StopCondition::MinStepCount { min } => self.min_total_steps = Some(min),
        }
        Ok(())
    }

    /// Disables the condition with the given reason.
    pub fn disable(&mut self, reason: StopReason) {
        match reason {
            StopReason::Anisotropy => self.anisotropy = None,
            StopReason::Length => self.max_length = None,
            StopReason::StepCount => self.max_steps = None,
            StopReason::Confidence => self.min_confidence = None,
            StopReason::Radius => self.min_radius = None,
            StopReason::OutOfBounds => self.out_of_bounds = false,
            StopReason::Fraction => self.min_fraction = None,
            StopReason::Stub => self.stub = false,
            StopReason::MinLength => self.min_total_length = None,
            StopReason::MinStepCount => self.min_total_steps = None,
        }
    }

    /// Disables all conditions.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether the condition with the given reason is enabled.
    pub fn is_enabled(&self, reason: StopReason) -> bool {
        match reason {
            StopReason::Anisotropy => self.anisotropy.is_some(),
            StopReason::Length => self.max_length.is_some(),
            StopReason::StepCount => self.max_steps.is_some(),
            StopReason::Confidence => self.min_confidence.is_some(),
            StopReason::Radius => self.min_radius.is_some(),
            StopReason::OutOfBounds => self.out_of_bounds,
            StopReason::Fraction => self.min_fraction.is_some(),
            StopReason::Stub => self.stub,
            StopReason::MinLength => self.min_total_length.is_some(),
            StopReason::MinStepCount => self.min_total_steps.is_some(),
        }
    }

    /// Whether no condition is enabled.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns the maximum number of steps per half, if limited.
    pub fn max_steps(&self) -> Option<usize> {
        self.max_steps
    }

    /// Returns a copy where the number of steps per half is limited to at
    /// most `limit`.
    pub fn with_step_limit(&self, limit: usize) -> Self {
        let mut limited = self.clone();
        limited.max_steps = Some(self.max_steps.map_or(limit, |max| max.min(limit)));
        limited
    }

    /// Evaluates the per-step conditions at the current position of a half.
    ///
    /// # Parameters
    ///
    /// - `sample`: Probed tensor data at the current position.
    /// - `progress`: Accumulated progress of the half.
    ///
    /// # Returns
    ///
    /// The reason of the first condition that fires, or `None` if growth may continue.
    pub fn check(&self, sample: &ProbedSample, progress: &HalfProgress) -> Option<StopReason> {
        if let Some(min) = self.min_confidence {
            if sample.confidence() < min {
                return Some(StopReason::Confidence);
            }
        }
        if let Some(min) = self.min_radius {
            if progress.radius < min {
                return Some(StopReason::Radius);
            }
        }
        if let Some((metric, threshold)) = self.anisotropy {
            if sample.anisotropy(metric) < threshold {
                return Some(StopReason::Anisotropy);
            }
        }
        if let Some(max) = self.max_steps {
            if progress.steps > max {
                return Some(StopReason::StepCount);
            }
        }
        if let Some(max) = self.max_length {
            if progress.length > max {
                return Some(StopReason::Length);
            }
        }
        if let (Some(min), Some(fraction)) = (self.min_fraction, sample.fraction()) {
            if fraction < min {
                return Some(StopReason::Fraction);
            }
        }
        None
    }

    /// Evaluates the whole-fiber filters.
    ///
    /// # Parameters
    ///
    /// - `total_steps`: Number of steps taken by both halves together.
    /// - `total_length`: Length of both halves together.
    ///
    /// # Returns
    ///
    /// The reason for rejecting the fiber, or `None` if it is kept.
    pub fn check_whole(&self, total_steps: usize, total_length: ftr) -> Option<StopReason> {
        let mut rejection = None;
        if self.stub && total_steps == 0 {
            rejection = Some(StopReason::Stub);
        }
        if let Some(min) = self.min_total_steps {
            if total_steps < min {
                rejection = Some(StopReason::MinStepCount);
            }
        }
        if let Some(min) = self.min_total_length {
            if total_length < min {
                rejection = Some(StopReason::MinLength);
            }
        }
        rejection
    }
}

/// Estimates the radius of curvature from two consecutive step vectors.
///
/// Computed as `(|a + b|^2 + |a - b|^2) / (4 |a - b|)`, which for steps of
/// equal length `h` turning by the angle `t` equals `h / (2 sin(t / 2))`.
/// Parallel steps give an infinite radius.
pub fn curvature_radius(previous_step: &Vec3<ftr>, step: &Vec3<ftr>) -> ftr {
    let sum = previous_step + step;
    let difference = previous_step - step;
    let squared_sum = sum.squared_length();
    let squared_difference = difference.squared_length();
    let difference_length = squared_difference.sqrt();
    if difference_length > 0.0 {
        (squared_sum + squared_difference) / (4.0 * difference_length)
    } else {
        ftr::INFINITY
    }
}
