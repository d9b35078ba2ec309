//! Errors produced while configuring a tracing context or tracing fibers.
//!
//! Normal termination of a fiber (leaving the field, a stop condition firing,
//! whole-fiber rejection) is never an error; it is recorded as a
//! [`StopReason`](crate::tracing::stopping::StopReason) in the result.

use crate::tracing::FiberHalf;
use thiserror::Error;

/// Invalid or incomplete tracing configuration.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    #[error("no step direction policy has been set")]
    PolicyNotSet,

    #[error("no integrator has been set")]
    IntegratorNotSet,

    #[error("no stop conditions have been enabled")]
    NoStopConditions,

    #[error("tracing context must be committed before tracing")]
    NotCommitted,

    #[error("invalid value for {parameter}: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },

    #[error("stopping on mixture fraction requires a two-tensor field source")]
    FractionRequiresDualTensors,

    #[error("step direction policy {0} is not implemented")]
    UnimplementedPolicy(&'static str),

    #[error("step direction policy {policy} is not supported for {source_kind} sources")]
    PolicyUnsupportedForSource {
        policy: &'static str,
        source_kind: &'static str,
    },

    #[error("diffusion-weighted model selection mode {0} is not implemented")]
    UnsupportedDwiMode(&'static str),

    #[error("anisotropy-dependent step size is not supported for diffusion-weighted sources")]
    AnisoSpeedUnsupportedForSource,

    #[error("direction index {index} is out of range for a seed with {count} direction(s)")]
    InvalidDirectionIndex { index: usize, count: usize },

    #[error("step count limit of {limit} must be below the step ceiling of {ceiling}")]
    StepLimitAboveCeiling { limit: usize, ceiling: usize },
}

/// Failure of a field sampler other than leaving its domain.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("field sampler failed: {message}")]
pub struct SamplerError {
    message: String,
}

impl SamplerError {
    /// Creates a new sampler error with the given message.
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Fatal failure while tracing a single fiber.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TraceError {
    #[error(transparent)]
    Sampler(#[from] SamplerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{half} half exceeded the step ceiling of {ceiling} steps")]
    StepCeilingExceeded { half: FiberHalf, ceiling: usize },
}
