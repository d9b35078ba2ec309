//! Configuration of fiber tracing.

use super::{
    direction::{AnisoSpeed, EigenRank, StepPolicy},
    ftr,
    integration::Integrator,
    stopping::{StopCondition, StopReason, StopSet},
};
use crate::{
    error::ConfigError,
    field::{SampleQuery, TensorModel},
    geometry::Mat3,
    io::Verbosity,
    tensor::aniso::AnisoMetric,
};
use std::fmt;

/// How a diffusion-weighted source models each position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DwiMode {
    /// Follow a single fitted tensor.
    OneTensor,
    /// Follow one of two fitted tensors.
    TwoTensor,
    /// Blend one- and two-tensor fits (not implemented).
    Blended,
}

impl DwiMode {
    fn name(&self) -> &'static str {
        match self {
            Self::OneTensor => "one-tensor",
            Self::TwoTensor => "two-tensor",
            Self::Blended => "blended",
        }
    }
}

/// Kind of field the fibers are traced through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldSource {
    /// A field of fitted single tensors.
    Tensor,
    /// A field of diffusion-weighted measurements fitted on the fly.
    Dwi(DwiMode),
}

impl FieldSource {
    /// Returns the tensor model needed from the sampler.
    pub fn model(&self) -> TensorModel {
        match self {
            Self::Dwi(DwiMode::TwoTensor) => TensorModel::Dual,
            _ => TensorModel::Single,
        }
    }

    /// Whether the source is diffusion-weighted.
    pub fn is_dwi(&self) -> bool {
        matches!(self, Self::Dwi(_))
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Tensor => "tensor",
            Self::Dwi(_) => "diffusion-weighted",
        }
    }
}

impl fmt::Display for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tensor => f.write_str("tensor"),
            Self::Dwi(mode) => write!(f, "diffusion-weighted ({})", mode.name()),
        }
    }
}

/// Configuration shared by all fibers traced through a field.
///
/// The context is configured through its setters and must then be
/// committed before tracing. Every setter invalidates an earlier commit.
#[derive(Clone, Debug)]
pub struct TracingContext {
    source: FieldSource,
    policy: Option<StepPolicy>,
    integrator: Option<Integrator>,
    step_size: ftr,
    stops: StopSet,
    aniso_speed: Option<AnisoSpeed>,
    measurement_frame: Option<Mat3<ftr>>,
    use_index_space: bool,
    step_ceiling: usize,
    verbosity: Verbosity,
    committed_query: Option<SampleQuery>,
}

impl TracingContext {
    pub const DEFAULT_STEP_SIZE: ftr = 0.01;
    pub const DEFAULT_STEP_CEILING: usize = 10240;
    pub const DEFAULT_MAX_STEPS: usize = 100;
    pub const DEFAULT_MAX_HALF_LENGTH: ftr = 3.0;
    pub const DEFAULT_ANISO_METRIC: AnisoMetric = AnisoMetric::FA;
    pub const DEFAULT_ANISO_THRESHOLD: ftr = 0.1;

    /// Creates a new unconfigured context for the given kind of field.
    pub fn new(source: FieldSource) -> Self {
        Self {
            source,
            policy: None,
            integrator: None,
            step_size: Self::DEFAULT_STEP_SIZE,
            stops: StopSet::default(),
            aniso_speed: None,
            measurement_frame: None,
            use_index_space: false,
            step_ceiling: Self::DEFAULT_STEP_CEILING,
            verbosity: Verbosity::default(),
            committed_query: None,
        }
    }

    /// Creates a context for single-tensor fields that traces along the
    /// principal eigenvector with Euler integration, stopping on default
    /// anisotropy, half-length and step count limits. The context is committed.
    pub fn with_defaults() -> Self {
        let mut context = Self::new(FieldSource::Tensor);
        context.policy = Some(StepPolicy::Eigenvector(EigenRank::Principal));
        context.integrator = Some(Integrator::Euler);
        context.stops = Self::default_stops();
        context.committed_query = Some(context.build_query());
        context
    }

    fn default_stops() -> StopSet {
        let mut stops = StopSet::default();
        for condition in [
            StopCondition::Anisotropy {
                metric: Self::DEFAULT_ANISO_METRIC,
                threshold: Self::DEFAULT_ANISO_THRESHOLD,
            },
            StopCondition::Length {
                max: Self::DEFAULT_MAX_HALF_LENGTH,
            },
            StopCondition::StepCount {
                max: Self::DEFAULT_MAX_STEPS,
            },
        ] {
            let enabled = stops.enable(condition);
            debug_assert!(enabled.is_ok());
        }
        stops
    }

    /// Sets the step direction policy, integrator and step size in one go.
    pub fn configure(
        &mut self,
        policy: StepPolicy,
        integrator: Integrator,
        step_size: ftr,
    ) -> Result<(), ConfigError> {
        self.check_policy(&policy)?;
        Self::check_step_size(step_size)?;
        self.policy = Some(policy);
        self.integrator = Some(integrator);
        self.step_size = step_size;
        self.invalidate();
        Ok(())
    }

    /// Sets the step direction policy.
    pub fn set_policy(&mut self, policy: StepPolicy) -> Result<(), ConfigError> {
        self.check_policy(&policy)?;
        self.policy = Some(policy);
        self.invalidate();
        Ok(())
    }

    /// Sets the numerical integrator.
    pub fn set_integrator(&mut self, integrator: Integrator) {
        self.integrator = Some(integrator);
        self.invalidate();
    }

    /// Sets the world space distance advanced per unit step direction.
    pub fn set_step_size(&mut self, step_size: ftr) -> Result<(), ConfigError> {
        Self::check_step_size(step_size)?;
        self.step_size = step_size;
        self.invalidate();
        Ok(())
    }

    /// Enables the given stop condition, replacing earlier parameters for it.
    pub fn enable_stop(&mut self, condition: StopCondition) -> Result<(), ConfigError> {
        if condition.reason() == StopReason::Fraction && self.source.model() != TensorModel::Dual {
            return Err(ConfigError::FractionRequiresDualTensors);
        }
        self.stops.enable(condition)?;
        self.invalidate();
        Ok(())
    }

    /// Disables the stop condition with the given reason.
    pub fn disable_stop(&mut self, reason: StopReason) {
        self.stops.disable(reason);
        self.invalidate();
    }

    /// Disables all stop conditions.
    pub fn reset_stops(&mut self) {
        self.stops.reset();
        self.invalidate();
    }

    /// Whether the stop condition with the given reason is enabled.
    pub fn stop_enabled(&self, reason: StopReason) -> bool {
        self.stops.is_enabled(reason)
    }

    /// Scales step lengths by a function of the local anisotropy.
    pub fn set_aniso_speed(
        &mut self,
        metric: AnisoMetric,
        lerp_weight: ftr,
        threshold: ftr,
        softness: ftr,
    ) -> Result<(), ConfigError> {
        if self.source.is_dwi() {
            return Err(ConfigError::AnisoSpeedUnsupportedForSource);
        }
        self.aniso_speed = Some(AnisoSpeed::new(metric, lerp_weight, threshold, softness)?);
        self.invalidate();
        Ok(())
    }

    /// Stops scaling step lengths by anisotropy.
    pub fn reset_aniso_speed(&mut self) {
        self.aniso_speed = None;
        self.invalidate();
    }

    /// Sets the measurement frame `M` that probed tensors `T` are
    /// transformed with, giving `M T M^T`.
    pub fn set_measurement_frame(&mut self, frame: Mat3<ftr>) -> Result<(), ConfigError> {
        if !frame.is_finite() || frame.determinant() == 0.0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "measurement frame",
                reason: "must be finite and invertible".to_string(),
            });
        }
        self.measurement_frame = Some(frame);
        self.invalidate();
        Ok(())
    }

    /// Removes the measurement frame.
    pub fn reset_measurement_frame(&mut self) {
        self.measurement_frame = None;
        self.invalidate();
    }

    /// Sets whether seeds and output points are in the index space of the
    /// sampler rather than in world space.
    pub fn set_use_index_space(&mut self, use_index_space: bool) {
        self.use_index_space = use_index_space;
        self.invalidate();
    }

    /// Sets the number of steps per half beyond which tracing fails.
    pub fn set_step_ceiling(&mut self, step_ceiling: usize) -> Result<(), ConfigError> {
        if step_ceiling == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "step ceiling",
                reason: "must be larger than zero".to_string(),
            });
        }
        self.step_ceiling = step_ceiling;
        self.invalidate();
        Ok(())
    }

    /// Sets how much status output to print while tracing.
    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.verbosity = verbosity;
    }

    /// Validates the configuration and prepares it for tracing.
    pub fn commit(&mut self) -> Result<(), ConfigError> {
        let policy = self.policy.ok_or(ConfigError::PolicyNotSet)?;
        if self.integrator.is_none() {
            return Err(ConfigError::IntegratorNotSet);
        }
        if self.stops.is_empty() {
            return Err(ConfigError::NoStopConditions);
        }
        if let Some(limit) = self.stops.max_steps() {
            if limit >= self.step_ceiling {
                return Err(ConfigError::StepLimitAboveCeiling {
                    limit,
                    ceiling: self.step_ceiling,
                });
            }
        }
        if let FieldSource::Dwi(DwiMode::Blended) = self.source {
            return Err(ConfigError::UnsupportedDwiMode(DwiMode::Blended.name()));
        }
        self.check_policy(&policy)?;
        if self.source.is_dwi() && self.aniso_speed.is_some() {
            return Err(ConfigError::AnisoSpeedUnsupportedForSource);
        }
        if self.stops.is_enabled(StopReason::Fraction) && self.source.model() != TensorModel::Dual {
            return Err(ConfigError::FractionRequiresDualTensors);
        }
        self.committed_query = Some(self.build_query());
        if self.verbosity.print_messages() {
            println!(
                "Committed {} tracing with {} policy, {} integration and step size {}",
                self.source,
                policy,
                self.integrator().map_or("no", |integrator| integrator.name()),
                self.step_size
            );
        }
        Ok(())
    }

    fn build_query(&self) -> SampleQuery {
        let query = SampleQuery::new(self.source.model());
        if self.stops.is_enabled(StopReason::Confidence) {
            query.with_confidence()
        } else {
            query
        }
    }

    fn check_policy(&self, policy: &StepPolicy) -> Result<(), ConfigError> {
        policy.validate()?;
        let supported = match self.source {
            FieldSource::Tensor => true,
            FieldSource::Dwi(_) => matches!(
                policy,
                StepPolicy::Eigenvector(EigenRank::Principal) | StepPolicy::TensorLine { .. }
            ),
        };
        if supported {
            Ok(())
        } else {
            Err(ConfigError::PolicyUnsupportedForSource {
                policy: policy.name(),
                source_kind: self.source.name(),
            })
        }
    }

    fn check_step_size(step_size: ftr) -> Result<(), ConfigError> {
        if step_size > 0.0 && step_size.is_finite() {
            Ok(())
        } else {
            Err(ConfigError::InvalidParameter {
                parameter: "step size",
                reason: format!("must be finite and larger than zero, got {}", step_size),
            })
        }
    }

    fn invalidate(&mut self) {
        self.committed_query = None;
    }

    /// Returns the kind of field.
    pub fn source(&self) -> FieldSource {
        self.source
    }

    /// Returns the step direction policy, if set.
    pub fn policy(&self) -> Option<StepPolicy> {
        self.policy
    }

    /// Returns the integrator, if set.
    pub fn integrator(&self) -> Option<Integrator> {
        self.integrator
    }

    /// Returns the step size.
    pub fn step_size(&self) -> ftr {
        self.step_size
    }

    /// Returns the enabled stop conditions.
    pub fn stops(&self) -> &StopSet {
        &self.stops
    }

    /// Returns the anisotropy speed function, if enabled.
    pub fn aniso_speed(&self) -> Option<&AnisoSpeed> {
        self.aniso_speed.as_ref()
    }

    /// Returns the measurement frame, if set.
    pub fn measurement_frame(&self) -> Option<&Mat3<ftr>> {
        self.measurement_frame.as_ref()
    }

    /// Whether seeds and points are in index space.
    pub fn uses_index_space(&self) -> bool {
        self.use_index_space
    }

    /// Returns the step ceiling.
    pub fn step_ceiling(&self) -> usize {
        self.step_ceiling
    }

    /// Returns the verbosity.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Returns the sample query built by the last commit, if still valid.
    pub fn committed_query(&self) -> Option<&SampleQuery> {
        self.committed_query.as_ref()
    }

    /// Whether the context is committed and ready for tracing.
    pub fn is_committed(&self) -> bool {
        self.committed_query.is_some()
    }

    /// Returns the number of distinct directions traced from each seed.
    pub fn direction_count(&self) -> usize {
        match self.source {
            FieldSource::Dwi(DwiMode::TwoTensor) => 2,
            _ => 1,
        }
    }
}
