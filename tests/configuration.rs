mod common;

use common::*;
use fibertrack::{
    error::{ConfigError, TraceError},
    geometry::{Mat3, Point3, Vec3},
    tensor::aniso::AnisoMetric,
    tracing::{
        DwiMode, EigenRank, FiberTracer, FieldSource, Integrator, StepPolicy, StopCondition,
        StopReason, TracingContext,
    },
};

const PRINCIPAL: StepPolicy = StepPolicy::Eigenvector(EigenRank::Principal);

fn configured(source: FieldSource) -> TracingContext {
    let mut context = TracingContext::new(source);
    context.configure(PRINCIPAL, Integrator::Euler, 0.5).unwrap();
    context
        .enable_stop(StopCondition::StepCount { max: 5 })
        .unwrap();
    context
}

#[test]
fn default_context_is_ready_for_tracing() {
    let context = TracingContext::with_defaults();
    assert!(context.is_committed());
    assert_eq!(context.policy(), Some(PRINCIPAL));
    assert_eq!(context.integrator(), Some(Integrator::Euler));
    assert_eq!(context.step_size(), TracingContext::DEFAULT_STEP_SIZE);
    assert!(context.stop_enabled(StopReason::Anisotropy));
    assert!(context.stop_enabled(StopReason::Length));
    assert!(context.stop_enabled(StopReason::StepCount));

    let mut tracer =
        FiberTracer::new(&context, uniform_field(Vec3::new(1.0, 0.0, 0.0), 2.0)).unwrap();
    let fiber = tracer.trace_single(&Point3::origin(), 0).unwrap();
    assert!(fiber.is_grown());
    assert_eq!(fiber.total_steps(), 2 * TracingContext::DEFAULT_MAX_STEPS);
}

#[test]
fn commit_requires_policy_integrator_and_stops() {
    let mut context = TracingContext::new(FieldSource::Tensor);
    assert_eq!(context.commit(), Err(ConfigError::PolicyNotSet));
    context.set_policy(PRINCIPAL).unwrap();
    assert_eq!(context.commit(), Err(ConfigError::IntegratorNotSet));
    context.set_integrator(Integrator::RungeKutta4);
    assert_eq!(context.commit(), Err(ConfigError::NoStopConditions));
    context
        .enable_stop(StopCondition::Length { max: 1.0 })
        .unwrap();
    assert_eq!(context.commit(), Ok(()));
}

#[test]
fn tracing_requires_a_committed_context() {
    let mut context = configured(FieldSource::Tensor);
    assert!(matches!(
        FiberTracer::new(&context, uniform_field(Vec3::new(1.0, 0.0, 0.0), 1.0)),
        Err(ConfigError::NotCommitted)
    ));
    context.commit().unwrap();
    context.disable_stop(StopReason::StepCount);
    assert!(!context.is_committed());
}

#[test]
fn fraction_stop_requires_two_tensor_source() {
    let mut single = configured(FieldSource::Tensor);
    assert_eq!(
        single.enable_stop(StopCondition::Fraction { min: 0.3 }),
        Err(ConfigError::FractionRequiresDualTensors)
    );
    let mut one_tensor = configured(FieldSource::Dwi(DwiMode::OneTensor));
    assert_eq!(
        one_tensor.enable_stop(StopCondition::Fraction { min: 0.3 }),
        Err(ConfigError::FractionRequiresDualTensors)
    );
    let mut two_tensor = configured(FieldSource::Dwi(DwiMode::TwoTensor));
    assert_eq!(
        two_tensor.enable_stop(StopCondition::Fraction { min: 0.3 }),
        Ok(())
    );
    assert_eq!(two_tensor.commit(), Ok(()));
}

#[test]
fn diffusion_weighted_sources_restrict_options() {
    let mut context = configured(FieldSource::Dwi(DwiMode::OneTensor));
    assert_eq!(
        context.set_aniso_speed(AnisoMetric::FA, 0.5, 0.2, 0.1),
        Err(ConfigError::AnisoSpeedUnsupportedForSource)
    );
    assert!(matches!(
        context.set_policy(StepPolicy::Eigenvector(EigenRank::Secondary)),
        Err(ConfigError::PolicyUnsupportedForSource { .. })
    ));
    assert_eq!(context.set_policy(StepPolicy::tensor_line()), Ok(()));
    assert_eq!(context.commit(), Ok(()));

    let mut blended = configured(FieldSource::Dwi(DwiMode::Blended));
    assert!(matches!(
        blended.commit(),
        Err(ConfigError::UnsupportedDwiMode(_))
    ));
}

#[test]
fn invalid_parameters_are_rejected() {
    let mut context = TracingContext::new(FieldSource::Tensor);
    assert!(matches!(
        context.set_step_size(0.0),
        Err(ConfigError::InvalidParameter { .. })
    ));
    assert!(matches!(
        context.set_policy(StepPolicy::TensorLine { weight: 1.5 }),
        Err(ConfigError::InvalidParameter { .. })
    ));
    assert!(matches!(
        context.set_policy(StepPolicy::Zhukov),
        Err(ConfigError::UnimplementedPolicy(_))
    ));
    assert!(matches!(
        context.enable_stop(StopCondition::Length { max: -1.0 }),
        Err(ConfigError::InvalidParameter { .. })
    ));
    assert!(matches!(
        context.set_measurement_frame(Mat3::from_rows([Vec3::zero(); 3])),
        Err(ConfigError::InvalidParameter { .. })
    ));
    assert!(matches!(
        context.set_step_ceiling(0),
        Err(ConfigError::InvalidParameter { .. })
    ));
}

#[test]
fn runaway_fiber_hits_step_ceiling() {
    let mut context = TracingContext::new(FieldSource::Tensor);
    context.configure(PRINCIPAL, Integrator::Euler, 0.1).unwrap();
    context
        .enable_stop(StopCondition::Confidence { min: 0.5 })
        .unwrap();
    context.set_step_ceiling(50).unwrap();
    context.commit().unwrap();

    let mut tracer =
        FiberTracer::new(&context, circular_field(3.0)).unwrap();
    assert!(matches!(
        tracer.trace_single(&Point3::new(1.0, 0.0, 0.0), 0),
        Err(TraceError::StepCeilingExceeded { ceiling: 50, .. })
    ));
}
