mod common;

use common::*;
use fibertrack::{
    geometry::{Dim3, Point3, Vec3},
    tracing::{
        ftr, DwiMode, EigenRank, FiberTracer, FieldSource, Integrator, StepPolicy, StopCondition,
        StopReason,
    },
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const PRINCIPAL: StepPolicy = StepPolicy::Eigenvector(EigenRank::Principal);

fn random_seeds(count: usize, extent: ftr) -> Vec<Point3<ftr>> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..count)
        .map(|_| {
            Point3::new(
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
            )
        })
        .collect()
}

#[test]
fn histogram_accounts_for_every_seed() {
    const BOUND: ftr = 2.0;
    let context = committed_context(
        FieldSource::Tensor,
        PRINCIPAL,
        Integrator::Euler,
        0.5,
        &[StopCondition::StepCount { max: 2 }],
    );
    let tracer = FiberTracer::new(&context, uniform_field(Vec3::new(0.0, 1.0, 0.0), BOUND)).unwrap();
    let seeds = random_seeds(200, 3.0);
    let outside = seeds
        .iter()
        .filter(|seed| Dim3::slice().iter().any(|&dim| seed[dim].abs() > BOUND))
        .count();
    assert!(outside > 0 && outside < seeds.len());

    let set = tracer.trace_batch(&seeds);
    let statistics = set.statistics();
    assert_eq!(statistics.seed_count(), 200);
    assert_eq!(statistics.fiber_count(), 200);
    assert_eq!(statistics.error_count(), 0);
    assert_eq!(statistics.nowhere_count(StopReason::OutOfBounds), outside);
    assert_eq!(statistics.grown_count(), seeds.len() - outside);
    assert_eq!(
        statistics.nowhere_reasons().values().sum::<usize>() + statistics.grown_count(),
        statistics.fiber_count()
    );
    assert_eq!(
        statistics.half_stop_reasons().values().sum::<usize>(),
        2 * statistics.grown_count()
    );

    for (fiber, seed) in set.fibers().iter().zip(&seeds) {
        let result = fiber.result().unwrap();
        assert_eq!(result.seed(), seed);
        if result.is_grown() {
            assert!(result.points().len() <= 5);
            assert_eq!(&result.points()[result.seed_index()], seed);
        }
    }
    assert_eq!(
        set.total_vertex_count(),
        set.grown().map(|fiber| fiber.points().len()).sum::<usize>()
    );
}

#[test]
fn two_tensor_batch_traces_both_directions_per_seed() {
    let context = committed_context(
        FieldSource::Dwi(DwiMode::TwoTensor),
        PRINCIPAL,
        Integrator::Midpoint,
        0.25,
        &[StopCondition::StepCount { max: 3 }],
    );
    let tracer = FiberTracer::new(&context, crossing_field(0.7, 4.0)).unwrap();
    let seeds = random_seeds(10, 1.0);
    let set = tracer.trace_batch(&seeds);

    assert_eq!(set.len(), 20);
    for (index, fiber) in set.fibers().iter().enumerate() {
        assert_eq!(fiber.seed_index(), index / 2);
        assert_eq!(fiber.direction_index(), index % 2);
        assert_eq!(fiber.direction_count(), 2);
        let result = fiber.result().unwrap();
        assert_eq!(result.points().len(), 7);
        let span = &result.points()[6] - &result.points()[0];
        let axis = if fiber.direction_index() == 0 {
            Dim3::X
        } else {
            Dim3::Y
        };
        approx::assert_abs_diff_eq!(span[axis].abs(), 1.5, epsilon = 1e-12);
    }
    assert_eq!(set.statistics().grown_count(), 20);
    assert_eq!(set.total_vertex_count(), 20 * 7);
}
