#![allow(dead_code)]

use fibertrack::{
    field::{function::FunctionSampler3, regular::RegularTensorVolume3, FieldSample, TensorSample},
    geometry::{
        Dim3::{X, Y},
        In3D, Point3, Vec3,
    },
    tensor::SymTensor3,
    tracing::{
        ftr, FieldSource, FiberHalf, FiberResult, Integrator, StepPolicy, StopCondition,
        TracingContext,
    },
};

pub const MAJOR: ftr = 1.0;
pub const MINOR: ftr = 0.2;

/// Creates a prolate tensor with the given principal direction.
pub fn prolate_along(direction: &Vec3<ftr>, major: ftr, minor: ftr) -> SymTensor3 {
    let principal = direction.normalized().unwrap_or_else(|| Vec3::new(1.0, 0.0, 0.0));
    let helper = if principal[X].abs() < 0.9 {
        Vec3::new(1.0, 0.0, 0.0)
    } else {
        Vec3::new(0.0, 1.0, 0.0)
    };
    let mut second = principal.cross(&helper);
    second.normalize();
    let third = principal.cross(&second);
    SymTensor3::from_eigen([major, minor, minor], &[principal, second, third])
}

fn cube(bound: ftr) -> (Point3<ftr>, Point3<ftr>) {
    (
        Point3::new(-bound, -bound, -bound),
        Point3::new(bound, bound, bound),
    )
}

/// Field with the same prolate tensor everywhere inside a cube.
pub fn uniform_field(direction: Vec3<ftr>, bound: ftr) -> FunctionSampler3 {
    let tensor = prolate_along(&direction, MAJOR, MINOR);
    let (lower, upper) = cube(bound);
    FunctionSampler3::new(
        move |_| FieldSample::Single(TensorSample::confident(tensor)),
        lower,
        upper,
    )
}

/// Field with prolate tensors tangent to circles around the z-axis.
pub fn circular_field(bound: ftr) -> FunctionSampler3 {
    let (lower, upper) = cube(bound);
    FunctionSampler3::new(
        |position| {
            let tangent = Vec3::new(-position[Y], position[X], 0.0);
            FieldSample::Single(TensorSample::confident(prolate_along(
                &tangent, MAJOR, MINOR,
            )))
        },
        lower,
        upper,
    )
}

/// Field that is prolate along x where `x < edge` and isotropic elsewhere.
pub fn anisotropic_below(edge: ftr, bound: ftr) -> FunctionSampler3 {
    let prolate = prolate_along(&Vec3::new(1.0, 0.0, 0.0), MAJOR, MINOR);
    let (lower, upper) = cube(bound);
    FunctionSampler3::new(
        move |position| {
            let tensor = if position[X] < edge {
                prolate
            } else {
                SymTensor3::isotropic(MAJOR)
            };
            FieldSample::Single(TensorSample::confident(tensor))
        },
        lower,
        upper,
    )
}

/// Field that is prolate along x only within `|x| < half_width`.
pub fn anisotropic_slab(half_width: ftr, bound: ftr) -> FunctionSampler3 {
    let prolate = prolate_along(&Vec3::new(1.0, 0.0, 0.0), MAJOR, MINOR);
    let (lower, upper) = cube(bound);
    FunctionSampler3::new(
        move |position| {
            let tensor = if position[X].abs() < half_width {
                prolate
            } else {
                SymTensor3::isotropic(MAJOR)
            };
            FieldSample::Single(TensorSample::confident(tensor))
        },
        lower,
        upper,
    )
}

/// Uniform x-aligned field where every fit has the given confidence.
pub fn unconfident_field(confidence: ftr, bound: ftr) -> FunctionSampler3 {
    let tensor = prolate_along(&Vec3::new(1.0, 0.0, 0.0), MAJOR, MINOR);
    let (lower, upper) = cube(bound);
    FunctionSampler3::new(
        move |_| FieldSample::Single(TensorSample::new(confidence, tensor)),
        lower,
        upper,
    )
}

/// Two-tensor field with an x-aligned and a y-aligned candidate everywhere,
/// where `fraction` is the weight of the x-aligned one.
pub fn crossing_field(fraction: ftr, bound: ftr) -> FunctionSampler3 {
    let candidates = [
        prolate_along(&Vec3::new(1.0, 0.0, 0.0), MAJOR, MINOR),
        prolate_along(&Vec3::new(0.0, 1.0, 0.0), MAJOR, MINOR),
    ];
    let (lower, upper) = cube(bound);
    FunctionSampler3::new(
        move |_| FieldSample::Dual {
            confidence: 1.0,
            candidates,
            fraction,
        },
        lower,
        upper,
    )
}

/// Like `crossing_field`, but with the candidate labels swapped where `|x| > swap_at`.
pub fn swapped_crossing_field(fraction: ftr, swap_at: ftr, bound: ftr) -> FunctionSampler3 {
    let x_aligned = prolate_along(&Vec3::new(1.0, 0.0, 0.0), MAJOR, MINOR);
    let y_aligned = prolate_along(&Vec3::new(0.0, 1.0, 0.0), MAJOR, MINOR);
    let (lower, upper) = cube(bound);
    FunctionSampler3::new(
        move |position| {
            if position[X].abs() > swap_at {
                FieldSample::Dual {
                    confidence: 1.0,
                    candidates: [y_aligned, x_aligned],
                    fraction: 1.0 - fraction,
                }
            } else {
                FieldSample::Dual {
                    confidence: 1.0,
                    candidates: [x_aligned, y_aligned],
                    fraction,
                }
            }
        },
        lower,
        upper,
    )
}

/// Field with the same weakly prolate x-aligned tensor everywhere.
pub fn weakly_anisotropic_field(bound: ftr) -> FunctionSampler3 {
    let tensor = prolate_along(&Vec3::new(1.0, 0.0, 0.0), MAJOR, 0.95 * MAJOR);
    let (lower, upper) = cube(bound);
    FunctionSampler3::new(
        move |_| FieldSample::Single(TensorSample::confident(tensor)),
        lower,
        upper,
    )
}

/// Regular grid volume with x-aligned tensors everywhere.
pub fn uniform_volume(origin: Point3<ftr>, spacing: ftr, size: usize) -> RegularTensorVolume3 {
    let tensor = prolate_along(&Vec3::new(1.0, 0.0, 0.0), MAJOR, MINOR);
    RegularTensorVolume3::from_function(
        origin,
        Vec3::new(spacing, spacing, spacing),
        In3D::same(size),
        move |_| FieldSample::Single(TensorSample::confident(tensor)),
    )
}

/// Creates a committed context with the given settings.
pub fn committed_context(
    source: FieldSource,
    policy: StepPolicy,
    integrator: Integrator,
    step_size: ftr,
    stops: &[StopCondition],
) -> TracingContext {
    let mut context = TracingContext::new(source);
    context.configure(policy, integrator, step_size).unwrap();
    for &stop in stops {
        context.enable_stop(stop).unwrap();
    }
    context.commit().unwrap();
    context
}

/// Returns the step vectors between consecutive fiber points.
pub fn steps(fiber: &FiberResult) -> Vec<Vec3<ftr>> {
    fiber
        .points()
        .windows(2)
        .map(|pair| &pair[1] - &pair[0])
        .collect()
}

/// Returns the polyline length of the points of the given half.
pub fn half_polyline_length(fiber: &FiberResult, half: FiberHalf) -> ftr {
    let points = match half {
        FiberHalf::Forward => &fiber.points()[..=fiber.seed_index()],
        FiberHalf::Backward => &fiber.points()[fiber.seed_index()..],
    };
    points
        .windows(2)
        .map(|pair| pair[0].distance_to(&pair[1]))
        .sum()
}
