//! Growing whole fibers from seed points.

use super::{
    context::TracingContext,
    direction::{Orientation, StepPolicy},
    ftr,
    probing::{self, CandidateChoice, ProbedSample},
    stopping::{curvature_radius, HalfProgress, StopReason, StopSet},
    FiberHalf,
};
use crate::{
    error::{ConfigError, SamplerError, TraceError},
    field::{SampleQuery, TensorSampler3},
    geometry::{Point3, Vec3},
};

#[cfg(feature = "serialization")]
use serde::Serialize;

/// Accumulated state of a fiber half after tracing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct HalfSummary {
    length: ftr,
    steps: usize,
    stop_reason: Option<StopReason>,
}

impl HalfSummary {
    /// Returns the length of the half.
    pub fn length(&self) -> ftr {
        self.length
    }

    /// Returns the number of accepted steps of the half.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Returns why growth of the half stopped, or `None` if it was never grown.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }
}

/// Whether a fiber was grown or why it went nowhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub enum FiberOutcome {
    /// The fiber was grown and kept.
    Grown,
    /// The fiber stopped at the seed or was rejected by a whole-fiber filter.
    Nowhere(StopReason),
}

/// A fiber traced from a single seed.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct FiberResult {
    seed: Point3<ftr>,
    direction_index: usize,
    points: Vec<Point3<ftr>>,
    seed_index: usize,
    halves: [HalfSummary; 2],
    outcome: FiberOutcome,
}

impl FiberResult {
    /// Returns the seed point the fiber was traced from.
    pub fn seed(&self) -> &Point3<ftr> {
        &self.seed
    }

    /// Returns the index of the followed direction at the seed.
    pub fn direction_index(&self) -> usize {
        self.direction_index
    }

    /// Returns the fiber points, running from the end of the forward half
    /// through the seed to the end of the backward half. Empty if the fiber
    /// went nowhere.
    pub fn points(&self) -> &[Point3<ftr>] {
        &self.points
    }

    /// Consumes the result and returns the fiber points.
    pub fn into_points(self) -> Vec<Point3<ftr>> {
        self.points
    }

    /// Returns the index of the seed point in `points`.
    pub fn seed_index(&self) -> usize {
        self.seed_index
    }

    /// Returns the summary of the given half.
    pub fn half(&self, half: FiberHalf) -> &HalfSummary {
        &self.halves[half.index()]
    }

    /// Returns the outcome of tracing.
    pub fn outcome(&self) -> FiberOutcome {
        self.outcome
    }

    /// Whether the fiber was grown and kept.
    pub fn is_grown(&self) -> bool {
        self.outcome == FiberOutcome::Grown
    }

    /// Returns why the fiber went nowhere, if it did.
    pub fn why_nowhere(&self) -> Option<StopReason> {
        match self.outcome {
            FiberOutcome::Grown => None,
            FiberOutcome::Nowhere(reason) => Some(reason),
        }
    }

    /// Returns the combined length of both halves.
    pub fn total_length(&self) -> ftr {
        self.halves[0].length + self.halves[1].length
    }

    /// Returns the combined number of steps of both halves.
    pub fn total_steps(&self) -> usize {
        self.halves[0].steps + self.halves[1].steps
    }
}

/// Fixed-capacity storage for the points of one fiber.
///
/// Holds `2 * half_capacity + 1` points with the seed at index `half_capacity`.
#[derive(Clone, Debug)]
pub struct FiberBuffer {
    half_capacity: usize,
    points: Vec<Point3<ftr>>,
}

impl FiberBuffer {
    /// Creates a new buffer holding at most `half_capacity` steps per half.
    ///
    /// # Panics
    ///
    /// If `half_capacity` is zero.
    pub fn new(half_capacity: usize) -> Self {
        assert!(half_capacity > 0, "Half capacity must be larger than zero.");
        Self {
            half_capacity,
            points: vec![Point3::origin(); 2 * half_capacity + 1],
        }
    }

    /// Returns the maximum number of steps per half.
    pub fn half_capacity(&self) -> usize {
        self.half_capacity
    }

    /// Returns the index of the seed point.
    pub fn seed_index(&self) -> usize {
        self.half_capacity
    }

    /// Returns all buffer slots.
    pub fn points(&self) -> &[Point3<ftr>] {
        &self.points
    }
}

/// A fiber traced into a `FiberBuffer`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BufferedFiber {
    direction_index: usize,
    start_index: usize,
    end_index: usize,
    halves: [HalfSummary; 2],
    outcome: FiberOutcome,
}

impl BufferedFiber {
    /// Returns the index of the followed direction at the seed.
    pub fn direction_index(&self) -> usize {
        self.direction_index
    }

    /// Returns the buffer index of the first fiber point (zero if the fiber went nowhere).
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    /// Returns the buffer index of the last fiber point (zero if the fiber went nowhere).
    pub fn end_index(&self) -> usize {
        self.end_index
    }

    /// Returns the summary of the given half.
    pub fn half(&self, half: FiberHalf) -> &HalfSummary {
        &self.halves[half.index()]
    }

    /// Returns the outcome of tracing.
    pub fn outcome(&self) -> FiberOutcome {
        self.outcome
    }

    /// Returns the fiber points stored in the given buffer.
    pub fn points<'b>(&self, buffer: &'b FiberBuffer) -> &'b [Point3<ftr>] {
        match self.outcome {
            FiberOutcome::Grown => &buffer.points[self.start_index..=self.end_index],
            FiberOutcome::Nowhere(_) => &[],
        }
    }
}

#[derive(Clone, Debug)]
struct HalfTrace {
    points: Vec<Point3<ftr>>,
    summary: HalfSummary,
}

#[derive(Clone, Debug)]
enum Traced {
    Nowhere(StopReason),
    Halves([HalfTrace; 2]),
}

/// Traces fibers through a field using a committed tracing context.
///
/// The context is shared and read-only; the sampler is owned, so each
/// thread must use its own tracer, obtained with `derive_local`.
#[derive(Clone, Debug)]
pub struct FiberTracer<'c, S> {
    context: &'c TracingContext,
    query: &'c SampleQuery,
    sampler: S,
}

impl<'c, S: TensorSampler3> FiberTracer<'c, S> {
    /// Creates a new tracer for the given committed context and sampler.
    pub fn new(context: &'c TracingContext, sampler: S) -> Result<Self, ConfigError> {
        let query = context.committed_query().ok_or(ConfigError::NotCommitted)?;
        Ok(Self {
            context,
            query,
            sampler,
        })
    }

    /// Derives a tracer for use on another thread, sharing the context and
    /// cloning the sampler scratch state.
    pub fn derive_local(&self) -> Self {
        Self {
            context: self.context,
            query: self.query,
            sampler: self.sampler.clone(),
        }
    }

    /// Returns the tracing context.
    pub fn context(&self) -> &'c TracingContext {
        self.context
    }

    /// Returns the sampler.
    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    /// Returns how many distinct directions should be traced from the given seed.
    pub fn direction_count(&self, _seed: &Point3<ftr>) -> usize {
        self.context.direction_count()
    }

    /// Traces a fiber from the given seed in both directions.
    ///
    /// # Parameters
    ///
    /// - `seed`: Seed point, in index space if the context uses index space.
    /// - `direction_index`: Which of the candidate tensors to follow at the
    /// seed (must be below `direction_count`).
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: Contains the `FiberResult`, which has no points if the fiber went nowhere.
    /// - `Err`: Contains a `TraceError` if the sampler failed, the step ceiling
    /// was exceeded or the direction index is invalid.
    pub fn trace_single(
        &mut self,
        seed: &Point3<ftr>,
        direction_index: usize,
    ) -> Result<FiberResult, TraceError> {
        let stops = self.context.stops().clone();
        let result = match self.trace_halves(seed, direction_index, &stops)? {
            Traced::Nowhere(reason) => FiberResult {
                seed: *seed,
                direction_index,
                points: Vec::new(),
                seed_index: 0,
                halves: [HalfSummary::default(); 2],
                outcome: FiberOutcome::Nowhere(reason),
            },
            Traced::Halves([forward, backward]) => {
                let halves = [forward.summary, backward.summary];
                match Self::whole_fiber_rejection(&stops, &halves) {
                    Some(reason) => FiberResult {
                        seed: *seed,
                        direction_index,
                        points: Vec::new(),
                        seed_index: 0,
                        halves,
                        outcome: FiberOutcome::Nowhere(reason),
                    },
                    None => {
                        let seed_index = forward.points.len() - 1;
                        let mut points =
                            Vec::with_capacity(forward.points.len() + backward.points.len() - 1);
                        points.extend(forward.points.into_iter().skip(1).rev());
                        points.extend(backward.points);
                        FiberResult {
                            seed: *seed,
                            direction_index,
                            points,
                            seed_index,
                            halves,
                            outcome: FiberOutcome::Grown,
                        }
                    }
                }
            }
        };
        if self.context.verbosity().print_diagnostics() {
            println!(
                "Fiber from {} (direction {}): {} points, outcome {:?}",
                seed,
                direction_index,
                result.points.len(),
                result.outcome
            );
        }
        Ok(result)
    }

    /// Traces a fiber from the given seed into a fixed-capacity buffer.
    ///
    /// Each half is limited to the half capacity of the buffer, in addition
    /// to any configured step count limit.
    pub fn trace_single_into(
        &mut self,
        seed: &Point3<ftr>,
        direction_index: usize,
        buffer: &mut FiberBuffer,
    ) -> Result<BufferedFiber, TraceError> {
        let center = buffer.half_capacity;
        let stops = self.context.stops().with_step_limit(center);
        let fiber = match self.trace_halves(seed, direction_index, &stops)? {
            Traced::Nowhere(reason) => BufferedFiber {
                direction_index,
                start_index: 0,
                end_index: 0,
                halves: [HalfSummary::default(); 2],
                outcome: FiberOutcome::Nowhere(reason),
            },
            Traced::Halves([forward, backward]) => {
                let halves = [forward.summary, backward.summary];
                match Self::whole_fiber_rejection(&stops, &halves) {
                    Some(reason) => BufferedFiber {
                        direction_index,
                        start_index: 0,
                        end_index: 0,
                        halves,
                        outcome: FiberOutcome::Nowhere(reason),
                    },
                    None => {
                        for (offset, point) in forward.points.iter().enumerate() {
                            buffer.points[center - offset] = *point;
                        }
                        for (offset, point) in backward.points.iter().enumerate() {
                            buffer.points[center + offset] = *point;
                        }
                        BufferedFiber {
                            direction_index,
                            start_index: center - halves[0].steps,
                            end_index: center + halves[1].steps,
                            halves,
                            outcome: FiberOutcome::Grown,
                        }
                    }
                }
            }
        };
        Ok(fiber)
    }

    fn whole_fiber_rejection(stops: &StopSet, halves: &[HalfSummary; 2]) -> Option<StopReason> {
        stops.check_whole(
            halves[0].steps + halves[1].steps,
            halves[0].length + halves[1].length,
        )
    }

    fn trace_halves(
        &mut self,
        seed: &Point3<ftr>,
        direction_index: usize,
        stops: &StopSet,
    ) -> Result<Traced, TraceError> {
        let count = self.direction_count(seed);
        if direction_index >= count {
            return Err(ConfigError::InvalidDirectionIndex {
                index: direction_index,
                count,
            }
            .into());
        }
        let seed = if self.context.uses_index_space() {
            self.sampler.index_to_world(seed)
        } else {
            *seed
        };

        let Some(sample) = self.probe(&seed, CandidateChoice::Requested(direction_index))? else {
            return Ok(Traced::Nowhere(StopReason::OutOfBounds));
        };
        if let Some(reason) = stops.check(&sample, &HalfProgress::at_seed()) {
            if self.context.verbosity().print_diagnostics() {
                println!("Seed {} stopped immediately: {}", seed, reason);
            }
            return Ok(Traced::Nowhere(reason));
        }
        let rank = self.policy_rank();
        let reference = *sample.eigen().vector(rank);

        let forward =
            self.trace_half(FiberHalf::Forward, &seed, direction_index, &reference, stops)?;
        let backward =
            self.trace_half(FiberHalf::Backward, &seed, direction_index, &reference, stops)?;

        // A half without points stopped at the seed itself
        if let Some(reason) = [&forward, &backward]
            .into_iter()
            .find(|half| half.points.is_empty())
            .and_then(|half| half.summary.stop_reason)
        {
            return Ok(Traced::Nowhere(reason));
        }
        Ok(Traced::Halves([forward, backward]))
    }

    fn trace_half(
        &mut self,
        half: FiberHalf,
        seed: &Point3<ftr>,
        direction_index: usize,
        seed_reference: &Vec3<ftr>,
        stops: &StopSet,
    ) -> Result<HalfTrace, TraceError> {
        let context = self.context;
        let query = self.query;
        let verbosity = context.verbosity();
        let policy = context.policy().ok_or(ConfigError::PolicyNotSet)?;
        let integrator = context.integrator().ok_or(ConfigError::IntegratorNotSet)?;

        let mut points = Vec::new();
        let mut position = *seed;
        let mut previous_step: Option<Vec3<ftr>> = None;
        let mut progress = HalfProgress::at_seed();
        let mut length_before_step = 0.0;

        let (stop_reason, discard_step) = loop {
            if progress.steps > context.step_ceiling() {
                if verbosity.print_messages() {
                    eprintln!(
                        "Warning: {} half from {} exceeded {} steps, check the stop conditions",
                        half,
                        seed,
                        context.step_ceiling()
                    );
                }
                return Err(TraceError::StepCeilingExceeded {
                    half,
                    ceiling: context.step_ceiling(),
                });
            }
            let orientation = Orientation::new(half, previous_step.as_ref(), seed_reference);
            // The seed keeps the candidate it was checked with
            let choice = match previous_step {
                None => CandidateChoice::Requested(direction_index),
                Some(_) => CandidateChoice::ClosestTo(orientation.reference()),
            };

            let Some(sample) = probing::probe(
                &mut self.sampler,
                query,
                context.measurement_frame(),
                &position,
                choice,
                context.source().is_dwi(),
            )?
            else {
                break (StopReason::OutOfBounds, true);
            };
            if let Some(reason) = stops.check(&sample, &progress) {
                break (reason, true);
            }
            points.push(self.output_point(&position));

            let initial_direction = step_direction(&policy, context, &sample, &orientation);
            let sampler = &mut self.sampler;
            let step = integrator.step(
                &position,
                context.step_size(),
                &initial_direction,
                |intermediate| -> Result<Option<Vec3<ftr>>, SamplerError> {
                    let sample = probing::probe(
                        sampler,
                        query,
                        context.measurement_frame(),
                        intermediate,
                        CandidateChoice::ClosestTo(orientation.reference()),
                        context.source().is_dwi(),
                    )?;
                    Ok(sample.map(|sample| step_direction(&policy, context, &sample, &orientation)))
                },
            )?;
            let Some(step) = step else {
                break (StopReason::OutOfBounds, false);
            };

            if verbosity.print_diagnostics() {
                println!(
                    "{} half, step {}: at {} using candidate {}, stepping {}",
                    half,
                    progress.steps,
                    position,
                    sample.candidate(),
                    step
                );
            }

            progress.radius = previous_step
                .as_ref()
                .map_or(ftr::INFINITY, |previous| curvature_radius(previous, &step));
            length_before_step = progress.length;
            progress.length += step.length();
            progress.steps += 1;
            position = position + step;
            previous_step = Some(step);
        };

        if discard_step && progress.steps > 0 {
            progress.steps -= 1;
            progress.length = length_before_step;
        }
        if verbosity.print_diagnostics() {
            println!(
                "{} half stopped after {} steps ({}): {}",
                half, progress.steps, progress.length, stop_reason
            );
        }
        Ok(HalfTrace {
            points,
            summary: HalfSummary {
                length: progress.length,
                steps: progress.steps,
                stop_reason: Some(stop_reason),
            },
        })
    }

    fn probe(
        &mut self,
        position: &Point3<ftr>,
        choice: CandidateChoice,
    ) -> Result<Option<ProbedSample>, SamplerError> {
        probing::probe(
            &mut self.sampler,
            self.query,
            self.context.measurement_frame(),
            position,
            choice,
            self.context.source().is_dwi(),
        )
    }

    fn policy_rank(&self) -> usize {
        self.context
            .policy()
            .map_or(0, |policy| policy.reference_rank().index())
    }

    fn output_point(&self, position: &Point3<ftr>) -> Point3<ftr> {
        if self.context.uses_index_space() {
            self.sampler.world_to_index(position)
        } else {
            *position
        }
    }
}

/// Computes the step direction for a sample, including anisotropy scaling.
fn step_direction(
    policy: &StepPolicy,
    context: &TracingContext,
    sample: &ProbedSample,
    orientation: &Orientation,
) -> Vec3<ftr> {
    let direction = policy.direction(sample, orientation);
    match context.aniso_speed() {
        Some(speed) => direction * speed.scale(sample.anisotropy(speed.metric())),
        None => direction,
    }
}
