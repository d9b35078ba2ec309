//! Tracing fibers from many seeds in parallel.

use super::{
    fiber::{FiberResult, FiberTracer},
    ftr,
    stopping::StopReason,
    FiberHalf,
};
use crate::{error::TraceError, field::TensorSampler3, geometry::Point3};
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// A fiber traced from one of the seeds of a batch.
#[derive(Clone, Debug)]
pub struct TracedFiber {
    seed_index: usize,
    direction_index: usize,
    direction_count: usize,
    result: Result<FiberResult, TraceError>,
}

impl TracedFiber {
    /// Returns the index of the seed in the batch.
    pub fn seed_index(&self) -> usize {
        self.seed_index
    }

    /// Returns which of the seed's directions was followed.
    pub fn direction_index(&self) -> usize {
        self.direction_index
    }

    /// Returns how many directions were traced from the seed.
    pub fn direction_count(&self) -> usize {
        self.direction_count
    }

    /// Returns the traced fiber, or the error that aborted tracing.
    pub fn result(&self) -> Result<&FiberResult, &TraceError> {
        self.result.as_ref()
    }

    /// Consumes the entry and returns the tracing result.
    pub fn into_result(self) -> Result<FiberResult, TraceError> {
        self.result
    }
}

/// Histograms of outcomes over a batch of traced fibers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TraceStatistics {
    seed_count: usize,
    fiber_count: usize,
    grown_count: usize,
    error_count: usize,
    nowhere_reasons: BTreeMap<StopReason, usize>,
    half_stop_reasons: BTreeMap<StopReason, usize>,
}

impl TraceStatistics {
    fn new(seed_count: usize) -> Self {
        Self {
            seed_count,
            ..Self::default()
        }
    }

    fn record(&mut self, fiber: &TracedFiber) {
        self.fiber_count += 1;
        match &fiber.result {
            Ok(result) => {
                match result.why_nowhere() {
                    Some(reason) => *self.nowhere_reasons.entry(reason).or_insert(0) += 1,
                    None => self.grown_count += 1,
                }
                for half in FiberHalf::both() {
                    if let Some(reason) = result.half(half).stop_reason() {
                        *self.half_stop_reasons.entry(reason).or_insert(0) += 1;
                    }
                }
            }
            Err(_) => self.error_count += 1,
        }
    }

    /// Returns the number of seeds in the batch.
    pub fn seed_count(&self) -> usize {
        self.seed_count
    }

    /// Returns the number of traced fibers, counting each seed direction.
    pub fn fiber_count(&self) -> usize {
        self.fiber_count
    }

    /// Returns the number of fibers that were grown and kept.
    pub fn grown_count(&self) -> usize {
        self.grown_count
    }

    /// Returns the number of fibers aborted by an error.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Returns the number of fibers that went nowhere for the given reason.
    pub fn nowhere_count(&self, reason: StopReason) -> usize {
        self.nowhere_reasons.get(&reason).copied().unwrap_or(0)
    }

    /// Returns the number of halves that stopped for the given reason.
    pub fn half_stop_count(&self, reason: StopReason) -> usize {
        self.half_stop_reasons.get(&reason).copied().unwrap_or(0)
    }

    /// Returns the histogram of reasons why fibers went nowhere.
    pub fn nowhere_reasons(&self) -> &BTreeMap<StopReason, usize> {
        &self.nowhere_reasons
    }

    /// Returns the histogram of reasons why halves stopped.
    pub fn half_stop_reasons(&self) -> &BTreeMap<StopReason, usize> {
        &self.half_stop_reasons
    }

    /// Prints a summary of the statistics to stdout.
    pub fn print_summary(&self) {
        println!(
            "Traced {} fibers from {} seeds: {} grown, {} nowhere, {} failed",
            self.fiber_count,
            self.seed_count,
            self.grown_count,
            self.fiber_count - self.grown_count - self.error_count,
            self.error_count
        );
        for (reason, count) in &self.nowhere_reasons {
            println!("    went nowhere ({}): {}", reason, count);
        }
        for (reason, count) in &self.half_stop_reasons {
            println!("    half stopped ({}): {}", reason, count);
        }
    }
}

/// Fibers traced from a batch of seeds, in seed order.
#[derive(Clone, Debug)]
pub struct FiberSet {
    fibers: Vec<TracedFiber>,
    statistics: TraceStatistics,
}

impl FiberSet {
    fn new(seed_count: usize, fibers: Vec<TracedFiber>) -> Self {
        let mut statistics = TraceStatistics::new(seed_count);
        fibers.iter().for_each(|fiber| statistics.record(fiber));
        Self { fibers, statistics }
    }

    /// Returns all traced fibers, including failed ones and ones that went nowhere.
    pub fn fibers(&self) -> &[TracedFiber] {
        &self.fibers
    }

    /// Consumes the set and returns all traced fibers.
    pub fn into_fibers(self) -> Vec<TracedFiber> {
        self.fibers
    }

    /// Returns the outcome histograms of the batch.
    pub fn statistics(&self) -> &TraceStatistics {
        &self.statistics
    }

    /// Returns the number of traced fibers.
    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    /// Whether no fibers were traced.
    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }

    /// Returns an iterator over the fibers that were grown and kept.
    pub fn grown(&self) -> impl Iterator<Item = &FiberResult> {
        self.fibers
            .iter()
            .filter_map(|fiber| fiber.result.as_ref().ok())
            .filter(|result| result.is_grown())
    }

    /// Returns the total number of points in all grown fibers.
    pub fn total_vertex_count(&self) -> usize {
        self.grown().map(|result| result.points().len()).sum()
    }
}

impl<'c, S: TensorSampler3> FiberTracer<'c, S> {
    /// Traces fibers from all the given seeds, following every direction
    /// available at each seed.
    ///
    /// Seeds are distributed over threads, each using its own derived tracer.
    /// An error for one fiber is recorded in the set and does not abort the
    /// rest of the batch.
    pub fn trace_batch(&self, seeds: &[Point3<ftr>]) -> FiberSet {
        let verbosity = self.context().verbosity();
        let fibers: Vec<TracedFiber> = seeds
            .par_iter()
            .enumerate()
            .progress_with(verbosity.create_progress_bar(seeds.len()))
            .map_init(
                || self.derive_local(),
                |tracer, (seed_index, seed)| {
                    let direction_count = tracer.direction_count(seed);
                    (0..direction_count)
                        .map(|direction_index| {
                            let result = tracer.trace_single(seed, direction_index);
                            if let Err(err) = &result {
                                if verbosity.print_messages() {
                                    eprintln!(
                                        "Warning: tracing from seed {} ({}) failed: {}",
                                        seed_index, seed, err
                                    );
                                }
                            }
                            TracedFiber {
                                seed_index,
                                direction_index,
                                direction_count,
                                result,
                            }
                        })
                        .collect::<Vec<_>>()
                },
            )
            .flatten()
            .collect();

        let set = FiberSet::new(seeds.len(), fibers);
        if verbosity.print_messages() {
            set.statistics().print_summary();
        }
        set
    }
}
