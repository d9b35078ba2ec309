//! Tracing fibers through tensor fields.

pub mod batch;
pub mod context;
pub mod direction;
pub mod fiber;
pub mod integration;
pub mod probing;
pub mod stopping;

pub use self::{
    batch::{FiberSet, TraceStatistics, TracedFiber},
    context::{DwiMode, FieldSource, TracingContext},
    direction::{AnisoSpeed, EigenRank, StepPolicy},
    fiber::{BufferedFiber, FiberBuffer, FiberOutcome, FiberResult, FiberTracer, HalfSummary},
    integration::Integrator,
    stopping::{StopCondition, StopReason},
};

use std::fmt;

#[cfg(feature = "serialization")]
use serde::Serialize;

/// Floating-point precision to use for tracing.
#[allow(non_camel_case_types)]
pub type ftr = f64;

/// One of the two halves of a fiber, grown in opposite directions from the seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub enum FiberHalf {
    /// Follows the step direction as oriented at the seed.
    Forward = 0,
    /// Follows the opposite orientation.
    Backward = 1,
}

impl FiberHalf {
    /// Creates an array for iterating over both halves in tracing order.
    pub fn both() -> [Self; 2] {
        [Self::Forward, Self::Backward]
    }

    /// Returns the index of the half (0 for forward, 1 for backward).
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for FiberHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        })
    }
}
