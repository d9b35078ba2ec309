//! Tensor fields defined by an analytic function inside a bounding box.

use super::{FieldSample, SampleQuery, SampleResult, TensorSampler3};
use crate::{
    error::SamplerError,
    geometry::{Dim3, Point3},
    tracing::ftr,
};
use std::{fmt, sync::Arc};

type TensorFunction = dyn Fn(&Point3<ftr>) -> FieldSample + Send + Sync;

/// Sampler evaluating a tensor-valued function of position.
///
/// The function is shared between clones, while each clone keeps its own
/// probe counter.
#[derive(Clone)]
pub struct FunctionSampler3 {
    function: Arc<TensorFunction>,
    lower_bounds: Point3<ftr>,
    upper_bounds: Point3<ftr>,
    probe_count: usize,
}

impl FunctionSampler3 {
    /// Creates a new sampler for the given function, defined inside the box
    /// spanned by the given corners.
    ///
    /// # Panics
    ///
    /// If any lower bound exceeds the corresponding upper bound.
    pub fn new<F>(function: F, lower_bounds: Point3<ftr>, upper_bounds: Point3<ftr>) -> Self
    where
        F: Fn(&Point3<ftr>) -> FieldSample + Send + Sync + 'static,
    {
        let sampler = Self {
            function: Arc::new(function),
            lower_bounds,
            upper_bounds,
            probe_count: 0,
        };
        sampler.validate();
        sampler
    }

    fn validate(&self) {
        for dim in Dim3::slice() {
            assert!(
                self.lower_bounds[dim] <= self.upper_bounds[dim],
                "Lower bound must not exceed upper bound in {}-dimension.",
                dim
            );
        }
    }

    /// Whether the given position lies inside the bounding box.
    pub fn contains(&self, position: &Point3<ftr>) -> bool {
        Dim3::slice().iter().all(|&dim| {
            position[dim] >= self.lower_bounds[dim] && position[dim] <= self.upper_bounds[dim]
        })
    }

    /// Returns the number of probes made through this instance.
    pub fn probe_count(&self) -> usize {
        self.probe_count
    }
}

impl TensorSampler3 for FunctionSampler3 {
    fn probe(
        &mut self,
        position: &Point3<ftr>,
        query: &SampleQuery,
    ) -> Result<SampleResult, SamplerError> {
        self.probe_count += 1;
        if !self.contains(position) {
            return Ok(SampleResult::Outside);
        }
        let sample = (self.function)(position);
        if sample.model() != query.model() {
            return Err(query.unsupported_model_error(sample.model()));
        }
        Ok(SampleResult::Inside(sample))
    }
}

impl fmt::Debug for FunctionSampler3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSampler3")
            .field("lower_bounds", &self.lower_bounds)
            .field("upper_bounds", &self.upper_bounds)
            .field("probe_count", &self.probe_count)
            .finish_non_exhaustive()
    }
}
