//! Sampling diffusion tensor fields at arbitrary positions.

pub mod function;
pub mod regular;

use crate::{
    error::SamplerError,
    geometry::Point3,
    tensor::SymTensor3,
    tracing::ftr,
};
use std::fmt;

/// Number of tensors fitted at each position of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorModel {
    /// One tensor per position.
    Single,
    /// Two candidate tensors per position, with a mixture fraction.
    Dual,
}

impl fmt::Display for TensorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Single => "single-tensor",
            Self::Dual => "two-tensor",
        })
    }
}

/// A single tensor together with the confidence of its fit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TensorSample {
    confidence: ftr,
    tensor: SymTensor3,
}

impl TensorSample {
    /// Creates a new tensor sample.
    pub fn new(confidence: ftr, tensor: SymTensor3) -> Self {
        Self { confidence, tensor }
    }

    /// Creates a new tensor sample with full confidence.
    pub fn confident(tensor: SymTensor3) -> Self {
        Self::new(1.0, tensor)
    }

    /// Returns the confidence of the tensor fit.
    pub fn confidence(&self) -> ftr {
        self.confidence
    }

    /// Returns the tensor.
    pub fn tensor(&self) -> &SymTensor3 {
        &self.tensor
    }
}

/// The tensor data found at a position in a field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldSample {
    /// A single tensor.
    Single(TensorSample),
    /// Two candidate tensors, with `fraction` being the proportion of the
    /// signal attributed to the first candidate.
    Dual {
        confidence: ftr,
        candidates: [SymTensor3; 2],
        fraction: ftr,
    },
}

impl FieldSample {
    /// Returns the tensor model the sample belongs to.
    pub fn model(&self) -> TensorModel {
        match self {
            Self::Single(_) => TensorModel::Single,
            Self::Dual { .. } => TensorModel::Dual,
        }
    }

    /// Returns the confidence of the sample.
    pub fn confidence(&self) -> ftr {
        match self {
            Self::Single(sample) => sample.confidence(),
            Self::Dual { confidence, .. } => *confidence,
        }
    }
}

/// Outcome of probing a field at a position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SampleResult {
    /// The position is inside the field.
    Inside(FieldSample),
    /// The position is outside the field domain.
    Outside,
}

/// Which quantities a tracer needs from each probe.
///
/// Built by the tracing context when it is committed.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleQuery {
    model: TensorModel,
    confidence: bool,
}

impl SampleQuery {
    /// Creates a new query for the given tensor model, requesting only tensors.
    pub fn new(model: TensorModel) -> Self {
        Self {
            model,
            confidence: false,
        }
    }

    /// Additionally requests the fit confidence.
    pub fn with_confidence(mut self) -> Self {
        self.confidence = true;
        self
    }

    /// Returns the requested tensor model.
    pub fn model(&self) -> TensorModel {
        self.model
    }

    /// Whether the fit confidence is requested.
    pub fn wants_confidence(&self) -> bool {
        self.confidence
    }

    /// Creates the error to return when a sampler cannot provide the requested model.
    pub fn unsupported_model_error(&self, provided: TensorModel) -> SamplerError {
        SamplerError::new(format!(
            "{} samples were requested but the field provides {} samples",
            self.model, provided
        ))
    }
}

/// Defines the properties of a sampler of 3D tensor fields.
///
/// A sampler may keep mutable scratch data, so each thread tracing fibers
/// must work with its own clone.
pub trait TensorSampler3: Clone + Send + Sync {
    /// Resolves the tensor data at the given world space position.
    ///
    /// # Parameters
    ///
    /// - `position`: World space position to probe.
    /// - `query`: Quantities the caller needs.
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: Contains a `SampleResult`, which is `Outside` if the position
    /// lies outside the field domain.
    /// - `Err`: Contains a `SamplerError` describing an internal failure.
    fn probe(
        &mut self,
        position: &Point3<ftr>,
        query: &SampleQuery,
    ) -> Result<SampleResult, SamplerError>;

    /// Converts a world space position into the index space of the field.
    fn world_to_index(&self, position: &Point3<ftr>) -> Point3<ftr> {
        *position
    }

    /// Converts an index space position into world space.
    fn index_to_world(&self, position: &Point3<ftr>) -> Point3<ftr> {
        *position
    }
}
