//! Probing the field and choosing which tensor to follow.

use super::ftr;
use crate::{
    error::SamplerError,
    field::{FieldSample, SampleQuery, SampleResult, TensorSampler3},
    geometry::{Mat3, Point3, Vec3},
    tensor::{aniso::AnisoMetric, EigenSystem3, SymTensor3},
};

/// How to pick the followed tensor when the field provides two candidates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CandidateChoice<'a> {
    /// Use the candidate with the given index.
    Requested(usize),
    /// Use the candidate whose principal eigenvector is most closely
    /// aligned with the given direction.
    ClosestTo(&'a Vec3<ftr>),
}

/// Tensor data in use at a probed position.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbedSample {
    confidence: ftr,
    tensor: SymTensor3,
    eigen: EigenSystem3,
    candidate: usize,
    fraction: Option<ftr>,
    clamp_anisotropy: bool,
}

impl ProbedSample {
    /// Resolves the followed tensor of the given field sample.
    ///
    /// # Parameters
    ///
    /// - `sample`: Tensor data returned by the sampler.
    /// - `frame`: Optional measurement frame `M`; tensors are transformed to `M T M^T`.
    /// - `choice`: How to pick between two candidate tensors.
    /// - `clamp_anisotropy`: Whether anisotropy values are clamped to [0, 1].
    ///
    /// # Returns
    ///
    /// The sample in use. For two-candidate samples chosen by alignment, the
    /// eigenvectors of the chosen candidate point along the given direction.
    pub fn from_field_sample(
        sample: &FieldSample,
        frame: Option<&Mat3<ftr>>,
        choice: CandidateChoice,
        clamp_anisotropy: bool,
    ) -> Self {
        let transform = |tensor: &SymTensor3| match frame {
            Some(frame) => tensor.transformed(frame),
            None => *tensor,
        };
        match sample {
            FieldSample::Single(sample) => {
                let tensor = transform(sample.tensor());
                Self {
                    confidence: sample.confidence(),
                    tensor,
                    eigen: tensor.eigen_system(),
                    candidate: 0,
                    fraction: None,
                    clamp_anisotropy,
                }
            }
            FieldSample::Dual {
                confidence,
                candidates,
                fraction,
            } => {
                let tensors = [transform(&candidates[0]), transform(&candidates[1])];
                let mut eigen = [tensors[0].eigen_system(), tensors[1].eigen_system()];
                let candidate = match choice {
                    CandidateChoice::Requested(index) => index.min(1),
                    CandidateChoice::ClosestTo(reference) => {
                        let mut dots = [0.0; 2];
                        for (dot, system) in dots.iter_mut().zip(eigen.iter_mut()) {
                            *dot = reference.dot(system.vector(0));
                            if *dot < 0.0 {
                                *dot = -*dot;
                                system.reverse_vectors();
                            }
                        }
                        if dots[0] > dots[1] {
                            0
                        } else {
                            1
                        }
                    }
                };
                Self {
                    confidence: *confidence,
                    tensor: tensors[candidate],
                    eigen: eigen[candidate],
                    candidate,
                    fraction: Some(if candidate == 0 {
                        *fraction
                    } else {
                        1.0 - *fraction
                    }),
                    clamp_anisotropy,
                }
            }
        }
    }

    /// Returns the fit confidence.
    pub fn confidence(&self) -> ftr {
        self.confidence
    }

    /// Returns the tensor in use.
    pub fn tensor(&self) -> &SymTensor3 {
        &self.tensor
    }

    /// Returns the eigen system of the tensor in use.
    pub fn eigen(&self) -> &EigenSystem3 {
        &self.eigen
    }

    /// Returns the index of the candidate tensor in use (0 for single-tensor fields).
    pub fn candidate(&self) -> usize {
        self.candidate
    }

    /// Returns the mixture fraction of the tensor in use, for two-tensor fields.
    pub fn fraction(&self) -> Option<ftr> {
        self.fraction
    }

    /// Evaluates the given anisotropy measure for the tensor in use.
    pub fn anisotropy(&self, metric: AnisoMetric) -> ftr {
        let value = self.eigen.anisotropy(metric);
        if self.clamp_anisotropy {
            value.clamp(0.0, 1.0)
        } else {
            value
        }
    }
}

/// Probes the sampler at the given world space position.
///
/// Returns `None` if the position is outside the field.
pub fn probe<S: TensorSampler3>(
    sampler: &mut S,
    query: &SampleQuery,
    frame: Option<&Mat3<ftr>>,
    position: &Point3<ftr>,
    choice: CandidateChoice,
    clamp_anisotropy: bool,
) -> Result<Option<ProbedSample>, SamplerError> {
    match sampler.probe(position, query)? {
        SampleResult::Inside(sample) => {
            if sample.model() != query.model() {
                return Err(query.unsupported_model_error(sample.model()));
            }
            Ok(Some(ProbedSample::from_field_sample(
                &sample,
                frame,
                choice,
                clamp_anisotropy,
            )))
        }
        SampleResult::Outside => Ok(None),
    }
}
