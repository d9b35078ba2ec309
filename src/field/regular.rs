//! Tensor fields stored on a regular grid.

use super::{FieldSample, SampleQuery, SampleResult, TensorModel, TensorSample, TensorSampler3};
use crate::{
    error::SamplerError,
    geometry::{
        Dim3::{self, X, Y, Z},
        In3D, Point3, Vec3,
    },
    tensor::SymTensor3,
    tracing::ftr,
};
use ndarray::{s, Array4, ArrayView1, Axis, Zip};
use std::sync::Arc;

/// Number of stored components per grid point for single-tensor volumes:
/// confidence followed by the six unique tensor components.
pub const SINGLE_TENSOR_COMPONENTS: usize = 7;

/// Number of stored components per grid point for two-tensor volumes:
/// confidence, the first tensor, the mixture fraction of the first tensor
/// and the second tensor.
pub const DUAL_TENSOR_COMPONENTS: usize = 14;

/// Tensor volume sampled with trilinear interpolation.
///
/// Grid point `(i, j, k)` lies at world position `origin + (i, j, k) * spacing`.
/// The volume data is shared between clones; each clone has its own
/// interpolation buffer.
#[derive(Clone, Debug)]
pub struct RegularTensorVolume3 {
    origin: Point3<ftr>,
    spacing: Vec3<ftr>,
    shape: In3D<usize>,
    model: TensorModel,
    data: Arc<Array4<ftr>>,
    components: Vec<ftr>,
}

impl RegularTensorVolume3 {
    /// Creates a new tensor volume.
    ///
    /// # Parameters
    ///
    /// - `origin`: World space position of the first grid point.
    /// - `spacing`: World space distance between adjacent grid points along each axis.
    /// - `data`: Array of shape `(nx, ny, nz, n_components)`, where `n_components` is
    /// `SINGLE_TENSOR_COMPONENTS` or `DUAL_TENSOR_COMPONENTS`.
    ///
    /// # Panics
    ///
    /// If the spacing is not positive, the grid is empty or the number of
    /// components is not recognized.
    pub fn new(origin: Point3<ftr>, spacing: Vec3<ftr>, data: Array4<ftr>) -> Self {
        let (nx, ny, nz, n_components) = data.dim();
        let model = if n_components == DUAL_TENSOR_COMPONENTS {
            TensorModel::Dual
        } else {
            TensorModel::Single
        };
        let volume = Self {
            origin,
            spacing,
            shape: In3D::new(nx, ny, nz),
            model,
            data: Arc::new(data),
            components: vec![0.0; n_components],
        };
        volume.validate();
        volume
    }

    /// Creates a new tensor volume by evaluating the given function at each
    /// grid point in parallel.
    pub fn from_function<F>(
        origin: Point3<ftr>,
        spacing: Vec3<ftr>,
        shape: In3D<usize>,
        function: F,
    ) -> Self
    where
        F: Fn(&Point3<ftr>) -> FieldSample + Send + Sync,
    {
        let n_components = match function(&origin).model() {
            TensorModel::Single => SINGLE_TENSOR_COMPONENTS,
            TensorModel::Dual => DUAL_TENSOR_COMPONENTS,
        };
        let mut data = Array4::zeros((shape[X], shape[Y], shape[Z], n_components));
        Zip::indexed(data.lanes_mut(Axis(3))).par_for_each(|(i, j, k), mut lane| {
            let position = Point3::new(
                origin[X] + (i as ftr) * spacing[X],
                origin[Y] + (j as ftr) * spacing[Y],
                origin[Z] + (k as ftr) * spacing[Z],
            );
            for (stored, value) in lane.iter_mut().zip(pack_sample(&function(&position))) {
                *stored = value;
            }
        });
        Self::new(origin, spacing, data)
    }

    fn validate(&self) {
        let n_components = self.components.len();
        assert!(
            n_components == SINGLE_TENSOR_COMPONENTS || n_components == DUAL_TENSOR_COMPONENTS,
            "Number of components must be {} or {}, got {}.",
            SINGLE_TENSOR_COMPONENTS,
            DUAL_TENSOR_COMPONENTS,
            n_components
        );
        for dim in Dim3::slice() {
            assert!(
                self.spacing[dim] > 0.0,
                "Grid spacing must be larger than zero in {}-dimension.",
                dim
            );
            assert!(
                self.shape[dim] > 0,
                "Grid must have at least one point in {}-dimension.",
                dim
            );
        }
    }

    /// Returns the tensor model of the stored data.
    pub fn model(&self) -> TensorModel {
        self.model
    }

    /// Returns the number of grid points along each axis.
    pub fn shape(&self) -> &In3D<usize> {
        &self.shape
    }

    fn interpolate_components(&mut self, index_position: &Point3<ftr>) -> bool {
        let mut lower = [0; 3];
        let mut weights = [0.0; 3];
        for dim in Dim3::slice() {
            let coordinate = index_position[dim];
            let last = (self.shape[dim] - 1) as ftr;
            if !(coordinate >= 0.0 && coordinate <= last) {
                return false;
            }
            let floor = if self.shape[dim] > 1 {
                coordinate.floor().min(last - 1.0)
            } else {
                0.0
            };
            lower[dim.num()] = floor as usize;
            weights[dim.num()] = coordinate - floor;
        }

        self.components.iter_mut().for_each(|c| *c = 0.0);
        for corner in 0..8 {
            let offsets = [corner & 1, (corner >> 1) & 1, (corner >> 2) & 1];
            let mut weight = 1.0;
            let mut index = [0; 3];
            for d in 0..3 {
                let w = if offsets[d] == 1 {
                    weights[d]
                } else {
                    1.0 - weights[d]
                };
                if w == 0.0 {
                    weight = 0.0;
                    break;
                }
                weight *= w;
                index[d] = lower[d] + offsets[d];
            }
            if weight == 0.0 {
                continue;
            }
            let lane = self.data.slice(s![index[0], index[1], index[2], ..]);
            accumulate(&mut self.components, lane, weight);
        }
        true
    }
}

impl TensorSampler3 for RegularTensorVolume3 {
    fn probe(
        &mut self,
        position: &Point3<ftr>,
        query: &SampleQuery,
    ) -> Result<SampleResult, SamplerError> {
        if query.model() != self.model {
            return Err(query.unsupported_model_error(self.model));
        }
        if !position.is_finite() {
            return Err(SamplerError::new(format!(
                "cannot probe non-finite position {}",
                position
            )));
        }
        let index_position = self.world_to_index(position);
        if !self.interpolate_components(&index_position) {
            return Ok(SampleResult::Outside);
        }
        let c = &self.components;
        let confidence = if query.wants_confidence() { c[0] } else { 1.0 };
        let tensor_at = |start: usize| {
            SymTensor3::new(
                c[start],
                c[start + 1],
                c[start + 2],
                c[start + 3],
                c[start + 4],
                c[start + 5],
            )
        };
        let sample = match self.model {
            TensorModel::Single => FieldSample::Single(TensorSample::new(confidence, tensor_at(1))),
            TensorModel::Dual => FieldSample::Dual {
                confidence,
                candidates: [tensor_at(1), tensor_at(8)],
                fraction: c[7],
            },
        };
        Ok(SampleResult::Inside(sample))
    }

    fn world_to_index(&self, position: &Point3<ftr>) -> Point3<ftr> {
        Point3::with_each_component(|dim| (position[dim] - self.origin[dim]) / self.spacing[dim])
    }

    fn index_to_world(&self, position: &Point3<ftr>) -> Point3<ftr> {
        Point3::with_each_component(|dim| self.origin[dim] + position[dim] * self.spacing[dim])
    }
}

fn accumulate(components: &mut [ftr], lane: ArrayView1<ftr>, weight: ftr) {
    for (component, &value) in components.iter_mut().zip(lane.iter()) {
        *component += weight * value;
    }
}

fn pack_sample(sample: &FieldSample) -> Vec<ftr> {
    match sample {
        FieldSample::Single(sample) => {
            let mut packed = Vec::with_capacity(SINGLE_TENSOR_COMPONENTS);
            packed.push(sample.confidence());
            packed.extend_from_slice(sample.tensor().components());
            packed
        }
        FieldSample::Dual {
            confidence,
            candidates,
            fraction,
        } => {
            let mut packed = Vec::with_capacity(DUAL_TENSOR_COMPONENTS);
            packed.push(*confidence);
            packed.extend_from_slice(candidates[0].components());
            packed.push(*fraction);
            packed.extend_from_slice(candidates[1].components());
            packed
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_abs_diff_eq;

    fn linear_volume() -> RegularTensorVolume3 {
        RegularTensorVolume3::from_function(
            Point3::new(-1.0, -1.0, -1.0),
            Vec3::new(0.5, 0.5, 0.5),
            In3D::new(5, 5, 5),
            |position| {
                FieldSample::Single(TensorSample::new(
                    0.5 + 0.1 * position[X],
                    SymTensor3::new(2.0 + position[X], 0.0, 0.0, 1.0, position[Y], 1.0),
                ))
            },
        )
    }

    #[test]
    fn trilinear_interpolation_is_exact_for_linear_fields() {
        let mut volume = linear_volume();
        let query = SampleQuery::new(TensorModel::Single).with_confidence();
        let position = Point3::new(0.3, -0.2, 0.77);
        match volume.probe(&position, &query).unwrap() {
            SampleResult::Inside(FieldSample::Single(sample)) => {
                assert_abs_diff_eq!(sample.confidence(), 0.53, epsilon = 1e-12);
                assert_abs_diff_eq!(sample.tensor().components()[0], 2.3, epsilon = 1e-12);
                assert_abs_diff_eq!(sample.tensor().components()[4], -0.2, epsilon = 1e-12);
            }
            other => panic!("Unexpected sample {:?}", other),
        }
    }

    #[test]
    fn upper_boundary_is_inside_and_beyond_is_outside() {
        let mut volume = linear_volume();
        let query = SampleQuery::new(TensorModel::Single);
        assert!(matches!(
            volume.probe(&Point3::new(1.0, 1.0, 1.0), &query),
            Ok(SampleResult::Inside(_))
        ));
        assert_eq!(
            volume.probe(&Point3::new(1.01, 0.0, 0.0), &query),
            Ok(SampleResult::Outside)
        );
        assert_eq!(
            volume.probe(&Point3::new(0.0, -1.2, 0.0), &query),
            Ok(SampleResult::Outside)
        );
    }

    #[test]
    fn index_and_world_transforms_are_inverse() {
        let volume = linear_volume();
        let world = Point3::new(0.25, -0.5, 0.75);
        let index = volume.world_to_index(&world);
        assert_eq!(index, Point3::new(2.5, 1.0, 3.5));
        assert_eq!(volume.index_to_world(&index), world);
    }

    #[test]
    fn dual_volumes_unpack_both_candidates() {
        let mut volume = RegularTensorVolume3::from_function(
            Point3::origin(),
            Vec3::new(1.0, 1.0, 1.0),
            In3D::new(2, 2, 2),
            |_| FieldSample::Dual {
                confidence: 0.9,
                candidates: [SymTensor3::isotropic(1.0), SymTensor3::isotropic(2.0)],
                fraction: 0.3,
            },
        );
        assert_eq!(volume.model(), TensorModel::Dual);
        let query = SampleQuery::new(TensorModel::Dual).with_confidence();
        match volume.probe(&Point3::new(0.5, 0.5, 0.5), &query).unwrap() {
            SampleResult::Inside(FieldSample::Dual {
                confidence,
                candidates,
                fraction,
            }) => {
                assert_abs_diff_eq!(confidence, 0.9, epsilon = 1e-12);
                assert_abs_diff_eq!(fraction, 0.3, epsilon = 1e-12);
                assert_abs_diff_eq!(candidates[1].trace(), 6.0, epsilon = 1e-12);
            }
            other => panic!("Unexpected sample {:?}", other),
        }
    }
}
