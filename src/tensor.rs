//! Symmetric 3x3 diffusion tensors and their eigen-decomposition.

pub mod aniso;
pub mod eigen;

use self::aniso::AnisoMetric;
use crate::{
    geometry::{
        Dim3::{self, X, Y, Z},
        Mat3, Vec3,
    },
    tracing::ftr,
};
use std::ops::{Add, Mul};

#[cfg(feature = "serialization")]
use serde::Serialize;

/// A symmetric 3x3 tensor, stored as its six unique components
/// in the order `xx, xy, xz, yy, yz, zz`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct SymTensor3([ftr; 6]);

impl SymTensor3 {
    /// Creates a new tensor from its six unique components.
    pub fn new(xx: ftr, xy: ftr, xz: ftr, yy: ftr, yz: ftr, zz: ftr) -> Self {
        Self([xx, xy, xz, yy, yz, zz])
    }

    /// Creates a new tensor from an array of the six unique components
    /// in the order `xx, xy, xz, yy, yz, zz`.
    pub fn from_components(components: [ftr; 6]) -> Self {
        Self(components)
    }

    /// Creates a new tensor with all components set to zero.
    pub fn zero() -> Self {
        Self([0.0; 6])
    }

    /// Creates an isotropic tensor with the given diagonal value.
    pub fn isotropic(value: ftr) -> Self {
        Self::new(value, 0.0, 0.0, value, 0.0, value)
    }

    /// Creates a tensor with the given eigenvalues and eigenvectors.
    ///
    /// # Parameters
    ///
    /// - `values`: The three eigenvalues.
    /// - `vectors`: The corresponding eigenvectors (assumed orthonormal).
    ///
    /// # Returns
    ///
    /// The tensor `sum_i values[i] * vectors[i] * vectors[i]^T`.
    pub fn from_eigen(values: [ftr; 3], vectors: &[Vec3<ftr>; 3]) -> Self {
        let mut components = [0.0; 6];
        for (value, vector) in values.iter().zip(vectors.iter()) {
            components[0] += value * vector[X] * vector[X];
            components[1] += value * vector[X] * vector[Y];
            components[2] += value * vector[X] * vector[Z];
            components[3] += value * vector[Y] * vector[Y];
            components[4] += value * vector[Y] * vector[Z];
            components[5] += value * vector[Z] * vector[Z];
        }
        Self(components)
    }

    /// Returns the six unique components.
    pub fn components(&self) -> &[ftr; 6] {
        &self.0
    }

    /// Returns the element at the given row and column.
    pub fn element(&self, row: Dim3, column: Dim3) -> ftr {
        match (row, column) {
            (X, X) => self.0[0],
            (X, Y) | (Y, X) => self.0[1],
            (X, Z) | (Z, X) => self.0[2],
            (Y, Y) => self.0[3],
            (Y, Z) | (Z, Y) => self.0[4],
            (Z, Z) => self.0[5],
        }
    }

    /// Converts the tensor into a general 3x3 matrix.
    pub fn to_mat3(&self) -> Mat3<ftr> {
        Mat3::from_rows(
            [X, Y, Z].map(|row| Vec3::with_each_component(|column| self.element(row, column))),
        )
    }

    /// Computes the trace of the tensor.
    pub fn trace(&self) -> ftr {
        self.0[0] + self.0[3] + self.0[5]
    }

    /// Computes the determinant of the tensor.
    pub fn determinant(&self) -> ftr {
        let [xx, xy, xz, yy, yz, zz] = self.0;
        xx * (yy * zz - yz * yz) - xy * (xy * zz - yz * xz) + xz * (xy * yz - yy * xz)
    }

    /// Applies the tensor as a linear operator to the given vector.
    pub fn apply(&self, vector: &Vec3<ftr>) -> Vec3<ftr> {
        Vec3::with_each_component(|row| {
            self.element(row, X) * vector[X]
                + self.element(row, Y) * vector[Y]
                + self.element(row, Z) * vector[Z]
        })
    }

    /// Computes the tensor `M T M^T` expressed through the given frame matrix `M`.
    pub fn transformed(&self, frame: &Mat3<ftr>) -> Self {
        let product = frame.product(&self.to_mat3()).product(&frame.transposed());
        Self::new(
            product.element(X, X),
            0.5 * (product.element(X, Y) + product.element(Y, X)),
            0.5 * (product.element(X, Z) + product.element(Z, X)),
            product.element(Y, Y),
            0.5 * (product.element(Y, Z) + product.element(Z, Y)),
            product.element(Z, Z),
        )
    }

    /// Whether all components are finite.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|component| component.is_finite())
    }

    /// Computes the eigenvalues (descending) and eigenvectors of the tensor.
    pub fn eigen_system(&self) -> EigenSystem3 {
        eigen::solve(self)
    }
}

impl Add for SymTensor3 {
    type Output = Self;
    fn add(mut self, other: Self) -> Self::Output {
        for (component, other_component) in self.0.iter_mut().zip(other.0) {
            *component += other_component;
        }
        self
    }
}

impl Mul<ftr> for SymTensor3 {
    type Output = Self;
    fn mul(self, factor: ftr) -> Self::Output {
        Self(self.0.map(|component| component * factor))
    }
}

/// Eigenvalues and eigenvectors of a symmetric tensor.
///
/// Eigenvalues are sorted in descending order and the eigenvectors are
/// orthonormal and form a right-handed frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EigenSystem3 {
    values: [ftr; 3],
    vectors: [Vec3<ftr>; 3],
}

impl EigenSystem3 {
    /// Creates a new eigen system from unsorted eigenvalues and their eigenvectors.
    pub fn new(values: [ftr; 3], vectors: [Vec3<ftr>; 3]) -> Self {
        let mut order = [0, 1, 2];
        order.sort_by(|&i, &j| values[j].total_cmp(&values[i]));
        let values = order.map(|i| values[i]);
        let mut vectors = order.map(|i| vectors[i]);
        vectors[2] = vectors[0].cross(&vectors[1]);
        Self { values, vectors }
    }

    /// Returns the eigenvalues in descending order.
    pub fn values(&self) -> &[ftr; 3] {
        &self.values
    }

    /// Returns the eigenvectors, ordered like the eigenvalues.
    pub fn vectors(&self) -> &[Vec3<ftr>; 3] {
        &self.vectors
    }

    /// Returns the eigenvector with the given rank (0 is the principal one).
    pub fn vector(&self, rank: usize) -> &Vec3<ftr> {
        &self.vectors[rank]
    }

    /// Negates all eigenvectors.
    pub fn reverse_vectors(&mut self) {
        self.vectors.iter_mut().for_each(Vec3::reverse);
    }

    /// Evaluates the given anisotropy metric for the eigenvalues.
    pub fn anisotropy(&self, metric: AnisoMetric) -> ftr {
        metric.evaluate(&self.values)
    }
}
