//! Geometric utility objects.

use crate::num::BFloat;
use std::{
    fmt,
    ops::{Add, Div, Index, IndexMut, Mul, Neg, Sub},
};

#[cfg(feature = "serialization")]
use serde::Serialize;

/// Denotes the x-, y- or z-dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dim3 {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Dim3 {
    /// Creates an array for iterating over the x-, y- and z-dimensions.
    pub fn slice() -> [Self; 3] {
        [Self::X, Self::Y, Self::Z]
    }

    /// Returns the number of the dimension.
    pub fn num(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Dim3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::X => "x",
                Self::Y => "y",
                Self::Z => "z",
            }
        )
    }
}

use Dim3::{X, Y, Z};

/// Represents any quantity with three dimensional components.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct In3D<T>([T; 3]);

impl<T> In3D<T> {
    /// Creates a new 3D quantity given the three components.
    pub fn new(x: T, y: T, z: T) -> Self {
        Self([x, y, z])
    }

    /// Creates a new 3D quantity by evaluating the given component
    /// constructor for each dimension.
    pub fn with_each_component<C>(create_component: C) -> Self
    where
        C: Fn(Dim3) -> T,
    {
        Self::new(
            create_component(X),
            create_component(Y),
            create_component(Z),
        )
    }

    /// Creates a new 3D quantity with the given value copied into all components.
    pub fn same(a: T) -> Self
    where
        T: Copy,
    {
        Self([a, a, a])
    }
}

impl<T> Index<Dim3> for In3D<T> {
    type Output = T;
    fn index(&self, dim: Dim3) -> &Self::Output {
        &self.0[dim as usize]
    }
}

impl<T> IndexMut<Dim3> for In3D<T> {
    fn index_mut(&mut self, dim: Dim3) -> &mut Self::Output {
        &mut self.0[dim as usize]
    }
}

impl<T: fmt::Display> fmt::Display for In3D<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        fmt::Display::fmt(&self[X], f)?;
        f.write_str(", ")?;
        fmt::Display::fmt(&self[Y], f)?;
        f.write_str(", ")?;
        fmt::Display::fmt(&self[Z], f)?;
        f.write_str("]")
    }
}

/// A 3D vector.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct Vec3<F>(In3D<F>);

impl<F: BFloat> Vec3<F> {
    /// Creates a new 3D vector given the three components.
    pub fn new(x: F, y: F, z: F) -> Self {
        Self(In3D::new(x, y, z))
    }

    /// Creates a new 3D vector by evaluating the given component
    /// constructor for each dimension.
    pub fn with_each_component<C>(create_component: C) -> Self
    where
        C: Fn(Dim3) -> F,
    {
        Self(In3D::with_each_component(create_component))
    }

    /// Creates a new zero vector.
    pub fn zero() -> Self {
        Self::new(F::zero(), F::zero(), F::zero())
    }

    /// Creates the unit vector along the given dimension.
    pub fn unit(dim: Dim3) -> Self {
        Self::with_each_component(|d| if d == dim { F::one() } else { F::zero() })
    }

    /// Computes the squared length of the vector.
    pub fn squared_length(&self) -> F {
        self[X] * self[X] + self[Y] * self[Y] + self[Z] * self[Z]
    }

    /// Computes the length of the vector.
    pub fn length(&self) -> F {
        self.squared_length().sqrt()
    }

    /// Whether all components are finite.
    pub fn is_finite(&self) -> bool {
        self[X].is_finite() && self[Y].is_finite() && self[Z].is_finite()
    }

    /// Computes the dot product of the vector with another vector.
    pub fn dot(&self, other: &Self) -> F {
        self[X] * other[X] + self[Y] * other[Y] + self[Z] * other[Z]
    }

    /// Computes the cross product of the vector with another vector.
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self[Y] * other[Z] - self[Z] * other[Y],
            self[Z] * other[X] - self[X] * other[Z],
            self[X] * other[Y] - self[Y] * other[X],
        )
    }

    /// Normalizes the vector to have unit length.
    ///
    /// # Panics
    ///
    /// If the vector has zero length.
    pub fn normalize(&mut self) {
        let length = self.length();
        assert!(length != F::zero());
        let inv_length = length.recip();
        self[X] = self[X] * inv_length;
        self[Y] = self[Y] * inv_length;
        self[Z] = self[Z] * inv_length;
    }

    /// Returns a unit length copy of the vector, or `None` if the vector
    /// has zero or non-finite length.
    pub fn normalized(&self) -> Option<Self> {
        let length = self.length();
        if length > F::zero() && length.is_finite() {
            Some(self / length)
        } else {
            None
        }
    }

    /// Reverses the direction of the vector.
    pub fn reverse(&mut self) {
        self[X] = -self[X];
        self[Y] = -self[Y];
        self[Z] = -self[Z];
    }
}

impl<F: BFloat> Index<Dim3> for Vec3<F> {
    type Output = F;
    fn index(&self, dim: Dim3) -> &Self::Output {
        &self.0[dim]
    }
}

impl<F: BFloat> IndexMut<Dim3> for Vec3<F> {
    fn index_mut(&mut self, dim: Dim3) -> &mut Self::Output {
        &mut self.0[dim]
    }
}

impl<'a, F: BFloat> Add<&'a Vec3<F>> for &'a Vec3<F> {
    type Output = Vec3<F>;
    fn add(self, other: Self) -> Self::Output {
        Self::Output::new(self[X] + other[X], self[Y] + other[Y], self[Z] + other[Z])
    }
}

impl<F: BFloat> Add<Vec3<F>> for Vec3<F> {
    type Output = Self;
    fn add(self, other: Self) -> Self::Output {
        &self + &other
    }
}

impl<F: BFloat> Add<&Vec3<F>> for Vec3<F> {
    type Output = Self;
    fn add(self, other: &Self) -> Self::Output {
        &self + other
    }
}

impl<'a, F: BFloat> Sub<&'a Vec3<F>> for &'a Vec3<F> {
    type Output = Vec3<F>;
    fn sub(self, other: Self) -> Self::Output {
        Self::Output::new(self[X] - other[X], self[Y] - other[Y], self[Z] - other[Z])
    }
}

impl<F: BFloat> Sub<Vec3<F>> for Vec3<F> {
    type Output = Self;
    fn sub(self, other: Self) -> Self::Output {
        &self - &other
    }
}

impl<F: BFloat> Sub<&Vec3<F>> for Vec3<F> {
    type Output = Self;
    fn sub(self, other: &Self) -> Self::Output {
        &self - other
    }
}

impl<F: BFloat> Mul<F> for &Vec3<F> {
    type Output = Vec3<F>;
    fn mul(self, factor: F) -> Self::Output {
        Self::Output::new(factor * self[X], factor * self[Y], factor * self[Z])
    }
}

impl<F: BFloat> Mul<F> for Vec3<F> {
    type Output = Self;
    fn mul(self, factor: F) -> Self::Output {
        &self * factor
    }
}

impl<F: BFloat> Div<F> for &Vec3<F> {
    type Output = Vec3<F>;
    fn div(self, divisor: F) -> Self::Output {
        #![allow(clippy::suspicious_arithmetic_impl)]
        let factor = divisor.recip();
        self * factor
    }
}

impl<F: BFloat> Div<F> for Vec3<F> {
    type Output = Self;
    fn div(self, divisor: F) -> Self::Output {
        &self / divisor
    }
}

impl<F: BFloat> Neg for Vec3<F> {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self[X], -self[Y], -self[Z])
    }
}

impl<F: BFloat + fmt::Display> fmt::Display for Vec3<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        fmt::Display::fmt(&self[X], f)?;
        f.write_str(", ")?;
        fmt::Display::fmt(&self[Y], f)?;
        f.write_str(", ")?;
        fmt::Display::fmt(&self[Z], f)?;
        f.write_str(")")
    }
}

/// A 3D spatial coordinate.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct Point3<F>(In3D<F>);

impl<F: BFloat> Point3<F> {
    /// Creates a new 3D point given the three components.
    pub fn new(x: F, y: F, z: F) -> Self {
        Self(In3D::new(x, y, z))
    }

    /// Creates a new 3D point by evaluating the given component
    /// constructor for each dimension.
    pub fn with_each_component<C>(create_component: C) -> Self
    where
        C: Fn(Dim3) -> F,
    {
        Self(In3D::with_each_component(create_component))
    }

    /// Creates a new 3D point with all components set to zero.
    pub fn origin() -> Self {
        Self::new(F::zero(), F::zero(), F::zero())
    }

    /// Constructs a new vector from the point components.
    pub fn to_vec3(&self) -> Vec3<F> {
        Vec3::with_each_component(|dim| self[dim])
    }

    /// Computes the distance to the given point.
    pub fn distance_to(&self, other: &Self) -> F {
        (other - self).length()
    }

    /// Whether all components are finite.
    pub fn is_finite(&self) -> bool {
        self[X].is_finite() && self[Y].is_finite() && self[Z].is_finite()
    }
}

impl<F: BFloat> Index<Dim3> for Point3<F> {
    type Output = F;
    fn index(&self, dim: Dim3) -> &Self::Output {
        &self.0[dim]
    }
}

impl<F: BFloat> IndexMut<Dim3> for Point3<F> {
    fn index_mut(&mut self, dim: Dim3) -> &mut Self::Output {
        &mut self.0[dim]
    }
}

impl<'a, F: BFloat> Sub<&'a Point3<F>> for &'a Point3<F> {
    type Output = Vec3<F>;
    fn sub(self, other: &'a Point3<F>) -> Self::Output {
        Self::Output::new(self[X] - other[X], self[Y] - other[Y], self[Z] - other[Z])
    }
}

impl<F: BFloat> Sub<Self> for Point3<F> {
    type Output = Vec3<F>;
    fn sub(self, other: Self) -> Self::Output {
        &self - &other
    }
}

impl<'a, F: BFloat> Add<&'a Vec3<F>> for &'a Point3<F> {
    type Output = Point3<F>;
    fn add(self, vector: &Vec3<F>) -> Self::Output {
        Self::Output::new(
            self[X] + vector[X],
            self[Y] + vector[Y],
            self[Z] + vector[Z],
        )
    }
}

impl<F: BFloat> Add<Vec3<F>> for Point3<F> {
    type Output = Self;
    fn add(self, vector: Vec3<F>) -> Self::Output {
        &self + &vector
    }
}

impl<F: BFloat> Add<&Vec3<F>> for Point3<F> {
    type Output = Self;
    fn add(self, vector: &Vec3<F>) -> Self::Output {
        &self + vector
    }
}

impl<F: BFloat + fmt::Display> fmt::Display for Point3<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        fmt::Display::fmt(&self[X], f)?;
        f.write_str(", ")?;
        fmt::Display::fmt(&self[Y], f)?;
        f.write_str(", ")?;
        fmt::Display::fmt(&self[Z], f)?;
        f.write_str(")")
    }
}

/// A general 3x3 matrix stored as three rows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat3<F>([Vec3<F>; 3]);

impl<F: BFloat> Mat3<F> {
    /// Creates a new matrix from its three rows.
    pub fn from_rows(rows: [Vec3<F>; 3]) -> Self {
        Self(rows)
    }

    /// Creates a new matrix from its three columns.
    pub fn from_columns(columns: [Vec3<F>; 3]) -> Self {
        Self([
            Vec3::new(columns[0][X], columns[1][X], columns[2][X]),
            Vec3::new(columns[0][Y], columns[1][Y], columns[2][Y]),
            Vec3::new(columns[0][Z], columns[1][Z], columns[2][Z]),
        ])
    }

    /// Creates the identity matrix.
    pub fn identity() -> Self {
        Self([Vec3::unit(X), Vec3::unit(Y), Vec3::unit(Z)])
    }

    /// Returns the element at the given row and column.
    pub fn element(&self, row: Dim3, column: Dim3) -> F {
        self.0[row.num()][column]
    }

    /// Returns the given row.
    pub fn row(&self, row: Dim3) -> &Vec3<F> {
        &self.0[row.num()]
    }

    /// Computes the transposed matrix.
    pub fn transposed(&self) -> Self {
        Self::from_columns(self.0)
    }

    /// Computes the product of the matrix with the given vector.
    pub fn apply(&self, vector: &Vec3<F>) -> Vec3<F> {
        Vec3::with_each_component(|dim| self.row(dim).dot(vector))
    }

    /// Computes the matrix product `self * other`.
    pub fn product(&self, other: &Self) -> Self {
        let other_transposed = other.transposed();
        Self(
            [X, Y, Z].map(|row| {
                Vec3::with_each_component(|column| {
                    self.row(row).dot(other_transposed.row(column))
                })
            }),
        )
    }

    /// Computes the determinant of the matrix.
    pub fn determinant(&self) -> F {
        self.0[0].dot(&self.0[1].cross(&self.0[2]))
    }

    /// Whether all elements are finite.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(Vec3::is_finite)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn cross_product_is_right_handed() {
        let z = Vec3::<f64>::unit(X).cross(&Vec3::unit(Y));
        assert_eq!(z, Vec3::unit(Z));
    }

    #[test]
    fn normalized_rejects_zero_vector() {
        assert!(Vec3::<f64>::zero().normalized().is_none());
        let unit = Vec3::new(3.0, 0.0, 4.0).normalized().unwrap();
        assert!((unit.length() - 1.0_f64).abs() < 1e-15);
    }

    #[test]
    fn point_difference_is_a_vector() {
        let a = Point3::new(1.0_f64, 2.0, 3.0);
        let b = Point3::new(1.0, -2.0, 0.0);
        assert_eq!(&a - &b, Vec3::new(0.0, 4.0, 3.0));
        assert_eq!(a - b, Vec3::new(0.0, 4.0, 3.0));
        assert_eq!(b.distance_to(&a), 5.0);
    }

    #[test]
    fn matrix_product_with_transpose_of_rotation_is_identity() {
        let (s, c) = 0.3_f64.sin_cos();
        let rotation = Mat3::from_rows([
            Vec3::new(c, -s, 0.0),
            Vec3::new(s, c, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ]);
        let product = rotation.product(&rotation.transposed());
        for row in Dim3::slice() {
            for column in Dim3::slice() {
                let expected = if row == column { 1.0 } else { 0.0 };
                assert!((product.element(row, column) - expected).abs() < 1e-14);
            }
        }
        assert!((rotation.determinant() - 1.0).abs() < 1e-14);
    }

    #[test]
    fn point_arithmetic_produces_displacements() {
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = a + Vec3::new(1.0, -2.0, 0.5);
        assert_eq!(&b - &a, Vec3::new(1.0, -2.0, 0.5));
        assert_eq!(a.distance_to(&Point3::new(1.0, 2.0, 5.0)), 2.0);
    }
}
