//! Eigen-decomposition of symmetric 3x3 tensors with the cyclic Jacobi method.

use super::{EigenSystem3, SymTensor3};
use crate::{geometry::Vec3, tracing::ftr};

const MAX_SWEEPS: usize = 50;
const OFF_DIAGONAL_PAIRS: [(usize, usize); 3] = [(0, 1), (0, 2), (1, 2)];

/// Computes the eigenvalues and eigenvectors of a symmetric tensor.
///
/// Each Jacobi rotation zeroes one off-diagonal element; sweeps are repeated
/// until the off-diagonal part is negligible compared to the tensor norm.
pub fn solve(tensor: &SymTensor3) -> EigenSystem3 {
    let [xx, xy, xz, yy, yz, zz] = *tensor.components();
    let mut a = [[xx, xy, xz], [xy, yy, yz], [xz, yz, zz]];
    let mut v = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    let squared_norm: ftr = a.iter().flatten().map(|e| e * e).sum();
    let tolerance = ftr::EPSILON * ftr::EPSILON * squared_norm;

    for _ in 0..MAX_SWEEPS {
        let off_diagonal = a[0][1] * a[0][1] + a[0][2] * a[0][2] + a[1][2] * a[1][2];
        if off_diagonal <= tolerance || !off_diagonal.is_finite() {
            break;
        }
        for &(p, q) in &OFF_DIAGONAL_PAIRS {
            if a[p][q] == 0.0 {
                continue;
            }
            let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
            let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
            let c = 1.0 / (t * t + 1.0).sqrt();
            let s = t * c;

            for row in a.iter_mut() {
                let (akp, akq) = (row[p], row[q]);
                row[p] = c * akp - s * akq;
                row[q] = s * akp + c * akq;
            }
            for k in 0..3 {
                let (apk, aqk) = (a[p][k], a[q][k]);
                a[p][k] = c * apk - s * aqk;
                a[q][k] = s * apk + c * aqk;
            }
            for row in v.iter_mut() {
                let (vkp, vkq) = (row[p], row[q]);
                row[p] = c * vkp - s * vkq;
                row[q] = s * vkp + c * vkq;
            }
        }
    }

    let column = |j: usize| {
        let vector = Vec3::new(v[0][j], v[1][j], v[2][j]);
        vector.normalized().unwrap_or(vector)
    };
    EigenSystem3::new([a[0][0], a[1][1], a[2][2]], [column(0), column(1), column(2)])
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::geometry::Dim3;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn assert_is_eigen_pair(tensor: &SymTensor3, value: ftr, vector: &Vec3<ftr>) {
        let residual = tensor.apply(vector) - vector * value;
        for dim in Dim3::slice() {
            assert_abs_diff_eq!(residual[dim], 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn diagonal_tensor_is_sorted() {
        let eigen = solve(&SymTensor3::new(1.0, 0.0, 0.0, 5.0, 0.0, 3.0));
        assert_eq!(eigen.values(), &[5.0, 3.0, 1.0]);
        assert_abs_diff_eq!(eigen.vector(0)[Dim3::Y].abs(), 1.0);
    }

    #[test]
    fn random_tensors_decompose_into_orthonormal_eigen_pairs() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let tensor = SymTensor3::from_components([(); 6].map(|_| rng.gen_range(-1.0..1.0)));
            let eigen = solve(&tensor);
            let values = eigen.values();
            assert!(values[0] >= values[1] && values[1] >= values[2]);
            for rank in 0..3 {
                assert_abs_diff_eq!(eigen.vector(rank).length(), 1.0, epsilon = 1e-12);
                assert_is_eigen_pair(&tensor, values[rank], eigen.vector(rank));
            }
            assert_abs_diff_eq!(eigen.vector(0).dot(eigen.vector(1)), 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(values.iter().sum::<ftr>(), tensor.trace(), epsilon = 1e-12);
        }
    }

    #[test]
    fn zero_tensor_gives_identity_frame() {
        let eigen = solve(&SymTensor3::zero());
        assert_eq!(eigen.values(), &[0.0, 0.0, 0.0]);
        assert_abs_diff_eq!(eigen.vector(0).length(), 1.0);
    }
}
