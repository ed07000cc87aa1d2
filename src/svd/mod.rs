use nalgebra::linalg::SVD as NalgebraDecomposition;
use ndarray::{Array1, Array2, ArrayView2};
use nshare::{IntoNalgebra, IntoNdarray1, IntoNdarray2};

/// Thin singular value decomposition used by [`crate::dimred::pca::Pca`].
pub trait SVDImplementation {
    /// Returns the singular values and `V^T` (one right singular vector per row), or
    /// `None` when the decomposition did not converge.
    fn compute(&self, matrix: ArrayView2<f64>) -> Option<(Array1<f64>, Array2<f64>)>;
}

/// SVD backed by nalgebra's bidiagonal QR iteration.
#[derive(Debug, Clone, Copy)]
pub struct NalgebraSVD {
    eps: f64,
    max_iterations: usize,
}

impl NalgebraSVD {
    /// `max_iterations == 0` lets nalgebra iterate until convergence.
    pub fn new(eps: f64, max_iterations: usize) -> Self {
        NalgebraSVD {
            eps,
            max_iterations,
        }
    }
}

impl Default for NalgebraSVD {
    fn default() -> Self {
        Self::new(f64::EPSILON, 0)
    }
}

impl SVDImplementation for NalgebraSVD {
    fn compute(&self, matrix: ArrayView2<f64>) -> Option<(Array1<f64>, Array2<f64>)> {
        let matrix = matrix.into_nalgebra().clone_owned();
        let svd =
            NalgebraDecomposition::try_new(matrix, false, true, self.eps, self.max_iterations)?;
        let v_t = svd.v_t?;

        let s = svd.singular_values.into_ndarray1().into_owned();
        let vt = v_t.into_ndarray2().into_owned();

        Some((s, vt))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn test_simple_svd() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        let (s, vt) = NalgebraSVD::default().compute(a.view()).unwrap();

        assert_eq!(s.len(), 2);
        assert_eq!(vt.shape(), &[2, 2]);

        let mut sorted = s.to_vec();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert_abs_diff_eq!(sorted[0], 5.4649857, epsilon = 1e-6);
        assert_abs_diff_eq!(sorted[1], 0.3659662, epsilon = 1e-6);

        // rows of V^T are orthonormal
        let gram = vt.dot(&vt.t());
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_wide_matrix_is_thin() {
        let a = array![[1.0, 0.0, 2.0, 0.0], [0.0, 3.0, 0.0, 1.0]];
        let (s, vt) = NalgebraSVD::default().compute(a.view()).unwrap();

        assert_eq!(s.len(), 2);
        assert_eq!(vt.shape(), &[2, 4]);
    }
}
