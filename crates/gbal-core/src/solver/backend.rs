use anyhow::{anyhow, Result};
use faer::{prelude::*, solvers::PartialPivLu, Mat};

/// Solves a dense square system `A x = b`.
///
/// The DC load flow builds one reduced susceptance matrix per synchronous
/// component and hands it to a backend; a singular matrix must come back as
/// an error so the component can be reported as failed.
pub trait LinearSystemBackend: Send + Sync {
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>>;
}

fn check_dimensions(matrix: &[Vec<f64>], rhs: &[f64]) -> Result<()> {
    let n = matrix.len();
    if rhs.len() != n {
        return Err(anyhow!(
            "rhs length ({}) does not match matrix dimension {}",
            rhs.len(),
            n
        ));
    }
    if matrix.iter().any(|row| row.len() != n) {
        return Err(anyhow!("matrix must be square"));
    }
    Ok(())
}

/// Gauss-Jordan elimination with partial pivoting.
#[derive(Debug, Clone, Default)]
pub struct GaussSolver;

impl LinearSystemBackend for GaussSolver {
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>> {
        if matrix.is_empty() {
            return Ok(Vec::new());
        }
        check_dimensions(matrix, rhs)?;
        let n = matrix.len();

        let mut a = matrix.to_vec();
        let mut b = rhs.to_vec();

        for i in 0..n {
            let pivot = (i..n)
                .max_by(|&r1, &r2| a[r1][i].abs().total_cmp(&a[r2][i].abs()))
                .unwrap_or(i);
            if pivot != i {
                a.swap(i, pivot);
                b.swap(i, pivot);
            }

            let diag = a[i][i];
            if diag.abs() < 1e-12 {
                return Err(anyhow!("singular matrix (zero pivot in column {})", i));
            }

            for value in a[i][i..].iter_mut() {
                *value /= diag;
            }
            b[i] /= diag;

            let pivot_segment = a[i][i..].to_vec();
            for row in 0..n {
                if row == i {
                    continue;
                }
                let factor = a[row][i];
                if factor == 0.0 {
                    continue;
                }
                for (target, &pivot) in a[row][i..].iter_mut().zip(pivot_segment.iter()) {
                    *target -= factor * pivot;
                }
                b[row] -= factor * b[i];
            }
        }

        Ok(b)
    }
}

/// LU factorisation with partial pivoting from `faer`.
///
/// `faer` does not report singularity itself, so a solution that is not
/// finite is rejected.
#[derive(Debug, Clone, Default)]
pub struct FaerSolver;

impl LinearSystemBackend for FaerSolver {
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>> {
        if matrix.is_empty() {
            return Ok(Vec::new());
        }
        check_dimensions(matrix, rhs)?;
        let n = matrix.len();

        let mat = Mat::from_fn(n, n, |i, j| matrix[i][j]);
        let rhs_mat = Mat::from_fn(n, 1, |i, _| rhs[i]);
        let lu = PartialPivLu::new(mat.as_ref());
        let sol = lu.solve(&rhs_mat);

        let solution: Vec<f64> = (0..n).map(|i| sol.read(i, 0)).collect();
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(anyhow!("singular matrix (non-finite LU solution)"));
        }
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_bus_system() -> (Vec<Vec<f64>>, Vec<f64>) {
        (
            vec![
                vec![20.0, -10.0, 0.0],
                vec![-10.0, 30.0, -20.0],
                vec![0.0, -20.0, 20.0],
            ],
            vec![1.0, 2.0, -3.0],
        )
    }

    #[test]
    fn backends_agree_on_small_susceptance_system() {
        let (matrix, rhs) = three_bus_system();
        let gauss = GaussSolver.solve(&matrix, &rhs).unwrap();
        let faer = FaerSolver.solve(&matrix, &rhs).unwrap();
        for (g, f) in gauss.iter().zip(faer.iter()) {
            assert!((g - f).abs() < 1e-9, "gauss {g} vs faer {f}");
        }
    }

    #[test]
    fn gauss_rejects_singular_matrix() {
        let matrix = vec![vec![1.0, -1.0], vec![-1.0, 1.0]];
        let err = GaussSolver.solve(&matrix, &[1.0, -1.0]).unwrap_err();
        assert!(err.to_string().contains("singular"));
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let matrix = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert!(GaussSolver.solve(&matrix, &[1.0]).is_err());
        assert!(FaerSolver.solve(&matrix, &[1.0]).is_err());
        assert!(GaussSolver.solve(&[vec![1.0, 2.0]], &[1.0]).is_err());
    }

    #[test]
    fn empty_system_has_empty_solution() {
        assert!(GaussSolver.solve(&[], &[]).unwrap().is_empty());
        assert!(FaerSolver.solve(&[], &[]).unwrap().is_empty());
    }
}
