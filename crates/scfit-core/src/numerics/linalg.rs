use crate::domain::ScfitError;
use faer::Mat;

pub type DenseMatrix = Mat<f64>;

const SINGULAR_PIVOT_EPSILON: f64 = 1.0e-300;
const ILL_CONDITIONED_RELATIVE_PIVOT_EPSILON: f64 = 1.0e-14;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LuError {
    #[error("LU factorization requires a square matrix, got {rows}x{cols}")]
    NonSquareMatrix { rows: usize, cols: usize },
    #[error("LU factorization requires a non-empty matrix")]
    EmptyMatrix,
    #[error("matrix is singular at pivot index {pivot_index}")]
    SingularMatrix { pivot_index: usize },
    #[error("matrix is ill-conditioned at pivot index {pivot_index}")]
    IllConditionedMatrix { pivot_index: usize },
    #[error("right-hand side length mismatch: expected {expected}, got {actual}")]
    RhsLengthMismatch { expected: usize, actual: usize },
}

impl From<LuError> for ScfitError {
    fn from(error: LuError) -> Self {
        let placeholder = match error {
            LuError::SingularMatrix { .. } | LuError::IllConditionedMatrix { .. } => {
                "COMPUTE.SINGULAR_SYSTEM"
            }
            _ => "COMPUTE.LINEAR_ALGEBRA",
        };
        ScfitError::computation(placeholder, format!("linear solve failed: {error}"))
    }
}

#[derive(Debug, Clone)]
pub struct LuDecomposition {
    lu: DenseMatrix,
    pivots: Vec<usize>,
    input_norm_infty: f64,
}

impl LuDecomposition {
    pub fn dimension(&self) -> usize {
        self.lu.nrows()
    }

    pub fn pivots(&self) -> &[usize] {
        &self.pivots
    }

    pub fn invert(&self) -> Result<DenseMatrix, LuError> {
        let dimension = self.dimension();
        for pivot_index in 0..dimension {
            let diagonal = self.lu[(pivot_index, pivot_index)];
            if diagonal.abs() <= self.input_norm_infty * ILL_CONDITIONED_RELATIVE_PIVOT_EPSILON {
                return Err(LuError::IllConditionedMatrix { pivot_index });
            }
        }

        let mut inverse = DenseMatrix::zeros(dimension, dimension);
        let mut basis = vec![0.0; dimension];
        for col in 0..dimension {
            basis.fill(0.0);
            basis[col] = 1.0;

            let solution = self.solve(&basis)?;
            for (row, value) in solution.into_iter().enumerate() {
                inverse[(row, col)] = value;
            }
        }

        Ok(inverse)
    }

    pub fn solve(&self, rhs: &[f64]) -> Result<Vec<f64>, LuError> {
        let dimension = self.dimension();
        if rhs.len() != dimension {
            return Err(LuError::RhsLengthMismatch {
                expected: dimension,
                actual: rhs.len(),
            });
        }

        let mut forward = vec![0.0; dimension];
        for row in 0..dimension {
            let mut value = rhs[self.pivots[row]];
            for col in 0..row {
                value -= self.lu[(row, col)] * forward[col];
            }
            forward[row] = value;
        }

        let mut solution = vec![0.0; dimension];
        for row in (0..dimension).rev() {
            let mut value = forward[row];
            for col in (row + 1)..dimension {
                value -= self.lu[(row, col)] * solution[col];
            }

            let diagonal = self.lu[(row, row)];
            if diagonal.abs() <= SINGULAR_PIVOT_EPSILON {
                return Err(LuError::SingularMatrix { pivot_index: row });
            }
            solution[row] = value / diagonal;
        }

        Ok(solution)
    }
}

/// Doolittle LU with partial pivoting.
pub fn lu_factorize(matrix: &DenseMatrix) -> Result<LuDecomposition, LuError> {
    let dimension = validate_square_shape(matrix)?;
    let input_norm_infty = matrix_infinity_norm(matrix);
    let mut lu = matrix.clone();
    let mut pivots: Vec<usize> = (0..dimension).collect();

    for pivot_col in 0..dimension {
        let pivot_row = select_pivot_row(&lu, pivot_col);
        let pivot = lu[(pivot_row, pivot_col)];
        if pivot.abs() <= SINGULAR_PIVOT_EPSILON
            || pivot.abs() <= input_norm_infty * f64::EPSILON
        {
            return Err(LuError::SingularMatrix {
                pivot_index: pivot_col,
            });
        }

        if pivot_row != pivot_col {
            swap_rows(&mut lu, pivot_col, pivot_row);
            pivots.swap(pivot_col, pivot_row);
        }

        for row in (pivot_col + 1)..dimension {
            let multiplier = lu[(row, pivot_col)] / pivot;
            lu[(row, pivot_col)] = multiplier;
            for col in (pivot_col + 1)..dimension {
                let updated = lu[(row, col)] - multiplier * lu[(pivot_col, col)];
                lu[(row, col)] = updated;
            }
        }
    }

    Ok(LuDecomposition {
        lu,
        pivots,
        input_norm_infty,
    })
}

pub fn lu_solve(matrix: &DenseMatrix, rhs: &[f64]) -> Result<Vec<f64>, LuError> {
    lu_factorize(matrix)?.solve(rhs)
}

pub fn lu_invert(matrix: &DenseMatrix) -> Result<DenseMatrix, LuError> {
    lu_factorize(matrix)?.invert()
}

fn validate_square_shape(matrix: &DenseMatrix) -> Result<usize, LuError> {
    let rows = matrix.nrows();
    let cols = matrix.ncols();
    if rows == 0 || cols == 0 {
        return Err(LuError::EmptyMatrix);
    }
    if rows != cols {
        return Err(LuError::NonSquareMatrix { rows, cols });
    }
    Ok(rows)
}

fn select_pivot_row(matrix: &DenseMatrix, pivot_col: usize) -> usize {
    let mut best_row = pivot_col;
    let mut best = matrix[(pivot_col, pivot_col)].abs();
    for row in (pivot_col + 1)..matrix.nrows() {
        let candidate = matrix[(row, pivot_col)].abs();
        if candidate > best {
            best = candidate;
            best_row = row;
        }
    }
    best_row
}

fn swap_rows(matrix: &mut DenseMatrix, lhs: usize, rhs: usize) {
    for col in 0..matrix.ncols() {
        let value = matrix[(lhs, col)];
        matrix[(lhs, col)] = matrix[(rhs, col)];
        matrix[(rhs, col)] = value;
    }
}

fn matrix_infinity_norm(matrix: &DenseMatrix) -> f64 {
    (0..matrix.nrows())
        .map(|row| (0..matrix.ncols()).map(|col| matrix[(row, col)].abs()).sum::<f64>())
        .fold(0.0, f64::max)
}
