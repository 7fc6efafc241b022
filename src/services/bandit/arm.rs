use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use super::{BanditError, BanditResult};

/// Persisted form of an arm: the design matrix `A` and reward vector `b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmState {
    pub a: Array2<f64>,
    pub b: Array1<f64>,
}

/// LinUCB learner for a single arm
///
/// Ridge regression over the context with `A = I + Σ x·xᵀ` and `b = Σ r·x`.
/// `A⁻¹` is kept alongside `A` and updated with Sherman–Morrison, so scoring
/// and updating are both O(d²).
#[derive(Debug, Clone)]
pub struct ArmModel {
    a: Array2<f64>,
    b: Array1<f64>,
    a_inv: Array2<f64>,
}

impl ArmModel {
    pub fn new(dim: usize) -> Self {
        Self {
            a: Array2::eye(dim),
            b: Array1::zeros(dim),
            a_inv: Array2::eye(dim),
        }
    }

    /// Rebuilds a learner from persisted state, recomputing `A⁻¹`
    pub fn from_state(state: ArmState, dim: usize) -> BanditResult<Self> {
        if state.a.dim() != (dim, dim) || state.b.len() != dim {
            return Err(BanditError::PersistenceUnavailable(format!(
                "arm state has shape {:?}/{}, expected {}x{}",
                state.a.dim(),
                state.b.len(),
                dim,
                dim
            )));
        }

        let a_inv = invert_spd(&state.a).ok_or_else(|| {
            BanditError::PersistenceUnavailable(
                "arm design matrix is not positive definite".to_string(),
            )
        })?;

        Ok(Self {
            a: state.a,
            b: state.b,
            a_inv,
        })
    }

    pub fn state(&self) -> ArmState {
        ArmState {
            a: self.a.clone(),
            b: self.b.clone(),
        }
    }

    pub fn dim(&self) -> usize {
        self.b.len()
    }

    /// Ridge coefficients `A⁻¹·b`
    pub fn theta(&self) -> Array1<f64> {
        self.a_inv.dot(&self.b)
    }

    /// Upper confidence bound: point estimate plus `alpha`-scaled uncertainty
    pub fn expectation(&self, context: ArrayView1<f64>, alpha: f64) -> f64 {
        let estimate = self.theta().dot(&context);
        let variance = context.dot(&self.a_inv.dot(&context));
        estimate + alpha * variance.max(0.0).sqrt()
    }

    /// Rank-one update with a binary reward
    pub fn update(&mut self, context: ArrayView1<f64>, reward: f64) {
        let column = context.insert_axis(Axis(1));
        let row = context.insert_axis(Axis(0));
        self.a += &column.dot(&row);
        self.b.scaled_add(reward, &context);

        // A⁻¹ ← A⁻¹ − (A⁻¹x)(A⁻¹x)ᵀ / (1 + xᵀA⁻¹x); A⁻¹ is symmetric
        let projected = self.a_inv.dot(&context);
        let denominator = 1.0 + context.dot(&projected);
        let correction = projected
            .view()
            .insert_axis(Axis(1))
            .dot(&projected.view().insert_axis(Axis(0)));
        self.a_inv.scaled_add(-1.0 / denominator, &correction);
    }
}

/// Inverse of a symmetric positive-definite matrix via Cholesky
///
/// Returns `None` when the matrix is not square or not positive definite.
pub fn invert_spd(matrix: &Array2<f64>) -> Option<Array2<f64>> {
    let (n, m) = matrix.dim();
    if n != m {
        return None;
    }

    let mut lower = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[[i, j]];
            for k in 0..j {
                sum -= lower[[i, k]] * lower[[j, k]];
            }
            if i == j {
                if !sum.is_finite() || sum <= 0.0 {
                    return None;
                }
                lower[[i, i]] = sum.sqrt();
            } else {
                lower[[i, j]] = sum / lower[[j, j]];
            }
        }
    }

    let mut lower_inv = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        lower_inv[[i, i]] = 1.0 / lower[[i, i]];
        for j in 0..i {
            let mut sum = 0.0;
            for k in j..i {
                sum -= lower[[i, k]] * lower_inv[[k, j]];
            }
            lower_inv[[i, j]] = sum / lower[[i, i]];
        }
    }

    // A = L·Lᵀ  ⇒  A⁻¹ = L⁻ᵀ·L⁻¹
    Some(lower_inv.t().dot(&lower_inv))
}
