//! A small damped Gauss-Newton (Levenberg-Marquardt) solver.
//!
//! Sized for the models in this crate: a handful of parameters, numeric
//! central-difference Jacobian, Marquardt-scaled damping. Not a general
//! optimizer.

use crate::error::{FitError, FitResult};

/// Tuning knobs for [`levenberg_marquardt`].
#[derive(Debug, Clone, Copy)]
pub struct LmOptions {
    /// Iteration budget before giving up.
    pub max_iterations: usize,
    /// Relative sum-of-squares improvement below which the fit is
    /// considered converged.
    pub tolerance: f64,
    /// Initial damping factor.
    pub initial_lambda: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-12,
            initial_lambda: 1e-3,
        }
    }
}

fn sum_of_squares<M>(model: &M, t: &[f64], y: &[f64], p: &[f64]) -> f64
where
    M: Fn(f64, &[f64]) -> f64,
{
    t.iter()
        .zip(y.iter())
        .map(|(&ti, &yi)| {
            let r = yi - model(ti, p);
            r * r
        })
        .sum()
}

/// Solve the dense system `a x = b` in place by Gaussian elimination with
/// partial pivoting. Returns `None` if a pivot collapses.
fn solve_in_place(a: &mut [Vec<f64>], b: &mut [f64]) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot_row][col].abs() < 1e-300 {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);
        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in (row + 1)..n {
            acc -= a[row][k] * x[k];
        }
        x[row] = acc / a[row][row];
    }
    Some(x)
}

/// Fit `model(t, p)` to `(t, y)` starting from `p0`, minimizing the sum
/// of squared residuals. Returns the fitted parameter vector.
pub fn levenberg_marquardt<M>(
    model: M,
    t: &[f64],
    y: &[f64],
    p0: &[f64],
    options: &LmOptions,
) -> FitResult<Vec<f64>>
where
    M: Fn(f64, &[f64]) -> f64,
{
    if t.len() != y.len() {
        return Err(FitError::MismatchedLengths {
            t_len: t.len(),
            y_len: y.len(),
        });
    }
    let n = t.len();
    let k = p0.len();
    if n < k {
        return Err(FitError::InsufficientData { needed: k, got: n });
    }

    let mut p = p0.to_vec();
    let mut ssr = sum_of_squares(&model, t, y, &p);
    let mut lambda = options.initial_lambda;
    let data_scale: f64 = y.iter().map(|&yi| yi * yi).sum::<f64>().max(1e-300);

    for iteration in 0..options.max_iterations {
        // central-difference Jacobian of the residuals
        let mut jacobian = vec![vec![0.0; k]; n];
        for j in 0..k {
            let h = 1e-6 * p[j].abs().max(1e-9);
            let mut p_hi = p.clone();
            let mut p_lo = p.clone();
            p_hi[j] += h;
            p_lo[j] -= h;
            for (i, &ti) in t.iter().enumerate() {
                jacobian[i][j] = (model(ti, &p_hi) - model(ti, &p_lo)) / (2.0 * h);
            }
        }

        // normal equations with Marquardt damping
        let mut a = vec![vec![0.0; k]; k];
        let mut g = vec![0.0; k];
        for i in 0..n {
            let r = y[i] - model(t[i], &p);
            for row in 0..k {
                g[row] += jacobian[i][row] * r;
                for col in 0..k {
                    a[row][col] += jacobian[i][row] * jacobian[i][col];
                }
            }
        }
        for (row, a_row) in a.iter_mut().enumerate() {
            a_row[row] *= 1.0 + lambda;
        }

        let Some(delta) = solve_in_place(&mut a, &mut g) else {
            lambda *= 10.0;
            if lambda > 1e12 {
                return Err(FitError::Singular { iteration });
            }
            continue;
        };

        let trial: Vec<f64> = p.iter().zip(delta.iter()).map(|(&pj, &dj)| pj + dj).collect();
        let trial_ssr = sum_of_squares(&model, t, y, &trial);
        let step_small = delta
            .iter()
            .zip(p.iter())
            .all(|(&dj, &pj)| dj.abs() <= 1e-12 * (1.0 + pj.abs()));

        if trial_ssr <= ssr {
            let improvement = ssr - trial_ssr;
            p = trial;
            ssr = trial_ssr;
            lambda = (lambda * 0.5).max(1e-12);
            if improvement <= options.tolerance * ssr.max(1e-30)
                || ssr <= 1e-24 * data_scale
                || step_small
            {
                return Ok(p);
            }
        } else if step_small {
            // proposal is already at numerical resolution: a plateau, not
            // a failure
            return Ok(p);
        } else {
            lambda *= 4.0;
            if lambda > 1e12 {
                return Err(FitError::DidNotConverge {
                    iterations: iteration + 1,
                });
            }
        }
    }

    Err(FitError::DidNotConverge {
        iterations: options.max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_model_exact() {
        let t: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = t.iter().map(|&ti| 3.0 * ti - 7.0).collect();
        let p = levenberg_marquardt(
            |ti, p| p[0] * ti + p[1],
            &t,
            &y,
            &[1.0, 0.0],
            &LmOptions::default(),
        )
        .unwrap();
        assert!((p[0] - 3.0).abs() < 1e-8);
        assert!((p[1] + 7.0).abs() < 1e-8);
    }

    #[test]
    fn test_exponential_model() {
        let t: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = t.iter().map(|&ti| 2.0 * (-ti / 1.5).exp()).collect();
        let p = levenberg_marquardt(
            |ti, p| p[0] * (-ti / p[1]).exp(),
            &t,
            &y,
            &[1.0, 1.0],
            &LmOptions::default(),
        )
        .unwrap();
        assert!((p[0] - 2.0).abs() < 1e-6);
        assert!((p[1] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_underdetermined_rejected() {
        let err = levenberg_marquardt(
            |ti, p| p[0] * ti + p[1],
            &[0.0],
            &[1.0],
            &[0.0, 0.0],
            &LmOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { .. }));
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let err = levenberg_marquardt(
            |ti, p| p[0] * ti,
            &[0.0, 1.0],
            &[1.0],
            &[0.0],
            &LmOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FitError::MismatchedLengths { .. }));
    }
}
