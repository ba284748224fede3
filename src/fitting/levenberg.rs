//! Bounded two-parameter Levenberg-Marquardt
//!
//! Parameters are clamped into a box after every step. Jacobians are
//! central differences so any residual function can be minimised.

use crate::constants::{
    INITIAL_DAMPING, JACOBIAN_STEP, MAX_DAMPING, MIN_DAMPING, MIN_PARAMETER_STEP,
    NORMAL_EQUATION_EPSILON,
};
use crate::error::{CalibrationError, Result};

pub type Params = [f64; 2];

#[derive(Debug, Clone, Copy)]
pub struct LmSettings {
    pub max_iterations: usize,
    /// Relative cost decrease below which a step counts as converged
    pub tolerance: f64,
    pub lower: Params,
    pub upper: Params,
}

impl LmSettings {
    pub fn clamp(&self, p: Params) -> Params {
        [
            p[0].clamp(self.lower[0], self.upper[0]),
            p[1].clamp(self.lower[1], self.upper[1]),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmOutcome {
    pub params: Params,
    /// Sum of squared residuals at `params`
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Minimise `sum(r_i^2)` where `residuals(p, r)` fills `r`.
///
/// `observe` sees every evaluated point with its cost. Running out of
/// iterations is not an error: the outcome is returned with
/// `converged == false`.
pub fn minimize<R, O>(
    mut residuals: R,
    n: usize,
    start: Params,
    settings: &LmSettings,
    mut observe: O,
) -> Result<LmOutcome>
where
    R: FnMut(&Params, &mut [f64]) -> Result<()>,
    O: FnMut(&Params, f64),
{
    let mut r = vec![0.0; n];
    let mut r_plus = vec![0.0; n];
    let mut r_minus = vec![0.0; n];
    let mut jacobian = [vec![0.0; n], vec![0.0; n]];

    let mut p = settings.clamp(start);
    let mut cost = evaluate(&mut residuals, &p, &mut r)?;
    observe(&p, cost);
    let mut damping = INITIAL_DAMPING;

    for iteration in 0..settings.max_iterations {
        for (j, column) in jacobian.iter_mut().enumerate() {
            let mut plus = p;
            let mut minus = p;
            plus[j] += JACOBIAN_STEP;
            minus[j] -= JACOBIAN_STEP;
            residuals(&plus, &mut r_plus)?;
            residuals(&minus, &mut r_minus)?;
            for i in 0..n {
                column[i] = (r_plus[i] - r_minus[i]) / (2.0 * JACOBIAN_STEP);
            }
        }

        let mut a = [[0.0; 2]; 2];
        let mut g = [0.0; 2];
        for row in 0..2 {
            for col in 0..2 {
                a[row][col] = dot(&jacobian[row], &jacobian[col]);
            }
            g[row] = dot(&jacobian[row], &r);
        }

        loop {
            let m00 = a[0][0] * (1.0 + damping) + NORMAL_EQUATION_EPSILON;
            let m11 = a[1][1] * (1.0 + damping) + NORMAL_EQUATION_EPSILON;
            let m01 = a[0][1];
            let det = m00 * m11 - m01 * m01;
            let step = [
                (-g[0] * m11 + g[1] * m01) / det,
                (-g[1] * m00 + g[0] * m01) / det,
            ];

            let candidate = settings.clamp([p[0] + step[0], p[1] + step[1]]);
            let candidate_cost = if step[0].is_finite() && step[1].is_finite() {
                let c = evaluate(&mut residuals, &candidate, &mut r)?;
                observe(&candidate, c);
                c
            } else {
                f64::INFINITY
            };

            if candidate_cost < cost {
                let moved = (candidate[0] - p[0]).abs() + (candidate[1] - p[1]).abs();
                let converged = (cost - candidate_cost) <= settings.tolerance * (1.0 + cost)
                    || moved < MIN_PARAMETER_STEP;
                p = candidate;
                cost = candidate_cost;
                damping = (damping / 10.0).max(MIN_DAMPING);
                if converged {
                    return Ok(LmOutcome {
                        params: p,
                        cost,
                        iterations: iteration + 1,
                        converged: true,
                    });
                }
                break;
            }

            damping *= 10.0;
            if damping > MAX_DAMPING {
                // no descent direction left from p
                return Ok(LmOutcome {
                    params: p,
                    cost,
                    iterations: iteration + 1,
                    converged: true,
                });
            }
        }
    }

    Ok(LmOutcome {
        params: p,
        cost,
        iterations: settings.max_iterations,
        converged: false,
    })
}

fn evaluate<R>(residuals: &mut R, p: &Params, r: &mut [f64]) -> Result<f64>
where
    R: FnMut(&Params, &mut [f64]) -> Result<()>,
{
    residuals(p, r)?;
    let cost: f64 = r.iter().map(|x| x * x).sum();
    if cost.is_finite() {
        Ok(cost)
    } else {
        Err(CalibrationError::NumericDivergence(format!(
            "misfit is {} at ({}, {})",
            cost, p[0], p[1]
        )))
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LmSettings {
        LmSettings {
            max_iterations: 200,
            tolerance: 1e-12,
            lower: [-10.0, -10.0],
            upper: [10.0, 10.0],
        }
    }

    /// Rosenbrock as residuals: r0 = 1 - x, r1 = 10 (y - x^2)
    fn rosenbrock(p: &Params, r: &mut [f64]) -> Result<()> {
        r[0] = 1.0 - p[0];
        r[1] = 10.0 * (p[1] - p[0] * p[0]);
        Ok(())
    }

    #[test]
    fn test_linear_least_squares() {
        // fit y = a + b x to exact data
        let xs = [0.0, 1.0, 2.0, 3.0];
        let outcome = minimize(
            |p: &Params, r: &mut [f64]| {
                for (i, x) in xs.iter().enumerate() {
                    r[i] = (2.0 + 0.5 * x) - (p[0] + p[1] * x);
                }
                Ok(())
            },
            xs.len(),
            [0.0, 0.0],
            &settings(),
            |_, _| {},
        )
        .unwrap();
        assert!(outcome.converged);
        assert!((outcome.params[0] - 2.0).abs() < 1e-6);
        assert!((outcome.params[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rosenbrock() {
        let outcome = minimize(rosenbrock, 2, [-1.2, 1.0], &settings(), |_, _| {}).unwrap();
        assert!(outcome.converged);
        assert!((outcome.params[0] - 1.0).abs() < 1e-4, "{:?}", outcome);
        assert!((outcome.params[1] - 1.0).abs() < 1e-4, "{:?}", outcome);
    }

    #[test]
    fn test_respects_bounds() {
        let mut bounded = settings();
        bounded.upper = [0.5, 10.0];
        let outcome = minimize(rosenbrock, 2, [0.0, 0.0], &bounded, |_, _| {}).unwrap();
        assert!(outcome.params[0] <= 0.5);
        assert!((outcome.params[0] - 0.5).abs() < 1e-3, "{:?}", outcome);
    }

    #[test]
    fn test_budget_exhaustion_is_flagged() {
        let mut tight = settings();
        tight.max_iterations = 1;
        let outcome = minimize(rosenbrock, 2, [-1.2, 1.0], &tight, |_, _| {}).unwrap();
        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 1);
    }

    #[test]
    fn test_observer_sees_every_evaluation() {
        let mut seen = Vec::new();
        let outcome = minimize(rosenbrock, 2, [-1.2, 1.0], &settings(), |p, c| {
            seen.push((*p, c))
        })
        .unwrap();
        assert!(!seen.is_empty());
        let best = seen.iter().map(|(_, c)| *c).fold(f64::INFINITY, f64::min);
        assert_eq!(best, outcome.cost);
    }

    #[test]
    fn test_non_finite_residuals_surface() {
        let result = minimize(
            |_: &Params, r: &mut [f64]| {
                r[0] = f64::NAN;
                Ok(())
            },
            1,
            [0.0, 0.0],
            &settings(),
            |_, _| {},
        );
        assert!(matches!(result, Err(CalibrationError::NumericDivergence(_))));
    }
}
