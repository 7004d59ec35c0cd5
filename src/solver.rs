//! Single-interval integrator
//!
//! Embedded adaptive Runge-Kutta 4(5) (Cash-Karp tableau) advancing a state
//! vector over one closed interval and returning the state at the interval
//! end. The cascade scheduler calls this once per small dt rather than over
//! the whole horizon, so the initial trial step is the interval itself and
//! most calls accept in one or two internal steps.
//!
//! The state dimension is a const generic: a vector field returning the
//! wrong dimension is a type error, so no runtime dimension checks exist.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance and budget settings for the adaptive stepper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Absolute error tolerance per component.
    pub abs_tol: f64,
    /// Relative error tolerance per component.
    pub rel_tol: f64,
    /// Maximum internal steps (accepted or rejected) per interval.
    pub max_steps: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            abs_tol: 1e-8,
            rel_tol: 1e-8,
            max_steps: 10_000,
        }
    }
}

impl SolverSettings {
    pub(crate) fn validate_msg(&self) -> Option<&'static str> {
        if !(self.abs_tol.is_finite() && self.abs_tol > 0.0) {
            return Some("solver abs_tol must be finite and > 0");
        }
        if !(self.rel_tol.is_finite() && self.rel_tol > 0.0) {
            return Some("solver rel_tol must be finite and > 0");
        }
        if self.max_steps == 0 {
            return Some("solver max_steps must be > 0");
        }
        None
    }
}

/// Failure of a single-interval integration. Fatal for the whole run: the
/// cascade has no fallback state, so the caller aborts instead of retrying.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SolverError {
    /// State or derivative became NaN or infinite.
    #[error("state became non-finite during integration")]
    NonFinite,
    /// Step budget exhausted before reaching the interval end.
    #[error("exceeded {0} internal steps without reaching the interval end")]
    MaxStepsExceeded(usize),
}

// Cash-Karp 4(5) tableau.
const C: [f64; 6] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 3.0 / 5.0, 1.0, 7.0 / 8.0];
const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 3.0 / 10.0;
const A42: f64 = -9.0 / 10.0;
const A43: f64 = 6.0 / 5.0;
const A51: f64 = -11.0 / 54.0;
const A52: f64 = 5.0 / 2.0;
const A53: f64 = -70.0 / 27.0;
const A54: f64 = 35.0 / 27.0;
const A61: f64 = 1631.0 / 55296.0;
const A62: f64 = 175.0 / 512.0;
const A63: f64 = 575.0 / 13824.0;
const A64: f64 = 44275.0 / 110592.0;
const A65: f64 = 253.0 / 4096.0;
// 5th-order weights.
const B5: [f64; 6] = [
    37.0 / 378.0,
    0.0,
    250.0 / 621.0,
    125.0 / 594.0,
    0.0,
    512.0 / 1771.0,
];
// Embedded 4th-order weights.
const B4: [f64; 6] = [
    2825.0 / 27648.0,
    0.0,
    18575.0 / 48384.0,
    13525.0 / 55296.0,
    277.0 / 14336.0,
    1.0 / 4.0,
];

const SAFETY: f64 = 0.9;
const MIN_SCALE: f64 = 0.2;
const MAX_SCALE: f64 = 5.0;

/// Integrate `field` from `t0` to `t1` starting at `y0`, returning the state
/// at `t1`. Degenerate intervals (`t1 <= t0`) return `y0` unchanged.
pub fn integrate<const N: usize>(
    field: impl Fn(f64, &[f64; N]) -> [f64; N],
    t0: f64,
    t1: f64,
    y0: [f64; N],
    settings: &SolverSettings,
) -> Result<[f64; N], SolverError> {
    if !(t1 > t0) {
        return Ok(y0);
    }

    let mut t = t0;
    let mut y = y0;
    let mut h = t1 - t0;
    let mut steps = 0usize;

    while t < t1 {
        if steps >= settings.max_steps {
            return Err(SolverError::MaxStepsExceeded(settings.max_steps));
        }
        steps += 1;

        h = h.min(t1 - t);

        let (y5, err) = cash_karp_step(&field, t, &y, h, settings)?;

        if err <= 1.0 {
            t += h;
            y = y5;
            if !y.iter().all(|v| v.is_finite()) {
                return Err(SolverError::NonFinite);
            }
        }

        // Step-size controller: grow on small error, shrink on rejection.
        let scale = if err > 0.0 {
            (SAFETY * err.powf(-0.2)).clamp(MIN_SCALE, MAX_SCALE)
        } else {
            MAX_SCALE
        };
        h *= scale;
        if !h.is_finite() || h <= 0.0 {
            return Err(SolverError::NonFinite);
        }
    }

    Ok(y)
}

/// One embedded Cash-Karp step. Returns the 5th-order solution and the
/// tolerance-normalized error estimate (<= 1 means accept).
fn cash_karp_step<const N: usize>(
    field: &impl Fn(f64, &[f64; N]) -> [f64; N],
    t: f64,
    y: &[f64; N],
    h: f64,
    settings: &SolverSettings,
) -> Result<([f64; N], f64), SolverError> {
    let k1 = field(t + C[0] * h, y);

    let mut stage = [0.0; N];
    for i in 0..N {
        stage[i] = y[i] + h * A21 * k1[i];
    }
    let k2 = field(t + C[1] * h, &stage);

    for i in 0..N {
        stage[i] = y[i] + h * (A31 * k1[i] + A32 * k2[i]);
    }
    let k3 = field(t + C[2] * h, &stage);

    for i in 0..N {
        stage[i] = y[i] + h * (A41 * k1[i] + A42 * k2[i] + A43 * k3[i]);
    }
    let k4 = field(t + C[3] * h, &stage);

    for i in 0..N {
        stage[i] = y[i] + h * (A51 * k1[i] + A52 * k2[i] + A53 * k3[i] + A54 * k4[i]);
    }
    let k5 = field(t + C[4] * h, &stage);

    for i in 0..N {
        stage[i] =
            y[i] + h * (A61 * k1[i] + A62 * k2[i] + A63 * k3[i] + A64 * k4[i] + A65 * k5[i]);
    }
    let k6 = field(t + C[5] * h, &stage);

    let stages = [k1, k2, k3, k4, k5, k6];
    let mut y5 = [0.0; N];
    let mut y4 = [0.0; N];
    for i in 0..N {
        let mut acc5 = 0.0;
        let mut acc4 = 0.0;
        for (s, k) in stages.iter().enumerate() {
            acc5 += B5[s] * k[i];
            acc4 += B4[s] * k[i];
        }
        y5[i] = y[i] + h * acc5;
        y4[i] = y[i] + h * acc4;
    }

    let mut err = 0.0f64;
    for i in 0..N {
        let tol = settings.abs_tol + settings.rel_tol * y[i].abs().max(y5[i].abs());
        let e = (y5[i] - y4[i]).abs() / tol;
        if !e.is_finite() {
            return Err(SolverError::NonFinite);
        }
        err = err.max(e);
    }

    Ok((y5, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrates_exponential_decay() {
        let settings = SolverSettings::default();
        let y = integrate(|_t, y: &[f64; 1]| [-y[0]], 0.0, 1.0, [1.0], &settings).unwrap();
        assert!((y[0] - (-1.0f64).exp()).abs() < 1e-6);
    }

    #[test]
    fn integrates_harmonic_oscillator_over_a_full_period() {
        let settings = SolverSettings::default();
        let tau = 2.0 * std::f64::consts::PI;
        let y = integrate(
            |_t, y: &[f64; 2]| [y[1], -y[0]],
            0.0,
            tau,
            [1.0, 0.0],
            &settings,
        )
        .unwrap();
        assert!((y[0] - 1.0).abs() < 1e-5);
        assert!(y[1].abs() < 1e-5);
    }

    #[test]
    fn degenerate_interval_returns_initial_state() {
        let settings = SolverSettings::default();
        let y = integrate(|_t, y: &[f64; 1]| [-y[0]], 1.0, 1.0, [0.7], &settings).unwrap();
        assert_eq!(y, [0.7]);
    }

    #[test]
    fn non_finite_field_output_is_reported() {
        let settings = SolverSettings::default();
        let result = integrate(
            |_t, _y: &[f64; 1]| [f64::NAN],
            0.0,
            0.1,
            [1.0],
            &settings,
        );
        assert_eq!(result, Err(SolverError::NonFinite));
    }

    #[test]
    fn step_budget_exhaustion_is_reported() {
        let settings = SolverSettings {
            max_steps: 2,
            ..SolverSettings::default()
        };
        // Violent exponential growth rejects every trial step at this scale.
        let result = integrate(|_t, y: &[f64; 1]| [1e6 * y[0]], 0.0, 10.0, [1.0], &settings);
        assert_eq!(result, Err(SolverError::MaxStepsExceeded(2)));
    }
}
