//! Vector-field evaluators
//!
//! Pure functions mapping (time, state, optional external input) to a state
//! derivative of matching dimension. The time argument is unused by these
//! autonomous systems but kept for solver-interface compatibility. External
//! inputs are held constant over a single integration interval by the
//! cascade scheduler.
//!
//! Two parameterizations of the plant's dy equation exist in the wild:
//! `rho*x - y - x*z` (used by the observer pipeline) and `x*(rho - z) - y`
//! (used by the ensemble divergence study). They expand to the same
//! expression; both are kept so each driver evaluates the literal form its
//! counterpart tests were written against.

use crate::params::LorenzParams;

/// Lorenz plant dynamics.
pub fn plant_field(params: &LorenzParams, _t: f64, state: &[f64; 3]) -> [f64; 3] {
    let [x, y, z] = *state;
    [
        params.sigma * (y - x),
        params.rho * x - y - x * z,
        x * y - params.beta * z,
    ]
}

/// Plain chaotic field used by the ensemble path (variant dy form).
pub fn chaos_field(params: &LorenzParams, _t: f64, state: &[f64; 3]) -> [f64; 3] {
    let [x, y, z] = *state;
    [
        params.sigma * (y - x),
        x * (params.rho - z) - y,
        x * y - params.beta * z,
    ]
}

/// YZ-observer block, driven by the noisy x measurement.
pub fn observer_yz_field(
    params: &LorenzParams,
    _t: f64,
    state: &[f64; 2],
    x_meas: f64,
) -> [f64; 2] {
    let [y_hat, z_hat] = *state;
    [
        params.rho * x_meas - y_hat - x_meas * z_hat,
        -params.beta * z_hat + x_meas * y_hat,
    ]
}

/// X-observer block, driven by the YZ-block's fresh y estimate.
pub fn observer_x_field(params: &LorenzParams, _t: f64, state: &[f64; 1], y_hat: f64) -> [f64; 1] {
    [params.sigma * (y_hat - state[0])]
}
