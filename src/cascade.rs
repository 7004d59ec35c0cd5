//! Cascade step scheduler
//!
//! Advances the coupled plant/observer state by exactly one timestep in a
//! fixed causal order:
//!
//! 1. integrate the plant over the interval,
//! 2. draw fresh Gaussian noise and form the x measurement,
//! 3. integrate the YZ-observer with the measurement held constant,
//! 4. integrate the X-observer with the y estimate just produced,
//! 5. assemble the new observer state.
//!
//! The order is the core invariant. The three integrations are deliberately
//! separate solver invocations rather than one fused six-dimensional system:
//! fusing them would let the observer see plant state it has not measured.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::fields;
use crate::params::LorenzParams;
use crate::solver::{self, SolverError, SolverSettings};
use crate::state::{ObserverState, PlantState};

/// Output of one cascade step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeStep {
    pub plant: PlantState,
    pub observer: ObserverState,
    pub measurement: f64,
}

/// Advance plant, measurement and both observer blocks over `[t_prev,
/// t_prev + dt]`. Solver failure in any block is fatal for the step.
#[allow(clippy::too_many_arguments)]
pub fn advance_cascade<R: Rng>(
    params: &LorenzParams,
    settings: &SolverSettings,
    t_prev: f64,
    dt: f64,
    plant: &PlantState,
    observer: &ObserverState,
    noise: &Normal<f64>,
    rng: &mut R,
) -> Result<CascadeStep, SolverError> {
    advance_with_x_field(
        params,
        settings,
        t_prev,
        dt,
        plant,
        observer,
        noise,
        rng,
        |t, s, y_hat| fields::observer_x_field(params, t, s, y_hat),
    )
}

/// Cascade body, generic over the X-block field so tests can observe the
/// input it receives.
#[allow(clippy::too_many_arguments)]
fn advance_with_x_field<R, F>(
    params: &LorenzParams,
    settings: &SolverSettings,
    t_prev: f64,
    dt: f64,
    plant: &PlantState,
    observer: &ObserverState,
    noise: &Normal<f64>,
    rng: &mut R,
    x_field: F,
) -> Result<CascadeStep, SolverError>
where
    R: Rng,
    F: Fn(f64, &[f64; 1], f64) -> [f64; 1],
{
    let t_next = t_prev + dt;

    // 1. Plant over the interval.
    let plant_next = solver::integrate(
        |t, s| fields::plant_field(params, t, s),
        t_prev,
        t_next,
        plant.as_array(),
        settings,
    )?;

    // 2. Fresh noise draw on the new x.
    let measurement = plant_next[0] + noise.sample(rng);

    // 3. YZ-observer, measurement held constant over the interval.
    let yz_next = solver::integrate(
        |t, s| fields::observer_yz_field(params, t, s, measurement),
        t_prev,
        t_next,
        [observer.y_hat, observer.z_hat],
        settings,
    )?;

    // 4. X-observer, driven by the y estimate from this same step.
    let y_hat_fresh = yz_next[0];
    let x_next = solver::integrate(
        |t, s| x_field(t, s, y_hat_fresh),
        t_prev,
        t_next,
        [observer.x_hat],
        settings,
    )?;

    // 5. Assemble.
    Ok(CascadeStep {
        plant: PlantState::from_array(plant_next),
        observer: ObserverState::new(x_next[0], yz_next[0], yz_next[1]),
        measurement,
    })
}
