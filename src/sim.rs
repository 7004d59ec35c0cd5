//! Simulation driver for the observer cascade
//!
//! Builds the time grid, initializes plant and observer, iterates the
//! cascade step scheduler and accumulates the full trajectory. A failed
//! integration anywhere aborts the run with the failing time index; the
//! partial trajectory is discarded.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::cascade::advance_cascade;
use crate::params::LorenzParams;
use crate::solver::SolverSettings;
use crate::state::{ObserverState, PlantState};
use crate::SimError;

/// Configuration for one observer-cascade run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub params: LorenzParams,
    /// Simulated horizon (t0, t1).
    pub t_span: (f64, f64),
    /// Fixed grid step size.
    pub dt: f64,
    /// Seed for the run's single random source.
    pub seed: u64,
    pub solver: SolverSettings,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            params: LorenzParams::default(),
            t_span: (0.0, 10.0),
            dt: 0.01,
            seed: 42,
            solver: SolverSettings::default(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        self.params.validate()?;
        validate_grid(self.t_span, self.dt)?;
        if let Some(msg) = self.solver.validate_msg() {
            return Err(SimError::InvalidConfig(msg.to_string()));
        }
        Ok(())
    }

    /// Number of grid points over the horizon.
    pub fn steps(&self) -> usize {
        grid_len(self.t_span, self.dt)
    }
}

pub(crate) fn validate_grid(t_span: (f64, f64), dt: f64) -> Result<(), SimError> {
    if !(t_span.0.is_finite() && t_span.1.is_finite()) {
        return Err(SimError::InvalidConfig("t_span must be finite".to_string()));
    }
    if t_span.1 <= t_span.0 {
        return Err(SimError::InvalidConfig(
            "t_span must satisfy t1 > t0".to_string(),
        ));
    }
    if !dt.is_finite() || dt <= 0.0 {
        return Err(SimError::InvalidConfig(
            "dt must be finite and > 0".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn grid_len(t_span: (f64, f64), dt: f64) -> usize {
    ((t_span.1 - t_span.0) / dt).ceil() as usize
}

/// Strictly increasing grid t0 + i * dt, excluding the endpoint.
pub(crate) fn time_grid(t_span: (f64, f64), dt: f64) -> Vec<f64> {
    (0..grid_len(t_span, dt))
        .map(|i| t_span.0 + i as f64 * dt)
        .collect()
}

/// Full cascade-run output: parallel sequences over one time grid,
/// append-only while running and immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    pub t: Vec<f64>,
    pub plant: Vec<PlantState>,
    pub observer: Vec<ObserverState>,
    pub measurements: Vec<f64>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Elementwise estimation error at every grid point, observer minus
    /// plant. Diagnostic only, never fed back into the cascade.
    pub fn estimation_errors(&self) -> Vec<[f64; 3]> {
        self.observer
            .iter()
            .zip(self.plant.iter())
            .map(|(o, p)| o.error(p))
            .collect()
    }

    /// Euclidean norm of the estimation error at every grid point.
    pub fn error_norms(&self) -> Vec<f64> {
        self.estimation_errors()
            .iter()
            .map(|e| (e[0] * e[0] + e[1] * e[1] + e[2] * e[2]).sqrt())
            .collect()
    }
}

/// Run the cascade over the configured horizon.
///
/// Plant starts at (1, 1, 1), observer at (0, 0, 0); the measurement at t0
/// is the initial x plus a fresh noise draw, matching every later step.
pub fn run_observer_simulation(config: &SimConfig) -> Result<Trajectory, SimError> {
    config.validate()?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.params.noise_std)
        .map_err(|e| SimError::InvalidConfig(format!("noise distribution: {e}")))?;

    let t = time_grid(config.t_span, config.dt);
    let n = t.len();

    let mut plant = Vec::with_capacity(n);
    let mut observer = Vec::with_capacity(n);
    let mut measurements = Vec::with_capacity(n);

    plant.push(PlantState::new(1.0, 1.0, 1.0));
    observer.push(ObserverState::zero());
    measurements.push(plant[0].x + noise.sample(&mut rng));

    for i in 1..n {
        let step = advance_cascade(
            &config.params,
            &config.solver,
            t[i - 1],
            config.dt,
            &plant[i - 1],
            &observer[i - 1],
            &noise,
            &mut rng,
        )
        .map_err(|source| {
            let prev_plant = plant[i - 1].as_array();
            let prev_obs = observer[i - 1];
            SimError::SolverDivergence {
                step: i,
                t: t[i],
                last_state: vec![
                    prev_plant[0],
                    prev_plant[1],
                    prev_plant[2],
                    prev_obs.x_hat,
                    prev_obs.y_hat,
                    prev_obs.z_hat,
                ],
                source,
            }
        })?;

        plant.push(step.plant);
        observer.push(step.observer);
        measurements.push(step.measurement);
    }

    Ok(Trajectory {
        t,
        plant,
        observer,
        measurements,
    })
}

/// Root-mean-square of a sample slice.
pub fn rms_error(errors: &[f64]) -> f64 {
    if errors.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = errors.iter().map(|&e| e * e).sum();
    (sum_sq / errors.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_matches_horizon_and_step() {
        let config = SimConfig::default();
        let t = time_grid(config.t_span, config.dt);
        assert_eq!(t.len(), config.steps());
        assert_eq!(t[0], 0.0);
        assert!(t.windows(2).all(|w| w[1] > w[0]));
        assert!(*t.last().unwrap() < config.t_span.1 + config.dt);
    }

    #[test]
    fn initial_conditions_are_fixed() {
        let config = SimConfig {
            t_span: (0.0, 0.1),
            ..SimConfig::default()
        };
        let traj = run_observer_simulation(&config).unwrap();
        assert_eq!(traj.plant[0], PlantState::new(1.0, 1.0, 1.0));
        assert_eq!(traj.observer[0], ObserverState::zero());
    }

    #[test]
    fn trajectory_sequences_stay_parallel() {
        let config = SimConfig {
            t_span: (0.0, 0.5),
            ..SimConfig::default()
        };
        let traj = run_observer_simulation(&config).unwrap();
        assert_eq!(traj.plant.len(), traj.len());
        assert_eq!(traj.observer.len(), traj.len());
        assert_eq!(traj.measurements.len(), traj.len());
    }

    #[test]
    fn identical_seeds_give_identical_trajectories() {
        let config = SimConfig {
            t_span: (0.0, 1.0),
            ..SimConfig::default()
        };
        let a = run_observer_simulation(&config).unwrap();
        let b = run_observer_simulation(&config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_give_different_measurements() {
        let base = SimConfig {
            t_span: (0.0, 0.5),
            ..SimConfig::default()
        };
        let other = SimConfig { seed: 7, ..base.clone() };
        let a = run_observer_simulation(&base).unwrap();
        let b = run_observer_simulation(&other).unwrap();
        assert_ne!(a.measurements, b.measurements);
    }

    #[test]
    fn estimation_errors_are_observer_minus_plant() {
        let config = SimConfig {
            t_span: (0.0, 0.2),
            ..SimConfig::default()
        };
        let traj = run_observer_simulation(&config).unwrap();
        let errors = traj.estimation_errors();
        assert_eq!(errors.len(), traj.len());
        for (i, e) in errors.iter().enumerate() {
            assert_eq!(e[0], traj.observer[i].x_hat - traj.plant[i].x);
            assert_eq!(e[1], traj.observer[i].y_hat - traj.plant[i].y);
            assert_eq!(e[2], traj.observer[i].z_hat - traj.plant[i].z);
        }
    }

    #[test]
    fn zero_noise_observer_error_contracts() {
        // Contraction property: with the measurement fed through unperturbed,
        // the estimation error collapses from the large initial transient to
        // a small discretization floor.
        let config = SimConfig {
            params: LorenzParams {
                noise_std: 0.0,
                ..LorenzParams::default()
            },
            t_span: (0.0, 20.0),
            dt: 0.01,
            ..SimConfig::default()
        };
        let traj = run_observer_simulation(&config).unwrap();
        let norms = traj.error_norms();

        let decile = norms.len() / 10;
        let first = rms_error(&norms[..decile]);
        let last = rms_error(&norms[norms.len() - decile..]);

        assert!(last < 1.0, "final-decile error rms too large: {last}");
        assert!(last < first, "error grew: first {first}, last {last}");
    }

    #[test]
    fn invalid_configurations_are_rejected_before_integration() {
        let zero_dt = SimConfig {
            dt: 0.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            run_observer_simulation(&zero_dt),
            Err(SimError::InvalidConfig(_))
        ));

        let inverted = SimConfig {
            t_span: (5.0, 1.0),
            ..SimConfig::default()
        };
        assert!(matches!(
            run_observer_simulation(&inverted),
            Err(SimError::InvalidConfig(_))
        ));

        let bad_noise = SimConfig {
            params: LorenzParams {
                noise_std: -1.0,
                ..LorenzParams::default()
            },
            ..SimConfig::default()
        };
        assert!(matches!(
            run_observer_simulation(&bad_noise),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rms_error_matches_hand_computation() {
        let errors = vec![0.1, 0.2, 0.3];
        let expected = ((0.01_f64 + 0.04 + 0.09) / 3.0).sqrt();
        assert!((rms_error(&errors) - expected).abs() < 1e-12);
        assert_eq!(rms_error(&[]), 0.0);
    }

    #[test]
    fn config_survives_serde_round_trip() {
        let config = SimConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: SimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
