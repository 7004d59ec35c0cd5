//! Ensemble trajectory divergence
//!
//! Many independent trajectories of the plain chaotic field from nearby
//! initial conditions, illustrating sensitive dependence. There is no
//! coupling between members, so integration is embarrassingly parallel:
//! every perturbation is drawn up front from the run's single seeded
//! generator, then workers integrate pure deterministic dynamics into
//! disjoint output slots.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::fields;
use crate::params::LorenzParams;
use crate::sim::{time_grid, validate_grid};
use crate::solver::{self, SolverSettings};
use crate::state::PlantState;
use crate::SimError;

/// Configuration for one ensemble run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    pub params: LorenzParams,
    pub t_span: (f64, f64),
    pub dt: f64,
    /// Number of independent trajectories.
    pub n_trajectories: usize,
    /// Standard deviation of the per-trajectory initial perturbation.
    pub noise_scale: f64,
    /// Shared unperturbed starting point.
    pub base_state: PlantState,
    pub seed: u64,
    pub solver: SolverSettings,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            params: LorenzParams::default(),
            t_span: (0.0, 20.0),
            dt: 0.01,
            n_trajectories: 100,
            noise_scale: 0.1,
            base_state: PlantState::new(1.0, 1.0, 1.0),
            seed: 42,
            solver: SolverSettings::default(),
        }
    }
}

impl EnsembleConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        self.params.validate()?;
        validate_grid(self.t_span, self.dt)?;
        if self.n_trajectories == 0 {
            return Err(SimError::InvalidConfig(
                "n_trajectories must be > 0".to_string(),
            ));
        }
        if !self.noise_scale.is_finite() || self.noise_scale < 0.0 {
            return Err(SimError::InvalidConfig(
                "noise_scale must be finite and >= 0".to_string(),
            ));
        }
        if !self.base_state.as_array().iter().all(|v| v.is_finite()) {
            return Err(SimError::InvalidConfig(
                "base_state must be finite".to_string(),
            ));
        }
        if let Some(msg) = self.solver.validate_msg() {
            return Err(SimError::InvalidConfig(msg.to_string()));
        }
        Ok(())
    }
}

/// Independent plant-only trajectories sharing one time grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleSet {
    pub t: Vec<f64>,
    pub trajectories: Vec<Vec<PlantState>>,
}

impl EnsembleSet {
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// Euclidean distance between two member trajectories at every grid
    /// point.
    pub fn pair_distances(&self, a: usize, b: usize) -> Vec<f64> {
        self.trajectories[a]
            .iter()
            .zip(self.trajectories[b].iter())
            .map(|(p, q)| p.distance(q))
            .collect()
    }
}

/// Base state plus Gaussian perturbations, all drawn from `rng` in member
/// order.
pub fn initial_conditions(config: &EnsembleConfig, rng: &mut ChaCha8Rng) -> Vec<PlantState> {
    (0..config.n_trajectories)
        .map(|_| {
            let dx: f64 = StandardNormal.sample(rng);
            let dy: f64 = StandardNormal.sample(rng);
            let dz: f64 = StandardNormal.sample(rng);
            PlantState::new(
                config.base_state.x + config.noise_scale * dx,
                config.base_state.y + config.noise_scale * dy,
                config.base_state.z + config.noise_scale * dz,
            )
        })
        .collect()
}

/// Integrate the full ensemble. Members are independent, so they run on the
/// rayon pool; the output order matches the initial-condition order and is
/// deterministic for a fixed seed.
pub fn run_ensemble(config: &EnsembleConfig) -> Result<EnsembleSet, SimError> {
    config.validate()?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let ics = initial_conditions(config, &mut rng);
    let t = time_grid(config.t_span, config.dt);

    let trajectories = ics
        .par_iter()
        .map(|ic| integrate_member(config, &t, *ic))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EnsembleSet { t, trajectories })
}

fn integrate_member(
    config: &EnsembleConfig,
    t: &[f64],
    ic: PlantState,
) -> Result<Vec<PlantState>, SimError> {
    let mut out = Vec::with_capacity(t.len());
    out.push(ic);

    let mut state = ic.as_array();
    for i in 1..t.len() {
        state = solver::integrate(
            |tau, s| fields::chaos_field(&config.params, tau, s),
            t[i - 1],
            t[i],
            state,
            &config.solver,
        )
        .map_err(|source| SimError::SolverDivergence {
            step: i,
            t: t[i],
            last_state: state.to_vec(),
            source,
        })?;
        out.push(PlantState::from_array(state));
    }

    Ok(out)
}
