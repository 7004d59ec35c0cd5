//! Lorenz cascaded-observer simulation
//!
//! Simulates the chaotic Lorenz plant together with a two-block nonlinear
//! observer that reconstructs the full state from a single noisy measurement
//! of x. The cascade advances in a fixed causal order at every timestep:
//! plant, noise injection, YZ-observer, X-observer. The X-block is driven by
//! the y estimate produced by the YZ-block in the same step, never by stale
//! state, so the observer only ever sees information a real sensing pipeline
//! would have.
//!
//! The crate also provides the simpler ensemble path: many independent
//! trajectories of the plain chaotic field from perturbed initial conditions,
//! used to illustrate sensitive dependence on initial conditions.

pub mod cascade;
pub mod ensemble;
pub mod fields;
pub mod params;
pub mod sim;
pub mod solver;
pub mod state;

use thiserror::Error;

pub use cascade::{advance_cascade, CascadeStep};
pub use ensemble::{run_ensemble, EnsembleConfig, EnsembleSet};
pub use params::LorenzParams;
pub use sim::{run_observer_simulation, SimConfig, Trajectory};
pub use solver::{SolverError, SolverSettings};
pub use state::{ObserverState, PlantState};

/// Errors surfaced by the simulation drivers.
#[derive(Debug, Clone, Error)]
pub enum SimError {
    /// Rejected before any integration begins.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The single-interval integrator failed mid-run. Chaotic sensitivity
    /// makes retrying with perturbed state meaningless, so the run aborts;
    /// `last_state` holds the last valid state block for diagnostics.
    #[error("solver diverged at step {step} (t = {t})")]
    SolverDivergence {
        /// Index of the time-grid point that could not be reached.
        step: usize,
        /// Time at the failing grid point.
        t: f64,
        /// Last valid state before the failure, concatenated per block.
        last_state: Vec<f64>,
        /// Underlying solver failure.
        #[source]
        source: SolverError,
    },
}
