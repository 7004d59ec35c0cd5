//! Lorenz system parameters
//!
//! One immutable parameter set is owned by the simulation driver and passed
//! by reference into every vector-field evaluation.

use serde::{Deserialize, Serialize};

use crate::SimError;

/// Parameters of the Lorenz system plus the measurement noise level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LorenzParams {
    /// Prandtl number
    pub sigma: f64,
    /// Rayleigh number (chaotic regime for the classic values)
    pub rho: f64,
    /// Geometric factor
    pub beta: f64,
    /// Standard deviation of the Gaussian measurement noise on x
    pub noise_std: f64,
}

impl LorenzParams {
    /// Create a new parameter set.
    pub fn new(sigma: f64, rho: f64, beta: f64, noise_std: f64) -> Self {
        Self {
            sigma,
            rho,
            beta,
            noise_std,
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.sigma.is_finite() && self.rho.is_finite() && self.beta.is_finite()) {
            return Err(SimError::InvalidConfig(
                "sigma, rho and beta must be finite".to_string(),
            ));
        }

        if !self.noise_std.is_finite() || self.noise_std < 0.0 {
            return Err(SimError::InvalidConfig(
                "noise_std must be finite and >= 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for LorenzParams {
    /// Classic chaotic parameterization with unit measurement noise.
    fn default() -> Self {
        Self {
            sigma: 10.0,
            rho: 28.0,
            beta: 8.0 / 3.0,
            noise_std: 1.0,
        }
    }
}
