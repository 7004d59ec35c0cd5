//! State representations
//!
//! `PlantState` is the true system state, `ObserverState` the reconstructed
//! one. The observer triple is conceptually split into a YZ-block and an
//! X-block with different update dependencies; see [`crate::cascade`].

use serde::{Deserialize, Serialize};

/// True state of the Lorenz plant at a time point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlantState {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PlantState {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn from_array(a: [f64; 3]) -> Self {
        Self {
            x: a[0],
            y: a[1],
            z: a[2],
        }
    }

    /// Euclidean distance to another state.
    pub fn distance(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Reconstructed state produced by the observer cascade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObserverState {
    pub x_hat: f64,
    pub y_hat: f64,
    pub z_hat: f64,
}

impl ObserverState {
    pub fn new(x_hat: f64, y_hat: f64, z_hat: f64) -> Self {
        Self {
            x_hat,
            y_hat,
            z_hat,
        }
    }

    pub fn zero() -> Self {
        Self {
            x_hat: 0.0,
            y_hat: 0.0,
            z_hat: 0.0,
        }
    }

    /// Elementwise estimation error, observer minus plant.
    pub fn error(&self, plant: &PlantState) -> [f64; 3] {
        [
            self.x_hat - plant.x,
            self.y_hat - plant.y,
            self.z_hat - plant.z,
        ]
    }
}

impl Default for ObserverState {
    fn default() -> Self {
        Self::zero()
    }
}
