//! Client-side core for the soil-sensor crop recommendation workflow: the two
//! service clients, the recommendation normalizer, and the controller that
//! sequences them.

use async_trait::async_trait;
use shared::domain::SensorReading;

pub mod config;
mod controller;
pub mod error;
mod normalize;
mod prediction;
mod sensor;
mod transport;

pub use config::{load_settings, load_settings_from, ClientSettings};
pub use controller::{WorkflowController, WorkflowState};
pub use error::WorkflowError;
pub use normalize::{normalize, normalize_outcome};
pub use prediction::{NutrientNeeds, PredictionClient, PredictionOutcome};
pub use sensor::SensorClient;

/// Source of sensor readings. [`SensorClient`] is the HTTP implementation.
#[async_trait]
pub trait SensorSource: Send + Sync {
    async fn fetch_reading(&self) -> Result<SensorReading, WorkflowError>;
}

/// Crop/fertilizer predictor. [`PredictionClient`] is the HTTP implementation.
#[async_trait]
pub trait PredictionSource: Send + Sync {
    async fn request_prediction(
        &self,
        features: [f64; 3],
    ) -> Result<PredictionOutcome, WorkflowError>;
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
