//! Workflow state machine driving the sensor fetch and the crop prediction.

use std::sync::Arc;

use shared::domain::{NormalizedRecommendation, SensorReading};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    config::ClientSettings, error::WorkflowError, normalize::normalize_outcome, PredictionClient,
    PredictionSource, SensorClient, SensorSource,
};

/// Published workflow state. `FetchingReading` and `Predicting` are the only
/// in-flight phases.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    FetchingReading,
    ReadingReady {
        reading: SensorReading,
    },
    Predicting {
        reading: SensorReading,
    },
    RecommendationReady {
        reading: SensorReading,
        recommendation: NormalizedRecommendation,
    },
    /// `reading` is kept after a failed prediction and cleared after a failed
    /// fetch.
    Failed {
        error: WorkflowError,
        reading: Option<SensorReading>,
    },
}

impl WorkflowState {
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingReading => "fetching_reading",
            Self::ReadingReady { .. } => "reading_ready",
            Self::Predicting { .. } => "predicting",
            Self::RecommendationReady { .. } => "recommendation_ready",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::FetchingReading | Self::Predicting { .. })
    }

    pub fn reading(&self) -> Option<&SensorReading> {
        match self {
            Self::ReadingReady { reading }
            | Self::Predicting { reading }
            | Self::RecommendationReady { reading, .. } => Some(reading),
            Self::Failed { reading, .. } => reading.as_ref(),
            Self::Idle | Self::FetchingReading => None,
        }
    }

    pub fn recommendation(&self) -> Option<&NormalizedRecommendation> {
        match self {
            Self::RecommendationReady { recommendation, .. } => Some(recommendation),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&WorkflowError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Owns the workflow state and sequences the two service calls.
///
/// At most one command is in flight per controller; a second command is
/// rejected with [`WorkflowError::Busy`] and never reaches the network.
pub struct WorkflowController {
    sensor: Arc<dyn SensorSource>,
    prediction: Arc<dyn PredictionSource>,
    state: watch::Sender<WorkflowState>,
}

impl WorkflowController {
    pub fn new(sensor: Arc<dyn SensorSource>, prediction: Arc<dyn PredictionSource>) -> Self {
        let (state, _) = watch::channel(WorkflowState::Idle);
        Self {
            sensor,
            prediction,
            state,
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, WorkflowError> {
        let timeout = settings.request_timeout();
        let sensor = SensorClient::new(settings.sensor_base_url.clone(), timeout)?;
        let prediction = PredictionClient::new(settings.prediction_base_url.clone(), timeout)?;
        Ok(Self::new(Arc::new(sensor), Arc::new(prediction)))
    }

    pub fn state(&self) -> WorkflowState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state.subscribe()
    }

    pub async fn fetch_reading(&self) -> Result<SensorReading, WorkflowError> {
        let (in_flight, ()) = self.begin(|current| {
            if current.is_in_flight() {
                return Err(WorkflowError::Busy);
            }
            Ok((WorkflowState::FetchingReading, ()))
        })?;

        match self.sensor.fetch_reading().await {
            Ok(reading) => {
                in_flight.finish(WorkflowState::ReadingReady { reading });
                Ok(reading)
            }
            Err(error) => {
                warn!(error = %error, "workflow: sensor fetch failed");
                in_flight.finish(WorkflowState::Failed {
                    error: error.clone(),
                    reading: None,
                });
                Err(error)
            }
        }
    }

    pub async fn request_recommendation(&self) -> Result<NormalizedRecommendation, WorkflowError> {
        let (in_flight, reading) = self.begin(|current| {
            if current.is_in_flight() {
                return Err(WorkflowError::Busy);
            }
            match current {
                WorkflowState::ReadingReady { reading }
                | WorkflowState::RecommendationReady { reading, .. }
                | WorkflowState::Failed {
                    reading: Some(reading),
                    ..
                } => Ok((WorkflowState::Predicting { reading: *reading }, *reading)),
                _ => Err(WorkflowError::InvalidState(
                    "no sensor reading available; fetch a reading first".into(),
                )),
            }
        })?;

        let result = match self.prediction.request_prediction(reading.features()).await {
            Ok(outcome) => normalize_outcome(&outcome),
            Err(error) => Err(error),
        };

        match result {
            Ok(recommendation) => {
                info!(
                    crop = %recommendation.crop,
                    lines = recommendation.nutrients.len(),
                    "workflow: recommendation ready"
                );
                in_flight.finish(WorkflowState::RecommendationReady {
                    reading,
                    recommendation: recommendation.clone(),
                });
                Ok(recommendation)
            }
            Err(error) => {
                warn!(error = %error, "workflow: recommendation failed");
                in_flight.finish(WorkflowState::Failed {
                    error: error.clone(),
                    reading: Some(reading),
                });
                Err(error)
            }
        }
    }

    /// Checks the current state and moves into an in-flight state in one step
    /// on the state cell. A rejection leaves the state untouched.
    fn begin<T>(
        &self,
        decide: impl FnOnce(&WorkflowState) -> Result<(WorkflowState, T), WorkflowError>,
    ) -> Result<(InFlight<'_>, T), WorkflowError> {
        let mut started = Err(WorkflowError::Busy);
        self.state.send_if_modified(|state| {
            let from = state.phase();
            started = decide(state).map(|(next, value)| {
                debug!(from, to = next.phase(), "workflow: transition");
                let previous = std::mem::replace(state, next);
                (previous, value)
            });
            if let Err(err) = &started {
                debug!(phase = from, error = %err, "workflow: command rejected");
            }
            started.is_ok()
        });
        let (previous, value) = started?;
        Ok((
            InFlight {
                state: &self.state,
                previous: Some(previous),
            },
            value,
        ))
    }
}

/// Held across the service call of a running command. Dropping it before
/// [`InFlight::finish`] (the command future was cancelled) puts back the state
/// the command started from.
struct InFlight<'a> {
    state: &'a watch::Sender<WorkflowState>,
    previous: Option<WorkflowState>,
}

impl InFlight<'_> {
    fn finish(mut self, next: WorkflowState) {
        self.previous = None;
        let from = self.state.send_replace(next);
        debug!(
            from = from.phase(),
            to = self.state.borrow().phase(),
            "workflow: transition"
        );
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            warn!(
                restored = previous.phase(),
                "workflow: command cancelled before completion"
            );
            self.state.send_replace(previous);
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
