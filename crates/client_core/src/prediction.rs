use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::{
    domain::NutrientCode,
    protocol::{PredictRequest, PredictResponse},
};
use tracing::{debug, info};

use crate::{
    error::WorkflowError,
    transport::{build_http_client, check_status, decode_json, endpoint},
    PredictionSource,
};

const FEATURE_NAMES: [&str; 3] = ["nitrogen", "phosphorus", "potassium"];

/// Fertilizer quantities the service asked for, keyed by wire code.
#[derive(Debug, Clone, PartialEq)]
pub enum NutrientNeeds {
    /// The crop needs no correction: the service omitted the mapping or sent
    /// an empty one.
    NoneNeeded,
    Required(HashMap<String, f64>),
}

impl NutrientNeeds {
    /// Known fertilizer codes must carry a number. Any other key is dropped
    /// whatever its value.
    pub fn from_wire(needed: Option<HashMap<String, Value>>) -> Result<Self, WorkflowError> {
        let mut known = HashMap::new();
        for (code, value) in needed.unwrap_or_default() {
            if code.parse::<NutrientCode>().is_err() {
                debug!(code = %code, "prediction: ignoring unknown nutrient code");
                continue;
            }
            let quantity = value.as_f64().ok_or_else(|| {
                WorkflowError::MalformedResponse(format!(
                    "{code} quantity must be a number, got {value}"
                ))
            })?;
            known.insert(code, quantity);
        }

        if known.is_empty() {
            Ok(Self::NoneNeeded)
        } else {
            Ok(Self::Required(known))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutcome {
    pub crop: String,
    pub needs: NutrientNeeds,
}

/// Client for `POST /predict`. One request per call, no retries.
#[derive(Clone)]
pub struct PredictionClient {
    http: Client,
    base_url: String,
}

impl PredictionClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, WorkflowError> {
        Ok(Self {
            http: build_http_client(timeout)?,
            base_url: base_url.into(),
        })
    }

    pub async fn request_prediction(
        &self,
        features: [f64; 3],
    ) -> Result<PredictionOutcome, WorkflowError> {
        if let Some(idx) = features.iter().position(|value| !value.is_finite()) {
            return Err(WorkflowError::InvalidInput(format!(
                "{} must be a finite number, got {}",
                FEATURE_NAMES[idx], features[idx]
            )));
        }

        let url = endpoint(&self.base_url, "predict");
        debug!(%url, ?features, "prediction: submitting features");

        let response = self
            .http
            .post(&url)
            .json(&PredictRequest { features })
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: PredictResponse = decode_json(response, "prediction").await?;

        let crop = match body.prediction {
            Some(crop) if !crop.trim().is_empty() => crop,
            _ => {
                return Err(WorkflowError::MalformedResponse(
                    "prediction response is missing the crop label".into(),
                ))
            }
        };
        let needs = NutrientNeeds::from_wire(body.needed_nutrients)?;

        info!(
            crop = %crop,
            fertilizer_needed = matches!(needs, NutrientNeeds::Required(_)),
            "prediction: crop predicted"
        );
        Ok(PredictionOutcome { crop, needs })
    }
}

#[async_trait]
impl PredictionSource for PredictionClient {
    async fn request_prediction(
        &self,
        features: [f64; 3],
    ) -> Result<PredictionOutcome, WorkflowError> {
        PredictionClient::request_prediction(self, features).await
    }
}

#[cfg(test)]
#[path = "tests/prediction_tests.rs"]
mod tests;
