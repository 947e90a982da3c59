use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shared::{domain::SensorReading, protocol::SensorDataResponse};
use tracing::{debug, info};

use crate::{
    error::WorkflowError,
    transport::{build_http_client, check_status, decode_json, endpoint},
    SensorSource,
};

/// Client for `GET /sensordata`. One request per call, no retries.
#[derive(Clone)]
pub struct SensorClient {
    http: Client,
    base_url: String,
}

impl SensorClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, WorkflowError> {
        Ok(Self {
            http: build_http_client(timeout)?,
            base_url: base_url.into(),
        })
    }

    pub async fn fetch_reading(&self) -> Result<SensorReading, WorkflowError> {
        let url = endpoint(&self.base_url, "sensordata");
        debug!(%url, "sensor: requesting reading");

        let response = self.http.get(&url).send().await?;
        let response = check_status(response).await?;
        let body: SensorDataResponse = decode_json(response, "sensor data").await?;

        let reading = SensorReading::from(body);
        if let Some(field) = reading.invalid_field() {
            return Err(WorkflowError::MalformedResponse(format!(
                "sensor field '{field}' must be a non-negative finite number"
            )));
        }

        info!(
            nitrogen = reading.nitrogen,
            phosphorus = reading.phosphorus,
            potassium = reading.potassium,
            soil_moisture = reading.soil_moisture,
            "sensor: reading fetched"
        );
        Ok(reading)
    }
}

#[async_trait]
impl SensorSource for SensorClient {
    async fn fetch_reading(&self) -> Result<SensorReading, WorkflowError> {
        SensorClient::fetch_reading(self).await
    }
}

#[cfg(test)]
#[path = "tests/sensor_tests.rs"]
mod tests;
