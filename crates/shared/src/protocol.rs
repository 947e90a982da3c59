use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::SensorReading;

/// `GET /sensordata` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorDataResponse {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub soil: f64,
}

impl From<SensorDataResponse> for SensorReading {
    fn from(value: SensorDataResponse) -> Self {
        Self {
            nitrogen: value.nitrogen,
            phosphorus: value.phosphorus,
            potassium: value.potassium,
            soil_moisture: value.soil,
        }
    }
}

/// `POST /predict` body: nitrogen, phosphorus, potassium in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub features: [f64; 3],
}

/// `POST /predict` success body. Both fields are optional on the wire so the
/// client can tell a missing label apart from an unparseable payload.
/// Nutrient values stay untyped here; only known codes are checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needed_nutrients: Option<HashMap<String, Value>>,
}
