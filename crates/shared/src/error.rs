use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body returned by both services alongside a non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown nutrient code '{0}'")]
pub struct UnknownNutrientCode(pub String);
