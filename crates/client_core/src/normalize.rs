use std::collections::HashMap;

use shared::domain::{NormalizedRecommendation, NutrientCode, NutrientRecommendation};
use tracing::debug;

use crate::{
    error::WorkflowError,
    prediction::{NutrientNeeds, PredictionOutcome},
};

/// Orders the service's fertilizer mapping as Urea, TSP, MOP.
///
/// Codes missing from the input are left out rather than zero-filled and
/// codes outside the known vocabulary are dropped. A known code with a
/// negative or non-finite quantity fails the whole recommendation.
pub fn normalize(
    crop: &str,
    nutrients: &HashMap<String, f64>,
) -> Result<NormalizedRecommendation, WorkflowError> {
    let mut ordered = Vec::with_capacity(NutrientCode::ORDER.len());
    for code in NutrientCode::ORDER {
        let Some(&quantity) = nutrients.get(code.as_str()) else {
            continue;
        };
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(WorkflowError::ValidationError(format!(
                "{code} quantity must be a non-negative finite number, got {quantity}"
            )));
        }
        ordered.push(NutrientRecommendation {
            code,
            quantity_kg_per_hectare: quantity,
        });
    }

    if ordered.len() < nutrients.len() {
        let dropped: Vec<&str> = nutrients
            .keys()
            .map(String::as_str)
            .filter(|key| key.parse::<NutrientCode>().is_err())
            .collect();
        debug!(?dropped, "normalize: ignoring unknown nutrient codes");
    }

    Ok(NormalizedRecommendation {
        crop: crop.to_string(),
        nutrients: ordered,
    })
}

pub fn normalize_outcome(
    outcome: &PredictionOutcome,
) -> Result<NormalizedRecommendation, WorkflowError> {
    match &outcome.needs {
        NutrientNeeds::NoneNeeded => Ok(NormalizedRecommendation {
            crop: outcome.crop.clone(),
            nutrients: Vec::new(),
        }),
        NutrientNeeds::Required(nutrients) => normalize(&outcome.crop, nutrients),
    }
}
