//! Text and JSON views of the workflow state.

use std::fmt::Write as _;

use client_core::WorkflowState;
use serde_json::{json, Value};
use shared::domain::{NormalizedRecommendation, SensorReading};

/// Full-scale value of the nutrient gauges, in mg/kg.
const NUTRIENT_GAUGE_MAX: f64 = 800.0;
/// Moisture index at or above which the probe is considered well seated.
const HIGH_ACCURACY_MOISTURE: f64 = 1100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeBand {
    Low,
    Medium,
    High,
}

impl GaugeBand {
    fn label(self) -> &'static str {
        match self {
            GaugeBand::Low => "low",
            GaugeBand::Medium => "medium",
            GaugeBand::High => "high",
        }
    }
}

pub fn gauge_percent(value: f64) -> f64 {
    value / NUTRIENT_GAUGE_MAX * 100.0
}

pub fn gauge_band(percent: f64) -> GaugeBand {
    if percent <= 33.0 {
        GaugeBand::Low
    } else if percent <= 66.0 {
        GaugeBand::Medium
    } else {
        GaugeBand::High
    }
}

pub fn sensor_accuracy(soil_moisture: f64) -> &'static str {
    if soil_moisture >= HIGH_ACCURACY_MOISTURE {
        "high"
    } else {
        "low"
    }
}

pub fn render_text(state: &WorkflowState) -> String {
    let mut out = String::new();

    match state {
        WorkflowState::Idle => out.push_str("No reading fetched yet.\n"),
        WorkflowState::FetchingReading => out.push_str("Fetching data...\n"),
        WorkflowState::Predicting { .. } => out.push_str("Calculating...\n"),
        _ => {}
    }

    if let Some(reading) = state.reading() {
        write_reading(&mut out, reading);
    }
    if let Some(recommendation) = state.recommendation() {
        write_recommendation(&mut out, recommendation);
    }
    if let Some(error) = state.error() {
        let _ = writeln!(out, "Error: {}", error.user_message());
    }

    out
}

fn write_reading(out: &mut String, reading: &SensorReading) {
    out.push_str("Sensor readings\n");
    for (name, value) in [
        ("Nitrogen", reading.nitrogen),
        ("Phosphorus", reading.phosphorus),
        ("Potassium", reading.potassium),
    ] {
        let percent = gauge_percent(value);
        let _ = writeln!(
            out,
            "  {name:<11} {value:>8} mg/kg  {percent:>5.1}% of {NUTRIENT_GAUGE_MAX} ({})",
            gauge_band(percent).label()
        );
    }
    let _ = writeln!(
        out,
        "  {:<11} {:>8}        {} sensor accuracy",
        "Soil",
        reading.soil_moisture,
        sensor_accuracy(reading.soil_moisture)
    );
}

fn write_recommendation(out: &mut String, recommendation: &NormalizedRecommendation) {
    let _ = writeln!(
        out,
        "Recommended crop: {}",
        recommendation.crop.to_uppercase()
    );
    out.push_str("Fertilizer recommendation\n");
    if !recommendation.needs_fertilizer() {
        out.push_str("  No fertilizer correction needed.\n");
        return;
    }
    for item in &recommendation.nutrients {
        let _ = writeln!(
            out,
            "  {}: {} kg/ha ({:?})",
            item.code,
            item.quantity_kg_per_hectare,
            item.code.corrects()
        );
    }
}

pub fn state_json(state: &WorkflowState) -> Value {
    let error = state.error().map(|err| {
        json!({
            "message": err.user_message(),
            "detail": err.to_string(),
            "status": err.status_code(),
            "retryable": err.is_retryable(),
        })
    });

    json!({
        "phase": state.phase(),
        "reading": state.reading(),
        "recommendation": state.recommendation(),
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_core::WorkflowError;
    use shared::domain::{NutrientCode, NutrientRecommendation};

    fn reading() -> SensorReading {
        SensorReading {
            nitrogen: 86.2,
            phosphorus: 121.0,
            potassium: 517.2,
            soil_moisture: 1167.3,
        }
    }

    fn rice() -> NormalizedRecommendation {
        NormalizedRecommendation {
            crop: "rice".into(),
            nutrients: vec![
                NutrientRecommendation {
                    code: NutrientCode::Urea,
                    quantity_kg_per_hectare: 40.0,
                },
                NutrientRecommendation {
                    code: NutrientCode::Mop,
                    quantity_kg_per_hectare: 15.0,
                },
            ],
        }
    }

    #[test]
    fn gauge_bands_follow_thirds_of_scale() {
        assert_eq!(gauge_band(gauge_percent(86.2)), GaugeBand::Low);
        assert_eq!(gauge_band(gauge_percent(264.0)), GaugeBand::Low);
        assert_eq!(gauge_band(gauge_percent(400.0)), GaugeBand::Medium);
        assert_eq!(gauge_band(gauge_percent(517.2)), GaugeBand::Medium);
        assert_eq!(gauge_band(gauge_percent(600.0)), GaugeBand::High);
    }

    #[test]
    fn gauge_band_edges_are_inclusive() {
        assert_eq!(gauge_band(33.0), GaugeBand::Low);
        assert_eq!(gauge_band(33.1), GaugeBand::Medium);
        assert_eq!(gauge_band(66.0), GaugeBand::Medium);
        assert_eq!(gauge_band(66.1), GaugeBand::High);
    }

    #[test]
    fn soil_accuracy_threshold() {
        assert_eq!(sensor_accuracy(1167.3), "high");
        assert_eq!(sensor_accuracy(1100.0), "high");
        assert_eq!(sensor_accuracy(1099.9), "low");
    }

    #[test]
    fn text_lists_fertilizer_in_order() {
        let text = render_text(&WorkflowState::RecommendationReady {
            reading: reading(),
            recommendation: rice(),
        });

        assert!(text.contains("Recommended crop: RICE"));
        let urea = text.find("Urea: 40 kg/ha").expect("urea line");
        let mop = text.find("MOP: 15 kg/ha").expect("mop line");
        assert!(urea < mop);
        assert!(!text.contains("TSP"));
        assert!(text.contains("high sensor accuracy"));
    }

    #[test]
    fn text_reports_no_correction_needed() {
        let text = render_text(&WorkflowState::RecommendationReady {
            reading: reading(),
            recommendation: NormalizedRecommendation {
                crop: "coffee".into(),
                nutrients: Vec::new(),
            },
        });
        assert!(text.contains("No fertilizer correction needed."));
    }

    #[test]
    fn failed_prediction_still_shows_reading_and_error() {
        let text = render_text(&WorkflowState::Failed {
            error: WorkflowError::ValidationError("Urea quantity must be non-negative".into()),
            reading: Some(reading()),
        });
        assert!(text.contains("Sensor readings"));
        assert!(text.contains("Error: The recommendation was rejected"));
    }

    #[test]
    fn json_view_carries_phase_and_error_status() {
        let value = state_json(&WorkflowState::Failed {
            error: WorkflowError::ServiceError {
                status: 500,
                message: Some("sensor offline".into()),
            },
            reading: None,
        });

        assert_eq!(value["phase"], "failed");
        assert_eq!(value["reading"], Value::Null);
        assert_eq!(value["error"]["status"], 500);
        assert_eq!(value["error"]["retryable"], true);
    }

    #[test]
    fn json_view_serializes_recommendation() {
        let value = state_json(&WorkflowState::RecommendationReady {
            reading: reading(),
            recommendation: rice(),
        });
        assert_eq!(value["recommendation"]["crop"], "rice");
        assert_eq!(value["recommendation"]["nutrients"][0]["code"], "Urea");
        assert_eq!(value["reading"]["soil_moisture"], 1167.3);
    }
}
