use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownNutrientCode;

/// One soil-sensor sample. Nutrients are in mg/kg, moisture is a
/// dimensionless index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub soil_moisture: f64,
}

impl SensorReading {
    /// Feature vector in the order the prediction service expects.
    pub fn features(&self) -> [f64; 3] {
        [self.nitrogen, self.phosphorus, self.potassium]
    }

    /// Returns the name of the first field that is negative or non-finite.
    pub fn invalid_field(&self) -> Option<&'static str> {
        [
            ("nitrogen", self.nitrogen),
            ("phosphorus", self.phosphorus),
            ("potassium", self.potassium),
            ("soil", self.soil_moisture),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite() || *value < 0.0)
        .map(|(name, _)| name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Nitrogen,
    Phosphorus,
    Potassium,
}

/// Fertilizer codes understood by the prediction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NutrientCode {
    Urea,
    #[serde(rename = "TSP")]
    Tsp,
    #[serde(rename = "MOP")]
    Mop,
}

impl NutrientCode {
    /// Display order for recommendations.
    pub const ORDER: [NutrientCode; 3] = [NutrientCode::Urea, NutrientCode::Tsp, NutrientCode::Mop];

    pub fn as_str(self) -> &'static str {
        match self {
            NutrientCode::Urea => "Urea",
            NutrientCode::Tsp => "TSP",
            NutrientCode::Mop => "MOP",
        }
    }

    pub fn corrects(self) -> Nutrient {
        match self {
            NutrientCode::Urea => Nutrient::Nitrogen,
            NutrientCode::Tsp => Nutrient::Phosphorus,
            NutrientCode::Mop => Nutrient::Potassium,
        }
    }
}

impl fmt::Display for NutrientCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NutrientCode {
    type Err = UnknownNutrientCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NutrientCode::ORDER
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownNutrientCode(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientRecommendation {
    pub code: NutrientCode,
    pub quantity_kg_per_hectare: f64,
}

/// Crop prediction with fertilizer lines ordered Urea, TSP, MOP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecommendation {
    pub crop: String,
    pub nutrients: Vec<NutrientRecommendation>,
}

impl NormalizedRecommendation {
    pub fn needs_fertilizer(&self) -> bool {
        !self.nutrients.is_empty()
    }

    pub fn quantity_for(&self, code: NutrientCode) -> Option<f64> {
        self.nutrients
            .iter()
            .find(|item| item.code == code)
            .map(|item| item.quantity_kg_per_hectare)
    }
}
