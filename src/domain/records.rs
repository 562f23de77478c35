use serde::{Deserialize, Serialize};

use super::treatment::TreatmentType;

pub const CROP_TYPE_OTHER: &str = "other";
pub const CROP_STATUS_ACTIVE: &str = "Active";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Farm {
    pub id: String,
    pub name: String,
    pub farm_code: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub soil_type: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Crop {
    pub id: String,
    pub crop_type: String,
    pub name: String,
    #[serde(default)]
    pub variety: String,
    pub farm_id: String,
    pub planting_date: String,
    #[serde(default)]
    pub harvest_date: Option<String>,
    pub area: f64,
    #[serde(default)]
    pub field_id: Option<String>,
    #[serde(default)]
    pub notes: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Application {
    pub id: String,
    pub crop_id: String,
    pub treatment_type: TreatmentType,
    pub product_name: String,
    pub quantity: f64,
    pub unit: String,
    pub date: String,
    #[serde(default)]
    pub growth_stage: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub weather: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activity {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub crop_id: Option<String>,
    pub occurred_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewFarm {
    pub name: String,
    pub farm_code: String,
    pub location: Option<String>,
    pub size: Option<f64>,
    pub soil_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCrop {
    pub crop_type: String,
    pub custom_name: Option<String>,
    pub variety: Option<String>,
    pub farm_id: String,
    pub planting_date: String,
    pub harvest_date: Option<String>,
    pub area: f64,
    pub field_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub crop_id: String,
    pub treatment_type: TreatmentType,
    pub product_name: String,
    pub quantity: f64,
    pub unit: String,
    pub date: String,
    pub growth_stage: Option<String>,
    pub method: Option<String>,
    pub weather: Option<String>,
    pub purpose: Option<String>,
    pub notes: Option<String>,
}

pub fn normalize_text(value: Option<&str>) -> Option<String> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Some(value.to_string()),
        _ => None,
    }
}
