use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreatmentType {
    Fertilizer,
    Pesticide,
    Herbicide,
    Fungicide,
    Other,
}

impl TreatmentType {
    pub const ALL: [TreatmentType; 5] = [
        TreatmentType::Fertilizer,
        TreatmentType::Pesticide,
        TreatmentType::Herbicide,
        TreatmentType::Fungicide,
        TreatmentType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TreatmentType::Fertilizer => "fertilizer",
            TreatmentType::Pesticide => "pesticide",
            TreatmentType::Herbicide => "herbicide",
            TreatmentType::Fungicide => "fungicide",
            TreatmentType::Other => "other",
        }
    }
}

impl fmt::Display for TreatmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TreatmentType {
    type Err = ParseTreatmentTypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        let kind = match normalized.as_str() {
            "fertilizer" | "fertiliser" => TreatmentType::Fertilizer,
            "pesticide" | "insecticide" => TreatmentType::Pesticide,
            "herbicide" => TreatmentType::Herbicide,
            "fungicide" => TreatmentType::Fungicide,
            "other" => TreatmentType::Other,
            _ => {
                return Err(ParseTreatmentTypeError {
                    value: value.to_string(),
                });
            }
        };
        Ok(kind)
    }
}

impl Serialize for TreatmentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TreatmentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TreatmentType::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTreatmentTypeError {
    value: String,
}

impl fmt::Display for ParseTreatmentTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid treatment type '{}': expected one of {}",
            self.value,
            TreatmentType::ALL
                .iter()
                .map(|kind| kind.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl Error for ParseTreatmentTypeError {}
