use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::treatment::{ParseTreatmentTypeError, TreatmentType};

const KNOWLEDGE_TOML: &str = include_str!("knowledge.toml");

pub const DEFAULT_ICON: &str = "🌱";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TreatmentRule {
    pub stage: String,
    #[serde(rename = "type")]
    pub treatment_type: TreatmentType,
    pub product: String,
    pub timing: String,
    pub purpose: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CropKnowledge {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub stages: Vec<String>,
    pub rules: Vec<TreatmentRule>,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    crops: Vec<CropKnowledge>,
    by_id: HashMap<String, usize>,
}

#[derive(Debug, Deserialize)]
struct RawKnowledgeFile {
    #[serde(default)]
    crops: Vec<RawCrop>,
}

#[derive(Debug, Deserialize)]
struct RawCrop {
    id: String,
    name: String,
    icon: String,
    stages: Vec<String>,
    #[serde(default)]
    rules: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    stage: String,
    #[serde(rename = "type")]
    kind: String,
    product: String,
    timing: String,
    purpose: String,
}

#[derive(Debug)]
pub enum KnowledgeError {
    Toml(toml::de::Error),
    InvalidDefinition(String),
    TreatmentType(ParseTreatmentTypeError),
}

impl fmt::Display for KnowledgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnowledgeError::Toml(err) => write!(f, "invalid knowledge TOML: {}", err),
            KnowledgeError::InvalidDefinition(message) => {
                write!(f, "invalid knowledge definition: {}", message)
            }
            KnowledgeError::TreatmentType(err) => write!(f, "invalid knowledge rule: {}", err),
        }
    }
}

impl Error for KnowledgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            KnowledgeError::Toml(err) => Some(err),
            KnowledgeError::InvalidDefinition(_) => None,
            KnowledgeError::TreatmentType(err) => Some(err),
        }
    }
}

impl From<toml::de::Error> for KnowledgeError {
    fn from(value: toml::de::Error) -> Self {
        KnowledgeError::Toml(value)
    }
}

impl From<ParseTreatmentTypeError> for KnowledgeError {
    fn from(value: ParseTreatmentTypeError) -> Self {
        KnowledgeError::TreatmentType(value)
    }
}

impl KnowledgeBase {
    pub fn load() -> Result<Self, KnowledgeError> {
        Self::from_toml(KNOWLEDGE_TOML)
    }

    pub(crate) fn from_toml(raw: &str) -> Result<Self, KnowledgeError> {
        let file: RawKnowledgeFile = toml::from_str(raw)?;
        if file.crops.is_empty() {
            return Err(KnowledgeError::InvalidDefinition(
                "at least one crop must be defined".to_string(),
            ));
        }

        let mut crops = Vec::with_capacity(file.crops.len());
        let mut by_id = HashMap::new();
        for raw_crop in file.crops {
            let crop = normalize_crop(raw_crop)?;
            if by_id.insert(crop.id.clone(), crops.len()).is_some() {
                return Err(KnowledgeError::InvalidDefinition(format!(
                    "duplicate crop id '{}'",
                    crop.id
                )));
            }
            crops.push(crop);
        }

        Ok(Self { crops, by_id })
    }

    pub fn get(&self, crop_type: &str) -> Option<&CropKnowledge> {
        self.by_id.get(crop_type).map(|index| &self.crops[*index])
    }

    pub fn crops(&self) -> &[CropKnowledge] {
        &self.crops
    }

    pub fn crop_types(&self) -> Vec<&str> {
        self.crops.iter().map(|crop| crop.id.as_str()).collect()
    }

    pub fn icon_for(&self, crop_type: &str) -> &str {
        self.get(crop_type)
            .map(|crop| crop.icon.as_str())
            .unwrap_or(DEFAULT_ICON)
    }
}

impl CropKnowledge {
    pub fn rules_for<'a>(&'a self, stage: &'a str) -> impl Iterator<Item = &'a TreatmentRule> {
        self.rules.iter().filter(move |rule| rule.stage == stage)
    }
}

fn normalize_crop(raw: RawCrop) -> Result<CropKnowledge, KnowledgeError> {
    let id = raw.id.trim().to_ascii_lowercase();
    if id.is_empty() {
        return Err(KnowledgeError::InvalidDefinition(
            "crop id cannot be empty".to_string(),
        ));
    }
    if raw.stages.is_empty() {
        return Err(KnowledgeError::InvalidDefinition(format!(
            "crop '{}' must list at least one stage",
            id
        )));
    }

    let mut rules = Vec::with_capacity(raw.rules.len());
    for rule in raw.rules {
        if !raw.stages.iter().any(|stage| *stage == rule.stage) {
            return Err(KnowledgeError::InvalidDefinition(format!(
                "crop '{}' has a rule for unknown stage '{}'",
                id, rule.stage
            )));
        }
        rules.push(TreatmentRule {
            stage: rule.stage,
            treatment_type: TreatmentType::from_str(&rule.kind)?,
            product: rule.product,
            timing: rule.timing,
            purpose: rule.purpose,
        });
    }

    Ok(CropKnowledge {
        id,
        name: raw.name,
        icon: raw.icon,
        stages: raw.stages,
        rules,
    })
}
