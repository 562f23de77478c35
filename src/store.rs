use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::activity;
use crate::domain::dates::{normalize_day, InvalidDate};
use crate::domain::records::{
    normalize_text, Activity, Application, Crop, Farm, NewApplication, NewCrop, NewFarm,
    CROP_STATUS_ACTIVE, CROP_TYPE_OTHER,
};
use crate::knowledge::KnowledgeBase;
use crate::recommend::Recommendation;
use crate::record_id::{generate_record_id, APPLICATION_PREFIX, CROP_PREFIX, FARM_PREFIX};

pub const FARMS_KEY: &str = "farms";
pub const CROPS_KEY: &str = "crops";
pub const APPLICATIONS_KEY: &str = "applications";
pub const ACTIVITIES_KEY: &str = "activities";
pub const RECOMMENDATIONS_KEY: &str = "recommendations";

/// Write order used by [`RecordStore::save`].
pub const COLLECTION_KEYS: [&str; 5] = [
    FARMS_KEY,
    CROPS_KEY,
    APPLICATIONS_KEY,
    ACTIVITIES_KEY,
    RECOMMENDATIONS_KEY,
];

/// Key-value backend holding one serialized collection per key.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// Read-only view the recommendation generator works against.
pub trait RecordSource {
    fn list_crops(&self) -> &[Crop];
    fn list_applications(&self, crop_id: &str) -> Vec<&Application>;
    fn get_farm(&self, farm_id: &str) -> Option<&Farm>;
}

#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    farms: Vec<Farm>,
    crops: Vec<Crop>,
    applications: Vec<Application>,
    activities: Vec<Activity>,
    recommendations: Vec<Recommendation>,
    crops_by_farm: HashMap<String, HashSet<String>>,
    applications_by_crop: HashMap<String, HashSet<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub farms: usize,
    pub crops: usize,
    pub applications: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Validation(String),
    NotFound { kind: &'static str, id: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Validation(message) => write!(f, "{}", message),
            StoreError::NotFound { kind, id } => write!(f, "{} '{}' not found", kind, id),
        }
    }
}

impl Error for StoreError {}

impl From<InvalidDate> for StoreError {
    fn from(value: InvalidDate) -> Self {
        StoreError::Validation(value.to_string())
    }
}

#[derive(Debug)]
pub enum PersistenceError {
    Db(rusqlite::Error),
    Unavailable { key: String, reason: String },
    Serialize { key: String, source: serde_json::Error },
    Corrupt { key: String, source: serde_json::Error },
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Db(err) => write!(f, "storage database error: {}", err),
            PersistenceError::Unavailable { key, reason } => {
                write!(f, "storage unavailable for '{}': {}", key, reason)
            }
            PersistenceError::Serialize { key, source } => {
                write!(f, "failed to serialize '{}': {}", key, source)
            }
            PersistenceError::Corrupt { key, source } => {
                write!(f, "stored collection '{}' is not valid JSON: {}", key, source)
            }
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PersistenceError::Db(err) => Some(err),
            PersistenceError::Unavailable { .. } => None,
            PersistenceError::Serialize { source, .. } => Some(source),
            PersistenceError::Corrupt { source, .. } => Some(source),
        }
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        PersistenceError::Db(value)
    }
}

impl RecordStore {
    pub fn load(kv: &dyn KvStore) -> Result<Self, PersistenceError> {
        let mut store = Self {
            farms: read_collection(kv, FARMS_KEY)?,
            crops: read_collection(kv, CROPS_KEY)?,
            applications: read_collection(kv, APPLICATIONS_KEY)?,
            activities: read_collection(kv, ACTIVITIES_KEY)?,
            recommendations: read_snapshot(kv)?,
            ..Self::default()
        };
        store.reindex();
        tracing::debug!(
            farms = store.farms.len(),
            crops = store.crops.len(),
            applications = store.applications.len(),
            "loaded record store"
        );
        Ok(store)
    }

    /// Overwrites every collection, one key at a time. A failure part way
    /// leaves the earlier keys written; in-memory state is untouched.
    pub fn save(&self, kv: &mut dyn KvStore) -> Result<(), PersistenceError> {
        write_collection(kv, FARMS_KEY, &self.farms)?;
        write_collection(kv, CROPS_KEY, &self.crops)?;
        write_collection(kv, APPLICATIONS_KEY, &self.applications)?;
        write_collection(kv, ACTIVITIES_KEY, &self.activities)?;
        write_collection(kv, RECOMMENDATIONS_KEY, &self.recommendations)?;
        tracing::debug!("saved record store");
        Ok(())
    }

    pub fn farms(&self) -> &[Farm] {
        &self.farms
    }

    pub fn crops(&self) -> &[Crop] {
        &self.crops
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    #[cfg(test)]
    pub fn recommendation_cache(&self) -> &[Recommendation] {
        &self.recommendations
    }

    pub fn set_recommendation_cache(&mut self, recommendations: Vec<Recommendation>) {
        self.recommendations = recommendations;
    }

    pub fn get_crop(&self, crop_id: &str) -> Option<&Crop> {
        self.crops.iter().find(|crop| crop.id == crop_id)
    }

    pub fn get_application(&self, application_id: &str) -> Option<&Application> {
        self.applications
            .iter()
            .find(|application| application.id == application_id)
    }

    pub fn farm_crops(&self, farm_id: &str) -> Vec<&Crop> {
        self.crops
            .iter()
            .filter(|crop| crop.farm_id == farm_id)
            .collect()
    }

    pub fn add_farm(&mut self, input: NewFarm, created_at: &str) -> Result<Farm, StoreError> {
        let name = required(&input.name, "farm name")?;
        let farm_code = required(&input.farm_code, "farm code")?;
        let size = input.size.unwrap_or(0.0);
        if !size.is_finite() || size < 0.0 {
            return Err(StoreError::Validation(
                "farm size must be a non-negative number".to_string(),
            ));
        }
        let code_lower = farm_code.to_lowercase();
        if self
            .farms
            .iter()
            .any(|farm| farm.farm_code.to_lowercase() == code_lower)
        {
            return Err(StoreError::Validation(format!(
                "farm code '{}' already exists",
                farm_code
            )));
        }

        let farm = Farm {
            id: generate_record_id(FARM_PREFIX, |candidate| self.farm_exists(candidate)),
            name,
            farm_code,
            location: normalize_text(input.location.as_deref()).unwrap_or_default(),
            size,
            soil_type: normalize_text(input.soil_type.as_deref()),
            created_at: created_at.to_string(),
        };
        self.crops_by_farm.entry(farm.id.clone()).or_default();
        self.farms.push(farm.clone());
        Ok(farm)
    }

    /// Returns the previous name. The farm code is not re-checked.
    pub fn rename_farm(&mut self, farm_id: &str, name: &str) -> Result<String, StoreError> {
        let name = required(name, "farm name")?;
        let farm = self
            .farms
            .iter_mut()
            .find(|farm| farm.id == farm_id)
            .ok_or_else(|| not_found("farm", farm_id))?;
        Ok(std::mem::replace(&mut farm.name, name))
    }

    pub fn delete_farm(&mut self, farm_id: &str) -> Result<(Farm, CascadeReport), StoreError> {
        let position = self
            .farms
            .iter()
            .position(|farm| farm.id == farm_id)
            .ok_or_else(|| not_found("farm", farm_id))?;

        let crop_ids = self.crops_by_farm.remove(farm_id).unwrap_or_default();
        let mut application_ids = HashSet::new();
        for crop_id in &crop_ids {
            if let Some(ids) = self.applications_by_crop.remove(crop_id) {
                application_ids.extend(ids);
            }
        }

        let report = CascadeReport {
            farms: 1,
            crops: self.remove_crops(&crop_ids),
            applications: self.remove_applications(&application_ids),
        };
        let farm = self.farms.remove(position);
        tracing::info!(
            farm_id,
            crops = report.crops,
            applications = report.applications,
            "deleted farm"
        );
        Ok((farm, report))
    }

    pub fn add_crop(
        &mut self,
        input: NewCrop,
        knowledge: &KnowledgeBase,
        created_at: &str,
    ) -> Result<Crop, StoreError> {
        let crop_type = required(&input.crop_type, "crop type")?.to_ascii_lowercase();
        let farm_id = required(&input.farm_id, "farm")?;
        let planting_date = required(&input.planting_date, "planting date")?;
        if !input.area.is_finite() || input.area <= 0.0 {
            return Err(StoreError::Validation(
                "crop area must be a positive number".to_string(),
            ));
        }
        let custom_name = normalize_text(input.custom_name.as_deref());
        let name = if crop_type == CROP_TYPE_OTHER {
            custom_name.ok_or_else(|| {
                StoreError::Validation("custom crop name is required for type 'other'".to_string())
            })?
        } else {
            knowledge
                .get(&crop_type)
                .map(|known| known.name.clone())
                .unwrap_or_else(|| crop_type.clone())
        };
        let planting_date = normalize_day(&planting_date)?;
        let harvest_date = match normalize_text(input.harvest_date.as_deref()) {
            Some(raw) => Some(normalize_day(&raw)?),
            None => None,
        };
        if !self.farm_exists(&farm_id) {
            return Err(not_found("farm", &farm_id));
        }

        let crop = Crop {
            id: generate_record_id(CROP_PREFIX, |candidate| self.crop_exists(candidate)),
            crop_type,
            name,
            variety: normalize_text(input.variety.as_deref()).unwrap_or_default(),
            farm_id,
            planting_date,
            harvest_date,
            area: input.area,
            field_id: normalize_text(input.field_id.as_deref()),
            notes: normalize_text(input.notes.as_deref()).unwrap_or_default(),
            status: CROP_STATUS_ACTIVE.to_string(),
            created_at: created_at.to_string(),
        };
        self.crops_by_farm
            .entry(crop.farm_id.clone())
            .or_default()
            .insert(crop.id.clone());
        self.applications_by_crop.entry(crop.id.clone()).or_default();
        self.crops.push(crop.clone());
        Ok(crop)
    }

    pub fn rename_crop(&mut self, crop_id: &str, name: &str) -> Result<String, StoreError> {
        let name = required(name, "crop name")?;
        let crop = self
            .crops
            .iter_mut()
            .find(|crop| crop.id == crop_id)
            .ok_or_else(|| not_found("crop", crop_id))?;
        Ok(std::mem::replace(&mut crop.name, name))
    }

    pub fn delete_crop(&mut self, crop_id: &str) -> Result<(Crop, CascadeReport), StoreError> {
        let position = self
            .crops
            .iter()
            .position(|crop| crop.id == crop_id)
            .ok_or_else(|| not_found("crop", crop_id))?;

        let application_ids = self
            .applications_by_crop
            .remove(crop_id)
            .unwrap_or_default();
        let applications = self.remove_applications(&application_ids);
        let crop = self.crops.remove(position);
        if let Some(ids) = self.crops_by_farm.get_mut(&crop.farm_id) {
            ids.remove(crop_id);
        }
        tracing::info!(crop_id, applications, "deleted crop");
        Ok((
            crop,
            CascadeReport {
                farms: 0,
                crops: 1,
                applications,
            },
        ))
    }

    pub fn add_application(
        &mut self,
        input: NewApplication,
        created_at: &str,
    ) -> Result<Application, StoreError> {
        let crop_id = required(&input.crop_id, "crop")?;
        let product_name = required(&input.product_name, "product name")?;
        let date = required(&input.date, "application date")?;
        if !input.quantity.is_finite() || input.quantity <= 0.0 {
            return Err(StoreError::Validation(
                "quantity must be a positive number".to_string(),
            ));
        }
        let date = normalize_day(&date)?;
        if !self.crop_exists(&crop_id) {
            return Err(not_found("crop", &crop_id));
        }

        let application = Application {
            id: generate_record_id(APPLICATION_PREFIX, |candidate| {
                self.application_exists(candidate)
            }),
            crop_id,
            treatment_type: input.treatment_type,
            product_name,
            quantity: input.quantity,
            unit: input.unit.trim().to_string(),
            date,
            growth_stage: normalize_text(input.growth_stage.as_deref()),
            method: normalize_text(input.method.as_deref()),
            weather: normalize_text(input.weather.as_deref()),
            purpose: normalize_text(input.purpose.as_deref()),
            notes: normalize_text(input.notes.as_deref()),
            created_at: created_at.to_string(),
        };
        self.applications_by_crop
            .entry(application.crop_id.clone())
            .or_default()
            .insert(application.id.clone());
        self.applications.push(application.clone());
        Ok(application)
    }

    pub fn rename_application(
        &mut self,
        application_id: &str,
        product_name: &str,
    ) -> Result<String, StoreError> {
        let product_name = required(product_name, "product name")?;
        let application = self
            .applications
            .iter_mut()
            .find(|application| application.id == application_id)
            .ok_or_else(|| not_found("application", application_id))?;
        Ok(std::mem::replace(
            &mut application.product_name,
            product_name,
        ))
    }

    pub fn delete_application(&mut self, application_id: &str) -> Result<Application, StoreError> {
        let position = self
            .applications
            .iter()
            .position(|application| application.id == application_id)
            .ok_or_else(|| not_found("application", application_id))?;
        let application = self.applications.remove(position);
        if let Some(ids) = self.applications_by_crop.get_mut(&application.crop_id) {
            ids.remove(application_id);
        }
        Ok(application)
    }

    pub fn record_activity(
        &mut self,
        message: String,
        crop_id: Option<&str>,
        occurred_at: &str,
        limit: usize,
    ) -> &Activity {
        let entry = activity::new_activity(message, crop_id, occurred_at, |candidate| {
            self.activities.iter().any(|existing| existing.id == candidate)
        });
        activity::prepend_capped(&mut self.activities, entry, limit);
        &self.activities[0]
    }

    fn farm_exists(&self, farm_id: &str) -> bool {
        self.farms.iter().any(|farm| farm.id == farm_id)
    }

    fn crop_exists(&self, crop_id: &str) -> bool {
        self.crops.iter().any(|crop| crop.id == crop_id)
    }

    fn application_exists(&self, application_id: &str) -> bool {
        self.applications
            .iter()
            .any(|application| application.id == application_id)
    }

    fn remove_crops(&mut self, ids: &HashSet<String>) -> usize {
        let before = self.crops.len();
        self.crops.retain(|crop| !ids.contains(&crop.id));
        before - self.crops.len()
    }

    fn remove_applications(&mut self, ids: &HashSet<String>) -> usize {
        let before = self.applications.len();
        self.applications
            .retain(|application| !ids.contains(&application.id));
        before - self.applications.len()
    }

    fn reindex(&mut self) {
        self.crops_by_farm.clear();
        self.applications_by_crop.clear();
        for crop in &self.crops {
            self.crops_by_farm
                .entry(crop.farm_id.clone())
                .or_default()
                .insert(crop.id.clone());
        }
        for application in &self.applications {
            self.applications_by_crop
                .entry(application.crop_id.clone())
                .or_default()
                .insert(application.id.clone());
        }
    }
}

impl RecordSource for RecordStore {
    fn list_crops(&self) -> &[Crop] {
        &self.crops
    }

    fn list_applications(&self, crop_id: &str) -> Vec<&Application> {
        self.applications
            .iter()
            .filter(|application| application.crop_id == crop_id)
            .collect()
    }

    fn get_farm(&self, farm_id: &str) -> Option<&Farm> {
        self.farms.iter().find(|farm| farm.id == farm_id)
    }
}

fn read_collection<T: DeserializeOwned>(
    kv: &dyn KvStore,
    key: &str,
) -> Result<Vec<T>, PersistenceError> {
    match kv.get(key)? {
        Some(raw) => serde_json::from_str(&raw).map_err(|source| PersistenceError::Corrupt {
            key: key.to_string(),
            source,
        }),
        None => Ok(Vec::new()),
    }
}

/// The recommendation snapshot is rebuilt on the next feed computation, so an
/// unreadable one is dropped rather than failing the load.
fn read_snapshot(kv: &dyn KvStore) -> Result<Vec<Recommendation>, PersistenceError> {
    match read_collection(kv, RECOMMENDATIONS_KEY) {
        Err(PersistenceError::Corrupt { key, source }) => {
            tracing::warn!(key = %key, error = %source, "discarding unreadable snapshot");
            Ok(Vec::new())
        }
        other => other,
    }
}

fn write_collection<T: Serialize>(
    kv: &mut dyn KvStore,
    key: &str,
    items: &[T],
) -> Result<(), PersistenceError> {
    let raw = serde_json::to_string(items).map_err(|source| PersistenceError::Serialize {
        key: key.to_string(),
        source,
    })?;
    kv.set(key, &raw)
}

fn required(raw: &str, field: &str) -> Result<String, StoreError> {
    normalize_text(Some(raw))
        .ok_or_else(|| StoreError::Validation(format!("{} is required", field)))
}

fn not_found(kind: &'static str, id: &str) -> StoreError {
    StoreError::NotFound {
        kind,
        id: id.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod memory;
#[cfg(test)]
mod tests;
