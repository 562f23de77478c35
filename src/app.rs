use std::error::Error;
use std::fmt;

use rusqlite::Connection;
use serde::Serialize;
use time::OffsetDateTime;

use crate::analytics::{self, Analytics, CalendarMonth, Dashboard};
use crate::db::{self, CollectionStat, SqliteKv};
use crate::domain::dates::{format_day, format_rfc3339, InvalidDate};
use crate::domain::records::{Activity, Application, Crop, Farm, NewApplication, NewCrop, NewFarm};
use crate::domain::treatment::ParseTreatmentTypeError;
use crate::knowledge::{KnowledgeBase, KnowledgeError};
use crate::recommend::{
    recommend_for_all, Recommendation, RecommendationFeed, RecommendationKind, UNKNOWN_FARM,
};
use crate::settings::{Setting, SettingError};
use crate::store::{CascadeReport, PersistenceError, RecordSource, RecordStore, StoreError};

pub struct App {
    conn: Connection,
    store: RecordStore,
    knowledge: KnowledgeBase,
    now: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CropDetail {
    pub crop: Crop,
    pub farm_name: String,
    pub icon: String,
    pub applications: Vec<Application>,
    pub recommendations: Vec<Recommendation>,
}

impl App {
    /// Opens (creating if needed) the database at `db_path` and loads every
    /// collection. `now` is the instant all operations of this session use.
    pub fn open(db_path: &str, now: OffsetDateTime) -> Result<Self, AppError> {
        ensure_parent_dir(db_path)?;
        let conn = db::open_connection(db_path)?;
        let knowledge = KnowledgeBase::load()?;
        let store = RecordStore::load(&SqliteKv::new(&conn))?;
        Ok(Self {
            conn,
            store,
            knowledge,
            now,
        })
    }

    pub fn now(&self) -> OffsetDateTime {
        self.now
    }

    pub fn farms(&self) -> &[Farm] {
        self.store.farms()
    }

    pub fn crops(&self, farm_id: Option<&str>) -> Vec<&Crop> {
        match farm_id {
            Some(farm_id) => self.store.farm_crops(farm_id),
            None => self.store.crops().iter().collect(),
        }
    }

    pub fn applications(&self, crop_id: Option<&str>) -> Vec<&Application> {
        match crop_id {
            Some(crop_id) => self.store.list_applications(crop_id),
            None => self.store.applications().iter().collect(),
        }
    }

    pub fn activities(&self, limit: Option<usize>) -> &[Activity] {
        let entries = self.store.activities();
        match limit {
            Some(limit) => &entries[..limit.min(entries.len())],
            None => entries,
        }
    }

    pub fn add_farm(&mut self, input: NewFarm) -> Result<Farm, AppError> {
        let created_at = self.timestamp();
        let farm = self.store.add_farm(input, &created_at)?;
        self.commit(format!("Added new farm: {}", farm.name), None)?;
        Ok(farm)
    }

    pub fn rename_farm(&mut self, farm_id: &str, name: &str) -> Result<Farm, AppError> {
        let previous = self.store.rename_farm(farm_id, name)?;
        let farm = self
            .store
            .get_farm(farm_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("farm", farm_id))?;
        self.commit(format!("Updated farm: {} -> {}", previous, farm.name), None)?;
        Ok(farm)
    }

    pub fn delete_farm(&mut self, farm_id: &str) -> Result<CascadeReport, AppError> {
        let (farm, report) = self.store.delete_farm(farm_id)?;
        self.commit(format!("Deleted farm: {}", farm.name), None)?;
        Ok(report)
    }

    pub fn add_crop(&mut self, input: NewCrop) -> Result<Crop, AppError> {
        let created_at = self.timestamp();
        let crop = self.store.add_crop(input, &self.knowledge, &created_at)?;
        self.commit(
            format!("Added new crop: {} ({} acres)", crop.name, crop.area),
            Some(crop.id.as_str()),
        )?;
        Ok(crop)
    }

    pub fn rename_crop(&mut self, crop_id: &str, name: &str) -> Result<Crop, AppError> {
        let previous = self.store.rename_crop(crop_id, name)?;
        let crop = self.crop(crop_id)?.clone();
        self.commit(
            format!("Updated crop: {} -> {}", previous, crop.name),
            Some(crop_id),
        )?;
        Ok(crop)
    }

    pub fn delete_crop(&mut self, crop_id: &str) -> Result<CascadeReport, AppError> {
        let (crop, report) = self.store.delete_crop(crop_id)?;
        self.commit(format!("Deleted crop: {}", crop.name), None)?;
        Ok(report)
    }

    pub fn crop_detail(&self, crop_id: &str) -> Result<CropDetail, AppError> {
        let crop = self.crop(crop_id)?;
        let feed = recommend_for_all(&self.store, &self.knowledge, self.now);
        Ok(CropDetail {
            crop: crop.clone(),
            farm_name: self
                .store
                .get_farm(&crop.farm_id)
                .map_or(UNKNOWN_FARM, |farm| farm.name.as_str())
                .to_string(),
            icon: self.knowledge.icon_for(&crop.crop_type).to_string(),
            applications: self
                .store
                .list_applications(crop_id)
                .into_iter()
                .cloned()
                .collect(),
            recommendations: feed
                .items
                .into_iter()
                .filter(|item| item.crop_id == crop_id)
                .collect(),
        })
    }

    pub fn add_application(&mut self, input: NewApplication) -> Result<Application, AppError> {
        let created_at = self.timestamp();
        let application = self.store.add_application(input, &created_at)?;
        let crop_name = self.crop_name(&application.crop_id);
        self.commit(
            format!(
                "Applied {}: {} to {}",
                application.treatment_type, application.product_name, crop_name
            ),
            Some(application.crop_id.as_str()),
        )?;
        Ok(application)
    }

    pub fn rename_application(
        &mut self,
        application_id: &str,
        product_name: &str,
    ) -> Result<Application, AppError> {
        let previous = self.store.rename_application(application_id, product_name)?;
        let application = self
            .store
            .get_application(application_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("application", application_id))?;
        self.commit(
            format!(
                "Updated application: {} -> {}",
                previous, application.product_name
            ),
            Some(application.crop_id.as_str()),
        )?;
        Ok(application)
    }

    pub fn delete_application(&mut self, application_id: &str) -> Result<Application, AppError> {
        let application = self.store.delete_application(application_id)?;
        let crop_name = self.crop_name(&application.crop_id);
        self.commit(
            format!(
                "Deleted application: {} from {}",
                application.product_name, crop_name
            ),
            Some(application.crop_id.as_str()),
        )?;
        Ok(application)
    }

    /// Computes the feed, stores it as the cached snapshot, and returns it,
    /// optionally narrowed to one crop.
    pub fn recommendations(
        &mut self,
        crop_id: Option<&str>,
    ) -> Result<RecommendationFeed, AppError> {
        if let Some(crop_id) = crop_id {
            self.crop(crop_id)?;
        }
        let mut feed = self.refresh_feed();
        if let Some(crop_id) = crop_id {
            feed.items.retain(|item| item.crop_id == crop_id);
            feed.failures.retain(|failure| failure.crop_id == crop_id);
        }
        Ok(feed)
    }

    /// Records the recommended treatment as an application dated today.
    pub fn apply_recommendation(
        &mut self,
        recommendation_id: &str,
        quantity: f64,
        unit: &str,
    ) -> Result<Application, AppError> {
        let feed = recommend_for_all(&self.store, &self.knowledge, self.now);
        let recommendation = feed
            .find(recommendation_id)
            .ok_or_else(|| AppError::not_found("recommendation", recommendation_id))?;
        let Some(treatment_type) = recommendation.kind.treatment_type() else {
            return Err(AppError::InvalidArgument(format!(
                "recommendation '{}' is a {} reminder and cannot be applied",
                recommendation_id,
                RecommendationKind::HarvestPrep
            )));
        };

        let input = NewApplication {
            crop_id: recommendation.crop_id.clone(),
            treatment_type,
            product_name: recommendation.product.clone().unwrap_or_default(),
            quantity,
            unit: unit.to_string(),
            date: format_day(self.now.date()),
            growth_stage: Some(recommendation.stage.as_str().to_string()),
            method: None,
            weather: None,
            purpose: recommendation.purpose.clone(),
            notes: Some(format!("From recommendation: {}", recommendation.title)),
        };
        self.add_application(input)
    }

    pub fn dashboard(&mut self) -> Result<Dashboard, AppError> {
        let urgent_limit = self.setting(Setting::UrgentLimit)?;
        let feed = self.refresh_feed();
        Ok(analytics::dashboard(
            &self.store,
            &self.knowledge,
            &feed,
            urgent_limit,
            self.now,
        ))
    }

    pub fn analytics(&mut self, year: Option<i32>) -> Analytics {
        let feed = self.refresh_feed();
        analytics::analytics(
            &self.store,
            &feed,
            year.unwrap_or_else(|| self.now.year()),
            self.now,
        )
    }

    pub fn calendar(
        &self,
        year: Option<i32>,
        crop_id: Option<&str>,
    ) -> Result<Vec<CalendarMonth>, AppError> {
        if let Some(crop_id) = crop_id {
            self.crop(crop_id)?;
        }
        Ok(analytics::calendar(
            &self.store,
            &self.knowledge,
            year.unwrap_or_else(|| self.now.year()),
            crop_id,
        ))
    }

    /// Stored value, or the default when missing or unreadable.
    pub fn setting(&self, setting: Setting) -> Result<usize, AppError> {
        let raw = db::get_meta(&self.conn, setting.key())?;
        let value = match raw {
            Some(raw) => setting.parse_value(&raw).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "falling back to default setting");
                setting.default_value()
            }),
            None => setting.default_value(),
        };
        Ok(value)
    }

    pub fn set_setting(&self, setting: Setting, raw: &str) -> Result<usize, AppError> {
        let value = setting.parse_value(raw)?;
        db::set_meta(&self.conn, setting.key(), &value.to_string())?;
        Ok(value)
    }

    pub fn collection_stats(&self) -> Result<Vec<CollectionStat>, AppError> {
        Ok(db::collection_stats(&self.conn)?)
    }

    fn crop(&self, crop_id: &str) -> Result<&Crop, AppError> {
        self.store
            .get_crop(crop_id)
            .ok_or_else(|| AppError::not_found("crop", crop_id))
    }

    fn crop_name(&self, crop_id: &str) -> String {
        self.store
            .get_crop(crop_id)
            .map_or(analytics::UNKNOWN_CROP, |crop| crop.name.as_str())
            .to_string()
    }

    fn timestamp(&self) -> String {
        format_rfc3339(self.now)
    }

    /// Logs the mutation and writes every collection. On a failed write the
    /// in-memory state is kept and the error is returned.
    fn commit(&mut self, message: String, crop_id: Option<&str>) -> Result<(), AppError> {
        let limit = self.setting(Setting::ActivityLimit)?;
        let occurred_at = self.timestamp();
        self.store
            .record_activity(message, crop_id, &occurred_at, limit);
        self.store.save(&mut SqliteKv::new(&self.conn))?;
        Ok(())
    }

    /// The recommendation cache is a derived snapshot; failing to persist it
    /// does not fail the read.
    fn refresh_feed(&mut self) -> RecommendationFeed {
        let feed = recommend_for_all(&self.store, &self.knowledge, self.now);
        self.store.set_recommendation_cache(feed.items.clone());
        if let Err(err) = self.store.save(&mut SqliteKv::new(&self.conn)) {
            tracing::warn!(error = %err, "failed to persist recommendation snapshot");
        }
        feed
    }
}

fn ensure_parent_dir(path: &str) -> Result<(), AppError> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Db(rusqlite::Error),
    Persistence(PersistenceError),
    Store(StoreError),
    Knowledge(KnowledgeError),
    InvalidDate(InvalidDate),
    ParseTreatment(ParseTreatmentTypeError),
    Setting(SettingError),
    InvalidArgument(String),
    NotFound { kind: &'static str, id: String },
}

impl AppError {
    fn not_found(kind: &'static str, id: &str) -> Self {
        AppError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Db(err) => write!(f, "database error: {}", err),
            AppError::Persistence(err) => write!(f, "{}", err),
            AppError::Store(err) => write!(f, "{}", err),
            AppError::Knowledge(err) => write!(f, "knowledge base error: {}", err),
            AppError::InvalidDate(err) => write!(f, "{}", err),
            AppError::ParseTreatment(err) => write!(f, "{}", err),
            AppError::Setting(err) => write!(f, "{}", err),
            AppError::InvalidArgument(message) => write!(f, "{}", message),
            AppError::NotFound { kind, id } => write!(f, "{} '{}' not found", kind, id),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Db(err) => Some(err),
            AppError::Persistence(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Knowledge(err) => Some(err),
            AppError::InvalidDate(err) => Some(err),
            AppError::ParseTreatment(err) => Some(err),
            AppError::Setting(err) => Some(err),
            AppError::InvalidArgument(_) => None,
            AppError::NotFound { .. } => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<PersistenceError> for AppError {
    fn from(value: PersistenceError) -> Self {
        AppError::Persistence(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        AppError::Store(value)
    }
}

impl From<KnowledgeError> for AppError {
    fn from(value: KnowledgeError) -> Self {
        AppError::Knowledge(value)
    }
}

impl From<InvalidDate> for AppError {
    fn from(value: InvalidDate) -> Self {
        AppError::InvalidDate(value)
    }
}

impl From<ParseTreatmentTypeError> for AppError {
    fn from(value: ParseTreatmentTypeError) -> Self {
        AppError::ParseTreatment(value)
    }
}

impl From<SettingError> for AppError {
    fn from(value: SettingError) -> Self {
        AppError::Setting(value)
    }
}
