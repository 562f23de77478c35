use std::cmp::Reverse;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};

use crate::domain::dates::{day_start, days_between, format_rfc3339, parse_day, InvalidDate};
use crate::domain::records::{Application, Crop, Farm};
use crate::domain::stage::{days_since_planting, GrowthStage};
use crate::domain::treatment::TreatmentType;
use crate::knowledge::{KnowledgeBase, TreatmentRule};
use crate::store::RecordSource;

pub const UNKNOWN_FARM: &str = "Unknown Farm";

const RECENT_APPLICATION_WINDOW: Duration = Duration::days(14);
const DUE_AFTER: Duration = Duration::days(7);
const HARVEST_PREP_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Urgency falls off with crop age, not with the rule itself.
    pub fn for_days(days_since_start: i64) -> Self {
        if days_since_start <= 7 {
            Priority::High
        } else if days_since_start <= 21 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationKind {
    Fertilizer,
    Pesticide,
    Herbicide,
    Fungicide,
    Other,
    HarvestPrep,
}

impl RecommendationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecommendationKind::Fertilizer => "fertilizer",
            RecommendationKind::Pesticide => "pesticide",
            RecommendationKind::Herbicide => "herbicide",
            RecommendationKind::Fungicide => "fungicide",
            RecommendationKind::Other => "other",
            RecommendationKind::HarvestPrep => "harvest-prep",
        }
    }

    pub fn treatment_type(self) -> Option<TreatmentType> {
        match self {
            RecommendationKind::Fertilizer => Some(TreatmentType::Fertilizer),
            RecommendationKind::Pesticide => Some(TreatmentType::Pesticide),
            RecommendationKind::Herbicide => Some(TreatmentType::Herbicide),
            RecommendationKind::Fungicide => Some(TreatmentType::Fungicide),
            RecommendationKind::Other => Some(TreatmentType::Other),
            RecommendationKind::HarvestPrep => None,
        }
    }
}

impl From<TreatmentType> for RecommendationKind {
    fn from(value: TreatmentType) -> Self {
        match value {
            TreatmentType::Fertilizer => RecommendationKind::Fertilizer,
            TreatmentType::Pesticide => RecommendationKind::Pesticide,
            TreatmentType::Herbicide => RecommendationKind::Herbicide,
            TreatmentType::Fungicide => RecommendationKind::Fungicide,
            TreatmentType::Other => RecommendationKind::Other,
        }
    }
}

impl fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recommendation {
    pub id: String,
    pub crop_id: String,
    pub crop_name: String,
    pub crop_icon: String,
    pub farm_name: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub timing: Option<String>,
    pub priority: Priority,
    pub stage: GrowthStage,
    pub due_date: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CropFailure {
    pub crop_id: String,
    pub crop_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RecommendationFeed {
    pub items: Vec<Recommendation>,
    pub failures: Vec<CropFailure>,
}

impl RecommendationFeed {
    /// The first `limit` high-priority items, in feed order.
    pub fn urgent(&self, limit: usize) -> Vec<&Recommendation> {
        self.items
            .iter()
            .filter(|item| item.priority == Priority::High)
            .take(limit)
            .collect()
    }

    pub fn find(&self, recommendation_id: &str) -> Option<&Recommendation> {
        self.items.iter().find(|item| item.id == recommendation_id)
    }
}

/// Recommendations for one crop at `now`.
///
/// Crop types missing from the knowledge base never produce anything, not even
/// a harvest reminder. The inferred stage is the generic day-count stage, which
/// is matched against the crop's own stage names verbatim.
pub fn recommend_for(
    crop: &Crop,
    applications: &[&Application],
    farm: Option<&Farm>,
    knowledge: &KnowledgeBase,
    now: OffsetDateTime,
) -> Result<Vec<Recommendation>, InvalidDate> {
    let Some(crop_knowledge) = knowledge.get(&crop.crop_type) else {
        return Ok(Vec::new());
    };

    let planting = parse_day(&crop.planting_date)?;
    let days_since_start = days_since_planting(planting, now);
    let stage = GrowthStage::for_days(days_since_start);
    let context = CropContext {
        crop,
        icon: &crop_knowledge.icon,
        farm_name: farm.map_or(UNKNOWN_FARM, |farm| farm.name.as_str()),
        stage,
    };

    // Saturates at the last representable day instead of overflowing.
    let due = now
        .checked_add(DUE_AFTER)
        .unwrap_or_else(|| day_start(Date::MAX));
    let mut recommendations = Vec::new();
    for rule in crop_knowledge.rules_for(stage.as_str()) {
        if has_recent_match(rule, applications, now) {
            continue;
        }
        recommendations.push(context.treatment(
            rule,
            Priority::for_days(days_since_start),
            due,
        ));
    }

    if let Some(raw_harvest) = crop.harvest_date.as_deref() {
        let harvest = day_start(parse_day(raw_harvest)?);
        let days_to_harvest = days_between(now, harvest);
        if days_to_harvest > 0 && days_to_harvest <= HARVEST_PREP_WINDOW_DAYS {
            recommendations.push(context.harvest_prep(days_to_harvest, harvest));
        }
    }

    Ok(recommendations)
}

/// Every crop's recommendations, highest priority first. Ties keep crop order
/// then rule order. A crop with unreadable dates is reported in `failures`
/// and skipped.
pub fn recommend_for_all(
    source: &dyn RecordSource,
    knowledge: &KnowledgeBase,
    now: OffsetDateTime,
) -> RecommendationFeed {
    let mut feed = RecommendationFeed::default();
    for crop in source.list_crops() {
        let applications = source.list_applications(&crop.id);
        let farm = source.get_farm(&crop.farm_id);
        match recommend_for(crop, &applications, farm, knowledge, now) {
            Ok(items) => feed.items.extend(items),
            Err(err) => {
                tracing::warn!(crop_id = %crop.id, error = %err, "skipping crop recommendations");
                feed.failures.push(CropFailure {
                    crop_id: crop.id.clone(),
                    crop_name: crop.name.clone(),
                    error: err.to_string(),
                });
            }
        }
    }
    feed.items.sort_by_key(|item| Reverse(item.priority.rank()));
    feed
}

/// Same type, product containing the rule's first word, dated within 14 days
/// either side of `now`. Unreadable application dates never match.
fn has_recent_match(
    rule: &TreatmentRule,
    applications: &[&Application],
    now: OffsetDateTime,
) -> bool {
    let keyword = rule
        .product
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase();
    applications.iter().any(|application| {
        application.treatment_type == rule.treatment_type
            && application.product_name.to_lowercase().contains(&keyword)
            && parse_day(&application.date)
                .map(|day| (day_start(day) - now).abs() < RECENT_APPLICATION_WINDOW)
                .unwrap_or(false)
    })
}

struct CropContext<'a> {
    crop: &'a Crop,
    icon: &'a str,
    farm_name: &'a str,
    stage: GrowthStage,
}

impl CropContext<'_> {
    fn treatment(
        &self,
        rule: &TreatmentRule,
        priority: Priority,
        due: OffsetDateTime,
    ) -> Recommendation {
        let kind = RecommendationKind::from(rule.treatment_type);
        Recommendation {
            id: format!("{}:{}:{}", self.crop.id, kind, slug(&rule.product)),
            crop_id: self.crop.id.clone(),
            crop_name: self.crop.name.clone(),
            crop_icon: self.icon.to_string(),
            farm_name: self.farm_name.to_string(),
            title: format!("{} Application for {}", kind, self.crop.name),
            description: format!(
                "Apply {} - {}. Timing: {}",
                rule.product, rule.purpose, rule.timing
            ),
            kind,
            product: Some(rule.product.clone()),
            purpose: Some(rule.purpose.clone()),
            timing: Some(rule.timing.clone()),
            priority,
            stage: self.stage,
            due_date: format_rfc3339(due),
        }
    }

    fn harvest_prep(&self, days_to_harvest: i64, harvest: OffsetDateTime) -> Recommendation {
        let kind = RecommendationKind::HarvestPrep;
        Recommendation {
            id: format!("{}:{}", self.crop.id, kind),
            crop_id: self.crop.id.clone(),
            crop_name: self.crop.name.clone(),
            crop_icon: self.icon.to_string(),
            farm_name: self.farm_name.to_string(),
            title: format!("Prepare for harvest - {}", self.crop.name),
            description: format!(
                "Harvest scheduled in {} days. Ensure final applications are completed.",
                days_to_harvest
            ),
            kind,
            product: None,
            purpose: None,
            timing: None,
            priority: Priority::Medium,
            stage: self.stage,
            due_date: format_rfc3339(harvest),
        }
    }
}

fn slug(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}
