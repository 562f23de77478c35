use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::dates::{day_start, days_between, parse_day};
use crate::domain::records::Application;
use crate::domain::stage::{days_since_planting, GrowthStage};
use crate::domain::treatment::TreatmentType;
use crate::knowledge::KnowledgeBase;
use crate::recommend::{Recommendation, RecommendationFeed, UNKNOWN_FARM};
use crate::store::{RecordSource, RecordStore};

pub const UNKNOWN_CROP: &str = "Unknown";
pub const ACTIVE_CROP_DAYS: i64 = 120;
/// Record-keeping score bounds, in percent.
const DATA_QUALITY_FLOOR: usize = 60;
const DATA_QUALITY_CEILING: usize = 95;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Summary {
    pub total_crops: usize,
    pub total_applications: usize,
    pub average_applications_per_crop: f64,
    pub most_used_type: Option<TreatmentType>,
    pub most_used_count: usize,
    pub active_crops: usize,
    pub unique_varieties: usize,
    pub applications_this_month: usize,
    pub upcoming_tasks: usize,
    pub data_quality_score: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Analytics {
    pub summary: Summary,
    pub year: i32,
    pub by_crop: Vec<LabelCount>,
    pub by_month: Vec<LabelCount>,
    pub by_stage: Vec<LabelCount>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarEntry {
    pub application_id: String,
    pub date: String,
    pub product_name: String,
    pub treatment_type: TreatmentType,
    pub crop_id: String,
    pub crop_name: String,
    pub crop_icon: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarMonth {
    pub month: &'static str,
    pub entries: Vec<CalendarEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CropOverview {
    pub crop_id: String,
    pub name: String,
    pub icon: String,
    pub farm_name: String,
    pub area: f64,
    pub stage: Option<GrowthStage>,
    pub days_since_start: Option<i64>,
    pub applications: usize,
    pub days_to_harvest: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Dashboard {
    pub total_crops: usize,
    pub applications_this_month: usize,
    pub upcoming_tasks: usize,
    pub unique_varieties: usize,
    pub urgent: Vec<Recommendation>,
    pub crops: Vec<CropOverview>,
}

pub fn summarize(store: &RecordStore, feed: &RecommendationFeed, now: OffsetDateTime) -> Summary {
    let total_crops = store.crops().len();
    let total_applications = store.applications().len();
    let average_applications_per_crop = if total_crops == 0 {
        0.0
    } else {
        round_one_decimal(total_applications as f64 / total_crops as f64)
    };
    let (most_used_type, most_used_count) = most_used_type(store.applications());
    let active_crops = store
        .crops()
        .iter()
        .filter_map(|crop| parse_day(&crop.planting_date).ok())
        .filter(|planting| days_since_planting(*planting, now) < ACTIVE_CROP_DAYS)
        .count();

    Summary {
        total_crops,
        total_applications,
        average_applications_per_crop,
        most_used_type,
        most_used_count,
        active_crops,
        unique_varieties: unique_varieties(store),
        applications_this_month: applications_this_month(store, now),
        upcoming_tasks: feed.items.len(),
        data_quality_score: data_quality_score(total_applications),
    }
}

/// 70% plus two points per recorded application, kept within 60..=95.
fn data_quality_score(total_applications: usize) -> usize {
    total_applications
        .saturating_mul(2)
        .saturating_add(70)
        .clamp(DATA_QUALITY_FLOOR, DATA_QUALITY_CEILING)
}

pub fn analytics(
    store: &RecordStore,
    feed: &RecommendationFeed,
    year: i32,
    now: OffsetDateTime,
) -> Analytics {
    let mut by_crop = Vec::new();
    let mut by_stage = Vec::new();
    let mut months = [0usize; 12];
    for application in store.applications() {
        let crop_name = store
            .get_crop(&application.crop_id)
            .map_or(UNKNOWN_CROP, |crop| crop.name.as_str());
        bump(&mut by_crop, crop_name);
        if let Some(stage) = application.growth_stage.as_deref() {
            bump(&mut by_stage, stage);
        }
        if let Ok(day) = parse_day(&application.date) {
            if day.year() == year {
                months[usize::from(u8::from(day.month())) - 1] += 1;
            }
        }
    }

    Analytics {
        summary: summarize(store, feed, now),
        year,
        by_crop,
        by_month: MONTH_NAMES
            .iter()
            .zip(months)
            .map(|(month, count)| LabelCount {
                label: month.to_string(),
                count,
            })
            .collect(),
        by_stage,
    }
}

/// Applications dated in `year`, bucketed into the twelve months in store
/// order. Months with nothing recorded are kept.
pub fn calendar(
    store: &RecordStore,
    knowledge: &KnowledgeBase,
    year: i32,
    crop_id: Option<&str>,
) -> Vec<CalendarMonth> {
    let mut months = MONTH_NAMES
        .iter()
        .map(|month| CalendarMonth {
            month: *month,
            entries: Vec::new(),
        })
        .collect::<Vec<_>>();

    for application in store.applications() {
        if crop_id.is_some_and(|wanted| application.crop_id != wanted) {
            continue;
        }
        let Ok(day) = parse_day(&application.date) else {
            continue;
        };
        if day.year() != year {
            continue;
        }
        let crop = store.get_crop(&application.crop_id);
        months[usize::from(u8::from(day.month())) - 1]
            .entries
            .push(CalendarEntry {
                application_id: application.id.clone(),
                date: application.date.clone(),
                product_name: application.product_name.clone(),
                treatment_type: application.treatment_type,
                crop_id: application.crop_id.clone(),
                crop_name: crop.map_or(UNKNOWN_CROP, |crop| crop.name.as_str()).to_string(),
                crop_icon: knowledge
                    .icon_for(crop.map_or("", |crop| crop.crop_type.as_str()))
                    .to_string(),
            });
    }
    months
}

pub fn crop_overview(
    store: &RecordStore,
    knowledge: &KnowledgeBase,
    now: OffsetDateTime,
) -> Vec<CropOverview> {
    store
        .crops()
        .iter()
        .map(|crop| {
            let days_since_start = parse_day(&crop.planting_date)
                .ok()
                .map(|planting| days_since_planting(planting, now));
            let days_to_harvest = crop
                .harvest_date
                .as_deref()
                .and_then(|raw| parse_day(raw).ok())
                .map(|harvest| days_between(now, day_start(harvest)))
                .filter(|days| *days > 0);
            CropOverview {
                crop_id: crop.id.clone(),
                name: crop.name.clone(),
                icon: knowledge.icon_for(&crop.crop_type).to_string(),
                farm_name: store
                    .get_farm(&crop.farm_id)
                    .map_or(UNKNOWN_FARM, |farm| farm.name.as_str())
                    .to_string(),
                area: crop.area,
                stage: days_since_start.map(GrowthStage::for_days),
                days_since_start,
                applications: store.list_applications(&crop.id).len(),
                days_to_harvest,
            }
        })
        .collect()
}

pub fn dashboard(
    store: &RecordStore,
    knowledge: &KnowledgeBase,
    feed: &RecommendationFeed,
    urgent_limit: usize,
    now: OffsetDateTime,
) -> Dashboard {
    Dashboard {
        total_crops: store.crops().len(),
        applications_this_month: applications_this_month(store, now),
        upcoming_tasks: feed.items.len(),
        unique_varieties: unique_varieties(store),
        urgent: feed.urgent(urgent_limit).into_iter().cloned().collect(),
        crops: crop_overview(store, knowledge, now),
    }
}

/// Highest count wins; on a tie the type seen later wins.
fn most_used_type(applications: &[Application]) -> (Option<TreatmentType>, usize) {
    let mut counts: Vec<(TreatmentType, usize)> = Vec::new();
    for application in applications {
        match counts
            .iter_mut()
            .find(|(kind, _)| *kind == application.treatment_type)
        {
            Some((_, count)) => *count += 1,
            None => counts.push((application.treatment_type, 1)),
        }
    }
    counts.into_iter().fold((None, 0), |best, (kind, count)| {
        if best.0.is_some() && best.1 > count {
            best
        } else {
            (Some(kind), count)
        }
    })
}

fn unique_varieties(store: &RecordStore) -> usize {
    let mut seen: Vec<&str> = Vec::new();
    for crop in store.crops() {
        let variety = crop.variety.as_str();
        if !variety.is_empty() && !seen.contains(&variety) {
            seen.push(variety);
        }
    }
    seen.len()
}

fn applications_this_month(store: &RecordStore, now: OffsetDateTime) -> usize {
    store
        .applications()
        .iter()
        .filter_map(|application| parse_day(&application.date).ok())
        .filter(|day| day.year() == now.year() && day.month() == now.month())
        .count()
}

fn bump(counts: &mut Vec<LabelCount>, label: &str) {
    match counts.iter_mut().find(|entry| entry.label == label) {
        Some(entry) => entry.count += 1,
        None => counts.push(LabelCount {
            label: label.to_string(),
            count: 1,
        }),
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
