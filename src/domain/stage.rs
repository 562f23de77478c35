use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use super::dates::{day_start, days_between};

/// Day-count growth stages shared by every crop type. These names are not the
/// crop-specific stage names of the knowledge base; rule lookup uses them as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    Seedling,
    Vegetative,
    Flowering,
    Fruiting,
    Harvest,
}

/// Exclusive upper bounds, in days since planting, for each stage but the last.
const STAGE_BREAKPOINTS: [(i64, GrowthStage); 4] = [
    (14, GrowthStage::Seedling),
    (45, GrowthStage::Vegetative),
    (75, GrowthStage::Flowering),
    (105, GrowthStage::Fruiting),
];

impl GrowthStage {
    pub fn as_str(self) -> &'static str {
        match self {
            GrowthStage::Seedling => "seedling",
            GrowthStage::Vegetative => "vegetative",
            GrowthStage::Flowering => "flowering",
            GrowthStage::Fruiting => "fruiting",
            GrowthStage::Harvest => "harvest",
        }
    }

    /// Negative counts (planting date in the future) are seedlings.
    pub fn for_days(days_since_start: i64) -> Self {
        STAGE_BREAKPOINTS
            .iter()
            .find(|(limit, _)| days_since_start < *limit)
            .map(|(_, stage)| *stage)
            .unwrap_or(GrowthStage::Harvest)
    }
}

impl fmt::Display for GrowthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn days_since_planting(planting: Date, now: OffsetDateTime) -> i64 {
    days_between(day_start(planting), now)
}

pub fn infer_stage(planting: Date, now: OffsetDateTime) -> GrowthStage {
    GrowthStage::for_days(days_since_planting(planting, now))
}
