use crate::domain::records::Activity;
use crate::record_id::{generate_record_id, ACTIVITY_PREFIX};

pub const DEFAULT_ACTIVITY_LIMIT: usize = 100;

pub fn new_activity<F>(
    message: String,
    crop_id: Option<&str>,
    occurred_at: &str,
    exists: F,
) -> Activity
where
    F: FnMut(&str) -> bool,
{
    Activity {
        id: generate_record_id(ACTIVITY_PREFIX, exists),
        message,
        crop_id: crop_id.map(str::to_string),
        occurred_at: occurred_at.to_string(),
    }
}

/// Newest entry first; anything past `limit` is dropped.
pub fn prepend_capped(log: &mut Vec<Activity>, entry: Activity, limit: usize) {
    log.insert(0, entry);
    log.truncate(limit.max(1));
}
