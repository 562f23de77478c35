use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const FARM_PREFIX: &str = "farm";
pub const CROP_PREFIX: &str = "crop";
pub const APPLICATION_PREFIX: &str = "app";
pub const ACTIVITY_PREFIX: &str = "act";

/// Short `prefix-xxxx` ids. Falls back to a longer suffix if 64 short
/// candidates all collide.
pub fn generate_record_id<F>(prefix: &str, mut exists: F) -> String
where
    F: FnMut(&str) -> bool,
{
    for _ in 0..64 {
        let seed = Uuid::now_v7().to_string();
        let mut hasher = Sha256::new();
        hasher.update(seed.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        let candidate = format!("{}-{}", prefix, &digest[..4]);
        if !exists(&candidate) {
            return candidate;
        }
    }

    format!("{}-{}", prefix, &Uuid::now_v7().simple().to_string()[..12])
}
