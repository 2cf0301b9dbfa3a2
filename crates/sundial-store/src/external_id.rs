//! Public identifier generation.

use chrono::Utc;
use rand::Rng;

/// Generate a public identifier: unix seconds plus a 5-digit random suffix,
/// e.g. `"1755907200-48213"`.  Uniqueness is ultimately enforced by the
/// `external_id` unique index.
pub(crate) fn generate() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(10_000..=99_999);
    format!("{}-{}", Utc::now().timestamp(), suffix)
}
