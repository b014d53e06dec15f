use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Universally-unique 128-bit identifier used by every entity (spec §3).
pub type EntityId = Uuid;

/// "Label map" — a mapping from short strings to arbitrary JSON (spec §3).
pub type LabelMap = BTreeMap<String, serde_json::Value>;

/// A mapping from resource name (e.g. `requests.cpu`) to a parsed quantity,
/// expressed as CPU-milli or bytes per the canonical scheme in spec §3.
pub type QuantityMap = BTreeMap<String, i64>;

/// Creation/modification timestamps carried by every entity (spec §3).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    pub fn new_at(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
