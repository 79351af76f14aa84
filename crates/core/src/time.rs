//! Audit timestamps assigned by the persistence boundary.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// `created_at` is fixed at insert; `modified_at` moves forward on every write.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Timestamps {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            modified_at: now,
        }
    }

    /// Timestamps after a write observed at `now`.
    ///
    /// `modified_at` strictly increases even when the wall clock has not
    /// moved (or moved backwards) since the previous write.
    pub fn touched(&self, now: DateTime<Utc>) -> Self {
        let floor = self.modified_at + Duration::microseconds(1);
        Self {
            created_at: self.created_at,
            modified_at: now.max(floor),
        }
    }
}
