//! Clock access for report stamping.

use chrono::{DateTime, Utc};

/// Current wall-clock time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

