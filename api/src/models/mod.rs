pub mod post;
pub mod user;

use chrono::{DateTime, Utc};

pub use post::{CreatePostRequest, Post, UpdatePostRequest};
pub use user::{LoginRequest, RegisterRequest, UpdateProfileRequest, User};

/// Timestamps are persisted as integer microseconds so ordering and cursor
/// comparisons are exact.
pub(crate) fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

pub(crate) fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or(DateTime::UNIX_EPOCH)
}

/// ISO-8601 UTC with fixed microsecond precision, e.g. `2024-05-01T12:00:00.000000Z`.
pub(crate) mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format("%Y-%m-%dT%H:%M:%S%.6fZ"))
    }
}
