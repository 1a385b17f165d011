use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{from_micros, iso8601};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub body: String,
    pub author_id: String,
    #[serde(serialize_with = "iso8601::serialize")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "iso8601::serialize")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostRecord {
    pub id: String,
    pub title: String,
    pub body: String,
    pub author_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<PostRecord> for Post {
    fn from(row: PostRecord) -> Self {
        Post {
            id: row.id,
            title: row.title,
            body: row.body,
            author_id: row.author_id,
            created_at: from_micros(row.created_at),
            updated_at: from_micros(row.updated_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub body: Option<String>,
}
