//! Opaque cursor pagination for newest-first listings.
//!
//! A cursor names the last item of the previous page as
//! `(created_at micros, id)`; the next page resumes strictly after it in
//! `created_at DESC, id DESC` order. The tuple is base64url encoded so clients
//! treat it as opaque.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Serialize;

use crate::validation::FieldErrors;

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: i64,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cursor is malformed")]
pub struct CursorError;

impl Cursor {
    pub fn new(created_at: i64, id: impl Into<String>) -> Self {
        Self {
            created_at,
            id: id.into(),
        }
    }

    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(format!("{}:{}", self.created_at, self.id))
    }

    pub fn decode(raw: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD.decode(raw).map_err(|_| CursorError)?;
        let text = String::from_utf8(bytes).map_err(|_| CursorError)?;
        let (created_at, id) = text.split_once(':').ok_or(CursorError)?;
        if id.is_empty() {
            return Err(CursorError);
        }
        let created_at = created_at.parse().map_err(|_| CursorError)?;
        Ok(Self::new(created_at, id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub cursor: Option<Cursor>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            cursor: None,
        }
    }
}

impl PageRequest {
    /// Parses raw query values, recording problems into `errors`.
    pub fn parse(limit: Option<&str>, cursor: Option<&str>, errors: &mut FieldErrors) -> Self {
        let limit = match limit.map(str::trim) {
            None | Some("") => DEFAULT_LIMIT,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if (1..=MAX_LIMIT).contains(&n) => n,
                _ => {
                    errors.insert("limit", format!("limit must be between 1 and {MAX_LIMIT}"));
                    DEFAULT_LIMIT
                }
            },
        };

        let cursor = match cursor.map(str::trim) {
            None | Some("") => None,
            Some(raw) => match Cursor::decode(raw) {
                Ok(cursor) => Some(cursor),
                Err(err) => {
                    errors.insert("cursor", err.to_string());
                    None
                }
            },
        };

        Self { limit, cursor }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Builds a page from up to `limit + 1` rows; the surplus row only signals
    /// that more items exist.
    pub fn from_overfetch(mut rows: Vec<T>, limit: u32, cursor_of: impl Fn(&T) -> Cursor) -> Self {
        let limit = limit as usize;
        let has_more = rows.len() > limit;
        rows.truncate(limit);
        let next_cursor = if has_more {
            rows.last().map(|last| cursor_of(last).encode())
        } else {
            None
        };
        Self {
            items: rows,
            next_cursor,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}
