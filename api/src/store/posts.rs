//! Post repository.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::auth::can_mutate;
use crate::error::AppError;
use crate::models::now_micros;
use crate::models::post::{Post, PostRecord};
use crate::pagination::{Cursor, Page, PageRequest};
use crate::validation::{validate_body, validate_title, FieldErrors};

const POST_COLUMNS: &str = "id, title, body, author_id, created_at, updated_at";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PostFilter {
    pub author_id: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct PostPatch {
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Clone)]
pub struct PostStore {
    db: SqlitePool,
}

impl PostStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    #[tracing::instrument(skip(self, title, body))]
    pub async fn create(&self, author_id: &str, title: &str, body: &str) -> Result<Post, AppError> {
        let title = title.trim();

        let mut errors = FieldErrors::new();
        errors.record(validate_title(title));
        errors.record(validate_body(body));
        errors.into_result()?;

        let now = now_micros();
        let inserted = sqlx::query_as::<_, PostRecord>(&format!(
            "INSERT INTO posts ({POST_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?) RETURNING {POST_COLUMNS}"
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(title)
        .bind(body)
        .bind(author_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.db)
        .await;

        let record = match inserted {
            Ok(record) => record,
            // The author was deleted between session check and insert.
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                return Err(AppError::Unauthenticated);
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(post_id = %record.id, "post created");
        Ok(record.into())
    }

    pub async fn get(&self, post_id: &str) -> Result<Post, AppError> {
        let row: Option<PostRecord> =
            sqlx::query_as(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
                .bind(post_id)
                .fetch_optional(&self.db)
                .await?;

        row.map(Into::into).ok_or(AppError::NotFound)
    }

    /// Newest first, ties broken by id, resuming strictly after `page.cursor`.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, filter: &PostFilter, page: &PageRequest) -> Result<Page<Post>, AppError> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE 1 = 1"));

        if let Some(author_id) = &filter.author_id {
            query.push(" AND author_id = ").push_bind(author_id.clone());
        }

        if let Some(cursor) = &page.cursor {
            query
                .push(" AND (created_at < ")
                .push_bind(cursor.created_at)
                .push(" OR (created_at = ")
                .push_bind(cursor.created_at)
                .push(" AND id < ")
                .push_bind(cursor.id.clone())
                .push("))");
        }

        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(page.limit) + 1);

        let rows: Vec<PostRecord> = query.build_query_as().fetch_all(&self.db).await?;

        Ok(Page::from_overfetch(rows, page.limit, |row| {
            Cursor::new(row.created_at, row.id.clone())
        })
        .map(Post::from))
    }

    /// Ownership is checked before anything is written.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, post_id: &str, actor_id: &str, patch: PostPatch) -> Result<Post, AppError> {
        let title = patch.title.as_deref().map(str::trim).map(ToOwned::to_owned);

        let mut errors = FieldErrors::new();
        if let Some(title) = &title {
            errors.record(validate_title(title));
        }
        if let Some(body) = &patch.body {
            errors.record(validate_body(body));
        }
        errors.into_result()?;

        let existing = self.get(post_id).await?;
        can_mutate(actor_id, &existing.author_id).into_result()?;

        let row: Option<PostRecord> = sqlx::query_as(&format!(
            "UPDATE posts SET title = COALESCE(?, title), body = COALESCE(?, body), \
             updated_at = MAX(?, updated_at + 1) WHERE id = ? AND author_id = ? \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(title)
        .bind(patch.body)
        .bind(now_micros())
        .bind(post_id)
        .bind(actor_id)
        .fetch_optional(&self.db)
        .await?;

        let post: Post = row.map(Into::into).ok_or(AppError::NotFound)?;
        tracing::info!("post updated");
        Ok(post)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, post_id: &str, actor_id: &str) -> Result<(), AppError> {
        let existing = self.get(post_id).await?;
        can_mutate(actor_id, &existing.author_id).into_result()?;

        let result = sqlx::query("DELETE FROM posts WHERE id = ? AND author_id = ?")
            .bind(post_id)
            .bind(actor_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        tracing::info!("post deleted");
        Ok(())
    }
}
