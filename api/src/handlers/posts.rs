use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    auth::{CurrentUser, MaybeUser},
    error::AppError,
    models::{CreatePostRequest, Post, UpdatePostRequest},
    pagination::{Page, PageRequest},
    store::{posts::PostPatch, PostFilter},
    validation::FieldErrors,
    AppState,
};

use super::JsonBody;

/// Raw query string for `GET /api/posts`; parsed by hand so every problem
/// lands in the validation envelope.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub cursor: Option<String>,
    pub author: Option<String>,
    pub mine: Option<String>,
}

fn parse_flag(raw: Option<&str>, field: &'static str, errors: &mut FieldErrors) -> bool {
    match raw.map(str::trim) {
        None | Some("") | Some("false") | Some("0") => false,
        Some("true") | Some("1") => true,
        Some(_) => {
            errors.insert(field, format!("{field} must be true or false"));
            false
        }
    }
}

pub async fn list_posts(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Page<Post>>, AppError> {
    let Query(params) = params?;

    let mut errors = FieldErrors::new();
    let page = PageRequest::parse(params.limit.as_deref(), params.cursor.as_deref(), &mut errors);
    let mine = parse_flag(params.mine.as_deref(), "mine", &mut errors);
    let author = params
        .author
        .map(|a| a.trim().to_owned())
        .filter(|a| !a.is_empty());
    errors.into_result()?;

    let author_id = if mine {
        let current = current.ok_or(AppError::Unauthenticated)?;
        if author.as_deref().is_some_and(|a| a != current.id()) {
            let mut errors = FieldErrors::new();
            errors.insert("author", "author conflicts with mine=true");
            return Err(AppError::Validation(errors));
        }
        Some(current.user.id)
    } else {
        author
    };

    let posts = state.posts.list(&PostFilter { author_id }, &page).await?;
    Ok(Json(posts))
}

pub async fn create_post(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(payload): JsonBody<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = state
        .posts
        .create(current.id(), &payload.title, &payload.body)
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Post>, AppError> {
    Ok(Json(state.posts.get(&post_id).await?))
}

pub async fn update_post(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(post_id): Path<String>,
    JsonBody(payload): JsonBody<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    let patch = PostPatch {
        title: payload.title,
        body: payload.body,
    };
    let post = state.posts.update(&post_id, current.id(), patch).await?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(post_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.posts.delete(&post_id, current.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
