//! Article API endpoints
//!
//! Every route sits behind the auth guard:
//! - POST /api/v1/articles - Create an article authored by the caller
//! - GET /api/v1/articles?page_id&page_size - List the caller's articles
//! - GET /api/v1/articles/{id} - Get article by ID
//! - PATCH /api/v1/articles/{id} - Update an article the caller owns
//! - DELETE /api/v1/articles/{id} - Delete an article the caller owns

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, ApiJson, ApiPath, ApiQuery, AppState, AuthPayload};
use crate::models::{Article, ListParams, UpdateArticleInput};

/// Request body for creating an article
#[derive(Debug, Deserialize)]
pub struct CreateArticleRequest {
    pub headline: String,
    pub content: String,
}

/// Request body for a partial update; absent fields stay as they are
#[derive(Debug, Default, Deserialize)]
pub struct UpdateArticleRequest {
    pub headline: Option<String>,
    pub content: Option<String>,
}

/// Query parameters for listing articles
#[derive(Debug, Deserialize)]
pub struct ListArticlesQuery {
    pub page_id: u32,
    pub page_size: u32,
}

/// Build the article router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/articles", get(list_articles).post(create_article))
        .route(
            "/articles/{id}",
            get(get_article).patch(update_article).delete(delete_article),
        )
}

/// POST /api/v1/articles
async fn create_article(
    State(state): State<AppState>,
    AuthPayload(identity): AuthPayload,
    ApiJson(body): ApiJson<CreateArticleRequest>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    let article = state
        .article_service
        .create(&identity.username, body.headline, body.content)
        .await?;

    Ok((StatusCode::CREATED, Json(article)))
}

/// GET /api/v1/articles
async fn list_articles(
    State(state): State<AppState>,
    AuthPayload(identity): AuthPayload,
    ApiQuery(query): ApiQuery<ListArticlesQuery>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let articles = state
        .article_service
        .list_for_author(
            &identity.username,
            ListParams::new(query.page_id, query.page_size),
        )
        .await?;

    Ok(Json(articles))
}

/// GET /api/v1/articles/{id}
async fn get_article(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Article>, ApiError> {
    let article = state.article_service.get(id).await?;
    Ok(Json(article))
}

/// PATCH /api/v1/articles/{id}
async fn update_article(
    State(state): State<AppState>,
    AuthPayload(identity): AuthPayload,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateArticleRequest>,
) -> Result<Json<Article>, ApiError> {
    let input = UpdateArticleInput {
        headline: body.headline,
        content: body.content,
    };
    let article = state
        .article_service
        .update(&identity.username, id, input)
        .await?;

    Ok(Json(article))
}

/// DELETE /api/v1/articles/{id}
async fn delete_article(
    State(state): State<AppState>,
    AuthPayload(identity): AuthPayload,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .article_service
        .delete(&identity.username, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
